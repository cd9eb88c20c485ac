//! Core library components.
//!
//! This module contains the launch pipeline: secret providers and their
//! aggregation, open-files limit planning, environment assembly and process
//! replacement.

pub mod constants;
pub mod env;
pub mod launch;
pub mod limits;
pub mod observe;
pub mod provider;
pub mod secrets;
pub mod types;
pub mod validation;
