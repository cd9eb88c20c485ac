//! Launch pipeline.
//!
//! Resolves secrets, plans limits, assembles the environment, finds the
//! executable, applies limits and replaces the process, in that order.

use std::convert::Infallible;
use std::ffi::OsStr;

use tracing::debug;

use crate::core::env::Environment;
use crate::core::launch::{self, Stage};
use crate::core::limits::{self, ResourceLimits, SystemLimits};
use crate::core::observe::{Observer, TracingObserver};
use crate::core::provider::{Backends, SecretSource};
use crate::core::secrets;
use crate::core::types::LaunchRequest;
use crate::error::Result;

/// Run the pipeline against the real backends and process state.
pub fn execute(request: &LaunchRequest) -> Result<Infallible> {
    launch(
        request,
        &Backends::new(),
        &SystemLimits,
        Environment::inherit(),
        &TracingObserver,
    )
}

/// Run the pipeline with explicit collaborators.
///
/// `inherited` is the environment the child starts from; its `PATH` is used
/// for the executable search. Only returns if a stage failed.
pub fn launch(
    request: &LaunchRequest,
    source: &dyn SecretSource,
    os: &dyn ResourceLimits,
    mut inherited: Environment,
    observer: &dyn Observer,
) -> Result<Infallible> {
    debug!(stage = %Stage::SecretsResolving, providers = request.providers().len());
    let secrets = secrets::resolve_all(source, request.providers(), observer)?;

    debug!(stage = %Stage::LimitsPlanning);
    let plan = limits::plan(request.limits(), os)?;

    debug!(stage = %Stage::EnvironmentAssembling, secrets = secrets.len());
    let search_path = inherited.get("PATH").map(OsStr::to_os_string);
    inherited.apply_secrets(&secrets, observer);

    debug!(stage = %Stage::ExecutableResolving, program = request.program());
    let target = launch::resolve_executable(request.program(), search_path.as_deref())?;

    debug!(stage = %Stage::LimitsApplying, noop = plan.is_noop());
    plan.apply(os, observer)?;

    debug!(stage = %Stage::Replacing);
    launch::replace(&target, request.command(), &inherited, observer)
}
