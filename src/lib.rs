//! Launcher - prepares the environment for a sub-process and becomes it.
//!
//! # Architecture
//!
//! ```text
//! src/
//! ├── cli/              # Command-line interface
//! │   ├── logging       # tracing subscriber setup
//! │   ├── output        # Error and hint printing
//! │   └── run           # Launch pipeline, stage by stage
//! └── core/             # Core library components
//!     ├── provider/     # Secret backends
//!     │   ├── mod       # SecretProvider trait, dispatch, test fixture
//!     │   ├── aws       # AWS Secrets Manager
//!     │   └── azure     # Azure Key Vault
//!     ├── secrets       # Ordered merge with collision reporting
//!     ├── validation    # Rejects names and values exec cannot carry
//!     ├── limits        # RLIMIT_NOFILE planning
//!     ├── env           # Child environment assembly
//!     ├── launch        # Executable lookup and exec
//!     └── observe       # Observation sink
//! ```
//!
//! # Pipeline
//!
//! Secrets are fetched from every requested provider in order and merged,
//! the open-files limit is planned, the inherited environment is copied with
//! the secrets applied, the target executable is located, the limit is
//! applied and finally the process image is replaced. Any failure aborts
//! before the replacement.

pub mod cli;
pub mod core;
pub mod error;
