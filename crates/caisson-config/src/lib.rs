//! Configuration engine for Caisson
//!
//! Locates the project's `.caisson.yml` by upward search, loads it while
//! resolving `!from_yaml` inclusion directives, validates it into a typed
//! [`Config`], and resolves an invocation-time command line into the
//! [`ExecutionContext`] consumed by the launcher.

pub mod config;
pub mod constants;
pub mod context;
pub mod discover;
pub mod error;
pub mod loader;
pub mod script;

pub use config::{Alias, Config, Entrypoint, EnvMap, HookPhase, Hooks, env_var_spec};
pub use context::{ExecutionContext, Overrides, resolve_context};
pub use discover::{AnchorLocator, Discovery};
pub use error::{Error, Result};
pub use loader::load_document;
pub use script::normalize_script;
