//! Launcher side of Caisson
//!
//! Consumes the [`ExecutionContext`](caisson_config::ExecutionContext)
//! produced by `caisson-config` and turns it into a concrete `docker run`
//! invocation: staged command/hook scripts, bind mounts, environment
//! plumbing for the in-container `caisson-init` helper, and the final argv.

pub mod dive;
pub mod error;
pub mod ids;
pub mod invocation;
pub mod probe;
pub mod staging;

pub use dive::{Dive, DiveOptions};
pub use error::{Error, Result};
pub use invocation::{BindMount, ContainerInvocation};
pub use staging::StagingDir;
