pub mod buildspec;
pub mod cli;
pub mod config;
pub mod core;
pub mod descriptor;
pub mod docker;
pub mod entrypoint;
pub mod features;
pub mod orchestrator;
pub mod runtime;

pub use crate::core::{ConfigWarning, DevcrateError, DevcrateResult};
pub use crate::descriptor::{DependencySource, EnvironmentDescriptor, Framework};
pub use crate::features::Feature;
pub use crate::runtime::RuntimeSpec;
