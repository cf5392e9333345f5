use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DevcrateError {
    #[error("Invalid descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("Image build failed: {0}")]
    BuildError(String),

    #[error("Container failed to start: {0}")]
    RunError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type DevcrateResult<T> = Result<T, DevcrateError>;

/// Non-fatal configuration findings. Surfaced to the user but never abort
/// compilation; the affected feature degrades to inert at runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    TailscaleAuthKeyMissing,
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigWarning::TailscaleAuthKeyMissing => write!(
                f,
                "Tailscale selected without an auth key; the client is installed but will not be brought up"
            ),
        }
    }
}
