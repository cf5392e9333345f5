pub mod error;

pub use error::{ConfigWarning, DevcrateError, DevcrateResult};
