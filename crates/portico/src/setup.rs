//! Boot-time setup errors.
//!
//! Anything that goes wrong while the application assembles its controller
//! graph is fatal by design: a collision or invalid action name means a
//! deployment defect, and the process should refuse to come up rather than
//! shadow a handler silently.

use portico_dispatch::RegistryError;
use thiserror::Error;

/// Errors raised while building an [`App`](crate::App).
#[derive(Debug, Error)]
pub enum SetupError {
    /// A registration collision or invalid action declaration.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Invalid builder configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_error_converts() {
        let err: SetupError = RegistryError::DuplicateDefault.into();
        assert_eq!(err.to_string(), "duplicate default controller");
    }
}
