//! Fatal dispatch errors.
//!
//! Recoverable conditions (unparseable action body, unknown action, guard
//! failure) are expressed as responses, not errors. The variants here
//! indicate a deployment defect and are allowed to propagate out of
//! [`Router::dispatch`](crate::Router::dispatch) so the request crashes
//! loudly instead of degrading.

use thiserror::Error;

/// Errors that abort a dispatch.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// An identifier-remap filter produced a value that is not a
    /// non-negative integer.
    #[error("invalid remapped content identifier: {0}")]
    InvalidIdentifier(serde_json::Value),

    /// A controller's `handle` implementation failed to produce a response.
    #[error("controller misconfiguration: {0}")]
    Misconfiguration(String),
}
