//! Host platform contract.
//!
//! The dispatcher never talks to the host's user store, token machinery, or
//! query state directly. Everything it needs from the surrounding platform
//! comes through this trait, which keeps guards and the resolver testable
//! with plain stub implementations.

/// Services the host platform provides to the dispatcher.
///
/// Implementations are shared for the process lifetime and must be cheap to
/// call; the dispatcher may consult them several times per request.
pub trait Platform: Send + Sync {
    /// Validates a one-time token issued under `action`'s namespace.
    fn verify_nonce(&self, action: &str, token: &str) -> bool;

    /// Returns true if the acting principal holds `capability`.
    fn user_can(&self, capability: &str) -> bool;

    /// The host's "special page" lookup for archive views: the content
    /// identifier of the page configured to render archives of `type_key`,
    /// if any.
    fn archive_page_id(&self, type_key: &str) -> Option<u64> {
        let _ = type_key;
        None
    }

    /// Whether the host flagged the request as not-found *after* a handler
    /// ran. Checked once per GET dispatch, post-handle.
    fn reports_not_found(&self) -> bool {
        false
    }

    /// Development mode disables response caching entirely.
    fn development(&self) -> bool {
        false
    }
}

/// A platform that denies every token and capability check.
///
/// The builder's default. Safe for hosts that register no guarded actions;
/// anything guarded will uniformly fail closed.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPlatform;

impl Platform for NullPlatform {
    fn verify_nonce(&self, _action: &str, _token: &str) -> bool {
        false
    }

    fn user_can(&self, _capability: &str) -> bool {
        false
    }
}
