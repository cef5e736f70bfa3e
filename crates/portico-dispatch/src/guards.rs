//! Declarative preconditions on action methods.
//!
//! Each action carries an ordered guard chain, evaluated strictly in
//! declaration order with short-circuit on the first failure. Failure
//! detail (which guard, which capability) is logged internally and never
//! surfaced: every denied action looks identical from outside.
//!
//! `CacheReply` is not a pure precondition. On a hit it short-circuits the
//! entire dispatch by serving the cached response; on a miss it arranges
//! for the method's response to be stored once it has run.

use crate::action::ActionRequest;
use crate::cache::{compose_key, CachedResponse, ResponseCache};
use crate::platform::Platform;

/// The reserved argument key carrying the one-time token checked by the
/// nonce guard. Left in the argument mapping; handlers may read it.
pub const NONCE_ARG: &str = "_token";

/// A precondition attached to an action method.
#[derive(Clone, Debug)]
pub enum Guard {
    /// Validates the `_token` argument against the token namespace named
    /// here.
    Nonce { action: String },
    /// Requires every listed capability on the acting principal.
    Capability { capabilities: Vec<String> },
    /// Serves or populates the response cache for this action.
    CacheReply {
        /// Explicit cache-key override; defaults to `identity:method`.
        key: Option<String>,
        ttl_secs: u64,
        /// Argument names folded into the key, in this order.
        vary_by: Vec<String>,
    },
}

impl Guard {
    pub fn nonce(action: impl Into<String>) -> Self {
        Guard::Nonce {
            action: action.into(),
        }
    }

    pub fn capability<I, S>(capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Guard::Capability {
            capabilities: capabilities.into_iter().map(Into::into).collect(),
        }
    }

    pub fn cache_reply<I, S>(ttl_secs: u64, vary_by: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Guard::CacheReply {
            key: None,
            ttl_secs,
            vary_by: vary_by.into_iter().map(Into::into).collect(),
        }
    }

    pub fn cache_reply_keyed<I, S>(key: impl Into<String>, ttl_secs: u64, vary_by: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Guard::CacheReply {
            key: Some(key.into()),
            ttl_secs,
            vary_by: vary_by.into_iter().map(Into::into).collect(),
        }
    }
}

/// A deferred cache write: run the method, then store its response.
pub(crate) struct PendingStore {
    pub(crate) key: String,
    pub(crate) ttl_secs: u64,
}

/// Outcome of walking an action's guard chain.
pub(crate) enum GuardFlow {
    /// All guards passed; `pending_store` is set when a cache-reply guard
    /// missed and wants the fresh response.
    Proceed {
        pending_store: Option<PendingStore>,
    },
    /// A guard failed. The caller reports the uniform not-found signal.
    Denied,
    /// A cache-reply guard hit; serve this instead of invoking anything.
    ServeCached(CachedResponse),
}

/// Evaluates `guards` in order for one (controller, method, request)
/// triple.
pub(crate) fn run_guards(
    guards: &[Guard],
    identity: &str,
    method: &str,
    action: &ActionRequest,
    platform: &dyn Platform,
    cache: &ResponseCache,
) -> GuardFlow {
    let mut pending_store = None;

    for guard in guards {
        match guard {
            Guard::Nonce { action: namespace } => {
                let token = action.arg(NONCE_ARG).and_then(|v| v.as_str());
                let valid = token
                    .map(|t| platform.verify_nonce(namespace, t))
                    .unwrap_or(false);
                if !valid {
                    tracing::debug!(method, namespace = %namespace, "invalid or missing token");
                    return GuardFlow::Denied;
                }
            }
            Guard::Capability { capabilities } => {
                if let Some(missing) =
                    capabilities.iter().find(|cap| !platform.user_can(cap.as_str()))
                {
                    tracing::debug!(method, capability = %missing, "missing capability");
                    return GuardFlow::Denied;
                }
            }
            Guard::CacheReply {
                key,
                ttl_secs,
                vary_by,
            } => {
                if platform.development() {
                    continue;
                }
                let key = compose_key(identity, method, key.as_deref(), vary_by, action);
                if let Some(cached) = cache.fetch(&key) {
                    return GuardFlow::ServeCached(cached);
                }
                pending_store = Some(PendingStore {
                    key,
                    ttl_secs: *ttl_secs,
                });
            }
        }
    }

    GuardFlow::Proceed { pending_store }
}
