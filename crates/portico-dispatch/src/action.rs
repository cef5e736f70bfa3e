//! Action sub-requests: parsing and dispatch.
//!
//! A POST request flagged by the action header carries a named operation
//! for the resolved controller. The body is either JSON
//! (`{"action": "save", "args": {...}}`) or form-encoded (every field
//! except `action` becomes an argument).
//!
//! Dispatch always terminates by sending exactly one response. Every
//! rejection after a successful parse - unknown name, reserved name,
//! guard failure, veto - is reported with the same not-found signal so
//! callers cannot probe which check stopped them.

use serde_json::{Map, Value};

use crate::cache::ResponseCache;
use crate::context::DispatchContext;
use crate::guards::{run_guards, GuardFlow};
use crate::hooks::{ActionContext, Filters};
use crate::registry::{is_reserved_action, Registration};
use crate::response::{Response, ResponseWriter, SendOutcome};
use crate::snapshot::RequestSnapshot;

/// The parsed action sub-request.
///
/// `name` is `None` when the body carried no usable `action` field; that is
/// the bad-request state. The argument mapping keeps insertion order and
/// stays mutable through dispatch so handlers and host code can add, merge,
/// or remove arguments.
#[derive(Clone, Debug, Default)]
pub struct ActionRequest {
    name: Option<String>,
    args: Map<String, Value>,
}

impl ActionRequest {
    pub fn new(name: Option<String>, args: Map<String, Value>) -> Self {
        Self { name, args }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Parses the action sub-request out of a snapshot's body.
    pub fn parse(req: &RequestSnapshot) -> Self {
        Self::from_body(req.raw_body())
    }

    pub(crate) fn from_body(body: &str) -> Self {
        if let Ok(value) = serde_json::from_str::<Value>(body.trim()) {
            return Self::from_json(value);
        }
        Self::from_form(body)
    }

    fn from_json(value: Value) -> Self {
        match value {
            Value::Object(map) => {
                let name = map
                    .get("action")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                let args = match map.get("args") {
                    Some(Value::Object(args)) => args.clone(),
                    _ => Map::new(),
                };
                Self { name, args }
            }
            // Arrays, numbers, bare strings: no action, no arguments.
            _ => Self::default(),
        }
    }

    fn from_form(body: &str) -> Self {
        let mut name = None;
        let mut args = Map::new();
        for pair in body.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let key = decode_component(key);
            let value = decode_component(value);
            if key == "action" {
                name = Some(value);
            } else {
                args.insert(key, Value::String(value));
            }
        }
        Self { name, args }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn arg(&self, key: &str) -> Option<&Value> {
        self.args.get(key)
    }

    pub fn args(&self) -> &Map<String, Value> {
        &self.args
    }

    pub fn insert_arg(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.args.insert(key.into(), value)
    }

    pub fn remove_arg(&mut self, key: &str) -> Option<Value> {
        self.args.shift_remove(key)
    }

    /// Merges `other` into the arguments, overwriting existing keys.
    pub fn merge_args(&mut self, other: Map<String, Value>) {
        for (key, value) in other {
            self.args.insert(key, value);
        }
    }
}

fn hex_val(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Minimal percent-decoding for form bodies. Malformed escapes pass
/// through literally.
fn decode_component(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' if i + 2 < bytes.len() => {
                match (hex_val(bytes[i + 1]), hex_val(bytes[i + 2])) {
                    (Some(high), Some(low)) => {
                        out.push(high * 16 + low);
                        i += 3;
                    }
                    _ => {
                        out.push(b'%');
                        i += 1;
                    }
                }
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Dispatches an action sub-request against the resolved controller.
///
/// Sends exactly one response:
/// - 400 when the body yielded no action name
/// - the uniform not-found signal for reserved names, unknown actions,
///   guard failures, and vetoes
/// - the cached response on a cache-reply hit, bypassing the method
/// - the method's own response, stored first if a cache-reply guard missed
/// - 500 carrying the raw error message when the method fails
pub(crate) fn dispatch_action(
    registration: &Registration,
    req: &RequestSnapshot,
    cx: &DispatchContext<'_>,
    filters: &Filters,
    cache: &ResponseCache,
    writer: &mut dyn ResponseWriter,
) -> SendOutcome {
    let mut action = ActionRequest::parse(req);

    let Some(name) = action.name().map(str::to_string) else {
        return Response::bad_request().send(writer);
    };

    if is_reserved_action(&name) {
        return Response::action_not_found().send(writer);
    }

    let Some(bound) = registration.action(&name) else {
        return Response::action_not_found().send(writer);
    };

    let identity = registration.cache_identity();
    let pending_store = match run_guards(
        &bound.guards,
        &identity,
        &name,
        &action,
        cx.platform(),
        cache,
    ) {
        GuardFlow::Denied => return Response::action_not_found().send(writer),
        GuardFlow::ServeCached(cached) => return cached.into_response().send(writer),
        GuardFlow::Proceed { pending_store } => pending_store,
    };

    let action_cx = ActionContext {
        controller: &identity,
        action: &name,
        request: req,
    };
    if !filters.run_can_run(&action_cx) {
        return Response::action_not_found().send(writer);
    }

    match bound.invoke(req, &mut action, cx) {
        Ok(response) => {
            if let Some(pending) = pending_store {
                // Hijacked output never lands in the cache.
                if !response.is_hijack() {
                    cache.store(&pending.key, &response, pending.ttl_secs);
                }
            }
            response.send(writer)
        }
        Err(e) => {
            tracing::error!(action = %name, error = %e, "action execution failed");
            Response::server_error(e.to_string()).send(writer)
        }
    }
}
