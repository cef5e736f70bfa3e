//! Outgoing response type and the send contract.
//!
//! A [`Response`] is built by a controller and destroyed by the act of
//! sending: [`Response::send`] consumes the value, so a response can be
//! sent exactly once and never mutated afterwards. The actual bytes go
//! through a host-supplied [`ResponseWriter`]; the dispatcher itself never
//! touches a socket.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Response body.
///
/// Structured bodies are serialized as JSON and imply a JSON content type
/// unless the controller set one explicitly.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Body {
    Empty,
    Text(String),
    Json(Value),
}

impl Body {
    pub(crate) fn to_bytes(&self) -> Vec<u8> {
        match self {
            Body::Empty => Vec::new(),
            Body::Text(s) => s.clone().into_bytes(),
            // Value serialization cannot fail: keys are strings, data is UTF-8.
            Body::Json(v) => serde_json::to_vec(v).unwrap_or_default(),
        }
    }
}

/// An outgoing response.
///
/// # Shortcuts
///
/// ```rust
/// use portico_dispatch::Response;
///
/// Response::text("hello");
/// Response::json(serde_json::json!({"id": 1}));
/// Response::status(204);
/// ```
///
/// # Builder
///
/// ```rust
/// use portico_dispatch::Response;
///
/// Response::builder()
///     .status(201)
///     .header("location", "/orders/42")
///     .json(serde_json::json!({"id": 42}));
/// ```
#[derive(Clone, Debug)]
pub struct Response {
    status: u16,
    body: Body,
    content_type: Option<String>,
    headers: Vec<(String, String)>,
    hijack: bool,
}

impl Response {
    /// `200 OK` with a plain-text body.
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: Body::Text(body.into()),
            content_type: Some("text/plain; charset=utf-8".into()),
            headers: Vec::new(),
            hijack: false,
        }
    }

    /// `200 OK` with a structured JSON body.
    pub fn json(body: Value) -> Self {
        Self {
            status: 200,
            body: Body::Json(body),
            content_type: Some("application/json".into()),
            headers: Vec::new(),
            hijack: false,
        }
    }

    /// A bodyless response with the given status.
    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: Body::Empty,
            content_type: None,
            headers: Vec::new(),
            hijack: false,
        }
    }

    /// The fixed `400` reply for an unparseable action sub-request.
    pub fn bad_request() -> Self {
        let mut resp = Self::text("Bad Request");
        resp.status = 400;
        resp
    }

    /// The uniform outward signal for every rejected action: unknown name,
    /// reserved name, guard failure, veto. One constructor so all paths are
    /// byte-identical.
    pub fn action_not_found() -> Self {
        let mut resp = Self::text("Action not found");
        resp.status = 404;
        resp
    }

    /// `500` carrying an error message verbatim.
    pub fn server_error(message: impl Into<String>) -> Self {
        let mut resp = Self::text(message);
        resp.status = 500;
        resp
    }

    /// Builder for responses needing a custom status or extra headers.
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder {
            status: 200,
            headers: Vec::new(),
        }
    }

    /// Suppresses the automatic body write; the controller streams output
    /// itself through a channel the dispatcher does not manage.
    pub fn hijacked(mut self) -> Self {
        self.hijack = true;
        self
    }

    pub fn status_code(&self) -> u16 {
        self.status
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn is_hijack(&self) -> bool {
        self.hijack
    }

    /// The router forces 404 on the not-found path regardless of what the
    /// controller set.
    pub(crate) fn force_status(&mut self, status: u16) {
        self.status = status;
    }

    pub(crate) fn from_parts(
        status: u16,
        body: Body,
        content_type: Option<String>,
        headers: Vec<(String, String)>,
    ) -> Self {
        Self {
            status,
            body,
            content_type,
            headers,
            hijack: false,
        }
    }

    /// Sends the response through `writer`, consuming it.
    ///
    /// Returns the outcome the router reports: hijacked responses perform
    /// no write at all.
    pub(crate) fn send(self, writer: &mut dyn ResponseWriter) -> SendOutcome {
        if self.hijack {
            return SendOutcome::Hijacked;
        }
        let mut headers = Vec::with_capacity(self.headers.len() + 1);
        if let Some(ct) = &self.content_type {
            headers.push(("content-type".to_string(), ct.clone()));
        }
        headers.extend(self.headers.iter().cloned());
        let status = self.status;
        writer.write_response(status, &headers, &self.body.to_bytes());
        SendOutcome::Sent(status)
    }
}

/// What happened when a response was handed to the writer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SendOutcome {
    Sent(u16),
    Hijacked,
}

/// Fluent builder for [`Response`].
pub struct ResponseBuilder {
    status: u16,
    headers: Vec<(String, String)>,
}

impl ResponseBuilder {
    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Terminate with a plain-text body.
    pub fn text(self, body: impl Into<String>) -> Response {
        Response::from_parts(
            self.status,
            Body::Text(body.into()),
            Some("text/plain; charset=utf-8".into()),
            self.headers,
        )
    }

    /// Terminate with a structured JSON body.
    pub fn json(self, body: Value) -> Response {
        Response::from_parts(
            self.status,
            Body::Json(body),
            Some("application/json".into()),
            self.headers,
        )
    }

    /// Terminate with no body.
    pub fn empty(self) -> Response {
        Response::from_parts(self.status, Body::Empty, None, self.headers)
    }
}

/// The host's side of the send contract.
///
/// The dispatcher calls this exactly once per non-passed, non-hijacked
/// request. Write failures are the host's concern; from the dispatcher's
/// perspective the response is gone either way.
pub trait ResponseWriter {
    fn write_response(&mut self, status: u16, headers: &[(String, String)], body: &[u8]);
}

/// A [`ResponseWriter`] that records every write. Useful in host test
/// suites for asserting the single-send invariant.
#[derive(Debug, Default)]
pub struct RecordingWriter {
    writes: Vec<(u16, Vec<(String, String)>, Vec<u8>)>,
}

impl RecordingWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of responses written so far.
    pub fn count(&self) -> usize {
        self.writes.len()
    }

    pub fn last_status(&self) -> Option<u16> {
        self.writes.last().map(|(s, _, _)| *s)
    }

    pub fn last_body(&self) -> Option<&[u8]> {
        self.writes.last().map(|(_, _, b)| b.as_slice())
    }

    pub fn last_headers(&self) -> Option<&[(String, String)]> {
        self.writes.last().map(|(_, h, _)| h.as_slice())
    }
}

impl ResponseWriter for RecordingWriter {
    fn write_response(&mut self, status: u16, headers: &[(String, String)], body: &[u8]) {
        self.writes.push((status, headers.to_vec(), body.to_vec()));
    }
}
