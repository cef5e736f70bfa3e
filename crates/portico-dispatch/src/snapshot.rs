//! Read-only view of the current request.
//!
//! The host platform resolves the incoming URL before the dispatcher runs:
//! it knows whether the request targets a piece of content, a taxonomy term,
//! or an archive, and it knows its own execution context (cron job, REST
//! call, admin screen). All of that state is captured once into a
//! [`RequestSnapshot`] and threaded explicitly through dispatch - nothing in
//! the core reads ambient globals.
//!
//! Snapshots are immutable. Build one per request with
//! [`RequestSnapshot::builder`] and drop it when the request ends.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// HTTP method of the incoming request.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl Method {
    /// Returns the uppercase wire representation (e.g. `"GET"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }
}

/// Parses an uppercase method string (e.g. `"POST"`).
impl FromStr for Method {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            "HEAD" => Ok(Self::Head),
            "OPTIONS" => Ok(Self::Options),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Host execution-context flags consumed by the router's pass-through and
/// not-found policies.
///
/// Plain data; the host sets whatever applies. `queryable` defaults to true
/// since almost every front-end request can be answered from content.
#[derive(Clone, Copy, Debug)]
pub struct HostContext {
    /// Running under the host's CLI.
    pub cli: bool,
    /// Running inside a scheduled (cron) invocation.
    pub cron: bool,
    /// Part of the host's REST surface.
    pub rest: bool,
    /// Part of the host's XML-RPC surface.
    pub xmlrpc: bool,
    /// The host's legacy AJAX endpoint.
    pub ajax: bool,
    /// The request can be answered from content at all.
    pub queryable: bool,
    /// The host resolved the URL to nothing.
    pub not_found: bool,
    /// The request targets a binary/media attachment.
    pub attachment: bool,
    pub author_archive: bool,
    pub tag_archive: bool,
    pub category_archive: bool,
    pub date_archive: bool,
    pub feed: bool,
    pub search: bool,
}

impl Default for HostContext {
    fn default() -> Self {
        Self {
            cli: false,
            cron: false,
            rest: false,
            xmlrpc: false,
            ajax: false,
            queryable: true,
            not_found: false,
            attachment: false,
            author_archive: false,
            tag_archive: false,
            category_archive: false,
            date_archive: false,
            feed: false,
            search: false,
        }
    }
}

/// Immutable per-request value: everything the dispatcher knows about the
/// request, captured once at its start.
#[derive(Clone, Debug)]
pub struct RequestSnapshot {
    method: Method,
    content_id: Option<u64>,
    content_type: Option<String>,
    taxonomy: Option<String>,
    is_archive: bool,
    is_action: bool,
    is_admin: bool,
    raw_body: String,
    query: BTreeMap<String, String>,
    headers: BTreeMap<String, String>,
    host: HostContext,
}

impl RequestSnapshot {
    /// Starts building a snapshot. Defaults: GET, no content, front-end
    /// view, empty body.
    pub fn builder() -> SnapshotBuilder {
        SnapshotBuilder::default()
    }

    pub fn method(&self) -> Method {
        self.method
    }

    /// The content identifier the host resolved the URL to, if any.
    pub fn content_id(&self) -> Option<u64> {
        self.content_id
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// The taxonomy name when the request targets a taxonomy term.
    pub fn taxonomy(&self) -> Option<&str> {
        self.taxonomy.as_deref()
    }

    pub fn is_archive(&self) -> bool {
        self.is_archive
    }

    /// True when the inbound action header marked this request.
    pub fn is_action(&self) -> bool {
        self.is_action
    }

    pub fn is_admin(&self) -> bool {
        self.is_admin
    }

    pub fn raw_body(&self) -> &str {
        &self.raw_body
    }

    pub fn query(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }

    /// Header lookup by lowercase name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    pub fn host(&self) -> &HostContext {
        &self.host
    }

    /// The key used for type-based resolution: taxonomy name when the
    /// request targets a term, content-type name otherwise.
    pub(crate) fn type_key(&self) -> Option<&str> {
        self.taxonomy().or_else(|| self.content_type())
    }
}

/// Fluent builder for [`RequestSnapshot`].
#[derive(Clone, Debug, Default)]
pub struct SnapshotBuilder {
    method: Method,
    content_id: Option<u64>,
    content_type: Option<String>,
    taxonomy: Option<String>,
    is_archive: bool,
    is_action: bool,
    is_admin: bool,
    raw_body: String,
    query: BTreeMap<String, String>,
    headers: BTreeMap<String, String>,
    host: Option<HostContext>,
}

impl SnapshotBuilder {
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn content_id(mut self, id: u64) -> Self {
        self.content_id = Some(id);
        self
    }

    pub fn content_type(mut self, name: impl Into<String>) -> Self {
        self.content_type = Some(name.into());
        self
    }

    pub fn taxonomy(mut self, name: impl Into<String>) -> Self {
        self.taxonomy = Some(name.into());
        self
    }

    pub fn archive(mut self, flag: bool) -> Self {
        self.is_archive = flag;
        self
    }

    /// Marks this request as an action sub-request (the host saw the
    /// distinguishing header).
    pub fn action_request(mut self, flag: bool) -> Self {
        self.is_action = flag;
        self
    }

    pub fn admin(mut self, flag: bool) -> Self {
        self.is_admin = flag;
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.raw_body = body.into();
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Header names are stored lowercase.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into().to_lowercase(), value.into());
        self
    }

    pub fn host_context(mut self, host: HostContext) -> Self {
        self.host = Some(host);
        self
    }

    pub fn build(self) -> RequestSnapshot {
        RequestSnapshot {
            method: self.method,
            content_id: self.content_id,
            content_type: self.content_type,
            taxonomy: self.taxonomy,
            is_archive: self.is_archive,
            is_action: self.is_action,
            is_admin: self.is_admin,
            raw_body: self.raw_body,
            query: self.query,
            headers: self.headers,
            host: self.host.unwrap_or_default(),
        }
    }
}
