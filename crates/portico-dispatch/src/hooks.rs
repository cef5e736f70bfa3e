//! Extension points consumed by the dispatcher.
//!
//! Filters are pure value-transform callbacks registered at boot and run in
//! registration order, each receiving the previous filter's output:
//!
//! - identifier remap: rewrite the content identifier before resolution
//!   (multi-variant/localized content)
//! - archive page id: override the host's special-page lookup for archive
//!   views
//! - can-run: the final veto before an action method executes, after every
//!   guard has passed
//!
//! A vetoed action is reported exactly like an unknown one; callers cannot
//! tell the difference from outside.

use std::sync::Arc;

use serde_json::Value;

use crate::snapshot::RequestSnapshot;

/// Rewrites a content identifier before resolution. Receives the current
/// value (initially the snapshot's identifier) and must return the value to
/// use next.
pub type IdRemapFn = Arc<dyn Fn(Value, &RequestSnapshot) -> Value + Send + Sync>;

/// Overrides the archive page identifier for a type key.
pub type ArchivePageIdFn =
    Arc<dyn Fn(Option<u64>, &str, &RequestSnapshot) -> Option<u64> + Send + Sync>;

/// The final gate before an action runs.
pub type CanRunFn = Arc<dyn Fn(bool, &ActionContext<'_>) -> bool + Send + Sync>;

/// What a can-run filter gets to look at.
pub struct ActionContext<'a> {
    /// The resolved registration's cache identity, e.g. `view:product`.
    pub controller: &'a str,
    /// The action name being dispatched.
    pub action: &'a str,
    pub request: &'a RequestSnapshot,
}

/// The registered filter chains. Built at boot alongside the registry and
/// immutable afterwards.
#[derive(Clone, Default)]
pub struct Filters {
    remap_content_id: Vec<IdRemapFn>,
    archive_page_id: Vec<ArchivePageIdFn>,
    can_run: Vec<CanRunFn>,
}

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an identifier-remap filter.
    pub fn remap_content_id<F>(mut self, f: F) -> Self
    where
        F: Fn(Value, &RequestSnapshot) -> Value + Send + Sync + 'static,
    {
        self.remap_content_id.push(Arc::new(f));
        self
    }

    /// Adds an archive-page-id override.
    pub fn archive_page_id<F>(mut self, f: F) -> Self
    where
        F: Fn(Option<u64>, &str, &RequestSnapshot) -> Option<u64> + Send + Sync + 'static,
    {
        self.archive_page_id.push(Arc::new(f));
        self
    }

    /// Adds a can-run veto filter.
    pub fn can_run<F>(mut self, f: F) -> Self
    where
        F: Fn(bool, &ActionContext<'_>) -> bool + Send + Sync + 'static,
    {
        self.can_run.push(Arc::new(f));
        self
    }

    /// Runs the remap chain over the snapshot's identifier. The result is
    /// validated by the resolver, not here.
    pub(crate) fn run_remap_content_id(&self, id: u64, req: &RequestSnapshot) -> Value {
        let mut current = Value::from(id);
        for filter in &self.remap_content_id {
            current = filter(current, req);
        }
        current
    }

    pub(crate) fn run_archive_page_id(
        &self,
        initial: Option<u64>,
        type_key: &str,
        req: &RequestSnapshot,
    ) -> Option<u64> {
        let mut current = initial;
        for filter in &self.archive_page_id {
            current = filter(current, type_key, req);
        }
        current
    }

    /// Runs the veto chain. Starts from `true`; any filter may flip the
    /// verdict either way, the last word wins.
    pub(crate) fn run_can_run(&self, cx: &ActionContext<'_>) -> bool {
        let mut current = true;
        for filter in &self.can_run {
            current = filter(current, cx);
        }
        current
    }
}

impl std::fmt::Debug for Filters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Filters")
            .field("remap_content_id_count", &self.remap_content_id.len())
            .field("archive_page_id_count", &self.archive_page_id.len())
            .field("can_run_count", &self.can_run.len())
            .finish()
    }
}
