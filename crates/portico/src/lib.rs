//! # Portico - request dispatch for CMS host platforms
//!
//! Portico sits between a content-management host platform and the
//! controllers an application registers for its content. The host resolves
//! incoming URLs (it knows whether a request targets a post, a term, an
//! archive, or an admin screen); portico decides which controller answers,
//! enforces that controller's guard chain, and guarantees exactly one
//! response per request.
//!
//! # The flow
//!
//! ```text
//! RequestSnapshot
//!   -> pass-through?   (CLI / cron / REST / XML-RPC contexts: do nothing)
//!   -> not-found?      (attachments, disabled archive kinds: 404 path)
//!   -> resolve         (identifier first, then type/taxonomy, then default)
//!   -> GET: handle()   |  POST action: guards -> veto -> method
//!   -> one response sent
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use portico::{App, Handle, ViewKind};
//! use portico_dispatch::{
//!     ActionRequest, ActionSet, Controller, DispatchContext, Guard, RequestSnapshot, Response,
//! };
//!
//! struct Profile;
//!
//! impl Controller for Profile {
//!     fn handle(&self, _req: &RequestSnapshot, cx: &DispatchContext<'_>) -> anyhow::Result<Response> {
//!         let html = cx.render("profile", &serde_json::json!({"title": "Profile"}))?;
//!         Ok(Response::text(html))
//!     }
//!
//!     fn actions(&self, actions: &mut ActionSet<Self>) {
//!         actions.action(
//!             "save",
//!             [Guard::nonce("save_profile"), Guard::capability(["edit_profile"])],
//!             Self::save,
//!         );
//!     }
//! }
//!
//! impl Profile {
//!     fn save(
//!         &self,
//!         _req: &RequestSnapshot,
//!         action: &mut ActionRequest,
//!         _cx: &DispatchContext<'_>,
//!     ) -> anyhow::Result<Response> {
//!         let email = action.arg("email").cloned();
//!         Ok(Response::json(serde_json::json!({"saved": email})))
//!     }
//! }
//!
//! # fn main() -> Result<(), portico::SetupError> {
//! let app = App::builder()
//!     .controller(ViewKind::View, Handle::content_type("profile"), Profile)?
//!     .build()?;
//! # Ok(())
//! # }
//! ```
//!
//! The dispatch engine itself lives in [`portico_dispatch`] and is
//! re-exported here for convenience.

mod app;
mod builder;
mod setup;

pub use app::App;
pub use builder::AppBuilder;
pub use setup::SetupError;

// The types hosts touch on nearly every registration.
pub use portico_dispatch::{
    Config, Controller, DispatchError, Filters, Guard, Handle, HostContext, Method, Platform,
    RecordingWriter, RequestSnapshot, Response, ResponseWriter, RouterOutcome, ViewKind,
};
