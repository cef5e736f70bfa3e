//! Controller resolution and guarded action dispatch for CMS front-ends.
//!
//! `portico-dispatch` is the engine behind a content-management host
//! platform: the host resolves an incoming URL to a content identifier and
//! hands over a [`RequestSnapshot`]; this crate picks the registered
//! controller, runs its declarative guard chain, executes the handler at
//! most once, and produces exactly one response.
//!
//! # Features
//!
//! - **Controller registry**: map (view kind, handle) to an implementation,
//!   with boot-time collision errors and a single default / not-found slot
//! - **Resolver**: identifier-first resolution with per-request memoization
//!   and an admin leaf path keyed by the `page` query parameter
//! - **Guard pipeline**: nonce, capability, and cache-reply guards run in
//!   declaration order with short-circuit semantics
//! - **Action dispatcher**: named POST sub-requests bound to explicit
//!   per-controller method tables, every rejection indistinguishable
//! - **Response cache**: TTL'd keyed store of serialized responses with
//!   vary-by key composition
//!
//! # What stays outside
//!
//! The template engine (behind [`RenderFn`]), user and token machinery
//! (behind [`Platform`]), and the HTTP byte shuffling itself (behind
//! [`ResponseWriter`]) are the host's business. The dispatcher decides;
//! the host executes.
//!
//! # Usage
//!
//! Hosts normally go through the `portico` crate's `App` builder rather
//! than wiring a [`Router`] by hand:
//!
//! ```rust,ignore
//! let app = App::builder()
//!     .controller(ViewKind::View, Handle::content_type("product"), ProductController)?
//!     .default_controller(FrontPage)?
//!     .build()?;
//!
//! let outcome = app.dispatch(&snapshot, &mut writer)?;
//! ```

// Core modules
mod action;
mod cache;
mod config;
mod context;
mod error;
mod guards;
mod hooks;
mod platform;
mod registry;
mod render;
mod resolver;
mod response;
mod router;
mod snapshot;

// Re-export core types
pub use action::ActionRequest;

pub use cache::{CacheStore, FileStore, MemoryStore, ResponseCache};

pub use config::Config;

pub use context::DispatchContext;

pub use error::DispatchError;

pub use guards::{Guard, NONCE_ARG};

pub use hooks::{ActionContext, ArchivePageIdFn, CanRunFn, Filters, IdRemapFn};

pub use platform::{NullPlatform, Platform};

pub use registry::{
    ActionMethod, ActionSet, Controller, Handle, Registration, Registry, RegistryError, ViewKind,
};

pub use render::{from_fn, identity_render, json_render, RenderError, RenderFn};

pub use response::{
    Body, RecordingWriter, Response, ResponseBuilder, ResponseWriter,
};

pub use resolver::Resolver;

pub use router::{Router, RouterOutcome};

pub use snapshot::{HostContext, Method, RequestSnapshot, SnapshotBuilder};
