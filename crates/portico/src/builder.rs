//! Application builder.
//!
//! The host assembles its controller graph here, explicitly, at boot.
//! There is no runtime scan over loaded types: every controller the
//! dispatcher will ever know about goes through one of these registration
//! calls, and every collision surfaces before the first request.

use std::fmt;
use std::sync::Arc;

use portico_dispatch::{
    CacheStore, Config, Controller, Filters, Handle, MemoryStore, NullPlatform, Platform,
    RenderFn, Registry, ResponseCache, Router, ViewKind,
};

use crate::app::App;
use crate::setup::SetupError;

/// Fluent builder for [`App`].
///
/// ```rust,no_run
/// # use portico::{App, Handle, ViewKind};
/// # use portico_dispatch::{Controller, DispatchContext, RequestSnapshot, Response};
/// # struct ProductController;
/// # impl Controller for ProductController {
/// #     fn handle(&self, _: &RequestSnapshot, _: &DispatchContext<'_>) -> anyhow::Result<Response> {
/// #         Ok(Response::text(""))
/// #     }
/// # }
/// # struct FrontPage;
/// # impl Controller for FrontPage {
/// #     fn handle(&self, _: &RequestSnapshot, _: &DispatchContext<'_>) -> anyhow::Result<Response> {
/// #         Ok(Response::text(""))
/// #     }
/// # }
/// # fn main() -> Result<(), portico::SetupError> {
/// let app = App::builder()
///     .controller(ViewKind::View, Handle::content_type("product"), ProductController)?
///     .default_controller(FrontPage)?
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct AppBuilder {
    registry: Registry,
    filters: Filters,
    platform: Option<Arc<dyn Platform>>,
    config: Config,
    store: Option<Arc<dyn CacheStore>>,
    render: Option<RenderFn>,
}

impl fmt::Debug for AppBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppBuilder")
            .field("platform", &self.platform.is_some())
            .field("store", &self.store.is_some())
            .field("render", &self.render.is_some())
            .finish()
    }
}

impl AppBuilder {
    pub(crate) fn new() -> Self {
        Self {
            registry: Registry::new(),
            filters: Filters::new(),
            platform: None,
            config: Config::empty(),
            store: None,
            render: None,
        }
    }

    /// Registers a controller under (view kind, handle).
    pub fn controller<C: Controller>(
        mut self,
        view_kind: ViewKind,
        handle: Handle,
        controller: C,
    ) -> Result<Self, SetupError> {
        self.registry.register(view_kind, handle, controller)?;
        Ok(self)
    }

    /// Registers the single process-wide fallback controller.
    pub fn default_controller<C: Controller>(self, controller: C) -> Result<Self, SetupError> {
        self.controller(ViewKind::Default, Handle::Default, controller)
    }

    /// Registers the single process-wide not-found controller.
    pub fn not_found_controller<C: Controller>(self, controller: C) -> Result<Self, SetupError> {
        self.controller(ViewKind::NotFound, Handle::NotFound, controller)
    }

    /// Registers an admin-page controller, keyed by the `page` query
    /// parameter value.
    pub fn admin_page<C: Controller>(
        self,
        page: impl Into<String>,
        controller: C,
    ) -> Result<Self, SetupError> {
        self.controller(ViewKind::Admin, Handle::admin_page(page), controller)
    }

    /// Wires the host platform in. Defaults to [`NullPlatform`], which
    /// fails every token and capability check closed.
    pub fn platform(mut self, platform: impl Platform + 'static) -> Self {
        self.platform = Some(Arc::new(platform));
        self
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn filters(mut self, filters: Filters) -> Self {
        self.filters = filters;
        self
    }

    /// Backing store for the response cache. Defaults to an in-process
    /// [`MemoryStore`].
    pub fn cache_store(mut self, store: impl CacheStore + 'static) -> Self {
        self.store = Some(Arc::new(store));
        self
    }

    /// Wires the host's template engine in.
    pub fn renderer(mut self, render: RenderFn) -> Self {
        self.render = Some(render);
        self
    }

    pub fn build(self) -> Result<App, SetupError> {
        let platform = self
            .platform
            .unwrap_or_else(|| Arc::new(NullPlatform));
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryStore::new()));
        let router = Router::new(
            Arc::new(self.registry),
            Arc::new(self.filters),
            platform,
            Arc::new(self.config),
            ResponseCache::new(store),
            self.render,
        );
        Ok(App::from_router(router))
    }
}
