//! The assembled application.

use portico_dispatch::{DispatchError, RequestSnapshot, Router, RouterOutcome, ResponseWriter};

use crate::builder::AppBuilder;

/// The host's entry point into the dispatcher.
///
/// Built once at boot via [`App::builder`] and shared for the process
/// lifetime. One [`App::dispatch`] call runs one request to completion.
pub struct App {
    router: Router,
}

impl App {
    pub fn builder() -> AppBuilder {
        AppBuilder::new()
    }

    pub(crate) fn from_router(router: Router) -> Self {
        Self { router }
    }

    /// Dispatches one request.
    ///
    /// Either exactly one response goes through `writer`, or the outcome
    /// is [`RouterOutcome::Passed`] / [`RouterOutcome::Hijacked`] and the
    /// writer is untouched. Errors indicate deployment defects and should
    /// crash the request loudly.
    pub fn dispatch(
        &self,
        req: &RequestSnapshot,
        writer: &mut dyn ResponseWriter,
    ) -> Result<RouterOutcome, DispatchError> {
        self.router.dispatch(req, writer)
    }

    pub fn router(&self) -> &Router {
        &self.router
    }
}
