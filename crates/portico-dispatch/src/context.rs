//! Execution context passed to controllers.
//!
//! Bundles the process-lifetime services a handler may need: the host
//! platform, configuration, and the render contract. One context is built
//! per dispatch and handed by reference to `handle` and to every invoked
//! action method.

use crate::config::Config;
use crate::platform::Platform;
use crate::render::{RenderError, RenderFn};

/// Services available to a controller during one dispatch.
pub struct DispatchContext<'a> {
    platform: &'a dyn Platform,
    config: &'a Config,
    render: Option<&'a RenderFn>,
}

impl<'a> DispatchContext<'a> {
    pub(crate) fn new(
        platform: &'a dyn Platform,
        config: &'a Config,
        render: Option<&'a RenderFn>,
    ) -> Self {
        Self {
            platform,
            config,
            render,
        }
    }

    pub fn platform(&self) -> &dyn Platform {
        self.platform
    }

    pub fn config(&self) -> &Config {
        self.config
    }

    /// Renders a named template against `data` through the host's engine.
    ///
    /// Errors with [`RenderError::Unavailable`] when the host wired no
    /// renderer in.
    pub fn render(
        &self,
        template: &str,
        data: &serde_json::Value,
    ) -> Result<String, RenderError> {
        match self.render {
            Some(render) => render(template, data),
            None => Err(RenderError::Unavailable),
        }
    }
}
