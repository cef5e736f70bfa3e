//! Render function abstraction.
//!
//! Defines the contract between dispatch and the host's templating engine.
//! Dispatch doesn't know about templates - it just knows that a controller
//! can ask for a named template to be rendered against some data.

use std::sync::Arc;

/// The render function signature.
///
/// Takes a template name and handler data (as JSON), returns the rendered
/// string. The host wires its template engine in through
/// [`AppBuilder::renderer`](https://docs.rs/portico); controllers call it
/// via [`DispatchContext::render`](crate::DispatchContext::render).
pub type RenderFn =
    Arc<dyn Fn(&str, &serde_json::Value) -> Result<String, RenderError> + Send + Sync>;

/// Errors that can occur during rendering.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// Template rendering failed
    #[error("render error: {0}")]
    Render(String),

    /// Data serialization failed
    #[error("serialization error: {0}")]
    Serialization(String),

    /// No renderer has been configured
    #[error("no renderer configured")]
    Unavailable,
}

impl From<serde_json::Error> for RenderError {
    fn from(e: serde_json::Error) -> Self {
        RenderError::Serialization(e.to_string())
    }
}

/// Creates a render function that ignores the template name and returns the
/// data's compact JSON form.
///
/// Useful for hosts that have no template engine at all.
pub fn identity_render() -> RenderFn {
    Arc::new(|_template, data| Ok(data.to_string()))
}

/// Creates a render function that formats data as pretty JSON.
pub fn json_render() -> RenderFn {
    Arc::new(|_template, data| {
        serde_json::to_string_pretty(data).map_err(|e| RenderError::Serialization(e.to_string()))
    })
}

/// Creates a render function from a closure.
pub fn from_fn<F>(f: F) -> RenderFn
where
    F: Fn(&str, &serde_json::Value) -> Result<String, RenderError> + Send + Sync + 'static,
{
    Arc::new(f)
}
