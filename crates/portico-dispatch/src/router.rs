//! The per-request state machine.
//!
//! One call to [`Router::dispatch`] runs a request to completion:
//!
//! - pass-through contexts (CLI, cron, REST, XML-RPC, non-action AJAX,
//!   unqueryable requests) are detected first, before any other work
//! - not-found policy: host-reported misses, attachment requests (always),
//!   and archive kinds the configuration has not explicitly re-enabled
//! - otherwise the resolver picks a controller; GET requests go straight
//!   to `handle`, flagged POST requests go through the action dispatcher
//!
//! Exactly one response is sent per non-passed request, never zero, never
//! more than one.

use std::sync::Arc;

use crate::action::dispatch_action;
use crate::cache::ResponseCache;
use crate::config::Config;
use crate::context::DispatchContext;
use crate::error::DispatchError;
use crate::hooks::Filters;
use crate::platform::Platform;
use crate::registry::{Registration, Registry};
use crate::render::RenderFn;
use crate::resolver::Resolver;
use crate::response::{Response, ResponseWriter, SendOutcome};
use crate::snapshot::{Method, RequestSnapshot};

/// How a dispatch ended.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RouterOutcome {
    /// The router did nothing; the host platform handles the request.
    Passed,
    /// One response was sent with this status.
    Sent(u16),
    /// A controller took over output itself; nothing was auto-sent.
    Hijacked,
}

impl From<SendOutcome> for RouterOutcome {
    fn from(outcome: SendOutcome) -> Self {
        match outcome {
            SendOutcome::Sent(status) => RouterOutcome::Sent(status),
            SendOutcome::Hijacked => RouterOutcome::Hijacked,
        }
    }
}

/// Orchestrates registry, resolver, guards, actions, and cache for one
/// request at a time. Built once at boot; all parts are immutable and
/// shared.
pub struct Router {
    registry: Arc<Registry>,
    filters: Arc<Filters>,
    platform: Arc<dyn Platform>,
    config: Arc<Config>,
    cache: ResponseCache,
    render: Option<RenderFn>,
}

impl Router {
    pub fn new(
        registry: Arc<Registry>,
        filters: Arc<Filters>,
        platform: Arc<dyn Platform>,
        config: Arc<Config>,
        cache: ResponseCache,
        render: Option<RenderFn>,
    ) -> Self {
        Self {
            registry,
            filters,
            platform,
            config,
            cache,
            render,
        }
    }

    /// Runs the state machine for one request.
    pub fn dispatch(
        &self,
        req: &RequestSnapshot,
        writer: &mut dyn ResponseWriter,
    ) -> Result<RouterOutcome, DispatchError> {
        if should_pass(req) {
            return Ok(RouterOutcome::Passed);
        }

        let cx = DispatchContext::new(&*self.platform, &self.config, self.render.as_ref());

        if self.should_404(req) {
            return self.not_found_dispatch(req, &cx, writer);
        }

        let resolver = Resolver::new(&self.registry, &self.filters, &*self.platform);
        let Some(registration) = resolver.resolve(req)? else {
            // No controller answers this request; same as pass-through.
            return Ok(RouterOutcome::Passed);
        };

        if req.is_action() && req.method() == Method::Post {
            let outcome = dispatch_action(
                &registration,
                req,
                &cx,
                &self.filters,
                &self.cache,
                writer,
            );
            return Ok(outcome.into());
        }

        self.get_dispatch(&registration, req, &cx, writer)
    }

    fn get_dispatch(
        &self,
        registration: &Registration,
        req: &RequestSnapshot,
        cx: &DispatchContext<'_>,
        writer: &mut dyn ResponseWriter,
    ) -> Result<RouterOutcome, DispatchError> {
        let response = registration
            .invoke_handle(req, cx)
            .map_err(|e| DispatchError::Misconfiguration(e.to_string()))?;

        // A handler may push the host into a not-found state; its own
        // response is then discarded in favor of the 404 path.
        if self.platform.reports_not_found() {
            return self.not_found_dispatch(req, cx, writer);
        }

        Ok(response.send(writer).into())
    }

    fn not_found_dispatch(
        &self,
        req: &RequestSnapshot,
        cx: &DispatchContext<'_>,
        writer: &mut dyn ResponseWriter,
    ) -> Result<RouterOutcome, DispatchError> {
        let Some(not_found) = self.registry.not_found() else {
            return Ok(Response::status(404).send(writer).into());
        };
        let mut response = not_found
            .invoke_handle(req, cx)
            .map_err(|e| DispatchError::Misconfiguration(e.to_string()))?;
        response.force_status(404);
        Ok(response.send(writer).into())
    }

    fn should_404(&self, req: &RequestSnapshot) -> bool {
        let host = req.host();
        if host.not_found || host.attachment {
            return true;
        }
        // Archive kinds are 404-eligible unless the configuration says
        // `routes.disable.<kind> = false` explicitly.
        let disabled =
            |kind: &str| self.config.bool_or(&format!("routes.disable.{kind}"), true);
        (host.author_archive && disabled("author_archive"))
            || (host.tag_archive && disabled("tag_archive"))
            || (host.category_archive && disabled("category_archive"))
            || (host.date_archive && disabled("date_archive"))
            || (host.feed && disabled("feed"))
            || (host.search && disabled("search"))
    }
}

/// Side-effect-free pass-through predicate, evaluated before anything
/// else. Once true the router does no further work on the request.
fn should_pass(req: &RequestSnapshot) -> bool {
    let host = req.host();
    host.cli
        || host.cron
        || host.rest
        || host.xmlrpc
        || (host.ajax && !req.is_action())
        || (!host.queryable && !req.is_action())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;
    use crate::platform::NullPlatform;
    use crate::registry::{Controller, Handle, ViewKind};
    use crate::response::RecordingWriter;
    use crate::snapshot::HostContext;

    struct Plain(&'static str);

    impl Controller for Plain {
        fn handle(
            &self,
            _req: &RequestSnapshot,
            _cx: &DispatchContext<'_>,
        ) -> anyhow::Result<Response> {
            Ok(Response::text(self.0))
        }
    }

    struct Failing;

    impl Controller for Failing {
        fn handle(
            &self,
            _req: &RequestSnapshot,
            _cx: &DispatchContext<'_>,
        ) -> anyhow::Result<Response> {
            anyhow::bail!("no response")
        }
    }

    struct LostPlatform;

    impl Platform for LostPlatform {
        fn verify_nonce(&self, _action: &str, _token: &str) -> bool {
            false
        }
        fn user_can(&self, _capability: &str) -> bool {
            false
        }
        fn reports_not_found(&self) -> bool {
            true
        }
    }

    fn router_with(registry: Registry, config: Config) -> Router {
        Router::new(
            Arc::new(registry),
            Arc::new(Filters::new()),
            Arc::new(NullPlatform),
            Arc::new(config),
            ResponseCache::new(Arc::new(MemoryStore::new())),
            None,
        )
    }

    fn basic_registry() -> Registry {
        let mut registry = Registry::new();
        registry
            .register(ViewKind::View, Handle::content_type("product"), Plain("product"))
            .unwrap();
        registry
            .register(ViewKind::NotFound, Handle::NotFound, Plain("missing"))
            .unwrap();
        registry
    }

    #[test]
    fn test_pass_through_contexts() {
        let router = router_with(basic_registry(), Config::empty());
        let mut writer = RecordingWriter::new();

        for host in [
            HostContext {
                cli: true,
                ..Default::default()
            },
            HostContext {
                cron: true,
                ..Default::default()
            },
            HostContext {
                rest: true,
                ..Default::default()
            },
            HostContext {
                xmlrpc: true,
                ..Default::default()
            },
            HostContext {
                ajax: true,
                ..Default::default()
            },
            HostContext {
                queryable: false,
                ..Default::default()
            },
        ] {
            let req = RequestSnapshot::builder()
                .content_type("product")
                .host_context(host)
                .build();
            let outcome = router.dispatch(&req, &mut writer).unwrap();
            assert_eq!(outcome, RouterOutcome::Passed);
        }
        // Pass-through performs no response work at all.
        assert_eq!(writer.count(), 0);
    }

    #[test]
    fn test_ajax_action_request_is_not_passed() {
        let router = router_with(basic_registry(), Config::empty());
        let mut writer = RecordingWriter::new();

        let req = RequestSnapshot::builder()
            .method(Method::Post)
            .content_type("product")
            .action_request(true)
            .host_context(HostContext {
                ajax: true,
                ..Default::default()
            })
            .body("")
            .build();
        let outcome = router.dispatch(&req, &mut writer).unwrap();
        // Empty body: parses to no action name, so 400.
        assert_eq!(outcome, RouterOutcome::Sent(400));
    }

    #[test]
    fn test_get_dispatch_sends_handler_response() {
        let router = router_with(basic_registry(), Config::empty());
        let mut writer = RecordingWriter::new();

        let req = RequestSnapshot::builder().content_type("product").build();
        let outcome = router.dispatch(&req, &mut writer).unwrap();
        assert_eq!(outcome, RouterOutcome::Sent(200));
        assert_eq!(writer.count(), 1);
        assert_eq!(writer.last_body(), Some(&b"product"[..]));
    }

    #[test]
    fn test_no_controller_means_passed() {
        // No default registered and the type is unknown.
        let mut registry = Registry::new();
        registry
            .register(ViewKind::View, Handle::content_type("product"), Plain("p"))
            .unwrap();
        let router = router_with(registry, Config::empty());
        let mut writer = RecordingWriter::new();

        let req = RequestSnapshot::builder().content_type("gallery").build();
        let outcome = router.dispatch(&req, &mut writer).unwrap();
        assert_eq!(outcome, RouterOutcome::Passed);
        assert_eq!(writer.count(), 0);
    }

    #[test]
    fn test_attachment_always_404() {
        let router = router_with(basic_registry(), Config::empty());
        let mut writer = RecordingWriter::new();

        let req = RequestSnapshot::builder()
            .content_type("product")
            .host_context(HostContext {
                attachment: true,
                ..Default::default()
            })
            .build();
        let outcome = router.dispatch(&req, &mut writer).unwrap();
        assert_eq!(outcome, RouterOutcome::Sent(404));
        // The not-found controller rendered the body, status forced.
        assert_eq!(writer.last_body(), Some(&b"missing"[..]));
    }

    #[test]
    fn test_archive_kind_404_unless_explicitly_enabled() {
        let feed_req = || {
            RequestSnapshot::builder()
                .content_type("product")
                .host_context(HostContext {
                    feed: true,
                    ..Default::default()
                })
                .build()
        };

        // Absent switch: 404-eligible.
        let router = router_with(basic_registry(), Config::empty());
        let mut writer = RecordingWriter::new();
        assert_eq!(
            router.dispatch(&feed_req(), &mut writer).unwrap(),
            RouterOutcome::Sent(404)
        );

        // Explicit false re-enables the feed; normal dispatch follows.
        let config = Config::from_json_str(r#"{"routes":{"disable":{"feed":false}}}"#).unwrap();
        let router = router_with(basic_registry(), config);
        let mut writer = RecordingWriter::new();
        assert_eq!(
            router.dispatch(&feed_req(), &mut writer).unwrap(),
            RouterOutcome::Sent(200)
        );
    }

    #[test]
    fn test_not_found_without_controller_sends_bare_404() {
        let mut registry = Registry::new();
        registry
            .register(ViewKind::View, Handle::content_type("product"), Plain("p"))
            .unwrap();
        let router = router_with(registry, Config::empty());
        let mut writer = RecordingWriter::new();

        let req = RequestSnapshot::builder()
            .content_type("product")
            .host_context(HostContext {
                not_found: true,
                ..Default::default()
            })
            .build();
        assert_eq!(
            router.dispatch(&req, &mut writer).unwrap(),
            RouterOutcome::Sent(404)
        );
        assert_eq!(writer.last_body(), Some(&b""[..]));
    }

    #[test]
    fn test_post_handle_not_found_overrides_response() {
        let router = Router::new(
            Arc::new(basic_registry()),
            Arc::new(Filters::new()),
            Arc::new(LostPlatform),
            Arc::new(Config::empty()),
            ResponseCache::new(Arc::new(MemoryStore::new())),
            None,
        );
        let mut writer = RecordingWriter::new();

        let req = RequestSnapshot::builder().content_type("product").build();
        let outcome = router.dispatch(&req, &mut writer).unwrap();
        assert_eq!(outcome, RouterOutcome::Sent(404));
        assert_eq!(writer.count(), 1);
        assert_eq!(writer.last_body(), Some(&b"missing"[..]));
    }

    #[test]
    fn test_failing_handler_is_fatal() {
        let mut registry = Registry::new();
        registry
            .register(ViewKind::View, Handle::content_type("product"), Failing)
            .unwrap();
        let router = router_with(registry, Config::empty());
        let mut writer = RecordingWriter::new();

        let req = RequestSnapshot::builder().content_type("product").build();
        let err = router.dispatch(&req, &mut writer).unwrap_err();
        assert!(matches!(err, DispatchError::Misconfiguration(_)));
        assert_eq!(writer.count(), 0);
    }

    #[test]
    fn test_hijacked_response_reports_hijacked() {
        struct Streamer;
        impl Controller for Streamer {
            fn handle(
                &self,
                _req: &RequestSnapshot,
                _cx: &DispatchContext<'_>,
            ) -> anyhow::Result<Response> {
                Ok(Response::text("streamed").hijacked())
            }
        }

        let mut registry = Registry::new();
        registry
            .register(ViewKind::View, Handle::content_type("export"), Streamer)
            .unwrap();
        let router = router_with(registry, Config::empty());
        let mut writer = RecordingWriter::new();

        let req = RequestSnapshot::builder().content_type("export").build();
        assert_eq!(
            router.dispatch(&req, &mut writer).unwrap(),
            RouterOutcome::Hijacked
        );
        assert_eq!(writer.count(), 0);
    }
}
