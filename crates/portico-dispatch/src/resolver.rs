//! Controller resolution.
//!
//! Given a request snapshot, decides which registered controller answers
//! it. Identifier-based registration always wins over type-based
//! registration - deliberately so even in admin context, where a specific
//! piece of content can shadow an admin page.
//!
//! One resolver lives per request and memoizes its results, so repeated
//! calls within a request return the identical controller reference. The
//! memo is keyed by view kind, content identifier, type/taxonomy key, and
//! archive flag; admin lookups live under their own key namespace.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::DispatchError;
use crate::hooks::Filters;
use crate::platform::Platform;
use crate::registry::{Registration, Registry, ViewKind};
use crate::snapshot::RequestSnapshot;

/// Per-request resolution with memoization.
pub struct Resolver<'a> {
    registry: &'a Registry,
    filters: &'a Filters,
    platform: &'a dyn Platform,
    memo: RefCell<HashMap<String, Option<Arc<Registration>>>>,
}

impl<'a> Resolver<'a> {
    pub fn new(registry: &'a Registry, filters: &'a Filters, platform: &'a dyn Platform) -> Self {
        Self {
            registry,
            filters,
            platform,
            memo: RefCell::new(HashMap::new()),
        }
    }

    /// Resolves the controller for `req`, or `None` when nothing matches
    /// and no fallback applies (the router treats that as pass-through).
    ///
    /// The only error is a remap filter producing something that is not a
    /// non-negative integer; that is a deployment defect and fatal.
    pub fn resolve(
        &self,
        req: &RequestSnapshot,
    ) -> Result<Option<Arc<Registration>>, DispatchError> {
        let key = memo_key(req);
        if let Some(hit) = self.memo.borrow().get(&key) {
            return Ok(hit.clone());
        }
        let result = self.resolve_uncached(req)?;
        self.memo.borrow_mut().insert(key, result.clone());
        Ok(result)
    }

    fn resolve_uncached(
        &self,
        req: &RequestSnapshot,
    ) -> Result<Option<Arc<Registration>>, DispatchError> {
        // Identifier-based registration wins over everything else,
        // including admin pages. Extension point: the identifier may be
        // remapped (localized/variant content) before use.
        if let Some(id) = req.content_id() {
            let remapped = self.filters.run_remap_content_id(id, req);
            let id = remapped
                .as_u64()
                .ok_or(DispatchError::InvalidIdentifier(remapped.clone()))?;
            if let Some(reg) = self.registry.lookup(ViewKind::View, &id.to_string()) {
                return Ok(Some(reg));
            }
        }

        // Admin is a separate leaf keyed purely by the `page` query
        // parameter. No fallback: an unmatched admin page is a legitimate
        // "nothing to do here".
        if req.is_admin() {
            return Ok(req
                .query("page")
                .and_then(|page| self.registry.lookup(ViewKind::Admin, page)));
        }

        let type_key = req.type_key();

        if req.is_archive() {
            if let Some(type_key) = type_key {
                // The host's special archive page, filterable, resolves by
                // identifier first.
                let initial = self.platform.archive_page_id(type_key);
                if let Some(page_id) = self.filters.run_archive_page_id(initial, type_key, req) {
                    if let Some(reg) =
                        self.registry.lookup(ViewKind::View, &page_id.to_string())
                    {
                        return Ok(Some(reg));
                    }
                }
                if let Some(reg) = self
                    .registry
                    .lookup(ViewKind::View, &format!("archive_{type_key}"))
                {
                    return Ok(Some(reg));
                }
            }
        }

        let Some(type_key) = type_key else {
            return Ok(self.registry.fallback());
        };
        // The generic page type never resolves by name.
        if type_key == "page" {
            return Ok(self.registry.fallback());
        }

        Ok(self
            .registry
            .lookup(ViewKind::View, type_key)
            .or_else(|| self.registry.fallback()))
    }
}

fn memo_key(req: &RequestSnapshot) -> String {
    let id = req
        .content_id()
        .map(|id| id.to_string())
        .unwrap_or_default();
    if req.is_admin() {
        format!("admin:{id}:{}", req.query("page").unwrap_or(""))
    } else {
        format!(
            "view:{id}:{}:{}",
            req.type_key().unwrap_or(""),
            req.is_archive()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::DispatchContext;
    use crate::platform::NullPlatform;
    use crate::registry::{Controller, Handle};
    use crate::response::Response;
    use serde_json::json;

    struct Named(&'static str);

    impl Controller for Named {
        fn handle(
            &self,
            _req: &RequestSnapshot,
            _cx: &DispatchContext<'_>,
        ) -> anyhow::Result<Response> {
            Ok(Response::text(self.0))
        }
    }

    struct ArchivePages;

    impl Platform for ArchivePages {
        fn verify_nonce(&self, _action: &str, _token: &str) -> bool {
            false
        }
        fn user_can(&self, _capability: &str) -> bool {
            false
        }
        fn archive_page_id(&self, type_key: &str) -> Option<u64> {
            (type_key == "product").then_some(77)
        }
    }

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry
            .register(ViewKind::View, Handle::ContentId(42), Named("by-id"))
            .unwrap();
        registry
            .register(ViewKind::View, Handle::content_type("product"), Named("product"))
            .unwrap();
        registry
            .register(ViewKind::View, Handle::taxonomy("category"), Named("category"))
            .unwrap();
        registry
            .register(ViewKind::View, Handle::archive("event"), Named("event-archive"))
            .unwrap();
        registry
            .register(ViewKind::View, Handle::ContentId(77), Named("product-archive-page"))
            .unwrap();
        registry
            .register(ViewKind::Admin, Handle::admin_page("settings"), Named("admin"))
            .unwrap();
        registry
            .register(ViewKind::Default, Handle::Default, Named("default"))
            .unwrap();
        registry
    }

    fn handle_key(reg: &Arc<Registration>) -> String {
        reg.handle().key()
    }

    #[test]
    fn test_identifier_beats_type() {
        let registry = registry();
        let filters = Filters::new();
        let resolver = Resolver::new(&registry, &filters, &NullPlatform);

        let req = RequestSnapshot::builder()
            .content_id(42)
            .content_type("page")
            .build();
        let reg = resolver.resolve(&req).unwrap().unwrap();
        assert_eq!(handle_key(&reg), "42");
    }

    #[test]
    fn test_memoized_resolution_is_idempotent() {
        let registry = registry();
        let filters = Filters::new();
        let resolver = Resolver::new(&registry, &filters, &NullPlatform);

        let req = RequestSnapshot::builder().content_type("product").build();
        let first = resolver.resolve(&req).unwrap().unwrap();
        let second = resolver.resolve(&req).unwrap().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_remap_filter_applies() {
        let registry = registry();
        let filters = Filters::new().remap_content_id(|_, _| json!(42));
        let resolver = Resolver::new(&registry, &filters, &NullPlatform);

        let req = RequestSnapshot::builder().content_id(7).build();
        let reg = resolver.resolve(&req).unwrap().unwrap();
        assert_eq!(handle_key(&reg), "42");
    }

    #[test]
    fn test_invalid_remap_is_fatal() {
        let registry = registry();
        let filters = Filters::new().remap_content_id(|_, _| json!(-3));
        let resolver = Resolver::new(&registry, &filters, &NullPlatform);

        let req = RequestSnapshot::builder().content_id(7).build();
        let err = resolver.resolve(&req).unwrap_err();
        assert!(matches!(err, DispatchError::InvalidIdentifier(_)));

        let filters = Filters::new().remap_content_id(|_, _| json!("seven"));
        let resolver = Resolver::new(&registry, &filters, &NullPlatform);
        assert!(resolver.resolve(&req).is_err());
    }

    #[test]
    fn test_taxonomy_wins_over_content_type() {
        let registry = registry();
        let filters = Filters::new();
        let resolver = Resolver::new(&registry, &filters, &NullPlatform);

        let req = RequestSnapshot::builder()
            .content_type("product")
            .taxonomy("category")
            .build();
        let reg = resolver.resolve(&req).unwrap().unwrap();
        assert_eq!(handle_key(&reg), "category");
    }

    #[test]
    fn test_archive_resolves_via_special_page() {
        let registry = registry();
        let filters = Filters::new();
        let platform = ArchivePages;
        let resolver = Resolver::new(&registry, &filters, &platform);

        let req = RequestSnapshot::builder()
            .content_type("product")
            .archive(true)
            .build();
        let reg = resolver.resolve(&req).unwrap().unwrap();
        assert_eq!(handle_key(&reg), "77");
    }

    #[test]
    fn test_archive_falls_back_to_synthetic_handle() {
        let registry = registry();
        let filters = Filters::new();
        let resolver = Resolver::new(&registry, &filters, &NullPlatform);

        let req = RequestSnapshot::builder()
            .content_type("event")
            .archive(true)
            .build();
        let reg = resolver.resolve(&req).unwrap().unwrap();
        assert_eq!(handle_key(&reg), "archive_event");
    }

    #[test]
    fn test_archive_page_id_filter_override() {
        let registry = registry();
        let filters = Filters::new().archive_page_id(|_, _, _| Some(42));
        let resolver = Resolver::new(&registry, &filters, &NullPlatform);

        let req = RequestSnapshot::builder()
            .content_type("event")
            .archive(true)
            .build();
        let reg = resolver.resolve(&req).unwrap().unwrap();
        assert_eq!(handle_key(&reg), "42");
    }

    #[test]
    fn test_generic_page_type_gets_default() {
        let registry = registry();
        let filters = Filters::new();
        let resolver = Resolver::new(&registry, &filters, &NullPlatform);

        let req = RequestSnapshot::builder().content_type("page").build();
        let reg = resolver.resolve(&req).unwrap().unwrap();
        assert_eq!(reg.handle(), &Handle::Default);
    }

    #[test]
    fn test_unregistered_type_gets_default() {
        let registry = registry();
        let filters = Filters::new();
        let resolver = Resolver::new(&registry, &filters, &NullPlatform);

        let req = RequestSnapshot::builder().content_type("gallery").build();
        let reg = resolver.resolve(&req).unwrap().unwrap();
        assert_eq!(reg.handle(), &Handle::Default);
    }

    #[test]
    fn test_admin_keyed_by_page_param() {
        let registry = registry();
        let filters = Filters::new();
        let resolver = Resolver::new(&registry, &filters, &NullPlatform);

        let req = RequestSnapshot::builder()
            .admin(true)
            .query("page", "settings")
            .build();
        let reg = resolver.resolve(&req).unwrap().unwrap();
        assert_eq!(handle_key(&reg), "settings");
    }

    #[test]
    fn test_admin_unresolved_is_none_not_default() {
        let registry = registry();
        let filters = Filters::new();
        let resolver = Resolver::new(&registry, &filters, &NullPlatform);

        let req = RequestSnapshot::builder()
            .admin(true)
            .query("page", "unknown")
            .build();
        assert!(resolver.resolve(&req).unwrap().is_none());

        let no_page = RequestSnapshot::builder().admin(true).build();
        assert!(resolver.resolve(&no_page).unwrap().is_none());
    }

    #[test]
    fn test_identifier_beats_admin_page() {
        // Deliberate precedence quirk: content id 42 shadows the admin
        // lookup even with the admin flag set.
        let registry = registry();
        let filters = Filters::new();
        let resolver = Resolver::new(&registry, &filters, &NullPlatform);

        let req = RequestSnapshot::builder()
            .admin(true)
            .content_id(42)
            .query("page", "settings")
            .build();
        let reg = resolver.resolve(&req).unwrap().unwrap();
        assert_eq!(handle_key(&reg), "42");
    }
}
