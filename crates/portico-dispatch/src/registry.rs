//! Controller registry: the boot-time map from (view kind, handle) to a
//! controller implementation.
//!
//! The registry is populated once at application boot through explicit
//! registration calls (there is no runtime type scan) and is immutable for
//! the rest of the process. Registration collisions are boot-time fatal
//! errors, never runtime ones.
//!
//! Each registration also carries the controller's action table: an
//! explicit map from action name to a bound method, validated here so that
//! reserved or duplicate names can never be dispatched.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::action::ActionRequest;
use crate::context::DispatchContext;
use crate::guards::Guard;
use crate::response::Response;
use crate::snapshot::RequestSnapshot;

/// The registration namespace a handle lives in.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ViewKind {
    /// Ordinary content view.
    View,
    /// Admin page, keyed by the `page` query parameter.
    Admin,
    /// The single process-wide fallback controller.
    Default,
    /// The single process-wide not-found controller.
    NotFound,
}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewKind::View => f.write_str("view"),
            ViewKind::Admin => f.write_str("admin"),
            ViewKind::Default => f.write_str("default"),
            ViewKind::NotFound => f.write_str("not_found"),
        }
    }
}

/// The registration key for a controller.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Handle {
    /// A specific piece of content by identifier.
    ContentId(u64),
    /// Every request for a content type.
    ContentType(String),
    /// Every request for a taxonomy's terms.
    Taxonomy(String),
    /// The archive view of a content type; keys as `archive_<type>`.
    Archive(String),
    /// An admin page, keyed by the `page` query parameter value.
    AdminPage(String),
    /// Sentinel for the fallback controller.
    Default,
    /// Sentinel for the not-found controller.
    NotFound,
}

impl Handle {
    pub fn content_type(name: impl Into<String>) -> Self {
        Handle::ContentType(name.into())
    }

    pub fn taxonomy(name: impl Into<String>) -> Self {
        Handle::Taxonomy(name.into())
    }

    pub fn archive(type_name: impl Into<String>) -> Self {
        Handle::Archive(type_name.into())
    }

    pub fn admin_page(page: impl Into<String>) -> Self {
        Handle::AdminPage(page.into())
    }

    /// The string key this handle registers under.
    pub fn key(&self) -> String {
        match self {
            Handle::ContentId(id) => id.to_string(),
            Handle::ContentType(name) | Handle::Taxonomy(name) | Handle::AdminPage(name) => {
                name.clone()
            }
            Handle::Archive(type_name) => format!("archive_{type_name}"),
            Handle::Default => "__default".to_string(),
            Handle::NotFound => "__not_found".to_string(),
        }
    }
}

/// Method names an action may never use. `handle` is the view entry point;
/// `init` and `configure` are lifecycle names on the controller contract.
const RESERVED_ACTIONS: &[&str] = &["handle", "init", "configure"];

/// True for names the action dispatcher refuses outright: empty, reserved,
/// or marked internal with a leading underscore.
pub(crate) fn is_reserved_action(name: &str) -> bool {
    name.is_empty() || name.starts_with('_') || RESERVED_ACTIONS.contains(&name)
}

/// A registered request handler.
///
/// `handle` answers ordinary (GET) views. Action methods are declared
/// separately via [`Controller::actions`] so the dispatcher holds an
/// explicit name-to-method table instead of reflecting over the type.
pub trait Controller: Send + Sync + 'static {
    /// Produces the response for a plain view request.
    fn handle(&self, req: &RequestSnapshot, cx: &DispatchContext<'_>) -> anyhow::Result<Response>;

    /// Declares the controller's action methods and their guards.
    fn actions(&self, actions: &mut ActionSet<Self>)
    where
        Self: Sized,
    {
        let _ = actions;
    }
}

/// An action method: a plain method reference on the controller type.
pub type ActionMethod<C> = fn(
    &C,
    &RequestSnapshot,
    &mut ActionRequest,
    &DispatchContext<'_>,
) -> anyhow::Result<Response>;

/// Collects a controller's action declarations during registration.
///
/// Guard order is declaration order and is significant: guards run in the
/// order given here, short-circuiting on the first failure.
pub struct ActionSet<C> {
    entries: Vec<(String, Vec<Guard>, ActionMethod<C>)>,
}

impl<C> ActionSet<C> {
    pub(crate) fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Declares an action with its guard chain.
    pub fn action(
        &mut self,
        name: impl Into<String>,
        guards: impl IntoIterator<Item = Guard>,
        method: ActionMethod<C>,
    ) -> &mut Self {
        self.entries
            .push((name.into(), guards.into_iter().collect(), method));
        self
    }
}

type ErasedAction = Arc<
    dyn Fn(&RequestSnapshot, &mut ActionRequest, &DispatchContext<'_>) -> anyhow::Result<Response>
        + Send
        + Sync,
>;

/// An action method bound to its controller instance, plus its guard chain.
pub(crate) struct BoundAction {
    pub(crate) guards: Vec<Guard>,
    invoke: ErasedAction,
}

impl BoundAction {
    pub(crate) fn invoke(
        &self,
        req: &RequestSnapshot,
        action: &mut ActionRequest,
        cx: &DispatchContext<'_>,
    ) -> anyhow::Result<Response> {
        (self.invoke)(req, action, cx)
    }
}

/// One controller registration: the implementation plus its action table.
pub struct Registration {
    view_kind: ViewKind,
    handle: Handle,
    controller: Arc<dyn Controller>,
    actions: HashMap<String, BoundAction>,
}

impl Registration {
    pub fn view_kind(&self) -> ViewKind {
        self.view_kind
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// The controller-identity component of default cache keys. Stable
    /// across requests and unique per registration.
    pub fn cache_identity(&self) -> String {
        format!("{}:{}", self.view_kind, self.handle.key())
    }

    pub(crate) fn action(&self, name: &str) -> Option<&BoundAction> {
        self.actions.get(name)
    }

    pub(crate) fn invoke_handle(
        &self,
        req: &RequestSnapshot,
        cx: &DispatchContext<'_>,
    ) -> anyhow::Result<Response> {
        self.controller.handle(req, cx)
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("view_kind", &self.view_kind)
            .field("handle", &self.handle)
            .field("actions", &self.actions.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Boot-time registration failures. All fatal: they indicate a deployment
/// defect, so the application must not come up.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("duplicate controller registration for {0}")]
    DuplicateRegistration(String),

    #[error("duplicate default controller")]
    DuplicateDefault,

    #[error("duplicate not-found controller")]
    DuplicateNotFound,

    #[error("reserved or invalid action name `{0}`")]
    ReservedAction(String),

    #[error("duplicate action `{0}`")]
    DuplicateAction(String),
}

/// The process-wide controller map. Built once at boot, immutable after.
#[derive(Default)]
pub struct Registry {
    view: HashMap<String, Arc<Registration>>,
    admin: HashMap<String, Arc<Registration>>,
    fallback: Option<Arc<Registration>>,
    not_found: Option<Arc<Registration>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a controller under (view kind, handle).
    ///
    /// The controller's [`Controller::actions`] declarations are validated
    /// and bound here. Any collision or invalid action name fails the
    /// registration.
    pub fn register<C: Controller>(
        &mut self,
        view_kind: ViewKind,
        handle: Handle,
        controller: C,
    ) -> Result<(), RegistryError> {
        let controller = Arc::new(controller);

        let mut set = ActionSet::new();
        controller.actions(&mut set);
        let actions = bind_actions(set, &controller)?;

        let registration = Arc::new(Registration {
            view_kind,
            handle,
            controller,
            actions,
        });

        match view_kind {
            ViewKind::View | ViewKind::Admin => {
                let key = registration.handle().key();
                let map = if view_kind == ViewKind::View {
                    &mut self.view
                } else {
                    &mut self.admin
                };
                if map.contains_key(&key) {
                    return Err(RegistryError::DuplicateRegistration(format!(
                        "{view_kind}:{key}"
                    )));
                }
                map.insert(key, registration);
            }
            ViewKind::Default => {
                if self.fallback.is_some() {
                    return Err(RegistryError::DuplicateDefault);
                }
                self.fallback = Some(registration);
            }
            ViewKind::NotFound => {
                if self.not_found.is_some() {
                    return Err(RegistryError::DuplicateNotFound);
                }
                self.not_found = Some(registration);
            }
        }
        Ok(())
    }

    /// Exact lookup, no fallback.
    pub(crate) fn lookup(&self, view_kind: ViewKind, key: &str) -> Option<Arc<Registration>> {
        match view_kind {
            ViewKind::View => self.view.get(key).cloned(),
            ViewKind::Admin => self.admin.get(key).cloned(),
            ViewKind::Default => self.fallback.clone(),
            ViewKind::NotFound => self.not_found.clone(),
        }
    }

    /// The registry contract: exact match, else the default controller,
    /// else nothing.
    pub fn resolve(&self, view_kind: ViewKind, key: &str) -> Option<Arc<Registration>> {
        self.lookup(view_kind, key).or_else(|| self.fallback.clone())
    }

    pub(crate) fn fallback(&self) -> Option<Arc<Registration>> {
        self.fallback.clone()
    }

    pub(crate) fn not_found(&self) -> Option<Arc<Registration>> {
        self.not_found.clone()
    }
}

fn bind_actions<C: Controller>(
    set: ActionSet<C>,
    controller: &Arc<C>,
) -> Result<HashMap<String, BoundAction>, RegistryError> {
    let mut actions = HashMap::new();
    for (name, guards, method) in set.entries {
        if is_reserved_action(&name) {
            return Err(RegistryError::ReservedAction(name));
        }
        if actions.contains_key(&name) {
            return Err(RegistryError::DuplicateAction(name));
        }
        let bound = Arc::clone(controller);
        let invoke: ErasedAction =
            Arc::new(move |req, action, cx| method(&bound, req, action, cx));
        actions.insert(name, BoundAction { guards, invoke });
    }
    Ok(actions)
}
