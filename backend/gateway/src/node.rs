//! The dispatcher node: options, route table and lifecycle state.

use axum::Router;
use axum::extract::Request;
use axum::routing::any;
use keygate_core::{Address, ClockNonceSource, KeygateError, NonceSource};
use keygate_security::TrustRegistry;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::dispatch::{DispatchContext, RouteContext, dispatch, unknown_route};
use crate::handler::CallHandler;
use crate::route::Route;
use crate::status::NodeStatus;

pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;
const NAME_LENGTH: usize = 100;

/// Everything a node can be configured with. Unset fields take the defaults below.
#[derive(Clone)]
pub struct NodeOptions {
    /// Stable node name used in logs; random when `None`.
    pub name: Option<String>,
    /// Listening host and port.
    pub address: Address,
    /// Verbose pipeline logging plus the loopback auth bypass. Never enable in deployment.
    pub debug: bool,
    /// Trust registry consulted by auth-required routes.
    pub trust: Option<Arc<TrustRegistry>>,
    /// Honour `X-FORWARDED-FOR` when resolving the sender.
    pub trust_forwarded_for: bool,
    /// How long in-flight requests may run after `shutdown()`.
    pub shutdown_grace: Duration,
    /// Maximum request body size in bytes.
    pub body_limit: usize,
    /// Random capability used for the generated node name.
    pub random: Option<Arc<dyn NonceSource>>,
}

impl Default for NodeOptions {
    fn default() -> Self {
        Self {
            name: None,
            address: Address::localhost(),
            debug: false,
            trust: None,
            trust_forwarded_for: true,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
            body_limit: DEFAULT_BODY_LIMIT,
            random: None,
        }
    }
}

impl NodeOptions {
    fn validate(&self) -> Result<(), KeygateError> {
        if self.body_limit == 0 {
            return Err(KeygateError::Config("body_limit must be > 0".into()));
        }
        if matches!(&self.name, Some(name) if name.trim().is_empty()) {
            return Err(KeygateError::Config("node name cannot be empty".into()));
        }
        // a forged X-Forwarded-For: 127.0.0.1 would pass the loopback bypass
        if self.debug && self.trust_forwarded_for && !self.address.is_loopback() {
            return Err(KeygateError::Config(format!(
                "debug mode with forwarded-for trust requires a loopback address, not {}",
                self.address
            )));
        }
        Ok(())
    }
}

pub(crate) struct NodeShared {
    pub(crate) name: RwLock<String>,
    status: Mutex<NodeStatus>,
    pub(crate) shutdown_tx: watch::Sender<bool>,
}

impl NodeShared {
    pub(crate) fn status(&self) -> NodeStatus {
        *self.status.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn set_status(&self, status: NodeStatus) {
        *self.status.lock().unwrap_or_else(|e| e.into_inner()) = status;
    }

    /// `Startup` → `Running` in one lock acquisition; returns the blocking status otherwise.
    pub(crate) fn begin_running(&self) -> Result<(), NodeStatus> {
        let mut status = self.status.lock().unwrap_or_else(|e| e.into_inner());
        if !status.accepts_registration() {
            return Err(*status);
        }
        *status = NodeStatus::Running;
        Ok(())
    }

    pub(crate) fn name(&self) -> String {
        self.name.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

/// Cloneable handle for observing and stopping a node from other tasks.
#[derive(Clone)]
pub struct NodeHandle {
    pub(crate) shared: Arc<NodeShared>,
}

impl NodeHandle {
    pub fn status(&self) -> NodeStatus {
        self.shared.status()
    }

    pub fn name(&self) -> String {
        self.shared.name()
    }

    /// Mark the node `Killed` and begin graceful shutdown of its listener.
    pub fn shutdown(&self) {
        self.shared.set_status(NodeStatus::Killed);
        let _ = self.shared.shutdown_tx.send(true);
        info!(node = %self.shared.name(), "Shutdown requested");
    }
}

struct RegisteredRoute {
    route: Route,
    handler: Arc<dyn CallHandler>,
}

/// An RPC dispatcher. Register routes during `Startup`, then `start()`/`serve()`.
pub struct Node {
    pub(crate) shared: Arc<NodeShared>,
    pub(crate) options: NodeOptions,
    routes: Vec<RegisteredRoute>,
}

impl Node {
    pub fn new(options: NodeOptions) -> Result<Self, KeygateError> {
        options.validate()?;

        let name = match &options.name {
            Some(name) => name.clone(),
            None => match &options.random {
                Some(random) => random.random_name(NAME_LENGTH),
                None => ClockNonceSource::new().random_name(NAME_LENGTH),
            },
        };
        if options.debug {
            warn!(node = %name, "Debug mode enabled: loopback callers bypass authentication");
        }

        let (shutdown_tx, _) = watch::channel(false);
        Ok(Self {
            shared: Arc::new(NodeShared {
                name: RwLock::new(name),
                status: Mutex::new(NodeStatus::Startup),
                shutdown_tx,
            }),
            options,
            routes: Vec::new(),
        })
    }

    pub fn name(&self) -> String {
        self.shared.name()
    }

    pub fn address(&self) -> &Address {
        &self.options.address
    }

    pub fn is_debug(&self) -> bool {
        self.options.debug
    }

    pub fn trust(&self) -> Option<&Arc<TrustRegistry>> {
        self.options.trust.as_ref()
    }

    pub fn is_auth_attached(&self) -> bool {
        self.options.trust.is_some()
    }

    pub fn status(&self) -> NodeStatus {
        self.shared.status()
    }

    /// Force a status. Concurrent setters race; the last write wins.
    pub fn set_status(&self, status: NodeStatus) {
        self.shared.set_status(status);
    }

    pub fn handle(&self) -> NodeHandle {
        NodeHandle { shared: Arc::clone(&self.shared) }
    }

    pub fn shutdown(&self) {
        self.handle().shutdown();
    }

    /// Rename the node. Only legal during `Startup` so log lines stay attributable.
    pub fn set_name(&self, name: impl Into<String>) -> Result<(), KeygateError> {
        let status = self.status();
        if !status.accepts_registration() {
            return Err(KeygateError::Config(format!(
                "node cannot be renamed while {status}"
            )));
        }
        *self.shared.name.write().unwrap_or_else(|e| e.into_inner()) = name.into();
        Ok(())
    }

    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter().map(|r| &r.route)
    }

    /// Register `handler` behind `route`.
    ///
    /// Fails when the node has left `Startup`, when the route needs auth but
    /// no trust registry is attached, or when the path is invalid or taken.
    pub fn function(&mut self, route: Route, handler: impl CallHandler) -> Result<(), KeygateError> {
        let status = self.status();
        if !status.accepts_registration() {
            return Err(KeygateError::Config(format!(
                "routes cannot be added while the node is {status}"
            )));
        }
        if route.requires_auth() && !self.is_auth_attached() {
            return Err(KeygateError::Config(format!(
                "route '{}' requires authentication but no trust registry is attached",
                route.path()
            )));
        }
        route.validate()?;
        if self.routes.iter().any(|r| r.route.path() == route.path()) {
            return Err(KeygateError::Config(format!(
                "route '{}' is already registered",
                route.path()
            )));
        }

        info!(
            node = %self.name(),
            path = route.path(),
            methods = ?route.allowed_methods().methods(),
            auth = route.requires_auth(),
            "Registered route"
        );
        self.routes.push(RegisteredRoute { route, handler: Arc::new(handler) });
        Ok(())
    }

    /// Build the axum router for the registered routes.
    pub fn router(&self) -> Router {
        let ctx = Arc::new(DispatchContext {
            node: Arc::clone(&self.shared),
            debug: self.options.debug,
            trust: self.options.trust.clone(),
            trust_forwarded_for: self.options.trust_forwarded_for,
            body_limit: self.options.body_limit,
        });

        let mut router = Router::new();
        for registered in &self.routes {
            let route_ctx = Arc::new(RouteContext {
                dispatch: Arc::clone(&ctx),
                route: registered.route.clone(),
                handler: Arc::clone(&registered.handler),
            });
            router = router.route(
                registered.route.path(),
                any(move |req: Request| dispatch(Arc::clone(&route_ctx), req)),
            );
        }
        router.fallback(unknown_route)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::handler_fn;
    use keygate_core::Method;

    fn ok_handler() -> impl CallHandler {
        handler_fn(|_, response| {
            response.set_status(200);
            Ok(())
        })
    }

    #[test]
    fn generated_name_uses_random_capability() {
        let node = Node::new(NodeOptions {
            random: Some(Arc::new(ClockNonceSource::seeded(9))),
            ..Default::default()
        })
        .unwrap();
        let expected = ClockNonceSource::seeded(9).random_name(NAME_LENGTH);
        assert_eq!(node.name(), expected);
    }

    #[test]
    fn registration_after_startup_is_rejected() {
        let mut node = Node::new(NodeOptions::default()).unwrap();
        node.set_status(NodeStatus::Running);
        let err = node
            .function(Route::new("/").method(Method::Get), ok_handler())
            .unwrap_err();
        assert!(matches!(err, KeygateError::Config(_)));
        assert_eq!(node.routes().count(), 0);
    }

    #[test]
    fn auth_route_requires_registry() {
        let mut node = Node::new(NodeOptions::default()).unwrap();
        assert!(node
            .function(Route::new("/").method(Method::Get).auth(true), ok_handler())
            .is_err());

        let mut node = Node::new(NodeOptions {
            trust: Some(Arc::new(TrustRegistry::new())),
            ..Default::default()
        })
        .unwrap();
        assert!(node
            .function(Route::new("/").method(Method::Get).auth(true), ok_handler())
            .is_ok());
    }

    #[test]
    fn duplicate_paths_are_rejected() {
        let mut node = Node::new(NodeOptions::default()).unwrap();
        node.function(Route::new("/a").method(Method::Get), ok_handler()).unwrap();
        assert!(node.function(Route::new("/a").method(Method::Post), ok_handler()).is_err());
    }

    #[test]
    fn rename_only_during_startup() {
        let node = Node::new(NodeOptions { name: Some("alpha".into()), ..Default::default() }).unwrap();
        node.set_name("beta").unwrap();
        assert_eq!(node.name(), "beta");
        node.set_status(NodeStatus::Running);
        assert!(node.set_name("gamma").is_err());
        assert_eq!(node.name(), "beta");
    }

    #[test]
    fn shutdown_marks_killed() {
        let node = Node::new(NodeOptions::default()).unwrap();
        let handle = node.handle();
        handle.shutdown();
        assert_eq!(node.status(), NodeStatus::Killed);
    }

    #[test]
    fn rejects_invalid_options() {
        assert!(Node::new(NodeOptions { body_limit: 0, ..Default::default() }).is_err());
        assert!(Node::new(NodeOptions { name: Some("  ".into()), ..Default::default() }).is_err());
    }

    #[test]
    fn exposed_debug_needs_forwarded_for_off() {
        let public = Address::parse("0.0.0.0:8080").unwrap();
        let err = Node::new(NodeOptions { address: public.clone(), debug: true, ..Default::default() })
            .err()
            .unwrap();
        assert!(matches!(err, KeygateError::Config(_)));

        assert!(Node::new(NodeOptions {
            address: public.clone(),
            debug: true,
            trust_forwarded_for: false,
            ..Default::default()
        })
        .is_ok());
        assert!(Node::new(NodeOptions { address: public, ..Default::default() }).is_ok());
    }

    #[test]
    fn start_transition_happens_once() {
        let node = Node::new(NodeOptions::default()).unwrap();
        assert!(node.shared.begin_running().is_ok());
        assert_eq!(node.status(), NodeStatus::Running);
        assert_eq!(node.shared.begin_running().unwrap_err(), NodeStatus::Running);

        let node = Node::new(NodeOptions::default()).unwrap();
        node.shutdown();
        assert_eq!(node.shared.begin_running().unwrap_err(), NodeStatus::Killed);
        assert_eq!(node.status(), NodeStatus::Killed);
    }
}
