//! `keygate serve`: run a node from the config file until Ctrl-C.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use keygate_config::KeygateConfig;
use keygate_core::{Method, SignedCall};
use keygate_gateway::{CallHandler, CallResponse, Node, NodeHandle, NodeOptions, Route, handler_fn};
use keygate_security::{Identity, TrustRegistry};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub struct ServeOverrides {
    pub port: Option<u16>,
    pub debug: bool,
}

pub async fn run(config_path: &Path, overrides: ServeOverrides) -> Result<()> {
    let mut config = keygate_config::load_and_prepare(config_path).await?;
    apply_overrides(&mut config, &overrides)?;

    let logging = config.logging.clone().unwrap_or_default();
    keygate_logging::init_logger(
        logging.dir.as_deref().map(Path::new),
        logging.level.as_deref().unwrap_or("info"),
        logging.json.unwrap_or(false),
    );

    let trust = Arc::new(build_registry(&config)?);
    let mut node = Node::new(node_options(&config, Arc::clone(&trust))?)?;
    register_builtin_routes(&mut node, trust)?;

    let handle = node.handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, shutting down");
            handle.shutdown();
        }
    });

    info!(node = %node.name(), address = %node.address(), "Starting keygate node");
    node.start().await
}

/// Apply command-line flags and re-check the result, since flags can turn a valid file invalid.
pub fn apply_overrides(config: &mut KeygateConfig, overrides: &ServeOverrides) -> Result<()> {
    let node = config.node.get_or_insert_with(Default::default);
    if let Some(port) = overrides.port {
        node.port = Some(port);
    }
    if overrides.debug {
        node.debug = Some(true);
    }

    let report = keygate_config::validate(config);
    if let Some(first) = report.errors.first() {
        bail!("flags leave the config invalid: {first}");
    }
    Ok(())
}

/// One identity per `trusted` entry, keys decoded up front so a bad entry fails startup.
pub fn build_registry(config: &KeygateConfig) -> Result<TrustRegistry> {
    let registry = TrustRegistry::new();
    for peer in &config.trusted {
        let host = peer.host()?;
        let mut identity = Identity::from_encoded(peer.name.clone(), peer.public_key.clone());
        identity
            .decode_public_key()
            .with_context(|| format!("trusted peer '{}' has an unusable public key", peer.name))?;
        if let Some(global) = peer.global {
            identity.set_global_permission(global);
        }
        for (route, permission) in &peer.local {
            identity.add_local_permission(route.clone(), *permission);
        }
        if !registry.add_trusted(host.clone(), identity) {
            warn!(host = %host, name = %peer.name, "Duplicate trusted peer ignored");
        }
    }
    Ok(registry)
}

pub fn node_options(config: &KeygateConfig, trust: Arc<TrustRegistry>) -> Result<NodeOptions> {
    let node = config.node.clone().unwrap_or_default();
    let defaults = NodeOptions::default();
    Ok(NodeOptions {
        name: node.name.clone(),
        address: node.address()?,
        debug: node.debug.unwrap_or(false),
        trust: Some(trust),
        trust_forwarded_for: node.trust_forwarded_for.unwrap_or(defaults.trust_forwarded_for),
        shutdown_grace: node
            .shutdown_grace_secs
            .map(Duration::from_secs)
            .unwrap_or(defaults.shutdown_grace),
        body_limit: node.body_limit_bytes.unwrap_or(defaults.body_limit),
        random: None,
    })
}

/// `/status` (GET, open) and `/echo` (GET/POST, authenticated).
pub fn register_builtin_routes(node: &mut Node, trust: Arc<TrustRegistry>) -> Result<()> {
    node.function(
        Route::new("/status").method(Method::Get),
        StatusHandler { node: node.handle(), trust },
    )?;
    node.function(
        Route::new("/echo").method(Method::Get).method(Method::Post).auth(true),
        handler_fn(|call, response| {
            response
                .set_status(200)
                .pair("function", &call.function)?
                .pair("param", &call.param)?
                .pair("nonce", call.nonce())?;
            Ok(())
        }),
    )?;
    Ok(())
}

struct StatusHandler {
    node: NodeHandle,
    trust: Arc<TrustRegistry>,
}

#[async_trait]
impl CallHandler for StatusHandler {
    async fn handle(&self, _call: &SignedCall, response: &mut CallResponse) -> Result<()> {
        response
            .set_status(200)
            .pair("node", self.node.name())?
            .pair("status", self.node.status().to_string())?
            .pair("trusted_peers", self.trust.len())?;
        Ok(())
    }
}
