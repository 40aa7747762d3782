//! Listener lifecycle for a `Node`: bind, serve until shutdown, bounded drain.

use anyhow::{Context, Result, bail};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{info, instrument, warn};

use crate::node::Node;
use crate::status::NodeStatus;

impl Node {
    /// Bind the configured address and serve until `shutdown()` is called.
    #[instrument(skip(self), fields(node = %self.name()))]
    pub async fn start(&self) -> Result<()> {
        let address = self.address();
        let port = address
            .port()
            .with_context(|| format!("node address '{address}' has no port"))?;
        let listener = TcpListener::bind((address.host(), port))
            .await
            .with_context(|| format!("failed to bind {address}"))?;
        self.serve(listener).await
    }

    /// Serve on an already-bound listener.
    ///
    /// Moves the node from `Startup` to `Running`. After `shutdown()` the
    /// listener stops accepting, in-flight requests get `shutdown_grace` to
    /// finish and anything still running after that is abandoned.
    #[instrument(skip_all, fields(node = %self.name()))]
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let local = listener.local_addr().context("listener has no local address")?;
        let router = self.router();
        let mut shutdown_rx = self.shared.shutdown_tx.subscribe();
        let mut graceful_rx = shutdown_rx.clone();

        if let Err(status) = self.shared.begin_running() {
            bail!("node cannot start while {status}");
        }
        info!("[Gateway] Node listening on {}", local);

        let mut server = tokio::spawn(async move {
            axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>())
                .with_graceful_shutdown(async move {
                    let _ = graceful_rx.wait_for(|stop| *stop).await;
                })
                .await
        });

        tokio::select! {
            joined = &mut server => {
                self.set_status(NodeStatus::Killed);
                return match joined {
                    Ok(result) => result.context("listener failed"),
                    Err(e) => Err(e).context("listener task failed"),
                };
            }
            _ = shutdown_rx.wait_for(|stop| *stop) => {}
        }

        let grace = self.options.shutdown_grace;
        info!(grace_ms = grace.as_millis() as u64, "[Gateway] Draining in-flight requests");
        match tokio::time::timeout(grace, &mut server).await {
            Ok(Ok(result)) => result.context("listener failed during shutdown")?,
            Ok(Err(e)) => return Err(e).context("listener task failed"),
            Err(_) => {
                warn!("[Gateway] Grace period elapsed, abandoning in-flight requests");
                server.abort();
            }
        }

        self.set_status(NodeStatus::Killed);
        info!("[Gateway] Node stopped");
        Ok(())
    }
}
