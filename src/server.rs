use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use jsonrpsee::server::{ServerBuilder, ServerHandle};
use tokio::signal;
use tracing::{error, info};

use crate::controller::LoadController;
use crate::rpc::{LoadGenRpcImpl, LoadGenRpcServer};

/// Serves the `loadgen_*` control methods for one controller.
#[derive(Clone)]
pub struct LoadGenServer {
    controller: Arc<LoadController>,
    addr: SocketAddr,
}

impl LoadGenServer {
    pub fn new(controller: Arc<LoadController>, addr: SocketAddr) -> Self {
        Self { controller, addr }
    }

    pub fn controller(&self) -> &Arc<LoadController> {
        &self.controller
    }

    // bind and start serving, returns once the socket is listening
    pub async fn start(&self) -> Result<(ServerHandle, SocketAddr)> {
        let rpc_impl = LoadGenRpcImpl::new(self.controller.clone());

        let server = ServerBuilder::default().build(self.addr).await?;
        let local_addr = server.local_addr()?;

        info!(addr = %local_addr, "control RPC listening");
        let handle = server.start(rpc_impl.into_rpc());

        Ok((handle, local_addr))
    }

    /// Serve until Ctrl+C or SIGTERM, optionally starting the load right away.
    pub async fn run(&self, autostart: bool) -> Result<()> {
        let (handle, _) = self.start().await?;

        if autostart {
            self.controller.start().await?;
        }

        Self::wait_for_shutdown().await;

        info!("shutting down");
        self.controller.stop().await;
        handle.stop()?;
        handle.stopped().await;
        info!("server stopped gracefully");

        Ok(())
    }

    async fn wait_for_shutdown() {
        let ctrl_c = async {
            if let Err(e) = signal::ctrl_c().await {
                error!(error = %e, "failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                }
                Err(e) => {
                    error!(error = %e, "failed to install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => info!("received Ctrl+C"),
            _ = terminate => info!("received terminate signal"),
        }
    }
}
