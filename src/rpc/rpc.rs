use std::sync::Arc;

use jsonrpsee::{
    core::{RpcResult, async_trait},
    proc_macros::rpc,
    types::{ErrorCode, ErrorObjectOwned},
};
use tracing::info;

use crate::controller::{ControllerError, LoadController, LoadStatus};

/// Control surface for the outer test harness.
#[rpc(server, namespace = "loadgen")]
pub trait LoadGenRpc {
    /// Start the configured population. Fails if it is already running.
    #[method(name = "start")]
    async fn start(&self) -> RpcResult<bool>;

    /// Stop every running user. Safe to call repeatedly.
    #[method(name = "stop")]
    async fn stop(&self) -> RpcResult<bool>;

    #[method(name = "isStarted")]
    async fn is_started(&self) -> RpcResult<bool>;

    #[method(name = "status")]
    async fn status(&self) -> RpcResult<LoadStatus>;
}

pub struct LoadGenRpcImpl {
    controller: Arc<LoadController>,
}

impl LoadGenRpcImpl {
    pub fn new(controller: Arc<LoadController>) -> Self {
        Self { controller }
    }
}

fn to_rpc_error(err: ControllerError) -> ErrorObjectOwned {
    let code = match err {
        ControllerError::AlreadyStarted | ControllerError::Config(_) => ErrorCode::InvalidRequest,
        _ => ErrorCode::InternalError,
    };
    ErrorObjectOwned::owned(code.code(), err.to_string(), None::<()>)
}

#[async_trait]
impl LoadGenRpcServer for LoadGenRpcImpl {
    async fn start(&self) -> RpcResult<bool> {
        info!("loadgen_start called");
        self.controller.start().await.map_err(to_rpc_error)?;
        Ok(self.controller.is_started())
    }

    async fn stop(&self) -> RpcResult<bool> {
        info!("loadgen_stop called");
        self.controller.stop().await;
        Ok(self.controller.is_started())
    }

    async fn is_started(&self) -> RpcResult<bool> {
        Ok(self.controller.is_started())
    }

    async fn status(&self) -> RpcResult<LoadStatus> {
        Ok(self.controller.report())
    }
}
