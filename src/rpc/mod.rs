pub mod rpc;

pub use rpc::{LoadGenRpcImpl, LoadGenRpcServer};
