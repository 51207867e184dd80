pub mod compiler;
pub mod erc20;
pub mod error;
pub mod registry;
pub mod uniswap;

pub use compiler::{ArtifactCompiler, CompiledContract, Compiler, SolcCompiler};
pub use erc20::Erc20;
pub use error::*;
pub use registry::{CallOutcome, ContractRegistry, DeployedContract};
pub use uniswap::Uniswap;
