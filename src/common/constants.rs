// Private key of the account prefunded by the dev chain genesis
pub const GENESIS_PRIVATE_KEY: &str =
    "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

pub const ONE_GWEI: u128 = 1_000_000_000;
pub const ONE_ETHER: u128 = 1_000_000_000_000_000_000;

// Gas limits used for the different kinds of generated traffic
pub const INTRINSIC_GAS: u64 = 21_000;
pub const TRANSFER_GAS_LIMIT: u64 = 25_000;
pub const FUNDING_GAS_LIMIT: u64 = 100_000;
pub const CALL_GAS_LIMIT: u64 = 1_000_000;
pub const DEPLOY_GAS_LIMIT: u64 = 5_000_000;

// Chain id reported by the in-memory chain used for dry runs
pub const DEV_CHAIN_ID: u64 = 1337;
