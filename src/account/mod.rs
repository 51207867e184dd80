pub mod account;
pub mod error;
pub mod pool;

pub use account::Account;
pub use error::*;
pub use pool::AccountPool;
