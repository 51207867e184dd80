pub mod builder;
pub mod error;
pub mod format;
pub mod pending;
pub mod sender;

pub use builder::TransactionBuilder;
pub use error::*;
pub use format::{FeeDefaults, FeePolicy, TxFormat};
pub use pending::{FeeFields, PendingTransaction, TxIntent};
pub use sender::{TransactionSender, require_success};
