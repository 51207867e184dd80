use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use alloy::primitives::{Address, B256};
use alloy_signer::{Signature, SignerSync};
use alloy_signer_local::PrivateKeySigner;

use super::AccountError;

/// A chain identity: signing key, derived address and the next nonce to hand out.
pub struct Account {
    signer: PrivateKeySigner,
    address: Address,
    next_nonce: AtomicU64,
}

impl Account {
    pub fn from_signer(signer: PrivateKeySigner, next_nonce: u64) -> Self {
        Self {
            address: signer.address(),
            signer,
            next_nonce: AtomicU64::new(next_nonce),
        }
    }

    // parse a hex private key, with or without the 0x prefix
    pub fn from_private_key(key: &str) -> Result<Self, AccountError> {
        let signer: PrivateKeySigner = key
            .trim()
            .parse()
            .map_err(|e| AccountError::InvalidPrivateKey(format!("{e}")))?;

        Ok(Self::from_signer(signer, 0))
    }

    /// Fresh random keypair with a zero balance and nonce 0.
    pub fn generate() -> Self {
        Self::from_signer(PrivateKeySigner::random(), 0)
    }

    // reseed the nonce counter, used once when bootstrapping from the chain
    pub fn with_next_nonce(self, next_nonce: u64) -> Self {
        Self {
            next_nonce: AtomicU64::new(next_nonce),
            ..self
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn signer(&self) -> &PrivateKeySigner {
        &self.signer
    }

    // value the next reservation will return
    pub fn peek_nonce(&self) -> u64 {
        self.next_nonce.load(Ordering::SeqCst)
    }

    // atomic read-and-increment, only the account pool hands these out
    pub(crate) fn reserve_nonce(&self) -> u64 {
        self.next_nonce.fetch_add(1, Ordering::SeqCst)
    }

    // hand `nonce` back, only if nothing was reserved after it
    pub(crate) fn release_nonce(&self, nonce: u64) -> bool {
        self.next_nonce
            .compare_exchange(nonce + 1, nonce, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub fn sign_hash(&self, hash: &B256) -> Result<Signature, AccountError> {
        self.signer
            .sign_hash_sync(hash)
            .map_err(|e| AccountError::SigningFailed(e.to_string()))
    }
}

// keep the key out of logs
impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("address", &self.address)
            .field("next_nonce", &self.peek_nonce())
            .finish()
    }
}
