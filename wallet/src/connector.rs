use std::time::Duration;

use tracing::info;

use crate::storage::{Storage, StorageError};

pub const WALLET_KEY: &str = "connected_wallet";

/// Simulated browser-wallet handshake. The connected address lives in the
/// same key/value storage as the token balance.
#[derive(Debug, Clone)]
pub struct WalletConnector {
    wallet_address: String,
    connect_delay: Duration,
}

impl WalletConnector {
    pub fn new(wallet_address: impl Into<String>) -> Self {
        Self {
            wallet_address: wallet_address.into(),
            connect_delay: Duration::from_secs(2),
        }
    }

    pub fn with_delay(mut self, connect_delay: Duration) -> Self {
        self.connect_delay = connect_delay;
        self
    }

    pub fn connected<S: Storage>(&self, storage: &mut S) -> Result<Option<String>, StorageError> {
        storage.get(WALLET_KEY)
    }

    /// Returns the already connected wallet, or performs the handshake.
    pub async fn connect<S: Storage>(&self, storage: &mut S) -> Result<String, StorageError> {
        if let Some(existing) = storage.get(WALLET_KEY)? {
            return Ok(existing);
        }

        tokio::time::sleep(self.connect_delay).await;
        storage.set(WALLET_KEY, &self.wallet_address)?;
        info!(wallet = %short_address(&self.wallet_address), "Wallet connected");
        Ok(self.wallet_address.clone())
    }

    pub fn disconnect<S: Storage>(&self, storage: &mut S) -> Result<(), StorageError> {
        storage.remove(WALLET_KEY)
    }
}

/// `abcdef...wxyz` for long addresses, unchanged otherwise.
pub fn short_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= 10 {
        return address.to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}
