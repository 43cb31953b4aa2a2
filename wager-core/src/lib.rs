//! Wager exchange core
//!
//! Two parties stake equal amounts, an arbiter declares the winner and the
//! whole stake is paid out. This crate holds the lifecycle state machine,
//! the escrow bookkeeping, per-participant indices and the notification log,
//! plus SQLite persistence for snapshots of the whole exchange.

pub mod config;
pub mod error;
pub mod events;
pub mod exchange;
pub mod identity;
pub mod ids;
pub mod index;
pub mod ledger;
pub mod registry;
pub mod storage;
pub mod types;

pub use config::ExchangeConfig;
pub use error::{Result, WagerError};
pub use events::{Notification, NotificationKind, NotificationLog};
pub use exchange::{Exchange, SharedExchange};
pub use identity::{Authority, Identity, Role};
pub use ledger::{MemoryLedger, ValueLedger, MAX_SUPPLY};
pub use storage::Storage;
pub use types::{Category, Wager, WagerId, WagerState};

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_storage_initialization() {
        let temp_dir = tempdir().unwrap();
        let storage = Storage::new(&temp_dir.path().join("wager.db")).await.unwrap();

        let config = ExchangeConfig::single_operator("root".into());
        let exchange = storage.initialize(config.clone()).await.unwrap();
        assert_eq!(exchange.config(), &config);
        assert!(exchange.list_open().is_empty());
    }
}
