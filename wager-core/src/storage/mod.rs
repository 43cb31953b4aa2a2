pub mod account_store;
pub mod event_store;
pub mod wager_store;

pub use account_store::AccountStore;
pub use event_store::NotificationStore;
pub use wager_store::WagerStore;

use crate::config::ExchangeConfig;
use crate::error::{Result, WagerError};
use crate::exchange::Exchange;
use crate::ledger::{MemoryLedger, ValueLedger};
use crate::types::WagerId;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::path::Path;
use std::time::Duration;
use tokio::sync::Mutex;

const CONFIG_KEY: &str = "config";
const LAST_ISSUED_KEY: &str = "last_issued";
const CUSTODY_KEY: &str = "custody";

/// SQLite snapshot store for an exchange backed by a [`MemoryLedger`].
pub struct Storage {
    conn: Mutex<Connection>,
}

impl Storage {
    pub async fn new(db_path: &Path) -> Result<Self> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| WagerError::internal(format!("Failed to create directory: {}", e)))?;
        }

        let conn = Connection::open(db_path)?;
        // other processes may hold the write lock for one command
        conn.busy_timeout(Duration::from_secs(5))?;
        Self::from_connection(conn).await
    }

    pub async fn in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?).await
    }

    async fn from_connection(conn: Connection) -> Result<Self> {
        let storage = Self {
            conn: Mutex::new(conn),
        };
        storage.init_schema().await?;
        Ok(storage)
    }

    async fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock().await;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS accounts (
                identity TEXT PRIMARY KEY,
                balance INTEGER NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS wagers (
                id INTEGER PRIMARY KEY,
                proposer TEXT NOT NULL,
                counterparty TEXT,
                stake INTEGER NOT NULL,
                state TEXT NOT NULL,
                arbiter TEXT NOT NULL,
                winner TEXT,
                created_at TEXT NOT NULL
            )",
            [],
        )?;

        // Append-only
        conn.execute(
            "CREATE TABLE IF NOT EXISTS notifications (
                seq INTEGER PRIMARY KEY,
                wager_id INTEGER NOT NULL,
                kind TEXT NOT NULL,
                payload TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )",
            [],
        )?;

        Ok(())
    }

    pub async fn is_initialized(&self) -> Result<bool> {
        let conn = self.conn.lock().await;
        Ok(read_setting(&conn, CONFIG_KEY)?.is_some())
    }

    /// Create and persist a fresh exchange. Fails if one already exists.
    pub async fn initialize(&self, config: ExchangeConfig) -> Result<Exchange<MemoryLedger>> {
        let exchange = Exchange::new(config, MemoryLedger::new())?;

        let mut conn = self.conn.lock().await;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if read_setting(&tx, CONFIG_KEY)?.is_some() {
            return Err(WagerError::config("Exchange is already initialized"));
        }
        write_snapshot(&tx, &exchange)?;
        tx.commit()?;

        tracing::info!("Initialized exchange owned by '{}'", exchange.config().owner);
        Ok(exchange)
    }

    /// Write the whole exchange in one transaction. Fails with `Conflict` if
    /// the database has moved past the history this snapshot was loaded with.
    pub async fn save(&self, exchange: &Exchange<MemoryLedger>) -> Result<()> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        write_snapshot(&tx, exchange)?;
        tx.commit()?;
        Ok(())
    }

    pub async fn load(&self) -> Result<Exchange<MemoryLedger>> {
        let conn = self.conn.lock().await;
        read_snapshot(&conn)
    }

    /// Load, mutate and save under one write lock on the database.
    ///
    /// The transaction starts as `IMMEDIATE`, so a second process running
    /// `apply` on the same file waits for this one to commit and then sees
    /// its result. If `op` fails nothing is written.
    pub async fn apply<T>(
        &self,
        op: impl FnOnce(&mut Exchange<MemoryLedger>) -> Result<T>,
    ) -> Result<T> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut exchange = read_snapshot(&tx)?;
        let value = op(&mut exchange)?;
        write_snapshot(&tx, &exchange)?;

        tx.commit()?;
        Ok(value)
    }
}

fn read_snapshot(conn: &Connection) -> Result<Exchange<MemoryLedger>> {
    let config_json = read_setting(conn, CONFIG_KEY)?.ok_or_else(|| {
        WagerError::config("Exchange is not initialized; run `wager init` first")
    })?;
    let config: ExchangeConfig = serde_json::from_str(&config_json)?;
    let last_issued = parse_setting(conn, LAST_ISSUED_KEY)?;
    let custody = parse_setting(conn, CUSTODY_KEY)?;

    let balances = AccountStore::new(conn).load_all()?;
    let wagers = WagerStore::new(conn).load_all()?;
    let notifications = NotificationStore::new(conn).load_all()?;

    Exchange::restore(
        config,
        MemoryLedger::from_parts(balances, custody),
        wagers,
        WagerId(last_issued),
        notifications,
    )
}

fn write_snapshot(conn: &Connection, exchange: &Exchange<MemoryLedger>) -> Result<()> {
    let notification_store = NotificationStore::new(conn);
    let stored = notification_store.last_seq()?;
    if stored > exchange.notifications().last_seq() {
        return Err(WagerError::Conflict(format!(
            "database holds notification {}, snapshot ends at {}",
            stored,
            exchange.notifications().last_seq()
        )));
    }
    for notification in exchange.notifications().all() {
        notification_store.append(notification)?;
    }

    write_setting(conn, CONFIG_KEY, &serde_json::to_string(exchange.config())?)?;
    write_setting(
        conn,
        LAST_ISSUED_KEY,
        &exchange.last_issued().get().to_string(),
    )?;
    write_setting(conn, CUSTODY_KEY, &exchange.ledger().custody().to_string())?;

    AccountStore::new(conn).replace_all(exchange.ledger())?;

    let wager_store = WagerStore::new(conn);
    for wager in exchange.registry().iter() {
        wager_store.save_wager(wager)?;
    }

    tracing::debug!(
        "Saved exchange snapshot ({} wagers, last notification {})",
        exchange.registry().len(),
        exchange.notifications().last_seq()
    );
    Ok(())
}

pub(crate) fn to_sql_amount(value: u64) -> Result<i64> {
    i64::try_from(value)
        .map_err(|_| WagerError::internal(format!("value {} does not fit in storage", value)))
}

pub(crate) fn from_sql_amount(value: i64) -> Result<u64> {
    u64::try_from(value)
        .map_err(|_| WagerError::internal(format!("negative value {} in storage", value)))
}

fn read_setting(conn: &Connection, key: &str) -> Result<Option<String>> {
    let value = conn
        .query_row(
            "SELECT value FROM settings WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value)
}

fn parse_setting(conn: &Connection, key: &str) -> Result<u64> {
    match read_setting(conn, key)? {
        Some(value) => value
            .parse()
            .map_err(|e| WagerError::internal(format!("Corrupt setting '{}': {}", key, e))),
        None => Ok(0),
    }
}

fn write_setting(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
        params![key, value],
    )?;
    Ok(())
}
