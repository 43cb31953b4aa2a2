use super::{from_sql_amount, to_sql_amount};
use crate::error::{Result, WagerError};
use crate::events::Notification;
use rusqlite::{params, Connection, OptionalExtension};

pub struct NotificationStore<'a> {
    conn: &'a Connection,
}

impl<'a> NotificationStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Store a notification. A sequence number that is already stored must
    /// carry the same notification, otherwise the snapshot is stale.
    pub fn append(&self, notification: &Notification) -> Result<()> {
        let seq = to_sql_amount(notification.seq)?;
        if let Some(stored) = self.get(seq)? {
            if &stored != notification {
                return Err(WagerError::Conflict(format!(
                    "notification {} is already stored as {} on wager {}",
                    notification.seq,
                    stored.kind.name(),
                    stored.wager_id
                )));
            }
            return Ok(());
        }

        let payload = serde_json::to_string(notification)?;
        self.conn.execute(
            "INSERT INTO notifications (seq, wager_id, kind, payload, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                seq,
                to_sql_amount(notification.wager_id.get())?,
                notification.kind.name(),
                payload,
                notification.timestamp.timestamp(),
            ],
        )?;

        Ok(())
    }

    fn get(&self, seq: i64) -> Result<Option<Notification>> {
        let payload: Option<String> = self
            .conn
            .query_row(
                "SELECT payload FROM notifications WHERE seq = ?1",
                params![seq],
                |row| row.get(0),
            )
            .optional()?;

        match payload {
            Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    /// Highest stored sequence number, 0 when the log is empty.
    pub fn last_seq(&self) -> Result<u64> {
        let seq: Option<i64> =
            self.conn
                .query_row("SELECT MAX(seq) FROM notifications", [], |row| row.get(0))?;
        seq.map_or(Ok(0), from_sql_amount)
    }

    pub fn load_all(&self) -> Result<Vec<Notification>> {
        let mut stmt = self
            .conn
            .prepare("SELECT payload FROM notifications ORDER BY seq ASC")?;

        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut notifications = Vec::new();
        for payload in rows {
            notifications.push(serde_json::from_str(&payload?)?);
        }

        Ok(notifications)
    }
}
