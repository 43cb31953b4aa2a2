use super::{from_sql_amount, to_sql_amount};
use crate::error::{Result, WagerError};
use crate::identity::Identity;
use crate::types::{Wager, WagerId, WagerState};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection};

struct WagerRow {
    id: i64,
    proposer: String,
    counterparty: Option<String>,
    stake: i64,
    state: String,
    arbiter: String,
    winner: Option<String>,
    created_at: String,
}

impl WagerRow {
    fn into_wager(self) -> Result<Wager> {
        let state = self
            .state
            .parse::<WagerState>()
            .map_err(WagerError::internal)?;
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(|e| WagerError::internal(format!("Corrupt timestamp: {}", e)))?
            .with_timezone(&Utc);

        Ok(Wager {
            id: WagerId(from_sql_amount(self.id)?),
            proposer: Identity::new(self.proposer),
            counterparty: self.counterparty.map(Identity::new),
            stake: from_sql_amount(self.stake)?,
            state,
            arbiter: Identity::new(self.arbiter),
            winner: self.winner.map(Identity::new),
            created_at,
        })
    }
}

pub struct WagerStore<'a> {
    conn: &'a Connection,
}

impl<'a> WagerStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn save_wager(&self, wager: &Wager) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO wagers
             (id, proposer, counterparty, stake, state, arbiter, winner, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                to_sql_amount(wager.id.get())?,
                wager.proposer.as_str(),
                wager.counterparty.as_ref().map(Identity::as_str),
                to_sql_amount(wager.stake)?,
                wager.state.as_str(),
                wager.arbiter.as_str(),
                wager.winner.as_ref().map(Identity::as_str),
                wager
                    .created_at
                    .to_rfc3339_opts(SecondsFormat::Nanos, true),
            ],
        )?;

        Ok(())
    }

    pub fn load_all(&self) -> Result<Vec<Wager>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, proposer, counterparty, stake, state, arbiter, winner, created_at
             FROM wagers ORDER BY id ASC",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(WagerRow {
                id: row.get(0)?,
                proposer: row.get(1)?,
                counterparty: row.get(2)?,
                stake: row.get(3)?,
                state: row.get(4)?,
                arbiter: row.get(5)?,
                winner: row.get(6)?,
                created_at: row.get(7)?,
            })
        })?;

        let mut wagers = Vec::new();
        for row in rows {
            wagers.push(row?.into_wager()?);
        }

        Ok(wagers)
    }
}
