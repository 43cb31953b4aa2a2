use super::{from_sql_amount, to_sql_amount};
use crate::error::Result;
use crate::identity::Identity;
use crate::ledger::MemoryLedger;
use rusqlite::Connection;
use std::collections::BTreeMap;

pub struct AccountStore<'a> {
    conn: &'a Connection,
}

impl<'a> AccountStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn replace_all(&self, ledger: &MemoryLedger) -> Result<()> {
        self.conn.execute("DELETE FROM accounts", [])?;

        let mut stmt = self
            .conn
            .prepare("INSERT INTO accounts (identity, balance) VALUES (?1, ?2)")?;
        for (who, balance) in ledger.accounts() {
            stmt.execute(rusqlite::params![who.as_str(), to_sql_amount(balance)?])?;
        }

        Ok(())
    }

    pub fn load_all(&self) -> Result<BTreeMap<Identity, u64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT identity, balance FROM accounts")?;

        let rows = stmt.query_map([], |row| {
            let identity: String = row.get(0)?;
            let balance: i64 = row.get(1)?;
            Ok((identity, balance))
        })?;

        let mut balances = BTreeMap::new();
        for row in rows {
            let (identity, balance) = row?;
            balances.insert(Identity::new(identity), from_sql_amount(balance)?);
        }

        Ok(balances)
    }
}
