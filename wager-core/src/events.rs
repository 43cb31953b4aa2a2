use crate::identity::Identity;
use crate::types::WagerId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What happened to a wager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum NotificationKind {
    Created {
        proposer: Identity,
        arbiter: Identity,
        stake: u64,
    },
    Accepted {
        proposer: Identity,
        counterparty: Identity,
        stake: u64,
    },
    Settled {
        winner: Identity,
        loser: Identity,
        payout: u64,
    },
    OracleUpdated {
        previous: Identity,
        arbiter: Identity,
    },
    Canceled {
        proposer: Identity,
        refund: u64,
    },
}

impl NotificationKind {
    pub fn name(&self) -> &'static str {
        match self {
            NotificationKind::Created { .. } => "Created",
            NotificationKind::Accepted { .. } => "Accepted",
            NotificationKind::Settled { .. } => "Settled",
            NotificationKind::OracleUpdated { .. } => "OracleUpdated",
            NotificationKind::Canceled { .. } => "Canceled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub seq: u64,
    pub wager_id: WagerId,
    pub kind: NotificationKind,
    pub timestamp: DateTime<Utc>,
}

/// Append-only record of wager transitions
#[derive(Debug, Clone, Default)]
pub struct NotificationLog {
    entries: Vec<Notification>,
}

impl NotificationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_entries(mut entries: Vec<Notification>) -> Self {
        entries.sort_by_key(|n| n.seq);
        Self { entries }
    }

    pub(crate) fn append(&mut self, wager_id: WagerId, kind: NotificationKind) -> &Notification {
        let seq = self.last_seq() + 1;
        tracing::debug!("Notification {} for wager {}: {}", seq, wager_id, kind.name());
        self.entries.push(Notification {
            seq,
            wager_id,
            kind,
            timestamp: Utc::now(),
        });
        &self.entries[self.entries.len() - 1]
    }

    pub fn last_seq(&self) -> u64 {
        self.entries.last().map_or(0, |n| n.seq)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn all(&self) -> &[Notification] {
        &self.entries
    }

    /// Entries with a sequence number strictly greater than `seq`.
    pub fn since(&self, seq: u64) -> &[Notification] {
        let start = self.entries.partition_point(|n| n.seq <= seq);
        &self.entries[start..]
    }

    pub fn for_wager(&self, id: WagerId) -> Vec<&Notification> {
        self.entries.iter().filter(|n| n.wager_id == id).collect()
    }
}
