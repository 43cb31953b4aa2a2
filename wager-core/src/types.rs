use crate::identity::Identity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Wager identifier. `0` is never issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WagerId(pub u64);

impl WagerId {
    pub const NONE: WagerId = WagerId(0);

    pub fn get(self) -> u64 {
        self.0
    }

    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for WagerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl FromStr for WagerId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim_start_matches('#').parse().map(WagerId)
    }
}

/// Lifecycle state of a wager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WagerState {
    Listed,
    Active,
    Canceled,
    Settled,
}

impl WagerState {
    pub fn is_terminal(self) -> bool {
        matches!(self, WagerState::Canceled | WagerState::Settled)
    }

    pub fn can_transition_to(self, next: WagerState) -> bool {
        matches!(
            (self, next),
            (WagerState::Listed, WagerState::Active)
                | (WagerState::Listed, WagerState::Canceled)
                | (WagerState::Active, WagerState::Settled)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WagerState::Listed => "listed",
            WagerState::Active => "active",
            WagerState::Canceled => "canceled",
            WagerState::Settled => "settled",
        }
    }
}

impl fmt::Display for WagerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WagerState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "listed" => Ok(WagerState::Listed),
            "active" => Ok(WagerState::Active),
            "canceled" => Ok(WagerState::Canceled),
            "settled" => Ok(WagerState::Settled),
            other => Err(format!("unknown wager state '{}'", other)),
        }
    }
}

/// A single two-party staked bet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wager {
    pub id: WagerId,
    pub proposer: Identity,
    pub counterparty: Option<Identity>,
    pub stake: u64,
    pub state: WagerState,
    pub arbiter: Identity,
    pub winner: Option<Identity>,
    pub created_at: DateTime<Utc>,
}

impl Wager {
    pub fn is_participant(&self, who: &Identity) -> bool {
        &self.proposer == who || self.counterparty.as_ref() == Some(who)
    }

    /// Value the exchange holds in custody for this wager.
    pub fn escrowed(&self) -> u64 {
        match self.state {
            WagerState::Listed => self.stake,
            WagerState::Active => self.stake * 2,
            WagerState::Canceled | WagerState::Settled => 0,
        }
    }

    /// The participant who did not win, once settled.
    pub fn loser(&self) -> Option<&Identity> {
        let winner = self.winner.as_ref()?;
        if winner == &self.proposer {
            self.counterparty.as_ref()
        } else {
            Some(&self.proposer)
        }
    }
}

/// Per-participant view of wagers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    Open,
    Active,
    Won,
    Lost,
    Canceled,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Open,
        Category::Active,
        Category::Won,
        Category::Lost,
        Category::Canceled,
    ];
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Open => "open",
            Category::Active => "active",
            Category::Won => "won",
            Category::Lost => "lost",
            Category::Canceled => "canceled",
        };
        f.write_str(name)
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "open" => Ok(Category::Open),
            "active" => Ok(Category::Active),
            "won" => Ok(Category::Won),
            "lost" => Ok(Category::Lost),
            "canceled" | "cancelled" => Ok(Category::Canceled),
            other => Err(format!("unknown category '{}'", other)),
        }
    }
}
