//! Identities and the role checks every exchange operation goes through.

use crate::error::{Result, WagerError};
use crate::types::Wager;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of an account on the value ledger. The empty name is the zero identity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into().trim().to_string())
    }

    pub fn zero() -> Self {
        Self(String::new())
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Rejects the zero identity where a real account is required.
    pub fn require(&self, what: &str) -> Result<&Self> {
        if self.is_zero() {
            return Err(WagerError::invalid_argument(format!(
                "{} must not be the zero identity",
                what
            )));
        }
        Ok(self)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identity {
    fn from(name: &str) -> Self {
        Identity::new(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Owner,
    /// Arbiter of record for the wager in question
    Arbiter,
    EmergencyArbiter,
    /// Proposer of a wager that no counterparty has accepted yet
    Proposer,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Owner => "the owner",
            Role::Arbiter => "the wager's arbiter",
            Role::EmergencyArbiter => "the emergency arbiter",
            Role::Proposer => "the wager's proposer",
        };
        f.write_str(name)
    }
}

/// Privileged identities configured when the exchange is deployed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authority {
    pub owner: Identity,
    pub emergency_arbiter: Identity,
}

impl Authority {
    pub fn new(owner: Identity, emergency_arbiter: Identity) -> Self {
        Self {
            owner,
            emergency_arbiter,
        }
    }

    pub fn holds(&self, caller: &Identity, role: Role, wager: Option<&Wager>) -> bool {
        if caller.is_zero() {
            return false;
        }
        match role {
            Role::Owner => caller == &self.owner,
            Role::EmergencyArbiter => caller == &self.emergency_arbiter,
            Role::Arbiter => wager.map_or(false, |w| caller == &w.arbiter),
            Role::Proposer => {
                wager.map_or(false, |w| caller == &w.proposer && w.counterparty.is_none())
            }
        }
    }

    pub fn authorize(&self, caller: &Identity, role: Role, wager: Option<&Wager>) -> Result<()> {
        self.authorize_any(caller, &[role], wager)
    }

    pub fn authorize_any(
        &self,
        caller: &Identity,
        roles: &[Role],
        wager: Option<&Wager>,
    ) -> Result<()> {
        if roles.iter().any(|&role| self.holds(caller, role, wager)) {
            return Ok(());
        }
        tracing::warn!("Rejected '{}': requires {:?}", caller, roles);
        Err(WagerError::unauthorized(caller, roles))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{WagerId, WagerState};
    use chrono::Utc;

    fn listed() -> Wager {
        Wager {
            id: WagerId(1),
            proposer: "alice".into(),
            counterparty: None,
            stake: 10,
            state: WagerState::Listed,
            arbiter: "judge".into(),
            winner: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_identity_zero() {
        assert!(Identity::zero().is_zero());
        assert!(Identity::new("   ").is_zero());
        assert!(!Identity::new("bob").is_zero());
        assert!(Identity::zero().require("arbiter").is_err());
    }

    #[test]
    fn test_roles() {
        let authority = Authority::new("root".into(), "rescue".into());
        let mut wager = listed();

        assert!(authority.authorize(&"root".into(), Role::Owner, None).is_ok());
        assert!(authority.authorize(&"alice".into(), Role::Owner, None).is_err());
        assert!(authority
            .authorize(&"judge".into(), Role::Arbiter, Some(&wager))
            .is_ok());
        assert!(authority
            .authorize(&"alice".into(), Role::Proposer, Some(&wager))
            .is_ok());

        wager.counterparty = Some("bob".into());
        assert!(authority
            .authorize(&"alice".into(), Role::Proposer, Some(&wager))
            .is_err());
        assert!(authority
            .authorize_any(
                &"rescue".into(),
                &[Role::EmergencyArbiter, Role::Proposer],
                Some(&wager)
            )
            .is_ok());
    }

    #[test]
    fn test_zero_identity_holds_nothing() {
        let authority = Authority::new(Identity::zero(), Identity::zero());
        let err = authority
            .authorize(&Identity::zero(), Role::Owner, None)
            .unwrap_err();
        assert_eq!(err.kind(), "Unauthorized");
    }
}
