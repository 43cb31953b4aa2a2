use crate::error::{Result, WagerError};
use crate::identity::{Authority, Identity};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeConfig {
    pub owner: Identity,
    pub default_arbiter: Identity,
    pub emergency_arbiter: Identity,
}

impl ExchangeConfig {
    pub fn new(owner: Identity, default_arbiter: Identity, emergency_arbiter: Identity) -> Self {
        Self {
            owner,
            default_arbiter,
            emergency_arbiter,
        }
    }

    /// Owner arbitrates and handles emergencies itself.
    pub fn single_operator(owner: Identity) -> Self {
        Self::new(owner.clone(), owner.clone(), owner)
    }

    pub fn validate(&self) -> Result<()> {
        if self.owner.is_zero() {
            return Err(WagerError::config("Owner cannot be the zero identity"));
        }

        if self.default_arbiter.is_zero() {
            return Err(WagerError::config(
                "Default arbiter cannot be the zero identity",
            ));
        }

        if self.emergency_arbiter.is_zero() {
            return Err(WagerError::config(
                "Emergency arbiter cannot be the zero identity",
            ));
        }

        Ok(())
    }

    pub fn authority(&self) -> Authority {
        Authority::new(self.owner.clone(), self.emergency_arbiter.clone())
    }
}
