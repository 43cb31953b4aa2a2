//! Authoritative store of wager records.

use crate::error::{Result, WagerError};
use crate::identity::Identity;
use crate::types::{Wager, WagerId, WagerState};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default)]
pub struct WagerRegistry {
    wagers: BTreeMap<WagerId, Wager>,
    open: BTreeSet<WagerId>,
}

impl WagerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: WagerId) -> Result<&Wager> {
        self.wagers.get(&id).ok_or(WagerError::NotFound(id))
    }

    pub fn contains(&self, id: WagerId) -> bool {
        self.wagers.contains_key(&id)
    }

    /// Ids of all listed wagers, ascending.
    pub fn list_open(&self) -> Vec<WagerId> {
        self.open.iter().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Wager> {
        self.wagers.values()
    }

    pub fn len(&self) -> usize {
        self.wagers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wagers.is_empty()
    }

    /// Total value that should be in custody for the recorded wagers.
    pub fn escrowed(&self) -> u64 {
        self.wagers.values().map(Wager::escrowed).sum()
    }

    pub(crate) fn insert(&mut self, wager: Wager) -> Result<()> {
        if wager.id.is_none() || self.wagers.contains_key(&wager.id) {
            return Err(WagerError::internal(format!(
                "wager id {} is not available",
                wager.id
            )));
        }
        if wager.state == WagerState::Listed {
            self.open.insert(wager.id);
        }
        self.wagers.insert(wager.id, wager);
        Ok(())
    }

    /// Fails with `InvalidState` unless the wager is currently in `expected`.
    pub(crate) fn ensure_state(
        &self,
        id: WagerId,
        expected: WagerState,
        operation: &'static str,
    ) -> Result<&Wager> {
        let wager = self.get(id)?;
        if wager.state != expected {
            return Err(WagerError::InvalidState {
                id,
                state: wager.state,
                operation,
            });
        }
        Ok(wager)
    }

    pub(crate) fn transition(
        &mut self,
        id: WagerId,
        next: WagerState,
        operation: &'static str,
        apply: impl FnOnce(&mut Wager),
    ) -> Result<&Wager> {
        let wager = self.wagers.get_mut(&id).ok_or(WagerError::NotFound(id))?;
        if !wager.state.can_transition_to(next) {
            return Err(WagerError::InvalidState {
                id,
                state: wager.state,
                operation,
            });
        }
        apply(wager);
        wager.state = next;
        if next != WagerState::Listed {
            self.open.remove(&id);
        }
        Ok(wager)
    }

    pub(crate) fn set_arbiter(&mut self, id: WagerId, arbiter: Identity) -> Result<Identity> {
        let wager = self.wagers.get_mut(&id).ok_or(WagerError::NotFound(id))?;
        if wager.state != WagerState::Listed {
            return Err(WagerError::InvalidState {
                id,
                state: wager.state,
                operation: "reassign arbiter of",
            });
        }
        Ok(std::mem::replace(&mut wager.arbiter, arbiter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn wager(id: u64) -> Wager {
        Wager {
            id: WagerId(id),
            proposer: "alice".into(),
            counterparty: None,
            stake: 25,
            state: WagerState::Listed,
            arbiter: "judge".into(),
            winner: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_open_set_follows_transitions() {
        let mut registry = WagerRegistry::new();
        registry.insert(wager(3)).unwrap();
        registry.insert(wager(1)).unwrap();
        registry.insert(wager(2)).unwrap();
        assert_eq!(registry.list_open(), vec![WagerId(1), WagerId(2), WagerId(3)]);
        assert_eq!(registry.escrowed(), 75);

        registry
            .transition(WagerId(2), WagerState::Active, "accept", |w| {
                w.counterparty = Some("bob".into())
            })
            .unwrap();
        assert_eq!(registry.list_open(), vec![WagerId(1), WagerId(3)]);
        assert_eq!(registry.escrowed(), 100);
    }

    #[test]
    fn test_illegal_transition_leaves_record_untouched() {
        let mut registry = WagerRegistry::new();
        registry.insert(wager(1)).unwrap();

        let err = registry
            .transition(WagerId(1), WagerState::Settled, "settle", |w| {
                w.winner = Some("alice".into())
            })
            .unwrap_err();
        assert_eq!(err.kind(), "InvalidState");
        assert_eq!(registry.get(WagerId(1)).unwrap().winner, None);
        assert_eq!(registry.list_open(), vec![WagerId(1)]);
    }

    #[test]
    fn test_duplicate_and_sentinel_ids_rejected() {
        let mut registry = WagerRegistry::new();
        registry.insert(wager(1)).unwrap();
        assert!(registry.insert(wager(1)).is_err());
        assert!(registry.insert(wager(0)).is_err());
        assert!(matches!(
            registry.get(WagerId(9)),
            Err(WagerError::NotFound(WagerId(9)))
        ));
    }

    #[test]
    fn test_set_arbiter_only_while_listed() {
        let mut registry = WagerRegistry::new();
        registry.insert(wager(1)).unwrap();
        let previous = registry.set_arbiter(WagerId(1), "ref".into()).unwrap();
        assert_eq!(previous, Identity::new("judge"));

        registry
            .transition(WagerId(1), WagerState::Canceled, "cancel", |_| {})
            .unwrap();
        assert!(registry.set_arbiter(WagerId(1), "other".into()).is_err());
    }
}
