//! Per-participant views over the registry.

use crate::identity::Identity;
use crate::registry::WagerRegistry;
use crate::types::{Category, Wager, WagerId, WagerState};
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParticipantIndex {
    entries: HashMap<(Identity, Category), BTreeSet<WagerId>>,
}

impl ParticipantIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute every view from the registry.
    pub fn rebuild(registry: &WagerRegistry) -> Self {
        let mut index = Self::new();
        for wager in registry.iter() {
            for (who, category) in Self::memberships(wager) {
                index.insert(who, category, wager.id);
            }
        }
        index
    }

    /// The (identity, category) pairs a wager belongs to in its current state.
    pub fn memberships(wager: &Wager) -> Vec<(&Identity, Category)> {
        match wager.state {
            WagerState::Listed => vec![(&wager.proposer, Category::Open)],
            WagerState::Canceled => vec![(&wager.proposer, Category::Canceled)],
            WagerState::Active => {
                let mut pairs = vec![(&wager.proposer, Category::Active)];
                if let Some(counterparty) = &wager.counterparty {
                    pairs.push((counterparty, Category::Active));
                }
                pairs
            }
            WagerState::Settled => {
                let mut pairs = Vec::with_capacity(2);
                if let Some(winner) = &wager.winner {
                    pairs.push((winner, Category::Won));
                }
                if let Some(loser) = wager.loser() {
                    pairs.push((loser, Category::Lost));
                }
                pairs
            }
        }
    }

    pub fn wagers(&self, who: &Identity, category: Category) -> Vec<WagerId> {
        self.entries
            .get(&(who.clone(), category))
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn contains(&self, who: &Identity, category: Category, id: WagerId) -> bool {
        self.entries
            .get(&(who.clone(), category))
            .map_or(false, |ids| ids.contains(&id))
    }

    pub(crate) fn insert(&mut self, who: &Identity, category: Category, id: WagerId) {
        self.entries
            .entry((who.clone(), category))
            .or_default()
            .insert(id);
    }

    pub(crate) fn remove(&mut self, who: &Identity, category: Category, id: WagerId) {
        let key = (who.clone(), category);
        if let Some(ids) = self.entries.get_mut(&key) {
            ids.remove(&id);
            if ids.is_empty() {
                self.entries.remove(&key);
            }
        }
    }

    pub(crate) fn relocate(&mut self, who: &Identity, from: Category, to: Category, id: WagerId) {
        self.remove(who, from, id);
        self.insert(who, to, id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_relocate() {
        let alice = Identity::new("alice");
        let mut index = ParticipantIndex::new();
        index.insert(&alice, Category::Open, WagerId(4));
        index.insert(&alice, Category::Open, WagerId(2));
        assert_eq!(index.wagers(&alice, Category::Open), vec![WagerId(2), WagerId(4)]);

        index.relocate(&alice, Category::Open, Category::Canceled, WagerId(4));
        assert_eq!(index.wagers(&alice, Category::Open), vec![WagerId(2)]);
        assert!(index.contains(&alice, Category::Canceled, WagerId(4)));
    }

    #[test]
    fn test_settled_memberships() {
        let wager = Wager {
            id: WagerId(1),
            proposer: "alice".into(),
            counterparty: Some("bob".into()),
            stake: 10,
            state: WagerState::Settled,
            arbiter: "judge".into(),
            winner: Some("bob".into()),
            created_at: Utc::now(),
        };
        let (alice, bob) = (Identity::new("alice"), Identity::new("bob"));
        let pairs = ParticipantIndex::memberships(&wager);
        assert_eq!(pairs, vec![(&bob, Category::Won), (&alice, Category::Lost)]);
    }

    #[test]
    fn test_empty_sets_are_dropped() {
        let alice = Identity::new("alice");
        let mut index = ParticipantIndex::new();
        index.insert(&alice, Category::Open, WagerId(1));
        index.remove(&alice, Category::Open, WagerId(1));
        assert_eq!(index, ParticipantIndex::new());
    }
}
