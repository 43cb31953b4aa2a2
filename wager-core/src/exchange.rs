//! The wager exchange service.
//!
//! Every mutating operation runs the same pipeline: authorize the caller,
//! check the lifecycle state, move value through the ledger, update the
//! registry, update the participant index, append a notification. All
//! fallible checks happen before the single ledger call and everything after
//! it cannot fail, so a rejected invocation leaves no trace.

use crate::config::ExchangeConfig;
use crate::error::{Result, WagerError};
use crate::events::{Notification, NotificationKind, NotificationLog};
use crate::identity::{Authority, Identity, Role};
use crate::ids::IdAllocator;
use crate::index::ParticipantIndex;
use crate::ledger::{MemoryLedger, ValueLedger};
use crate::registry::WagerRegistry;
use crate::types::{Category, Wager, WagerId, WagerState};
use chrono::Utc;
use parking_lot::Mutex;
use std::sync::Arc;

/// Exchange handle shared between threads; the mutex serializes invocations.
pub type SharedExchange<L> = Arc<Mutex<Exchange<L>>>;

pub struct Exchange<L: ValueLedger> {
    config: ExchangeConfig,
    authority: Authority,
    ids: IdAllocator,
    registry: WagerRegistry,
    index: ParticipantIndex,
    log: NotificationLog,
    ledger: L,
}

impl<L: ValueLedger> Exchange<L> {
    pub fn new(config: ExchangeConfig, ledger: L) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            authority: config.authority(),
            config,
            ids: IdAllocator::new(),
            registry: WagerRegistry::new(),
            index: ParticipantIndex::new(),
            log: NotificationLog::new(),
            ledger,
        })
    }

    /// Reassemble an exchange from persisted parts. The index is rebuilt and
    /// the result is checked for consistency before it is handed out.
    pub fn restore(
        config: ExchangeConfig,
        ledger: L,
        wagers: Vec<Wager>,
        last_issued: WagerId,
        notifications: Vec<Notification>,
    ) -> Result<Self> {
        config.validate()?;
        let mut registry = WagerRegistry::new();
        for wager in wagers {
            if wager.id > last_issued {
                return Err(WagerError::internal(format!(
                    "wager {} was never issued (last issued {})",
                    wager.id, last_issued
                )));
            }
            registry.insert(wager)?;
        }

        let exchange = Self {
            authority: config.authority(),
            config,
            ids: IdAllocator::resume(last_issued),
            index: ParticipantIndex::rebuild(&registry),
            registry,
            log: NotificationLog::from_entries(notifications),
            ledger,
        };
        exchange.check_invariants()?;

        tracing::debug!(
            "Restored exchange with {} wagers, {} notifications",
            exchange.registry.len(),
            exchange.log.len()
        );
        Ok(exchange)
    }

    pub fn into_shared(self) -> SharedExchange<L> {
        Arc::new(Mutex::new(self))
    }

    pub fn create(
        &mut self,
        proposer: &Identity,
        stake: u64,
        arbiter: Option<Identity>,
    ) -> Result<WagerId> {
        self.apply_create(proposer, stake, arbiter)
            .inspect_err(|e| tracing::warn!("create by '{}' rejected: {}", proposer, e))
    }

    fn apply_create(
        &mut self,
        proposer: &Identity,
        stake: u64,
        arbiter: Option<Identity>,
    ) -> Result<WagerId> {
        proposer.require("proposer")?;
        if stake == 0 {
            return Err(WagerError::invalid_argument("stake must be greater than 0"));
        }
        let arbiter = arbiter
            .filter(|a| !a.is_zero())
            .unwrap_or_else(|| self.config.default_arbiter.clone());

        self.ledger.debit(proposer, stake)?;

        let id = self.ids.next();
        self.registry.insert(Wager {
            id,
            proposer: proposer.clone(),
            counterparty: None,
            stake,
            state: WagerState::Listed,
            arbiter: arbiter.clone(),
            winner: None,
            created_at: Utc::now(),
        })?;
        self.index.insert(proposer, Category::Open, id);
        self.log.append(
            id,
            NotificationKind::Created {
                proposer: proposer.clone(),
                arbiter: arbiter.clone(),
                stake,
            },
        );

        tracing::info!(
            "Wager {} created by '{}' for {} (arbiter '{}')",
            id,
            proposer,
            stake,
            arbiter
        );
        Ok(id)
    }

    pub fn reassign_arbiter(
        &mut self,
        caller: &Identity,
        id: WagerId,
        new_arbiter: Identity,
    ) -> Result<()> {
        self.apply_reassign_arbiter(caller, id, new_arbiter)
            .inspect_err(|e| tracing::warn!("reassign of {} by '{}' rejected: {}", id, caller, e))
    }

    fn apply_reassign_arbiter(
        &mut self,
        caller: &Identity,
        id: WagerId,
        new_arbiter: Identity,
    ) -> Result<()> {
        let wager = self.registry.get(id)?;
        new_arbiter.require("new arbiter")?;
        if wager.state != WagerState::Listed {
            return Err(WagerError::InvalidState {
                id,
                state: wager.state,
                operation: "reassign arbiter of",
            });
        }
        self.authority.authorize_any(
            caller,
            &[Role::EmergencyArbiter, Role::Proposer],
            Some(wager),
        )?;

        let previous = self.registry.set_arbiter(id, new_arbiter.clone())?;
        self.log.append(
            id,
            NotificationKind::OracleUpdated {
                previous: previous.clone(),
                arbiter: new_arbiter.clone(),
            },
        );

        tracing::info!(
            "Wager {} arbiter changed '{}' -> '{}' by '{}'",
            id,
            previous,
            new_arbiter,
            caller
        );
        Ok(())
    }

    pub fn accept(&mut self, caller: &Identity, id: WagerId) -> Result<()> {
        self.apply_accept(caller, id)
            .inspect_err(|e| tracing::warn!("accept of {} by '{}' rejected: {}", id, caller, e))
    }

    fn apply_accept(&mut self, caller: &Identity, id: WagerId) -> Result<()> {
        let wager = self.registry.ensure_state(id, WagerState::Listed, "accept")?;
        caller.require("counterparty")?;
        if caller == &wager.proposer {
            return Err(WagerError::SelfAcceptance(id));
        }
        let stake = wager.stake;
        let proposer = wager.proposer.clone();

        self.ledger.debit(caller, stake)?;

        // state was checked above and nothing has run in between
        self.registry
            .transition(id, WagerState::Active, "accept", |w| {
                w.counterparty = Some(caller.clone())
            })?;
        self.index
            .relocate(&proposer, Category::Open, Category::Active, id);
        self.index.insert(caller, Category::Active, id);
        self.log.append(
            id,
            NotificationKind::Accepted {
                proposer,
                counterparty: caller.clone(),
                stake,
            },
        );

        tracing::info!("Wager {} accepted by '{}' (custody {})", id, caller, stake * 2);
        Ok(())
    }

    pub fn settle(&mut self, caller: &Identity, id: WagerId, winner: &Identity) -> Result<()> {
        self.apply_settle(caller, id, winner)
            .inspect_err(|e| tracing::warn!("settle of {} by '{}' rejected: {}", id, caller, e))
    }

    fn apply_settle(&mut self, caller: &Identity, id: WagerId, winner: &Identity) -> Result<()> {
        let wager = self.registry.ensure_state(id, WagerState::Active, "settle")?;
        self.authority.authorize(caller, Role::Arbiter, Some(wager))?;
        if winner.is_zero() || !wager.is_participant(winner) {
            return Err(WagerError::InvalidWinner {
                id,
                winner: winner.clone(),
            });
        }
        let payout = wager.stake * 2;
        let loser = if winner == &wager.proposer {
            wager.counterparty.clone()
        } else {
            Some(wager.proposer.clone())
        }
        .ok_or_else(|| WagerError::internal(format!("active wager {} has no counterparty", id)))?;

        self.ledger.credit(winner, payout)?;

        self.registry
            .transition(id, WagerState::Settled, "settle", |w| {
                w.winner = Some(winner.clone())
            })?;
        self.index
            .relocate(winner, Category::Active, Category::Won, id);
        self.index
            .relocate(&loser, Category::Active, Category::Lost, id);
        self.log.append(
            id,
            NotificationKind::Settled {
                winner: winner.clone(),
                loser,
                payout,
            },
        );

        tracing::info!("Wager {} settled by '{}': '{}' wins {}", id, caller, winner, payout);
        Ok(())
    }

    pub fn cancel(&mut self, caller: &Identity, id: WagerId) -> Result<()> {
        self.apply_cancel(caller, id)
            .inspect_err(|e| tracing::warn!("cancel of {} by '{}' rejected: {}", id, caller, e))
    }

    fn apply_cancel(&mut self, caller: &Identity, id: WagerId) -> Result<()> {
        let wager = self.registry.ensure_state(id, WagerState::Listed, "cancel")?;
        self.authority.authorize(caller, Role::Proposer, Some(wager))?;
        let refund = wager.stake;
        let proposer = wager.proposer.clone();

        self.ledger.credit(&proposer, refund)?;

        self.registry
            .transition(id, WagerState::Canceled, "cancel", |_| {})?;
        self.index
            .relocate(&proposer, Category::Open, Category::Canceled, id);
        self.log.append(
            id,
            NotificationKind::Canceled {
                proposer: proposer.clone(),
                refund,
            },
        );

        tracing::info!("Wager {} canceled by '{}', refunded {}", id, proposer, refund);
        Ok(())
    }

    pub fn set_default_arbiter(&mut self, caller: &Identity, arbiter: Identity) -> Result<()> {
        self.authority.authorize(caller, Role::Owner, None)?;
        arbiter.require("default arbiter")?;
        tracing::info!(
            "Default arbiter changed '{}' -> '{}'",
            self.config.default_arbiter,
            arbiter
        );
        self.config.default_arbiter = arbiter;
        Ok(())
    }

    pub fn set_emergency_arbiter(&mut self, caller: &Identity, arbiter: Identity) -> Result<()> {
        self.authority.authorize(caller, Role::Owner, None)?;
        arbiter.require("emergency arbiter")?;
        tracing::info!(
            "Emergency arbiter changed '{}' -> '{}'",
            self.config.emergency_arbiter,
            arbiter
        );
        self.config.emergency_arbiter = arbiter;
        self.authority = self.config.authority();
        Ok(())
    }

    pub fn read(&self, id: WagerId) -> Result<&Wager> {
        self.registry.get(id)
    }

    pub fn list_open(&self) -> Vec<WagerId> {
        self.registry.list_open()
    }

    pub fn participant_wagers(&self, who: &Identity, category: Category) -> Vec<WagerId> {
        self.index.wagers(who, category)
    }

    pub fn notifications(&self) -> &NotificationLog {
        &self.log
    }

    pub fn config(&self) -> &ExchangeConfig {
        &self.config
    }

    pub fn registry(&self) -> &WagerRegistry {
        &self.registry
    }

    pub fn last_issued(&self) -> WagerId {
        self.ids.last_issued()
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn balance_of(&self, who: &Identity) -> u64 {
        self.ledger.balance_of(who)
    }

    /// Custody the registry expects: listed stakes plus twice the active stakes.
    pub fn custody_held(&self) -> u64 {
        self.registry.escrowed()
    }

    /// Ledger custody matches the registry and the index matches a rebuild.
    pub fn check_invariants(&self) -> Result<()> {
        let expected = self.registry.escrowed();
        let actual = self.ledger.custody();
        if expected != actual {
            return Err(WagerError::internal(format!(
                "custody mismatch: registry expects {}, ledger holds {}",
                expected, actual
            )));
        }
        if self.index != ParticipantIndex::rebuild(&self.registry) {
            return Err(WagerError::internal(
                "participant index diverged from registry",
            ));
        }
        if let Some(max) = self.registry.iter().map(|w| w.id).max() {
            if max > self.ids.last_issued() {
                return Err(WagerError::internal(format!(
                    "wager {} exceeds last issued id {}",
                    max,
                    self.ids.last_issued()
                )));
            }
        }
        Ok(())
    }
}

/// Account funding on the reference ledger. These touch balances only;
/// custody is moved by the wager operations alone.
impl Exchange<MemoryLedger> {
    pub fn deposit(&mut self, who: &Identity, amount: u64) -> Result<u64> {
        self.ledger.deposit(who, amount)
    }

    pub fn withdraw(&mut self, who: &Identity, amount: u64) -> Result<u64> {
        self.ledger.withdraw(who, amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exchange() -> Exchange<MemoryLedger> {
        let config = ExchangeConfig::new("owner".into(), "judge".into(), "rescue".into());
        let mut ledger = MemoryLedger::new();
        for who in ["alice", "bob", "carol"] {
            ledger.deposit(&Identity::new(who), 1_000).unwrap();
        }
        Exchange::new(config, ledger).unwrap()
    }

    #[test]
    fn test_create_uses_default_arbiter() {
        let mut ex = exchange();
        let alice = Identity::new("alice");

        let id = ex.create(&alice, 100, None).unwrap();
        let wager = ex.read(id).unwrap();
        assert_eq!(wager.state, WagerState::Listed);
        assert_eq!(wager.counterparty, None);
        assert_eq!(wager.arbiter, Identity::new("judge"));

        let explicit = ex.create(&alice, 100, Some("ref".into())).unwrap();
        assert_eq!(ex.read(explicit).unwrap().arbiter, Identity::new("ref"));

        let zero = ex.create(&alice, 100, Some(Identity::zero())).unwrap();
        assert_eq!(ex.read(zero).unwrap().arbiter, Identity::new("judge"));
    }

    #[test]
    fn test_create_rejects_zero_stake_and_poor_proposer() {
        let mut ex = exchange();
        let err = ex.create(&"alice".into(), 0, None).unwrap_err();
        assert_eq!(err.kind(), "InvalidArgument");

        let err = ex.create(&"dave".into(), 1, None).unwrap_err();
        assert_eq!(err.kind(), "InsufficientFunds");
        assert_eq!(ex.last_issued(), WagerId::NONE);
        assert!(ex.notifications().is_empty());
    }

    #[test]
    fn test_accept_checks_in_order() {
        let mut ex = exchange();
        let alice = Identity::new("alice");
        let id = ex.create(&alice, 100, None).unwrap();

        assert_eq!(ex.accept(&"bob".into(), WagerId(9)).unwrap_err().kind(), "NotFound");
        assert!(matches!(
            ex.accept(&alice, id),
            Err(WagerError::SelfAcceptance(_))
        ));
        assert_eq!(
            ex.accept(&"dave".into(), id).unwrap_err().kind(),
            "InsufficientFunds"
        );

        ex.accept(&"bob".into(), id).unwrap();
        let err = ex.accept(&"carol".into(), id).unwrap_err();
        assert_eq!(err.kind(), "InvalidState");
        assert_eq!(ex.balance_of(&"carol".into()), 1_000);
    }

    #[test]
    fn test_settle_requires_arbiter_and_participant() {
        let mut ex = exchange();
        let (alice, bob) = (Identity::new("alice"), Identity::new("bob"));
        let id = ex.create(&alice, 50, None).unwrap();

        assert_eq!(
            ex.settle(&"judge".into(), id, &alice).unwrap_err().kind(),
            "InvalidState"
        );
        ex.accept(&bob, id).unwrap();

        assert_eq!(
            ex.settle(&"rescue".into(), id, &alice).unwrap_err().kind(),
            "Unauthorized"
        );
        assert_eq!(
            ex.settle(&"judge".into(), id, &"carol".into())
                .unwrap_err()
                .kind(),
            "InvalidWinner"
        );

        ex.settle(&"judge".into(), id, &bob).unwrap();
        assert_eq!(ex.balance_of(&bob), 1_050);
        assert_eq!(ex.balance_of(&alice), 950);
        assert_eq!(ex.participant_wagers(&bob, Category::Won), vec![id]);
        assert_eq!(ex.participant_wagers(&alice, Category::Lost), vec![id]);
        ex.check_invariants().unwrap();
    }

    #[test]
    fn test_cancel_only_by_proposer() {
        let mut ex = exchange();
        let alice = Identity::new("alice");
        let id = ex.create(&alice, 10, None).unwrap();

        assert_eq!(ex.cancel(&"bob".into(), id).unwrap_err().kind(), "Unauthorized");
        assert_eq!(ex.cancel(&"owner".into(), id).unwrap_err().kind(), "Unauthorized");
        ex.cancel(&alice, id).unwrap();
        assert_eq!(ex.balance_of(&alice), 1_000);
        assert_eq!(ex.cancel(&alice, id).unwrap_err().kind(), "InvalidState");
    }

    #[test]
    fn test_reassign_arbiter_rules() {
        let mut ex = exchange();
        let alice = Identity::new("alice");
        let id = ex.create(&alice, 10, None).unwrap();

        assert_eq!(
            ex.reassign_arbiter(&alice, id, Identity::zero())
                .unwrap_err()
                .kind(),
            "InvalidArgument"
        );
        assert_eq!(
            ex.reassign_arbiter(&"bob".into(), id, "ref".into())
                .unwrap_err()
                .kind(),
            "Unauthorized"
        );

        ex.reassign_arbiter(&alice, id, "ref".into()).unwrap();
        ex.reassign_arbiter(&"rescue".into(), id, "ref2".into()).unwrap();
        assert_eq!(ex.read(id).unwrap().arbiter, Identity::new("ref2"));

        ex.accept(&"bob".into(), id).unwrap();
        assert_eq!(
            ex.reassign_arbiter(&"rescue".into(), id, "ref3".into())
                .unwrap_err()
                .kind(),
            "InvalidState"
        );

        let kinds: Vec<&str> = ex
            .notifications()
            .for_wager(id)
            .iter()
            .map(|n| n.kind.name())
            .collect();
        assert_eq!(
            kinds,
            vec!["Created", "OracleUpdated", "OracleUpdated", "Accepted"]
        );
    }

    #[test]
    fn test_owner_configuration() {
        let mut ex = exchange();
        assert_eq!(
            ex.set_default_arbiter(&"alice".into(), "x".into())
                .unwrap_err()
                .kind(),
            "Unauthorized"
        );
        ex.set_default_arbiter(&"owner".into(), "ref".into()).unwrap();
        let id = ex.create(&"alice".into(), 1, None).unwrap();
        assert_eq!(ex.read(id).unwrap().arbiter, Identity::new("ref"));

        ex.set_emergency_arbiter(&"owner".into(), "medic".into()).unwrap();
        assert!(ex.reassign_arbiter(&"rescue".into(), id, "a".into()).is_err());
        ex.reassign_arbiter(&"medic".into(), id, "a".into()).unwrap();
    }

    #[test]
    fn test_funding_leaves_custody_alone() {
        let mut ex = exchange();
        let alice = Identity::new("alice");
        let id = ex.create(&alice, 400, None).unwrap();

        assert_eq!(ex.deposit(&alice, 50).unwrap(), 650);
        assert_eq!(ex.withdraw(&alice, 650).unwrap(), 0);
        assert_eq!(
            ex.withdraw(&alice, 1).unwrap_err().kind(),
            "InsufficientFunds"
        );
        assert_eq!(ex.deposit(&Identity::zero(), 1).unwrap_err().kind(), "InvalidArgument");

        assert_eq!(ex.ledger().custody(), 400);
        ex.check_invariants().unwrap();
        ex.cancel(&alice, id).unwrap();
        assert_eq!(ex.balance_of(&alice), 400);
    }
}
