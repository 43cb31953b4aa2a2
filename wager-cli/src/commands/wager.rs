use super::{parse_id, require_caller};
use wager_core::{Identity, Result, Storage};

pub async fn create_wager(
    storage: &Storage,
    caller: Option<&str>,
    stake: u64,
    arbiter: Option<&str>,
) -> Result<()> {
    let proposer = require_caller(caller)?;

    let wager = storage
        .apply(|ex| {
            let id = ex.create(&proposer, stake, arbiter.map(Identity::new))?;
            Ok(ex.read(id)?.clone())
        })
        .await?;

    println!("Created wager {}", wager.id);
    println!("Stake: {} (held in custody)", wager.stake);
    println!("Arbiter: {}", wager.arbiter);
    println!();
    println!("Share this command with a counterparty:");
    println!("wager --as <them> accept {}", wager.id.get());

    Ok(())
}

pub async fn accept_wager(storage: &Storage, caller: Option<&str>, id: &str) -> Result<()> {
    let counterparty = require_caller(caller)?;
    let id = parse_id(id)?;

    let wager = storage
        .apply(|ex| {
            ex.accept(&counterparty, id)?;
            Ok(ex.read(id)?.clone())
        })
        .await?;

    println!("Accepted wager {} against '{}'", id, wager.proposer);
    println!("Pot: {}", wager.escrowed());
    println!("Waiting for '{}' to settle", wager.arbiter);

    Ok(())
}

pub async fn settle_wager(
    storage: &Storage,
    caller: Option<&str>,
    id: &str,
    winner: &str,
) -> Result<()> {
    let arbiter = require_caller(caller)?;
    let id = parse_id(id)?;
    let winner = Identity::new(winner);

    let payout = storage
        .apply(|ex| {
            let payout = ex.read(id)?.stake.saturating_mul(2);
            ex.settle(&arbiter, id, &winner)?;
            Ok(payout)
        })
        .await?;

    println!("Settled wager {}", id);
    println!("Winner!: {} (+{})", winner, payout);

    Ok(())
}

pub async fn cancel_wager(storage: &Storage, caller: Option<&str>, id: &str) -> Result<()> {
    let proposer = require_caller(caller)?;
    let id = parse_id(id)?;

    let refund = storage
        .apply(|ex| {
            ex.cancel(&proposer, id)?;
            Ok(ex.read(id)?.stake)
        })
        .await?;

    println!("Canceled wager {}; refunded {} to '{}'", id, refund, proposer);

    Ok(())
}

pub async fn reassign_arbiter(
    storage: &Storage,
    caller: Option<&str>,
    id: &str,
    arbiter: &str,
) -> Result<()> {
    let caller = require_caller(caller)?;
    let id = parse_id(id)?;
    let arbiter = Identity::new(arbiter);

    storage
        .apply(|ex| ex.reassign_arbiter(&caller, id, arbiter.clone()))
        .await?;

    println!("Wager {} is now arbitrated by '{}'", id, arbiter);

    Ok(())
}
