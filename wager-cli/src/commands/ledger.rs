use wager_core::{Identity, Result, Storage, ValueLedger};

pub async fn deposit(storage: &Storage, who: &str, amount: u64) -> Result<()> {
    let who = Identity::new(who);
    let balance = storage.apply(|ex| ex.deposit(&who, amount)).await?;

    println!("Deposited {} to '{}'", amount, who);
    println!("  Balance: {}", balance);

    Ok(())
}

pub async fn withdraw(storage: &Storage, who: &str, amount: u64) -> Result<()> {
    let who = Identity::new(who);
    let balance = storage.apply(|ex| ex.withdraw(&who, amount)).await?;

    println!("Withdrew {} from '{}'", amount, who);
    println!("  Balance: {}", balance);

    Ok(())
}

pub async fn show_balance(storage: &Storage, who: &str) -> Result<()> {
    let who = Identity::new(who);
    let exchange = storage.load().await?;

    let staked: u64 = exchange
        .registry()
        .iter()
        .filter(|w| w.is_participant(&who))
        .filter(|w| !w.state.is_terminal())
        .map(|w| w.stake)
        .sum();

    println!("Balance for '{}':", who);
    println!("  Available: {}", exchange.ledger().balance_of(&who));
    println!("  Staked: {}", staked);
    println!("  Exchange custody: {}", exchange.ledger().custody());

    Ok(())
}
