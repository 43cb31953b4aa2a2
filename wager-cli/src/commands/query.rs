use super::{parse_id, require_caller};
use comfy_table::{presets::UTF8_FULL, Table};
use wager_core::{Category, Identity, Result, Storage, Wager, WagerError};

fn wager_table<'a>(wagers: impl IntoIterator<Item = &'a Wager>) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec![
        "ID",
        "State",
        "Proposer",
        "Counterparty",
        "Stake",
        "Arbiter",
        "Created",
    ]);

    for wager in wagers {
        table.add_row(vec![
            wager.id.get().to_string(),
            wager.state.to_string(),
            wager.proposer.to_string(),
            wager
                .counterparty
                .as_ref()
                .map_or_else(|| "-".to_string(), Identity::to_string),
            wager.stake.to_string(),
            wager.arbiter.to_string(),
            wager.created_at.format("%Y-%m-%d %H:%M").to_string(),
        ]);
    }

    table
}

pub async fn show_wager(storage: &Storage, id: &str) -> Result<()> {
    let id = parse_id(id)?;
    let exchange = storage.load().await?;
    let wager = exchange.read(id)?;

    println!("Wager {}", id);
    println!("═══════════════════════════════════");
    println!("State: {}", wager.state);
    println!("Proposer: {}", wager.proposer);
    match &wager.counterparty {
        Some(counterparty) => println!("Counterparty: {}", counterparty),
        None => println!("Counterparty: waiting..."),
    }
    println!("Stake: {}", wager.stake);
    println!("In custody: {}", wager.escrowed());
    println!("Arbiter: {}", wager.arbiter);
    println!(
        "Created: {}",
        wager.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    if let Some(winner) = &wager.winner {
        println!("Winner!: {}", winner);
    }

    Ok(())
}

pub async fn list_open(storage: &Storage) -> Result<()> {
    let exchange = storage.load().await?;
    let open = exchange.list_open();

    if open.is_empty() {
        println!("No open wagers.");
        return Ok(());
    }

    let wagers = open
        .into_iter()
        .map(|id| exchange.read(id))
        .collect::<Result<Vec<_>>>()?;

    println!("Open Wagers:");
    println!("{}", wager_table(wagers));

    Ok(())
}

pub async fn list_mine(
    storage: &Storage,
    caller: Option<&str>,
    category: Option<&str>,
) -> Result<()> {
    let who = require_caller(caller)?;
    let categories = match category {
        Some(raw) => vec![raw
            .parse::<Category>()
            .map_err(WagerError::invalid_argument)?],
        None => Category::ALL.to_vec(),
    };
    let exchange = storage.load().await?;

    for category in categories {
        let ids = exchange.participant_wagers(&who, category);
        if ids.is_empty() {
            continue;
        }
        let wagers = ids
            .into_iter()
            .map(|id| exchange.read(id))
            .collect::<Result<Vec<_>>>()?;

        println!("{} ({}):", category, wagers.len());
        println!("{}", wager_table(wagers));
    }

    Ok(())
}

pub async fn show_history(storage: &Storage, wager: Option<&str>, since: u64) -> Result<()> {
    let exchange = storage.load().await?;
    let log = exchange.notifications();

    let entries: Vec<_> = match wager {
        Some(raw) => {
            let id = parse_id(raw)?;
            log.for_wager(id)
                .into_iter()
                .filter(|n| n.seq > since)
                .collect()
        }
        None => log.since(since).iter().collect(),
    };

    if entries.is_empty() {
        println!("No notifications.");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Seq", "Wager", "Event", "Details", "Time"]);

    for notification in entries {
        table.add_row(vec![
            notification.seq.to_string(),
            notification.wager_id.get().to_string(),
            notification.kind.name().to_string(),
            serde_json::to_string(&notification.kind)?,
            notification.timestamp.format("%H:%M:%S").to_string(),
        ]);
    }

    println!("{}", table);

    Ok(())
}
