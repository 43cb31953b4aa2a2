use super::require_caller;
use clap::Subcommand;
use wager_core::{ExchangeConfig, Identity, Result, Storage};

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show owner and arbiters
    Show,
    /// Change the arbiter used when a wager names none (owner only)
    DefaultArbiter { arbiter: String },
    /// Change the emergency arbiter (owner only)
    EmergencyArbiter { arbiter: String },
}

pub async fn init(
    storage: &Storage,
    owner: &str,
    arbiter: Option<&str>,
    emergency: Option<&str>,
) -> Result<()> {
    let owner = Identity::new(owner);
    let config = ExchangeConfig::new(
        owner.clone(),
        arbiter.map_or_else(|| owner.clone(), Identity::new),
        emergency.map_or_else(|| owner.clone(), Identity::new),
    );
    config.validate()?;

    let exchange = storage.initialize(config).await?;
    let config = exchange.config();

    println!("Initialized exchange");
    println!("  Owner: {}", config.owner);
    println!("  Default arbiter: {}", config.default_arbiter);
    println!("  Emergency arbiter: {}", config.emergency_arbiter);

    Ok(())
}

pub async fn handle_config_command(
    cmd: ConfigCommands,
    storage: &Storage,
    caller: Option<&str>,
) -> Result<()> {
    match cmd {
        ConfigCommands::Show => {
            let exchange = storage.load().await?;
            let config = exchange.config();
            println!("Owner: {}", config.owner);
            println!("Default arbiter: {}", config.default_arbiter);
            println!("Emergency arbiter: {}", config.emergency_arbiter);
            println!("Wagers issued: {}", exchange.last_issued().get());
        }

        ConfigCommands::DefaultArbiter { arbiter } => {
            let caller = require_caller(caller)?;
            let arbiter = storage
                .apply(|ex| {
                    ex.set_default_arbiter(&caller, Identity::new(arbiter))?;
                    Ok(ex.config().default_arbiter.clone())
                })
                .await?;
            println!("Default arbiter is now '{}'", arbiter);
        }

        ConfigCommands::EmergencyArbiter { arbiter } => {
            let caller = require_caller(caller)?;
            let arbiter = storage
                .apply(|ex| {
                    ex.set_emergency_arbiter(&caller, Identity::new(arbiter))?;
                    Ok(ex.config().emergency_arbiter.clone())
                })
                .await?;
            println!("Emergency arbiter is now '{}'", arbiter);
        }
    }

    Ok(())
}
