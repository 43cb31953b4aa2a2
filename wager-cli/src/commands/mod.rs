pub mod admin;
pub mod ledger;
pub mod query;
pub mod wager;

pub use admin::{handle_config_command, init, ConfigCommands};
pub use ledger::{deposit, show_balance, withdraw};
pub use query::{list_mine, list_open, show_history, show_wager};
pub use wager::{accept_wager, cancel_wager, create_wager, reassign_arbiter, settle_wager};

use wager_core::{Identity, Result, WagerError, WagerId};

fn parse_id(raw: &str) -> Result<WagerId> {
    let id: WagerId = raw
        .parse()
        .map_err(|_| WagerError::invalid_argument(format!("'{}' is not a wager id", raw)))?;
    if id.is_none() {
        return Err(WagerError::NotFound(id));
    }
    Ok(id)
}

fn require_caller(caller: Option<&str>) -> Result<Identity> {
    let caller = caller
        .map(Identity::new)
        .filter(|who| !who.is_zero())
        .ok_or_else(|| WagerError::invalid_argument("this command needs '--as <identity>'"))?;
    Ok(caller)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("#3").unwrap(), WagerId(3));
        assert!(matches!(parse_id("0"), Err(WagerError::NotFound(_))));
        assert!(matches!(parse_id("abc"), Err(WagerError::InvalidArgument(_))));
    }

    #[test]
    fn test_require_caller() {
        assert_eq!(require_caller(Some("bob")).unwrap(), Identity::new("bob"));
        assert!(require_caller(Some(" ")).is_err());
        assert!(require_caller(None).is_err());
    }
}
