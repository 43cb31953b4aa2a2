use crate::identity::{Identity, Role};
use crate::types::{WagerId, WagerState};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, WagerError>;

#[derive(Error, Debug)]
pub enum WagerError {
    #[error("Wager not found: {0}")]
    NotFound(WagerId),

    #[error("Cannot {operation} wager {id}: wager is {state}")]
    InvalidState {
        id: WagerId,
        state: WagerState,
        operation: &'static str,
    },

    #[error("Unauthorized: '{caller}' is not {required}")]
    Unauthorized { caller: Identity, required: String },

    #[error("Insufficient funds: need {need}, have {available}")]
    InsufficientFunds { need: u64, available: u64 },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Proposer cannot accept their own wager {0}")]
    SelfAcceptance(WagerId),

    #[error("'{winner}' is not a participant of wager {id}")]
    InvalidWinner { id: WagerId, winner: Identity },

    #[error("Ledger overflow crediting {amount} to '{identity}'")]
    Overflow { identity: Identity, amount: u64 },

    #[error("Snapshot conflict: {0}")]
    Conflict(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl WagerError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn unauthorized(caller: &Identity, roles: &[Role]) -> Self {
        let required = roles
            .iter()
            .map(|role| role.to_string())
            .collect::<Vec<_>>()
            .join(" or ");
        Self::Unauthorized {
            caller: caller.clone(),
            required,
        }
    }

    /// Short, stable name of the failure kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NotFound",
            Self::InvalidState { .. } => "InvalidState",
            Self::Unauthorized { .. } => "Unauthorized",
            Self::InsufficientFunds { .. } => "InsufficientFunds",
            Self::InvalidArgument(_) => "InvalidArgument",
            Self::SelfAcceptance(_) => "SelfAcceptance",
            Self::InvalidWinner { .. } => "InvalidWinner",
            Self::Overflow { .. } => "Overflow",
            Self::Conflict(_) => "Conflict",
            Self::Storage(_) => "Storage",
            Self::Serialization(_) => "Serialization",
            Self::Config(_) => "Config",
            Self::Io(_) => "Io",
            Self::Internal(_) => "Internal",
        }
    }
}
