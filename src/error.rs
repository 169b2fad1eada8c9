// Giveaway Bot - Errors
use thiserror::Error;

use crate::state::UserId;

/// Failures raised by the record store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Primary-key violation on the entrant table
    #[error("Candidate {0} is already entered")]
    DuplicateEntry(UserId),

    /// Another candidate already owns this destination
    #[error("Destination is already registered to another candidate")]
    DestinationTaken,

    #[error("Candidate {0} has no destination")]
    MissingDestination(UserId),

    #[error("No giveaway round has been published")]
    NoActiveRound,

    #[error("Round {0} does not exist")]
    UnknownRound(u64),

    /// A later round was opened while the caller still held this one
    #[error("Round {0} is no longer the active round")]
    RoundClosed(u64),

    #[error("Snapshot could not be read or written: {0}")]
    Snapshot(String),
}

/// Failures raised by the chat platform
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Message is too large to send")]
    MessageTooLarge,

    #[error("Message or user not found")]
    NotFound,

    #[error("Missing permission for this action")]
    PermissionDenied,

    #[error("Chat platform unavailable: {0}")]
    Unavailable(String),
}

/// Failures raised by the trading integration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TradingError {
    #[error("Bot inventory is empty")]
    EmptyInventory,

    #[error("Offer could not be sent: {0}")]
    OfferFailed(String),

    #[error("Offer {0} could not be confirmed")]
    ConfirmationFailed(String),

    #[error("Trading session expired")]
    SessionExpired,

    #[error("Inventory lookup failed: {0}")]
    Inventory(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file could not be read: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config value: {0}")]
    Invalid(&'static str),
}

/// Errors that may be returned while running the giveaway
#[derive(Error, Debug)]
pub enum GiveawayError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Trading(#[from] TradingError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type GiveawayResult<T> = Result<T, GiveawayError>;
