// Giveaway Bot
// A recurring chat giveaway: reaction-gated entry, daily winner draw and
// prize delivery through a trading integration.

// Core modules
pub mod config;
pub mod error;
pub mod instruction;
pub mod processor;
pub mod state;
pub mod store;
pub mod utils;

// Entry gate
pub mod eligibility;
pub mod throttle;

// Round lifecycle
pub mod rollover;
pub mod schedule;

// External boundaries
pub mod gateway;
pub mod notice;
pub mod trading;

pub use config::GiveawayConfig;
pub use error::{GiveawayError, GiveawayResult};
pub use processor::GiveawayProcessor;
