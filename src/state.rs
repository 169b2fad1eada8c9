// Giveaway Bot - State
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

macro_rules! snowflake {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            BorshSerialize, BorshDeserialize, Serialize, Deserialize,
            Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse::<u64>().map($name)
            }
        }
    };
}

snowflake!(
    /// Stable chat-platform identity of a candidate
    UserId
);
snowflake!(
    /// Chat-platform message identifier
    MessageId
);
snowflake!(ChannelId);

/// One giveaway cycle
#[derive(BorshSerialize, BorshDeserialize, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Round {
    /// Monotonic round number, the highest one is the active round
    pub id: u64,
    /// The entry post candidates react to
    pub message_id: MessageId,
    /// Winner once resolved, stays `None` for rounds nobody entered
    pub winner: Option<UserId>,
}

impl Round {
    pub fn new(id: u64, message_id: MessageId) -> Self {
        Self {
            id,
            message_id,
            winner: None,
        }
    }
}

/// Destination row as exposed to the admin query dump
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct DestinationRecord {
    pub id: UserId,
    pub url: String,
}

/// Everything the store persists
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct StoreSnapshot {
    pub entrants: BTreeSet<UserId>,
    pub destinations: BTreeMap<UserId, String>,
    pub blacklist: BTreeSet<UserId>,
    /// Ordered by ascending round id
    pub rounds: Vec<Round>,
}

impl StoreSnapshot {
    pub fn latest_round(&self) -> Option<&Round> {
        self.rounds.last()
    }

    pub fn next_round_id(&self) -> u64 {
        self.latest_round().map_or(1, |round| round.id + 1)
    }
}

/// Record tables an administrator may dump
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordTable {
    Entrants,
    Destinations,
    Blacklist,
    Rounds,
}

impl FromStr for RecordTable {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "entrants" | "entries" => Ok(RecordTable::Entrants),
            "destinations" | "users" => Ok(RecordTable::Destinations),
            "blacklist" => Ok(RecordTable::Blacklist),
            "rounds" | "giveaways" => Ok(RecordTable::Rounds),
            _ => Err(()),
        }
    }
}
