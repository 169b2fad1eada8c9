// Giveaway Bot - Record store
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::state::{DestinationRecord, MessageId, RecordTable, Round, StoreSnapshot, UserId};
use crate::utils;

/// Keyed access to entrants, destinations, the blacklist and round history.
///
/// Multi-step callers do not get transactions; the constraints enforced here
/// (one entrant row per candidate, one owner per destination) are the
/// correctness backstop when two handlers interleave.
#[async_trait]
pub trait GiveawayStore: Send + Sync {
    async fn is_entered(&self, user: UserId) -> Result<bool, StoreError>;
    /// Enter `user` into round `round_id`. Fails with `RoundClosed` once a
    /// later round has been opened and with `DuplicateEntry` when the
    /// candidate already holds an entry.
    async fn insert_entrant(&self, round_id: u64, user: UserId) -> Result<(), StoreError>;
    /// Returns whether an entry was removed
    async fn remove_entrant(&self, user: UserId) -> Result<bool, StoreError>;
    async fn clear_entrants(&self) -> Result<(), StoreError>;
    async fn count_entrants(&self) -> Result<u64, StoreError>;
    /// Uniform pick over the current entrants
    async fn random_entrant(&self) -> Result<Option<UserId>, StoreError>;
    async fn entrants(&self) -> Result<Vec<UserId>, StoreError>;

    async fn has_destination(&self, user: UserId) -> Result<bool, StoreError>;
    async fn destination_in_use(&self, url: &str) -> Result<bool, StoreError>;
    async fn destination(&self, user: UserId) -> Result<Option<String>, StoreError>;
    async fn insert_destination(&self, user: UserId, url: String) -> Result<(), StoreError>;
    async fn update_destination(&self, user: UserId, url: String) -> Result<(), StoreError>;
    /// Delete the destination together with any entry of its holder. `None`
    /// when no destination was stored, otherwise whether an entry went with it.
    async fn remove_destination(&self, user: UserId) -> Result<Option<bool>, StoreError>;
    async fn destination_holders(&self) -> Result<Vec<UserId>, StoreError>;

    async fn is_blacklisted(&self, user: UserId) -> Result<bool, StoreError>;
    /// Returns false when the candidate was already blacklisted
    async fn insert_blacklist(&self, user: UserId) -> Result<bool, StoreError>;
    async fn remove_blacklist(&self, user: UserId) -> Result<bool, StoreError>;
    async fn blacklist(&self) -> Result<Vec<UserId>, StoreError>;

    async fn latest_round(&self) -> Result<Option<Round>, StoreError>;
    async fn open_round(&self, message_id: MessageId) -> Result<Round, StoreError>;
    async fn set_round_winner(&self, round_id: u64, winner: Option<UserId>) -> Result<(), StoreError>;
    /// Up to `count` rounds preceding the latest one, oldest first
    async fn recent_rounds(&self, count: usize) -> Result<Vec<Round>, StoreError>;
    /// Resolve `round_id`, clear every entrant and, when a new post exists,
    /// append the next round. Observers never see a half-applied rollover.
    async fn rollover(
        &self,
        round_id: u64,
        winner: Option<UserId>,
        next_message: Option<MessageId>,
    ) -> Result<Option<Round>, StoreError>;

    /// Read-only JSON dump of one table
    async fn dump(&self, table: RecordTable) -> Result<serde_json::Value, StoreError>;
}

/// In-process store, optionally mirrored to a borsh snapshot on disk
#[derive(Debug)]
pub struct LocalStore {
    data: Mutex<StoreSnapshot>,
    path: Option<PathBuf>,
}

impl LocalStore {
    pub fn in_memory() -> Self {
        Self {
            data: Mutex::new(StoreSnapshot::default()),
            path: None,
        }
    }

    /// Load the snapshot at `path` (or start empty) and persist every change back to it
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let data = match tokio::fs::read(&path).await {
            Ok(bytes) => borsh::from_slice::<StoreSnapshot>(&bytes)
                .map_err(|e| StoreError::Snapshot(e.to_string()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoreSnapshot::default(),
            Err(e) => return Err(StoreError::Snapshot(e.to_string())),
        };
        info!(
            "Store opened: {} entrants, {} destinations, {} rounds",
            data.entrants.len(),
            data.destinations.len(),
            data.rounds.len()
        );
        Ok(Self {
            data: Mutex::new(data),
            path: Some(path),
        })
    }

    pub async fn snapshot(&self) -> StoreSnapshot {
        self.data.lock().await.clone()
    }

    async fn read<R>(&self, f: impl FnOnce(&StoreSnapshot) -> R) -> R {
        let data = self.data.lock().await;
        f(&data)
    }

    /// Applies `f` to a copy and only commits it (and the file) if `f` succeeds
    async fn write<R>(
        &self,
        f: impl FnOnce(&mut StoreSnapshot) -> Result<R, StoreError>,
    ) -> Result<R, StoreError> {
        let mut data = self.data.lock().await;
        let mut next = data.clone();
        let out = f(&mut next)?;
        if let Some(path) = &self.path {
            persist(path, &next).await?;
        }
        *data = next;
        Ok(out)
    }
}

async fn persist(path: &Path, snapshot: &StoreSnapshot) -> Result<(), StoreError> {
    let bytes = borsh::to_vec(snapshot).map_err(|e| StoreError::Snapshot(e.to_string()))?;
    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, &bytes)
        .await
        .map_err(|e| StoreError::Snapshot(e.to_string()))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| StoreError::Snapshot(e.to_string()))?;
    debug!("Snapshot written: {} bytes", bytes.len());
    Ok(())
}

#[async_trait]
impl GiveawayStore for LocalStore {
    async fn is_entered(&self, user: UserId) -> Result<bool, StoreError> {
        Ok(self.read(|d| d.entrants.contains(&user)).await)
    }

    async fn insert_entrant(&self, round_id: u64, user: UserId) -> Result<(), StoreError> {
        self.write(|d| {
            match d.latest_round() {
                Some(round) if round.id == round_id => {}
                Some(_) => return Err(StoreError::RoundClosed(round_id)),
                None => return Err(StoreError::NoActiveRound),
            }
            if !d.entrants.insert(user) {
                return Err(StoreError::DuplicateEntry(user));
            }
            Ok(())
        })
        .await
    }

    async fn remove_entrant(&self, user: UserId) -> Result<bool, StoreError> {
        self.write(|d| Ok(d.entrants.remove(&user))).await
    }

    async fn clear_entrants(&self) -> Result<(), StoreError> {
        self.write(|d| {
            d.entrants.clear();
            Ok(())
        })
        .await
    }

    async fn count_entrants(&self) -> Result<u64, StoreError> {
        Ok(self.read(|d| d.entrants.len() as u64).await)
    }

    async fn random_entrant(&self) -> Result<Option<UserId>, StoreError> {
        Ok(self.read(|d| utils::pick_uniform(d.entrants.iter().copied())).await)
    }

    async fn entrants(&self) -> Result<Vec<UserId>, StoreError> {
        Ok(self.read(|d| d.entrants.iter().copied().collect()).await)
    }

    async fn has_destination(&self, user: UserId) -> Result<bool, StoreError> {
        Ok(self.read(|d| d.destinations.contains_key(&user)).await)
    }

    async fn destination_in_use(&self, url: &str) -> Result<bool, StoreError> {
        Ok(self.read(|d| d.destinations.values().any(|stored| stored == url)).await)
    }

    async fn destination(&self, user: UserId) -> Result<Option<String>, StoreError> {
        Ok(self.read(|d| d.destinations.get(&user).cloned()).await)
    }

    async fn insert_destination(&self, user: UserId, url: String) -> Result<(), StoreError> {
        self.write(|d| {
            if d.destinations.values().any(|stored| *stored == url) {
                return Err(StoreError::DestinationTaken);
            }
            d.destinations.insert(user, url);
            Ok(())
        })
        .await
    }

    async fn update_destination(&self, user: UserId, url: String) -> Result<(), StoreError> {
        self.write(|d| {
            if d.destinations.iter().any(|(owner, stored)| *owner != user && *stored == url) {
                return Err(StoreError::DestinationTaken);
            }
            match d.destinations.get_mut(&user) {
                Some(stored) => {
                    *stored = url;
                    Ok(())
                }
                None => Err(StoreError::MissingDestination(user)),
            }
        })
        .await
    }

    async fn remove_destination(&self, user: UserId) -> Result<Option<bool>, StoreError> {
        self.write(|d| {
            if d.destinations.remove(&user).is_none() {
                return Ok(None);
            }
            Ok(Some(d.entrants.remove(&user)))
        })
        .await
    }

    async fn destination_holders(&self) -> Result<Vec<UserId>, StoreError> {
        Ok(self.read(|d| d.destinations.keys().copied().collect()).await)
    }

    async fn is_blacklisted(&self, user: UserId) -> Result<bool, StoreError> {
        Ok(self.read(|d| d.blacklist.contains(&user)).await)
    }

    async fn insert_blacklist(&self, user: UserId) -> Result<bool, StoreError> {
        self.write(|d| Ok(d.blacklist.insert(user))).await
    }

    async fn remove_blacklist(&self, user: UserId) -> Result<bool, StoreError> {
        self.write(|d| Ok(d.blacklist.remove(&user))).await
    }

    async fn blacklist(&self) -> Result<Vec<UserId>, StoreError> {
        Ok(self.read(|d| d.blacklist.iter().copied().collect()).await)
    }

    async fn latest_round(&self) -> Result<Option<Round>, StoreError> {
        Ok(self.read(|d| d.latest_round().cloned()).await)
    }

    async fn open_round(&self, message_id: MessageId) -> Result<Round, StoreError> {
        self.write(|d| {
            let round = Round::new(d.next_round_id(), message_id);
            d.rounds.push(round.clone());
            Ok(round)
        })
        .await
    }

    async fn set_round_winner(&self, round_id: u64, winner: Option<UserId>) -> Result<(), StoreError> {
        self.write(|d| {
            let round = d
                .rounds
                .iter_mut()
                .find(|round| round.id == round_id)
                .ok_or(StoreError::UnknownRound(round_id))?;
            round.winner = winner;
            Ok(())
        })
        .await
    }

    async fn recent_rounds(&self, count: usize) -> Result<Vec<Round>, StoreError> {
        Ok(self
            .read(|d| {
                let end = d.rounds.len().saturating_sub(1);
                let start = end.saturating_sub(count);
                d.rounds[start..end].to_vec()
            })
            .await)
    }

    async fn rollover(
        &self,
        round_id: u64,
        winner: Option<UserId>,
        next_message: Option<MessageId>,
    ) -> Result<Option<Round>, StoreError> {
        self.write(|d| {
            let round = d
                .rounds
                .iter_mut()
                .find(|round| round.id == round_id)
                .ok_or(StoreError::UnknownRound(round_id))?;
            round.winner = winner;
            d.entrants.clear();
            Ok(next_message.map(|message_id| {
                let next = Round::new(d.next_round_id(), message_id);
                d.rounds.push(next.clone());
                next
            }))
        })
        .await
    }

    async fn dump(&self, table: RecordTable) -> Result<serde_json::Value, StoreError> {
        self.read(|d| match table {
            RecordTable::Entrants => serde_json::to_value(&d.entrants),
            RecordTable::Destinations => serde_json::to_value(
                d.destinations
                    .iter()
                    .map(|(id, url)| DestinationRecord {
                        id: *id,
                        url: url.clone(),
                    })
                    .collect::<Vec<_>>(),
            ),
            RecordTable::Blacklist => serde_json::to_value(&d.blacklist),
            RecordTable::Rounds => serde_json::to_value(&d.rounds),
        })
        .await
        .map_err(|e| StoreError::Snapshot(e.to_string()))
    }
}
