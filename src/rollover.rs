// Giveaway Bot - Winner selection and round rollover
use tracing::{error, info, warn};

use crate::error::{GiveawayResult, StoreError, TradingError};
use crate::notice::Notice;
use crate::processor::GiveawayProcessor;
use crate::state::{MessageId, Round, UserId};
use crate::trading::{self, OfferReceipt};

/// What a completed rollover did
#[derive(Debug)]
pub struct RolloverReport {
    /// The round that was resolved
    pub round_id: u64,
    pub winner: Option<UserId>,
    /// Non-winning entrants told the round is over
    pub notified: usize,
    /// The new active round, or `None` if its post could not be published
    pub next_round: Option<Round>,
    /// Set when the archive write failed; the entrants were then not cleared
    pub archive_error: Option<StoreError>,
    /// `None` when no delivery was attempted
    pub prize: Option<Result<OfferReceipt, TradingError>>,
}

#[derive(Debug)]
pub enum RolloverOutcome {
    /// A second trigger within the guard window
    Skipped,
    Completed(RolloverReport),
}

impl GiveawayProcessor {
    /// Pick a winner for the active round, announce it, archive the round and
    /// open the next one, then hand the prize to the trading service.
    ///
    /// Prize delivery runs last and cannot undo the rollover; a failed
    /// delivery is reported to the winner and left for a manual `forcesend`.
    pub async fn run_rollover(&self) -> GiveawayResult<RolloverOutcome> {
        if !self.rollover_guard.try_fire(self.clock.now()) {
            warn!("Double giveaway, canceling task");
            return Ok(RolloverOutcome::Skipped);
        }

        let round = self
            .store
            .latest_round()
            .await?
            .ok_or(StoreError::NoActiveRound)?;
        let Some(winner) = self.store.random_entrant().await? else {
            return self.close_unclaimed(round).await;
        };
        info!("Winner picked for giveaway #{}: {}", round.id, winner);

        self.announce(Notice::WinnerSelected(winner)).await;

        let destination = match self.store.destination(winner).await {
            Ok(destination) => destination,
            Err(e) => {
                error!("Could not look up the destination of winner {}: {}", winner, e);
                None
            }
        };
        match &destination {
            Some(url) => {
                self.direct(
                    winner,
                    Notice::WinnerAlert {
                        destination: url.clone(),
                        lookback: self.config.recent_winner_lookback,
                    },
                )
                .await;
            }
            None => warn!("No destination to deliver to for winner {}", winner),
        }
        self.edit_round_post(round.message_id, Some(winner)).await;

        let others = match self.store.entrants().await {
            Ok(entrants) => entrants.into_iter().filter(|id| *id != winner).collect(),
            Err(e) => {
                error!("Could not list entrants to notify: {}", e);
                Vec::new()
            }
        };
        let notified = self.notify_all(others, Notice::RoundOver).await;

        let (next_round, archive_error) = self.archive_and_reopen(round.id, Some(winner)).await;

        let prize = match destination {
            Some(url) => Some(self.send_prize(&url, Some(winner)).await),
            None => {
                self.direct(winner, Notice::PrizeFailed).await;
                None
            }
        };

        Ok(RolloverOutcome::Completed(RolloverReport {
            round_id: round.id,
            winner: Some(winner),
            notified,
            next_round,
            archive_error,
            prize,
        }))
    }

    async fn close_unclaimed(&self, round: Round) -> GiveawayResult<RolloverOutcome> {
        info!("Nobody entered giveaway #{}", round.id);
        self.announce(Notice::NobodyEntered).await;
        self.edit_round_post(round.message_id, None).await;
        let (next_round, archive_error) = self.archive_and_reopen(round.id, None).await;
        Ok(RolloverOutcome::Completed(RolloverReport {
            round_id: round.id,
            winner: None,
            notified: 0,
            next_round,
            archive_error,
            prize: None,
        }))
    }

    /// Post an announcement that removes itself after the configured lifetime
    async fn announce(&self, notice: Notice) {
        let channel = self.config.channel_id;
        match self.gateway.post(channel, notice).await {
            Ok(message) => {
                if let Err(e) = self
                    .gateway
                    .delete(channel, message, Some(self.config.announcement_ttl()))
                    .await
                {
                    warn!("Could not schedule announcement removal: {}", e);
                }
            }
            Err(e) => error!("Could not post announcement: {}", e),
        }
    }

    async fn edit_round_post(&self, message: MessageId, winner: Option<UserId>) {
        if let Err(e) = self
            .gateway
            .edit(self.config.channel_id, message, Notice::RoundClosed { winner })
            .await
        {
            warn!("Could not edit giveaway post {}: {}", message, e);
        }
    }

    async fn archive_and_reopen(
        &self,
        round_id: u64,
        winner: Option<UserId>,
    ) -> (Option<Round>, Option<StoreError>) {
        let next_message = match self.post_entry_invitation().await {
            Ok(message) => Some(message),
            Err(e) => {
                error!("Could not publish the next giveaway post: {}", e);
                None
            }
        };
        match self.store.rollover(round_id, winner, next_message).await {
            Ok(next) => {
                if let Some(next) = &next {
                    info!("Next giveaway beginning: #{}", next.id);
                }
                (next, None)
            }
            Err(e) => {
                error!("Could not archive giveaway #{}: {}", round_id, e);
                (None, Some(e))
            }
        }
    }

    /// Post the entry invitation and prime it with the entry reaction
    async fn post_entry_invitation(&self) -> GiveawayResult<MessageId> {
        let channel = self.config.channel_id;
        let message = self.gateway.post(channel, Notice::GiveawayPost).await?;
        if let Err(e) = self.gateway.react(channel, message, &self.config.entry_emoji).await {
            warn!("Could not add entry reaction to {}: {}", message, e);
        }
        Ok(message)
    }

    /// Publish a fresh entry post and make it the active round
    pub async fn publish_round(&self) -> GiveawayResult<Round> {
        let message = self.post_entry_invitation().await?;
        let round = self.store.open_round(message).await?;
        info!("Published giveaway #{} on message {}", round.id, message);
        Ok(round)
    }

    /// Deliver a prize; on failure tell the winner (when known) and relog
    pub async fn send_prize(
        &self,
        destination: &str,
        winner: Option<UserId>,
    ) -> Result<OfferReceipt, TradingError> {
        let range = (self.config.prize_items_min, self.config.prize_items_max);
        match trading::deliver_prize(self.trading.as_ref(), destination, range, &self.config.offer_message).await {
            Ok(receipt) => Ok(receipt),
            Err(e) => {
                error!("Couldn't send the trade because of {}", e);
                if let Some(winner) = winner {
                    self.direct(winner, Notice::PrizeFailed).await;
                }
                self.session.reconnect("prize delivery failed").await;
                Err(e)
            }
        }
    }
}
