// Giveaway Bot - Event and Instruction Processor
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::config::GiveawayConfig;
use crate::eligibility::{self, EligibilityRules, EntryOutcome, RejectReason};
use crate::error::{GatewayError, GiveawayResult, StoreError};
use crate::gateway::{ChatGateway, GatewayEvent};
use crate::instruction::GiveawayInstruction;
use crate::notice::Notice;
use crate::state::{ChannelId, MessageId, RecordTable, UserId};
use crate::store::GiveawayStore;
use crate::throttle::{Clock, CooldownGate, FireGuard};
use crate::trading::{self, IncomingOffer, OfferDecision, SessionKeeper, TradingService};
use crate::utils;

/// Drives the giveaway: platform events, direct-message commands and the
/// scheduled jobs all land here.
pub struct GiveawayProcessor {
    pub(crate) config: GiveawayConfig,
    pub(crate) store: Arc<dyn GiveawayStore>,
    pub(crate) gateway: Arc<dyn ChatGateway>,
    pub(crate) trading: Arc<dyn TradingService>,
    pub(crate) clock: Arc<dyn Clock>,
    cooldowns: CooldownGate,
    pub(crate) rollover_guard: FireGuard,
    pub(crate) reminder_guard: FireGuard,
    pub(crate) session: SessionKeeper,
}

impl GiveawayProcessor {
    pub fn new(
        config: GiveawayConfig,
        store: Arc<dyn GiveawayStore>,
        gateway: Arc<dyn ChatGateway>,
        trading: Arc<dyn TradingService>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            cooldowns: CooldownGate::new(config.notify_cooldown()),
            rollover_guard: FireGuard::new(config.job_guard()),
            reminder_guard: FireGuard::new(config.job_guard()),
            session: SessionKeeper::new(trading.clone(), clock.clone(), config.session_guard()),
            config,
            store,
            gateway,
            trading,
            clock,
        }
    }

    pub fn config(&self) -> &GiveawayConfig {
        &self.config
    }

    /// Process one platform event
    pub async fn process_event(&self, event: GatewayEvent) -> GiveawayResult<()> {
        match event {
            GatewayEvent::Ready => self.on_ready().await,
            GatewayEvent::ReactionAdd {
                channel,
                message,
                emoji,
                user,
                is_bot,
            } => self
                .on_reaction_add(channel, message, &emoji, user, is_bot)
                .await
                .map(|_| ()),
            GatewayEvent::ReactionRemove { message, user, .. } => {
                // Withdrawal is command-only; this also fires for our own retractions.
                debug!("Reaction removed by {} on {}", user, message);
                Ok(())
            }
            GatewayEvent::Message {
                author,
                author_is_bot,
                is_direct,
                content,
            } => self
                .process_message(author, author_is_bot, is_direct, &content)
                .await
                .map(|_| ()),
            GatewayEvent::MemberRemoved { user } => self.on_context_removal(user).await,
        }
    }

    async fn on_ready(&self) -> GiveawayResult<()> {
        match self.store.latest_round().await? {
            Some(round) => {
                info!("Resuming giveaway ID #{}", round.id);
                self.gateway
                    .fetch_message(self.config.channel_id, round.message_id)
                    .await?;
            }
            None => warn!("No giveaway round recorded yet, use sendgiveawayembed"),
        }
        Ok(())
    }

    /// Entry gate for a reaction. Returns `None` when the reaction is not an
    /// entry attempt on the active round.
    pub async fn on_reaction_add(
        &self,
        channel: ChannelId,
        message: MessageId,
        emoji: &str,
        user: UserId,
        is_bot: bool,
    ) -> GiveawayResult<Option<EntryOutcome>> {
        if is_bot || channel != self.config.channel_id || emoji != self.config.entry_emoji {
            return Ok(None);
        }
        let round = match self.store.latest_round().await? {
            Some(round) if round.message_id == message => round,
            _ => return Ok(None),
        };

        let rules = EligibilityRules {
            lookback: self.config.recent_winner_lookback,
            standing_role: &self.config.standing_role,
        };
        let outcome =
            match eligibility::evaluate(self.store.as_ref(), self.gateway.as_ref(), rules, user).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("Eligibility check for {} failed: {}", user, e);
                    self.retract_reaction(round.message_id, user).await;
                    return Err(e);
                }
            };

        let outcome = match outcome {
            EntryOutcome::Admit => match self.store.insert_entrant(round.id, user).await {
                Ok(()) => {
                    info!("Entered {} into giveaway #{}", user, round.id);
                    self.direct(user, Notice::EntryAccepted).await;
                    return Ok(Some(EntryOutcome::Admit));
                }
                // A concurrent delivery of the same reaction won the insert.
                Err(StoreError::DuplicateEntry(_)) => EntryOutcome::Reject(RejectReason::AlreadyEntered),
                // The round rolled over while the checks ran; this post is closed.
                Err(StoreError::RoundClosed(_)) => {
                    debug!("Giveaway #{} closed before {} could enter", round.id, user);
                    self.retract_reaction(round.message_id, user).await;
                    return Ok(None);
                }
                Err(e) => return Err(e.into()),
            },
            rejected => rejected,
        };

        if let EntryOutcome::Reject(reason) = outcome {
            // An entered candidate keeps the reaction that shows their entry.
            if reason != RejectReason::AlreadyEntered {
                self.retract_reaction(round.message_id, user).await;
            }
            if self.cooldowns.should_notify(user, reason, self.clock.now()) {
                self.direct(user, Notice::EntryRejected(reason)).await;
            } else {
                debug!("Suppressed {:?} notice for {}", reason, user);
            }
        }
        Ok(Some(outcome))
    }

    /// Withdraw the candidate from the active round
    pub async fn on_withdraw(&self, user: UserId) -> GiveawayResult<Notice> {
        if !self.store.remove_entrant(user).await? {
            return Ok(Notice::NotEntered);
        }
        if let Some(round) = self.store.latest_round().await? {
            self.retract_reaction(round.message_id, user).await;
        }
        info!("{} withdrew from the giveaway", user);
        Ok(Notice::EntryWithdrawn)
    }

    /// Delete the candidate's destination, cascading to their entry
    pub async fn on_destination_removed(&self, user: UserId) -> GiveawayResult<Notice> {
        Ok(match self.store.remove_destination(user).await? {
            Some(entry_removed) => Notice::DestinationRemoved { entry_removed },
            None => Notice::DestinationMissing,
        })
    }

    /// The candidate left the server: drop their entry without telling anyone
    pub async fn on_context_removal(&self, user: UserId) -> GiveawayResult<()> {
        if self.store.remove_entrant(user).await? {
            info!("Removed entry of departed member {}", user);
        }
        Ok(())
    }

    /// Re-derive missed entries from the live reactions on the active post.
    ///
    /// Only inserts: reactors with a destination and no entry get one, without
    /// re-running the full gate. Entries of people no longer reacting stay.
    pub async fn reconcile(&self) -> GiveawayResult<usize> {
        let round = self
            .store
            .latest_round()
            .await?
            .ok_or(StoreError::NoActiveRound)?;
        let reactors = self
            .gateway
            .reactors(self.config.channel_id, round.message_id, &self.config.entry_emoji)
            .await?;

        let mut inserted = 0;
        for reactor in reactors.into_iter().filter(|r| !r.is_bot) {
            match self.repair_entry(round.id, reactor.id).await {
                Ok(true) => {
                    info!("inserted: {}", reactor.id);
                    inserted += 1;
                }
                Ok(false) => {}
                Err(e) => warn!("Could not reconcile {}: {}", reactor.id, e),
            }
        }
        info!("Reconciled giveaway #{}: {} entries restored", round.id, inserted);
        Ok(inserted)
    }

    async fn repair_entry(&self, round_id: u64, user: UserId) -> Result<bool, StoreError> {
        if !self.store.has_destination(user).await? || self.store.is_entered(user).await? {
            return Ok(false);
        }
        match self.store.insert_entrant(round_id, user).await {
            Ok(()) => Ok(true),
            Err(StoreError::DuplicateEntry(_) | StoreError::RoundClosed(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Handle a chat message. Returns the reply sent, if the message was a command.
    pub async fn process_message(
        &self,
        author: UserId,
        author_is_bot: bool,
        is_direct: bool,
        content: &str,
    ) -> GiveawayResult<Option<Notice>> {
        if author_is_bot || !is_direct {
            return Ok(None);
        }
        let Some(instruction) = GiveawayInstruction::unpack(&self.config.prefix, content) else {
            return Ok(None);
        };
        info!("Message from {}: {}", author, content);

        let reply = if instruction.is_owner_only() && !self.config.is_owner(author) {
            warn!("{} tried an owner command: {:?}", author, instruction);
            Notice::NotPermitted
        } else {
            match self.process_instruction(author, instruction).await {
                Ok(reply) => reply,
                Err(e) => {
                    error!("Command from {} failed: {}", author, e);
                    Notice::OperationFailed
                }
            }
        };

        match self.gateway.send_direct(author, reply.clone()).await {
            Ok(()) => Ok(Some(reply)),
            Err(GatewayError::MessageTooLarge) => {
                self.gateway.send_direct(author, Notice::ReplyTooLong).await?;
                Ok(Some(Notice::ReplyTooLong))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Run one command and produce its single reply
    pub async fn process_instruction(
        &self,
        author: UserId,
        instruction: GiveawayInstruction,
    ) -> GiveawayResult<Notice> {
        match instruction {
            GiveawayInstruction::SetUrl { url } => {
                info!("Instruction: Set Url");
                self.process_set_url(author, url).await
            }
            GiveawayInstruction::RemoveUrl => {
                info!("Instruction: Remove Url");
                self.on_destination_removed(author).await
            }
            GiveawayInstruction::Cede => {
                info!("Instruction: Cede");
                self.on_withdraw(author).await
            }
            GiveawayInstruction::Help => Ok(Notice::Help {
                prefix: self.config.prefix.clone(),
            }),
            GiveawayInstruction::Info => Ok(Notice::Info),
            GiveawayInstruction::Total => Ok(Notice::TotalEntrants(self.store.count_entrants().await?)),
            GiveawayInstruction::MyStatus => Ok(Notice::EntryStatus(self.store.is_entered(author).await?)),
            GiveawayInstruction::MyTradeUrl => Ok(match self.store.destination(author).await? {
                Some(url) => Notice::MyDestination(url),
                None => Notice::DestinationMissing,
            }),
            GiveawayInstruction::Blacklisted => Ok(Notice::BlacklistListing(self.store.blacklist().await?)),
            GiveawayInstruction::BotItems => {
                info!("Instruction: Bot Items");
                self.process_bot_items().await
            }
            GiveawayInstruction::Query { table } => {
                info!("Instruction: Query");
                self.process_query(table).await
            }
            GiveawayInstruction::ManualDelete { message } => {
                info!("Instruction: Manual Delete");
                let Some(message) = message.and_then(|m| m.parse::<MessageId>().ok()) else {
                    return Ok(Notice::Usage("manualdelete <message id>".to_string()));
                };
                self.gateway.delete(self.config.channel_id, message, None).await?;
                Ok(Notice::Done)
            }
            GiveawayInstruction::CheckReactions => {
                info!("Instruction: Check Reactions");
                self.reconcile().await?;
                Ok(Notice::Done)
            }
            GiveawayInstruction::SendReminders { message } => {
                info!("Instruction: Send Reminders");
                let Some(message) = message.and_then(|m| m.parse::<MessageId>().ok()) else {
                    return Ok(Notice::Usage("sendreminders <message id>".to_string()));
                };
                let reactors = self
                    .gateway
                    .reactors(self.config.channel_id, message, &self.config.entry_emoji)
                    .await?;
                let recipients = reactors.into_iter().filter(|r| !r.is_bot).map(|r| r.id).collect();
                self.notify_all(recipients, Notice::RoundOver).await;
                Ok(Notice::Done)
            }
            GiveawayInstruction::ForceSend { url, winner } => {
                info!("Instruction: Force Send");
                let Some(url) = url else {
                    return Ok(Notice::Usage("forcesend <trade url> [winner id]".to_string()));
                };
                let winner = winner.as_deref().and_then(utils::parse_user_id);
                Ok(match self.send_prize(&url, winner).await {
                    Ok(receipt) => Notice::OfferSent(receipt.offer_id),
                    Err(_) => Notice::OperationFailed,
                })
            }
            GiveawayInstruction::Blacklist { target } => {
                info!("Instruction: Blacklist");
                let user = match target {
                    None => return Ok(Notice::MissingId),
                    Some(raw) => match utils::parse_user_id(&raw) {
                        Some(user) => user,
                        None => return Ok(Notice::InvalidId),
                    },
                };
                Ok(if self.store.insert_blacklist(user).await? {
                    Notice::Blacklisted(user)
                } else {
                    Notice::AlreadyBlacklisted
                })
            }
            GiveawayInstruction::Unblacklist { target } => {
                info!("Instruction: Unblacklist");
                let user = match target {
                    None => return Ok(Notice::MissingId),
                    Some(raw) => match utils::parse_user_id(&raw) {
                        Some(user) => user,
                        None => return Ok(Notice::InvalidId),
                    },
                };
                Ok(if self.store.remove_blacklist(user).await? {
                    Notice::Unblacklisted(user)
                } else {
                    Notice::NotBlacklisted
                })
            }
            GiveawayInstruction::SendGiveawayEmbed => {
                info!("Instruction: Send Giveaway Embed");
                self.publish_round().await?;
                Ok(Notice::Done)
            }
            GiveawayInstruction::SendMsg { channel, text } => {
                info!("Instruction: Send Msg");
                let channel = channel.and_then(|c| c.parse::<ChannelId>().ok());
                match channel {
                    Some(channel) if !text.is_empty() => {
                        self.gateway.post(channel, Notice::Broadcast(text)).await?;
                        Ok(Notice::Done)
                    }
                    _ => Ok(Notice::Usage("sendmsg <channel id> <text>".to_string())),
                }
            }
        }
    }

    async fn process_set_url(&self, author: UserId, url: Option<String>) -> GiveawayResult<Notice> {
        let Some(url) = url else {
            return Ok(Notice::DestinationInvalid);
        };
        if utils::is_placeholder_destination(&url) {
            return Ok(Notice::DestinationPlaceholder);
        }
        if !utils::is_destination_url(&url) {
            return Ok(Notice::DestinationInvalid);
        }
        if self.store.destination_in_use(&url).await? {
            warn!("{} tried to add a trade url another user already added: {}", author, url);
            return Ok(Notice::DestinationTaken);
        }

        let written = if self.store.has_destination(author).await? {
            self.store
                .update_destination(author, url.clone())
                .await
                .map(|()| Notice::DestinationUpdated(url))
        } else {
            self.store
                .insert_destination(author, url)
                .await
                .map(|()| Notice::DestinationSet)
        };
        match written {
            Ok(notice) => Ok(notice),
            Err(StoreError::DestinationTaken) => Ok(Notice::DestinationTaken),
            Err(e) => Err(e.into()),
        }
    }

    async fn process_bot_items(&self) -> GiveawayResult<Notice> {
        match self.trading.inventory().await {
            Ok(items) => Ok(Notice::BotItems(trading::category_counts(&items))),
            Err(e) => {
                // Usually a stale session; the next attempt succeeds after the relog.
                self.session.reconnect("inventory lookup failed").await;
                Err(e.into())
            }
        }
    }

    async fn process_query(&self, table: Option<String>) -> GiveawayResult<Notice> {
        let Some(table) = table else {
            return Ok(Notice::Usage("query <entrants|destinations|blacklist|rounds>".to_string()));
        };
        let Ok(table) = table.parse::<RecordTable>() else {
            return Ok(Notice::UnknownTable);
        };
        let rows = self.store.dump(table).await?;
        if rows.as_array().map_or(true, |rows| rows.is_empty()) {
            return Ok(Notice::QueryEmpty);
        }
        let json = rows.to_string();
        if json.len() > self.config.max_reply_len {
            return Ok(Notice::ReplyTooLong);
        }
        Ok(Notice::QueryResult(json))
    }

    /// Accept donations, decline everything else
    pub async fn on_incoming_offer(&self, offer: IncomingOffer) -> OfferDecision {
        let decision = trading::review_incoming(&offer);
        match self.trading.respond_to_offer(&offer.offer_id, decision).await {
            Ok(()) => info!("Offer #{} answered: {:?}", offer.offer_id, decision),
            Err(e) => warn!("Could not answer offer #{}: {}", offer.offer_id, e),
        }
        decision
    }

    pub async fn on_session_expired(&self) -> bool {
        self.session.reconnect("session expired").await
    }

    /// Best-effort direct message; failures are logged, never propagated
    pub(crate) async fn direct(&self, user: UserId, notice: Notice) -> bool {
        match self.gateway.send_direct(user, notice).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Could not message {}: {}", user, e);
                false
            }
        }
    }

    pub(crate) async fn retract_reaction(&self, message: MessageId, user: UserId) {
        if let Err(e) = self
            .gateway
            .remove_reaction(self.config.channel_id, message, &self.config.entry_emoji, user)
            .await
        {
            warn!("Could not remove reaction of {}: {}", user, e);
        }
    }

    /// Send `notice` to every recipient concurrently. One failed recipient
    /// does not stop the rest. Returns how many were reached.
    pub(crate) async fn notify_all(&self, recipients: Vec<UserId>, notice: Notice) -> usize {
        let total = recipients.len();
        let mut sends = JoinSet::new();
        for user in recipients {
            let gateway = self.gateway.clone();
            let notice = notice.clone();
            sends.spawn(async move { (user, gateway.send_direct(user, notice).await) });
        }

        let mut reached = 0;
        while let Some(joined) = sends.join_next().await {
            match joined {
                Ok((_, Ok(()))) => reached += 1,
                Ok((user, Err(e))) => warn!("Could not message {}: {}", user, e),
                Err(e) => warn!("Notification task failed: {}", e),
            }
        }
        info!("Sent mass DM to {} of {} users", reached, total);
        reached
    }
}
