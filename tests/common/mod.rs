#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

use giveaway_bot::{
    error::{GatewayError, StoreError, TradingError},
    gateway::{ChatGateway, Reactor},
    notice::Notice,
    state::{ChannelId, MessageId, RecordTable, Round, UserId},
    store::{GiveawayStore, LocalStore},
    throttle::Clock,
    trading::{InventoryItem, OfferDecision, OfferReceipt, OfferStatus, TradingService},
    GiveawayConfig, GiveawayProcessor,
};

pub const CHANNEL: ChannelId = ChannelId(42);
pub const OWNER: UserId = UserId(9);
pub const BOT: UserId = UserId(1);

pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Utc.with_ymd_and_hms(2024, 6, 3, 12, 0, 0).unwrap()),
        }
    }

    pub fn advance_secs(&self, secs: i64) {
        *self.now.lock().unwrap() += ChronoDuration::seconds(secs);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

#[derive(Default)]
pub struct GatewayLog {
    pub dms: Vec<(UserId, Notice)>,
    pub posts: Vec<(ChannelId, MessageId, Notice)>,
    pub edits: Vec<(MessageId, Notice)>,
    pub deletes: Vec<(MessageId, Option<Duration>)>,
    pub reactions: HashMap<MessageId, Vec<Reactor>>,
    pub retracted: Vec<(MessageId, UserId)>,
    pub fetched: Vec<MessageId>,
    pub presence: Option<String>,
    pub role_lookups: usize,
    pub next_message: u64,
}

/// Records every call; failures are switched on per test
#[derive(Default)]
pub struct FakeGateway {
    pub log: Mutex<GatewayLog>,
    pub standing: Mutex<HashSet<UserId>>,
    pub unreachable: Mutex<HashSet<UserId>>,
    pub reject_large: Mutex<bool>,
    pub fail_posts: Mutex<bool>,
}

impl FakeGateway {
    pub fn grant_standing(&self, user: UserId) {
        self.standing.lock().unwrap().insert(user);
    }

    pub fn make_unreachable(&self, user: UserId) {
        self.unreachable.lock().unwrap().insert(user);
    }

    pub fn add_reactor(&self, message: MessageId, user: UserId) {
        self.log
            .lock()
            .unwrap()
            .reactions
            .entry(message)
            .or_default()
            .push(Reactor { id: user, is_bot: false });
    }

    pub fn dms_to(&self, user: UserId) -> Vec<Notice> {
        self.log
            .lock()
            .unwrap()
            .dms
            .iter()
            .filter(|(to, _)| *to == user)
            .map(|(_, notice)| notice.clone())
            .collect()
    }

    pub fn retractions_of(&self, user: UserId) -> usize {
        self.log
            .lock()
            .unwrap()
            .retracted
            .iter()
            .filter(|(_, who)| *who == user)
            .count()
    }

    pub fn role_lookups(&self) -> usize {
        self.log.lock().unwrap().role_lookups
    }

    pub fn posts(&self) -> Vec<(ChannelId, MessageId, Notice)> {
        self.log.lock().unwrap().posts.clone()
    }
}

#[async_trait]
impl ChatGateway for FakeGateway {
    async fn send_direct(&self, user: UserId, notice: Notice) -> Result<(), GatewayError> {
        if self.unreachable.lock().unwrap().contains(&user) {
            return Err(GatewayError::NotFound);
        }
        if *self.reject_large.lock().unwrap() && matches!(notice, Notice::QueryResult(_)) {
            return Err(GatewayError::MessageTooLarge);
        }
        self.log.lock().unwrap().dms.push((user, notice));
        Ok(())
    }

    async fn post(&self, channel: ChannelId, notice: Notice) -> Result<MessageId, GatewayError> {
        if *self.fail_posts.lock().unwrap() {
            return Err(GatewayError::PermissionDenied);
        }
        let mut log = self.log.lock().unwrap();
        log.next_message += 1;
        let message = MessageId(1000 + log.next_message);
        log.posts.push((channel, message, notice));
        Ok(message)
    }

    async fn edit(&self, _channel: ChannelId, message: MessageId, notice: Notice) -> Result<(), GatewayError> {
        self.log.lock().unwrap().edits.push((message, notice));
        Ok(())
    }

    async fn delete(
        &self,
        _channel: ChannelId,
        message: MessageId,
        after: Option<Duration>,
    ) -> Result<(), GatewayError> {
        self.log.lock().unwrap().deletes.push((message, after));
        Ok(())
    }

    async fn fetch_message(&self, _channel: ChannelId, message: MessageId) -> Result<(), GatewayError> {
        self.log.lock().unwrap().fetched.push(message);
        Ok(())
    }

    async fn react(&self, _channel: ChannelId, message: MessageId, _emoji: &str) -> Result<(), GatewayError> {
        self.log
            .lock()
            .unwrap()
            .reactions
            .entry(message)
            .or_default()
            .push(Reactor { id: BOT, is_bot: true });
        Ok(())
    }

    async fn reactors(
        &self,
        _channel: ChannelId,
        message: MessageId,
        _emoji: &str,
    ) -> Result<Vec<Reactor>, GatewayError> {
        Ok(self
            .log
            .lock()
            .unwrap()
            .reactions
            .get(&message)
            .cloned()
            .unwrap_or_default())
    }

    async fn remove_reaction(
        &self,
        _channel: ChannelId,
        message: MessageId,
        _emoji: &str,
        user: UserId,
    ) -> Result<(), GatewayError> {
        let mut log = self.log.lock().unwrap();
        if let Some(reactors) = log.reactions.get_mut(&message) {
            reactors.retain(|r| r.id != user);
        }
        log.retracted.push((message, user));
        Ok(())
    }

    async fn has_role(&self, user: UserId, _role: &str) -> Result<bool, GatewayError> {
        self.log.lock().unwrap().role_lookups += 1;
        Ok(self.standing.lock().unwrap().contains(&user))
    }

    async fn set_presence(&self, text: String) -> Result<(), GatewayError> {
        self.log.lock().unwrap().presence = Some(text);
        Ok(())
    }
}

#[derive(Default)]
pub struct TradingLog {
    pub offers: Vec<(String, usize)>,
    pub confirmed: Vec<String>,
    pub responses: Vec<(String, OfferDecision)>,
    pub relogs: usize,
}

pub struct FakeTrading {
    pub inventory: Mutex<Vec<InventoryItem>>,
    pub status: Mutex<OfferStatus>,
    pub fail_offers: Mutex<bool>,
    pub logged_in: Mutex<bool>,
    pub log: Mutex<TradingLog>,
}

impl FakeTrading {
    pub fn with_items(count: usize) -> Self {
        let inventory = (0..count)
            .map(|i| InventoryItem {
                asset_id: i.to_string(),
                name: format!("Item {}", i),
                type_label: if i % 2 == 0 { "Common Hat" } else { "Rare Shirt" }.to_string(),
            })
            .collect();
        Self {
            inventory: Mutex::new(inventory),
            status: Mutex::new(OfferStatus::Sent),
            fail_offers: Mutex::new(false),
            logged_in: Mutex::new(true),
            log: Mutex::new(TradingLog::default()),
        }
    }

    pub fn relogs(&self) -> usize {
        self.log.lock().unwrap().relogs
    }

    pub fn offers(&self) -> Vec<(String, usize)> {
        self.log.lock().unwrap().offers.clone()
    }
}

#[async_trait]
impl TradingService for FakeTrading {
    async fn inventory(&self) -> Result<Vec<InventoryItem>, TradingError> {
        Ok(self.inventory.lock().unwrap().clone())
    }

    async fn create_offer(
        &self,
        destination: &str,
        items: Vec<InventoryItem>,
        _message: &str,
    ) -> Result<OfferReceipt, TradingError> {
        if *self.fail_offers.lock().unwrap() {
            return Err(TradingError::OfferFailed("trade hold".to_string()));
        }
        let mut log = self.log.lock().unwrap();
        log.offers.push((destination.to_string(), items.len()));
        Ok(OfferReceipt {
            offer_id: format!("offer-{}", log.offers.len()),
            status: *self.status.lock().unwrap(),
        })
    }

    async fn confirm_offer(&self, offer_id: &str) -> Result<(), TradingError> {
        self.log.lock().unwrap().confirmed.push(offer_id.to_string());
        Ok(())
    }

    async fn respond_to_offer(&self, offer_id: &str, decision: OfferDecision) -> Result<(), TradingError> {
        self.log
            .lock()
            .unwrap()
            .responses
            .push((offer_id.to_string(), decision));
        Ok(())
    }

    async fn is_logged_in(&self) -> Result<bool, TradingError> {
        Ok(*self.logged_in.lock().unwrap())
    }

    async fn relog(&self) -> Result<(), TradingError> {
        self.log.lock().unwrap().relogs += 1;
        Ok(())
    }
}

pub struct Harness {
    pub processor: Arc<GiveawayProcessor>,
    pub store: Arc<LocalStore>,
    pub gateway: Arc<FakeGateway>,
    pub trading: Arc<FakeTrading>,
    pub clock: Arc<ManualClock>,
}

pub fn test_config() -> GiveawayConfig {
    GiveawayConfig {
        channel_id: CHANNEL,
        owner_ids: vec![OWNER],
        ..GiveawayConfig::default()
    }
}

// Setup a processor over an in-memory store with one published round
pub async fn setup() -> Harness {
    let harness = setup_without_round().await;
    harness.processor.publish_round().await.unwrap();
    harness
}

pub async fn setup_without_round() -> Harness {
    let store = Arc::new(LocalStore::in_memory());
    let gateway = Arc::new(FakeGateway::default());
    let trading = Arc::new(FakeTrading::with_items(12));
    let clock = Arc::new(ManualClock::new());

    let processor = Arc::new(GiveawayProcessor::new(
        test_config(),
        store.clone(),
        gateway.clone(),
        trading.clone(),
        clock.clone(),
    ));

    Harness {
        processor,
        store,
        gateway,
        trading,
        clock,
    }
}

impl Harness {
    pub async fn active_round(&self) -> Round {
        self.store.latest_round().await.unwrap().unwrap()
    }

    /// React with the entry emoji on the active round's post
    pub async fn react(&self, user: UserId) -> Option<giveaway_bot::eligibility::EntryOutcome> {
        let round = self.active_round().await;
        self.gateway.add_reactor(round.message_id, user);
        self.processor
            .on_reaction_add(CHANNEL, round.message_id, "✅", user, false)
            .await
            .unwrap()
    }

    pub async fn dm(&self, user: UserId, content: &str) -> Option<Notice> {
        self.processor
            .process_message(user, false, true, content)
            .await
            .unwrap()
    }

    /// Candidate with a destination and the standing role
    pub async fn register(&self, user: UserId) {
        self.store
            .insert_destination(user, format!("https://trade.example/{}", user))
            .await
            .unwrap();
        self.gateway.grant_standing(user);
    }
}

impl Harness {
    /// A second processor over this harness's trading service and clock
    pub fn processor_with(
        &self,
        store: Arc<dyn GiveawayStore>,
        gateway: Arc<dyn ChatGateway>,
    ) -> Arc<GiveawayProcessor> {
        Arc::new(GiveawayProcessor::new(
            test_config(),
            store,
            gateway,
            self.trading.clone(),
            self.clock.clone(),
        ))
    }
}

/// Holds the role lookup of one user until released
pub struct HeldGateway {
    pub inner: Arc<FakeGateway>,
    pub held: UserId,
    /// Signalled once the held lookup is waiting
    pub reached: Notify,
    pub release: Notify,
}

impl HeldGateway {
    pub fn new(inner: Arc<FakeGateway>, held: UserId) -> Self {
        Self {
            inner,
            held,
            reached: Notify::new(),
            release: Notify::new(),
        }
    }
}

#[async_trait]
impl ChatGateway for HeldGateway {
    async fn send_direct(&self, user: UserId, notice: Notice) -> Result<(), GatewayError> {
        self.inner.send_direct(user, notice).await
    }

    async fn post(&self, channel: ChannelId, notice: Notice) -> Result<MessageId, GatewayError> {
        self.inner.post(channel, notice).await
    }

    async fn edit(&self, channel: ChannelId, message: MessageId, notice: Notice) -> Result<(), GatewayError> {
        self.inner.edit(channel, message, notice).await
    }

    async fn delete(
        &self,
        channel: ChannelId,
        message: MessageId,
        after: Option<Duration>,
    ) -> Result<(), GatewayError> {
        self.inner.delete(channel, message, after).await
    }

    async fn fetch_message(&self, channel: ChannelId, message: MessageId) -> Result<(), GatewayError> {
        self.inner.fetch_message(channel, message).await
    }

    async fn react(&self, channel: ChannelId, message: MessageId, emoji: &str) -> Result<(), GatewayError> {
        self.inner.react(channel, message, emoji).await
    }

    async fn reactors(
        &self,
        channel: ChannelId,
        message: MessageId,
        emoji: &str,
    ) -> Result<Vec<Reactor>, GatewayError> {
        self.inner.reactors(channel, message, emoji).await
    }

    async fn remove_reaction(
        &self,
        channel: ChannelId,
        message: MessageId,
        emoji: &str,
        user: UserId,
    ) -> Result<(), GatewayError> {
        self.inner.remove_reaction(channel, message, emoji, user).await
    }

    async fn has_role(&self, user: UserId, role: &str) -> Result<bool, GatewayError> {
        if user == self.held {
            self.reached.notify_one();
            self.release.notified().await;
        }
        self.inner.has_role(user, role).await
    }

    async fn set_presence(&self, text: String) -> Result<(), GatewayError> {
        self.inner.set_presence(text).await
    }
}

/// Store whose destination reads and removals can be switched to fail
pub struct FlakyStore {
    pub inner: Arc<LocalStore>,
    pub fail_destination_reads: Mutex<bool>,
    pub fail_destination_removal: Mutex<bool>,
}

impl FlakyStore {
    pub fn new(inner: Arc<LocalStore>) -> Self {
        Self {
            inner,
            fail_destination_reads: Mutex::new(false),
            fail_destination_removal: Mutex::new(false),
        }
    }
}

fn outage() -> StoreError {
    StoreError::Snapshot("store unavailable".to_string())
}

#[async_trait]
impl GiveawayStore for FlakyStore {
    async fn is_entered(&self, user: UserId) -> Result<bool, StoreError> {
        self.inner.is_entered(user).await
    }

    async fn insert_entrant(&self, round_id: u64, user: UserId) -> Result<(), StoreError> {
        self.inner.insert_entrant(round_id, user).await
    }

    async fn remove_entrant(&self, user: UserId) -> Result<bool, StoreError> {
        self.inner.remove_entrant(user).await
    }

    async fn clear_entrants(&self) -> Result<(), StoreError> {
        self.inner.clear_entrants().await
    }

    async fn count_entrants(&self) -> Result<u64, StoreError> {
        self.inner.count_entrants().await
    }

    async fn random_entrant(&self) -> Result<Option<UserId>, StoreError> {
        self.inner.random_entrant().await
    }

    async fn entrants(&self) -> Result<Vec<UserId>, StoreError> {
        self.inner.entrants().await
    }

    async fn has_destination(&self, user: UserId) -> Result<bool, StoreError> {
        self.inner.has_destination(user).await
    }

    async fn destination_in_use(&self, url: &str) -> Result<bool, StoreError> {
        self.inner.destination_in_use(url).await
    }

    async fn destination(&self, user: UserId) -> Result<Option<String>, StoreError> {
        if *self.fail_destination_reads.lock().unwrap() {
            return Err(outage());
        }
        self.inner.destination(user).await
    }

    async fn insert_destination(&self, user: UserId, url: String) -> Result<(), StoreError> {
        self.inner.insert_destination(user, url).await
    }

    async fn update_destination(&self, user: UserId, url: String) -> Result<(), StoreError> {
        self.inner.update_destination(user, url).await
    }

    async fn remove_destination(&self, user: UserId) -> Result<Option<bool>, StoreError> {
        if *self.fail_destination_removal.lock().unwrap() {
            return Err(outage());
        }
        self.inner.remove_destination(user).await
    }

    async fn destination_holders(&self) -> Result<Vec<UserId>, StoreError> {
        self.inner.destination_holders().await
    }

    async fn is_blacklisted(&self, user: UserId) -> Result<bool, StoreError> {
        self.inner.is_blacklisted(user).await
    }

    async fn insert_blacklist(&self, user: UserId) -> Result<bool, StoreError> {
        self.inner.insert_blacklist(user).await
    }

    async fn remove_blacklist(&self, user: UserId) -> Result<bool, StoreError> {
        self.inner.remove_blacklist(user).await
    }

    async fn blacklist(&self) -> Result<Vec<UserId>, StoreError> {
        self.inner.blacklist().await
    }

    async fn latest_round(&self) -> Result<Option<Round>, StoreError> {
        self.inner.latest_round().await
    }

    async fn open_round(&self, message_id: MessageId) -> Result<Round, StoreError> {
        self.inner.open_round(message_id).await
    }

    async fn set_round_winner(&self, round_id: u64, winner: Option<UserId>) -> Result<(), StoreError> {
        self.inner.set_round_winner(round_id, winner).await
    }

    async fn recent_rounds(&self, count: usize) -> Result<Vec<Round>, StoreError> {
        self.inner.recent_rounds(count).await
    }

    async fn rollover(
        &self,
        round_id: u64,
        winner: Option<UserId>,
        next_message: Option<MessageId>,
    ) -> Result<Option<Round>, StoreError> {
        self.inner.rollover(round_id, winner, next_message).await
    }

    async fn dump(&self, table: RecordTable) -> Result<serde_json::Value, StoreError> {
        self.inner.dump(table).await
    }
}
