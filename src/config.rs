// Giveaway Bot - Configuration
use chrono::Weekday;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;
use crate::state::{ChannelId, UserId};

/// Wall-clock time of day (UTC)
#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeOfDay {
    pub hour: u32,
    pub minute: u32,
}

impl TimeOfDay {
    pub const fn new(hour: u32, minute: u32) -> Self {
        Self { hour, minute }
    }

    fn is_valid(&self) -> bool {
        self.hour < 24 && self.minute < 60
    }
}

/// When each recurring job fires
#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Presence refresh period in minutes
    pub status_every_minutes: u32,
    /// Minute past every hour for the trading session health check
    pub health_check_minute: u32,
    /// Daily trading session refresh, shortly before the rollover
    pub session_refresh: TimeOfDay,
    /// Daily winner selection
    pub rollover: TimeOfDay,
    pub reminder_day: Weekday,
    pub reminder: TimeOfDay,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            status_every_minutes: 5,
            health_check_minute: 50,
            session_refresh: TimeOfDay::new(15, 55),
            rollover: TimeOfDay::new(16, 1),
            reminder_day: Weekday::Sun,
            reminder: TimeOfDay::new(16, 30),
        }
    }
}

/// Giveaway bot configuration
#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct GiveawayConfig {
    /// Command prefix for direct messages
    pub prefix: String,
    /// Channel holding the giveaway posts
    pub channel_id: ChannelId,
    /// Administrators allowed to run owner commands
    pub owner_ids: Vec<UserId>,
    /// Reaction candidates add to enter
    pub entry_emoji: String,
    /// Role a member needs before entering
    pub standing_role: String,
    /// Number of resolved rounds a winner sits out
    pub recent_winner_lookback: usize,
    pub notify_cooldown_secs: u64,
    /// Window in which a second firing of a scheduled job is dropped
    pub job_guard_secs: u64,
    pub session_guard_secs: u64,
    /// Lifetime of the public winner announcement
    pub announcement_ttl_secs: u64,
    pub prize_items_min: usize,
    pub prize_items_max: usize,
    pub offer_message: String,
    /// Longest reply the platform accepts
    pub max_reply_len: usize,
    pub schedule: ScheduleConfig,
}

impl Default for GiveawayConfig {
    fn default() -> Self {
        Self {
            prefix: "g>".to_string(),
            channel_id: ChannelId(0),
            owner_ids: Vec::new(),
            entry_emoji: "✅".to_string(),
            standing_role: "1-10".to_string(),
            recent_winner_lookback: 4,
            notify_cooldown_secs: 15,
            job_guard_secs: 5,
            session_guard_secs: 5,
            announcement_ttl_secs: 300,
            prize_items_min: 5,
            prize_items_max: 9,
            offer_message: "Congratulations on winning the daily giveaway!".to_string(),
            max_reply_len: 2000,
            schedule: ScheduleConfig::default(),
        }
    }
}

impl GiveawayConfig {
    /// Read a JSON config file, filling missing keys from the defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: GiveawayConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.prefix.trim().is_empty() {
            return Err(ConfigError::Invalid("prefix must not be empty"));
        }
        if self.channel_id.0 == 0 {
            return Err(ConfigError::Invalid("channel_id must be set"));
        }
        if self.recent_winner_lookback == 0 {
            return Err(ConfigError::Invalid("recent_winner_lookback must be at least 1"));
        }
        if self.prize_items_min == 0 || self.prize_items_min > self.prize_items_max {
            return Err(ConfigError::Invalid("prize item range is empty"));
        }
        let schedule = &self.schedule;
        if schedule.status_every_minutes == 0 || schedule.status_every_minutes > 60 {
            return Err(ConfigError::Invalid("status_every_minutes must be within 1..=60"));
        }
        if schedule.health_check_minute >= 60
            || !schedule.session_refresh.is_valid()
            || !schedule.rollover.is_valid()
            || !schedule.reminder.is_valid()
        {
            return Err(ConfigError::Invalid("schedule time out of range"));
        }
        Ok(())
    }

    pub fn is_owner(&self, user: UserId) -> bool {
        self.owner_ids.contains(&user)
    }

    pub fn notify_cooldown(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.notify_cooldown_secs as i64)
    }

    pub fn job_guard(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.job_guard_secs as i64)
    }

    pub fn session_guard(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.session_guard_secs as i64)
    }

    pub fn announcement_ttl(&self) -> Duration {
        Duration::from_secs(self.announcement_ttl_secs)
    }
}
