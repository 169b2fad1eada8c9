// Giveaway Bot - Chat platform boundary
use async_trait::async_trait;
use std::time::Duration;

use crate::error::GatewayError;
use crate::notice::Notice;
use crate::state::{ChannelId, MessageId, UserId};

/// A user holding a reaction on a message
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Reactor {
    pub id: UserId,
    pub is_bot: bool,
}

/// Events the platform adapter feeds into the processor
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GatewayEvent {
    /// Connection established (or re-established)
    Ready,
    ReactionAdd {
        channel: ChannelId,
        message: MessageId,
        emoji: String,
        user: UserId,
        is_bot: bool,
    },
    /// A reaction disappeared, including the ones the bot retracts itself
    ReactionRemove {
        channel: ChannelId,
        message: MessageId,
        emoji: String,
        user: UserId,
    },
    Message {
        author: UserId,
        author_is_bot: bool,
        is_direct: bool,
        content: String,
    },
    /// The member left (or was removed from) the server
    MemberRemoved { user: UserId },
}

/// Side-effecting calls into the chat platform.
///
/// Every call is a suspension point; callers catch failures at the call site
/// so one failed send never aborts its siblings.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    async fn send_direct(&self, user: UserId, notice: Notice) -> Result<(), GatewayError>;

    async fn post(&self, channel: ChannelId, notice: Notice) -> Result<MessageId, GatewayError>;

    async fn edit(&self, channel: ChannelId, message: MessageId, notice: Notice) -> Result<(), GatewayError>;

    /// Delete now, or after `after` has elapsed
    async fn delete(
        &self,
        channel: ChannelId,
        message: MessageId,
        after: Option<Duration>,
    ) -> Result<(), GatewayError>;

    /// Fetch a message so the platform starts delivering its reaction events
    async fn fetch_message(&self, channel: ChannelId, message: MessageId) -> Result<(), GatewayError>;

    async fn react(&self, channel: ChannelId, message: MessageId, emoji: &str) -> Result<(), GatewayError>;

    async fn reactors(
        &self,
        channel: ChannelId,
        message: MessageId,
        emoji: &str,
    ) -> Result<Vec<Reactor>, GatewayError>;

    async fn remove_reaction(
        &self,
        channel: ChannelId,
        message: MessageId,
        emoji: &str,
        user: UserId,
    ) -> Result<(), GatewayError>;

    /// Live member lookup: does `user` hold the role named `role`
    async fn has_role(&self, user: UserId, role: &str) -> Result<bool, GatewayError>;

    async fn set_presence(&self, text: String) -> Result<(), GatewayError>;
}
