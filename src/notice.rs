// Giveaway Bot - Outgoing notices
//
// The gateway adapter owns presentation (embeds, colours). `Display` gives the
// plain-text fallback used by adapters without rich formatting.
use std::fmt;

use crate::eligibility::RejectReason;
use crate::state::UserId;
use crate::trading::ItemCategory;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notice {
    EntryAccepted,
    EntryRejected(RejectReason),
    EntryWithdrawn,
    NotEntered,
    EntryStatus(bool),

    DestinationSet,
    DestinationUpdated(String),
    DestinationInvalid,
    DestinationPlaceholder,
    DestinationTaken,
    DestinationRemoved { entry_removed: bool },
    DestinationMissing,
    MyDestination(String),

    Help { prefix: String },
    Info,
    TotalEntrants(u64),
    BlacklistListing(Vec<UserId>),
    BotItems(Vec<(ItemCategory, usize)>),

    /// Entry invitation candidates react to
    GiveawayPost,
    NobodyEntered,
    WinnerSelected(UserId),
    /// Direct message to the winner with their destination
    WinnerAlert { destination: String, lookback: usize },
    /// Durable summary edited onto a resolved round's post
    RoundClosed { winner: Option<UserId> },
    RoundOver,
    Reminder,
    PrizeFailed,
    OfferSent(String),

    Done,
    NotPermitted,
    OperationFailed,
    Usage(String),
    QueryResult(String),
    QueryEmpty,
    UnknownTable,
    ReplyTooLong,
    Blacklisted(UserId),
    AlreadyBlacklisted,
    Unblacklisted(UserId),
    NotBlacklisted,
    InvalidId,
    MissingId,
    Broadcast(String),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RejectReason::Blacklisted => "You are blacklisted from this giveaway.",
            RejectReason::RecentWinner => {
                "You won one of the recent giveaways. Give somebody else a chance and try again later!"
            }
            RejectReason::NoDestination => {
                "You haven't set your trade URL yet. Set it in this DM, then re-add your reaction."
            }
            RejectReason::InsufficientStanding => {
                "You don't have the role required to enter yet. Chat a little and try again!"
            }
            RejectReason::AlreadyEntered => "You are already entered in the current giveaway.",
        };
        f.write_str(text)
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::EntryAccepted => write!(f, "You have successfully entered the daily giveaway!"),
            Notice::EntryRejected(reason) => write!(f, "Entry failed. {}", reason),
            Notice::EntryWithdrawn => write!(f, "Your entry has been removed from the current giveaway."),
            Notice::NotEntered => write!(f, "You are not entered in the current giveaway."),
            Notice::EntryStatus(true) => write!(f, "You are entered in the current giveaway."),
            Notice::EntryStatus(false) => write!(f, "You are not entered in the current giveaway."),
            Notice::DestinationSet => write!(f, "Your trade URL has been set! Now you can enter giveaways."),
            Notice::DestinationUpdated(url) => write!(f, "Your trade URL has been updated to: {}.", url),
            Notice::DestinationInvalid => write!(f, "Invalid arguments or trade URL."),
            Notice::DestinationPlaceholder => write!(f, "Use your actual trade URL, not the example one."),
            Notice::DestinationTaken => write!(f, "This trade URL already seems to exist."),
            Notice::DestinationRemoved { entry_removed: false } => {
                write!(f, "Your trade URL has been removed.")
            }
            Notice::DestinationRemoved { entry_removed: true } => write!(
                f,
                "Your trade URL has been removed, and you have been removed from the current giveaway."
            ),
            Notice::DestinationMissing => write!(f, "You don't have a trade URL set."),
            Notice::MyDestination(url) => write!(f, "Your trade URL: {}", url),
            Notice::Help { prefix } => write!(
                f,
                "Commands: {p}seturl <url>, {p}removeurl, {p}mytradeurl, {p}cede, {p}mystatus, {p}total, {p}botitems, {p}info",
                p = prefix
            ),
            Notice::Info => write!(f, "React to the daily giveaway post to enter. A winner is drawn every day."),
            Notice::TotalEntrants(count) => write!(f, "There are {} entrants in the current giveaway.", count),
            Notice::BlacklistListing(users) => {
                let ids: Vec<String> = users.iter().map(UserId::to_string).collect();
                write!(f, "```\n{}```", ids.join("\n"))
            }
            Notice::BotItems(counts) => {
                let lines: Vec<String> = counts
                    .iter()
                    .map(|(category, count)| format!("{}: {}", category.label(), count))
                    .collect();
                write!(f, "{}", lines.join("\n"))
            }
            Notice::GiveawayPost => write!(f, "Daily giveaway! React below to enter."),
            Notice::NobodyEntered => write!(f, "Nobody entered this giveaway."),
            Notice::WinnerSelected(winner) => write!(f, "<@{}> won the giveaway!", winner),
            Notice::WinnerAlert { destination, lookback } => write!(
                f,
                "You won! Your prize is on its way to {}. You can enter again after {} more giveaways.",
                destination, lookback
            ),
            Notice::RoundClosed { winner: Some(winner) } => write!(f, "Giveaway ended. Winner: <@{}>", winner),
            Notice::RoundClosed { winner: None } => write!(f, "Giveaway ended. Nobody entered."),
            Notice::RoundOver => write!(f, "The giveaway has ended. React to the new post to enter again!"),
            Notice::Reminder => write!(f, "Don't forget to enter today's giveaway!"),
            Notice::PrizeFailed => write!(f, "Your prize could not be sent. An administrator will resend it."),
            Notice::OfferSent(id) => write!(f, "Offer #{} sent.", id),
            Notice::Done => write!(f, "Done."),
            Notice::NotPermitted => write!(f, "You are not allowed to use this command."),
            Notice::OperationFailed => write!(f, "Something went wrong. Please try again later."),
            Notice::Usage(usage) => write!(f, "Invalid command usage: {}", usage),
            Notice::QueryResult(json) => write!(f, "```{}```", json),
            Notice::QueryEmpty => write!(f, "Your query returned nothing."),
            Notice::UnknownTable => write!(f, "Unknown table. Use entrants, destinations, blacklist or rounds."),
            Notice::ReplyTooLong => write!(f, "Failed to send message, it was probably too long."),
            Notice::Blacklisted(user) => write!(f, "The ID {} has been banned!", user),
            Notice::AlreadyBlacklisted => write!(f, "That user is already blacklisted."),
            Notice::Unblacklisted(user) => write!(f, "The ID {} has been unbanned!", user),
            Notice::NotBlacklisted => write!(f, "That user isn't blacklisted."),
            Notice::InvalidId => write!(f, "Invalid ID."),
            Notice::MissingId => write!(f, "You have to supply an ID."),
            Notice::Broadcast(text) => write!(f, "{}", text),
        }
    }
}
