// Giveaway Bot - Instructions
//
// Direct-message commands. Arguments are kept as the raw words the user typed;
// the processor validates them so each problem gets its own reply.

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GiveawayInstruction {
    /// Register or replace the caller's trade destination
    SetUrl { url: Option<String> },

    /// Delete the caller's destination, and their entry with it
    RemoveUrl,

    /// Withdraw from the active round
    Cede,

    Help,
    Info,

    /// Number of entrants in the active round
    Total,

    MyStatus,
    MyTradeUrl,

    /// List blacklisted ids
    Blacklisted,

    /// Inventory counts per item category
    BotItems,

    /// Owner: read-only dump of one record table
    Query { table: Option<String> },

    /// Owner: delete a message in the giveaway channel
    ManualDelete { message: Option<String> },

    /// Owner: repair entries missed while the bot was offline
    CheckReactions,

    /// Owner: send the round-over notice to every reactor of a message
    SendReminders { message: Option<String> },

    /// Owner: resend a prize to an explicit destination
    ForceSend {
        url: Option<String>,
        winner: Option<String>,
    },

    /// Owner: exclude a candidate. `None` unless exactly one argument was given
    Blacklist { target: Option<String> },

    Unblacklist { target: Option<String> },

    /// Owner: publish a fresh entry post as the active round
    SendGiveawayEmbed,

    /// Owner: post arbitrary text to a channel
    SendMsg {
        channel: Option<String>,
        text: String,
    },
}

impl GiveawayInstruction {
    /// Unpacks a message into an instruction. Messages without the prefix and
    /// unknown command words yield `None`.
    pub fn unpack(prefix: &str, content: &str) -> Option<Self> {
        let body = content.strip_prefix(prefix)?;
        let mut args = body.split_whitespace();
        let command = args.next()?.to_lowercase();
        let args: Vec<&str> = args.collect();
        let arg = |i: usize| args.get(i).map(|a| a.to_string());
        let single = || if args.len() == 1 { arg(0) } else { None };

        Some(match command.as_str() {
            "seturl" => Self::SetUrl { url: arg(0) },
            "removeurl" => Self::RemoveUrl,
            "cede" => Self::Cede,
            "help" => Self::Help,
            "info" => Self::Info,
            "total" => Self::Total,
            "mystatus" => Self::MyStatus,
            "mytradeurl" => Self::MyTradeUrl,
            "blacklisted" => Self::Blacklisted,
            "botitems" => Self::BotItems,
            "query" => Self::Query { table: arg(0) },
            "manualdelete" => Self::ManualDelete { message: arg(0) },
            "checkreactions" => Self::CheckReactions,
            "sendreminders" => Self::SendReminders { message: arg(0) },
            "forcesend" => Self::ForceSend {
                url: arg(0),
                winner: arg(1),
            },
            "blacklist" => Self::Blacklist { target: single() },
            "unblacklist" => Self::Unblacklist { target: single() },
            "sendgiveawayembed" => Self::SendGiveawayEmbed,
            "sendmsg" => Self::SendMsg {
                channel: arg(0),
                text: args.iter().skip(1).copied().collect::<Vec<_>>().join(" "),
            },
            _ => return None,
        })
    }

    /// Commands restricted to the owner allow-list
    pub fn is_owner_only(&self) -> bool {
        matches!(
            self,
            Self::Query { .. }
                | Self::ManualDelete { .. }
                | Self::CheckReactions
                | Self::SendReminders { .. }
                | Self::ForceSend { .. }
                | Self::Blacklist { .. }
                | Self::Unblacklist { .. }
                | Self::SendGiveawayEmbed
                | Self::SendMsg { .. }
        )
    }
}
