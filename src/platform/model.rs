//! Platform-agnostic gateway model.
//!
//! The transport converts whatever its SDK delivers into these types before
//! handing them to listeners, so the dispatch core never touches SDK objects.

use crate::errors::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// A Discord-style 64-bit identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Snowflake(pub u64);

impl Snowflake {
    /// Returns the raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Snowflake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Snowflake {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        // Mentions arrive as <@123>, <@!123> or <#123>
        let digits = trimmed
            .strip_prefix("<@!")
            .or_else(|| trimmed.strip_prefix("<@"))
            .or_else(|| trimmed.strip_prefix("<#"))
            .and_then(|rest| rest.strip_suffix('>'))
            .unwrap_or(trimmed);
        digits
            .parse::<u64>()
            .map(Snowflake)
            .map_err(|_| Error::InvalidId(s.to_string()))
    }
}

impl From<u64> for Snowflake {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Minimal view of a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRef {
    pub id: Snowflake,
    pub name: String,
    pub bot: bool,
}

/// The kinds of channel a gateway may report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Text,
    Private,
    Voice,
    GroupDm,
    Category,
    News,
    NewsThread,
    PublicThread,
    PrivateThread,
    Stage,
    Forum,
    Unknown,
}

impl ChannelKind {
    /// Whether messages can be sent to and read from this channel kind.
    #[must_use]
    pub const fn supports_messages(self) -> bool {
        matches!(
            self,
            Self::Text
                | Self::Private
                | Self::Voice
                | Self::GroupDm
                | Self::News
                | Self::NewsThread
                | Self::PublicThread
                | Self::PrivateThread
                | Self::Stage
        )
    }
}

/// Minimal view of a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRef {
    pub id: Snowflake,
    pub name: Option<String>,
    pub kind: ChannelKind,
    pub guild_id: Option<Snowflake>,
}

/// A file attached to a message or passed as a command option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentRef {
    pub id: Snowflake,
    pub filename: String,
    pub url: String,
    pub size: u64,
}

/// A guild (server) the bot can see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuildRef {
    pub id: Snowflake,
    pub name: String,
    pub owner_id: Snowflake,
    /// Approximate, when the platform reported it
    pub member_count: Option<u64>,
}

/// A message as seen in message events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRef {
    pub id: Snowflake,
    pub channel_id: Snowflake,
    pub guild_id: Option<Snowflake>,
    pub author: Option<UserRef>,
    pub content: Option<String>,
}

/// The value a user supplied for one slash command option, already resolved
/// against the interaction's resolved data.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    String(String),
    Integer(i64),
    Number(f64),
    Boolean(bool),
    User(UserRef),
    Channel(ChannelRef),
    Attachment(AttachmentRef),
    /// Anything the core does not model (roles, mentionables, ...)
    Other(String),
}

/// One supplied option of a command interaction.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedOption {
    pub name: String,
    pub value: OptionValue,
}

/// A slash command invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandInteraction {
    pub id: Snowflake,
    /// Continuation token needed to respond to the interaction
    pub token: String,
    pub command_id: Snowflake,
    pub command_name: String,
    pub user: UserRef,
    pub channel_id: Snowflake,
    pub guild_id: Option<Snowflake>,
    /// Supplied options in the order the platform reported them
    pub options: Vec<ResolvedOption>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadyEvent {
    pub user: UserRef,
    pub guild_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDeleteEvent {
    pub channel_id: Snowflake,
    pub message_id: Snowflake,
    pub guild_id: Option<Snowflake>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionEvent {
    pub channel_id: Snowflake,
    pub message_id: Snowflake,
    pub guild_id: Option<Snowflake>,
    pub user_id: Option<Snowflake>,
    pub emoji: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberEvent {
    pub guild_id: Snowflake,
    pub user: UserRef,
}

/// Every gateway occurrence the core can route.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayEvent {
    Ready(ReadyEvent),
    MessageReceived(MessageRef),
    MessageUpdated(MessageRef),
    MessageDeleted(MessageDeleteEvent),
    ReactionAdded(ReactionEvent),
    ReactionRemoved(ReactionEvent),
    MemberJoined(MemberEvent),
    MemberLeft(MemberEvent),
    MemberBanned(MemberEvent),
    ChannelCreated(ChannelRef),
    ChannelDeleted(ChannelRef),
    CommandInteraction(CommandInteraction),
}

/// Discriminant of [`GatewayEvent`], with a fixed name per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Ready,
    MessageReceived,
    MessageUpdated,
    MessageDeleted,
    ReactionAdded,
    ReactionRemoved,
    MemberJoined,
    MemberLeft,
    MemberBanned,
    ChannelCreated,
    ChannelDeleted,
    CommandInteraction,
}

impl EventKind {
    pub const ALL: [Self; 12] = [
        Self::Ready,
        Self::MessageReceived,
        Self::MessageUpdated,
        Self::MessageDeleted,
        Self::ReactionAdded,
        Self::ReactionRemoved,
        Self::MemberJoined,
        Self::MemberLeft,
        Self::MemberBanned,
        Self::ChannelCreated,
        Self::ChannelDeleted,
        Self::CommandInteraction,
    ];

    /// The name scripts use to register for this kind.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Ready => "Ready",
            Self::MessageReceived => "MessageReceived",
            Self::MessageUpdated => "MessageUpdated",
            Self::MessageDeleted => "MessageDeleted",
            Self::ReactionAdded => "ReactionAdded",
            Self::ReactionRemoved => "ReactionRemoved",
            Self::MemberJoined => "MemberJoined",
            Self::MemberLeft => "MemberLeft",
            Self::MemberBanned => "MemberBanned",
            Self::ChannelCreated => "ChannelCreated",
            Self::ChannelDeleted => "ChannelDeleted",
            Self::CommandInteraction => "CommandInteraction",
        }
    }

    /// Reverse lookup of [`EventKind::name`]. Exact match.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl GatewayEvent {
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::Ready(_) => EventKind::Ready,
            Self::MessageReceived(_) => EventKind::MessageReceived,
            Self::MessageUpdated(_) => EventKind::MessageUpdated,
            Self::MessageDeleted(_) => EventKind::MessageDeleted,
            Self::ReactionAdded(_) => EventKind::ReactionAdded,
            Self::ReactionRemoved(_) => EventKind::ReactionRemoved,
            Self::MemberJoined(_) => EventKind::MemberJoined,
            Self::MemberLeft(_) => EventKind::MemberLeft,
            Self::MemberBanned(_) => EventKind::MemberBanned,
            Self::ChannelCreated(_) => EventKind::ChannelCreated,
            Self::ChannelDeleted(_) => EventKind::ChannelDeleted,
            Self::CommandInteraction(_) => EventKind::CommandInteraction,
        }
    }

    /// The user that triggered the event, if the event carries one.
    #[must_use]
    pub fn user(&self) -> Option<&UserRef> {
        match self {
            Self::Ready(ready) => Some(&ready.user),
            Self::MessageReceived(message) | Self::MessageUpdated(message) => {
                message.author.as_ref()
            }
            Self::MemberJoined(member) | Self::MemberLeft(member) | Self::MemberBanned(member) => {
                Some(&member.user)
            }
            Self::CommandInteraction(interaction) => Some(&interaction.user),
            Self::MessageDeleted(_)
            | Self::ReactionAdded(_)
            | Self::ReactionRemoved(_)
            | Self::ChannelCreated(_)
            | Self::ChannelDeleted(_) => None,
        }
    }

    /// The channel the event happened in, if any.
    #[must_use]
    pub const fn channel_id(&self) -> Option<Snowflake> {
        match self {
            Self::MessageReceived(message) | Self::MessageUpdated(message) => {
                Some(message.channel_id)
            }
            Self::MessageDeleted(deleted) => Some(deleted.channel_id),
            Self::ReactionAdded(reaction) | Self::ReactionRemoved(reaction) => {
                Some(reaction.channel_id)
            }
            Self::ChannelCreated(channel) | Self::ChannelDeleted(channel) => Some(channel.id),
            Self::CommandInteraction(interaction) => Some(interaction.channel_id),
            Self::Ready(_) | Self::MemberJoined(_) | Self::MemberLeft(_) | Self::MemberBanned(_) => {
                None
            }
        }
    }

    /// The guild the event happened in, if any.
    #[must_use]
    pub const fn guild_id(&self) -> Option<Snowflake> {
        match self {
            Self::MessageReceived(message) | Self::MessageUpdated(message) => message.guild_id,
            Self::MessageDeleted(deleted) => deleted.guild_id,
            Self::ReactionAdded(reaction) | Self::ReactionRemoved(reaction) => reaction.guild_id,
            Self::MemberJoined(member) | Self::MemberLeft(member) | Self::MemberBanned(member) => {
                Some(member.guild_id)
            }
            Self::ChannelCreated(channel) | Self::ChannelDeleted(channel) => channel.guild_id,
            Self::CommandInteraction(interaction) => interaction.guild_id,
            Self::Ready(_) => None,
        }
    }

    /// The message the event concerns, if any.
    #[must_use]
    pub const fn message(&self) -> Option<&MessageRef> {
        match self {
            Self::MessageReceived(message) | Self::MessageUpdated(message) => Some(message),
            _ => None,
        }
    }
}
