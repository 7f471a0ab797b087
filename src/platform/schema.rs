//! Slash command schema as submitted to the platform.

use crate::errors::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// The seven option kinds a command chain node may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionKind {
    String,
    Integer,
    Number,
    Boolean,
    User,
    Channel,
    Attachment,
}

impl OptionKind {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::User => "user",
            Self::Channel => "channel",
            Self::Attachment => "attachment",
        }
    }
}

impl fmt::Display for OptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OptionKind {
    type Err = Error;

    /// Case-insensitive lookup; anything outside the table is `InvalidOptionType`.
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "string" => Ok(Self::String),
            "integer" => Ok(Self::Integer),
            "number" => Ok(Self::Number),
            "boolean" => Ok(Self::Boolean),
            "user" => Ok(Self::User),
            "channel" => Ok(Self::Channel),
            "attachment" => Ok(Self::Attachment),
            _ => Err(Error::InvalidOptionType(s.to_string())),
        }
    }
}

/// One option in a command's linear option list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOptionSchema {
    pub name: String,
    pub description: String,
    pub kind: OptionKind,
    pub required: bool,
}

/// The platform-facing description of a slash command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSchema {
    pub name: String,
    pub description: String,
    /// Options in chain order
    pub options: Vec<CommandOptionSchema>,
}
