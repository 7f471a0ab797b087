//! Bot presence: the activity line and online status shown to users.

use crate::errors::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// What the bot is shown as doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivityKind {
    Playing,
    Watching,
    Listening,
    Competing,
}

impl ActivityKind {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Playing => "PLAYING",
            Self::Watching => "WATCHING",
            Self::Listening => "LISTENING",
            Self::Competing => "COMPETING",
        }
    }
}

impl FromStr for ActivityKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "playing" => Ok(Self::Playing),
            "watching" => Ok(Self::Watching),
            "listening" => Ok(Self::Listening),
            "competing" => Ok(Self::Competing),
            _ => Err(Error::InvalidActivity(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activity {
    pub kind: ActivityKind,
    pub name: String,
}

impl Activity {
    pub fn new(kind: ActivityKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

/// Renders as `PLAYING: name`.
impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.name(), self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OnlineStatus {
    #[default]
    Online,
    Idle,
    DoNotDisturb,
    Invisible,
    Offline,
}

impl OnlineStatus {
    /// The gateway key for this status.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Idle => "idle",
            Self::DoNotDisturb => "dnd",
            Self::Invisible => "invisible",
            Self::Offline => "offline",
        }
    }
}

impl fmt::Display for OnlineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for OnlineStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "online" => Ok(Self::Online),
            "idle" => Ok(Self::Idle),
            "dnd" => Ok(Self::DoNotDisturb),
            "invisible" => Ok(Self::Invisible),
            "offline" => Ok(Self::Offline),
            _ => Err(Error::InvalidStatus(s.to_string())),
        }
    }
}

/// Full presence as last requested by this process.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Presence {
    pub activity: Option<Activity>,
    pub status: OnlineStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activity_kind_parses_case_insensitively() -> Result<()> {
        assert_eq!("PLAYING".parse::<ActivityKind>()?, ActivityKind::Playing);
        assert_eq!("Watching".parse::<ActivityKind>()?, ActivityKind::Watching);
        assert!(matches!(
            "streaming".parse::<ActivityKind>(),
            Err(Error::InvalidActivity(s)) if s == "streaming"
        ));
        Ok(())
    }

    #[test]
    fn test_activity_display() {
        let activity = Activity::new(ActivityKind::Listening, "the radio");
        assert_eq!(activity.to_string(), "LISTENING: the radio");
    }

    #[test]
    fn test_status_keys_round_trip() -> Result<()> {
        assert_eq!("DND".parse::<OnlineStatus>()?, OnlineStatus::DoNotDisturb);
        assert_eq!(OnlineStatus::DoNotDisturb.key(), "dnd");
        assert!(matches!(
            "away".parse::<OnlineStatus>(),
            Err(Error::InvalidStatus(_))
        ));
        assert_eq!(Presence::default().status, OnlineStatus::Online);
        Ok(())
    }
}
