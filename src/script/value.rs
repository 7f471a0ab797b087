//! Script-visible values.
//!
//! Values are cheap to clone: containers sit behind `Arc`, so handing a value
//! to a branched context never deep-copies shared structure.

use super::error::{Result, ScriptError};
use super::event::EventValue;
use super::function::ScriptFunction;
use crate::platform::{AttachmentRef, ChannelRef, MessageRef, UserRef};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

#[derive(Clone, Debug, Default)]
pub enum ScriptValue {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    List(Arc<Vec<ScriptValue>>),
    Map(Arc<BTreeMap<String, ScriptValue>>),
    Function(ScriptFunction),
    Event(EventValue),
    User(UserRef),
    Channel(ChannelRef),
    Attachment(AttachmentRef),
    Message(MessageRef),
}

impl ScriptValue {
    /// Builds a map value from key/value pairs.
    pub fn map<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Self)>,
    {
        Self::Map(Arc::new(
            entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        ))
    }

    pub fn list<I: IntoIterator<Item = Self>>(items: I) -> Self {
        Self::List(Arc::new(items.into_iter().collect()))
    }

    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "Null",
            Self::Bool(_) => "Boolean",
            Self::Number(_) => "Number",
            Self::String(_) => "String",
            Self::List(_) => "List",
            Self::Map(_) => "Map",
            Self::Function(_) => "Function",
            Self::Event(_) => "DiscordEvent",
            Self::User(_) => "DiscordUser",
            Self::Channel(_) => "DiscordChannel",
            Self::Attachment(_) => "DiscordAttachment",
            Self::Message(_) => "DiscordMessage",
        }
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_map(&self) -> Option<&BTreeMap<String, Self>> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_function(&self) -> Option<&ScriptFunction> {
        match self {
            Self::Function(function) => Some(function),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_event(&self) -> Option<&EventValue> {
        match self {
            Self::Event(event) => Some(event),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_user(&self) -> Option<&UserRef> {
        match self {
            Self::User(user) => Some(user),
            _ => None,
        }
    }

    /// Like [`Self::as_str`] but reports a type error.
    pub fn expect_str(&self) -> Result<&str> {
        self.as_str().ok_or(ScriptError::Type {
            expected: "String",
            found: self.type_name(),
        })
    }

    /// Like [`Self::as_event`] but reports a type error.
    pub fn expect_event(&self) -> Result<&EventValue> {
        self.as_event().ok_or(ScriptError::Type {
            expected: "DiscordEvent",
            found: self.type_name(),
        })
    }
}

impl fmt::Display for ScriptValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => f.write_str(s),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Map(map) => {
                f.write_str("{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("}")
            }
            Self::Function(function) => write!(f, "<function {}>", function.name()),
            Self::Event(event) => write!(f, "<DiscordEvent {}>", event.kind_name()),
            Self::User(user) => write!(f, "<DiscordUser {}>", user.name),
            Self::Channel(channel) => write!(f, "<DiscordChannel {}>", channel.id),
            Self::Attachment(attachment) => write!(f, "<DiscordAttachment {}>", attachment.filename),
            Self::Message(message) => write!(f, "<DiscordMessage {}>", message.id),
        }
    }
}

impl From<bool> for ScriptValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for ScriptValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for ScriptValue {
    #[allow(clippy::cast_precision_loss)]
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<&str> for ScriptValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for ScriptValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<ScriptFunction> for ScriptValue {
    fn from(value: ScriptFunction) -> Self {
        Self::Function(value)
    }
}

impl From<EventValue> for ScriptValue {
    fn from(value: EventValue) -> Self {
        Self::Event(value)
    }
}

impl From<UserRef> for ScriptValue {
    fn from(value: UserRef) -> Self {
        Self::User(value)
    }
}

impl From<ChannelRef> for ScriptValue {
    fn from(value: ChannelRef) -> Self {
        Self::Channel(value)
    }
}

impl From<AttachmentRef> for ScriptValue {
    fn from(value: AttachmentRef) -> Self {
        Self::Attachment(value)
    }
}

impl From<MessageRef> for ScriptValue {
    fn from(value: MessageRef) -> Self {
        Self::Message(value)
    }
}

impl<T: Into<Self>> From<Option<T>> for ScriptValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}
