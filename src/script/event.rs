//! The script-visible wrapper around a gateway event.

use super::error::{Result, ScriptError};
use crate::platform::{EventKind, GatewayEvent, MessageRef, Platform, Snowflake, UserRef};
use std::fmt;
use std::sync::Arc;

/// A gateway event as handed to a script callback.
///
/// Carries the platform handle so callbacks can respond without any other
/// context.
#[derive(Clone)]
pub struct EventValue {
    event: Arc<GatewayEvent>,
    platform: Arc<dyn Platform>,
}

impl EventValue {
    #[must_use]
    pub fn new(event: Arc<GatewayEvent>, platform: Arc<dyn Platform>) -> Self {
        Self { event, platform }
    }

    #[must_use]
    pub fn event(&self) -> &GatewayEvent {
        &self.event
    }

    #[must_use]
    pub fn kind(&self) -> EventKind {
        self.event.kind()
    }

    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        self.event.kind().name()
    }

    #[must_use]
    pub fn user(&self) -> Option<UserRef> {
        self.event.user().cloned()
    }

    #[must_use]
    pub fn message(&self) -> Option<MessageRef> {
        self.event.message().cloned()
    }

    #[must_use]
    pub fn channel_id(&self) -> Option<Snowflake> {
        self.event.channel_id()
    }

    #[must_use]
    pub fn guild_id(&self) -> Option<Snowflake> {
        self.event.guild_id()
    }

    /// Responds to the event: an interaction reply for slash commands, a
    /// message in the same channel for message events.
    pub async fn reply(&self, content: &str) -> Result<()> {
        match self.event.as_ref() {
            GatewayEvent::CommandInteraction(interaction) => {
                self.platform.reply(interaction, content).await?;
            }
            GatewayEvent::MessageReceived(message) | GatewayEvent::MessageUpdated(message) => {
                self.platform
                    .send_message(message.channel_id, content)
                    .await?;
            }
            _ => {
                return Err(ScriptError::Runtime(format!(
                    "{} events cannot be replied to",
                    self.kind_name()
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Debug for EventValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventValue")
            .field("event", &self.event)
            .finish_non_exhaustive()
    }
}
