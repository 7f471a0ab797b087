//! Platform layer - the seam between the dispatch core and the chat transport.
//!
//! The core only ever talks to a [`Platform`]: it attaches an
//! [`EventListener`] to receive gateway events and issues outbound calls
//! (command upsert/delete, replies, moderation actions) through the trait.

/// Serenity/poise-backed transport
pub mod discord;
/// Gateway event model shared by every transport
pub mod model;
/// Activity and online status
pub mod presence;
/// Slash command schema types
pub mod schema;

use crate::errors::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;

pub use model::{
    AttachmentRef, ChannelKind, ChannelRef, CommandInteraction, EventKind, GatewayEvent, GuildRef,
    MemberEvent, MessageDeleteEvent, MessageRef, OptionValue, ReactionEvent, ReadyEvent,
    ResolvedOption, Snowflake, UserRef,
};
pub use presence::{Activity, ActivityKind, OnlineStatus, Presence};
pub use schema::{CommandOptionSchema, CommandSchema, OptionKind};

/// Receives every event the transport delivers.
///
/// Called on transport threads; implementations must return quickly and
/// must not perform platform I/O inline.
pub trait EventListener: Send + Sync {
    fn on_event(&self, event: GatewayEvent);
}

/// Outbound operations against the chat platform.
#[async_trait]
pub trait Platform: Send + Sync {
    /// Adds `listener` unless this exact object is already attached.
    /// Returns whether it was newly attached.
    fn attach(&self, listener: Arc<dyn EventListener>) -> bool;

    /// Removes `listener` (by identity). Returns whether it was attached.
    fn detach(&self, listener: &Arc<dyn EventListener>) -> bool;

    /// Creates or replaces a slash command, returning its platform id.
    async fn upsert_command(&self, schema: &CommandSchema) -> Result<Snowflake>;

    async fn delete_command(&self, id: Snowflake) -> Result<()>;

    /// Responds to a command interaction with a plain text message.
    async fn reply(&self, interaction: &CommandInteraction, content: &str) -> Result<()>;

    async fn send_message(&self, channel_id: Snowflake, content: &str) -> Result<Snowflake>;

    async fn ban_user(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        delete_message_days: u8,
        reason: Option<&str>,
    ) -> Result<()>;

    async fn kick_user(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        reason: Option<&str>,
    ) -> Result<()>;

    async fn create_role(&self, guild_id: Snowflake, name: &str) -> Result<Snowflake>;

    /// The presence most recently set through [`Platform::set_presence`].
    fn presence(&self) -> Presence;

    /// Updates activity and status on every connected shard.
    async fn set_presence(&self, presence: Presence) -> Result<()>;

    /// The bot's own user.
    async fn current_user(&self) -> Result<UserRef>;

    async fn channel(&self, id: Snowflake) -> Result<ChannelRef>;

    async fn guild(&self, id: Snowflake) -> Result<GuildRef>;

    /// Requests an immediate disconnect. Fire-and-forget; the returned future
    /// resolves once the transport reports it is down.
    async fn shutdown(&self);
}

/// Identity-deduplicated set of listeners, shared by transports.
#[derive(Default)]
pub struct ListenerHub {
    listeners: RwLock<Vec<Arc<dyn EventListener>>>,
}

impl ListenerHub {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&self, listener: Arc<dyn EventListener>) -> bool {
        let mut listeners = self.listeners.write();
        if listeners.iter().any(|l| same_listener(l, &listener)) {
            return false;
        }
        listeners.push(listener);
        true
    }

    pub fn detach(&self, listener: &Arc<dyn EventListener>) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|l| !same_listener(l, listener));
        listeners.len() != before
    }

    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.read().is_empty()
    }

    /// Hands `event` to every attached listener. The list is snapshotted so
    /// listeners may detach themselves while being called.
    pub fn dispatch(&self, event: &GatewayEvent) {
        let snapshot: Vec<Arc<dyn EventListener>> = self.listeners.read().clone();
        for listener in snapshot {
            listener.on_event(event.clone());
        }
    }
}

/// Pointer identity, ignoring vtable metadata.
fn same_listener(a: &Arc<dyn EventListener>, b: &Arc<dyn EventListener>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counting {
        seen: AtomicUsize,
    }

    impl EventListener for Counting {
        fn on_event(&self, _event: GatewayEvent) {
            self.seen.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn ready() -> GatewayEvent {
        GatewayEvent::Ready(ReadyEvent {
            user: UserRef {
                id: Snowflake(1),
                name: "bot".to_string(),
                bot: true,
            },
            guild_count: 0,
        })
    }

    #[test]
    fn test_attach_is_idempotent_by_identity() {
        let hub = ListenerHub::new();
        let listener = Arc::new(Counting::default());
        let as_dyn: Arc<dyn EventListener> = listener.clone();

        assert!(hub.attach(Arc::clone(&as_dyn)));
        assert!(!hub.attach(Arc::clone(&as_dyn)));
        assert_eq!(hub.len(), 1);

        hub.dispatch(&ready());
        assert_eq!(listener.seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_equal_but_distinct_listeners_both_attach() {
        let hub = ListenerHub::new();
        let first: Arc<dyn EventListener> = Arc::new(Counting::default());
        let second: Arc<dyn EventListener> = Arc::new(Counting::default());

        assert!(hub.attach(first));
        assert!(hub.attach(second));
        assert_eq!(hub.len(), 2);
    }

    #[test]
    fn test_detach_stops_delivery() {
        let hub = ListenerHub::new();
        let listener = Arc::new(Counting::default());
        let as_dyn: Arc<dyn EventListener> = listener.clone();

        hub.attach(Arc::clone(&as_dyn));
        assert!(hub.detach(&as_dyn));
        assert!(!hub.detach(&as_dyn));
        assert!(hub.is_empty());

        hub.dispatch(&ready());
        assert_eq!(listener.seen.load(Ordering::SeqCst), 0);
    }
}
