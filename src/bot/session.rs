//! The bot session: registries plus the lifecycle of one platform connection.

use super::command::parse_command;
use super::registry::{IdAssignment, RegisteredCallback, Registry};
use super::router;
use crate::errors::{Error, Result};
use crate::platform::{
    Activity, ChannelRef, EventKind, EventListener, GatewayEvent, GuildRef, OnlineStatus,
    Platform, Presence, Snowflake,
};
use crate::script::{CapturedScope, Interpreter, ScriptFunction, ScriptValue};
use std::fmt;
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

/// Lifecycle of a [`BotSession`]. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unattached,
    Attached,
    ShuttingDown,
    Stopped,
}

impl SessionState {
    /// Whether registrations and actions are still accepted.
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Unattached | Self::Attached)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unattached => "unattached",
            Self::Attached => "attached",
            Self::ShuttingDown => "shutting down",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

pub(crate) struct SessionInner {
    pub(crate) platform: Arc<dyn Platform>,
    pub(crate) interpreter: Interpreter,
    pub(crate) registry: Registry,
    state: watch::Sender<SessionState>,
}

impl SessionInner {
    pub(crate) fn state(&self) -> SessionState {
        *self.state.borrow()
    }
}

impl EventListener for SessionInner {
    fn on_event(&self, event: GatewayEvent) {
        router::route(self, event);
    }
}

/// A connected bot as seen by scripts.
///
/// Cloning yields another handle to the same session.
#[derive(Clone)]
pub struct BotSession {
    inner: Arc<SessionInner>,
}

impl fmt::Debug for BotSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotSession")
            .field("state", &self.state())
            .field("commands", &self.inner.registry.command_names())
            .finish_non_exhaustive()
    }
}

impl BotSession {
    /// Creates a session, attaches it to `platform`, and arranges for it to
    /// stop when `interpreter` tears down.
    pub fn new(platform: Arc<dyn Platform>, interpreter: Interpreter) -> Self {
        let (state, _) = watch::channel(SessionState::Unattached);
        let session = Self {
            inner: Arc::new(SessionInner {
                platform,
                interpreter,
                registry: Registry::new(),
                state,
            }),
        };
        session.attach();

        let weak: Weak<SessionInner> = Arc::downgrade(&session.inner);
        session.inner.interpreter.add_shutdown_hook(move || {
            if let Some(inner) = weak.upgrade() {
                info!("Interpreter teardown is stopping the bot session");
                Self { inner }.stop();
            }
        });
        session
    }

    fn listener(&self) -> Arc<dyn EventListener> {
        Arc::clone(&self.inner) as Arc<dyn EventListener>
    }

    /// Attaches the session as a platform listener. A second attach of the
    /// same session is a no-op; a closed session never re-attaches.
    pub fn attach(&self) -> bool {
        let listener = self.listener();
        let platform = Arc::clone(&self.inner.platform);
        let mut attached = false;
        self.inner.state.send_if_modified(|state| {
            if !state.is_open() {
                return false;
            }
            attached = platform.attach(listener);
            if attached && *state == SessionState::Unattached {
                *state = SessionState::Attached;
                return true;
            }
            false
        });
        if attached {
            debug!("Bot session attached to platform");
        }
        attached
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.inner.state()
    }

    #[must_use]
    pub fn interpreter(&self) -> &Interpreter {
        &self.inner.interpreter
    }

    #[must_use]
    pub fn platform(&self) -> &Arc<dyn Platform> {
        &self.inner.platform
    }

    fn ensure_open(&self) -> Result<()> {
        if self.state().is_open() {
            Ok(())
        } else {
            Err(Error::SessionClosed)
        }
    }

    /// Registers `function` to run for every event of kind `kind_name`.
    pub fn register_event(
        &self,
        kind_name: &str,
        scope: CapturedScope,
        function: ScriptFunction,
    ) -> Result<()> {
        self.ensure_open()?;
        if EventKind::from_name(kind_name).is_none() {
            warn!("Registering for unknown event kind '{}'; it will never fire", kind_name);
        }
        debug!("Registering '{}' for {} events", function.name(), kind_name);
        self.inner
            .registry
            .add_event(kind_name, RegisteredCallback::new(Arc::new(scope), function));
        Ok(())
    }

    /// Parses a command description, registers its callbacks, and upserts the
    /// command on the platform. Returns the platform-assigned id.
    ///
    /// Callbacks are visible to the router before the upsert completes, so an
    /// interaction racing the registration still finds them.
    #[instrument(skip_all)]
    pub async fn add_command(&self, scope: CapturedScope, description: &ScriptValue) -> Result<Snowflake> {
        self.ensure_open()?;
        let parsed = parse_command(description)?;
        let scope = Arc::new(scope);
        let name = parsed.schema.name.clone();

        let callbacks = parsed
            .callbacks
            .into_iter()
            .map(|callback| callback.map(|f| RegisteredCallback::new(Arc::clone(&scope), f)))
            .collect();
        let ticket = self.inner.registry.insert_command(&name, callbacks);

        match self.inner.platform.upsert_command(&parsed.schema).await {
            Ok(id) => {
                match self.inner.registry.set_command_id(&name, ticket, id) {
                    IdAssignment::Current => {}
                    IdAssignment::Superseded => {
                        debug!("Command `{}` was replaced while its upsert was in flight", name);
                    }
                    IdAssignment::Gone => {
                        warn!("Command `{}` was removed during its upsert, deleting {}", name, id);
                        // The removal may already have deleted this id
                        if let Err(e) = self.inner.platform.delete_command(id).await {
                            debug!("Cleanup delete of {} failed: {}", id, e);
                        }
                        return Ok(id);
                    }
                }
                info!(
                    "Registered command `{}` ({} options) with id {}",
                    name,
                    parsed.schema.options.len(),
                    id
                );
                Ok(id)
            }
            Err(e) => {
                // Any registration this one displaced is put back untouched
                warn!("Upsert of command `{}` failed: {}", name, e);
                self.inner.registry.rollback_command(&name, ticket);
                Err(e)
            }
        }
    }

    /// Removes a command on the platform, then locally. Returns false when
    /// no such command was registered or its removal is already under way.
    ///
    /// If the platform delete fails the command stays registered with its id,
    /// so the removal can be retried.
    #[instrument(skip(self))]
    pub async fn remove_command(&self, name: &str) -> Result<bool> {
        self.ensure_open()?;
        let Some((ticket, id)) = self.inner.registry.begin_removal(name) else {
            debug!("Command `{}` is not registered", name);
            return Ok(false);
        };

        let Some(id) = id else {
            warn!("Command `{}` had no platform id; removed locally only", name);
            self.inner.registry.complete_removal(name, ticket, None);
            return Ok(true);
        };

        if let Err(e) = self.inner.platform.delete_command(id).await {
            warn!("Deleting command `{}` (id {}) failed: {}", name, id, e);
            self.inner.registry.abort_removal(name, ticket);
            return Err(e);
        }
        self.inner.registry.complete_removal(name, ticket, Some(id));
        info!("Removed command `{}` (id {})", name, id);
        Ok(true)
    }

    #[must_use]
    pub fn command_names(&self) -> Vec<String> {
        self.inner.registry.command_names()
    }

    #[must_use]
    pub fn command_id(&self, name: &str) -> Option<Snowflake> {
        self.inner.registry.command_id(name)
    }

    pub async fn send_message(&self, channel_id: Snowflake, content: &str) -> Result<Snowflake> {
        self.ensure_open()?;
        self.inner.platform.send_message(channel_id, content).await
    }

    pub async fn ban_user(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        delete_message_days: u8,
        reason: Option<&str>,
    ) -> Result<()> {
        self.ensure_open()?;
        self.inner
            .platform
            .ban_user(guild_id, user_id, delete_message_days, reason)
            .await
    }

    pub async fn kick_user(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        reason: Option<&str>,
    ) -> Result<()> {
        self.ensure_open()?;
        self.inner.platform.kick_user(guild_id, user_id, reason).await
    }

    pub async fn create_role(&self, guild_id: Snowflake, name: &str) -> Result<Snowflake> {
        self.ensure_open()?;
        self.inner.platform.create_role(guild_id, name).await
    }

    /// Shows `activity` on every shard, keeping the current status.
    pub async fn set_activity(&self, activity: Activity) -> Result<()> {
        self.ensure_open()?;
        let presence = Presence {
            activity: Some(activity),
            ..self.inner.platform.presence()
        };
        self.inner.platform.set_presence(presence).await
    }

    #[must_use]
    pub fn activity(&self) -> Option<Activity> {
        self.inner.platform.presence().activity
    }

    pub async fn set_status(&self, status: OnlineStatus) -> Result<()> {
        self.ensure_open()?;
        let presence = Presence {
            status,
            ..self.inner.platform.presence()
        };
        self.inner.platform.set_presence(presence).await
    }

    #[must_use]
    pub fn status(&self) -> OnlineStatus {
        self.inner.platform.presence().status
    }

    /// The bot's own user id.
    pub async fn user_id(&self) -> Result<Snowflake> {
        self.ensure_open()?;
        Ok(self.inner.platform.current_user().await?.id)
    }

    /// Looks up a channel the bot can send messages to.
    pub async fn channel(&self, id: Snowflake) -> Result<ChannelRef> {
        self.ensure_open()?;
        let channel = self.inner.platform.channel(id).await?;
        if !channel.kind.supports_messages() {
            debug!("Channel {} is a {:?}, not a message channel", id, channel.kind);
            return Err(Error::NotFound(format!("Channel with id '{id}'")));
        }
        Ok(channel)
    }

    pub async fn guild(&self, id: Snowflake) -> Result<GuildRef> {
        self.ensure_open()?;
        self.inner.platform.guild(id).await
    }

    /// Detaches from the platform and requests a disconnect.
    ///
    /// In-flight callbacks keep running; only new events stop arriving. The
    /// disconnect completes in the background, see [`Self::wait_stopped`].
    pub fn stop(&self) {
        let began = self.inner.state.send_if_modified(|state| {
            if state.is_open() {
                *state = SessionState::ShuttingDown;
                true
            } else {
                false
            }
        });
        if !began {
            debug!("Bot session already {}", self.state());
            return;
        }

        self.inner.platform.detach(&self.listener());
        info!("Bot session shutting down");

        let inner = Arc::clone(&self.inner);
        self.inner.interpreter.runtime().spawn(async move {
            inner.platform.shutdown().await;
            inner.state.send_replace(SessionState::Stopped);
            info!("Bot session stopped");
        });
    }

    /// Resolves once the platform reported the disconnect.
    pub async fn wait_stopped(&self) {
        let mut state = self.inner.state.subscribe();
        // The sender lives as long as `self`, so this cannot fail
        let _ = state.wait_for(|s| *s == SessionState::Stopped).await;
    }
}
