//! Shared test utilities.
//!
//! Provides an in-memory [`Platform`] that records every outbound call, a
//! task pool that queues jobs until a test runs them, and builders for the
//! events and command descriptions tests feed through the session.

use crate::errors::{Error, Result};
use crate::platform::{
    ChannelRef, CommandInteraction, CommandSchema, EventListener, GatewayEvent, GuildRef,
    ListenerHub, MessageRef, OptionValue, Platform, Presence, ResolvedOption, Snowflake, UserRef,
};
use crate::script::{Job, ScriptFunction, ScriptValue, TaskPool};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Installs a test subscriber once; later calls are no-ops.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

/// A pool that holds jobs until [`QueuedPool::run_all`] is called.
#[derive(Default)]
pub struct QueuedPool {
    jobs: Mutex<VecDeque<Job>>,
}

impl QueuedPool {
    pub fn len(&self) -> usize {
        self.jobs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.lock().is_empty()
    }

    /// Runs queued jobs in submission order, including jobs queued by the
    /// jobs themselves. Returns how many ran.
    pub fn run_all(&self) -> usize {
        let mut ran = 0;
        loop {
            // Release the lock before running so jobs can submit more work
            let next = self.jobs.lock().pop_front();
            let Some(job) = next else {
                return ran;
            };
            job();
            ran += 1;
        }
    }
}

impl TaskPool for QueuedPool {
    fn submit(&self, job: Job) {
        self.jobs.lock().push_back(job);
    }
}

/// One outbound call seen by [`RecordingPlatform`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformCall {
    Upsert(CommandSchema),
    Delete(Snowflake),
    Reply {
        interaction: Snowflake,
        content: String,
    },
    Send {
        channel_id: Snowflake,
        content: String,
    },
    Ban {
        guild_id: Snowflake,
        user_id: Snowflake,
        delete_message_days: u8,
        reason: Option<String>,
    },
    Kick {
        guild_id: Snowflake,
        user_id: Snowflake,
        reason: Option<String>,
    },
    CreateRole {
        guild_id: Snowflake,
        name: String,
    },
    SetPresence(Presence),
    Shutdown,
}

/// The user [`RecordingPlatform`] reports as itself.
pub const BOT_USER_ID: u64 = 42;

/// In-memory platform. Upserting the same name twice keeps its id, like the
/// real command endpoint does.
pub struct RecordingPlatform {
    hub: ListenerHub,
    calls: Mutex<Vec<PlatformCall>>,
    command_ids: Mutex<HashMap<String, Snowflake>>,
    next_id: AtomicU64,
    fail_upserts: AtomicBool,
    fail_deletes: AtomicBool,
    during_upsert: Mutex<Option<GatewayEvent>>,
    presence: Mutex<Presence>,
    channels: Mutex<HashMap<Snowflake, ChannelRef>>,
    guilds: Mutex<HashMap<Snowflake, GuildRef>>,
}

impl RecordingPlatform {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            hub: ListenerHub::new(),
            calls: Mutex::new(Vec::new()),
            command_ids: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1000),
            fail_upserts: AtomicBool::new(false),
            fail_deletes: AtomicBool::new(false),
            during_upsert: Mutex::new(None),
            presence: Mutex::new(Presence::default()),
            channels: Mutex::new(HashMap::new()),
            guilds: Mutex::new(HashMap::new()),
        })
    }

    /// Delivers `event` to every attached listener, as the gateway would.
    pub fn fire(&self, event: GatewayEvent) {
        self.hub.dispatch(&event);
    }

    pub fn calls(&self) -> Vec<PlatformCall> {
        self.calls.lock().clone()
    }

    pub fn listener_count(&self) -> usize {
        self.hub.len()
    }

    pub fn fail_upserts(&self, fail: bool) {
        self.fail_upserts.store(fail, Ordering::SeqCst);
    }

    /// Failed deletes are still recorded as calls.
    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn add_channel(&self, channel: ChannelRef) {
        self.channels.lock().insert(channel.id, channel);
    }

    pub fn add_guild(&self, guild: GuildRef) {
        self.guilds.lock().insert(guild.id, guild);
    }

    /// Fires `event` from inside the next upsert, before it returns.
    pub fn deliver_during_upsert(&self, event: GatewayEvent) {
        *self.during_upsert.lock() = Some(event);
    }

    fn record(&self, call: PlatformCall) {
        self.calls.lock().push(call);
    }

    fn fresh_id(&self) -> Snowflake {
        Snowflake(self.next_id.fetch_add(1, Ordering::SeqCst))
    }
}

#[async_trait]
impl Platform for RecordingPlatform {
    fn attach(&self, listener: Arc<dyn EventListener>) -> bool {
        self.hub.attach(listener)
    }

    fn detach(&self, listener: &Arc<dyn EventListener>) -> bool {
        self.hub.detach(listener)
    }

    async fn upsert_command(&self, schema: &CommandSchema) -> Result<Snowflake> {
        self.record(PlatformCall::Upsert(schema.clone()));

        let pending = self.during_upsert.lock().take();
        if let Some(event) = pending {
            self.fire(event);
        }

        if self.fail_upserts.load(Ordering::SeqCst) {
            return Err(Error::Platform("upsert rejected".to_string()));
        }
        let mut ids = self.command_ids.lock();
        let id = match ids.get(&schema.name) {
            Some(id) => *id,
            None => {
                let id = self.fresh_id();
                ids.insert(schema.name.clone(), id);
                id
            }
        };
        Ok(id)
    }

    async fn delete_command(&self, id: Snowflake) -> Result<()> {
        self.record(PlatformCall::Delete(id));
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(Error::Platform("delete rejected".to_string()));
        }
        self.command_ids.lock().retain(|_, existing| *existing != id);
        Ok(())
    }

    async fn reply(&self, interaction: &CommandInteraction, content: &str) -> Result<()> {
        self.record(PlatformCall::Reply {
            interaction: interaction.id,
            content: content.to_string(),
        });
        Ok(())
    }

    async fn send_message(&self, channel_id: Snowflake, content: &str) -> Result<Snowflake> {
        self.record(PlatformCall::Send {
            channel_id,
            content: content.to_string(),
        });
        Ok(self.fresh_id())
    }

    async fn ban_user(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        delete_message_days: u8,
        reason: Option<&str>,
    ) -> Result<()> {
        self.record(PlatformCall::Ban {
            guild_id,
            user_id,
            delete_message_days,
            reason: reason.map(str::to_string),
        });
        Ok(())
    }

    async fn kick_user(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        reason: Option<&str>,
    ) -> Result<()> {
        self.record(PlatformCall::Kick {
            guild_id,
            user_id,
            reason: reason.map(str::to_string),
        });
        Ok(())
    }

    async fn create_role(&self, guild_id: Snowflake, name: &str) -> Result<Snowflake> {
        self.record(PlatformCall::CreateRole {
            guild_id,
            name: name.to_string(),
        });
        Ok(self.fresh_id())
    }

    fn presence(&self) -> Presence {
        self.presence.lock().clone()
    }

    async fn set_presence(&self, presence: Presence) -> Result<()> {
        self.record(PlatformCall::SetPresence(presence.clone()));
        *self.presence.lock() = presence;
        Ok(())
    }

    async fn current_user(&self) -> Result<UserRef> {
        Ok(UserRef {
            bot: true,
            ..user(BOT_USER_ID, "scriptcord")
        })
    }

    async fn channel(&self, id: Snowflake) -> Result<ChannelRef> {
        self.channels
            .lock()
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("Channel with id '{id}'")))
    }

    async fn guild(&self, id: Snowflake) -> Result<GuildRef> {
        self.guilds
            .lock()
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("Guild with id '{id}'")))
    }

    async fn shutdown(&self) {
        self.record(PlatformCall::Shutdown);
    }
}

/// A function that accepts `arity` arguments and does nothing.
pub fn noop(name: &str, arity: usize) -> ScriptFunction {
    ScriptFunction::new(name, arity, |_, _| Ok(ScriptValue::Null))
}

/// Builds a valid command description with `depth` options below the root.
/// Node `d` carries a callback when `has_callback(d)` is true.
pub fn command_chain(depth: usize, has_callback: impl Fn(usize) -> bool) -> ScriptValue {
    let mut next: Option<ScriptValue> = None;
    for d in (0..=depth).rev() {
        let mut entries: Vec<(String, ScriptValue)> = vec![
            (
                "name".to_string(),
                ScriptValue::from(if d == 0 {
                    "cmd".to_string()
                } else {
                    format!("arg{d}")
                }),
            ),
            (
                "description".to_string(),
                ScriptValue::from(format!("node {d}")),
            ),
        ];
        if d > 0 {
            entries.push(("type".to_string(), ScriptValue::from("string")));
        }
        if has_callback(d) {
            entries.push((
                "command".to_string(),
                ScriptValue::from(noop(&format!("cb{d}"), d + 1)),
            ));
        }
        if let Some(child) = next.take() {
            entries.push(("next".to_string(), child));
        }
        next = Some(ScriptValue::map(entries));
    }
    next.unwrap_or_default()
}

pub fn user(id: u64, name: &str) -> UserRef {
    UserRef {
        id: Snowflake(id),
        name: name.to_string(),
        bot: false,
    }
}

/// A slash command interaction in guild 1, channel 2, invoked by user 7.
pub fn interaction(name: &str, options: Vec<OptionValue>) -> GatewayEvent {
    let options = options
        .into_iter()
        .enumerate()
        .map(|(i, value)| ResolvedOption {
            name: format!("opt{i}"),
            value,
        })
        .collect();
    GatewayEvent::CommandInteraction(CommandInteraction {
        id: Snowflake(500),
        token: "token".to_string(),
        command_id: Snowflake(1000),
        command_name: name.to_string(),
        user: user(7, "alice"),
        channel_id: Snowflake(2),
        guild_id: Some(Snowflake(1)),
        options,
    })
}

/// A message created in channel `channel_id` of guild 1.
pub fn message_event(channel_id: u64, content: &str) -> GatewayEvent {
    GatewayEvent::MessageReceived(MessageRef {
        id: Snowflake(9000 + channel_id),
        channel_id: Snowflake(channel_id),
        guild_id: Some(Snowflake(1)),
        author: Some(user(7, "alice")),
        content: Some(content.to_string()),
    })
}
