//! Bot layer - the script-facing session and event routing
//!
//! A [`BotSession`] owns the event and command registries. Scripts register
//! callbacks through it; the platform hands it gateway events, which the
//! router turns into callback invocations on the interpreter pool.

/// Slash command chain parsing
pub mod command;
/// Option-to-argument conversion
pub mod params;
/// Event and command callback tables
pub mod registry;
/// Event-to-callback routing
pub mod router;
/// Session lifecycle and registration
pub mod session;

pub use command::{CommandNode, MAX_COMMAND_DEPTH, ParsedCommand, parse_command};
pub use registry::{CommandSlot, RegisteredCallback, Registry};
pub use router::INVALID_PARAMETERS_REPLY;
pub use session::{BotSession, SessionState};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{Error, Result};
    use crate::platform::{
        Activity, ActivityKind, ChannelKind, ChannelRef, GuildRef, OnlineStatus, Platform,
        Presence, Snowflake,
    };
    use crate::script::Interpreter;
    use crate::test_utils::{
        BOT_USER_ID, PlatformCall, QueuedPool, RecordingPlatform, command_chain,
        init_test_tracing, noop,
    };
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::runtime::Handle;

    fn session() -> (BotSession, Arc<RecordingPlatform>) {
        init_test_tracing();
        let platform = RecordingPlatform::new();
        let interpreter = Interpreter::with_pool(Handle::current(), Arc::new(QueuedPool::default()));
        (BotSession::new(platform.clone(), interpreter), platform)
    }

    async fn stopped(session: &BotSession) {
        tokio::time::timeout(Duration::from_secs(5), session.wait_stopped())
            .await
            .expect("session stopped");
    }

    #[tokio::test]
    async fn test_new_session_is_attached_once() {
        let (session, platform) = session();
        assert_eq!(session.state(), SessionState::Attached);
        assert_eq!(platform.listener_count(), 1);

        assert!(!session.attach());
        assert_eq!(platform.listener_count(), 1);
    }

    #[tokio::test]
    async fn test_add_command_upserts_schema() -> Result<()> {
        let (session, platform) = session();
        let id = session
            .add_command(session.interpreter().capture(), &command_chain(2, |_| true))
            .await?;

        assert_eq!(session.command_names(), vec!["cmd"]);
        assert_eq!(session.command_id("cmd"), Some(id));
        let calls = platform.calls();
        assert_eq!(calls.len(), 1);
        assert!(matches!(
            &calls[0],
            PlatformCall::Upsert(schema) if schema.name == "cmd" && schema.options.len() == 2
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_too_deep_command_commits_nothing() {
        let (session, platform) = session();
        let result = session
            .add_command(
                session.interpreter().capture(),
                &command_chain(MAX_COMMAND_DEPTH + 1, |_| true),
            )
            .await;

        assert!(matches!(result, Err(Error::CommandTooDeep { .. })));
        assert!(session.command_names().is_empty());
        assert!(platform.calls().is_empty());
    }

    #[tokio::test]
    async fn test_deepest_allowed_command_registers() -> Result<()> {
        let (session, _platform) = session();
        session
            .add_command(
                session.interpreter().capture(),
                &command_chain(MAX_COMMAND_DEPTH, |d| d == MAX_COMMAND_DEPTH),
            )
            .await?;
        assert_eq!(session.command_names(), vec!["cmd"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_upsert_rolls_back() {
        let (session, platform) = session();
        platform.fail_upserts(true);

        let result = session
            .add_command(session.interpreter().capture(), &command_chain(1, |_| true))
            .await;

        assert!(matches!(result, Err(Error::Platform(_))));
        assert!(session.command_names().is_empty());
        assert_eq!(session.command_id("cmd"), None);
    }

    #[tokio::test]
    async fn test_remove_command_deletes_exactly_once() -> Result<()> {
        let (session, platform) = session();
        let id = session
            .add_command(session.interpreter().capture(), &command_chain(0, |_| true))
            .await?;

        assert!(session.remove_command("cmd").await?);
        assert!(!session.remove_command("cmd").await?);

        let deletes: Vec<_> = platform
            .calls()
            .into_iter()
            .filter(|call| matches!(call, PlatformCall::Delete(_)))
            .collect();
        assert_eq!(deletes, vec![PlatformCall::Delete(id)]);
        assert!(session.command_names().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_readding_command_replaces_callbacks() -> Result<()> {
        let (session, _platform) = session();
        let first = session
            .add_command(session.interpreter().capture(), &command_chain(0, |_| true))
            .await?;
        let second = session
            .add_command(session.interpreter().capture(), &command_chain(1, |_| false))
            .await?;

        assert_eq!(first, second);
        assert_eq!(session.command_names(), vec!["cmd"]);
        assert_eq!(session.command_id("cmd"), Some(second));
        Ok(())
    }

    fn deletes(platform: &RecordingPlatform) -> Vec<PlatformCall> {
        platform
            .calls()
            .into_iter()
            .filter(|call| matches!(call, PlatformCall::Delete(_)))
            .collect()
    }

    #[tokio::test]
    async fn test_failed_readd_keeps_previous_registration() -> Result<()> {
        let (session, platform) = session();
        let first = session
            .add_command(session.interpreter().capture(), &command_chain(0, |_| true))
            .await?;

        platform.fail_upserts(true);
        let result = session
            .add_command(session.interpreter().capture(), &command_chain(1, |_| true))
            .await;
        assert!(matches!(result, Err(Error::Platform(_))));
        assert_eq!(session.command_names(), vec!["cmd"]);
        assert_eq!(session.command_id("cmd"), Some(first));

        platform.fail_upserts(false);
        assert!(session.remove_command("cmd").await?);
        assert_eq!(deletes(&platform), vec![PlatformCall::Delete(first)]);
        assert!(session.command_names().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_delete_keeps_command_for_retry() -> Result<()> {
        let (session, platform) = session();
        let id = session
            .add_command(session.interpreter().capture(), &command_chain(0, |_| true))
            .await?;

        platform.fail_deletes(true);
        let result = session.remove_command("cmd").await;
        assert!(matches!(result, Err(Error::Platform(_))));
        assert_eq!(session.command_names(), vec!["cmd"]);
        assert_eq!(session.command_id("cmd"), Some(id));

        platform.fail_deletes(false);
        assert!(session.remove_command("cmd").await?);
        assert_eq!(
            deletes(&platform),
            vec![PlatformCall::Delete(id), PlatformCall::Delete(id)]
        );
        assert!(session.command_names().is_empty());
        assert_eq!(session.command_id("cmd"), None);
        Ok(())
    }

    #[tokio::test]
    async fn test_presence_updates_keep_the_other_half() -> Result<()> {
        let (session, platform) = session();
        assert_eq!(session.activity(), None);
        assert_eq!(session.status(), OnlineStatus::Online);

        let activity = Activity::new(ActivityKind::Playing, "scripts");
        session.set_activity(activity.clone()).await?;
        session.set_status(OnlineStatus::Idle).await?;

        assert_eq!(session.activity(), Some(activity.clone()));
        assert_eq!(
            session.activity().map(|a| a.to_string()).as_deref(),
            Some("PLAYING: scripts")
        );
        assert_eq!(session.status(), OnlineStatus::Idle);
        assert_eq!(
            platform.calls(),
            vec![
                PlatformCall::SetPresence(Presence {
                    activity: Some(activity.clone()),
                    status: OnlineStatus::Online,
                }),
                PlatformCall::SetPresence(Presence {
                    activity: Some(activity),
                    status: OnlineStatus::Idle,
                }),
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_lookups_by_id() -> Result<()> {
        let (session, platform) = session();
        assert_eq!(session.user_id().await?, Snowflake(BOT_USER_ID));

        let text = ChannelRef {
            id: Snowflake(2),
            name: Some("general".to_string()),
            kind: ChannelKind::Text,
            guild_id: Some(Snowflake(1)),
        };
        platform.add_channel(text.clone());
        platform.add_channel(ChannelRef {
            id: Snowflake(3),
            name: Some("Info".to_string()),
            kind: ChannelKind::Category,
            guild_id: Some(Snowflake(1)),
        });
        let guild = GuildRef {
            id: Snowflake(1),
            name: "home".to_string(),
            owner_id: Snowflake(7),
            member_count: Some(12),
        };
        platform.add_guild(guild.clone());

        assert_eq!(session.channel(Snowflake(2)).await?, text);
        assert!(matches!(
            session.channel(Snowflake(3)).await,
            Err(Error::NotFound(m)) if m == "Channel with id '3'"
        ));
        assert!(matches!(
            session.channel(Snowflake(99)).await,
            Err(Error::NotFound(_))
        ));
        assert_eq!(session.guild(Snowflake(1)).await?, guild);
        assert!(matches!(
            session.guild(Snowflake(99)).await,
            Err(Error::NotFound(_))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_event_kind_is_accepted() -> Result<()> {
        let (session, _platform) = session();
        session.register_event("NotAnEvent", session.interpreter().capture(), noop("x", 1))?;
        Ok(())
    }

    #[tokio::test]
    async fn test_stop_closes_session() {
        let (session, platform) = session();
        session.stop();
        assert_eq!(session.state(), SessionState::ShuttingDown);
        assert_eq!(platform.listener_count(), 0);

        stopped(&session).await;
        assert_eq!(session.state(), SessionState::Stopped);
        assert_eq!(platform.calls(), vec![PlatformCall::Shutdown]);

        let scope = session.interpreter().capture();
        assert!(matches!(
            session.register_event("MessageReceived", scope, noop("late", 1)),
            Err(Error::SessionClosed)
        ));
        let scope = session.interpreter().capture();
        assert!(matches!(
            session.add_command(scope, &command_chain(0, |_| true)).await,
            Err(Error::SessionClosed)
        ));
        assert!(matches!(
            session.remove_command("cmd").await,
            Err(Error::SessionClosed)
        ));
        assert!(matches!(
            session.set_status(OnlineStatus::Invisible).await,
            Err(Error::SessionClosed)
        ));
        assert!(!session.attach());

        // A second stop is a no-op
        session.stop();
        assert_eq!(platform.calls(), vec![PlatformCall::Shutdown]);
    }

    #[tokio::test]
    async fn test_interpreter_shutdown_stops_session() {
        let (session, platform) = session();
        session.interpreter().shutdown();

        stopped(&session).await;
        assert_eq!(platform.listener_count(), 0);
        assert_eq!(platform.calls(), vec![PlatformCall::Shutdown]);
    }

    #[tokio::test]
    async fn test_session_on_torn_down_interpreter_stops_immediately() {
        init_test_tracing();
        let platform = RecordingPlatform::new();
        let interpreter = Interpreter::with_pool(Handle::current(), Arc::new(QueuedPool::default()));
        interpreter.shutdown();

        let session = BotSession::new(platform.clone(), interpreter);
        assert!(!session.state().is_open());
        stopped(&session).await;
        assert_eq!(platform.listener_count(), 0);
    }

    #[tokio::test]
    async fn test_moderation_actions_delegate_to_platform() -> Result<()> {
        let (session, platform) = session();
        let guild = Snowflake(1);
        let user = Snowflake(42);

        session.ban_user(guild, user, 1, Some("spam")).await?;
        session.kick_user(guild, user, None).await?;
        let role = session.create_role(guild, "helpers").await?;
        let message = session.send_message(Snowflake(2), "hi").await?;
        assert_ne!(role, message);

        assert_eq!(
            platform.calls(),
            vec![
                PlatformCall::Ban {
                    guild_id: guild,
                    user_id: user,
                    delete_message_days: 1,
                    reason: Some("spam".to_string()),
                },
                PlatformCall::Kick {
                    guild_id: guild,
                    user_id: user,
                    reason: None,
                },
                PlatformCall::CreateRole {
                    guild_id: guild,
                    name: "helpers".to_string(),
                },
                PlatformCall::Send {
                    channel_id: Snowflake(2),
                    content: "hi".to_string(),
                },
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_platform_handle_is_shared() {
        let (session, platform) = session();
        let as_dyn: Arc<dyn Platform> = platform;
        assert!(std::ptr::addr_eq(
            Arc::as_ptr(session.platform()),
            Arc::as_ptr(&as_dyn)
        ));
    }
}
