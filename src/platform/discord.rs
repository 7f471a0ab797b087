//! Discord transport built on poise/serenity.
//!
//! A poise [`Framework`](poise::Framework) with no static commands is used
//! purely for its event plumbing: every serenity `FullEvent` is converted to a
//! [`GatewayEvent`] and fanned out through a [`ListenerHub`]. Slash commands
//! are created at runtime from script descriptions via the HTTP client.

use super::{
    Activity, ActivityKind, AttachmentRef, ChannelKind, ChannelRef, CommandInteraction,
    CommandSchema, EventListener, GatewayEvent, GuildRef, ListenerHub, MemberEvent,
    MessageDeleteEvent, MessageRef, OnlineStatus, OptionKind, OptionValue, Platform, Presence,
    ReactionEvent, ReadyEvent, ResolvedOption, Snowflake, UserRef,
};
use crate::config::BotConfig;
use crate::errors::{Error, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, trace};

/// Framework user data: the hub events are forwarded to.
pub struct GatewayData {
    hub: Arc<ListenerHub>,
}

/// [`Platform`] implementation talking to Discord.
pub struct SerenityGateway {
    http: Arc<serenity::Http>,
    shard_manager: Arc<serenity::ShardManager>,
    hub: Arc<ListenerHub>,
    guild_id: Option<serenity::GuildId>,
    presence: Mutex<Presence>,
}

async fn on_error(error: poise::FrameworkError<'_, GatewayData, Error>) {
    match error {
        poise::FrameworkError::Setup { error, .. } => {
            error!("Failed to start bot: {:?}", error);
        }
        poise::FrameworkError::EventHandler { error, event, .. } => {
            error!(
                "Error while forwarding event `{}`: {:?}",
                event.snake_case_name(),
                error
            );
        }
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                error!("Error while handling error: {}", e);
            }
        }
    }
}

async fn forward_event(
    _ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, GatewayData, Error>,
    data: &GatewayData,
) -> Result<()> {
    if let Some(converted) = convert_event(event) {
        trace!(kind = %converted.kind(), "Forwarding gateway event");
        data.hub.dispatch(&converted);
    }
    Ok(())
}

impl SerenityGateway {
    /// Builds the serenity client and the gateway wrapping it.
    ///
    /// The returned client is not started; call `client.start().await` (usually
    /// on its own task) to open the gateway connection.
    #[instrument(skip(token))]
    pub async fn connect(token: &str, config: &BotConfig) -> Result<(Arc<Self>, serenity::Client)> {
        let hub = Arc::new(ListenerHub::new());
        let setup_hub = Arc::clone(&hub);

        let framework = poise::Framework::builder()
            .options(poise::FrameworkOptions {
                commands: Vec::new(),
                event_handler: |ctx, event, framework, data| {
                    Box::pin(forward_event(ctx, event, framework, data))
                },
                on_error: |error| Box::pin(on_error(error)),
                ..Default::default()
            })
            .setup(move |_ctx, ready, _framework| {
                Box::pin(async move {
                    info!("Logged in as {}", ready.user.name);
                    Ok(GatewayData { hub: setup_hub })
                })
            })
            .build();

        let mut intents = serenity::GatewayIntents::GUILDS
            | serenity::GatewayIntents::GUILD_MESSAGES
            | serenity::GatewayIntents::DIRECT_MESSAGES
            | serenity::GatewayIntents::GUILD_MESSAGE_REACTIONS
            | serenity::GatewayIntents::GUILD_MEMBERS
            | serenity::GatewayIntents::GUILD_MODERATION;
        if config.message_content {
            intents |= serenity::GatewayIntents::MESSAGE_CONTENT;
        }

        info!("Setting up Serenity client for the script gateway...");
        let client = serenity::Client::builder(token, intents)
            .framework(framework)
            .await
            .inspect_err(|e| error!("Error creating client: {:?}", e))?;

        let gateway = Arc::new(Self {
            http: Arc::clone(&client.http),
            shard_manager: Arc::clone(&client.shard_manager),
            hub,
            guild_id: config.guild_id.map(serenity::GuildId::new),
            presence: Mutex::new(Presence::default()),
        });
        Ok((gateway, client))
    }
}

#[async_trait]
impl Platform for SerenityGateway {
    fn attach(&self, listener: Arc<dyn EventListener>) -> bool {
        self.hub.attach(listener)
    }

    fn detach(&self, listener: &Arc<dyn EventListener>) -> bool {
        self.hub.detach(listener)
    }

    async fn upsert_command(&self, schema: &CommandSchema) -> Result<Snowflake> {
        let mut builder =
            serenity::CreateCommand::new(&schema.name).description(&schema.description);
        for option in &schema.options {
            builder = builder.add_option(
                serenity::CreateCommandOption::new(
                    option_type(option.kind),
                    &option.name,
                    &option.description,
                )
                .required(option.required),
            );
        }

        let command = match self.guild_id {
            Some(guild_id) => guild_id.create_command(&*self.http, builder).await?,
            None => serenity::Command::create_global_command(&*self.http, builder).await?,
        };
        debug!("Upserted command `{}` with id {}", schema.name, command.id);
        Ok(Snowflake(command.id.get()))
    }

    async fn delete_command(&self, id: Snowflake) -> Result<()> {
        let command_id = serenity::CommandId::new(id.get());
        match self.guild_id {
            Some(guild_id) => guild_id.delete_command(&self.http, command_id).await?,
            None => serenity::Command::delete_global_command(&self.http, command_id).await?,
        }
        Ok(())
    }

    async fn reply(&self, interaction: &CommandInteraction, content: &str) -> Result<()> {
        let response = serenity::CreateInteractionResponse::Message(
            serenity::CreateInteractionResponseMessage::new().content(content),
        );
        self.http
            .create_interaction_response(
                serenity::InteractionId::new(interaction.id.get()),
                &interaction.token,
                &response,
                Vec::new(),
            )
            .await?;
        Ok(())
    }

    async fn send_message(&self, channel_id: Snowflake, content: &str) -> Result<Snowflake> {
        let message = serenity::ChannelId::new(channel_id.get())
            .say(&*self.http, content)
            .await?;
        Ok(Snowflake(message.id.get()))
    }

    async fn ban_user(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        delete_message_days: u8,
        reason: Option<&str>,
    ) -> Result<()> {
        let guild = serenity::GuildId::new(guild_id.get());
        let user = serenity::UserId::new(user_id.get());
        match reason {
            Some(reason) => {
                guild
                    .ban_with_reason(&self.http, user, delete_message_days, reason)
                    .await?;
            }
            None => guild.ban(&self.http, user, delete_message_days).await?,
        }
        Ok(())
    }

    async fn kick_user(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        reason: Option<&str>,
    ) -> Result<()> {
        let guild = serenity::GuildId::new(guild_id.get());
        let user = serenity::UserId::new(user_id.get());
        match reason {
            Some(reason) => guild.kick_with_reason(&self.http, user, reason).await?,
            None => guild.kick(&self.http, user).await?,
        }
        Ok(())
    }

    async fn create_role(&self, guild_id: Snowflake, name: &str) -> Result<Snowflake> {
        let role = serenity::GuildId::new(guild_id.get())
            .create_role(&*self.http, serenity::EditRole::new().name(name))
            .await?;
        Ok(Snowflake(role.id.get()))
    }

    fn presence(&self) -> Presence {
        self.presence.lock().clone()
    }

    async fn set_presence(&self, presence: Presence) -> Result<()> {
        let activity = presence.activity.as_ref().map(activity_data);
        let status = online_status(presence.status);
        let runners = self.shard_manager.runners.lock().await;
        for (shard_id, runner) in runners.iter() {
            trace!("Updating presence on shard {}", shard_id);
            runner.runner_tx.set_presence(activity.clone(), status);
        }
        drop(runners);
        debug!("Presence set to {:?}", presence);
        *self.presence.lock() = presence;
        Ok(())
    }

    async fn current_user(&self) -> Result<UserRef> {
        let user = self.http.get_current_user().await?;
        Ok(user_ref(&user))
    }

    async fn channel(&self, id: Snowflake) -> Result<ChannelRef> {
        let channel = serenity::ChannelId::new(id.get())
            .to_channel(&*self.http)
            .await?;
        match channel {
            serenity::Channel::Guild(channel) => Ok(guild_channel_ref(&channel)),
            serenity::Channel::Private(channel) => Ok(ChannelRef {
                id: Snowflake(channel.id.get()),
                name: Some(channel.recipient.name.clone()),
                kind: ChannelKind::Private,
                guild_id: None,
            }),
            _ => Err(Error::NotFound(format!("Channel with id '{id}'"))),
        }
    }

    async fn guild(&self, id: Snowflake) -> Result<GuildRef> {
        let guild = self
            .http
            .get_guild_with_counts(serenity::GuildId::new(id.get()))
            .await?;
        Ok(GuildRef {
            id: Snowflake(guild.id.get()),
            name: guild.name,
            owner_id: Snowflake(guild.owner_id.get()),
            member_count: guild.approximate_member_count,
        })
    }

    async fn shutdown(&self) {
        info!("Shutting down all shards");
        self.shard_manager.shutdown_all().await;
    }
}

const fn option_type(kind: OptionKind) -> serenity::CommandOptionType {
    match kind {
        OptionKind::String => serenity::CommandOptionType::String,
        OptionKind::Integer => serenity::CommandOptionType::Integer,
        OptionKind::Number => serenity::CommandOptionType::Number,
        OptionKind::Boolean => serenity::CommandOptionType::Boolean,
        OptionKind::User => serenity::CommandOptionType::User,
        OptionKind::Channel => serenity::CommandOptionType::Channel,
        OptionKind::Attachment => serenity::CommandOptionType::Attachment,
    }
}

fn activity_data(activity: &Activity) -> serenity::ActivityData {
    let name = activity.name.as_str();
    match activity.kind {
        ActivityKind::Playing => serenity::ActivityData::playing(name),
        ActivityKind::Watching => serenity::ActivityData::watching(name),
        ActivityKind::Listening => serenity::ActivityData::listening(name),
        ActivityKind::Competing => serenity::ActivityData::competing(name),
    }
}

const fn online_status(status: OnlineStatus) -> serenity::OnlineStatus {
    match status {
        OnlineStatus::Online => serenity::OnlineStatus::Online,
        OnlineStatus::Idle => serenity::OnlineStatus::Idle,
        OnlineStatus::DoNotDisturb => serenity::OnlineStatus::DoNotDisturb,
        OnlineStatus::Invisible => serenity::OnlineStatus::Invisible,
        OnlineStatus::Offline => serenity::OnlineStatus::Offline,
    }
}

fn user_ref(user: &serenity::User) -> UserRef {
    UserRef {
        id: Snowflake(user.id.get()),
        name: user.name.clone(),
        bot: user.bot,
    }
}

const fn channel_kind(kind: serenity::ChannelType) -> ChannelKind {
    match kind {
        serenity::ChannelType::Text => ChannelKind::Text,
        serenity::ChannelType::Private => ChannelKind::Private,
        serenity::ChannelType::Voice => ChannelKind::Voice,
        serenity::ChannelType::GroupDm => ChannelKind::GroupDm,
        serenity::ChannelType::Category => ChannelKind::Category,
        serenity::ChannelType::News => ChannelKind::News,
        serenity::ChannelType::NewsThread => ChannelKind::NewsThread,
        serenity::ChannelType::PublicThread => ChannelKind::PublicThread,
        serenity::ChannelType::PrivateThread => ChannelKind::PrivateThread,
        serenity::ChannelType::Stage => ChannelKind::Stage,
        serenity::ChannelType::Forum => ChannelKind::Forum,
        _ => ChannelKind::Unknown,
    }
}

fn guild_channel_ref(channel: &serenity::GuildChannel) -> ChannelRef {
    ChannelRef {
        id: Snowflake(channel.id.get()),
        name: Some(channel.name.clone()),
        kind: channel_kind(channel.kind),
        guild_id: Some(Snowflake(channel.guild_id.get())),
    }
}

fn message_ref(message: &serenity::Message) -> MessageRef {
    MessageRef {
        id: Snowflake(message.id.get()),
        channel_id: Snowflake(message.channel_id.get()),
        guild_id: message.guild_id.map(|id| Snowflake(id.get())),
        author: Some(user_ref(&message.author)),
        content: Some(message.content.clone()),
    }
}

fn reaction_event(reaction: &serenity::Reaction) -> ReactionEvent {
    ReactionEvent {
        channel_id: Snowflake(reaction.channel_id.get()),
        message_id: Snowflake(reaction.message_id.get()),
        guild_id: reaction.guild_id.map(|id| Snowflake(id.get())),
        user_id: reaction.user_id.map(|id| Snowflake(id.get())),
        emoji: reaction.emoji.to_string(),
    }
}

fn command_interaction(command: &serenity::CommandInteraction) -> CommandInteraction {
    let guild_id = command.guild_id.map(|id| Snowflake(id.get()));
    let resolved = &command.data.resolved;
    let options = command
        .data
        .options
        .iter()
        .map(|option| ResolvedOption {
            name: option.name.clone(),
            value: option_value(&option.value, resolved, guild_id),
        })
        .collect();

    CommandInteraction {
        id: Snowflake(command.id.get()),
        token: command.token.clone(),
        command_id: Snowflake(command.data.id.get()),
        command_name: command.data.name.clone(),
        user: user_ref(&command.user),
        channel_id: Snowflake(command.channel_id.get()),
        guild_id,
        options,
    }
}

fn option_value(
    value: &serenity::CommandDataOptionValue,
    resolved: &serenity::CommandDataResolved,
    guild_id: Option<Snowflake>,
) -> OptionValue {
    use serenity::CommandDataOptionValue as Value;

    match value {
        Value::String(s) => OptionValue::String(s.clone()),
        Value::Integer(i) => OptionValue::Integer(*i),
        Value::Number(n) => OptionValue::Number(*n),
        Value::Boolean(b) => OptionValue::Boolean(*b),
        Value::User(id) => resolved.users.get(id).map_or_else(
            || OptionValue::Other(id.get().to_string()),
            |user| OptionValue::User(user_ref(user)),
        ),
        Value::Channel(id) => {
            let channel = resolved.channels.get(id);
            OptionValue::Channel(ChannelRef {
                id: Snowflake(id.get()),
                name: channel.and_then(|c| c.name.clone()),
                kind: channel.map_or(ChannelKind::Unknown, |c| channel_kind(c.kind)),
                guild_id,
            })
        }
        Value::Attachment(id) => resolved.attachments.get(id).map_or_else(
            || OptionValue::Other(id.get().to_string()),
            |attachment| {
                OptionValue::Attachment(AttachmentRef {
                    id: Snowflake(attachment.id.get()),
                    filename: attachment.filename.clone(),
                    url: attachment.url.clone(),
                    size: u64::from(attachment.size),
                })
            },
        ),
        Value::Role(id) => OptionValue::Other(id.get().to_string()),
        Value::Mentionable(id) => OptionValue::Other(id.get().to_string()),
        other => OptionValue::Other(format!("{other:?}")),
    }
}

/// Maps a serenity event onto the closed [`GatewayEvent`] set. Events the
/// core does not route return `None`.
fn convert_event(event: &serenity::FullEvent) -> Option<GatewayEvent> {
    use serenity::FullEvent;

    let converted = match event {
        FullEvent::Ready { data_about_bot } => GatewayEvent::Ready(ReadyEvent {
            user: user_ref(&data_about_bot.user),
            guild_count: data_about_bot.guilds.len(),
        }),
        FullEvent::Message { new_message } => {
            GatewayEvent::MessageReceived(message_ref(new_message))
        }
        FullEvent::MessageUpdate { event, .. } => GatewayEvent::MessageUpdated(MessageRef {
            id: Snowflake(event.id.get()),
            channel_id: Snowflake(event.channel_id.get()),
            guild_id: event.guild_id.map(|id| Snowflake(id.get())),
            author: event.author.as_ref().map(user_ref),
            content: event.content.clone(),
        }),
        FullEvent::MessageDelete {
            channel_id,
            deleted_message_id,
            guild_id,
        } => GatewayEvent::MessageDeleted(MessageDeleteEvent {
            channel_id: Snowflake(channel_id.get()),
            message_id: Snowflake(deleted_message_id.get()),
            guild_id: guild_id.map(|id| Snowflake(id.get())),
        }),
        FullEvent::ReactionAdd { add_reaction } => {
            GatewayEvent::ReactionAdded(reaction_event(add_reaction))
        }
        FullEvent::ReactionRemove { removed_reaction } => {
            GatewayEvent::ReactionRemoved(reaction_event(removed_reaction))
        }
        FullEvent::GuildMemberAddition { new_member } => GatewayEvent::MemberJoined(MemberEvent {
            guild_id: Snowflake(new_member.guild_id.get()),
            user: user_ref(&new_member.user),
        }),
        FullEvent::GuildMemberRemoval { guild_id, user, .. } => {
            GatewayEvent::MemberLeft(MemberEvent {
                guild_id: Snowflake(guild_id.get()),
                user: user_ref(user),
            })
        }
        FullEvent::GuildBanAddition {
            guild_id,
            banned_user,
        } => GatewayEvent::MemberBanned(MemberEvent {
            guild_id: Snowflake(guild_id.get()),
            user: user_ref(banned_user),
        }),
        FullEvent::ChannelCreate { channel } => {
            GatewayEvent::ChannelCreated(guild_channel_ref(channel))
        }
        FullEvent::ChannelDelete { channel, .. } => {
            GatewayEvent::ChannelDeleted(guild_channel_ref(channel))
        }
        FullEvent::InteractionCreate {
            interaction: serenity::Interaction::Command(command),
        } => GatewayEvent::CommandInteraction(command_interaction(command)),
        _ => return None,
    };
    Some(converted)
}
