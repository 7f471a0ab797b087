use dotenvy::dotenv;
use scriptcord::bot::BotSession;
use scriptcord::config::{self, AppConfig};
use scriptcord::errors::{Error, Result};
use scriptcord::platform::discord::SerenityGateway;
use scriptcord::script::{Interpreter, ScriptError, ScriptFunction, ScriptValue};
use std::env;
use std::path::Path;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

fn load_app_config() -> Result<AppConfig> {
    match env::var("BOT_CONFIG") {
        Ok(path) => config::load_config(path),
        Err(_) if Path::new(DEFAULT_CONFIG_PATH).exists() => config::load_config(DEFAULT_CONFIG_PATH),
        Err(_) => {
            info!("No {} found, using defaults", DEFAULT_CONFIG_PATH);
            Ok(AppConfig::default())
        }
    }
}

/// Answers `!ping` in any channel the bot can read.
fn ping_handler() -> ScriptFunction {
    ScriptFunction::new("ping", 1, |ctx, args| {
        let event = args[0].expect_event()?;
        let is_ping = event
            .message()
            .and_then(|m| m.content)
            .is_some_and(|content| content.trim() == "!ping");
        if is_ping {
            ctx.block_on(event.reply("Pong!"))?;
        }
        Ok(ScriptValue::Null)
    })
}

/// `/greet [who]`: greets the caller, or the given user.
fn greet_command() -> ScriptValue {
    let greet_self = ScriptFunction::new("greet", 1, |ctx, args| {
        let event = args[0].expect_event()?;
        let name = event.user().map_or_else(|| "there".to_string(), |u| u.name);
        ctx.block_on(event.reply(&format!("Hello, {name}!")))?;
        Ok(ScriptValue::Null)
    });
    let greet_other = ScriptFunction::new("greet_who", 2, |ctx, args| {
        let event = args[0].expect_event()?;
        let who = args[1].as_user().ok_or(ScriptError::Type {
            expected: "DiscordUser",
            found: args[1].type_name(),
        })?;
        ctx.block_on(event.reply(&format!("Hello, {}!", who.name)))?;
        Ok(ScriptValue::Null)
    });

    ScriptValue::map([
        ("name", ScriptValue::from("greet")),
        ("description", ScriptValue::from("Say hello")),
        ("command", ScriptValue::from(greet_self)),
        (
            "next",
            ScriptValue::map([
                ("name", ScriptValue::from("who")),
                ("description", ScriptValue::from("Who to greet")),
                ("type", ScriptValue::from("user")),
                ("command", ScriptValue::from(greet_other)),
            ]),
        ),
    ])
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file, non-fatal since env vars can be set externally
    dotenv().ok();

    // 3. Load the application configuration
    let app_config = load_app_config()
        .inspect_err(|e| error!("Failed to load configuration: {}", e))?;

    // 4. Connect. The token is read right before use, never stored in config
    let token = env::var("DISCORD_BOT_TOKEN")
        .inspect_err(|e| error!("DISCORD_BOT_TOKEN not found: {}", e))
        .map_err(Error::EnvVar)?;
    let (gateway, mut client) = SerenityGateway::connect(&token, &app_config.bot).await?;

    // 5. Wire the script runtime to the session
    let interpreter = Interpreter::new(
        Handle::current(),
        app_config.runtime.max_concurrent_callbacks,
    );
    let session = BotSession::new(gateway, interpreter.clone());
    session.register_event("MessageReceived", interpreter.capture(), ping_handler())?;

    let client_task = tokio::spawn(async move {
        if let Err(e) = client.start().await {
            error!("Gateway client exited with error: {}", e);
        }
    });

    let id = session
        .add_command(interpreter.capture(), &greet_command())
        .await?;
    info!("Sample command /greet registered with id {}", id);

    // 6. Run until interrupted
    tokio::signal::ctrl_c().await?;
    info!("Interrupt received, shutting down");
    interpreter.shutdown();

    if tokio::time::timeout(Duration::from_secs(10), session.wait_stopped())
        .await
        .is_err()
    {
        warn!("Gateway did not report shutdown in time");
    }
    client_task.abort();
    Ok(())
}
