use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Malformed command: {0}")]
    MalformedCommand(String),

    #[error("Invalid option type '{0}'")]
    InvalidOptionType(String),

    #[error("Slash command went too deep (more than {max} options)")]
    CommandTooDeep { max: usize },

    #[error("Bot session is closed")]
    SessionClosed,

    #[error("Invalid id '{0}'")]
    InvalidId(String),

    #[error("'{0}' is an invalid activity")]
    InvalidActivity(String),

    #[error("'{0}' is an invalid status")]
    InvalidStatus(String),

    #[error("{0} couldn't be found")]
    NotFound(String),

    #[error("Platform error: {0}")]
    Platform(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    #[error("Serenity/Poise framework error: {0}")]
    #[allow(clippy::enum_variant_names)]
    FrameworkError(Box<poise::serenity_prelude::Error>),
}

impl From<poise::serenity_prelude::Error> for Error {
    fn from(value: poise::serenity_prelude::Error) -> Self {
        Error::FrameworkError(Box::new(value))
    }
}

// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
