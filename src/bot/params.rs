//! Turns the options of a command interaction into callback arguments.

use crate::platform::{OptionValue, ResolvedOption};
use crate::script::ScriptValue;

/// Converts one supplied option into a script value.
///
/// Channels the bot cannot message degrade to their id string, so callbacks
/// receiving a channel option must check the type they got.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn resolve_option(value: &OptionValue) -> ScriptValue {
    match value {
        OptionValue::Integer(i) => ScriptValue::Number(*i as f64),
        OptionValue::Number(n) => ScriptValue::Number(*n),
        OptionValue::Boolean(b) => ScriptValue::Bool(*b),
        OptionValue::User(user) => ScriptValue::User(user.clone()),
        OptionValue::Attachment(attachment) => ScriptValue::Attachment(attachment.clone()),
        OptionValue::Channel(channel) if channel.kind.supports_messages() => {
            ScriptValue::Channel(channel.clone())
        }
        OptionValue::Channel(channel) => ScriptValue::String(channel.id.to_string()),
        OptionValue::String(s) | OptionValue::Other(s) => ScriptValue::String(s.clone()),
    }
}

/// Builds the full argument list: the event first, then each option in the
/// order the platform reported it.
#[must_use]
pub fn resolve_arguments(event: ScriptValue, options: &[ResolvedOption]) -> Vec<ScriptValue> {
    let mut args = Vec::with_capacity(options.len() + 1);
    args.push(event);
    args.extend(options.iter().map(|option| resolve_option(&option.value)));
    args
}
