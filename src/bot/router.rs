//! Routes gateway events to registered script callbacks.
//!
//! Routing never blocks the gateway: every callback is queued on the
//! interpreter pool and the router returns immediately.

use super::params::resolve_arguments;
use super::registry::{CommandSlot, RegisteredCallback};
use super::session::{SessionInner, SessionState};
use crate::platform::{CommandInteraction, GatewayEvent};
use crate::script::{EventValue, ScriptValue};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Reply sent when a command is invoked at a depth whose node has no callback.
pub const INVALID_PARAMETERS_REPLY: &str = "Invalid number of parameters";

pub(crate) fn route(session: &SessionInner, event: GatewayEvent) {
    if session.state() != SessionState::Attached {
        trace!("Dropping {} event, session is {}", event.kind().name(), session.state());
        return;
    }

    let event = Arc::new(event);
    match event.as_ref() {
        GatewayEvent::CommandInteraction(interaction) => {
            route_command(session, &event, interaction);
        }
        _ => route_event(session, &event),
    }
}

fn route_event(session: &SessionInner, event: &Arc<GatewayEvent>) {
    let kind = event.kind().name();
    let callbacks = session.registry.event_callbacks(kind);
    if callbacks.is_empty() {
        trace!("No callbacks for {} event", kind);
        return;
    }

    debug!("Dispatching {} event to {} callbacks", kind, callbacks.len());
    for callback in &callbacks {
        let value = ScriptValue::Event(EventValue::new(
            Arc::clone(event),
            Arc::clone(&session.platform),
        ));
        dispatch(session, callback, vec![value]);
    }
}

fn route_command(session: &SessionInner, event: &Arc<GatewayEvent>, interaction: &CommandInteraction) {
    let name = &interaction.command_name;
    let depth = interaction.options.len();

    match session.registry.command_slot(name, depth) {
        CommandSlot::Unknown => {
            debug!("Interaction for unregistered command `{}`", name);
        }
        CommandSlot::OutOfRange => {
            debug!("Command `{}` has no slot for {} options, dropping", name, depth);
        }
        CommandSlot::Empty => {
            debug!("Command `{}` has no callback for {} options", name, depth);
            let platform = Arc::clone(&session.platform);
            let runtime = session.interpreter.runtime().clone();
            let interaction = interaction.clone();
            let submitted = session.interpreter.try_submit(Box::new(move || {
                if let Err(e) = runtime.block_on(platform.reply(&interaction, INVALID_PARAMETERS_REPLY)) {
                    warn!("Failed to reply to `{}`: {}", interaction.command_name, e);
                }
            }));
            if let Err(e) = submitted {
                debug!("Not replying to `{}`: {}", name, e);
            }
        }
        CommandSlot::Callback(callback) => {
            let value = ScriptValue::Event(EventValue::new(
                Arc::clone(event),
                Arc::clone(&session.platform),
            ));
            let args = resolve_arguments(value, &interaction.options);
            dispatch(session, &callback, args);
        }
    }
}

fn dispatch(session: &SessionInner, callback: &RegisteredCallback, args: Vec<ScriptValue>) {
    let function = callback.function().clone();
    if let Err(e) = session
        .interpreter
        .run_async(callback.scope(), function, args)
    {
        debug!("Not dispatching '{}': {}", callback.function().name(), e);
    }
}
