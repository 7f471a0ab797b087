//! Slash command chain parsing.
//!
//! A command description is a nested map: the root names the command, and
//! each `next` entry adds one positional option. The nesting is a linear
//! chain, so it is flattened into a sequence of nodes before anything else
//! happens. Depth `d` of the chain is the option count a user supplied when
//! the callback at slot `d` should fire.

use crate::errors::{Error, Result};
use crate::platform::{CommandOptionSchema, CommandSchema, OptionKind};
use crate::script::{ScriptFunction, ScriptValue};
use std::collections::BTreeMap;

/// Most options a single command may declare (Discord's limit).
pub const MAX_COMMAND_DEPTH: usize = 25;

/// One node of a command chain.
#[derive(Debug, Clone)]
pub struct CommandNode {
    pub name: String,
    pub description: String,
    /// `None` only for the root
    pub kind: Option<OptionKind>,
    pub required: bool,
    pub callback: Option<ScriptFunction>,
}

/// The result of parsing a command description.
#[derive(Debug, Clone)]
pub struct ParsedCommand {
    pub schema: CommandSchema,
    /// One slot per chain depth; `None` where the node declared no `command`
    pub callbacks: Vec<Option<ScriptFunction>>,
}

impl ParsedCommand {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.schema.name
    }

    /// Deepest option index, i.e. `callbacks.len() - 1`.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.schema.options.len()
    }
}

/// Parses a script command description into the platform schema and the
/// depth-indexed callback list. Nothing is registered here.
pub fn parse_command(description: &ScriptValue) -> Result<ParsedCommand> {
    let chain = parse_chain(description)?;

    let mut nodes = chain.into_iter();
    let Some(root) = nodes.next() else {
        return Err(Error::MalformedCommand("empty command chain".to_string()));
    };

    let mut callbacks = vec![root.callback];
    let mut options = Vec::new();
    for node in nodes {
        let Some(kind) = node.kind else {
            return Err(Error::MalformedCommand(format!(
                "option '{}' has no type",
                node.name
            )));
        };
        options.push(CommandOptionSchema {
            name: node.name,
            description: node.description,
            kind,
            required: node.required,
        });
        callbacks.push(node.callback);
    }

    Ok(ParsedCommand {
        schema: CommandSchema {
            name: root.name,
            description: root.description,
            options,
        },
        callbacks,
    })
}

/// Flattens the nested `next` maps into chain order, validating each node.
pub fn parse_chain(description: &ScriptValue) -> Result<Vec<CommandNode>> {
    let mut nodes = Vec::new();
    let mut current = Some(description);

    while let Some(value) = current {
        let depth = nodes.len();
        if depth > MAX_COMMAND_DEPTH {
            return Err(Error::CommandTooDeep {
                max: MAX_COMMAND_DEPTH,
            });
        }

        let map = value.as_map().ok_or_else(|| {
            Error::MalformedCommand(format!(
                "depth {depth}: expected a map, found {}",
                value.type_name()
            ))
        })?;

        let kind = if depth == 0 {
            None
        } else {
            let type_name = required_string(map, "type", depth)?;
            Some(type_name.parse::<OptionKind>()?)
        };
        let name = required_string(map, "name", depth)?;
        let description = required_string(map, "description", depth)?;
        let required = optional_bool(map, "required", depth)?;
        let callback = optional_function(map, "command", depth)?;

        nodes.push(CommandNode {
            name: name.to_string(),
            description: description.to_string(),
            kind,
            required,
            callback,
        });

        current = map.get("next").filter(|next| !next.is_null());
    }

    Ok(nodes)
}

fn required_string<'a>(
    map: &'a BTreeMap<String, ScriptValue>,
    field: &str,
    depth: usize,
) -> Result<&'a str> {
    match map.get(field) {
        Some(ScriptValue::String(s)) if !s.trim().is_empty() => Ok(s),
        Some(ScriptValue::String(_)) => Err(Error::MalformedCommand(format!(
            "depth {depth}: '{field}' must not be empty"
        ))),
        Some(other) => Err(Error::MalformedCommand(format!(
            "depth {depth}: '{field}' must be a String, found {}",
            other.type_name()
        ))),
        None => Err(Error::MalformedCommand(format!(
            "depth {depth}: missing '{field}'"
        ))),
    }
}

fn optional_bool(map: &BTreeMap<String, ScriptValue>, field: &str, depth: usize) -> Result<bool> {
    match map.get(field) {
        None | Some(ScriptValue::Null) => Ok(false),
        Some(ScriptValue::Bool(b)) => Ok(*b),
        Some(other) => Err(Error::MalformedCommand(format!(
            "depth {depth}: '{field}' must be a Boolean, found {}",
            other.type_name()
        ))),
    }
}

fn optional_function(
    map: &BTreeMap<String, ScriptValue>,
    field: &str,
    depth: usize,
) -> Result<Option<ScriptFunction>> {
    match map.get(field) {
        None | Some(ScriptValue::Null) => Ok(None),
        Some(ScriptValue::Function(function)) => Ok(Some(function.clone())),
        Some(other) => Err(Error::MalformedCommand(format!(
            "depth {depth}: '{field}' must be a Function, found {}",
            other.type_name()
        ))),
    }
}
