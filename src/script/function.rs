//! Callable script functions.

use super::context::ExecutionContext;
use super::error::{Result, ScriptError};
use super::value::ScriptValue;
use std::fmt;
use std::sync::Arc;

type NativeBody =
    dyn Fn(&mut ExecutionContext, Vec<ScriptValue>) -> Result<ScriptValue> + Send + Sync;

/// A function value scripts can pass around and the bot can invoke.
#[derive(Clone)]
pub struct ScriptFunction {
    name: Arc<str>,
    arity: Option<usize>,
    body: Arc<NativeBody>,
}

impl ScriptFunction {
    /// A function taking exactly `arity` arguments.
    pub fn new<F>(name: &str, arity: usize, body: F) -> Self
    where
        F: Fn(&mut ExecutionContext, Vec<ScriptValue>) -> Result<ScriptValue> + Send + Sync + 'static,
    {
        Self {
            name: Arc::from(name),
            arity: Some(arity),
            body: Arc::new(body),
        }
    }

    /// A function accepting any number of arguments.
    pub fn variadic<F>(name: &str, body: F) -> Self
    where
        F: Fn(&mut ExecutionContext, Vec<ScriptValue>) -> Result<ScriptValue> + Send + Sync + 'static,
    {
        Self {
            name: Arc::from(name),
            arity: None,
            body: Arc::new(body),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn arity(&self) -> Option<usize> {
        self.arity
    }

    /// Calls the function in `context`, checking arity first.
    pub fn invoke(&self, context: &mut ExecutionContext, args: Vec<ScriptValue>) -> Result<ScriptValue> {
        match self.arity {
            Some(expected) if expected != args.len() => {
                return Err(ScriptError::Arity {
                    name: self.name.to_string(),
                    expected,
                    got: args.len(),
                });
            }
            _ => {}
        }
        (self.body)(context, args)
    }
}

impl fmt::Debug for ScriptFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptFunction")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}
