//! Execution contexts: the long-lived scope captured when a callback is
//! registered, and the short-lived branch each invocation runs in.

use super::frame::FrameId;
use super::interpreter::Interpreter;
use super::value::ScriptValue;
use std::collections::HashMap;
use std::future::Future;

/// Variable scope captured at registration time.
///
/// Owns one reference on its frame; dropping the scope releases it. Branches
/// taken from the scope hold their own reference on it, so in-flight
/// invocations keep working after the owner is gone.
#[derive(Debug)]
pub struct CapturedScope {
    interpreter: Interpreter,
    frame: FrameId,
}

impl CapturedScope {
    pub(crate) const fn new(interpreter: Interpreter, frame: FrameId) -> Self {
        Self { interpreter, frame }
    }

    #[must_use]
    pub const fn frame(&self) -> FrameId {
        self.frame
    }

    #[must_use]
    pub const fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    /// Reads a variable visible from this scope.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<ScriptValue> {
        self.interpreter.frames().lookup(self.frame, name)
    }

    /// Binds a variable in the captured frame. Only meaningful before the
    /// scope is handed to a registration; afterwards the frame is shared by
    /// every branch.
    pub fn define(&self, name: &str, value: ScriptValue) {
        self.interpreter.frames().define(self.frame, name, value);
    }

    /// Creates a fresh, empty frame chained to this scope.
    #[must_use]
    pub fn branch(&self) -> ExecutionContext {
        let frame = self
            .interpreter
            .frames()
            .alloc(Some(self.frame), HashMap::new());
        ExecutionContext {
            interpreter: self.interpreter.clone(),
            frame,
        }
    }
}

impl Drop for CapturedScope {
    fn drop(&mut self) {
        self.interpreter.frames().release(self.frame);
    }
}

/// The isolated context one callback invocation runs in.
///
/// Writes go to the context's own frame; reads fall through to the captured
/// scope and then the globals. The frame is discarded when the context drops.
#[derive(Debug)]
pub struct ExecutionContext {
    interpreter: Interpreter,
    frame: FrameId,
}

impl ExecutionContext {
    #[must_use]
    pub const fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    #[must_use]
    pub const fn frame(&self) -> FrameId {
        self.frame
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<ScriptValue> {
        self.interpreter.frames().lookup(self.frame, name)
    }

    pub fn set(&mut self, name: &str, value: ScriptValue) {
        self.interpreter.frames().define(self.frame, name, value);
    }

    /// Snapshots this context for a registration made from inside a callback.
    ///
    /// Local bindings are copied into a new long-lived frame that shares this
    /// context's parent, since the context's own frame dies with it.
    #[must_use]
    pub fn capture(&self) -> CapturedScope {
        let frames = self.interpreter.frames();
        let frame = frames.alloc(frames.parent(self.frame), frames.locals(self.frame));
        CapturedScope::new(self.interpreter.clone(), frame)
    }

    /// Runs a platform future to completion from callback code.
    ///
    /// Callbacks execute on blocking worker threads, where this is allowed.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.interpreter.runtime().block_on(future)
    }
}

impl Drop for ExecutionContext {
    fn drop(&mut self) {
        self.interpreter.frames().release(self.frame);
    }
}
