//! The interpreter handle the bot binding runs against.
//!
//! Owns the frame arena, the worker pool, the error channel, and the list of
//! teardown hooks. Cloning is cheap; every clone refers to the same runtime.

use super::context::{CapturedScope, ExecutionContext};
use super::error::{Result, ScriptError};
use super::frame::{FrameArena, FrameId};
use super::function::ScriptFunction;
use super::pool::{BlockingPool, Job, TaskPool};
use super::value::ScriptValue;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tracing::{debug, error, info, trace};

/// Capacity of the error broadcast; slow subscribers lose the oldest errors.
const ERROR_CHANNEL_CAPACITY: usize = 256;

type ShutdownHook = Box<dyn FnOnce() + Send>;

/// A callback failure as published on the interpreter's error channel.
#[derive(Debug, Clone)]
pub struct ReportedError {
    pub function: String,
    pub error: ScriptError,
}

struct Inner {
    frames: FrameArena,
    global: FrameId,
    pool: Arc<dyn TaskPool>,
    runtime: Handle,
    errors: broadcast::Sender<ReportedError>,
    shutdown_hooks: Mutex<Vec<ShutdownHook>>,
    shutting_down: AtomicBool,
}

#[derive(Clone)]
pub struct Interpreter {
    inner: Arc<Inner>,
}

impl fmt::Debug for Interpreter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interpreter")
            .field("global", &self.inner.global)
            .field("live_frames", &self.inner.frames.live())
            .field("shutting_down", &self.is_shutting_down())
            .finish_non_exhaustive()
    }
}

impl Interpreter {
    /// Creates an interpreter whose callbacks run on `runtime`'s blocking
    /// threads, at most `max_concurrent` at once.
    #[must_use]
    pub fn new(runtime: Handle, max_concurrent: usize) -> Self {
        let pool = Arc::new(BlockingPool::new(runtime.clone(), max_concurrent));
        Self::with_pool(runtime, pool)
    }

    /// Creates an interpreter with a custom task pool.
    #[must_use]
    pub fn with_pool(runtime: Handle, pool: Arc<dyn TaskPool>) -> Self {
        let frames = FrameArena::new();
        let global = frames.alloc(None, HashMap::new());
        let (errors, _) = broadcast::channel(ERROR_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                frames,
                global,
                pool,
                runtime,
                errors,
                shutdown_hooks: Mutex::new(Vec::new()),
                shutting_down: AtomicBool::new(false),
            }),
        }
    }

    pub(crate) fn frames(&self) -> &FrameArena {
        &self.inner.frames
    }

    #[must_use]
    pub fn runtime(&self) -> &Handle {
        &self.inner.runtime
    }

    #[must_use]
    pub fn global(&self, name: &str) -> Option<ScriptValue> {
        self.inner.frames.lookup(self.inner.global, name)
    }

    pub fn set_global(&self, name: &str, value: ScriptValue) {
        self.inner.frames.define(self.inner.global, name, value);
    }

    /// Number of live frames, globals included.
    #[must_use]
    pub fn live_frames(&self) -> usize {
        self.inner.frames.live()
    }

    /// Captures the top-level scope for a registration made outside any
    /// callback.
    #[must_use]
    pub fn capture(&self) -> CapturedScope {
        let frame = self
            .inner
            .frames
            .alloc(Some(self.inner.global), HashMap::new());
        CapturedScope::new(self.clone(), frame)
    }

    /// Runs `function` asynchronously in a fresh branch of `scope`.
    ///
    /// Returns as soon as the job is queued. Failures inside the callback are
    /// reported on the error channel and never reach the caller.
    pub fn run_async(
        &self,
        scope: &CapturedScope,
        function: ScriptFunction,
        args: Vec<ScriptValue>,
    ) -> Result<()> {
        if self.is_shutting_down() {
            return Err(ScriptError::ShuttingDown);
        }
        let context = scope.branch();
        let interpreter = self.clone();
        self.try_submit(Box::new(move || interpreter.invoke(context, &function, args)))
    }

    fn invoke(&self, mut context: ExecutionContext, function: &ScriptFunction, args: Vec<ScriptValue>) {
        trace!("Invoking '{}' with {} arguments", function.name(), args.len());
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| function.invoke(&mut context, args)));
        drop(context);
        match outcome {
            Ok(Ok(_)) => {}
            Ok(Err(error)) => self.report_error(function.name(), error),
            Err(_) => self.report_error(
                function.name(),
                ScriptError::Panicked(function.name().to_string()),
            ),
        }
    }

    /// Queues arbitrary work on the interpreter's worker pool, unless
    /// teardown has started.
    pub fn try_submit(&self, job: Job) -> Result<()> {
        if self.is_shutting_down() {
            return Err(ScriptError::ShuttingDown);
        }
        self.inner.pool.submit(job);
        Ok(())
    }

    /// Logs a callback failure and publishes it to subscribers.
    pub fn report_error(&self, function: &str, error: ScriptError) {
        error!("Error in script function '{}': {}", function, error);
        // No subscribers is fine
        let _ = self.inner.errors.send(ReportedError {
            function: function.to_string(),
            error,
        });
    }

    /// Receives every error reported after this call.
    #[must_use]
    pub fn subscribe_errors(&self) -> broadcast::Receiver<ReportedError> {
        self.inner.errors.subscribe()
    }

    /// Registers work to run when the interpreter tears down. A hook added
    /// after teardown started runs immediately.
    pub fn add_shutdown_hook<F>(&self, hook: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut hooks = self.inner.shutdown_hooks.lock();
        // The flag only flips under this lock, so a hook is either taken by
        // `shutdown` or run here, never lost
        if self.is_shutting_down() {
            drop(hooks);
            hook();
            return;
        }
        hooks.push(Box::new(hook));
    }

    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.inner.shutting_down.load(Ordering::SeqCst)
    }

    /// Begins teardown: new async runs are refused and every hook runs once.
    pub fn shutdown(&self) {
        let hooks: Vec<ShutdownHook> = {
            let mut pending = self.inner.shutdown_hooks.lock();
            if self.inner.shutting_down.swap(true, Ordering::SeqCst) {
                debug!("Interpreter shutdown already in progress");
                return;
            }
            std::mem::take(&mut *pending)
        };
        info!("Interpreter shutting down, running {} hooks", hooks.len());
        for hook in hooks {
            hook();
        }
    }
}
