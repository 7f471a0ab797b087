//! Script runtime seam.
//!
//! The bot binding needs four things from an interpreter: a way to branch an
//! isolated execution context, a worker pool to run callbacks on, a way to
//! invoke a function value, and conversion of platform objects into script
//! values. This module provides exactly those.

pub mod context;
pub mod error;
pub mod event;
pub mod frame;
pub mod function;
pub mod interpreter;
pub mod pool;
pub mod value;

pub use context::{CapturedScope, ExecutionContext};
pub use error::{Result, ScriptError};
pub use event::EventValue;
pub use frame::{FrameArena, FrameId};
pub use function::ScriptFunction;
pub use interpreter::{Interpreter, ReportedError};
pub use pool::{BlockingPool, Job, TaskPool};
pub use value::ScriptValue;
