//! Tree-walking interpreter
//!
//! Values, environments, call frames, callables and the evaluator itself.

mod callable;
mod env;
mod error;
mod eval;
mod frame;
mod native;
mod output;
mod value;

pub use callable::{Callable, Class, Function, Instance};
pub use env::{child_env, EnvRef, Environment};
pub use error::{ErrorKind, InterpResult, RuntimeError};
pub use eval::{Flow, Interpreter};
pub use frame::{StackFrame, StackFrames};
pub use native::{
    invoke_checked, AvailableMemory, Clock, FileOpen, NativeCapability, NativeFault,
    NativeRegistry,
};
pub use output::OutputSink;
pub use value::Value;
