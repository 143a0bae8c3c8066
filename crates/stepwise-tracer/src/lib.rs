//! This crate implements the architecture- and OS-neutral core of a
//! debugger: thread control and single-step emulation of a traced process.
//!
//! Some architectures offer no hardware single-step trap. On these, stepping
//! is emulated: the instruction at the program counter is decoded, and a trap
//! instruction is planted at every address where execution may continue. The
//! planted code is restored once the thread stops again.
//!
//! Three components are provided:
//! - The [trace executor](self::executor::TraceExecutor), which funnels every
//!   trace call onto the single OS thread allowed to issue them.
//! - The [traced process](self::process::TracedProcess), which implements
//!   memory access, register access, thread control and step emulation on
//!   top of the executor.
//! - A few traits to implement the [OS primitives](self::debugger::TraceOps)
//!   and the [architecture](self::debugger::Arch) of the debuggee.
//!
//! <div class="warning">
//!
//! *This crate doesn't attach to anything on its own! The OS primitives and
//! the architecture are provided by `stepwise-debugger`.*
//!
//! </div>

/// Module containing traits for implementing a debugger backend.
pub mod debugger;

mod error;

/// Module implementing the trace executor.
pub mod executor;

/// Module implementing the traced process.
pub mod process;

/// Module implementing thread tracking.
pub mod thread;

#[cfg(test)]
mod testing;

pub use self::error::{Error, ExitStatus, Result};
