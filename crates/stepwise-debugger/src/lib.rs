//! This crate provides the ARM/Linux implementation of `stepwise-tracer`:
//! a debug session over a running process, with emulated single-stepping.
//!
//! ARM Linux offers no hardware single-step through `ptrace`. Stepping a
//! thread instead decodes the ARM-mode instruction at its program counter,
//! plants a trap (`UDF #16`) at every address where execution may continue,
//! resumes the thread, then restores the original code once it stops.
//!
//! ```no_run
//! use stepwise_debugger::{Session, SessionConfig};
//!
//! #[tokio::main]
//! async fn main() -> stepwise_debugger::Result<()> {
//!     let pid = 1234;
//!
//!     let session = Session::attach(pid, &SessionConfig::default()).await?;
//!
//!     let regs = session.get_registers(pid).await?;
//!
//!     // execute the instruction at the program counter
//!     let stop = session.single_step(pid).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Supported Platforms
//!
//! <table>
//!     <thead>
//!         <tr>
//!             <th>Host Machine</th>
//!             <th>Debuggee Platform</th>
//!         </tr>
//!     </thead>
//!     <tbody>
//!         <tr>
//!             <td>Linux <code>arm</code></td>
//!             <td><code>arm</code> (ARM mode)</td>
//!         </tr>
//!     </tbody>
//! </table>

/// Module implementing the supported architectures.
pub mod arch;

mod config;
mod session;
mod sys;

pub use self::config::{DEFAULT_TRACE_THREAD_NAME, SessionConfig};
pub use self::session::Session;
pub use self::sys::{ProcessVm, PtraceOps};
pub use stepwise_tracer::process::ThreadStop;
pub use stepwise_tracer::thread::ThreadHandle;
pub use stepwise_tracer::{Error, ExitStatus, Result};
