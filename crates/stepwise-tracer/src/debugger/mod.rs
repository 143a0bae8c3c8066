mod arch;
mod ops;
mod registers;
mod watchpoint;

pub use self::arch::{Arch, Instruction, NextPc};
pub use self::ops::{ProcessMemory, RegsetKind, TraceOps, WaitStatus};
pub use self::registers::Registers;
pub use self::watchpoint::{HardwareWatchpoints, WatchKind, WatchpointState};
