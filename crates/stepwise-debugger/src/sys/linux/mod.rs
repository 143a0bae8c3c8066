mod mem;
mod proc;
mod ptrace;

pub use self::mem::ProcessVm;
pub use self::proc::thread_is_stopped;
pub use self::ptrace::PtraceOps;
