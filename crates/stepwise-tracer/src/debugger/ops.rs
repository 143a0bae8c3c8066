/// Register set transferred by a trace call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegsetKind {
    /// General-purpose registers.
    General,

    /// Floating-point registers.
    FloatingPoint,
}

/// Status reported by the process-wide wait primitive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitStatus {
    /// A thread has stopped by receiving a signal.
    Stopped {
        /// ID of the stopped thread.
        thread_id: u64,

        /// Signal that stopped the thread.
        signal: i32,
    },

    /// A thread has created a new thread (and is stopped).
    ThreadCreated {
        /// ID of the creating thread.
        thread_id: u64,

        /// ID of the new thread.
        new_thread_id: u64,
    },

    /// A thread has exited.
    Exited {
        /// ID of the exited thread.
        thread_id: u64,

        /// Exit code of the thread.
        exit_code: i32,
    },

    /// A thread was killed by a signal.
    Signaled {
        /// ID of the killed thread.
        thread_id: u64,

        /// Signal that killed the thread.
        signal: i32,
    },
}

impl WaitStatus {
    /// Returns the ID of the thread reporting this status.
    pub const fn thread_id(&self) -> u64 {
        match *self {
            Self::Stopped { thread_id, .. }
            | Self::ThreadCreated { thread_id, .. }
            | Self::Exited { thread_id, .. }
            | Self::Signaled { thread_id, .. } => thread_id,
        }
    }
}

/// Trait implementing the trace calls of the operating system.
///
/// <div class="warning">
///
/// An implementor is owned by the [trace executor](crate::executor::TraceExecutor)
/// and must only ever be called from its thread: the OS only accepts trace
/// calls for a debuggee from the thread that attached to it.
///
/// </div>
///
/// Implementors report success as `Ok`, whatever "no error" sentinel the
/// underlying platform call uses.
pub trait TraceOps {
    /// Signal delivered to a thread by a trap instruction.
    const TRAP_SIGNAL: i32;

    /// Signal sent by [stop_thread](Self::stop_thread).
    const STOP_SIGNAL: i32;

    /// Fetches a register set into `buf`.
    ///
    /// Returns the number of bytes written by the OS, which may be smaller
    /// than `buf`. A register set the OS refuses to provide for the current
    /// thread state yields `Ok(0)`.
    fn get_regset(&mut self, thread_id: u64, kind: RegsetKind, buf: &mut [u8])
    -> crate::Result<usize>;

    /// Writes a register set from `buf`.
    fn set_regset(&mut self, thread_id: u64, kind: RegsetKind, buf: &[u8]) -> crate::Result<()>;

    /// Reads one machine word of the debuggee's memory.
    fn peek_word(&mut self, thread_id: u64, addr: u64) -> crate::Result<usize>;

    /// Writes one machine word of the debuggee's memory.
    fn poke_word(&mut self, thread_id: u64, addr: u64, word: usize) -> crate::Result<()>;

    /// Sends the stop signal to a single thread of the process.
    fn stop_thread(&mut self, process_id: u64, thread_id: u64) -> crate::Result<()>;

    /// Resumes a stopped thread, delivering `signal` (`0` for none).
    fn resume(&mut self, thread_id: u64, signal: i32) -> crate::Result<()>;

    /// Waits for the next status change of **any** thread of the debuggee.
    fn wait(&mut self) -> crate::Result<WaitStatus>;
}

/// Trait implementing bulk cross-process memory transfer.
///
/// Unlike [TraceOps], these calls may be issued from any thread.
pub trait ProcessMemory: Send + Sync + 'static {
    /// Reads memory at `addr` into `buf`, returning the number of bytes read.
    fn read(&self, thread_id: u64, addr: u64, buf: &mut [u8]) -> std::io::Result<usize>;

    /// Writes `data` into memory at `addr`, returning the number of bytes
    /// written.
    fn write(&self, thread_id: u64, addr: u64, data: &[u8]) -> std::io::Result<usize>;
}
