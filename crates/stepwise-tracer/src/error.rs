use std::fmt;

/// Error type of this crate.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A trace call issued to the operating system failed.
    #[error("{op}: {source}")]
    TraceIo {
        /// Name of the failing trace call.
        op: &'static str,

        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// The register ID is unknown to the register file.
    #[error("invalid register: {0}")]
    InvalidRegister(u64),

    /// The bytes at the given address are not a decodable instruction.
    #[error("cannot decode instruction at {addr:#x}: {bytes:02x?}")]
    Decode {
        /// Address of the instruction.
        addr: u64,

        /// Bytes fetched at that address.
        bytes: Vec<u8>,
    },

    /// The debuggee has terminated.
    ///
    /// This is terminal: no further request must be issued for this process.
    #[error("process {pid} has exited with {status}")]
    ProcessExited {
        /// ID of the exited process.
        pid: u64,

        /// How the process terminated.
        status: ExitStatus,
    },

    /// The hardware feature is not supported on this architecture.
    #[error("{0} not available on this architecture")]
    CapabilityUnavailable(&'static str),

    /// The OS returned a register set shorter than the expected layout.
    #[error("register set of {actual} bytes instead of {expected}")]
    ShortRegset {
        /// Size of the register layout.
        expected: usize,

        /// Size returned by the OS.
        actual: usize,
    },

    /// The trace thread no longer serves requests.
    #[error("trace thread is gone")]
    TraceThreadGone,
}

impl Error {
    /// Creates an [Error::TraceIo] for the given trace call.
    pub fn trace_io(op: &'static str, source: impl Into<std::io::Error>) -> Self {
        Self::TraceIo {
            op,
            source: source.into(),
        }
    }

    /// Returns whether this error reports the termination of the debuggee.
    pub const fn is_process_exited(&self) -> bool {
        matches!(self, Self::ProcessExited { .. })
    }
}

/// Termination status of a process or thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExitStatus {
    /// Exited normally with the given code.
    ExitCode(i32),

    /// Killed by the given signal.
    Signal(i32),
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExitCode(code) => write!(f, "exit code {code}"),
            Self::Signal(signal) => write!(f, "signal {signal}"),
        }
    }
}

/// Result type of this crate.
pub type Result<T> = core::result::Result<T, Error>;
