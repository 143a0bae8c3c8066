use std::ffi::c_void;

use nix::errno::Errno;
use nix::libc;
use nix::sys::ptrace;
use nix::sys::signal::Signal;
use nix::sys::wait::{self, WaitPidFlag, waitpid};
use nix::unistd::Pid;
use stepwise_tracer::debugger::{RegsetKind, TraceOps, WaitStatus};

/// Note type of the general register set.
const NT_PRSTATUS: libc::c_ulong = 1;

/// Note type of the VFP register set (`NT_PRFPREG` is the legacy FPA state).
const NT_ARM_VFP: libc::c_ulong = 0x400;

/// Trace calls of a debuggee, backed by `ptrace`.
///
/// <div class="warning">
///
/// This must only be created and used from the trace thread, see
/// [TraceExecutor](stepwise_tracer::executor::TraceExecutor).
///
/// </div>
pub struct PtraceOps {
    process_id: Pid,
}

impl PtraceOps {
    /// Attaches to the process with the given ID, and waits for it to stop.
    ///
    /// Threads created afterwards are traced as well.
    pub fn attach(process_id: u64) -> crate::Result<Self> {
        let pid = Pid::from_raw(process_id as i32);

        ptrace::attach(pid)
            .inspect_err(|e| tracing::error!(error = %e, pid = process_id, "ptrace(PTRACE_ATTACH)"))
            .map_err(|e| crate::Error::trace_io("ptrace(PTRACE_ATTACH)", e))?;

        let ops = Self { process_id: pid };

        loop {
            let status = waitpid(pid, Some(WaitPidFlag::__WALL))
                .map_err(|e| crate::Error::trace_io("waitpid", e))?;

            match status {
                wait::WaitStatus::Stopped(_, Signal::SIGSTOP) => break,
                wait::WaitStatus::Stopped(_, signal) => {
                    // not ours, deliver it later
                    tracing::debug!(?signal, "signal received before attach stop");
                    ptrace::cont(pid, signal)
                        .map_err(|e| crate::Error::trace_io("ptrace(PTRACE_CONT)", e))?;
                }
                wait::WaitStatus::Exited(_, code) => {
                    return Err(crate::Error::ProcessExited {
                        pid: process_id,
                        status: crate::ExitStatus::ExitCode(code),
                    });
                }
                wait::WaitStatus::Signaled(_, signal, _) => {
                    return Err(crate::Error::ProcessExited {
                        pid: process_id,
                        status: crate::ExitStatus::Signal(signal as i32),
                    });
                }
                status => tracing::trace!(?status, "ignored wait status"),
            }
        }

        ptrace::setoptions(pid, ptrace::Options::PTRACE_O_TRACECLONE)
            .map_err(|e| crate::Error::trace_io("ptrace(PTRACE_SETOPTIONS)", e))?;

        tracing::debug!(pid = process_id, "attached");

        Ok(ops)
    }
}

impl Drop for PtraceOps {
    fn drop(&mut self) {
        match ptrace::detach(self.process_id, None) {
            Ok(()) => tracing::debug!(pid = self.process_id.as_raw(), "detached"),
            Err(Errno::ESRCH) => (),
            Err(e) => tracing::error!(error = %e, pid = self.process_id.as_raw(), "ptrace(PTRACE_DETACH)"),
        }
    }
}

const fn note_type(kind: RegsetKind) -> libc::c_ulong {
    match kind {
        RegsetKind::General => NT_PRSTATUS,
        RegsetKind::FloatingPoint => NT_ARM_VFP,
    }
}

fn tid(thread_id: u64) -> Pid {
    Pid::from_raw(thread_id as i32)
}

impl TraceOps for PtraceOps {
    const TRAP_SIGNAL: i32 = libc::SIGTRAP;
    const STOP_SIGNAL: i32 = libc::SIGSTOP;

    fn get_regset(
        &mut self,
        thread_id: u64,
        kind: RegsetKind,
        buf: &mut [u8],
    ) -> crate::Result<usize> {
        let mut iov = libc::iovec {
            iov_base: buf.as_mut_ptr().cast(),
            iov_len: buf.len(),
        };

        let res = unsafe {
            Errno::result(libc::ptrace(
                ptrace::Request::PTRACE_GETREGSET as u32,
                thread_id as libc::pid_t,
                note_type(kind),
                &mut iov as *mut libc::iovec,
            ))
        };

        match res {
            // the kernel shrinks the iovec to the size of the register set
            Ok(_) => Ok(iov.iov_len),
            Err(Errno::ENODEV) => {
                tracing::debug!(thread_id, ?kind, "register set not available");
                Ok(0)
            }
            Err(e) => Err(crate::Error::trace_io("ptrace(PTRACE_GETREGSET)", e)),
        }
    }

    fn set_regset(&mut self, thread_id: u64, kind: RegsetKind, buf: &[u8]) -> crate::Result<()> {
        let mut iov = libc::iovec {
            iov_base: buf.as_ptr() as *mut c_void,
            iov_len: buf.len(),
        };

        unsafe {
            Errno::result(libc::ptrace(
                ptrace::Request::PTRACE_SETREGSET as u32,
                thread_id as libc::pid_t,
                note_type(kind),
                &mut iov as *mut libc::iovec,
            ))
        }
        .map_err(|e| crate::Error::trace_io("ptrace(PTRACE_SETREGSET)", e))?;

        Ok(())
    }

    fn peek_word(&mut self, thread_id: u64, addr: u64) -> crate::Result<usize> {
        ptrace::read(tid(thread_id), addr as ptrace::AddressType)
            .map(|word| word as usize)
            .map_err(|e| crate::Error::trace_io("ptrace(PTRACE_PEEKDATA)", e))
    }

    fn poke_word(&mut self, thread_id: u64, addr: u64, word: usize) -> crate::Result<()> {
        ptrace::write(tid(thread_id), addr as ptrace::AddressType, word as libc::c_long)
            .map_err(|e| crate::Error::trace_io("ptrace(PTRACE_POKEDATA)", e))
    }

    fn stop_thread(&mut self, process_id: u64, thread_id: u64) -> crate::Result<()> {
        unsafe {
            Errno::result(libc::syscall(
                libc::SYS_tgkill,
                process_id as libc::pid_t,
                thread_id as libc::pid_t,
                libc::SIGSTOP,
            ))
        }
        .inspect_err(|e| tracing::error!(error = %e, thread_id, "tgkill"))
        .map_err(|e| crate::Error::trace_io("tgkill", e))?;

        Ok(())
    }

    fn resume(&mut self, thread_id: u64, signal: i32) -> crate::Result<()> {
        let signal = match signal {
            0 => None,
            signal => Some(
                Signal::try_from(signal).map_err(|e| crate::Error::trace_io("ptrace(PTRACE_CONT)", e))?,
            ),
        };

        ptrace::cont(tid(thread_id), signal)
            .map_err(|e| crate::Error::trace_io("ptrace(PTRACE_CONT)", e))
    }

    fn wait(&mut self) -> crate::Result<WaitStatus> {
        loop {
            let status = waitpid(None, Some(WaitPidFlag::__WALL))
                .inspect_err(|e| tracing::error!(error = %e, "waitpid"))
                .map_err(|e| crate::Error::trace_io("waitpid", e))?;

            let status = match status {
                wait::WaitStatus::Stopped(pid, signal) => WaitStatus::Stopped {
                    thread_id: pid.as_raw() as u64,
                    signal: signal as i32,
                },
                wait::WaitStatus::PtraceEvent(pid, _, libc::PTRACE_EVENT_CLONE) => {
                    let new_thread_id = ptrace::getevent(pid)
                        .map_err(|e| crate::Error::trace_io("ptrace(PTRACE_GETEVENTMSG)", e))?;

                    WaitStatus::ThreadCreated {
                        thread_id: pid.as_raw() as u64,
                        new_thread_id: new_thread_id as u64,
                    }
                }
                wait::WaitStatus::PtraceEvent(pid, signal, _) => WaitStatus::Stopped {
                    thread_id: pid.as_raw() as u64,
                    signal: signal as i32,
                },
                wait::WaitStatus::Exited(pid, exit_code) => WaitStatus::Exited {
                    thread_id: pid.as_raw() as u64,
                    exit_code,
                },
                wait::WaitStatus::Signaled(pid, signal, _) => WaitStatus::Signaled {
                    thread_id: pid.as_raw() as u64,
                    signal: signal as i32,
                },
                status => {
                    tracing::trace!(?status, "ignored wait status");
                    continue;
                }
            };

            return Ok(status);
        }
    }
}
