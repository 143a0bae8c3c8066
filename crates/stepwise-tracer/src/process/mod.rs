mod mem;
mod patch;
mod regs;
mod step;

use std::sync::OnceLock;

use crate::debugger::{ProcessMemory, TraceOps, WaitStatus};
use crate::error::ExitStatus;
use crate::executor::TraceExecutor;
use crate::thread::{ThreadHandle, ThreadRegistry};

/// State owned by the trace thread.
pub(crate) struct TraceState<O> {
    /// Trace calls of the OS.
    pub(crate) ops: O,

    /// Live threads of the debuggee.
    pub(crate) threads: ThreadRegistry,
}

/// How a waited thread has stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThreadStop {
    /// The thread has stopped by receiving a signal.
    Stopped {
        /// Signal that stopped the thread.
        signal: i32,
    },

    /// The thread has exited (the process is still alive).
    Exited(ExitStatus),
}

/// Traced process, with all trace calls funneled through its trace thread.
pub struct TracedProcess<O, M> {
    /// ID of the debuggee.
    process_id: u64,

    /// Executor of the trace calls.
    executor: TraceExecutor<TraceState<O>>,

    /// Bulk memory transfer.
    memory: M,

    /// Whether bulk memory transfer is attempted before word-wise transfer.
    bulk_memory: bool,

    /// Set once the debuggee has terminated.
    exit_status: OnceLock<ExitStatus>,
}

impl<O, M> TracedProcess<O, M>
where
    O: TraceOps + 'static,
    M: ProcessMemory,
{
    /// Spawns the trace thread of a debuggee.
    ///
    /// `init` is called **on the trace thread** and must attach to the
    /// debuggee, so that subsequent trace calls are accepted by the OS.
    pub async fn spawn<F>(
        process_id: u64,
        thread_name: impl Into<String>,
        init: F,
        memory: M,
    ) -> crate::Result<Self>
    where
        F: FnOnce() -> crate::Result<O> + Send + 'static,
    {
        let executor = TraceExecutor::spawn(thread_name, move || {
            let ops = init()?;

            let mut threads = ThreadRegistry::new();
            threads.register_thread_create(process_id);

            Ok(TraceState { ops, threads })
        })
        .await?;

        Ok(Self {
            process_id,
            executor,
            memory,
            bulk_memory: true,
            exit_status: OnceLock::new(),
        })
    }

    /// Enables or disables bulk memory transfer.
    pub const fn with_bulk_memory(mut self, enabled: bool) -> Self {
        self.bulk_memory = enabled;
        self
    }

    /// Returns the ID of the debuggee.
    pub const fn process_id(&self) -> u64 {
        self.process_id
    }

    /// Returns how the debuggee terminated, if it did.
    pub fn exit_status(&self) -> Option<ExitStatus> {
        self.exit_status.get().copied()
    }

    /// Returns the IDs of the live threads.
    pub async fn threads(&self) -> crate::Result<Vec<u64>> {
        self.trace(|state| Ok(state.threads.ids())).await
    }

    /// Returns the tracked state of a thread.
    pub async fn thread(&self, thread_id: u64) -> crate::Result<Option<ThreadHandle>> {
        self.trace(move |state| Ok(state.threads.get(thread_id).cloned()))
            .await
    }

    /// Updates the cached "stopped" flag of a thread.
    pub async fn set_thread_stopped(&self, thread_id: u64, stopped: bool) -> crate::Result<()> {
        self.trace(move |state| {
            if let Some(thread) = state.threads.get_mut(thread_id) {
                thread.set_stopped(stopped);
            }
            Ok(())
        })
        .await
    }

    /// Sends the stop signal to a thread.
    pub async fn stop(&self, thread_id: u64) -> crate::Result<()> {
        let process_id = self.process_id;

        self.trace(move |state| state.ops.stop_thread(process_id, thread_id))
            .await
    }

    /// Resumes a thread, delivering its pending signal.
    pub async fn resume(&self, thread_id: u64) -> crate::Result<()> {
        self.trace(move |state| {
            let signal = state
                .threads
                .get_mut(thread_id)
                .map_or(0, ThreadHandle::record_resume);

            state.ops.resume(thread_id, signal)
        })
        .await
    }

    /// Resumes a thread, delivering the given signal instead of its pending
    /// one.
    pub async fn resume_with_signal(&self, thread_id: u64, signal: i32) -> crate::Result<()> {
        self.trace(move |state| {
            if let Some(thread) = state.threads.get_mut(thread_id) {
                thread.record_resume();
            }

            state.ops.resume(thread_id, signal)
        })
        .await
    }

    /// Waits until the given thread stops or exits.
    ///
    /// The wait covers the **whole process**, so that its termination is not
    /// missed. Events of other threads update the thread registry and are not
    /// reported.
    pub async fn wait_for(&self, thread_id: u64) -> crate::Result<ThreadStop> {
        let process_id = self.process_id;

        let awaited = self
            .trace(move |state| state.await_thread(process_id, thread_id))
            .await?;

        match awaited {
            Awaited::Thread(stop) => Ok(stop),
            Awaited::ProcessExited(status) => {
                let _ = self.exit_status.set(status);

                tracing::debug!(pid = process_id, %status, "process exited");

                Err(crate::Error::ProcessExited {
                    pid: process_id,
                    status,
                })
            }
        }
    }

    /// Runs `f` on the trace thread, unless the debuggee has terminated.
    async fn trace<F, R>(&self, f: F) -> crate::Result<R>
    where
        F: FnOnce(&mut TraceState<O>) -> crate::Result<R> + Send + 'static,
        R: Send + 'static,
    {
        self.check_alive()?;
        self.executor.run(f).await?
    }

    fn check_alive(&self) -> crate::Result<()> {
        match self.exit_status.get() {
            Some(status) => Err(crate::Error::ProcessExited {
                pid: self.process_id,
                status: *status,
            }),
            None => Ok(()),
        }
    }
}

enum Awaited {
    Thread(ThreadStop),
    ProcessExited(ExitStatus),
}

impl<O: TraceOps> TraceState<O> {
    fn await_thread(&mut self, process_id: u64, thread_id: u64) -> crate::Result<Awaited> {
        loop {
            let status = self.ops.wait()?;

            match status {
                WaitStatus::Exited {
                    thread_id: exited_id,
                    exit_code,
                } => {
                    let exit_status = ExitStatus::ExitCode(exit_code);
                    if let Some(awaited) =
                        self.on_thread_exit(process_id, thread_id, exited_id, exit_status)
                    {
                        return Ok(awaited);
                    }
                }
                WaitStatus::Signaled {
                    thread_id: exited_id,
                    signal,
                } => {
                    let exit_status = ExitStatus::Signal(signal);
                    if let Some(awaited) =
                        self.on_thread_exit(process_id, thread_id, exited_id, exit_status)
                    {
                        return Ok(awaited);
                    }
                }
                WaitStatus::Stopped {
                    thread_id: stopped_id,
                    signal,
                } => {
                    let thread = self.threads.register_thread_create(stopped_id);

                    if signal == O::TRAP_SIGNAL {
                        thread.record_trap();
                    } else if signal == O::STOP_SIGNAL {
                        thread.set_stopped(true);
                    } else {
                        thread.record_signal(signal);
                    }

                    if stopped_id == thread_id {
                        return Ok(Awaited::Thread(ThreadStop::Stopped { signal }));
                    }

                    tracing::debug!(thread_id = stopped_id, signal, "unrelated thread stopped");
                }
                WaitStatus::ThreadCreated {
                    thread_id: parent_id,
                    new_thread_id,
                } => {
                    self.threads.register_thread_create(new_thread_id);

                    if parent_id == thread_id {
                        // the awaited stop hasn't happened yet
                        self.ops.resume(parent_id, 0)?;
                    } else if let Some(parent) = self.threads.get_mut(parent_id) {
                        parent.set_stopped(true);
                    }
                }
            }
        }
    }

    fn on_thread_exit(
        &mut self,
        process_id: u64,
        thread_id: u64,
        exited_id: u64,
        exit_status: ExitStatus,
    ) -> Option<Awaited> {
        if exited_id == process_id {
            return Some(Awaited::ProcessExited(exit_status));
        }

        self.threads.register_thread_exit(exited_id);

        if exited_id == thread_id {
            return Some(Awaited::Thread(ThreadStop::Exited(exit_status)));
        }

        tracing::debug!(thread_id = exited_id, %exit_status, "unrelated thread exited");

        None
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::ThreadStop;
    use crate::debugger::WaitStatus;
    use crate::error::ExitStatus;
    use crate::testing::{FakeOps, NoBulkMemory, SIGSEGV, SIGTRAP, spawn_fake};

    const PID: u64 = 100;

    #[test(tokio::test)]
    async fn wait_skips_unrelated_threads() {
        let mut ops = FakeOps::default();
        ops.waits.extend([
            WaitStatus::ThreadCreated {
                thread_id: PID,
                new_thread_id: 101,
            },
            WaitStatus::ThreadCreated {
                thread_id: PID,
                new_thread_id: 102,
            },
            WaitStatus::Exited {
                thread_id: 101,
                exit_code: 0,
            },
            WaitStatus::Stopped {
                thread_id: 102,
                signal: SIGSEGV,
            },
            WaitStatus::Stopped {
                thread_id: PID,
                signal: SIGTRAP,
            },
        ]);

        let process = spawn_fake(PID, ops, NoBulkMemory).await;

        let stop = process.wait_for(PID).await.expect("wait");
        assert_eq!(stop, ThreadStop::Stopped { signal: SIGTRAP });

        // the waited thread was resumed after each clone event
        let resumed = process
            .executor
            .run(|state| state.ops.resumed.clone())
            .await
            .expect("run");
        assert_eq!(resumed, [(PID, 0), (PID, 0)]);

        assert_eq!(process.threads().await.expect("threads"), [PID, 102]);

        let leader = process.thread(PID).await.expect("thread").expect("leader");
        assert!(leader.trap_hit());

        let other = process.thread(102).await.expect("thread").expect("thread");
        assert!(other.is_stopped());
        assert_eq!(other.pending_signal(), Some(SIGSEGV));

        process.resume(102).await.expect("resume");
        let resumed = process
            .executor
            .run(|state| state.ops.resumed.clone())
            .await
            .expect("run");
        assert_eq!(resumed.last(), Some(&(102, SIGSEGV)));
    }

    #[test(tokio::test)]
    async fn process_exit_is_terminal() {
        let mut ops = FakeOps::default();
        ops.waits.push_back(WaitStatus::Signaled {
            thread_id: PID,
            signal: 9,
        });

        let process = spawn_fake(PID, ops, NoBulkMemory).await;

        let err = process.wait_for(PID).await.expect_err("exited");
        assert!(matches!(
            err,
            crate::Error::ProcessExited {
                pid: PID,
                status: ExitStatus::Signal(9)
            }
        ));

        assert_eq!(process.exit_status(), Some(ExitStatus::Signal(9)));

        let err = process.threads().await.expect_err("exited");
        assert!(err.is_process_exited());

        let mut buf = [0u8; 4];
        let err = process
            .read_memory(PID, 0x1000, &mut buf)
            .await
            .expect_err("exited");
        assert!(err.is_process_exited());
    }

    #[test(tokio::test)]
    async fn waited_thread_exit_is_reported() {
        let mut ops = FakeOps::default();
        ops.waits.extend([
            WaitStatus::ThreadCreated {
                thread_id: PID,
                new_thread_id: 101,
            },
            WaitStatus::Exited {
                thread_id: 101,
                exit_code: 3,
            },
        ]);

        let process = spawn_fake(PID, ops, NoBulkMemory).await;

        let stop = process.wait_for(101).await.expect("wait");
        assert_eq!(stop, ThreadStop::Exited(ExitStatus::ExitCode(3)));
        assert_eq!(process.threads().await.expect("threads"), [PID]);
        assert_eq!(process.exit_status(), None);
    }
}
