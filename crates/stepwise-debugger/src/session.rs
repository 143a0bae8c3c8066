use stepwise_tracer::debugger::{ProcessMemory, RegsetKind, Registers, TraceOps};
use stepwise_tracer::process::{ThreadStop, TracedProcess};
use stepwise_tracer::thread::ThreadHandle;

use crate::SessionConfig;
use crate::arch::arm::{Arm, ArmRegisters, ArmWatchpoints, FPREGS_BUF_SIZE, FpRegisters, regnum};
use crate::sys::{ProcessVm, PtraceOps};

/// Debug session of an ARM process.
///
/// Every trace call is issued from the session's trace thread, so the
/// session itself may be used from any task.
pub struct Session<O = PtraceOps, M = ProcessVm> {
    /// Traced debuggee.
    process: TracedProcess<O, M>,

    /// Hardware watchpoints of the debuggee's threads.
    watchpoints: ArmWatchpoints,
}

impl Session {
    /// Attaches to a running process.
    ///
    /// The process is stopped once attached.
    #[tracing::instrument(name = "SessionAttach", skip(config))]
    pub async fn attach(process_id: u64, config: &SessionConfig) -> crate::Result<Self> {
        Self::with_backend(
            process_id,
            config,
            move || PtraceOps::attach(process_id),
            ProcessVm,
        )
        .await
    }
}

impl<O, M> Session<O, M>
where
    O: TraceOps + 'static,
    M: ProcessMemory,
{
    /// Creates a session over a custom trace backend.
    ///
    /// `init` is called on the trace thread, and must attach to the process.
    pub async fn with_backend<F>(
        process_id: u64,
        config: &SessionConfig,
        init: F,
        memory: M,
    ) -> crate::Result<Self>
    where
        F: FnOnce() -> crate::Result<O> + Send + 'static,
    {
        let process =
            TracedProcess::spawn(process_id, config.trace_thread_name.clone(), init, memory)
                .await?
                .with_bulk_memory(config.bulk_memory);

        Ok(Self {
            process,
            watchpoints: ArmWatchpoints,
        })
    }

    /// Returns the ID of the debuggee.
    pub const fn process_id(&self) -> u64 {
        self.process.process_id()
    }

    /// Returns how the debuggee terminated, if it did.
    pub fn exit_status(&self) -> Option<crate::ExitStatus> {
        self.process.exit_status()
    }

    /// Returns the register snapshot of a stopped thread.
    ///
    /// The floating point block is not loaded, see
    /// [fp_registers](Self::fp_registers).
    pub async fn get_registers(&self, thread_id: u64) -> crate::Result<ArmRegisters> {
        self.process.get_registers(thread_id).await
    }

    /// Returns the floating point block of a snapshot, fetching it if needed.
    pub async fn fp_registers<'a>(
        &self,
        thread_id: u64,
        regs: &'a mut ArmRegisters,
    ) -> crate::Result<&'a FpRegisters> {
        regs.load_fp_with(|| {
            self.process
                .get_regset(thread_id, RegsetKind::FloatingPoint, FPREGS_BUF_SIZE)
        })
        .await
    }

    /// Sets a register of a snapshot, and writes the snapshot back to the
    /// thread.
    ///
    /// The floating point block is only written back if the register belongs
    /// to it.
    pub async fn set_register(
        &self,
        thread_id: u64,
        regs: &mut ArmRegisters,
        id: u64,
        value: u64,
    ) -> crate::Result<()> {
        let fp_changed = regs.set_register(id, value)?;

        let mut regsets = vec![(RegsetKind::General, regs.regset().to_vec())];

        if let Some(fp) = regs.fp().filter(|_| fp_changed) {
            regsets.push((RegsetKind::FloatingPoint, fp.regset().to_vec()));
        }

        self.process.set_regsets(thread_id, regsets).await
    }

    /// Writes a saved snapshot back to a thread (including its floating
    /// point block, if loaded).
    pub async fn restore_registers(
        &self,
        thread_id: u64,
        saved: &ArmRegisters,
    ) -> crate::Result<()> {
        let mut regsets = vec![(RegsetKind::General, saved.regset().to_vec())];

        if let Some(fp) = saved.fp().filter(|fp| !fp.is_empty()) {
            regsets.push((RegsetKind::FloatingPoint, fp.regset().to_vec()));
        }

        self.process.set_regsets(thread_id, regsets).await
    }

    /// Sets the program counter of a thread.
    pub async fn set_pc(&self, thread_id: u64, pc: u64) -> crate::Result<()> {
        self.set_general_register(thread_id, regnum::PC, pc).await
    }

    /// Sets the stack pointer of a thread.
    pub async fn set_sp(&self, thread_id: u64, sp: u64) -> crate::Result<()> {
        self.set_general_register(thread_id, regnum::SP, sp).await
    }

    async fn set_general_register(&self, thread_id: u64, id: u64, value: u64) -> crate::Result<()> {
        let mut regs = self.get_registers(thread_id).await?;

        regs.set_register(id, value)?;

        self.process
            .set_regsets(thread_id, vec![(RegsetKind::General, regs.regset().to_vec())])
            .await
    }

    /// Reads memory of the debuggee, returning the number of bytes read.
    pub async fn read_memory(&self, thread_id: u64, addr: u64, buf: &mut [u8]) -> crate::Result<usize> {
        self.process.read_memory(thread_id, addr, buf).await
    }

    /// Writes memory of the debuggee, returning the number of bytes written.
    pub async fn write_memory(&self, thread_id: u64, addr: u64, data: &[u8]) -> crate::Result<usize> {
        self.process.write_memory(thread_id, addr, data).await
    }

    /// Executes a single instruction of a stopped thread.
    ///
    /// Concurrent steps of the same thread are not supported.
    #[tracing::instrument(skip(self))]
    pub async fn single_step(&self, thread_id: u64) -> crate::Result<ThreadStop> {
        self.process.single_step::<Arm>(thread_id).await
    }

    /// Sends the stop signal to a thread.
    pub async fn stop(&self, thread_id: u64) -> crate::Result<()> {
        self.process.stop(thread_id).await
    }

    /// Resumes a thread, delivering its pending signal.
    pub async fn resume(&self, thread_id: u64) -> crate::Result<()> {
        self.process.resume(thread_id).await
    }

    /// Resumes a thread, delivering `signal`.
    pub async fn resume_with_signal(&self, thread_id: u64, signal: i32) -> crate::Result<()> {
        self.process.resume_with_signal(thread_id, signal).await
    }

    /// Waits until a thread stops or exits.
    pub async fn wait_for(&self, thread_id: u64) -> crate::Result<ThreadStop> {
        self.process.wait_for(thread_id).await
    }

    /// Returns the IDs of the debuggee's live threads.
    pub async fn threads(&self) -> crate::Result<Vec<u64>> {
        self.process.threads().await
    }

    /// Returns the tracked state of a thread.
    pub async fn thread(&self, thread_id: u64) -> crate::Result<Option<ThreadHandle>> {
        self.process.thread(thread_id).await
    }

    /// Checks whether a thread is stopped at the OS level, and updates its
    /// tracked state.
    pub async fn refresh_stopped(&self, thread_id: u64) -> crate::Result<bool> {
        let stopped = crate::sys::thread_is_stopped(self.process_id(), thread_id)
            .await
            .map_err(|e| crate::Error::trace_io("read thread stat", e))?;

        self.process.set_thread_stopped(thread_id, stopped).await?;

        Ok(stopped)
    }

    /// Returns the hardware watchpoints of the debuggee.
    pub fn watchpoints(&mut self) -> &mut ArmWatchpoints {
        &mut self.watchpoints
    }
}
