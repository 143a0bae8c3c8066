//! In-memory trace backend, standing in for `ptrace`.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use stepwise_debugger::arch::arm::GREGS_SIZE;
use stepwise_debugger::{Session, SessionConfig};
use stepwise_tracer::debugger::{ProcessMemory, RegsetKind, TraceOps, WaitStatus};

pub const PID: u64 = 100;

pub const SIGTRAP: i32 = 5;
pub const SIGUSR1: i32 = 10;
pub const SIGSTOP: i32 = 19;

pub const TRAP: [u8; 4] = [0xf0, 0x01, 0xf0, 0xe7];

/// Byte filling the fake memory, so that restored code is told apart from
/// unmapped memory.
pub const FILL: u8 = 0x5a;

#[derive(Debug, Default)]
pub struct FakeState {
    pub memory: HashMap<u64, u8>,
    pub regs: Vec<u8>,

    /// `None` when the OS refuses to provide the floating point registers.
    pub fpregs: Option<Vec<u8>>,

    pub waits: VecDeque<WaitStatus>,
    pub resumed: Vec<(u64, i32)>,
    pub stopped: Vec<(u64, u64)>,
    pub regset_writes: Vec<(u64, RegsetKind)>,

    /// Kind and buffer size of each register set read.
    pub regset_reads: Vec<(RegsetKind, usize)>,

    /// Memory at the time of each resume.
    pub resume_snapshots: Vec<HashMap<u64, u8>>,

    pub peeks: usize,
    pub pokes: usize,

    /// Names of the threads which issued trace calls.
    pub callers: HashSet<String>,
}

impl FakeState {
    pub fn write_bytes(&mut self, addr: u64, data: &[u8]) {
        for (i, b) in data.iter().enumerate() {
            self.memory.insert(addr + i as u64, *b);
        }
    }

    pub fn read_bytes(&self, addr: u64, len: usize) -> Vec<u8> {
        snapshot_bytes(&self.memory, addr, len)
    }

    fn record_caller(&mut self) {
        let name = std::thread::current().name().unwrap_or("<unnamed>").to_owned();
        self.callers.insert(name);
    }
}

pub fn snapshot_bytes(memory: &HashMap<u64, u8>, addr: u64, len: usize) -> Vec<u8> {
    (0..len as u64)
        .map(|i| memory.get(&(addr + i)).copied().unwrap_or(0))
        .collect()
}

/// Handle to the state of the fake OS, shared with the trace thread.
#[derive(Clone, Debug, Default)]
pub struct FakeBackend(Arc<Mutex<FakeState>>);

impl FakeBackend {
    /// Creates a debuggee stopped at `pc`, with `code` at `pc` and the
    /// given general registers.
    pub fn stopped_at(pc: u32, regs: &[(u64, u32)], code: &[u8]) -> Self {
        let backend = Self::default();

        {
            let mut state = backend.state();
            state.write_bytes(0x1000, &[FILL; 0x8000]);
            state.write_bytes(pc.into(), code);

            let mut values = regs.to_vec();
            values.push((15, pc));
            state.regs = gregs(&values);
        }

        backend
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.0.lock().expect("lock")
    }

    pub fn push_wait(&self, status: WaitStatus) {
        self.state().waits.push_back(status);
    }

    pub async fn session(&self, config: &SessionConfig, bulk: bool) -> Session<FakeOps, FakeMemory> {
        self.session_for(PID, config, bulk).await
    }

    pub async fn session_for(
        &self,
        process_id: u64,
        config: &SessionConfig,
        bulk: bool,
    ) -> Session<FakeOps, FakeMemory> {
        let ops = FakeOps(self.clone());

        let memory = FakeMemory {
            backend: self.clone(),
            enabled: bulk,
        };

        Session::with_backend(process_id, config, move || Ok(ops), memory)
            .await
            .expect("session")
    }
}

/// Builds a general register set.
pub fn gregs(values: &[(u64, u32)]) -> Vec<u8> {
    let mut raw = vec![0u8; GREGS_SIZE];

    for (id, value) in values {
        let off = *id as usize * 4;
        raw[off..off + 4].copy_from_slice(&value.to_le_bytes());
    }

    raw
}

pub struct FakeOps(FakeBackend);

impl TraceOps for FakeOps {
    const TRAP_SIGNAL: i32 = SIGTRAP;
    const STOP_SIGNAL: i32 = SIGSTOP;

    fn get_regset(
        &mut self,
        _thread_id: u64,
        kind: RegsetKind,
        buf: &mut [u8],
    ) -> stepwise_tracer::Result<usize> {
        let mut state = self.0.state();
        state.record_caller();

        state.regset_reads.push((kind, buf.len()));

        let regs = match kind {
            RegsetKind::General => state.regs.clone(),
            RegsetKind::FloatingPoint => state.fpregs.clone().unwrap_or_default(),
        };

        let len = regs.len().min(buf.len());
        buf[..len].copy_from_slice(&regs[..len]);

        Ok(len)
    }

    fn set_regset(
        &mut self,
        thread_id: u64,
        kind: RegsetKind,
        buf: &[u8],
    ) -> stepwise_tracer::Result<()> {
        let mut state = self.0.state();
        state.record_caller();

        state.regset_writes.push((thread_id, kind));

        match kind {
            RegsetKind::General => state.regs = buf.to_vec(),
            RegsetKind::FloatingPoint => state.fpregs = Some(buf.to_vec()),
        }

        Ok(())
    }

    fn peek_word(&mut self, _thread_id: u64, addr: u64) -> stepwise_tracer::Result<usize> {
        let mut state = self.0.state();
        state.record_caller();

        state.peeks += 1;

        let mut word = [0u8; size_of::<usize>()];
        let len = word.len();
        word.copy_from_slice(&state.read_bytes(addr, len));

        Ok(usize::from_ne_bytes(word))
    }

    fn poke_word(&mut self, _thread_id: u64, addr: u64, word: usize) -> stepwise_tracer::Result<()> {
        let mut state = self.0.state();
        state.record_caller();

        state.pokes += 1;
        state.write_bytes(addr, &word.to_ne_bytes());

        Ok(())
    }

    fn stop_thread(&mut self, process_id: u64, thread_id: u64) -> stepwise_tracer::Result<()> {
        let mut state = self.0.state();
        state.record_caller();

        state.stopped.push((process_id, thread_id));

        Ok(())
    }

    fn resume(&mut self, thread_id: u64, signal: i32) -> stepwise_tracer::Result<()> {
        let mut state = self.0.state();
        state.record_caller();

        state.resumed.push((thread_id, signal));

        let snapshot = state.memory.clone();
        state.resume_snapshots.push(snapshot);

        Ok(())
    }

    fn wait(&mut self) -> stepwise_tracer::Result<WaitStatus> {
        let mut state = self.0.state();
        state.record_caller();

        state.waits.pop_front().ok_or_else(|| {
            stepwise_tracer::Error::trace_io("waitpid", std::io::Error::from_raw_os_error(10))
        })
    }
}

/// Bulk memory transfer over the fake memory.
pub struct FakeMemory {
    backend: FakeBackend,
    enabled: bool,
}

impl ProcessMemory for FakeMemory {
    fn read(&self, _thread_id: u64, addr: u64, buf: &mut [u8]) -> std::io::Result<usize> {
        if !self.enabled {
            return Ok(0);
        }

        buf.copy_from_slice(&self.backend.state().read_bytes(addr, buf.len()));

        Ok(buf.len())
    }

    fn write(&self, _thread_id: u64, addr: u64, data: &[u8]) -> std::io::Result<usize> {
        if !self.enabled {
            return Ok(0);
        }

        self.backend.state().write_bytes(addr, data);

        Ok(data.len())
    }
}
