//! Fake trace backend and toy architecture, for unit tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::mem::size_of;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::debugger::{
    Arch, Instruction, NextPc, ProcessMemory, RegsetKind, Registers, TraceOps, WaitStatus,
};
use crate::process::TracedProcess;

pub const SIGTRAP: i32 = 5;
pub const SIGSEGV: i32 = 11;
pub const SIGSTOP: i32 = 19;

const EFAULT: i32 = 14;
const ECHILD: i32 = 10;

/// In-memory trace backend.
///
/// Unmapped memory reads as zeroes.
#[derive(Debug, Default)]
pub struct FakeOps {
    pub memory: HashMap<u64, u8>,
    pub regs: Vec<u8>,
    pub fpregs: Vec<u8>,
    pub waits: VecDeque<WaitStatus>,
    pub resumed: Vec<(u64, i32)>,
    pub stopped: Vec<(u64, u64)>,
    pub resume_snapshots: Vec<HashMap<u64, u8>>,
    pub fail_peeks_at: HashSet<u64>,
    pub fail_pokes_at: HashSet<u64>,
    pub peeks: usize,
    pub pokes: usize,
}

impl FakeOps {
    pub fn write_bytes(&mut self, addr: u64, data: &[u8]) {
        for (i, b) in data.iter().enumerate() {
            self.memory.insert(addr + i as u64, *b);
        }
    }

    pub fn read_bytes(&self, addr: u64, len: usize) -> Vec<u8> {
        read_snapshot(&self.memory, addr, len)
    }
}

pub fn read_snapshot(memory: &HashMap<u64, u8>, addr: u64, len: usize) -> Vec<u8> {
    (0..len as u64)
        .map(|i| memory.get(&(addr + i)).copied().unwrap_or(0))
        .collect()
}

impl TraceOps for FakeOps {
    const TRAP_SIGNAL: i32 = SIGTRAP;
    const STOP_SIGNAL: i32 = SIGSTOP;

    fn get_regset(
        &mut self,
        _thread_id: u64,
        kind: RegsetKind,
        buf: &mut [u8],
    ) -> crate::Result<usize> {
        let regs = match kind {
            RegsetKind::General => &self.regs,
            RegsetKind::FloatingPoint => &self.fpregs,
        };

        let len = regs.len().min(buf.len());
        buf[..len].copy_from_slice(&regs[..len]);

        Ok(len)
    }

    fn set_regset(&mut self, _thread_id: u64, kind: RegsetKind, buf: &[u8]) -> crate::Result<()> {
        match kind {
            RegsetKind::General => self.regs = buf.to_vec(),
            RegsetKind::FloatingPoint => self.fpregs = buf.to_vec(),
        }

        Ok(())
    }

    fn peek_word(&mut self, _thread_id: u64, addr: u64) -> crate::Result<usize> {
        if self.fail_peeks_at.contains(&addr) {
            return Err(crate::Error::trace_io(
                "peek word",
                std::io::Error::from_raw_os_error(EFAULT),
            ));
        }

        self.peeks += 1;

        let mut word = [0u8; size_of::<usize>()];
        let len = word.len();
        word.copy_from_slice(&self.read_bytes(addr, len));

        Ok(usize::from_ne_bytes(word))
    }

    fn poke_word(&mut self, _thread_id: u64, addr: u64, word: usize) -> crate::Result<()> {
        if self.fail_pokes_at.contains(&addr) {
            return Err(crate::Error::trace_io(
                "poke word",
                std::io::Error::from_raw_os_error(EFAULT),
            ));
        }

        self.pokes += 1;
        self.write_bytes(addr, &word.to_ne_bytes());

        Ok(())
    }

    fn stop_thread(&mut self, process_id: u64, thread_id: u64) -> crate::Result<()> {
        self.stopped.push((process_id, thread_id));
        Ok(())
    }

    fn resume(&mut self, thread_id: u64, signal: i32) -> crate::Result<()> {
        self.resumed.push((thread_id, signal));
        self.resume_snapshots.push(self.memory.clone());
        Ok(())
    }

    fn wait(&mut self) -> crate::Result<WaitStatus> {
        self.waits.pop_front().ok_or_else(|| {
            crate::Error::trace_io("wait", std::io::Error::from_raw_os_error(ECHILD))
        })
    }
}

/// Bulk transfer which never transfers anything.
#[derive(Debug, Default)]
pub struct NoBulkMemory;

impl ProcessMemory for NoBulkMemory {
    fn read(&self, _thread_id: u64, _addr: u64, _buf: &mut [u8]) -> std::io::Result<usize> {
        Ok(0)
    }

    fn write(&self, _thread_id: u64, _addr: u64, _data: &[u8]) -> std::io::Result<usize> {
        Ok(0)
    }
}

/// Bulk transfer which always succeeds (reading zeroes), counting its calls.
#[derive(Debug, Default)]
pub struct FixedBulkMemory {
    calls: AtomicUsize,
}

impl FixedBulkMemory {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ProcessMemory for FixedBulkMemory {
    fn read(&self, _thread_id: u64, _addr: u64, buf: &mut [u8]) -> std::io::Result<usize> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        buf.fill(0);
        Ok(buf.len())
    }

    fn write(&self, _thread_id: u64, _addr: u64, data: &[u8]) -> std::io::Result<usize> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(data.len())
    }
}

pub async fn spawn_fake<M: ProcessMemory>(
    process_id: u64,
    ops: FakeOps,
    memory: M,
) -> TracedProcess<FakeOps, M> {
    TracedProcess::spawn(process_id, "stepwise-test", move || Ok(ops), memory)
        .await
        .expect("spawn")
}

/// Toy architecture with 4-byte instructions and 16 32-bit registers.
///
/// Instructions are `[opcode, reg, 0, 0]`:
/// - `0`: no-op
/// - `1`: jump to the address held by `reg`
/// - `2`: jump to the address stored at the address held by `reg`
pub struct ToyArch;

pub const TOY_TRAP: [u8; 4] = [0xcc; 4];

#[derive(Debug)]
pub struct ToyRegisters(Vec<u8>);

impl ToyRegisters {
    pub fn regset_with(values: &[(u64, u32)]) -> Vec<u8> {
        let mut raw = vec![0u8; Self::REGSET_SIZE];

        for (id, value) in values {
            let off = *id as usize * 4;
            raw[off..off + 4].copy_from_slice(&value.to_le_bytes());
        }

        raw
    }
}

impl Registers for ToyRegisters {
    const REGSET_SIZE: usize = 16 * 4;

    fn from_regset(raw: &[u8]) -> crate::Result<Self> {
        if raw.len() < Self::REGSET_SIZE {
            return Err(crate::Error::ShortRegset {
                expected: Self::REGSET_SIZE,
                actual: raw.len(),
            });
        }

        Ok(Self(raw[..Self::REGSET_SIZE].to_vec()))
    }

    fn regset(&self) -> &[u8] {
        &self.0
    }

    fn get(&self, id: u64) -> crate::Result<u64> {
        if id >= 16 {
            return Err(crate::Error::InvalidRegister(id));
        }

        let off = id as usize * 4;
        let mut value = [0u8; 4];
        value.copy_from_slice(&self.0[off..off + 4]);

        Ok(u32::from_le_bytes(value).into())
    }

    fn pc(&self) -> u64 {
        self.get(15).unwrap_or_default()
    }

    fn sp(&self) -> u64 {
        self.get(13).unwrap_or_default()
    }
}

#[derive(Debug)]
pub enum ToyInstruction {
    Nop,
    JumpReg(u64),
    LoadPc(u64),
}

impl Instruction for ToyInstruction {
    fn size(&self) -> usize {
        4
    }
}

impl Arch for ToyArch {
    type Registers = ToyRegisters;
    type Instruction = ToyInstruction;

    const MAX_INSTRUCTION_LEN: usize = 4;
    const POINTER_SIZE: usize = 4;
    const TRAP_INSTRUCTION: &'static [u8] = &TOY_TRAP;

    fn decode(addr: u64, bytes: &[u8]) -> crate::Result<Self::Instruction> {
        let err = || crate::Error::Decode {
            addr,
            bytes: bytes.to_vec(),
        };

        match bytes {
            [0, _, _, _] => Ok(ToyInstruction::Nop),
            [1, reg, _, _] => Ok(ToyInstruction::JumpReg((*reg).into())),
            [2, reg, _, _] => Ok(ToyInstruction::LoadPc((*reg).into())),
            _ => Err(err()),
        }
    }

    fn branch_targets(
        regs: &Self::Registers,
        insn: &Self::Instruction,
    ) -> crate::Result<Vec<NextPc>> {
        match *insn {
            ToyInstruction::Nop => Ok(vec![]),
            ToyInstruction::JumpReg(reg) => Ok(vec![NextPc::At(regs.get(reg)?)]),
            ToyInstruction::LoadPc(reg) => Ok(vec![NextPc::LoadedFrom(regs.get(reg)?)]),
        }
    }
}
