use std::fmt::Debug;

use super::Registers;

/// Candidate value of the program counter after executing an instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NextPc {
    /// The program counter may hold this address.
    At(u64),

    /// The program counter may hold the word stored at this address.
    LoadedFrom(u64),
}

/// Trait implemented by a decoded instruction.
pub trait Instruction: Debug {
    /// Returns the size (in bytes) of the instruction.
    fn size(&self) -> usize;
}

/// Trait implementing the architecture-specific part of step emulation.
///
/// The step state machine itself is architecture-agnostic: it only relies on
/// this trait to decode the instruction at the program counter and to list
/// where execution may continue.
pub trait Arch {
    /// Register snapshot of this architecture.
    type Registers: Registers;

    /// Decoded instruction of this architecture.
    type Instruction: Instruction;

    /// Maximum size (in bytes) of an instruction.
    const MAX_INSTRUCTION_LEN: usize;

    /// Size (in bytes) of a pointer in the debuggee.
    const POINTER_SIZE: usize;

    /// Trap instruction, halting the thread which executes it.
    const TRAP_INSTRUCTION: &'static [u8];

    /// Decodes a single instruction located at `addr`.
    fn decode(addr: u64, bytes: &[u8]) -> crate::Result<Self::Instruction>;

    /// Returns where execution may continue after `insn`, **besides** the
    /// fall-through address.
    fn branch_targets(regs: &Self::Registers, insn: &Self::Instruction)
    -> crate::Result<Vec<NextPc>>;

    /// Returns the address of the instruction executed after loading `value`
    /// into the program counter.
    fn loaded_pc(value: u64) -> u64 {
        value
    }
}
