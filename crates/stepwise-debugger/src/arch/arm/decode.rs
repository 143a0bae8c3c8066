use byteorder::{ByteOrder, LittleEndian};
use stepwise_tracer::debugger::Instruction;

/// Size (in bytes) of an ARM-mode instruction.
pub const INSTRUCTION_LEN: usize = 4;

/// ARM-mode instruction, decoded only as far as needed to predict the next
/// program counter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArmInstruction {
    /// Raw instruction word.
    pub raw: u32,

    /// Decoded operation.
    pub op: ArmOp,
}

impl Instruction for ArmInstruction {
    fn size(&self) -> usize {
        INSTRUCTION_LEN
    }
}

/// Operation of an ARM-mode instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArmOp {
    /// `B`, `BL`, `BX` or `BLX`.
    Branch {
        /// Whether the return address is saved in `LR`.
        link: bool,

        /// Branch target.
        target: BranchTarget,
    },

    /// `LDM` (`POP` when based on `SP` and writing back).
    LoadMultiple {
        /// Base register.
        rn: u8,

        /// Loaded registers (bit N set for `RN`).
        regs: u16,

        /// Addressing mode.
        mode: BlockMode,
    },

    /// `LDR` of a word.
    Load {
        /// Destination register.
        rt: u8,

        /// Base register.
        rn: u8,

        /// Offset from the base register.
        offset: Operand,

        /// Whether the offset is added to (or subtracted from) the base.
        add: bool,

        /// Indexing mode.
        indexing: Indexing,
    },

    /// `MOV`.
    Move {
        /// Destination register.
        rd: u8,

        /// Moved value.
        operand: Operand,
    },

    /// `ADD`.
    Add {
        /// Destination register.
        rd: u8,

        /// First operand register.
        rn: u8,

        /// Second operand.
        operand: Operand,
    },

    /// Any instruction which can't write the program counter (as far as step
    /// emulation is concerned).
    Other,
}

/// Target of a branch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BranchTarget {
    /// Offset from the address of the instruction.
    PcRel(i32),

    /// Address held by a register.
    Reg(u8),
}

/// Addressing mode of a multi-register load.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockMode {
    /// Increment after (`LDMIA`, `POP`).
    IncrementAfter,

    /// Increment before (`LDMIB`).
    IncrementBefore,

    /// Decrement after (`LDMDA`).
    DecrementAfter,

    /// Decrement before (`LDMDB`).
    DecrementBefore,
}

/// Indexing mode of a single load.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Indexing {
    /// `[Rn, offset]`
    Offset,

    /// `[Rn, offset]!`
    PreIndexed,

    /// `[Rn], offset`
    PostIndexed,
}

/// Flexible second operand.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operand {
    /// Immediate value.
    Imm(u32),

    /// Shifted register.
    Reg {
        /// Shifted register.
        rm: u8,

        /// Applied shift.
        shift: Shift,
    },
}

/// Kind of barrel shifter operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShiftKind {
    /// Logical shift left.
    Lsl,

    /// Logical shift right.
    Lsr,

    /// Arithmetic shift right.
    Asr,

    /// Rotate right.
    Ror,
}

/// Shift applied to a register operand.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shift {
    /// Shift by a constant amount (`1..=32`, or `0` for none).
    Imm(ShiftKind, u8),

    /// Shift by the bottom byte of a register.
    Reg(ShiftKind, u8),

    /// Rotate right by one, through the carry flag.
    Rrx,
}

impl ShiftKind {
    const fn from_bits(bits: u32) -> Self {
        match bits & 0b11 {
            0b00 => Self::Lsl,
            0b01 => Self::Lsr,
            0b10 => Self::Asr,
            _ => Self::Ror,
        }
    }

    /// Applies the shift to `value`.
    pub const fn apply(self, value: u32, amount: u32) -> u32 {
        match self {
            Self::Lsl if amount >= 32 => 0,
            Self::Lsl => value << amount,
            Self::Lsr if amount >= 32 => 0,
            Self::Lsr => value >> amount,
            Self::Asr if amount >= 32 => ((value as i32) >> 31) as u32,
            Self::Asr => ((value as i32) >> amount) as u32,
            Self::Ror => value.rotate_right(amount % 32),
        }
    }
}

/// Decodes the ARM-mode instruction located at `addr`.
pub fn decode(addr: u64, bytes: &[u8]) -> crate::Result<ArmInstruction> {
    let Some(word) = bytes.get(..INSTRUCTION_LEN) else {
        return Err(decode_error(addr, bytes));
    };

    let raw = LittleEndian::read_u32(word);

    let op = decode_word(raw).ok_or_else(|| decode_error(addr, word))?;

    Ok(ArmInstruction { raw, op })
}

fn decode_error(addr: u64, bytes: &[u8]) -> crate::Error {
    crate::Error::Decode {
        addr,
        bytes: bytes.to_vec(),
    }
}

const fn reg(raw: u32, lsb: u32) -> u8 {
    ((raw >> lsb) & 0xf) as u8
}

const fn bit(raw: u32, n: u32) -> bool {
    raw & (1 << n) != 0
}

fn decode_word(raw: u32) -> Option<ArmOp> {
    let cond = raw >> 28;

    if cond == 0xf {
        return Some(decode_unconditional(raw));
    }

    // permanently undefined
    if raw & 0x0ff0_00f0 == 0x07f0_00f0 {
        return None;
    }

    let op = if raw & 0x0fff_ffd0 == 0x012f_ff10 {
        ArmOp::Branch {
            link: bit(raw, 5),
            target: BranchTarget::Reg(reg(raw, 0)),
        }
    } else if raw & 0x0e00_0000 == 0x0a00_0000 {
        ArmOp::Branch {
            link: bit(raw, 24),
            target: BranchTarget::PcRel(branch_offset(raw)),
        }
    } else if raw & 0x0e10_0000 == 0x0810_0000 {
        let mode = match (bit(raw, 24), bit(raw, 23)) {
            (false, true) => BlockMode::IncrementAfter,
            (true, true) => BlockMode::IncrementBefore,
            (false, false) => BlockMode::DecrementAfter,
            (true, false) => BlockMode::DecrementBefore,
        };

        ArmOp::LoadMultiple {
            rn: reg(raw, 16),
            regs: (raw & 0xffff) as u16,
            mode,
        }
    } else if raw & 0x0c50_0000 == 0x0410_0000 {
        decode_load(raw)
    } else if raw & 0x0c00_0000 == 0 {
        decode_data_processing(raw)
    } else {
        ArmOp::Other
    };

    Some(op)
}

fn decode_unconditional(raw: u32) -> ArmOp {
    if raw & 0x0e00_0000 == 0x0a00_0000 {
        // BLX (immediate), with the H bit selecting the halfword
        let offset = branch_offset(raw) | ((raw >> 23) & 0b10) as i32;

        ArmOp::Branch {
            link: true,
            target: BranchTarget::PcRel(offset),
        }
    } else {
        ArmOp::Other
    }
}

/// Returns the target offset of a `B`/`BL`, relative to the instruction.
const fn branch_offset(raw: u32) -> i32 {
    // sign-extend imm24, then multiply by 4
    let imm = ((raw << 8) as i32) >> 6;

    // the PC reads 8 bytes ahead
    imm + 8
}

fn decode_load(raw: u32) -> ArmOp {
    let offset = if bit(raw, 25) {
        if bit(raw, 4) {
            // media instructions
            return ArmOp::Other;
        }

        shifted_register(raw)
    } else {
        Operand::Imm(raw & 0xfff)
    };

    let indexing = match (bit(raw, 24), bit(raw, 21)) {
        (false, _) => Indexing::PostIndexed,
        (true, false) => Indexing::Offset,
        (true, true) => Indexing::PreIndexed,
    };

    ArmOp::Load {
        rt: reg(raw, 12),
        rn: reg(raw, 16),
        offset,
        add: bit(raw, 23),
        indexing,
    }
}

fn decode_data_processing(raw: u32) -> ArmOp {
    let imm = bit(raw, 25);

    // multiplies, extra loads/stores
    if !imm && bit(raw, 4) && bit(raw, 7) {
        return ArmOp::Other;
    }

    let operand = if imm {
        let rotation = ((raw >> 8) & 0xf) * 2;
        Operand::Imm((raw & 0xff).rotate_right(rotation))
    } else if bit(raw, 4) {
        Operand::Reg {
            rm: reg(raw, 0),
            shift: Shift::Reg(ShiftKind::from_bits(raw >> 5), reg(raw, 8)),
        }
    } else {
        shifted_register(raw)
    };

    let rd = reg(raw, 12);

    match (raw >> 21) & 0xf {
        0b1101 => ArmOp::Move { rd, operand },
        0b0100 => ArmOp::Add {
            rd,
            rn: reg(raw, 16),
            operand,
        },
        _ => ArmOp::Other,
    }
}

/// Decodes a register shifted by a constant (bits 0-11).
fn shifted_register(raw: u32) -> Operand {
    let kind = ShiftKind::from_bits(raw >> 5);
    let amount = ((raw >> 7) & 0x1f) as u8;

    let shift = match (kind, amount) {
        (ShiftKind::Ror, 0) => Shift::Rrx,
        (ShiftKind::Lsr | ShiftKind::Asr, 0) => Shift::Imm(kind, 32),
        (kind, amount) => Shift::Imm(kind, amount),
    };

    Operand::Reg {
        rm: reg(raw, 0),
        shift,
    }
}
