mod decode;
pub mod regnum;
mod regs;
mod watchpoint;

use stepwise_tracer::debugger::{Arch, NextPc, Registers};

pub use self::decode::{
    ArmInstruction, ArmOp, BlockMode, BranchTarget, Indexing, Operand, Shift, ShiftKind, decode,
};
pub use self::regs::{ArmRegisters, FPREGS_BUF_SIZE, FPREGS_SIZE, FpRegisters, GREGS_SIZE};
pub use self::watchpoint::ArmWatchpoints;

/// Trap instruction (`UDF #16`), as used by the Linux kernel for ARM-mode
/// breakpoints.
pub const TRAP_INSTRUCTION: [u8; 4] = [0xf0, 0x01, 0xf0, 0xe7];

/// ARM (32-bit) architecture, in ARM mode.
#[derive(Clone, Copy, Debug, Default)]
pub struct Arm;

impl Arch for Arm {
    type Registers = ArmRegisters;
    type Instruction = ArmInstruction;

    const MAX_INSTRUCTION_LEN: usize = decode::INSTRUCTION_LEN;
    const POINTER_SIZE: usize = 4;
    const TRAP_INSTRUCTION: &'static [u8] = &TRAP_INSTRUCTION;

    fn decode(addr: u64, bytes: &[u8]) -> crate::Result<Self::Instruction> {
        self::decode::decode(addr, bytes)
    }

    fn branch_targets(
        regs: &Self::Registers,
        insn: &Self::Instruction,
    ) -> crate::Result<Vec<NextPc>> {
        let pc = regs.pc() as u32;

        let target = match insn.op {
            ArmOp::Branch {
                target: BranchTarget::PcRel(offset),
                ..
            } => Some(NextPc::At(pc.wrapping_add_signed(offset).into())),

            ArmOp::Branch {
                target: BranchTarget::Reg(rm),
                ..
            } => Some(NextPc::At(Self::loaded_pc(read_reg(regs, rm)?.into()))),

            ArmOp::LoadMultiple { rn, regs: list, mode } if list & (1 << regnum::PC) != 0 => {
                let base = read_reg(regs, rn)?;

                let count = list.count_ones();
                let below_pc = (list & !(1 << regnum::PC)).count_ones();

                let start = match mode {
                    BlockMode::IncrementAfter => base,
                    BlockMode::IncrementBefore => base.wrapping_add(4),
                    BlockMode::DecrementAfter => base.wrapping_sub(4 * count).wrapping_add(4),
                    BlockMode::DecrementBefore => base.wrapping_sub(4 * count),
                };

                Some(NextPc::LoadedFrom(start.wrapping_add(4 * below_pc).into()))
            }

            ArmOp::Load {
                rt,
                rn,
                offset,
                add,
                indexing,
            } if u64::from(rt) == regnum::PC => {
                let base = read_reg(regs, rn)?;

                let addr = match indexing {
                    Indexing::PostIndexed => base,
                    Indexing::Offset | Indexing::PreIndexed => {
                        let offset = eval_operand(regs, offset)?;

                        if add {
                            base.wrapping_add(offset)
                        } else {
                            base.wrapping_sub(offset)
                        }
                    }
                };

                Some(NextPc::LoadedFrom(addr.into()))
            }

            ArmOp::Move { rd, operand } if u64::from(rd) == regnum::PC => {
                let value = eval_operand(regs, operand)?;
                Some(NextPc::At(Self::loaded_pc(value.into())))
            }

            ArmOp::Add { rd, rn, operand } if u64::from(rd) == regnum::PC => {
                let value = read_reg(regs, rn)?.wrapping_add(eval_operand(regs, operand)?);
                Some(NextPc::At(Self::loaded_pc(value.into())))
            }

            _ => None,
        };

        Ok(target.into_iter().collect())
    }

    // bit 0 only selects the instruction set
    fn loaded_pc(value: u64) -> u64 {
        value & !1
    }
}

/// Reads a register as an operand: the program counter reads 8 bytes ahead.
fn read_reg(regs: &ArmRegisters, reg: u8) -> crate::Result<u32> {
    let id = u64::from(reg);

    if id == regnum::PC {
        return Ok((regs.pc() as u32).wrapping_add(8));
    }

    Ok(regs.get(id)? as u32)
}

fn eval_operand(regs: &ArmRegisters, operand: Operand) -> crate::Result<u32> {
    let (rm, shift) = match operand {
        Operand::Imm(imm) => return Ok(imm),
        Operand::Reg { rm, shift } => (rm, shift),
    };

    let value = read_reg(regs, rm)?;

    let value = match shift {
        Shift::Imm(kind, amount) => kind.apply(value, amount.into()),
        Shift::Reg(kind, rs) => {
            let amount = read_reg(regs, rs)? & 0xff;

            match (kind, amount) {
                (_, 0) => value,
                (kind, amount) => kind.apply(value, amount),
            }
        }
        Shift::Rrx => {
            let carry = (regs.cpsr() >> 29) & 1;
            (carry << 31) | (value >> 1)
        }
    };

    Ok(value)
}
