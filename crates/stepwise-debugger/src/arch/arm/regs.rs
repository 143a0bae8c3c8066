use std::future::Future;

use byteorder::{ByteOrder, LittleEndian};
use stepwise_tracer::debugger::Registers;

use super::regnum;

/// Size (in bytes) of the general register set (`R0`-`R15`, `CPSR`,
/// `ORIG_R0`).
pub const GREGS_SIZE: usize = 18 * 4;

/// Size (in bytes) of the floating point register set (`D0`-`D31`, `FPSCR`).
pub const FPREGS_SIZE: usize = 32 * 8 + 4;

/// Size (in bytes) of the buffer receiving the floating point register set,
/// large enough for the kernel's padded VFP block.
pub const FPREGS_BUF_SIZE: usize = 33 * 8;

const CPSR: usize = 16;

/// Register snapshot of a stopped ARM thread.
///
/// The floating point block is only fetched on demand, see
/// [load_fp_with](Self::load_fp_with).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArmRegisters {
    gregs: [u8; GREGS_SIZE],
    fp: Option<FpRegisters>,
}

impl ArmRegisters {
    /// Returns the current program status register.
    pub fn cpsr(&self) -> u32 {
        self.greg(CPSR)
    }

    /// Returns the floating point block, if loaded.
    pub fn fp(&self) -> Option<&FpRegisters> {
        self.fp.as_ref()
    }

    /// Returns the floating point block, loading it with `load` first if
    /// needed.
    ///
    /// `load` must return the raw floating point register set, which is empty
    /// if the OS doesn't provide it.
    pub async fn load_fp_with<F, Fut>(&mut self, load: F) -> crate::Result<&FpRegisters>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = crate::Result<Vec<u8>>>,
    {
        let fp = match self.fp.take() {
            Some(fp) => fp,
            None => FpRegisters::from_regset(load().await?),
        };

        Ok(self.fp.insert(fp))
    }

    /// Sets the value of the register with the given DWARF number.
    ///
    /// Returns whether the register belongs to the floating point block, in
    /// which case that block must be written back as well.
    ///
    /// Registers are 32-bit wide: only the low 32 bits of `value` are kept.
    ///
    /// On error, the snapshot is left untouched.
    pub fn set_register(&mut self, id: u64, value: u64) -> crate::Result<bool> {
        match id {
            regnum::R0..=regnum::PC => {
                let off = id as usize * 4;
                LittleEndian::write_u32(&mut self.gregs[off..off + 4], value as u32);
                Ok(false)
            }
            regnum::S0..=regnum::MAX_REG_NUM => {
                let lane = (id - regnum::S0) as usize;

                match self.fp.as_mut().map(|fp| fp.set_s(lane, value as u32)) {
                    Some(true) => Ok(true),
                    _ => Err(crate::Error::InvalidRegister(id)),
                }
            }
            _ => Err(crate::Error::InvalidRegister(id)),
        }
    }

    fn greg(&self, idx: usize) -> u32 {
        LittleEndian::read_u32(&self.gregs[idx * 4..idx * 4 + 4])
    }
}

impl Registers for ArmRegisters {
    const REGSET_SIZE: usize = GREGS_SIZE;

    fn from_regset(raw: &[u8]) -> crate::Result<Self> {
        let Some(raw) = raw.get(..GREGS_SIZE) else {
            return Err(crate::Error::ShortRegset {
                expected: GREGS_SIZE,
                actual: raw.len(),
            });
        };

        let mut gregs = [0u8; GREGS_SIZE];
        gregs.copy_from_slice(raw);

        Ok(Self { gregs, fp: None })
    }

    fn regset(&self) -> &[u8] {
        &self.gregs
    }

    /// Floating point registers are only available once the floating point
    /// block is loaded.
    fn get(&self, id: u64) -> crate::Result<u64> {
        match id {
            regnum::R0..=regnum::PC => Ok(self.greg(id as usize).into()),
            regnum::S0..=regnum::MAX_REG_NUM => self
                .fp
                .as_ref()
                .and_then(|fp| fp.s((id - regnum::S0) as usize))
                .map(u64::from)
                .ok_or(crate::Error::InvalidRegister(id)),
            _ => Err(crate::Error::InvalidRegister(id)),
        }
    }

    fn pc(&self) -> u64 {
        self.greg(regnum::PC as usize).into()
    }

    fn sp(&self) -> u64 {
        self.greg(regnum::SP as usize).into()
    }
}

/// Floating point block of an ARM thread.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FpRegisters {
    raw: Vec<u8>,
}

impl FpRegisters {
    /// Builds the block from the raw floating point register set.
    ///
    /// The set may be shorter than [FPREGS_SIZE] (or even empty): only the
    /// registers it fully contains are decoded.
    pub fn from_regset(mut raw: Vec<u8>) -> Self {
        raw.truncate(FPREGS_SIZE);
        Self { raw }
    }

    /// Returns the raw floating point register set.
    pub fn regset(&self) -> &[u8] {
        &self.raw
    }

    /// Returns whether the OS provided no floating point register.
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Returns the double-precision register `Dn`.
    pub fn d(&self, n: usize) -> Option<u64> {
        (n < 32)
            .then(|| self.raw.get(n * 8..n * 8 + 8))
            .flatten()
            .map(LittleEndian::read_u64)
    }

    /// Returns the single-precision register `Sn`, which aliases half of
    /// `D(n/2)`.
    pub fn s(&self, n: usize) -> Option<u32> {
        (n < 32)
            .then(|| self.raw.get(n * 4..n * 4 + 4))
            .flatten()
            .map(LittleEndian::read_u32)
    }

    /// Returns the floating point status and control register.
    pub fn fpscr(&self) -> Option<u32> {
        self.raw
            .get(FPREGS_SIZE - 4..FPREGS_SIZE)
            .map(LittleEndian::read_u32)
    }

    /// Decodes the block into named registers.
    pub fn decode(&self) -> Vec<(String, u64)> {
        let mut regs: Vec<_> = (0..32)
            .map_while(|n| self.d(n).map(|value| (format!("D{n}"), value)))
            .collect();

        if let Some(fpscr) = self.fpscr() {
            regs.push(("FPSCR".to_owned(), fpscr.into()));
        }

        regs
    }

    fn set_s(&mut self, n: usize, value: u32) -> bool {
        match self.raw.get_mut(n * 4..n * 4 + 4) {
            Some(lane) if n < 32 => {
                LittleEndian::write_u32(lane, value);
                true
            }
            _ => false,
        }
    }
}
