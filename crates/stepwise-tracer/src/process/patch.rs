use super::mem::{peek_bytes, poke_bytes};
use crate::debugger::TraceOps;

/// Trap instruction written over the code of the debuggee.
#[derive(Debug)]
struct TrapPatch {
    /// Address of the patch.
    addr: u64,

    /// Bytes overwritten by the trap instruction.
    orig: Vec<u8>,
}

/// Set of trap instructions planted for a single step.
#[derive(Debug, Default)]
pub(super) struct TrapPatches {
    patches: Vec<TrapPatch>,
}

impl TrapPatches {
    /// Overwrites the code at `addr` with the `trap` instruction.
    pub fn plant<O: TraceOps>(
        &mut self,
        ops: &mut O,
        thread_id: u64,
        addr: u64,
        trap: &[u8],
    ) -> crate::Result<()> {
        let orig = peek_bytes(ops, thread_id, addr, trap.len())?;

        poke_bytes(ops, thread_id, addr, trap)?;

        tracing::trace!(addr = format_args!("{addr:#x}"), "trap planted");

        self.patches.push(TrapPatch { addr, orig });

        Ok(())
    }

    /// Returns the number of planted traps.
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.patches.len()
    }

    /// Returns whether no trap is planted.
    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    /// Writes back the original code, in reverse planting order.
    ///
    /// Every patch is attempted, and the first error is returned. Once
    /// restored, the set is empty.
    pub fn restore<O: TraceOps>(&mut self, ops: &mut O, thread_id: u64) -> crate::Result<()> {
        let mut res = Ok(());

        while let Some(TrapPatch { addr, orig }) = self.patches.pop() {
            if let Err(e) = poke_bytes(ops, thread_id, addr, &orig) {
                tracing::error!(
                    error = %e,
                    addr = format_args!("{addr:#x}"),
                    "failed to restore patched code"
                );

                if res.is_ok() {
                    res = Err(e);
                }
            }
        }

        res
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::TrapPatches;
    use crate::testing::FakeOps;

    const PID: u64 = 100;
    const TRAP: [u8; 4] = [0xf0, 0x01, 0xf0, 0xe7];

    #[test]
    fn overlapping_patches_restore_original_code() {
        let mut ops = FakeOps::default();
        let code: Vec<u8> = (0..16).collect();
        ops.write_bytes(0x1000, &code);

        let mut patches = TrapPatches::default();
        patches.plant(&mut ops, PID, 0x1004, &TRAP).expect("plant");
        patches.plant(&mut ops, PID, 0x1006, &TRAP).expect("plant");
        assert_eq!(patches.len(), 2);

        assert_eq!(ops.read_bytes(0x1004, 6), [0xf0, 0x01, 0xf0, 0x01, 0xf0, 0xe7]);

        patches.restore(&mut ops, PID).expect("restore");
        assert!(patches.is_empty());
        assert_eq!(ops.read_bytes(0x1000, 16), code);

        // nothing left to restore
        ops.write_bytes(0x1004, &TRAP);
        patches.restore(&mut ops, PID).expect("restore");
        assert_eq!(ops.read_bytes(0x1004, 4), TRAP);
    }

    #[test]
    fn restore_attempts_every_patch() {
        let mut ops = FakeOps::default();
        ops.write_bytes(0x1000, &[0; 0x30]);

        let mut patches = TrapPatches::default();
        patches.plant(&mut ops, PID, 0x1000, &TRAP).expect("plant");
        patches.plant(&mut ops, PID, 0x1020, &TRAP).expect("plant");

        ops.fail_pokes_at.insert(0x1020);

        let err = patches.restore(&mut ops, PID).expect_err("restore");
        assert!(matches!(err, crate::Error::TraceIo { .. }));
        assert!(patches.is_empty());

        assert_eq!(ops.read_bytes(0x1000, 4), [0; 4]);
    }
}
