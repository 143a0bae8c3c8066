use byteorder::{ByteOrder, LittleEndian};
use indexmap::IndexSet;

use super::patch::TrapPatches;
use super::{ThreadStop, TracedProcess};
use crate::debugger::{Arch, Instruction, NextPc, ProcessMemory, Registers, TraceOps};

impl<O, M> TracedProcess<O, M>
where
    O: TraceOps + 'static,
    M: ProcessMemory,
{
    /// Executes a single instruction of a stopped thread.
    ///
    /// The instruction at the program counter is decoded, and a trap is
    /// planted at every address where execution may continue. The thread is
    /// then resumed until it stops again.
    ///
    /// The original code is always restored before returning, even on error.
    pub async fn single_step<A: Arch>(&self, thread_id: u64) -> crate::Result<ThreadStop> {
        let regs = self.get_registers::<A::Registers>(thread_id).await?;
        let pc = regs.pc();

        let mut bytes = vec![0u8; A::MAX_INSTRUCTION_LEN];
        let len = self.read_memory(thread_id, pc, &mut bytes).await?;
        bytes.truncate(len);

        let insn = A::decode(pc, &bytes)?;

        let candidates = self.next_pcs::<A>(thread_id, &regs, &insn).await?;

        tracing::debug!(
            thread_id,
            pc = format_args!("{pc:#x}"),
            ?insn,
            candidates = ?candidates,
            "stepping"
        );

        let trap = A::TRAP_INSTRUCTION;

        let (mut patches, res) = self
            .trace(move |state| {
                let mut patches = TrapPatches::default();

                let res = candidates
                    .iter()
                    .try_for_each(|addr| patches.plant(&mut state.ops, thread_id, *addr, trap))
                    .and_then(|_| {
                        if let Some(thread) = state.threads.get_mut(thread_id) {
                            thread.mark_running();
                        }

                        state.ops.resume(thread_id, 0)
                    });

                Ok((patches, res))
            })
            .await?;

        let res = match res {
            Ok(()) => self.wait_for(thread_id).await,
            Err(e) => Err(e),
        };

        // the stepped thread can't be used for trace calls once gone
        let restore_id = match res {
            Ok(ThreadStop::Exited(_)) => self.process_id,
            _ => thread_id,
        };

        let restored = self
            .executor
            .run(move |state| patches.restore(&mut state.ops, restore_id))
            .await
            .and_then(|res| res);

        match (res, restored) {
            (Ok(stop), Ok(())) => Ok(stop),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(restore_err)) => {
                tracing::warn!(error = %restore_err, "code left patched after failed step");
                Err(e)
            }
        }
    }

    /// Lists the distinct addresses where execution may continue after
    /// `insn`, starting with the fall-through address.
    async fn next_pcs<A: Arch>(
        &self,
        thread_id: u64,
        regs: &A::Registers,
        insn: &A::Instruction,
    ) -> crate::Result<Vec<u64>> {
        let mut candidates = IndexSet::new();

        candidates.insert(regs.pc().wrapping_add(insn.size() as u64));

        for target in A::branch_targets(regs, insn)? {
            let addr = match target {
                NextPc::At(addr) => addr,
                NextPc::LoadedFrom(loc) => {
                    A::loaded_pc(self.read_pointer::<A>(thread_id, loc).await?)
                }
            };

            candidates.insert(addr);
        }

        Ok(candidates.into_iter().collect())
    }

    async fn read_pointer<A: Arch>(&self, thread_id: u64, addr: u64) -> crate::Result<u64> {
        let mut buf = vec![0u8; A::POINTER_SIZE];

        let len = self.read_memory(thread_id, addr, &mut buf).await?;

        if len < buf.len() {
            return Err(crate::Error::trace_io(
                "read pointer",
                std::io::Error::from(std::io::ErrorKind::UnexpectedEof),
            ));
        }

        Ok(LittleEndian::read_uint(&buf, A::POINTER_SIZE))
    }
}
