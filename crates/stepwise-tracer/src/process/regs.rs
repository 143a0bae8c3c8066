use super::TracedProcess;
use crate::debugger::{ProcessMemory, RegsetKind, Registers, TraceOps};

impl<O, M> TracedProcess<O, M>
where
    O: TraceOps + 'static,
    M: ProcessMemory,
{
    /// Reads a register set of a thread.
    ///
    /// At most `max_len` bytes are read. The returned buffer is truncated to
    /// the length reported by the OS, which is empty if the OS does not
    /// provide this register set.
    pub async fn get_regset(
        &self,
        thread_id: u64,
        kind: RegsetKind,
        max_len: usize,
    ) -> crate::Result<Vec<u8>> {
        self.trace(move |state| {
            let mut buf = vec![0u8; max_len];

            let len = state
                .ops
                .get_regset(thread_id, kind, &mut buf)
                .inspect_err(|e| tracing::error!(error = %e, thread_id, ?kind, "get regset"))?;

            buf.truncate(len);

            Ok(buf)
        })
        .await
    }

    /// Reads the general purpose registers of a thread.
    pub async fn get_registers<R: Registers>(&self, thread_id: u64) -> crate::Result<R> {
        let raw = self
            .get_regset(thread_id, RegsetKind::General, R::REGSET_SIZE)
            .await?;

        R::from_regset(&raw)
    }

    /// Writes register sets of a thread, in a single trace request.
    pub async fn set_regsets(
        &self,
        thread_id: u64,
        regsets: Vec<(RegsetKind, Vec<u8>)>,
    ) -> crate::Result<()> {
        self.trace(move |state| {
            for (kind, raw) in regsets {
                state
                    .ops
                    .set_regset(thread_id, kind, &raw)
                    .inspect_err(|e| tracing::error!(error = %e, thread_id, ?kind, "set regset"))?;
            }

            Ok(())
        })
        .await
    }
}
