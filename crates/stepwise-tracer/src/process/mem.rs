use std::mem::size_of;

use super::TracedProcess;
use crate::debugger::{ProcessMemory, TraceOps};

/// Size (in bytes) of a word transferred by a single trace call.
const WORD_SIZE: usize = size_of::<usize>();

impl<O, M> TracedProcess<O, M>
where
    O: TraceOps + 'static,
    M: ProcessMemory,
{
    /// Reads memory of the debuggee into `buf`, returning the number of
    /// bytes read.
    ///
    /// Bulk transfer is attempted first. If it transfers nothing, the memory
    /// is read word by word through the trace thread.
    pub async fn read_memory(
        &self,
        thread_id: u64,
        addr: u64,
        buf: &mut [u8],
    ) -> crate::Result<usize> {
        self.check_alive()?;

        if buf.is_empty() {
            return Ok(0);
        }

        if self.bulk_memory {
            match self.memory.read(thread_id, addr, buf) {
                Ok(0) => (),
                Ok(len) => return Ok(len),
                Err(e) => tracing::trace!(
                    error = %e,
                    addr = format_args!("{addr:#x}"),
                    "bulk read failed, falling back to trace calls"
                ),
            }
        }

        let len = buf.len();

        let data = self
            .trace(move |state| peek_bytes(&mut state.ops, thread_id, addr, len))
            .await?;

        buf.copy_from_slice(&data);

        Ok(len)
    }

    /// Writes `data` into memory of the debuggee, returning the number of
    /// bytes written.
    ///
    /// Writes no larger than a word skip bulk transfer: these are most likely
    /// trap patches targeting code pages, which bulk transfer can't write.
    pub async fn write_memory(&self, thread_id: u64, addr: u64, data: &[u8]) -> crate::Result<usize> {
        self.check_alive()?;

        if data.is_empty() {
            return Ok(0);
        }

        if self.bulk_memory && data.len() > WORD_SIZE {
            match self.memory.write(thread_id, addr, data) {
                Ok(0) => (),
                Ok(len) => return Ok(len),
                Err(e) => tracing::trace!(
                    error = %e,
                    addr = format_args!("{addr:#x}"),
                    "bulk write failed, falling back to trace calls"
                ),
            }
        }

        let data = data.to_vec();

        self.trace(move |state| poke_bytes(&mut state.ops, thread_id, addr, &data))
            .await
    }
}

/// Reads `len` bytes of memory word by word.
pub(super) fn peek_bytes<O: TraceOps>(
    ops: &mut O,
    thread_id: u64,
    addr: u64,
    len: usize,
) -> crate::Result<Vec<u8>> {
    let mut data = Vec::with_capacity(len + WORD_SIZE);

    let mut read_addr = addr;

    while data.len() < len {
        let word = ops
            .peek_word(thread_id, read_addr)
            .inspect_err(|e| tracing::error!(error = %e, addr = format_args!("{read_addr:#x}"), "peek word"))?;

        data.extend_from_slice(&word.to_ne_bytes());

        read_addr = read_addr.wrapping_add(WORD_SIZE as u64);
    }

    data.truncate(len);

    Ok(data)
}

/// Writes memory word by word.
///
/// A trailing partial word is merged with the memory it overlaps.
pub(super) fn poke_bytes<O: TraceOps>(
    ops: &mut O,
    thread_id: u64,
    addr: u64,
    data: &[u8],
) -> crate::Result<usize> {
    let mut data_to_write = data.chunks_exact(WORD_SIZE);

    let mut write_addr = addr;

    for chunk in &mut data_to_write {
        let mut word = [0u8; WORD_SIZE];
        word.copy_from_slice(chunk);

        ops.poke_word(thread_id, write_addr, usize::from_ne_bytes(word))
            .inspect_err(|e| tracing::error!(error = %e, addr = format_args!("{write_addr:#x}"), "poke word"))?;

        write_addr = write_addr.wrapping_add(WORD_SIZE as u64);
    }

    let remainder = data_to_write.remainder();

    if !remainder.is_empty() {
        let mut word = ops
            .peek_word(thread_id, write_addr)
            .inspect_err(|e| tracing::error!(error = %e, addr = format_args!("{write_addr:#x}"), "peek word"))?
            .to_ne_bytes();

        word[..remainder.len()].copy_from_slice(remainder);

        ops.poke_word(thread_id, write_addr, usize::from_ne_bytes(word))
            .inspect_err(|e| tracing::error!(error = %e, addr = format_args!("{write_addr:#x}"), "poke word"))?;
    }

    Ok(data.len())
}
