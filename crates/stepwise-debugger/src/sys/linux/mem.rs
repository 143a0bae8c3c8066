use std::io::{self, IoSlice, IoSliceMut};

use nix::sys::uio::{RemoteIoVec, process_vm_readv, process_vm_writev};
use nix::unistd::Pid;
use stepwise_tracer::debugger::ProcessMemory;

/// Bulk memory transfer of a debuggee, backed by `process_vm_readv` and
/// `process_vm_writev`.
///
/// This can't write read-only pages (e.g., code), which require word-wise
/// trace calls instead.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessVm;

impl ProcessMemory for ProcessVm {
    fn read(&self, thread_id: u64, addr: u64, buf: &mut [u8]) -> io::Result<usize> {
        let remote_iov = RemoteIoVec {
            base: addr as usize,
            len: buf.len(),
        };

        process_vm_readv(
            Pid::from_raw(thread_id as i32),
            &mut [IoSliceMut::new(buf)],
            &[remote_iov],
        )
        .inspect_err(
            |e| tracing::trace!(error = %e, addr = format_args!("{addr:#x}"), "process_vm_readv"),
        )
        .map_err(io::Error::from)
    }

    fn write(&self, thread_id: u64, addr: u64, data: &[u8]) -> io::Result<usize> {
        let remote_iov = RemoteIoVec {
            base: addr as usize,
            len: data.len(),
        };

        process_vm_writev(
            Pid::from_raw(thread_id as i32),
            &[IoSlice::new(data)],
            &[remote_iov],
        )
        .inspect_err(
            |e| tracing::trace!(error = %e, addr = format_args!("{addr:#x}"), "process_vm_writev"),
        )
        .map_err(io::Error::from)
    }
}

