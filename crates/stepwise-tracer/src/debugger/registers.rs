/// Trait for implementing the register snapshot of a stopped thread.
///
/// The snapshot is built from the raw general register set returned by the
/// OS, and is discarded once the thread is resumed.
pub trait Registers: Sized + Send + 'static {
    /// Size (in bytes) of the general register set.
    const REGSET_SIZE: usize;

    /// Builds a snapshot from the raw general register set.
    fn from_regset(raw: &[u8]) -> crate::Result<Self>;

    /// Returns the raw general register set.
    fn regset(&self) -> &[u8];

    /// Returns the value of the register with the given DWARF number.
    fn get(&self, id: u64) -> crate::Result<u64>;

    /// Returns the program counter.
    fn pc(&self) -> u64;

    /// Returns the stack pointer.
    fn sp(&self) -> u64;
}
