/// Access type and size of a hardware watchpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WatchKind {
    /// Whether reads trigger the watchpoint.
    pub read: bool,

    /// Whether writes trigger the watchpoint.
    pub write: bool,

    /// Size (in bytes) of the watched area.
    pub size: u8,
}

/// Hardware debug register state of a thread.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WatchpointState {
    /// Number of hardware watchpoint slots.
    pub num: u8,

    /// Version of the debug architecture.
    pub debug_version: u8,

    /// Raw address/control words of the slots.
    pub words: Vec<u64>,
}

/// Trait for the optional hardware watchpoint capability.
///
/// Callers must check [is_available](Self::is_available) before relying on
/// any other function: an architecture without support reports
/// [CapabilityUnavailable](crate::Error::CapabilityUnavailable).
pub trait HardwareWatchpoints {
    /// Returns whether hardware watchpoints are supported.
    fn is_available(&self) -> bool;

    /// Retrieves the hardware watchpoint state of the given thread.
    fn watchpoint_state(&self, thread_id: u64) -> crate::Result<WatchpointState>;

    /// Programs the watchpoint slot `idx` of the given thread.
    fn write_hardware_watchpoint(
        &mut self,
        thread_id: u64,
        addr: u64,
        kind: WatchKind,
        idx: u8,
    ) -> crate::Result<()>;

    /// Clears the watchpoint slot `idx` of the given thread.
    fn clear_hardware_watchpoint(
        &mut self,
        thread_id: u64,
        addr: u64,
        kind: WatchKind,
        idx: u8,
    ) -> crate::Result<()>;

    /// Returns the watched address which stopped the given thread, if any.
    fn locate_hardware_watchpoint_hit(&self, thread_id: u64) -> crate::Result<Option<u64>>;
}
