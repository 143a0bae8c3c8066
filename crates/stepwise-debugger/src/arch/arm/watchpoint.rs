use stepwise_tracer::debugger::{HardwareWatchpoints, WatchKind, WatchpointState};

const CAPABILITY: &str = "hardware watchpoints";

/// Hardware watchpoints of ARM threads.
///
/// Not supported yet: every operation reports
/// [CapabilityUnavailable](crate::Error::CapabilityUnavailable).
#[derive(Clone, Copy, Debug, Default)]
pub struct ArmWatchpoints;

impl HardwareWatchpoints for ArmWatchpoints {
    fn is_available(&self) -> bool {
        false
    }

    fn watchpoint_state(&self, _thread_id: u64) -> crate::Result<WatchpointState> {
        Err(crate::Error::CapabilityUnavailable(CAPABILITY))
    }

    fn write_hardware_watchpoint(
        &mut self,
        _thread_id: u64,
        _addr: u64,
        _kind: WatchKind,
        _idx: u8,
    ) -> crate::Result<()> {
        Err(crate::Error::CapabilityUnavailable(CAPABILITY))
    }

    fn clear_hardware_watchpoint(
        &mut self,
        _thread_id: u64,
        _addr: u64,
        _kind: WatchKind,
        _idx: u8,
    ) -> crate::Result<()> {
        Err(crate::Error::CapabilityUnavailable(CAPABILITY))
    }

    fn locate_hardware_watchpoint_hit(&self, _thread_id: u64) -> crate::Result<Option<u64>> {
        Err(crate::Error::CapabilityUnavailable(CAPABILITY))
    }
}
