use indexmap::IndexMap;

/// Tracked state of a debuggee's thread.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ThreadHandle {
    /// ID of the thread.
    id: u64,

    /// Whether the thread was last known to be stopped.
    stopped: bool,

    /// Signal to deliver when the thread is resumed (`0` for none).
    pending_signal: i32,

    /// Whether the last stop was caused by a software trap.
    trap_hit: bool,
}

impl ThreadHandle {
    /// Creates a handle for a (stopped) thread.
    pub const fn new(id: u64) -> Self {
        Self {
            id,
            stopped: true,
            pending_signal: 0,
            trap_hit: false,
        }
    }

    /// Returns the thread's ID.
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Returns whether the thread was last known to be stopped.
    pub const fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Returns the signal that will be delivered on the next resume.
    pub const fn pending_signal(&self) -> Option<i32> {
        match self.pending_signal {
            0 => None,
            signal => Some(signal),
        }
    }

    /// Returns whether a software trap fired on this thread during its last
    /// run.
    pub const fn trap_hit(&self) -> bool {
        self.trap_hit
    }

    /// Records that the thread has stopped on a software trap.
    pub fn record_trap(&mut self) {
        self.stopped = true;
        self.trap_hit = true;
    }

    /// Records that the thread has stopped by receiving `signal`, which is
    /// kept for delivery on the next resume.
    pub fn record_signal(&mut self, signal: i32) {
        self.stopped = true;
        self.pending_signal = signal;
    }

    /// Records that the thread is running again, and returns the pending
    /// signal to deliver.
    pub fn record_resume(&mut self) -> i32 {
        self.mark_running();
        std::mem::take(&mut self.pending_signal)
    }

    /// Records that the thread is running again, keeping its pending signal.
    pub(crate) fn mark_running(&mut self) {
        self.stopped = false;
        self.trap_hit = false;
    }

    pub(crate) fn set_stopped(&mut self, stopped: bool) {
        self.stopped = stopped;
    }
}

/// Registry of the debuggee's live threads.
#[derive(Debug, Default)]
pub struct ThreadRegistry {
    threads: IndexMap<u64, ThreadHandle>,
}

impl ThreadRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a newly created thread, returning its handle.
    pub fn register_thread_create(&mut self, thread_id: u64) -> &mut ThreadHandle {
        self.threads.entry(thread_id).or_insert_with(|| {
            tracing::debug!(thread_id, "thread registered");
            ThreadHandle::new(thread_id)
        })
    }

    /// Unregisters an exited thread.
    pub fn register_thread_exit(&mut self, thread_id: u64) -> Option<ThreadHandle> {
        let handle = self.threads.shift_remove(&thread_id);

        if handle.is_some() {
            tracing::debug!(thread_id, "thread unregistered");
        }

        handle
    }

    /// Returns the handle of the given thread.
    pub fn get(&self, thread_id: u64) -> Option<&ThreadHandle> {
        self.threads.get(&thread_id)
    }

    /// Returns the mutable handle of the given thread.
    pub fn get_mut(&mut self, thread_id: u64) -> Option<&mut ThreadHandle> {
        self.threads.get_mut(&thread_id)
    }

    /// Returns the IDs of the live threads, in creation order.
    pub fn ids(&self) -> Vec<u64> {
        self.threads.keys().copied().collect()
    }
}
