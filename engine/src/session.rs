use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of the session counter taken when an async operation begins.
/// Operations compare their snapshot against the live counter before every
/// state mutation and abandon silently when it no longer matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session(u64);

impl Session {
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Monotonically increasing counter scoped to one connected wallet.
/// Incrementing it is the sole cancellation primitive: in-flight work is
/// never pre-empted, its results are discarded at the next session check.
#[derive(Debug, Default)]
pub struct SessionCounter {
    current: AtomicU64,
}

impl SessionCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Session {
        Session(self.current.load(Ordering::SeqCst))
    }

    /// Invalidates all in-flight work and returns the new session. Called on
    /// wallet connect, wallet change and disconnect.
    pub fn invalidate(&self) -> Session {
        Session(self.current.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, session: Session) -> bool {
        self.current.load(Ordering::SeqCst) == session.0
    }
}
