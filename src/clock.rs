//! Timestamp sources for columns and tombstones.

use std::{
    fmt::Debug,
    sync::atomic::{AtomicI64, Ordering},
    time::{SystemTime, UNIX_EPOCH},
};

/// Supplies write timestamps. The store resolves conflicting writes by keeping
/// the one with the highest timestamp; the client only passes it through.
pub trait Clock: Send + Sync + Debug {
    fn timestamp(&self) -> i64;
}

/// Microseconds since the Unix epoch, strictly increasing within the process.
///
/// Two calls in the same microsecond still yield distinct timestamps, so a
/// write followed by a removal issued by the same process is ordered.
#[derive(Debug, Default)]
pub struct MicrosecondEpochClock {
    last: AtomicI64,
}

impl MicrosecondEpochClock {
    pub const fn new() -> Self {
        Self {
            last: AtomicI64::new(0),
        }
    }

    /// Timestamp from the process-wide clock.
    pub fn now() -> i64 {
        static GLOBAL: MicrosecondEpochClock = MicrosecondEpochClock::new();
        GLOBAL.timestamp()
    }
}

impl Clock for MicrosecondEpochClock {
    fn timestamp(&self) -> i64 {
        let wall = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as i64)
            .unwrap_or_default();

        let mut last = self.last.load(Ordering::Relaxed);
        loop {
            let next = wall.max(last + 1);
            match self
                .last
                .compare_exchange_weak(last, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return next,
                Err(actual) => last = actual,
            }
        }
    }
}

// region:    --- Tests


// endregion: --- Tests
