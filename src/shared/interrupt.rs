use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const SLEEP_SLICE: Duration = Duration::from_millis(200);

/// Cancellation flag delivered to the worker thread running one orchestration.
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    flag: Arc<AtomicBool>,
}

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Raises the flag and returns whether it was already raised.
    pub fn escalate(&self) -> bool {
        self.flag.swap(true, Ordering::SeqCst)
    }
}

/// Sleeps for `total` in short slices. Returns `false` as soon as the
/// interrupt is observed, `true` when the full duration elapsed.
pub fn sleep_with_interrupt(interrupt: &Interrupt, total: Duration) -> bool {
    let mut remaining = total;
    while remaining > Duration::ZERO {
        if interrupt.is_raised() {
            return false;
        }
        let step = remaining.min(SLEEP_SLICE);
        thread::sleep(step);
        remaining = remaining.saturating_sub(step);
    }
    !interrupt.is_raised()
}
