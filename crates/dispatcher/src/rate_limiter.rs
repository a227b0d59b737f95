//! Sliding-window rate limiter
//!
//! Keeps the admission timestamps of the last window. A timestamp leaves the
//! window once `now - t >= window`; a request is admitted while fewer than
//! `limit` timestamps remain. Eviction, check and insert happen inside one
//! critical section so concurrent callers never over-admit.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Length of the admission window
pub const WINDOW: Duration = Duration::from_secs(1);

/// Monotonic time source
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// `Instant::now()`
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock advanced by hand, shared between clones
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: Instant,
    offset: Arc<Mutex<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.offset.lock() += by;
    }

    pub fn elapsed(&self) -> Duration {
        *self.offset.lock()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + *self.offset.lock()
    }
}

/// Ordered timestamps with a fixed capacity
///
/// Callers push non-decreasing stamps, so expiry only ever removes from the front.
#[derive(Debug, Clone)]
pub struct SlidingWindow<T> {
    stamps: VecDeque<T>,
    limit: usize,
}

impl<T> SlidingWindow<T> {
    pub fn with_limit(limit: usize) -> Self {
        Self {
            stamps: VecDeque::with_capacity(limit),
            limit,
        }
    }

    /// Drop leading stamps while `expired` holds
    pub fn evict_while(&mut self, mut expired: impl FnMut(&T) -> bool) {
        while self.stamps.front().is_some_and(&mut expired) {
            self.stamps.pop_front();
        }
    }

    /// Append if below the limit
    pub fn try_push(&mut self, stamp: T) -> bool {
        if self.stamps.len() < self.limit {
            self.stamps.push_back(stamp);
            true
        } else {
            false
        }
    }

    pub fn len(&self) -> usize {
        self.stamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stamps.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}

/// Admission control over a sliding one-second window
pub struct RateLimiter {
    window: Mutex<SlidingWindow<Instant>>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// Limiter on the monotonic clock; `limit == 0` denies everything
    pub fn new(limit: u32) -> Self {
        Self::with_clock(limit, Arc::new(MonotonicClock))
    }

    pub fn with_clock(limit: u32, clock: Arc<dyn Clock>) -> Self {
        Self {
            window: Mutex::new(SlidingWindow::with_limit(limit as usize)),
            clock,
        }
    }

    /// Admit or deny one request. Denial leaves no trace in the window.
    pub fn allow(&self) -> bool {
        let mut window = self.window.lock();
        if window.limit() == 0 {
            return false;
        }

        let now = self.clock.now();
        window.evict_while(|admitted| now.saturating_duration_since(*admitted) >= WINDOW);
        window.try_push(now)
    }

    /// Admissions currently counted against the limit
    pub fn in_window(&self) -> usize {
        let mut window = self.window.lock();
        let now = self.clock.now();
        window.evict_while(|admitted| now.saturating_duration_since(*admitted) >= WINDOW);
        window.len()
    }

    pub fn limit(&self) -> u32 {
        self.window.lock().limit() as u32
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let window = self.window.lock();
        f.debug_struct("RateLimiter")
            .field("limit", &window.limit())
            .field("in_window", &window.len())
            .finish()
    }
}
