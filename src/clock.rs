//! Tick source abstraction
//!
//! Sessions drive themselves from periodic ticks. The production clock is
//! a background thread; tests use `ManualClock` and fire ticks by hand.
//! Each subscription returns a handle that the owning session keeps
//! exclusively and drops to stop tick delivery (on pause, cancel, or
//! completion).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Callback invoked per tick with the milliseconds elapsed since the
/// previous tick.
pub type TickCallback = Box<dyn FnMut(u64) + Send>;

/// Periodic callback source shared across sessions. Read-only from the
/// session's perspective: it only delivers tick notifications.
pub trait Clock: Send + Sync {
    fn subscribe(&self, interval_ms: u64, callback: TickCallback) -> TickHandle;
}

/// Cancellation handle for one subscription. Dropping it stops delivery;
/// the ticking thread notices on its next wakeup.
pub struct TickHandle {
    stop: Arc<AtomicBool>,
}

impl TickHandle {
    fn new(stop: Arc<AtomicBool>) -> Self {
        Self { stop }
    }

    pub fn cancel(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}

impl Drop for TickHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Thread-backed clock: one thread per subscription, sleeping the
/// requested interval and reporting measured (not nominal) elapsed time,
/// so progress stays honest under scheduler jitter.
pub struct ThreadClock;

impl Clock for ThreadClock {
    fn subscribe(&self, interval_ms: u64, mut callback: TickCallback) -> TickHandle {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let interval = Duration::from_millis(interval_ms.max(1));

        thread::spawn(move || {
            let mut last = Instant::now();
            loop {
                thread::sleep(interval);
                if flag.load(Ordering::SeqCst) {
                    break;
                }
                let now = Instant::now();
                let elapsed_ms = now.duration_since(last).as_millis() as u64;
                last = now;
                callback(elapsed_ms);
            }
        });

        TickHandle::new(stop)
    }
}

/// Test clock: ticks fire only when the test calls [`ManualClock::fire`].
pub struct ManualClock {
    subscribers: Mutex<Vec<(Arc<AtomicBool>, TickCallback)>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Deliver one tick of `elapsed_ms` to every live subscriber.
    pub fn fire(&self, elapsed_ms: u64) {
        let mut subs = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        subs.retain(|(stop, _)| !stop.load(Ordering::SeqCst));
        for (_, callback) in subs.iter_mut() {
            callback(elapsed_ms);
        }
    }

    /// Number of subscriptions still accepting ticks.
    pub fn live_subscribers(&self) -> usize {
        let mut subs = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        subs.retain(|(stop, _)| !stop.load(Ordering::SeqCst));
        subs.len()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn subscribe(&self, _interval_ms: u64, callback: TickCallback) -> TickHandle {
        let stop = Arc::new(AtomicBool::new(false));
        self.subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((Arc::clone(&stop), callback));
        TickHandle::new(stop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU64;

    #[test]
    fn manual_clock_delivers_to_live_subscribers() {
        let clock = ManualClock::new();
        let count = Arc::new(AtomicU64::new(0));
        let c = Arc::clone(&count);
        let handle = clock.subscribe(200, Box::new(move |ms| {
            c.fetch_add(ms, Ordering::SeqCst);
        }));

        clock.fire(30);
        clock.fire(30);
        assert_eq!(count.load(Ordering::SeqCst), 60);
        assert_eq!(clock.live_subscribers(), 1);

        drop(handle);
        clock.fire(30);
        assert_eq!(count.load(Ordering::SeqCst), 60);
        assert_eq!(clock.live_subscribers(), 0);
    }

    #[test]
    fn cancelled_handle_stops_delivery_without_drop() {
        let clock = ManualClock::new();
        let count = Arc::new(AtomicU64::new(0));
        let c = Arc::clone(&count);
        let handle = clock.subscribe(200, Box::new(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        }));

        handle.cancel();
        clock.fire(10);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn thread_clock_ticks_until_handle_drops() {
        let clock = ThreadClock;
        let count = Arc::new(AtomicU64::new(0));
        let c = Arc::clone(&count);
        let handle = clock.subscribe(5, Box::new(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        }));

        // Give it time for at least one tick
        thread::sleep(Duration::from_millis(60));
        drop(handle);
        let seen = count.load(Ordering::SeqCst);
        assert!(seen >= 1, "expected at least one tick, saw {seen}");

        // No further ticks after the handle is gone (allow one in-flight)
        thread::sleep(Duration::from_millis(40));
        assert!(count.load(Ordering::SeqCst) <= seen + 1);
    }
}
