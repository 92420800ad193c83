//! Transfer control shared between the driver, the workers and the monitor.
//!
//! Pause is soft: workers check the signal before writing each chunk and
//! block on a condition variable until it clears, so in-flight reads are not
//! aborted and resume wakes them immediately. The pause flag and the current
//! chunk size are the only cross-task mutable state.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// Cooperative pause flag with blocking wait.
#[derive(Debug, Default)]
pub struct PauseSignal {
    paused: Mutex<bool>,
    cond: Condvar,
}

impl PauseSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pause(&self) {
        *self.paused.lock().unwrap() = true;
    }

    pub fn resume(&self) {
        *self.paused.lock().unwrap() = false;
        self.cond.notify_all();
    }

    pub fn is_paused(&self) -> bool {
        *self.paused.lock().unwrap()
    }

    /// Blocks while paused. Returns true if the caller actually waited.
    pub fn wait_while_paused(&self) -> bool {
        let mut paused = self.paused.lock().unwrap();
        if !*paused {
            return false;
        }
        while *paused {
            paused = self.cond.wait(paused).unwrap();
        }
        true
    }
}

/// Chunk size read fresh by writers before each chunk; written by the monitor.
#[derive(Debug)]
pub struct ChunkSize(AtomicUsize);

impl ChunkSize {
    pub fn new(bytes: usize) -> Self {
        Self(AtomicUsize::new(bytes.max(1)))
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::Relaxed)
    }

    pub fn set(&self, bytes: usize) {
        self.0.store(bytes.max(1), Ordering::Relaxed);
    }
}

/// Result of a bounded graceful stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// No session was running, or it went idle within the grace period.
    Idle,
    /// Still running after the grace period; the caller may force-terminate.
    TimedOut,
}

/// Shared control block for one running session.
#[derive(Debug)]
pub struct TransferControl {
    pause: PauseSignal,
    chunk_size: ChunkSize,
    running: Mutex<bool>,
    idle: Condvar,
}

impl TransferControl {
    pub fn new(initial_chunk_bytes: usize) -> Self {
        Self {
            pause: PauseSignal::new(),
            chunk_size: ChunkSize::new(initial_chunk_bytes),
            running: Mutex::new(false),
            idle: Condvar::new(),
        }
    }

    pub fn pause(&self) {
        self.pause.pause();
        tracing::info!("transfer paused");
    }

    pub fn resume(&self) {
        self.pause.resume();
        tracing::info!("transfer resumed");
    }

    pub fn is_paused(&self) -> bool {
        self.pause.is_paused()
    }

    pub fn pause_signal(&self) -> &PauseSignal {
        &self.pause
    }

    pub fn chunk_size(&self) -> &ChunkSize {
        &self.chunk_size
    }

    pub fn is_running(&self) -> bool {
        *self.running.lock().unwrap()
    }

    pub(crate) fn set_running(&self, running: bool) {
        *self.running.lock().unwrap() = running;
        if !running {
            self.idle.notify_all();
        }
    }

    /// Waits up to `timeout` for the running flag to clear.
    pub fn wait_idle(&self, timeout: Duration) -> StopOutcome {
        let deadline = Instant::now() + timeout;
        let mut running = self.running.lock().unwrap();
        while *running {
            let now = Instant::now();
            if now >= deadline {
                return StopOutcome::TimedOut;
            }
            running = self.idle.wait_timeout(running, deadline - now).unwrap().0;
        }
        StopOutcome::Idle
    }

    /// Bounded cooperative stop used at application exit: pause, then wait
    /// up to `timeout` for the session to go idle.
    pub fn request_stop(&self, timeout: Duration) -> StopOutcome {
        self.pause();
        let outcome = self.wait_idle(timeout);
        if outcome == StopOutcome::TimedOut {
            tracing::warn!(
                timeout_ms = timeout.as_millis() as u64,
                "session still running after graceful stop window"
            );
        }
        outcome
    }
}

/// Clears the running flag when dropped, so a panicking or failing driver
/// never leaves waiters blocked.
pub(crate) struct RunningGuard<'a>(pub(crate) &'a TransferControl);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.set_running(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn wait_returns_immediately_when_not_paused() {
        let p = PauseSignal::new();
        assert!(!p.wait_while_paused());
    }

    #[test]
    fn resume_wakes_waiter() {
        let p = Arc::new(PauseSignal::new());
        p.pause();
        let p2 = Arc::clone(&p);
        let h = thread::spawn(move || p2.wait_while_paused());
        thread::sleep(Duration::from_millis(50));
        assert!(!h.is_finished());
        p.resume();
        assert!(h.join().unwrap());
    }

    #[test]
    fn chunk_size_never_zero() {
        let c = ChunkSize::new(0);
        assert_eq!(c.get(), 1);
        c.set(1024);
        assert_eq!(c.get(), 1024);
    }

    #[test]
    fn stop_idle_when_not_running() {
        let c = TransferControl::new(1024);
        assert_eq!(c.request_stop(Duration::from_millis(10)), StopOutcome::Idle);
        assert!(c.is_paused());
    }

    #[test]
    fn stop_times_out_while_running_then_sees_idle() {
        let c = Arc::new(TransferControl::new(1024));
        c.set_running(true);
        assert_eq!(c.request_stop(Duration::from_millis(20)), StopOutcome::TimedOut);

        let c2 = Arc::clone(&c);
        let h = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            let _guard = RunningGuard(&c2);
        });
        assert_eq!(c.wait_idle(Duration::from_secs(5)), StopOutcome::Idle);
        h.join().unwrap();
    }
}
