//! In-memory run state shared by the scheduler and the monitor.
//!
//! Only bookkeeping lives here (which targets are in flight, how many are
//! done). Byte counts always come from disk.

use std::sync::Mutex;

#[derive(Debug, Default)]
struct Inner {
    active: Vec<String>,
    finished: usize,
    failed: usize,
}

#[derive(Debug, Default)]
pub struct RunState {
    parallel: bool,
    inner: Mutex<Inner>,
}

impl RunState {
    pub fn new(parallel: bool) -> Self {
        Self {
            parallel,
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn is_parallel(&self) -> bool {
        self.parallel
    }

    pub fn target_started(&self, path: &str) {
        self.inner.lock().unwrap().active.push(path.to_string());
    }

    pub fn target_finished(&self, path: &str, ok: bool) {
        let mut g = self.inner.lock().unwrap();
        g.active.retain(|p| p != path);
        if ok {
            g.finished += 1;
        } else {
            g.failed += 1;
        }
    }

    /// Targets currently being fetched, in start order.
    pub fn active(&self) -> Vec<String> {
        self.inner.lock().unwrap().active.clone()
    }

    pub fn finished(&self) -> usize {
        self.inner.lock().unwrap().finished
    }

    pub fn failed(&self) -> usize {
        self.inner.lock().unwrap().failed
    }
}
