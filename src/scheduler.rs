//! # Scheduler
//!
//! Table of periodic tasks for the cooperative main loop.
//!
//! Each entry is a `(task, interval, last_run)` tuple. A task is due when it
//! has never run or when at least `interval` has elapsed since it last ran.
//! The scheduler only decides; the caller performs the work.

use tokio::time::{Duration, Instant};

struct Entry<K> {
    task: K,
    interval: Duration,
    last_run: Option<Instant>,
}

/// Interval table keyed by task identifier
pub struct Scheduler<K> {
    entries: Vec<Entry<K>>,
}

impl<K: Copy + PartialEq> Default for Scheduler<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Copy + PartialEq> Scheduler<K> {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Register `task` to run every `interval`
    ///
    /// Registering the same task again replaces its interval and clears its
    /// last-run time.
    pub fn every(mut self, task: K, interval: Duration) -> Self {
        self.entries.retain(|e| e.task != task);
        self.entries.push(Entry {
            task,
            interval,
            last_run: None,
        });
        self
    }

    /// Tasks due at `now`, in registration order
    ///
    /// Every returned task is marked as run at `now`.
    pub fn due(&mut self, now: Instant) -> Vec<K> {
        let mut fired = Vec::new();
        for entry in &mut self.entries {
            let ready = match entry.last_run {
                None => true,
                Some(last) => now.saturating_duration_since(last) >= entry.interval,
            };
            if ready {
                entry.last_run = Some(now);
                fired.push(entry.task);
            }
        }
        fired
    }

    /// Make `task` due on the next tick
    pub fn trigger(&mut self, task: K) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.task == task) {
            entry.last_run = None;
        }
    }

    /// Treat `task` as having run at `at`
    pub fn defer(&mut self, task: K, at: Instant) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.task == task) {
            entry.last_run = Some(at);
        }
    }
}
