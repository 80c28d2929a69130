/*
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// A counting bound on the number of concurrently live traversal tasks.
///
/// A task is live while it holds a [`TaskPermit`]. The root task of a
/// traversal obtains its permit with [`enter`](TaskPool::enter), which waits
/// until one is available, so requests exceeding the bound are queued rather
/// than rejected; tasks spawned during a fan-out use
/// [`try_enter`](TaskPool::try_enter), which never waits, and run on the
/// discovering thread when no permit is available. Since only roots wait, and
/// a root never waits while holding a permit, the pool cannot deadlock.
///
/// The pool is instrumented: [`stats`](TaskPool::stats) reports the current
/// and peak number of live tasks, as well as the number of permits granted
/// and refused by [`try_enter`](TaskPool::try_enter).
///
/// # Examples
///
/// ```
/// use trawl_algo::TaskPool;
///
/// let pool = TaskPool::new(2);
/// let root = pool.enter();
/// let child = pool.try_enter();
/// assert!(child.is_some());
/// assert!(pool.try_enter().is_none());
/// drop(child);
/// drop(root);
/// assert_eq!(pool.stats().peak, 2);
/// assert_eq!(pool.stats().live, 0);
/// ```
#[derive(Debug)]
pub struct TaskPool {
    max_tasks: usize,
    live: Mutex<usize>,
    cond: Condvar,
    peak: AtomicUsize,
    granted: AtomicU64,
    refused: AtomicU64,
}

/// A snapshot of the counters of a [`TaskPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TaskPoolStats {
    /// The number of tasks live when the snapshot was taken.
    pub live: usize,
    /// The largest number of tasks ever live at the same time.
    pub peak: usize,
    /// The number of permits granted by [`TaskPool::try_enter`].
    pub granted: u64,
    /// The number of permits refused by [`TaskPool::try_enter`].
    pub refused: u64,
}

impl TaskPool {
    /// Creates a pool allowing at most `max_tasks` live tasks.
    ///
    /// # Panics
    ///
    /// This method will panic if `max_tasks` is zero.
    pub fn new(max_tasks: usize) -> Self {
        assert!(max_tasks > 0, "A task pool must allow at least one task");
        Self {
            max_tasks,
            live: Mutex::new(0),
            cond: Condvar::new(),
            peak: AtomicUsize::new(0),
            granted: AtomicU64::new(0),
            refused: AtomicU64::new(0),
        }
    }

    /// Returns the maximum number of live tasks.
    pub fn max_tasks(&self) -> usize {
        self.max_tasks
    }

    fn lock(&self) -> MutexGuard<'_, usize> {
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn admit(&self, live: &mut usize) -> TaskPermit<'_> {
        *live += 1;
        self.peak.fetch_max(*live, Ordering::Relaxed);
        TaskPermit { pool: self }
    }

    /// Waits for a permit.
    pub fn enter(&self) -> TaskPermit<'_> {
        let mut live = self
            .cond
            .wait_while(self.lock(), |live| *live >= self.max_tasks)
            .unwrap_or_else(PoisonError::into_inner);
        self.admit(&mut live)
    }

    /// Returns a permit if one is available.
    pub fn try_enter(&self) -> Option<TaskPermit<'_>> {
        let mut live = self.lock();
        if *live >= self.max_tasks {
            self.refused.fetch_add(1, Ordering::Relaxed);
            return None;
        }
        self.granted.fetch_add(1, Ordering::Relaxed);
        Some(self.admit(&mut live))
    }

    /// Returns the number of currently live tasks.
    pub fn live(&self) -> usize {
        *self.lock()
    }

    /// Returns a snapshot of the counters of the pool.
    pub fn stats(&self) -> TaskPoolStats {
        TaskPoolStats {
            live: self.live(),
            peak: self.peak.load(Ordering::Relaxed),
            granted: self.granted.load(Ordering::Relaxed),
            refused: self.refused.load(Ordering::Relaxed),
        }
    }
}

/// A live task of a [`TaskPool`]; the task ends when the permit is dropped.
#[derive(Debug)]
#[must_use = "the task ends as soon as the permit is dropped"]
pub struct TaskPermit<'a> {
    pool: &'a TaskPool,
}

impl Drop for TaskPermit<'_> {
    fn drop(&mut self) {
        let mut live = self.pool.lock();
        *live -= 1;
        drop(live);
        self.pool.cond.notify_one();
    }
}
