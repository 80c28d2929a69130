/*
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[derive(Debug, Default)]
struct GateState {
    readers: usize,
    writer: bool,
}

/// A readers-writer gate guarding a named graph resource.
///
/// Any number of readers can hold the gate at the same time, and readers
/// never wait for each other; a writer holds the gate exclusively. No
/// fairness policy is enforced: whoever is eligible when the gate is released
/// proceeds first.
///
/// Acquisition returns a guard that releases the gate when dropped, so the
/// gate stays balanced on every exit path, unwinding included.
#[derive(Debug, Default)]
pub struct RwGate {
    state: Mutex<GateState>,
    cond: Condvar,
}

impl RwGate {
    /// Creates a new, free gate.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Waits on the condition variable while `blocked` holds, for at most
    /// `timeout` if given. Returns `None` if the wait timed out.
    fn wait_while<'a>(
        &self,
        state: MutexGuard<'a, GateState>,
        timeout: Option<Duration>,
        blocked: impl FnMut(&mut GateState) -> bool,
    ) -> Option<MutexGuard<'a, GateState>> {
        match timeout {
            None => Some(
                self.cond
                    .wait_while(state, blocked)
                    .unwrap_or_else(PoisonError::into_inner),
            ),
            Some(timeout) => {
                let (state, result) = self
                    .cond
                    .wait_timeout_while(state, timeout, blocked)
                    .unwrap_or_else(PoisonError::into_inner);
                if result.timed_out() {
                    None
                } else {
                    Some(state)
                }
            }
        }
    }

    /// Acquires the gate for reading, waiting until no writer holds it.
    ///
    /// Returns `None` if `timeout` elapses first.
    pub fn read(self: &Arc<Self>, timeout: Option<Duration>) -> Option<ReadGuard> {
        let state = self.lock();
        let mut state = self.wait_while(state, timeout, |state| state.writer)?;
        state.readers += 1;
        Some(ReadGuard {
            gate: Arc::clone(self),
        })
    }

    /// Acquires the gate for writing, waiting until no reader and no other
    /// writer holds it.
    ///
    /// Returns `None` if `timeout` elapses first.
    pub fn write(self: &Arc<Self>, timeout: Option<Duration>) -> Option<WriteGuard> {
        let state = self.lock();
        let mut state =
            self.wait_while(state, timeout, |state| state.writer || state.readers > 0)?;
        state.writer = true;
        Some(WriteGuard {
            gate: Arc::clone(self),
        })
    }

    /// Returns the number of readers currently holding the gate.
    pub fn readers(&self) -> usize {
        self.lock().readers
    }

    /// Returns whether a writer currently holds the gate.
    pub fn is_write_locked(&self) -> bool {
        self.lock().writer
    }

    fn release_read(&self) {
        let mut state = self.lock();
        state.readers -= 1;
        if state.readers == 0 {
            self.cond.notify_all();
        }
    }

    fn release_write(&self) {
        let mut state = self.lock();
        state.writer = false;
        self.cond.notify_all();
    }
}

/// Read access to a [`RwGate`], released on drop.
#[derive(Debug)]
#[must_use = "the gate is released as soon as the guard is dropped"]
pub struct ReadGuard {
    gate: Arc<RwGate>,
}

impl Drop for ReadGuard {
    fn drop(&mut self) {
        self.gate.release_read();
    }
}

/// Write access to a [`RwGate`], released on drop.
#[derive(Debug)]
#[must_use = "the gate is released as soon as the guard is dropped"]
pub struct WriteGuard {
    gate: Arc<RwGate>,
}

impl Drop for WriteGuard {
    fn drop(&mut self) {
        self.gate.release_write();
    }
}

/// The gates of all graph names, created lazily on first access.
///
/// Gates are never removed: the gate of a name lives as long as the
/// registry, even if the resource is deleted. Unrelated names never contend.
#[derive(Debug, Default)]
pub struct GateRegistry {
    gates: Mutex<HashMap<String, Arc<RwGate>>>,
}

impl GateRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the gate of `name`, creating it if necessary.
    pub fn gate(&self, name: &str) -> Arc<RwGate> {
        let mut gates = self.gates.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(gates.entry(name.to_owned()).or_default())
    }

    /// Returns the number of gates created so far.
    pub fn len(&self) -> usize {
        self.gates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns true if no gate has been created yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::thread;

    #[test]
    fn test_readers_share() {
        let gate = Arc::new(RwGate::new());
        let r0 = gate.read(Some(Duration::from_millis(10)));
        let r1 = gate.read(Some(Duration::from_millis(10)));
        assert!(r0.is_some());
        assert!(r1.is_some());
        assert_eq!(gate.readers(), 2);
        drop(r0);
        drop(r1);
        assert_eq!(gate.readers(), 0);
    }

    #[test]
    fn test_writer_excludes() {
        let gate = Arc::new(RwGate::new());
        let w = gate.write(None);
        assert!(w.is_some());
        assert!(gate.is_write_locked());
        assert!(gate.read(Some(Duration::from_millis(20))).is_none());
        assert!(gate.write(Some(Duration::from_millis(20))).is_none());
        drop(w);
        assert!(!gate.is_write_locked());
        assert!(gate.read(Some(Duration::from_millis(20))).is_some());
    }

    #[test]
    fn test_writer_waits_for_readers() {
        let gate = Arc::new(RwGate::new());
        let reader = gate.read(None);
        let (tx, rx) = mpsc::channel();
        let handle = {
            let gate = Arc::clone(&gate);
            thread::spawn(move || {
                let _w = gate.write(None);
                tx.send(()).unwrap();
            })
        };
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
        drop(reader);
        assert!(rx.recv_timeout(Duration::from_secs(5)).is_ok());
        handle.join().unwrap();
        assert!(!gate.is_write_locked());
    }

    #[test]
    fn test_registry_is_keyed() {
        let registry = GateRegistry::new();
        let a = registry.gate("a");
        let b = registry.gate("b");
        assert!(!Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&a, &registry.gate("a")));
        assert_eq!(registry.len(), 2);
        let _w = a.write(None);
        assert!(b.read(Some(Duration::from_millis(10))).is_some());
    }
}
