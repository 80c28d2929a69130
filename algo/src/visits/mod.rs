/*
 * SPDX-FileCopyrightText: 2024 Matteo Dell'Acqua
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Concurrent visits on graphs.
//!
//! Visits depend on a type parameter `A` describing visit events; they
//! provide a visit method accepting a callback function with argument `A`
//! and returning a `ControlFlow<E, ()>`, where `E` is a type parameter of the
//! visit method: for example, `E` might be [`Interrupted`] when the visit can
//! be cancelled, or [`Infallible`](std::convert::Infallible) if the visit
//! cannot be interrupted.
//!
//! If a callback returns a [`Break`](ControlFlow::Break), the visit will be
//! interrupted, and the [`Break`](ControlFlow::Break) value will be the return
//! value of the visit method; for uninterruptible visits we suggest to use the
//! [`no-break`](https://crates.io/crates/no-break) crate and its
//! [`continue_value_no_break`](no_break::NoBreak::continue_value_no_break)
//! method on the result to let type inference run smoothly. An interrupted
//! visit stops fanning out, but it returns only after all tasks it has spawned
//! have terminated.
//!
//! Callbacks are [`Fn`] + [`Sync`], as they are called concurrently by all
//! tasks of the visit, and they are never called while the shared visit
//! state is locked.
//!
//! All tasks of a visit share a single mutex guarding both the visited flags
//! and the result buffer: testing and setting the visited flag of a vertex,
//! and appending it to the result, happen in the same critical section, so a
//! vertex is claimed by exactly one task. The number of concurrently live
//! tasks is bounded by a [`TaskPool`](crate::TaskPool).
//!
//! If a task panics, the visit waits for the other tasks and then resumes the
//! panic on the calling thread. The state of a visit after an interruption or
//! a panic is unspecified until [`reset`](Parallel::reset) is called.

pub mod breadth_first;
pub mod depth_first;

use std::ops::ControlFlow;
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
/// The visit was interrupted.
#[error("The visit was interrupted")]
pub struct Interrupted;

/// A parallel visit from a single root.
pub trait Parallel<A> {
    /// Visits the graph from the specified root.
    ///
    /// See the [module documentation](crate::visits) for more information on
    /// the return value.
    ///
    /// If the root has already been visited the visit is empty, and the
    /// callback is never called.
    ///
    /// # Arguments
    ///
    /// * `root`: The node to start the visit from.
    ///
    /// * `callback`: The callback function.
    ///
    /// # Panics
    ///
    /// This method will panic if `root` is not a node of the graph.
    fn par_visit<E: Send, C: Fn(A) -> ControlFlow<E, ()> + Sync>(
        &mut self,
        root: usize,
        callback: C,
    ) -> ControlFlow<E, ()>;

    /// Returns the vertices reported by the visits performed since the last
    /// reset, in the order in which they were appended.
    fn order(&self) -> &[usize];

    /// Returns, for each vertex, whether it has been visited since the last
    /// reset.
    fn visited(&self) -> &[bool];

    /// Resets the visit status, making it possible to reuse it.
    fn reset(&mut self);
}

/// Visited flags and result buffer of a visit.
#[derive(Debug, Clone, Default)]
pub(crate) struct VisitState {
    pub(crate) visited: Vec<bool>,
    pub(crate) order: Vec<usize>,
}

impl VisitState {
    pub(crate) fn new(num_nodes: usize) -> Self {
        Self {
            visited: vec![false; num_nodes],
            order: Vec::new(),
        }
    }

    /// Marks `node` as visited, returning true if it was not.
    #[inline(always)]
    pub(crate) fn claim(&mut self, node: usize) -> bool {
        !std::mem::replace(&mut self.visited[node], true)
    }
}

#[inline(always)]
pub(crate) fn lock(state: &Mutex<VisitState>) -> MutexGuard<'_, VisitState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}
