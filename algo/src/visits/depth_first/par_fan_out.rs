/*
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use crate::visits::depth_first::EventNoPred;
use crate::visits::{lock, Parallel, VisitState};
use crate::TaskPool;
use std::ops::ControlFlow::{self, Break, Continue};
use std::panic::resume_unwind;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::thread::{self, Scope};
use trawl::traits::RandomAccessGraph;

/// Fan-out parallel depth-first visits.
///
/// The expansion of a node scans its successors in adjacency order; every
/// successor that has not been visited yet is claimed (its visited flag is
/// tested and set in a single critical section) and then expanded by a new
/// task, without waiting for it to complete. A node whose expansion claims no
/// successor is a *leaf* of the visit and is appended to the result buffer.
/// After the scan, the expansion waits for all tasks it has spawned.
///
/// Tasks are scoped threads holding a permit of a [`TaskPool`]. If no permit
/// is available when a successor is claimed, the successor is expanded on the
/// current thread once the scan is complete, so the number of live tasks never
/// exceeds the bound of the pool, and no claimed successor is ever dropped.
/// The thread calling [`par_visit`](Parallel::par_visit) waits for a permit
/// of its own before starting.
///
/// The set of visited nodes is always the set of nodes reachable from the
/// root, but since siblings race, which nodes are leaves, and the order in
/// which they are reported, depend on scheduling. On a graph in which every
/// reachable node has at most one successor, the result is deterministic.
///
/// # Examples
///
/// ```
/// use trawl::graphs::AdjMatrixGraph;
/// use trawl_algo::TaskPool;
/// use trawl_algo::visits::Parallel;
/// use trawl_algo::visits::depth_first::*;
/// use std::ops::ControlFlow::Continue;
/// use no_break::NoBreak;
///
/// let graph = AdjMatrixGraph::from_arcs([(0, 1), (1, 2)]);
/// let pool = TaskPool::new(4);
/// let mut visit = ParFanOut::new(&graph, &pool);
/// visit.par_visit(0, |_| Continue(())).continue_value_no_break();
/// assert_eq!(visit.order(), &[2]);
/// assert_eq!(visit.visited(), &[true, true, true]);
/// ```
pub struct ParFanOut<'a, G: RandomAccessGraph> {
    graph: &'a G,
    pool: &'a TaskPool,
    state: VisitState,
}

impl<'a, G: RandomAccessGraph> ParFanOut<'a, G> {
    /// Creates a fan-out parallel depth-first visit.
    ///
    /// # Arguments
    /// * `graph`: the graph to visit.
    /// * `pool`: the pool bounding the number of live tasks.
    pub fn new(graph: &'a G, pool: &'a TaskPool) -> Self {
        Self {
            graph,
            pool,
            state: VisitState::new(graph.num_nodes()),
        }
    }

    /// Consumes the visit, returning its result buffer.
    pub fn into_order(self) -> Vec<usize> {
        self.state.order
    }
}

/// The state shared by the tasks of a visit.
struct FanOut<'a, G, E> {
    graph: &'a G,
    pool: &'a TaskPool,
    state: Mutex<VisitState>,
    stop: AtomicBool,
    callback: &'a (dyn Fn(EventNoPred) -> ControlFlow<E, ()> + Sync),
}

impl<'a, G: RandomAccessGraph + Sync, E: Send> FanOut<'a, G, E> {
    /// Calls the callback, raising the stop flag if it breaks.
    fn emit(&self, event: EventNoPred) -> ControlFlow<E, ()> {
        let result = (self.callback)(event);
        if result.is_break() {
            self.stop.store(true, Ordering::Relaxed);
        }
        result
    }

    /// Visits from a claimed root.
    fn run(&self, root: usize) -> ControlFlow<E, ()> {
        self.emit(EventNoPred::Init { root })?;
        self.emit(EventNoPred::Previsit {
            node: root,
            parent: root,
            depth: 0,
        })?;
        thread::scope(|scope| self.expand(scope, root, 0))
    }

    /// Expands a claimed node, and recursively all the nodes it claims.
    ///
    /// The caller must hold a permit for the task.
    fn expand<'scope, 'env>(
        &'env self,
        scope: &'scope Scope<'scope, 'env>,
        node: usize,
        depth: usize,
    ) -> ControlFlow<E, ()> {
        let mut result = Continue(());
        let mut handles = vec![];
        let mut deferred = vec![];
        let mut leaf = true;

        for succ in self.graph.successors(node) {
            if self.stop.load(Ordering::Relaxed) {
                leaf = false;
                break;
            }

            if !lock(&self.state).claim(succ) {
                if let Break(err) = self.emit(EventNoPred::Revisit { node: succ, parent: node }) {
                    result = Break(err);
                    break;
                }
                continue;
            }

            leaf = false;
            if let Break(err) = self.emit(EventNoPred::Previsit {
                node: succ,
                parent: node,
                depth: depth + 1,
            }) {
                result = Break(err);
                break;
            }

            match self.pool.try_enter() {
                Some(permit) => handles.push(scope.spawn(move || {
                    let _permit = permit;
                    self.expand(scope, succ, depth + 1)
                })),
                None => {
                    log::debug!("Task bound reached: expanding {succ} inline");
                    deferred.push(succ);
                }
            }
        }

        if leaf && result.is_continue() {
            lock(&self.state).order.push(node);
            result = self.emit(EventNoPred::Leaf { node, depth });
        }

        for succ in deferred {
            if result.is_break() || self.stop.load(Ordering::Relaxed) {
                break;
            }
            result = self.expand(scope, succ, depth + 1);
        }

        // Every spawned task is joined, even after an interruption or a
        // panic.
        let mut panic = None;
        for handle in handles {
            match handle.join() {
                Ok(Break(err)) if result.is_continue() => result = Break(err),
                Ok(_) => {}
                Err(payload) => {
                    panic.get_or_insert(payload);
                }
            }
        }
        if let Some(payload) = panic {
            resume_unwind(payload);
        }

        result
    }
}

impl<G: RandomAccessGraph + Sync> Parallel<EventNoPred> for ParFanOut<'_, G> {
    fn par_visit<E: Send, C: Fn(EventNoPred) -> ControlFlow<E, ()> + Sync>(
        &mut self,
        root: usize,
        callback: C,
    ) -> ControlFlow<E, ()> {
        if !self.state.claim(root) {
            return Continue(());
        }

        let _permit = self.pool.enter();
        let fan_out = FanOut {
            graph: self.graph,
            pool: self.pool,
            state: Mutex::new(std::mem::take(&mut self.state)),
            stop: AtomicBool::new(false),
            callback: &callback,
        };

        let result = fan_out.run(root);

        self.state = fan_out
            .state
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);

        result?;
        callback(EventNoPred::Done { root })
    }

    fn order(&self) -> &[usize] {
        &self.state.order
    }

    fn visited(&self) -> &[bool] {
        &self.state.visited
    }

    fn reset(&mut self) {
        self.state = VisitState::new(self.graph.num_nodes());
    }
}
