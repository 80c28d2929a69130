/*
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use crate::visits::breadth_first::EventNoPred;
use crate::visits::{lock, Parallel, VisitState};
use crate::{TaskPermit, TaskPool};
use std::ops::ControlFlow::{self, Break, Continue};
use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Barrier, Mutex, PoisonError};
use std::thread;
use trawl::traits::RandomAccessGraph;

/// Level-synchronous parallel breadth-first visits.
///
/// The visit proceeds in rounds, one per distance from the root. In each
/// round the nodes of the current frontier are split among concurrent tasks;
/// each task scans the successors of its nodes, claims (in a single critical
/// section) the ones that have not been visited yet, appends them to the
/// result buffer and collects them in its share of the next frontier. All the
/// tasks of a round wait on a barrier sized to the number of tasks of the
/// round before the next frontier is assembled, so no node at distance
/// *d* + 2 can be claimed before all nodes at distance *d* + 1 have been.
/// Thus, the result buffer is always a breadth-first order of the nodes
/// reachable from the root, each appearing exactly once; only the order of
/// nodes at the same distance depends on scheduling.
///
/// A round uses one task per frontier node, subject to the bound of the
/// [`TaskPool`]: if fewer permits are available, nodes are assigned to the
/// available tasks round-robin, and if none is available the round is run on
/// the calling thread. The thread calling [`par_visit`](Parallel::par_visit)
/// waits for a permit of its own before starting. A task that panics still
/// reaches the barrier, so the other tasks of its round never wait forever.
///
/// # Examples
///
/// Let's compute the distances from 0.
///
/// ```
/// use trawl::graphs::AdjMatrixGraph;
/// use trawl_algo::TaskPool;
/// use trawl_algo::visits::Parallel;
/// use trawl_algo::visits::breadth_first::*;
/// use std::ops::ControlFlow::Continue;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use no_break::NoBreak;
///
/// let graph = AdjMatrixGraph::from_arcs([(0, 1), (1, 2), (2, 0), (1, 3)]);
/// let pool = TaskPool::new(4);
/// let mut visit = ParBarrier::new(&graph, &pool);
/// let d = [(); 4].map(|_| AtomicUsize::new(0));
/// visit.par_visit(0, |event| {
///     if let EventNoPred::Unknown { node, distance } = event {
///         // There will be exactly one store for each node
///         d[node].store(distance, Ordering::Relaxed);
///     }
///     Continue(())
/// }).continue_value_no_break();
///
/// assert_eq!(d.map(AtomicUsize::into_inner), [0, 1, 2, 2]);
/// assert_eq!(&visit.order()[..2], &[0, 1]);
/// ```
pub struct ParBarrier<'a, G: RandomAccessGraph> {
    graph: &'a G,
    pool: &'a TaskPool,
    state: VisitState,
}

impl<'a, G: RandomAccessGraph> ParBarrier<'a, G> {
    /// Creates a level-synchronous parallel breadth-first visit.
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
struct Rounds<'a, G, E> {
    graph: &'a G,
    pool: &'a TaskPool,
    state: Mutex<VisitState>,
    stop: AtomicBool,
    callback: &'a (dyn Fn(EventNoPred) -> ControlFlow<E, ()> + Sync),
}

impl<G: RandomAccessGraph + Sync, E: Send> Rounds<'_, G, E> {
    /// Calls the callback, raising the stop flag if it breaks.
    fn emit(&self, event: EventNoPred) -> ControlFlow<E, ()> {
        let result = (self.callback)(event);
        if result.is_break() {
            self.stop.store(true, Ordering::Relaxed);
        }
        result
    }

    /// Visits from a claimed root, already in the result buffer.
    fn run(&self, root: usize) -> ControlFlow<E, ()> {
        self.emit(EventNoPred::Init {})?;
        self.emit(EventNoPred::Unknown {
            node: root,
            distance: 0,
        })?;

        let mut frontier = vec![root];
        let mut distance = 0;
        while !frontier.is_empty() {
            self.emit(EventNoPred::FrontierSize {
                distance,
                nodes: frontier.len(),
            })?;
            distance += 1;
            frontier = self.round(&frontier, distance)?;
        }
        Continue(())
    }

    /// Expands a frontier, returning the next one.
    fn round(&self, frontier: &[usize], distance: usize) -> ControlFlow<E, Vec<usize>> {
        let permits: Vec<TaskPermit> = std::iter::from_fn(|| self.pool.try_enter())
            .take(frontier.len())
            .collect();
        if permits.is_empty() {
            log::debug!(
                "Task bound reached: expanding {} nodes at distance {} inline",
                frontier.len(),
                distance - 1
            );
            return self.expand(frontier.iter().copied(), distance);
        }

        let num_tasks = permits.len();
        let barrier = Barrier::new(num_tasks);
        thread::scope(|scope| {
            let handles = permits
                .into_iter()
                .enumerate()
                .map(|(task, permit)| {
                    let barrier = &barrier;
                    scope.spawn(move || {
                        let _permit = permit;
                        let nodes = frontier.iter().copied().skip(task).step_by(num_tasks);
                        let result = catch_unwind(AssertUnwindSafe(|| self.expand(nodes, distance)));
                        barrier.wait();
                        result
                    })
                })
                .collect::<Vec<_>>();

            let mut next = vec![];
            let mut interrupted = None;
            let mut panic = None;
            for handle in handles {
                match handle.join() {
                    Ok(Ok(Continue(nodes))) => next.extend(nodes),
                    Ok(Ok(Break(err))) => {
                        interrupted.get_or_insert(err);
                    }
                    Ok(Err(payload)) | Err(payload) => {
                        panic.get_or_insert(payload);
                    }
                }
            }
            if let Some(payload) = panic {
                resume_unwind(payload);
            }
            match interrupted {
                Some(err) => Break(err),
                None => Continue(next),
            }
        })
    }

    /// Expands some nodes of a frontier, returning the nodes claimed.
    fn expand(
        &self,
        nodes: impl IntoIterator<Item = usize>,
        distance: usize,
    ) -> ControlFlow<E, Vec<usize>> {
        let mut next = vec![];
        for node in nodes {
            for succ in self.graph.successors(node) {
                if self.stop.load(Ordering::Relaxed) {
                    return Continue(next);
                }
                let claimed = {
                    let mut state = lock(&self.state);
                    let claimed = state.claim(succ);
                    if claimed {
                        state.order.push(succ);
                    }
                    claimed
                };
                if claimed {
                    next.push(succ);
                    self.emit(EventNoPred::Unknown {
                        node: succ,
                        distance,
                    })?;
                } else {
                    self.emit(EventNoPred::Known { node: succ })?;
                }
            }
        }
        Continue(next)
    }
}

impl<G: RandomAccessGraph + Sync> Parallel<EventNoPred> for ParBarrier<'_, G> {
    fn par_visit<E: Send, C: Fn(EventNoPred) -> ControlFlow<E, ()> + Sync>(
        &mut self,
        root: usize,
        callback: C,
    ) -> ControlFlow<E, ()> {
        if !self.state.claim(root) {
            return Continue(());
        }
        self.state.order.push(root);

        let _permit = self.pool.enter();
        let rounds = Rounds {
            graph: self.graph,
            pool: self.pool,
            state: Mutex::new(std::mem::take(&mut self.state)),
            stop: AtomicBool::new(false),
            callback: &callback,
        };

        let result = rounds.run(root);

        self.state = rounds
            .state
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);

        result?;
        callback(EventNoPred::Done {})
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
