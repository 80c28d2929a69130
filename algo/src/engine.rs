/*
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Execution of traversal requests.

use crate::visits::{breadth_first, depth_first, Interrupted, Parallel};
use crate::{CancellationToken, TaskPool};
use std::any::Any;
use std::ops::ControlFlow::{Break, Continue};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use trawl::prelude::*;

/// Runs traversals on behalf of one worker replica.
///
/// All traversals run by an engine, and by its clones, share the same
/// [`TaskPool`], so the bound on live tasks holds across concurrent
/// requests. The engine keeps no other state between requests: every
/// request works on its own copy of the graph.
#[derive(Debug, Clone)]
pub struct TraversalEngine {
    pool: Arc<TaskPool>,
}

impl TraversalEngine {
    /// Creates an engine allowing at most `max_tasks` live tasks.
    pub fn new(max_tasks: usize) -> Self {
        Self::with_pool(Arc::new(TaskPool::new(max_tasks)))
    }

    /// Creates an engine using an existing pool.
    pub fn with_pool(pool: Arc<TaskPool>) -> Self {
        Self { pool }
    }

    /// Returns the pool bounding the live tasks of the engine.
    pub fn pool(&self) -> &TaskPool {
        &self.pool
    }

    /// Traverses `graph` from `start`, returning the result buffer: the leaves
    /// in discovery order for [`Mode::Dfs`], all reachable vertices in
    /// breadth-first order for [`Mode::Bfs`].
    ///
    /// A start vertex out of range is rejected before any task is created.
    /// The token is checked at every fan-out point; a cancelled traversal
    /// waits for its tasks and then fails with [`RequestError::Cancelled`].
    /// A panic in a task fails the request with
    /// [`RequestError::TaskPanicked`].
    pub fn run<G: RandomAccessGraph + Sync>(
        &self,
        graph: &G,
        start: usize,
        mode: Mode,
        cancel: &CancellationToken,
    ) -> Result<Vec<usize>, RequestError> {
        let num_vertices = graph.num_nodes();
        if start >= num_vertices {
            return Err(RequestError::VertexOutOfRange {
                vertex: start,
                num_vertices,
            });
        }
        if cancel.is_cancelled() {
            return Err(RequestError::Cancelled);
        }

        let outcome = catch_unwind(AssertUnwindSafe(|| match mode {
            Mode::Dfs => {
                let mut visit = depth_first::ParFanOut::new(graph, &self.pool);
                let flow = visit.par_visit(start, |event| match event {
                    depth_first::EventNoPred::Previsit { .. } => cancel.check(),
                    _ => Continue(()),
                });
                (flow, visit.into_order())
            }
            Mode::Bfs => {
                let mut visit = breadth_first::ParBarrier::new(graph, &self.pool);
                let flow = visit.par_visit(start, |event| match event {
                    breadth_first::EventNoPred::FrontierSize { .. }
                    | breadth_first::EventNoPred::Unknown { .. } => cancel.check(),
                    _ => Continue(()),
                });
                (flow, visit.into_order())
            }
        }));

        match outcome {
            Ok((Continue(()), order)) => Ok(order),
            Ok((Break(Interrupted), _)) => Err(RequestError::Cancelled),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                log::error!("Traversal from {start} ({mode}) panicked: {message}");
                Err(RequestError::TaskPanicked { message })
            }
        }
    }

    /// Loads the graph of a request from `store` and traverses it.
    ///
    /// The graph is read under the read side of its gate, which is released
    /// before the traversal starts.
    pub fn execute(
        &self,
        store: &GraphStore,
        request: &TraversalRequest,
        cancel: &CancellationToken,
    ) -> Result<TraversalReply, RequestError> {
        let graph = store.load(&request.graph_name)?;
        let ordered_vertices = self.run(&graph, request.start_vertex, request.mode, cancel)?;
        log::debug!(
            "Request {}: {} from {} on {:?} reported {} vertices",
            request.correlation_id,
            request.mode,
            request.start_vertex,
            request.graph_name,
            ordered_vertices.len()
        );
        Ok(TraversalReply {
            correlation_id: request.correlation_id,
            mode: request.mode,
            start_vertex: request.start_vertex,
            ordered_vertices,
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}
