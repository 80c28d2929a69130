/*
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Classification and forwarding of inbound requests.

use crossbeam_channel::{Sender, TrySendError};
use std::fmt::{self, Display, Formatter};
use std::sync::{PoisonError, RwLock};
use trawl::prelude::*;

/// The destination of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// The single write-path worker.
    WritePath,
    /// The traversal replica with the given index.
    Replica(usize),
    /// Every worker.
    Broadcast,
}

impl Display for Route {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Route::WritePath => f.write_str("write path"),
            Route::Replica(index) => write!(f, "replica {index}"),
            Route::Broadcast => f.write_str("all workers"),
        }
    }
}

/// Returns the traversal replica serving a sequence number.
///
/// # Panics
///
/// This function will panic if `num_replicas` is zero.
#[inline(always)]
pub fn replica_for(sequence_number: u64, num_replicas: usize) -> usize {
    assert!(num_replicas > 0, "There must be at least one replica");
    (sequence_number % num_replicas as u64) as usize
}

/// Returns the destination of an operation.
///
/// This is a static partitioning: writes go to the write path, traversals to
/// the replica selected by [`replica_for`], and shutdowns to everybody.
pub fn route(operation: Operation, sequence_number: u64, num_replicas: usize) -> Route {
    match operation {
        Operation::AddGraph | Operation::ModifyGraph => Route::WritePath,
        Operation::Dfs | Operation::Bfs => {
            Route::Replica(replica_for(sequence_number, num_replicas))
        }
        Operation::Shutdown => Route::Broadcast,
    }
}

/// Forwards requests to the queues of the workers.
///
/// Every worker has its own bounded queue. A full queue fails the request
/// with [`RequestError::ResourceExhausted`], a worker that is gone with
/// [`RequestError::DispatchFailed`]; in both cases the request is neither
/// retried nor rerouted to another replica.
///
/// A shutdown closes the queues: it is forwarded to every worker, after which
/// the router drops its senders and all other requests fail with
/// [`RequestError::ShuttingDown`]. Since dispatches hold the read side of the
/// lock on the queues and the shutdown the write side, a request is either
/// queued before the shutdown or refused.
#[derive(Debug)]
pub struct Router {
    targets: RwLock<Option<Targets>>,
    num_replicas: usize,
}

#[derive(Debug)]
struct Targets {
    write_path: Sender<Request>,
    replicas: Vec<Sender<Request>>,
}

impl Targets {
    fn sender(&self, route: Route) -> &Sender<Request> {
        match route {
            Route::Replica(index) => &self.replicas[index],
            _ => &self.write_path,
        }
    }
}

impl Router {
    /// Creates a router over the queues of the write path and of the
    /// replicas.
    ///
    /// # Panics
    ///
    /// This method will panic if `replicas` is empty.
    pub fn new(write_path: Sender<Request>, replicas: Vec<Sender<Request>>) -> Self {
        assert!(!replicas.is_empty(), "There must be at least one replica");
        Self {
            num_replicas: replicas.len(),
            targets: RwLock::new(Some(Targets {
                write_path,
                replicas,
            })),
        }
    }

    /// Returns the number of traversal replicas.
    pub fn num_replicas(&self) -> usize {
        self.num_replicas
    }

    /// Returns whether a shutdown has closed the queues.
    pub fn is_shutting_down(&self) -> bool {
        self.targets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Forwards a request to its destination, returning the route taken.
    pub fn dispatch(&self, request: Request) -> Result<Route, RequestError> {
        let route = route(
            request.operation(),
            request.sequence_number,
            self.num_replicas,
        );
        log::debug!(
            "Request {} ({:?}, sequence number {}) routed to {route}",
            request.correlation_id,
            request.operation(),
            request.sequence_number
        );

        if route == Route::Broadcast {
            self.broadcast(request)?;
            return Ok(route);
        }

        let guard = self.targets.read().unwrap_or_else(PoisonError::into_inner);
        let Some(targets) = guard.as_ref() else {
            return Err(RequestError::ShuttingDown);
        };
        targets
            .sender(route)
            .try_send(request)
            .map_err(|err| match err {
                TrySendError::Full(_) => RequestError::ResourceExhausted {
                    what: format!("queue of {route}"),
                },
                TrySendError::Disconnected(_) => RequestError::DispatchFailed {
                    target: route.to_string(),
                },
            })?;
        Ok(route)
    }

    /// Sends a shutdown request to every worker, waiting for room in full
    /// queues, and then closes the queues.
    ///
    /// All workers are tried even if some of them cannot be reached; the
    /// first unreachable one is reported. Broadcasting again after the
    /// queues are closed does nothing.
    fn broadcast(&self, request: Request) -> Result<(), RequestError> {
        let mut guard = self.targets.write().unwrap_or_else(PoisonError::into_inner);
        let Some(targets) = guard.take() else {
            return Ok(());
        };
        let routes = std::iter::once(Route::WritePath)
            .chain((0..self.num_replicas).map(Route::Replica));
        let mut result = Ok(());
        for route in routes {
            if targets.sender(route).send(request.clone()).is_err() {
                log::warn!("Could not deliver shutdown to {route}");
                if result.is_ok() {
                    result = Err(RequestError::DispatchFailed {
                        target: route.to_string(),
                    });
                }
            }
        }
        result
    }
}
