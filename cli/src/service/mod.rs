/*
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! The dispatch tier of the traversal service.
//!
//! A [`Service`] owns a [`GraphStore`], a write-path worker applying graph
//! writes one at a time, and a fixed number of traversal replicas. Requests
//! are [submitted](Service::submit) to a [`Router`], which forwards them to
//! the bounded queue of their worker; replies come back through a
//! [`ReplyChannel`] keyed by correlation id.
//!
//! ```
//! # use trawl::prelude::*;
//! # use trawl_cli::service::Service;
//! # use trawl_cli::ServiceConfig;
//! # use std::time::Duration;
//! # fn main() -> anyhow::Result<()> {
//! let dir = tempfile::tempdir()?;
//! let service = Service::start(ServiceConfig::new(dir.path()))?;
//! let graph = AdjMatrixGraph::from_arcs([(0, 1), (1, 2)]);
//! let timeout = Duration::from_secs(60);
//!
//! service.call(Request::write(1, 1, Operation::AddGraph, "g", graph), timeout)?;
//! let body = service.call(Request::traverse(2, 2, "g", 0, Mode::Bfs), timeout)?;
//! assert_eq!(body.to_string(), "The BFS traversal from 1 is: 1 2 3");
//! service.shutdown();
//! # Ok(())
//! # }
//! ```

mod replica;
mod reply;
mod router;

pub use reply::*;
pub use router::*;

use crossbeam_channel::bounded;
use replica::Replica;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use trawl::prelude::*;
use trawl_algo::prelude::*;

/// The parameters of a [`Service`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// The directory of graph resources.
    pub store_dir: PathBuf,
    /// The number of traversal replicas.
    pub replicas: usize,
    /// The number of traversals each replica runs at the same time.
    pub runners: usize,
    /// The maximum number of concurrent visit tasks of each replica.
    pub max_tasks: usize,
    /// The maximum number of vertices of a graph.
    pub max_vertices: usize,
    /// The capacity of the queue of each worker.
    pub queue_depth: usize,
    /// The maximum wait on the gate of a graph, or `None` to wait forever.
    pub gate_timeout: Option<Duration>,
    /// The maximum duration of a traversal, or `None` for no limit.
    pub traversal_timeout: Option<Duration>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            store_dir: PathBuf::from("."),
            replicas: 2,
            runners: 4,
            max_tasks: 200,
            max_vertices: MAX_VERTICES,
            queue_depth: 64,
            gate_timeout: Some(Duration::from_secs(10)),
            traversal_timeout: None,
        }
    }
}

impl ServiceConfig {
    /// Returns the default configuration over a given store directory.
    pub fn new(store_dir: impl AsRef<Path>) -> Self {
        Self {
            store_dir: store_dir.as_ref().to_owned(),
            ..Self::default()
        }
    }
}

/// A running traversal service.
///
/// Dropping a service shuts it down.
pub struct Service {
    config: ServiceConfig,
    store: Arc<GraphStore>,
    router: Router,
    replies: Arc<ReplyChannel>,
    workers: Mutex<Vec<(String, JoinHandle<()>)>>,
}

impl core::fmt::Debug for Service {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Service")
            .field("config", &self.config)
            .field("router", &self.router)
            .field("pending", &self.replies.pending())
            .finish()
    }
}

fn spawn_worker(
    name: String,
    work: impl FnOnce() + Send + 'static,
) -> Result<(String, JoinHandle<()>), RequestError> {
    let handle = thread::Builder::new()
        .name(name.clone())
        .spawn(work)
        .map_err(|source| RequestError::Io {
            name: name.clone(),
            source,
        })?;
    Ok((name, handle))
}

impl Service {
    /// Opens the store and starts the workers.
    ///
    /// # Panics
    ///
    /// This method will panic if the number of replicas, the number of
    /// runners, the number of tasks or the queue depth is zero.
    pub fn start(config: ServiceConfig) -> Result<Self, RequestError> {
        assert!(config.replicas > 0, "There must be at least one replica");
        assert!(config.runners > 0, "There must be at least one runner");
        assert!(config.queue_depth > 0, "The queue depth must be positive");
        let store = Arc::new(
            GraphStore::open(&config.store_dir)?
                .with_max_vertices(config.max_vertices)
                .with_gate_timeout(config.gate_timeout),
        );
        let replies = Arc::new(ReplyChannel::new());
        let mut workers = Vec::with_capacity(config.replicas * config.runners + 1);

        let (write_tx, write_rx) = bounded(config.queue_depth);
        let (s, r) = (store.clone(), replies.clone());
        workers.push(spawn_worker("write-path".to_owned(), move || {
            replica::write_path(write_rx, &s, &r)
        })?);

        let mut replica_txs = Vec::with_capacity(config.replicas);
        for index in 0..config.replicas {
            let (tx, rx) = bounded(config.queue_depth);
            replica_txs.push(tx);
            let engine = TraversalEngine::new(config.max_tasks);
            for runner in 0..config.runners {
                let (store, replies, rx) = (store.clone(), replies.clone(), rx.clone());
                let engine = engine.clone();
                let traversal_timeout = config.traversal_timeout;
                workers.push(spawn_worker(format!("replica-{index}-{runner}"), move || {
                    Replica {
                        index,
                        engine,
                        store: &store,
                        replies: &replies,
                        traversal_timeout,
                    }
                    .serve(rx)
                })?);
            }
        }

        log::info!(
            "Service started on {} with {} replicas, {} runners and {} tasks per replica",
            config.store_dir.display(),
            config.replicas,
            config.runners,
            config.max_tasks
        );
        Ok(Self {
            config,
            store,
            router: Router::new(write_tx, replica_txs),
            replies,
            workers: Mutex::new(workers),
        })
    }

    /// Returns the configuration the service was started with.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Returns the store of graph resources.
    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    /// Returns the router forwarding requests to the workers.
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Returns the channel replies are delivered through.
    pub fn replies(&self) -> &ReplyChannel {
        &self.replies
    }

    /// Submits a request, returning the receiver its reply will be delivered
    /// to.
    ///
    /// Errors in dispatching (a duplicate correlation id, a full queue, a
    /// service shutting down) are returned immediately. A shutdown request is
    /// handled synchronously: when this method returns, all workers have
    /// stopped and the reply is already available.
    pub fn submit(&self, request: Request) -> Result<ReplyReceiver, RequestError> {
        let correlation_id = request.correlation_id;
        let receiver = self.replies.register(correlation_id)?;
        if request.operation() == Operation::Shutdown {
            self.shutdown();
            self.replies
                .deliver(Reply::ok(correlation_id, ReplyBody::ShutdownComplete));
            return Ok(receiver);
        }
        if let Err(err) = self.router.dispatch(request) {
            self.replies.cancel(correlation_id);
            log::warn!("Request {correlation_id} not dispatched: {err}");
            return Err(err);
        }
        Ok(receiver)
    }

    /// Submits a request and waits at most `timeout` for its reply.
    pub fn call(&self, request: Request, timeout: Duration) -> Result<ReplyBody, RequestError> {
        let correlation_id = request.correlation_id;
        let receiver = self.submit(request)?;
        match receiver.recv_timeout(timeout) {
            Some(reply) => reply.result,
            None => {
                self.replies.cancel(correlation_id);
                Err(RequestError::ReplyTimeout {
                    correlation_id,
                    waited: timeout,
                })
            }
        }
    }

    /// Stops accepting requests, lets the workers complete the requests
    /// already queued, and joins them.
    ///
    /// Every request accepted before the shutdown gets its reply before this
    /// method returns. Concurrent calls wait for the first one to complete;
    /// further calls do nothing.
    pub fn shutdown(&self) {
        let mut workers = self.workers.lock().unwrap_or_else(PoisonError::into_inner);
        if workers.is_empty() {
            return;
        }
        log::info!("Shutting down");
        if let Err(err) = self.router.dispatch(Request::shutdown(0, 0)) {
            log::error!("Shutdown broadcast incomplete: {err}");
        }
        for (name, handle) in workers.drain(..) {
            if handle.join().is_err() {
                log::error!("Worker {name} panicked");
            }
        }
        log::info!("Shutdown complete");
    }
}

impl Drop for Service {
    fn drop(&mut self) {
        self.shutdown();
    }
}
