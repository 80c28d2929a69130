/*
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Traversal replicas and the write path.

use super::reply::ReplyChannel;
use crossbeam_channel::Receiver;
use std::time::Duration;
use trawl::prelude::*;
use trawl_algo::prelude::*;

/// A runner of a traversal replica.
///
/// The runners of a replica pull requests from the same bounded queue and
/// share the same engine, so at most as many traversals as there are
/// runners are in flight on a replica; further requests wait in the queue.
pub(crate) struct Replica<'a> {
    pub(crate) index: usize,
    pub(crate) engine: TraversalEngine,
    pub(crate) store: &'a GraphStore,
    pub(crate) replies: &'a ReplyChannel,
    pub(crate) traversal_timeout: Option<Duration>,
}

impl Replica<'_> {
    /// Serves requests until a shutdown request arrives or the queue is
    /// closed and empty.
    pub(crate) fn serve(&self, queue: Receiver<Request>) {
        log::info!("Replica {} runner started", self.index);
        for request in queue.iter() {
            let Some(traversal) = request.traversal() else {
                if request.operation() == Operation::Shutdown {
                    log::info!("Replica {} shutting down", self.index);
                    break;
                }
                log::error!(
                    "Replica {} received request {} with operation {:?}",
                    self.index,
                    request.correlation_id,
                    request.operation()
                );
                self.replies.deliver(Reply::err(
                    request.correlation_id,
                    RequestError::InvalidOperation {
                        code: request.operation().code(),
                    },
                ));
                continue;
            };
            self.traverse(traversal);
        }
        log::info!("Replica {} runner stopped", self.index);
    }

    fn traverse(&self, request: TraversalRequest) {
        let cancel = match self.traversal_timeout {
            Some(timeout) => CancellationToken::with_timeout(timeout),
            None => CancellationToken::new(),
        };
        let correlation_id = request.correlation_id;
        let reply = match self.engine.execute(self.store, &request, &cancel) {
            Ok(reply) => {
                log::info!(
                    "Replica {}: request {correlation_id} ({} from {} on {:?}) completed with {} vertices",
                    self.index,
                    request.mode,
                    request.start_vertex,
                    request.graph_name,
                    reply.ordered_vertices.len()
                );
                Reply::ok(correlation_id, ReplyBody::Traversal(reply))
            }
            Err(err) => {
                log::warn!("Replica {}: request {correlation_id} failed: {err}", self.index);
                Reply::err(correlation_id, err)
            }
        };
        self.replies.deliver(reply);
    }
}

/// Serves write requests, one at a time, until a shutdown request arrives or
/// the queue is closed and empty.
pub(crate) fn write_path(queue: Receiver<Request>, store: &GraphStore, replies: &ReplyChannel) {
    log::info!("Write path started");
    for request in queue.iter() {
        let correlation_id = request.correlation_id;
        let reply = match request.payload {
            Payload::Write {
                graph_name, graph, ..
            } => match store.store(&graph_name, &graph) {
                Ok(outcome) => {
                    log::info!("Request {correlation_id}: graph {graph_name:?}: {outcome}");
                    Reply::ok(correlation_id, ReplyBody::Written { graph_name, outcome })
                }
                Err(err) => {
                    log::warn!("Request {correlation_id} failed: {err}");
                    Reply::err(correlation_id, err)
                }
            },
            Payload::Shutdown => {
                log::info!("Write path shutting down");
                break;
            }
            Payload::Traverse { mode, .. } => {
                log::error!("Write path received traversal request {correlation_id}");
                Reply::err(
                    correlation_id,
                    RequestError::InvalidOperation {
                        code: Operation::from(mode).code(),
                    },
                )
            }
        };
        replies.deliver(reply);
    }
    log::info!("Write path stopped");
}
