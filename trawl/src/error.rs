/*
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use crate::graphs::FormatError;
use std::time::Duration;
use thiserror::Error;

/// Errors that abort a single request.
///
/// None of these errors is fatal to the process: they are reported to the
/// caller through the reply envelope, and the worker that produced them keeps
/// serving other requests.
#[derive(Error, Debug)]
pub enum RequestError {
    /// The named graph resource does not exist.
    #[error("Graph {name:?} not found")]
    GraphNotFound { name: String },

    /// The start vertex is not a vertex of the graph.
    ///
    /// `vertex` is 0-based; the message numbers vertices from one, as
    /// replies do.
    #[error("Vertex {} out of range (the graph has {num_vertices} vertices)", .vertex + 1)]
    VertexOutOfRange { vertex: usize, num_vertices: usize },

    /// A bounded resource (task pool, replica queue) is full.
    #[error("Resource exhausted: {what}")]
    ResourceExhausted { what: String },

    /// The router could not reach the target of a request.
    #[error("Could not dispatch request to {target}")]
    DispatchFailed { target: String },

    /// Waiting on the readers-writer gate of a graph exceeded its bound.
    #[error("Timed out after {waited:?} waiting for the gate of graph {name:?}")]
    GateTimeout { name: String, waited: Duration },

    /// The graph name is empty, too long, or not a single path component.
    #[error("Invalid graph name {name:?}")]
    InvalidGraphName { name: String },

    /// The graph has more vertices than allowed.
    #[error("Graph has {num_vertices} vertices, but at most {max} are allowed")]
    TooManyVertices { num_vertices: usize, max: usize },

    /// The graph resource could not be parsed.
    #[error("Malformed graph {name:?}")]
    Malformed {
        name: String,
        #[source]
        source: FormatError,
    },

    /// Reading or writing a graph resource failed.
    #[error("I/O error on graph {name:?}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// The traversal was cancelled or timed out.
    #[error("The traversal was cancelled")]
    Cancelled,

    /// A traversal task panicked.
    #[error("A traversal task panicked: {message}")]
    TaskPanicked { message: String },

    /// The service is shutting down and does not accept new requests.
    #[error("The service is shutting down")]
    ShuttingDown,

    /// The operation code is unknown.
    #[error("Invalid operation code {code}")]
    InvalidOperation { code: i64 },

    /// A reply is already pending for this correlation id.
    #[error("A request with correlation id {correlation_id} is already pending")]
    DuplicateCorrelationId { correlation_id: u64 },

    /// The caller stopped waiting for the reply; the request may still
    /// complete, and the caller may retry.
    #[error("No reply to request {correlation_id} within {waited:?}")]
    ReplyTimeout { correlation_id: u64, waited: Duration },
}

impl RequestError {
    /// Returns a short numeric code identifying the error kind, suitable for
    /// the reply envelope of the client protocol.
    pub fn code(&self) -> u32 {
        match self {
            RequestError::GraphNotFound { .. } => 1,
            RequestError::VertexOutOfRange { .. } => 2,
            RequestError::ResourceExhausted { .. } => 3,
            RequestError::DispatchFailed { .. } => 4,
            RequestError::GateTimeout { .. } => 5,
            RequestError::InvalidGraphName { .. } => 6,
            RequestError::TooManyVertices { .. } => 7,
            RequestError::Malformed { .. } => 8,
            RequestError::Io { .. } => 9,
            RequestError::Cancelled => 10,
            RequestError::TaskPanicked { .. } => 11,
            RequestError::ShuttingDown => 12,
            RequestError::InvalidOperation { .. } => 13,
            RequestError::DuplicateCorrelationId { .. } => 14,
            RequestError::ReplyTimeout { .. } => 15,
        }
    }
}
