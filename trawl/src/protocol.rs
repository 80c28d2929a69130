/*
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Request and reply envelopes.
//!
//! Vertices are 0-based everywhere in this crate. The client protocol numbers
//! vertices from one: the conversion happens only through
//! [`from_one_based`] when a request enters the system and through the
//! [`Display`](std::fmt::Display) implementation of [`TraversalReply`] when a
//! reply leaves it.

use crate::graphs::AdjMatrixGraph;
use crate::RequestError;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Converts a 1-based client vertex into a 0-based vertex.
///
/// Returns `None` on zero, which is not a valid 1-based vertex.
#[inline(always)]
pub fn from_one_based(vertex: usize) -> Option<usize> {
    vertex.checked_sub(1)
}

/// Converts a 0-based vertex into its 1-based client representation.
#[inline(always)]
pub fn to_one_based(vertex: usize) -> usize {
    vertex + 1
}

/// The kind of traversal to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Parallel depth-first fan-out, reporting leaves.
    Dfs,
    /// Level-synchronous breadth-first visit, reporting all reached vertices.
    Bfs,
}

impl Display for Mode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Mode::Dfs => "dfs",
            Mode::Bfs => "bfs",
        })
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dfs" => Ok(Mode::Dfs),
            "bfs" => Ok(Mode::Bfs),
            _ => Err(format!("Unknown traversal mode {s:?} (expected dfs or bfs)")),
        }
    }
}

/// The operations of the client protocol, with their numeric codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Store a new graph (code 1).
    AddGraph,
    /// Replace an existing graph (code 2).
    ModifyGraph,
    /// Depth-first traversal (code 3).
    Dfs,
    /// Breadth-first traversal (code 4).
    Bfs,
    /// Drain in-flight requests and stop (code 5).
    Shutdown,
}

impl Operation {
    /// Returns the numeric code of the operation.
    pub fn code(self) -> i64 {
        match self {
            Operation::AddGraph => 1,
            Operation::ModifyGraph => 2,
            Operation::Dfs => 3,
            Operation::Bfs => 4,
            Operation::Shutdown => 5,
        }
    }

    /// Returns true if the operation mutates a graph resource.
    pub fn is_write(self) -> bool {
        matches!(self, Operation::AddGraph | Operation::ModifyGraph)
    }

    /// Returns the traversal mode of the operation, if it is a traversal.
    pub fn mode(self) -> Option<Mode> {
        match self {
            Operation::Dfs => Some(Mode::Dfs),
            Operation::Bfs => Some(Mode::Bfs),
            _ => None,
        }
    }
}

impl TryFrom<i64> for Operation {
    type Error = RequestError;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        Ok(match code {
            1 => Operation::AddGraph,
            2 => Operation::ModifyGraph,
            3 => Operation::Dfs,
            4 => Operation::Bfs,
            5 => Operation::Shutdown,
            _ => return Err(RequestError::InvalidOperation { code }),
        })
    }
}

impl From<Mode> for Operation {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Dfs => Operation::Dfs,
            Mode::Bfs => Operation::Bfs,
        }
    }
}

/// A request to traverse a stored graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraversalRequest {
    pub correlation_id: u64,
    pub graph_name: String,
    /// The 0-based start vertex.
    pub start_vertex: usize,
    pub mode: Mode,
}

/// The result of a successful traversal.
///
/// `ordered_vertices` holds 0-based vertices: for [`Mode::Dfs`] the leaves
/// in discovery order, for [`Mode::Bfs`] all reached vertices in level
/// order. The [`Display`] implementation renders the reply in the 1-based
/// client format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraversalReply {
    pub correlation_id: u64,
    pub mode: Mode,
    pub start_vertex: usize,
    pub ordered_vertices: Vec<usize>,
}

impl TraversalReply {
    /// Returns the reported vertices in 1-based client numbering.
    pub fn one_based(&self) -> impl Iterator<Item = usize> + '_ {
        self.ordered_vertices.iter().copied().map(to_one_based)
    }
}

impl Display for TraversalReply {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let start = to_one_based(self.start_vertex);
        match self.mode {
            Mode::Dfs => write!(f, "The list of leaf nodes while travelling from {start} is:")?,
            Mode::Bfs => write!(f, "The BFS traversal from {start} is:")?,
        }
        for vertex in self.one_based() {
            write!(f, " {vertex}")?;
        }
        Ok(())
    }
}

/// What a write actually did to the graph resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The resource did not exist and has been created.
    Added,
    /// The resource existed and has been replaced.
    Modified,
}

impl Display for WriteOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WriteOutcome::Added => "File successfully added",
            WriteOutcome::Modified => "File successfully modified",
        })
    }
}

/// The body of a [`Request`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Store `graph` under `graph_name` (operations 1 and 2).
    Write {
        operation: Operation,
        graph_name: String,
        graph: AdjMatrixGraph,
    },
    /// Traverse a stored graph (operations 3 and 4).
    Traverse {
        graph_name: String,
        start_vertex: usize,
        mode: Mode,
    },
    /// Drain and stop (operation 5).
    Shutdown,
}

/// An inbound request envelope.
///
/// The sequence number is the partitioning key used to select a traversal
/// replica; the correlation id matches the reply to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub sequence_number: u64,
    pub correlation_id: u64,
    pub payload: Payload,
}

impl Request {
    /// Creates a write request.
    ///
    /// # Panics
    ///
    /// This method will panic if `operation` is not a write operation.
    pub fn write(
        sequence_number: u64,
        correlation_id: u64,
        operation: Operation,
        graph_name: impl Into<String>,
        graph: AdjMatrixGraph,
    ) -> Self {
        assert!(operation.is_write(), "{operation:?} is not a write");
        Self {
            sequence_number,
            correlation_id,
            payload: Payload::Write {
                operation,
                graph_name: graph_name.into(),
                graph,
            },
        }
    }

    /// Creates a traversal request with a 0-based start vertex.
    pub fn traverse(
        sequence_number: u64,
        correlation_id: u64,
        graph_name: impl Into<String>,
        start_vertex: usize,
        mode: Mode,
    ) -> Self {
        Self {
            sequence_number,
            correlation_id,
            payload: Payload::Traverse {
                graph_name: graph_name.into(),
                start_vertex,
                mode,
            },
        }
    }

    /// Creates a shutdown request.
    pub fn shutdown(sequence_number: u64, correlation_id: u64) -> Self {
        Self {
            sequence_number,
            correlation_id,
            payload: Payload::Shutdown,
        }
    }

    /// Returns the operation of the request.
    pub fn operation(&self) -> Operation {
        match &self.payload {
            Payload::Write { operation, .. } => *operation,
            Payload::Traverse { mode, .. } => (*mode).into(),
            Payload::Shutdown => Operation::Shutdown,
        }
    }

    /// Returns the traversal carried by the request, if any.
    pub fn traversal(&self) -> Option<TraversalRequest> {
        match &self.payload {
            Payload::Traverse {
                graph_name,
                start_vertex,
                mode,
            } => Some(TraversalRequest {
                correlation_id: self.correlation_id,
                graph_name: graph_name.clone(),
                start_vertex: *start_vertex,
                mode: *mode,
            }),
            _ => None,
        }
    }
}

/// The body of a successful [`Reply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyBody {
    Written {
        graph_name: String,
        outcome: WriteOutcome,
    },
    Traversal(TraversalReply),
    ShutdownComplete,
}

impl Display for ReplyBody {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ReplyBody::Written { outcome, .. } => Display::fmt(outcome, f),
            ReplyBody::Traversal(reply) => Display::fmt(reply, f),
            ReplyBody::ShutdownComplete => f.write_str("Shutdown complete"),
        }
    }
}

/// An outbound reply envelope: a body, or the error that aborted the request.
#[derive(Debug)]
pub struct Reply {
    pub correlation_id: u64,
    pub result: Result<ReplyBody, RequestError>,
}

impl Reply {
    /// Creates a successful reply.
    pub fn ok(correlation_id: u64, body: ReplyBody) -> Self {
        Self {
            correlation_id,
            result: Ok(body),
        }
    }

    /// Creates an error reply.
    pub fn err(correlation_id: u64, error: RequestError) -> Self {
        Self {
            correlation_id,
            result: Err(error),
        }
    }
}
