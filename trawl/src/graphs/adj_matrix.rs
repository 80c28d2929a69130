/*
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use crate::traits::RandomAccessGraph;
use crate::MAX_VERTICES;
use std::io::{Read, Write};
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur while parsing a graph resource.
#[derive(Error, Debug)]
pub enum FormatError {
    /// The resource could not be read.
    #[error("Cannot read graph resource")]
    Io(#[from] std::io::Error),

    /// The resource is empty.
    #[error("Missing number of vertices")]
    MissingVertexCount,

    /// The first token is not a nonnegative integer.
    #[error("Invalid number of vertices {token:?}")]
    InvalidVertexCount { token: String },

    /// The graph has more vertices than allowed.
    #[error("Graph has {num_vertices} vertices, but at most {max} are allowed")]
    TooManyVertices { num_vertices: usize, max: usize },

    /// A matrix entry is neither 0 nor 1.
    #[error("Invalid entry {token:?} at row {row}, column {col}")]
    InvalidEntry {
        row: usize,
        col: usize,
        token: String,
    },

    /// The matrix has fewer entries than the square of the number of
    /// vertices.
    #[error("Truncated matrix: expected {expected} entries, found {found}")]
    Truncated { expected: usize, found: usize },

    /// There are tokens after the last matrix entry.
    #[error("Unexpected data after the matrix: {token:?}")]
    TrailingData { token: String },
}

/// A directed graph stored as a dense square adjacency matrix.
///
/// This is the in-memory form of a stored graph resource. The number of
/// vertices is small (see [`MAX_VERTICES`]), so every traversal owns its own
/// copy, and successors are found by scanning a row of the matrix in
/// ascending order.
///
/// The textual format read by [`read_from`](Self::read_from) and written by
/// [`write_to`](Self::write_to) is the number of vertices followed by the
/// whitespace-separated 0/1 entries of the matrix in row-major order.
///
/// # Examples
///
/// ```
/// use trawl::graphs::AdjMatrixGraph;
/// use trawl::traits::RandomAccessGraph;
///
/// let graph: AdjMatrixGraph = "3\n0 1 0\n0 0 1\n0 0 0\n".parse()?;
/// assert_eq!(graph.num_nodes(), 3);
/// assert_eq!(graph.successors(0).collect::<Vec<_>>(), vec![1]);
/// # Ok::<(), anyhow::Error>(())
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct AdjMatrixGraph {
    /// The number of vertices.
    num_nodes: usize,
    /// The number of arcs, that is, of true entries.
    num_arcs: u64,
    /// The matrix, in row-major order.
    matrix: Vec<bool>,
}

impl AdjMatrixGraph {
    /// Creates a graph with `n` vertices and no arcs.
    pub fn empty(n: usize) -> Self {
        Self {
            num_nodes: n,
            num_arcs: 0,
            matrix: vec![false; n * n],
        }
    }

    /// Creates a graph from a list of arcs.
    ///
    /// The number of vertices is one plus the largest vertex appearing in an
    /// arc. Duplicate arcs are ignored.
    pub fn from_arcs(arcs: impl IntoIterator<Item = (usize, usize)>) -> Self {
        let arcs = arcs.into_iter().collect::<Vec<_>>();
        let n = arcs.iter().map(|&(u, v)| u.max(v) + 1).max().unwrap_or(0);
        let mut graph = Self::empty(n);
        for (u, v) in arcs {
            graph.add_arc(u, v);
        }
        graph
    }

    /// Creates a complete graph with `n` vertices and no loops.
    pub fn complete(n: usize) -> Self {
        let mut graph = Self::empty(n);
        for u in 0..n {
            for v in 0..n {
                if u != v {
                    graph.add_arc(u, v);
                }
            }
        }
        graph
    }

    /// Adds an arc, returning true if it was not present.
    ///
    /// # Panics
    ///
    /// This method will panic if one of the given vertices is greater or
    /// equal than the number of vertices.
    pub fn add_arc(&mut self, u: usize, v: usize) -> bool {
        let index = self.index(u, v);
        let added = !self.matrix[index];
        if added {
            self.matrix[index] = true;
            self.num_arcs += 1;
        }
        added
    }

    /// Removes an arc, returning true if it was present.
    ///
    /// # Panics
    ///
    /// This method will panic if one of the given vertices is greater or
    /// equal than the number of vertices.
    pub fn remove_arc(&mut self, u: usize, v: usize) -> bool {
        let index = self.index(u, v);
        let removed = self.matrix[index];
        if removed {
            self.matrix[index] = false;
            self.num_arcs -= 1;
        }
        removed
    }

    /// Returns the row of the matrix associated with a vertex.
    pub fn row(&self, u: usize) -> &[bool] {
        &self.matrix[u * self.num_nodes..(u + 1) * self.num_nodes]
    }

    #[inline(always)]
    fn index(&self, u: usize, v: usize) -> usize {
        let max = u.max(v);
        if max >= self.num_nodes {
            panic!(
                "Vertex {} does not exist (the graph has {} vertices)",
                max, self.num_nodes,
            );
        }
        u * self.num_nodes + v
    }

    /// Reads a graph in textual format, rejecting graphs with more than
    /// `max_vertices` vertices.
    pub fn read_from(mut reader: impl Read, max_vertices: usize) -> Result<Self, FormatError> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        Self::parse(&text, max_vertices)
    }

    /// Parses a graph in textual format, rejecting graphs with more than
    /// `max_vertices` vertices.
    pub fn parse(text: &str, max_vertices: usize) -> Result<Self, FormatError> {
        let mut tokens = text.split_whitespace();
        let first = tokens.next().ok_or(FormatError::MissingVertexCount)?;
        let n = first
            .parse::<usize>()
            .map_err(|_| FormatError::InvalidVertexCount {
                token: first.to_owned(),
            })?;
        if n > max_vertices {
            return Err(FormatError::TooManyVertices {
                num_vertices: n,
                max: max_vertices,
            });
        }

        let mut graph = Self::empty(n);
        let expected = n * n;
        for index in 0..expected {
            let token = tokens.next().ok_or(FormatError::Truncated {
                expected,
                found: index,
            })?;
            match token {
                "0" => {}
                "1" => {
                    graph.matrix[index] = true;
                    graph.num_arcs += 1;
                }
                _ => {
                    return Err(FormatError::InvalidEntry {
                        row: index / n,
                        col: index % n,
                        token: token.to_owned(),
                    })
                }
            }
        }

        if let Some(token) = tokens.next() {
            return Err(FormatError::TrailingData {
                token: token.to_owned(),
            });
        }

        Ok(graph)
    }

    /// Writes the graph in textual format, one row per line.
    pub fn write_to(&self, mut writer: impl Write) -> std::io::Result<()> {
        writeln!(writer, "{}", self.num_nodes)?;
        for u in 0..self.num_nodes {
            let row = self
                .row(u)
                .iter()
                .map(|&arc| if arc { "1" } else { "0" })
                .collect::<Vec<_>>();
            writeln!(writer, "{}", row.join(" "))?;
        }
        Ok(())
    }
}

impl FromStr for AdjMatrixGraph {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s, MAX_VERTICES)
    }
}

/// Iterator over the successors of a vertex of an [`AdjMatrixGraph`].
#[derive(Debug, Clone)]
pub struct Succ<'a> {
    row: std::iter::Enumerate<std::slice::Iter<'a, bool>>,
}

impl Iterator for Succ<'_> {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<usize> {
        self.row
            .by_ref()
            .find_map(|(v, &arc)| if arc { Some(v) } else { None })
    }
}

impl RandomAccessGraph for AdjMatrixGraph {
    type Successors<'succ> = Succ<'succ>;

    #[inline(always)]
    fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    #[inline(always)]
    fn num_arcs(&self) -> u64 {
        self.num_arcs
    }

    #[inline(always)]
    fn successors(&self, node: usize) -> Succ<'_> {
        Succ {
            row: self.row(node).iter().enumerate(),
        }
    }

    #[inline(always)]
    fn has_arc(&self, src: usize, dst: usize) -> bool {
        src < self.num_nodes && dst < self.num_nodes && self.matrix[self.index(src, dst)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_write() -> anyhow::Result<()> {
        let graph: AdjMatrixGraph = "4\n0 1 0 0\n0 0 0 0\n0 0 0 1\n0 0 0 0\n".parse()?;
        assert_eq!(graph.num_nodes(), 4);
        assert_eq!(graph.num_arcs(), 2);
        assert!(graph.has_arc(0, 1));
        assert!(graph.has_arc(2, 3));
        assert!(!graph.has_arc(1, 0));

        let mut buffer = vec![];
        graph.write_to(&mut buffer)?;
        assert_eq!(String::from_utf8(buffer)?, "4\n0 1 0 0\n0 0 0 0\n0 0 0 1\n0 0 0 0\n");
        Ok(())
    }

    #[test]
    fn test_successors_in_adjacency_order() {
        let graph = AdjMatrixGraph::from_arcs([(0, 3), (0, 1), (0, 2), (2, 0)]);
        assert_eq!(graph.successors(0).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(graph.successors(1).count(), 0);
        assert_eq!(graph.outdegree(0), 3);
    }

    #[test]
    fn test_add_remove() {
        let mut graph = AdjMatrixGraph::empty(3);
        assert!(graph.add_arc(0, 2));
        assert!(!graph.add_arc(0, 2));
        assert_eq!(graph.num_arcs(), 1);
        assert!(graph.remove_arc(0, 2));
        assert!(!graph.remove_arc(0, 2));
        assert_eq!(graph.num_arcs(), 0);
    }

    #[test]
    fn test_complete() {
        let graph = AdjMatrixGraph::complete(5);
        assert_eq!(graph.num_arcs(), 20);
        assert!(!graph.has_arc(3, 3));
    }

    #[test]
    fn test_malformed() {
        assert!(matches!(
            "".parse::<AdjMatrixGraph>(),
            Err(FormatError::MissingVertexCount)
        ));
        assert!(matches!(
            "x".parse::<AdjMatrixGraph>(),
            Err(FormatError::InvalidVertexCount { .. })
        ));
        assert!(matches!(
            "2 0 1 1".parse::<AdjMatrixGraph>(),
            Err(FormatError::Truncated {
                expected: 4,
                found: 3
            })
        ));
        assert!(matches!(
            "2 0 1 2 0".parse::<AdjMatrixGraph>(),
            Err(FormatError::InvalidEntry { row: 1, col: 0, .. })
        ));
        assert!(matches!(
            "1 0 0".parse::<AdjMatrixGraph>(),
            Err(FormatError::TrailingData { .. })
        ));
        assert!(matches!(
            AdjMatrixGraph::parse("3 0 0 0 0 0 0 0 0 0", 2),
            Err(FormatError::TooManyVertices {
                num_vertices: 3,
                max: 2
            })
        ));
    }

    #[test]
    #[should_panic]
    fn test_add_arc_out_of_range() {
        AdjMatrixGraph::empty(2).add_arc(0, 2);
    }
}
