/*
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Directory-backed storage of named graph resources.
//!
//! Every graph name has a [`RwGate`]: loads hold its read side while the
//! resource is read and parsed, writes and removals hold its write side.
//! Loaded graphs are owned copies, so no traversal state is shared between
//! requests.

mod gate;
pub use gate::*;

use crate::graphs::{AdjMatrixGraph, FormatError};
use crate::protocol::WriteOutcome;
use crate::traits::RandomAccessGraph;
use crate::{RequestError, MAX_GRAPH_NAME_LEN, MAX_VERTICES};
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;

/// A directory of graph resources, one file per graph name.
#[derive(Debug)]
pub struct GraphStore {
    dir: PathBuf,
    gates: GateRegistry,
    max_vertices: usize,
    gate_timeout: Option<Duration>,
}

impl GraphStore {
    /// Creates a store over an existing directory, with at most
    /// [`MAX_VERTICES`] vertices per graph and unbounded gate waits.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_owned(),
            gates: GateRegistry::new(),
            max_vertices: MAX_VERTICES,
            gate_timeout: None,
        }
    }

    /// Creates a store, creating its directory if necessary.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, RequestError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir).map_err(|source| RequestError::Io {
            name: dir.display().to_string(),
            source,
        })?;
        Ok(Self::new(dir))
    }

    /// Sets the maximum number of vertices of graphs read or written.
    pub fn with_max_vertices(mut self, max_vertices: usize) -> Self {
        self.max_vertices = max_vertices;
        self
    }

    /// Bounds the time spent waiting on a gate; `None` waits forever.
    pub fn with_gate_timeout(mut self, gate_timeout: Option<Duration>) -> Self {
        self.gate_timeout = gate_timeout;
        self
    }

    /// Returns the directory holding the graph resources.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the maximum number of vertices of graphs read or written.
    pub fn max_vertices(&self) -> usize {
        self.max_vertices
    }

    /// Returns the registry of the per-graph gates.
    pub fn gates(&self) -> &GateRegistry {
        &self.gates
    }

    /// Checks that `name` is non-empty, at most [`MAX_GRAPH_NAME_LEN`] bytes
    /// long, and a plain file name that cannot escape the store directory or
    /// clash with temporary files.
    pub fn validate_name(name: &str) -> Result<(), RequestError> {
        let valid = !name.is_empty()
            && name.len() <= MAX_GRAPH_NAME_LEN
            && !name.starts_with('.')
            && !name.contains(['/', '\\', '\0'])
            && !name.chars().any(char::is_control);
        if valid {
            Ok(())
        } else {
            Err(RequestError::InvalidGraphName {
                name: name.to_owned(),
            })
        }
    }

    /// Returns the path of the resource of a graph.
    pub fn path(&self, name: &str) -> Result<PathBuf, RequestError> {
        Self::validate_name(name)?;
        Ok(self.dir.join(name))
    }

    /// Returns true if a resource with the given name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.path(name).map(|path| path.is_file()).unwrap_or(false)
    }

    /// Acquires the read side of the gate of an existing graph.
    ///
    /// Fails with [`RequestError::GraphNotFound`] without waiting if the
    /// resource does not exist, and with [`RequestError::GateTimeout`] if a
    /// writer holds the gate longer than the configured bound.
    pub fn read_gate(&self, name: &str) -> Result<ReadGuard, RequestError> {
        if !self.path(name)?.is_file() {
            return Err(RequestError::GraphNotFound {
                name: name.to_owned(),
            });
        }
        self.gates
            .gate(name)
            .read(self.gate_timeout)
            .ok_or_else(|| self.timed_out(name))
    }

    /// Acquires the write side of the gate of a graph, which need not exist.
    pub fn write_gate(&self, name: &str) -> Result<WriteGuard, RequestError> {
        Self::validate_name(name)?;
        self.gates
            .gate(name)
            .write(self.gate_timeout)
            .ok_or_else(|| self.timed_out(name))
    }

    fn timed_out(&self, name: &str) -> RequestError {
        let waited = self.gate_timeout.unwrap_or_default();
        log::warn!("Gate of graph {name:?} not acquired within {waited:?}");
        RequestError::GateTimeout {
            name: name.to_owned(),
            waited,
        }
    }

    /// Loads a graph, holding its read gate while the resource is read.
    ///
    /// A resource deleted after the existence check yields
    /// [`RequestError::GraphNotFound`], never a partial graph.
    pub fn load(&self, name: &str) -> Result<AdjMatrixGraph, RequestError> {
        let _guard = self.read_gate(name)?;
        let path = self.path(name)?;
        let file = File::open(&path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => RequestError::GraphNotFound {
                name: name.to_owned(),
            },
            _ => RequestError::Io {
                name: name.to_owned(),
                source,
            },
        })?;

        let graph = AdjMatrixGraph::read_from(BufReader::new(file), self.max_vertices).map_err(
            |err| match err {
                FormatError::Io(source) => RequestError::Io {
                    name: name.to_owned(),
                    source,
                },
                FormatError::TooManyVertices { num_vertices, max } => {
                    RequestError::TooManyVertices { num_vertices, max }
                }
                source => RequestError::Malformed {
                    name: name.to_owned(),
                    source,
                },
            },
        )?;
        log::debug!(
            "Loaded graph {name:?} ({} vertices, {} arcs)",
            graph.num_nodes(),
            graph.num_arcs()
        );
        Ok(graph)
    }

    /// Stores a graph, holding its write gate; the last writer wins.
    ///
    /// The resource is written to a temporary file in the store directory
    /// and then renamed, so readers never see a partially written graph.
    pub fn store(&self, name: &str, graph: &AdjMatrixGraph) -> Result<WriteOutcome, RequestError> {
        if graph.num_nodes() > self.max_vertices {
            return Err(RequestError::TooManyVertices {
                num_vertices: graph.num_nodes(),
                max: self.max_vertices,
            });
        }
        let _guard = self.write_gate(name)?;
        let path = self.path(name)?;
        let outcome = if path.is_file() {
            WriteOutcome::Modified
        } else {
            WriteOutcome::Added
        };

        let io_error = |source: std::io::Error| RequestError::Io {
            name: name.to_owned(),
            source,
        };
        let mut file = NamedTempFile::new_in(&self.dir).map_err(io_error)?;
        {
            let mut writer = BufWriter::new(file.as_file_mut());
            graph.write_to(&mut writer).map_err(io_error)?;
            writer.flush().map_err(io_error)?;
        }
        file.as_file().sync_all().map_err(io_error)?;
        file.persist(&path).map_err(|err| io_error(err.error))?;

        log::debug!("Stored graph {name:?}: {outcome:?}");
        Ok(outcome)
    }

    /// Removes a graph resource, holding its write gate.
    pub fn remove(&self, name: &str) -> Result<(), RequestError> {
        let _guard = self.write_gate(name)?;
        let path = self.path(name)?;
        std::fs::remove_file(&path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => RequestError::GraphNotFound {
                name: name.to_owned(),
            },
            _ => RequestError::Io {
                name: name.to_owned(),
                source,
            },
        })?;
        log::debug!("Removed graph {name:?}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert!(GraphStore::validate_name("graph1").is_ok());
        assert!(GraphStore::validate_name("g.txt").is_ok());
        for name in ["", ".", "..", ".hidden", "a/b", "a\\b", "a\0b", "a\nb"] {
            assert!(
                matches!(
                    GraphStore::validate_name(name),
                    Err(RequestError::InvalidGraphName { .. })
                ),
                "{name:?}"
            );
        }
        assert!(GraphStore::validate_name(&"x".repeat(MAX_GRAPH_NAME_LEN)).is_ok());
        assert!(GraphStore::validate_name(&"x".repeat(MAX_GRAPH_NAME_LEN + 1)).is_err());
    }
}
