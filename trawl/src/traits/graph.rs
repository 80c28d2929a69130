/*
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

/// A graph providing random access to successor lists.
///
/// Nodes are identified by the integers in `0..num_nodes()`. Successors must
/// be returned in ascending order, which is the adjacency order the visits
/// scan them in.
pub trait RandomAccessGraph {
    /// The type of the iterator over the successors of a node.
    type Successors<'succ>: IntoIterator<Item = usize>
    where
        Self: 'succ;

    /// Returns the number of nodes in the graph.
    fn num_nodes(&self) -> usize;

    /// Returns the number of arcs in the graph.
    fn num_arcs(&self) -> u64;

    /// Returns the successors of a node, in ascending order.
    fn successors(&self, node: usize) -> Self::Successors<'_>;

    /// Returns the number of successors of a node.
    fn outdegree(&self, node: usize) -> usize {
        self.successors(node).into_iter().count()
    }

    /// Returns whether there is an arc from `src` to `dst`.
    fn has_arc(&self, src: usize, dst: usize) -> bool {
        self.successors(src).into_iter().any(|succ| succ == dst)
    }
}
