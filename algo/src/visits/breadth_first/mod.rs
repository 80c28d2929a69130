/*
 * SPDX-FileCopyrightText: 2024 Matteo Dell'Acqua
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Breadth-first visits.
//!
//! Implementations must accept a callback function with argument
//! [`EventNoPred`].

mod par_barrier;
pub use par_barrier::*;

/// Types of callback events generated during breadth-first visits
/// not keeping track of parent nodes.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum EventNoPred {
    /// This event should be used to set up state at the start of the visit.
    ///
    /// Note that this event will not happen if the visit is empty, that
    /// is, the root has already been visited.
    Init {},
    /// The node has been encountered for the first time and has been appended
    /// to the result buffer: we are traversing a new tree arc, unless the
    /// distance is zero.
    Unknown {
        /// The current node.
        node: usize,
        /// The distance of the current node from the root.
        distance: usize,
    },
    /// The node has been encountered before: we are traversing a back arc, a
    /// forward arc, or a cross arc.
    ///
    /// Note however that in parallel contexts it might happen that callback
    /// with event [`Unknown`](`EventNoPred::Unknown`) has not been called yet
    /// by the task who discovered the node.
    Known {
        /// The current node.
        node: usize,
    },
    /// The frontier at a new distance is about to be expanded.
    FrontierSize {
        /// The distance of the nodes in the frontier.
        distance: usize,
        /// The number of nodes in the frontier.
        nodes: usize,
    },
    /// The visit has been completed.
    ///
    /// Note that this event will not happen if the visit is empty (that is, if
    /// the root has already been visited) or if the visit is stopped by a
    /// callback returning an error.
    Done {},
}
