/*
 * SPDX-FileCopyrightText: 2024 Matteo Dell'Acqua
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Depth-first visits.
//!
//! Implementations must accept a callback function with argument
//! [`EventNoPred`].

mod par_fan_out;
pub use par_fan_out::*;

/// Types of callback events generated during depth-first visits
/// not keeping track of the visit path.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum EventNoPred {
    /// This event should be used to set up state at the start of the visit.
    ///
    /// Note that this event will not happen if the visit is empty, that
    /// is, the root has already been visited.
    Init {
        /// The root of the visit.
        root: usize,
    },
    /// The node has been claimed and is about to be expanded by a task of its
    /// own: we are traversing a new tree arc, unless all fields are equal to
    /// the root.
    ///
    /// This is the fan-out point of the visit: returning
    /// [`Break`](std::ops::ControlFlow::Break) prevents the task from being
    /// spawned.
    Previsit {
        /// The current node.
        node: usize,
        /// The node whose expansion claimed [`node`](`EventNoPred::Previsit::node`).
        parent: usize,
        /// The length of the visit path from the root to
        /// [`node`](`EventNoPred::Previsit::node`).
        depth: usize,
    },
    /// The node had already been claimed: we are traversing a back arc, a
    /// forward arc, or a cross arc.
    Revisit {
        /// The current node.
        node: usize,
        /// The node being expanded.
        parent: usize,
    },
    /// The expansion of the node claimed no successor, and the node has been
    /// appended to the result buffer.
    Leaf {
        /// The current node.
        node: usize,
        /// The length of the visit path from the root to
        /// [`node`](`EventNoPred::Leaf::node`).
        depth: usize,
    },
    /// The visit has been completed.
    ///
    /// Note that this event will not happen if the visit is empty (that is, if
    /// the root has already been visited) or if the visit is stopped by a
    /// callback returning an error.
    Done {
        /// The root of the visit.
        root: usize,
    },
}
