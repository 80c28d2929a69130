/*
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

#![doc = include_str!("../README.md")]
#![deny(unstable_features)]
#![deny(trivial_casts)]
#![deny(unconditional_recursion)]
#![deny(clippy::empty_loop)]
#![deny(unreachable_code)]
#![deny(unreachable_pub)]
#![deny(unreachable_patterns)]
#![deny(unused_macro_rules)]
#![deny(unused_doc_comments)]
#![allow(clippy::type_complexity)]

mod error;
pub use error::*;

pub mod graphs;
pub mod protocol;
pub mod store;
pub mod traits;

/// The default maximum number of vertices of a stored graph.
pub const MAX_VERTICES: usize = 100;

/// The maximum length in bytes of a graph name.
pub const MAX_GRAPH_NAME_LEN: usize = 100;

pub mod prelude {
    pub use crate::error::*;
    pub use crate::graphs::*;
    pub use crate::protocol::*;
    pub use crate::store::*;
    pub use crate::traits::*;
    pub use crate::{MAX_GRAPH_NAME_LEN, MAX_VERTICES};
}
