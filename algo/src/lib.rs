/*
 * SPDX-FileCopyrightText: 2024 Matteo Dell'Acqua
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

#![doc = include_str!("../README.md")]
#![deny(unstable_features)]
#![deny(trivial_casts)]
#![deny(unconditional_recursion)]
#![deny(unreachable_code)]
#![deny(unreachable_patterns)]
#![deny(unused_doc_comments)]

mod cancel;
pub use cancel::*;

mod task_pool;
pub use task_pool::*;

pub mod engine;
pub mod visits;

pub mod prelude {
    pub use crate::engine::TraversalEngine;
    pub use crate::visits::breadth_first;
    pub use crate::visits::depth_first;
    pub use crate::visits::{Interrupted, Parallel};
    pub use crate::{CancellationToken, TaskPermit, TaskPool, TaskPoolStats};
}
