/*
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Random graphs.

use super::AdjMatrixGraph;
use rand::{rngs::SmallRng, Rng, SeedableRng};

/// Provides Erdös-Rényi random graphs.
///
/// The Erdös-Rényi random graph model is a simple model for generating random
/// graphs. It is parameterized by the number of nodes `n` and the probability
/// `p` of an arc between any two nodes. In this implementation, loops are never
/// included.
///
/// Graphs are generated row by row, so the same parameters and seed always
/// yield the same graph.
#[derive(Debug, Clone)]
pub struct ErdosRenyi {
    n: usize,
    p: f64,
    seed: u64,
}

impl ErdosRenyi {
    /// Creates a new Erdös-Rényi random graph, given the number of
    /// nodes, the probability of an edge between any two nodes, and a
    /// seed for the [pseudorandom number generator](SmallRng).
    pub fn new(n: usize, p: f64, seed: u64) -> Self {
        assert!((0.0..=1.0).contains(&p), "p must be in [0..1]");
        Self { n, p, seed }
    }

    /// Generates the graph.
    pub fn generate(&self) -> AdjMatrixGraph {
        let mut rng = SmallRng::seed_from_u64(self.seed);
        let mut graph = AdjMatrixGraph::empty(self.n);
        for u in 0..self.n {
            for v in 0..self.n {
                if u != v && rng.random_bool(self.p) {
                    graph.add_arc(u, v);
                }
            }
        }
        graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::RandomAccessGraph;

    #[test]
    fn test_er() {
        let g0 = ErdosRenyi::new(10, 0.3, 0).generate();
        let g1 = ErdosRenyi::new(10, 0.3, 0).generate();
        assert_eq!(g0, g1);
        for u in 0..10 {
            assert!(!g0.has_arc(u, u));
        }
    }

    #[test]
    fn test_er_extremes() {
        assert_eq!(ErdosRenyi::new(6, 0.0, 1).generate().num_arcs(), 0);
        assert_eq!(
            ErdosRenyi::new(6, 1.0, 1).generate(),
            AdjMatrixGraph::complete(6)
        );
    }
}
