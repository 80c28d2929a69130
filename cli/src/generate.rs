/*
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use crate::GlobalArgs;
use anyhow::{ensure, Result};
use clap::Parser;
use trawl::graphs::random::ErdosRenyi;
use trawl::prelude::*;

#[derive(Parser, Debug)]
#[command(about = "Writes an Erdös-Rényi random graph to the store.", long_about = None)]
pub struct CliArgs {
    #[arg(short, long)]
    /// The name of the graph.
    pub graph: String,

    #[arg(short)]
    /// The number of vertices.
    pub n: usize,

    #[arg(short, default_value_t = 0.1)]
    /// The probability of each arc.
    pub p: f64,

    #[arg(long, default_value_t = 0)]
    /// The seed of the pseudorandom number generator.
    pub seed: u64,
}

pub fn main(global_args: GlobalArgs, args: CliArgs) -> Result<()> {
    ensure!(
        (0.0..=1.0).contains(&args.p),
        "The arc probability must be in [0..1], found {}",
        args.p
    );
    ensure!(
        args.n <= global_args.max_vertices,
        "At most {} vertices are allowed, found {}",
        global_args.max_vertices,
        args.n
    );
    let graph = ErdosRenyi::new(args.n, args.p, args.seed).generate();
    log::info!(
        "Generated a graph with {} vertices and {} arcs",
        graph.num_nodes(),
        graph.num_arcs()
    );
    let store = GraphStore::open(&global_args.store)?.with_max_vertices(global_args.max_vertices);
    let outcome = store.store(&args.graph, &graph)?;
    println!("{outcome}");
    Ok(())
}
