/*
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use crate::GlobalArgs;
use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use trawl::prelude::*;

#[derive(Parser, Debug)]
#[command(about = "Adds a graph to the store, or replaces it.", long_about = None)]
pub struct CliArgs {
    #[arg(short, long)]
    /// The name of the graph.
    pub graph: String,

    #[arg(long = "from")]
    /// An adjacency matrix: the number of vertices n on the first line,
    /// followed by n rows of n zeroes and ones separated by spaces.
    pub src: PathBuf,
}

pub fn main(global_args: GlobalArgs, args: CliArgs) -> Result<()> {
    let file = File::open(&args.src)
        .with_context(|| format!("Could not open {}", args.src.display()))?;
    let graph = AdjMatrixGraph::read_from(BufReader::new(file), global_args.max_vertices)
        .with_context(|| format!("Could not parse {}", args.src.display()))?;
    log::info!(
        "Read a graph with {} vertices and {} arcs from {}",
        graph.num_nodes(),
        graph.num_arcs(),
        args.src.display()
    );

    let store = GraphStore::open(&global_args.store)?.with_max_vertices(global_args.max_vertices);
    let outcome = store.store(&args.graph, &graph)?;
    println!("{outcome}");
    Ok(())
}
