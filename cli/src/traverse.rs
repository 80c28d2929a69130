/*
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use crate::service::Service;
use crate::{parse_duration, GlobalArgs, ServiceArgs};
use anyhow::{Context, Result};
use clap::Parser;
use std::time::Duration;
use trawl::prelude::*;

#[derive(Parser, Debug)]
#[command(about = "Traverses a stored graph from a vertex and prints the result.", long_about = None)]
pub struct CliArgs {
    #[arg(short, long)]
    /// The name of the graph.
    pub graph: String,

    #[arg(long)]
    /// The start vertex, numbered from one.
    pub start: usize,

    #[arg(short, long, default_value_t = Mode::Dfs)]
    /// The kind of traversal: "dfs" prints the leaves of the depth-first
    /// tree, "bfs" the breadth-first order.
    pub mode: Mode,

    #[arg(long, value_parser = parse_duration, default_value = "60s")]
    /// How long to wait for the reply.
    pub reply_timeout: Duration,

    #[clap(flatten)]
    pub service: ServiceArgs,
}

pub fn main(global_args: GlobalArgs, args: CliArgs) -> Result<()> {
    let start_vertex = from_one_based(args.start)
        .with_context(|| format!("Vertices are numbered from one, found {}", args.start))?;
    let service = Service::start(args.service.into_config(&global_args))?;
    let body = service.call(
        Request::traverse(0, 1, args.graph, start_vertex, args.mode),
        args.reply_timeout,
    )?;
    println!("{body}");
    service.shutdown();
    Ok(())
}
