/*
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Tommaso Fontana
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

use anyhow::{anyhow, bail, ensure, Result};
use clap::{Args, Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};
use trawl::MAX_VERTICES;

pub mod service;
pub use service::ServiceConfig;

pub mod generate;
pub mod run;
pub mod traverse;
pub mod write;

/// Parses a duration.
///
/// The suffixes "s", "m", "h", and "d" denote seconds, minutes, hours, and
/// days; trailing digits without a suffix are milliseconds.
pub fn parse_duration(value: &str) -> Result<Duration> {
    if value.is_empty() {
        bail!("Empty duration string, if you want no wait use `0`.");
    }
    let mut duration = Duration::from_secs(0);
    let mut acc = String::new();
    for c in value.chars() {
        if c.is_ascii_digit() {
            acc.push(c);
        } else if c.is_whitespace() {
            continue;
        } else {
            ensure!(!acc.is_empty(), "Missing value before suffix {c:?}");
            let dur = acc.parse::<u64>()?;
            match c {
                's' => duration += Duration::from_secs(dur),
                'm' => duration += Duration::from_secs(dur * 60),
                'h' => duration += Duration::from_secs(dur * 60 * 60),
                'd' => duration += Duration::from_secs(dur * 60 * 60 * 24),
                _ => return Err(anyhow!("Invalid duration suffix: {}", c)),
            }
            acc.clear();
        }
    }
    if !acc.is_empty() {
        let dur = acc.parse::<u64>()?;
        duration += Duration::from_millis(dur);
    }
    Ok(duration)
}

/// Parses a strictly positive integer, for use in
/// `#[arg(value_parser = positive_parser)]`.
pub fn positive_parser(arg: &str) -> Result<usize> {
    let value = arg.parse::<usize>()?;
    ensure!(value > 0, "The value must be greater than 0");
    Ok(value)
}

/// Initializes the `env_logger` logger with a custom format including
/// timestamps with elapsed time since initialization.
pub fn init_env_logger() -> Result<()> {
    use jiff::fmt::friendly::{Designator, Spacing, SpanPrinter};
    use jiff::SpanRound;

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));

    let start = std::time::Instant::now();
    let printer = SpanPrinter::new()
        .spacing(Spacing::None)
        .designator(Designator::Compact);
    let span_round = SpanRound::new()
        .largest(jiff::Unit::Day)
        .smallest(jiff::Unit::Millisecond)
        .days_are_24_hours();

    builder.format(move |buf, record| {
        let Ok(ts) = jiff::Timestamp::try_from(SystemTime::now()) else {
            return Err(std::io::Error::other("Failed to get timestamp"));
        };
        let style = buf.default_level_style(record.level());
        let elapsed = start.elapsed();
        let span = jiff::Span::new()
            .seconds(elapsed.as_secs() as i64)
            .milliseconds(elapsed.subsec_millis() as i64);
        let span = span.round(span_round).map_err(std::io::Error::other)?;
        writeln!(
            buf,
            "{} {} {style}{}{style:#} [{}] {} - {}",
            ts.strftime("%F %T%.3f"),
            printer.span_to_string(&span),
            record.level(),
            std::thread::current().name().unwrap_or("main"),
            record.target(),
            record.args()
        )
    });
    builder.try_init()?;
    Ok(())
}

#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    #[arg(short, long, global = true, default_value = ".", display_order = 1000)]
    /// The directory of graph resources.
    pub store: PathBuf,

    #[arg(long, global = true, default_value_t = MAX_VERTICES, value_parser = positive_parser, display_order = 1001)]
    /// The maximum number of vertices of a graph.
    pub max_vertices: usize,
}

/// Shared CLI arguments for commands that run the service.
#[derive(Args, Debug, Clone)]
pub struct ServiceArgs {
    #[arg(short, long, default_value_t = 2, value_parser = positive_parser)]
    /// The number of traversal replicas.
    pub replicas: usize,

    #[arg(long, default_value_t = 4, value_parser = positive_parser)]
    /// The number of traversals each replica runs at the same time; further
    /// traversals wait in the queue of the replica.
    pub runners: usize,

    #[arg(short = 'j', long, default_value_t = 200, value_parser = positive_parser)]
    /// The maximum number of concurrent visit tasks of each replica.
    pub max_tasks: usize,

    #[arg(long, default_value_t = 64, value_parser = positive_parser)]
    /// The capacity of the queue of each worker; requests finding a full
    /// queue are rejected.
    pub queue_depth: usize,

    #[arg(long, value_parser = parse_duration, default_value = "10s")]
    /// How long to wait for access to a graph. You can use the suffixes "s"
    /// for seconds, "m" for minutes, "h" for hours, and "d" for days. If no
    /// suffix is provided it is assumed to be in milliseconds.
    /// Example: "1m30s" is parsed as 90 seconds.
    pub gate_timeout: Duration,

    #[arg(long, value_parser = parse_duration)]
    /// The maximum duration of a traversal, with the same syntax of
    /// --gate-timeout. If not specified, traversals are never interrupted.
    pub traversal_timeout: Option<Duration>,
}

impl ServiceArgs {
    /// Builds the configuration of a service.
    pub fn into_config(self, global_args: &GlobalArgs) -> ServiceConfig {
        ServiceConfig {
            store_dir: global_args.store.clone(),
            replicas: self.replicas,
            runners: self.runners,
            max_tasks: self.max_tasks,
            max_vertices: global_args.max_vertices,
            queue_depth: self.queue_depth,
            gate_timeout: Some(self.gate_timeout),
            traversal_timeout: self.traversal_timeout,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum SubCommands {
    Traverse(traverse::CliArgs),
    Write(write::CliArgs),
    Gen(generate::CliArgs),
    Run(run::CliArgs),
}

#[derive(Parser, Debug)]
#[command(name = "trawl", version)]
/// Concurrent depth-first and breadth-first traversals over a store of named
/// directed graphs.
///
/// Vertices are numbered from one on the command line and in replies.
/// Logging is controlled by the RUST_LOG environment variable.
pub struct Cli {
    #[command(subcommand)]
    pub command: SubCommands,
    #[clap(flatten)]
    pub args: GlobalArgs,
}

/// The entry point of the command-line interface.
pub fn cli_main<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let start = std::time::Instant::now();
    let cli = Cli::parse_from(args);
    match cli.command {
        SubCommands::Traverse(args) => traverse::main(cli.args, args)?,
        SubCommands::Write(args) => write::main(cli.args, args)?,
        SubCommands::Gen(args) => generate::main(cli.args, args)?,
        SubCommands::Run(args) => run::main(cli.args, args)?,
    }

    log::info!(
        "The command took {}",
        pretty_print_elapsed(start.elapsed().as_secs_f64())
    );

    Ok(())
}

/// Pretty prints seconds in a humanly readable format.
fn pretty_print_elapsed(elapsed: f64) -> String {
    let mut result = String::new();
    let mut elapsed_seconds = elapsed as u64;
    let days = elapsed_seconds / (60 * 60 * 24);
    elapsed_seconds %= 60 * 60 * 24;
    let hours = elapsed_seconds / (60 * 60);
    elapsed_seconds %= 60 * 60;
    let minutes = elapsed_seconds / 60;

    for (value, unit) in [(days, "day"), (hours, "hour"), (minutes, "minute")] {
        match value {
            0 => {}
            1 => result.push_str(&format!("1 {unit} ")),
            _ => result.push_str(&format!("{value} {unit}s ")),
        }
    }

    result.push_str(&format!("{:.3} seconds ({}s)", elapsed % 60.0, elapsed));
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() -> Result<()> {
        assert_eq!(parse_duration("0")?, Duration::ZERO);
        assert_eq!(parse_duration("250")?, Duration::from_millis(250));
        assert_eq!(parse_duration("1m30s")?, Duration::from_secs(90));
        assert_eq!(
            parse_duration("1d2h3m4s567")?,
            Duration::from_millis(93_784_567)
        );
        assert_eq!(parse_duration("2 s")?, Duration::from_secs(2));
        assert!(parse_duration("").is_err());
        assert!(parse_duration("3x").is_err());
        assert!(parse_duration("s").is_err());
        Ok(())
    }

    #[test]
    fn test_positive_parser() {
        assert_eq!(positive_parser("3").unwrap(), 3);
        assert!(positive_parser("0").is_err());
        assert!(positive_parser("-1").is_err());
        assert!(positive_parser("many").is_err());
    }

    #[test]
    fn test_pretty_print_elapsed() {
        assert_eq!(pretty_print_elapsed(1.5), "1.500 seconds (1.5s)");
        assert_eq!(
            pretty_print_elapsed(3723.0),
            "1 hour 2 minutes 3.000 seconds (3723s)"
        );
    }

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from([
            "trawl", "--store", "graphs", "traverse", "--graph", "g", "--start", "2", "--mode",
            "bfs",
        ]);
        assert_eq!(cli.args.store, PathBuf::from("graphs"));
        assert_eq!(cli.args.max_vertices, MAX_VERTICES);
        let SubCommands::Traverse(args) = cli.command else {
            panic!("Expected a traversal");
        };
        assert_eq!(args.start, 2);
        assert_eq!(args.mode, trawl::protocol::Mode::Bfs);
        assert_eq!(args.service.replicas, 2);
        assert_eq!(args.service.runners, 4);
        assert_eq!(args.service.gate_timeout, Duration::from_secs(10));
    }
}
