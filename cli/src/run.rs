/*
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use crate::service::{ReplyChannel, ReplyReceiver, Service};
use crate::{parse_duration, GlobalArgs, ServiceArgs};
use anyhow::{bail, ensure, Context, Result};
use clap::Parser;
use crossbeam_channel::{unbounded, Receiver, Select};
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;
use trawl::prelude::*;

#[derive(Parser, Debug)]
#[command(about = "Runs the traversal service on a script of requests.")]
/// Each line of the script is a request of the form `OP SEQ NAME [ARG]`,
/// where OP is 1 (add a graph), 2 (modify a graph), 3 (depth-first
/// traversal), 4 (breadth-first traversal) or 5 (shutdown), and SEQ is the
/// sequence number selecting the replica of traversals. For writes, ARG is a
/// file containing an adjacency matrix; for traversals, it is the start
/// vertex, numbered from one. A shutdown has no NAME. Empty lines and lines
/// starting with '#' are ignored.
///
/// Requests are submitted without waiting for previous replies, and replies
/// are printed as they complete, prefixed by the line number of their
/// request.
pub struct CliArgs {
    /// The script; if not specified, requests are read from standard input.
    pub script: Option<PathBuf>,

    #[arg(long, value_parser = parse_duration, default_value = "60s")]
    /// How long to wait for a reply when no other reply arrives.
    pub reply_timeout: Duration,

    #[clap(flatten)]
    pub service: ServiceArgs,
}

pub fn main(global_args: GlobalArgs, args: CliArgs) -> Result<()> {
    let max_vertices = global_args.max_vertices;
    let service = Service::start(args.service.into_config(&global_args))?;
    let mut stdout = std::io::stdout();
    match args.script {
        Some(path) => {
            let file = File::open(&path)
                .with_context(|| format!("Could not open script {}", path.display()))?;
            execute(
                &service,
                BufReader::new(file),
                max_vertices,
                args.reply_timeout,
                &mut stdout,
            )?
        }
        None => execute(
            &service,
            std::io::stdin().lock(),
            max_vertices,
            args.reply_timeout,
            &mut stdout,
        )?,
    }
    service.shutdown();
    Ok(())
}

/// Parses a script line into a request whose correlation id is
/// `line_number`.
///
/// Returns `None` for empty lines and comments.
pub fn parse_line(line_number: u64, line: &str, max_vertices: usize) -> Result<Option<Request>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let tokens = line.split_whitespace().collect::<Vec<_>>();
    ensure!(tokens.len() >= 2, "Missing sequence number in {line:?}");
    let code = tokens[0]
        .parse::<i64>()
        .with_context(|| format!("Invalid operation {:?}", tokens[0]))?;
    let operation = Operation::try_from(code)?;
    let sequence_number = tokens[1]
        .parse::<u64>()
        .with_context(|| format!("Invalid sequence number {:?}", tokens[1]))?;

    if operation == Operation::Shutdown {
        ensure!(tokens.len() == 2, "Unexpected arguments to shutdown in {line:?}");
        return Ok(Some(Request::shutdown(sequence_number, line_number)));
    }

    let &[_, _, name, arg] = &tokens[..] else {
        bail!("Expected OP SEQ NAME ARG, found {line:?}");
    };
    Ok(Some(match operation.mode() {
        Some(mode) => {
            let start = arg
                .parse::<usize>()
                .with_context(|| format!("Invalid start vertex {arg:?}"))?;
            let start = from_one_based(start)
                .with_context(|| format!("Vertices are numbered from one, found {start}"))?;
            Request::traverse(sequence_number, line_number, name, start, mode)
        }
        None => {
            let file = File::open(arg).with_context(|| format!("Could not open {arg}"))?;
            let graph = AdjMatrixGraph::read_from(BufReader::new(file), max_vertices)
                .with_context(|| format!("Could not parse {arg}"))?;
            Request::write(sequence_number, line_number, operation, name, graph)
        }
    }))
}

/// The fate of a script line.
#[derive(Debug)]
enum Submission {
    Pending(ReplyReceiver),
    Rejected { line_number: u64, error: String },
}

/// Submits the requests of a script to a service, writing replies to `out`
/// as they complete.
///
/// Returns when every submitted request has a reply, or when no reply has
/// arrived for `reply_timeout`, in which case the pending requests are
/// reported as timed out and their correlation ids are released.
pub fn execute(
    service: &Service,
    input: impl BufRead,
    max_vertices: usize,
    reply_timeout: Duration,
    out: &mut (impl Write + Send),
) -> Result<()> {
    thread::scope(|scope| {
        let (tx, rx) = unbounded();
        let replies = service.replies();
        let printer = scope.spawn(move || print_replies(rx, replies, reply_timeout, out));

        for (index, line) in input.lines().enumerate() {
            let line = line?;
            let line_number = index as u64 + 1;
            let submission = match parse_line(line_number, &line, max_vertices) {
                Ok(None) => continue,
                Ok(Some(request)) => match service.submit(request) {
                    Ok(receiver) => Submission::Pending(receiver),
                    Err(err) => Submission::Rejected {
                        line_number,
                        error: err.to_string(),
                    },
                },
                Err(err) => Submission::Rejected {
                    line_number,
                    error: format!("{err:#}"),
                },
            };
            if tx.send(submission).is_err() {
                break;
            }
        }
        drop(tx);

        match printer.join() {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    })
}

enum Event {
    Submission(Option<Submission>),
    Reply(usize, Option<Reply>),
    Timeout,
}

fn print_replies(
    submissions: Receiver<Submission>,
    replies: &ReplyChannel,
    reply_timeout: Duration,
    out: &mut impl Write,
) -> Result<()> {
    let mut pending = Vec::<ReplyReceiver>::new();
    let mut open = true;
    while open || !pending.is_empty() {
        let event = {
            let mut select = Select::new();
            let offset = usize::from(open);
            if open {
                select.recv(&submissions);
            }
            for receiver in &pending {
                select.recv(receiver.as_receiver());
            }
            let operation = if pending.is_empty() {
                Some(select.select())
            } else {
                select.select_timeout(reply_timeout).ok()
            };
            match operation {
                None => Event::Timeout,
                Some(operation) if open && operation.index() == 0 => {
                    Event::Submission(operation.recv(&submissions).ok())
                }
                Some(operation) => {
                    let position = operation.index() - offset;
                    Event::Reply(
                        position,
                        operation.recv(pending[position].as_receiver()).ok(),
                    )
                }
            }
        };

        match event {
            Event::Submission(Some(Submission::Pending(receiver))) => pending.push(receiver),
            Event::Submission(Some(Submission::Rejected { line_number, error })) => {
                writeln!(out, "{line_number}: {error}")?
            }
            Event::Submission(None) => open = false,
            Event::Reply(position, reply) => {
                let correlation_id = pending.swap_remove(position).correlation_id();
                match reply.map(|reply| reply.result) {
                    Some(Ok(body)) => writeln!(out, "{correlation_id}: {body}")?,
                    Some(Err(err)) => writeln!(out, "{correlation_id}: {err}")?,
                    None => writeln!(out, "{correlation_id}: no reply")?,
                }
            }
            Event::Timeout => {
                for receiver in pending.drain(..) {
                    let correlation_id = receiver.correlation_id();
                    replies.cancel(correlation_id);
                    let error = RequestError::ReplyTimeout {
                        correlation_id,
                        waited: reply_timeout,
                    };
                    writeln!(out, "{correlation_id}: {error}")?;
                }
            }
        }
        out.flush()?;
    }
    Ok(())
}
