/*
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use anyhow::Result;
use std::thread;
use std::time::Duration;
use trawl::prelude::*;
use trawl_cli::service::ReplyChannel;

#[test]
fn test_register_and_deliver() -> Result<()> {
    let replies = ReplyChannel::new();
    let first = replies.register(1)?;
    let second = replies.register(2)?;
    assert_eq!(replies.pending(), 2);

    assert!(replies.deliver(Reply::ok(2, ReplyBody::ShutdownComplete)));
    assert!(first.try_recv().is_none());
    let reply = second.recv().unwrap();
    assert_eq!(reply.correlation_id, 2);
    assert_eq!(reply.result?, ReplyBody::ShutdownComplete);

    assert!(replies.deliver(Reply::err(1, RequestError::Cancelled)));
    assert!(matches!(
        first.recv().unwrap().result,
        Err(RequestError::Cancelled)
    ));
    assert_eq!(replies.pending(), 0);
    Ok(())
}

#[test]
fn test_duplicate_correlation_id() -> Result<()> {
    let replies = ReplyChannel::new();
    let _receiver = replies.register(5)?;
    assert!(matches!(
        replies.register(5),
        Err(RequestError::DuplicateCorrelationId { correlation_id: 5 })
    ));
    // Once delivered, the id can be reused.
    replies.deliver(Reply::ok(5, ReplyBody::ShutdownComplete));
    replies.register(5)?;
    Ok(())
}

#[test]
fn test_undeliverable_replies() -> Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();
    let replies = ReplyChannel::new();
    assert!(!replies.deliver(Reply::ok(3, ReplyBody::ShutdownComplete)));

    let receiver = replies.register(4)?;
    replies.cancel(4);
    assert!(!replies.deliver(Reply::ok(4, ReplyBody::ShutdownComplete)));
    assert!(receiver.recv().is_none());

    let receiver = replies.register(6)?;
    drop(receiver);
    assert!(!replies.deliver(Reply::ok(6, ReplyBody::ShutdownComplete)));
    assert_eq!(replies.pending(), 0);
    Ok(())
}

#[test]
fn test_deliver_from_other_threads() -> Result<()> {
    let replies = ReplyChannel::new();
    let receivers = (0..16)
        .map(|id| replies.register(id))
        .collect::<Result<Vec<_>, _>>()?;
    thread::scope(|s| {
        for id in (0..16).rev() {
            let replies = &replies;
            s.spawn(move || replies.deliver(Reply::err(id, RequestError::ShuttingDown)));
        }
    });
    for receiver in receivers {
        let reply = receiver
            .recv_timeout(Duration::from_secs(10))
            .expect("missing reply");
        assert_eq!(reply.correlation_id, receiver.correlation_id());
    }
    Ok(())
}
