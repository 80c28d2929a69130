/*
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use anyhow::Result;
use crossbeam_channel::{bounded, Receiver, TryRecvError};
use std::thread;
use std::time::Duration;
use trawl::prelude::*;
use trawl_cli::service::{Route, Router};

fn router(depth: usize, replicas: usize) -> (Router, Receiver<Request>, Vec<Receiver<Request>>) {
    let (write_tx, write_rx) = bounded(depth);
    let (txs, rxs): (Vec<_>, Vec<_>) = (0..replicas).map(|_| bounded(depth)).unzip();
    (Router::new(write_tx, txs), write_rx, rxs)
}

fn path() -> AdjMatrixGraph {
    AdjMatrixGraph::from_arcs([(0, 1), (1, 2)])
}

#[test]
fn test_parity_routing() -> Result<()> {
    let (router, write_rx, replicas) = router(8, 2);

    assert_eq!(
        router.dispatch(Request::traverse(4, 1, "g", 0, Mode::Dfs))?,
        Route::Replica(0)
    );
    assert_eq!(
        router.dispatch(Request::traverse(7, 2, "g", 0, Mode::Bfs))?,
        Route::Replica(1)
    );
    assert_eq!(
        router.dispatch(Request::write(7, 3, Operation::AddGraph, "g", path()))?,
        Route::WritePath
    );
    assert_eq!(
        router.dispatch(Request::write(8, 4, Operation::ModifyGraph, "g", path()))?,
        Route::WritePath
    );

    assert_eq!(replicas[0].try_recv()?.correlation_id, 1);
    assert_eq!(replicas[1].try_recv()?.correlation_id, 2);
    assert!(replicas[0].is_empty() && replicas[1].is_empty());
    let writes = write_rx.try_iter().map(|r| r.correlation_id).collect::<Vec<_>>();
    assert_eq!(writes, vec![3, 4]);
    Ok(())
}

#[test]
fn test_full_queue_is_not_rerouted() -> Result<()> {
    let (router, _write_rx, replicas) = router(1, 2);
    router.dispatch(Request::traverse(0, 1, "g", 0, Mode::Dfs))?;
    assert!(matches!(
        router.dispatch(Request::traverse(2, 2, "g", 0, Mode::Dfs)),
        Err(RequestError::ResourceExhausted { .. })
    ));
    // The other replica has room, but it is not the one selected.
    assert!(replicas[1].is_empty());
    assert_eq!(
        router.dispatch(Request::traverse(1, 3, "g", 0, Mode::Dfs))?,
        Route::Replica(1)
    );
    Ok(())
}

#[test]
fn test_unreachable_replica() -> Result<()> {
    let (router, _write_rx, mut replicas) = router(4, 2);
    drop(replicas.remove(1));
    let err = router
        .dispatch(Request::traverse(1, 1, "g", 0, Mode::Bfs))
        .unwrap_err();
    assert!(matches!(err, RequestError::DispatchFailed { ref target } if target == "replica 1"));
    assert_eq!(
        router.dispatch(Request::traverse(0, 2, "g", 0, Mode::Bfs))?,
        Route::Replica(0)
    );
    Ok(())
}

#[test]
fn test_broadcast_shutdown() -> Result<()> {
    let (router, write_rx, replicas) = router(4, 3);
    assert!(!router.is_shutting_down());
    assert_eq!(router.dispatch(Request::shutdown(0, 9))?, Route::Broadcast);
    assert!(router.is_shutting_down());

    assert_eq!(write_rx.try_recv()?.operation(), Operation::Shutdown);
    for replica in &replicas {
        assert_eq!(replica.try_recv()?.operation(), Operation::Shutdown);
    }

    assert!(matches!(
        router.dispatch(Request::traverse(0, 10, "g", 0, Mode::Dfs)),
        Err(RequestError::ShuttingDown)
    ));
    assert!(matches!(
        router.dispatch(Request::write(0, 11, Operation::AddGraph, "g", path())),
        Err(RequestError::ShuttingDown)
    ));

    // The queues are closed, and a second shutdown sends nothing.
    assert_eq!(router.dispatch(Request::shutdown(0, 12))?, Route::Broadcast);
    assert_eq!(write_rx.try_recv(), Err(TryRecvError::Disconnected));
    for replica in &replicas {
        assert_eq!(replica.try_recv(), Err(TryRecvError::Disconnected));
    }
    Ok(())
}

#[test]
fn test_nothing_is_queued_after_shutdown() -> Result<()> {
    let (router, write_rx, replicas) = router(1024, 2);
    let accepted = thread::scope(|s| {
        let dispatchers = (0..4_u64)
            .map(|client| {
                let router = &router;
                s.spawn(move || {
                    let mut accepted = Vec::new();
                    for i in 0..200 {
                        let id = client * 1000 + i;
                        match router.dispatch(Request::traverse(id, id, "g", 0, Mode::Dfs)) {
                            Ok(_) => accepted.push(id),
                            Err(RequestError::ShuttingDown) => {}
                            Err(err) => panic!("Unexpected error {err}"),
                        }
                    }
                    accepted
                })
            })
            .collect::<Vec<_>>();
        thread::sleep(Duration::from_millis(1));
        router.dispatch(Request::shutdown(0, 0)).unwrap();
        dispatchers
            .into_iter()
            .flat_map(|handle| handle.join().unwrap())
            .collect::<Vec<_>>()
    });

    assert_eq!(write_rx.try_iter().count(), 1);
    let mut queued = Vec::new();
    for replica in &replicas {
        let requests = replica.try_iter().collect::<Vec<_>>();
        // The shutdown is the last request of every queue.
        let (last, rest) = requests.split_last().unwrap();
        assert_eq!(last.operation(), Operation::Shutdown);
        queued.extend(rest.iter().map(|request| request.correlation_id));
        assert_eq!(replica.try_recv(), Err(TryRecvError::Disconnected));
    }
    queued.sort_unstable();
    let mut accepted = accepted;
    accepted.sort_unstable();
    assert_eq!(queued, accepted);
    Ok(())
}
