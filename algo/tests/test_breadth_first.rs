/*
 * SPDX-FileCopyrightText: 2024 Matteo Dell'Acqua
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use anyhow::Result;
use no_break::NoBreak;
use std::collections::VecDeque;
use std::ops::ControlFlow::{Break, Continue};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use trawl::graphs::random::ErdosRenyi;
use trawl::prelude::*;
use trawl_algo::prelude::*;
use trawl_algo::visits::breadth_first::{EventNoPred, ParBarrier};

/// Distances from `start` computed by a sequential visit; `None` for
/// unreachable nodes.
fn correct_distances<G: RandomAccessGraph>(graph: &G, start: usize) -> Vec<Option<usize>> {
    let mut distances = vec![None; graph.num_nodes()];
    let mut queue = VecDeque::from([start]);
    distances[start] = Some(0);
    while let Some(node) = queue.pop_front() {
        let distance = distances[node].unwrap() + 1;
        for succ in graph.successors(node) {
            if distances[succ].is_none() {
                distances[succ] = Some(distance);
                queue.push_back(succ);
            }
        }
    }
    distances
}

/// Checks that `order` contains exactly the reachable nodes, each once, in
/// nondecreasing distance.
fn assert_bfs_order<G: RandomAccessGraph>(graph: &G, start: usize, order: &[usize]) {
    let distances = correct_distances(graph, start);
    let reachable = distances.iter().filter(|d| d.is_some()).count();
    assert_eq!(order.len(), reachable);
    assert_eq!(order[0], start);
    let mut seen = vec![false; graph.num_nodes()];
    for &node in order {
        assert!(!seen[node], "node {node} reported twice");
        seen[node] = true;
    }
    for window in order.windows(2) {
        let (a, b) = (distances[window[0]].unwrap(), distances[window[1]].unwrap());
        assert!(a <= b, "{order:?} is not a breadth-first order");
    }
}

#[test]
fn test_path() -> Result<()> {
    let graph = AdjMatrixGraph::from_arcs([(0, 1), (1, 2)]);
    let pool = TaskPool::new(4);
    let mut visit = ParBarrier::new(&graph, &pool);
    visit.par_visit(0, |_| Continue(())).continue_value_no_break();
    assert_eq!(visit.order(), &[0, 1, 2]);
    Ok(())
}

#[test]
fn test_disconnected() -> Result<()> {
    let graph = AdjMatrixGraph::from_arcs([(0, 1), (2, 3)]);
    let pool = TaskPool::new(4);
    let mut visit = ParBarrier::new(&graph, &pool);
    visit.par_visit(0, |_| Continue(())).continue_value_no_break();
    assert_eq!(visit.order(), &[0, 1]);
    assert_eq!(visit.visited(), &[true, true, false, false]);
    Ok(())
}

#[test]
fn test_no_successors_and_self_loop() -> Result<()> {
    let graph = AdjMatrixGraph::from_arcs([(0, 0), (1, 0)]);
    let pool = TaskPool::new(4);
    let mut visit = ParBarrier::new(&graph, &pool);
    let known = AtomicUsize::new(0);
    visit
        .par_visit(0, |event| {
            if let EventNoPred::Known { node } = event {
                assert_eq!(node, 0);
                known.fetch_add(1, Ordering::Relaxed);
            }
            Continue(())
        })
        .continue_value_no_break();
    assert_eq!(visit.order(), &[0]);
    assert_eq!(known.load(Ordering::Relaxed), 1);

    let graph = AdjMatrixGraph::empty(3);
    let mut visit = ParBarrier::new(&graph, &pool);
    visit.par_visit(2, |_| Continue(())).continue_value_no_break();
    assert_eq!(visit.order(), &[2]);
    Ok(())
}

#[test]
fn test_events() -> Result<()> {
    // 0 -> 1, 2; 1 -> 3; 2 -> 3; 3 -> 0
    let graph = AdjMatrixGraph::from_arcs([(0, 1), (0, 2), (1, 3), (2, 3), (3, 0)]);
    let pool = TaskPool::new(8);
    let mut visit = ParBarrier::new(&graph, &pool);
    let distances = [(); 4].map(|_| AtomicUsize::new(usize::MAX));
    let frontiers = std::sync::Mutex::new(vec![]);
    let init = AtomicUsize::new(0);
    let done = AtomicUsize::new(0);
    visit
        .par_visit(0, |event| {
            match event {
                EventNoPred::Init {} => {
                    init.fetch_add(1, Ordering::Relaxed);
                }
                EventNoPred::Unknown { node, distance } => {
                    // Each node is discovered once
                    assert_eq!(
                        distances[node].swap(distance, Ordering::Relaxed),
                        usize::MAX
                    );
                }
                EventNoPred::FrontierSize { distance, nodes } => {
                    frontiers.lock().unwrap().push((distance, nodes));
                }
                EventNoPred::Done {} => {
                    done.fetch_add(1, Ordering::Relaxed);
                }
                EventNoPred::Known { .. } => {}
            }
            Continue(())
        })
        .continue_value_no_break();

    assert_eq!(distances.map(AtomicUsize::into_inner), [0, 1, 1, 2]);
    assert_eq!(frontiers.into_inner()?, vec![(0, 1), (1, 2), (2, 1)]);
    assert_eq!(init.into_inner(), 1);
    assert_eq!(done.into_inner(), 1);
    assert_bfs_order(&graph, 0, visit.order());
    Ok(())
}

#[test]
fn test_random_graphs() -> Result<()> {
    for (seed, &p) in [0.01, 0.05, 0.1, 0.3].iter().enumerate() {
        let graph = ErdosRenyi::new(100, p, seed as u64).generate();
        for max_tasks in [1, 3, 200] {
            let pool = TaskPool::new(max_tasks);
            let mut visit = ParBarrier::new(&graph, &pool);
            for start in [0, 17, 99] {
                visit.reset();
                visit.par_visit(start, |_| Continue(())).continue_value_no_break();
                assert_bfs_order(&graph, start, visit.order());
            }
            assert!(pool.stats().peak <= max_tasks);
            assert_eq!(pool.live(), 0);
        }
    }
    Ok(())
}

#[test]
fn test_no_duplicates_under_delays() -> Result<()> {
    // Every node of the first level reaches every node of the second one, so
    // the tasks of the first round all race on the same nodes.
    let mut graph = AdjMatrixGraph::empty(21);
    for u in 1..=10 {
        graph.add_arc(0, u);
        for v in 11..=20 {
            graph.add_arc(u, v);
        }
    }
    let pool = TaskPool::new(16);
    for round in 0..5 {
        let mut visit = ParBarrier::new(&graph, &pool);
        let discovered = [(); 21].map(|_| AtomicUsize::new(0));
        visit
            .par_visit(0, |event| {
                if let EventNoPred::Unknown { node, .. } = event {
                    std::thread::sleep(Duration::from_micros(((node * 37 + round) % 7) as u64 * 100));
                    discovered[node].fetch_add(1, Ordering::Relaxed);
                }
                Continue(())
            })
            .continue_value_no_break();
        assert!(discovered.iter().all(|d| d.load(Ordering::Relaxed) == 1));
        assert_bfs_order(&graph, 0, visit.order());
    }
    Ok(())
}

#[test]
fn test_interrupted() -> Result<()> {
    let graph = AdjMatrixGraph::complete(30);
    let pool = TaskPool::new(8);
    let mut visit = ParBarrier::new(&graph, &pool);
    let result = visit.par_visit(0, |event| match event {
        EventNoPred::Unknown { distance: 1, .. } => Break(Interrupted),
        _ => Continue(()),
    });
    assert!(result.is_break());
    assert_eq!(pool.live(), 0);
    let reported = visit.order().len();
    assert!(reported < 30, "{reported}");

    // An already visited root yields an empty visit.
    let result = visit.par_visit(0, |_| Break(Interrupted));
    assert!(result.is_continue());

    visit.reset();
    visit.par_visit(0, |_| Continue(())).continue_value_no_break();
    assert_eq!(visit.order().len(), 30);
    Ok(())
}

#[test]
fn test_panic_is_propagated() {
    let graph = AdjMatrixGraph::complete(10);
    let pool = TaskPool::new(4);
    let mut visit = ParBarrier::new(&graph, &pool);
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        visit.par_visit(0, |event| {
            if let EventNoPred::Unknown { node: 5, .. } = event {
                panic!("node 5");
            }
            Continue::<(), ()>(())
        })
    }));
    assert!(result.is_err());
    // Permits are released even by panicking tasks.
    assert_eq!(pool.live(), 0);
}
