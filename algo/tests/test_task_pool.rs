/*
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use anyhow::Result;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use trawl_algo::TaskPool;

#[test]
fn test_try_enter_never_exceeds_bound() -> Result<()> {
    let pool = TaskPool::new(3);
    let permits = std::iter::from_fn(|| pool.try_enter())
        .take(10)
        .collect::<Vec<_>>();
    assert_eq!(permits.len(), 3);
    assert_eq!(pool.live(), 3);
    assert!(pool.try_enter().is_none());
    drop(permits);

    let stats = pool.stats();
    assert_eq!(stats.live, 0);
    assert_eq!(stats.peak, 3);
    assert_eq!(stats.granted, 3);
    assert_eq!(stats.refused, 2);
    Ok(())
}

#[test]
fn test_enter_waits_for_a_permit() -> Result<()> {
    let pool = TaskPool::new(1);
    let held = pool.enter();
    let (tx, rx) = mpsc::channel();
    thread::scope(|s| -> Result<()> {
        s.spawn(|| {
            let _permit = pool.enter();
            tx.send(()).unwrap();
        });
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
        drop(held);
        rx.recv_timeout(Duration::from_secs(10))?;
        Ok(())
    })?;
    assert_eq!(pool.stats().peak, 1);
    assert_eq!(pool.live(), 0);
    Ok(())
}

#[test]
fn test_contention() -> Result<()> {
    let pool = TaskPool::new(5);
    let running = AtomicUsize::new(0);
    let max_running = AtomicUsize::new(0);
    thread::scope(|s| {
        for _ in 0..20 {
            s.spawn(|| {
                for _ in 0..10 {
                    let _permit = pool.enter();
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    max_running.fetch_max(now, Ordering::SeqCst);
                    thread::sleep(Duration::from_micros(200));
                    running.fetch_sub(1, Ordering::SeqCst);
                }
            });
        }
    });
    assert!(max_running.into_inner() <= 5);
    assert!(pool.stats().peak <= 5);
    assert_eq!(pool.live(), 0);
    Ok(())
}

#[test]
#[should_panic]
fn test_zero_tasks() {
    TaskPool::new(0);
}
