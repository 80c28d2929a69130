/*
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Delivery of replies to their callers.

use crossbeam_channel::{bounded, Receiver, Sender};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use trawl::prelude::*;

/// The pending callers, keyed by correlation id.
///
/// A caller [registers](ReplyChannel::register) its correlation id before
/// submitting a request and waits on the returned [`ReplyReceiver`]; workers
/// [deliver](ReplyChannel::deliver) replies, which are routed to the
/// registered caller and unregister it. Replies nobody is waiting for are
/// logged and dropped.
#[derive(Debug, Default)]
pub struct ReplyChannel {
    pending: Mutex<HashMap<u64, Sender<Reply>>>,
}

/// The receiving end of a registration with a [`ReplyChannel`].
#[derive(Debug)]
pub struct ReplyReceiver {
    correlation_id: u64,
    receiver: Receiver<Reply>,
}

impl ReplyReceiver {
    pub fn correlation_id(&self) -> u64 {
        self.correlation_id
    }

    /// Waits for the reply; returns `None` if the registration was cancelled.
    pub fn recv(&self) -> Option<Reply> {
        self.receiver.recv().ok()
    }

    /// Waits for the reply for at most `timeout`.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<Reply> {
        self.receiver.recv_timeout(timeout).ok()
    }

    /// Returns the reply if it has already been delivered.
    pub fn try_recv(&self) -> Option<Reply> {
        self.receiver.try_recv().ok()
    }

    /// Returns the underlying channel, for use with
    /// [`Select`](crossbeam_channel::Select).
    pub fn as_receiver(&self) -> &Receiver<Reply> {
        &self.receiver
    }
}

impl ReplyChannel {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<u64, Sender<Reply>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a caller waiting for the reply to `correlation_id`.
    pub fn register(&self, correlation_id: u64) -> Result<ReplyReceiver, RequestError> {
        let mut pending = self.lock();
        if pending.contains_key(&correlation_id) {
            return Err(RequestError::DuplicateCorrelationId { correlation_id });
        }
        let (sender, receiver) = bounded(1);
        pending.insert(correlation_id, sender);
        Ok(ReplyReceiver {
            correlation_id,
            receiver,
        })
    }

    /// Forgets a registration; its receiver will never get a reply.
    pub fn cancel(&self, correlation_id: u64) {
        self.lock().remove(&correlation_id);
    }

    /// Delivers a reply to its caller, returning whether somebody was
    /// waiting for it.
    pub fn deliver(&self, reply: Reply) -> bool {
        let correlation_id = reply.correlation_id;
        let Some(sender) = self.lock().remove(&correlation_id) else {
            log::warn!("Dropping reply to request {correlation_id}: nobody is waiting for it");
            return false;
        };
        // The capacity is one and there is a single delivery per
        // registration, so this fails only if the receiver is gone.
        if sender.try_send(reply).is_err() {
            log::warn!("Dropping reply to request {correlation_id}: the caller is gone");
            return false;
        }
        true
    }

    /// Returns the number of callers waiting for a reply.
    pub fn pending(&self) -> usize {
        self.lock().len()
    }
}
