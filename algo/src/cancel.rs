/*
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use crate::visits::Interrupted;
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A cloneable cancellation flag with an optional deadline.
///
/// Clones share the flag, so cancelling any clone cancels them all. A token
/// is also cancelled once its deadline has passed.
///
/// Visits check the token at each fan-out point through
/// [`check`](CancellationToken::check), whose result can be returned
/// directly from a visit callback.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancellationToken {
    /// Creates a token without deadline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a token that cancels itself after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new().deadline(Instant::now() + timeout)
    }

    /// Sets the deadline of the token.
    pub fn deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Cancels the token; traversals checking it stop at their next fan-out
    /// point.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Returns whether the token has been cancelled or its deadline has
    /// passed.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
            || self
                .deadline
                .is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Breaks with [`Interrupted`] if the token has been cancelled.
    #[inline]
    pub fn check(&self) -> ControlFlow<Interrupted, ()> {
        if self.is_cancelled() {
            ControlFlow::Break(Interrupted)
        } else {
            ControlFlow::Continue(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_is_shared() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(clone.check().is_continue());
        token.cancel();
        assert!(clone.is_cancelled());
        assert!(clone.check().is_break());
    }

    #[test]
    fn test_deadline() {
        let token = CancellationToken::with_timeout(Duration::ZERO);
        assert!(token.is_cancelled());
        let token = CancellationToken::with_timeout(Duration::from_secs(3600));
        assert!(!token.is_cancelled());
    }
}
