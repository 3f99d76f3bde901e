//! Synchronization utilities for analysis runs.
//!
//! This module provides the cooperative cancellation primitive used by the
//! data flow engine. Cancellation is signal-only: requesting it never
//! interrupts a thread, it merely flips a flag the engine polls between
//! block visits.
//!
//! # Design Principles
//!
//! - **Cooperative**: cancellation is observed at well-defined points, never forced
//! - **All-or-nothing**: a cancelled analysis publishes no partial results
//! - **Thread Safety**: tokens can be cloned and signalled from any thread

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// A cloneable cancellation signal shared between an analysis run and its caller.
///
/// All clones of a token observe the same underlying flag: cancelling any clone
/// cancels them all. The default token is never cancelled until
/// [`cancel`](Self::cancel) is called.
///
/// The engine checks the token between block visits and aborts the entire
/// computation with [`Error::Cancelled`](crate::Error::Cancelled) when it is
/// signalled, so a cancelled run yields no result rather than a stale one.
///
/// # Examples
///
/// ```rust
/// use flowscope::CancellationToken;
///
/// let token = CancellationToken::new();
/// let observer = token.clone();
///
/// assert!(!observer.is_cancelled());
/// token.cancel();
/// assert!(observer.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    /// The shared cancellation flag.
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates a new token in the not-cancelled state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    ///
    /// All clones of this token will observe the request. Cancellation is
    /// idempotent; signalling an already-cancelled token has no effect.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Returns `true` if cancellation has been requested on this token or any
    /// of its clones.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}
