//! A reusable open/closed result gate.
//!
//! `ResultLock` hands a result produced in an asynchronous completion
//! context (a transport callback, another thread) back to a blocked caller.
//! The gate is either `Closed` (callers block) or `Open` (callers pass
//! straight through, observing the stored error if one was attached). It is
//! reusable: `close` re-arms the gate for the next request/response cycle.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Outcome of blocking on a [`ResultLock`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockResult<E> {
    /// The gate opened without an attached error.
    Success,
    /// The wait deadline passed before the gate opened.
    Timeout,
    /// The gate opened with an attached error.
    Error(E),
}

struct State<E> {
    is_open: bool,
    error: Option<E>,
    // Bumped on every closed->open transition. A waiter that entered before
    // an open observes the bump even if a racing close() has already
    // re-closed the gate, so an open that returned can never strand a
    // waiter.
    epoch: u64,
}

/// An open/closed gate carrying an optional error of type `E`.
///
/// All transitions and waits are serialized on one internal mutex, so an
/// `open` that has returned is always observed by any `block` that starts
/// afterwards. Each in-flight request should own its own gate; unrelated
/// requests are not multiplexed onto one instance.
pub struct ResultLock<E> {
    state: Mutex<State<E>>,
    condvar: Condvar,
}

impl<E: Clone> ResultLock<E> {
    /// Create a gate, either pre-opened (a result already exists) or
    /// closed.
    pub fn new(is_open: bool) -> Self {
        Self {
            state: Mutex::new(State {
                is_open,
                error: None,
                epoch: 0,
            }),
            condvar: Condvar::new(),
        }
    }

    /// Whether the gate is currently open.
    pub fn is_open(&self) -> bool {
        self.lock_state().is_open
    }

    /// Open the gate and release every blocked caller.
    ///
    /// Idempotent: opening an already-open gate only replaces the stored
    /// error when a new one is supplied, and wakes nobody again.
    pub fn open(&self, error: Option<E>) {
        let mut state = self.lock_state();
        if state.is_open {
            if error.is_some() {
                state.error = error;
            }
            return;
        }
        state.is_open = true;
        state.error = error;
        state.epoch = state.epoch.wrapping_add(1);
        self.condvar.notify_all();
    }

    /// Reset the gate to the closed state and clear the stored error.
    ///
    /// Callers already released by a previous `open` are unaffected;
    /// subsequent `block` calls wait for the next `open`.
    pub fn close(&self) {
        let mut state = self.lock_state();
        state.is_open = false;
        state.error = None;
    }

    /// Block the calling thread until the gate is opened.
    ///
    /// Returns immediately if the gate is already open.
    pub fn block(&self) -> LockResult<E> {
        let mut state = self.lock_state();
        let entry_epoch = state.epoch;
        while !state.is_open && state.epoch == entry_epoch {
            state = self
                .condvar
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        Self::outcome(&state)
    }

    /// Block the calling thread until the gate is opened or the timeout
    /// elapses.
    ///
    /// A timeout does not change the gate's state; a later `open` is still
    /// observed by a subsequent `block`.
    pub fn block_timeout(&self, timeout: Duration) -> LockResult<E> {
        let state = self.lock_state();
        let entry_epoch = state.epoch;
        let (state, wait) = self
            .condvar
            .wait_timeout_while(state, timeout, |s| {
                !s.is_open && s.epoch == entry_epoch
            })
            .unwrap_or_else(PoisonError::into_inner);
        if wait.timed_out() {
            return LockResult::Timeout;
        }
        Self::outcome(&state)
    }

    fn outcome(state: &State<E>) -> LockResult<E> {
        match &state.error {
            Some(error) => LockResult::Error(error.clone()),
            None => LockResult::Success,
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, State<E>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
