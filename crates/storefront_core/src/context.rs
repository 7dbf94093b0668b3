//! Per-call cancellation context.
//!
//! # Responsibility
//! - Carry a caller-controlled cancellation flag and optional deadline into
//!   every collaborator call of one unit of work.
//!
//! # Invariants
//! - Once cancelled, a context stays cancelled.
//! - Contexts are cheap to clone; clones observe the same cancellation flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Why a context stopped accepting work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Active,
    Cancelled,
    DeadlineExceeded,
}

#[derive(Debug, Clone)]
pub struct CallContext {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

/// Handle that cancels the context it was taken from.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

impl CallContext {
    /// Context with no deadline that is never cancelled unless asked to.
    pub fn background() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: None,
        }
    }

    /// Context that expires `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: Some(Instant::now() + timeout),
        }
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            cancelled: Arc::clone(&self.cancelled),
        }
    }

    pub fn state(&self) -> ContextState {
        if self.cancelled.load(Ordering::SeqCst) {
            return ContextState::Cancelled;
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => ContextState::DeadlineExceeded,
            _ => ContextState::Active,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state() == ContextState::Active
    }
}

impl Default for CallContext {
    fn default() -> Self {
        Self::background()
    }
}
