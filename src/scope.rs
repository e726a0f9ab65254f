//! Liveness flag for scoped views.
//!
//! Each critical section opened by a [`ConcurrentTable`](crate::ConcurrentTable)
//! owns one flag. Objects detached from the section keep an `Arc` to it and
//! check it on every use; the section's RAII guard clears it on exit, whether
//! the closure returns or unwinds.

use crate::error::{Result, TableError};
use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_SCOPE_ID: AtomicU64 = AtomicU64::new(1);

/// Shared liveness marker of one critical section.
#[derive(Debug)]
pub struct ScopeFlag {
    id: u64,
    live: AtomicBool,
}

impl ScopeFlag {
    fn open() -> Self {
        Self {
            id: NEXT_SCOPE_ID.fetch_add(1, Ordering::Relaxed),
            live: AtomicBool::new(true),
        }
    }

    /// Whether the owning section is still running.
    #[inline]
    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    pub(crate) fn check(&self) -> Result<()> {
        if self.is_live() {
            Ok(())
        } else {
            Err(TableError::StaleView)
        }
    }

    /// Live and identical to `other`.
    pub(crate) fn check_same(&self, other: &ScopeFlag) -> Result<()> {
        self.check()?;
        if self.id == other.id {
            Ok(())
        } else {
            Err(TableError::StaleView)
        }
    }

    fn close(&self) {
        self.live.store(false, Ordering::Release);
    }
}

/// RAII guard for a critical section. Dropping it clears the flag; declare
/// it after the lock guard so it drops first.
pub(crate) struct ScopeGuard {
    flag: Arc<ScopeFlag>,
}

impl ScopeGuard {
    pub(crate) fn enter() -> Self {
        let flag = Arc::new(ScopeFlag::open());
        log::trace!("scope {} opened", flag.id);
        Self { flag }
    }

    pub(crate) fn flag(&self) -> &Arc<ScopeFlag> {
        &self.flag
    }
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        self.flag.close();
        log::trace!("scope {} closed", self.flag.id);
    }
}

/// Optional flag check used by objects that may or may not come from a scope.
#[inline]
pub(crate) fn check_opt(flag: &Option<Arc<ScopeFlag>>) -> Result<()> {
    match flag {
        Some(f) => f.check(),
        None => Ok(()),
    }
}
