use std::sync::atomic::{AtomicBool, Ordering};

/// A single-slot guard preventing overlapping passes. A pass attempted while another holds the
/// guard is skipped rather than queued.
#[derive(Debug, Default)]
pub(crate) struct PassGuard {
    in_progress: AtomicBool,
}

impl PassGuard {
    /// Attempts to acquire the guard, returning a permit released on drop.
    pub(crate) fn try_acquire(&self) -> Option<PassPermit<'_>> {
        self.in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| PassPermit { guard: self })
    }

    /// Returns true if a pass is in progress.
    pub(crate) fn is_held(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }
}

/// A held [`PassGuard`].
#[derive(Debug)]
pub(crate) struct PassPermit<'a> {
    guard: &'a PassGuard,
}

impl Drop for PassPermit<'_> {
    fn drop(&mut self) {
        self.guard.in_progress.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_is_exclusive_until_dropped() {
        let guard = PassGuard::default();

        let permit = guard.try_acquire();
        assert!(permit.is_some());
        assert!(guard.is_held());
        assert!(guard.try_acquire().is_none());

        drop(permit);
        assert!(!guard.is_held());
        assert!(guard.try_acquire().is_some());
    }
}
