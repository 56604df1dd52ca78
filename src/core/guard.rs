//! # Recursion Guard
//!
//! Depth counter bracketing every struct and container descent.
//!
//! [`RecursionGuard::enter`] hands out a [`DepthToken`] that decrements the
//! counter when dropped. Because release happens in `Drop`, the counter is
//! restored on success, on error propagation through `?`, and when an
//! in-flight future is cancelled mid-descent.
//!
//! The counter is atomic so that a guard can be borrowed across `.await`
//! points of a `Send` future. One guard serves one top-level invocation.

use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::warn;

use crate::error::{CodecError, Result};

/// Default maximum nesting depth
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Deepest nesting the recursive walkers may reach. Descent is stack
/// recursive, and this bound stays within a 2 MiB thread stack in
/// unoptimized builds. Larger requested maxima are clamped to it.
pub const MAX_DEPTH_LIMIT: usize = 128;

#[derive(Debug)]
pub struct RecursionGuard {
    depth: AtomicUsize,
    max: usize,
}

impl RecursionGuard {
    pub fn new(max: usize) -> Self {
        Self {
            depth: AtomicUsize::new(0),
            max: max.min(MAX_DEPTH_LIMIT),
        }
    }

    /// Increment the depth, failing once it exceeds the maximum.
    pub fn enter(&self) -> Result<DepthToken<'_>> {
        let depth = self.depth.fetch_add(1, Ordering::AcqRel) + 1;
        if depth > self.max {
            self.depth.fetch_sub(1, Ordering::AcqRel);
            warn!(depth, max = self.max, "Recursion guard tripped");
            return Err(CodecError::DepthExceeded {
                depth,
                max: self.max,
            });
        }
        Ok(DepthToken { guard: self })
    }

    /// Current depth
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::Acquire)
    }

    pub fn max(&self) -> usize {
        self.max
    }
}

impl Default for RecursionGuard {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

/// Proof of one level of descent. Dropping it exits that level.
#[derive(Debug)]
#[must_use = "dropping the token exits the level immediately"]
pub struct DepthToken<'a> {
    guard: &'a RecursionGuard,
}

impl DepthToken<'_> {
    /// Exit the level explicitly
    pub fn exit(self) {}
}

impl Drop for DepthToken<'_> {
    fn drop(&mut self) {
        self.guard.depth.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[allow(clippy::expect_used)]
    fn test_enter_exit_balanced() {
        let guard = RecursionGuard::new(3);
        {
            let _a = guard.enter().expect("depth 1");
            let _b = guard.enter().expect("depth 2");
            assert_eq!(guard.depth(), 2);
        }
        assert_eq!(guard.depth(), 0);
    }

    #[test]
    #[allow(clippy::expect_used)]
    fn test_depth_at_max_allowed_and_beyond_rejected() {
        let guard = RecursionGuard::new(2);
        let a = guard.enter().expect("depth 1");
        let b = guard.enter().expect("depth 2");
        match guard.enter() {
            Err(CodecError::DepthExceeded { depth, max }) => {
                assert_eq!(depth, 3);
                assert_eq!(max, 2);
            }
            other => panic!("Unexpected result: {other:?}"),
        }
        assert_eq!(guard.depth(), 2);
        b.exit();
        a.exit();
        assert_eq!(guard.depth(), 0);
    }

    #[test]
    fn test_release_on_error_path() {
        fn descend(guard: &RecursionGuard, levels: usize) -> Result<()> {
            let _token = guard.enter()?;
            if levels == 0 {
                return Err(CodecError::protocol("boom"));
            }
            descend(guard, levels - 1)
        }

        let guard = RecursionGuard::new(10);
        assert!(descend(&guard, 5).is_err());
        assert_eq!(guard.depth(), 0);
    }

    #[test]
    fn test_requested_max_clamped_to_limit() {
        let guard = RecursionGuard::new(4096);
        assert_eq!(guard.max(), MAX_DEPTH_LIMIT);
        assert_eq!(RecursionGuard::new(8).max(), 8);
    }
}
