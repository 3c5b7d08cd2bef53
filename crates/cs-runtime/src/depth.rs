use std::cell::Cell;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_DEPTH: usize = 20;
pub const DEPTH_EXCEEDED_MESSAGE: &str =
    "script resolution exceeded maximum depth (possible circular reference)";

/// Where the nesting counter lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DepthScope {
    /// Each thread counts its own nested resolutions.
    #[default]
    PerThread,
    /// One counter for every thread using the guard.
    Shared,
}

thread_local! {
    static THREAD_DEPTH: Cell<usize> = const { Cell::new(0) };
}

#[derive(Debug)]
pub struct DepthGuard {
    limit: usize,
    scope: DepthScope,
    shared: AtomicUsize,
}

impl DepthGuard {
    pub fn new(limit: usize, scope: DepthScope) -> Self {
        Self {
            limit,
            scope,
            shared: AtomicUsize::new(0),
        }
    }

    /// Counts one more level of nesting until the returned token drops.
    pub fn enter(&self) -> DepthToken<'_> {
        let depth = match self.scope {
            DepthScope::PerThread => THREAD_DEPTH.with(|depth| {
                let next = depth.get() + 1;
                depth.set(next);
                next
            }),
            DepthScope::Shared => self.shared.fetch_add(1, Ordering::SeqCst) + 1,
        };
        DepthToken { guard: self, depth }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn current(&self) -> usize {
        match self.scope {
            DepthScope::PerThread => THREAD_DEPTH.with(Cell::get),
            DepthScope::Shared => self.shared.load(Ordering::SeqCst),
        }
    }
}

#[derive(Debug)]
pub struct DepthToken<'a> {
    guard: &'a DepthGuard,
    depth: usize,
}

impl DepthToken<'_> {
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn exceeded(&self) -> bool {
        self.depth > self.guard.limit
    }
}

impl Drop for DepthToken<'_> {
    fn drop(&mut self) {
        match self.guard.scope {
            DepthScope::PerThread => {
                THREAD_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
            }
            DepthScope::Shared => {
                self.guard.shared.fetch_sub(1, Ordering::SeqCst);
            }
        }
    }
}

#[cfg(test)]
mod depth_tests {
    use super::*;

    fn nest(guard: &DepthGuard, remaining: usize) -> bool {
        let token = guard.enter();
        if token.exceeded() {
            return true;
        }
        remaining > 0 && nest(guard, remaining - 1)
    }

    #[test]
    fn trips_past_the_limit_and_unwinds() {
        for scope in [DepthScope::PerThread, DepthScope::Shared] {
            let guard = DepthGuard::new(3, scope);
            assert!(!nest(&guard, 2));
            assert!(nest(&guard, 10));
            assert_eq!(guard.current(), 0);
        }
    }

    #[test]
    fn per_thread_counters_are_independent() {
        let guard = DepthGuard::new(1, DepthScope::PerThread);
        let outer = guard.enter();
        assert!(!outer.exceeded());
        std::thread::scope(|scope| {
            scope.spawn(|| {
                let inner = guard.enter();
                assert_eq!(inner.depth(), 1);
                assert!(!inner.exceeded());
            });
        });
        let nested = guard.enter();
        assert!(nested.exceeded());
    }
}
