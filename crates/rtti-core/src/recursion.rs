//! Recursion guard shared by the matcher, the resolver and the inheritance walk.
//!
//! Descriptor graphs may be cyclic, so every recursive walk that follows
//! `Lazy` edges runs under a [`RecursionGuard`]. The guard combines:
//! 1. **Cycle detection** via a visiting set (`FxHashSet<K>`)
//! 2. **Depth limiting** so deep but finite data cannot overflow the stack
//! 3. **Iteration bounding** for walks whose width is not bounded by data
//!
//! Limits come from named [`RecursionProfile`]s whose numbers live in
//! `rtti_common::limits`:
//!
//! ```ignore
//! let mut guard = RecursionGuard::with_profile(RecursionProfile::ValueMatch);
//! match guard.enter(key) {
//!     RecursionResult::Entered => {
//!         let result = match_inner();
//!         guard.leave(key);
//!         result
//!     }
//!     denied => fail_path(denied),
//! }
//! ```
//!
//! In debug builds, dropping a guard that still has entries panics, as does
//! leaving a key that was never entered.

use rtti_common::limits::{
    MAX_INHERITANCE_DEPTH, MAX_INHERITANCE_ITERATIONS, MAX_MATCH_DEPTH, MAX_RESOLUTION_DEPTH,
    MAX_VISITING_ENTRIES,
};
use rustc_hash::FxHashSet;
use std::fmt;
use std::hash::Hash;

// ---------------------------------------------------------------------------
// RecursionProfile
// ---------------------------------------------------------------------------

/// Named recursion limit presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecursionProfile {
    /// Alias and generic hops while matching one value.
    ///
    /// depth = `MAX_MATCH_DEPTH`, iterations = unlimited (wide values are
    /// bounded by their own size)
    #[default]
    ValueMatch,

    /// Alias chains followed by `resolve_type`.
    ///
    /// depth = `MAX_RESOLUTION_DEPTH`
    TypeResolution,

    /// `extends` chains walked when collecting inherited members.
    ///
    /// depth = `MAX_INHERITANCE_DEPTH`, iterations = `MAX_INHERITANCE_ITERATIONS`
    Inheritance,

    /// Custom limits for one-off or test scenarios.
    Custom { max_depth: u32, max_iterations: u32 },
}

impl RecursionProfile {
    pub const fn max_depth(self) -> u32 {
        match self {
            Self::ValueMatch => MAX_MATCH_DEPTH,
            Self::TypeResolution => MAX_RESOLUTION_DEPTH,
            Self::Inheritance => MAX_INHERITANCE_DEPTH,
            Self::Custom { max_depth, .. } => max_depth,
        }
    }

    pub const fn max_iterations(self) -> u32 {
        match self {
            Self::ValueMatch => u32::MAX,
            Self::TypeResolution => MAX_RESOLUTION_DEPTH.saturating_mul(4),
            Self::Inheritance => MAX_INHERITANCE_ITERATIONS,
            Self::Custom { max_iterations, .. } => max_iterations,
        }
    }
}

// ---------------------------------------------------------------------------
// RecursionResult
// ---------------------------------------------------------------------------

/// Result of attempting to enter a recursive computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecursionResult {
    Entered,
    /// The key is already being visited.
    Cycle,
    DepthExceeded,
    IterationExceeded,
}

impl RecursionResult {
    #[inline]
    pub fn is_entered(self) -> bool {
        matches!(self, Self::Entered)
    }

    #[inline]
    pub fn is_cycle(self) -> bool {
        matches!(self, Self::Cycle)
    }

    #[inline]
    pub fn is_exceeded(self) -> bool {
        matches!(self, Self::DepthExceeded | Self::IterationExceeded)
    }

    #[inline]
    pub fn is_denied(self) -> bool {
        !self.is_entered()
    }
}

impl fmt::Display for RecursionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Entered => "entered",
            Self::Cycle => "recursive type revisited with the same value",
            Self::DepthExceeded => "type nesting limit exceeded",
            Self::IterationExceeded => "type checking budget exhausted",
        })
    }
}

// ---------------------------------------------------------------------------
// RecursionGuard
// ---------------------------------------------------------------------------

/// Tracks recursion state for cycle detection, depth limiting and iteration
/// bounding.
///
/// Every successful [`enter`](Self::enter) must be paired with exactly one
/// [`leave`](Self::leave) for the same key.
pub struct RecursionGuard<K: Hash + Eq + Copy> {
    visiting: FxHashSet<K>,
    depth: u32,
    iterations: u32,
    max_depth: u32,
    max_iterations: u32,
    max_visiting: u32,
    exceeded: bool,
}

impl<K: Hash + Eq + Copy> RecursionGuard<K> {
    /// Create a guard with explicit limits.
    ///
    /// Prefer [`with_profile`](Self::with_profile) for standard use cases.
    pub fn new(max_depth: u32, max_iterations: u32) -> Self {
        Self {
            visiting: FxHashSet::default(),
            depth: 0,
            iterations: 0,
            max_depth,
            max_iterations,
            max_visiting: MAX_VISITING_ENTRIES,
            exceeded: false,
        }
    }

    pub fn with_profile(profile: RecursionProfile) -> Self {
        Self::new(profile.max_depth(), profile.max_iterations())
    }

    pub fn with_max_visiting(mut self, max_visiting: u32) -> Self {
        self.max_visiting = max_visiting;
        self
    }

    /// Try to enter a recursive computation for `key`.
    ///
    /// Limits are checked in order: iterations, depth, cycle, visiting-set size.
    pub fn enter(&mut self, key: K) -> RecursionResult {
        self.iterations = self.iterations.saturating_add(1);

        if self.iterations > self.max_iterations {
            self.exceeded = true;
            return RecursionResult::IterationExceeded;
        }
        if self.depth >= self.max_depth {
            self.exceeded = true;
            return RecursionResult::DepthExceeded;
        }
        if self.visiting.contains(&key) {
            return RecursionResult::Cycle;
        }
        if self.visiting.len() as u32 >= self.max_visiting {
            self.exceeded = true;
            return RecursionResult::DepthExceeded;
        }

        self.visiting.insert(key);
        self.depth += 1;
        RecursionResult::Entered
    }

    /// Leave a recursive computation for `key`.
    pub fn leave(&mut self, key: K) {
        let was_present = self.visiting.remove(&key);

        debug_assert!(
            was_present,
            "RecursionGuard::leave() called with a key that is not in the visiting set"
        );

        self.depth = self.depth.saturating_sub(1);
    }

    /// Run `f` between `enter(key)` and `leave(key)`.
    ///
    /// `f` receives the guard so nested calls can keep using it.
    pub fn scope<T>(
        &mut self,
        key: K,
        f: impl FnOnce(&mut Self) -> T,
    ) -> Result<T, RecursionResult> {
        match self.enter(key) {
            RecursionResult::Entered => {
                let result = f(self);
                self.leave(key);
                Ok(result)
            }
            denied => Err(denied),
        }
    }

    #[inline]
    pub fn is_visiting(&self, key: &K) -> bool {
        self.visiting.contains(key)
    }

    #[inline]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Total enter attempts so far, successful or not.
    #[inline]
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    #[inline]
    pub fn visiting_count(&self) -> usize {
        self.visiting.len()
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.depth > 0
    }

    #[inline]
    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    #[inline]
    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    /// Whether any limit was hit. Sticky until [`reset`](Self::reset).
    #[inline]
    pub fn is_exceeded(&self) -> bool {
        self.exceeded
    }

    #[inline]
    pub fn mark_exceeded(&mut self) {
        self.exceeded = true;
    }

    /// Clear all state, keeping the configured limits.
    pub fn reset(&mut self) {
        self.visiting.clear();
        self.depth = 0;
        self.iterations = 0;
        self.exceeded = false;
    }
}

#[cfg(debug_assertions)]
impl<K: Hash + Eq + Copy> Drop for RecursionGuard<K> {
    fn drop(&mut self) {
        if !std::thread::panicking() && !self.visiting.is_empty() {
            panic!(
                "RecursionGuard dropped with {} active entries still in the visiting set",
                self.visiting.len(),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profiles_read_shared_limits() {
        assert_eq!(RecursionProfile::ValueMatch.max_depth(), MAX_MATCH_DEPTH);
        assert_eq!(RecursionProfile::ValueMatch.max_iterations(), u32::MAX);
        assert_eq!(
            RecursionProfile::Inheritance.max_iterations(),
            MAX_INHERITANCE_ITERATIONS
        );
        assert_eq!(RecursionProfile::TypeResolution.max_depth(), MAX_RESOLUTION_DEPTH);
        assert_eq!(RecursionProfile::Inheritance.max_depth(), MAX_INHERITANCE_DEPTH);
        let custom = RecursionProfile::Custom {
            max_depth: 7,
            max_iterations: 42,
        };
        assert_eq!(custom.max_depth(), 7);
        assert_eq!(custom.max_iterations(), 42);
    }

    #[test]
    fn basic_enter_leave() {
        let mut guard = RecursionGuard::new(10, 100);
        assert_eq!(guard.enter(1u64), RecursionResult::Entered);
        assert_eq!(guard.depth(), 1);
        assert!(guard.is_visiting(&1));
        assert!(guard.is_active());

        guard.leave(1);
        assert_eq!(guard.depth(), 0);
        assert!(!guard.is_visiting(&1));
        assert!(!guard.is_active());
    }

    #[test]
    fn cycle_detected_on_same_key() {
        let mut guard = RecursionGuard::new(10, 100);
        assert_eq!(guard.enter((1u64, 0u64, 0usize)), RecursionResult::Entered);
        assert_eq!(guard.enter((1u64, 0u64, 0usize)), RecursionResult::Cycle);
        // Same type, different value: not a cycle.
        assert_eq!(guard.enter((1u64, 0u64, 8usize)), RecursionResult::Entered);
        assert_eq!(guard.depth(), 2);
        assert_eq!(guard.iterations(), 3);
        assert!(!guard.is_exceeded());

        guard.leave((1, 0, 8));
        guard.leave((1, 0, 0));
    }

    #[test]
    fn depth_exceeded_is_sticky() {
        let mut guard = RecursionGuard::new(1, 100);
        assert_eq!(guard.enter(1u32), RecursionResult::Entered);
        assert_eq!(guard.enter(2u32), RecursionResult::DepthExceeded);
        guard.leave(1);
        assert!(guard.is_exceeded());
        assert_eq!(guard.depth(), 0);
    }

    #[test]
    fn iteration_exceeded() {
        let mut guard = RecursionGuard::new(100, 3);
        for key in 1u32..=3 {
            assert_eq!(guard.enter(key), RecursionResult::Entered);
            guard.leave(key);
        }
        assert_eq!(guard.enter(4u32), RecursionResult::IterationExceeded);
        assert!(guard.is_exceeded());
    }

    #[test]
    fn visiting_limit_reports_depth() {
        let mut guard = RecursionGuard::new(100, 100).with_max_visiting(1);
        assert_eq!(guard.enter(1u32), RecursionResult::Entered);
        assert_eq!(guard.enter(2u32), RecursionResult::DepthExceeded);
        guard.leave(1);
    }

    #[test]
    fn scope_passes_guard_through() {
        let mut guard = RecursionGuard::new(10, 100);
        let nested = guard.scope(1u32, |g| g.scope(1u32, |_| ()).unwrap_err());
        assert_eq!(nested, Ok(RecursionResult::Cycle));
        assert!(!guard.is_active());
    }

    #[test]
    fn reset_clears_state() {
        let mut guard = RecursionGuard::new(1, 100);
        guard.enter(1u32);
        guard.enter(2u32);
        guard.leave(1);
        guard.reset();
        assert_eq!(guard.iterations(), 0);
        assert!(!guard.is_exceeded());
        assert_eq!(guard.max_depth(), 1);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "not in the visiting set")]
    fn leave_without_enter_panics() {
        let mut guard = RecursionGuard::<u32>::new(10, 100);
        guard.leave(1);
    }
}
