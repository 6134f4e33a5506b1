//! Centralized limits for descriptor resolution and value matching.
//!
//! Descriptor graphs may describe infinite types (`type A = A`,
//! `type A<T> = A<T[]>`). Cycle detection handles the cases where the same
//! descriptor is revisited; the limits below bound everything else.
//!
//! Recursion limits are expressed through
//! `rtti_core::recursion::RecursionProfile`, which reads its numbers from here
//! so that every guard in the workspace tunes from one place.

// =============================================================================
// Resolution
// =============================================================================

/// Maximum number of alias / generic hops `resolve_type` follows before it
/// gives up and reports the bottom type.
///
/// # TypeScript example
///
/// ```typescript
/// // Every hop produces a new, larger argument, so no descriptor repeats:
/// type Grow<T> = Grow<T[]>;
/// type Boom = Grow<string>; // resolves to `never` after 50 hops
/// ```
pub const MAX_RESOLUTION_DEPTH: u32 = 50;

// =============================================================================
// Value matching
// =============================================================================

/// Default maximum number of nested alias / generic hops on a single
/// matching path.
///
/// Each hop normally consumes one level of the value being matched, so the
/// limit doubles as the deepest recursive structure the matcher accepts by
/// default. Multi-hop generics (`type A<T> = B<T>`) spend one level per hop.
/// Callers matching deeper data raise it per call with
/// `MatchOptions::with_max_depth`; the matcher recurses on the native stack,
/// so very large limits need a thread with a matching stack size.
///
/// Only the nesting of one path counts. Sibling elements of a wide array
/// each start again from the same depth, and there is no limit on the
/// total number of hops one call performs.
///
/// # TypeScript example
///
/// ```typescript
/// type List = { value: number; next?: List };
/// // A 300-element linked list nests `List` 300 times: rejected by
/// // default, accepted with `with_max_depth(512)`.
/// ```
pub const MAX_MATCH_DEPTH: u32 = 256;

/// Maximum number of guarded entries alive at the same time.
pub const MAX_VISITING_ENTRIES: u32 = 10_000;

// =============================================================================
// Inheritance
// =============================================================================

/// Maximum depth of `extends` chains walked when collecting inherited
/// interface and class members.
///
/// Inheritance cycles (`interface A extends B`, `interface B extends A`) are
/// detected separately; this bounds very long but acyclic chains.
pub const MAX_INHERITANCE_DEPTH: u32 = 64;

/// Total number of declarations one `all_members` walk may visit.
///
/// Diamond-shaped `extends` graphs revisit shared ancestors once per path.
pub const MAX_INHERITANCE_ITERATIONS: u32 = 100_000;

// =============================================================================
// Diagnostics
// =============================================================================

/// Maximum number of diagnostic messages one match call appends to the
/// caller's error sink. Later failures are counted but not rendered.
pub const MAX_MATCH_DIAGNOSTICS: usize = 64;

/// Maximum nesting rendered by the descriptor formatter before eliding
/// the rest with `...`.
pub const MAX_FORMAT_DEPTH: u32 = 8;
