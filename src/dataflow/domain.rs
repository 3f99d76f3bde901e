//! The abstract value domain trait.
//!
//! A domain defines the lattice of abstract values an analysis computes over:
//! a least element, a greatest element, a join, and the partial order the join
//! induces. The engine relies on these being well-behaved; the laws below are
//! what guarantees the fixpoint iteration terminates.
//!
//! # Lattice Laws
//!
//! For all values `a`, `b`, `c` of one domain instance:
//!
//! - `merge(a, b) == merge(b, a)` (commutative)
//! - `merge(merge(a, b), c) == merge(a, merge(b, c))` (associative)
//! - `merge(a, a) == a` (idempotent)
//! - `compare(a, merge(a, b)) <= 0` (merge climbs the order)
//! - `merge(a, bottom()) == a` and `merge(a, unknown()) == unknown()`
//!
//! These laws are invariants of the domain implementation, independent of the
//! engine, and are exercised by the domain's own tests rather than asserted
//! in release builds.

use std::{cmp::Ordering, fmt};

/// A lattice of abstract values, as consumed by the data flow engine.
///
/// Values must be cheap to clone and structurally comparable; they are never
/// identity-compared. Callers must not mix values produced by different
/// domain instances.
///
/// The two bounds have fixed meanings across all analyses:
///
/// - [`bottom`](Self::bottom) is the least element, representing "unreached" /
///   no information yet. It is the merge identity.
/// - [`unknown`](Self::unknown) is the greatest element, representing "no
///   useful information can be recovered". It absorbs in merges.
pub trait AbstractValueDomain {
    /// The abstract value type of this domain.
    type Value: Clone + Eq + fmt::Debug;

    /// Returns the least element of the lattice.
    fn bottom(&self) -> Self::Value;

    /// Returns the greatest element of the lattice.
    fn unknown(&self) -> Self::Value;

    /// Joins two values, producing their least upper bound.
    fn merge(&self, lhs: &Self::Value, rhs: &Self::Value) -> Self::Value;

    /// Compares two values in the partial order induced by [`merge`](Self::merge).
    ///
    /// Returns `Some(Ordering::Less)` when `lhs` carries strictly more precise
    /// information than `rhs` (i.e. `merge(lhs, rhs) == rhs`), and `None` when
    /// the values are incomparable.
    fn compare(&self, lhs: &Self::Value, rhs: &Self::Value) -> Option<Ordering>;

    /// Decides whether a value flowing around a loop must be widened.
    ///
    /// Called during back-edge merges for every entity present on both the
    /// forward and the loop-closing edge. Returning `Some(widened)` replaces
    /// both edge values with `widened` before the ordinary merge, which is how
    /// a domain with structurally unequal values of equal "kind" (two
    /// different literal sets, say) is forced to climb toward
    /// [`unknown`](Self::unknown) instead of oscillating forever.
    ///
    /// The default implementation never widens, which is correct for domains
    /// whose chains are finite on their own.
    fn widen_on_back_edge(
        &self,
        forward: &Self::Value,
        back: &Self::Value,
    ) -> Option<Self::Value> {
        let _ = (forward, back);
        None
    }
}
