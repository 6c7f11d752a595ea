//! Constraint algebra used by the checker's safety proofs (spec 3, 4.4, 9)
//!
//! A small value-type algebra over predicates attached to a variable
//! name: `Range`, `Nonzero`, `NotNull`, `Initialized`. Spec 9 names the
//! public surface a future abstract-interpretation rewrite must
//! preserve: `prove_range`, `prove_nonzero`, `prove_initialized`
//! (`prove_not_null` is the fourth, symmetric case).

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub min: i64,
    pub max: i64,
}

impl Range {
    pub fn new(min: i64, max: i64) -> Self {
        Range { min, max }
    }

    pub fn contains_span(&self, lo: i64, hi: i64) -> bool {
        self.min <= lo && hi <= self.max
    }

    /// Intersect two ranges for the same name, tightening both bounds.
    pub fn tighten(&self, other: Range) -> Range {
        Range {
            min: self.min.max(other.min),
            max: self.max.min(other.max),
        }
    }
}

/// Per-name predicate bundle. A name can simultaneously be known
/// `Range`-bounded, nonzero, not-null, and initialized; `Nonzero` is
/// implied by a `Range` excluding 0 but is tracked independently since
/// it can be learned directly (`x != 0`) without a full range.
#[derive(Debug, Clone, Default, PartialEq)]
struct Predicates {
    range: Option<Range>,
    nonzero: bool,
    not_null: bool,
    initialized: bool,
}

/// The constraint set active at one program point. Copy-on-branch-entry,
/// restore-on-branch-exit (spec 5): `Clone` gives the copy, and the
/// checker keeps the pre-branch value around to restore.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstraintSet {
    by_name: HashMap<String, Predicates>,
}

impl ConstraintSet {
    pub fn new() -> Self {
        ConstraintSet::default()
    }

    /// Add or merge a range constraint. Merging tightens `min`/`max`
    /// against any existing range (spec 3: "Add-with-merge on a range
    /// tightens min and max when an existing range is present;
    /// otherwise it appends").
    pub fn add_range(&mut self, name: &str, range: Range) {
        let p = self.by_name.entry(name.to_string()).or_default();
        p.range = Some(match p.range {
            Some(existing) => existing.tighten(range),
            None => range,
        });
    }

    pub fn add_nonzero(&mut self, name: &str) {
        self.by_name.entry(name.to_string()).or_default().nonzero = true;
    }

    pub fn add_not_null(&mut self, name: &str) {
        self.by_name.entry(name.to_string()).or_default().not_null = true;
    }

    pub fn add_initialized(&mut self, name: &str) {
        self.by_name.entry(name.to_string()).or_default().initialized = true;
    }

    /// Whether a proof exists that `name`'s value lies in `[lo, hi)`.
    pub fn prove_range(&self, name: &str, lo: i64, hi: i64) -> bool {
        self.by_name.get(name).and_then(|p| p.range).is_some_and(|r| r.contains_span(lo, hi))
    }

    pub fn prove_nonzero(&self, name: &str) -> bool {
        self.by_name.get(name).is_some_and(|p| p.nonzero || p.range.is_some_and(|r| r.min > 0 || r.max <= 0))
    }

    pub fn prove_not_null(&self, name: &str) -> bool {
        self.by_name.get(name).is_some_and(|p| p.not_null)
    }

    pub fn prove_initialized(&self, name: &str) -> bool {
        self.by_name.get(name).is_some_and(|p| p.initialized)
    }

    /// Merge constraints learned from `A && B` (spec 4.4: "`A && B`: add
    /// constraints from both"). `other`'s predicates win ties only by
    /// tightening, never by erasing what `self` already proved.
    pub fn merge(&mut self, other: &ConstraintSet) {
        for (name, preds) in &other.by_name {
            if let Some(r) = preds.range {
                self.add_range(name, r);
            }
            if preds.nonzero {
                self.add_nonzero(name);
            }
            if preds.not_null {
                self.add_not_null(name);
            }
            if preds.initialized {
                self.add_initialized(name);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_merge_tightens_bounds() {
        let mut cs = ConstraintSet::new();
        cs.add_range("i", Range::new(i64::MIN, 10));
        cs.add_range("i", Range::new(0, i64::MAX));
        assert!(cs.prove_range("i", 0, 10));
        assert!(!cs.prove_range("i", 0, 11));
    }

    #[test]
    fn nonzero_from_range_excluding_zero() {
        let mut cs = ConstraintSet::new();
        cs.add_range("y", Range::new(1, i64::MAX));
        assert!(cs.prove_nonzero("y"));
    }

    #[test]
    fn merge_unions_both_sides_constraints() {
        let mut a = ConstraintSet::new();
        a.add_nonzero("y");
        let mut b = ConstraintSet::new();
        b.add_range("x", Range::new(0, 4));
        a.merge(&b);
        assert!(a.prove_nonzero("y"));
        assert!(a.prove_range("x", 0, 4));
    }

    #[test]
    fn unknown_name_proves_nothing() {
        let cs = ConstraintSet::new();
        assert!(!cs.prove_range("z", 0, 1));
        assert!(!cs.prove_nonzero("z"));
        assert!(!cs.prove_initialized("z"));
    }
}
