//! Reconciliation of an existing entry map against an incoming batch.
//!
//! Full-replace-by-batch: the result contains exactly the qualifying
//! records of the incoming batch, so an ID absent from the batch is
//! treated as deleted, not merely unseen. Callers must hand in a complete
//! batch for the scope being synced.

use std::collections::{BTreeMap, BTreeSet};

/// Per-run entry counts for one region.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileCounts {
    pub inserted: usize,
    pub updated: usize,
    pub removed: usize,
    pub unchanged: usize,
    /// Records or entries without a parsable ID, skipped non-fatally.
    pub skipped: usize,
}

impl ReconcileCounts {
    /// Whether the run altered the entry set at all.
    pub fn changed(&self) -> bool {
        self.inserted + self.updated + self.removed > 0
    }

    pub fn absorb(&mut self, other: &ReconcileCounts) {
        self.inserted += other.inserted;
        self.updated += other.updated;
        self.removed += other.removed;
        self.unchanged += other.unchanged;
        self.skipped += other.skipped;
    }
}

impl std::fmt::Display for ReconcileCounts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "inserted={} updated={} removed={} unchanged={}",
            self.inserted, self.updated, self.removed, self.unchanged
        )?;
        if self.skipped > 0 {
            write!(f, " skipped={}", self.skipped)?;
        }
        Ok(())
    }
}

/// Compute the new ID → entry map from `existing` and an incoming batch.
///
/// For each record: an unparsable ID skips the record; a false predicate
/// guarantees its ID is absent from the result (removed if it was
/// present); otherwise the record is rendered and compared structurally
/// against the existing entry — equal keeps the existing bytes, different
/// replaces, absent inserts. Existing IDs never visited by the pass are
/// dropped.
pub fn reconcile<R>(
    existing: &BTreeMap<u64, String>,
    incoming: &[R],
    id_of: impl Fn(&R) -> Option<u64>,
    include: impl Fn(&R) -> bool,
    render: impl Fn(&R) -> String,
) -> (BTreeMap<u64, String>, ReconcileCounts) {
    let mut result: BTreeMap<u64, String> = BTreeMap::new();
    let mut counts = ReconcileCounts::default();
    let mut visited: BTreeSet<u64> = BTreeSet::new();

    for record in incoming {
        let Some(id) = id_of(record) else {
            counts.skipped += 1;
            continue;
        };
        let repeat = !visited.insert(id);

        if !include(record) {
            if result.remove(&id).is_none() && existing.contains_key(&id) && !repeat {
                counts.removed += 1;
            }
            continue;
        }

        let rendered = render(record);
        if repeat {
            // Duplicate ID within one batch: last record wins, no recount.
            result.insert(id, rendered);
            continue;
        }
        match existing.get(&id) {
            None => {
                counts.inserted += 1;
                result.insert(id, rendered);
            }
            Some(old) if normalized_eq(old, &rendered) => {
                counts.unchanged += 1;
                result.insert(id, old.clone());
            }
            Some(_) => {
                counts.updated += 1;
                result.insert(id, rendered);
            }
        }
    }

    for id in existing.keys() {
        if !visited.contains(id) {
            counts.removed += 1;
        }
    }

    (result, counts)
}

/// Structural text comparison: per-line trailing whitespace and trailing
/// blank lines are ignored, everything else must match exactly.
pub fn normalized_eq(a: &str, b: &str) -> bool {
    normalized_lines(a) == normalized_lines(b)
}

fn normalized_lines(text: &str) -> Vec<&str> {
    let mut lines: Vec<&str> = text.lines().map(str::trim_end).collect();
    while lines.last() == Some(&"") {
        lines.pop();
    }
    lines
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
