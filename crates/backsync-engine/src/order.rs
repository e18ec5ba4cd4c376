//! Deterministic ordering and renumbering of reconciled entries.

use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Ordinal placeholder substituted by [`renumber`].
pub const ORDINAL_TOKEN: &str = "{n}";

/// Composite sort key shared by the backlog flavors.
///
/// Orders by status bucket ascending (active entries before resolved
/// ones, regardless of timestamp), then timestamp descending, then
/// external ID descending as the final tiebreak.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryRank {
    /// 0 = active/in-progress, 1 = resolved/terminal.
    pub bucket: u8,
    /// Unix seconds; newer sorts first within a bucket.
    pub timestamp: i64,
    pub id: u64,
}

impl EntryRank {
    /// Rank that orders purely by descending ID.
    pub fn by_id(id: u64) -> Self {
        Self {
            bucket: 0,
            timestamp: 0,
            id,
        }
    }
}

impl Ord for EntryRank {
    fn cmp(&self, other: &Self) -> Ordering {
        self.bucket
            .cmp(&other.bucket)
            .then_with(|| other.timestamp.cmp(&self.timestamp))
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for EntryRank {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Sort the reconciled entries by the caller-supplied rank.
pub fn order_entries(
    entries: &BTreeMap<u64, String>,
    rank: impl Fn(u64, &str) -> EntryRank,
) -> Vec<String> {
    let mut ranked: Vec<(EntryRank, &String)> = entries
        .iter()
        .map(|(id, text)| (rank(*id, text), text))
        .collect();
    ranked.sort_by(|a, b| a.0.cmp(&b.0));
    ranked.into_iter().map(|(_, text)| text.clone()).collect()
}

/// Substitute the 1-based rank into each entry's ordinal placeholder.
///
/// Must run strictly after sorting so visible numbering always matches
/// list position with no gaps.
pub fn renumber(entries: Vec<String>) -> Vec<String> {
    entries
        .into_iter()
        .enumerate()
        .map(|(i, entry)| entry.replace(ORDINAL_TOKEN, &(i + 1).to_string()))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn entries_of(pairs: &[(u64, &str)]) -> BTreeMap<u64, String> {
        pairs.iter().map(|(k, v)| (*k, (*v).to_string())).collect()
    }

    #[test]
    fn active_bucket_sorts_before_resolved_regardless_of_timestamp() {
        let entries = entries_of(&[(1, "active-old"), (2, "resolved-new")]);
        let ordered = order_entries(&entries, |id, _| match id {
            1 => EntryRank {
                bucket: 0,
                timestamp: 100,
                id,
            },
            _ => EntryRank {
                bucket: 1,
                timestamp: 9_999,
                id,
            },
        });
        assert_eq!(ordered, vec!["active-old", "resolved-new"]);
    }

    #[test]
    fn newer_timestamp_sorts_first_within_bucket() {
        let entries = entries_of(&[(1, "old"), (2, "new")]);
        let ordered = order_entries(&entries, |id, _| EntryRank {
            bucket: 0,
            timestamp: if id == 2 { 200 } else { 100 },
            id,
        });
        assert_eq!(ordered, vec!["new", "old"]);
    }

    #[test]
    fn equal_keys_tiebreak_by_descending_id() {
        let entries = entries_of(&[(3, "three"), (11, "eleven"), (7, "seven")]);
        let ordered = order_entries(&entries, |id, _| EntryRank {
            bucket: 0,
            timestamp: 42,
            id,
        });
        assert_eq!(ordered, vec!["eleven", "seven", "three"]);
    }

    #[test]
    fn by_id_orders_descending() {
        let entries = entries_of(&[(5, "five"), (9, "nine"), (2, "two")]);
        let ordered = order_entries(&entries, |id, _| EntryRank::by_id(id));
        assert_eq!(ordered, vec!["nine", "five", "two"]);
    }

    #[test]
    fn renumber_is_contiguous_and_order_consistent() {
        let ordered = vec![
            "#### {n}. first".to_string(),
            "#### {n}. second".to_string(),
            "#### {n}. third".to_string(),
        ];
        let numbered = renumber(ordered);
        assert_eq!(
            numbered,
            vec!["#### 1. first", "#### 2. second", "#### 3. third"]
        );
    }

    #[test]
    fn renumber_of_empty_list_is_empty() {
        assert!(renumber(Vec::new()).is_empty());
    }

    #[test]
    fn renumber_leaves_token_free_entries_alone() {
        let numbered = renumber(vec!["#### #5 plain".to_string()]);
        assert_eq!(numbered, vec!["#### #5 plain"]);
    }
}
