//! Partitioning an incoming batch across sibling regions.
//!
//! Each bucket is reconciled against its own region independently; a
//! record that changes bucket between runs migrates automatically because
//! the old bucket's pass no longer sees its ID.

use std::collections::BTreeMap;

/// Split `records` into buckets keyed by the classifier result.
///
/// Buckets for every classifier output actually seen are present; callers
/// that need a region synced even when its bucket came out empty should
/// seed the map with their known keys first.
pub fn bucket_records<R, K: Ord>(
    records: Vec<R>,
    classify: impl Fn(&R) -> K,
) -> BTreeMap<K, Vec<R>> {
    let mut buckets: BTreeMap<K, Vec<R>> = BTreeMap::new();
    for record in records {
        let key = classify(&record);
        buckets.entry(key).or_default().push(record);
    }
    buckets
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn records_land_in_their_own_buckets() {
        let records = vec![("feature", 1), ("bug", 2), ("feature", 3)];
        let buckets = bucket_records(records, |(kind, _)| (*kind).to_string());
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets["feature"], vec![("feature", 1), ("feature", 3)]);
        assert_eq!(buckets["bug"], vec![("bug", 2)]);
    }

    #[test]
    fn empty_input_yields_no_buckets() {
        let buckets = bucket_records(Vec::<i32>::new(), |_| 0u8);
        assert!(buckets.is_empty());
    }
}
