use std::time::Duration;

use indexmap::IndexMap;

use crate::data::Record;
use crate::types::{CanonicalKey, SourceId};

/// Counters reported by every pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PassStats {
    pub source: SourceId,
    /// Records read from the source.
    pub scanned: u64,
    /// Records that passed the pass's predicate.
    pub matched: u64,
    pub elapsed: Duration,
}

impl PassStats {
    /// Fraction of scanned records that matched.
    pub fn match_ratio(&self) -> f64 {
        if self.scanned == 0 {
            0.0
        } else {
            self.matched as f64 / self.scanned as f64
        }
    }
}

/// Size distribution of grouped extraction buckets.
#[derive(Clone, Debug, PartialEq)]
pub struct GroupSizeSummary {
    pub groups: usize,
    pub total: usize,
    pub min: usize,
    pub max: usize,
    pub mean: f64,
    /// Key of the largest bucket (first encountered on ties).
    pub largest_key: CanonicalKey,
}

/// Summarize bucket sizes; `None` when there are no buckets.
pub fn group_size_summary(groups: &IndexMap<CanonicalKey, Vec<Record>>) -> Option<GroupSizeSummary> {
    if groups.is_empty() {
        return None;
    }
    let total: usize = groups.values().map(Vec::len).sum();
    let mut min = usize::MAX;
    let mut largest: Option<(CanonicalKey, usize)> = None;
    for (key, bucket) in groups {
        min = min.min(bucket.len());
        if largest.is_none_or(|(_, size)| bucket.len() > size) {
            largest = Some((*key, bucket.len()));
        }
    }
    let (largest_key, max) = largest?;
    Some(GroupSizeSummary {
        groups: groups.len(),
        total,
        min,
        max,
        mean: total as f64 / groups.len() as f64,
        largest_key,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bucket(n: usize) -> Vec<Record> {
        (0..n)
            .map(|i| Record::from_pairs([("Id", i as i64)]))
            .collect()
    }

    #[test]
    fn summary_reports_bucket_spread() {
        let mut groups = IndexMap::new();
        groups.insert(5, bucket(1));
        groups.insert(7, bucket(4));
        groups.insert(9, bucket(4));
        let summary = group_size_summary(&groups).expect("summary");
        assert_eq!(summary.groups, 3);
        assert_eq!(summary.total, 9);
        assert_eq!(summary.min, 1);
        assert_eq!(summary.max, 4);
        assert_eq!(summary.largest_key, 7);
        assert!((summary.mean - 3.0).abs() < 1e-9);
    }

    #[test]
    fn summary_of_no_groups_is_none() {
        assert!(group_size_summary(&IndexMap::new()).is_none());
    }

    #[test]
    fn match_ratio_handles_empty_pass() {
        let stats = PassStats::default();
        assert_eq!(stats.match_ratio(), 0.0);
        let stats = PassStats {
            scanned: 4,
            matched: 1,
            ..PassStats::default()
        };
        assert!((stats.match_ratio() - 0.25).abs() < 1e-9);
    }
}
