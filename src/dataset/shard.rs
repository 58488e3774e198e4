//! Shard planning: how many parquet files a split becomes and which records
//! land in each.
//!
//! The size used is the estimated in-memory Arrow footprint
//! ([`ExportRecord::estimated_size`]). Snappy-compressed parquet is usually
//! smaller, so the shard count is an upper bound and real shard sizes vary.

use crate::dataset::record::ExportRecord;
use crate::error::OcrError;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Outcome of sizing one split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShardPlan {
    /// Fits in one file: `<subset>-<split>.parquet`.
    Single,
    /// Needs `n` files: `<subset>-<split>-<i:05>-of-<n:05>.parquet`.
    Sharded(usize),
}

impl ShardPlan {
    pub fn shard_count(&self) -> usize {
        match self {
            ShardPlan::Single => 1,
            ShardPlan::Sharded(n) => *n,
        }
    }
}

/// Total estimated bytes of a group of records.
pub fn estimate_bytes(records: &[ExportRecord]) -> u64 {
    records.iter().map(ExportRecord::estimated_size).sum()
}

/// Decide the shard count for `estimated_bytes` of data.
///
/// At or below `max_shard_size_mb` is a single file. Above it the count is
/// `floor(size_mb / max) + 1`, so `max * k + ε` gives `k + 1` shards.
/// A limit that is not a positive finite number is
/// [`OcrError::InvalidConfig`].
pub fn plan_shards(estimated_bytes: u64, max_shard_size_mb: f64) -> Result<ShardPlan, OcrError> {
    if !(max_shard_size_mb > 0.0 && max_shard_size_mb.is_finite()) {
        return Err(OcrError::InvalidConfig(format!(
            "max_shard_size_mb must be positive, got {max_shard_size_mb}"
        )));
    }
    let size_mb = estimated_bytes as f64 / BYTES_PER_MB;
    if size_mb <= max_shard_size_mb {
        return Ok(ShardPlan::Single);
    }
    // `as usize` saturates for huge ratios.
    let whole = (size_mb / max_shard_size_mb).floor() as usize;
    Ok(ShardPlan::Sharded(whole.saturating_add(1)))
}

/// Split `records` into `shard_count` contiguous groups in record order.
///
/// All groups hold `len / shard_count` records except the last, which also
/// takes the remainder. The count is clamped to `1..=len` so no group is
/// ever empty (for a non-empty slice).
pub fn partition(records: &[ExportRecord], shard_count: usize) -> Vec<&[ExportRecord]> {
    if records.is_empty() {
        return Vec::new();
    }
    let count = shard_count.clamp(1, records.len());
    let size = records.len() / count;

    let mut groups = Vec::with_capacity(count);
    for i in 0..count {
        let start = i * size;
        let end = if i + 1 == count {
            records.len()
        } else {
            start + size
        };
        groups.push(&records[start..end]);
    }
    groups
}

/// File name for an unsharded split.
pub fn single_file_name(subset: &str, split: &str) -> String {
    format!("{subset}-{split}.parquet")
}

/// File name for shard `index` (0-based) of `count`.
pub fn shard_file_name(subset: &str, split: &str, index: usize, count: usize) -> String {
    format!("{subset}-{split}-{index:05}-of-{count:05}.parquet")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    const MB: u64 = 1024 * 1024;

    fn records(n: usize) -> Vec<ExportRecord> {
        (0..n)
            .map(|i| ExportRecord::from_relative(Path::new(&format!("f{i}.md")), "t".into()))
            .collect()
    }

    #[test]
    fn exactly_max_is_single() {
        assert_eq!(plan_shards(10 * MB, 10.0).unwrap(), ShardPlan::Single);
        assert_eq!(plan_shards(0, 10.0).unwrap(), ShardPlan::Single);
    }

    #[test]
    fn just_over_k_times_max_is_k_plus_one() {
        assert_eq!(plan_shards(10 * MB + 1, 10.0).unwrap(), ShardPlan::Sharded(2));
        assert_eq!(plan_shards(30 * MB + 1, 10.0).unwrap(), ShardPlan::Sharded(4));
        assert_eq!(plan_shards(25 * MB, 10.0).unwrap(), ShardPlan::Sharded(3));
    }

    #[test]
    fn exact_multiple_above_max_still_adds_one() {
        // floor(20/10) + 1
        assert_eq!(plan_shards(20 * MB, 10.0).unwrap(), ShardPlan::Sharded(3));
    }

    #[test]
    fn non_positive_limit_is_invalid_config() {
        for max in [0.0, -0.0, -5.0, f64::NAN, f64::INFINITY] {
            let result = plan_shards(1024, max);
            assert!(matches!(result, Err(OcrError::InvalidConfig(_))), "{max}");
        }
    }

    #[test]
    fn tiny_limit_saturates_instead_of_overflowing() {
        let plan = plan_shards(u64::MAX, f64::MIN_POSITIVE).unwrap();
        assert_eq!(plan, ShardPlan::Sharded(usize::MAX));
    }

    #[test]
    fn last_group_absorbs_remainder() {
        let rs = records(10);
        let groups = partition(&rs, 3);
        let sizes: Vec<usize> = groups.iter().map(|g| g.len()).collect();
        assert_eq!(sizes, vec![3, 3, 4]);
        assert_eq!(groups[0][0].id, "f0.md");
        assert_eq!(groups[2][3].id, "f9.md");
    }

    #[test]
    fn count_clamped_to_record_count() {
        let rs = records(2);
        let groups = partition(&rs, 5);
        assert_eq!(groups.len(), 2);
        assert!(groups.iter().all(|g| g.len() == 1));
        assert!(partition(&[], 3).is_empty());
    }

    #[test]
    fn names_are_zero_padded() {
        assert_eq!(single_file_name("hearings", "train"), "hearings-train.parquet");
        assert_eq!(
            shard_file_name("hearings", "train", 2, 12),
            "hearings-train-00002-of-00012.parquet"
        );
    }
}
