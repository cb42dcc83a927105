use crate::record::{Architecture, ResultRecord};
use std::collections::BTreeMap;

/// Composite key: architecture first, then one experimental dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupKey<X> {
    pub architecture: Architecture,
    pub dimension: X,
}

impl<X> GroupKey<X> {
    pub fn new(
        architecture: Architecture,
        dimension: X,
    ) -> Self {
        GroupKey {
            architecture,
            dimension,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupStats {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub count: usize,
}

impl GroupStats {
    fn from_values(mut values: Vec<f64>) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        // fixed summation order keeps the mean independent of input order
        values.sort_by(f64::total_cmp);
        let count = values.len();
        Some(GroupStats {
            mean: sorted_mean(&values),
            min: values[0],
            max: values[count - 1],
            count,
        })
    }
}

/// Mean of already sorted values. Falls back to summing `v / n` when the plain
/// sum of large finite values overflows.
pub(crate) fn sorted_mean(sorted: &[f64]) -> f64 {
    let n = sorted.len() as f64;
    let sum: f64 = sorted.iter().sum();
    if sum.is_finite() {
        sum / n
    } else {
        sorted.iter().map(|v| v / n).sum()
    }
}

/// Per-group statistics, enumerated in key order.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation<K: Ord> {
    groups: BTreeMap<K, GroupStats>,
}

impl<K: Ord> Aggregation<K> {
    pub fn get(
        &self,
        key: &K,
    ) -> Option<&GroupStats> {
        self.groups.get(key)
    }

    pub fn mean(
        &self,
        key: &K,
    ) -> Option<f64> {
        self.groups.get(key).map(|stats| stats.mean)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &GroupStats)> {
        self.groups.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.groups.keys()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Number of records that passed the filter.
    pub fn record_count(&self) -> usize {
        self.groups.values().map(|stats| stats.count).sum()
    }
}

impl<X: Ord + Copy> Aggregation<GroupKey<X>> {
    /// One ordered `(dimension, mean)` series per architecture.
    pub fn series(&self) -> BTreeMap<Architecture, Vec<(X, f64)>> {
        let mut series: BTreeMap<Architecture, Vec<(X, f64)>> = BTreeMap::new();
        for (key, stats) in &self.groups {
            series
                .entry(key.architecture)
                .or_default()
                .push((key.dimension, stats.mean));
        }
        series
    }

    /// Distinct dimension values across all architectures, in order.
    pub fn dimensions(&self) -> Vec<X> {
        let mut dimensions: Vec<X> = self.groups.keys().map(|key| key.dimension).collect();
        dimensions.sort();
        dimensions.dedup();
        dimensions
    }
}

/// Filters `records`, groups them by `key` and averages `value` per group.
///
/// Returns `None` when no record passes the filter, so callers never see a
/// group without data.
pub fn aggregate<'a, I, K, P, F, V>(
    records: I,
    filter: P,
    key: F,
    value: V,
) -> Option<Aggregation<K>>
where
    I: IntoIterator<Item = &'a ResultRecord>,
    K: Ord,
    P: Fn(&ResultRecord) -> bool,
    F: Fn(&ResultRecord) -> K,
    V: Fn(&ResultRecord) -> f64,
{
    let mut buckets: BTreeMap<K, Vec<f64>> = BTreeMap::new();
    for record in records.into_iter().filter(|record| filter(*record)) {
        buckets.entry(key(record)).or_default().push(value(record));
    }

    let groups: BTreeMap<K, GroupStats> = buckets
        .into_iter()
        .filter_map(|(key, values)| GroupStats::from_values(values).map(|stats| (key, stats)))
        .collect();

    if groups.is_empty() {
        None
    } else {
        Some(Aggregation { groups })
    }
}
