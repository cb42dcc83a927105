use crate::aggregation::sorted_mean;
use crate::error::AnalysisError::EmptyDataset;
use crate::error::AnalysisResult;
use crate::record::{Architecture, BandwidthTier, Metric, ResultRecord};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DescriptiveStats {
    pub mean: f64,
    /// Sample standard deviation; 0.0 for a single value.
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

impl DescriptiveStats {
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let n = sorted.len();
        let mean = sorted_mean(&sorted);

        Some(DescriptiveStats {
            mean,
            std: sample_std(&sorted, mean),
            min: sorted[0],
            max: sorted[n - 1],
        })
    }
}

fn sample_std(
    values: &[f64],
    mean: f64,
) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let denominator = (n - 1) as f64;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / denominator;
    if variance.is_finite() {
        return variance.sqrt();
    }

    // squares overflowed: work on halved deviations scaled into [-1, 1]
    let deviations: Vec<f64> = values.iter().map(|v| v / 2.0 - mean / 2.0).collect();
    let scale = deviations.iter().fold(0.0_f64, |acc, d| acc.max(d.abs()));
    if scale == 0.0 {
        return 0.0;
    }
    let sum_of_squares: f64 = deviations.iter().map(|d| (d / scale).powi(2)).sum();
    2.0 * scale * (sum_of_squares / denominator).sqrt()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricStats {
    pub cpu_utilization: DescriptiveStats,
    pub latency: DescriptiveStats,
    pub tls: DescriptiveStats,
}

impl MetricStats {
    fn from_records(records: &[&ResultRecord]) -> Option<Self> {
        let column = |metric: Metric| -> Vec<f64> { records.iter().map(|r| metric.value(r)).collect() };
        Some(MetricStats {
            cpu_utilization: DescriptiveStats::from_values(&column(Metric::Cpu))?,
            latency: DescriptiveStats::from_values(&column(Metric::Latency))?,
            tls: DescriptiveStats::from_values(&column(Metric::Tls))?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchitectureStats {
    pub tests: usize,
    #[serde(flatten)]
    pub stats: MetricStats,
}

/// Contents of `summary_statistics.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryStatistics {
    pub total_tests: usize,
    pub architectures: Vec<Architecture>,
    pub viewer_counts: Vec<u32>,
    pub packet_loss_rates: Vec<f64>,
    pub bandwidth_limits: Vec<BandwidthTier>,
    pub overall_stats: MetricStats,
    pub architecture_comparison: BTreeMap<Architecture, ArchitectureStats>,
}

impl SummaryStatistics {
    pub fn build(records: &[ResultRecord]) -> AnalysisResult<Self> {
        let all: Vec<&ResultRecord> = records.iter().collect();
        let overall_stats = MetricStats::from_records(&all)
            .ok_or_else(|| EmptyDataset("summary statistics input".to_string()))?;

        let mut by_architecture: BTreeMap<Architecture, Vec<&ResultRecord>> = BTreeMap::new();
        for record in records {
            by_architecture
                .entry(record.architecture)
                .or_default()
                .push(record);
        }

        let architecture_comparison = by_architecture
            .iter()
            .filter_map(|(architecture, group)| {
                MetricStats::from_records(group).map(|stats| {
                    (
                        *architecture,
                        ArchitectureStats {
                            tests: group.len(),
                            stats,
                        },
                    )
                })
            })
            .collect();

        let viewer_counts: BTreeSet<u32> = records.iter().map(|r| r.num_viewers).collect();
        let loss_rates: BTreeSet<_> = records.iter().map(|r| r.packet_loss).collect();
        let bandwidth_limits: BTreeSet<BandwidthTier> = records.iter().map(|r| r.bandwidth).collect();

        Ok(SummaryStatistics {
            total_tests: records.len(),
            architectures: by_architecture.keys().copied().collect(),
            viewer_counts: viewer_counts.into_iter().collect(),
            packet_loss_rates: loss_rates.into_iter().map(|rate| rate.value()).collect(),
            bandwidth_limits: bandwidth_limits.into_iter().collect(),
            overall_stats,
            architecture_comparison,
        })
    }
}
