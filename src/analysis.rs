use crate::aggregation::{aggregate, Aggregation, GroupKey};
use crate::chart::{BarPlot, Chart, ChartData, LinePlot};
use crate::record::{BandwidthTier, LossRate, Metric, ResultRecord};
use std::fmt;

/// Viewer count the latency and legibility comparisons are pinned to.
pub const REFERENCE_VIEWERS: u32 = 5;

/// The three fixed comparisons drawn for every run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Analysis {
    CpuVsViewers,
    LatencyVsLoss,
    LegibilityVsBandwidth,
}

impl Analysis {
    pub const ALL: [Analysis; 3] = [
        Analysis::CpuVsViewers,
        Analysis::LatencyVsLoss,
        Analysis::LegibilityVsBandwidth,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            Analysis::CpuVsViewers => "cpu_utilization.png",
            Analysis::LatencyVsLoss => "latency_vs_loss.png",
            Analysis::LegibilityVsBandwidth => "tls_vs_bandwidth.png",
        }
    }

    /// Why the analysis can come up empty, for the skip warning.
    pub fn filter_description(self) -> String {
        match self {
            Analysis::CpuVsViewers => "0% packet loss".to_string(),
            Analysis::LatencyVsLoss => format!("{} viewers", REFERENCE_VIEWERS),
            Analysis::LegibilityVsBandwidth => {
                format!("{} viewers and 0% packet loss", REFERENCE_VIEWERS)
            }
        }
    }

    /// Builds the chart, or `None` when no record passes the filter.
    pub fn chart(
        self,
        records: &[ResultRecord],
    ) -> Option<Chart> {
        match self {
            Analysis::CpuVsViewers => cpu_vs_viewers(records).map(|agg| Chart {
                title: "Presenter CPU Utilization vs. Number of Viewers (0% Packet Loss)".to_string(),
                x_label: "Number of Viewers".to_string(),
                y_label: "CPU Utilization (%)".to_string(),
                data: ChartData::Lines(line_plots(&agg, |viewers: u32| viewers as f64)),
            }),
            Analysis::LatencyVsLoss => latency_vs_loss(records).map(|agg| Chart {
                title: format!(
                    "Glass-to-Glass Latency vs. Packet Loss Rate (N={} viewers)",
                    REFERENCE_VIEWERS
                ),
                x_label: "Packet Loss Rate (%)".to_string(),
                y_label: "Glass-to-Glass Latency (ms)".to_string(),
                data: ChartData::Lines(line_plots(&agg, LossRate::percent)),
            }),
            Analysis::LegibilityVsBandwidth => legibility_vs_bandwidth(records).map(|agg| Chart {
                title: format!(
                    "Text Legibility Score vs. Presenter Bandwidth (N={} viewers, 0% packet loss)",
                    REFERENCE_VIEWERS
                ),
                x_label: "Presenter Bandwidth".to_string(),
                y_label: "Text Legibility Score (Levenshtein Distance)".to_string(),
                data: bar_plots(&agg),
            }),
        }
    }
}

impl fmt::Display for Analysis {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let name = match self {
            Analysis::CpuVsViewers => "CPU utilization vs viewers",
            Analysis::LatencyVsLoss => "latency vs packet loss",
            Analysis::LegibilityVsBandwidth => "TLS vs bandwidth",
        };
        write!(f, "{}", name)
    }
}

/// Mean CPU per (architecture, viewers) at zero packet loss.
pub fn cpu_vs_viewers(records: &[ResultRecord]) -> Option<Aggregation<GroupKey<u32>>> {
    aggregate(
        records,
        |r| r.packet_loss == LossRate::ZERO,
        |r| GroupKey::new(r.architecture, r.num_viewers),
        |r| Metric::Cpu.value(r),
    )
}

/// Mean latency per (architecture, loss rate) at the reference viewer count.
pub fn latency_vs_loss(records: &[ResultRecord]) -> Option<Aggregation<GroupKey<LossRate>>> {
    aggregate(
        records,
        |r| r.num_viewers == REFERENCE_VIEWERS,
        |r| GroupKey::new(r.architecture, r.packet_loss),
        |r| Metric::Latency.value(r),
    )
}

/// Mean TLS per (architecture, bandwidth) at the reference viewer count and zero loss.
pub fn legibility_vs_bandwidth(
    records: &[ResultRecord]
) -> Option<Aggregation<GroupKey<BandwidthTier>>> {
    aggregate(
        records,
        |r| r.num_viewers == REFERENCE_VIEWERS && r.packet_loss == LossRate::ZERO,
        |r| GroupKey::new(r.architecture, r.bandwidth),
        |r| Metric::Tls.value(r),
    )
}

fn series_label(architecture: impl fmt::Display) -> String {
    format!("{} Architecture", architecture)
}

fn line_plots<X: Ord + Copy>(
    aggregation: &Aggregation<GroupKey<X>>,
    x_value: impl Fn(X) -> f64,
) -> Vec<LinePlot> {
    aggregation
        .series()
        .into_iter()
        .map(|(architecture, points)| LinePlot {
            label: series_label(architecture),
            points: points.into_iter().map(|(x, y)| (x_value(x), y)).collect(),
        })
        .collect()
}

fn bar_plots(aggregation: &Aggregation<GroupKey<BandwidthTier>>) -> ChartData {
    let tiers = aggregation.dimensions();
    let series = aggregation
        .series()
        .into_iter()
        .map(|(architecture, values)| BarPlot {
            label: series_label(architecture),
            values: tiers
                .iter()
                .map(|tier| {
                    values
                        .iter()
                        .find(|(t, _)| t == tier)
                        .map(|(_, mean)| *mean)
                })
                .collect(),
        })
        .collect();

    ChartData::Bars {
        categories: tiers.iter().map(|tier| tier.label()).collect(),
        series,
    }
}
