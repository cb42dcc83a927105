use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use strum_macros::{Display, EnumIter, EnumString};

/// Screen-sharing delivery architecture under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString, EnumIter)]
#[strum(ascii_case_insensitive)]
pub enum Architecture {
    #[strum(serialize = "P2P")]
    P2p,
    #[strum(serialize = "SFU")]
    Sfu,
}

/// Presenter uplink limit. Ordered by bit-rate, not by label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(ascii_case_insensitive)]
pub enum BandwidthTier {
    #[strum(serialize = "1mbit")]
    OneMbit,
    #[strum(serialize = "2mbit")]
    TwoMbit,
    #[strum(serialize = "5mbit")]
    FiveMbit,
}

impl BandwidthTier {
    pub fn kbit_per_second(self) -> u32 {
        match self {
            BandwidthTier::OneMbit => 1_000,
            BandwidthTier::TwoMbit => 2_000,
            BandwidthTier::FiveMbit => 5_000,
        }
    }

    /// Axis label, e.g. "2 Mbps".
    pub fn label(self) -> String {
        format!("{} Mbps", self.kbit_per_second() / 1_000)
    }
}

impl Ord for BandwidthTier {
    fn cmp(
        &self,
        other: &Self,
    ) -> Ordering {
        self.kbit_per_second().cmp(&other.kbit_per_second())
    }
}

impl PartialOrd for BandwidthTier {
    fn partial_cmp(
        &self,
        other: &Self,
    ) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

macro_rules! label_serde {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(
                &self,
                serializer: S,
            ) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let label = String::deserialize(deserializer)?;
                <$ty>::from_str(label.trim()).map_err(|_| {
                    D::Error::custom(format!(
                        "unknown {} label: {}",
                        stringify!($ty),
                        label
                    ))
                })
            }
        }
    };
}

label_serde!(Architecture);
label_serde!(BandwidthTier);

/// Packet-loss rate in `[0, 1]`, totally ordered so it can key a map.
#[derive(Debug, Clone, Copy)]
pub struct LossRate(f64);

impl LossRate {
    pub const ZERO: LossRate = LossRate(0.0);

    pub fn new(rate: f64) -> Option<Self> {
        if rate.is_finite() && (0.0..=1.0).contains(&rate) {
            // collapse -0.0 so it groups with 0.0
            Some(LossRate(rate + 0.0))
        } else {
            None
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn percent(self) -> f64 {
        self.0 * 100.0
    }
}

impl PartialEq for LossRate {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for LossRate {}

impl Ord for LossRate {
    fn cmp(
        &self,
        other: &Self,
    ) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl PartialOrd for LossRate {
    fn partial_cmp(
        &self,
        other: &Self,
    ) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for LossRate {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}%", self.percent())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LatencyMetrics {
    pub average: f64,
    pub min: f64,
    pub max: f64,
    pub median: Option<f64>,
    pub count: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CpuMetrics {
    pub average: f64,
    pub min: Option<f64>,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TlsMetrics {
    pub average: f64,
    pub min: f64,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub latency: LatencyMetrics,
    pub cpu: CpuMetrics,
    pub tls: TlsMetrics,
}

/// One successful test run. Failed runs never become a `ResultRecord`.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRecord {
    pub test_id: u64,
    pub architecture: Architecture,
    pub num_viewers: u32,
    pub packet_loss: LossRate,
    pub bandwidth: BandwidthTier,
    pub timestamp: Option<i64>,
    pub metrics: Metrics,
}

/// The numeric fields the charts and the summary are computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Cpu,
    Latency,
    Tls,
}

impl Metric {
    pub fn value(
        self,
        record: &ResultRecord,
    ) -> f64 {
        match self {
            Metric::Cpu => record.metrics.cpu.average,
            Metric::Latency => record.metrics.latency.average,
            Metric::Tls => record.metrics.tls.average,
        }
    }
}
