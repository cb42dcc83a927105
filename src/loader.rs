use crate::error::AnalysisError::{EmptyDataset, MalformedField, MissingInput, UnsupportedInput};
use crate::error::AnalysisResult;
use crate::record::{
    Architecture, BandwidthTier, CpuMetrics, LatencyMetrics, LossRate, Metrics, ResultRecord,
    TlsMetrics,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, warn};

pub const CSV_FILE_NAME: &str = "results.csv";
pub const JSON_FILE_NAME: &str = "results.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    Csv(PathBuf),
    Json(PathBuf),
}

impl InputSource {
    /// Looks for `results.csv`, then `results.json`, inside `results_dir`.
    pub fn locate(results_dir: &Path) -> AnalysisResult<Self> {
        let csv_file = results_dir.join(CSV_FILE_NAME);
        let json_file = results_dir.join(JSON_FILE_NAME);

        if csv_file.is_file() {
            Ok(InputSource::Csv(csv_file))
        } else if json_file.is_file() {
            Ok(InputSource::Json(json_file))
        } else {
            Err(MissingInput(results_dir.to_path_buf()))
        }
    }

    pub fn from_path(path: &Path) -> AnalysisResult<Self> {
        if !path.is_file() {
            return Err(MissingInput(path.to_path_buf()));
        }
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .as_deref()
        {
            Some("csv") => Ok(InputSource::Csv(path.to_path_buf())),
            Some("json") => Ok(InputSource::Json(path.to_path_buf())),
            _ => Err(UnsupportedInput(path.to_path_buf())),
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            InputSource::Csv(path) | InputSource::Json(path) => path,
        }
    }
}

impl fmt::Display for InputSource {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            InputSource::Csv(path) => write!(f, "CSV data from {}", path.display()),
            InputSource::Json(path) => write!(f, "JSON data from {}", path.display()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadedDataset {
    pub source: InputSource,
    pub records: Vec<ResultRecord>,
    /// Failed runs and runs without metrics.
    pub excluded: usize,
}

/// One row of `results.csv`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvRow {
    pub test_id: u64,
    pub architecture: String,
    pub num_viewers: u32,
    pub packet_loss: f64,
    pub bandwidth: String,
    #[serde(default, deserialize_with = "lenient::opt_bool")]
    pub success: Option<bool>,
    // Metric cells stay raw until the row is known to be usable; failed runs
    // often leave them blank.
    #[serde(default)]
    pub avg_latency: Option<String>,
    #[serde(default)]
    pub min_latency: Option<String>,
    #[serde(default)]
    pub max_latency: Option<String>,
    #[serde(default)]
    pub avg_cpu: Option<String>,
    #[serde(default)]
    pub max_cpu: Option<String>,
    #[serde(default)]
    pub avg_tls: Option<String>,
    #[serde(default)]
    pub min_tls: Option<String>,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

impl CsvRow {
    fn metric_cells(&self) -> [(&'static str, Option<&str>); 7] {
        [
            ("avgLatency", self.avg_latency.as_deref()),
            ("minLatency", self.min_latency.as_deref()),
            ("maxLatency", self.max_latency.as_deref()),
            ("avgCpu", self.avg_cpu.as_deref()),
            ("maxCpu", self.max_cpu.as_deref()),
            ("avgTls", self.avg_tls.as_deref()),
            ("minTls", self.min_tls.as_deref()),
        ]
    }
}

/// Top level of `results.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultsDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    pub results: Vec<JsonResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonResult {
    #[serde(deserialize_with = "lenient::u64")]
    pub test_id: u64,
    pub architecture: String,
    #[serde(deserialize_with = "lenient::u32")]
    pub num_viewers: u32,
    #[serde(deserialize_with = "lenient::f64")]
    pub packet_loss: f64,
    pub bandwidth: String,
    #[serde(default, deserialize_with = "lenient::bool")]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_i64", skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_i64", skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<ResultMetrics>,
}

impl JsonResult {
    pub fn complete_metrics(&self) -> Option<&JsonMetrics> {
        match &self.metrics {
            Some(ResultMetrics::Complete(metrics)) => Some(metrics),
            _ => None,
        }
    }
}

/// The `metrics` block of a result. Blocks that do not parse are kept as raw
/// JSON and only rejected when the run itself succeeded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResultMetrics {
    Complete(JsonMetrics),
    Partial(serde_json::Value),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonMetrics {
    pub latency: JsonLatency,
    pub cpu: JsonCpu,
    pub tls: JsonTls,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonLatency {
    #[serde(deserialize_with = "lenient::f64")]
    pub average: f64,
    #[serde(deserialize_with = "lenient::f64")]
    pub min: f64,
    #[serde(deserialize_with = "lenient::f64")]
    pub max: f64,
    #[serde(default, deserialize_with = "lenient::opt_f64", skip_serializing_if = "Option::is_none")]
    pub median: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_u64", skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonCpu {
    #[serde(deserialize_with = "lenient::f64")]
    pub average: f64,
    #[serde(default, deserialize_with = "lenient::opt_f64", skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(deserialize_with = "lenient::f64")]
    pub max: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonTls {
    #[serde(deserialize_with = "lenient::f64")]
    pub average: f64,
    #[serde(deserialize_with = "lenient::f64")]
    pub min: f64,
    #[serde(default, deserialize_with = "lenient::opt_f64", skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

pub fn load(source: &InputSource) -> AnalysisResult<LoadedDataset> {
    info!("Loading {}", source);
    let (records, excluded) = match source {
        InputSource::Csv(path) => {
            let file = File::open(path)?;
            let rows = read_csv(file)?;
            records_from_csv(rows)?
        }
        InputSource::Json(path) => {
            let file = File::open(path)?;
            let document: ResultsDocument = serde_json::from_reader(BufReader::new(file))?;
            records_from_json(document.results)?
        }
    };

    if excluded > 0 {
        warn!(
            "Excluded {} failed or metric-less test results from {}",
            excluded,
            source.path().display()
        );
    }
    if records.is_empty() {
        return Err(EmptyDataset(source.path().display().to_string()));
    }
    info!("Loaded {} test results", records.len());

    Ok(LoadedDataset {
        source: source.clone(),
        records,
        excluded,
    })
}

pub fn read_csv<R: std::io::Read>(reader: R) -> AnalysisResult<Vec<CsvRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut rows = Vec::new();
    for row in rdr.deserialize::<CsvRow>() {
        rows.push(row?);
    }
    Ok(rows)
}

/// Returns the usable records and how many rows were excluded.
pub fn records_from_csv(rows: Vec<CsvRow>) -> AnalysisResult<(Vec<ResultRecord>, usize)> {
    let mut records = Vec::with_capacity(rows.len());
    let mut excluded = 0;
    for row in rows {
        let cells = row.metric_cells();
        if row.success == Some(false) || cells.iter().all(|(_, cell)| cell.is_none()) {
            excluded += 1;
            continue;
        }

        let mut values = [0.0; 7];
        for (slot, (field, cell)) in values.iter_mut().zip(cells) {
            let raw = cell.unwrap_or_default();
            *slot = raw.parse::<f64>().map_err(|_| MalformedField {
                test_id: row.test_id,
                field,
                value: raw.to_string(),
            })?;
        }
        let [avg_latency, min_latency, max_latency, avg_cpu, max_cpu, avg_tls, min_tls] = values;

        let metrics = Metrics {
            latency: LatencyMetrics {
                average: avg_latency,
                min: min_latency,
                max: max_latency,
                median: None,
                count: None,
            },
            cpu: CpuMetrics {
                average: avg_cpu,
                min: None,
                max: max_cpu,
            },
            tls: TlsMetrics {
                average: avg_tls,
                min: min_tls,
                max: None,
            },
        };
        records.push(build_record(
            row.test_id,
            &row.architecture,
            row.num_viewers,
            row.packet_loss,
            &row.bandwidth,
            row.timestamp,
            metrics,
        )?);
    }
    Ok((records, excluded))
}

/// Returns the usable records and how many results were excluded.
pub fn records_from_json(results: Vec<JsonResult>) -> AnalysisResult<(Vec<ResultRecord>, usize)> {
    let mut records = Vec::with_capacity(results.len());
    let mut excluded = 0;
    for result in results {
        let metrics = match (result.success, result.metrics) {
            (true, Some(ResultMetrics::Complete(metrics))) => metrics,
            (true, Some(ResultMetrics::Partial(raw))) => {
                match serde_json::from_value::<JsonMetrics>(raw) {
                    Ok(metrics) => metrics,
                    Err(e) => {
                        return Err(MalformedField {
                            test_id: result.test_id,
                            field: "metrics",
                            value: e.to_string(),
                        })
                    }
                }
            }
            _ => {
                excluded += 1;
                continue;
            }
        };
        let metrics = Metrics {
            latency: LatencyMetrics {
                average: metrics.latency.average,
                min: metrics.latency.min,
                max: metrics.latency.max,
                median: metrics.latency.median,
                count: metrics.latency.count,
            },
            cpu: CpuMetrics {
                average: metrics.cpu.average,
                min: metrics.cpu.min,
                max: metrics.cpu.max,
            },
            tls: TlsMetrics {
                average: metrics.tls.average,
                min: metrics.tls.min,
                max: metrics.tls.max,
            },
        };
        records.push(build_record(
            result.test_id,
            &result.architecture,
            result.num_viewers,
            result.packet_loss,
            &result.bandwidth,
            result.timestamp,
            metrics,
        )?);
    }
    Ok((records, excluded))
}

fn build_record(
    test_id: u64,
    architecture: &str,
    num_viewers: u32,
    packet_loss: f64,
    bandwidth: &str,
    timestamp: Option<i64>,
    metrics: Metrics,
) -> AnalysisResult<ResultRecord> {
    let malformed = |field: &'static str, value: String| MalformedField {
        test_id,
        field,
        value,
    };

    let architecture = Architecture::from_str(architecture.trim())
        .map_err(|_| malformed("architecture", architecture.to_string()))?;
    let bandwidth = BandwidthTier::from_str(bandwidth.trim())
        .map_err(|_| malformed("bandwidth", bandwidth.to_string()))?;
    let packet_loss =
        LossRate::new(packet_loss).ok_or_else(|| malformed("packetLoss", packet_loss.to_string()))?;
    if num_viewers == 0 {
        return Err(malformed("numViewers", num_viewers.to_string()));
    }

    let values = [
        ("latency.average", Some(metrics.latency.average)),
        ("latency.min", Some(metrics.latency.min)),
        ("latency.max", Some(metrics.latency.max)),
        ("latency.median", metrics.latency.median),
        ("cpu.average", Some(metrics.cpu.average)),
        ("cpu.min", metrics.cpu.min),
        ("cpu.max", Some(metrics.cpu.max)),
        ("tls.average", Some(metrics.tls.average)),
        ("tls.min", Some(metrics.tls.min)),
        ("tls.max", metrics.tls.max),
    ];
    // latency, CPU share and TLS distance are all non-negative quantities
    if let Some((field, value)) = values
        .iter()
        .filter_map(|&(field, value)| value.map(|v| (field, v)))
        .find(|(_, v)| !v.is_finite() || *v < 0.0)
    {
        return Err(malformed(field, value.to_string()));
    }

    Ok(ResultRecord {
        test_id,
        architecture,
        num_viewers,
        packet_loss,
        bandwidth,
        timestamp,
        metrics,
    })
}

/// Deserializers accepting either a JSON number or a numeric string.
mod lenient {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Bool(bool),
        Integer(u64),
        Signed(i64),
        Float(f64),
        Text(String),
    }

    impl Scalar {
        fn into_f64<E: Error>(self) -> Result<f64, E> {
            match self {
                Scalar::Integer(v) => Ok(v as f64),
                Scalar::Signed(v) => Ok(v as f64),
                Scalar::Float(v) => Ok(v),
                Scalar::Text(s) => s
                    .trim()
                    .parse::<f64>()
                    .map_err(|_| E::custom(format!("expected a number, found {:?}", s))),
                Scalar::Bool(b) => Err(E::custom(format!("expected a number, found {}", b))),
            }
        }

        fn into_i64<E: Error>(self) -> Result<i64, E> {
            match self {
                Scalar::Integer(v) => {
                    i64::try_from(v).map_err(|_| E::custom(format!("{} out of range", v)))
                }
                Scalar::Signed(v) => Ok(v),
                other => {
                    let v = other.into_f64::<E>()?;
                    if v.fract() == 0.0 && v.abs() < i64::MAX as f64 {
                        Ok(v as i64)
                    } else {
                        Err(E::custom(format!("expected an integer, found {}", v)))
                    }
                }
            }
        }

        fn into_u64<E: Error>(self) -> Result<u64, E> {
            let v = self.into_i64::<E>()?;
            u64::try_from(v).map_err(|_| E::custom(format!("expected a non-negative integer, found {}", v)))
        }

        fn into_bool<E: Error>(self) -> Result<bool, E> {
            match self {
                Scalar::Bool(b) => Ok(b),
                Scalar::Integer(1) => Ok(true),
                Scalar::Integer(0) => Ok(false),
                Scalar::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                    "true" | "1" | "yes" => Ok(true),
                    "false" | "0" | "no" => Ok(false),
                    _ => Err(E::custom(format!("expected a boolean, found {:?}", s))),
                },
                _ => Err(E::custom("expected a boolean")),
            }
        }
    }

    pub fn f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Scalar::deserialize(deserializer)?.into_f64()
    }

    pub fn u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        Scalar::deserialize(deserializer)?.into_u64()
    }

    pub fn u32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
        let v = Scalar::deserialize(deserializer)?.into_u64::<D::Error>()?;
        u32::try_from(v).map_err(|_| D::Error::custom(format!("{} out of range", v)))
    }

    pub fn bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        Scalar::deserialize(deserializer)?.into_bool()
    }

    pub fn opt_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
        Option::<Scalar>::deserialize(deserializer)?
            .map(Scalar::into_bool)
            .transpose()
    }

    pub fn opt_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
        Option::<Scalar>::deserialize(deserializer)?
            .map(Scalar::into_f64)
            .transpose()
    }

    pub fn opt_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
        Option::<Scalar>::deserialize(deserializer)?
            .map(Scalar::into_u64)
            .transpose()
    }

    pub fn opt_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
        Option::<Scalar>::deserialize(deserializer)?
            .map(Scalar::into_i64)
            .transpose()
    }
}
