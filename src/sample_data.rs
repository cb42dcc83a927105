use crate::error::AnalysisResult;
use crate::loader::{
    CsvRow, JsonCpu, JsonLatency, JsonMetrics, JsonResult, JsonTls, ResultMetrics,
    ResultsDocument, CSV_FILE_NAME, JSON_FILE_NAME,
};
use crate::record::{Architecture, BandwidthTier};
use crate::utils::{create_directory_if_not_exists, format_number, write_to_file};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs::File;
use std::path::{Path, PathBuf};
use strum::IntoEnumIterator;
use tracing::info;

pub const VIEWER_COUNTS: [u32; 8] = [1, 2, 3, 4, 5, 8, 10, 15];
pub const PACKET_LOSS_RATES: [f64; 5] = [0.0, 0.01, 0.02, 0.05, 0.10];
pub const BANDWIDTH_LIMITS: [BandwidthTier; 3] = [
    BandwidthTier::FiveMbit,
    BandwidthTier::TwoMbit,
    BandwidthTier::OneMbit,
];

const BASE_TIMESTAMP_MS: i64 = 1_700_000_000_000;
const TEST_SPACING_MS: i64 = 60_000;

#[derive(Debug, Clone)]
pub struct SampleFiles {
    pub json: PathBuf,
    pub csv: PathBuf,
    pub total: usize,
}

pub fn rng_from_seed(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// One successful result per point of the architecture × viewers × loss ×
/// bandwidth grid.
pub fn generate_results<R: Rng>(rng: &mut R) -> Vec<JsonResult> {
    let mut results = Vec::new();
    let mut test_id = 1u64;

    for architecture in Architecture::iter() {
        for &viewers in &VIEWER_COUNTS {
            for &packet_loss in &PACKET_LOSS_RATES {
                for &bandwidth in &BANDWIDTH_LIMITS {
                    let metrics = simulate_metrics(rng, architecture, viewers, packet_loss, bandwidth);
                    let timestamp = BASE_TIMESTAMP_MS + test_id as i64 * TEST_SPACING_MS;
                    results.push(JsonResult {
                        test_id,
                        architecture: architecture.to_string().to_lowercase(),
                        num_viewers: viewers,
                        packet_loss,
                        bandwidth: bandwidth.to_string(),
                        success: true,
                        session_id: Some(format!("test-{}-sample", test_id)),
                        timestamp: Some(timestamp),
                        completed_at: Some(timestamp + TEST_SPACING_MS),
                        metrics: Some(ResultMetrics::Complete(metrics)),
                    });
                    test_id += 1;
                }
            }
        }
    }

    results
}

fn simulate_metrics<R: Rng>(
    rng: &mut R,
    architecture: Architecture,
    viewers: u32,
    packet_loss: f64,
    bandwidth: BandwidthTier,
) -> JsonMetrics {
    let viewers_f = viewers as f64;

    // P2P uploads one stream per viewer; the SFU fans out server side
    let (avg_cpu, max_cpu) = match architecture {
        Architecture::P2p => {
            let avg = (15.0 + (viewers_f - 1.0) * 8.0) * rng.gen_range(0.8..1.2);
            (avg, avg * rng.gen_range(1.2..1.5))
        }
        Architecture::Sfu => {
            let avg = (25.0 + viewers_f * 2.0) * rng.gen_range(0.8..1.2);
            (avg, avg * rng.gen_range(1.1..1.3))
        }
    };

    let (base_latency, viewer_latency) = match architecture {
        Architecture::P2p => (50.0, viewers_f * 2.0),
        Architecture::Sfu => (80.0, viewers_f * 0.5),
    };
    let bandwidth_latency = match bandwidth {
        BandwidthTier::FiveMbit => 0.0,
        BandwidthTier::TwoMbit => 10.0,
        BandwidthTier::OneMbit => 25.0,
    };
    let avg_latency = (base_latency + packet_loss * 200.0 + bandwidth_latency + viewer_latency)
        * rng.gen_range(0.8..1.2);

    let base_tls = match bandwidth {
        BandwidthTier::FiveMbit => 0.05,
        BandwidthTier::TwoMbit => 0.12,
        BandwidthTier::OneMbit => 0.25,
    };
    let architecture_tls = match architecture {
        Architecture::P2p => 0.02,
        Architecture::Sfu => 0.01,
    };
    let avg_tls = (base_tls + packet_loss * 0.3 + architecture_tls) * rng.gen_range(0.7..1.3);

    JsonMetrics {
        latency: JsonLatency {
            average: avg_latency,
            min: avg_latency * rng.gen_range(0.6..0.8),
            max: avg_latency * rng.gen_range(1.3..1.8),
            median: Some(avg_latency * rng.gen_range(0.9..1.1)),
            count: Some(rng.gen_range(100..=120)),
        },
        cpu: JsonCpu {
            average: avg_cpu,
            min: Some(avg_cpu * 0.3),
            max: max_cpu,
        },
        tls: JsonTls {
            average: avg_tls,
            min: avg_tls * rng.gen_range(0.5..0.8),
            max: Some(avg_tls * rng.gen_range(1.2..2.0)),
        },
    }
}

fn csv_row(result: &JsonResult) -> Option<CsvRow> {
    let metrics = result.complete_metrics()?;
    Some(CsvRow {
        test_id: result.test_id,
        architecture: result.architecture.to_uppercase(),
        num_viewers: result.num_viewers,
        packet_loss: result.packet_loss,
        bandwidth: result.bandwidth.clone(),
        success: Some(result.success),
        avg_latency: Some(metrics.latency.average.to_string()),
        min_latency: Some(metrics.latency.min.to_string()),
        max_latency: Some(metrics.latency.max.to_string()),
        avg_cpu: Some(metrics.cpu.average.to_string()),
        max_cpu: Some(metrics.cpu.max.to_string()),
        avg_tls: Some(metrics.tls.average.to_string()),
        min_tls: Some(metrics.tls.min.to_string()),
        timestamp: result.timestamp,
    })
}

/// Writes `results.json` and `results.csv` into `results_dir`.
pub fn save_sample_data(
    results_dir: &Path,
    results: Vec<JsonResult>,
) -> AnalysisResult<SampleFiles> {
    create_directory_if_not_exists(results_dir)?;

    let csv_path = results_dir.join(CSV_FILE_NAME);
    let mut writer = csv::Writer::from_writer(File::create(&csv_path)?);
    for row in results.iter().filter_map(csv_row) {
        writer.serialize(row)?;
    }
    writer.flush()?;

    let total = results.len();
    let document = ResultsDocument {
        metadata: Some(serde_json::json!({
            "timestamp": BASE_TIMESTAMP_MS,
            "totalTests": total,
            "config": {
                "note": "This is sample data generated for testing purposes"
            }
        })),
        results,
    };
    let json_path = results_dir.join(JSON_FILE_NAME);
    write_to_file(&json_path, &serde_json::to_string_pretty(&document)?)?;

    info!(
        "Sample data generated: {} and {} ({} test results)",
        json_path.display(),
        csv_path.display(),
        format_number(total as u64)
    );

    Ok(SampleFiles {
        json: json_path,
        csv: csv_path,
        total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{load, InputSource};
    use crate::record::LossRate;

    #[test]
    fn test_grid_is_complete() {
        let mut rng = rng_from_seed(Some(7));
        let results = generate_results(&mut rng);
        assert_eq!(
            results.len(),
            2 * VIEWER_COUNTS.len() * PACKET_LOSS_RATES.len() * BANDWIDTH_LIMITS.len()
        );
        assert!(results.iter().all(|r| r.success && r.metrics.is_some()));
        assert_eq!(results[0].test_id, 1);
        assert_eq!(results[0].architecture, "p2p");
    }

    #[test]
    fn test_seed_is_deterministic() {
        let a = generate_results(&mut rng_from_seed(Some(42)));
        let b = generate_results(&mut rng_from_seed(Some(42)));
        let cpu = |results: &[JsonResult]| -> Vec<f64> {
            results
                .iter()
                .map(|r| r.complete_metrics().unwrap().cpu.average)
                .collect()
        };
        assert_eq!(cpu(a.as_slice()), cpu(b.as_slice()));
    }

    #[test]
    fn test_p2p_cpu_grows_with_viewers() {
        let results = generate_results(&mut rng_from_seed(Some(3)));
        let cpu_at = |viewers: u32| -> f64 {
            results
                .iter()
                .find(|r| r.architecture == "p2p" && r.num_viewers == viewers)
                .and_then(JsonResult::complete_metrics)
                .map(|m| m.cpu.average)
                .unwrap()
        };
        // 15 ± 20% against 127 ± 20%
        assert!(cpu_at(15) > cpu_at(1) * 3.0);
    }

    #[test]
    fn test_saved_files_load_back() {
        let dir = tempfile::tempdir().unwrap();
        let results = generate_results(&mut rng_from_seed(Some(11)));
        let files = save_sample_data(dir.path(), results).unwrap();

        let from_csv = load(&InputSource::Csv(files.csv.clone())).unwrap();
        let from_json = load(&InputSource::Json(files.json.clone())).unwrap();
        assert_eq!(from_csv.records.len(), files.total);
        assert_eq!(from_json.records.len(), files.total);
        assert_eq!(from_csv.records[0].architecture, from_json.records[0].architecture);
        assert_eq!(from_csv.records[0].metrics.cpu.average, from_json.records[0].metrics.cpu.average);
        assert!(from_json
            .records
            .iter()
            .any(|r| r.packet_loss == LossRate::new(0.1).unwrap()));
    }
}
