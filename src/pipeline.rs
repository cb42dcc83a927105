use crate::analysis::Analysis;
use crate::chart::ChartRenderer;
use crate::error::AnalysisResult;
use crate::loader::{load, InputSource};
use crate::report::{write_summary, SUMMARY_FILE_NAME};
use crate::summary::SummaryStatistics;
use crate::utils::{create_directory_if_not_exists, format_number};
use std::path::PathBuf;
use tracing::{info, instrument, warn};

pub const DEFAULT_RESULTS_DIR: &str = "./results";
pub const VISUALIZATIONS_DIR: &str = "visualizations";

#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    pub results_dir: PathBuf,
    /// Explicit input file; otherwise `results_dir` is searched.
    pub input: Option<PathBuf>,
    /// Defaults to `<results_dir>/visualizations`.
    pub out_dir: Option<PathBuf>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        AnalyzerConfig {
            results_dir: PathBuf::from(DEFAULT_RESULTS_DIR),
            input: None,
            out_dir: None,
        }
    }
}

impl AnalyzerConfig {
    pub fn output_dir(&self) -> PathBuf {
        self.out_dir
            .clone()
            .unwrap_or_else(|| self.results_dir.join(VISUALIZATIONS_DIR))
    }
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub source: InputSource,
    pub records: usize,
    pub excluded: usize,
    pub charts_written: Vec<PathBuf>,
    pub charts_skipped: Vec<Analysis>,
    pub summary_path: PathBuf,
    pub summary: SummaryStatistics,
}

pub struct Analyzer<R: ChartRenderer> {
    config: AnalyzerConfig,
    renderer: R,
}

impl<R: ChartRenderer> Analyzer<R> {
    pub fn new(
        config: AnalyzerConfig,
        renderer: R,
    ) -> Self {
        Analyzer { config, renderer }
    }

    #[instrument(skip(self), fields(results_dir = %self.config.results_dir.display()))]
    pub fn run(&self) -> AnalysisResult<RunReport> {
        let source = match &self.config.input {
            Some(path) => InputSource::from_path(path)?,
            None => InputSource::locate(&self.config.results_dir)?,
        };
        let dataset = load(&source)?;

        let out_dir = self.config.output_dir();
        create_directory_if_not_exists(&out_dir)?;

        let mut charts_written = Vec::new();
        let mut charts_skipped = Vec::new();
        for analysis in Analysis::ALL {
            match analysis.chart(&dataset.records) {
                Some(chart) => {
                    let path = out_dir.join(analysis.file_name());
                    self.renderer.render(&path, &chart)?;
                    info!("{} chart saved to {}", analysis, path.display());
                    charts_written.push(path);
                }
                None => {
                    warn!(
                        "No data with {} found, skipping {} chart",
                        analysis.filter_description(),
                        analysis
                    );
                    charts_skipped.push(analysis);
                }
            }
        }

        let summary = SummaryStatistics::build(&dataset.records)?;
        let summary_path = out_dir.join(SUMMARY_FILE_NAME);
        write_summary(&summary_path, &summary)?;

        info!(
            "Analysis complete: {} tests analyzed, architectures compared: {}, output in {}",
            format_number(summary.total_tests as u64),
            summary
                .architectures
                .iter()
                .map(|architecture| architecture.to_string())
                .collect::<Vec<_>>()
                .join(", "),
            out_dir.display()
        );

        Ok(RunReport {
            source: dataset.source,
            records: dataset.records.len(),
            excluded: dataset.excluded,
            charts_written,
            charts_skipped,
            summary_path,
            summary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::{Chart, PlottersRenderer};
    use crate::error::AnalysisError;
    use crate::loader::{CSV_FILE_NAME, JSON_FILE_NAME};
    use crate::report::read_summary;
    use crate::sample_data::{generate_results, rng_from_seed, save_sample_data};
    use std::cell::RefCell;
    use std::fs;
    use std::path::Path;

    const CSV_HEADER: &str = "testId,architecture,numViewers,packetLoss,bandwidth,avgLatency,minLatency,maxLatency,avgCpu,maxCpu,avgTls,minTls,timestamp";

    /// Writes a placeholder file per chart and remembers what it was asked to draw.
    #[derive(Default)]
    struct RecordingRenderer {
        charts: RefCell<Vec<(PathBuf, Chart)>>,
    }

    impl ChartRenderer for &RecordingRenderer {
        fn render(
            &self,
            path: &Path,
            chart: &Chart,
        ) -> AnalysisResult<()> {
            fs::write(path, b"png")?;
            self.charts
                .borrow_mut()
                .push((path.to_path_buf(), chart.clone()));
            Ok(())
        }
    }

    fn config(results_dir: &Path) -> AnalyzerConfig {
        AnalyzerConfig {
            results_dir: results_dir.to_path_buf(),
            ..AnalyzerConfig::default()
        }
    }

    #[test]
    fn test_missing_input_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = RecordingRenderer::default();
        let err = Analyzer::new(config(dir.path()), &renderer).run().unwrap_err();

        assert!(matches!(err, AnalysisError::MissingInput(_)));
        assert!(!dir.path().join(VISUALIZATIONS_DIR).exists());
        assert!(renderer.charts.borrow().is_empty());
    }

    #[test]
    fn test_empty_dataset_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(JSON_FILE_NAME),
            r#"{"results": [{"testId": 1, "architecture": "p2p", "numViewers": 5, "packetLoss": 0, "bandwidth": "1mbit", "success": false}]}"#,
        )
        .unwrap();

        let renderer = RecordingRenderer::default();
        let err = Analyzer::new(config(dir.path()), &renderer).run().unwrap_err();
        assert!(matches!(err, AnalysisError::EmptyDataset(_)));
        assert!(!dir.path().join(VISUALIZATIONS_DIR).exists());
    }

    #[test]
    fn test_cpu_chart_skipped_without_zero_loss() {
        let dir = tempfile::tempdir().unwrap();
        let data = format!(
            "{}\n1,p2p,5,0.01,1mbit,60,40,90,20,25,0.3,0.2,1\n2,sfu,5,0.05,1mbit,80,50,120,30,36,0.1,0.05,2\n",
            CSV_HEADER
        );
        fs::write(dir.path().join(CSV_FILE_NAME), data).unwrap();

        let renderer = RecordingRenderer::default();
        let report = Analyzer::new(config(dir.path()), &renderer).run().unwrap();

        let out_dir = dir.path().join(VISUALIZATIONS_DIR);
        assert_eq!(
            report.charts_skipped,
            vec![Analysis::CpuVsViewers, Analysis::LegibilityVsBandwidth]
        );
        assert!(!out_dir.join(Analysis::CpuVsViewers.file_name()).exists());
        assert!(out_dir.join(Analysis::LatencyVsLoss.file_name()).exists());
        assert!(report.summary_path.is_file());
        assert_eq!(read_summary(&report.summary_path).unwrap().total_tests, 2);
    }

    #[test]
    fn test_full_run_on_sample_data() {
        let dir = tempfile::tempdir().unwrap();
        let results = generate_results(&mut rng_from_seed(Some(5)));
        let files = save_sample_data(dir.path(), results).unwrap();

        let renderer = RecordingRenderer::default();
        let report = Analyzer::new(config(dir.path()), &renderer).run().unwrap();

        assert_eq!(report.source, InputSource::Csv(files.csv));
        assert_eq!(report.records, files.total);
        assert_eq!(report.excluded, 0);
        assert!(report.charts_skipped.is_empty());
        assert_eq!(report.charts_written.len(), 3);
        assert_eq!(renderer.charts.borrow().len(), 3);

        let summary = read_summary(&report.summary_path).unwrap();
        assert_eq!(summary, report.summary);
        assert_eq!(summary.viewer_counts, vec![1, 2, 3, 4, 5, 8, 10, 15]);
        assert_eq!(summary.packet_loss_rates, vec![0.0, 0.01, 0.02, 0.05, 0.1]);
        let per_architecture: usize = summary
            .architecture_comparison
            .values()
            .map(|arch| arch.tests)
            .sum();
        assert_eq!(per_architecture, summary.total_tests);
    }

    #[test]
    fn test_explicit_input_and_out_dir() {
        let dir = tempfile::tempdir().unwrap();
        let files = save_sample_data(
            &dir.path().join("raw"),
            generate_results(&mut rng_from_seed(Some(9))),
        )
        .unwrap();
        let out_dir = dir.path().join("charts");

        let config = AnalyzerConfig {
            results_dir: dir.path().to_path_buf(),
            input: Some(files.json.clone()),
            out_dir: Some(out_dir.clone()),
        };
        let renderer = RecordingRenderer::default();
        let report = Analyzer::new(config, &renderer).run().unwrap();

        assert_eq!(report.source, InputSource::Json(files.json));
        assert_eq!(report.summary_path, out_dir.join(SUMMARY_FILE_NAME));
        assert!(report
            .charts_written
            .iter()
            .all(|path| path.starts_with(&out_dir) && path.is_file()));
    }

    #[test]
    fn test_plotters_run_writes_images() {
        let dir = tempfile::tempdir().unwrap();
        save_sample_data(dir.path(), generate_results(&mut rng_from_seed(Some(1)))).unwrap();

        let report = Analyzer::new(config(dir.path()), PlottersRenderer::new(400, 300))
            .run()
            .unwrap();

        for analysis in Analysis::ALL {
            let path = dir.path().join(VISUALIZATIONS_DIR).join(analysis.file_name());
            assert!(fs::metadata(&path).unwrap().len() > 0);
        }
        assert_eq!(report.charts_written.len(), 3);
    }
}
