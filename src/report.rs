use crate::error::AnalysisResult;
use crate::summary::SummaryStatistics;
use crate::utils::write_to_file;
use std::fs;
use std::path::Path;
use tracing::info;

pub const SUMMARY_FILE_NAME: &str = "summary_statistics.json";

pub fn write_summary(
    path: &Path,
    summary: &SummaryStatistics,
) -> AnalysisResult<()> {
    let json = serde_json::to_string_pretty(summary)?;
    write_to_file(path, &json)?;
    info!("Summary statistics saved to {}", path.display());
    Ok(())
}

pub fn read_summary(path: &Path) -> AnalysisResult<SummaryStatistics> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str::<SummaryStatistics>(&raw)?)
}
