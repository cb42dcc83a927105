use crate::error::AnalysisResult;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

pub fn file_exists(file_path: &Path) -> bool {
    fs::metadata(file_path).is_ok()
}

pub fn create_directory_if_not_exists(dir_path: &Path) -> AnalysisResult<()> {
    if !file_exists(dir_path) {
        info!("Creating directory {}", dir_path.display());
        fs::create_dir_all(dir_path)?;
    }
    Ok(())
}

pub fn write_to_file(
    file_path: &Path,
    content: &str,
) -> AnalysisResult<()> {
    let mut file = BufWriter::new(File::create(file_path)?);
    file.write_all(content.as_bytes())?;
    file.flush()?;
    Ok(())
}

pub fn format_number(num: u64) -> String {
    let mut s = String::new();
    let num_str = num.to_string();
    for (i, c) in num_str.chars().rev().enumerate() {
        if i != 0 && i % 3 == 0 {
            s.insert(0, ',');
        }
        s.insert(0, c);
    }
    s
}
