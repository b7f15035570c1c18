//! JSON report output.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use pds_model::Problem;
use serde::Serialize;

use crate::runner::RunSummary;

const REPORT_SCHEMA: &str = "pds-validate.report";
const REPORT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Serialize)]
pub struct ReportPayload {
    pub schema: &'static str,
    pub schema_version: u32,
    pub generated_at: String,
    pub files_processed: u64,
    pub total_time_secs: f64,
    pub error_count: usize,
    pub warning_count: usize,
    pub targets: Vec<TargetReport>,
}

#[derive(Debug, Serialize)]
pub struct TargetReport {
    pub target: String,
    pub aborted: Option<String>,
    pub problems: Vec<Problem>,
}

/// Write the run summary as pretty-printed JSON.
pub fn write_report(output_path: &Path, summary: &RunSummary) -> Result<PathBuf> {
    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
    }
    let payload = ReportPayload {
        schema: REPORT_SCHEMA,
        schema_version: REPORT_SCHEMA_VERSION,
        generated_at: Utc::now().to_rfc3339(),
        files_processed: summary.files_processed,
        total_time_secs: summary.total_time_secs,
        error_count: summary.error_count(),
        warning_count: summary.warning_count(),
        targets: summary
            .targets
            .iter()
            .map(|target| TargetReport {
                target: target.target.clone(),
                aborted: target.aborted.clone(),
                problems: target.problems.clone(),
            })
            .collect(),
    };
    let json = serde_json::to_string_pretty(&payload)?;
    std::fs::write(output_path, format!("{json}\n"))
        .with_context(|| format!("write {}", output_path.display()))?;
    Ok(output_path.to_path_buf())
}
