//! Drives the label validator over the requested targets.

use std::path::PathBuf;

use anyhow::{Context, Result};
use pds_label::{LabelValidator, file_url};
use pds_model::{Problem, ProblemContainer, Severity};

use crate::catalog::JsonCatalog;

/// Everything the runner needs, resolved from the CLI surface.
#[derive(Debug, Default)]
pub struct RunOptions {
    pub targets: Vec<PathBuf>,
    pub catalog: Option<PathBuf>,
    pub schema_files: Vec<PathBuf>,
    pub schematron_files: Vec<PathBuf>,
    pub schema_directory: Option<PathBuf>,
    pub schema_check: bool,
    pub schematron_check: bool,
    pub skip_product_validation: bool,
}

/// Result of validating one target.
#[derive(Debug)]
pub struct TargetResult {
    pub target: String,
    pub problems: Vec<Problem>,
    /// Set when the document could not be processed to completion.
    pub aborted: Option<String>,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub targets: Vec<TargetResult>,
    pub files_processed: u64,
    pub total_time_secs: f64,
}

impl RunSummary {
    pub fn error_count(&self) -> usize {
        self.count_severity(&[Severity::Error, Severity::Fatal])
    }

    pub fn warning_count(&self) -> usize {
        self.count_severity(&[Severity::Warning])
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0 || self.targets.iter().any(|t| t.aborted.is_some())
    }

    fn count_severity(&self, severities: &[Severity]) -> usize {
        self.targets
            .iter()
            .flat_map(|t| t.problems.iter())
            .filter(|p| severities.contains(&p.severity))
            .count()
    }
}

/// Validate every target in order, one shared engine instance.
pub fn run(options: &RunOptions) -> Result<RunSummary> {
    let mut validator = LabelValidator::new();
    validator.set_schema_check(options.schema_check, options.schema_files.is_empty());
    validator.set_schematron_check(
        options.schematron_check,
        options.schematron_files.is_empty(),
    );
    validator.set_skip_product_validation(options.skip_product_validation);

    if !options.schema_files.is_empty() {
        let files = to_urls(&options.schema_files)?;
        validator.set_schema_files(files);
    }
    if !options.schematron_files.is_empty() {
        let files = to_urls(&options.schematron_files)?;
        validator.set_schematron_files(files);
    }
    if let Some(directory) = &options.schema_directory {
        validator.set_schema_directory(directory.clone());
    }
    if let Some(path) = &options.catalog {
        let catalog = JsonCatalog::from_path(path)?;
        tracing::debug!(entries = catalog.len(), "catalog loaded");
        validator.set_catalog(Box::new(catalog));
    }

    // Structural schema and rule-transform capabilities are supplied by
    // embedding applications; without them those gates are skipped.
    tracing::debug!("schema and schematron capabilities are embedder-supplied");

    let mut summary = RunSummary::default();
    for target in &options.targets {
        let mut container = ProblemContainer::new();
        let aborted = match file_url(target) {
            Ok(url) => match validator.validate(&mut container, &url) {
                Ok(()) => None,
                Err(error) => {
                    tracing::error!(target = %target.display(), %error, "validation aborted");
                    Some(error.to_string())
                }
            },
            Err(error) => Some(error.to_string()),
        };
        summary.targets.push(TargetResult {
            target: target.display().to_string(),
            problems: container.take(),
            aborted,
        });
    }
    summary.files_processed = validator.files_processed();
    summary.total_time_secs = validator.total_time_elapsed().as_secs_f64();
    tracing::info!(
        files = summary.files_processed,
        errors = summary.error_count(),
        warnings = summary.warning_count(),
        "run complete"
    );
    Ok(summary)
}

fn to_urls(paths: &[PathBuf]) -> Result<Vec<url::Url>> {
    paths
        .iter()
        .map(|path| file_url(path).with_context(|| format!("resolve {}", path.display())))
        .collect()
}
