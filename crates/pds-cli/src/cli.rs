//! Command-line argument surface.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use clap_verbosity_flag::{InfoLevel, Verbosity};

/// Validate planetary data product labels.
#[derive(Debug, Parser)]
#[command(name = "pds-validate", version, about)]
pub struct Cli {
    /// Label files to validate.
    #[arg(required = true)]
    pub targets: Vec<PathBuf>,

    /// JSON catalog mapping rule-set identifiers to local copies.
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Validate against exactly these schema files instead of the label's
    /// own declarations.
    #[arg(long = "schema")]
    pub schema_files: Vec<PathBuf>,

    /// Validate against exactly these schematron files instead of the
    /// label's own declarations.
    #[arg(long = "schematron")]
    pub schematron_files: Vec<PathBuf>,

    /// Directory of locally known schema files.
    #[arg(long)]
    pub schema_directory: Option<PathBuf>,

    /// Disable schema validation.
    #[arg(long)]
    pub no_schema: bool,

    /// Disable schematron validation.
    #[arg(long)]
    pub no_schematron: bool,

    /// Skip product-level validation; bundle and collection labels still
    /// receive rule-set checks.
    #[arg(long)]
    pub skip_product_validation: bool,

    /// Write a JSON report to this path.
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Also print Debug- and Info-level confirmations.
    #[arg(long)]
    pub show_all: bool,

    #[command(flatten)]
    pub verbosity: Verbosity<InfoLevel>,

    #[command(flatten)]
    pub color: colorchoice_clap::Color,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormatArg::Pretty)]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
