//! Label validation CLI.

use clap::{ColorChoice, Parser};
use pds_cli::cli::{Cli, LogFormatArg};
use pds_cli::logging::{LogConfig, LogFormat, init_logging};
use pds_cli::report::write_report;
use pds_cli::runner::{RunOptions, RunSummary, run};
use pds_model::Severity;
use std::io::{self, IsTerminal};

fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    if let Err(error) = init_logging(&log_config_from_cli(&cli)) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }

    let options = RunOptions {
        targets: cli.targets.clone(),
        catalog: cli.catalog.clone(),
        schema_files: cli.schema_files.clone(),
        schematron_files: cli.schematron_files.clone(),
        schema_directory: cli.schema_directory.clone(),
        schema_check: !cli.no_schema,
        schematron_check: !cli.no_schematron,
        skip_product_validation: cli.skip_product_validation,
    };

    let exit_code = match run(&options) {
        Ok(summary) => {
            print_summary(&summary, cli.show_all);
            if let Some(path) = &cli.report {
                if let Err(error) = write_report(path, &summary) {
                    eprintln!("error: {error}");
                    std::process::exit(1);
                }
            }
            if summary.has_errors() { 1 } else { 0 }
        }
        Err(error) => {
            eprintln!("error: {error}");
            1
        }
    };
    std::process::exit(exit_code);
}

fn print_summary(summary: &RunSummary, show_all: bool) {
    for target in &summary.targets {
        println!("{}", target.target);
        for problem in &target.problems {
            if !show_all && problem.severity < Severity::Warning {
                continue;
            }
            println!("  {problem}");
        }
        if let Some(reason) = &target.aborted {
            println!("  FATAL  validation aborted: {reason}");
        }
    }
    println!(
        "{} file(s) processed in {:.3}s, {} error(s), {} warning(s)",
        summary.files_processed,
        summary.total_time_secs,
        summary.error_count(),
        summary.warning_count()
    );
}

fn log_config_from_cli(cli: &Cli) -> LogConfig {
    let mut config = LogConfig {
        level_filter: cli.verbosity.tracing_level_filter(),
        ..LogConfig::default()
    };
    config.use_env_filter = !cli.verbosity.is_present();
    config.format = match cli.log_format {
        LogFormatArg::Pretty => LogFormat::Pretty,
        LogFormatArg::Compact => LogFormat::Compact,
        LogFormatArg::Json => LogFormat::Json,
    };
    config.log_file = cli.log_file.clone();
    config.with_ansi = match cli.color.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => cli.log_file.is_none() && io::stderr().is_terminal(),
    };
    config
}
