//! PDF Combine CLI tool
//!
//! Reads a spreadsheet mapping output files to input files and writes one
//! combined PDF per output file.

use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use tracing::{debug, error, info};

use pdf_combine::combine::{combine_files, CombineOptions, CombineReport};
use pdf_combine::grouping::{read_workbook, ReadOptions};
use pdf_combine::logging::{self, Verbosity, DEFAULT_LOG_FILE};

/// Exit code when the run finished but at least one output could not be written
const EXIT_GROUP_FAILURES: i32 = 3;

/// PDF Combine - Combine PDF/JPEG files into one PDF per row group of a spreadsheet
#[derive(Parser)]
#[command(name = "pdf-combine")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    # Combine scans listed in the first sheet of mapping.xlsx
    pdf-combine --source-excel mapping.xlsx --column-input-files Scan --column-output-file Document

    # Read a named sheet and resolve paths under dedicated roots
    pdf-combine --source-excel mapping.xlsx --source-sheet Invoices \\
        --column-input-files File --column-output-file Target \\
        --root-path-input scans --root-path-output combined")]
struct Cli {
    /// Be very verbose
    #[arg(short, long, env = "PDF_COMBINE_VERBOSE", conflicts_with = "quiet")]
    verbose: bool,

    /// No logging except errors
    #[arg(short, long, env = "PDF_COMBINE_QUIET")]
    quiet: bool,

    /// Spreadsheet containing output names and input file locations
    #[arg(long, env = "PDF_COMBINE_SOURCE_EXCEL")]
    source_excel: PathBuf,

    /// Sheet to read data from; the first sheet is used if not given
    #[arg(long, env = "PDF_COMBINE_SOURCE_SHEET")]
    source_sheet: Option<String>,

    /// Column containing a path to the input files
    #[arg(long, env = "PDF_COMBINE_COLUMN_INPUT_FILES")]
    column_input_files: String,

    /// Column containing the output file the input files get combined to
    #[arg(long, env = "PDF_COMBINE_COLUMN_OUTPUT_FILE")]
    column_output_file: String,

    /// Root path for input file paths
    #[arg(long, env = "PDF_COMBINE_ROOT_PATH_INPUT")]
    root_path_input: Option<PathBuf>,

    /// Root path for output file paths
    #[arg(long, env = "PDF_COMBINE_ROOT_PATH_OUTPUT")]
    root_path_output: Option<PathBuf>,

    /// Log file appended to on every run
    #[arg(long, env = "PDF_COMBINE_LOG_FILE", default_value = DEFAULT_LOG_FILE)]
    log_file: PathBuf,
}

fn main() {
    let cli = Cli::parse();

    let verbosity = Verbosity::from_flags(cli.verbose, cli.quiet);
    if let Err(e) = logging::init(verbosity, &cli.log_file) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    let started = Local::now();
    debug!("Command line parsed, begin processing ...");

    match run(&cli) {
        Ok(report) => {
            let elapsed = Local::now() - started;
            info!("Finished in {} ms", elapsed.num_milliseconds());

            if report.has_failures() {
                process::exit(EXIT_GROUP_FAILURES);
            }
        }
        Err(e) => {
            error!("{:#}", e);
            process::exit(1);
        }
    }
}

fn run(cli: &Cli) -> Result<CombineReport> {
    let read_options = ReadOptions {
        sheet: cli.source_sheet.clone(),
        input_column: cli.column_input_files.clone(),
        output_column: cli.column_output_file.clone(),
    };

    let grouping = read_workbook(&cli.source_excel, &read_options)
        .with_context(|| format!("Failed to read {}", cli.source_excel.display()))?;

    let combine_options = CombineOptions {
        input_root: cli.root_path_input.clone(),
        output_root: cli.root_path_output.clone(),
    };

    combine_files(&grouping, &combine_options).context("Failed to combine files")
}
