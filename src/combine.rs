//! Producing one output PDF per group
//!
//! Each group is handled on its own: a failure while writing one output is
//! logged and recorded in the [`CombineReport`], and the next group is
//! processed as usual. Only errors that affect the whole run (such as an
//! output root that cannot be created) are returned as `Err`.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, error, info, warn};

use crate::classify::{classify_file, FileKind};
use crate::error::{Error, Result};
use crate::grouping::{Group, Grouping};
use crate::pdf::{image_to_pdf, merge_pdfs, MergeOptions};

/// Extension every output file ends with
const PDF_EXTENSION: &str = ".pdf";

/// Options for combining files
#[derive(Debug, Clone, Default)]
pub struct CombineOptions {
    /// Directory input paths are resolved against; the working directory when `None`
    pub input_root: Option<PathBuf>,
    /// Directory output files are written to; the working directory when `None`
    pub output_root: Option<PathBuf>,
}

/// What happened to one group
#[derive(Debug)]
pub enum GroupOutcome {
    /// The single PDF input was copied byte for byte
    Copied,
    /// The usable inputs were merged into a PDF with this many pages
    Merged { pages: usize },
    /// No input could be used, so no output was written
    Skipped,
    /// Writing the output failed
    Failed(Error),
}

/// Why an input file was left out of its group
#[derive(Debug)]
pub enum SkipReason {
    /// Neither a PDF nor a JPEG
    UnknownType,
    /// Reading or converting the file failed
    Error(Error),
}

#[derive(Debug)]
pub struct SkippedInput {
    pub path: PathBuf,
    pub reason: SkipReason,
}

#[derive(Debug)]
pub struct GroupReport {
    /// Output name as given in the grouping
    pub output: String,
    /// Resolved output path, `.pdf` extension included
    pub output_path: PathBuf,
    pub outcome: GroupOutcome,
    pub skipped_inputs: Vec<SkippedInput>,
}

/// Summary of a combine run, one entry per group in grouping order
#[derive(Debug, Default)]
pub struct CombineReport {
    pub groups: Vec<GroupReport>,
}

impl CombineReport {
    /// Number of output files written
    pub fn written(&self) -> usize {
        self.groups
            .iter()
            .filter(|g| matches!(g.outcome, GroupOutcome::Copied | GroupOutcome::Merged { .. }))
            .count()
    }

    /// Number of groups whose output could not be written
    pub fn failed(&self) -> usize {
        self.groups
            .iter()
            .filter(|g| matches!(g.outcome, GroupOutcome::Failed(_)))
            .count()
    }

    /// Number of groups without a single usable input
    pub fn skipped(&self) -> usize {
        self.groups
            .iter()
            .filter(|g| matches!(g.outcome, GroupOutcome::Skipped))
            .count()
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }

    /// Report for the group with the given output name
    pub fn group(&self, output: &str) -> Option<&GroupReport> {
        self.groups.iter().find(|g| g.output == output)
    }
}

/// Scratch directory for converted images, removed when dropped
struct Scratch {
    dir: TempDir,
    converted: usize,
}

impl Scratch {
    fn new() -> Result<Self> {
        let dir = tempfile::Builder::new().prefix("pdf-combine-").tempdir()?;
        debug!("Using temporary directory {}", dir.path().display());
        Ok(Self { dir, converted: 0 })
    }

    /// Unique path for the PDF converted from `source`
    fn artifact_path(&mut self, source: &Path) -> PathBuf {
        self.converted += 1;
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        self.dir
            .path()
            .join(format!("{:04}-{}.pdf", self.converted, stem))
    }
}

/// Write one PDF per group of `grouping`
///
/// A group with exactly one input that is already a PDF is copied verbatim.
/// Otherwise JPEG inputs are converted, unusable inputs are skipped with a
/// warning, and the remaining PDFs are merged in input order. Converted
/// images live in a temporary directory that is removed before this function
/// returns, whatever the outcome.
pub fn combine_files(grouping: &Grouping, options: &CombineOptions) -> Result<CombineReport> {
    if let Some(root) = &options.output_root {
        fs::create_dir_all(root)?;
    }

    let mut scratch = Scratch::new()?;
    let mut report = CombineReport::default();
    let mut written = HashSet::new();

    for group in grouping {
        let output_path = output_file_path(options.output_root.as_deref(), &group.output);
        let mut skipped_inputs = Vec::new();

        if written.contains(&output_path) {
            warn!(
                "{} was already written by an earlier group and will be overwritten by {}",
                output_path.display(),
                group.output
            );
        }

        let outcome = match combine_group(
            group,
            &output_path,
            options.input_root.as_deref(),
            &mut scratch,
            &mut skipped_inputs,
        ) {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Failed to create {}: {}", output_path.display(), e);
                GroupOutcome::Failed(e)
            }
        };

        if matches!(outcome, GroupOutcome::Copied | GroupOutcome::Merged { .. }) {
            written.insert(output_path.clone());
        }

        report.groups.push(GroupReport {
            output: group.output.clone(),
            output_path,
            outcome,
            skipped_inputs,
        });
    }

    info!(
        "Wrote {} of {} output files ({} failed, {} without usable inputs)",
        report.written(),
        report.groups.len(),
        report.failed(),
        report.skipped()
    );

    Ok(report)
}

fn combine_group(
    group: &Group,
    output_path: &Path,
    input_root: Option<&Path>,
    scratch: &mut Scratch,
    skipped: &mut Vec<SkippedInput>,
) -> Result<GroupOutcome> {
    if let [only] = group.inputs.as_slice() {
        let source = resolve(input_root, only);
        if matches!(classify_file(&source), Ok(FileKind::Pdf)) {
            if is_same_file(&source, output_path) {
                debug!(
                    "Output {} is the input itself, leaving it untouched",
                    output_path.display()
                );
                return Ok(GroupOutcome::Copied);
            }
            debug!(
                "Only one PDF, will just copy: {} --> {}",
                source.display(),
                output_path.display()
            );
            create_parent_dir(output_path)?;
            fs::copy(&source, output_path)?;
            return Ok(GroupOutcome::Copied);
        }
    }

    let mut pdf_sources = Vec::with_capacity(group.inputs.len());
    for input in &group.inputs {
        let source = resolve(input_root, input);
        match prepare_input(&source, scratch) {
            Ok(Some(pdf)) => pdf_sources.push(pdf),
            Ok(None) => {
                warn!("File is neither PDF nor JPEG, skipping: {}", source.display());
                skipped.push(SkippedInput {
                    path: source,
                    reason: SkipReason::UnknownType,
                });
            }
            Err(e) => {
                warn!("Skipping {}: {}", source.display(), e);
                skipped.push(SkippedInput {
                    path: source,
                    reason: SkipReason::Error(e),
                });
            }
        }
    }

    if pdf_sources.is_empty() {
        warn!(
            "No usable input files for {}, nothing written",
            output_path.display()
        );
        return Ok(GroupOutcome::Skipped);
    }

    debug!(
        "Combining PDF files to {}: {:?}",
        output_path.display(),
        pdf_sources
    );

    create_parent_dir(output_path)?;
    let pages = merge_pdfs(&MergeOptions {
        input_paths: pdf_sources,
        output_path: output_path.to_path_buf(),
    })?;

    Ok(GroupOutcome::Merged { pages })
}

/// PDF to use for `source`: the file itself, a converted copy, or `None` when
/// the content type is not supported
fn prepare_input(source: &Path, scratch: &mut Scratch) -> Result<Option<PathBuf>> {
    let kind = classify_file(source)?;
    debug!("{} detected as {}", source.display(), kind);

    match kind {
        FileKind::Pdf => Ok(Some(source.to_path_buf())),
        FileKind::Jpeg => {
            let converted = scratch.artifact_path(source);
            image_to_pdf(source, &converted)?;
            Ok(Some(converted))
        }
        FileKind::Unknown => Ok(None),
    }
}

fn create_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Whether both paths name one existing file; `fs::copy` would truncate it
fn is_same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Resolve an output name under `root`, appending `.pdf` unless the name
/// already ends with it (in any case)
pub fn output_file_path(root: Option<&Path>, name: &str) -> PathBuf {
    if name.to_lowercase().ends_with(PDF_EXTENSION) {
        resolve(root, name)
    } else {
        resolve(root, &format!("{}{}", name, PDF_EXTENSION))
    }
}

fn resolve(root: Option<&Path>, name: &str) -> PathBuf {
    match root {
        Some(root) => root.join(name),
        None => PathBuf::from(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_path_appends_extension() {
        assert_eq!(output_file_path(None, "report"), PathBuf::from("report.pdf"));
        assert_eq!(output_file_path(None, "report.pdf"), PathBuf::from("report.pdf"));
        assert_eq!(output_file_path(None, "REPORT.PDF"), PathBuf::from("REPORT.PDF"));
        assert_eq!(output_file_path(None, "scan.jpg"), PathBuf::from("scan.jpg.pdf"));
    }

    #[test]
    fn test_output_path_under_root() {
        let root = Path::new("out");
        assert_eq!(
            output_file_path(Some(root), "2024/report"),
            Path::new("out").join("2024/report.pdf")
        );
    }

    #[test]
    fn test_same_file_detection() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("report.pdf");
        fs::write(&file, b"%PDF-1.5").unwrap();
        let other = dir.path().join("other.pdf");
        fs::write(&other, b"%PDF-1.5").unwrap();

        assert!(is_same_file(&file, &dir.path().join(".").join("report.pdf")));
        assert!(!is_same_file(&file, &other));
        assert!(!is_same_file(&file, &dir.path().join("missing.pdf")));
    }

    #[test]
    fn test_artifact_paths_are_unique() {
        let mut scratch = Scratch::new().unwrap();
        let first = scratch.artifact_path(Path::new("a/photo.jpg"));
        let second = scratch.artifact_path(Path::new("b/photo.jpg"));

        assert_ne!(first, second);
        assert!(first.starts_with(scratch.dir.path()));
        assert_eq!(first.extension().unwrap(), "pdf");
    }

    #[test]
    fn test_scratch_directory_removed_on_drop() {
        let scratch = Scratch::new().unwrap();
        let path = scratch.dir.path().to_path_buf();
        assert!(path.is_dir());

        drop(scratch);
        assert!(!path.exists());
    }

    #[test]
    fn test_report_counts() {
        let entry = |output: &str, outcome| GroupReport {
            output: output.to_string(),
            output_path: PathBuf::from(output),
            outcome,
            skipped_inputs: Vec::new(),
        };
        let report = CombineReport {
            groups: vec![
                entry("a", GroupOutcome::Copied),
                entry("b", GroupOutcome::Merged { pages: 3 }),
                entry("c", GroupOutcome::Skipped),
                entry("d", GroupOutcome::Failed(Error::NoInputs)),
            ],
        };

        assert_eq!(report.written(), 2);
        assert_eq!(report.skipped(), 1);
        assert_eq!(report.failed(), 1);
        assert!(report.has_failures());
        assert!(matches!(report.group("b").unwrap().outcome, GroupOutcome::Merged { pages: 3 }));
    }
}
