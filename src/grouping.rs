//! Reading the output/input file grouping from a spreadsheet
//!
//! The first row of the selected sheet is the header. Every following row
//! contributes one input file to the group named in the output column.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Reader, Sheets};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// One output file and the input files combined into it, in sheet order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    /// Output file name as written in the sheet (extension not yet enforced)
    pub output: String,
    /// Input file paths, without duplicates
    pub inputs: Vec<String>,
}

/// Ordered mapping from output file name to its input files
///
/// Groups keep the order in which their output name first appeared; inputs keep
/// the order of their first appearance within the group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grouping {
    groups: Vec<Group>,
}

impl Grouping {
    /// Number of groups (output files)
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total number of input files across all groups
    pub fn input_count(&self) -> usize {
        self.groups.iter().map(|g| g.inputs.len()).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Group> {
        self.groups.iter()
    }

    /// Input files recorded for `output`, if any
    pub fn get(&self, output: &str) -> Option<&[String]> {
        self.groups
            .iter()
            .find(|g| g.output == output)
            .map(|g| g.inputs.as_slice())
    }

    /// Record `input` for `output`. Returns false if it was already recorded.
    fn insert(&mut self, output: &str, input: &str) -> bool {
        match self.groups.iter_mut().find(|g| g.output == output) {
            Some(group) => {
                if group.inputs.iter().any(|existing| existing == input) {
                    return false;
                }
                group.inputs.push(input.to_string());
            }
            None => self.groups.push(Group {
                output: output.to_string(),
                inputs: vec![input.to_string()],
            }),
        }
        true
    }
}

impl<'a> IntoIterator for &'a Grouping {
    type Item = &'a Group;
    type IntoIter = std::slice::Iter<'a, Group>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.iter()
    }
}

impl<O, I> FromIterator<(O, I)> for Grouping
where
    O: AsRef<str>,
    I: AsRef<str>,
{
    /// Build a grouping from `(output, input)` pairs with the same
    /// de-duplication rules as the spreadsheet reader.
    fn from_iter<T: IntoIterator<Item = (O, I)>>(iter: T) -> Self {
        let mut grouping = Grouping::default();
        for (output, input) in iter {
            grouping.insert(output.as_ref(), input.as_ref());
        }
        grouping
    }
}

/// Options for reading a grouping
#[derive(Debug, Clone)]
pub struct ReadOptions {
    /// Sheet to read; the first sheet of the workbook when `None`
    pub sheet: Option<String>,
    /// Header of the column holding input file paths
    pub input_column: String,
    /// Header of the column holding the output file name
    pub output_column: String,
}

/// A source of named sheets made of string cells
pub trait SheetSource {
    /// Location of the source, used in error messages
    fn path(&self) -> &Path;

    /// Sheet names in workbook order
    fn sheet_names(&self) -> Vec<String>;

    /// All rows of `sheet`, header first
    fn rows(&mut self, sheet: &str) -> Result<Vec<Vec<String>>>;
}

/// Spreadsheet workbook on disk (xlsx, xlsm, xlsb, xls or ods)
pub struct Workbook {
    path: PathBuf,
    sheets: Sheets<BufReader<File>>,
}

impl Workbook {
    /// Open a workbook, picking the format from its extension
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }

        let sheets = open_workbook_auto(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            sheets,
        })
    }
}

impl SheetSource for Workbook {
    fn path(&self) -> &Path {
        &self.path
    }

    fn sheet_names(&self) -> Vec<String> {
        self.sheets.sheet_names()
    }

    fn rows(&mut self, sheet: &str) -> Result<Vec<Vec<String>>> {
        let range = self.sheets.worksheet_range(sheet)?;
        Ok(range
            .rows()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect())
    }
}

/// Open the workbook at `path` and read its grouping
pub fn read_workbook(path: &Path, options: &ReadOptions) -> Result<Grouping> {
    let mut workbook = Workbook::open(path)?;
    read_grouping(&mut workbook, options)
}

/// Read the grouping from a sheet source
///
/// Rows missing either the output or the input value are ignored. An input
/// listed twice for the same output is only recorded once, at its first
/// position.
pub fn read_grouping<S: SheetSource>(source: &mut S, options: &ReadOptions) -> Result<Grouping> {
    let sheet = select_sheet(source, options.sheet.as_deref())?;
    let rows = source.rows(&sheet)?;

    let mut rows = rows.into_iter();
    let header = rows.next().ok_or_else(|| Error::EmptySheet(sheet.clone()))?;
    debug!("Header of sheet {}: {:?}", sheet, header);

    let output_idx = column_index(&header, &options.output_column)?;
    let input_idx = column_index(&header, &options.input_column)?;

    let mut grouping = Grouping::default();
    for (row_num, row) in rows.enumerate() {
        let output = cell(&row, output_idx);
        let input = cell(&row, input_idx);
        if output.is_empty() || input.is_empty() {
            continue;
        }

        if !grouping.insert(output, input) {
            // Header is row 1, first data row is row 2
            debug!("Row {}: {} already listed for {}", row_num + 2, input, output);
        }
    }

    info!(
        "Read {} output files with {} input files from sheet {}",
        grouping.len(),
        grouping.input_count(),
        sheet
    );

    Ok(grouping)
}

/// Resolve the sheet to read: the requested one if it exists, else the first
fn select_sheet<S: SheetSource>(source: &S, requested: Option<&str>) -> Result<String> {
    let names = source.sheet_names();

    match requested {
        Some(name) => {
            if !names.iter().any(|n| n == name) {
                return Err(Error::SheetNotFound {
                    sheet: name.to_string(),
                    workbook: source.path().to_path_buf(),
                });
            }
            Ok(name.to_string())
        }
        None => names
            .into_iter()
            .next()
            .ok_or_else(|| Error::NoSheets(source.path().to_path_buf())),
    }
}

fn column_index(header: &[String], column: &str) -> Result<usize> {
    header
        .iter()
        .position(|name| name.trim() == column)
        .ok_or_else(|| Error::MissingColumn(column.to_string()))
}

/// Cell value at `idx`, empty when the row is short or the cell is blank
fn cell(row: &[String], idx: usize) -> &str {
    match row.get(idx) {
        Some(value) if !value.trim().is_empty() => value.as_str(),
        _ => "",
    }
}
