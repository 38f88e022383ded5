use crate::error::AnalysisError;
use calamine::{Data, Reader, Xlsx};
use std::io::Cursor;

const MISSING_TOKENS: [&str; 5] = ["", "nan", "na", "n/a", "-"];
const NOMINAL_KEYS: [&str; 2] = ["nominal_thickness", "nominal"];

/// Thickness samples read from a grid file, before a nominal thickness is settled.
#[derive(Debug, Clone, PartialEq)]
pub struct GridData {
    pub rows: usize,
    pub cols: usize,
    pub samples: Vec<f64>,
    pub nominal_thickness: Option<f64>,
}

impl GridData {
    pub fn max_sample(&self) -> Option<f64> {
        self.samples
            .iter()
            .copied()
            .filter(|s| s.is_finite())
            .fold(None, |max, s| Some(max.map_or(s, |m: f64| m.max(s))))
    }
}

/// Reads `csv`, `txt` and `dat` grids.
///
/// Cells are split on commas, semicolons, tabs or runs of spaces, whichever the
/// line uses first in that order. `#` lines are comments except for a
/// `# nominal_thickness = <value>` directive.
pub fn read_text_grid(bytes: &[u8]) -> Result<GridData, AnalysisError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| AnalysisError::DecodeFailure(format!("grid is not valid UTF-8: {e}")))?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut assembler = GridAssembler::default();
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if let Some(comment) = line.strip_prefix('#') {
            assembler.comment(comment)?;
            continue;
        }
        assembler.push_row(index + 1, &split_cells(line))?;
    }
    assembler.finish()
}

/// Reads the first worksheet of an `xlsx` workbook.
pub fn read_xlsx_grid(bytes: &[u8]) -> Result<GridData, AnalysisError> {
    let mut workbook = Xlsx::new(Cursor::new(bytes))
        .map_err(|e| AnalysisError::DecodeFailure(format!("unreadable workbook: {e}")))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| AnalysisError::DecodeFailure("workbook has no worksheets".to_string()))?
        .map_err(|e| AnalysisError::DecodeFailure(format!("unreadable worksheet: {e}")))?;

    let mut assembler = GridAssembler::default();
    for (index, row) in range.rows().enumerate() {
        let cells = row
            .iter()
            .enumerate()
            .map(|(col, cell)| cell_text(cell, index + 1, col + 1))
            .collect::<Result<Vec<String>, AnalysisError>>()?;

        if let Some(comment) = cells.first().and_then(|c| c.trim().strip_prefix('#')) {
            assembler.comment(comment)?;
            continue;
        }
        let cells: Vec<&str> = cells.iter().map(|c| c.trim()).collect();
        assembler.push_row(index + 1, &cells)?;
    }
    assembler.finish()
}

fn cell_text(cell: &Data, row: usize, col: usize) -> Result<String, AnalysisError> {
    match cell {
        Data::Float(value) => Ok(value.to_string()),
        Data::Int(value) => Ok(value.to_string()),
        Data::String(value) => Ok(value.clone()),
        Data::Empty | Data::Error(_) => Ok(String::new()),
        _ => Err(AnalysisError::DecodeFailure(format!(
            "row {row}, column {col}: unsupported cell type"
        ))),
    }
}

fn split_cells(line: &str) -> Vec<&str> {
    let cells: Vec<&str> = if line.contains(',') {
        line.split(',').collect()
    } else if line.contains(';') {
        line.split(';').collect()
    } else if line.contains('\t') {
        line.split('\t').collect()
    } else {
        line.split_whitespace().collect()
    };
    cells.into_iter().map(str::trim).collect()
}

fn is_missing(cell: &str) -> bool {
    MISSING_TOKENS
        .iter()
        .any(|token| cell.eq_ignore_ascii_case(token))
}

#[derive(Default)]
struct GridAssembler {
    rows: usize,
    cols: Option<usize>,
    samples: Vec<f64>,
    nominal_thickness: Option<f64>,
    header_checked: bool,
}

impl GridAssembler {
    fn comment(&mut self, comment: &str) -> Result<(), AnalysisError> {
        let Some((key, value)) = comment.split_once(['=', ':']) else {
            return Ok(());
        };
        let key = key.trim().to_ascii_lowercase();
        if !NOMINAL_KEYS.contains(&key.as_str()) {
            return Ok(());
        }

        let value = value.trim();
        let nominal = value.parse::<f64>().map_err(|_| {
            AnalysisError::DecodeFailure(format!("nominal thickness '{value}' is not a number"))
        })?;
        self.nominal_thickness = Some(nominal);
        Ok(())
    }

    fn push_row(&mut self, line: usize, cells: &[&str]) -> Result<(), AnalysisError> {
        if cells.iter().all(|c| c.is_empty()) {
            return Ok(());
        }

        // a leading row of labels is a header
        if !self.header_checked {
            self.header_checked = true;
            if cells
                .iter()
                .all(|c| !is_missing(c) && c.parse::<f64>().is_err())
            {
                return Ok(());
            }
        }

        match self.cols {
            Some(cols) if cols != cells.len() => {
                return Err(AnalysisError::DecodeFailure(format!(
                    "row {line} has {} cells, expected {cols}",
                    cells.len()
                )));
            }
            Some(_) => {}
            None => self.cols = Some(cells.len()),
        }

        for (col, cell) in cells.iter().enumerate() {
            let sample = if is_missing(cell) {
                f64::NAN
            } else {
                cell.parse::<f64>().map_err(|_| {
                    AnalysisError::DecodeFailure(format!(
                        "row {line}, column {}: '{cell}' is not a number",
                        col + 1
                    ))
                })?
            };
            self.samples.push(sample);
        }
        self.rows += 1;
        Ok(())
    }

    fn finish(self) -> Result<GridData, AnalysisError> {
        let cols = match self.cols {
            Some(cols) if self.rows > 0 => cols,
            _ => {
                return Err(AnalysisError::DecodeFailure(
                    "grid contains no samples".to_string(),
                ));
            }
        };

        Ok(GridData {
            rows: self.rows,
            cols,
            samples: self.samples,
            nominal_thickness: self.nominal_thickness,
        })
    }
}
