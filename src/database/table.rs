/// Spreadsheet-style table backed by a CSV file
///
/// Header row plus rows of optional text cells. Empty cells are `None`.
/// Numeric access treats empty, unparsable and NaN cells alike as missing,
/// which is how the analysis code wants to see spreadsheet gaps.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use csv::{ReaderBuilder, WriterBuilder};

use crate::error::{Result, RheoError};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl Table {
    pub fn new<S: AsRef<str>>(headers: &[S]) -> Self {
        Self {
            headers: headers.iter().map(|h| h.as_ref().to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Load a CSV file; ragged rows are padded or truncated to the header
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .flexible(true)
            .has_headers(true)
            .from_path(path.as_ref())?;
        let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
        let width = headers.len();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let mut row: Vec<Option<String>> = record
                .iter()
                .take(width)
                .map(|cell| {
                    let cell = cell.trim();
                    if cell.is_empty() { None } else { Some(cell.to_string()) }
                })
                .collect();
            row.resize(width, None);
            rows.push(row);
        }
        Ok(Self { headers, rows })
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut writer = WriterBuilder::new().from_path(path.as_ref())?;
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row.iter().map(|cell| cell.as_deref().unwrap_or("")))?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| RheoError::MissingColumn(name.to_string()))
    }

    /// Append a column filled with empty cells if it does not exist yet
    pub fn ensure_column(&mut self, name: &str) -> usize {
        if let Some(idx) = self.column_index(name) {
            return idx;
        }
        self.headers.push(name.to_string());
        for row in &mut self.rows {
            row.push(None);
        }
        self.headers.len() - 1
    }

    pub fn push_row(&mut self, mut row: Vec<Option<String>>) {
        row.resize(self.headers.len(), None);
        self.rows.push(row);
    }

    pub fn row(&self, index: usize) -> Option<&[Option<String>]> {
        self.rows.get(index).map(|r| r.as_slice())
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Option<String>]> {
        self.rows.iter().map(|r| r.as_slice())
    }

    pub fn text(&self, row: usize, column: &str) -> Option<&str> {
        let col = self.column_index(column)?;
        self.rows.get(row)?.get(col)?.as_deref()
    }

    pub fn number(&self, row: usize, column: &str) -> Option<f64> {
        self.text(row, column).and_then(parse_number)
    }

    pub fn set_text(&mut self, row: usize, column: &str, value: Option<String>) -> Result<()> {
        let col = self.require_column(column)?;
        let cells = self
            .rows
            .get_mut(row)
            .ok_or_else(|| RheoError::InvalidInput(format!("row {} out of range", row)))?;
        cells[col] = value;
        Ok(())
    }

    /// Store a number; NaN / None clear the cell
    pub fn set_number(&mut self, row: usize, column: &str, value: Option<f64>) -> Result<()> {
        let cell = value.filter(|v| v.is_finite()).map(format_number);
        self.set_text(row, column, cell)
    }

    /// Whole column as text cells
    pub fn text_column(&self, column: &str) -> Result<Vec<Option<&str>>> {
        let col = self.require_column(column)?;
        Ok(self.rows.iter().map(|r| r[col].as_deref()).collect())
    }

    /// Whole column as numbers, missing cells as `None`
    pub fn numeric_column(&self, column: &str) -> Result<Vec<Option<f64>>> {
        let col = self.require_column(column)?;
        Ok(self
            .rows
            .iter()
            .map(|r| r[col].as_deref().and_then(parse_number))
            .collect())
    }

    /// Rows where every one of `columns` holds a number, as a column-major
    /// set of vectors in the same order as `columns`
    pub fn complete_numeric(&self, columns: &[&str]) -> Result<Vec<Vec<f64>>> {
        let data: Vec<Vec<Option<f64>>> = columns
            .iter()
            .map(|c| self.numeric_column(c))
            .collect::<Result<_>>()?;
        let mut out = vec![Vec::new(); columns.len()];
        for row in 0..self.rows.len() {
            if data.iter().all(|col| col[row].is_some()) {
                for (dst, col) in out.iter_mut().zip(&data) {
                    if let Some(v) = col[row] {
                        dst.push(v);
                    }
                }
            }
        }
        Ok(out)
    }

    /// Index of the first row whose `column` equals `value`
    pub fn find_row(&self, column: &str, value: &str) -> Option<usize> {
        let col = self.column_index(column)?;
        self.rows.iter().position(|r| r[col].as_deref() == Some(value))
    }

    /// Copy keeping only the first row for each value of `column`
    pub fn dedup_by(&self, column: &str) -> Result<Table> {
        let col = self.require_column(column)?;
        let mut seen = HashSet::new();
        let rows = self
            .rows
            .iter()
            .filter(|r| match &r[col] {
                Some(key) => seen.insert(key.clone()),
                None => false,
            })
            .cloned()
            .collect();
        Ok(Table { headers: self.headers.clone(), rows })
    }

    /// Copy with the rows for which `keep` returns true
    pub fn filter_rows(&self, mut keep: impl FnMut(&Table, usize) -> bool) -> Table {
        let rows = (0..self.rows.len())
            .filter(|&i| keep(self, i))
            .map(|i| self.rows[i].clone())
            .collect();
        Table { headers: self.headers.clone(), rows }
    }

    /// Stack another table below this one, matching columns by name
    ///
    /// Columns present only in `other` are appended to the header.
    pub fn concat(&self, other: &Table) -> Table {
        let mut result = self.clone();
        for header in &other.headers {
            result.ensure_column(header);
        }
        for row in &other.rows {
            let mut merged = vec![None; result.headers.len()];
            for (header, cell) in other.headers.iter().zip(row) {
                if let Some(idx) = result.column_index(header) {
                    merged[idx] = cell.clone();
                }
            }
            result.rows.push(merged);
        }
        result
    }
}

/// Parse a spreadsheet cell as a finite number
pub fn parse_number(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Shortest text that parses back to the same f64
pub fn format_number(value: f64) -> String {
    format!("{}", value)
}
