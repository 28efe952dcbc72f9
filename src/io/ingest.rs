//! CSV ingest for the reference dataset.
//!
//! The reference dataset is only ever queried for per-column statistics
//! (min/max/median and distinct values), so rows are stored column-wise as
//! trimmed strings and typed on demand.
//!
//! Design goals:
//! - **Lenient rows** (malformed rows are skipped and counted, not fatal)
//! - **Strict queries** (a missing or non-numeric column is a clear error)
//! - **Missing cells** (empty, `NaN`, `NA`) are ignored by every statistic

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use csv::StringRecord;

/// Errors raised while reading or querying the reference dataset.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("Failed to open CSV '{path}': {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to read CSV headers: {0}")]
    Headers(csv::Error),
    #[error("Missing required column: `{0}`")]
    MissingColumn(String),
    #[error("Column `{column}` has a non-numeric value '{value}' on line {line}")]
    NotNumeric {
        column: String,
        line: usize,
        value: String,
    },
    #[error("Column `{0}` has no values")]
    NoValues(String),
}

/// A row-level problem encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Summary statistics of one numeric column (missing cells excluded).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericStats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub median: f64,
}

/// Historical loan records, stored column-wise.
#[derive(Debug, Clone, Default)]
pub struct ReferenceDataset {
    index: HashMap<String, usize>,
    columns: Vec<Vec<String>>,
    rows: usize,
    row_errors: Vec<RowError>,
}

impl ReferenceDataset {
    /// The empty sentinel returned when loading fails.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_path(path: &Path) -> Result<Self, DatasetError> {
        let file = File::open(path).map_err(|source| DatasetError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DatasetError> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = reader.headers().map_err(DatasetError::Headers)?.clone();
        let index = build_header_map(&headers);

        let mut columns = vec![Vec::new(); headers.len()];
        let mut row_errors = Vec::new();
        let mut rows = 0usize;

        for (idx, result) in reader.records().enumerate() {
            // records() starts after the header line; CSV lines are 1-based.
            let line = idx + 2;
            match result {
                Ok(record) => {
                    push_record(&mut columns, &record);
                    rows += 1;
                }
                Err(e) => row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                }),
            }
        }

        if !row_errors.is_empty() {
            tracing::warn!(skipped = row_errors.len(), "skipped malformed reference rows");
        }

        Ok(Self {
            index,
            columns,
            rows,
            row_errors,
        })
    }

    /// Number of data rows (header excluded).
    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn row_errors(&self) -> &[RowError] {
        &self.row_errors
    }

    fn column(&self, name: &str) -> Result<&[String], DatasetError> {
        let idx = self
            .index
            .get(name)
            .ok_or_else(|| DatasetError::MissingColumn(name.to_string()))?;
        Ok(&self.columns[*idx])
    }

    /// Parsed, non-missing numeric values of a column, in row order.
    pub fn numeric_values(&self, name: &str) -> Result<Vec<f64>, DatasetError> {
        let cells = self.column(name)?;
        let mut out = Vec::with_capacity(cells.len());
        for (row, cell) in cells.iter().enumerate() {
            if is_missing(cell) {
                continue;
            }
            match cell.parse::<f64>() {
                Ok(v) if v.is_finite() => out.push(v),
                Ok(_) => {}
                Err(_) => {
                    return Err(DatasetError::NotNumeric {
                        column: name.to_string(),
                        line: row + 2,
                        value: cell.clone(),
                    });
                }
            }
        }
        Ok(out)
    }

    /// Min/max/median of a numeric column.
    pub fn numeric_stats(&self, name: &str) -> Result<NumericStats, DatasetError> {
        let mut values = self.numeric_values(name)?;
        if values.is_empty() {
            return Err(DatasetError::NoValues(name.to_string()));
        }
        values.sort_by(f64::total_cmp);

        let n = values.len();
        let median = if n % 2 == 1 {
            values[n / 2]
        } else {
            (values[n / 2 - 1] + values[n / 2]) / 2.0
        };

        Ok(NumericStats {
            count: n,
            min: values[0],
            max: values[n - 1],
            median,
        })
    }

    /// Distinct non-missing values of a column in first-seen order.
    pub fn unique(&self, name: &str) -> Result<Vec<String>, DatasetError> {
        let cells = self.column(name)?;
        let mut out: Vec<String> = Vec::new();
        for cell in cells {
            if is_missing(cell) || out.iter().any(|seen| seen == cell) {
                continue;
            }
            out.push(cell.clone());
        }
        if out.is_empty() {
            return Err(DatasetError::NoValues(name.to_string()));
        }
        Ok(out)
    }
}

fn push_record(columns: &mut [Vec<String>], record: &StringRecord) {
    // Flexible reader: short rows pad with missing cells, extra cells are dropped.
    for (idx, column) in columns.iter_mut().enumerate() {
        column.push(record.get(idx).unwrap_or("").to_string());
    }
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    let mut map = HashMap::new();
    for (idx, name) in headers.iter().enumerate() {
        // First occurrence wins for duplicated headers.
        map.entry(normalize_header_name(name)).or_insert(idx);
    }
    map
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports sometimes prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn is_missing(cell: &str) -> bool {
    cell.is_empty()
        || cell.eq_ignore_ascii_case("nan")
        || cell.eq_ignore_ascii_case("na")
        || cell.eq_ignore_ascii_case("null")
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\u{feff}id,Person_Age,person_home_ownership,loan_int_rate\n\
        0,37,RENT,11.49\n\
        1,22,OWN,\n\
        2,29,RENT,NaN\n\
        3,30,MORTGAGE,12.5\n";

    #[test]
    fn headers_are_normalized() {
        let ds = ReferenceDataset::from_reader(CSV.as_bytes()).unwrap();
        assert_eq!(ds.len(), 4);
        // BOM stripped from the first header, case folded on the second.
        assert_eq!(ds.unique("id").unwrap().len(), 4);
        assert_eq!(ds.numeric_values("person_age").unwrap(), vec![37.0, 22.0, 29.0, 30.0]);
    }

    #[test]
    fn median_of_even_count_averages_middle_pair() {
        let ds = ReferenceDataset::from_reader(CSV.as_bytes()).unwrap();
        let stats = ds.numeric_stats("person_age").unwrap();
        assert_eq!(stats.min, 22.0);
        assert_eq!(stats.max, 37.0);
        assert_eq!(stats.median, 29.5);
    }

    #[test]
    fn missing_cells_are_skipped() {
        let ds = ReferenceDataset::from_reader(CSV.as_bytes()).unwrap();
        let stats = ds.numeric_stats("loan_int_rate").unwrap();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.median, (11.49 + 12.5) / 2.0);
    }

    #[test]
    fn unique_keeps_first_seen_order() {
        let ds = ReferenceDataset::from_reader(CSV.as_bytes()).unwrap();
        assert_eq!(
            ds.unique("person_home_ownership").unwrap(),
            vec!["RENT", "OWN", "MORTGAGE"]
        );
    }

    #[test]
    fn text_in_numeric_column_is_an_error() {
        let ds = ReferenceDataset::from_reader(CSV.as_bytes()).unwrap();
        let err = ds.numeric_stats("person_home_ownership").unwrap_err();
        assert!(matches!(err, DatasetError::NotNumeric { line: 2, .. }));
    }

    #[test]
    fn missing_column_is_an_error() {
        let ds = ReferenceDataset::from_reader(CSV.as_bytes()).unwrap();
        assert!(matches!(
            ds.unique("loan_grade"),
            Err(DatasetError::MissingColumn(_))
        ));
    }

    #[test]
    fn header_only_file_is_empty() {
        let ds = ReferenceDataset::from_reader("person_age,person_income\n".as_bytes()).unwrap();
        assert!(ds.is_empty());
    }

    #[test]
    fn open_failure_names_the_path() {
        let err = ReferenceDataset::from_path(Path::new("does/not/exist.csv")).unwrap_err();
        assert!(err.to_string().contains("does/not/exist.csv"));
    }
}
