//! Tabular data model and source metadata.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::error::{Result, XbtError};

/// Metadata about one loaded yearly file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceMetadata {
    /// File name without path.
    pub file: String,
    /// Full path to the file.
    pub path: PathBuf,
    /// Year the file holds observations for.
    pub year: i32,
    /// SHA-256 hash of the file contents.
    pub hash: String,
    /// File size in bytes.
    pub size_bytes: u64,
    /// Number of data rows (excluding header).
    pub row_count: usize,
    /// Number of columns.
    pub column_count: usize,
    /// When the file was read.
    pub loaded_at: DateTime<Utc>,
}

impl SourceMetadata {
    /// Create metadata for a file that has been read.
    pub fn new(
        path: PathBuf,
        year: i32,
        hash: String,
        size_bytes: u64,
        row_count: usize,
        column_count: usize,
    ) -> Self {
        let file = path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            file,
            path,
            year,
            hash,
            size_bytes,
            row_count,
            column_count,
            loaded_at: Utc::now(),
        }
    }
}

/// Storage kind of a column, inferred from its cells at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Integer,
    Float,
    Text,
}

/// A single table cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Value {
    /// Convert a raw CSV cell into a value of the given column kind.
    ///
    /// Cells that cannot be read as the column kind become `Null`.
    pub fn parse(raw: &str, kind: ColumnKind) -> Self {
        if DataTable::is_null_value(raw) {
            return Value::Null;
        }
        match kind {
            ColumnKind::Integer => raw.trim().parse().map_or(Value::Null, Value::Integer),
            ColumnKind::Float => raw.trim().parse().map_or(Value::Null, Value::Float),
            ColumnKind::Text => Value::Text(raw.to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The text content, if this is a text cell.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Whether this is a text cell containing `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.as_str().is_some_and(|s| s.contains(needle))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Text(a), Value::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Integer(n) => n.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::Text(s) => s.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Integer(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{}", x),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(i64::from(n))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

/// Raw string records as read from one or more CSV files.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    /// Column headers.
    pub headers: Vec<String>,
    /// Row data as strings (row-major order).
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Stack tables in order. Headers are unioned in first-seen order and
    /// cells for columns a table lacks are left empty.
    pub fn concat(tables: impl IntoIterator<Item = RawTable>) -> RawTable {
        let tables: Vec<RawTable> = tables.into_iter().collect();

        let headers: IndexSet<String> = tables
            .iter()
            .flat_map(|t| t.headers.iter().cloned())
            .collect();

        let mut rows = Vec::with_capacity(tables.iter().map(|t| t.rows.len()).sum());
        for table in tables {
            let positions: Vec<Option<usize>> = headers
                .iter()
                .map(|h| table.headers.iter().position(|th| th == h))
                .collect();
            for mut row in table.rows {
                let out: Vec<String> = positions
                    .iter()
                    .map(|pos| match pos {
                        Some(i) => std::mem::take(&mut row[*i]),
                        None => String::new(),
                    })
                    .collect();
                rows.push(out);
            }
        }

        RawTable {
            headers: headers.into_iter().collect(),
            rows,
        }
    }

    /// Infer a kind for every column and convert the cells.
    pub fn into_table(mut self) -> DataTable {
        let width = self.headers.len();
        for row in &mut self.rows {
            row.resize(width, String::new());
        }

        let kinds: Vec<ColumnKind> = (0..self.headers.len())
            .map(|i| infer_kind(self.rows.iter().map(|r| r[i].as_str())))
            .collect();

        let rows: Vec<Vec<Value>> = self
            .rows
            .into_iter()
            .map(|row| {
                row.iter()
                    .zip(&kinds)
                    .map(|(raw, kind)| Value::parse(raw, *kind))
                    .collect()
            })
            .collect();

        DataTable::new(self.headers, kinds, rows)
    }
}

/// Pick the narrowest kind every non-null cell can be read as.
fn infer_kind<'a>(cells: impl Iterator<Item = &'a str>) -> ColumnKind {
    let mut all_int = true;
    let mut all_float = true;
    let mut seen = false;

    for cell in cells.filter(|c| !DataTable::is_null_value(c)) {
        seen = true;
        let cell = cell.trim();
        if all_int && cell.parse::<i64>().is_err() {
            all_int = false;
        }
        if !all_int && cell.parse::<f64>().is_err() {
            all_float = false;
            break;
        }
    }

    match (seen, all_int, all_float) {
        (false, _, _) => ColumnKind::Text,
        (true, true, _) => ColumnKind::Integer,
        (true, false, true) => ColumnKind::Float,
        _ => ColumnKind::Text,
    }
}

/// In-memory observation table.
#[derive(Debug, Clone, Default)]
pub struct DataTable {
    /// Column headers.
    pub headers: Vec<String>,
    /// Storage kind per column.
    pub kinds: Vec<ColumnKind>,
    /// Row data (row-major order).
    pub rows: Vec<Vec<Value>>,
}

impl DataTable {
    /// Create a new data table.
    ///
    /// Rows and kinds are padded or truncated to the header width; missing
    /// cells are `Null` and missing kinds are `Text`.
    pub fn new(headers: Vec<String>, mut kinds: Vec<ColumnKind>, mut rows: Vec<Vec<Value>>) -> Self {
        let width = headers.len();
        kinds.resize(width, ColumnKind::Text);
        for row in &mut rows {
            row.resize(width, Value::Null);
        }
        Self {
            headers,
            kinds,
            rows,
        }
    }

    /// Get the number of columns.
    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// Get the number of rows (excluding header).
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// `(rows, columns)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.row_count(), self.column_count())
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h == name)
    }

    /// Position of a column, or [`XbtError::ColumnNotFound`].
    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| XbtError::ColumnNotFound(name.to_string()))
    }

    pub fn column_kind(&self, name: &str) -> Result<ColumnKind> {
        Ok(self.kinds[self.column_index(name)?])
    }

    /// Get all values for a column by index.
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &Value> {
        self.rows.iter().map(move |row| &row[index])
    }

    /// Get a column by name.
    pub fn column(&self, name: &str) -> Result<Vec<&Value>> {
        let index = self.column_index(name)?;
        Ok(self.column_values(index).collect())
    }

    /// Get a specific cell value.
    pub fn get(&self, row: usize, col: usize) -> Option<&Value> {
        self.rows.get(row).and_then(|r| r.get(col))
    }

    /// Distinct values of a column in first-seen order.
    pub fn unique(&self, name: &str) -> Result<Vec<Value>> {
        let index = self.column_index(name)?;
        let seen: IndexSet<&Value> = self.column_values(index).collect();
        Ok(seen.into_iter().cloned().collect())
    }

    /// Number of rows holding each distinct value, in first-seen order.
    pub fn value_counts(&self, name: &str) -> Result<IndexMap<Value, usize>> {
        let index = self.column_index(name)?;
        let mut counts: IndexMap<Value, usize> = IndexMap::new();
        for value in self.column_values(index) {
            *counts.entry(value.clone()).or_insert(0) += 1;
        }
        Ok(counts)
    }

    /// Row indices for each distinct value, in first-seen order.
    pub fn group_indices(&self, name: &str) -> Result<IndexMap<Value, Vec<usize>>> {
        let index = self.column_index(name)?;
        let mut groups: IndexMap<Value, Vec<usize>> = IndexMap::new();
        for (row, value) in self.column_values(index).enumerate() {
            groups.entry(value.clone()).or_default().push(row);
        }
        Ok(groups)
    }

    /// New table holding the rows for which `keep` is true.
    pub fn filter(&self, mut keep: impl FnMut(&[Value]) -> bool) -> DataTable {
        let rows = self
            .rows
            .iter()
            .filter(|row| keep(row))
            .cloned()
            .collect();
        DataTable::new(self.headers.clone(), self.kinds.clone(), rows)
    }

    /// New table holding the rows whose cell in `name` satisfies `keep`.
    pub fn filter_column(&self, name: &str, keep: impl Fn(&Value) -> bool) -> Result<DataTable> {
        let index = self.column_index(name)?;
        Ok(self.filter(|row| keep(&row[index])))
    }

    /// New table holding the given rows, in the given order.
    pub fn select_rows(&self, indices: &[usize]) -> DataTable {
        let rows = indices
            .iter()
            .filter_map(|&i| self.rows.get(i).cloned())
            .collect();
        DataTable::new(self.headers.clone(), self.kinds.clone(), rows)
    }

    /// Set a column, replacing a same-named one in place or appending.
    /// `values` must hold one cell per row.
    pub(crate) fn set_column(&mut self, name: &str, kind: ColumnKind, values: Vec<Value>) {
        debug_assert_eq!(values.len(), self.rows.len());
        match self.headers.iter().position(|h| h == name) {
            Some(index) => {
                self.kinds[index] = kind;
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[index] = value;
                }
            }
            None => {
                self.headers.push(name.to_string());
                self.kinds.push(kind);
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
    }

    /// Remove a column if present. Returns whether it existed.
    pub(crate) fn drop_column(&mut self, name: &str) -> bool {
        let Ok(index) = self.column_index(name) else {
            return false;
        };
        self.headers.remove(index);
        self.kinds.remove(index);
        for row in &mut self.rows {
            row.remove(index);
        }
        true
    }

    /// Check if a raw cell represents a missing value.
    pub fn is_null_value(value: &str) -> bool {
        let trimmed = value.trim();
        trimmed.is_empty()
            || trimmed.eq_ignore_ascii_case("na")
            || trimmed.eq_ignore_ascii_case("n/a")
            || trimmed.eq_ignore_ascii_case("nan")
            || trimmed.eq_ignore_ascii_case("null")
            || trimmed == "#N/A"
            || trimmed == "<NA>"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(headers: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable::new(
            headers.iter().map(|s| s.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn test_infer_kinds() {
        let table = raw(
            &["id", "depth", "ship"],
            &[&["1", "10.5", "A"], &["2", "", "B"], &["3", "7", "C"]],
        )
        .into_table();

        assert_eq!(
            table.kinds,
            vec![ColumnKind::Integer, ColumnKind::Float, ColumnKind::Text]
        );
        assert_eq!(table.get(0, 0), Some(&Value::Integer(1)));
        assert_eq!(table.get(1, 1), Some(&Value::Null));
        assert_eq!(table.get(2, 2), Some(&Value::from("C")));
    }

    #[test]
    fn test_concat_unions_headers() {
        let a = raw(&["x", "y"], &[&["1", "a"]]);
        let b = raw(&["y", "z"], &[&["b", "2"]]);
        let merged = RawTable::concat([a, b]);

        assert_eq!(merged.headers, vec!["x", "y", "z"]);
        assert_eq!(merged.rows[0], vec!["1", "a", ""]);
        assert_eq!(merged.rows[1], vec!["", "b", "2"]);
    }

    #[test]
    fn test_unique_and_counts_keep_first_seen_order() {
        let table = raw(&["ship"], &[&["B"], &["A"], &["B"], &["C"]]).into_table();

        assert_eq!(
            table.unique("ship").unwrap(),
            vec![Value::from("B"), Value::from("A"), Value::from("C")]
        );
        let counts = table.value_counts("ship").unwrap();
        assert_eq!(counts.get(&Value::from("B")), Some(&2));
        assert_eq!(counts.get_index(1), Some((&Value::from("A"), &1)));
    }

    #[test]
    fn test_missing_column() {
        let table = raw(&["ship"], &[&["A"]]).into_table();
        assert!(matches!(
            table.unique("nope"),
            Err(XbtError::ColumnNotFound(name)) if name == "nope"
        ));
    }

    #[test]
    fn test_short_rows_are_padded() {
        let table = DataTable::new(
            vec!["instrument".into(), "platform".into()],
            vec![ColumnKind::Text],
            vec![vec![Value::from("XBT: T-7")], vec![]],
        );

        assert_eq!(table.kinds, vec![ColumnKind::Text, ColumnKind::Text]);
        assert_eq!(table.get(0, 1), Some(&Value::Null));
        assert_eq!(table.unique("platform").unwrap(), vec![Value::Null]);

        let raw = RawTable::new(
            vec!["a".into(), "b".into()],
            vec![vec!["1".into()], vec!["2".into(), "x".into(), "extra".into()]],
        )
        .into_table();
        assert_eq!(raw.get(0, 1), Some(&Value::Null));
        assert_eq!(raw.rows[1].len(), 2);
    }

    #[test]
    fn test_set_column_replaces_existing() {
        let mut table = raw(&["year", "ship"], &[&["1999", "A"], &["1999", "B"]]).into_table();
        table.set_column(
            "year",
            ColumnKind::Integer,
            vec![Value::Integer(0), Value::Integer(2003)],
        );

        assert_eq!(table.headers, vec!["year", "ship"]);
        assert_eq!(table.get(0, 0), Some(&Value::Integer(0)));
        assert_eq!(table.get(1, 0), Some(&Value::Integer(2003)));
    }

    #[test]
    fn test_drop_and_set_column() {
        let mut table = raw(&["idx", "ship"], &[&["0", "A"], &["1", "B"]]).into_table();
        assert!(table.drop_column("idx"));
        assert!(!table.drop_column("idx"));
        table.set_column(
            "year",
            ColumnKind::Integer,
            vec![Value::Integer(2001), Value::Integer(2002)],
        );

        assert_eq!(table.headers, vec!["ship", "year"]);
        assert_eq!(table.get(1, 1), Some(&Value::Integer(2002)));
    }

    #[test]
    fn test_group_indices() {
        let table = raw(&["cruise"], &[&["7"], &["3"], &["7"]]).into_table();
        let groups = table.group_indices("cruise").unwrap();
        assert_eq!(groups.get(&Value::Integer(7)), Some(&vec![0, 2]));
        assert_eq!(groups.get(&Value::Integer(3)), Some(&vec![1]));
    }

    #[test]
    fn test_is_null_value() {
        assert!(DataTable::is_null_value(""));
        assert!(DataTable::is_null_value("NA"));
        assert!(DataTable::is_null_value("NaN"));
        assert!(DataTable::is_null_value("null"));
        assert!(!DataTable::is_null_value("value"));
        assert!(!DataTable::is_null_value("0"));
    }
}
