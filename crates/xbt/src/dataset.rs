//! Multi-year XBT observation dataset.

use std::ops::Range;
use std::path::{Path, PathBuf};

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Result, XbtError};
use crate::input::{ColumnKind, DataTable, Parser, ParserConfig, RawTable, SourceMetadata, TableBackend, Value};
use crate::text::{UNKNOWN_MODEL_STR, UNKNOWN_STR, parse_instrument, parse_observation_date};

/// File name of one year's observations; `{year}` is substituted.
pub const XBT_FNAME_TEMPLATE: &str = "xbt_{year}.csv";

/// Index columns written by the exporting tool that carry no data.
pub const EXCLUDE_COLUMNS: &[&str] = &["Unnamed: 0", ""];

/// Pseudo-column selecting rows by whether the probe type is known.
pub const LABELLED_KEY: &str = "labelled";

/// Column names used by the dataset.
pub mod columns {
    pub const INSTRUMENT: &str = "instrument";
    pub const DATE: &str = "date";
    pub const CRUISE: &str = "cruise_number";
    pub const PLATFORM: &str = "platform";
    pub const COUNTRY: &str = "country";
    pub const INSTITUTE: &str = "institute";
    pub const MODEL: &str = "model";
    pub const MANUFACTURER: &str = "manufacturer";
    pub const YEAR: &str = "year";
    pub const MONTH: &str = "month";
    pub const DAY: &str = "day";
}

use columns::{
    CRUISE, COUNTRY, DATE, DAY, INSTITUTE, INSTRUMENT, MANUFACTURER, MODEL, MONTH, PLATFORM, YEAR,
};

/// Where and how to load a dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Directory holding the yearly files.
    pub directory: PathBuf,
    /// First year loaded.
    pub start_year: i32,
    /// Year after the last one loaded.
    pub end_year: i32,
    /// How files are read.
    #[serde(default)]
    pub backend: TableBackend,
    /// Yearly file name template.
    #[serde(default = "default_file_template")]
    pub file_template: String,
}

fn default_file_template() -> String {
    XBT_FNAME_TEMPLATE.to_string()
}

impl DatasetConfig {
    /// Config for `[years.start, years.end)` under `directory`.
    pub fn new(directory: impl Into<PathBuf>, years: Range<i32>) -> Self {
        Self {
            directory: directory.into(),
            start_year: years.start,
            end_year: years.end,
            backend: TableBackend::default(),
            file_template: default_file_template(),
        }
    }

    /// Read a config from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_backend(mut self, backend: TableBackend) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_file_template(mut self, template: impl Into<String>) -> Self {
        self.file_template = template.into();
        self
    }

    pub fn year_range(&self) -> Range<i32> {
        self.start_year..self.end_year
    }

    /// Check the config describes something loadable.
    pub fn validate(&self) -> Result<()> {
        if self.start_year > self.end_year {
            return Err(XbtError::Config(format!(
                "start year {} is after end year {}",
                self.start_year, self.end_year
            )));
        }
        if !self.file_template.contains("{year}") {
            return Err(XbtError::Config(format!(
                "file template '{}' has no {{year}} placeholder",
                self.file_template
            )));
        }
        Ok(())
    }

    /// Path of every yearly file, in year order.
    pub fn dataset_files(&self) -> Vec<(i32, PathBuf)> {
        dataset_files(&self.directory, self.year_range(), &self.file_template)
    }
}

fn dataset_files(directory: &Path, years: Range<i32>, template: &str) -> Vec<(i32, PathBuf)> {
    years
        .map(|year| {
            let name = template.replace("{year}", &year.to_string());
            (year, directory.join(name))
        })
        .collect()
}

/// XBT observations from a range of years, with model, manufacturer and
/// calendar columns derived from the raw fields.
#[derive(Debug, Clone)]
pub struct XbtDataset {
    directory: PathBuf,
    year_range: Range<i32>,
    file_template: String,
    table: DataTable,
    sources: Vec<SourceMetadata>,
}

impl XbtDataset {
    /// Load every yearly file in `[years.start, years.end)` from `directory`.
    pub fn load(directory: impl Into<PathBuf>, years: Range<i32>) -> Result<Self> {
        Self::with_config(DatasetConfig::new(directory, years))
    }

    /// Load the files described by `config`.
    pub fn with_config(config: DatasetConfig) -> Result<Self> {
        config.validate()?;

        let files = config.dataset_files();
        if files.is_empty() {
            return Err(XbtError::EmptyData(format!(
                "year range {}..{} selects no files",
                config.start_year, config.end_year
            )));
        }

        let parser = Parser::with_config(ParserConfig {
            backend: config.backend,
            ..ParserConfig::default()
        });

        let mut raw_tables = Vec::with_capacity(files.len());
        let mut sources = Vec::with_capacity(files.len());
        for (year, path) in &files {
            let (raw, source) = parser.parse_file(path, *year)?;
            info!(year, rows = source.row_count, path = %path.display(), "loaded yearly file");
            raw_tables.push(raw);
            sources.push(source);
        }

        let mut table = RawTable::concat(raw_tables).into_table();
        derive_columns(&mut table)?;

        Ok(Self {
            directory: config.directory,
            year_range: config.start_year..config.end_year,
            file_template: config.file_template,
            table,
            sources,
        })
    }

    /// Wrap an already prepared table. No derivation is run; rows are
    /// padded or truncated to the header width.
    pub fn from_table(directory: impl Into<PathBuf>, years: Range<i32>, table: DataTable) -> Self {
        Self {
            directory: directory.into(),
            year_range: years,
            file_template: default_file_template(),
            table: DataTable::new(table.headers, table.kinds, table.rows),
            sources: Vec::new(),
        }
    }

    /// A dataset with this one's metadata and the given rows.
    fn subset(&self, table: DataTable) -> Self {
        Self {
            directory: self.directory.clone(),
            year_range: self.year_range.clone(),
            file_template: self.file_template.clone(),
            table,
            sources: self.sources.clone(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn year_range(&self) -> Range<i32> {
        self.year_range.clone()
    }

    /// Paths of the yearly files this dataset covers.
    pub fn dataset_files(&self) -> Vec<PathBuf> {
        dataset_files(&self.directory, self.year_range(), &self.file_template)
            .into_iter()
            .map(|(_, path)| path)
            .collect()
    }

    /// Metadata of the files read at load time.
    pub fn sources(&self) -> &[SourceMetadata] {
        &self.sources
    }

    /// The underlying table.
    pub fn data(&self) -> &DataTable {
        &self.table
    }

    pub fn into_table(self) -> DataTable {
        self.table
    }

    /// All cells of one column.
    pub fn column(&self, name: &str) -> Result<Vec<&Value>> {
        self.table.column(name)
    }

    /// `(rows, columns)`.
    pub fn shape(&self) -> (usize, usize) {
        self.table.shape()
    }

    pub fn num_obs(&self) -> usize {
        self.table.row_count()
    }

    /// Distinct values of `field` in first-seen order.
    pub fn property_values(&self, field: &str) -> Result<Vec<Value>> {
        self.table.unique(field)
    }

    pub fn cruises(&self) -> Result<Vec<Value>> {
        self.property_values(CRUISE)
    }

    pub fn instruments(&self) -> Result<Vec<Value>> {
        self.property_values(INSTRUMENT)
    }

    pub fn countries(&self) -> Result<Vec<Value>> {
        self.property_values(COUNTRY)
    }

    pub fn platforms(&self) -> Result<Vec<Value>> {
        self.property_values(PLATFORM)
    }

    pub fn institutes(&self) -> Result<Vec<Value>> {
        self.property_values(INSTITUTE)
    }

    pub fn manufacturers(&self) -> Result<Vec<Value>> {
        self.property_values(MANUFACTURER)
    }

    pub fn models(&self) -> Result<Vec<Value>> {
        self.property_values(MODEL)
    }

    /// Rows whose model contains the unknown sentinel.
    pub fn unknown_model_dataset(&self) -> Result<DataTable> {
        self.table.filter_column(MODEL, is_unknown)
    }

    /// Rows whose manufacturer contains the unknown sentinel.
    pub fn unknown_manufacturer_dataset(&self) -> Result<DataTable> {
        self.table.filter_column(MANUFACTURER, is_unknown)
    }

    pub fn known_model_dataset(&self) -> Result<DataTable> {
        self.table.filter_column(MODEL, |v| !is_unknown(v))
    }

    pub fn known_manufacturer_dataset(&self) -> Result<DataTable> {
        self.table.filter_column(MANUFACTURER, |v| !is_unknown(v))
    }

    pub fn num_unknown_model(&self) -> Result<usize> {
        self.count_where(MODEL, is_unknown)
    }

    pub fn num_unknown_manufacturer(&self) -> Result<usize> {
        self.count_where(MANUFACTURER, is_unknown)
    }

    fn count_where(&self, field: &str, pred: impl Fn(&Value) -> bool) -> Result<usize> {
        let index = self.table.column_index(field)?;
        Ok(self.table.column_values(index).filter(|v| pred(v)).count())
    }

    /// Number of observations per distinct value of `field`.
    ///
    /// Missing cells are counted under [`Value::Null`].
    pub fn distribution(&self, field: &str) -> Result<IndexMap<Value, usize>> {
        self.table.value_counts(field)
    }

    pub fn instrument_distribution(&self) -> Result<IndexMap<Value, usize>> {
        self.distribution(INSTRUMENT)
    }

    pub fn platform_distribution(&self) -> Result<IndexMap<Value, usize>> {
        self.distribution(PLATFORM)
    }

    /// For each distinct value of `subset_field`, the distinct values of
    /// `attr_field` found alongside it.
    pub fn attributes_per_subset(
        &self,
        subset_field: &str,
        attr_field: &str,
    ) -> Result<IndexMap<Value, Vec<Value>>> {
        let attr = self.table.column_index(attr_field)?;
        let groups = self.table.group_indices(subset_field)?;

        Ok(groups
            .into_iter()
            .map(|(key, rows)| {
                let values: IndexSet<&Value> =
                    rows.iter().map(|&row| &self.table.rows[row][attr]).collect();
                (key, values.into_iter().cloned().collect())
            })
            .collect())
    }

    pub fn instruments_by_platform(&self) -> Result<IndexMap<Value, Vec<Value>>> {
        self.attributes_per_subset(PLATFORM, INSTRUMENT)
    }

    pub fn platforms_by_instrument(&self) -> Result<IndexMap<Value, Vec<Value>>> {
        self.attributes_per_subset(INSTRUMENT, PLATFORM)
    }

    /// Observations matching `key`/`value` as a new dataset.
    ///
    /// With `key == "labelled"`, `value` is `"labelled"` (probe type known),
    /// `"unlabelled"` (type unknown) or `"all"`. Otherwise a text value is
    /// matched as a substring of a text column, and anything else by equality.
    /// Missing cells in a text column never match a substring.
    pub fn filter_obs(&self, key: &str, value: impl Into<Value>) -> Result<XbtDataset> {
        let value = value.into();

        let table = if key == LABELLED_KEY {
            self.filter_labelled(&value)?
        } else {
            let index = self.table.column_index(key)?;
            match (self.table.kinds[index], &value) {
                (ColumnKind::Text, Value::Text(needle)) => {
                    self.table.filter(|row| row[index].contains(needle))
                }
                _ => self.table.filter(|row| row[index] == value),
            }
        };

        debug!(key, value = %value, rows = table.row_count(), "filtered observations");
        Ok(self.subset(table))
    }

    fn filter_labelled(&self, value: &Value) -> Result<DataTable> {
        let type_unknown = |want: bool| -> Result<DataTable> {
            let index = self.table.column_index(INSTRUMENT)?;
            Ok(self
                .table
                .filter(|row| row[index].contains(UNKNOWN_MODEL_STR) == want))
        };

        match value.as_str() {
            Some("labelled") => type_unknown(false),
            Some("unlabelled") => type_unknown(true),
            Some("all") => Ok(self.table.clone()),
            _ => {
                warn!(value = %value, "unrecognized labelled filter, keeping all rows");
                Ok(self.table.clone())
            }
        }
    }

    pub(crate) fn subset_rows(&self, rows: &[usize]) -> XbtDataset {
        self.subset(self.table.select_rows(rows))
    }
}

fn is_unknown(value: &Value) -> bool {
    value.contains(UNKNOWN_STR)
}

/// Add the parsed instrument and date columns and drop rows without a date.
fn derive_columns(table: &mut DataTable) -> Result<()> {
    for name in EXCLUDE_COLUMNS {
        if table.drop_column(name) {
            debug!(column = name, "dropped index column");
        }
    }

    let instrument = table.column_index(INSTRUMENT)?;
    let (models, manufacturers): (Vec<Value>, Vec<Value>) = table
        .column_values(instrument)
        .map(|cell| {
            let (model, manufacturer) = parse_instrument(&cell.to_string());
            (Value::Text(model), Value::Text(manufacturer))
        })
        .unzip();

    let date = table.column_index(DATE)?;
    let dates: Vec<(i32, u32, u32)> = table
        .column_values(date)
        .map(|cell| parse_observation_date(&cell.to_string()))
        .collect();

    table.set_column(MODEL, ColumnKind::Text, models);
    table.set_column(MANUFACTURER, ColumnKind::Text, manufacturers);
    table.set_column(
        YEAR,
        ColumnKind::Integer,
        dates.iter().map(|d| Value::from(d.0)).collect(),
    );
    table.set_column(
        MONTH,
        ColumnKind::Integer,
        dates.iter().map(|d| Value::from(i64::from(d.1))).collect(),
    );
    table.set_column(
        DAY,
        ColumnKind::Integer,
        dates.iter().map(|d| Value::from(i64::from(d.2))).collect(),
    );

    let year = table.column_index(YEAR)?;
    let before = table.row_count();
    table.rows.retain(|row| row[year] != Value::Integer(0));
    let dropped = before - table.row_count();
    if dropped > 0 {
        debug!(dropped, "dropped observations with invalid dates");
    }
    info!(rows = table.row_count(), dropped, "derived model, manufacturer and date columns");

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    const HEADER: &str = "Unnamed: 0,cruise_number,instrument,date,platform,country,institute";

    fn write_year(dir: &Path, year: i32, rows: &[&str]) {
        let mut content = String::from(HEADER);
        content.push('\n');
        for row in rows {
            content.push_str(row);
            content.push('\n');
        }
        fs::write(dir.join(format!("xbt_{}.csv", year)), content).unwrap();
    }

    fn sample_dataset() -> (TempDir, XbtDataset) {
        let dir = TempDir::new().unwrap();
        write_year(
            dir.path(),
            2003,
            &[
                "0,101,XBT: T-7 (SIPPICAN),20030415,SHIP A,US,NOAA",
                "1,101,XBT: TYPE UNKNOWN (UNKNOWN BRAND),20030416,SHIP A,US,NOAA",
                "2,102,XBT: T-4 (SIPPICAN),notadate,SHIP B,JP,JMA",
            ],
        );
        write_year(
            dir.path(),
            2004,
            &[
                "0,102,XBT: DEEP BLUE (TSK - TSURUMI SEIKI Co.),20040101,SHIP B,JP,JMA",
                "1,103,CTD: SBE 911,20041231,SHIP C,AU,CSIRO",
            ],
        );
        let dataset = XbtDataset::load(dir.path(), 2003..2005).unwrap();
        (dir, dataset)
    }

    #[test]
    fn test_load_drops_invalid_dates_and_index() {
        let (_dir, ds) = sample_dataset();

        assert_eq!(ds.num_obs(), 4);
        assert!(!ds.data().has_column("Unnamed: 0"));
        // 6 raw columns + 5 derived
        assert_eq!(ds.shape(), (4, 11));
        assert!(ds.column(YEAR).unwrap().iter().all(|v| **v != Value::Integer(0)));
        assert_eq!(ds.sources().len(), 2);
    }

    #[test]
    fn test_derived_columns() {
        let (_dir, ds) = sample_dataset();

        assert_eq!(
            ds.models().unwrap(),
            vec![
                Value::from("T-7"),
                Value::from("TYPE UNKNOWN"),
                Value::from("DEEP BLUE"),
                Value::from("UNKNOWN"),
            ]
        );
        let table = ds.data();
        let year = table.column_index(YEAR).unwrap();
        let month = table.column_index(MONTH).unwrap();
        let day = table.column_index(DAY).unwrap();
        assert_eq!(table.rows[0][year], Value::Integer(2003));
        assert_eq!(table.rows[0][month], Value::Integer(4));
        assert_eq!(table.rows[0][day], Value::Integer(15));
    }

    #[test]
    fn test_unique_accessors() {
        let (_dir, ds) = sample_dataset();

        assert_eq!(
            ds.cruises().unwrap(),
            vec![Value::Integer(101), Value::Integer(102), Value::Integer(103)]
        );
        assert_eq!(ds.countries().unwrap().len(), 3);
        assert_eq!(ds.platforms().unwrap().len(), 3);
        assert_eq!(ds.institutes().unwrap()[0], Value::from("NOAA"));
        assert!(matches!(
            ds.property_values("salinity"),
            Err(XbtError::ColumnNotFound(_))
        ));
    }

    #[test]
    fn test_unknown_views_partition() {
        let (_dir, ds) = sample_dataset();

        let unknown = ds.unknown_model_dataset().unwrap();
        let known = ds.known_model_dataset().unwrap();
        assert_eq!(unknown.row_count(), 2);
        assert_eq!(unknown.row_count() + known.row_count(), ds.num_obs());
        assert_eq!(ds.num_unknown_model().unwrap(), 2);
        assert_eq!(ds.num_unknown_manufacturer().unwrap(), 2);
        assert_eq!(
            ds.known_manufacturer_dataset().unwrap().row_count(),
            ds.num_obs() - 2
        );
    }

    #[test]
    fn test_filter_obs_substring_and_equality() {
        let (_dir, ds) = sample_dataset();

        let sippican = ds.filter_obs(MANUFACTURER, "SIPP").unwrap();
        assert_eq!(sippican.num_obs(), 1);

        let cruise = ds.filter_obs(CRUISE, 102i64).unwrap();
        assert_eq!(cruise.num_obs(), 1);
        assert_eq!(cruise.year_range(), 2003..2005);
        assert_eq!(cruise.directory(), ds.directory());

        // Text needle against an integer column never matches
        assert_eq!(ds.filter_obs(CRUISE, "102").unwrap().num_obs(), 0);
    }

    #[test]
    fn test_filter_labelled() {
        let (_dir, ds) = sample_dataset();

        let labelled = ds.filter_obs(LABELLED_KEY, "labelled").unwrap();
        let unlabelled = ds.filter_obs(LABELLED_KEY, "unlabelled").unwrap();
        let all = ds.filter_obs(LABELLED_KEY, "all").unwrap();

        assert_eq!(labelled.num_obs(), 3);
        assert_eq!(unlabelled.num_obs(), 1);
        assert_eq!(all.num_obs(), ds.num_obs());
    }

    #[test]
    fn test_distributions() {
        let (_dir, ds) = sample_dataset();

        let platforms = ds.platform_distribution().unwrap();
        assert_eq!(platforms.get(&Value::from("SHIP A")), Some(&2));
        assert_eq!(platforms.values().sum::<usize>(), ds.num_obs());

        let instruments = ds.instrument_distribution().unwrap();
        assert_eq!(instruments.len(), 4);
    }

    #[test]
    fn test_co_occurrence() {
        let (_dir, ds) = sample_dataset();

        let by_platform = ds.instruments_by_platform().unwrap();
        assert_eq!(by_platform[&Value::from("SHIP A")].len(), 2);

        let by_instrument = ds.platforms_by_instrument().unwrap();
        assert_eq!(
            by_instrument[&Value::from("XBT: T-7 (SIPPICAN)")],
            vec![Value::from("SHIP A")]
        );
    }

    #[test]
    fn test_load_replaces_columns_named_like_derived_ones() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("xbt_2003.csv"),
            "instrument,date,year,model\n\
             XBT: T-7 (SIPPICAN),notadate,2003,T-7\n\
             CTD: SBE,20030415,2003,T-7\n",
        )
        .unwrap();
        let ds = XbtDataset::load(dir.path(), 2003..2004).unwrap();

        assert_eq!(ds.num_obs(), 1);
        assert_eq!(
            ds.data().headers,
            vec!["instrument", "date", "year", "model", "manufacturer", "month", "day"]
        );
        assert_eq!(ds.models().unwrap(), vec![Value::from("UNKNOWN")]);
        assert_eq!(ds.num_unknown_model().unwrap(), 1);
        assert_eq!(ds.column(YEAR).unwrap(), vec![&Value::Integer(2003)]);
    }

    #[test]
    fn test_from_table_with_short_rows() {
        let table = DataTable::new(
            vec![INSTRUMENT.to_string(), PLATFORM.to_string()],
            vec![ColumnKind::Text, ColumnKind::Text],
            vec![vec![Value::from("XBT: T-7 (SIPPICAN)")]],
        );
        let ds = XbtDataset::from_table("data", 2003..2004, table);

        assert_eq!(ds.filter_obs(PLATFORM, "SHIP").unwrap().num_obs(), 0);
        assert_eq!(
            ds.instruments_by_platform().unwrap()[&Value::Null],
            vec![Value::from("XBT: T-7 (SIPPICAN)")]
        );

        let literal = DataTable {
            headers: vec![INSTRUMENT.to_string(), PLATFORM.to_string()],
            kinds: vec![ColumnKind::Text],
            rows: vec![vec![]],
        };
        let ds = XbtDataset::from_table("data", 2003..2004, literal);
        assert_eq!(ds.shape(), (1, 2));
        assert_eq!(ds.platform_distribution().unwrap()[&Value::Null], 1);
    }

    #[test]
    fn test_from_table_skips_derivation() {
        let (_dir, ds) = sample_dataset();
        let table = ds.data().clone();
        let wrapped = XbtDataset::from_table("elsewhere", 1990..1991, table);

        assert_eq!(wrapped.shape(), ds.shape());
        assert!(wrapped.sources().is_empty());
        assert_eq!(
            wrapped.dataset_files(),
            vec![PathBuf::from("elsewhere/xbt_1990.csv")]
        );
    }

    #[test]
    fn test_missing_year_file() {
        let (dir, _) = sample_dataset();
        let result = XbtDataset::load(dir.path(), 2003..2006);
        assert!(matches!(result, Err(XbtError::Io { .. })));
    }

    #[test]
    fn test_config_validation() {
        assert!(matches!(
            XbtDataset::with_config(DatasetConfig::new("data", 2005..2003)),
            Err(XbtError::Config(_))
        ));
        assert!(matches!(
            XbtDataset::with_config(DatasetConfig::new("data", 2003..2003)),
            Err(XbtError::EmptyData(_))
        ));
        assert!(matches!(
            DatasetConfig::new("data", 2003..2004)
                .with_file_template("xbt.csv")
                .validate(),
            Err(XbtError::Config(_))
        ));
    }

    #[test]
    fn test_config_from_json() {
        let config = DatasetConfig::from_json(
            r#"{"directory": "/data/xbt", "start_year": 1966, "end_year": 2016, "backend": "streaming"}"#,
        )
        .unwrap();

        assert_eq!(config.year_range(), 1966..2016);
        assert_eq!(config.backend, TableBackend::Streaming);
        assert_eq!(config.file_template, XBT_FNAME_TEMPLATE);
        assert_eq!(
            config.dataset_files()[0],
            (1966, PathBuf::from("/data/xbt/xbt_1966.csv"))
        );
    }
}
