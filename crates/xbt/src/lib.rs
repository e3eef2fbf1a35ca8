//! xbt: loading and exploration of expendable bathythermograph observations.
//!
//! Observations are distributed as one CSV file per year. Loading a range of
//! years yields a single table in which the free-text `instrument` field is
//! split into `model` and `manufacturer` and the `date` field into `year`,
//! `month` and `day`. Rows without a valid date are dropped.
//!
//! # Example
//!
//! ```no_run
//! use xbt::XbtDataset;
//!
//! let dataset = XbtDataset::load("data/xbt", 1966..2016).unwrap();
//!
//! println!("Observations: {}", dataset.num_obs());
//! println!("Unknown models: {}", dataset.num_unknown_model().unwrap());
//!
//! let labelled = dataset.filter_obs("labelled", "labelled").unwrap();
//! println!("Labelled: {}", labelled.num_obs());
//! ```

pub mod dataset;
pub mod error;
pub mod input;
pub mod stats;
pub mod text;

pub use dataset::{DatasetConfig, XbtDataset};
pub use error::{Result, XbtError};
pub use input::{ColumnKind, DataTable, SourceMetadata, TableBackend, Value};
pub use stats::{CruiseStats, CruiseStatsReport};
pub use text::{parse_instrument, parse_observation_date};
