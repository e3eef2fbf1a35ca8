//! Per-cruise model and manufacturer statistics.

use serde::{Deserialize, Serialize};

use crate::dataset::XbtDataset;
use crate::dataset::columns::CRUISE;
use crate::error::Result;
use crate::input::Value;

/// Model and manufacturer coverage of one cruise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CruiseStats {
    /// Cruise identifier.
    pub cruise: Value,
    pub num_obs: usize,
    /// Distinct models, first-seen order.
    pub models: Vec<Value>,
    pub num_models: usize,
    pub num_unknown_model: usize,
    /// Distinct manufacturers, first-seen order.
    pub manufacturers: Vec<Value>,
    pub num_manufacturers: usize,
    pub num_unknown_manufacturer: usize,
}

impl CruiseStats {
    /// Every observation on the cruise has an unknown model.
    pub fn has_no_model_data(&self) -> bool {
        self.num_unknown_model == self.num_obs
    }

    /// Every observation on the cruise has an unknown manufacturer.
    pub fn has_no_manufacturer_data(&self) -> bool {
        self.num_unknown_manufacturer == self.num_obs
    }
}

/// Cruise statistics for a whole dataset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CruiseStatsReport {
    /// One entry per cruise, first-seen order.
    pub cruises: Vec<CruiseStats>,
    /// Cruises with at least one unknown-model observation.
    pub num_unknown_model: usize,
    /// Cruises where no observation has a known model.
    pub num_no_model_data: usize,
    /// Cruises with at least one unknown-manufacturer observation.
    pub num_unknown_manufacturer: usize,
    /// Cruises where no observation has a known manufacturer.
    pub num_no_manufacturer_data: usize,
}

impl CruiseStatsReport {
    /// Statistics for one cruise.
    pub fn get(&self, cruise: &Value) -> Option<&CruiseStats> {
        self.cruises.iter().find(|c| &c.cruise == cruise)
    }

    /// Total observations across all cruises.
    pub fn total_obs(&self) -> usize {
        self.cruises.iter().map(|c| c.num_obs).sum()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl XbtDataset {
    /// Compute model and manufacturer statistics for every cruise.
    ///
    /// Rows are grouped by exact cruise identifier, so the per-cruise
    /// observation counts sum to [`XbtDataset::num_obs`].
    pub fn cruise_stats(&self) -> Result<CruiseStatsReport> {
        let mut report = CruiseStatsReport::default();

        for (cruise, rows) in self.data().group_indices(CRUISE)? {
            let cruise_obs = self.subset_rows(&rows);

            let models = cruise_obs.models()?;
            let manufacturers = cruise_obs.manufacturers()?;
            let stats = CruiseStats {
                cruise,
                num_obs: cruise_obs.num_obs(),
                num_models: models.len(),
                models,
                num_unknown_model: cruise_obs.num_unknown_model()?,
                num_manufacturers: manufacturers.len(),
                manufacturers,
                num_unknown_manufacturer: cruise_obs.num_unknown_manufacturer()?,
            };

            if stats.num_unknown_model > 0 {
                report.num_unknown_model += 1;
            }
            if stats.has_no_model_data() {
                report.num_no_model_data += 1;
            }
            if stats.num_unknown_manufacturer > 0 {
                report.num_unknown_manufacturer += 1;
            }
            if stats.has_no_manufacturer_data() {
                report.num_no_manufacturer_data += 1;
            }

            report.cruises.push(stats);
        }

        Ok(report)
    }
}
