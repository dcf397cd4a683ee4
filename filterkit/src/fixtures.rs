//! Test fixture data: date-range presets and the side-sheet layout.
//!
//! Loaded from a `testData.json`-shaped file and passed explicitly to the
//! helpers that need it.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::side_sheet::SideSheetLayout;

/// Day-month-year, the format the dashboard's date inputs and table cells use.
pub const DASHBOARD_DATE_FORMAT: &str = "%d-%m-%Y";

#[derive(Error, Debug)]
pub enum FixtureError {
    #[error("Failed to read fixtures from {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid fixture JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Date configuration '{0}' not found in fixtures")]
    UnknownPreset(String),

    #[error("Invalid dashboard date {value:?}: {source}")]
    BadDate {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// Parse a `dd-mm-yyyy` date as shown by the dashboard.
pub fn parse_dashboard_date(value: &str) -> Result<NaiveDate, FixtureError> {
    NaiveDate::parse_from_str(value.trim(), DASHBOARD_DATE_FORMAT).map_err(|source| {
        FixtureError::BadDate {
            value: value.to_string(),
            source,
        }
    })
}

/// A named creation-date filter: a start date and, for ranges, an end date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRangePreset {
    pub start_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

impl DateRangePreset {
    pub fn start(&self) -> Result<NaiveDate, FixtureError> {
        parse_dashboard_date(&self.start_date)
    }

    pub fn end(&self) -> Result<Option<NaiveDate>, FixtureError> {
        self.end_date.as_deref().map(parse_dashboard_date).transpose()
    }

    /// Whether `date` falls inside the preset. A preset without an end date is
    /// open-ended.
    pub fn contains(&self, date: NaiveDate) -> Result<bool, FixtureError> {
        if date < self.start()? {
            return Ok(false);
        }
        Ok(match self.end()? {
            Some(end) => date <= end,
            None => true,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FixtureStore {
    pub creation_date_filters: BTreeMap<String, DateRangePreset>,
    pub side_sheet: SideSheetLayout,
}

impl FixtureStore {
    pub fn from_json(json: &str) -> Result<Self, FixtureError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, FixtureError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| FixtureError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn date_preset(&self, name: &str) -> Result<&DateRangePreset, FixtureError> {
        self.creation_date_filters
            .get(name)
            .ok_or_else(|| FixtureError::UnknownPreset(name.to_string()))
    }
}
