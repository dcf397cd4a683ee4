use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::AutomationError;

/// The phase of a filter interaction that failed.
///
/// Callers branch on this, so the serialized names are part of the interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FilterStep {
    /// The popup never became visible
    VisibilityWait,
    /// The search left no candidates at all
    SearchResults,
    /// Candidates were rendered but none equals the search value
    ExactMatch,
    /// The checkbox did not stay checked after the click
    VerifySelection,
    /// Anything else, with the underlying cause attached
    Unexpected,
}

impl FilterStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterStep::VisibilityWait => "VISIBILITY_WAIT",
            FilterStep::SearchResults => "SEARCH_RESULTS",
            FilterStep::ExactMatch => "EXACT_MATCH",
            FilterStep::VerifySelection => "VERIFY_SELECTION",
            FilterStep::Unexpected => "UNEXPECTED",
        }
    }
}

impl std::fmt::Display for FilterStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
#[error("[{step}] {message}")]
pub struct FilterError {
    pub message: String,
    pub step: FilterStep,
    #[source]
    pub source: Option<AutomationError>,
    pub timestamp: DateTime<Utc>,
}

impl FilterError {
    pub fn new(step: FilterStep, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            step,
            source: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_source(step: FilterStep, message: impl Into<String>, source: AutomationError) -> Self {
        Self {
            source: Some(source),
            ..Self::new(step, message)
        }
    }

    pub fn step(&self) -> FilterStep {
        self.step
    }
}

/// Lower-level failures that reach the caller unclassified become `UNEXPECTED`.
impl From<AutomationError> for FilterError {
    fn from(err: AutomationError) -> Self {
        FilterError::with_source(FilterStep::Unexpected, err.to_string(), err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_step_names_are_verbatim() {
        let names: Vec<String> = [
            FilterStep::VisibilityWait,
            FilterStep::SearchResults,
            FilterStep::ExactMatch,
            FilterStep::VerifySelection,
            FilterStep::Unexpected,
        ]
        .iter()
        .map(|s| serde_json::to_value(s).unwrap().as_str().unwrap().to_string())
        .collect();
        assert_eq!(
            names,
            ["VISIBILITY_WAIT", "SEARCH_RESULTS", "EXACT_MATCH", "VERIFY_SELECTION", "UNEXPECTED"]
        );
        for step in [FilterStep::ExactMatch, FilterStep::Unexpected] {
            assert_eq!(serde_json::to_value(step).unwrap(), step.as_str());
        }
    }

    #[test]
    fn test_unclassified_errors_wrap_as_unexpected() {
        let err: FilterError = AutomationError::Protocol("socket reset".into()).into();
        assert_eq!(err.step(), FilterStep::Unexpected);
        assert!(err.to_string().starts_with("[UNEXPECTED]"));
        let cause = err.source().expect("cause is preserved");
        assert!(cause.to_string().contains("socket reset"));
    }
}
