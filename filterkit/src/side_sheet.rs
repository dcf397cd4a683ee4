//! Reading values out of the transaction detail side sheet.
//!
//! The sheet is a column of "cards", each holding a list of item rows, each row
//! holding a label and a value. A value is addressed by (section, item), where
//! either half can be a raw position or a name looked up in [`SideSheetLayout`].

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::{AutomationError, Locator};

/// Where a side-sheet value lives: a position, or a name from the layout tables.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SideSheetCoordinate {
    Index(usize),
    Named(String),
}

impl std::fmt::Display for SideSheetCoordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SideSheetCoordinate::Index(i) => write!(f, "{i}"),
            SideSheetCoordinate::Named(name) => write!(f, "{name}"),
        }
    }
}

impl From<usize> for SideSheetCoordinate {
    fn from(index: usize) -> Self {
        SideSheetCoordinate::Index(index)
    }
}

impl From<&str> for SideSheetCoordinate {
    fn from(name: &str) -> Self {
        SideSheetCoordinate::Named(name.to_string())
    }
}

impl From<String> for SideSheetCoordinate {
    fn from(name: String) -> Self {
        SideSheetCoordinate::Named(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SideSheetSelectors {
    pub content: String,
    pub card: String,
    pub item_container: String,
    pub item: String,
    pub value_span: String,
}

impl Default for SideSheetSelectors {
    fn default() -> Self {
        Self {
            content: ".side-sheet__content".to_string(),
            card: ".list-card".to_string(),
            item_container: ".transaction-list".to_string(),
            item: ".transaction-list-item".to_string(),
            value_span: "p:nth-child(2) span".to_string(),
        }
    }
}

/// Name tables and selectors describing the side sheet.
///
/// Section positions are 1-based (`:nth-child` of the card), item positions are
/// 0-based within the card's list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SideSheetLayout {
    pub sections: BTreeMap<String, usize>,
    pub items: BTreeMap<String, usize>,
    pub selectors: SideSheetSelectors,
    /// How long to wait for the value element, in milliseconds.
    pub timeout: u64,
}

impl Default for SideSheetLayout {
    fn default() -> Self {
        Self {
            sections: BTreeMap::new(),
            items: BTreeMap::new(),
            selectors: SideSheetSelectors::default(),
            timeout: 15_000,
        }
    }
}

impl SideSheetLayout {
    pub fn section(mut self, name: &str, position: usize) -> Self {
        self.sections.insert(name.to_string(), position);
        self
    }

    pub fn item(mut self, name: &str, index: usize) -> Self {
        self.items.insert(name.to_string(), index);
        self
    }

    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.timeout = ms;
        self
    }

    pub fn resolve_section(&self, section: &SideSheetCoordinate) -> Result<usize, SideSheetError> {
        match section {
            SideSheetCoordinate::Index(i) => Ok(*i),
            SideSheetCoordinate::Named(name) => self
                .sections
                .get(name)
                .copied()
                .ok_or_else(|| SideSheetError::UnknownSection(name.clone())),
        }
    }

    pub fn resolve_item(&self, item: &SideSheetCoordinate) -> Result<usize, SideSheetError> {
        match item {
            SideSheetCoordinate::Index(i) => Ok(*i),
            SideSheetCoordinate::Named(name) => self
                .items
                .get(name)
                .copied()
                .ok_or_else(|| SideSheetError::UnknownItem(name.clone())),
        }
    }
}

/// Why the value at a resolved coordinate could not be read.
#[derive(Error, Debug)]
pub enum ValueFault {
    #[error("Side Sheet value is empty. Selector path: {path}")]
    Empty { path: String },
    #[error(transparent)]
    Automation(#[from] AutomationError),
}

#[derive(Error, Debug)]
pub enum SideSheetError {
    #[error("Unknown side sheet section {0:?}")]
    UnknownSection(String),

    #[error("Unknown side sheet item {0:?}")]
    UnknownItem(String),

    #[error("Failed to retrieve Side Sheet value at section {section} (idx: {section_index}), item {item} (idx: {item_index}). Original error: {source}")]
    Lookup {
        section: SideSheetCoordinate,
        section_index: usize,
        item: SideSheetCoordinate,
        item_index: usize,
        #[source]
        source: ValueFault,
    },
}

impl SideSheetError {
    /// True when the element was found but carried no text.
    pub fn is_empty_value(&self) -> bool {
        matches!(
            self,
            SideSheetError::Lookup {
                source: ValueFault::Empty { .. },
                ..
            }
        )
    }
}

/// Read the trimmed value at (`section`, `item`) of the side sheet rooted at `panel`.
///
/// On failure every item of the section is logged before the error is returned,
/// so a broken run can be diagnosed from its log alone.
#[instrument(skip_all)]
pub async fn get_side_sheet_value(
    panel: &Locator,
    section: impl Into<SideSheetCoordinate>,
    item: impl Into<SideSheetCoordinate>,
    layout: &SideSheetLayout,
) -> Result<String, SideSheetError> {
    let section = section.into();
    let item = item.into();
    let section_index = layout.resolve_section(&section)?;
    let item_index = layout.resolve_item(&item)?;
    debug!(%section, section_index, %item, item_index, "Reading side sheet value");

    let selectors = &layout.selectors;
    let card_path = format!("{}:nth-child({section_index})", selectors.card);
    let items = panel
        .locator(selectors.content.as_str())
        .locator(card_path.as_str())
        .locator(selectors.item_container.as_str())
        .locator(selectors.item.as_str());
    let value = items
        .nth(item_index as i32)
        .locator(selectors.value_span.as_str());

    let outcome = match value
        .text_content_within(Some(Duration::from_millis(layout.timeout)))
        .await
    {
        Ok(Some(text)) if !text.trim().is_empty() => Ok(text.trim().to_string()),
        Ok(_) => Err(ValueFault::Empty {
            path: format!(
                "{card_path} > {}[{item_index}] > {}",
                selectors.item, selectors.value_span
            ),
        }),
        Err(e) => Err(ValueFault::Automation(e)),
    };

    match outcome {
        Ok(text) => Ok(text),
        Err(source) => {
            log_section_items(&items, section_index).await;
            Err(SideSheetError::Lookup {
                section,
                section_index,
                item,
                item_index,
                source,
            })
        }
    }
}

/// Best-effort dump of what the section actually contains. Never fails.
async fn log_section_items(items: &Locator, section_index: usize) {
    let all = match items.all().await {
        Ok(all) => all,
        Err(e) => {
            warn!("Debug: Failed to log items: {}", e);
            return;
        }
    };
    warn!("Debug: Found {} items in section {}:", all.len(), section_index);
    for (i, item) in all.iter().enumerate() {
        match item.inner_text().await {
            Ok(text) => warn!(" - Item {}: {:?}", i, text.replace('\n', " ")),
            Err(e) => warn!(" - Item {}: <unreadable: {}>", i, e),
        }
    }
}
