//! Page objects for the transactions dashboard.
//!
//! Thin wrappers that open the surfaces the filter and side-sheet helpers work
//! on: the "add filter" menu, the creation-date popup, the transactions table
//! and the side navigation.

use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::filter::{filter_dropdown, FilterConfig, FilterError, FilterResult};
use crate::fixtures::{FixtureError, FixtureStore};
use crate::{AutomationError, ElementState, Locator, Page};

const ADD_FILTER_CHIP: &str = ".filter-chip:not([data-filter-id])";
const ADD_FILTER_OPTION: &str = ".add-filter .add-filter-item";
const ADD_FILTER_MENU: &str = ".add-filter";
const ADD_FILTER_LIST_ITEM: &str = ".add-filter-list .add-filter-list__item";
const CREATION_DATE_CHIP: &str = ".filter-chip[data-filter-id=\"creationDate\"]";
const RESET_CHIP: &str = ".filter-chip[data-filter-id=\"reset\"]";
const OPEN_POPUP: &str = ".filter-popup.show";
const TABLE_BODY: &str = ".transactions-wrapper__listing table tbody";
const TABLE_SKELETON: &str = ".react-loading-skeleton";
const SIDE_SHEET: &str = ".side-sheet__container";
const SIDE_SHEET_CONTENT: &str = ".side-sheet__content";
const SIDE_NAVIGATION: &str = ".side-navigation";

/// Name of the start-date input of the creation-date popup.
pub const START_DATE_INPUT: &str = "transactionStartDate";
/// Name of the end-date input. The dashboard really spells it this way.
pub const END_DATE_INPUT: &str = "trasnactionEndDate";

const CHIP_TIMEOUT: Duration = Duration::from_secs(10);
const MENU_TIMEOUT: Duration = Duration::from_secs(5);
const DATE_CHIP_TIMEOUT: Duration = Duration::from_secs(4);
const RESET_SETTLE: Duration = Duration::from_millis(500);
const TABLE_TIMEOUT: Duration = Duration::from_secs(15);
const SKELETON_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum PageError {
    #[error(transparent)]
    Automation(#[from] AutomationError),
    #[error(transparent)]
    Filter(#[from] FilterError),
    #[error(transparent)]
    Fixture(#[from] FixtureError),
}

/// One entry of the "add filter" menu, e.g. the terminal-id filter.
#[derive(Debug, Clone)]
pub struct FilterComponent {
    label: String,
    config: FilterConfig,
}

impl FilterComponent {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            config: FilterConfig::default(),
        }
    }

    /// Overrides the options handed to [`filter_dropdown`].
    pub fn with_config(mut self, config: FilterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Clicks the "add filter" chip and picks the menu entry whose label equals
    /// this filter's, trimmed and ignoring case.
    #[instrument(skip(self, page), fields(label = %self.label))]
    pub async fn open(&self, page: &Page) -> Result<(), AutomationError> {
        let chip = page.locator(ADD_FILTER_CHIP).first();
        chip.wait_for(ElementState::Visible, Some(CHIP_TIMEOUT)).await?;
        chip.click().await?;

        let option = page
            .locator(ADD_FILTER_OPTION)
            .has_exact_text(&self.label)
            .first();
        option
            .wait_for(ElementState::Visible, Some(MENU_TIMEOUT))
            .await?;
        option.click().await
    }

    /// Opens the filter and selects exactly `value` in its popup.
    pub async fn filter_by_value(
        &self,
        page: &Page,
        value: &str,
    ) -> Result<FilterResult, PageError> {
        info!(label = %self.label, value, "Filtering by value");
        self.open(page).await?;
        Ok(filter_dropdown(page, value, &self.config).await?)
    }
}

/// The item of the open "add filter" menu whose label equals `label`,
/// trimmed and ignoring case.
pub async fn filter_by_label(page: &Page, label: &str) -> Result<Locator, AutomationError> {
    let menu = page.locator(ADD_FILTER_MENU).first();
    menu.wait_for(ElementState::Visible, Some(MENU_TIMEOUT))
        .await?;
    Ok(menu.locator(ADD_FILTER_LIST_ITEM).has_exact_text(label))
}

/// Fills the creation-date popup from the named fixture preset and submits it
/// with Enter.
///
/// The end date is only filled when the preset has one and the popup shows the
/// end-date input.
#[instrument(skip(page, fixtures))]
pub async fn apply_date_range(
    page: &Page,
    fixtures: &FixtureStore,
    preset: &str,
) -> Result<(), PageError> {
    let range = fixtures.date_preset(preset)?;

    let chip = page.locator(CREATION_DATE_CHIP).first();
    chip.wait_for(ElementState::Visible, Some(DATE_CHIP_TIMEOUT))
        .await?;
    chip.click().await?;

    page.locator(OPEN_POPUP)
        .first()
        .wait_for(ElementState::Visible, Some(MENU_TIMEOUT))
        .await?;

    let start = page
        .locator(format!("input[name=\"{START_DATE_INPUT}\"]"))
        .first();
    start
        .wait_for(ElementState::Visible, Some(MENU_TIMEOUT))
        .await?;
    start.fill(&range.start_date).await?;

    if let Some(end_date) = &range.end_date {
        let end = page
            .locator(format!("input[name=\"{END_DATE_INPUT}\"]"))
            .first();
        if end.is_visible().await.unwrap_or(false) {
            end.fill(end_date).await?;
        } else {
            debug!("End date input not shown, keeping single-day range");
        }
    }

    start.press("Enter").await?;
    Ok(())
}

/// Clicks the "reset" chip if the dashboard shows one. Returns whether it did.
#[instrument(skip(page))]
pub async fn reset_filters(page: &Page) -> Result<bool, AutomationError> {
    let reset = page.locator(RESET_CHIP).first();
    if reset.count().await? == 0 {
        return Ok(false);
    }
    reset
        .wait_for(ElementState::Visible, Some(MENU_TIMEOUT))
        .await?;
    reset.click().await?;
    page.wait_for_timeout(RESET_SETTLE).await;
    Ok(true)
}

/// Waits for the transactions table to render and its loading skeletons to go away.
pub async fn wait_for_table_loaded(page: &Page) -> Result<(), AutomationError> {
    let body = page.locator(TABLE_BODY).first();
    body.wait_for(ElementState::Visible, Some(TABLE_TIMEOUT))
        .await?;
    body.locator(TABLE_SKELETON)
        .first()
        .wait_for(ElementState::Hidden, Some(SKELETON_TIMEOUT))
        .await
}

/// Clicks the `row`-th (0-based) transaction and returns the side sheet it opens.
#[instrument(skip(page))]
pub async fn open_details_side_sheet(page: &Page, row: usize) -> Result<Locator, AutomationError> {
    page.locator(OPEN_POPUP)
        .first()
        .wait_for(ElementState::Hidden, Some(MENU_TIMEOUT))
        .await?;
    wait_for_table_loaded(page).await?;

    let row = page
        .locator(TABLE_BODY)
        .first()
        .locator("tr")
        .nth(row as i32);
    row.wait_for(ElementState::Visible, Some(TABLE_TIMEOUT))
        .await?;
    row.click().await?;

    let sheet = page.locator(SIDE_SHEET).first();
    sheet
        .wait_for(ElementState::Visible, Some(TABLE_TIMEOUT))
        .await?;
    sheet
        .locator(SIDE_SHEET_CONTENT)
        .wait_for(ElementState::Visible, Some(MENU_TIMEOUT))
        .await?;
    Ok(sheet)
}

/// The dashboard's left-hand navigation.
#[derive(Debug, Clone)]
pub struct Sidebar {
    container: Locator,
}

impl Sidebar {
    pub fn new(page: &Page) -> Self {
        Self {
            container: page.locator(SIDE_NAVIGATION),
        }
    }

    /// Clicks the first menu link whose text contains `menu_text`.
    #[instrument(skip(self))]
    pub async fn navigate(&self, menu_text: &str) -> Result<(), AutomationError> {
        let link = self
            .container
            .locator(".navigation-item__inner a")
            .has_text(menu_text)
            .first();
        link.wait_for(ElementState::Visible, Some(MENU_TIMEOUT))
            .await?;
        link.click().await
    }

    pub async fn navigate_by_href(&self, path: &str) -> Result<(), AutomationError> {
        let link = self
            .container
            .locator(format!("a[href=\"{path}\"]"))
            .first();
        link.wait_for(ElementState::Visible, Some(MENU_TIMEOUT))
            .await?;
        link.click().await
    }

    /// Whether the active menu entry reads `menu_text`.
    pub async fn is_active(&self, menu_text: &str) -> Result<bool, AutomationError> {
        let active = self
            .container
            .locator(".navigation-item__inner.active")
            .first();
        if !active.is_visible().await? {
            return Ok(false);
        }
        let label = active.locator("p").first().inner_text().await?;
        Ok(label.trim() == menu_text.trim())
    }
}
