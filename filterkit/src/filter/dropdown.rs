use std::time::{Duration, Instant};

use serde::{Serialize, Serializer};
use tracing::{info, instrument};

use super::config::FilterConfig;
use super::debounce;
use super::error::{FilterError, FilterStep};
use super::matcher::{read_candidates, resolve_exact, MatchOutcome};
use super::selection::{SelectionMachine, SelectionState};
use crate::{AutomationError, ElementState, Locator, Page};

const CLEAR_SETTLE: Duration = Duration::from_millis(500);

/// Outcome of one successful filter selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterResult {
    pub success: bool,
    pub selected_value: String,
    pub was_already_checked: bool,
    #[serde(serialize_with = "serialize_millis")]
    pub duration: Duration,
}

fn serialize_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_millis() as u64)
}

/// Search the open filter popup for `search_value`, check exactly that row,
/// submit, and wait for the popup to close.
///
/// Phases run strictly in order (visibility, search, resolution, selection,
/// verification, submission, close) and the first failure ends the call with a
/// [`FilterError`] tagged by phase. Nothing is retried.
///
/// # Examples
///
/// ```no_run
/// use filterkit::{filter_dropdown, FilterConfig, FilterStep, Page};
/// # async fn run(page: Page) {
/// match filter_dropdown(&page, "19126142", &FilterConfig::default()).await {
///     Ok(result) => assert_eq!(result.selected_value, "19126142"),
///     Err(e) if e.step == FilterStep::ExactMatch => eprintln!("no such terminal: {e}"),
///     Err(e) => panic!("{e}"),
/// }
/// # }
/// ```
#[instrument(skip(page, config), fields(container = %config.container_selector))]
pub async fn filter_dropdown(
    page: &Page,
    search_value: &str,
    config: &FilterConfig,
) -> Result<FilterResult, FilterError> {
    let started = Instant::now();
    reject_blank(search_value)?;
    let container = wait_for_popup(page, config).await?;
    let (mut machine, was_already_checked) = select_value(&container, search_value, config).await?;

    submit(&container, config).await?;
    machine.advance(SelectionState::Submitted)?;

    if config.wait_for_close {
        wait_for_close(&container, config).await?;
        machine.advance(SelectionState::Closed)?;
    }

    let duration = started.elapsed();
    info!(
        value = %search_value,
        was_already_checked,
        state = ?machine.state(),
        duration_ms = duration.as_millis() as u64,
        "Filter applied"
    );
    Ok(FilterResult {
        success: true,
        selected_value: search_value.to_string(),
        was_already_checked,
        duration,
    })
}

/// Check several values in the same popup, then submit once.
///
/// Values are handled one after another in input order; the results come back
/// in that order. The close wait at the end honours `wait_for_close`.
#[instrument(skip(page, search_values, config), fields(count = search_values.len()))]
pub async fn filter_dropdown_multiple<S: AsRef<str>>(
    page: &Page,
    search_values: &[S],
    config: &FilterConfig,
) -> Result<Vec<FilterResult>, FilterError> {
    if search_values.is_empty() {
        return Err(FilterError::new(
            FilterStep::Unexpected,
            "filter_dropdown_multiple needs at least one value",
        ));
    }

    for value in search_values {
        reject_blank(value.as_ref())?;
    }

    let mut results = Vec::with_capacity(search_values.len());
    let mut container = None;
    for value in search_values {
        let value = value.as_ref();
        let started = Instant::now();
        let popup = wait_for_popup(page, config).await?;
        let (_machine, was_already_checked) = select_value(&popup, value, config).await?;
        results.push(FilterResult {
            success: true,
            selected_value: value.to_string(),
            was_already_checked,
            duration: started.elapsed(),
        });
        container = Some(popup);
    }

    if let Some(container) = container {
        submit(&container, config).await?;
        if config.wait_for_close {
            wait_for_close(&container, config).await?;
        }
    }
    info!(values = results.len(), "Multi-value filter applied");
    Ok(results)
}

/// Clear the search box of the open popup without submitting anything.
#[instrument(skip(page, config))]
pub async fn clear_filter_dropdown(page: &Page, config: &FilterConfig) -> Result<(), FilterError> {
    let container = page.locator(config.open_container()).first();
    container
        .locator(config.selectors.search_input.as_str())
        .clear()
        .await?;
    tokio::time::sleep(CLEAR_SETTLE).await;
    Ok(())
}

fn reject_blank(search_value: &str) -> Result<(), FilterError> {
    if search_value.trim().is_empty() {
        return Err(FilterError::new(
            FilterStep::Unexpected,
            "Search value is blank; refusing to select a row without a value",
        ));
    }
    Ok(())
}

async fn wait_for_popup(page: &Page, config: &FilterConfig) -> Result<Locator, FilterError> {
    let container = page.locator(config.open_container()).first();
    container
        .wait_for(ElementState::Visible, Some(config.timeout()))
        .await
        .map_err(|e| match e {
            AutomationError::Timeout(_) => FilterError::with_source(
                FilterStep::VisibilityWait,
                format!(
                    "Filter popup did not become visible within {}ms",
                    config.timeout
                ),
                e,
            ),
            other => other.into(),
        })?;
    Ok(container)
}

/// Search, resolve and check one value. Leaves the popup open.
async fn select_value(
    container: &Locator,
    search_value: &str,
    config: &FilterConfig,
) -> Result<(SelectionMachine, bool), FilterError> {
    let mut machine = SelectionMachine::new(search_value);

    debounce::search(container, search_value, config).await?;

    let candidates = read_candidates(container, &config.selectors).await?;
    let target = match resolve_exact(&candidates, search_value) {
        MatchOutcome::Found(item) => item,
        MatchOutcome::NoCandidates => {
            return Err(FilterError::new(
                FilterStep::SearchResults,
                format!("No results found after searching for \"{search_value}\""),
            ))
        }
        MatchOutcome::NoExactMatch { checked } => {
            return Err(FilterError::new(
                FilterStep::ExactMatch,
                format!(
                    "No item found matching search value \"{search_value}\". Checked {checked} item(s) but none matched exactly."
                ),
            ))
        }
    };
    machine.advance(SelectionState::Resolved)?;

    let checkbox = container
        .locator(config.selectors.item.as_str())
        .nth(target.index as i32)
        .locator(config.selectors.checkbox.as_str());
    let was_already_checked = target.checked;
    machine.select(&checkbox, was_already_checked, config).await?;

    Ok((machine, was_already_checked))
}

async fn submit(container: &Locator, config: &FilterConfig) -> Result<(), FilterError> {
    let button = container.locator(config.selectors.submit.as_str());
    button.expect_enabled(Some(config.submit_timeout())).await?;
    button.click().await?;
    Ok(())
}

async fn wait_for_close(container: &Locator, config: &FilterConfig) -> Result<(), FilterError> {
    container
        .wait_for(ElementState::Hidden, Some(config.timeout()))
        .await?;
    Ok(())
}
