//! Exact-match automation of dashboard filter popups
//!
//! This crate drives a web dashboard through a Playwright-style [`Page`] /
//! [`Locator`] API. Its main entry points select exactly one value in a
//! debounced, checkbox-list filter popup ([`filter_dropdown`]) and read values
//! out of the transaction detail side sheet ([`get_side_sheet_value`]).
//!
//! Two engines back a [`Page`]: [`CdpEngine`] talks to a real Chromium over the
//! DevTools protocol, [`MemoryEngine`] keeps a scripted in-memory document for
//! tests.

use std::sync::Arc;
use std::time::Duration;

use tracing::instrument;

pub mod errors;
pub mod filter;
pub mod fixtures;
pub mod locator;
pub mod pages;
pub mod platforms;
pub mod selector;
pub mod side_sheet;
#[cfg(test)]
mod tests;
pub mod types;

pub use errors::AutomationError;
pub use filter::{
    clear_filter_dropdown, filter_dropdown, filter_dropdown_multiple, resolve_exact,
    CandidateItem, FilterConfig, FilterError, FilterResult, FilterSelectors, FilterStep,
    MatchOutcome, SelectionState, SettleStrategy,
};
pub use fixtures::{parse_dashboard_date, DateRangePreset, FixtureError, FixtureStore};
pub use locator::Locator;
pub use pages::{FilterComponent, PageError, Sidebar};
pub use platforms::cdp::{list_tabs, CdpEngine, TabInfo};
pub use platforms::memory::{ActionKind, ActionRecord, Dom, El, MemoryEngine, Trigger};
pub use platforms::AutomationEngine;
pub use selector::Selector;
pub use side_sheet::{
    get_side_sheet_value, SideSheetCoordinate, SideSheetError, SideSheetLayout,
    SideSheetSelectors,
};
pub use types::ElementState;

/// One browser tab (or scripted document) to automate.
///
/// Cheap to clone; clones share the underlying session.
#[derive(Clone)]
pub struct Page {
    engine: Arc<dyn AutomationEngine>,
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page").finish_non_exhaustive()
    }
}

impl Page {
    pub fn new(engine: Arc<dyn AutomationEngine>) -> Self {
        Self { engine }
    }

    /// Wraps an owned engine.
    ///
    /// ```
    /// use filterkit::{El, MemoryEngine, Page};
    /// let page = Page::from_engine(MemoryEngine::with_body(El::new("main")));
    /// let _main = page.locator("main");
    /// ```
    pub fn from_engine(engine: impl AutomationEngine + 'static) -> Self {
        Self::new(Arc::new(engine))
    }

    /// Attaches to a tab of a Chromium started with `--remote-debugging-port`.
    ///
    /// `url_pattern` picks the first page tab whose URL contains it; without
    /// one the first page tab is used.
    #[instrument]
    pub async fn connect_cdp(
        debug_port: u16,
        url_pattern: Option<&str>,
    ) -> Result<Self, AutomationError> {
        let engine = CdpEngine::connect(debug_port, url_pattern).await?;
        Ok(Self::from_engine(engine))
    }

    pub fn engine(&self) -> &Arc<dyn AutomationEngine> {
        &self.engine
    }

    #[instrument(level = "debug", skip(self, selector))]
    pub fn locator(&self, selector: impl Into<Selector>) -> Locator {
        let selector = selector.into();
        Locator::new(self.engine.clone(), selector)
    }

    #[instrument(skip(self))]
    pub async fn goto(&self, url: &str) -> Result<(), AutomationError> {
        self.engine.goto(url).await
    }

    pub async fn current_url(&self) -> Result<String, AutomationError> {
        self.engine.current_url().await
    }

    /// Plain sleep, for pages that give no signal to wait on.
    pub async fn wait_for_timeout(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
