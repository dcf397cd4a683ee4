use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How the search step waits for the candidate list to catch up with the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettleStrategy {
    /// Sleep for `searchDebounce` and read whatever is rendered.
    #[default]
    Fixed,
    /// Sleep for `searchDebounce`, then poll until two successive reads of the
    /// candidate list agree (bounded by `timeout`).
    Stable,
}

/// Structural selectors inside the filter popup, relative to the popup itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterSelectors {
    pub search_input: String,
    pub item: String,
    pub item_value: String,
    pub checkbox: String,
    pub submit: String,
    /// Class the popup carries while it is open.
    pub open_class: String,
}

impl Default for FilterSelectors {
    fn default() -> Self {
        Self {
            search_input: ".search input[name=\"search\"]".to_string(),
            item: ".checked-list .checked-list__item".to_string(),
            item_value: ".controller__right .flexbox".to_string(),
            checkbox: "input[type=\"checkbox\"]".to_string(),
            submit: ".filter-popup__footer button[type=\"submit\"]".to_string(),
            open_class: "show".to_string(),
        }
    }
}

/// Tunable behaviour of [`crate::filter_dropdown`].
///
/// Deserializes from the same camelCase option names the dashboard suites use;
/// every field is optional. Durations are in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterConfig {
    pub container_selector: String,
    /// Max wait for the popup to show, and for it to close after submit.
    pub timeout: u64,
    pub search_debounce: u64,
    pub verify_selection: bool,
    pub wait_for_close: bool,
    pub force_click: bool,
    /// Settle time between the checkbox click and the verification read.
    pub verify_delay: u64,
    /// Max wait for the submit button to become enabled.
    pub submit_timeout: u64,
    pub settle: SettleStrategy,
    pub selectors: FilterSelectors,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            container_selector: ".filter-popup".to_string(),
            timeout: 10_000,
            search_debounce: 1_200,
            verify_selection: true,
            wait_for_close: true,
            force_click: false,
            verify_delay: 600,
            submit_timeout: 5_000,
            settle: SettleStrategy::Fixed,
            selectors: FilterSelectors::default(),
        }
    }
}

impl FilterConfig {
    pub fn container_selector(mut self, selector: &str) -> Self {
        self.container_selector = selector.to_string();
        self
    }

    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.timeout = ms;
        self
    }

    pub fn search_debounce_ms(mut self, ms: u64) -> Self {
        self.search_debounce = ms;
        self
    }

    pub fn verify_selection(mut self, verify: bool) -> Self {
        self.verify_selection = verify;
        self
    }

    pub fn wait_for_close(mut self, wait: bool) -> Self {
        self.wait_for_close = wait;
        self
    }

    pub fn force_click(mut self, force: bool) -> Self {
        self.force_click = force;
        self
    }

    pub fn verify_delay_ms(mut self, ms: u64) -> Self {
        self.verify_delay = ms;
        self
    }

    pub fn submit_timeout_ms(mut self, ms: u64) -> Self {
        self.submit_timeout = ms;
        self
    }

    pub fn settle(mut self, strategy: SettleStrategy) -> Self {
        self.settle = strategy;
        self
    }

    pub fn selectors(mut self, selectors: FilterSelectors) -> Self {
        self.selectors = selectors;
        self
    }

    /// Selector of the popup while it is open, e.g. `.filter-popup.show`.
    pub fn open_container(&self) -> String {
        format!("{}.{}", self.container_selector, self.selectors.open_class)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout)
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce)
    }

    pub fn verify_delay(&self) -> Duration {
        Duration::from_millis(self.verify_delay)
    }

    pub fn submit_timeout(&self) -> Duration {
        Duration::from_millis(self.submit_timeout)
    }
}
