use tracing::{debug, instrument};

use crate::errors::AutomationError;
use crate::platforms::AutomationEngine;
use crate::selector::Selector;
use crate::types::ElementState;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

// Default timeout if none is specified on the locator itself
const DEFAULT_LOCATOR_TIMEOUT: Duration = Duration::from_secs(30);
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A lazy handle to whatever currently matches a selector on a page.
///
/// Nothing is resolved until an action or query runs, so a locator built before
/// the page re-renders still finds the new elements.
#[derive(Clone)]
pub struct Locator {
    engine: Arc<dyn AutomationEngine>,
    selector: Selector,
    timeout: Duration, // Default timeout for this locator instance
}

impl std::fmt::Debug for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Locator")
            .field("selector", &self.selector_string())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Locator {
    /// Create a new locator with the given selector
    pub(crate) fn new(engine: Arc<dyn AutomationEngine>, selector: Selector) -> Self {
        Self {
            engine,
            selector,
            timeout: DEFAULT_LOCATOR_TIMEOUT, // Use default
        }
    }

    /// Set a default timeout for waiting operations on this locator instance.
    /// This timeout is used if no specific timeout is passed to wait methods.
    pub fn set_default_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn append_selector(&self, selector_to_append: Selector) -> Locator {
        Locator {
            engine: self.engine.clone(),
            selector: self.selector.clone().then(selector_to_append),
            timeout: self.timeout,
        }
    }

    /// Get a nested locator
    pub fn locator(&self, selector: impl Into<Selector>) -> Locator {
        self.append_selector(selector.into())
    }

    /// The n-th match (0-based); negative indices count from the end.
    pub fn nth(&self, index: i32) -> Locator {
        self.append_selector(Selector::Nth(index))
    }

    pub fn first(&self) -> Locator {
        self.nth(0)
    }

    pub fn last(&self) -> Locator {
        self.nth(-1)
    }

    /// Adds a filter to find elements based on their visibility.
    pub fn visible(&self, is_visible: bool) -> Locator {
        self.append_selector(Selector::Visible(is_visible))
    }

    /// Keeps matches whose text contains `text`.
    pub fn has_text(&self, text: &str) -> Locator {
        self.append_selector(Selector::HasText(text.to_string()))
    }

    /// Keeps matches whose trimmed text equals `text`, ignoring case.
    pub fn has_exact_text(&self, text: &str) -> Locator {
        self.append_selector(Selector::ExactText(text.trim().to_string()))
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    pub fn selector_string(&self) -> String {
        self.selector.to_string()
    }

    pub async fn count(&self) -> Result<usize, AutomationError> {
        self.engine.count(&self.selector).await
    }

    /// One locator per current match, in document order.
    pub async fn all(&self) -> Result<Vec<Locator>, AutomationError> {
        let count = self.count().await?;
        Ok((0..count as i32).map(|i| self.nth(i)).collect())
    }

    pub async fn is_visible(&self) -> Result<bool, AutomationError> {
        self.engine.is_visible(&self.selector).await
    }

    pub async fn is_hidden(&self) -> Result<bool, AutomationError> {
        Ok(!self.is_visible().await?)
    }

    pub async fn is_enabled(&self) -> Result<bool, AutomationError> {
        self.engine.is_enabled(&self.selector).await
    }

    pub async fn is_checked(&self) -> Result<bool, AutomationError> {
        self.engine.is_checked(&self.selector).await
    }

    pub async fn text_content(&self) -> Result<Option<String>, AutomationError> {
        self.engine.text_content(&self.selector).await
    }

    pub async fn inner_text(&self) -> Result<String, AutomationError> {
        self.engine.inner_text(&self.selector).await
    }

    pub async fn input_value(&self) -> Result<String, AutomationError> {
        self.engine.input_value(&self.selector).await
    }

    pub async fn fill(&self, value: &str) -> Result<(), AutomationError> {
        self.engine.fill(&self.selector, value).await
    }

    pub async fn clear(&self) -> Result<(), AutomationError> {
        self.engine.fill(&self.selector, "").await
    }

    pub async fn click(&self) -> Result<(), AutomationError> {
        self.engine.click(&self.selector).await
    }

    /// Click through the element's own action instead of the pointer.
    pub async fn dispatch_click(&self) -> Result<(), AutomationError> {
        self.engine.dispatch_click(&self.selector).await
    }

    pub async fn press(&self, key: &str) -> Result<(), AutomationError> {
        self.engine.press(&self.selector, key).await
    }

    /// Text content of the first match, waiting for it to exist up to `timeout`.
    pub async fn text_content_within(
        &self,
        timeout: Option<Duration>,
    ) -> Result<Option<String>, AutomationError> {
        self.wait_for(ElementState::Attached, timeout).await?;
        self.text_content().await
    }

    /// Wait for the locator to reach `state`, up to the specified timeout.
    /// If no timeout is provided, uses the locator's default timeout.
    #[instrument(level = "debug", skip(self, timeout), fields(selector = %self.selector))]
    pub async fn wait_for(
        &self,
        state: ElementState,
        timeout: Option<Duration>,
    ) -> Result<(), AutomationError> {
        let effective_timeout = timeout.unwrap_or(self.timeout);
        debug!(%state, ?effective_timeout, "Waiting for locator state");
        poll_until(effective_timeout, || async move {
            match state {
                ElementState::Attached => Ok(self.count().await? > 0),
                ElementState::Detached => Ok(self.count().await? == 0),
                ElementState::Visible => self.is_visible().await,
                ElementState::Hidden => self.is_hidden().await,
            }
        })
        .await
        .map_err(|e| match e {
            AutomationError::Timeout(_) => AutomationError::Timeout(format!(
                "Timed out after {effective_timeout:?} waiting for {:?} to be {state}",
                self.selector_string()
            )),
            other => other,
        })
    }

    /// Wait until the first match reports enabled.
    pub async fn expect_enabled(&self, timeout: Option<Duration>) -> Result<(), AutomationError> {
        let effective_timeout = timeout.unwrap_or(self.timeout);
        poll_until(effective_timeout, || async move { self.is_enabled().await })
            .await
            .map_err(|e| match e {
                AutomationError::Timeout(_) => AutomationError::ElementNotEnabled(format!(
                    "{:?} was not enabled within {effective_timeout:?}",
                    self.selector_string()
                )),
                other => other,
            })
    }
}

/// Re-run `check` until it yields true or `timeout` elapses.
///
/// Transient lookup errors count as "not yet"; anything else aborts the wait.
/// The check always runs at least once, even with a zero timeout.
pub(crate) async fn poll_until<F, Fut>(timeout: Duration, mut check: F) -> Result<(), AutomationError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, AutomationError>>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        match check().await {
            Ok(true) => return Ok(()),
            Ok(false) => {}
            Err(e) if e.is_transient() => {}
            Err(e) => return Err(e),
        }
        let now = tokio::time::Instant::now();
        if now >= deadline {
            return Err(AutomationError::Timeout(format!(
                "condition not met within {timeout:?}"
            )));
        }
        tokio::time::sleep(POLL_INTERVAL.min(deadline - now)).await;
    }
}
