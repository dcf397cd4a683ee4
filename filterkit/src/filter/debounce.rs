//! Fill-then-wait handling for the popup's search box.
//!
//! The candidate list re-renders some time after the input changes and the page
//! gives no signal when it is done, so every search is followed by a settle wait.

use std::time::Duration;

use tracing::{debug, warn};

use super::config::{FilterConfig, SettleStrategy};
use super::matcher::read_candidate_texts;
use crate::{AutomationError, Locator};

const STABILITY_POLL: Duration = Duration::from_millis(150);

/// Replace the search text of the popup and wait for the list to settle.
pub(crate) async fn search(
    container: &Locator,
    value: &str,
    config: &FilterConfig,
) -> Result<(), AutomationError> {
    let input = container.locator(config.selectors.search_input.as_str());
    input.clear().await?;
    input.fill(value).await?;
    settle(container, config).await
}

pub(crate) async fn settle(container: &Locator, config: &FilterConfig) -> Result<(), AutomationError> {
    tokio::time::sleep(config.search_debounce()).await;
    if config.settle == SettleStrategy::Fixed {
        return Ok(());
    }

    let deadline = tokio::time::Instant::now() + config.timeout();
    let mut previous = read_candidate_texts(container, &config.selectors).await?;
    loop {
        tokio::time::sleep(STABILITY_POLL).await;
        let current = read_candidate_texts(container, &config.selectors).await?;
        if current == previous {
            debug!(candidates = current.len(), "Candidate list is stable");
            return Ok(());
        }
        if tokio::time::Instant::now() >= deadline {
            warn!(
                candidates = current.len(),
                "Candidate list still changing after {:?}; using the latest render",
                config.timeout()
            );
            return Ok(());
        }
        previous = current;
    }
}
