use crate::{AutomationError, Selector};

pub mod cdp;
pub mod memory;

/// The common trait that every page backend must implement.
///
/// Single-element operations act on the first match in document order and fail
/// with [`AutomationError::ElementNotFound`] when nothing matches. None of them
/// wait: polling lives in [`crate::Locator`].
#[async_trait::async_trait]
pub trait AutomationEngine: Send + Sync {
    /// Number of elements currently matching the selector
    async fn count(&self, selector: &Selector) -> Result<usize, AutomationError>;

    /// Whether the first match is rendered. No match counts as not visible.
    async fn is_visible(&self, selector: &Selector) -> Result<bool, AutomationError>;

    async fn is_enabled(&self, selector: &Selector) -> Result<bool, AutomationError>;

    async fn is_checked(&self, selector: &Selector) -> Result<bool, AutomationError>;

    /// Raw `textContent` of the first match
    async fn text_content(&self, selector: &Selector) -> Result<Option<String>, AutomationError>;

    /// Rendered text of the first match
    async fn inner_text(&self, selector: &Selector) -> Result<String, AutomationError>;

    async fn input_value(&self, selector: &Selector) -> Result<String, AutomationError>;

    /// Replace the value of a text input, firing the page's input events
    async fn fill(&self, selector: &Selector, value: &str) -> Result<(), AutomationError>;

    /// Pointer click at the element's position
    async fn click(&self, selector: &Selector) -> Result<(), AutomationError>;

    /// Invoke the element's own click action, regardless of where it is drawn
    /// or whether something covers it
    async fn dispatch_click(&self, selector: &Selector) -> Result<(), AutomationError>;

    /// Focus the element and send a key press (e.g. "Enter")
    async fn press(&self, selector: &Selector, key: &str) -> Result<(), AutomationError>;

    async fn goto(&self, url: &str) -> Result<(), AutomationError>;

    async fn current_url(&self) -> Result<String, AutomationError>;
}
