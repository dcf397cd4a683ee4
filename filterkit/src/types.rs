//! Common types shared by locators and page backends

use serde::{Deserialize, Serialize};

/// States a locator can be waited into, mirroring Playwright's `waitFor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementState {
    /// At least one element matches
    Attached,
    /// Nothing matches
    Detached,
    /// The first match is rendered
    Visible,
    /// Nothing matches, or the first match is not rendered
    Hidden,
}

impl std::fmt::Display for ElementState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ElementState::Attached => "attached",
            ElementState::Detached => "detached",
            ElementState::Visible => "visible",
            ElementState::Hidden => "hidden",
        };
        f.write_str(name)
    }
}
