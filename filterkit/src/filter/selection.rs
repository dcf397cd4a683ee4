use serde::Serialize;
use tracing::debug;

use super::config::FilterConfig;
use super::error::{FilterError, FilterStep};
use crate::Locator;

/// Progress of one value through the popup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SelectionState {
    Unknown,
    /// The exact candidate was found and its checkbox state captured
    Resolved,
    /// The candidate was already checked and no click was needed
    AlreadySelected,
    /// A click was issued on the candidate's checkbox
    Selected,
    /// The checkbox was re-read and is checked
    Verified,
    Submitted,
    Closed,
}

impl SelectionState {
    fn can_advance_to(self, next: SelectionState) -> bool {
        use SelectionState::*;
        matches!(
            (self, next),
            (Unknown, Resolved)
                | (Resolved, AlreadySelected)
                | (Resolved, Selected)
                | (Selected, Verified)
                | (Selected, Submitted)
                | (AlreadySelected, Submitted)
                | (Verified, Submitted)
                | (Submitted, Closed)
        )
    }
}

#[derive(Debug)]
pub(crate) struct SelectionMachine {
    value: String,
    state: SelectionState,
}

impl SelectionMachine {
    pub(crate) fn new(value: &str) -> Self {
        Self {
            value: value.to_string(),
            state: SelectionState::Unknown,
        }
    }

    pub(crate) fn state(&self) -> SelectionState {
        self.state
    }

    pub(crate) fn advance(&mut self, next: SelectionState) -> Result<(), FilterError> {
        if !self.state.can_advance_to(next) {
            return Err(FilterError::new(
                FilterStep::Unexpected,
                format!(
                    "invalid selection transition {:?} -> {:?} for \"{}\"",
                    self.state, next, self.value
                ),
            ));
        }
        debug!(value = %self.value, from = ?self.state, to = ?next, "Selection transition");
        self.state = next;
        Ok(())
    }

    /// Drive the resolved checkbox to checked.
    ///
    /// Clicks only when the box is unchecked or `force_click` is set. The click
    /// goes through the element itself, since styled checkboxes are often drawn
    /// off-screen or under a label. With `verify_selection`, the state is
    /// re-read after `verify_delay` and must be checked.
    pub(crate) async fn select(
        &mut self,
        checkbox: &Locator,
        was_already_checked: bool,
        config: &FilterConfig,
    ) -> Result<(), FilterError> {
        if was_already_checked && !config.force_click {
            return self.advance(SelectionState::AlreadySelected);
        }

        checkbox.dispatch_click().await?;
        self.advance(SelectionState::Selected)?;

        if config.verify_selection {
            tokio::time::sleep(config.verify_delay()).await;
            if !checkbox.is_checked().await? {
                return Err(FilterError::new(
                    FilterStep::VerifySelection,
                    format!(
                        "Checkbox verification failed for value \"{}\" - selection did not persist after a direct click",
                        self.value
                    ),
                ));
            }
            self.advance(SelectionState::Verified)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        let mut machine = SelectionMachine::new("19126142");
        for next in [
            SelectionState::Resolved,
            SelectionState::Selected,
            SelectionState::Verified,
            SelectionState::Submitted,
            SelectionState::Closed,
        ] {
            machine.advance(next).unwrap();
        }
        assert_eq!(machine.state(), SelectionState::Closed);
    }

    #[test]
    fn test_already_selected_skips_verification() {
        let mut machine = SelectionMachine::new("A");
        machine.advance(SelectionState::Resolved).unwrap();
        machine.advance(SelectionState::AlreadySelected).unwrap();
        let err = machine.advance(SelectionState::Verified).unwrap_err();
        assert_eq!(err.step, FilterStep::Unexpected);
        machine.advance(SelectionState::Submitted).unwrap();
    }

    #[test]
    fn test_cannot_submit_before_resolving() {
        let mut machine = SelectionMachine::new("A");
        assert!(machine.advance(SelectionState::Submitted).is_err());
        assert_eq!(machine.state(), SelectionState::Unknown);
    }
}
