//! Exact-match automation of the dashboard's filter popups.
//!
//! A popup shows a search box over a list of checkbox rows. The helpers here
//! type a value, wait for the list to re-render, check the one row whose text
//! equals the value, submit, and wait for the popup to go away.

mod config;
mod debounce;
mod dropdown;
mod error;
mod matcher;
mod selection;

pub use config::{FilterConfig, FilterSelectors, SettleStrategy};
pub use dropdown::{clear_filter_dropdown, filter_dropdown, filter_dropdown_multiple, FilterResult};
pub use error::{FilterError, FilterStep};
pub use matcher::{resolve_exact, CandidateItem, MatchOutcome};
pub use selection::SelectionState;
