use serde::Serialize;

use super::config::FilterSelectors;
use crate::{AutomationError, Locator};

/// One row of the rendered candidate list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateItem {
    /// Position in rendered order
    pub index: usize,
    /// Displayed value, trimmed. `None` when the row has no value element.
    pub text: Option<String>,
    pub checked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome<'a> {
    Found(&'a CandidateItem),
    /// The list was empty
    NoCandidates,
    /// The list had rows, none of them equal to the target
    NoExactMatch { checked: usize },
}

/// Find the first candidate whose text equals `target` after trimming both sides.
///
/// Prefix and substring matches never count: "1912614" does not match "19126142".
/// Rows without a value never match, and neither does a blank target.
pub fn resolve_exact<'a>(candidates: &'a [CandidateItem], target: &str) -> MatchOutcome<'a> {
    if candidates.is_empty() {
        return MatchOutcome::NoCandidates;
    }
    let target = target.trim();
    let no_match = MatchOutcome::NoExactMatch {
        checked: candidates.len(),
    };
    if target.is_empty() {
        return no_match;
    }
    candidates
        .iter()
        .find(|c| c.text.as_deref().map(str::trim) == Some(target))
        .map_or(no_match, MatchOutcome::Found)
}

async fn item_text(
    item: &Locator,
    selectors: &FilterSelectors,
) -> Result<Option<String>, AutomationError> {
    match item.locator(selectors.item_value.as_str()).text_content().await {
        Ok(text) => Ok(Some(text.unwrap_or_default().trim().to_string())),
        Err(AutomationError::ElementNotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Displayed values of every rendered row, in order.
pub(crate) async fn read_candidate_texts(
    container: &Locator,
    selectors: &FilterSelectors,
) -> Result<Vec<Option<String>>, AutomationError> {
    let items = container.locator(selectors.item.as_str());
    let mut texts = Vec::new();
    for item in items.all().await? {
        texts.push(item_text(&item, selectors).await?);
    }
    Ok(texts)
}

/// Snapshot of every rendered row with its checkbox state.
pub(crate) async fn read_candidates(
    container: &Locator,
    selectors: &FilterSelectors,
) -> Result<Vec<CandidateItem>, AutomationError> {
    let items = container.locator(selectors.item.as_str());
    let mut candidates = Vec::new();
    for (index, item) in items.all().await?.into_iter().enumerate() {
        let text = item_text(&item, selectors).await?;
        let checked = match item.locator(selectors.checkbox.as_str()).is_checked().await {
            Ok(checked) => checked,
            Err(AutomationError::ElementNotFound(_)) => false,
            Err(e) => return Err(e),
        };
        candidates.push(CandidateItem {
            index,
            text,
            checked,
        });
    }
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(texts: &[&str]) -> Vec<CandidateItem> {
        texts
            .iter()
            .enumerate()
            .map(|(index, t)| CandidateItem {
                index,
                text: Some(t.to_string()),
                checked: false,
            })
            .collect()
    }

    #[test]
    fn test_exact_match_picks_full_value() {
        let list = items(&["19126142", "191261420"]);
        match resolve_exact(&list, "19126142") {
            MatchOutcome::Found(item) => {
                assert_eq!(item.index, 0);
                assert_eq!(item.text.as_deref(), Some("19126142"));
            }
            other => panic!("expected a match, got {other:?}"),
        }
        match resolve_exact(&list, "191261420") {
            MatchOutcome::Found(item) => assert_eq!(item.index, 1),
            other => panic!("expected a match, got {other:?}"),
        }
    }

    #[test]
    fn test_prefix_is_not_a_match() {
        let list = items(&["19126142", "19126143"]);
        assert_eq!(
            resolve_exact(&list, "1912614"),
            MatchOutcome::NoExactMatch { checked: 2 }
        );
        // A single candidate that merely starts with the target is still rejected.
        let single = items(&["19126142"]);
        assert_eq!(
            resolve_exact(&single, "1912614"),
            MatchOutcome::NoExactMatch { checked: 1 }
        );
        let suffix = items(&["x19126142"]);
        assert_eq!(
            resolve_exact(&suffix, "19126142"),
            MatchOutcome::NoExactMatch { checked: 1 }
        );
    }

    #[test]
    fn test_empty_list_is_distinct() {
        assert_eq!(resolve_exact(&[], "anything"), MatchOutcome::NoCandidates);
    }

    #[test]
    fn test_whitespace_is_trimmed_on_both_sides() {
        let list = items(&["  Հաստատված "]);
        assert!(matches!(
            resolve_exact(&list, "Հաստատված\n"),
            MatchOutcome::Found(_)
        ));
    }

    #[test]
    fn test_first_of_duplicates_wins() {
        let list = items(&["A", "B", "B"]);
        match resolve_exact(&list, "B") {
            MatchOutcome::Found(item) => assert_eq!(item.index, 1),
            other => panic!("expected a match, got {other:?}"),
        }
    }

    #[test]
    fn test_row_without_value_never_matches() {
        let list = vec![
            CandidateItem {
                index: 0,
                text: None,
                checked: false,
            },
            CandidateItem {
                index: 1,
                text: Some(String::new()),
                checked: false,
            },
        ];
        assert_eq!(
            resolve_exact(&list, ""),
            MatchOutcome::NoExactMatch { checked: 2 }
        );
        assert_eq!(
            resolve_exact(&list, "   "),
            MatchOutcome::NoExactMatch { checked: 2 }
        );
    }
}
