//! A scripted filter popup shared by the integration tests.
//!
//! The popup mimics the dashboard: typing into the search box re-renders the
//! candidate list after `render_delay`, checkbox clicks are remembered across
//! re-renders and submitting closes the popup after `close_delay`.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use filterkit::{Dom, El, FilterConfig, MemoryEngine, Page, Trigger};

pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};
    let _ = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Short waits so the suite stays fast; the popup below renders well within them.
pub fn fast_config() -> FilterConfig {
    FilterConfig::default()
        .timeout_ms(1_000)
        .search_debounce_ms(80)
        .verify_delay_ms(20)
        .submit_timeout_ms(300)
}

#[derive(Debug, Clone, Default)]
struct PopupState {
    checked: BTreeMap<String, bool>,
    submissions: Vec<Vec<String>>,
}

pub struct FilterPopup {
    pub engine: Arc<MemoryEngine>,
    pub page: Page,
    state: Arc<Mutex<PopupState>>,
}

pub struct PopupBuilder {
    items: Vec<(String, bool)>,
    inert: BTreeSet<String>,
    render_delay: Duration,
    close_delay: Duration,
    open: bool,
    submit_disabled: bool,
}

impl Default for PopupBuilder {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            inert: BTreeSet::new(),
            render_delay: Duration::from_millis(20),
            close_delay: Duration::from_millis(30),
            open: true,
            submit_disabled: false,
        }
    }
}

impl PopupBuilder {
    pub fn items(mut self, items: &[&str]) -> Self {
        self.items
            .extend(items.iter().map(|value| (value.to_string(), false)));
        self
    }

    pub fn checked_item(mut self, value: &str) -> Self {
        self.items.push((value.to_string(), true));
        self
    }

    /// The item's checkbox ignores clicks.
    pub fn inert_item(mut self, value: &str) -> Self {
        self.items.push((value.to_string(), false));
        self.inert.insert(value.to_string());
        self
    }

    pub fn render_delay(mut self, delay: Duration) -> Self {
        self.render_delay = delay;
        self
    }

    pub fn close_delay(mut self, delay: Duration) -> Self {
        self.close_delay = delay;
        self
    }

    pub fn closed(mut self) -> Self {
        self.open = false;
        self
    }

    pub fn submit_disabled(mut self) -> Self {
        self.submit_disabled = true;
        self
    }

    pub fn build(self) -> FilterPopup {
        let state = Arc::new(Mutex::new(PopupState {
            checked: self.items.iter().cloned().collect(),
            submissions: Vec::new(),
        }));
        let order: Arc<Vec<String>> = Arc::new(self.items.iter().map(|(v, _)| v.clone()).collect());
        let inert = Arc::new(self.inert);

        let popup_class = if self.open {
            "filter-popup show"
        } else {
            "filter-popup"
        };
        let engine = Arc::new(MemoryEngine::with_body(
            El::new("div").class(popup_class).children([
                El::new("div")
                    .class("search")
                    .child(El::new("input").attr("name", "search")),
                El::new("div").class("checked-list"),
                El::new("div").class("filter-popup__footer").child(
                    El::new("button")
                        .attr("type", "submit")
                        .text("Apply")
                        .disabled(self.submit_disabled),
                ),
            ]),
        ));

        engine
            .mutate({
                let state = state.clone();
                let order = order.clone();
                let inert = inert.clone();
                move |dom| render(dom, &state, &order, &inert, "")
            })
            .expect("initial render");

        let render_delay = self.render_delay;
        engine
            .on(Trigger::Fill, "input[name=\"search\"]", {
                let state = state.clone();
                move |dom, _input, query| {
                    let state = state.clone();
                    let order = order.clone();
                    let inert = inert.clone();
                    let query = query.to_string();
                    dom.defer(render_delay, move |dom| {
                        render(dom, &state, &order, &inert, &query)
                    });
                }
            })
            .expect("search hook");

        engine
            .on(Trigger::Click, ".checked-list__item input[type=\"checkbox\"]", {
                let state = state.clone();
                move |dom, checkbox, _| {
                    let checked = dom.node(checkbox).checked;
                    if let Some(row) = dom.parent(checkbox) {
                        let value = dom.text_content(row).trim().to_string();
                        state.lock().unwrap().checked.insert(value, checked);
                    }
                }
            })
            .expect("checkbox hook");

        let close_delay = self.close_delay;
        engine
            .on(Trigger::Click, "button[type=\"submit\"]", {
                let state = state.clone();
                move |dom, _button, _| {
                    let mut state = state.lock().unwrap();
                    let selected: Vec<String> = state
                        .checked
                        .iter()
                        .filter(|(_, checked)| **checked)
                        .map(|(value, _)| value.clone())
                        .collect();
                    state.submissions.push(selected);
                    dom.defer(close_delay, |dom| {
                        if let Ok(Some(popup)) = dom.query_first(".filter-popup") {
                            dom.remove_class(popup, "show");
                        }
                    });
                }
            })
            .expect("submit hook");

        let page = Page::new(engine.clone());
        FilterPopup {
            engine,
            page,
            state,
        }
    }
}

/// Replaces the candidate list with the items containing `query`.
fn render(
    dom: &mut Dom,
    state: &Mutex<PopupState>,
    order: &[String],
    inert: &BTreeSet<String>,
    query: &str,
) {
    let Ok(Some(list)) = dom.query_first(".checked-list") else {
        return;
    };
    dom.clear_children(list);
    let state = state.lock().unwrap();
    for value in order.iter().filter(|v| v.contains(query)) {
        let checked = state.checked.get(value).copied().unwrap_or(false);
        dom.append(list, candidate_row(value, checked, inert.contains(value)));
    }
}

pub fn candidate_row(value: &str, checked: bool, inert: bool) -> El {
    El::new("div")
        .class("checked-list__item")
        .child(
            El::new("input")
                .attr("type", "checkbox")
                .checked(checked)
                .inert(inert),
        )
        .child(
            El::new("div")
                .class("controller__right")
                .child(El::new("div").class("flexbox").text(value)),
        )
}

impl FilterPopup {
    pub fn builder() -> PopupBuilder {
        PopupBuilder::default()
    }

    pub fn is_checked(&self, value: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .checked
            .get(value)
            .copied()
            .unwrap_or(false)
    }

    /// Checked values at each submit, in submit order.
    pub fn submissions(&self) -> Vec<Vec<String>> {
        self.state.lock().unwrap().submissions.clone()
    }

    pub fn direct_clicks(&self) -> usize {
        self.engine
            .actions()
            .iter()
            .filter(|a| a.kind == filterkit::ActionKind::DirectClick)
            .count()
    }

    pub async fn is_open(&self) -> bool {
        self.page
            .locator(".filter-popup.show")
            .is_visible()
            .await
            .unwrap()
    }
}
