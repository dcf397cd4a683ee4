//! Scripted in-memory page.
//!
//! Renders nothing; it keeps a small element tree, resolves selectors against it
//! and runs registered hooks when the page is acted on. Hooks can schedule
//! deferred mutations with [`Dom::defer`], which is how tests reproduce a UI that
//! re-renders some time after an input changes.

mod css;
mod dom;

pub use dom::{Dom, El, Node, NodeId};

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use crate::platforms::AutomationEngine;
use crate::selector::{Selector, SelectorStep};
use crate::AutomationError;
use css::SelectorList;

/// Which page action a hook reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Fill,
    /// Both pointer clicks and direct element clicks.
    Click,
    Press,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Fill,
    Click,
    DirectClick,
    Press,
    Navigate,
}

/// One action the engine performed, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRecord {
    pub kind: ActionKind,
    pub target: String,
    pub value: Option<String>,
}

pub type HookFn = Arc<dyn Fn(&mut Dom, NodeId, &str) + Send + Sync>;

struct Hook {
    trigger: Trigger,
    selector: SelectorList,
    handler: HookFn,
}

struct PageState {
    dom: Dom,
    hooks: Vec<Hook>,
    url: String,
    actions: Vec<ActionRecord>,
}

pub struct MemoryEngine {
    state: Mutex<PageState>,
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(PageState {
                dom: Dom::new(),
                hooks: Vec::new(),
                url: "about:blank".to_string(),
                actions: Vec::new(),
            }),
        }
    }

    /// Creates a page whose document contains `body`.
    pub fn with_body(body: El) -> Self {
        let engine = Self::new();
        if let Ok(mut state) = engine.state.lock() {
            let root = state.dom.root();
            state.dom.append(root, body);
        }
        engine
    }

    /// Registers `handler` to run after `trigger` acts on an element matching `css`.
    pub fn on(
        &self,
        trigger: Trigger,
        css: &str,
        handler: impl Fn(&mut Dom, NodeId, &str) + Send + Sync + 'static,
    ) -> Result<(), AutomationError> {
        let selector = SelectorList::parse(css)?;
        self.lock()?.hooks.push(Hook {
            trigger,
            selector,
            handler: Arc::new(handler),
        });
        Ok(())
    }

    /// Runs `f` against the current document.
    pub fn mutate<R>(&self, f: impl FnOnce(&mut Dom) -> R) -> Result<R, AutomationError> {
        let mut state = self.lock()?;
        Ok(f(&mut state.dom))
    }

    pub fn actions(&self) -> Vec<ActionRecord> {
        self.lock().map(|s| s.actions.clone()).unwrap_or_default()
    }

    pub fn clear_actions(&self) {
        if let Ok(mut state) = self.lock() {
            state.actions.clear();
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, PageState>, AutomationError> {
        let mut state = self
            .state
            .lock()
            .map_err(|e| AutomationError::Internal(format!("page state poisoned: {e}")))?;
        state.dom.flush_due();
        Ok(state)
    }

    fn resolve(dom: &Dom, selector: &Selector) -> Result<Vec<NodeId>, AutomationError> {
        let order = dom.document_order();
        let mut current = vec![dom.root()];
        for step in selector.steps()? {
            current = match step {
                SelectorStep::Css(css) => {
                    let list = SelectorList::parse(&css)?;
                    let mut found: Vec<NodeId> = Vec::new();
                    for scope in &current {
                        for id in dom.descendants(*scope) {
                            if !found.contains(&id) && list.matches(dom, id) {
                                found.push(id);
                            }
                        }
                    }
                    found.sort_by_key(|id| order[*id]);
                    found
                }
                SelectorStep::Nth(n) => {
                    let len = current.len() as i64;
                    let idx = if n < 0 { len + n as i64 } else { n as i64 };
                    if idx >= 0 && idx < len {
                        vec![current[idx as usize]]
                    } else {
                        Vec::new()
                    }
                }
                SelectorStep::Visible(wanted) => current
                    .into_iter()
                    .filter(|id| dom.is_visible(*id) == wanted)
                    .collect(),
                SelectorStep::HasText(text) => current
                    .into_iter()
                    .filter(|id| dom.text_content(*id).contains(&text))
                    .collect(),
                SelectorStep::ExactText(text) => {
                    let wanted = text.trim().to_lowercase();
                    current
                        .into_iter()
                        .filter(|id| dom.text_content(*id).trim().to_lowercase() == wanted)
                        .collect()
                }
            };
        }
        current.retain(|id| *id != dom.root());
        Ok(current)
    }

    fn first(dom: &Dom, selector: &Selector) -> Result<NodeId, AutomationError> {
        Self::resolve(dom, selector)?
            .into_iter()
            .next()
            .ok_or_else(|| AutomationError::ElementNotFound(selector.to_string()))
    }

    fn run_hooks(state: &mut PageState, trigger: Trigger, node: NodeId, value: &str) {
        let handlers: Vec<HookFn> = state
            .hooks
            .iter()
            .filter(|h| h.trigger == trigger && h.selector.matches(&state.dom, node))
            .map(|h| h.handler.clone())
            .collect();
        for handler in handlers {
            handler(&mut state.dom, node, value);
        }
    }

    fn record(state: &mut PageState, kind: ActionKind, node: NodeId, value: Option<&str>) {
        let target = state.dom.node(node).describe();
        debug!(?kind, %target, "memory page action");
        state.actions.push(ActionRecord {
            kind,
            target,
            value: value.map(str::to_string),
        });
    }

    fn activate(&self, selector: &Selector, kind: ActionKind) -> Result<(), AutomationError> {
        let mut state = self.lock()?;
        let node = Self::first(&state.dom, selector)?;
        if kind == ActionKind::Click {
            if !state.dom.is_visible(node) {
                return Err(AutomationError::ElementNotVisible(selector.to_string()));
            }
            if state.dom.node(node).disabled {
                return Err(AutomationError::ElementNotEnabled(selector.to_string()));
            }
        }
        Self::record(&mut state, kind, node, None);
        // A click on a disabled control is swallowed by the page.
        if state.dom.node(node).disabled {
            return Ok(());
        }
        let target = state.dom.node_mut(node);
        if target.is_checkbox() && !target.inert {
            target.checked = !target.checked;
        }
        Self::run_hooks(&mut state, Trigger::Click, node, "");
        Ok(())
    }
}

#[async_trait::async_trait]
impl AutomationEngine for MemoryEngine {
    async fn count(&self, selector: &Selector) -> Result<usize, AutomationError> {
        let state = self.lock()?;
        Ok(Self::resolve(&state.dom, selector)?.len())
    }

    async fn is_visible(&self, selector: &Selector) -> Result<bool, AutomationError> {
        let state = self.lock()?;
        Ok(Self::resolve(&state.dom, selector)?
            .first()
            .map(|id| state.dom.is_visible(*id))
            .unwrap_or(false))
    }

    async fn is_enabled(&self, selector: &Selector) -> Result<bool, AutomationError> {
        let state = self.lock()?;
        let node = Self::first(&state.dom, selector)?;
        Ok(!state.dom.node(node).disabled)
    }

    async fn is_checked(&self, selector: &Selector) -> Result<bool, AutomationError> {
        let state = self.lock()?;
        let node = Self::first(&state.dom, selector)?;
        Ok(state.dom.node(node).checked)
    }

    async fn text_content(&self, selector: &Selector) -> Result<Option<String>, AutomationError> {
        let state = self.lock()?;
        let node = Self::first(&state.dom, selector)?;
        Ok(Some(state.dom.text_content(node)))
    }

    async fn inner_text(&self, selector: &Selector) -> Result<String, AutomationError> {
        let state = self.lock()?;
        let node = Self::first(&state.dom, selector)?;
        Ok(state.dom.inner_text(node))
    }

    async fn input_value(&self, selector: &Selector) -> Result<String, AutomationError> {
        let state = self.lock()?;
        let node = Self::first(&state.dom, selector)?;
        Ok(state.dom.node(node).value.clone())
    }

    async fn fill(&self, selector: &Selector, value: &str) -> Result<(), AutomationError> {
        let mut state = self.lock()?;
        let node = Self::first(&state.dom, selector)?;
        if !state.dom.node(node).is_text_input() {
            return Err(AutomationError::InvalidArgument(format!(
                "cannot fill {}: not a text input",
                state.dom.node(node).describe()
            )));
        }
        if !state.dom.is_visible(node) {
            return Err(AutomationError::ElementNotVisible(selector.to_string()));
        }
        if state.dom.node(node).disabled {
            return Err(AutomationError::ElementNotEnabled(selector.to_string()));
        }
        state.dom.node_mut(node).value = value.to_string();
        Self::record(&mut state, ActionKind::Fill, node, Some(value));
        Self::run_hooks(&mut state, Trigger::Fill, node, value);
        Ok(())
    }

    async fn click(&self, selector: &Selector) -> Result<(), AutomationError> {
        self.activate(selector, ActionKind::Click)
    }

    async fn dispatch_click(&self, selector: &Selector) -> Result<(), AutomationError> {
        self.activate(selector, ActionKind::DirectClick)
    }

    async fn press(&self, selector: &Selector, key: &str) -> Result<(), AutomationError> {
        let mut state = self.lock()?;
        let node = Self::first(&state.dom, selector)?;
        Self::record(&mut state, ActionKind::Press, node, Some(key));
        Self::run_hooks(&mut state, Trigger::Press, node, key);
        Ok(())
    }

    async fn goto(&self, url: &str) -> Result<(), AutomationError> {
        let mut state = self.lock()?;
        state.url = url.to_string();
        let root = state.dom.root();
        Self::record(&mut state, ActionKind::Navigate, root, Some(url));
        Ok(())
    }

    async fn current_url(&self) -> Result<String, AutomationError> {
        Ok(self.lock()?.url.clone())
    }
}
