use std::collections::BTreeMap;
use std::time::Duration;

use tokio::time::Instant;

use super::css::SelectorList;
use crate::AutomationError;

pub type NodeId = usize;

const DOCUMENT_TAG: &str = "#document";

/// A single element of the in-memory page.
#[derive(Debug, Clone, Default)]
pub struct Node {
    pub tag: String,
    pub attrs: BTreeMap<String, String>,
    /// Own text, rendered before the children.
    pub text: String,
    pub value: String,
    pub checked: bool,
    pub disabled: bool,
    pub hidden: bool,
    /// Clicks reach the element but never change its checked state.
    pub inert: bool,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    detached: bool,
}

impl Node {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .map(|all| all.split_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    pub fn is_document(&self) -> bool {
        self.tag == DOCUMENT_TAG
    }

    pub fn is_checkbox(&self) -> bool {
        self.tag.eq_ignore_ascii_case("input") && self.attr("type") == Some("checkbox")
    }

    pub fn is_text_input(&self) -> bool {
        (self.tag.eq_ignore_ascii_case("input") && !self.is_checkbox())
            || self.tag.eq_ignore_ascii_case("textarea")
    }

    /// Short description used in action logs and error messages.
    pub fn describe(&self) -> String {
        let mut out = self.tag.clone();
        if let Some(id) = self.attr("id") {
            out.push('#');
            out.push_str(id);
        }
        if let Some(class) = self.attr("class") {
            for c in class.split_whitespace() {
                out.push('.');
                out.push_str(c);
            }
        }
        if let Some(name) = self.attr("name") {
            out.push_str(&format!("[name={name:?}]"));
        }
        out
    }
}

/// Builder for a subtree of the in-memory page.
#[derive(Debug, Clone, Default)]
pub struct El {
    tag: String,
    attrs: BTreeMap<String, String>,
    text: String,
    value: String,
    checked: bool,
    disabled: bool,
    hidden: bool,
    inert: bool,
    children: Vec<El>,
}

impl El {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            ..Default::default()
        }
    }

    /// Adds one or more space-separated classes.
    pub fn class(mut self, classes: &str) -> Self {
        let merged = match self.attrs.get("class") {
            Some(existing) => format!("{existing} {classes}"),
            None => classes.to_string(),
        };
        self.attrs.insert("class".to_string(), merged);
        self
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn value(mut self, value: &str) -> Self {
        self.value = value.to_string();
        self
    }

    pub fn checked(mut self, checked: bool) -> Self {
        self.checked = checked;
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    pub fn inert(mut self, inert: bool) -> Self {
        self.inert = inert;
        self
    }

    pub fn child(mut self, child: El) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = El>) -> Self {
        self.children.extend(children);
        self
    }
}

type Mutation = Box<dyn FnOnce(&mut Dom) + Send>;

/// The in-memory document: an arena of nodes plus mutations scheduled for later.
pub struct Dom {
    nodes: Vec<Node>,
    pending: Vec<(Instant, Mutation)>,
}

impl Default for Dom {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Dom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dom")
            .field("nodes", &self.nodes.len())
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl Dom {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                tag: DOCUMENT_TAG.to_string(),
                ..Default::default()
            }],
            pending: Vec::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        0
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id]
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].parent
    }

    pub fn children_of(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id].children
    }

    /// Builds `el` and attaches it as the last child of `parent`.
    pub fn append(&mut self, parent: NodeId, el: El) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node {
            tag: el.tag,
            attrs: el.attrs,
            text: el.text,
            value: el.value,
            checked: el.checked,
            disabled: el.disabled,
            hidden: el.hidden,
            inert: el.inert,
            parent: Some(parent),
            children: Vec::new(),
            detached: false,
        });
        self.nodes[parent].children.push(id);
        for child in el.children {
            self.append(id, child);
        }
        id
    }

    /// Detaches every child of `id`.
    pub fn clear_children(&mut self, id: NodeId) {
        let children = std::mem::take(&mut self.nodes[id].children);
        for child in children {
            self.mark_detached(child);
        }
    }

    pub fn remove(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id].parent {
            self.nodes[parent].children.retain(|c| *c != id);
        }
        self.mark_detached(id);
    }

    fn mark_detached(&mut self, id: NodeId) {
        self.nodes[id].detached = true;
        self.nodes[id].parent = None;
        let children = self.nodes[id].children.clone();
        for child in children {
            self.mark_detached(child);
        }
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        let node = &mut self.nodes[id];
        if !node.has_class(class) {
            let merged = match node.attrs.get("class") {
                Some(existing) if !existing.is_empty() => format!("{existing} {class}"),
                _ => class.to_string(),
            };
            node.attrs.insert("class".to_string(), merged);
        }
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) {
        let node = &mut self.nodes[id];
        if let Some(existing) = node.attrs.get("class") {
            let kept: Vec<&str> = existing.split_whitespace().filter(|c| *c != class).collect();
            let kept = kept.join(" ");
            node.attrs.insert("class".to_string(), kept);
        }
    }

    /// 1-based position among the parent's children.
    pub fn child_position(&self, id: NodeId) -> Option<usize> {
        let parent = self.nodes[id].parent?;
        self.nodes[parent]
            .children
            .iter()
            .position(|c| *c == id)
            .map(|p| p + 1)
    }

    pub fn is_last_child(&self, id: NodeId) -> bool {
        match self.nodes[id].parent {
            Some(parent) => self.nodes[parent].children.last() == Some(&id),
            None => false,
        }
    }

    pub fn is_visible(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = &self.nodes[node_id];
            if node.detached || node.hidden {
                return false;
            }
            current = node.parent;
        }
        true
    }

    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = self.nodes[id].text.clone();
        for child in &self.nodes[id].children {
            out.push_str(&self.text_content(*child));
        }
        out
    }

    /// Rendered text: hidden subtrees are skipped, children are separated by newlines.
    pub fn inner_text(&self, id: NodeId) -> String {
        if !self.is_visible(id) {
            return String::new();
        }
        let mut parts: Vec<String> = Vec::new();
        let own = self.nodes[id].text.trim();
        if !own.is_empty() {
            parts.push(own.to_string());
        }
        for child in &self.nodes[id].children {
            let text = self.inner_text(*child);
            if !text.is_empty() {
                parts.push(text);
            }
        }
        parts.join("\n")
    }

    /// All attached descendants of `scope` in document order.
    pub fn descendants(&self, scope: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.nodes[scope].children.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.nodes[id].children.iter().rev().copied());
        }
        out
    }

    /// Document-order rank of every attached node, used to merge scoped matches.
    pub fn document_order(&self) -> Vec<Option<usize>> {
        let mut ranks = vec![None; self.nodes.len()];
        ranks[self.root()] = Some(0);
        for (rank, id) in self.descendants(self.root()).into_iter().enumerate() {
            ranks[id] = Some(rank + 1);
        }
        ranks
    }

    pub fn query_all(&self, scope: NodeId, css: &str) -> Result<Vec<NodeId>, AutomationError> {
        let list = SelectorList::parse(css)?;
        Ok(self
            .descendants(scope)
            .into_iter()
            .filter(|id| list.matches(self, *id))
            .collect())
    }

    pub fn query_first(&self, css: &str) -> Result<Option<NodeId>, AutomationError> {
        Ok(self.query_all(self.root(), css)?.into_iter().next())
    }

    /// Schedules `mutation` to run once `delay` has elapsed.
    ///
    /// Mutations are applied lazily, the next time the page is read after their deadline.
    pub fn defer(&mut self, delay: Duration, mutation: impl FnOnce(&mut Dom) + Send + 'static) {
        self.pending.push((Instant::now() + delay, Box::new(mutation)));
    }

    pub(crate) fn flush_due(&mut self) {
        let now = Instant::now();
        loop {
            let due = self
                .pending
                .iter()
                .enumerate()
                .filter(|(_, (at, _))| *at <= now)
                .min_by_key(|(_, (at, _))| *at)
                .map(|(idx, _)| idx);
            match due {
                Some(idx) => {
                    let (_, mutation) = self.pending.remove(idx);
                    mutation(self);
                }
                None => break,
            }
        }
    }
}
