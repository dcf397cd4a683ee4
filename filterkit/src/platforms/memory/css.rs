//! A small CSS selector subset for the in-memory page.
//!
//! Supported: type selectors, `*`, `#id`, `.class`, `[attr]`, `[attr="v"]`,
//! `:nth-child(n)`, `:first-child`, `:last-child`, `:not(<compound>)`,
//! `:visible`, descendant and `>` combinators and `,` lists.

use super::dom::{Dom, NodeId};
use crate::AutomationError;

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttrMatch {
    Exists(String),
    Equals(String, String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrMatch>,
    nth_child: Option<usize>,
    last_child: bool,
    visible: bool,
    not: Vec<Compound>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

/// One comma-separated alternative: compounds joined by combinators, left to right.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Complex {
    head: Compound,
    tail: Vec<(Combinator, Compound)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList {
    alternatives: Vec<Complex>,
}

impl SelectorList {
    pub fn parse(input: &str) -> Result<Self, AutomationError> {
        let mut parser = Parser {
            chars: input.chars().collect(),
            pos: 0,
            source: input,
        };
        let mut alternatives = vec![parser.complex()?];
        loop {
            parser.skip_ws();
            match parser.peek() {
                None => break,
                Some(',') => {
                    parser.pos += 1;
                    alternatives.push(parser.complex()?);
                }
                Some(c) => return Err(parser.error(&format!("unexpected {c:?}"))),
            }
        }
        Ok(Self { alternatives })
    }

    pub fn matches(&self, dom: &Dom, node: NodeId) -> bool {
        self.alternatives.iter().any(|alt| alt.matches(dom, node))
    }
}

impl Complex {
    fn matches(&self, dom: &Dom, node: NodeId) -> bool {
        // Flatten to right-to-left order: the rightmost compound must match `node`.
        let mut compounds: Vec<&Compound> = vec![&self.head];
        let mut combinators: Vec<Combinator> = Vec::new();
        for (comb, comp) in &self.tail {
            combinators.push(*comb);
            compounds.push(comp);
        }
        match_from(dom, node, &compounds, &combinators)
    }
}

fn match_from(dom: &Dom, node: NodeId, compounds: &[&Compound], combinators: &[Combinator]) -> bool {
    let Some((last, rest)) = compounds.split_last() else {
        return true;
    };
    if !last.matches(dom, node) {
        return false;
    }
    let Some((comb, rest_combs)) = combinators.split_last() else {
        return true;
    };
    match comb {
        Combinator::Child => match dom.parent(node) {
            Some(parent) => match_from(dom, parent, rest, rest_combs),
            None => false,
        },
        Combinator::Descendant => {
            let mut current = dom.parent(node);
            while let Some(ancestor) = current {
                if match_from(dom, ancestor, rest, rest_combs) {
                    return true;
                }
                current = dom.parent(ancestor);
            }
            false
        }
    }
}

impl Compound {
    fn matches(&self, dom: &Dom, node: NodeId) -> bool {
        let n = dom.node(node);
        if n.is_document() {
            return false;
        }
        if let Some(tag) = &self.tag {
            if !tag.eq_ignore_ascii_case(&n.tag) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if n.attr("id") != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.iter().all(|c| n.has_class(c)) {
            return false;
        }
        for attr in &self.attrs {
            let ok = match attr {
                AttrMatch::Exists(name) => n.attr(name).is_some(),
                AttrMatch::Equals(name, value) => n.attr(name) == Some(value.as_str()),
            };
            if !ok {
                return false;
            }
        }
        if let Some(position) = self.nth_child {
            if dom.child_position(node) != Some(position) {
                return false;
            }
        }
        if self.last_child && !dom.is_last_child(node) {
            return false;
        }
        if self.visible && !dom.is_visible(node) {
            return false;
        }
        !self.not.iter().any(|inner| inner.matches(dom, node))
    }
}

struct Parser<'a> {
    chars: Vec<char>,
    pos: usize,
    source: &'a str,
}

impl Parser<'_> {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn error(&self, what: &str) -> AutomationError {
        AutomationError::InvalidSelector(format!(
            "{what} at offset {} in {:?}",
            self.pos, self.source
        ))
    }

    fn skip_ws(&mut self) -> bool {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn complex(&mut self) -> Result<Complex, AutomationError> {
        self.skip_ws();
        let head = self.compound()?;
        let mut tail = Vec::new();
        loop {
            let had_ws = self.skip_ws();
            match self.peek() {
                None | Some(',') | Some(')') => break,
                Some('>') => {
                    self.pos += 1;
                    self.skip_ws();
                    tail.push((Combinator::Child, self.compound()?));
                }
                Some(_) if had_ws => tail.push((Combinator::Descendant, self.compound()?)),
                Some(c) => return Err(self.error(&format!("unexpected {c:?}"))),
            }
        }
        Ok(Complex { head, tail })
    }

    fn compound(&mut self) -> Result<Compound, AutomationError> {
        let mut compound = Compound::default();
        let mut empty = true;

        if self.peek() == Some('*') {
            self.pos += 1;
            empty = false;
        } else if matches!(self.peek(), Some(c) if is_ident_char(c)) {
            compound.tag = Some(self.ident()?);
            empty = false;
        }

        loop {
            match self.peek() {
                Some('.') => {
                    self.pos += 1;
                    compound.classes.push(self.ident()?);
                }
                Some('#') => {
                    self.pos += 1;
                    compound.id = Some(self.ident()?);
                }
                Some('[') => {
                    self.pos += 1;
                    compound.attrs.push(self.attribute()?);
                }
                Some(':') => {
                    self.pos += 1;
                    self.pseudo(&mut compound)?;
                }
                _ => break,
            }
            empty = false;
        }

        if empty {
            return Err(self.error("expected a selector"));
        }
        Ok(compound)
    }

    fn ident(&mut self) -> Result<String, AutomationError> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if is_ident_char(c)) {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(self.error("expected an identifier"));
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn attribute(&mut self) -> Result<AttrMatch, AutomationError> {
        self.skip_ws();
        let name = self.ident()?;
        self.skip_ws();
        match self.peek() {
            Some(']') => {
                self.pos += 1;
                Ok(AttrMatch::Exists(name))
            }
            Some('=') => {
                self.pos += 1;
                self.skip_ws();
                let value = self.attr_value()?;
                self.skip_ws();
                if self.peek() != Some(']') {
                    return Err(self.error("expected ']'"));
                }
                self.pos += 1;
                Ok(AttrMatch::Equals(name, value))
            }
            _ => Err(self.error("expected ']' or '='")),
        }
    }

    fn attr_value(&mut self) -> Result<String, AutomationError> {
        match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.pos += 1;
                let start = self.pos;
                while let Some(c) = self.peek() {
                    if c == quote {
                        let value: String = self.chars[start..self.pos].iter().collect();
                        self.pos += 1;
                        return Ok(value);
                    }
                    self.pos += 1;
                }
                Err(self.error("unterminated string"))
            }
            _ => self.ident(),
        }
    }

    fn pseudo(&mut self, compound: &mut Compound) -> Result<(), AutomationError> {
        let name = self.ident()?;
        match name.as_str() {
            "first-child" => compound.nth_child = Some(1),
            "last-child" => compound.last_child = true,
            "visible" => compound.visible = true,
            "nth-child" => {
                self.expect('(')?;
                self.skip_ws();
                let digits = self.ident()?;
                let position = digits
                    .parse::<usize>()
                    .ok()
                    .filter(|p| *p > 0)
                    .ok_or_else(|| self.error("nth-child expects a positive integer"))?;
                self.skip_ws();
                self.expect(')')?;
                compound.nth_child = Some(position);
            }
            "not" => {
                self.expect('(')?;
                self.skip_ws();
                let inner = self.compound()?;
                self.skip_ws();
                self.expect(')')?;
                compound.not.push(inner);
            }
            other => return Err(self.error(&format!("unsupported pseudo-class :{other}"))),
        }
        Ok(())
    }

    fn expect(&mut self, c: char) -> Result<(), AutomationError> {
        if self.peek() == Some(c) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(&format!("expected {c:?}")))
        }
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}
