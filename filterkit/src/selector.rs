use serde::Serialize;

/// Represents ways to locate an element on a page
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    /// Structural CSS selector, evaluated against every element in the current scope
    Css(String),
    /// Select the n-th element from the matches (negative counts from the end)
    Nth(i32),
    /// Filter by visibility on screen
    Visible(bool),
    /// Keep elements whose text content contains the value
    HasText(String),
    /// Keep elements whose trimmed text equals the value, ignoring case
    ExactText(String),
    /// Chain multiple selectors, each scoped to the matches of the previous one
    Chain(Vec<Selector>),
    /// Represents an invalid selector string, with a reason.
    Invalid(String),
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Selector::Css(css) => write!(f, "{css}"),
            Selector::Nth(n) => write!(f, "nth={n}"),
            Selector::Visible(v) => write!(f, "visible={v}"),
            Selector::HasText(t) => write!(f, "text={t}"),
            Selector::ExactText(t) => write!(f, "text-is={t}"),
            Selector::Chain(parts) => {
                let rendered: Vec<String> = parts.iter().map(|p| p.to_string()).collect();
                write!(f, "{}", rendered.join(" >> "))
            }
            Selector::Invalid(reason) => write!(f, "<invalid: {reason}>"),
        }
    }
}

impl From<&str> for Selector {
    fn from(s: &str) -> Self {
        // Handle chained selectors first
        let parts = split_chain(s);
        if parts.len() > 1 {
            return Selector::Chain(parts.into_iter().map(Selector::from).collect());
        }

        let s = s.trim();
        match s {
            "" => Selector::Invalid("empty selector".to_string()),
            _ if s.starts_with("nth=") => match s[4..].trim().parse::<i32>() {
                Ok(n) => Selector::Nth(n),
                Err(_) => Selector::Invalid(format!("bad nth index in {s:?}")),
            },
            _ if s.starts_with("visible=") => match s[8..].trim().to_lowercase().as_str() {
                "true" => Selector::Visible(true),
                "false" => Selector::Visible(false),
                other => Selector::Invalid(format!("visible expects true or false, got {other:?}")),
            },
            _ if s.starts_with("text-is=") => Selector::ExactText(s[8..].trim().to_string()),
            _ if s.starts_with("text=") => Selector::HasText(s[5..].trim().to_string()),
            _ if s.starts_with("css=") => Selector::Css(s[4..].trim().to_string()),
            _ => Selector::Css(s.to_string()),
        }
    }
}

/// Splits on `>>` outside attribute brackets, so `[title="a>>b"]` stays whole.
fn split_chain(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    let mut chars = s.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        match (quote, c) {
            (Some(_), '\\') => {
                chars.next();
            }
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') if depth > 0 => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.saturating_sub(1),
            (None, '>') if depth == 0 && matches!(chars.peek(), Some((_, '>'))) => {
                parts.push(s[start..i].trim());
                chars.next();
                start = i + 2;
            }
            _ => {}
        }
    }
    parts.push(s[start..].trim());
    parts
}

impl From<String> for Selector {
    fn from(s: String) -> Self {
        Selector::from(s.as_str())
    }
}

impl From<&String> for Selector {
    fn from(s: &String) -> Self {
        Selector::from(s.as_str())
    }
}

/// One flattened resolution step, in the shape the in-page resolver expects.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum SelectorStep {
    Css(String),
    Nth(i32),
    Visible(bool),
    HasText(String),
    ExactText(String),
}

impl Selector {
    /// Append another selector, flattening chains on both sides.
    pub fn then(self, next: Selector) -> Selector {
        let mut chain = match self {
            Selector::Chain(parts) => parts,
            s => vec![s],
        };
        match next {
            Selector::Chain(mut parts) => chain.append(&mut parts),
            s => chain.push(s),
        }
        Selector::Chain(chain)
    }

    /// Flatten into resolution steps, rejecting invalid parts.
    pub fn steps(&self) -> Result<Vec<SelectorStep>, crate::AutomationError> {
        let mut out = Vec::new();
        self.collect_steps(&mut out)?;
        Ok(out)
    }

    fn collect_steps(&self, out: &mut Vec<SelectorStep>) -> Result<(), crate::AutomationError> {
        match self {
            Selector::Css(css) => out.push(SelectorStep::Css(css.clone())),
            Selector::Nth(n) => out.push(SelectorStep::Nth(*n)),
            Selector::Visible(v) => out.push(SelectorStep::Visible(*v)),
            Selector::HasText(t) => out.push(SelectorStep::HasText(t.clone())),
            Selector::ExactText(t) => out.push(SelectorStep::ExactText(t.clone())),
            Selector::Chain(parts) => {
                for part in parts {
                    part.collect_steps(out)?;
                }
            }
            Selector::Invalid(reason) => {
                return Err(crate::AutomationError::InvalidSelector(reason.clone()))
            }
        }
        Ok(())
    }
}
