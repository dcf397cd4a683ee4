//! Chrome DevTools Protocol backend.
//!
//! Discovers a tab over the HTTP `/json` endpoint, then drives it over the
//! tab's websocket. Selectors are resolved inside the page on every call, so a
//! selector always sees the DOM as it is now.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, instrument, trace, warn};

use crate::platforms::AutomationEngine;
use crate::{AutomationError, Selector};

const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);
const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(60);

type CallResult = Result<Value, String>;
type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<CallResult>>>>;

#[derive(Debug, Clone, Deserialize)]
pub struct TabInfo {
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub url: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(rename = "webSocketDebuggerUrl")]
    pub websocket_url: Option<String>,
}

#[derive(Debug, Serialize)]
struct CdpRequest<'a> {
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct CdpIncoming {
    id: Option<u64>,
    result: Option<Value>,
    error: Option<Value>,
    method: Option<String>,
}

/// Lists the tabs of a browser started with `--remote-debugging-port`.
pub async fn list_tabs(debug_port: u16) -> Result<Vec<TabInfo>, AutomationError> {
    let url = format!("http://127.0.0.1:{debug_port}/json");
    let tabs: Vec<TabInfo> = reqwest::get(&url)
        .await
        .map_err(|e| AutomationError::PlatformError(format!("Failed to list tabs at {url}: {e}")))?
        .json()
        .await
        .map_err(|e| AutomationError::PlatformError(format!("Failed to parse tab list: {e}")))?;
    debug!("Found {} open tabs", tabs.len());
    Ok(tabs)
}

pub struct CdpEngine {
    outgoing: mpsc::UnboundedSender<Message>,
    pending: Pending,
    next_id: AtomicU64,
    call_timeout: Duration,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl Drop for CdpEngine {
    /// The writer flushes the close frame and exits once `outgoing` is gone.
    fn drop(&mut self) {
        if self.outgoing.send(Message::Close(None)).is_err() {
            self.writer.abort();
        }
        self.reader.abort();
    }
}

impl CdpEngine {
    /// Connect to the first page tab whose URL contains `url_pattern`
    /// (or the first page tab when no pattern is given).
    #[instrument(skip(url_pattern))]
    pub async fn connect(debug_port: u16, url_pattern: Option<&str>) -> Result<Self, AutomationError> {
        let tabs = list_tabs(debug_port).await?;
        let tab = tabs
            .into_iter()
            .filter(|t| t.kind.is_empty() || t.kind == "page")
            .find(|t| url_pattern.map(|p| t.url.contains(p)).unwrap_or(true))
            .ok_or_else(|| {
                AutomationError::ElementNotFound(format!(
                    "No tab found with URL pattern '{}'",
                    url_pattern.unwrap_or("*")
                ))
            })?;
        let ws_url = tab.websocket_url.ok_or_else(|| {
            AutomationError::PlatformError(format!(
                "Tab '{}' exposes no websocket; is another debugger attached?",
                tab.title
            ))
        })?;
        info!(tab = %tab.url, "Attaching to browser tab");
        Self::connect_ws(&ws_url).await
    }

    pub async fn connect_ws(ws_url: &str) -> Result<Self, AutomationError> {
        let (stream, _response) = connect_async(ws_url)
            .await
            .map_err(|e| AutomationError::PlatformError(format!("ws connect to {ws_url}: {e}")))?;
        let (mut sink, mut source) = stream.split();
        let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));

        let writer = tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                if let Err(e) = sink.send(msg).await {
                    warn!("ws send error: {}", e);
                    break;
                }
            }
        });

        let reader_pending = pending.clone();
        let reader = tokio::spawn(async move {
            while let Some(Ok(msg)) = source.next().await {
                if !msg.is_text() {
                    continue;
                }
                let txt = msg.into_text().unwrap_or_default();
                match serde_json::from_str::<CdpIncoming>(&txt) {
                    Ok(CdpIncoming {
                        id: Some(id),
                        result,
                        error,
                        ..
                    }) => {
                        if let Some(tx) = reader_pending.lock().await.remove(&id) {
                            let _ = tx.send(match error {
                                Some(err) => Err(err.to_string()),
                                None => Ok(result.unwrap_or(Value::Null)),
                            });
                        }
                    }
                    Ok(CdpIncoming {
                        method: Some(method),
                        ..
                    }) => trace!(%method, "CDP event"),
                    Ok(_) => {}
                    Err(e) => warn!("Invalid incoming CDP JSON: {}", e),
                }
            }
            // Connection gone: fail whatever is still waiting.
            for (_, tx) in reader_pending.lock().await.drain() {
                let _ = tx.send(Err("connection closed".to_string()));
            }
        });

        let engine = Self {
            outgoing: tx,
            pending,
            next_id: AtomicU64::new(1),
            call_timeout: DEFAULT_CALL_TIMEOUT,
            reader,
            writer,
        };
        engine.call("Runtime.enable", json!({})).await?;
        engine.call("Page.enable", json!({})).await?;
        Ok(engine)
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Send one protocol command and wait for its reply.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value, AutomationError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel::<CallResult>();
        self.pending.lock().await.insert(id, tx);

        let payload = serde_json::to_string(&CdpRequest { id, method, params })
            .map_err(|e| AutomationError::Internal(format!("serialize {method}: {e}")))?;
        if self.outgoing.send(Message::Text(payload)).is_err() {
            self.pending.lock().await.remove(&id);
            return Err(AutomationError::PlatformError(
                "DevTools connection is closed".to_string(),
            ));
        }

        match tokio::time::timeout(self.call_timeout, rx).await {
            Ok(Ok(Ok(value))) => Ok(value),
            Ok(Ok(Err(err))) => Err(AutomationError::Protocol(format!("{method}: {err}"))),
            Ok(Err(_canceled)) => Err(AutomationError::PlatformError(format!(
                "{method}: reply channel dropped"
            ))),
            Err(_elapsed) => {
                self.pending.lock().await.remove(&id);
                Err(AutomationError::Timeout(format!(
                    "{method} got no reply within {:?}",
                    self.call_timeout
                )))
            }
        }
    }

    /// Evaluate an expression in the page and return its JSON value.
    pub async fn evaluate(&self, expression: &str) -> Result<Value, AutomationError> {
        let reply = self
            .call(
                "Runtime.evaluate",
                json!({
                    "expression": expression,
                    "returnByValue": true,
                    "awaitPromise": true,
                }),
            )
            .await?;
        if let Some(details) = reply.get("exceptionDetails") {
            let text = details
                .pointer("/exception/description")
                .or_else(|| details.get("text"))
                .and_then(Value::as_str)
                .unwrap_or("unknown exception");
            return Err(AutomationError::Protocol(format!(
                "JavaScript execution failed: {text}"
            )));
        }
        Ok(reply.pointer("/result/value").cloned().unwrap_or(Value::Null))
    }

    async fn run(&self, selector: &Selector, op: &str, arg: Value) -> Result<Value, AutomationError> {
        let steps = serde_json::to_string(&selector.steps()?)
            .map_err(|e| AutomationError::Internal(format!("serialize selector: {e}")))?;
        let script = RESOLVER_JS
            .replace("__STEPS__", &steps)
            .replace("__OP__", &Value::String(op.to_string()).to_string())
            .replace("__ARG__", &arg.to_string());
        let outcome = self.evaluate(&script).await?;
        if outcome.get("ok").and_then(Value::as_bool) == Some(true) {
            return Ok(outcome.get("value").cloned().unwrap_or(Value::Null));
        }
        match outcome.get("error").and_then(Value::as_str) {
            Some("not_found") => Err(AutomationError::ElementNotFound(selector.to_string())),
            Some("not_input") => Err(AutomationError::InvalidArgument(format!(
                "cannot fill {selector}: not a text input"
            ))),
            Some(other) => Err(AutomationError::Protocol(other.to_string())),
            None => Err(AutomationError::Protocol(format!(
                "unexpected resolver reply: {outcome}"
            ))),
        }
    }

    async fn run_bool(&self, selector: &Selector, op: &str) -> Result<bool, AutomationError> {
        Ok(self.run(selector, op, Value::Null).await?.as_bool().unwrap_or(false))
    }

    async fn run_string(&self, selector: &Selector, op: &str) -> Result<String, AutomationError> {
        Ok(self
            .run(selector, op, Value::Null)
            .await?
            .as_str()
            .unwrap_or_default()
            .to_string())
    }

    async fn mouse(&self, kind: &str, x: f64, y: f64) -> Result<(), AutomationError> {
        self.call(
            "Input.dispatchMouseEvent",
            json!({
                "type": kind,
                "x": x,
                "y": y,
                "button": "left",
                "clickCount": 1,
            }),
        )
        .await
        .map(|_| ())
    }
}

/// Virtual key code and text for the keys tests send.
fn key_definition(key: &str) -> (i64, Option<&'static str>) {
    match key {
        "Enter" => (13, Some("\r")),
        "Tab" => (9, None),
        "Escape" => (27, None),
        "Backspace" => (8, None),
        "ArrowDown" => (40, None),
        "ArrowUp" => (38, None),
        _ => (0, None),
    }
}

#[async_trait::async_trait]
impl AutomationEngine for CdpEngine {
    async fn count(&self, selector: &Selector) -> Result<usize, AutomationError> {
        Ok(self
            .run(selector, "count", Value::Null)
            .await?
            .as_u64()
            .unwrap_or(0) as usize)
    }

    async fn is_visible(&self, selector: &Selector) -> Result<bool, AutomationError> {
        self.run_bool(selector, "visible").await
    }

    async fn is_enabled(&self, selector: &Selector) -> Result<bool, AutomationError> {
        self.run_bool(selector, "enabled").await
    }

    async fn is_checked(&self, selector: &Selector) -> Result<bool, AutomationError> {
        self.run_bool(selector, "checked").await
    }

    async fn text_content(&self, selector: &Selector) -> Result<Option<String>, AutomationError> {
        Ok(self
            .run(selector, "text", Value::Null)
            .await?
            .as_str()
            .map(str::to_string))
    }

    async fn inner_text(&self, selector: &Selector) -> Result<String, AutomationError> {
        self.run_string(selector, "innerText").await
    }

    async fn input_value(&self, selector: &Selector) -> Result<String, AutomationError> {
        self.run_string(selector, "value").await
    }

    async fn fill(&self, selector: &Selector, value: &str) -> Result<(), AutomationError> {
        self.run(selector, "fill", Value::String(value.to_string()))
            .await
            .map(|_| ())
    }

    async fn click(&self, selector: &Selector) -> Result<(), AutomationError> {
        let target = self.run(selector, "box", Value::Null).await?;
        if target.get("visible").and_then(Value::as_bool) != Some(true) {
            return Err(AutomationError::ElementNotVisible(selector.to_string()));
        }
        if target.get("enabled").and_then(Value::as_bool) != Some(true) {
            return Err(AutomationError::ElementNotEnabled(selector.to_string()));
        }
        let x = target.get("x").and_then(Value::as_f64).unwrap_or_default();
        let y = target.get("y").and_then(Value::as_f64).unwrap_or_default();
        self.mouse("mouseMoved", x, y).await?;
        self.mouse("mousePressed", x, y).await?;
        self.mouse("mouseReleased", x, y).await
    }

    async fn dispatch_click(&self, selector: &Selector) -> Result<(), AutomationError> {
        self.run(selector, "dispatchClick", Value::Null)
            .await
            .map(|_| ())
    }

    async fn press(&self, selector: &Selector, key: &str) -> Result<(), AutomationError> {
        self.run(selector, "focus", Value::Null).await?;
        let (code, text) = key_definition(key);
        let mut down = json!({
            "type": "keyDown",
            "key": key,
            "code": key,
            "windowsVirtualKeyCode": code,
        });
        if let Some(text) = text {
            down["text"] = Value::String(text.to_string());
        }
        self.call("Input.dispatchKeyEvent", down).await?;
        self.call(
            "Input.dispatchKeyEvent",
            json!({
                "type": "keyUp",
                "key": key,
                "code": key,
                "windowsVirtualKeyCode": code,
            }),
        )
        .await
        .map(|_| ())
    }

    async fn goto(&self, url: &str) -> Result<(), AutomationError> {
        let reply = self.call("Page.navigate", json!({ "url": url })).await?;
        if let Some(err) = reply.get("errorText").and_then(Value::as_str) {
            return Err(AutomationError::PlatformError(format!(
                "navigation to {url} failed: {err}"
            )));
        }
        let deadline = tokio::time::Instant::now() + NAVIGATION_TIMEOUT;
        loop {
            let state = self.evaluate("document.readyState").await?;
            if state.as_str() == Some("complete") {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(AutomationError::Timeout(format!(
                    "{url} did not finish loading within {NAVIGATION_TIMEOUT:?}"
                )));
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    async fn current_url(&self) -> Result<String, AutomationError> {
        Ok(self
            .evaluate("location.href")
            .await?
            .as_str()
            .unwrap_or_default()
            .to_string())
    }
}

const RESOLVER_JS: &str = r#"(() => {
  const steps = __STEPS__;
  const op = __OP__;
  const arg = __ARG__;
  const isVisible = (el) => {
    if (!el.isConnected) return false;
    const style = getComputedStyle(el);
    if (style.visibility === 'hidden' || style.display === 'none') return false;
    const r = el.getBoundingClientRect();
    return r.width > 0 || r.height > 0;
  };
  let current = [document];
  for (const step of steps) {
    switch (step.kind) {
      case 'css': {
        const seen = new Set();
        const next = [];
        for (const scope of current) {
          for (const el of scope.querySelectorAll(step.value)) {
            if (!seen.has(el)) { seen.add(el); next.push(el); }
          }
        }
        next.sort((a, b) => a === b ? 0 :
          (a.compareDocumentPosition(b) & Node.DOCUMENT_POSITION_FOLLOWING ? -1 : 1));
        current = next;
        break;
      }
      case 'nth': {
        const i = step.value < 0 ? current.length + step.value : step.value;
        current = (i >= 0 && i < current.length) ? [current[i]] : [];
        break;
      }
      case 'visible':
        current = current.filter(el => isVisible(el) === step.value);
        break;
      case 'hasText':
        current = current.filter(el => (el.textContent || '').includes(step.value));
        break;
      case 'exactText': {
        const want = step.value.trim().toLowerCase();
        current = current.filter(el => (el.textContent || '').trim().toLowerCase() === want);
        break;
      }
    }
  }
  current = current.filter(el => el !== document);
  if (op === 'count') return { ok: true, value: current.length };
  if (op === 'visible') return { ok: true, value: current.length > 0 && isVisible(current[0]) };
  const el = current[0];
  if (!el) return { ok: false, error: 'not_found' };
  switch (op) {
    case 'enabled': return { ok: true, value: !el.disabled };
    case 'checked': return { ok: true, value: !!el.checked };
    case 'text': return { ok: true, value: el.textContent };
    case 'innerText': return { ok: true, value: el.innerText || '' };
    case 'value': return { ok: true, value: el.value ?? '' };
    case 'fill': {
      if (!(el instanceof HTMLInputElement || el instanceof HTMLTextAreaElement)) {
        return { ok: false, error: 'not_input' };
      }
      el.focus();
      const proto = el instanceof HTMLTextAreaElement
        ? HTMLTextAreaElement.prototype : HTMLInputElement.prototype;
      Object.getOwnPropertyDescriptor(proto, 'value').set.call(el, arg);
      el.dispatchEvent(new Event('input', { bubbles: true }));
      el.dispatchEvent(new Event('change', { bubbles: true }));
      return { ok: true, value: null };
    }
    case 'dispatchClick': el.click(); return { ok: true, value: null };
    case 'focus': el.focus(); return { ok: true, value: null };
    case 'box': {
      el.scrollIntoView({ block: 'center', inline: 'center' });
      const r = el.getBoundingClientRect();
      return { ok: true, value: {
        x: r.left + r.width / 2, y: r.top + r.height / 2,
        visible: isVisible(el), enabled: !el.disabled } };
    }
  }
  return { ok: false, error: 'unknown op ' + op };
})()"#;
