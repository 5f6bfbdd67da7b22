//! W3C WebDriver session over HTTP
//!
//! Talks to chromedriver (or any W3C-compliant endpoint) with plain JSON
//! requests. One session owns one browser window; callers use it sequentially.

use super::{PageDriver, PageSnapshotter};
use crate::error::VerifierError;
use crate::models::PageSnapshot;
use crate::Result;
use async_trait::async_trait;
use base64::Engine;
use reqwest::{Client, Method};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

/// W3C web element reference key
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Upper bound on snapshot content handed to the model
pub const MAX_SNAPSHOT_CHARS: usize = 30_000;

/// Outline of visible text and interactive elements, one per line
const SNAPSHOT_SCRIPT: &str = r#"
const max = arguments[0];
const interactive = 'a,button,input,select,textarea,[role=button],[role=link],[role=checkbox],[onclick]';
const textTags = new Set(['H1','H2','H3','H4','H5','H6','P','LI','LABEL','TD','TH','SPAN','DIV','STRONG','EM','SMALL','CAPTION','LEGEND']);
const attrs = ['id','name','type','role','aria-label','placeholder','href','title'];
function visible(el) {
  const style = window.getComputedStyle(el);
  const rect = el.getBoundingClientRect();
  return style.visibility !== 'hidden' && style.display !== 'none' && rect.width > 0 && rect.height > 0;
}
function clean(text) {
  return (text || '').replace(/\s+/g, ' ').trim();
}
const lines = [];
for (const el of document.body.querySelectorAll('*')) {
  if (!visible(el)) continue;
  const tag = el.tagName.toLowerCase();
  if (el.matches(interactive)) {
    const parts = attrs
      .filter(a => el.getAttribute(a))
      .map(a => `${a}="${clean(el.getAttribute(a))}"`);
    if ('value' in el && el.value && tag !== 'button') parts.push(`value="${clean(String(el.value))}"`);
    if (el.disabled) parts.push('disabled');
    const text = clean(el.innerText).slice(0, 200);
    lines.push(`<${tag}${parts.length ? ' ' + parts.join(' ') : ''}>${text}</${tag}>`);
  } else if (textTags.has(el.tagName)) {
    const own = clean(Array.from(el.childNodes)
      .filter(n => n.nodeType === Node.TEXT_NODE)
      .map(n => n.textContent)
      .join(' '));
    if (own) lines.push(`<${tag}>${own}</${tag}>`);
  }
}
return lines.join('\n').slice(0, max);
"#;

//
// ================= Viewport =================
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

impl FromStr for Viewport {
    type Err = VerifierError;

    /// Parses `"<width>,<height>"`, e.g. `"1280,720"`
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || VerifierError::Config(format!("invalid viewport '{}', expected WIDTH,HEIGHT", s));

        let (width, height) = s.split_once(',').ok_or_else(invalid)?;
        let width: u32 = width.trim().parse().map_err(|_| invalid())?;
        let height: u32 = height.trim().parse().map_err(|_| invalid())?;

        if width == 0 || height == 0 {
            return Err(invalid());
        }

        Ok(Self { width, height })
    }
}

impl fmt::Display for Viewport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.width, self.height)
    }
}

//
// ================= Session =================
//

pub struct WebDriverSession {
    client: Client,
    session_url: String,
}

impl WebDriverSession {
    /// Open a new browser session on the given WebDriver endpoint
    pub async fn start(
        webdriver_url: &str,
        headless: bool,
        viewport: Viewport,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        let base = webdriver_url.trim_end_matches('/');

        let mut args = vec![format!("--window-size={},{}", viewport.width, viewport.height)];
        if headless {
            args.push("--headless=new".to_string());
        }

        let body = json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": { "args": args }
                }
            }
        });

        let value = send(&client, Method::POST, &format!("{}/session", base), Some(body)).await?;
        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| VerifierError::Browser("WebDriver returned no sessionId".to_string()))?;

        info!(session_id, headless, %viewport, "WebDriver session started");

        let session = Self {
            client,
            session_url: format!("{}/session/{}", base, session_id),
        };

        session
            .command(
                Method::POST,
                "/window/rect",
                Some(json!({ "width": viewport.width, "height": viewport.height })),
            )
            .await?;

        Ok(session)
    }

    async fn command(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
        let url = format!("{}{}", self.session_url, path);
        send(&self.client, method, &url, body).await
    }

    pub async fn current_url(&self) -> Result<String> {
        let value = self.command(Method::GET, "/url", None).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    pub async fn title(&self) -> Result<String> {
        let value = self.command(Method::GET, "/title", None).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    pub async fn execute_script(&self, script: &str, args: Vec<Value>) -> Result<Value> {
        self.command(
            Method::POST,
            "/execute/sync",
            Some(json!({ "script": script, "args": args })),
        )
        .await
    }

    async fn find_element(&self, selector: &str) -> Result<String> {
        let value = self
            .command(
                Method::POST,
                "/element",
                Some(json!({ "using": "css selector", "value": selector })),
            )
            .await?;
        element_id(&value)
    }

    async fn active_element(&self) -> Result<String> {
        let value = self.command(Method::GET, "/element/active", None).await?;
        element_id(&value)
    }

    /// End the session and close the browser window
    pub async fn close(&self) -> Result<()> {
        self.command(Method::DELETE, "", None).await?;
        info!("WebDriver session closed");
        Ok(())
    }
}

#[async_trait]
impl PageSnapshotter for WebDriverSession {
    async fn snapshot(&self) -> Result<PageSnapshot> {
        let url = self.current_url().await?;
        let title = self.title().await?;
        let content = self
            .execute_script(SNAPSHOT_SCRIPT, vec![json!(MAX_SNAPSHOT_CHARS)])
            .await?
            .as_str()
            .unwrap_or_default()
            .to_string();

        debug!(%url, content_len = content.len(), "Page snapshot taken");

        Ok(PageSnapshot { url, title, content })
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        let value = self.command(Method::GET, "/screenshot", None).await?;
        let encoded = value
            .as_str()
            .ok_or_else(|| VerifierError::Browser("screenshot payload is not a string".to_string()))?;

        base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| VerifierError::Browser(format!("invalid screenshot encoding: {}", e)))
    }
}

#[async_trait]
impl PageDriver for WebDriverSession {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.command(Method::POST, "/url", Some(json!({ "url": url }))).await?;
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<()> {
        let id = self.find_element(selector).await?;
        self.command(Method::POST, &format!("/element/{}/click", id), Some(json!({})))
            .await?;
        Ok(())
    }

    async fn fill(&self, selector: &str, text: &str) -> Result<()> {
        let id = self.find_element(selector).await?;
        self.command(Method::POST, &format!("/element/{}/clear", id), Some(json!({})))
            .await?;
        self.command(
            Method::POST,
            &format!("/element/{}/value", id),
            Some(json!({ "text": text })),
        )
        .await?;
        Ok(())
    }

    async fn press(&self, key: &str) -> Result<()> {
        let id = self.active_element().await?;
        self.command(
            Method::POST,
            &format!("/element/{}/value", id),
            Some(json!({ "text": key_code(key) })),
        )
        .await?;
        Ok(())
    }
}

/// Send one WebDriver command and unwrap its `value`
async fn send(client: &Client, method: Method, url: &str, body: Option<Value>) -> Result<Value> {
    let mut request = client.request(method, url);
    if let Some(body) = body {
        request = request.json(&body);
    }

    let response = request
        .send()
        .await
        .map_err(|e| VerifierError::Browser(format!("WebDriver request failed: {}", e)))?;

    let status = response.status();
    let payload: Value = response.json().await.map_err(|e| {
        VerifierError::Browser(format!("invalid WebDriver response ({}): {}", status, e))
    })?;

    let value = payload.get("value").cloned().unwrap_or(Value::Null);

    if let Some(err) = webdriver_error(&value) {
        warn!(status = status.as_u16(), error = %err, "WebDriver command failed");
        return Err(err);
    }

    if !status.is_success() {
        return Err(VerifierError::Browser(format!(
            "WebDriver returned {}: {}",
            status, value
        )));
    }

    Ok(value)
}

fn webdriver_error(value: &Value) -> Option<VerifierError> {
    let error = value.get("error")?.as_str()?;
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default();
    Some(VerifierError::Browser(format!("{}: {}", error, message)))
}

fn element_id(value: &Value) -> Result<String> {
    value
        .get(ELEMENT_KEY)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| VerifierError::Browser("response is not an element reference".to_string()))
}

/// Map named keys to WebDriver key codepoints; anything else is typed as-is
fn key_code(key: &str) -> String {
    let code = match key {
        "Enter" | "Return" => '\u{E007}',
        "Tab" => '\u{E004}',
        "Escape" | "Esc" => '\u{E00C}',
        "Backspace" => '\u{E003}',
        "Delete" => '\u{E017}',
        "Space" => '\u{E00D}',
        "ArrowUp" => '\u{E013}',
        "ArrowDown" => '\u{E015}',
        "ArrowLeft" => '\u{E012}',
        "ArrowRight" => '\u{E014}',
        "PageUp" => '\u{E00E}',
        "PageDown" => '\u{E00F}',
        "Home" => '\u{E011}',
        "End" => '\u{E010}',
        _ => return key.to_string(),
    };
    code.to_string()
}
