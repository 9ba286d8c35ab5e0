//! W3C WebDriver backend.
//!
//! Talks to any WebDriver server (chromedriver, geckodriver, Selenium) over
//! HTTP. Overlay surfaces are canvases injected by a small painter script
//! that draws [`Frame`] primitives; it holds no effect logic.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use demoreel_common::config::WebDriverConfig;
use reqwest::{Client, Method};
use serde_json::{json, Value};

use crate::{
    Document, DocumentError, DocumentResult, ElementBox, Frame, Rect, SurfaceId, Viewport,
};

/// Key under which W3C WebDriver returns element references.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";
const PAINTER_JS: &str = include_str!("../assets/overlay-painter.js");
const HOVER_MOVE_MS: u64 = 150;

/// A browser session driven through WebDriver.
pub struct WebDriverDocument {
    client: Client,
    base_url: String,
    session_id: String,
    next_surface: AtomicU64,
    closed: AtomicBool,
}

impl WebDriverDocument {
    /// Start a new browser session.
    ///
    /// Failure here is fatal for a recording run: there is no document to
    /// drive.
    pub async fn connect(config: &WebDriverConfig) -> DocumentResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| DocumentError::Http {
                message: e.to_string(),
            })?;
        let base_url = config.url.trim_end_matches('/').to_string();

        let response = send(
            &client,
            Method::POST,
            &format!("{base_url}/session"),
            Some(new_session_body(config)),
        )
        .await?;
        let session_id = response
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| DocumentError::protocol("new session response has no sessionId"))?
            .to_string();

        tracing::info!(
            url = %base_url,
            browser = %config.browser,
            session = %session_id,
            "WebDriver session started"
        );

        let doc = Self {
            client,
            base_url,
            session_id,
            next_surface: AtomicU64::new(1),
            closed: AtomicBool::new(false),
        };
        if let Err(e) = doc
            .command(
                Method::POST,
                "window/rect",
                Some(json!({ "width": config.width, "height": config.height })),
            )
            .await
        {
            tracing::warn!(error = %e, "Failed to size browser window");
        }
        Ok(doc)
    }

    /// Check whether a WebDriver server answers at `url`.
    pub async fn is_available(url: &str) -> bool {
        let status_url = format!("{}/status", url.trim_end_matches('/'));
        match Client::new()
            .get(status_url)
            .timeout(Duration::from_secs(3))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    async fn command(&self, method: Method, path: &str, body: Option<Value>) -> DocumentResult<Value> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(DocumentError::SessionClosed);
        }
        let url = format!("{}/session/{}/{}", self.base_url, self.session_id, path);
        send(&self.client, method, &url, body).await
    }

    async fn find(&self, selector: &str) -> DocumentResult<Option<String>> {
        let result = self
            .command(
                Method::POST,
                "element",
                Some(json!({ "using": "css selector", "value": selector })),
            )
            .await;
        match result {
            Ok(value) => value
                .get(ELEMENT_KEY)
                .and_then(Value::as_str)
                .map(|id| Some(id.to_string()))
                .ok_or_else(|| DocumentError::protocol("element reference missing")),
            Err(DocumentError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn require(&self, selector: &str) -> DocumentResult<String> {
        self.find(selector)
            .await?
            .ok_or_else(|| DocumentError::not_found(selector))
    }

    async fn execute(&self, script: &str, args: Value) -> DocumentResult<Value> {
        self.command(
            Method::POST,
            "execute/sync",
            Some(json!({ "script": script, "args": args })),
        )
        .await
    }

    async fn paint(&self, op: &str, surface: SurfaceId, frame: Option<&Frame>) -> DocumentResult<()> {
        let frame = match frame {
            Some(frame) => serde_json::to_value(frame)
                .map_err(|e| DocumentError::protocol(format!("frame encoding: {e}")))?,
            None => Value::Null,
        };
        let painted = self
            .execute(PAINTER_JS, json!([op, surface.0, frame]))
            .await?;
        if painted.as_bool() == Some(false) {
            return Err(DocumentError::UnknownSurface(surface));
        }
        Ok(())
    }
}

#[async_trait]
impl Document for WebDriverDocument {
    async fn element_box(&self, selector: &str) -> DocumentResult<Option<ElementBox>> {
        let Some(element) = self.find(selector).await? else {
            return Ok(None);
        };
        let rect = self
            .command(Method::GET, &format!("element/{element}/rect"), None)
            .await?;
        let displayed = self
            .command(Method::GET, &format!("element/{element}/displayed"), None)
            .await?
            .as_bool()
            .unwrap_or(false);
        let rect = parse_rect(&rect)?;

        // Element rects are document-relative; overlays are drawn in viewport space.
        let scroll = self
            .execute("return [window.scrollX, window.scrollY];", json!([]))
            .await?;
        let (sx, sy) = (
            scroll.get(0).and_then(Value::as_f64).unwrap_or(0.0),
            scroll.get(1).and_then(Value::as_f64).unwrap_or(0.0),
        );
        Ok(Some(ElementBox {
            rect: Rect::new(rect.x - sx, rect.y - sy, rect.width, rect.height),
            visible: displayed && !rect.is_empty(),
        }))
    }

    async fn click(&self, selector: &str) -> DocumentResult<()> {
        let element = self.require(selector).await?;
        self.command(Method::POST, &format!("element/{element}/click"), Some(json!({})))
            .await?;
        Ok(())
    }

    async fn hover(&self, selector: &str) -> DocumentResult<()> {
        let element = self.require(selector).await?;
        let body = json!({
            "actions": [{
                "type": "pointer",
                "id": "demoreel-mouse",
                "parameters": { "pointerType": "mouse" },
                "actions": [{
                    "type": "pointerMove",
                    "duration": HOVER_MOVE_MS,
                    "origin": { ELEMENT_KEY: element },
                    "x": 0,
                    "y": 0
                }]
            }]
        });
        self.command(Method::POST, "actions", Some(body)).await?;
        Ok(())
    }

    async fn fill(&self, selector: &str, text: &str) -> DocumentResult<()> {
        let element = self.require(selector).await?;
        self.command(Method::POST, &format!("element/{element}/clear"), Some(json!({})))
            .await?;
        self.command(
            Method::POST,
            &format!("element/{element}/value"),
            Some(json!({ "text": text })),
        )
        .await?;
        Ok(())
    }

    async fn scroll_by(&self, dx: i64, dy: i64) -> DocumentResult<()> {
        self.execute(
            "window.scrollBy({ left: arguments[0], top: arguments[1], behavior: 'smooth' });",
            json!([dx, dy]),
        )
        .await?;
        Ok(())
    }

    async fn navigate(&self, url: &str) -> DocumentResult<()> {
        self.command(Method::POST, "url", Some(json!({ "url": url })))
            .await?;
        Ok(())
    }

    async fn viewport(&self) -> DocumentResult<Viewport> {
        let size = self
            .execute("return [window.innerWidth, window.innerHeight];", json!([]))
            .await?;
        match (
            size.get(0).and_then(Value::as_f64),
            size.get(1).and_then(Value::as_f64),
        ) {
            (Some(width), Some(height)) => Ok(Viewport { width, height }),
            _ => Err(DocumentError::protocol(format!("unexpected viewport value {size}"))),
        }
    }

    async fn create_surface(&self) -> DocumentResult<SurfaceId> {
        let id = SurfaceId(self.next_surface.fetch_add(1, Ordering::SeqCst));
        self.paint("create", id, None).await?;
        Ok(id)
    }

    async fn draw(&self, surface: SurfaceId, frame: &Frame) -> DocumentResult<()> {
        self.paint("draw", surface, Some(frame)).await
    }

    async fn clear_surface(&self, surface: SurfaceId) -> DocumentResult<()> {
        self.paint("clear", surface, None).await
    }

    async fn remove_surface(&self, surface: SurfaceId) -> DocumentResult<()> {
        self.paint("remove", surface, None).await
    }

    async fn close(&self) -> DocumentResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let url = format!("{}/session/{}", self.base_url, self.session_id);
        send(&self.client, Method::DELETE, &url, None).await?;
        tracing::info!(session = %self.session_id, "WebDriver session closed");
        Ok(())
    }

    fn name(&self) -> &str {
        "webdriver"
    }
}

fn new_session_body(config: &WebDriverConfig) -> Value {
    let mut args = vec![format!("--window-size={},{}", config.width, config.height)];
    args.extend(config.args.iter().cloned());

    let mut always_match = json!({ "browserName": config.browser });
    match config.browser.as_str() {
        "chrome" | "chromium" => {
            always_match["goog:chromeOptions"] = json!({ "args": args });
        }
        "firefox" => {
            always_match["moz:firefoxOptions"] = json!({ "args": config.args });
        }
        _ => {}
    }
    json!({ "capabilities": { "alwaysMatch": always_match } })
}

/// Send one WebDriver request and unwrap its `value` field.
async fn send(client: &Client, method: Method, url: &str, body: Option<Value>) -> DocumentResult<Value> {
    tracing::trace!(%method, %url, "WebDriver request");
    let mut request = client.request(method, url);
    if let Some(body) = body {
        request = request.json(&body);
    }
    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            DocumentError::timeout(format!("request to {url}"))
        } else {
            DocumentError::Http {
                message: e.to_string(),
            }
        }
    })?;
    let status = response.status();
    let payload: Value = response.json().await.map_err(|e| DocumentError::Http {
        message: format!("invalid response body ({status}): {e}"),
    })?;
    let value = payload.get("value").cloned().unwrap_or(Value::Null);

    if status.is_success() {
        return Ok(value);
    }
    Err(map_error(&value))
}

/// Translate a W3C error object into a [`DocumentError`].
fn map_error(value: &Value) -> DocumentError {
    let code = value.get("error").and_then(Value::as_str).unwrap_or("");
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();
    match code {
        "no such element" | "stale element reference" => DocumentError::NotFound { selector: message },
        "invalid session id" | "no such window" | "session not created" => {
            DocumentError::SessionClosed
        }
        "timeout" | "script timeout" => DocumentError::Timeout { operation: message },
        "" => DocumentError::protocol(format!("unrecognized error response: {value}")),
        other => DocumentError::protocol(format!("{other}: {message}")),
    }
}

fn parse_rect(value: &Value) -> DocumentResult<Rect> {
    let field = |name: &str| {
        value
            .get(name)
            .and_then(Value::as_f64)
            .ok_or_else(|| DocumentError::protocol(format!("element rect missing '{name}'")))
    };
    Ok(Rect::new(field("x")?, field("y")?, field("width")?, field("height")?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_mapping() {
        assert!(matches!(
            map_error(&json!({"error": "no such element", "message": "x"})),
            DocumentError::NotFound { .. }
        ));
        assert_eq!(
            map_error(&json!({"error": "invalid session id"})),
            DocumentError::SessionClosed
        );
        assert!(matches!(
            map_error(&json!({"error": "script timeout"})),
            DocumentError::Timeout { .. }
        ));
        assert!(matches!(
            map_error(&json!({"error": "element click intercepted", "message": "covered"})),
            DocumentError::Protocol { .. }
        ));
    }

    #[test]
    fn test_parse_rect() {
        let rect = parse_rect(&json!({"x": 1.5, "y": 2, "width": 30, "height": 40})).unwrap();
        assert_eq!(rect, Rect::new(1.5, 2.0, 30.0, 40.0));
        assert!(parse_rect(&json!({"x": 1})).is_err());
    }

    #[test]
    fn test_session_body_carries_window_size() {
        let config = WebDriverConfig {
            args: vec!["--headless=new".to_string()],
            ..WebDriverConfig::default()
        };
        let body = new_session_body(&config);
        let args = &body["capabilities"]["alwaysMatch"]["goog:chromeOptions"]["args"];
        assert_eq!(args[0], "--window-size=1280,720");
        assert_eq!(args[1], "--headless=new");
    }

    #[test]
    fn test_painter_script_returns_value() {
        assert!(PAINTER_JS.contains("return (function (op, surfaceId, frame)"));
    }
}
