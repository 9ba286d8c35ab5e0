//! DemoReel Live Document
//!
//! Contract between the pipeline and the page being recorded. The scheduler,
//! action executor, and overlay renderer only talk to a [`Document`]; the
//! concrete backend decides how that maps onto a browser.
//!
//! Backends:
//! - **WebDriver:** drives a real browser through the W3C WebDriver protocol
//! - **Synthetic:** in-memory element table used for rehearsals and tests

pub mod frame;
pub mod synthetic;
pub mod webdriver;

use async_trait::async_trait;
use demoreel_common::error::DemoreelError;
use serde::{Deserialize, Serialize};

pub use frame::*;
pub use synthetic::SyntheticDocument;
pub use webdriver::WebDriverDocument;

/// Errors reported by document backends.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DocumentError {
    #[error("No element matches '{selector}'")]
    NotFound { selector: String },

    #[error("Document session is closed")]
    SessionClosed,

    #[error("Timed out during {operation}")]
    Timeout { operation: String },

    #[error("Unknown drawing surface {0}")]
    UnknownSurface(SurfaceId),

    #[error("Protocol error: {message}")]
    Protocol { message: String },

    #[error("HTTP error: {message}")]
    Http { message: String },
}

/// Result type alias using DocumentError.
pub type DocumentResult<T> = Result<T, DocumentError>;

impl DocumentError {
    pub fn not_found(selector: impl Into<String>) -> Self {
        Self::NotFound {
            selector: selector.into(),
        }
    }

    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol {
            message: msg.into(),
        }
    }

    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::Timeout {
            operation: operation.into(),
        }
    }
}

impl From<DocumentError> for DemoreelError {
    fn from(err: DocumentError) -> Self {
        DemoreelError::document(err.to_string())
    }
}

/// Layout box of a matched element, in viewport CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElementBox {
    pub rect: Rect,
    pub visible: bool,
}

impl ElementBox {
    pub fn visible(rect: Rect) -> Self {
        Self {
            rect,
            visible: true,
        }
    }

    pub fn hidden(rect: Rect) -> Self {
        Self {
            rect,
            visible: false,
        }
    }
}

/// Viewport size in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn rect(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }
}

/// Handle to an overlay drawing surface attached to a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SurfaceId(pub u64);

impl std::fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "surface-{}", self.0)
    }
}

/// A live page that scripted actions run against.
///
/// Every method is a suspension point; callers run them one at a time.
/// Navigation invalidates all surfaces created before it.
#[async_trait]
pub trait Document: Send + Sync {
    /// Layout box of the first element matching `selector`, if any.
    async fn element_box(&self, selector: &str) -> DocumentResult<Option<ElementBox>>;

    /// Click the first element matching `selector`.
    async fn click(&self, selector: &str) -> DocumentResult<()>;

    /// Move the pointer over the first element matching `selector`.
    async fn hover(&self, selector: &str) -> DocumentResult<()>;

    /// Replace the value of an input element.
    async fn fill(&self, selector: &str, text: &str) -> DocumentResult<()>;

    /// Scroll the page by a relative offset.
    async fn scroll_by(&self, dx: i64, dy: i64) -> DocumentResult<()>;

    /// Load a new page.
    async fn navigate(&self, url: &str) -> DocumentResult<()>;

    /// Current viewport size.
    async fn viewport(&self) -> DocumentResult<Viewport>;

    /// Attach a new, empty drawing surface above the page.
    async fn create_surface(&self) -> DocumentResult<SurfaceId>;

    /// Replace the surface's contents with `frame`.
    async fn draw(&self, surface: SurfaceId, frame: &Frame) -> DocumentResult<()>;

    /// Blank the surface.
    async fn clear_surface(&self, surface: SurfaceId) -> DocumentResult<()>;

    /// Detach the surface from the page.
    async fn remove_surface(&self, surface: SurfaceId) -> DocumentResult<()>;

    /// End the session. Further calls fail with `SessionClosed`.
    async fn close(&self) -> DocumentResult<()>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}
