//! In-memory document for rehearsals and tests.
//!
//! Holds a table of selectors and layout boxes per page, records every call
//! it receives, and can inject latency, delayed elements, and failures.
//! Latency is applied with `tokio::time::sleep`, so a paused tokio clock
//! makes runs against it fully deterministic.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::{
    Document, DocumentError, DocumentResult, ElementBox, Frame, Rect, SurfaceId, Viewport,
};

/// A call observed by the synthetic document.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentCall {
    Click(String),
    Hover(String),
    Fill(String, String),
    ScrollBy(i64, i64),
    Navigate(String),
    CreateSurface(SurfaceId),
    Draw(SurfaceId),
    ClearSurface(SurfaceId),
    RemoveSurface(SurfaceId),
    Close,
}

#[derive(Debug, Default)]
struct SurfaceState {
    frames_drawn: u64,
    last_frame: Option<Frame>,
}

#[derive(Debug)]
struct State {
    url: String,
    elements: HashMap<String, ElementBox>,
    pages: HashMap<String, HashMap<String, ElementBox>>,
    reveal_at: HashMap<String, Instant>,
    failing: HashSet<String>,
    failing_navigation: HashSet<String>,
    surfaces: HashMap<SurfaceId, SurfaceState>,
    next_surface: u64,
    scroll: (i64, i64),
    calls: Vec<DocumentCall>,
    closed: bool,
}

/// In-memory [`Document`] implementation.
#[derive(Debug)]
pub struct SyntheticDocument {
    viewport: Viewport,
    action_latency: Duration,
    navigation_latency: Duration,
    state: Mutex<State>,
}

impl Default for SyntheticDocument {
    fn default() -> Self {
        Self::new(1280.0, 720.0)
    }
}

impl SyntheticDocument {
    /// Create an empty document with the given viewport size.
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            viewport: Viewport { width, height },
            action_latency: Duration::ZERO,
            navigation_latency: Duration::ZERO,
            state: Mutex::new(State {
                url: "about:blank".to_string(),
                elements: HashMap::new(),
                pages: HashMap::new(),
                reveal_at: HashMap::new(),
                failing: HashSet::new(),
                failing_navigation: HashSet::new(),
                surfaces: HashMap::new(),
                next_surface: 1,
                scroll: (0, 0),
                calls: Vec::new(),
                closed: false,
            }),
        }
    }

    /// Time each click/hover/fill/scroll takes.
    pub fn with_action_latency(mut self, latency: Duration) -> Self {
        self.action_latency = latency;
        self
    }

    /// Time each navigation takes.
    pub fn with_navigation_latency(mut self, latency: Duration) -> Self {
        self.navigation_latency = latency;
        self
    }

    /// Add a visible element to the current page.
    pub fn with_element(self, selector: &str, rect: Rect) -> Self {
        self.insert_element(selector, ElementBox::visible(rect));
        self
    }

    /// Elements that replace the page contents when `url` is loaded.
    pub fn with_page(self, url: &str, elements: &[(&str, Rect)]) -> Self {
        let table = elements
            .iter()
            .map(|(sel, rect)| (sel.to_string(), ElementBox::visible(*rect)))
            .collect();
        self.lock().pages.insert(url.to_string(), table);
        self
    }

    pub fn insert_element(&self, selector: &str, element: ElementBox) {
        self.lock().elements.insert(selector.to_string(), element);
    }

    pub fn remove_element(&self, selector: &str) {
        self.lock().elements.remove(selector);
    }

    /// Keep `selector` hidden until `delay` has elapsed from now.
    pub fn reveal_after(&self, selector: &str, delay: Duration) {
        self.lock()
            .reveal_at
            .insert(selector.to_string(), Instant::now() + delay);
    }

    /// Make interactions with `selector` fail with a protocol error.
    pub fn fail_interactions(&self, selector: &str) {
        self.lock().failing.insert(selector.to_string());
    }

    /// Make loading `url` fail with a protocol error.
    pub fn fail_navigation(&self, url: &str) {
        self.lock().failing_navigation.insert(url.to_string());
    }

    /// Simulate the host session terminating.
    pub fn terminate(&self) {
        self.lock().closed = true;
    }

    /// All calls received so far.
    pub fn calls(&self) -> Vec<DocumentCall> {
        self.lock().calls.clone()
    }

    pub fn url(&self) -> String {
        self.lock().url.clone()
    }

    pub fn scroll_position(&self) -> (i64, i64) {
        self.lock().scroll
    }

    /// Surfaces currently attached.
    pub fn live_surfaces(&self) -> Vec<SurfaceId> {
        let mut ids: Vec<_> = self.lock().surfaces.keys().copied().collect();
        ids.sort_by_key(|id| id.0);
        ids
    }

    /// Number of frames drawn on a surface, if it is attached.
    pub fn frames_drawn(&self, surface: SurfaceId) -> Option<u64> {
        self.lock().surfaces.get(&surface).map(|s| s.frames_drawn)
    }

    /// The most recent frame drawn on a surface (`None` after a clear).
    pub fn last_frame(&self, surface: SurfaceId) -> Option<Frame> {
        self.lock()
            .surfaces
            .get(&surface)
            .and_then(|s| s.last_frame.clone())
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn open_state(&self) -> DocumentResult<MutexGuard<'_, State>> {
        let state = self.lock();
        if state.closed {
            return Err(DocumentError::SessionClosed);
        }
        Ok(state)
    }

    async fn pause(&self, latency: Duration) {
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }

    /// Shared path for element interactions.
    async fn interact(&self, selector: &str, call: DocumentCall) -> DocumentResult<()> {
        self.pause(self.action_latency).await;
        let mut state = self.open_state()?;
        if !state.elements.contains_key(selector) {
            return Err(DocumentError::not_found(selector));
        }
        if state.failing.contains(selector) {
            return Err(DocumentError::protocol(format!(
                "element '{selector}' is not interactable"
            )));
        }
        state.calls.push(call);
        Ok(())
    }
}

#[async_trait]
impl Document for SyntheticDocument {
    async fn element_box(&self, selector: &str) -> DocumentResult<Option<ElementBox>> {
        let state = self.open_state()?;
        let Some(element) = state.elements.get(selector).copied() else {
            return Ok(None);
        };
        let revealed = state
            .reveal_at
            .get(selector)
            .map_or(true, |at| Instant::now() >= *at);
        Ok(Some(ElementBox {
            visible: element.visible && revealed,
            ..element
        }))
    }

    async fn click(&self, selector: &str) -> DocumentResult<()> {
        self.interact(selector, DocumentCall::Click(selector.to_string()))
            .await
    }

    async fn hover(&self, selector: &str) -> DocumentResult<()> {
        self.interact(selector, DocumentCall::Hover(selector.to_string()))
            .await
    }

    async fn fill(&self, selector: &str, text: &str) -> DocumentResult<()> {
        self.interact(
            selector,
            DocumentCall::Fill(selector.to_string(), text.to_string()),
        )
        .await
    }

    async fn scroll_by(&self, dx: i64, dy: i64) -> DocumentResult<()> {
        self.pause(self.action_latency).await;
        let mut state = self.open_state()?;
        state.scroll = (state.scroll.0 + dx, (state.scroll.1 + dy).max(0));
        state.calls.push(DocumentCall::ScrollBy(dx, dy));
        Ok(())
    }

    async fn navigate(&self, url: &str) -> DocumentResult<()> {
        self.pause(self.navigation_latency).await;
        let mut state = self.open_state()?;
        state.calls.push(DocumentCall::Navigate(url.to_string()));
        if state.failing_navigation.contains(url) {
            return Err(DocumentError::protocol(format!("failed to load {url}")));
        }
        state.url = url.to_string();
        state.elements = state.pages.get(url).cloned().unwrap_or_default();
        state.reveal_at.clear();
        state.surfaces.clear();
        state.scroll = (0, 0);
        Ok(())
    }

    async fn viewport(&self) -> DocumentResult<Viewport> {
        self.open_state()?;
        Ok(self.viewport)
    }

    async fn create_surface(&self) -> DocumentResult<SurfaceId> {
        let mut state = self.open_state()?;
        let id = SurfaceId(state.next_surface);
        state.next_surface += 1;
        state.surfaces.insert(id, SurfaceState::default());
        state.calls.push(DocumentCall::CreateSurface(id));
        Ok(id)
    }

    async fn draw(&self, surface: SurfaceId, frame: &Frame) -> DocumentResult<()> {
        let mut state = self.open_state()?;
        let entry = state
            .surfaces
            .get_mut(&surface)
            .ok_or(DocumentError::UnknownSurface(surface))?;
        entry.frames_drawn += 1;
        entry.last_frame = Some(frame.clone());
        state.calls.push(DocumentCall::Draw(surface));
        Ok(())
    }

    async fn clear_surface(&self, surface: SurfaceId) -> DocumentResult<()> {
        let mut state = self.open_state()?;
        let entry = state
            .surfaces
            .get_mut(&surface)
            .ok_or(DocumentError::UnknownSurface(surface))?;
        entry.last_frame = None;
        state.calls.push(DocumentCall::ClearSurface(surface));
        Ok(())
    }

    async fn remove_surface(&self, surface: SurfaceId) -> DocumentResult<()> {
        let mut state = self.open_state()?;
        state
            .surfaces
            .remove(&surface)
            .ok_or(DocumentError::UnknownSurface(surface))?;
        state.calls.push(DocumentCall::RemoveSurface(surface));
        Ok(())
    }

    async fn close(&self) -> DocumentResult<()> {
        let mut state = self.lock();
        if !state.closed {
            state.closed = true;
            state.calls.push(DocumentCall::Close);
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn button() -> Rect {
        Rect::new(100.0, 100.0, 80.0, 30.0)
    }

    #[tokio::test]
    async fn test_interactions_are_recorded() {
        let doc = SyntheticDocument::default().with_element("#go", button());
        doc.click("#go").await.unwrap();
        doc.fill("#go", "hello").await.unwrap();
        doc.scroll_by(0, 300).await.unwrap();

        assert_eq!(
            doc.calls(),
            vec![
                DocumentCall::Click("#go".into()),
                DocumentCall::Fill("#go".into(), "hello".into()),
                DocumentCall::ScrollBy(0, 300),
            ]
        );
        assert_eq!(doc.scroll_position(), (0, 300));
    }

    #[tokio::test]
    async fn test_missing_and_failing_targets() {
        let doc = SyntheticDocument::default().with_element("#go", button());
        assert_eq!(doc.element_box("#nope").await.unwrap(), None);
        assert!(matches!(
            doc.click("#nope").await,
            Err(DocumentError::NotFound { .. })
        ));

        doc.fail_interactions("#go");
        assert!(matches!(
            doc.click("#go").await,
            Err(DocumentError::Protocol { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reveal_after_delays_visibility() {
        let doc = SyntheticDocument::default().with_element("#late", button());
        doc.reveal_after("#late", Duration::from_millis(300));
        assert!(!doc.element_box("#late").await.unwrap().unwrap().visible);
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(doc.element_box("#late").await.unwrap().unwrap().visible);
    }

    #[tokio::test]
    async fn test_navigation_swaps_page_and_drops_surfaces() {
        let doc = SyntheticDocument::default()
            .with_element("#home", button())
            .with_page("https://example.com/next", &[("#next", button())]);
        let surface = doc.create_surface().await.unwrap();

        doc.navigate("https://example.com/next").await.unwrap();

        assert_eq!(doc.url(), "https://example.com/next");
        assert!(doc.element_box("#home").await.unwrap().is_none());
        assert!(doc.element_box("#next").await.unwrap().is_some());
        assert!(doc.live_surfaces().is_empty());
        assert!(matches!(
            doc.draw(surface, &Frame::new()).await,
            Err(DocumentError::UnknownSurface(_))
        ));
    }

    #[tokio::test]
    async fn test_terminated_session_rejects_calls() {
        let doc = SyntheticDocument::default().with_element("#go", button());
        doc.terminate();
        assert_eq!(doc.click("#go").await, Err(DocumentError::SessionClosed));
        assert_eq!(doc.viewport().await, Err(DocumentError::SessionClosed));
    }

    #[tokio::test]
    async fn test_surface_lifecycle() {
        let doc = SyntheticDocument::default();
        let surface = doc.create_surface().await.unwrap();
        let mut frame = Frame::new();
        frame.push(crate::Shape::Shade {
            area: Rect::new(0.0, 0.0, 10.0, 10.0),
            hole: None,
            color: crate::Rgba::BLACK,
        });
        doc.draw(surface, &frame).await.unwrap();
        assert_eq!(doc.frames_drawn(surface), Some(1));
        assert_eq!(doc.last_frame(surface), Some(frame));

        doc.clear_surface(surface).await.unwrap();
        assert_eq!(doc.last_frame(surface), None);

        doc.remove_surface(surface).await.unwrap();
        assert!(doc.live_surfaces().is_empty());
    }
}
