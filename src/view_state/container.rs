//! Scroll container boundary
//!
//! The controller drives a container it does not own: something with a
//! scroll offset, a content size and a viewport, which accepts "scroll to"
//! commands. A terminal pane, a GUI scroll area, or [`HeadlessContainer`] in
//! tests.

use super::scroll::ScrollBehavior;

/// Current geometry of a measurable container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContainerMetrics {
    /// Current scroll offset.
    pub offset: f64,
    /// Total scrollable content size.
    pub content_size: f64,
    /// Visible size.
    pub viewport_size: f64,
}

impl ContainerMetrics {
    /// Largest offset the container can scroll to.
    pub fn max_offset(&self) -> f64 {
        (self.content_size - self.viewport_size).max(0.0)
    }
}

/// A scrollable surface.
pub trait ScrollContainer {
    /// Current geometry, or `None` while the container cannot be measured
    /// (not laid out yet, zero-sized).
    fn metrics(&self) -> Option<ContainerMetrics>;

    /// Move to `offset`. The container clamps to its own bounds.
    fn set_scroll_offset(&mut self, offset: f64, behavior: ScrollBehavior);

    /// Resize the scroll content. Hosts that size content themselves can
    /// ignore this.
    fn set_content_size(&mut self, _size: f64) {}
}

impl<C: ScrollContainer + ?Sized> ScrollContainer for Box<C> {
    fn metrics(&self) -> Option<ContainerMetrics> {
        (**self).metrics()
    }

    fn set_scroll_offset(&mut self, offset: f64, behavior: ScrollBehavior) {
        (**self).set_scroll_offset(offset, behavior)
    }

    fn set_content_size(&mut self, size: f64) {
        (**self).set_content_size(size)
    }
}

/// In-memory container that applies every command immediately.
///
/// Smooth scrolls land instantly; the requested behavior is kept in
/// [`commands`](Self::commands) for inspection.
#[derive(Debug, Clone, Default)]
pub struct HeadlessContainer {
    viewport_size: Option<f64>,
    content_size: f64,
    offset: f64,
    commands: Vec<(f64, ScrollBehavior)>,
}

impl HeadlessContainer {
    /// Container with a known viewport size.
    pub fn new(viewport_size: f64) -> Self {
        Self {
            viewport_size: Some(viewport_size),
            ..Self::default()
        }
    }

    /// Container that is not measurable until [`resize`](Self::resize).
    pub fn unmeasured() -> Self {
        Self::default()
    }

    /// Set the viewport size (making the container measurable).
    pub fn resize(&mut self, viewport_size: f64) {
        self.viewport_size = Some(viewport_size);
        self.offset = self.clamp(self.offset);
    }

    /// Simulate a user scroll to `offset`.
    pub fn user_scroll(&mut self, offset: f64) {
        self.offset = self.clamp(offset);
    }

    /// Current offset.
    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Every `set_scroll_offset` call received, in order.
    pub fn commands(&self) -> &[(f64, ScrollBehavior)] {
        &self.commands
    }

    fn clamp(&self, offset: f64) -> f64 {
        let max = (self.content_size - self.viewport_size.unwrap_or(0.0)).max(0.0);
        if offset.is_nan() {
            0.0
        } else {
            offset.clamp(0.0, max)
        }
    }
}

impl ScrollContainer for HeadlessContainer {
    fn metrics(&self) -> Option<ContainerMetrics> {
        let viewport_size = self.viewport_size.filter(|v| *v > 0.0)?;
        Some(ContainerMetrics {
            offset: self.offset,
            content_size: self.content_size,
            viewport_size,
        })
    }

    fn set_scroll_offset(&mut self, offset: f64, behavior: ScrollBehavior) {
        self.commands.push((offset, behavior));
        self.offset = self.clamp(offset);
    }

    fn set_content_size(&mut self, size: f64) {
        self.content_size = size.max(0.0);
        self.offset = self.clamp(self.offset);
    }
}
