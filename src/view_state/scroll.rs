//! Scroll intents, options and observed scroll state

use super::types::IndexRange;
use serde::{Deserialize, Serialize};

/// Where a target item should land in the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollAlign {
    /// Item top at viewport top.
    Start,
    /// Item centered in the viewport.
    Center,
    /// Item bottom at viewport bottom.
    End,
    /// Minimal movement: `Start` if the item is above the viewport, `End` if
    /// below, unchanged if already fully visible.
    #[default]
    Auto,
}

/// How the container should transition to a new offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollBehavior {
    /// Container default.
    #[default]
    Auto,
    /// Jump immediately.
    Instant,
    /// Animate.
    Smooth,
}

/// Options for [`ScrollCommand::ToIndex`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScrollOptions {
    /// Target alignment.
    pub align: ScrollAlign,
    /// Transition behavior.
    pub behavior: ScrollBehavior,
}

impl ScrollOptions {
    /// Options with the given alignment and behavior.
    pub fn new(align: ScrollAlign, behavior: ScrollBehavior) -> Self {
        Self { align, behavior }
    }

    /// Instant scroll with the given alignment.
    pub fn instant(align: ScrollAlign) -> Self {
        Self::new(align, ScrollBehavior::Instant)
    }
}

/// A high-level scroll intent.
///
/// Queued as-is while no measurable container is attached and replayed in
/// order once one is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScrollCommand {
    /// Bring an item into view.
    ToIndex {
        /// Target index (clamped to the list).
        index: usize,
        /// Alignment and behavior.
        options: ScrollOptions,
    },
    /// Scroll to the first item.
    ToTop(ScrollBehavior),
    /// Scroll to the last item and snap to the maximum offset.
    ToBottom(ScrollBehavior),
}

/// Result of issuing a scroll command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScrollOutcome {
    /// The container was told to move to this offset.
    Applied(f64),
    /// The target position was already current.
    Unchanged,
    /// No measurable container; the command was queued.
    Deferred,
}

/// Observed scroll position and boundary flags.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollState {
    /// Current scroll offset.
    pub offset: f64,
    /// `offset <= top_threshold`.
    pub is_at_top: bool,
    /// `content_size - offset - viewport_size <= bottom_threshold`.
    pub is_at_bottom: bool,
    /// Rendered window (inclusive), `None` for an empty list.
    pub visible_range: Option<IndexRange>,
}

impl ScrollState {
    /// Compute boundary flags from raw container metrics.
    pub fn from_metrics(
        offset: f64,
        content_size: f64,
        viewport_size: f64,
        top_threshold: f64,
        bottom_threshold: f64,
        visible_range: Option<IndexRange>,
    ) -> Self {
        Self {
            offset,
            is_at_top: offset <= top_threshold,
            is_at_bottom: content_size - offset - viewport_size <= bottom_threshold,
            visible_range,
        }
    }
}
