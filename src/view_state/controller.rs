//! ScrollController - scroll intents, boundary checks and auto-follow
//!
//! Owns a [`Virtualizer`] and drives a [`ScrollContainer`]. The host forwards
//! its events (scroll, resize, item changes, measurements) and subscribes to
//! the results through [`ScrollObserver`].
//!
//! # Deferred commands
//! While no measurable container is attached, scroll commands are queued and
//! replayed in order once one is (on attach, scroll, resize or the next
//! command). Consecutive queued jumps to the top or bottom collapse into the
//! last one.
//!
//! # Auto-follow
//! When items change at the end of the list while the view is at the bottom,
//! the controller arms a follow for the changed items that are currently
//! rendered. Once one of their real heights arrives it issues exactly one
//! `scroll_to_bottom(Auto)` and disarms. Changed items outside the rendered
//! window can never be measured, so in that case the follow fires at once
//! on estimates. A user scroll upward, or an explicit scroll to the top or
//! to an index, disarms a pending follow.
//!
//! While the view sits at the bottom, measurement relayouts keep it pinned to
//! the bottom instead of to the anchor item; this is layout, not a command.

use super::container::{ContainerMetrics, ScrollContainer};
use super::scroll::{ScrollAlign, ScrollBehavior, ScrollCommand, ScrollOptions, ScrollOutcome, ScrollState};
use super::virtualizer::{LayoutChange, Virtualizer, Window};
use crate::model::{ItemId, ListItem, Measurement};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, trace, warn};

/// Boundary thresholds and follow behavior (the `[scroll]` config section).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScrollConfig {
    /// `offset <= top_threshold` counts as at top.
    pub top_threshold: f64,
    /// Remaining distance `<= bottom_threshold` counts as at bottom.
    pub bottom_threshold: f64,
    /// Keep the newest item in view while the user stays at the bottom.
    pub auto_follow: bool,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            top_threshold: 10.0,
            bottom_threshold: 50.0,
            auto_follow: true,
        }
    }
}

impl ScrollConfig {
    /// Replace non-finite or non-positive thresholds with the defaults.
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if !(self.top_threshold.is_finite() && self.top_threshold > 0.0) {
            warn!(value = self.top_threshold, "Invalid top threshold, using default");
            self.top_threshold = defaults.top_threshold;
        }
        if !(self.bottom_threshold.is_finite() && self.bottom_threshold > 0.0) {
            warn!(value = self.bottom_threshold, "Invalid bottom threshold, using default");
            self.bottom_threshold = defaults.bottom_threshold;
        }
        self
    }
}

/// Receives controller output. All methods default to no-ops.
pub trait ScrollObserver {
    /// A new window should be rendered.
    fn on_window(&mut self, _window: &Window) {}

    /// Scroll state after an event.
    fn on_scroll_state(&mut self, _state: &ScrollState) {}

    /// A scroll command was issued (including deferred and replayed ones).
    fn on_command(&mut self, _command: &ScrollCommand, _outcome: &ScrollOutcome) {}
}

#[derive(Debug, Clone)]
enum Follow {
    Idle,
    Armed {
        awaiting: FxHashSet<ItemId>,
        /// Container offset when armed; scrolling above it disarms.
        offset: f64,
    },
}

/// Scroll intents and auto-follow over a virtualized list.
pub struct ScrollController<C: ScrollContainer> {
    virtualizer: Virtualizer,
    container: Option<C>,
    config: ScrollConfig,
    pending: VecDeque<ScrollCommand>,
    follow: Follow,
    observers: Vec<Box<dyn ScrollObserver>>,
}

impl<C: ScrollContainer> std::fmt::Debug for ScrollController<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScrollController")
            .field("virtualizer", &self.virtualizer)
            .field("attached", &self.container.is_some())
            .field("pending", &self.pending)
            .field("follow", &self.follow)
            .field("observers", &self.observers.len())
            .finish()
    }
}

/// Offsets closer than this are the same position.
const OFFSET_EPSILON: f64 = 0.5;

fn same_offset(a: f64, b: f64) -> bool {
    (a - b).abs() < OFFSET_EPSILON
}

impl<C: ScrollContainer> ScrollController<C> {
    /// Create a controller with no container attached.
    pub fn new(virtualizer: Virtualizer, config: ScrollConfig) -> Self {
        Self {
            virtualizer,
            container: None,
            config: config.sanitized(),
            pending: VecDeque::new(),
            follow: Follow::Idle,
            observers: Vec::new(),
        }
    }

    /// Create a controller and attach `container`.
    pub fn with_container(virtualizer: Virtualizer, config: ScrollConfig, container: C) -> Self {
        let mut controller = Self::new(virtualizer, config);
        controller.attach(container);
        controller
    }

    // === Accessors ===

    /// The virtualizer.
    pub fn virtualizer(&self) -> &Virtualizer {
        &self.virtualizer
    }

    /// Mutable access to the virtualizer.
    ///
    /// Changes made here bypass auto-follow; prefer the controller's item
    /// methods.
    pub fn virtualizer_mut(&mut self) -> &mut Virtualizer {
        &mut self.virtualizer
    }

    /// Attached container.
    pub fn container(&self) -> Option<&C> {
        self.container.as_ref()
    }

    /// Mutable access to the attached container.
    pub fn container_mut(&mut self) -> Option<&mut C> {
        self.container.as_mut()
    }

    /// Thresholds and follow settings.
    pub fn config(&self) -> &ScrollConfig {
        &self.config
    }

    /// Number of queued commands.
    pub fn pending_commands(&self) -> usize {
        self.pending.len()
    }

    /// Whether an auto-follow is waiting for measurements.
    pub fn is_following(&self) -> bool {
        matches!(self.follow, Follow::Armed { .. })
    }

    /// Subscribe to windows, scroll states and commands.
    pub fn add_observer(&mut self, observer: Box<dyn ScrollObserver>) {
        self.observers.push(observer);
    }

    /// Window for the current position.
    pub fn window(&self) -> Window {
        self.virtualizer.window()
    }

    // === Container lifecycle ===

    /// Attach `container`, replacing any previous one, and replay queued
    /// commands if it is measurable.
    pub fn attach(&mut self, container: C) {
        self.container = Some(container);
        self.push_content_size();
        self.pull_metrics();
        self.replay_pending();
        self.notify();
    }

    /// Detach and return the container. Later commands are queued.
    pub fn detach(&mut self) -> Option<C> {
        self.container.take()
    }

    fn metrics(&self) -> Option<ContainerMetrics> {
        self.container.as_ref()?.metrics()
    }

    /// Copy container geometry into the virtualizer.
    fn pull_metrics(&mut self) -> Option<ContainerMetrics> {
        let metrics = self.metrics()?;
        self.virtualizer.set_viewport_size(metrics.viewport_size);
        self.virtualizer.set_scroll_offset(metrics.offset);
        Some(metrics)
    }

    fn push_content_size(&mut self) {
        let total = self.virtualizer.total_size();
        if let Some(container) = self.container.as_mut() {
            container.set_content_size(total);
        }
    }

    fn replay_pending(&mut self) {
        if self.pending.is_empty() || self.metrics().is_none() {
            return;
        }
        let queued = std::mem::take(&mut self.pending);
        debug!(count = queued.len(), "Replaying deferred scroll commands");
        for command in queued {
            self.issue(command);
        }
    }

    fn defer(&mut self, command: ScrollCommand) {
        let absolute =
            |c: &ScrollCommand| matches!(c, ScrollCommand::ToBottom(_) | ScrollCommand::ToTop(_));
        if absolute(&command) && self.pending.back().is_some_and(absolute) {
            self.pending.pop_back();
        }
        self.pending.push_back(command);
    }

    // === Host events ===

    /// Handle a scroll event from the container.
    ///
    /// Disarms a pending auto-follow if the user moved up.
    pub fn on_scroll(&mut self) -> ScrollState {
        if let Some(metrics) = self.pull_metrics() {
            let scrolled_up = matches!(
                &self.follow,
                Follow::Armed { offset, .. } if metrics.offset + OFFSET_EPSILON < *offset
            );
            if scrolled_up {
                debug!(offset = metrics.offset, "User scrolled up, auto-follow disarmed");
                self.follow = Follow::Idle;
            }
        }
        self.replay_pending();
        self.notify()
    }

    /// Handle a viewport resize.
    pub fn on_resize(&mut self) -> ScrollState {
        self.push_content_size();
        self.pull_metrics();
        self.replay_pending();
        self.notify()
    }

    // === Boundary checks ===

    /// Current position and boundary flags.
    ///
    /// Reads the container when measurable, otherwise the virtualizer's own
    /// offset and viewport.
    pub fn check_position(&self) -> ScrollState {
        let (offset, content_size, viewport_size) = match self.metrics() {
            Some(m) => (m.offset, m.content_size, m.viewport_size),
            None => (
                self.virtualizer.scroll_offset(),
                self.virtualizer.total_size(),
                self.virtualizer.viewport_size(),
            ),
        };
        ScrollState::from_metrics(
            offset,
            content_size,
            viewport_size,
            self.config.top_threshold,
            self.config.bottom_threshold,
            self.virtualizer.rendered_range_at(offset, viewport_size),
        )
    }

    // === Scroll intents ===

    /// Bring item `index` (clamped) into view.
    pub fn scroll_to_index(&mut self, index: usize, options: ScrollOptions) -> ScrollOutcome {
        self.issue(ScrollCommand::ToIndex { index, options })
    }

    /// Scroll to the last item, then snap to the container's maximum offset.
    pub fn scroll_to_bottom(&mut self, behavior: ScrollBehavior) -> ScrollOutcome {
        self.issue(ScrollCommand::ToBottom(behavior))
    }

    /// Scroll to the first item, then snap to offset 0.
    pub fn scroll_to_top(&mut self, behavior: ScrollBehavior) -> ScrollOutcome {
        self.issue(ScrollCommand::ToTop(behavior))
    }

    fn issue(&mut self, command: ScrollCommand) -> ScrollOutcome {
        // The container may have become measurable without an event.
        self.replay_pending();
        let outcome = match self.pull_metrics() {
            Some(metrics) => self.execute(command, metrics),
            None => {
                debug!(?command, "Container not measurable, deferring scroll command");
                self.defer(command);
                ScrollOutcome::Deferred
            }
        };
        for observer in &mut self.observers {
            observer.on_command(&command, &outcome);
        }
        if !matches!(outcome, ScrollOutcome::Deferred) {
            self.notify();
        }
        outcome
    }

    fn execute(&mut self, command: ScrollCommand, metrics: ContainerMetrics) -> ScrollOutcome {
        let current = metrics.offset;
        let mut moved = false;

        if !matches!(command, ScrollCommand::ToBottom(_)) && self.is_following() {
            debug!(?command, "Explicit scroll away from the end, auto-follow disarmed");
            self.follow = Follow::Idle;
        }

        match command {
            ScrollCommand::ToIndex { index, options } => {
                let Some(target) = self.virtualizer.offset_for_index(index, options.align, current) else {
                    return ScrollOutcome::Unchanged;
                };
                moved |= self.move_to(target, options.behavior);
            }
            ScrollCommand::ToBottom(behavior) => {
                let last = self.virtualizer.len().saturating_sub(1);
                if let Some(target) = self.virtualizer.offset_for_index(last, ScrollAlign::End, current) {
                    moved |= self.move_to(target, behavior);
                }
                if let Some(after) = self.metrics() {
                    moved |= self.move_to(after.max_offset(), behavior);
                }
            }
            ScrollCommand::ToTop(behavior) => {
                if let Some(target) = self.virtualizer.offset_for_index(0, ScrollAlign::Start, current) {
                    moved |= self.move_to(target, behavior);
                }
                moved |= self.move_to(0.0, behavior);
            }
        }

        let Some(after) = self.pull_metrics() else {
            return ScrollOutcome::Unchanged;
        };
        if moved {
            debug!(?command, offset = after.offset, "Scroll command applied");
            ScrollOutcome::Applied(after.offset)
        } else {
            trace!(?command, "Scroll command already satisfied");
            ScrollOutcome::Unchanged
        }
    }

    /// Tell the container to move unless it is already at `target`.
    fn move_to(&mut self, target: f64, behavior: ScrollBehavior) -> bool {
        let Some(container) = self.container.as_mut() else {
            return false;
        };
        let current = container.metrics().map_or(0.0, |m| m.offset);
        if same_offset(current, target) {
            return false;
        }
        container.set_scroll_offset(target, behavior);
        true
    }

    // === Item source ===

    /// Append items to the end of the list.
    pub fn append_items<T: ListItem>(&mut self, items: &[T]) -> LayoutChange {
        let following = self.is_following_bottom();
        let change = self.virtualizer.append(items);
        self.after_item_change(change, following)
    }

    /// Replace the item at `index` (clamped), typically a streaming update.
    pub fn update_item(&mut self, index: usize, item: &impl ListItem) -> LayoutChange {
        let following = self.is_following_bottom();
        let change = self.virtualizer.update(index, item);
        self.after_item_change(change, following)
    }

    /// Reconcile with the full item sequence.
    pub fn sync_items<T: ListItem>(&mut self, items: &[T]) -> LayoutChange {
        let following = self.is_following_bottom();
        let change = self.virtualizer.sync(items);
        self.after_item_change(change, following)
    }

    /// Rebuild every row, e.g. after the estimate parameters changed.
    pub fn reset_items<T: ListItem>(&mut self, items: &[T]) -> LayoutChange {
        let at_bottom = self.check_position().is_at_bottom;
        let change = self.virtualizer.reset(items);
        self.push_content_size();
        if at_bottom {
            self.pin_to_bottom();
        } else {
            self.push_anchor_offset(&change);
        }
        self.notify();
        change
    }

    /// Whether changes at the end of the list should be followed: at the
    /// bottom right now, or a follow is already pending.
    fn is_following_bottom(&self) -> bool {
        self.config.auto_follow && (self.check_position().is_at_bottom || self.is_following())
    }

    fn after_item_change(&mut self, change: LayoutChange, following: bool) -> LayoutChange {
        self.push_content_size();
        self.push_anchor_offset(&change);

        if let (true, Some(from)) = (following, change.changed_from) {
            self.arm_follow(from);
        }
        self.notify();
        change
    }

    fn arm_follow(&mut self, from: usize) {
        let len = self.virtualizer.len();
        if from >= len {
            // Shrink only: nothing new to wait for.
            return;
        }
        let metrics = self.metrics();
        let offset = metrics.map_or(self.virtualizer.scroll_offset(), |m| m.offset);
        let viewport = metrics.map_or(self.virtualizer.viewport_size(), |m| m.viewport_size);

        let renderable: Vec<ItemId> = self
            .virtualizer
            .rendered_range_at(offset, viewport)
            .map(|range| {
                range
                    .indices()
                    .filter(|&index| index >= from)
                    .filter_map(|index| self.virtualizer.id_at(index).cloned())
                    .collect()
            })
            .unwrap_or_default();

        if renderable.is_empty() {
            debug!(from, "Changed items not rendered, following immediately");
            self.follow = Follow::Idle;
            self.scroll_to_bottom(ScrollBehavior::Auto);
            return;
        }

        if let Follow::Armed { awaiting, offset: armed_at } = &mut self.follow {
            awaiting.extend(renderable);
            *armed_at = offset;
            return;
        }
        debug!(count = renderable.len(), "Auto-follow armed");
        self.follow = Follow::Armed {
            awaiting: renderable.into_iter().collect(),
            offset,
        };
    }

    // === Measurement feed ===

    /// Apply a batch of measured heights.
    ///
    /// One cache write and one relayout per batch. Fires a pending
    /// auto-follow once an awaited item's height is known.
    pub fn apply_measurements(&mut self, batch: &[Measurement]) -> LayoutChange {
        let at_bottom = self.config.auto_follow && self.check_position().is_at_bottom;
        let satisfied = self.follow_satisfied(batch);
        let change = self.virtualizer.measure(batch);
        self.push_content_size();

        if satisfied {
            self.follow = Follow::Idle;
            self.scroll_to_bottom(ScrollBehavior::Auto);
            return change;
        }

        if at_bottom && !change.is_noop() {
            self.pin_to_bottom();
        } else {
            self.push_anchor_offset(&change);
        }
        self.notify();
        change
    }

    fn follow_satisfied(&self, batch: &[Measurement]) -> bool {
        let Follow::Armed { awaiting, .. } = &self.follow else {
            return false;
        };
        batch
            .iter()
            .any(|m| awaiting.contains(&m.id) && self.virtualizer.accepts(m))
    }

    /// Keep the view at the bottom across a relayout. Not a scroll command.
    fn pin_to_bottom(&mut self) {
        let max = self.virtualizer.max_scroll_offset();
        self.virtualizer.set_scroll_offset(max);
        self.move_to(max, ScrollBehavior::Instant);
        self.pull_metrics();
    }

    /// Move the container to the virtualizer's anchor-preserved offset.
    fn push_anchor_offset(&mut self, change: &LayoutChange) {
        if !change.offset_changed() {
            return;
        }
        self.move_to(change.scroll_offset, ScrollBehavior::Instant);
        self.pull_metrics();
    }

    // === Observers ===

    fn notify(&mut self) -> ScrollState {
        let state = self.check_position();
        if !self.observers.is_empty() {
            let window = self.virtualizer.window();
            for observer in &mut self.observers {
                observer.on_window(&window);
                observer.on_scroll_state(&state);
            }
        }
        state
    }
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
