//! Status bar for the demo host.
//!
//! Shows the visible range, scroll position, follow state, cache counters
//! and the last scroll command the controller issued.

use crate::height_cache::CacheStats;
use crate::view_state::{ScrollCommand, ScrollObserver, ScrollOutcome, ScrollState};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use std::cell::Cell;
use std::rc::Rc;

const LIVE_LABEL: &str = "[LIVE] ";
const FOLLOW_LABEL: &str = "[FOLLOW] ";

/// Observer that remembers the most recent scroll command.
///
/// Clones share the same slot, so one clone can be handed to the controller
/// while the host keeps another for display.
#[derive(Debug, Clone, Default)]
pub struct LastCommand(Rc<Cell<Option<(ScrollCommand, ScrollOutcome)>>>);

impl LastCommand {
    /// Empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent command and its outcome.
    pub fn get(&self) -> Option<(ScrollCommand, ScrollOutcome)> {
        self.0.get()
    }
}

impl ScrollObserver for LastCommand {
    fn on_command(&mut self, command: &ScrollCommand, outcome: &ScrollOutcome) {
        self.0.set(Some((*command, *outcome)));
    }
}

fn describe(command: &ScrollCommand, outcome: &ScrollOutcome) -> String {
    let name = match command {
        ScrollCommand::ToIndex { index, .. } => format!("to #{index}"),
        ScrollCommand::ToTop(_) => "to top".to_string(),
        ScrollCommand::ToBottom(_) => "to bottom".to_string(),
    };
    let result = match outcome {
        ScrollOutcome::Applied(offset) => format!("@{offset:.0}"),
        ScrollOutcome::Unchanged => "unchanged".to_string(),
        ScrollOutcome::Deferred => "deferred".to_string(),
    };
    format!("{name} {result}")
}

/// One-line status bar.
#[derive(Debug, Clone)]
pub struct StatusBar {
    /// Current scroll state.
    pub state: ScrollState,
    /// Number of items in the list.
    pub len: usize,
    /// Maximum scroll offset in rows.
    pub max_offset: f64,
    /// Whether an auto-follow is pending.
    pub following: bool,
    /// Whether the transcript is streaming.
    pub streaming: bool,
    /// Blink phase for the LIVE indicator.
    pub blink_on: bool,
    /// Height cache counters.
    pub stats: CacheStats,
    /// Last issued scroll command.
    pub last_command: Option<(ScrollCommand, ScrollOutcome)>,
}

impl StatusBar {
    /// Render as a styled line.
    ///
    /// The LIVE indicator is gray when not streaming, and blinks green while
    /// streaming.
    pub fn line(&self) -> Line<'static> {
        let mut spans = Vec::new();

        if !self.streaming {
            spans.push(Span::styled(LIVE_LABEL, Style::default().fg(Color::Gray)));
        } else if self.blink_on {
            spans.push(Span::styled(LIVE_LABEL, Style::default().fg(Color::Green)));
        } else {
            spans.push(Span::raw(" ".repeat(LIVE_LABEL.len())));
        }

        if self.following {
            spans.push(Span::styled(
                FOLLOW_LABEL,
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ));
        }

        let range = match self.state.visible_range {
            Some(range) => format!("{}-{} of {}", range.start + 1, range.end + 1, self.len),
            None => format!("0 of {}", self.len),
        };
        let percent = if self.max_offset > 0.0 {
            (self.state.offset / self.max_offset * 100.0).round()
        } else {
            100.0
        };
        let position = if self.state.is_at_bottom {
            "bottom".to_string()
        } else if self.state.is_at_top {
            "top".to_string()
        } else {
            format!("{percent:.0}%")
        };
        spans.push(Span::raw(format!("{range} │ {position}")));

        spans.push(Span::styled(
            format!(
                " │ cache {} ({:.0}% hit)",
                self.stats.size,
                self.stats.hit_rate() * 100.0
            ),
            Style::default().fg(Color::DarkGray),
        ));

        if let Some((command, outcome)) = &self.last_command {
            spans.push(Span::styled(
                format!(" │ {}", describe(command, outcome)),
                Style::default().fg(Color::DarkGray),
            ));
        }

        Line::from(spans)
    }
}
