//! The transcript pane: a terminal-row scroll container and item rendering.
//!
//! All engine units in the demo host are terminal rows. Every item is drawn
//! as a header row, its wrapped content rows and a footer row, so its
//! measured height is the wrapped line count plus [`CHROME_ROWS`].

use super::wrap::wrap_text;
use crate::height_cache::{EstimateConfig, RoleHeights};
use crate::model::{ListItem, Measurement, Role};
use crate::view_state::{ContainerMetrics, ScrollBehavior, ScrollConfig, ScrollContainer, Window};
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Paragraph, Widget};
use unicode_width::UnicodeWidthStr;

/// Nominal pixel height of one terminal row.
///
/// Pixel-valued config (thresholds, maximum height) is divided by this to
/// get rows.
pub const ROW_PX: f64 = 20.0;

/// Rows each item spends on its header and footer.
pub const CHROME_ROWS: usize = 2;

/// Columns each content row spends on its gutter (`"│ "`).
const GUTTER: usize = 2;

/// Content columns available at terminal `width`.
pub fn content_columns(width: u16) -> usize {
    usize::from(width).saturating_sub(GUTTER).max(1)
}

/// Row-based estimate parameters for a pane `width` columns wide.
///
/// With a base of one content row plus chrome and one row per extra wrapped
/// line, estimates differ from measurements only where word wrapping breaks
/// earlier than a hard wrap would.
pub fn row_estimate(width: u16, base: &EstimateConfig) -> EstimateConfig {
    let single = (1 + CHROME_ROWS) as f64;
    EstimateConfig {
        default_height: single,
        min_height: single,
        max_height: (base.max_height / ROW_PX).floor().max(single),
        roles: RoleHeights::default(),
        chars_per_line: content_columns(width),
        line_height: 1.0,
    }
    .sanitized()
}

/// Scroll thresholds converted from pixels to rows.
pub fn row_scroll_config(base: &ScrollConfig) -> ScrollConfig {
    ScrollConfig {
        top_threshold: base.top_threshold / ROW_PX,
        bottom_threshold: base.bottom_threshold / ROW_PX,
        auto_follow: base.auto_follow,
    }
    .sanitized()
}

/// Scroll container backed by a terminal region.
///
/// Offsets are whole rows. Terminals cannot animate, so every
/// [`ScrollBehavior`] jumps.
#[derive(Debug, Clone, Default)]
pub struct TerminalPane {
    rows: Option<u16>,
    content_rows: f64,
    offset: f64,
}

impl TerminalPane {
    /// Pane with no size yet; not measurable until [`resize`](Self::resize).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the pane height. Zero rows makes the pane unmeasurable.
    pub fn resize(&mut self, rows: u16) {
        self.rows = (rows > 0).then_some(rows);
        self.offset = self.clamp(self.offset);
    }

    /// Pane height in rows, if known.
    pub fn rows(&self) -> Option<u16> {
        self.rows
    }

    /// Current offset in rows.
    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// User scroll by `delta` rows.
    pub fn scroll_by(&mut self, delta: f64) {
        self.offset = self.clamp(self.offset + delta);
    }

    fn max_offset(&self) -> f64 {
        let rows = self.rows.map_or(0.0, f64::from);
        (self.content_rows - rows).max(0.0)
    }

    fn clamp(&self, offset: f64) -> f64 {
        if offset.is_nan() {
            return 0.0;
        }
        offset.round().clamp(0.0, self.max_offset().ceil())
    }
}

impl ScrollContainer for TerminalPane {
    fn metrics(&self) -> Option<ContainerMetrics> {
        self.rows.map(|rows| ContainerMetrics {
            offset: self.offset,
            content_size: self.content_rows,
            viewport_size: f64::from(rows),
        })
    }

    fn set_scroll_offset(&mut self, offset: f64, _behavior: ScrollBehavior) {
        self.offset = self.clamp(offset);
    }

    fn set_content_size(&mut self, size: f64) {
        self.content_rows = if size.is_finite() { size.max(0.0) } else { 0.0 };
        self.offset = self.clamp(self.offset);
    }
}

fn role_style(role: Role) -> Style {
    let color = match role {
        Role::User => Color::Cyan,
        Role::Assistant => Color::Green,
        Role::System => Color::Yellow,
        Role::Tool => Color::Magenta,
    };
    Style::default().fg(color)
}

/// Lines an item renders as at terminal `width`.
pub fn item_lines(item: &impl ListItem, width: u16) -> Vec<Line<'static>> {
    let style = role_style(item.role());
    let width = usize::from(width).max(1);

    let label = format!("┌─ {} ", item.role().as_str());
    let fill = "─".repeat(width.saturating_sub(label.width()));
    let header = Line::from(vec![
        Span::styled(label, style.add_modifier(Modifier::BOLD)),
        Span::styled(fill, style),
    ]);

    let mut lines = vec![header];
    lines.extend(
        wrap_text(item.content(), content_columns(width as u16))
            .into_iter()
            .map(|text| Line::from(vec![Span::styled("│ ", style), Span::raw(text)])),
    );
    lines.push(Line::styled(
        format!("└{}", "─".repeat(width.saturating_sub(1))),
        style,
    ));
    lines
}

/// Draw the window's items into `area` and measure them.
///
/// Items are placed at their laid-out start relative to the window offset
/// and clipped to `area`. Returns one measurement per rendered item, with
/// the rows it actually took.
pub fn render_items<T: ListItem>(
    window: &Window,
    items: &[T],
    area: Rect,
    buf: &mut Buffer,
) -> Vec<Measurement> {
    let mut batch = Vec::with_capacity(window.items.len());
    let pane_rows = i64::from(area.height);

    for virtual_item in &window.items {
        let Some(item) = items.get(virtual_item.index) else {
            continue;
        };
        let lines = item_lines(item, area.width);
        let height = lines.len() as i64;
        batch.push(Measurement::of(item, height as f64));

        let top = (virtual_item.start - window.scroll_offset).round() as i64;
        let first = top.max(0);
        let last = (top + height).min(pane_rows);
        if last <= first {
            continue;
        }

        let target = Rect {
            x: area.x,
            y: area.y + first as u16,
            width: area.width,
            height: (last - first) as u16,
        };
        let skip = (first - top) as u16;
        Paragraph::new(lines).scroll((skip, 0)).render(target, buf);
    }

    batch
}
