//! Terminal demo host (impure shell)
//!
//! Renders a chat transcript through the engine with ratatui: the pane is a
//! [`ScrollContainer`](crate::view_state::ScrollContainer) measured in rows,
//! every frame draws the controller's window, and the rows each item took
//! are fed back as one measurement batch.

pub mod pane;
pub mod status;
pub mod transcript;
mod wrap;

pub use pane::{render_items, row_estimate, row_scroll_config, TerminalPane};
pub use status::{LastCommand, StatusBar};
pub use transcript::{generate, load_transcript, parse_transcript, StreamEvent, Streamer};
pub use wrap::wrap_text;

use crate::config::ResolvedConfig;
use crate::height_cache::{FileStore, HeightCache};
use crate::model::{AppError, ChatItem};
use crate::view_state::{ScrollBehavior, ScrollController, Virtualizer};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Layout},
    Terminal,
};
use std::io;
use std::time::Duration;
use tracing::{debug, info};

/// Rows reserved for the status bar.
const STATUS_ROWS: u16 = 1;

/// Tokens per simulated reply.
const REPLY_TOKENS: usize = 60;

/// Host options from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DemoOptions {
    /// Simulate a streaming assistant.
    pub stream: bool,
    /// Interval between streamed tokens (and status blinks).
    pub tick: Duration,
}

impl Default for DemoOptions {
    fn default() -> Self {
        Self {
            stream: false,
            tick: Duration::from_millis(80),
        }
    }
}

/// Height cache for a pane `width` columns wide.
///
/// Measured rows only hold for one width, so the snapshot key carries it.
fn build_cache(config: &ResolvedConfig, width: u16) -> HeightCache {
    let estimate = row_estimate(width, &config.estimate);
    let mut cache_config = config.cache.clone();
    cache_config.snapshot_key = format!("{}-w{width}", cache_config.snapshot_key);

    if config.persist {
        let store = FileStore::new(&config.cache_dir);
        HeightCache::with_store(estimate, cache_config, Box::new(store))
    } else {
        HeightCache::new(estimate, cache_config)
    }
}

/// The demo application.
///
/// Generic over backend to support testing with `TestBackend`.
pub struct App<B: Backend> {
    terminal: Terminal<B>,
    controller: ScrollController<TerminalPane>,
    items: Vec<ChatItem>,
    streamer: Option<Streamer>,
    config: ResolvedConfig,
    last_command: LastCommand,
    width: u16,
    blink_on: bool,
}

impl<B: Backend> App<B> {
    /// Build the engine for `items` and open at the bottom of the list.
    ///
    /// The scroll to the bottom is issued before the pane is attached, so it
    /// is deferred and replayed on attach.
    ///
    /// # Errors
    /// Fails only if the terminal size cannot be read.
    pub fn new(
        terminal: Terminal<B>,
        config: &ResolvedConfig,
        items: Vec<ChatItem>,
        options: DemoOptions,
    ) -> Result<Self, AppError> {
        let size = terminal.size()?;
        let width = size.width.max(1);

        let virtualizer = Virtualizer::new(build_cache(config, width), config.virtualizer.clone());
        let mut controller = ScrollController::new(virtualizer, row_scroll_config(&config.scroll));
        let last_command = LastCommand::new();
        controller.add_observer(Box::new(last_command.clone()));

        // Initial load, not a change to follow.
        controller.reset_items(&items);
        controller.scroll_to_bottom(ScrollBehavior::Instant);

        let mut pane = TerminalPane::new();
        pane.resize(size.height.saturating_sub(STATUS_ROWS));
        controller.attach(pane);

        info!(items = items.len(), width, stream = options.stream, "Demo host ready");

        Ok(Self {
            terminal,
            controller,
            items,
            streamer: options.stream.then(|| Streamer::new(REPLY_TOKENS)),
            config: config.clone(),
            last_command,
            width,
            blink_on: true,
        })
    }

    /// The scroll controller.
    pub fn controller(&self) -> &ScrollController<TerminalPane> {
        &self.controller
    }

    /// The transcript.
    pub fn items(&self) -> &[ChatItem] {
        &self.items
    }

    /// The terminal.
    pub fn terminal(&self) -> &Terminal<B> {
        &self.terminal
    }

    /// Mutable terminal access, e.g. to resize a test backend.
    pub fn terminal_mut(&mut self) -> &mut Terminal<B> {
        &mut self.terminal
    }

    /// Run the event loop until the user quits.
    pub fn run(&mut self, options: DemoOptions) -> Result<(), AppError> {
        self.frame()?;

        loop {
            if event::poll(options.tick)? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        if self.handle_key(key) {
                            return Ok(());
                        }
                        self.frame()?;
                    }
                    Event::Resize(width, height) => {
                        self.handle_resize(width, height);
                        self.frame()?;
                    }
                    _ => {}
                }
            } else if self.tick() {
                self.frame()?;
            }
        }
    }

    /// Handle a key press. Returns true if the app should quit.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return true;
        }

        let page = self
            .controller
            .container()
            .and_then(TerminalPane::rows)
            .map_or(1.0, |rows| f64::from(rows.saturating_sub(1).max(1)));

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Char('j') | KeyCode::Down => self.scroll_by(1.0),
            KeyCode::Char('k') | KeyCode::Up => self.scroll_by(-1.0),
            KeyCode::PageDown | KeyCode::Char(' ') => self.scroll_by(page),
            KeyCode::PageUp => self.scroll_by(-page),
            KeyCode::Char('g') | KeyCode::Home => {
                self.controller.scroll_to_top(ScrollBehavior::Instant);
            }
            KeyCode::Char('G') | KeyCode::End => {
                self.controller.scroll_to_bottom(ScrollBehavior::Instant);
            }
            _ => {}
        }
        false
    }

    fn scroll_by(&mut self, rows: f64) {
        if let Some(pane) = self.controller.container_mut() {
            pane.scroll_by(rows);
        }
        self.controller.on_scroll();
    }

    /// Handle a terminal resize.
    ///
    /// A width change invalidates every measured height: the cache is
    /// flushed and swapped for one keyed by the new width, and all rows are
    /// rebuilt.
    pub fn handle_resize(&mut self, width: u16, height: u16) {
        let width = width.max(1);
        if let Some(pane) = self.controller.container_mut() {
            pane.resize(height.saturating_sub(STATUS_ROWS));
        }

        if width != self.width {
            debug!(from = self.width, to = width, "Pane width changed, rebuilding layout");
            self.width = width;
            let mut previous = self
                .controller
                .virtualizer_mut()
                .replace_cache(build_cache(&self.config, width));
            previous.flush();
            self.controller.reset_items(&self.items);
        }

        self.controller.on_resize();
    }

    /// Advance the stream simulation and blink phase.
    ///
    /// Returns true if anything changed that needs a redraw.
    pub fn tick(&mut self) -> bool {
        let Some(streamer) = self.streamer.as_mut() else {
            return false;
        };
        self.blink_on = !self.blink_on;

        match streamer.tick(&mut self.items) {
            Some(StreamEvent::Appended(from)) => {
                self.controller.append_items(&self.items[from..]);
            }
            Some(StreamEvent::Updated(index)) => {
                self.controller.update_item(index, &self.items[index]);
            }
            None => {}
        }
        true
    }

    /// Draw, then feed measurements back. If they changed the layout, draw
    /// once more so the frame on screen matches the corrected positions.
    pub fn frame(&mut self) -> Result<(), AppError> {
        let change = self.draw()?;
        if change {
            self.draw()?;
        }
        Ok(())
    }

    fn draw(&mut self) -> Result<bool, AppError> {
        let window = self.controller.window();
        let virtualizer = self.controller.virtualizer();
        let status = StatusBar {
            state: self.controller.check_position(),
            len: virtualizer.len(),
            max_offset: virtualizer.max_scroll_offset(),
            following: self.controller.is_following(),
            streaming: self.streamer.is_some(),
            blink_on: self.blink_on,
            stats: virtualizer.cache().stats(),
            last_command: self.last_command.get(),
        };

        let items = &self.items;
        let mut batch = Vec::new();
        self.terminal.draw(|frame| {
            let [pane_area, status_area] =
                Layout::vertical([Constraint::Min(0), Constraint::Length(STATUS_ROWS)])
                    .areas(frame.area());
            batch = render_items(&window, items, pane_area, frame.buffer_mut());
            frame.render_widget(status.line(), status_area);
        })?;

        if batch.is_empty() {
            return Ok(false);
        }
        let change = self.controller.apply_measurements(&batch);
        Ok(!change.is_noop())
    }

    /// Persist measured heights before exit.
    pub fn finish(&mut self) {
        self.controller.virtualizer_mut().cache_mut().flush();
        let stats = self.controller.virtualizer().cache().stats();
        info!(
            cached = stats.size,
            hits = stats.hits,
            misses = stats.misses,
            "Demo host finished"
        );
    }
}

/// Set up the terminal, run the demo host and restore the terminal.
///
/// Note: Logging must be initialized by caller before calling this function.
pub fn run(
    config: &ResolvedConfig,
    items: Vec<ChatItem>,
    options: DemoOptions,
) -> Result<(), AppError> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    stdout.execute(EnterAlternateScreen)?;

    let result = Terminal::new(CrosstermBackend::new(stdout))
        .map_err(AppError::from)
        .and_then(|terminal| App::new(terminal, config, items, options))
        .and_then(|mut app| {
            let result = app.run(options);
            app.finish();
            result
        });

    // Always restore terminal state
    restore_terminal()?;

    result
}

/// Restore terminal to normal state
fn restore_terminal() -> io::Result<()> {
    disable_raw_mode()?;
    io::stdout().execute(LeaveAlternateScreen)?;
    Ok(())
}

#[cfg(test)]
#[path = "app_tests.rs"]
mod tests;
