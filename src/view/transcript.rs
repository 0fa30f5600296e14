//! Transcript sources for the demo host: JSONL files, synthetic
//! transcripts and a token streamer.

use crate::model::{AppError, ChatItem, ItemId, Role};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use tracing::{debug, warn};

/// Parse a JSONL transcript, one [`ChatItem`] per line.
///
/// Blank lines are skipped. Malformed lines are logged and skipped.
///
/// # Errors
/// Only I/O errors from `reader` are returned.
pub fn parse_transcript(reader: impl BufRead) -> io::Result<Vec<ChatItem>> {
    let mut items = Vec::new();
    let mut malformed = 0usize;

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<ChatItem>(&line) {
            Ok(item) => items.push(item),
            Err(e) => {
                malformed += 1;
                warn!(line = index + 1, error = %e, "Skipping malformed transcript line");
            }
        }
    }

    debug!(items = items.len(), malformed, "Parsed transcript");
    Ok(items)
}

/// Load a JSONL transcript from `path`.
///
/// # Errors
/// [`AppError::Input`] when the file cannot be opened or read.
pub fn load_transcript(path: &Path) -> Result<Vec<ChatItem>, AppError> {
    let input_error = |source| AppError::Input {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(input_error)?;
    parse_transcript(BufReader::new(file)).map_err(input_error)
}

const SENTENCES: [&str; 6] = [
    "Rendering only what is on screen keeps long transcripts responsive.",
    "Heights are estimated first and corrected once the row count is known.",
    "The scroll position stays anchored to the item at the top of the view.",
    "Streaming replies grow one token at a time at the end of the list.",
    "Cached heights survive restarts as long as the content is unchanged.",
    "Overscan renders a few extra items beyond each edge of the viewport.",
];

fn id(raw: String) -> Option<ItemId> {
    ItemId::new(raw).ok()
}

/// Deterministic synthetic transcript of `count` messages with varied
/// roles and lengths.
pub fn generate(count: usize) -> Vec<ChatItem> {
    (0..count)
        .filter_map(|i| {
            let role = match i {
                i if i % 17 == 16 => Role::System,
                i if i % 5 == 4 => Role::Tool,
                i if i % 2 == 0 => Role::User,
                _ => Role::Assistant,
            };
            let sentences = match role {
                Role::User | Role::System => 1,
                Role::Assistant => 1 + (i * 7) % 6,
                Role::Tool => 2 + (i * 3) % 4,
            };
            let content = (0..sentences)
                .map(|s| SENTENCES[(i + s) % SENTENCES.len()])
                .collect::<Vec<_>>()
                .join(if role == Role::Tool { "\n" } else { " " });
            Some(ChatItem::new(id(format!("gen-{i}"))?, role, content))
        })
        .collect()
}

/// What one streamer tick did to the transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEvent {
    /// Items were appended starting at this index.
    Appended(usize),
    /// The item at this index grew.
    Updated(usize),
}

/// Simulates a streaming assistant: alternates a short user prompt with an
/// assistant reply that grows by one token per tick.
#[derive(Debug, Clone)]
pub struct Streamer {
    turn: usize,
    tokens: usize,
    reply_length: usize,
    streaming: Option<usize>,
}

impl Streamer {
    /// Streamer whose replies are `reply_length` tokens long.
    pub fn new(reply_length: usize) -> Self {
        Self {
            turn: 0,
            tokens: 0,
            reply_length: reply_length.max(1),
            streaming: None,
        }
    }

    /// Index of the reply currently being streamed.
    pub fn streaming_index(&self) -> Option<usize> {
        self.streaming
    }

    /// Advance one token.
    pub fn tick(&mut self, items: &mut Vec<ChatItem>) -> Option<StreamEvent> {
        if let Some(index) = self.streaming {
            if self.tokens < self.reply_length {
                if let Some(item) = items.get_mut(index) {
                    let words: Vec<&str> = SENTENCES.iter().flat_map(|s| s.split(' ')).collect();
                    let word = words[(self.turn + self.tokens) % words.len()];
                    item.push_str(" ");
                    item.push_str(word);
                    self.tokens += 1;
                    return Some(StreamEvent::Updated(index));
                }
            }
        }

        let from = items.len();
        let turn = self.turn;
        self.turn += 1;
        self.tokens = 0;

        let prompt = ChatItem::new(
            id(format!("stream-{turn}-user"))?,
            Role::User,
            SENTENCES[turn % SENTENCES.len()],
        );
        let reply = ChatItem::new(id(format!("stream-{turn}-assistant"))?, Role::Assistant, "…");
        items.push(prompt);
        items.push(reply);
        self.streaming = Some(items.len() - 1);
        Some(StreamEvent::Appended(from))
    }
}
