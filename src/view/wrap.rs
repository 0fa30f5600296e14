//! Word wrapping for the terminal pane.
//!
//! Wrapping happens before rendering so the number of rows an item occupies
//! is known exactly and can be fed back to the engine as its measured height.

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Wrap `content` into lines at most `columns` display columns wide.
///
/// Breaks at spaces where possible and splits words wider than a line.
/// Every `\n`-separated segment yields at least one line, so the result is
/// never empty. Runs of spaces collapse to one.
///
/// # Examples
///
/// ```
/// # use streamlist::view::wrap_text;
/// assert_eq!(wrap_text("one two three", 7), vec!["one two", "three"]);
/// assert_eq!(wrap_text("", 10), vec![""]);
/// ```
pub fn wrap_text(content: &str, columns: usize) -> Vec<String> {
    let columns = columns.max(1);
    let mut lines = Vec::new();

    for segment in content.split('\n') {
        let mut current = String::new();
        let mut current_width = 0;

        for word in segment.split(' ').filter(|w| !w.is_empty()) {
            let word_width = word.width();

            if word_width > columns {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                let (chunks, rest, rest_width) = split_word(word, columns);
                lines.extend(chunks);
                current = rest;
                current_width = rest_width;
                continue;
            }

            if current.is_empty() {
                current.push_str(word);
                current_width = word_width;
            } else if current_width + 1 + word_width <= columns {
                current.push(' ');
                current.push_str(word);
                current_width += 1 + word_width;
            } else {
                lines.push(std::mem::replace(&mut current, word.to_string()));
                current_width = word_width;
            }
        }

        lines.push(current);
    }

    lines
}

/// Hard-split a word into full lines plus a trailing partial line.
fn split_word(word: &str, columns: usize) -> (Vec<String>, String, usize) {
    let mut full = Vec::new();
    let mut chunk = String::new();
    let mut width = 0;

    for ch in word.chars() {
        let ch_width = ch.width().unwrap_or(0);
        if width + ch_width > columns && !chunk.is_empty() {
            full.push(std::mem::take(&mut chunk));
            width = 0;
        }
        chunk.push(ch);
        width += ch_width;
    }

    (full, chunk, width)
}
