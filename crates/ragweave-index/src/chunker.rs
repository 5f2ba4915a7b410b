// SPDX-FileCopyrightText: 2026 Ragweave Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Character-window chunking.
//!
//! The splitter works down a boundary hierarchy (paragraph, line, sentence,
//! word) so chunks break at the most natural seam that still fits the
//! configured window, carrying a character overlap between consecutive
//! chunks for context retention.

/// Boundary hierarchy, tried in order.
const SEPARATORS: [&str; 4] = ["\n\n", "\n", ". ", " "];

/// Chunks with fewer whitespace-separated tokens than this are discarded.
pub const MIN_CHUNK_TOKENS: usize = 3;

/// Window settings for the splitter.
#[derive(Debug, Clone, Copy)]
pub struct ChunkerConfig {
    /// Maximum chunk length in characters.
    pub chunk_size: usize,
    /// Characters of the previous chunk carried into the next one.
    pub chunk_overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 2048,
            chunk_overlap: 100,
        }
    }
}

/// Whitespace-separated token count.
pub fn token_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Splits text into overlapping chunks at the best available boundaries.
///
/// Never emits a chunk shorter than [`MIN_CHUNK_TOKENS`] tokens; empty input
/// yields no chunks, and input that already fits the window yields exactly
/// one.
pub fn split_text(text: &str, config: &ChunkerConfig) -> Vec<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    let mut chunks = Vec::new();
    split_with(trimmed, &SEPARATORS, config, &mut chunks);
    chunks.retain(|chunk| token_count(chunk) >= MIN_CHUNK_TOKENS);
    chunks
}

fn split_with(text: &str, separators: &[&str], config: &ChunkerConfig, out: &mut Vec<String>) {
    if text.chars().count() <= config.chunk_size {
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            out.push(trimmed.to_string());
        }
        return;
    }

    let Some((separator, rest)) = separators.split_first() else {
        hard_split(text, config, out);
        return;
    };

    let pieces: Vec<&str> = text.split(separator).collect();
    if pieces.len() == 1 {
        // This boundary never occurs; fall through to the next one.
        split_with(text, rest, config, out);
        return;
    }

    let mut current = String::new();
    for piece in pieces {
        if piece.chars().count() > config.chunk_size {
            flush(&mut current, out);
            split_with(piece, rest, config, out);
            continue;
        }
        let joined_len = current.chars().count() + separator.len() + piece.chars().count();
        if !current.is_empty() && joined_len > config.chunk_size {
            let tail = overlap_tail(&current, config.chunk_overlap);
            flush(&mut current, out);
            current = tail;
        }
        if !current.is_empty() {
            current.push_str(separator);
        }
        current.push_str(piece);
    }
    flush(&mut current, out);
}

/// Last resort: fixed character windows aligned to char boundaries.
fn hard_split(text: &str, config: &ChunkerConfig, out: &mut Vec<String>) {
    let chars: Vec<char> = text.chars().collect();
    let step = config.chunk_size.saturating_sub(config.chunk_overlap).max(1);
    let mut start = 0;
    while start < chars.len() {
        let end = (start + config.chunk_size).min(chars.len());
        let window: String = chars[start..end].iter().collect();
        let trimmed = window.trim();
        if !trimmed.is_empty() {
            out.push(trimmed.to_string());
        }
        if end == chars.len() {
            break;
        }
        start += step;
    }
}

fn flush(current: &mut String, out: &mut Vec<String>) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
    current.clear();
}

/// Trailing slice of up to `overlap` characters, preferring to start at a
/// whitespace boundary so the carried context begins on a whole word.
fn overlap_tail(text: &str, overlap: usize) -> String {
    if overlap == 0 {
        return String::new();
    }
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= overlap {
        return text.to_string();
    }
    let mut start = chars.len() - overlap;
    if start > 0 && !chars[start - 1].is_whitespace() {
        // The window opens mid-word; advance to the next boundary.
        while start < chars.len() && !chars[start].is_whitespace() {
            start += 1;
        }
    }
    while start < chars.len() && chars[start].is_whitespace() {
        start += 1;
    }
    chars[start..].iter().collect()
}

/// Pre-splits text into fixed windows of at most `window_size` characters,
/// breaking only at word boundaries. Used to feed the LLM-guided chunker.
pub fn split_windows(text: &str, window_size: usize) -> Vec<String> {
    let mut windows = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let joined_len = current.chars().count() + 1 + word.chars().count();
        if !current.is_empty() && joined_len > window_size {
            windows.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        windows.push(current);
    }
    windows
}
