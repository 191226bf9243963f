//! Sentence-aware text chunking with overlap.
//!
//! Text is walked in windows of `chunk_size` characters. Each window is cut
//! after the last sentence terminator or newline that sits at or past 60% of
//! the window, or hard-cut at the window boundary when there is none. The next
//! window starts `overlap` characters before the cut.

/// Default maximum chunk length in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 700;
/// Default number of characters shared between consecutive chunks.
pub const DEFAULT_CHUNK_OVERLAP: usize = 120;

/// Earliest acceptable break position, as a fraction of the window length.
const MIN_BREAK_NUMERATOR: usize = 3;
const MIN_BREAK_DENOMINATOR: usize = 5;

/// Split `text` into trimmed, non-empty chunks of at most `chunk_size` characters.
///
/// Empty or whitespace-only input yields no chunks. Input that already fits
/// yields the trimmed text as a single chunk. A `chunk_size` of zero disables
/// splitting.
#[must_use]
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    let chars: Vec<char> = trimmed.chars().collect();
    if chunk_size == 0 || chars.len() <= chunk_size {
        return vec![trimmed.to_owned()];
    }

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        let window = &chars[start..end];
        let is_last = end == chars.len();
        let cut = if is_last {
            window.len()
        } else {
            break_point(window)
        };

        let piece: String = window[..cut].iter().collect();
        let piece = piece.trim();
        if !piece.is_empty() {
            chunks.push(piece.to_owned());
        }

        if is_last {
            break;
        }
        // Always move forward, even when overlap swallows the whole cut.
        start = (start + cut).saturating_sub(overlap).max(start + 1);
    }

    chunks
}

/// Length of the window prefix to keep, cutting just after a good break.
fn break_point(window: &[char]) -> usize {
    let earliest = window.len() * MIN_BREAK_NUMERATOR / MIN_BREAK_DENOMINATOR;
    window
        .iter()
        .rposition(|ch| is_break(*ch))
        .filter(|position| *position >= earliest)
        .map_or(window.len(), |position| position + 1)
}

fn is_break(ch: char) -> bool {
    matches!(ch, '.' | '!' | '?' | '\n')
}
