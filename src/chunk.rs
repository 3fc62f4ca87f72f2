//! Sliding-window text chunker.
//!
//! Splits normalized document text into overlapping fixed-size windows
//! measured in characters. Newlines are collapsed to spaces before
//! windowing, so chunk boundaries deliberately ignore sentence and
//! paragraph structure.
//!
//! Chunking is a pure function of `(text, max_chars, overlap)`: the same
//! inputs always produce the same chunk sequence.

use anyhow::{bail, Result};

/// Split `text` into overlapping windows of at most `max_chars` characters.
///
/// The window advances by `max_chars - overlap` characters each step.
/// Each emitted window is trimmed; windows that are empty after trimming
/// are dropped. Text no longer than `max_chars` yields a single chunk.
///
/// # Errors
///
/// Returns an error when `overlap >= max_chars` — the step would be zero
/// or negative, which can never terminate.
pub fn chunk_text(text: &str, max_chars: usize, overlap: usize) -> Result<Vec<String>> {
    if overlap >= max_chars {
        bail!(
            "chunk_overlap ({}) must be smaller than chunk_size ({})",
            overlap,
            max_chars
        );
    }

    // Collapse line breaks so windows slice a single flat run of text.
    let chars: Vec<char> = text
        .chars()
        .map(|c| if c == '\r' || c == '\n' { ' ' } else { c })
        .collect();

    let step = max_chars - overlap;
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + max_chars).min(chars.len());
        let window: String = chars[start..end].iter().collect();
        let trimmed = window.trim();
        if !trimmed.is_empty() {
            chunks.push(trimmed.to_string());
        }
        start += step;
    }

    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_yields_no_chunks() {
        assert!(chunk_text("", 1000, 200).unwrap().is_empty());
    }

    #[test]
    fn test_whitespace_only_yields_no_chunks() {
        assert!(chunk_text("   \n\n  \r\n ", 1000, 200).unwrap().is_empty());
    }

    #[test]
    fn test_short_text_single_chunk() {
        let chunks = chunk_text("hello world", 1000, 200).unwrap();
        assert_eq!(chunks, vec!["hello world".to_string()]);
    }

    #[test]
    fn test_newlines_collapsed_to_spaces() {
        let chunks = chunk_text("alpha\nbeta\r\ngamma", 1000, 200).unwrap();
        assert_eq!(chunks, vec!["alpha beta  gamma".to_string()]);
    }

    #[test]
    fn test_overlap_windows() {
        // step = 4 - 2 = 2; windows start at 0, 2, 4, ...
        let chunks = chunk_text("abcdefgh", 4, 2).unwrap();
        assert_eq!(chunks, vec!["abcd", "cdef", "efgh", "gh"]);
    }

    #[test]
    fn test_coverage_no_gaps() {
        // Every character position must fall inside at least one window.
        let text: String = ('a'..='z').cycle().take(257).collect();
        let max_chars = 50;
        let overlap = 10;
        let step = max_chars - overlap;
        let chunks = chunk_text(&text, max_chars, overlap).unwrap();

        let mut covered = 0usize;
        for (i, chunk) in chunks.iter().enumerate() {
            let start = i * step;
            assert!(start <= covered, "gap before window starting at {}", start);
            covered = covered.max(start + chunk.len());
        }
        assert!(covered >= text.len());
    }

    #[test]
    fn test_overlap_equal_to_size_is_config_error() {
        assert!(chunk_text("some text", 100, 100).is_err());
    }

    #[test]
    fn test_overlap_greater_than_size_is_config_error() {
        assert!(chunk_text("some text", 100, 250).is_err());
    }

    #[test]
    fn test_zero_chunk_size_is_config_error() {
        assert!(chunk_text("some text", 0, 0).is_err());
    }

    #[test]
    fn test_deterministic() {
        let text = "The quick brown fox jumps over the lazy dog. ".repeat(40);
        let a = chunk_text(&text, 100, 20).unwrap();
        let b = chunk_text(&text, 100, 20).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_multibyte_text_windows_on_char_boundaries() {
        let text = "héllo wörld ".repeat(30);
        let chunks = chunk_text(&text, 40, 10).unwrap();
        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 40);
        }
    }
}
