//! Common utilities for medtext-cmd

use std::path::Path;

use anyhow::Result;
use serde::Serialize;
use unicode_segmentation::UnicodeSegmentation;

use medtext_docstore::PositionRange;

/// Checks if a file exists and is readable
pub fn validate_file_exists(path: &str) -> Result<()> {
    let file_path = Path::new(path);
    if !file_path.exists() {
        anyhow::bail!("File does not exist: {}", path);
    }
    if !file_path.is_file() {
        anyhow::bail!("Path is not a file: {}", path);
    }
    Ok(())
}

/// Formats file size in human-readable format
pub fn format_size(size: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = size as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", size as u64, UNITS[unit_index])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Words of a line, lowercased, with their character ranges.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Tokenized {
    pub words: Vec<String>,
    pub ranges: Vec<PositionRange>,
}

/// Splits `text` at Unicode word boundaries. Segments without a letter or
/// digit (spaces, punctuation) are dropped; positions count characters.
pub fn tokenize(text: &str) -> Tokenized {
    let mut tokenized = Tokenized::default();
    let mut position = 0u32;
    for segment in text.split_word_bounds() {
        let length = segment.chars().count() as u32;
        if segment.chars().any(char::is_alphanumeric) {
            tokenized.words.push(segment.to_lowercase());
            tokenized
                .ranges
                .push(PositionRange::new(position, position + length));
        }
        position += length;
    }
    tokenized
}

/// The first `max_chars` characters of `text`, without trailing whitespace.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    let end = text
        .char_indices()
        .nth(max_chars)
        .map_or(text.len(), |(i, _)| i);
    text[..end].trim_end()
}
