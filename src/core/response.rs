//! Reply chunking for the transport's message size limit
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.1.0

/// Largest message body the transport accepts
pub const MESSAGE_LIMIT: usize = 2000;

/// Chunk text into pieces of at most `max_size` bytes
///
/// Splits on line boundaries where possible and falls back to character
/// boundaries for lines that alone exceed the limit. Never splits a UTF-8
/// sequence.
pub fn chunk_text(text: &str, max_size: usize) -> Vec<String> {
    if text.len() <= max_size {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();

    for line in text.lines() {
        // +1 for the newline joining it to `current`
        if !current.is_empty() && current.len() + 1 + line.len() > max_size {
            chunks.push(std::mem::take(&mut current));
        }
        if line.len() > max_size {
            chunks.extend(split_on_chars(line, max_size));
            continue;
        }
        if !current.is_empty() {
            current.push('\n');
        }
        current.push_str(line);
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

fn split_on_chars(line: &str, max_size: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    for ch in line.chars() {
        if !current.is_empty() && current.len() + ch.len_utf8() > max_size {
            pieces.push(std::mem::take(&mut current));
        }
        current.push(ch);
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

/// Chunk a reply for the transport (2000 byte limit)
pub fn chunk_for_message(text: &str) -> Vec<String> {
    chunk_text(text, MESSAGE_LIMIT)
}
