//! Paragraph-greedy text chunking with word-aligned overlap.
//!
//! The chunker splits sanitized text on blank-line paragraph boundaries and
//! greedily packs paragraphs into chunks bounded by a character budget. When
//! a chunk closes, the next chunk is seeded with roughly `overlap`
//! characters taken word-aligned from the tail of the closed chunk, so
//! retrieval context does not cut off mid-thought at chunk edges.
//!
//! A single paragraph longer than `max_size` is emitted whole rather than
//! split mid-paragraph; the budget is a packing target, not a hard cap.

const PARAGRAPH_SEPARATOR: &str = "\n\n";

/// Splits `text` into an ordered sequence of overlapping chunks.
///
/// Empty (or whitespace-only) input yields an empty sequence. Any text that
/// fits within `max_size` comes back as exactly one chunk, trimmed.
pub fn chunk_text(text: &str, max_size: usize, overlap: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    // Budgets are measured in characters, not bytes: multibyte text must
    // pack the same way ASCII does.
    let mut current_chars = 0;

    for paragraph in text.split(PARAGRAPH_SEPARATOR) {
        let paragraph_chars = paragraph.chars().count();
        if current_chars + paragraph_chars > max_size && !current.is_empty() {
            let closed = current.trim().to_string();
            let carry = tail_overlap(&closed, overlap);
            chunks.push(closed);

            if carry.is_empty() {
                current = paragraph.to_string();
                current_chars = paragraph_chars;
            } else {
                current_chars =
                    carry.chars().count() + PARAGRAPH_SEPARATOR.len() + paragraph_chars;
                current = format!("{carry}{PARAGRAPH_SEPARATOR}{paragraph}");
            }
        } else if current.is_empty() {
            current = paragraph.to_string();
            current_chars = paragraph_chars;
        } else {
            current.push_str(PARAGRAPH_SEPARATOR);
            current.push_str(paragraph);
            current_chars += PARAGRAPH_SEPARATOR.len() + paragraph_chars;
        }
    }

    let last = current.trim();
    if !last.is_empty() {
        chunks.push(last.to_string());
    }

    chunks
}

/// Takes whole words from the end of `text` until roughly `overlap`
/// characters are accumulated.
fn tail_overlap(text: &str, overlap: usize) -> String {
    if overlap == 0 {
        return String::new();
    }

    let mut carried = Vec::new();
    let mut len = 0;
    for word in text.split_whitespace().rev() {
        if len >= overlap {
            break;
        }
        len += word.chars().count() + 1;
        carried.push(word);
    }
    carried.reverse();
    carried.join(" ")
}
