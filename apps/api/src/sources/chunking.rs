//! Overlapping character-window chunking for long source documents.

pub const DEFAULT_CHUNK_SIZE: usize = 2_500;
pub const DEFAULT_OVERLAP: usize = 200;

const PARAGRAPH_BREAK: [char; 2] = ['\n', '\n'];

/// Splits `text` into windows of at most `chunk_size` characters, each starting
/// `overlap` characters before the previous one ended. A window is cut just after
/// its last paragraph break when it contains one.
pub fn split_into_chunks(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= chunk_size || chunk_size == 0 {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut start = 0usize;

    while start < chars.len() {
        let mut end = start + chunk_size;
        if end >= chars.len() {
            chunks.push(collect(&chars[start..]).trim().to_string());
            break;
        }

        if let Some(brk) = last_paragraph_break(&chars[start..end]) {
            if brk > 0 {
                end = start + brk + PARAGRAPH_BREAK.len();
            }
        }

        chunks.push(collect(&chars[start..end]).trim().to_string());

        let next = end.saturating_sub(overlap);
        start = if next > start { next } else { end };
    }

    chunks.retain(|c| !c.is_empty());
    chunks
}

fn last_paragraph_break(window: &[char]) -> Option<usize> {
    window
        .windows(PARAGRAPH_BREAK.len())
        .rposition(|w| w == PARAGRAPH_BREAK)
}

fn collect(chars: &[char]) -> String {
    chars.iter().collect()
}
