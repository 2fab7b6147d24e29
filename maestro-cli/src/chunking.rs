//! A byte-budget sliding-window chunker for the `ingest` command, grounded
//! on `llmspell-rag::chunking::strategies::SlidingWindowChunker` (fixed-size
//! overlapping windows, estimated in bytes rather than that crate's token
//! estimate since this workspace carries no tokenizer dependency). File
//! ingestion itself is an out-of-scope external collaborator per spec §1;
//! this is the minimal chunk/embed/store path the `ingest` CLI surface in
//! spec §6 still needs to exercise the vector store adapter end to end.

#[derive(Debug, Clone, Copy)]
pub struct ChunkingConfig {
    pub max_chars: usize,
    pub overlap_chars: usize,
    pub min_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { max_chars: 2000, overlap_chars: 200, min_chars: 64 }
    }
}

#[derive(Debug, Clone)]
pub struct TextChunk {
    pub content: String,
    pub chunk_index: i32,
    pub byte_offset: usize,
}

/// Splits `text` into overlapping windows, nudged to the nearest preceding
/// whitespace so chunks don't split mid-word. The final chunk is dropped if
/// it would fall under `min_chars` and a prior chunk already covers the
/// tail (matching `SlidingWindowChunker`'s min-size guard).
pub fn chunk_text(text: &str, config: &ChunkingConfig) -> Vec<TextChunk> {
    let bytes = text.as_bytes();
    let len = bytes.len();
    if len == 0 {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut start = 0usize;
    let mut index = 0i32;

    while start < len {
        let mut end = (start + config.max_chars).min(len);
        if end < len {
            end = nearest_char_boundary(text, backtrack_to_whitespace(text, end, start));
        } else {
            end = len;
        }
        end = nearest_char_boundary(text, end);
        if end <= start {
            end = nearest_char_boundary(text, (start + 1).min(len));
        }

        let slice = &text[start..end];
        if !slice.trim().is_empty() {
            chunks.push(TextChunk { content: slice.trim().to_string(), chunk_index: index, byte_offset: start });
            index += 1;
        }

        if end >= len {
            break;
        }
        let next_start = end.saturating_sub(config.overlap_chars);
        start = if next_start <= start { end } else { nearest_char_boundary(text, next_start) };
    }

    if chunks.len() > 1 {
        if let Some(last) = chunks.last() {
            if last.content.len() < config.min_chars {
                chunks.pop();
            }
        }
    }
    chunks
}

fn backtrack_to_whitespace(text: &str, end: usize, start: usize) -> usize {
    let window_start = start + (end - start) / 2;
    match text[window_start..end].rfind(char::is_whitespace) {
        Some(rel) => window_start + rel,
        None => end,
    }
}

fn nearest_char_boundary(text: &str, mut idx: usize) -> usize {
    while idx < text.len() && !text.is_char_boundary(idx) {
        idx += 1;
    }
    idx.min(text.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(chunk_text("", &ChunkingConfig::default()).is_empty());
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let chunks = chunk_text("hello world", &ChunkingConfig::default());
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "hello world");
    }

    #[test]
    fn long_text_overlaps_and_covers_the_whole_input() {
        let text = "word ".repeat(1000);
        let config = ChunkingConfig { max_chars: 500, overlap_chars: 50, min_chars: 16 };
        let chunks = chunk_text(&text, &config);
        assert!(chunks.len() > 1);
        assert!(chunks.windows(2).all(|w| w[1].byte_offset > w[0].byte_offset));
        assert!(chunks.last().unwrap().byte_offset < text.len());
    }

    #[test]
    fn chunk_indices_are_sequential() {
        let text = "word ".repeat(1000);
        let chunks = chunk_text(&text, &ChunkingConfig { max_chars: 200, overlap_chars: 20, min_chars: 8 });
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.chunk_index, i as i32);
        }
    }
}
