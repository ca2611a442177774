use std::collections::VecDeque;

use tracing::info;

use crate::chunk::Chunk;
use crate::error::{IngestError, Result};

/// Separators tried in order, coarsest first. The empty separator splits
/// into single characters and always applies.
const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

#[derive(Debug, Clone, Copy)]
pub struct ChunkerConfig {
    /// Maximum characters per chunk
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks
    pub chunk_overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 100,
        }
    }
}

pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    pub fn new(config: ChunkerConfig) -> Result<Self> {
        if config.chunk_size == 0 || config.chunk_overlap >= config.chunk_size {
            return Err(IngestError::InvalidChunking {
                size: config.chunk_size,
                overlap: config.chunk_overlap,
            });
        }
        Ok(Self { config })
    }

    /// Every chunk is a verbatim slice of `text`; its offset is the byte
    /// range of that slice.
    pub fn chunk_text(
        &self,
        doc_id: &str,
        text: &str,
        source: &str,
    ) -> Vec<Chunk> {
        info!(
            size = self.config.chunk_size,
            overlap = self.config.chunk_overlap,
            "Splitting document into chunks"
        );

        let chunks: Vec<Chunk> = self
            .split_spans(text)
            .into_iter()
            .map(|(start, end)| {
                Chunk::new(
                    doc_id.to_string(),
                    text[start..end].to_string(),
                    source.to_string(),
                    (start, end),
                )
            })
            .collect();

        info!(count = chunks.len(), "Generated chunks");
        chunks
    }

    /// Trimmed, non-empty windows of at most `chunk_size` characters.
    fn split_spans(&self, text: &str) -> Vec<Span> {
        self.split_recursive(text, (0, text.len()), &SEPARATORS)
    }

    fn split_recursive(&self, text: &str, span: Span, separators: &[&str]) -> Vec<Span> {
        let segment = &text[span.0..span.1];

        let Some(position) = separators
            .iter()
            .position(|s| s.is_empty() || segment.contains(s))
        else {
            return trim_span(text, span).into_iter().collect();
        };

        let separator = separators[position];
        let finer = &separators[position + 1..];

        let mut output = Vec::new();
        let mut fitting: Vec<Span> = Vec::new();

        for piece in pieces(segment, separator) {
            let piece = (piece.0 + span.0, piece.1 + span.0);

            if char_len(&text[piece.0..piece.1]) < self.config.chunk_size {
                fitting.push(piece);
                continue;
            }

            if !fitting.is_empty() {
                output.extend(self.merge(text, &fitting));
                fitting.clear();
            }

            if finer.is_empty() {
                output.extend(trim_span(text, piece));
            } else {
                output.extend(self.split_recursive(text, piece, finer));
            }
        }

        if !fitting.is_empty() {
            output.extend(self.merge(text, &fitting));
        }

        output
    }

    /// Greedily grow a window of consecutive pieces up to `chunk_size`,
    /// carrying up to `chunk_overlap` characters of trailing pieces into the
    /// next window. Sizes are measured on the source text between the first
    /// and last piece, separators included.
    fn merge(&self, text: &str, pieces: &[Span]) -> Vec<Span> {
        let size = self.config.chunk_size;
        let overlap = self.config.chunk_overlap;
        let width = |start: usize, end: usize| char_len(&text[start..end]);

        let mut chunks = Vec::new();
        let mut window: VecDeque<Span> = VecDeque::new();

        for &piece in pieces {
            if let (Some(&first), Some(&last)) = (window.front(), window.back()) {
                if width(first.0, piece.1) > size {
                    chunks.extend(trim_span(text, (first.0, last.1)));

                    while let (Some(&first), Some(&last)) = (window.front(), window.back()) {
                        if width(first.0, last.1) <= overlap && width(first.0, piece.1) <= size {
                            break;
                        }
                        window.pop_front();
                    }
                }
            }

            window.push_back(piece);
        }

        if let (Some(&first), Some(&last)) = (window.front(), window.back()) {
            chunks.extend(trim_span(text, (first.0, last.1)));
        }
        chunks
    }
}

/// `[start, end)` byte range in the document text.
type Span = (usize, usize);

/// Non-empty pieces of `segment` between occurrences of `separator`,
/// relative to `segment`. The empty separator yields single characters.
fn pieces(segment: &str, separator: &str) -> Vec<Span> {
    if separator.is_empty() {
        return segment
            .char_indices()
            .map(|(i, c)| (i, i + c.len_utf8()))
            .collect();
    }

    let mut spans = Vec::new();
    let mut start = 0;
    for (i, _) in segment.match_indices(separator) {
        if i > start {
            spans.push((start, i));
        }
        start = i + separator.len();
    }
    if start < segment.len() {
        spans.push((start, segment.len()));
    }
    spans
}

/// Shrink a span to exclude surrounding whitespace; `None` if nothing is left.
fn trim_span(text: &str, (start, end): Span) -> Option<Span> {
    let slice = &text[start..end];
    let lead = slice.len() - slice.trim_start().len();
    let trail = slice.len() - slice.trim_end().len();
    (lead + trail < slice.len()).then_some((start + lead, end - trail))
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_chunker(size: usize, overlap: usize) -> Chunker {
        Chunker::new(ChunkerConfig {
            chunk_size: size,
            chunk_overlap: overlap,
        })
        .unwrap()
    }

    fn split_text(chunker: &Chunker, text: &str) -> Vec<String> {
        chunker
            .chunk_text("doc", text, "srs.txt")
            .into_iter()
            .map(|c| c.text)
            .collect()
    }

    #[test]
    fn test_basic_chunking() {
        let chunker = Chunker::new(ChunkerConfig::default()).unwrap();
        let text = "This is a test paragraph.\n\nThis is another paragraph.";
        let chunks = chunker.chunk_text("test-doc", text, "test.txt");

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].doc_id, "test-doc");
        assert_eq!(chunks[0].text, "This is a test paragraph.\n\nThis is another paragraph.");
        assert_eq!(chunks[0].offset, (0, text.len()));
    }

    #[test]
    fn test_empty_text_has_no_chunks() {
        let chunker = Chunker::new(ChunkerConfig::default()).unwrap();
        assert!(chunker.chunk_text("doc", "", "empty.txt").is_empty());
        assert!(chunker.chunk_text("doc", "  \n\n \n", "blank.txt").is_empty());
    }

    #[test]
    fn test_chunks_respect_size() {
        let chunker = small_chunker(40, 10);
        let text = "The system shall allow users to register with an email address. \
                    The system shall send a confirmation email.\n\n\
                    Administrators can deactivate accounts. Deactivated users cannot log in.";

        let chunks = split_text(&chunker, text);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 40, "chunk too long: {chunk:?}");
            assert!(!chunk.is_empty());
        }
    }

    #[test]
    fn test_consecutive_chunks_overlap() {
        let chunker = small_chunker(20, 8);
        let text = "one two three four five six seven eight nine ten";

        let chunks = split_text(&chunker, text);
        assert!(chunks.len() > 1);
        for pair in chunks.windows(2) {
            let last_word = pair[0].split_whitespace().last().unwrap();
            assert!(
                pair[1].starts_with(last_word),
                "expected {:?} to carry over into {:?}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn test_long_word_falls_back_to_characters() {
        let chunker = small_chunker(10, 2);
        let text = "a".repeat(25);

        let chunks = split_text(&chunker, &text);
        assert!(chunks.iter().all(|c| c.chars().count() <= 10));
        assert!(chunks.len() >= 3);
    }

    #[test]
    fn test_offsets_point_into_document() {
        let chunker = small_chunker(30, 5);
        let text = "First requirement here.\nSecond requirement here.\nThird requirement here.";

        for chunk in chunker.chunk_text("doc", text, "srs.txt") {
            let (start, end) = chunk.offset;
            assert_eq!(&text[start..end], chunk.text);
        }
    }

    #[test]
    fn test_offsets_survive_repeated_separators() {
        let text = "Req one.\n\n\n\nReq two.";

        let whole = Chunker::new(ChunkerConfig::default()).unwrap().chunk_text("doc", text, "srs.txt");
        assert_eq!(whole.len(), 1);
        assert_eq!(whole[0].text, text);
        assert_eq!(whole[0].offset, (0, text.len()));

        let split = small_chunker(10, 0).chunk_text("doc", text, "srs.txt");
        let texts: Vec<&str> = split.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["Req one.", "Req two."]);
        assert_eq!(split[1].offset, (12, 20));
    }

    #[test]
    fn test_offsets_with_blank_lines_and_multibyte() {
        let chunker = small_chunker(24, 6);
        let text = "  Données utilisateur.\n\n\n  Connexion sécurisée requise.\n \nÉtape   finale    du flux.  ";

        let chunks = chunker.chunk_text("doc", text, "srs.txt");
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            let (start, end) = chunk.offset;
            assert_eq!(&text[start..end], chunk.text);
            assert!(chunk.char_len() <= 24);
            assert_eq!(chunk.text.trim(), chunk.text);
        }
    }

    #[test]
    fn test_multibyte_text() {
        let chunker = small_chunker(5, 1);
        let text = "ééééééééééé";
        let chunks = chunker.chunk_text("doc", text, "utf8.txt");
        assert!(chunks.iter().all(|c| c.char_len() <= 5));
    }

    #[test]
    fn test_invalid_config() {
        let err = Chunker::new(ChunkerConfig {
            chunk_size: 100,
            chunk_overlap: 100,
        })
        .err()
        .unwrap();
        assert!(matches!(err, IngestError::InvalidChunking { size: 100, overlap: 100 }));
        assert!(Chunker::new(ChunkerConfig { chunk_size: 0, chunk_overlap: 0 }).is_err());
    }
}
