use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub struct ChunkerConfig {
    /// Upper bound on chunk length in characters; kept below the embedding
    /// service input limit.
    pub max_chunk_chars: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_chunk_chars: 2000,
        }
    }
}

/// A contiguous slice of the corpus, the unit of retrieval. Ids are 0-based
/// and sequential in corpus order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: u64,
    pub text: String,
}

/// Splits a corpus into retrieval chunks.
///
/// Paragraphs (blank-line separated) are the primary unit; a paragraph longer
/// than the limit is split at sentence boundaries, and a single oversized
/// sentence is hard-split. Chunks never overlap, so concatenating them
/// reconstructs the corpus modulo whitespace, and the same input always
/// produces the same boundaries.
pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    #[must_use]
    pub fn new(config: ChunkerConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn chunk(&self, source: &str) -> Vec<Chunk> {
        let mut texts = Vec::new();
        for paragraph in split_paragraphs(source) {
            if paragraph.chars().count() <= self.config.max_chunk_chars {
                texts.push(paragraph);
            } else {
                let sentences = split_sentences(&paragraph);
                texts.extend(merge_sentences(&sentences, self.config.max_chunk_chars));
            }
        }

        texts
            .into_iter()
            .enumerate()
            .map(|(i, text)| Chunk { id: i as u64, text })
            .collect()
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new(ChunkerConfig::default())
    }
}

fn split_paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current = String::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.trim().is_empty() {
                paragraphs.push(std::mem::take(&mut current).trim().to_owned());
            }
        } else {
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(line);
        }
    }
    if !current.trim().is_empty() {
        paragraphs.push(current.trim().to_owned());
    }

    paragraphs
}

fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();

    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        current.push(chars[i]);
        if (chars[i] == '.' || chars[i] == '?' || chars[i] == '!')
            && i + 1 < chars.len()
            && chars[i + 1] == ' '
            && !current.trim().is_empty()
        {
            sentences.push(std::mem::take(&mut current));
        }
        i += 1;
    }
    if !current.trim().is_empty() {
        sentences.push(current);
    }

    sentences
}

/// Merge sentences into chunks up to `max_chars`, hard-splitting any single
/// sentence that exceeds the limit on its own.
fn merge_sentences(sentences: &[String], max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for sentence in sentences {
        let sentence_len = sentence.chars().count();

        if sentence_len > max_chars {
            if !current.trim().is_empty() {
                chunks.push(std::mem::take(&mut current).trim().to_owned());
            }
            current_len = 0;
            chunks.extend(split_chars(sentence, max_chars));
            continue;
        }

        if current_len + sentence_len > max_chars && !current.trim().is_empty() {
            chunks.push(std::mem::take(&mut current).trim().to_owned());
            current_len = 0;
        }

        current.push_str(sentence);
        current_len += sentence_len;
    }

    if !current.trim().is_empty() {
        chunks.push(current.trim().to_owned());
    }

    chunks
}

fn split_chars(text: &str, max_chars: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(max_chars.max(1))
        .map(|piece| piece.iter().collect::<String>().trim().to_owned())
        .filter(|piece| !piece.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalized(text: &str) -> String {
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn empty_source_yields_no_chunks() {
        let chunker = Chunker::default();
        assert!(chunker.chunk("").is_empty());
        assert!(chunker.chunk("   \n\n  ").is_empty());
    }

    #[test]
    fn single_paragraph_is_one_chunk() {
        let chunker = Chunker::default();
        let chunks = chunker.chunk("Alice ate a cake and became a slime.");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].id, 0);
        assert_eq!(chunks[0].text, "Alice ate a cake and became a slime.");
    }

    #[test]
    fn paragraphs_split_on_blank_lines() {
        let chunker = Chunker::default();
        let chunks = chunker
            .chunk("Alice ate a cake and became a slime.\n\nThe slime rated the cake five stars.");
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "Alice ate a cake and became a slime.");
        assert_eq!(chunks[1].text, "The slime rated the cake five stars.");
    }

    #[test]
    fn multiple_blank_lines_collapse() {
        let chunker = Chunker::default();
        let chunks = chunker.chunk("First.\n\n\n\nSecond.");
        assert_eq!(chunks.len(), 2);
    }

    #[test]
    fn ids_are_sequential_from_zero() {
        let chunker = Chunker::default();
        let chunks = chunker.chunk("One.\n\nTwo.\n\nThree.");
        let ids: Vec<u64> = chunks.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn chunking_is_idempotent() {
        let source = "A paragraph here.\n\nAnother one. With two sentences.\n\nLast.";
        let chunker = Chunker::default();
        assert_eq!(chunker.chunk(source), chunker.chunk(source));
    }

    #[test]
    fn oversized_paragraph_splits_at_sentences() {
        let source = "First sentence here. Second sentence here. Third sentence here.";
        let chunker = Chunker::new(ChunkerConfig {
            max_chunk_chars: 25,
        });
        let chunks = chunker.chunk(source);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.text.chars().count() <= 25);
            assert!(!chunk.text.is_empty());
        }
    }

    #[test]
    fn oversized_sentence_is_hard_split() {
        let source = "a".repeat(50);
        let chunker = Chunker::new(ChunkerConfig {
            max_chunk_chars: 20,
        });
        let chunks = chunker.chunk(&source);
        assert_eq!(chunks.len(), 3);
        assert_eq!(normalized(&chunks.iter().map(|c| c.text.clone()).collect::<Vec<_>>().join("")), source);
    }

    #[test]
    fn concatenation_reconstructs_source_modulo_whitespace() {
        let source = "Alice ate a cake\nand became a slime.\n\nThe slime rated\nthe cake five stars.\n";
        let chunker = Chunker::default();
        let chunks = chunker.chunk(source);
        let joined = chunks
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        assert_eq!(normalized(&joined), normalized(source));
    }

    mod proptest_chunker {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(500))]

            #[test]
            fn chunk_never_panics(
                source in "\\PC{0,2000}",
                max_chars in 1usize..500,
            ) {
                let chunker = Chunker::new(ChunkerConfig { max_chunk_chars: max_chars });
                let _ = chunker.chunk(&source);
            }

            #[test]
            fn chunks_are_non_empty_and_ids_sequential(
                source in "[a-z. \n]{0,1000}",
                max_chars in 5usize..200,
            ) {
                let chunker = Chunker::new(ChunkerConfig { max_chunk_chars: max_chars });
                let chunks = chunker.chunk(&source);
                for (i, chunk) in chunks.iter().enumerate() {
                    prop_assert!(!chunk.text.trim().is_empty());
                    prop_assert_eq!(chunk.id, i as u64);
                }
            }

            #[test]
            fn reconstruction_modulo_whitespace(
                source in "[a-zA-Z,. \n]{0,1000}",
            ) {
                let chunker = Chunker::default();
                let chunks = chunker.chunk(&source);
                let joined = chunks
                    .iter()
                    .map(|c| c.text.as_str())
                    .collect::<Vec<_>>()
                    .join(" ");
                prop_assert_eq!(normalized(&joined), normalized(&source));
            }

            #[test]
            fn chunks_respect_length_limit(
                source in "[a-z. ]{0,800}",
                max_chars in 10usize..100,
            ) {
                let chunker = Chunker::new(ChunkerConfig { max_chunk_chars: max_chars });
                for chunk in chunker.chunk(&source) {
                    prop_assert!(chunk.text.chars().count() <= max_chars);
                }
            }
        }
    }
}
