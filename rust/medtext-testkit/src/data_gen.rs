//! Synthetic corpora for tests.
//!
//! Term `n` of a generated vocabulary is always the same word, and term
//! choice is skewed towards small `n`, which gives the document frequency
//! spread real text has. The same seed always yields the same corpus.

use std::io::{Seek, SeekFrom, Write};

const SYLLABLES: [&str; 16] = [
    "ka", "lo", "mi", "ne", "pro", "ti", "su", "ra", "gen", "cy", "to", "lin", "ase", "mo", "ve",
    "xo",
];

/// The word of term `n`: distinct for distinct `n`.
pub fn term_word(n: usize) -> String {
    let mut word = String::new();
    let mut rest = n;
    loop {
        word.push_str(SYLLABLES[rest % SYLLABLES.len()]);
        rest /= SYLLABLES.len();
        if rest == 0 {
            break;
        }
        rest -= 1;
    }
    word
}

/// Parameters of a generated corpus.
#[derive(Debug, Clone)]
pub struct CorpusSpec {
    pub seed: u64,
    pub documents: usize,
    pub vocabulary_size: usize,
    pub max_document_length: usize,
    /// Share of documents, in percent, that are left empty.
    pub empty_percent: u8,
}

impl Default for CorpusSpec {
    fn default() -> CorpusSpec {
        CorpusSpec {
            seed: 0x6d74,
            documents: 200,
            vocabulary_size: 500,
            max_document_length: 60,
            empty_percent: 5,
        }
    }
}

/// Generates tokenized documents.
pub fn generate_documents(spec: &CorpusSpec) -> Vec<Vec<String>> {
    assert_ne!(spec.vocabulary_size, 0);
    let mut rng = fastrand::Rng::with_seed(spec.seed);
    (0..spec.documents)
        .map(|_| {
            if rng.u8(..100) < spec.empty_percent {
                return Vec::new();
            }
            let length = rng.usize(1..=spec.max_document_length.max(1));
            (0..length)
                .map(|_| term_word(skewed_term(&mut rng, spec.vocabulary_size)))
                .collect()
        })
        .collect()
}

/// Generates one line of text per document: the tokens of
/// [`generate_documents`] with capitals, punctuation and runs of spaces
/// mixed in.
pub fn generate_lines(spec: &CorpusSpec) -> Vec<String> {
    let mut rng = fastrand::Rng::with_seed(spec.seed ^ 0x5eed);
    generate_documents(spec)
        .into_iter()
        .map(|tokens| {
            let mut line = String::new();
            for (i, token) in tokens.iter().enumerate() {
                if i > 0 {
                    line.push_str(if rng.u8(..10) == 0 { "  " } else { " " });
                }
                if rng.u8(..8) == 0 {
                    let mut chars = token.chars();
                    if let Some(first) = chars.next() {
                        line.extend(first.to_uppercase());
                        line.push_str(chars.as_str());
                    }
                } else {
                    line.push_str(token);
                }
                match rng.u8(..20) {
                    0 => line.push(','),
                    1 => line.push('.'),
                    _ => {}
                }
            }
            line
        })
        .collect()
}

/// Writes `lines` to a temporary file, positioned at its start.
pub fn write_lines_file(lines: &[String]) -> anyhow::Result<tempfile::NamedTempFile> {
    let mut file = tempfile::NamedTempFile::new()?;
    for line in lines {
        writeln!(file, "{line}")?;
    }
    file.flush()?;
    file.seek(SeekFrom::Start(0))?;
    Ok(file)
}

fn skewed_term(rng: &mut fastrand::Rng, vocabulary_size: usize) -> usize {
    let r = rng.f64();
    ((r * r * r) * vocabulary_size as f64) as usize % vocabulary_size
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_term_words_distinct() {
        let words: HashSet<String> = (0..2000).map(term_word).collect();
        assert_eq!(words.len(), 2000);
        assert_eq!(term_word(0), "ka");
        assert_eq!(term_word(16), "kaka");
    }

    #[test]
    fn test_generate_documents_deterministic() {
        let spec = CorpusSpec {
            documents: 50,
            ..Default::default()
        };
        let a = generate_documents(&spec);
        let b = generate_documents(&spec);
        assert_eq!(a, b);
        assert_eq!(a.len(), 50);
        assert!(a.iter().all(|d| d.len() <= spec.max_document_length));
    }

    #[test]
    fn test_skew() {
        let spec = CorpusSpec {
            documents: 300,
            empty_percent: 0,
            ..Default::default()
        };
        let documents = generate_documents(&spec);
        let first = term_word(0);
        let last = term_word(spec.vocabulary_size - 1);
        let count = |word: &str| {
            documents
                .iter()
                .flatten()
                .filter(|t| t.as_str() == word)
                .count()
        };
        assert!(count(&first) > count(&last));
    }

    #[test]
    fn test_write_lines_file() {
        let lines = generate_lines(&CorpusSpec {
            documents: 10,
            ..Default::default()
        });
        let file = write_lines_file(&lines).unwrap();
        let text = std::fs::read_to_string(file.path()).unwrap();
        assert_eq!(text.lines().count(), 10);
    }
}
