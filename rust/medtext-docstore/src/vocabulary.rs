//! The boundary with the upstream vocabulary (global term → integer index).

use std::{
    borrow::Cow,
    path::{Path, PathBuf},
};

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use medtext_common::{Result, error::Error};

use crate::format::{VOCABULARY_SUFFIX, path_with_suffix};

/// Serialized form of a term outside the tracked vocabulary.
pub const NO_SUCH_TERM: i32 = -1;

/// A token of a stored document: either a term of the vocabulary or a word the
/// vocabulary does not know.
///
/// The `-1` sentinel of the serialized formats never crosses the public API;
/// use [`TermIndex::from_raw`] / [`TermIndex::to_raw`] at that boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TermIndex {
    Known(u32),
    Unknown,
}

impl TermIndex {
    /// Interprets a serialized index; every negative value is [`TermIndex::Unknown`].
    #[inline]
    pub fn from_raw(raw: i32) -> TermIndex {
        if raw < 0 {
            TermIndex::Unknown
        } else {
            TermIndex::Known(raw as u32)
        }
    }

    /// Serialized form: the term index, or [`NO_SUCH_TERM`].
    #[inline]
    pub fn to_raw(self) -> i32 {
        match self {
            TermIndex::Known(term) => {
                debug_assert!(term <= i32::MAX as u32);
                term as i32
            }
            TermIndex::Unknown => NO_SUCH_TERM,
        }
    }

    #[inline]
    pub fn known(self) -> Option<u32> {
        match self {
            TermIndex::Known(term) => Some(term),
            TermIndex::Unknown => None,
        }
    }

    #[inline]
    pub fn is_known(self) -> bool {
        matches!(self, TermIndex::Known(_))
    }
}

impl From<u32> for TermIndex {
    fn from(term: u32) -> Self {
        TermIndex::Known(term)
    }
}

impl From<Option<u32>> for TermIndex {
    fn from(term: Option<u32>) -> Self {
        term.map_or(TermIndex::Unknown, TermIndex::Known)
    }
}

/// Read access to the vocabulary of the inverted index the stores sit beside.
pub trait Vocabulary {
    /// Basename shared by the index files.
    fn basename(&self) -> &Path;

    /// Number of terms; valid term indices are `0..number_of_terms()`.
    fn number_of_terms(&self) -> u32;

    /// Number of documents containing `term`.
    fn document_frequency(&self, term: u32) -> Result<u32>;

    /// Textual form of `term`, if it is in the vocabulary.
    fn term_as_string(&self, term: u32) -> Option<Cow<'_, str>>;
}

#[derive(Serialize, Deserialize)]
struct VocabularyFile {
    number_of_documents: u32,
    terms: Vec<String>,
    document_frequencies: Vec<u32>,
}

/// A vocabulary held in memory, built by interning tokenized documents.
///
/// Used by the batch tools to produce a vocabulary alongside the stores, and
/// persisted as `<basename>-vocabulary.json`.
#[derive(Debug, Clone)]
pub struct InMemoryVocabulary {
    basename: PathBuf,
    terms: Vec<String>,
    document_frequencies: Vec<u32>,
    lookup: AHashMap<String, u32>,
    number_of_documents: u32,
}

impl InMemoryVocabulary {
    pub fn new(basename: impl Into<PathBuf>) -> InMemoryVocabulary {
        InMemoryVocabulary {
            basename: basename.into(),
            terms: Vec::new(),
            document_frequencies: Vec::new(),
            lookup: AHashMap::new(),
            number_of_documents: 0,
        }
    }

    /// Builds a vocabulary from explicit terms and their document frequencies.
    pub fn with_terms(
        basename: impl Into<PathBuf>,
        terms: Vec<String>,
        document_frequencies: Vec<u32>,
        number_of_documents: u32,
    ) -> Result<InMemoryVocabulary> {
        if terms.len() != document_frequencies.len() {
            return Err(Error::invalid_arg(
                "document_frequencies",
                format!(
                    "{} frequencies for {} terms",
                    document_frequencies.len(),
                    terms.len()
                ),
            ));
        }
        let mut lookup = AHashMap::with_capacity(terms.len());
        for (index, term) in terms.iter().enumerate() {
            if lookup.insert(term.clone(), index as u32).is_some() {
                return Err(Error::invalid_arg("terms", format!("duplicate term '{term}'")));
            }
        }
        Ok(InMemoryVocabulary {
            basename: basename.into(),
            terms,
            document_frequencies,
            lookup,
            number_of_documents,
        })
    }

    /// Builds a vocabulary from tokenized documents; returns it together with
    /// the documents as term indices.
    pub fn from_documents<D, S>(
        basename: impl Into<PathBuf>,
        documents: impl IntoIterator<Item = D>,
    ) -> (InMemoryVocabulary, Vec<Vec<TermIndex>>)
    where
        D: AsRef<[S]>,
        S: AsRef<str>,
    {
        let mut vocabulary = InMemoryVocabulary::new(basename);
        let documents = documents
            .into_iter()
            .map(|tokens| vocabulary.intern_document(tokens.as_ref()))
            .collect();
        (vocabulary, documents)
    }

    /// Interns the tokens of one document, counting each distinct term once
    /// towards its document frequency. Returns the document as term indices.
    pub fn intern_document<S: AsRef<str>>(&mut self, tokens: &[S]) -> Vec<TermIndex> {
        let mut seen = ahash::AHashSet::new();
        let mut document = Vec::with_capacity(tokens.len());
        for token in tokens {
            let term = self.intern(token.as_ref());
            if seen.insert(term) {
                self.document_frequencies[term as usize] += 1;
            }
            document.push(TermIndex::Known(term));
        }
        self.number_of_documents += 1;
        document
    }

    fn intern(&mut self, token: &str) -> u32 {
        if let Some(&term) = self.lookup.get(token) {
            return term;
        }
        let term = self.terms.len() as u32;
        self.terms.push(token.to_string());
        self.document_frequencies.push(0);
        self.lookup.insert(token.to_string(), term);
        term
    }

    pub fn term_index(&self, token: &str) -> TermIndex {
        self.lookup.get(token).copied().into()
    }

    /// Maps tokens to term indices without extending the vocabulary.
    pub fn lookup_document<S: AsRef<str>>(&self, tokens: &[S]) -> Vec<TermIndex> {
        tokens.iter().map(|t| self.term_index(t.as_ref())).collect()
    }

    pub fn number_of_documents(&self) -> u32 {
        self.number_of_documents
    }

    pub fn path(&self) -> PathBuf {
        path_with_suffix(&self.basename, VOCABULARY_SUFFIX)
    }

    pub fn save(&self) -> Result<()> {
        let file = VocabularyFile {
            number_of_documents: self.number_of_documents,
            terms: self.terms.clone(),
            document_frequencies: self.document_frequencies.clone(),
        };
        let path = self.path();
        let json = serde_json::to_vec(&file).map_err(|e| Error::other("vocabulary", e))?;
        std::fs::write(&path, json).map_err(|e| Error::io(path.display().to_string(), e))?;
        log::debug!("saved {} terms to {}", self.terms.len(), path.display());
        Ok(())
    }

    pub fn load(basename: impl Into<PathBuf>) -> Result<InMemoryVocabulary> {
        let basename = basename.into();
        let path = path_with_suffix(&basename, VOCABULARY_SUFFIX);
        let json =
            std::fs::read(&path).map_err(|e| Error::io(path.display().to_string(), e))?;
        let file: VocabularyFile = serde_json::from_slice(&json)
            .map_err(|e| Error::invalid_format(path.display().to_string(), e.to_string()))?;
        Self::with_terms(
            basename,
            file.terms,
            file.document_frequencies,
            file.number_of_documents,
        )
    }
}

impl Vocabulary for InMemoryVocabulary {
    fn basename(&self) -> &Path {
        &self.basename
    }

    fn number_of_terms(&self) -> u32 {
        self.terms.len() as u32
    }

    fn document_frequency(&self, term: u32) -> Result<u32> {
        self.document_frequencies
            .get(term as usize)
            .copied()
            .ok_or_else(|| {
                Error::invalid_arg(
                    "term",
                    format!("{term} outside vocabulary of {}", self.terms.len()),
                )
            })
    }

    fn term_as_string(&self, term: u32) -> Option<Cow<'_, str>> {
        self.terms.get(term as usize).map(|t| Cow::Borrowed(t.as_str()))
    }
}
