//! Import command implementation

use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use medtext_docstore::{
    DocumentStoreBuilder, DocumentStoreOptions, DocumentStoreSummary, IndexDetails,
    InMemoryVocabulary, PositionRange, StringPerDocumentWriter, TermDocumentFrequencyOptions,
    TermDocumentFrequencySummary, TermDocumentFrequencyWriter, TermIndex, Vocabulary,
};

use crate::utils;

/// Name of the string store holding the start of each document.
pub const TITLES: &str = "titles";
const TITLE_LENGTH: usize = 80;

#[derive(Args, Debug, Clone)]
pub struct ImportArgs {
    /// Basename of the index files to create
    #[arg(long)]
    pub basename: String,

    /// Record the character ranges of the tokens
    #[arg(long)]
    pub positions: bool,

    /// Renumber terms by document frequency before coding
    #[arg(long)]
    pub optimize: bool,

    /// Lines start with a numeric PMID followed by a tab
    #[arg(long)]
    pub pmids: bool,

    /// Drop terms occurring in at most this share of documents
    #[arg(long, default_value_t = 0.0)]
    pub min_df_ratio: f64,

    /// Drop terms occurring in more than this share of documents
    #[arg(long, default_value_t = 1.0)]
    pub max_df_ratio: f64,

    /// Do not store in-document counts at or below this value
    #[arg(long, default_value_t = 0)]
    pub min_support: u32,

    /// Text file with one document per line
    pub file: String,
}

#[derive(Debug, Serialize)]
pub struct ImportSummary {
    pub basename: PathBuf,
    pub number_of_terms: u32,
    pub docstore: DocumentStoreSummary,
    pub term_document_frequencies: TermDocumentFrequencySummary,
    pub titles: u32,
}

struct Line {
    pmid: Option<i32>,
    text: String,
}

/// Run the import command
pub fn run(args: &ImportArgs) -> Result<ImportSummary> {
    utils::validate_file_exists(&args.file)?;
    let lines = read_lines(args)?;
    let number_of_documents = u32::try_from(lines.len())
        .with_context(|| format!("{} holds too many documents", args.file))?;
    tracing::info!("importing {number_of_documents} documents from {}", args.file);

    let basename = PathBuf::from(&args.basename);
    let mut tokenized = Vec::with_capacity(lines.len());
    for line in &lines {
        tokenized.push(utils::tokenize(&line.text));
    }
    let (vocabulary, documents) =
        InMemoryVocabulary::from_documents(&basename, tokenized.iter().map(|t| &t.words));
    vocabulary
        .save()
        .with_context(|| "Failed to save the vocabulary")?;

    let mut options = DocumentStoreOptions::default();
    if args.positions {
        options = options.with_positions();
    }
    if args.pmids {
        options = options.with_pmid_capacity(number_of_documents);
    }
    let docstore = write_docstore(
        &basename,
        &vocabulary,
        &documents,
        &tokenized.iter().map(|t| t.ranges.as_slice()).collect::<Vec<_>>(),
        &lines,
        options.clone(),
        args.optimize,
    )?;

    let tdf_options = TermDocumentFrequencyOptions::default()
        .with_band(args.min_df_ratio, args.max_df_ratio)
        .with_minimum_frequency_support(args.min_support);
    let mut tdf = TermDocumentFrequencyWriter::new(
        &basename,
        &vocabulary,
        number_of_documents,
        tdf_options.clone(),
    )
    .with_context(|| "Failed to create the term document frequency store")?;
    for (index, tokens) in documents.iter().enumerate() {
        tdf.append_document(index as u32, tokens)?;
    }
    let term_document_frequencies = tdf.close()?;

    let mut titles = StringPerDocumentWriter::create(&basename, TITLES)?;
    for (index, line) in lines.iter().enumerate() {
        titles.append(index as u32, utils::truncate_chars(&line.text, TITLE_LENGTH))?;
    }
    let titles = titles.close()?;

    let mut details =
        IndexDetails::new(&basename, number_of_documents, vocabulary.number_of_terms());
    details.docstore = options;
    details.term_document_frequencies = tdf_options;
    details
        .to_json_file(&IndexDetails::path_for(&basename))
        .with_context(|| "Failed to save the index details")?;

    Ok(ImportSummary {
        basename,
        number_of_terms: vocabulary.number_of_terms(),
        docstore,
        term_document_frequencies,
        titles,
    })
}

fn read_lines(args: &ImportArgs) -> Result<Vec<Line>> {
    let file = File::open(&args.file).with_context(|| format!("Failed to open {}", args.file))?;
    let mut lines = Vec::new();
    for (number, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read {}", args.file))?;
        if !args.pmids {
            lines.push(Line {
                pmid: None,
                text: line,
            });
            continue;
        }
        let (pmid, text) = line.split_once('\t').unwrap_or((line.as_str(), ""));
        let pmid = pmid
            .trim()
            .parse::<i32>()
            .with_context(|| format!("{}:{}: invalid PMID '{pmid}'", args.file, number + 1))?;
        lines.push(Line {
            pmid: Some(pmid),
            text: text.to_string(),
        });
    }
    Ok(lines)
}

fn write_docstore(
    basename: &Path,
    vocabulary: &InMemoryVocabulary,
    documents: &[Vec<TermIndex>],
    ranges: &[&[PositionRange]],
    lines: &[Line],
    options: DocumentStoreOptions,
    optimize: bool,
) -> Result<DocumentStoreSummary> {
    let mut builder = DocumentStoreBuilder::new(basename, vocabulary.number_of_terms(), options);
    if optimize {
        builder = builder.optimize_term_ordering(vocabulary)?;
    }
    let mut writer = builder
        .build()
        .with_context(|| "Failed to create the document store")?;
    for (index, tokens) in documents.iter().enumerate() {
        writer.append_document(index as u32, tokens)?;
        writer.append_positions(index as u32, ranges[index])?;
        if let Some(pmid) = lines[index].pmid {
            writer.set_pmid(index as u32, pmid)?;
        }
    }
    Ok(writer.close()?)
}

#[cfg(test)]
mod tests {
    use medtext_docstore::{
        DocumentStoreReader, DocumentStoreReaderOptions, StringPerDocumentReader,
        TermDocumentFrequencyReader,
    };
    use medtext_testkit::{
        data_gen::{CorpusSpec, generate_lines, write_lines_file},
        dirs::{TempBasename, get_sample_abstracts_path},
    };

    use super::*;

    fn import_args(basename: &TempBasename, file: &str) -> ImportArgs {
        ImportArgs {
            basename: basename.path().display().to_string(),
            positions: true,
            optimize: true,
            pmids: true,
            min_df_ratio: 0.0,
            max_df_ratio: 1.0,
            min_support: 0,
            file: file.to_string(),
        }
    }

    #[test]
    fn test_import_sample_abstracts() {
        let basename = TempBasename::new("abstracts").unwrap();
        let sample = get_sample_abstracts_path().unwrap();
        let summary = run(&import_args(&basename, &sample.display().to_string())).unwrap();
        assert_eq!(summary.docstore.number_of_documents, 12);
        assert_eq!(summary.titles, 12);
        assert!(summary.docstore.optimized);
        assert!(summary.docstore.pmids);

        let mut reader =
            DocumentStoreReader::open(basename.path(), DocumentStoreReaderOptions::default())
                .unwrap();
        let vocabulary = InMemoryVocabulary::load(basename.path()).unwrap();
        assert_eq!(
            reader.document_text(1, &vocabulary).unwrap(),
            "metformin reduces hepatic glucose production in patients with type 2 diabetes"
        );
        assert!(reader.document(3).unwrap().is_empty());
        assert!(reader.read_pmids().unwrap());
        assert_eq!(reader.pmid(8).unwrap(), Some(31452190));
        assert_eq!(reader.document_number(31452229).unwrap(), Some(11));
        let ranges = reader.positions(0).unwrap().unwrap();
        assert_eq!(ranges[0], PositionRange::new(0, 9));

        let titles = StringPerDocumentReader::open(basename.path(), TITLES).unwrap();
        assert_eq!(
            titles.get(11).unwrap().as_deref(),
            Some("Übersicht: Metformin und Krebsrisiko bei Diabetes.")
        );

        let mut tdf =
            TermDocumentFrequencyReader::open(basename.path(), vocabulary.number_of_terms(), 4)
                .unwrap();
        let mut frequencies = vec![0u32; vocabulary.number_of_terms() as usize];
        let sum = tdf.frequencies(8, &mut frequencies).unwrap();
        let p53 = vocabulary.term_index("p53").known().unwrap();
        assert_eq!(frequencies[p53 as usize], 1);
        assert_eq!(sum, reader.document_length(8).unwrap() as u64);
    }

    #[test]
    fn test_import_generated_lines() {
        let basename = TempBasename::new("generated").unwrap();
        let lines = generate_lines(&CorpusSpec {
            documents: 120,
            ..Default::default()
        });
        let file = write_lines_file(&lines).unwrap();
        let mut args = import_args(&basename, &file.path().display().to_string());
        args.pmids = false;
        args.max_df_ratio = 0.5;
        let summary = run(&args).unwrap();
        assert_eq!(summary.docstore.number_of_documents, 120);
        assert!(summary.term_document_frequencies.tracked_terms < summary.number_of_terms);
        assert!(!summary.docstore.pmids);
    }

    #[test]
    fn test_invalid_pmid() {
        let basename = TempBasename::new("bad").unwrap();
        let file = write_lines_file(&["abc\tsome text".to_string()]).unwrap();
        let args = import_args(&basename, &file.path().display().to_string());
        let err = run(&args).unwrap_err();
        assert!(format!("{err:#}").contains("invalid PMID"));
    }
}
