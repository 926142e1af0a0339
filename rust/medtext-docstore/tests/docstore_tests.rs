use medtext_common::error::ErrorKind;
use medtext_docstore::{
    Coding, DocumentStoreBuilder, DocumentStoreOptions, DocumentStoreReader,
    DocumentStoreReaderOptions, InMemoryVocabulary, IndexDetails, PositionRange, TermIndex,
    Vocabulary,
};
use medtext_testkit::{
    data_gen::{CorpusSpec, generate_documents},
    dirs::TempBasename,
};

fn known(terms: &[u32]) -> Vec<TermIndex> {
    terms.iter().map(|&t| TermIndex::Known(t)).collect()
}

fn open(basename: &TempBasename) -> DocumentStoreReader {
    DocumentStoreReader::open(basename.path(), DocumentStoreReaderOptions::default()).unwrap()
}

/// Writes the generated corpus, skipping empty documents so that gap filling
/// produces them.
fn write_corpus(
    basename: &TempBasename,
    spec: &CorpusSpec,
    options: DocumentStoreOptions,
    optimize: bool,
) -> (InMemoryVocabulary, Vec<Vec<TermIndex>>) {
    let corpus = generate_documents(spec);
    let (vocabulary, documents) = InMemoryVocabulary::from_documents(basename.path(), &corpus);
    let mut builder =
        DocumentStoreBuilder::new(basename.path(), vocabulary.number_of_terms(), options);
    if optimize {
        builder = builder.optimize_term_ordering(&vocabulary).unwrap();
    }
    let mut writer = builder.build().unwrap();
    for (index, tokens) in documents.iter().enumerate() {
        if !tokens.is_empty() {
            writer.append_document(index as u32, tokens).unwrap();
        }
    }
    let last = documents.iter().rposition(|d| !d.is_empty()).unwrap();
    let summary = writer.close().unwrap();
    assert_eq!(summary.number_of_documents as usize, last + 1);
    (vocabulary, documents)
}

#[test]
fn test_gaps_scenario() {
    let basename = TempBasename::new("gaps").unwrap();
    let mut writer = DocumentStoreBuilder::new(basename.path(), 5, DocumentStoreOptions::default())
        .build()
        .unwrap();
    writer.append_document(0, &known(&[2, 2, 0])).unwrap();
    writer.append_document(3, &known(&[1])).unwrap();
    assert_eq!(writer.number_of_documents(), 4);
    let summary = writer.close().unwrap();
    assert_eq!(summary.number_of_documents, 4);
    assert_eq!(summary.offsets, 5);

    let mut reader = open(&basename);
    assert_eq!(reader.number_of_documents(), 4);
    assert_eq!(reader.document(0).unwrap(), known(&[2, 2, 0]));
    assert!(reader.document(1).unwrap().is_empty());
    assert!(reader.document(2).unwrap().is_empty());
    assert_eq!(reader.document(3).unwrap(), known(&[1]));

    let mut frequencies = vec![0u32; 5];
    assert_eq!(reader.frequencies(0, &mut frequencies, None).unwrap(), 3);
    assert_eq!(frequencies, vec![1, 0, 2, 0, 0]);

    assert!(reader.document(4).is_err());
}

#[test]
fn test_round_trip_generated_corpus() {
    let basename = TempBasename::new("corpus").unwrap();
    let spec = CorpusSpec {
        documents: 300,
        empty_percent: 10,
        ..Default::default()
    };
    let (_, documents) = write_corpus(&basename, &spec, DocumentStoreOptions::default(), false);

    let mut reader = open(&basename);
    let mut tokens = Vec::new();
    for index in (0..reader.number_of_documents()).rev() {
        reader.document_into(index, &mut tokens).unwrap();
        assert_eq!(tokens, documents[index as usize], "document {index}");
    }
}

#[test]
fn test_offsets_monotonic() {
    let basename = TempBasename::new("corpus").unwrap();
    let spec = CorpusSpec {
        documents: 150,
        ..Default::default()
    };
    let (_, documents) = write_corpus(&basename, &spec, DocumentStoreOptions::default(), false);
    let last = documents.iter().rposition(|d| !d.is_empty()).unwrap();

    let reader = open(&basename);
    let offsets = reader.offsets().as_slice();
    assert_eq!(offsets.len(), last + 2);
    assert_eq!(offsets[0], 0);
    assert!(offsets.windows(2).all(|w| w[0] <= w[1]));
    for (index, document) in documents.iter().enumerate().take(last + 1) {
        assert_eq!(document.is_empty(), offsets[index] == offsets[index + 1]);
    }
}

#[test]
fn test_frequency_conservation() {
    let basename = TempBasename::new("corpus").unwrap();
    let spec = CorpusSpec {
        documents: 100,
        vocabulary_size: 80,
        ..Default::default()
    };
    let (vocabulary, _) = write_corpus(&basename, &spec, DocumentStoreOptions::default(), true);

    let mut reader = open(&basename);
    let terms = vocabulary.number_of_terms() as usize;
    let mut totals = vec![0u32; terms];
    let mut documents_per_term = vec![0u32; terms];
    for index in 0..reader.number_of_documents() {
        let mut frequencies = vec![0u32; terms];
        let sum = reader
            .frequencies(index, &mut frequencies, Some(documents_per_term.as_mut_slice()))
            .unwrap();
        assert_eq!(sum, reader.document_length(index).unwrap() as u64);
        assert_eq!(frequencies.iter().map(|&f| f as u64).sum::<u64>(), sum);
        for (total, f) in totals.iter_mut().zip(&frequencies) {
            *total += f;
        }
    }
    for term in 0..terms as u32 {
        assert_eq!(
            documents_per_term[term as usize],
            vocabulary.document_frequency(term).unwrap(),
            "term {term}"
        );
        assert!(totals[term as usize] >= documents_per_term[term as usize]);
    }
}

#[test]
fn test_optimization_preserves_content() {
    let plain = TempBasename::new("plain").unwrap();
    let optimized = TempBasename::new("optimized").unwrap();
    let spec = CorpusSpec {
        documents: 200,
        vocabulary_size: 1000,
        ..Default::default()
    };
    write_corpus(&plain, &spec, DocumentStoreOptions::default(), false);
    let (vocabulary, documents) =
        write_corpus(&optimized, &spec, DocumentStoreOptions::default(), true);

    let mut plain_reader = open(&plain);
    let mut optimized_reader = open(&optimized);
    assert!(!plain_reader.is_optimized());
    assert!(optimized_reader.is_optimized());
    for index in 0..plain_reader.number_of_documents() {
        let document = optimized_reader.document(index).unwrap();
        assert_eq!(document, plain_reader.document(index).unwrap());
        assert_eq!(document, documents[index as usize]);
    }

    // Frequent terms get short codewords.
    let plain_size = std::fs::metadata(plain.file("-docstore.docs")).unwrap().len();
    let optimized_size = std::fs::metadata(optimized.file("-docstore.docs")).unwrap().len();
    assert!(optimized_size <= plain_size);

    let permutation = optimized_reader.term_permutation().unwrap();
    let most_frequent = (0..vocabulary.number_of_terms())
        .max_by_key(|&t| (vocabulary.document_frequency(t).unwrap(), std::cmp::Reverse(t)))
        .unwrap();
    assert_eq!(permutation[most_frequent as usize], 0);
    assert!(plain_reader.term_permutation().is_none());
}

#[test]
fn test_unknown_words_and_text() {
    let basename = TempBasename::new("text").unwrap();
    let vocabulary = InMemoryVocabulary::with_terms(
        basename.path(),
        vec!["p53".into(), "loss".into(), "tumour".into()],
        vec![1, 1, 1],
        1,
    )
    .unwrap();
    let mut writer = DocumentStoreBuilder::new(basename.path(), 3, DocumentStoreOptions::default())
        .optimize_term_ordering(&vocabulary)
        .unwrap()
        .build()
        .unwrap();
    let document = vec![
        TermIndex::Known(1),
        TermIndex::Unknown,
        TermIndex::Known(0),
        TermIndex::Known(2),
    ];
    writer.append_document(0, &document).unwrap();
    writer.close().unwrap();

    let options = DocumentStoreReaderOptions {
        unknown_word: "???".to_string(),
        ..Default::default()
    };
    let mut reader = DocumentStoreReader::open(basename.path(), options).unwrap();
    assert_eq!(reader.document(0).unwrap(), document);
    assert_eq!(
        reader.document_text(0, &vocabulary).unwrap(),
        "loss ??? p53 tumour"
    );
    let mut frequencies = vec![0u32; 3];
    assert_eq!(reader.frequencies(0, &mut frequencies, None).unwrap(), 3);
}

#[test]
fn test_positions() {
    let basename = TempBasename::new("positions").unwrap();
    let options = DocumentStoreOptions::default().with_positions();
    let mut writer = DocumentStoreBuilder::new(basename.path(), 10, options)
        .build()
        .unwrap();
    assert!(writer.is_tracking_positions());
    let ranges: Vec<PositionRange> = vec![(0..4).into(), (5..7).into(), (8..11).into()];
    writer.append_document(0, &known(&[1, 2, 3])).unwrap();
    writer.append_positions(0, &ranges).unwrap();
    writer.append_document(1, &known(&[4])).unwrap();
    writer.append_positions(2, &[(3..9).into()]).unwrap();
    writer.append_document(2, &known(&[5])).unwrap();
    let overlapping: Vec<PositionRange> = vec![(0..4).into(), (2..6).into()];
    assert!(writer.append_positions(3, &overlapping).is_err());
    let summary = writer.close().unwrap();
    assert_eq!(summary.number_of_documents, 3);
    assert!(summary.position_bits.is_some());

    let reader = open(&basename);
    assert!(reader.is_positions_available());
    assert_eq!(reader.positions(0).unwrap().unwrap(), ranges);
    assert!(reader.positions(1).unwrap().unwrap().is_empty());
    assert_eq!(
        reader.positions(2).unwrap().unwrap(),
        vec![PositionRange::new(3, 9)]
    );

    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                for round in 0..50 {
                    let index = round % 3;
                    let positions = reader.positions(index).unwrap().unwrap();
                    let expected = match index {
                        0 => ranges.len(),
                        1 => 0,
                        _ => 1,
                    };
                    assert_eq!(positions.len(), expected);
                }
            });
        }
    });
}

#[test]
fn test_positions_absent() {
    let basename = TempBasename::new("plain").unwrap();
    let mut writer = DocumentStoreBuilder::new(basename.path(), 3, DocumentStoreOptions::default())
        .build()
        .unwrap();
    writer.append_document(0, &known(&[0])).unwrap();
    writer.close().unwrap();
    let reader = open(&basename);
    assert!(!reader.is_positions_available());
    assert_eq!(reader.positions(0).unwrap(), None);
}

#[test]
fn test_pmids() {
    let basename = TempBasename::new("pmids").unwrap();
    let options = DocumentStoreOptions::default().with_pmid_capacity(4);
    let mut writer = DocumentStoreBuilder::new(basename.path(), 3, options)
        .build()
        .unwrap();
    writer.append_document(0, &known(&[0])).unwrap();
    writer.set_pmid(0, 31452104).unwrap();
    writer.append_document(2, &known(&[1, 2])).unwrap();
    writer.set_pmid(2, 31452130).unwrap();
    assert!(writer.set_pmid(4, 1).is_err());
    assert!(writer.close().unwrap().pmids);

    let mut reader = open(&basename);
    assert!(reader.pmid(0).is_err());
    assert!(reader.read_pmids().unwrap());
    assert_eq!(reader.pmid(0).unwrap(), Some(31452104));
    assert_eq!(reader.pmid(1).unwrap(), None);
    assert_eq!(reader.pmid(2).unwrap(), Some(31452130));
    assert_eq!(reader.document_number(31452130).unwrap(), Some(2));
    assert_eq!(reader.document_number(7).unwrap(), None);
    reader.index_pmids().unwrap();
    assert_eq!(reader.document_number(31452104).unwrap(), Some(0));
    assert_eq!(reader.document_number(7).unwrap(), None);
}

#[test]
fn test_pmids_absent() {
    let basename = TempBasename::new("plain").unwrap();
    DocumentStoreBuilder::new(basename.path(), 3, DocumentStoreOptions::default())
        .build()
        .unwrap()
        .close()
        .unwrap();
    let mut reader = open(&basename);
    assert_eq!(reader.number_of_documents(), 0);
    assert!(!reader.read_pmids().unwrap());
    assert!(reader.document_number(1).is_err());
}

#[test]
fn test_rewrite_removes_stale_files() {
    let basename = TempBasename::new("index").unwrap();
    let vocabulary =
        InMemoryVocabulary::with_terms(basename.path(), vec!["a".into(), "b".into()], vec![1, 2], 2)
            .unwrap();
    let options = DocumentStoreOptions::default()
        .with_positions()
        .with_pmid_capacity(2);
    let mut writer = DocumentStoreBuilder::new(basename.path(), 2, options)
        .optimize_term_ordering(&vocabulary)
        .unwrap()
        .build()
        .unwrap();
    writer.append_document(0, &known(&[0, 1])).unwrap();
    writer.close().unwrap();
    assert!(open(&basename).is_optimized());

    let mut writer = DocumentStoreBuilder::new(basename.path(), 2, DocumentStoreOptions::default())
        .build()
        .unwrap();
    writer.append_document(0, &known(&[1])).unwrap();
    writer.close().unwrap();

    let mut reader = open(&basename);
    assert!(!reader.is_optimized());
    assert!(!reader.is_positions_available());
    assert!(!reader.read_pmids().unwrap());
    assert_eq!(reader.document(0).unwrap(), known(&[1]));
}

#[test]
fn test_duplicate_remap_entry_is_rejected() {
    let basename = TempBasename::new("remap").unwrap();
    let vocabulary =
        InMemoryVocabulary::with_terms(basename.path(), vec!["a".into(), "b".into()], vec![1, 1], 1)
            .unwrap();
    let mut writer = DocumentStoreBuilder::new(basename.path(), 2, DocumentStoreOptions::default())
        .optimize_term_ordering(&vocabulary)
        .unwrap()
        .build()
        .unwrap();
    writer.append_document(0, &known(&[0, 1])).unwrap();
    writer.close().unwrap();
    assert_eq!(open(&basename).document(0).unwrap(), known(&[0, 1]));

    let remap: Vec<u8> = [0i32, 0, -1].iter().flat_map(|v| v.to_le_bytes()).collect();
    std::fs::write(basename.file("-docstore-opt-terms.index"), remap).unwrap();
    let err = DocumentStoreReader::open(basename.path(), DocumentStoreReaderOptions::default())
        .err()
        .unwrap();
    assert!(matches!(err.kind(), ErrorKind::InvalidFormat { .. }));
}

#[test]
fn test_codings_are_read_from_the_store() {
    let basename = TempBasename::new("codings").unwrap();
    let vocabulary = InMemoryVocabulary::with_terms(
        basename.path(),
        vec!["p53".into(), "dna".into(), "damage".into(), "repair".into()],
        vec![2, 1, 1, 3],
        3,
    )
    .unwrap();
    let options = DocumentStoreOptions {
        content_coding: Coding::Delta,
        offsets_coding: Coding::Gamma,
        positions_coding: Coding::Gamma,
        position_offsets_coding: Coding::Gamma,
        ..DocumentStoreOptions::default().with_positions()
    };
    let mut writer = DocumentStoreBuilder::new(basename.path(), 4, options)
        .optimize_term_ordering(&vocabulary)
        .unwrap()
        .build()
        .unwrap();
    let first = vec![
        TermIndex::Known(0),
        TermIndex::Unknown,
        TermIndex::Known(3),
        TermIndex::Known(3),
    ];
    let first_ranges: Vec<PositionRange> =
        vec![(0..3).into(), (4..9).into(), (10..16).into(), (20..26).into()];
    writer.append_document(0, &first).unwrap();
    writer.append_positions(0, &first_ranges).unwrap();
    writer.append_document(4, &known(&[2, 1])).unwrap();
    writer.append_positions(4, &[(0..6).into(), (7..13).into()]).unwrap();
    writer.close().unwrap();

    let mut reader = open(&basename);
    assert_eq!(reader.offsets().coding(), Coding::Gamma);
    assert_eq!(reader.offsets().len(), 6);
    assert_eq!(reader.number_of_documents(), 5);
    assert_eq!(reader.document(0).unwrap(), first);
    for gap in 1..4 {
        assert!(reader.document(gap).unwrap().is_empty());
        assert!(reader.positions(gap).unwrap().unwrap().is_empty());
    }
    assert_eq!(reader.document(4).unwrap(), known(&[2, 1]));
    assert_eq!(reader.positions(0).unwrap().unwrap(), first_ranges);
    assert_eq!(
        reader.positions(4).unwrap().unwrap(),
        vec![PositionRange::new(0, 6), PositionRange::new(7, 13)]
    );

    let mut frequencies = vec![0u32; 4];
    assert_eq!(reader.frequencies(0, &mut frequencies, None).unwrap(), 3);
    assert_eq!(frequencies, vec![1, 0, 0, 2]);
}

#[test]
fn test_unclosed_writer_leaves_unreadable_store() {
    let basename = TempBasename::new("unclosed").unwrap();
    let mut writer = DocumentStoreBuilder::new(basename.path(), 3, DocumentStoreOptions::default())
        .build()
        .unwrap();
    writer.append_document(0, &known(&[0, 2])).unwrap();
    drop(writer);

    let err = DocumentStoreReader::open(basename.path(), DocumentStoreReaderOptions::default())
        .err()
        .unwrap();
    assert!(err.is_corrupt_store());
}

#[test]
fn test_open_from_details() {
    let basename = TempBasename::new("details").unwrap();
    let mut writer = DocumentStoreBuilder::new(basename.path(), 4, DocumentStoreOptions::default())
        .build()
        .unwrap();
    writer.append_document(1, &known(&[3, 3])).unwrap();
    writer.close().unwrap();

    let mut details = IndexDetails::new(basename.path(), 2, 4);
    details.reader.read_ahead = 1;
    let path = IndexDetails::path_for(basename.path());
    details.to_json_file(&path).unwrap();
    let details = IndexDetails::from_json_file(&path).unwrap();
    let mut reader = DocumentStoreReader::open_details(&details).unwrap();
    assert_eq!(reader.options().read_ahead, 1);
    assert_eq!(reader.number_of_terms(), 4);
    assert_eq!(reader.document(1).unwrap(), known(&[3, 3]));
}

#[test]
fn test_truncated_store_is_corrupt() {
    let basename = TempBasename::new("corpus").unwrap();
    let spec = CorpusSpec {
        documents: 50,
        empty_percent: 0,
        ..Default::default()
    };
    write_corpus(&basename, &spec, DocumentStoreOptions::default(), false);

    let docs = basename.file("-docstore.docs");
    let bytes = std::fs::read(&docs).unwrap();
    std::fs::write(&docs, &bytes[..bytes.len() / 2]).unwrap();
    let err = DocumentStoreReader::open(basename.path(), DocumentStoreReaderOptions::default())
        .err()
        .unwrap();
    assert!(err.is_corrupt_store());
}

#[test]
fn test_missing_store() {
    let basename = TempBasename::new("missing").unwrap();
    assert!(
        DocumentStoreReader::open(basename.path(), DocumentStoreReaderOptions::default()).is_err()
    );
}
