use std::sync::Arc;

use medtext_docstore::{
    Coding, FrequencyStorage, FrequencyStorageImpl, InMemoryVocabulary, TermDocumentFrequencyOptions,
    TermDocumentFrequencyReader, TermDocumentFrequencyWriter, TermIndex, TermIndexTransform,
    TermSubsetTransform, UnityTransform, Vocabulary,
};
use medtext_testkit::{
    data_gen::{CorpusSpec, generate_documents},
    dirs::TempBasename,
};

fn two_document_vocabulary(basename: &TempBasename) -> InMemoryVocabulary {
    InMemoryVocabulary::with_terms(
        basename.path(),
        vec!["cell".into(), "p53".into(), "tumour".into()],
        vec![0, 2, 1],
        2,
    )
    .unwrap()
}

fn write_two_documents(basename: &TempBasename, options: TermDocumentFrequencyOptions) {
    let vocabulary = two_document_vocabulary(basename);
    let mut writer =
        TermDocumentFrequencyWriter::new(basename.path(), &vocabulary, 2, options).unwrap();
    let doc0 = [TermIndex::Known(1), TermIndex::Known(2), TermIndex::Known(1)];
    let doc1 = [TermIndex::Known(1), TermIndex::Unknown];
    writer.append_document(0, &doc0).unwrap();
    writer.append_document(1, &doc1).unwrap();
    writer.close().unwrap();
}

#[test]
fn test_two_document_scenario() {
    let basename = TempBasename::new("tdf").unwrap();
    write_two_documents(&basename, TermDocumentFrequencyOptions::default());

    let mut reader = TermDocumentFrequencyReader::open(basename.path(), 3, 4).unwrap();
    assert_eq!(reader.number_of_documents(), 2);
    assert_eq!(reader.transform().final_size(), 2);

    let mut frequencies = vec![7u32; 3];
    assert_eq!(reader.frequencies(0, &mut frequencies).unwrap(), 3);
    assert_eq!(frequencies, vec![0, 2, 1]);
    assert_eq!(reader.frequencies(1, &mut frequencies).unwrap(), 1);
    assert_eq!(frequencies, vec![0, 1, 0]);
    assert_eq!(reader.sparse_frequencies(0).unwrap(), vec![(0, 2), (1, 1)]);
    assert!(reader.frequencies(2, &mut frequencies).is_err());
}

#[test]
fn test_band_excludes_common_terms() {
    let basename = TempBasename::new("tdf").unwrap();
    write_two_documents(
        &basename,
        TermDocumentFrequencyOptions::default().with_band(0.0, 0.5),
    );

    let mut reader = TermDocumentFrequencyReader::open(basename.path(), 3, 4).unwrap();
    assert_eq!(reader.transform().final_size(), 1);
    assert_eq!(reader.transform().initial_term_index(0), TermIndex::Known(2));
    let mut frequencies = vec![0u32; 3];
    assert_eq!(reader.frequencies(0, &mut frequencies).unwrap(), 1);
    assert_eq!(frequencies, vec![0, 0, 1]);
    assert_eq!(reader.frequencies(1, &mut frequencies).unwrap(), 0);
    assert!(reader.sparse_frequencies(1).unwrap().is_empty());
}

#[test]
fn test_minimum_frequency_support() {
    let basename = TempBasename::new("tdf").unwrap();
    write_two_documents(
        &basename,
        TermDocumentFrequencyOptions::default().with_minimum_frequency_support(1),
    );

    let mut reader = TermDocumentFrequencyReader::open(basename.path(), 3, 4).unwrap();
    assert_eq!(reader.sparse_frequencies(0).unwrap(), vec![(0, 2)]);
    assert!(reader.sparse_frequencies(1).unwrap().is_empty());
}

#[test]
fn test_gaps_and_generated_corpus() {
    let basename = TempBasename::new("corpus").unwrap();
    let corpus = generate_documents(&CorpusSpec {
        documents: 150,
        vocabulary_size: 200,
        ..Default::default()
    });
    let (vocabulary, documents) = InMemoryVocabulary::from_documents(basename.path(), &corpus);
    let n = vocabulary.number_of_documents();
    let options = TermDocumentFrequencyOptions::default().with_band(0.05, 0.6);
    let mut writer =
        TermDocumentFrequencyWriter::new(basename.path(), &vocabulary, n, options.clone()).unwrap();
    for (index, tokens) in documents.iter().enumerate() {
        if !tokens.is_empty() {
            writer.append_document(index as u32, tokens).unwrap();
        }
    }
    assert!(writer.append_document(0, &[]).unwrap_err().is_out_of_order());
    let summary = writer.close().unwrap();

    let terms = vocabulary.number_of_terms();
    let tracked: Vec<u32> = (0..terms)
        .filter(|&t| options.includes(vocabulary.document_frequency(t).unwrap(), n))
        .collect();
    assert_eq!(summary.tracked_terms as usize, tracked.len());

    let mut reader = TermDocumentFrequencyReader::open(basename.path(), terms, 2).unwrap();
    let mut frequencies = vec![0u32; terms as usize];
    for index in 0..reader.number_of_documents() {
        reader.frequencies(index, &mut frequencies).unwrap();
        let mut expected = vec![0u32; terms as usize];
        for term in documents[index as usize].iter().filter_map(|t| t.known()) {
            if tracked.binary_search(&term).is_ok() {
                expected[term as usize] += 1;
            }
        }
        assert_eq!(frequencies, expected, "document {index}");
    }
}

#[test]
fn test_codings_are_read_from_the_store() {
    let basename = TempBasename::new("tdf-codings").unwrap();
    let vocabulary = two_document_vocabulary(&basename);
    let options = TermDocumentFrequencyOptions {
        index_coding: Coding::Delta,
        gap_coding: Coding::Gamma,
        offsets_coding: Coding::Gamma,
        ..Default::default()
    };
    let mut writer =
        TermDocumentFrequencyWriter::new(basename.path(), &vocabulary, 2, options).unwrap();
    let doc0 = [TermIndex::Known(1), TermIndex::Known(2), TermIndex::Known(1)];
    let doc3 = [TermIndex::Known(2), TermIndex::Unknown, TermIndex::Known(0)];
    writer.append_document(0, &doc0).unwrap();
    writer.append_document(3, &doc3).unwrap();
    assert_eq!(writer.close().unwrap().number_of_documents, 4);

    let mut reader = TermDocumentFrequencyReader::open(basename.path(), 3, 4).unwrap();
    assert_eq!(reader.number_of_documents(), 4);
    let mut frequencies = vec![0u32; 3];
    assert_eq!(reader.frequencies(0, &mut frequencies).unwrap(), 3);
    assert_eq!(frequencies, vec![0, 2, 1]);
    for gap in 1..3 {
        assert!(reader.sparse_frequencies(gap).unwrap().is_empty());
    }
    // "cell" has document frequency 0 and lies outside the band.
    assert_eq!(reader.frequencies(3, &mut frequencies).unwrap(), 1);
    assert_eq!(frequencies, vec![0, 0, 1]);
    assert_eq!(reader.sparse_frequencies(0).unwrap(), vec![(0, 2), (1, 1)]);
}

#[test]
fn test_layered_storage() {
    let basename = TempBasename::new("layers").unwrap();
    let unity: Arc<dyn TermIndexTransform> = Arc::new(UnityTransform::new(6));
    let odd: Arc<dyn TermIndexTransform> =
        Arc::new(TermSubsetTransform::new(unity, |term| term % 2 == 1));
    let high = TermSubsetTransform::new(odd, |term| term > 1);
    assert_eq!(high.position(), 2);
    assert_eq!(high.final_size(), 2);

    let storage = FrequencyStorageImpl::new(Arc::new(high));
    let mut writer = TermDocumentFrequencyWriter::with_storage(
        basename.path(),
        Box::new(storage),
        TermDocumentFrequencyOptions::default(),
    )
    .unwrap();
    assert_eq!(writer.storage().len(), 2);
    let tokens: Vec<TermIndex> = [0, 1, 3, 3, 4, 5].iter().map(|&t| TermIndex::Known(t)).collect();
    writer.append_document(1, &tokens).unwrap();
    writer.close().unwrap();
    assert!(basename.file("-term-doc-freqs-1.projection").is_file());
    assert!(basename.file("-term-doc-freqs-2.projection").is_file());

    let mut reader = TermDocumentFrequencyReader::open(basename.path(), 6, 4).unwrap();
    assert_eq!(reader.transform().position(), 2);
    let mut frequencies = vec![0u32; 6];
    assert_eq!(reader.frequencies(0, &mut frequencies).unwrap(), 0);
    assert_eq!(reader.frequencies(1, &mut frequencies).unwrap(), 3);
    assert_eq!(frequencies, vec![0, 0, 0, 2, 0, 1]);

    let reloaded = FrequencyStorageImpl::load(basename.path(), 6).unwrap();
    assert_eq!(reloaded.len(), 2);
    assert_eq!(reloaded.frequency_index(5), TermIndex::Known(1));
    assert_eq!(reloaded.frequency_index(1), TermIndex::Unknown);
}

#[test]
fn test_rewrite_with_fewer_layers() {
    let basename = TempBasename::new("layers").unwrap();
    let unity: Arc<dyn TermIndexTransform> = Arc::new(UnityTransform::new(4));
    let first: Arc<dyn TermIndexTransform> =
        Arc::new(TermSubsetTransform::new(unity, |term| term != 0));
    let second = TermSubsetTransform::new(first, |term| term != 1);
    let writer = TermDocumentFrequencyWriter::with_storage(
        basename.path(),
        Box::new(FrequencyStorageImpl::new(Arc::new(second))),
        TermDocumentFrequencyOptions::default(),
    )
    .unwrap();
    writer.close().unwrap();
    assert!(basename.file("-term-doc-freqs-2.projection").is_file());

    let vocabulary = InMemoryVocabulary::with_terms(
        basename.path(),
        vec!["a".into(), "b".into(), "c".into(), "d".into()],
        vec![1, 1, 1, 1],
        1,
    )
    .unwrap();
    TermDocumentFrequencyWriter::new(
        basename.path(),
        &vocabulary,
        1,
        TermDocumentFrequencyOptions::default(),
    )
    .unwrap()
    .close()
    .unwrap();
    assert!(!basename.file("-term-doc-freqs-2.projection").exists());
    let reader = TermDocumentFrequencyReader::open(basename.path(), 4, 4).unwrap();
    assert_eq!(reader.transform().position(), 1);
    assert_eq!(reader.transform().final_size(), 4);
}

#[test]
fn test_mismatched_vocabulary_size() {
    let basename = TempBasename::new("tdf").unwrap();
    write_two_documents(&basename, TermDocumentFrequencyOptions::default());
    assert!(TermDocumentFrequencyReader::open(basename.path(), 5, 4).is_err());
}

#[test]
fn test_inverted_band_rejected() {
    let basename = TempBasename::new("tdf").unwrap();
    let vocabulary = two_document_vocabulary(&basename);
    let options = TermDocumentFrequencyOptions::default().with_band(0.8, 0.2);
    assert!(TermDocumentFrequencyWriter::new(basename.path(), &vocabulary, 2, options).is_err());
}
