//! Check command implementation

use anyhow::Result;

use medtext_docstore::{ConsistencyReport, DocumentStoreConsistencyChecker};

use crate::commands::{load_vocabulary, open_docstore};

/// Run the check command
pub fn run(basename: &str) -> Result<ConsistencyReport> {
    let mut reader = open_docstore(basename)?;
    let vocabulary = load_vocabulary(basename)?;
    let report = DocumentStoreConsistencyChecker::new(&mut reader)
        .with_vocabulary(&vocabulary)
        .check()?;
    for inconsistency in &report.inconsistencies {
        tracing::warn!("{inconsistency}");
    }
    Ok(report)
}
