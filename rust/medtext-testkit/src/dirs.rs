//! Scratch locations and checked-in sample data.

use std::path::{Path, PathBuf};

/// The source directory of `medtext-testkit`, set at compile time by the
/// build script.
pub const TESTKIT_SRC_DIR_STR: &str = env!("TESTKIT_SRC_DIR");

/// A basename inside a temporary directory that is removed on drop.
///
/// Every store file of a test is named `<dir>/<name>-<suffix>`, so one
/// instance holds a whole index.
pub struct TempBasename {
    dir: tempfile::TempDir,
    basename: PathBuf,
}

impl TempBasename {
    pub fn new(name: &str) -> anyhow::Result<TempBasename> {
        let dir = tempfile::Builder::new().prefix("medtext-").tempdir()?;
        let basename = dir.path().join(name);
        Ok(TempBasename { dir, basename })
    }

    pub fn path(&self) -> &Path {
        &self.basename
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Full path of the file with the given basename suffix.
    pub fn file(&self, suffix: &str) -> PathBuf {
        let mut name = self.basename.as_os_str().to_owned();
        name.push(suffix);
        PathBuf::from(name)
    }

    /// Names of the files created so far, sorted.
    pub fn list_files(&self) -> anyhow::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(self.dir.path())? {
            names.push(entry?.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }
}

/// Returns the path to the testkit source directory.
pub fn get_testkit_src_dir() -> anyhow::Result<PathBuf> {
    let res = PathBuf::from(TESTKIT_SRC_DIR_STR);
    if !res.is_dir() {
        anyhow::bail!("{} not found", res.display());
    }
    Ok(res)
}

/// Returns the path to the test samples directory (`$repo_root/test/samples`).
pub fn get_test_samples_dir() -> anyhow::Result<PathBuf> {
    let src_dir = get_testkit_src_dir()?;
    let samples_dir = src_dir
        .parent()
        .ok_or_else(|| anyhow::anyhow!("{} parent", src_dir.display()))?
        .parent()
        .ok_or_else(|| anyhow::anyhow!("{} parent->parent", src_dir.display()))?
        .join("test")
        .join("samples");
    if !samples_dir.is_dir() {
        anyhow::bail!("{} not found", samples_dir.display());
    }
    Ok(samples_dir)
}

/// Returns the path to the sample abstracts (`<pmid>\t<text>` per line).
pub fn get_sample_abstracts_path() -> anyhow::Result<PathBuf> {
    let path = get_test_samples_dir()?.join("abstracts.tsv");
    if !path.is_file() {
        anyhow::bail!("{} not found", path.display());
    }
    Ok(path)
}
