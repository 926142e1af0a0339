//! Term index transforms: filtering and renumbering of the vocabulary.
//!
//! A transform maps the *initial* (global) term space onto a smaller
//! *transformed* space and back. Transforms are layered: every
//! [`TermSubsetTransform`] wraps a delegate and filters the delegate's
//! transformed space, and the layer's `position` (one more than its
//! delegate's) names the `.projection` file it is persisted to. The bottom of
//! every pipeline is a [`UnityTransform`] at position 0, which is never
//! persisted.

use std::{fmt::Debug, path::Path, sync::Arc};

use medtext_common::{Result, error::Error};
use medtext_io::{ReadAt, ReadAtExt, SealingWrite, SealingWriteExt, file::FileReader, file::FileWriter};

use crate::{
    format::{optional_file_exists, projection_path},
    vocabulary::{NO_SUCH_TERM, TermIndex},
};

pub trait TermIndexTransform: Send + Sync + Debug {
    /// Initial index of the `transformed` term; `Unknown` if out of range.
    fn initial_term_index(&self, transformed: u32) -> TermIndex;

    /// Transformed index of the `initial` term; `Unknown` if the term is excluded.
    fn transformed_index(&self, initial: u32) -> TermIndex;

    fn initial_size(&self) -> u32;

    fn final_size(&self) -> u32;

    /// Layer number; 0 for the identity at the bottom of the pipeline.
    fn position(&self) -> u32;

    /// Persists this layer and every layer below it.
    fn save(&self, basename: &Path) -> Result<()>;
}

/// The identity over `0..size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnityTransform {
    size: u32,
}

impl UnityTransform {
    pub fn new(size: u32) -> UnityTransform {
        UnityTransform { size }
    }
}

impl TermIndexTransform for UnityTransform {
    fn initial_term_index(&self, transformed: u32) -> TermIndex {
        if transformed < self.size {
            TermIndex::Known(transformed)
        } else {
            TermIndex::Unknown
        }
    }

    fn transformed_index(&self, initial: u32) -> TermIndex {
        self.initial_term_index(initial)
    }

    fn initial_size(&self) -> u32 {
        self.size
    }

    fn final_size(&self) -> u32 {
        self.size
    }

    fn position(&self) -> u32 {
        0
    }

    fn save(&self, _basename: &Path) -> Result<()> {
        Ok(())
    }
}

/// Keeps the subset of the delegate's terms accepted by a predicate and
/// numbers them densely in ascending order.
#[derive(Debug)]
pub struct TermSubsetTransform {
    delegate: Arc<dyn TermIndexTransform>,
    /// Transformed index → index in the delegate's transformed space.
    projection: Vec<u32>,
    /// Delegate index → transformed index, or [`NO_SUCH_TERM`].
    inverse: Vec<i32>,
    position: u32,
}

impl TermSubsetTransform {
    /// Builds the layer. `predicate` is called once per term of the delegate's
    /// transformed space, in ascending order, with the term's *initial* index.
    pub fn new<F>(delegate: Arc<dyn TermIndexTransform>, mut predicate: F) -> TermSubsetTransform
    where
        F: FnMut(u32) -> bool,
    {
        let size = delegate.final_size();
        let mut projection = Vec::new();
        let mut inverse = vec![NO_SUCH_TERM; size as usize];
        for local in 0..size {
            let included = match delegate.initial_term_index(local) {
                TermIndex::Known(initial) => predicate(initial),
                TermIndex::Unknown => false,
            };
            if included {
                inverse[local as usize] = projection.len() as i32;
                projection.push(local);
            }
        }
        let position = delegate.position() + 1;
        TermSubsetTransform {
            delegate,
            projection,
            inverse,
            position,
        }
    }

    /// Loads the layer stacked directly on `delegate`.
    pub fn load(delegate: Arc<dyn TermIndexTransform>, basename: &Path) -> Result<TermSubsetTransform> {
        let position = delegate.position() + 1;
        let path = projection_path(basename, position);
        let element = path.display().to_string();
        let reader = FileReader::open(&path).map_err(|e| Error::io(element.as_str(), e))?;

        let initial_size = reader
            .read_u32_le_at(0)
            .map_err(|e| Error::decode(element.as_str(), e))?;
        let final_size = reader
            .read_u32_le_at(4)
            .map_err(|e| Error::decode(element.as_str(), e))?;
        if initial_size != delegate.final_size() {
            return Err(Error::invalid_format(
                element,
                format!(
                    "projection over {initial_size} terms stacked on a layer of {} terms",
                    delegate.final_size()
                ),
            ));
        }
        let size = reader.size().map_err(|e| Error::io(element.as_str(), e))?;
        if size != 8 + final_size as u64 * 4 || final_size > initial_size {
            return Err(Error::corrupt_store(
                element,
                format!("{size} bytes for a projection of {final_size} terms"),
            ));
        }
        let raw = reader
            .read_i32_le_array_at(8, final_size as usize)
            .map_err(|e| Error::decode(element.as_str(), e))?;

        let mut projection = Vec::with_capacity(raw.len());
        let mut inverse = vec![NO_SUCH_TERM; initial_size as usize];
        for (transformed, &local) in raw.iter().enumerate() {
            let ascending = projection.last().is_none_or(|&prev| (prev as i64) < local as i64);
            if local < 0 || local as u32 >= initial_size || !ascending {
                return Err(Error::corrupt_store(
                    element,
                    format!("invalid projection entry {local} at {transformed}"),
                ));
            }
            inverse[local as usize] = transformed as i32;
            projection.push(local as u32);
        }
        log::debug!("loaded projection layer {position}: {initial_size} -> {final_size} terms");
        Ok(TermSubsetTransform {
            delegate,
            projection,
            inverse,
            position,
        })
    }

    pub fn delegate(&self) -> &Arc<dyn TermIndexTransform> {
        &self.delegate
    }
}

impl TermIndexTransform for TermSubsetTransform {
    fn initial_term_index(&self, transformed: u32) -> TermIndex {
        match self.projection.get(transformed as usize) {
            Some(&local) => self.delegate.initial_term_index(local),
            None => TermIndex::Unknown,
        }
    }

    fn transformed_index(&self, initial: u32) -> TermIndex {
        match self.delegate.transformed_index(initial) {
            TermIndex::Known(local) => self
                .inverse
                .get(local as usize)
                .map_or(TermIndex::Unknown, |&t| TermIndex::from_raw(t)),
            TermIndex::Unknown => TermIndex::Unknown,
        }
    }

    fn initial_size(&self) -> u32 {
        self.delegate.initial_size()
    }

    fn final_size(&self) -> u32 {
        self.projection.len() as u32
    }

    fn position(&self) -> u32 {
        self.position
    }

    fn save(&self, basename: &Path) -> Result<()> {
        self.delegate.save(basename)?;
        let path = projection_path(basename, self.position);
        let element = path.display().to_string();
        let raw: Vec<i32> = self.projection.iter().map(|&local| local as i32).collect();
        let mut writer = FileWriter::create(&path).map_err(|e| Error::io(element.as_str(), e))?;
        writer
            .write_u32_le(self.inverse.len() as u32)
            .and_then(|_| writer.write_u32_le(self.final_size()))
            .and_then(|_| writer.write_i32_le_slice(&raw))
            .and_then(|_| writer.seal())
            .map_err(|e| Error::io(element, e))
    }
}

/// Rebuilds the persisted pipeline of `basename` over `initial_size` terms,
/// stacking layers `1, 2, ...` for as long as their projection files exist.
pub fn load_transform(basename: &Path, initial_size: u32) -> Result<Arc<dyn TermIndexTransform>> {
    let mut transform: Arc<dyn TermIndexTransform> = Arc::new(UnityTransform::new(initial_size));
    while optional_file_exists(&projection_path(basename, transform.position() + 1))? {
        transform = Arc::new(TermSubsetTransform::load(transform, basename)?);
    }
    Ok(transform)
}
