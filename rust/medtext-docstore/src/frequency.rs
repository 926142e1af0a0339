//! Per-term counters addressed through a term index transform.

use std::{path::Path, sync::Arc};

use medtext_common::{Result, error::Error};

use crate::{
    transform::{TermIndexTransform, load_transform},
    vocabulary::TermIndex,
};

/// A counter per term of a transform's final space.
///
/// Counters are addressed by *frequency index* (the transformed term index);
/// [`FrequencyStorage::frequency_index`] and
/// [`FrequencyStorage::frequency_for_term`] translate from the initial
/// vocabulary.
pub trait FrequencyStorage: Send {
    fn transform(&self) -> &Arc<dyn TermIndexTransform>;

    /// Replaces the transform and reallocates zeroed counters for its final size.
    fn set_transform(&mut self, transform: Arc<dyn TermIndexTransform>);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resets every counter to zero.
    fn clear(&mut self);

    /// Increments a counter and returns its new value.
    fn increment_frequency(&mut self, frequency_index: u32) -> Result<u32>;

    fn set_frequency(&mut self, frequency_index: u32, value: u32) -> Result<()>;

    /// Counter value; zero outside the storage.
    fn frequency(&self, frequency_index: u32) -> u32;

    fn frequency_index(&self, term: u32) -> TermIndex {
        self.transform().transformed_index(term)
    }

    /// Counter of a term of the initial vocabulary; zero if the term is excluded.
    fn frequency_for_term(&self, term: u32) -> u32 {
        self.frequency_index(term)
            .known()
            .map_or(0, |index| self.frequency(index))
    }

    /// Persists the transform.
    fn save(&self, basename: &Path) -> Result<()> {
        self.transform().save(basename)
    }
}

#[derive(Debug, Clone)]
pub struct FrequencyStorageImpl {
    transform: Arc<dyn TermIndexTransform>,
    counts: Vec<u32>,
}

impl FrequencyStorageImpl {
    pub fn new(transform: Arc<dyn TermIndexTransform>) -> FrequencyStorageImpl {
        let counts = vec![0; transform.final_size() as usize];
        FrequencyStorageImpl { transform, counts }
    }

    /// Storage over the transform persisted for `basename`.
    pub fn load(basename: &Path, initial_size: u32) -> Result<FrequencyStorageImpl> {
        Ok(Self::new(load_transform(basename, initial_size)?))
    }

    pub fn counts(&self) -> &[u32] {
        &self.counts
    }

    fn slot(&mut self, frequency_index: u32) -> Result<&mut u32> {
        let len = self.counts.len();
        self.counts.get_mut(frequency_index as usize).ok_or_else(|| {
            Error::invalid_arg(
                "frequency_index",
                format!("{frequency_index} outside storage of {len} terms"),
            )
        })
    }
}

impl FrequencyStorage for FrequencyStorageImpl {
    fn transform(&self) -> &Arc<dyn TermIndexTransform> {
        &self.transform
    }

    fn set_transform(&mut self, transform: Arc<dyn TermIndexTransform>) {
        self.counts = vec![0; transform.final_size() as usize];
        self.transform = transform;
    }

    fn len(&self) -> usize {
        self.counts.len()
    }

    fn clear(&mut self) {
        self.counts.fill(0);
    }

    fn increment_frequency(&mut self, frequency_index: u32) -> Result<u32> {
        let slot = self.slot(frequency_index)?;
        *slot += 1;
        Ok(*slot)
    }

    fn set_frequency(&mut self, frequency_index: u32, value: u32) -> Result<()> {
        *self.slot(frequency_index)? = value;
        Ok(())
    }

    fn frequency(&self, frequency_index: u32) -> u32 {
        self.counts.get(frequency_index as usize).copied().unwrap_or(0)
    }
}
