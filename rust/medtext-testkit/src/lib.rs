//! Test helpers for the medtext crates.
//!
//! - [`dirs`]: scratch basenames and the checked-in sample corpus
//! - [`data_gen`]: seeded synthetic corpora with a skewed term distribution

pub mod data_gen;
pub mod dirs;
