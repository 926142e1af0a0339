//! Core definitions shared by all medtext-* crates: the common error type,
//! the `Result` alias and the argument/data verification macros.

pub mod error;
pub mod result;

pub use result::Result;
