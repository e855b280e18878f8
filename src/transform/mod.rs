//! Series preparation.
//!
//! Converts raw, irregular transactional observations into the contiguous
//! monthly series every model in the crate expects.

mod prepare;

pub use prepare::prepare_series;
