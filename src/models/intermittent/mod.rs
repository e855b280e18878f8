//! Intermittent demand forecasting.
//!
//! Series where most months carry no demand are forecast with Croston's
//! method instead of the cross-validated candidates.

mod croston;

pub use croston::Croston;
