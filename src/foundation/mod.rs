//! Shared primitives: frame/time types, the crate error enum, numeric helpers.

/// Frame, time and canvas primitives shared by every stage.
pub mod core;
/// The crate error enum and result alias.
pub mod error;
pub(crate) mod math;
