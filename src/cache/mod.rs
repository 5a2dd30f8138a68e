//! In-process memoization of theme runtime configuration.
//!
//! The memo is keyed twice, by theme id and by technical name, and both
//! indices are written together so they always agree. Nothing expires; the
//! owner clears the whole memo explicitly.

pub(crate) mod lock;
mod store;

pub use store::{Lookup, RuntimeConfigCache};
pub(crate) use store::{METRIC_CACHE_HIT, METRIC_CACHE_MISS};
