//! Bounded memoization tables.
//!
//! A [`BoundedMemoTable`] wraps any [`Compute`] source and caches its results
//! keyed by the call arguments, evicting the least recently used entry once
//! the configured capacity is reached.

mod args;
mod eviction;
mod info;
mod key;
mod table;

pub use args::{ArgError, ArgType, ArgValue, CallArgs};
pub use eviction::LruStore;
pub use info::CacheInfo;
pub use key::CacheKey;
pub use table::{BoundedMemoTable, Compute};
