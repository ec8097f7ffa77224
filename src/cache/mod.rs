//! Two-tier cache for upstream drug records.
//!
//! Every record lives in process memory and in a JSON file under the cache
//! directory. Files are named `<normalized key>_<kind>.json` and are never
//! expired; deleting them is the only invalidation.

mod keys;
mod store;

pub use keys::CacheKey;
pub use store::{CacheError, RecordStore};

/// Kind suffix for RxClass classification records.
pub const RXNAV_KIND: &str = "rxnav";
/// Kind suffix for openFDA label records.
pub const FDA_KIND: &str = "fda";

pub(crate) const METRIC_CACHE_HIT: &str = "rxlens_cache_hit_total";
pub(crate) const METRIC_CACHE_MISS: &str = "rxlens_cache_miss_total";
