//! Fast hash map and hash set type aliases.
//!
//! The registry maps (platforms by id, libraries by name) are keyed by short
//! strings and never exposed to untrusted input, so they use the Fx hash
//! algorithm from `rustc-hash` instead of SipHash.
//!
//! # Examples
//!
//! ```
//! use bk_core::{FxHashMap, fx_hash_map};
//!
//! let mut map: FxHashMap<String, usize> = fx_hash_map();
//! map.insert("Wire".to_owned(), 1);
//! assert_eq!(map.get("Wire"), Some(&1));
//! ```

/// A [`HashMap`](std::collections::HashMap) using the Fx hash algorithm.
pub type FxHashMap<K, V> = rustc_hash::FxHashMap<K, V>;

/// A [`HashSet`](std::collections::HashSet) using the Fx hash algorithm.
pub type FxHashSet<V> = rustc_hash::FxHashSet<V>;

/// Creates a new empty [`FxHashMap`].
#[inline]
#[must_use]
pub fn fx_hash_map<K, V>() -> FxHashMap<K, V> {
    FxHashMap::default()
}

/// Creates a new empty [`FxHashSet`].
#[inline]
#[must_use]
pub fn fx_hash_set<V>() -> FxHashSet<V> {
    FxHashSet::default()
}
