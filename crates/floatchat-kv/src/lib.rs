//! The fast key-value store primitive: shared, TTL'd, prefix-namespaced
//! storage backing the Result Cache, the
//! Context Store, and the load-time Suggestions cache.
//!
//! A `Mutex<HashMap<...>>`-style in-process cache idiom generalized into a
//! [`KvStore`] trait object so all three consumers share one
//! implementation and one "unreachable store degrades silently" contract.

pub mod cache;
pub mod context;
pub mod store;
pub mod suggestions_cache;

pub use cache::{ResultCache, SetOutcome};
pub use context::ContextStore;
pub use store::{InMemoryKvStore, KvStore};
pub use suggestions_cache::SuggestionsCache;
