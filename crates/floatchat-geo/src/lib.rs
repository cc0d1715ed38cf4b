//! Geography Resolver — a pure function over a static lookup table,
//! loaded once at startup from a JSON file. Never fatal: a missing or
//! malformed lookup file degrades the resolver to "never matches".

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A named region's bounding box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
}

/// A resolved region match: the canonical (lowercased, as-loaded) name and
/// its bounding box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedRegion {
    pub name: String,
    #[serde(flatten)]
    pub bbox: BoundingBox,
}

/// Static, immutable lookup table, built once at process start.
pub struct GeographyResolver {
    /// name (lowercased, trimmed) -> bounding box. Empty when the lookup
    /// file was missing or malformed — the resolver then never matches.
    table: HashMap<String, BoundingBox>,
    /// Keys pre-sorted longest-first so the first substring match found
    /// while iterating is always the longest one.
    keys_by_len_desc: Vec<String>,
}

impl GeographyResolver {
    /// Load the lookup table from `path`. Any I/O or parse failure yields
    /// an empty (never-matching) resolver rather than a startup failure.
    pub fn load(path: &str) -> Self {
        match std::fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str::<HashMap<String, BoundingBox>>(&raw) {
                Ok(raw_table) => {
                    let table: HashMap<String, BoundingBox> = raw_table
                        .into_iter()
                        .map(|(k, v)| (k.trim().to_lowercase(), v))
                        .collect();
                    Self::from_table(table)
                }
                Err(e) => {
                    tracing::warn!(path, error = %e, "geography_lookup_parse_failed");
                    Self::empty()
                }
            },
            Err(e) => {
                tracing::warn!(path, error = %e, "geography_lookup_file_missing");
                Self::empty()
            }
        }
    }

    pub fn from_table(table: HashMap<String, BoundingBox>) -> Self {
        let mut keys_by_len_desc: Vec<String> = table.keys().cloned().collect();
        keys_by_len_desc.sort_by(|a, b| b.len().cmp(&a.len()));
        Self {
            table,
            keys_by_len_desc,
        }
    }

    pub fn empty() -> Self {
        Self {
            table: HashMap::new(),
            keys_by_len_desc: Vec::new(),
        }
    }

    /// Scan `utterance` for the longest known region name it contains,
    /// case-insensitively. "south china sea" beats "china sea" beats "sea"
    /// because longer keys are checked first.
    pub fn resolve(&self, utterance: &str) -> Option<ResolvedRegion> {
        let haystack = utterance.to_lowercase();
        for key in &self.keys_by_len_desc {
            if haystack.contains(key.as_str()) {
                let bbox = self.table.get(key)?.clone();
                return Some(ResolvedRegion {
                    name: key.clone(),
                    bbox,
                });
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> GeographyResolver {
        let mut table = HashMap::new();
        table.insert(
            "sea".to_string(),
            BoundingBox {
                lat_min: 0.0,
                lat_max: 1.0,
                lon_min: 0.0,
                lon_max: 1.0,
            },
        );
        table.insert(
            "china sea".to_string(),
            BoundingBox {
                lat_min: 2.0,
                lat_max: 3.0,
                lon_min: 2.0,
                lon_max: 3.0,
            },
        );
        table.insert(
            "south china sea".to_string(),
            BoundingBox {
                lat_min: 4.0,
                lat_max: 5.0,
                lon_min: 4.0,
                lon_max: 5.0,
            },
        );
        GeographyResolver::from_table(table)
    }

    #[test]
    fn longest_match_wins() {
        let resolver = sample();
        let resolved = resolver.resolve("floats in the South China Sea region").unwrap();
        assert_eq!(resolved.name, "south china sea");
    }

    #[test]
    fn every_key_resolves_to_itself() {
        let resolver = sample();
        for key in ["sea", "china sea", "south china sea"] {
            assert_eq!(resolver.resolve(key).unwrap().name, key);
        }
    }

    #[test]
    fn no_match_returns_none() {
        let resolver = sample();
        assert!(resolver.resolve("Arabian Gulf").is_none());
    }

    #[test]
    fn missing_file_degrades_to_never_matches() {
        let resolver = GeographyResolver::load("/nonexistent/path/does-not-exist.json");
        assert!(resolver.resolve("any sea at all").is_none());
    }

    #[test]
    fn case_insensitive_match() {
        let resolver = sample();
        assert!(resolver.resolve("THE SEA IS CALM").is_some());
    }
}
