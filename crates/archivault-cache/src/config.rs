use serde::{Deserialize, Serialize};

/// Sizing of the virtualized cache.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Byte budget for cached bodies, measured as serialized JSON length.
    pub max_bytes: usize,
    /// Maximum number of children fetched by one `preload_children` call.
    pub preload_limit: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_bytes: 100 * 1024 * 1024,
            preload_limit: 10,
        }
    }
}

impl CacheConfig {
    /// A config with the given byte budget and default preload limit.
    pub fn with_max_bytes(max_bytes: usize) -> Self {
        Self {
            max_bytes,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = CacheConfig::default();
        assert_eq!(c.max_bytes, 104_857_600);
        assert_eq!(c.preload_limit, 10);
    }

    #[test]
    fn parses_partial_toml() {
        let c: CacheConfig = toml::from_str("preload_limit = 4").unwrap();
        assert_eq!(c.preload_limit, 4);
        assert_eq!(c.max_bytes, CacheConfig::default().max_bytes);
    }
}
