use serde::{Deserialize, Serialize};

/// Retention policy for soft-deleted entities.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrashConfig {
    /// Age in days after which `auto_cleanup` purges a trashed entity.
    pub retention_days: i64,
    /// Records expiring within this many days count as "expiring soon".
    pub expiring_soon_days: i64,
}

impl Default for TrashConfig {
    fn default() -> Self {
        Self {
            retention_days: 30,
            expiring_soon_days: 7,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = TrashConfig::default();
        assert_eq!(c.retention_days, 30);
        assert_eq!(c.expiring_soon_days, 7);
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let c: TrashConfig = toml::from_str("retention_days = 14").unwrap();
        assert_eq!(c.retention_days, 14);
        assert_eq!(c.expiring_soon_days, 7);
    }
}
