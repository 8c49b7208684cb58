//! Cache configuration.
//!
//! [`CacheOptions`] can be built in code or deserialised with serde; the
//! `toml-config` feature adds a TOML loader.

use serde::{Deserialize, Serialize};

/// Per-binder cache parameters, copied into every per-instance cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheOptions {
    /// Maximum number of distinct argument keys kept per instance. `None`
    /// keeps everything; `Some(0)` disables caching.
    pub capacity: Option<usize>,
    /// Keep value-equal arguments of different types (`1` and `1.0`) apart.
    pub typed: bool,
}

impl CacheOptions {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn bounded(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            typed: false,
        }
    }

    pub fn with_capacity(mut self, capacity: Option<usize>) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_typed(mut self, typed: bool) -> Self {
        self.typed = typed;
        self
    }

    pub fn is_bounded(&self) -> bool {
        self.capacity.is_some()
    }

    #[cfg(feature = "toml-config")]
    pub fn from_toml_str(source: &str) -> anyhow::Result<Self> {
        use anyhow::Context;

        toml::from_str(source).context("failed to parse cache options")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_unbounded_and_untyped() {
        let options = CacheOptions::default();
        assert_eq!(options.capacity, None);
        assert!(!options.typed);
        assert!(!options.is_bounded());
        assert_eq!(options, CacheOptions::unbounded());
    }

    #[test]
    fn builders_compose() {
        let options = CacheOptions::bounded(16).with_typed(true);
        assert_eq!(options.capacity, Some(16));
        assert!(options.typed);
        assert_eq!(options.with_capacity(None).capacity, None);
    }

    #[test]
    fn deserialises_partial_documents() -> anyhow::Result<()> {
        let options: CacheOptions = serde_json::from_str(r#"{"capacity": 4}"#)?;
        assert_eq!(options, CacheOptions::bounded(4));

        let options: CacheOptions = serde_json::from_str(r#"{"typed": true}"#)?;
        assert_eq!(options, CacheOptions::unbounded().with_typed(true));

        assert!(serde_json::from_str::<CacheOptions>(r#"{"maxsize": 4}"#).is_err());
        Ok(())
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn loads_from_toml() -> anyhow::Result<()> {
        let options = CacheOptions::from_toml_str("capacity = 32\ntyped = true\n")?;
        assert_eq!(options, CacheOptions::bounded(32).with_typed(true));
        assert!(CacheOptions::from_toml_str("capacity = \"lots\"").is_err());
        Ok(())
    }
}
