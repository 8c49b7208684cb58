use serde::{Deserialize, Serialize};
use std::fmt;

/// Snapshot of a memo table taken by `cache_info`.
///
/// Field names follow `functools.lru_cache`, so the [`Display`](fmt::Display)
/// output reads the same as its `CacheInfo` repr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CacheInfo {
    pub hits: u64,
    pub misses: u64,
    pub maxsize: Option<usize>,
    pub currsize: usize,
}

impl CacheInfo {
    /// Calls answered since the last clear, cached or not.
    pub fn calls(&self) -> u64 {
        self.hits + self.misses
    }

    /// Share of calls answered from the table, in `0.0..=1.0`. `None` until
    /// the first call.
    pub fn hit_ratio(&self) -> Option<f64> {
        match self.calls() {
            0 => None,
            calls => Some(self.hits as f64 / calls as f64),
        }
    }

    /// A full bounded table evicts on its next miss.
    pub fn is_full(&self) -> bool {
        self.maxsize.is_some_and(|max| self.currsize >= max)
    }
}

impl fmt::Display for CacheInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CacheInfo(hits={}, misses={}, maxsize=", self.hits, self.misses)?;
        match self.maxsize {
            Some(n) => write!(f, "{n}")?,
            None => f.write_str("None")?,
        }
        write!(f, ", currsize={})", self.currsize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_lru_cache_layout() {
        let info = CacheInfo {
            hits: 3,
            misses: 1,
            maxsize: None,
            currsize: 1,
        };
        assert_eq!(
            info.to_string(),
            "CacheInfo(hits=3, misses=1, maxsize=None, currsize=1)"
        );
        assert_eq!(info.calls(), 4);
        assert_eq!(info.hit_ratio(), Some(0.75));
        assert_eq!(CacheInfo::default().hit_ratio(), None);
        assert!(!info.is_full());
    }

    #[test]
    fn serialises_to_json() -> anyhow::Result<()> {
        let info = CacheInfo {
            hits: 1,
            misses: 2,
            maxsize: Some(8),
            currsize: 2,
        };
        let json = serde_json::to_string(&info)?;
        assert_eq!(json, r#"{"hits":1,"misses":2,"maxsize":8,"currsize":2}"#);
        assert_eq!(serde_json::from_str::<CacheInfo>(&json)?, info);
        Ok(())
    }

    #[test]
    fn only_bounded_tables_fill_up() {
        let full = CacheInfo {
            hits: 0,
            misses: 2,
            maxsize: Some(2),
            currsize: 2,
        };
        assert!(full.is_full());
        assert!(!CacheInfo { maxsize: None, ..full }.is_full());
    }
}
