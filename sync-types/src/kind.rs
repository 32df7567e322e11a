//! Strategy selection tag.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::SyncError;

/// Which synchronization strategy to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// Upload the whole file every time.
    Full,
    /// Upload a delta against the remote copy when it is smaller.
    Delta,
    /// Delay, then delegate to a base strategy.
    Scheduled,
    /// Only sync files accepted by a filter.
    Selective,
}

impl StrategyKind {
    /// All strategy kinds, in declaration order.
    pub const ALL: [StrategyKind; 4] = [Self::Full, Self::Delta, Self::Scheduled, Self::Selective];

    /// Lowercase tag used in configuration files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Delta => "delta",
            Self::Scheduled => "scheduled",
            Self::Selective => "selective",
        }
    }
}

impl Default for StrategyKind {
    fn default() -> Self {
        Self::Delta
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" => Ok(Self::Full),
            "delta" => Ok(Self::Delta),
            "scheduled" => Ok(Self::Scheduled),
            "selective" => Ok(Self::Selective),
            other => Err(SyncError::UnknownStrategy(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_roundtrip() {
        for kind in StrategyKind::ALL {
            assert_eq!(kind.to_string().parse::<StrategyKind>().unwrap(), kind);
        }
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("  Delta ".parse::<StrategyKind>().unwrap(), StrategyKind::Delta);
    }

    #[test]
    fn unknown_kind_fails() {
        let err = "rsync".parse::<StrategyKind>().unwrap_err();
        assert!(matches!(err, SyncError::UnknownStrategy(ref s) if s == "rsync"));
    }

    #[test]
    fn default_is_delta() {
        assert_eq!(StrategyKind::default(), StrategyKind::Delta);
    }
}
