use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Content derived identifier of a shard
///
/// Lowercase hex SHA-256 of the canonical (padded) share bytes. It depends on
///  nothing but those bytes, so every encryption of a share maps to the same id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ShardId(String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid shard id: {0}")]
pub struct InvalidShardId(pub String);

impl ShardId {
    pub fn from_share_bytes(share: &[u8]) -> Self {
        Self(hex::encode(Sha256::digest(share)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Leading characters, for log lines and listings
    pub fn short(&self) -> &str {
        &self.0[..12]
    }
}

impl fmt::Display for ShardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ShardId {
    type Err = InvalidShardId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() != 64 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(InvalidShardId(s.to_string()));
        }
        Ok(Self(s.to_ascii_lowercase()))
    }
}

impl TryFrom<String> for ShardId {
    type Error = InvalidShardId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ShardId> for String {
    fn from(id: ShardId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_deterministic() {
        let a = ShardId::from_share_bytes(b"share");
        let b = ShardId::from_share_bytes(b"share");
        let c = ShardId::from_share_bytes(b"other");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.as_str().len(), 64);
        assert_eq!(a.short().len(), 12);
    }

    #[test]
    fn test_parse() {
        let id = ShardId::from_share_bytes(b"share");
        let upper = id.as_str().to_ascii_uppercase();
        assert_eq!(upper.parse::<ShardId>().unwrap(), id);
        assert!("abc".parse::<ShardId>().is_err());
        assert!("z".repeat(64).parse::<ShardId>().is_err());
    }

    #[test]
    fn test_serde_validates() {
        let id = ShardId::from_share_bytes(b"share");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id));
        assert_eq!(serde_json::from_str::<ShardId>(&json).unwrap(), id);
        assert!(serde_json::from_str::<ShardId>("\"short\"").is_err());
    }
}
