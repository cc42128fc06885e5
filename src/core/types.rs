//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::core::error::GachaError;

/// Opaque identifier of the person drawing
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stable item identifier. Display metadata is resolved only at the
/// presentation boundary (see `assets`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Index of a tier within its pool, 0 = rarest
pub type TierIndex = usize;

/// Which banner a draw is made on. Each banner type has its own pool and
/// its own pity state per user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BannerType {
    #[serde(rename = "role")]
    Character,
    #[serde(rename = "weapon")]
    Weapon,
}

impl BannerType {
    pub const ALL: [BannerType; 2] = [BannerType::Character, BannerType::Weapon];

    /// Key fragment used in store keys and pool file names
    pub fn as_str(&self) -> &'static str {
        match self {
            BannerType::Character => "role",
            BannerType::Weapon => "weapon",
        }
    }
}

impl Default for BannerType {
    fn default() -> Self {
        BannerType::Character
    }
}

impl fmt::Display for BannerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BannerType {
    type Err = GachaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "role" | "character" | "char" => Ok(BannerType::Character),
            "weapon" => Ok(BannerType::Weapon),
            other => Err(GachaError::config(format!("unknown banner type '{}'", other))),
        }
    }
}

/// Correlates log lines of one service request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_banner_type_parsing() {
        assert_eq!("role".parse::<BannerType>().unwrap(), BannerType::Character);
        assert_eq!("Weapon".parse::<BannerType>().unwrap(), BannerType::Weapon);
        assert!("armor".parse::<BannerType>().is_err());
    }

    #[test]
    fn test_banner_type_serializes_as_key_fragment() {
        let json = serde_json::to_string(&BannerType::Character).unwrap();
        assert_eq!(json, "\"role\"");
        assert_eq!(BannerType::Weapon.to_string(), "weapon");
    }
}
