//! Domain identifiers (strongly-typed IDs).
//!
//! # ULID ベースの ID + ジェネリック実装
//! ID はすべて ULID (Universally Unique Lexicographically Sortable Identifier) です。
//! Phantom type パターンで `ProfileId` / `RowId` / `ScriptId` を別の型にしています。
//!
//! ## 文字列表現
//! - `Display`: `{prefix}{ulid}`（例: `row-01HZX3...`）
//! - serde も同じ文字列で保存する（ストレージの JSON がそのまま読める）
//! - `FromStr`: プレフィックス付き・なしの両方を受け付ける（CLI 引数用）

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;
use ulid::Ulid;

/// IdMarker は各 ID 型のマーカー trait
///
/// Display で使うプレフィックス（"profile-", "row-", "script-"）を提供します。
pub trait IdMarker: Send + Sync + 'static {
    fn prefix() -> &'static str;
}

/// ジェネリック ID 型
///
/// `T` は PhantomData で、実行時にはメモリを消費しません。
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id<T: IdMarker> {
    ulid: Ulid,
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self {
            ulid,
            _marker: PhantomData,
        }
    }

    pub fn as_ulid(&self) -> Ulid {
        self.ulid
    }
}

impl<T: IdMarker> From<Ulid> for Id<T> {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.ulid)
    }
}

/// ID 文字列のパース失敗
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {expected}id: {input:?}")]
pub struct IdParseError {
    expected: &'static str,
    input: String,
}

impl<T: IdMarker> FromStr for Id<T> {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let body = raw.strip_prefix(T::prefix()).unwrap_or(raw);
        Ulid::from_string(body)
            .map(Self::from_ulid)
            .map_err(|_| IdParseError {
                expected: T::prefix(),
                input: s.to_string(),
            })
    }
}

impl<T: IdMarker> Serialize for Id<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de, T: IdMarker> Deserialize<'de> for Id<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ========================================
// マーカー型の定義
// ========================================

/// Channel profile のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Profile {}

impl IdMarker for Profile {
    fn prefix() -> &'static str {
        "profile-"
    }
}

/// Planner row のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Row {}

impl IdMarker for Row {
    fn prefix() -> &'static str {
        "row-"
    }
}

/// Saved script のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Script {}

impl IdMarker for Script {
    fn prefix() -> &'static str {
        "script-"
    }
}

/// Identifier of a channel profile.
pub type ProfileId = Id<Profile>;

/// Identifier of a planner row (one queued topic).
pub type RowId = Id<Row>;

/// Identifier of a saved script.
pub type ScriptId = Id<Script>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_distinct_types() {
        let profile = ProfileId::from_ulid(Ulid::new());
        let row = RowId::from_ulid(Ulid::new());
        let script = ScriptId::from_ulid(Ulid::new());

        assert!(profile.to_string().starts_with("profile-"));
        assert!(row.to_string().starts_with("row-"));
        assert!(script.to_string().starts_with("script-"));

        // let _: RowId = profile; // <- does not compile
    }

    #[test]
    fn ids_serialize_as_prefixed_strings() {
        let row = RowId::from_ulid(Ulid::new());

        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, format!("\"{row}\""));

        let back: RowId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, row);
    }

    #[test]
    fn parse_accepts_bare_ulid_and_rejects_foreign_prefix() {
        let ulid = Ulid::new();
        let bare: ScriptId = ulid.to_string().parse().unwrap();
        assert_eq!(bare.as_ulid(), ulid);

        let foreign = format!("row-{ulid}");
        assert!(foreign.parse::<ScriptId>().is_err());
        assert!("not-an-id".parse::<ProfileId>().is_err());
    }

    #[test]
    fn phantom_data_does_not_consume_memory() {
        use std::mem::size_of;

        assert_eq!(size_of::<RowId>(), size_of::<Ulid>());
        assert_eq!(size_of::<ProfileId>(), 16);
    }
}
