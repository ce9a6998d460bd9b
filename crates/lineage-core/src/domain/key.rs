//! StoreKey - レコードの保存先キー
//!
//! `{level}_{id}_{first_name}_{last_name}.json`
//!
//! 名前の中の非英数字の連続は `-` 1 文字に正規化する。正規化後の名前には `_` が
//! 含まれないので、キーは 4 つのフィールドに一意に分解できる。
//! 同じ人物でも深さが違えば別のキー（(誰, どの深さ) で重複排除する）。

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{AncestorId, AncestorRecord};

const FIELD_SEPARATOR: char = '_';
const NAME_JOINER: &str = "-";
const EXTENSION: &str = ".json";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoreKey(String);

impl StoreKey {
    pub fn derive(level: u32, id: AncestorId, first_name: &str, last_name: &str) -> Self {
        Self(format!(
            "{level}{sep}{id}{sep}{first}{sep}{last}{ext}",
            sep = FIELD_SEPARATOR,
            first = normalize_name(first_name),
            last = normalize_name(last_name),
            ext = EXTENSION,
        ))
    }

    pub fn for_record(record: &AncestorRecord) -> Self {
        Self::derive(record.level, record.id, &record.first_name, &record.last_name)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

fn normalize_name(name: &str) -> String {
    name.split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(NAME_JOINER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::plain("charles", "charles")]
    #[case::space("de gaulle", "de-gaulle")]
    #[case::runs("de  gaulle", "de-gaulle")]
    #[case::mixed("jean-marie d'arc", "jean-marie-d-arc")]
    #[case::edges(" marie ", "marie")]
    #[case::accents("hélène", "hélène")]
    #[case::underscore("a_b", "a-b")]
    fn names_are_normalized(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(normalize_name(raw), expected);
    }

    #[test]
    fn key_layout() {
        let key = StoreKey::derive(1, AncestorId::new(1640524), "charles", "de gaulle");
        assert_eq!(key.as_str(), "1_1640524_charles_de-gaulle.json");
    }

    #[test]
    fn identical_tuples_share_a_key() {
        let a = StoreKey::derive(3, AncestorId::new(42), "marguerite", "de provence");
        let b = StoreKey::derive(3, AncestorId::new(42), "marguerite", "de provence");
        assert_eq!(a, b);
    }

    #[rstest]
    #[case::level(StoreKey::derive(2, AncestorId::new(42), "anne", "martin"))]
    #[case::id(StoreKey::derive(1, AncestorId::new(43), "anne", "martin"))]
    #[case::first_name(StoreKey::derive(1, AncestorId::new(42), "anna", "martin"))]
    #[case::last_name(StoreKey::derive(1, AncestorId::new(42), "anne", "martine"))]
    #[case::fields_swapped(StoreKey::derive(1, AncestorId::new(42), "martin", "anne"))]
    #[case::level_id_boundary(StoreKey::derive(14, AncestorId::new(2), "anne", "martin"))]
    fn differing_tuples_do_not_collide(#[case] other: StoreKey) {
        let base = StoreKey::derive(1, AncestorId::new(42), "anne", "martin");
        assert_ne!(base, other);
    }
}
