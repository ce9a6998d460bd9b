//! Domain identifiers.
//!
//! - `AncestorId`: 外部サイト上の人物 ID（サイト内で安定、サイト間では一意ではない）
//! - `MessageId`: キュー上のメッセージ ID（ULID、配送ごとではなくメッセージごと）

use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

/// 外部サイトの人物 ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AncestorId(u64);

impl AncestorId {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for AncestorId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for AncestorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// キューに積まれたメッセージの ID
///
/// 再配送されても同じ ID のまま（受信回数は queue 側の record が持つ）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(Ulid);

impl MessageId {
    pub fn generate() -> Self {
        Self(Ulid::new())
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "msg-{}", self.0)
    }
}
