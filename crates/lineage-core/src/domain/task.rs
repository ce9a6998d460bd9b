//! DiscoveryTask - キュー上を流れるメッセージ
//!
//! # ワイヤ形式
//! ```json
//! { "ancestor_id": 1640524, "level": 0, "maximum_level": 2 }
//! ```
//! - `level`: このタスクを積んだ親レコードの深さ（seed は 0）
//! - `maximum_level`: トラバーサル全体で不変の深さ上限。省略時は 1（再帰なし）

use serde::{Deserialize, Serialize};

use super::{AncestorId, LineageError};

/// Hard ceiling on `maximum_level`, imposed by the execution host's recursion guard.
pub const MAX_DEPTH_CEILING: u32 = 16;

fn default_maximum_level() -> u32 {
    1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryTask {
    pub ancestor_id: AncestorId,

    /// Depth of the record that enqueued this task.
    #[serde(default)]
    pub level: u32,

    #[serde(default = "default_maximum_level")]
    pub maximum_level: u32,
}

impl DiscoveryTask {
    /// Seed task for a new traversal tree.
    pub fn seed(ancestor_id: AncestorId, maximum_level: u32) -> Self {
        Self {
            ancestor_id,
            level: 0,
            maximum_level,
        }
    }

    /// Child task for one parent of a record stored at `record_level`.
    /// `maximum_level` is inherited unchanged.
    pub fn child(&self, parent_id: AncestorId, record_level: u32) -> Self {
        Self {
            ancestor_id: parent_id,
            level: record_level,
            maximum_level: self.maximum_level,
        }
    }

    /// Level at which the record produced by this task is stored.
    pub fn record_level(&self) -> u32 {
        self.level.saturating_add(1)
    }

    pub fn check_ceiling(&self) -> Result<(), LineageError> {
        if self.maximum_level > MAX_DEPTH_CEILING {
            return Err(LineageError::DepthCeilingExceeded {
                requested: self.maximum_level,
                ceiling: MAX_DEPTH_CEILING,
            });
        }
        Ok(())
    }

    /// Fan-out only ever enqueues `level < maximum_level`; anything else did not come
    /// from a traversal (a `maximum_level` of 0 behaves like 1).
    pub fn check_level(&self) -> Result<(), LineageError> {
        let budget = self.maximum_level.max(1);
        if self.level >= budget {
            return Err(LineageError::InvalidTask(format!(
                "level={} is outside the budget maximum_level={}",
                self.level, self.maximum_level
            )));
        }
        Ok(())
    }

    pub fn from_body(body: &str) -> Result<Self, LineageError> {
        Ok(serde_json::from_str(body)?)
    }

    pub fn to_body(&self) -> Result<String, LineageError> {
        Ok(serde_json::to_string(self)?)
    }
}
