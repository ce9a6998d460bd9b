//! AncestorRecord - 発見した人物 1 人分の永続化データ

use serde::{Deserialize, Serialize};

use super::{AncestorId, LineageError};

/// Fields pulled out of one source page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub first_name: String,
    pub last_name: String,
    pub father_id: Option<AncestorId>,
    pub mother_id: Option<AncestorId>,
}

/// AncestorRecord は store key ごとに一度だけ書き込まれ、以後更新も削除もされない
///
/// `father_id` / `mother_id` は親が判明している場合のみ存在する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AncestorRecord {
    pub id: AncestorId,
    pub level: u32,
    pub first_name: String,
    pub last_name: String,

    /// Fetched page, kept verbatim for provenance.
    pub html_source: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub father_id: Option<AncestorId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mother_id: Option<AncestorId>,
}

impl AncestorRecord {
    /// Build a record from an extraction.
    ///
    /// A page listing the person as their own parent is rejected as a parse error.
    pub fn from_extraction(
        id: AncestorId,
        level: u32,
        html_source: String,
        extraction: Extraction,
    ) -> Result<Self, LineageError> {
        let Extraction {
            first_name,
            last_name,
            father_id,
            mother_id,
        } = extraction;

        if father_id == Some(id) || mother_id == Some(id) {
            return Err(LineageError::Parse(format!(
                "ancestor {id} is listed as its own parent"
            )));
        }

        Ok(Self {
            id,
            level,
            first_name,
            last_name,
            html_source,
            father_id,
            mother_id,
        })
    }

    pub fn has_parents(&self) -> bool {
        self.father_id.is_some() || self.mother_id.is_some()
    }

    /// Known parents, father first.
    pub fn parent_ids(&self) -> impl Iterator<Item = AncestorId> + '_ {
        self.father_id.into_iter().chain(self.mother_id)
    }

    pub fn to_json(&self) -> Result<String, LineageError> {
        serde_json::to_string(self).map_err(|e| LineageError::Storage(format!("encode record: {e}")))
    }
}
