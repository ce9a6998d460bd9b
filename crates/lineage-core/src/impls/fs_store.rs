//! FsRecordStore - ディレクトリをオブジェクトストア代わりに使う RecordStore
//!
//! 各レコードは `<dir>/<store key>` に JSON で置かれる（key 自体が `.json` で終わる）。
//!
//! # write_if_absent
//! 1. 一時ファイルに全体を書く
//! 2. `hard_link(tmp, key)`：key が既にあれば AlreadyExists で失敗する
//! 3. 一時ファイルを消す
//!
//! 途中で落ちても key のファイルが中途半端な内容になることはない。

use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use ulid::Ulid;

use crate::domain::{AncestorRecord, Claim, LineageError, StoreKey};
use crate::ports::RecordStore;

pub struct FsRecordStore {
    dir: PathBuf,
}

impl FsRecordStore {
    /// Open (and create if needed) the store directory.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, LineageError> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| storage_error("create store dir", &dir, e))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &StoreKey) -> PathBuf {
        self.dir.join(key.as_str())
    }

    #[cfg(test)]
    async fn get(&self, key: &StoreKey) -> Result<Option<AncestorRecord>, LineageError> {
        let path = self.path_for(key);
        match tokio::fs::read_to_string(&path).await {
            Ok(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|e| LineageError::Storage(format!("decode {}: {e}", path.display()))),
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(None),
            Err(e) => Err(storage_error("read", &path, e)),
        }
    }
}

fn storage_error(action: &str, path: &Path, err: std::io::Error) -> LineageError {
    LineageError::Storage(format!("{action} {}: {err}", path.display()))
}

#[async_trait]
impl RecordStore for FsRecordStore {
    async fn exists(&self, key: &StoreKey) -> Result<bool, LineageError> {
        let path = self.path_for(key);
        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| storage_error("stat", &path, e))
    }

    async fn write_if_absent(
        &self,
        key: &StoreKey,
        record: &AncestorRecord,
    ) -> Result<Claim, LineageError> {
        let path = self.path_for(key);
        if self.exists(key).await? {
            return Ok(Claim::AlreadyExisted);
        }

        let tmp = self.dir.join(format!(".{}.{}.tmp", key.as_str(), Ulid::new()));
        let json = record.to_json()?;
        {
            let mut file = tokio::fs::File::create(&tmp)
                .await
                .map_err(|e| storage_error("create", &tmp, e))?;
            file.write_all(json.as_bytes())
                .await
                .map_err(|e| storage_error("write", &tmp, e))?;
            file.sync_all()
                .await
                .map_err(|e| storage_error("sync", &tmp, e))?;
        }

        let linked = tokio::fs::hard_link(&tmp, &path).await;
        let _ = tokio::fs::remove_file(&tmp).await;
        match linked {
            Ok(()) => {
                debug!(key = %key, "record written");
                Ok(Claim::Stored)
            }
            Err(e) if e.kind() == IoErrorKind::AlreadyExists => Ok(Claim::AlreadyExisted),
            Err(e) => Err(storage_error("link", &path, e)),
        }
    }
}
