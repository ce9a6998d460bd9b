//! InMemoryRecordStore - テスト用の RecordStore
//!
//! check と write を同じロックの中で行うので、同じ key への同時書き込みでも
//! Stored になるのは 1 回だけ。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{AncestorRecord, Claim, LineageError, StoreKey};
use crate::ports::RecordStore;

#[derive(Default)]
pub struct InMemoryRecordStore {
    records: Mutex<HashMap<StoreKey, String>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }

    pub async fn get(&self, key: &StoreKey) -> Option<AncestorRecord> {
        let records = self.records.lock().await;
        records
            .get(key)
            .and_then(|json| serde_json::from_str(json).ok())
    }

    /// Stored keys, sorted.
    pub async fn keys(&self) -> Vec<StoreKey> {
        let mut keys: Vec<_> = self.records.lock().await.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn exists(&self, key: &StoreKey) -> Result<bool, LineageError> {
        Ok(self.records.lock().await.contains_key(key))
    }

    async fn write_if_absent(
        &self,
        key: &StoreKey,
        record: &AncestorRecord,
    ) -> Result<Claim, LineageError> {
        let json = record.to_json()?;
        let mut records = self.records.lock().await;
        if records.contains_key(key) {
            return Ok(Claim::AlreadyExisted);
        }
        records.insert(key.clone(), json);
        Ok(Claim::Stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AncestorId;
    use std::sync::Arc;

    fn record() -> AncestorRecord {
        AncestorRecord {
            id: AncestorId::new(1640524),
            level: 1,
            first_name: "charles".into(),
            last_name: "de gaulle".into(),
            html_source: "<html/>".into(),
            father_id: None,
            mother_id: None,
        }
    }

    #[tokio::test]
    async fn absent_key_is_not_an_error() {
        let store = InMemoryRecordStore::new();
        let key = StoreKey::for_record(&record());
        assert!(!store.exists(&key).await.unwrap());
    }

    #[tokio::test]
    async fn second_write_reports_existing_record() {
        let store = InMemoryRecordStore::new();
        let record = record();
        let key = StoreKey::for_record(&record);

        assert_eq!(store.write_if_absent(&key, &record).await.unwrap(), Claim::Stored);
        assert!(store.exists(&key).await.unwrap());

        let mut changed = record.clone();
        changed.html_source = "<html>changed</html>".into();
        assert_eq!(
            store.write_if_absent(&key, &changed).await.unwrap(),
            Claim::AlreadyExisted
        );
        assert_eq!(store.get(&key).await.unwrap(), record);
    }

    #[tokio::test]
    async fn concurrent_writers_have_exactly_one_winner() {
        let store = Arc::new(InMemoryRecordStore::new());
        let record = record();
        let key = StoreKey::for_record(&record);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            let record = record.clone();
            let key = key.clone();
            handles.push(tokio::spawn(async move {
                store.write_if_absent(&key, &record).await.unwrap()
            }));
        }
        let mut stored = 0;
        for handle in handles {
            if handle.await.unwrap() == Claim::Stored {
                stored += 1;
            }
        }
        assert_eq!(stored, 1);
        assert_eq!(store.len().await, 1);
    }
}
