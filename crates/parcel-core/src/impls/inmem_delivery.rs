//! InMemoryDeliveryStore - 開発用の delivery ストア
//!
//! # 学習ポイント
//! - バージョン番号による楽観的排他（compare-and-swap）
//! - ロックを握ったまま await しない

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::pagination::paginate;
use crate::domain::{
    DeliveryFilter, DeliveryId, DeliveryRecord, DeliveryStatus, Entity, Page, PageOptions,
    TrackerError,
};
use crate::ports::{DeliveryStore, ReplaceOutcome};

#[derive(Clone, Default)]
pub struct InMemoryDeliveryStore {
    records: Arc<Mutex<HashMap<DeliveryId, DeliveryRecord>>>,
}

impl InMemoryDeliveryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }
}

#[async_trait]
impl DeliveryStore for InMemoryDeliveryStore {
    async fn insert(&self, mut record: DeliveryRecord) -> Result<DeliveryRecord, TrackerError> {
        let mut records = self.records.lock().await;
        if records.contains_key(&record.delivery_id) {
            return Err(TrackerError::DuplicateId {
                entity: Entity::Delivery,
                id: record.delivery_id.to_string(),
            });
        }
        record.version = 1;
        records.insert(record.delivery_id.clone(), record.clone());
        Ok(record)
    }

    async fn get(&self, id: &DeliveryId) -> Result<Option<DeliveryRecord>, TrackerError> {
        Ok(self.records.lock().await.get(id).cloned())
    }

    async fn replace(&self, mut record: DeliveryRecord) -> Result<ReplaceOutcome, TrackerError> {
        let mut records = self.records.lock().await;
        let Some(stored) = records.get_mut(&record.delivery_id) else {
            return Ok(ReplaceOutcome::Missing);
        };
        if stored.version != record.version {
            return Ok(ReplaceOutcome::Stale {
                current_version: stored.version,
            });
        }
        record.version += 1;
        *stored = record.clone();
        Ok(ReplaceOutcome::Replaced(record))
    }

    async fn delete(&self, id: &DeliveryId) -> Result<Option<DeliveryRecord>, TrackerError> {
        Ok(self.records.lock().await.remove(id))
    }

    async fn query(
        &self,
        filter: &DeliveryFilter,
        options: &PageOptions,
        default_limit: u32,
    ) -> Result<Page<DeliveryRecord>, TrackerError> {
        let matching: Vec<DeliveryRecord> = {
            let records = self.records.lock().await;
            records.values().filter(|r| filter.matches(r)).cloned().collect()
        };
        Ok(paginate(matching, options, default_limit))
    }

    async fn counts_by_status(&self) -> Result<HashMap<DeliveryStatus, usize>, TrackerError> {
        let records = self.records.lock().await;
        let mut counts = HashMap::new();
        for record in records.values() {
            *counts.entry(record.status).or_insert(0) += 1;
        }
        Ok(counts)
    }
}
