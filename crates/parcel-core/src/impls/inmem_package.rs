//! InMemoryPackageStore - 開発用の package ストア
//!
//! # 実装詳細
//! - HashMap<PackageId, PackageRecord> を tokio Mutex で保護
//! - 1 回のロック = 1 ドキュメントのアトミック書き込み

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::domain::pagination::paginate;
use crate::domain::{
    DeliveryId, Entity, Page, PageOptions, PackageFilter, PackageId, PackageRecord, PackageUpdate,
    TrackerError,
};
use crate::ports::{DeleteOutcome, LinkOutcome, PackageStore};

#[derive(Clone, Default)]
pub struct InMemoryPackageStore {
    records: Arc<Mutex<HashMap<PackageId, PackageRecord>>>,
}

impl InMemoryPackageStore {
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
impl PackageStore for InMemoryPackageStore {
    async fn insert(&self, record: PackageRecord) -> Result<PackageRecord, TrackerError> {
        let mut records = self.records.lock().await;
        if records.contains_key(&record.package_id) {
            return Err(TrackerError::DuplicateId {
                entity: Entity::Package,
                id: record.package_id.to_string(),
            });
        }
        records.insert(record.package_id.clone(), record.clone());
        Ok(record)
    }

    async fn get(&self, id: &PackageId) -> Result<Option<PackageRecord>, TrackerError> {
        Ok(self.records.lock().await.get(id).cloned())
    }

    async fn update(
        &self,
        id: &PackageId,
        update: &PackageUpdate,
        now: DateTime<Utc>,
    ) -> Result<Option<PackageRecord>, TrackerError> {
        let mut records = self.records.lock().await;
        Ok(records.get_mut(id).map(|record| {
            record.apply(update, now);
            record.clone()
        }))
    }

    async fn delete_if_unlinked(&self, id: &PackageId) -> Result<DeleteOutcome, TrackerError> {
        let mut records = self.records.lock().await;
        let Some(record) = records.get(id) else {
            return Ok(DeleteOutcome::Missing);
        };
        if let Some(current) = &record.active_delivery_id {
            return Ok(DeleteOutcome::Linked {
                current: current.clone(),
            });
        }
        Ok(records
            .remove(id)
            .map_or(DeleteOutcome::Missing, DeleteOutcome::Deleted))
    }

    async fn set_active_delivery(
        &self,
        id: &PackageId,
        delivery_id: Option<DeliveryId>,
        now: DateTime<Utc>,
    ) -> Result<Option<PackageRecord>, TrackerError> {
        let mut records = self.records.lock().await;
        Ok(records.get_mut(id).map(|record| {
            record.set_active_delivery(delivery_id, now);
            record.clone()
        }))
    }

    async fn compare_and_set_active_delivery(
        &self,
        id: &PackageId,
        expected: Option<&DeliveryId>,
        new: Option<DeliveryId>,
        now: DateTime<Utc>,
    ) -> Result<LinkOutcome, TrackerError> {
        let mut records = self.records.lock().await;
        let Some(record) = records.get_mut(id) else {
            return Ok(LinkOutcome::Missing);
        };
        if record.active_delivery_id.as_ref() != expected {
            return Ok(LinkOutcome::Mismatch {
                current: record.active_delivery_id.clone(),
            });
        }
        record.set_active_delivery(new, now);
        Ok(LinkOutcome::Swapped)
    }

    async fn query(
        &self,
        filter: &PackageFilter,
        options: &PageOptions,
        default_limit: u32,
    ) -> Result<Page<PackageRecord>, TrackerError> {
        let matching: Vec<PackageRecord> = {
            let records = self.records.lock().await;
            records.values().filter(|r| filter.matches(r)).cloned().collect()
        };
        Ok(paginate(matching, options, default_limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::package::fixtures::new_package;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 8, 25, 10, 0, 0).unwrap()
    }

    fn record(id: &str) -> PackageRecord {
        PackageRecord::new(PackageId::new(id), new_package(), t0())
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_ids() {
        let store = InMemoryPackageStore::new();
        store.insert(record("PKG1")).await.unwrap();

        let err = store.insert(record("PKG1")).await.unwrap_err();
        assert!(matches!(err, TrackerError::DuplicateId { entity: Entity::Package, .. }));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn compare_and_set_only_swaps_on_match() {
        let store = InMemoryPackageStore::new();
        let id = PackageId::new("PKG1");
        store.insert(record("PKG1")).await.unwrap();

        let first = store
            .compare_and_set_active_delivery(&id, None, Some(DeliveryId::new("DEL1")), t0())
            .await
            .unwrap();
        assert_eq!(first, LinkOutcome::Swapped);
        let stored = store.get(&id).await.unwrap().unwrap();
        assert_eq!(stored.active_delivery_id, Some(DeliveryId::new("DEL1")));

        let second = store
            .compare_and_set_active_delivery(&id, None, Some(DeliveryId::new("DEL2")), t0())
            .await
            .unwrap();
        assert_eq!(
            second,
            LinkOutcome::Mismatch {
                current: Some(DeliveryId::new("DEL1"))
            }
        );

        let missing = store
            .compare_and_set_active_delivery(&PackageId::new("PKG404"), None, None, t0())
            .await
            .unwrap();
        assert_eq!(missing, LinkOutcome::Missing);
    }

    #[tokio::test]
    async fn delete_if_unlinked_checks_the_link_in_the_same_write() {
        let store = InMemoryPackageStore::new();
        let id = PackageId::new("PKG1");
        store.insert(record("PKG1")).await.unwrap();
        store
            .set_active_delivery(&id, Some(DeliveryId::new("DEL1")), t0())
            .await
            .unwrap();

        let refused = store.delete_if_unlinked(&id).await.unwrap();
        assert_eq!(
            refused,
            DeleteOutcome::Linked {
                current: DeliveryId::new("DEL1")
            }
        );
        assert_eq!(store.len().await, 1);

        store.set_active_delivery(&id, None, t0()).await.unwrap();
        let removed = store.delete_if_unlinked(&id).await.unwrap();
        assert!(matches!(removed, DeleteOutcome::Deleted(ref r) if r.package_id == id));
        assert!(store.is_empty().await);

        assert_eq!(store.delete_if_unlinked(&id).await.unwrap(), DeleteOutcome::Missing);
    }

    #[tokio::test]
    async fn query_filters_then_pages() {
        let store = InMemoryPackageStore::new();
        for i in 0..5 {
            let mut r = record(&format!("PKG{i}"));
            if i % 2 == 0 {
                r.to_name = "Bob Brown".to_string();
            }
            store.insert(r).await.unwrap();
        }

        let filter = PackageFilter {
            to_name: Some("Bob Brown".to_string()),
            ..Default::default()
        };
        let page = store
            .query(&filter, &PageOptions::new(2, 1).sorted_by("package_id:desc"), 10)
            .await
            .unwrap();

        assert_eq!(page.total_results, 3);
        assert_eq!(page.total_pages, 2);
        let ids: Vec<&str> = page.results.iter().map(|r| r.package_id.as_str()).collect();
        assert_eq!(ids, vec!["PKG4", "PKG2"]);
    }
}
