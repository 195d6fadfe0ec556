//! PackageRecords - Package Record Store の操作
//!
//! # 責務
//! - create / get / update / delete / set_active_delivery / query
//! - ID の採番（IdGenerator）と時刻（Clock）の注入
//!
//! `active_delivery_id` の整合性はここでは保証しません。
//! それを守るのは DeliveryLifecycle の呼び出し経路です。

use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::{
    DeliveryId, Entity, NewPackage, Page, PageOptions, PackageFilter, PackageId, PackageRecord,
    PackageUpdate, TrackerError,
};
use crate::ports::{Clock, DeleteOutcome, IdGenerator, PackageStore};

#[derive(Clone)]
pub struct PackageRecords {
    store: Arc<dyn PackageStore>,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
    default_page_limit: u32,
}

impl PackageRecords {
    pub fn new(
        store: Arc<dyn PackageStore>,
        ids: Arc<dyn IdGenerator>,
        clock: Arc<dyn Clock>,
        default_page_limit: u32,
    ) -> Self {
        Self {
            store,
            ids,
            clock,
            default_page_limit,
        }
    }

    pub async fn create(&self, input: NewPackage) -> Result<PackageRecord, TrackerError> {
        input.validate()?;
        let record = PackageRecord::new(self.ids.package_id(), input, self.clock.now());
        let record = self.store.insert(record).await?;
        info!(package_id = %record.package_id, "package created");
        Ok(record)
    }

    pub async fn get(&self, id: &PackageId) -> Result<PackageRecord, TrackerError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| TrackerError::not_found(Entity::Package, id))
    }

    pub async fn update(
        &self,
        id: &PackageId,
        update: PackageUpdate,
    ) -> Result<PackageRecord, TrackerError> {
        update.validate()?;
        let record = self
            .store
            .update(id, &update, self.clock.now())
            .await?
            .ok_or_else(|| TrackerError::not_found(Entity::Package, id))?;
        debug!(package_id = %id, "package updated");
        Ok(record)
    }

    /// delivery がリンクされている間は `ConflictingActiveDelivery` で拒否
    pub async fn delete(&self, id: &PackageId) -> Result<PackageRecord, TrackerError> {
        match self.store.delete_if_unlinked(id).await? {
            DeleteOutcome::Deleted(removed) => {
                info!(package_id = %id, "package deleted");
                Ok(removed)
            }
            DeleteOutcome::Linked { current } => Err(TrackerError::ConflictingActiveDelivery {
                package_id: id.to_string(),
                active_delivery_id: current.to_string(),
            }),
            DeleteOutcome::Missing => Err(TrackerError::not_found(Entity::Package, id)),
        }
    }

    /// リンクを無条件に書き換える（整合性チェックなし）
    pub async fn set_active_delivery(
        &self,
        id: &PackageId,
        delivery_id: Option<DeliveryId>,
    ) -> Result<PackageRecord, TrackerError> {
        self.store
            .set_active_delivery(id, delivery_id, self.clock.now())
            .await?
            .ok_or_else(|| TrackerError::not_found(Entity::Package, id))
    }

    pub async fn query(
        &self,
        filter: &PackageFilter,
        options: &PageOptions,
    ) -> Result<Page<PackageRecord>, TrackerError> {
        self.store
            .query(filter, options, self.default_page_limit)
            .await
    }
}
