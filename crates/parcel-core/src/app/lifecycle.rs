//! DeliveryLifecycle - 配送ライフサイクルエンジン
//!
//! # 責務
//! - delivery ドキュメントの所有と状態遷移の強制
//! - ライフサイクルのタイムスタンプ（pickup / start / end）の刻印
//! - package 側の `active_delivery_id` リンクとの整合性維持
//!
//! # 一貫性の設計
//! ストアは単一ドキュメントのアトミック書き込みしか持たないので、
//! 2 ドキュメントにまたがる操作は次のように組み立てます。
//!
//! - **create**: delivery を挿入してから package のリンクを CAS（読んだ値 → 新 ID）で確保。
//!   リンクを取れなければ挿入した delivery を消して補償する（saga）。
//!   リンク先が存在しないか終端済みなら、そのリンクは古いものとして奪い取る。
//! - **終端遷移 / delete**: リンクがまだ自分を指している場合だけ CAS で外す。
//!   外すのに失敗しても、古いリンクは次の create が回収する。
//! - **delivery 更新**: version による楽観的排他。競合したら読み直して再試行。

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use super::status::DeliveryCounts;
use super::tracking::TrackingComposer;
use crate::domain::{
    DeliveryFilter, DeliveryId, DeliveryRecord, DeliveryStatus, DeliveryUpdate, Entity, Location,
    Page, PageOptions, PackageId, StatusChange, TrackerError, TrackingView, TransitionPolicy,
};
use crate::ports::{Clock, DeliveryStore, IdGenerator, LinkOutcome, PackageStore, ReplaceOutcome};

/// LifecycleSettings は engine が毎回参照する設定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleSettings {
    pub policy: TransitionPolicy,
    pub max_write_retries: u32,
    pub default_page_limit: u32,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            policy: TransitionPolicy::Strict,
            max_write_retries: 5,
            default_page_limit: 10,
        }
    }
}

#[derive(Clone)]
pub struct DeliveryLifecycle {
    packages: Arc<dyn PackageStore>,
    deliveries: Arc<dyn DeliveryStore>,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
    tracking: TrackingComposer,
    settings: LifecycleSettings,
}

impl DeliveryLifecycle {
    pub fn new(
        packages: Arc<dyn PackageStore>,
        deliveries: Arc<dyn DeliveryStore>,
        ids: Arc<dyn IdGenerator>,
        clock: Arc<dyn Clock>,
        settings: LifecycleSettings,
    ) -> Self {
        let tracking = TrackingComposer::new(packages.clone(), deliveries.clone());
        Self {
            packages,
            deliveries,
            ids,
            clock,
            tracking,
            settings,
        }
    }

    pub fn settings(&self) -> LifecycleSettings {
        self.settings
    }

    /// package に新しい delivery を開く
    ///
    /// package が無ければ `NotFound`、生きている delivery が既にリンクされていれば
    /// `ConflictingActiveDelivery`。同じ package への同時呼び出しは 1 つだけ成功する。
    /// リンク先が存在しないか終端済みなら、そのリンクは奪い取ってよい。
    #[instrument(skip(self, package_id), fields(%package_id))]
    pub async fn create(&self, package_id: &PackageId) -> Result<DeliveryRecord, TrackerError> {
        let package = self
            .packages
            .get(package_id)
            .await?
            .ok_or_else(|| TrackerError::not_found(Entity::Package, package_id))?;
        if let Some(active) = &package.active_delivery_id {
            if !self.is_stale_link(active).await? {
                return Err(conflict(package_id, active));
            }
        }

        let delivery_id = self.ids.delivery_id();
        let now = self.clock.now();
        let record = DeliveryRecord::new(delivery_id.clone(), package_id.clone(), now);
        let created = self.deliveries.insert(record).await?;

        match self
            .claim_link(package_id, &delivery_id, package.active_delivery_id, now)
            .await
        {
            Ok(()) => {
                info!(%delivery_id, "delivery created");
                Ok(created)
            }
            Err(err) => {
                debug!(%delivery_id, error = %err, "package link not claimed, discarding delivery");
                self.discard(&delivery_id).await;
                Err(err)
            }
        }
    }

    /// 最終位置を上書き。status は問わない
    #[instrument(skip(self, delivery_id), fields(%delivery_id))]
    pub async fn apply_location(
        &self,
        delivery_id: &DeliveryId,
        location: Location,
    ) -> Result<DeliveryRecord, TrackerError> {
        location.validate("location")?;
        self.write(delivery_id, |record, now| {
            record.set_location(location, now);
            Ok(true)
        })
        .await
    }

    /// 状態機械を進め、対応するタイムスタンプを刻む
    ///
    /// `Delivered` / `Failed` に到達したら package のリンクを外す。
    #[instrument(skip(self, delivery_id), fields(%delivery_id))]
    pub async fn apply_status(
        &self,
        delivery_id: &DeliveryId,
        requested: DeliveryStatus,
    ) -> Result<DeliveryRecord, TrackerError> {
        let policy = self.settings.policy;
        let mut change = None;
        let updated = self
            .write(delivery_id, |record, now| {
                let applied = record.apply_status(requested, now, policy)?;
                change = Some(applied);
                Ok(applied != StatusChange::Ignored)
            })
            .await?;

        match change {
            Some(StatusChange::Advanced(milestone)) => {
                info!(status = %updated.status, ?milestone, "delivery advanced");
            }
            Some(StatusChange::Overwritten) => {
                warn!(status = %updated.status, "status overwritten outside the transition table");
            }
            Some(StatusChange::Ignored) | None => {
                debug!(status = %updated.status, %requested, "terminal delivery left unchanged");
            }
        }

        if updated.is_terminal() {
            self.release_link(&updated.package_id, &updated.delivery_id).await;
        }
        Ok(updated)
    }

    /// delivery とその package を結合したビュー
    pub async fn track_by_delivery_id(
        &self,
        delivery_id: &DeliveryId,
    ) -> Result<TrackingView, TrackerError> {
        self.tracking.track_delivery(delivery_id).await
    }

    pub async fn get(&self, delivery_id: &DeliveryId) -> Result<DeliveryRecord, TrackerError> {
        self.deliveries
            .get(delivery_id)
            .await?
            .ok_or_else(|| TrackerError::not_found(Entity::Delivery, delivery_id))
    }

    /// クライアントからの更新。書けるのは location だけ
    #[instrument(skip(self, delivery_id, update), fields(%delivery_id))]
    pub async fn update(
        &self,
        delivery_id: &DeliveryId,
        update: DeliveryUpdate,
    ) -> Result<DeliveryRecord, TrackerError> {
        update.validate()?;
        let Some(location) = update.location else {
            return self.get(delivery_id).await;
        };
        self.write(delivery_id, |record, now| {
            record.set_location(location, now);
            Ok(true)
        })
        .await
    }

    #[instrument(skip(self, delivery_id), fields(%delivery_id))]
    pub async fn delete(&self, delivery_id: &DeliveryId) -> Result<DeliveryRecord, TrackerError> {
        let removed = self
            .deliveries
            .delete(delivery_id)
            .await?
            .ok_or_else(|| TrackerError::not_found(Entity::Delivery, delivery_id))?;
        self.release_link(&removed.package_id, delivery_id).await;
        info!("delivery deleted");
        Ok(removed)
    }

    pub async fn query(
        &self,
        filter: &DeliveryFilter,
        options: &PageOptions,
    ) -> Result<Page<DeliveryRecord>, TrackerError> {
        self.deliveries
            .query(filter, options, self.settings.default_page_limit)
            .await
    }

    pub async fn counts(&self) -> Result<DeliveryCounts, TrackerError> {
        let by_status = self.deliveries.counts_by_status().await?;
        Ok(DeliveryCounts::from_map(&by_status))
    }

    /// 楽観的排他つきの read-modify-write
    ///
    /// `mutate` が `false` を返したら書き込まず、読んだレコードをそのまま返す。
    async fn write<F>(
        &self,
        delivery_id: &DeliveryId,
        mut mutate: F,
    ) -> Result<DeliveryRecord, TrackerError>
    where
        F: FnMut(&mut DeliveryRecord, DateTime<Utc>) -> Result<bool, TrackerError> + Send,
    {
        let attempts = self.settings.max_write_retries.max(1);
        for attempt in 1..=attempts {
            let mut record = self.get(delivery_id).await?;
            if !mutate(&mut record, self.clock.now())? {
                return Ok(record);
            }
            match self.deliveries.replace(record).await? {
                ReplaceOutcome::Replaced(stored) => return Ok(stored),
                ReplaceOutcome::Missing => {
                    return Err(TrackerError::not_found(Entity::Delivery, delivery_id));
                }
                ReplaceOutcome::Stale { current_version } => {
                    debug!(attempt, current_version, "stale delivery write, retrying");
                }
            }
        }
        Err(TrackerError::ConcurrentModification {
            entity: Entity::Delivery,
            id: delivery_id.to_string(),
            attempts,
        })
    }

    /// リンクを `delivery_id` に向ける（CAS）
    ///
    /// 期待値は最初に読んだリンク。食い違ったら今のリンク先を調べ、
    /// 存在しないか終端済みならそれを期待値にして取り直す。
    async fn claim_link(
        &self,
        package_id: &PackageId,
        delivery_id: &DeliveryId,
        mut expected: Option<DeliveryId>,
        now: DateTime<Utc>,
    ) -> Result<(), TrackerError> {
        let attempts = self.settings.max_write_retries.max(1);
        for attempt in 1..=attempts {
            let outcome = self
                .packages
                .compare_and_set_active_delivery(
                    package_id,
                    expected.as_ref(),
                    Some(delivery_id.clone()),
                    now,
                )
                .await?;
            match outcome {
                LinkOutcome::Swapped => {
                    if let Some(stale) = expected {
                        info!(%stale, "reclaimed stale package link");
                    }
                    return Ok(());
                }
                LinkOutcome::Missing => {
                    return Err(TrackerError::not_found(Entity::Package, package_id));
                }
                LinkOutcome::Mismatch { current: None } => expected = None,
                LinkOutcome::Mismatch {
                    current: Some(current),
                } => {
                    if !self.is_stale_link(&current).await? {
                        debug!(active = %current, "package already linked");
                        return Err(conflict(package_id, &current));
                    }
                    expected = Some(current);
                }
            }
            debug!(attempt, "package link moved, retrying claim");
        }
        Err(TrackerError::ConcurrentModification {
            entity: Entity::Package,
            id: package_id.to_string(),
            attempts,
        })
    }

    /// リンク先が存在しないか終端済みなら true
    async fn is_stale_link(&self, linked: &DeliveryId) -> Result<bool, TrackerError> {
        Ok(match self.deliveries.get(linked).await? {
            Some(delivery) => delivery.is_terminal(),
            None => true,
        })
    }

    /// リンクがまだ `delivery_id` を指していれば外す
    ///
    /// 失敗はログに残すだけ。delivery の書き込みは済んでおり、
    /// 残ったリンクは次の `create` が奪い取る。
    async fn release_link(&self, package_id: &PackageId, delivery_id: &DeliveryId) {
        let outcome = self
            .packages
            .compare_and_set_active_delivery(package_id, Some(delivery_id), None, self.clock.now())
            .await;
        match outcome {
            Ok(LinkOutcome::Swapped) => {
                debug!(%package_id, %delivery_id, "package link released");
            }
            Ok(LinkOutcome::Mismatch { .. } | LinkOutcome::Missing) => {}
            Err(err) => {
                warn!(%package_id, %delivery_id, error = %err, "failed to release package link");
            }
        }
    }

    /// リンクを取れなかった delivery を消す（create の補償）
    async fn discard(&self, delivery_id: &DeliveryId) {
        if let Err(err) = self.deliveries.delete(delivery_id).await {
            warn!(%delivery_id, error = %err, "failed to discard unlinked delivery");
        }
    }
}

fn conflict(package_id: &PackageId, active: &DeliveryId) -> TrackerError {
    TrackerError::ConflictingActiveDelivery {
        package_id: package_id.to_string(),
        active_delivery_id: active.to_string(),
    }
}
