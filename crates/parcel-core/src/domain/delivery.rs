//! Delivery record: status, last known location and lifecycle timestamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::TrackerError;
use super::ids::{DeliveryId, PackageId};
use super::location::Location;
use super::state::{DeliveryStatus, Milestone, StatusChange, TransitionPolicy};

/// DeliveryRecord は delivery ドキュメント
///
/// # 設計
/// - status と 3 つのタイムスタンプは [`DeliveryRecord::apply_status`] でのみ変わる
/// - `version` は書き込みが成功するたびにストアが上げる（楽観的排他用）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub delivery_id: DeliveryId,
    pub package_id: PackageId,
    pub status: DeliveryStatus,
    pub location: Option<Location>,
    pub pickup_time: Option<DateTime<Utc>>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub version: u64,
}

impl DeliveryRecord {
    pub fn new(delivery_id: DeliveryId, package_id: PackageId, now: DateTime<Utc>) -> Self {
        Self {
            delivery_id,
            package_id,
            status: DeliveryStatus::Open,
            location: None,
            pickup_time: None,
            start_time: None,
            end_time: None,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// 最終位置を上書き（status は問わない）
    pub fn set_location(&mut self, location: Location, now: DateTime<Utc>) {
        self.location = Some(location);
        self.updated_at = now;
    }

    /// 状態機械を `requested` に向けて進める
    pub fn apply_status(
        &mut self,
        requested: DeliveryStatus,
        now: DateTime<Utc>,
        policy: TransitionPolicy,
    ) -> Result<StatusChange, TrackerError> {
        let current = self.status;

        if let Some(milestone) = current.milestone_for(requested) {
            let slot = match milestone {
                Milestone::PickedUp => &mut self.pickup_time,
                Milestone::Started => &mut self.start_time,
                Milestone::Ended => &mut self.end_time,
            };
            // set at most once
            slot.get_or_insert(now);
            self.status = requested;
            self.updated_at = now;
            return Ok(StatusChange::Advanced(milestone));
        }

        match policy {
            TransitionPolicy::Strict => Err(TrackerError::InvalidTransition {
                delivery_id: self.delivery_id.to_string(),
                from: current,
                to: requested,
            }),
            TransitionPolicy::Lenient if current.is_terminal() => Ok(StatusChange::Ignored),
            TransitionPolicy::Lenient => {
                self.status = requested;
                self.updated_at = now;
                Ok(StatusChange::Overwritten)
            }
        }
    }
}

/// DeliveryUpdate は delivery の部分更新
///
/// クライアントが書けるのは location だけ。package 参照、status、タイムスタンプは
/// ライフサイクルエンジンが持つ。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeliveryUpdate {
    pub location: Option<Location>,
}

impl DeliveryUpdate {
    pub fn validate(&self) -> Result<(), TrackerError> {
        match &self.location {
            Some(location) => location.validate("location"),
            None => Err(TrackerError::ValidationFailed(
                "update must change at least one field".to_string(),
            )),
        }
    }
}

/// DeliveryFilter は delivery クエリの条件（指定したフィールドは完全一致）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeliveryFilter {
    pub package_id: Option<PackageId>,
    pub status: Option<DeliveryStatus>,
}

impl DeliveryFilter {
    pub fn matches(&self, record: &DeliveryRecord) -> bool {
        if let Some(id) = &self.package_id
            && &record.package_id != id
        {
            return false;
        }
        if let Some(status) = self.status
            && record.status != status
        {
            return false;
        }
        true
    }
}
