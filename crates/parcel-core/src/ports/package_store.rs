//! PackageStore port - package ドキュメントの正本
//!
//! 外部ドキュメントストアの前提:
//! - 単一ドキュメントの書き込みはアトミック
//! - `package_id` に一意制約
//! - 複数ドキュメントのトランザクションはない
//!
//! そのため engine が必要とする「リンクの張り替え」は
//! compare-and-set（期待値つき更新）として 1 ドキュメント内で完結させます。
//! 「リンクが空なら削除」も同じ理由で 1 操作にしています。

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    DeliveryId, Page, PageOptions, PackageFilter, PackageId, PackageRecord, PackageUpdate,
    TrackerError,
};

/// LinkOutcome は `active_delivery_id` への compare-and-set の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkOutcome {
    /// 期待値と一致し、新しい値に書き換えた
    Swapped,

    /// 別の値が入っていた（何も書いていない）
    Mismatch { current: Option<DeliveryId> },

    /// package が存在しない
    Missing,
}

/// DeleteOutcome は条件付き削除の結果
#[derive(Debug, Clone, PartialEq)]
pub enum DeleteOutcome {
    Deleted(PackageRecord),

    /// delivery がリンクされていたので削除しなかった
    Linked { current: DeliveryId },

    Missing,
}

#[async_trait]
pub trait PackageStore: Send + Sync {
    /// 新規挿入。ID が使用済みなら `DuplicateId`
    async fn insert(&self, record: PackageRecord) -> Result<PackageRecord, TrackerError>;

    async fn get(&self, id: &PackageId) -> Result<Option<PackageRecord>, TrackerError>;

    /// `update` をマージ。存在しなければ `None`
    async fn update(
        &self,
        id: &PackageId,
        update: &PackageUpdate,
        now: DateTime<Utc>,
    ) -> Result<Option<PackageRecord>, TrackerError>;

    /// `active_delivery_id` が空のときだけ削除する
    ///
    /// 確認と削除は同じ書き込みの中で行うこと。
    async fn delete_if_unlinked(&self, id: &PackageId) -> Result<DeleteOutcome, TrackerError>;

    /// リンクを無条件に上書き。存在しなければ `None`
    async fn set_active_delivery(
        &self,
        id: &PackageId,
        delivery_id: Option<DeliveryId>,
        now: DateTime<Utc>,
    ) -> Result<Option<PackageRecord>, TrackerError>;

    /// リンクが `expected` と一致する場合だけ `new` に書き換える
    async fn compare_and_set_active_delivery(
        &self,
        id: &PackageId,
        expected: Option<&DeliveryId>,
        new: Option<DeliveryId>,
        now: DateTime<Utc>,
    ) -> Result<LinkOutcome, TrackerError>;

    async fn query(
        &self,
        filter: &PackageFilter,
        options: &PageOptions,
        default_limit: u32,
    ) -> Result<Page<PackageRecord>, TrackerError>;
}
