//! DeliveryStore port - delivery ドキュメントの正本
//!
//! 書き込みはバージョン付き（楽観的排他）。読んだ時点の `version` を
//! 期待値として渡し、一致しなければ `Stale` が返ります。

use std::collections::HashMap;

use async_trait::async_trait;

use crate::domain::{
    DeliveryFilter, DeliveryId, DeliveryRecord, DeliveryStatus, Page, PageOptions, TrackerError,
};

/// ReplaceOutcome はバージョン付き置き換えの結果
#[derive(Debug, Clone, PartialEq)]
pub enum ReplaceOutcome {
    /// 書き込んだ（新しい version の保存済みドキュメント）
    Replaced(DeliveryRecord),

    /// 先に誰かが書いた（現在の version を返す）
    Stale { current_version: u64 },

    /// delivery が存在しない
    Missing,
}

#[async_trait]
pub trait DeliveryStore: Send + Sync {
    /// 新規挿入。ID が使用済みなら `DuplicateId`
    async fn insert(&self, record: DeliveryRecord) -> Result<DeliveryRecord, TrackerError>;

    async fn get(&self, id: &DeliveryId) -> Result<Option<DeliveryRecord>, TrackerError>;

    /// 保存中の version が `record.version` と一致する場合だけ置き換える
    ///
    /// 保存されるのは `version + 1`。
    async fn replace(&self, record: DeliveryRecord) -> Result<ReplaceOutcome, TrackerError>;

    /// 削除して返す。存在しなければ `None`
    async fn delete(&self, id: &DeliveryId) -> Result<Option<DeliveryRecord>, TrackerError>;

    async fn query(
        &self,
        filter: &DeliveryFilter,
        options: &PageOptions,
        default_limit: u32,
    ) -> Result<Page<DeliveryRecord>, TrackerError>;

    /// status ごとの件数（観測用）
    async fn counts_by_status(&self) -> Result<HashMap<DeliveryStatus, usize>, TrackerError>;
}
