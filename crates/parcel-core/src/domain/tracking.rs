use serde::{Deserialize, Serialize};

use super::delivery::DeliveryRecord;
use super::package::PackageRecord;

/// TrackingView は package とリンク中の delivery の結合ビュー
///
/// 必要なときに組み立て、保存はしない。delivery が無いかリンク先が存在しなければ
/// `delivery` は `None`。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingView {
    pub package: PackageRecord,
    pub delivery: Option<DeliveryRecord>,
}

impl TrackingView {
    pub fn has_delivery(&self) -> bool {
        self.delivery.is_some()
    }
}
