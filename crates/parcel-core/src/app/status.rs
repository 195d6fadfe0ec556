//! Status - 稼働状況のスナップショット
//!
//! ステータスごとの delivery 件数と、ハブに繋がっているライブ接続数。

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::DeliveryStatus;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryCounts {
    pub open: usize,
    pub pick_up: usize,
    pub in_transit: usize,
    pub delivered: usize,
    pub failed: usize,
}

impl DeliveryCounts {
    pub fn from_map(by_status: &HashMap<DeliveryStatus, usize>) -> Self {
        let get = |status| by_status.get(&status).copied().unwrap_or(0);
        Self {
            open: get(DeliveryStatus::Open),
            pick_up: get(DeliveryStatus::PickUp),
            in_transit: get(DeliveryStatus::InTransit),
            delivered: get(DeliveryStatus::Delivered),
            failed: get(DeliveryStatus::Failed),
        }
    }

    pub fn total(&self) -> usize {
        self.open + self.pick_up + self.in_transit + self.delivered + self.failed
    }

    /// まだ package のリンクを持ち得る（非終端の）delivery 数
    pub fn active(&self) -> usize {
        self.open + self.pick_up + self.in_transit
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub deliveries: DeliveryCounts,
    pub connections: usize,
}
