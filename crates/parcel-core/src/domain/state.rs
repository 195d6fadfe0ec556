//! Delivery status state machine.

use std::fmt;

use serde::{Deserialize, Serialize};

/// DeliveryStatus は delivery の状態
///
/// 状態遷移:
/// - Open -> PickUp          （pickup_time を刻む）
/// - PickUp -> InTransit     （start_time を刻む）
/// - InTransit -> Delivered  （end_time を刻む）
/// - InTransit -> Failed     （end_time を刻む）
///
/// `Delivered` と `Failed` は終端。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeliveryStatus {
    /// 作成済み、集荷待ち
    Open,

    /// 集荷済み
    PickUp,

    /// 配送中
    InTransit,

    /// 受取人に渡した
    Delivered,

    /// この配送は断念
    Failed,
}

impl DeliveryStatus {
    /// 終端状態か（これ以上遷移しない）
    pub fn is_terminal(self) -> bool {
        matches!(self, DeliveryStatus::Delivered | DeliveryStatus::Failed)
    }

    /// 遷移表を引く。`self` から `requested` への遷移で刻むタイムスタンプを返し、
    /// 表に無い組なら `None`
    pub fn milestone_for(self, requested: DeliveryStatus) -> Option<Milestone> {
        use DeliveryStatus::*;
        match (self, requested) {
            (Open, PickUp) => Some(Milestone::PickedUp),
            (PickUp, InTransit) => Some(Milestone::Started),
            (InTransit, Delivered | Failed) => Some(Milestone::Ended),
            _ => None,
        }
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DeliveryStatus::Open => "Open",
            DeliveryStatus::PickUp => "PickUp",
            DeliveryStatus::InTransit => "InTransit",
            DeliveryStatus::Delivered => "Delivered",
            DeliveryStatus::Failed => "Failed",
        };
        f.write_str(s)
    }
}

/// Milestone は正規の遷移で刻むタイムスタンプ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Milestone {
    /// `pickup_time`
    PickedUp,
    /// `start_time`
    Started,
    /// `end_time`
    Ended,
}

/// TransitionPolicy は遷移表に無い (現在, 要求) の組をどう扱うか
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionPolicy {
    /// `InvalidTransition` で拒否
    #[default]
    Strict,

    /// タイムスタンプを刻まずに status を上書き
    ///
    /// 終端の delivery は変えず、要求を無視する。
    Lenient,
}

/// StatusChange は status 要求を適用した結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChange {
    /// 表どおりに遷移し、タイムスタンプを刻んだ
    Advanced(Milestone),

    /// Lenient: status だけ上書きした
    Overwritten,

    /// Lenient で終端だった: 何も変えていない
    Ignored,
}
