//! Events - ライブ接続で流れるメッセージ
//!
//! # Inbound (client → hub)
//! ```json
//! { "event": "location_changed", "data": { "delivery_id": "DEL1A2B3C", "location": { "lat": 1.0, "lng": 2.0 } } }
//! { "event": "status_changed",   "data": { "delivery_id": "DEL1A2B3C", "status": "PickUp" } }
//! ```
//!
//! # Outbound (hub → client)
//! ```json
//! { "event": "delivery_updated", "delivery": { ... } }
//! { "event": "error", "message": "Delivery not found: DEL1A2B3C" }
//! ```

use serde::{Deserialize, Serialize};

use super::delivery::DeliveryRecord;
use super::ids::DeliveryId;
use super::location::Location;
use super::state::DeliveryStatus;
use super::tracking::TrackingView;

/// InboundEvent はライブ接続から受け取るイベント
///
/// `delivery_id` はワイヤ上では省略可能にしてあり、欠けたものと JSON でないものを
/// 区別してログに残せる（どちらも捨てる）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum InboundEvent {
    LocationChanged {
        delivery_id: Option<DeliveryId>,
        location: Location,
    },
    StatusChanged {
        delivery_id: Option<DeliveryId>,
        status: DeliveryStatus,
    },
}

impl InboundEvent {
    pub fn name(&self) -> &'static str {
        match self {
            InboundEvent::LocationChanged { .. } => "location_changed",
            InboundEvent::StatusChanged { .. } => "status_changed",
        }
    }

    pub fn delivery_id(&self) -> Option<&DeliveryId> {
        match self {
            InboundEvent::LocationChanged { delivery_id, .. }
            | InboundEvent::StatusChanged { delivery_id, .. } => delivery_id.as_ref(),
        }
    }
}

/// BroadcastPayload は `delivery_updated` の中身
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BroadcastPayload {
    Delivery(DeliveryRecord),
    Tracking(TrackingView),
}

/// HubMessage はハブからライブ接続へ送るメッセージ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HubMessage {
    /// 全接続へ配信
    DeliveryUpdated { delivery: BroadcastPayload },

    /// 失敗した接続にだけ送る
    Error { message: String },
}

impl HubMessage {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_both_inbound_shapes() {
        let loc: InboundEvent = serde_json::from_value(json!({
            "event": "location_changed",
            "data": { "delivery_id": "DEL1", "location": { "lat": 1.5, "lng": -2.0 } }
        }))
        .unwrap();
        assert_eq!(
            loc,
            InboundEvent::LocationChanged {
                delivery_id: Some(DeliveryId::new("DEL1")),
                location: Location::new(1.5, -2.0),
            }
        );

        let status: InboundEvent = serde_json::from_value(json!({
            "event": "status_changed",
            "data": { "delivery_id": "DEL1", "status": "InTransit" }
        }))
        .unwrap();
        assert_eq!(status.name(), "status_changed");
        assert_eq!(status.delivery_id(), Some(&DeliveryId::new("DEL1")));
    }

    #[test]
    fn missing_delivery_id_still_parses() {
        let event: InboundEvent = serde_json::from_value(json!({
            "event": "status_changed",
            "data": { "status": "PickUp" }
        }))
        .unwrap();
        assert_eq!(event.delivery_id(), None);
    }

    #[test]
    fn error_message_wire_shape() {
        let msg = HubMessage::Error {
            message: "Delivery not found: DEL1".to_string(),
        };
        let value: serde_json::Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(value, json!({ "event": "error", "message": "Delivery not found: DEL1" }));
    }
}
