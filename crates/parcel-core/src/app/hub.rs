//! PropagationHub - ライブ接続へのリアルタイム伝搬
//!
//! # フロー
//! 1. 接続から `location_changed` / `status_changed` を受信
//! 2. DeliveryLifecycle を呼び出して状態を更新
//! 3. 成功: 全接続に `delivery_updated` を broadcast
//! 4. 失敗: 送信元にだけ `error` を 1 通返す（broadcast しない）
//!
//! 更新が保存された後に結合ビューを作れなかった場合は、delivery 単体で broadcast します。
//!
//! 解釈できない入力（JSON でない、`delivery_id` がない）はログに残して捨てます。
//! 1 接続内のメッセージは到着順に処理します（`serve`）。

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::config::BroadcastShape;
use super::lifecycle::DeliveryLifecycle;
use super::registry::{ConnectionId, ConnectionRegistry};
use super::tracking::TrackingComposer;
use crate::domain::{BroadcastPayload, DeliveryRecord, HubMessage, InboundEvent, TrackerError};
use crate::ports::EventSink;

/// HubOutcome は受信メッセージ 1 件の処理結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HubOutcome {
    /// 適用して配信した（`recipients` は受け取った接続数）
    Broadcast { recipients: usize },

    /// engine が拒否した（送信元に `error` を 1 通）
    Rejected { code: &'static str },

    /// 解釈できない入力（誰にも通知しない）
    Dropped,
}

#[derive(Clone)]
pub struct PropagationHub {
    lifecycle: DeliveryLifecycle,
    tracking: TrackingComposer,
    registry: Arc<ConnectionRegistry>,
    shape: BroadcastShape,
}

impl PropagationHub {
    pub fn new(
        lifecycle: DeliveryLifecycle,
        tracking: TrackingComposer,
        registry: Arc<ConnectionRegistry>,
        shape: BroadcastShape,
    ) -> Self {
        Self {
            lifecycle,
            tracking,
            registry,
            shape,
        }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// プロセス内の接続を登録し、受信側を返す
    pub async fn connect(&self) -> (ConnectionId, mpsc::UnboundedReceiver<HubMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.connect_sink(Arc::new(tx)).await;
        (id, rx)
    }

    /// 任意のトランスポートの接続を登録
    pub async fn connect_sink(&self, sink: Arc<dyn EventSink>) -> ConnectionId {
        let id = self.registry.register(sink).await;
        info!(connection = %id, "live connection opened");
        id
    }

    pub async fn disconnect(&self, id: ConnectionId) {
        if self.registry.unregister(id).await {
            info!(connection = %id, "live connection closed");
        }
    }

    pub async fn connection_count(&self) -> usize {
        self.registry.len().await
    }

    /// `from` からのテキストフレームを 1 件処理
    pub async fn handle_text(&self, from: ConnectionId, text: &str) -> HubOutcome {
        match serde_json::from_str::<InboundEvent>(text) {
            Ok(event) => self.handle(from, event).await,
            Err(e) => {
                warn!(connection = %from, error = %e, "unparseable inbound message dropped");
                HubOutcome::Dropped
            }
        }
    }

    /// `from` からのデコード済みイベントを 1 件処理
    pub async fn handle(&self, from: ConnectionId, event: InboundEvent) -> HubOutcome {
        let Some(delivery_id) = event.delivery_id().cloned() else {
            warn!(connection = %from, event = event.name(), "inbound event without delivery_id dropped");
            return HubOutcome::Dropped;
        };
        debug!(connection = %from, event = event.name(), %delivery_id, "inbound event");

        let applied = match event {
            InboundEvent::LocationChanged { location, .. } => {
                self.lifecycle.apply_location(&delivery_id, location).await
            }
            InboundEvent::StatusChanged { status, .. } => {
                self.lifecycle.apply_status(&delivery_id, status).await
            }
        };

        let delivery = match applied {
            Ok(delivery) => delivery,
            Err(e) => return self.reject(from, e).await,
        };

        let message = HubMessage::DeliveryUpdated {
            delivery: self.payload_for(delivery).await,
        };
        let recipients = self.registry.broadcast(&message).await;
        debug!(%delivery_id, recipients, "delivery update broadcast");
        HubOutcome::Broadcast { recipients }
    }

    /// 1 接続分の `inbound` を到着順に処理し、終わったら切断
    pub async fn serve(&self, id: ConnectionId, mut inbound: mpsc::UnboundedReceiver<String>) {
        while let Some(text) = inbound.recv().await {
            self.handle_text(id, &text).await;
        }
        self.disconnect(id).await;
    }

    /// 書き込みは済んでいるので、結合ビューを作れなくても delivery 単体で流す
    async fn payload_for(&self, delivery: DeliveryRecord) -> BroadcastPayload {
        if self.shape == BroadcastShape::Delivery {
            return BroadcastPayload::Delivery(delivery);
        }
        match self.tracking.track_delivery(&delivery.delivery_id).await {
            Ok(view) => BroadcastPayload::Tracking(view),
            Err(e) => {
                warn!(
                    delivery_id = %delivery.delivery_id,
                    error = %e,
                    "tracking view unavailable, broadcasting bare delivery"
                );
                BroadcastPayload::Delivery(delivery)
            }
        }
    }

    async fn reject(&self, to: ConnectionId, err: TrackerError) -> HubOutcome {
        let code = err.code();
        warn!(connection = %to, code, error = %err, "inbound event rejected");
        let message = HubMessage::Error {
            message: err.to_string(),
        };
        if self.registry.send_to(to, message).await.is_err() {
            error!(connection = %to, "could not deliver error event, connection gone");
        }
        HubOutcome::Rejected { code }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::lifecycle::LifecycleSettings;
    use crate::domain::package::fixtures::new_package;
    use crate::domain::{DeliveryId, DeliveryStatus, Location, PackageId, PackageRecord};
    use crate::impls::{InMemoryDeliveryStore, InMemoryPackageStore};
    use crate::ports::{PackageStore, RandomHexGenerator, SystemClock};
    use serde_json::json;

    async fn hub_with(shape: BroadcastShape) -> (PropagationHub, DeliveryId) {
        let packages = Arc::new(InMemoryPackageStore::new());
        let deliveries = Arc::new(InMemoryDeliveryStore::new());
        let lifecycle = DeliveryLifecycle::new(
            packages.clone(),
            deliveries.clone(),
            Arc::new(RandomHexGenerator::default()),
            Arc::new(SystemClock),
            LifecycleSettings::default(),
        );
        let tracking = TrackingComposer::new(packages.clone(), deliveries);
        let hub = PropagationHub::new(
            lifecycle.clone(),
            tracking,
            Arc::new(ConnectionRegistry::new()),
            shape,
        );

        let record = PackageRecord::new(PackageId::new("PKG1"), new_package(), chrono::Utc::now());
        packages.insert(record).await.unwrap();
        let delivery = lifecycle.create(&PackageId::new("PKG1")).await.unwrap();
        (hub, delivery.delivery_id)
    }

    #[tokio::test]
    async fn status_change_is_broadcast() {
        let (hub, id) = hub_with(BroadcastShape::Delivery).await;
        let (sender, mut rx) = hub.connect().await;

        let outcome = hub
            .handle(
                sender,
                InboundEvent::StatusChanged {
                    delivery_id: Some(id.clone()),
                    status: DeliveryStatus::PickUp,
                },
            )
            .await;

        assert_eq!(outcome, HubOutcome::Broadcast { recipients: 1 });
        match rx.recv().await {
            Some(HubMessage::DeliveryUpdated {
                delivery: BroadcastPayload::Delivery(d),
            }) => {
                assert_eq!(d.delivery_id, id);
                assert_eq!(d.status, DeliveryStatus::PickUp);
                assert!(d.pickup_time.is_some());
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[tokio::test]
    async fn tracking_shape_carries_the_package() {
        let (hub, id) = hub_with(BroadcastShape::Tracking).await;
        let (sender, mut rx) = hub.connect().await;

        hub.handle(
            sender,
            InboundEvent::LocationChanged {
                delivery_id: Some(id),
                location: Location::new(10.0, 20.0),
            },
        )
        .await;

        match rx.recv().await {
            Some(HubMessage::DeliveryUpdated {
                delivery: BroadcastPayload::Tracking(view),
            }) => {
                assert_eq!(view.package.package_id.as_str(), "PKG1");
                assert_eq!(
                    view.delivery.and_then(|d| d.location),
                    Some(Location::new(10.0, 20.0))
                );
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_text_is_dropped_silently() {
        let (hub, _) = hub_with(BroadcastShape::Delivery).await;
        let (sender, mut rx) = hub.connect().await;

        assert_eq!(hub.handle_text(sender, "not json").await, HubOutcome::Dropped);
        let missing_id = json!({
            "event": "location_changed",
            "data": { "location": { "lat": 1.0, "lng": 1.0 } }
        })
        .to_string();
        assert_eq!(hub.handle_text(sender, &missing_id).await, HubOutcome::Dropped);

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn invalid_transition_goes_back_to_sender_only() {
        let (hub, id) = hub_with(BroadcastShape::Delivery).await;
        let (sender, mut sender_rx) = hub.connect().await;
        let (_other, mut other_rx) = hub.connect().await;

        let outcome = hub
            .handle(
                sender,
                InboundEvent::StatusChanged {
                    delivery_id: Some(id),
                    status: DeliveryStatus::Delivered,
                },
            )
            .await;

        assert_eq!(outcome, HubOutcome::Rejected { code: "invalid_transition" });
        assert!(matches!(sender_rx.recv().await, Some(HubMessage::Error { .. })));
        assert!(other_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn serve_processes_in_order_and_disconnects() {
        let (hub, id) = hub_with(BroadcastShape::Delivery).await;
        let (conn, mut rx) = hub.connect().await;
        let (tx, inbound) = mpsc::unbounded_channel();

        for status in ["PickUp", "InTransit", "Delivered"] {
            tx.send(
                json!({
                    "event": "status_changed",
                    "data": { "delivery_id": id.as_str(), "status": status }
                })
                .to_string(),
            )
            .unwrap();
        }
        drop(tx);

        hub.serve(conn, inbound).await;

        let mut seen = Vec::new();
        while let Ok(HubMessage::DeliveryUpdated {
            delivery: BroadcastPayload::Delivery(d),
        }) = rx.try_recv()
        {
            seen.push(d.status);
        }
        assert_eq!(
            seen,
            vec![
                DeliveryStatus::PickUp,
                DeliveryStatus::InTransit,
                DeliveryStatus::Delivered
            ]
        );
        assert_eq!(hub.connection_count().await, 0);
    }
}
