//! EventSink port - ライブ接続への送信口
//!
//! 1 接続 = 1 EventSink。WebSocket などのトランスポートはこの trait を実装し、
//! ハブは接続の種類を知らずに送信できます。
//!
//! - `mpsc::UnboundedSender<HubMessage>`: インプロセス実装（CLI / テスト用）

use tokio::sync::mpsc;

use crate::domain::HubMessage;

/// SinkClosed は接続の受信側が既に無いことを示す
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("connection closed")]
pub struct SinkClosed;

/// EventSink は 1 接続分の送信口
///
/// 送信はブロックしない（バックプレッシャーなし）。
pub trait EventSink: Send + Sync {
    fn send(&self, message: HubMessage) -> Result<(), SinkClosed>;
}

impl EventSink for mpsc::UnboundedSender<HubMessage> {
    fn send(&self, message: HubMessage) -> Result<(), SinkClosed> {
        mpsc::UnboundedSender::send(self, message).map_err(|_| SinkClosed)
    }
}
