//! ConnectionRegistry - ライブ接続の台帳
//!
//! プロセス全体のグローバル状態にせず、明示的なオブジェクトとしてハブに注入します。
//! 購読（room）の概念はなく、broadcast は登録済みの全接続に届きます。
//!
//! # ロック方針
//! - 送信先のスナップショットを取ってからロックを離して送る
//! - 受信側が閉じていた接続は broadcast のついでに掃除する

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::RwLock;
use tracing::debug;

use crate::domain::HubMessage;
use crate::ports::{EventSink, SinkClosed};

/// ConnectionId はプロセス内で一意な接続ハンドル
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

#[derive(Default)]
pub struct ConnectionRegistry {
    next_id: AtomicU64,
    connections: RwLock<HashMap<ConnectionId, Arc<dyn EventSink>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, sink: Arc<dyn EventSink>) -> ConnectionId {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.connections.write().await.insert(id, sink);
        debug!(connection = %id, "connection registered");
        id
    }

    /// 登録されていなければ `false`
    pub async fn unregister(&self, id: ConnectionId) -> bool {
        let removed = self.connections.write().await.remove(&id).is_some();
        if removed {
            debug!(connection = %id, "connection unregistered");
        }
        removed
    }

    pub async fn send_to(&self, id: ConnectionId, message: HubMessage) -> Result<(), SinkClosed> {
        let sink = self.connections.read().await.get(&id).cloned();
        match sink {
            Some(sink) => sink.send(message),
            None => Err(SinkClosed),
        }
    }

    /// 登録済みの全接続に送り、受け取った接続数を返す
    pub async fn broadcast(&self, message: &HubMessage) -> usize {
        let targets: Vec<(ConnectionId, Arc<dyn EventSink>)> = self
            .connections
            .read()
            .await
            .iter()
            .map(|(id, sink)| (*id, sink.clone()))
            .collect();

        let mut delivered = 0;
        let mut closed = Vec::new();
        for (id, sink) in targets {
            match sink.send(message.clone()) {
                Ok(()) => delivered += 1,
                Err(SinkClosed) => closed.push(id),
            }
        }

        if !closed.is_empty() {
            let mut connections = self.connections.write().await;
            for id in &closed {
                connections.remove(id);
            }
            debug!(pruned = closed.len(), "dropped closed connections");
        }
        delivered
    }

    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }
}
