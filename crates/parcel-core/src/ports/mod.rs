//! Ports - 抽象化レイヤー
//!
//! このモジュールは Hexagonal Architecture の「ポート」を定義します。
//! 各 trait は外部システム（ドキュメントストア、ライブ接続のトランスポート）への
//! インターフェースを提供し、実装の詳細を隠蔽します。
//!
//! # 設計原則
//! - ドキュメントストアが source of truth（正本）
//! - 単一ドキュメントのアトミック書き込みだけを前提にする
//! - 時刻と ID 生成も差し替え可能にしてテストを決定的にする

pub mod clock;
pub mod delivery_store;
pub mod event_sink;
pub mod id_generator;
pub mod package_store;

// 主要な trait を再エクスポート
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::delivery_store::{DeliveryStore, ReplaceOutcome};
pub use self::event_sink::{EventSink, SinkClosed};
pub use self::id_generator::{IdGenerator, RandomHexGenerator};
pub use self::package_store::{DeleteOutcome, LinkOutcome, PackageStore};
