//! App - アプリケーション層
//!
//! このモジュールは、ports を組み合わせてアプリケーションロジックを実装します。
//!
//! # 主要コンポーネント
//! - **AppBuilder**: アプリケーションの構築とワイヤリング
//! - **PackageRecords**: package の CRUD とリンクの書き込み
//! - **DeliveryLifecycle**: 状態遷移とタイムスタンプ、package リンクの整合性
//! - **TrackingComposer**: package と delivery を突き合わせた合成ビュー
//! - **ConnectionRegistry / PropagationHub**: ライブ接続への伝搬
//! - **TrackerConfig**: 環境変数からの設定

pub mod builder;
pub mod config;
pub mod hub;
pub mod lifecycle;
pub mod packages;
pub mod registry;
pub mod status;
pub mod tracking;

// 主要な型を再エクスポート
pub use self::builder::{App, AppBuilder, BuildError};
pub use self::config::{BroadcastShape, ConfigError, TrackerConfig};
pub use self::hub::{HubOutcome, PropagationHub};
pub use self::lifecycle::{DeliveryLifecycle, LifecycleSettings};
pub use self::packages::PackageRecords;
pub use self::registry::{ConnectionId, ConnectionRegistry};
pub use self::status::{DeliveryCounts, StatusSnapshot};
pub use self::tracking::TrackingComposer;
