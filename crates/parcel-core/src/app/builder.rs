//! AppBuilder - アプリケーションの構築とワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）
//! - ports の差し替え（テストでは FixedClock や独自ストアを注入）

use std::sync::Arc;

use super::config::TrackerConfig;
use super::hub::PropagationHub;
use super::lifecycle::{DeliveryLifecycle, LifecycleSettings};
use super::packages::PackageRecords;
use super::registry::ConnectionRegistry;
use super::status::StatusSnapshot;
use super::tracking::TrackingComposer;
use crate::domain::TrackerError;
use crate::impls::{InMemoryDeliveryStore, InMemoryPackageStore};
use crate::ports::{
    Clock, DeliveryStore, IdGenerator, PackageStore, RandomHexGenerator, SystemClock,
};

/// AppBuilder はアプリケーションを構築
///
/// # 使用例
/// ```ignore
/// let app = AppBuilder::new()
///     .config(TrackerConfig::from_env()?)
///     .clock(Arc::new(FixedClock::new(now)))
///     .build()?;
/// ```
///
/// 指定しなかった port はデフォルト実装（インメモリストア、SystemClock、
/// RandomHexGenerator）で埋めます。
#[derive(Default)]
pub struct AppBuilder {
    config: TrackerConfig,
    packages: Option<Arc<dyn PackageStore>>,
    deliveries: Option<Arc<dyn DeliveryStore>>,
    clock: Option<Arc<dyn Clock>>,
    ids: Option<Arc<dyn IdGenerator>>,
}

/// BuildError はアプリケーション構築時のエラー
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}

impl AppBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: TrackerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn package_store(mut self, store: Arc<dyn PackageStore>) -> Self {
        self.packages = Some(store);
        self
    }

    pub fn delivery_store(mut self, store: Arc<dyn DeliveryStore>) -> Self {
        self.deliveries = Some(store);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    /// # 検証
    /// - `id_suffix_len`, `default_page_limit`, `max_write_retries` は 1 以上
    pub fn build(self) -> Result<App, BuildError> {
        let config = self.config;
        if config.id_suffix_len == 0 {
            return Err(BuildError::InvalidConfig("id_suffix_len must be at least 1"));
        }
        if config.default_page_limit == 0 {
            return Err(BuildError::InvalidConfig("default_page_limit must be at least 1"));
        }
        if config.max_write_retries == 0 {
            return Err(BuildError::InvalidConfig("max_write_retries must be at least 1"));
        }

        let packages = self
            .packages
            .unwrap_or_else(|| Arc::new(InMemoryPackageStore::new()));
        let deliveries = self
            .deliveries
            .unwrap_or_else(|| Arc::new(InMemoryDeliveryStore::new()));
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let ids = self
            .ids
            .unwrap_or_else(|| Arc::new(RandomHexGenerator::new(config.id_suffix_len)));

        let records = PackageRecords::new(
            packages.clone(),
            ids.clone(),
            clock.clone(),
            config.default_page_limit,
        );
        let lifecycle = DeliveryLifecycle::new(
            packages.clone(),
            deliveries.clone(),
            ids,
            clock,
            LifecycleSettings {
                policy: config.transition_policy,
                max_write_retries: config.max_write_retries,
                default_page_limit: config.default_page_limit,
            },
        );
        let tracking = TrackingComposer::new(packages, deliveries);
        let hub = PropagationHub::new(
            lifecycle.clone(),
            tracking.clone(),
            Arc::new(ConnectionRegistry::new()),
            config.broadcast_shape,
        );

        Ok(App {
            config,
            packages: records,
            lifecycle,
            tracking,
            hub,
        })
    }
}

/// App は組み上がったサービス一式
#[derive(Clone)]
pub struct App {
    pub config: TrackerConfig,
    pub packages: PackageRecords,
    pub lifecycle: DeliveryLifecycle,
    pub tracking: TrackingComposer,
    pub hub: PropagationHub,
}

impl App {
    pub async fn status(&self) -> Result<StatusSnapshot, TrackerError> {
        Ok(StatusSnapshot {
            deliveries: self.lifecycle.counts().await?,
            connections: self.hub.connection_count().await,
        })
    }
}
