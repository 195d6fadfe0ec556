//! parcel-core
//!
//! Core building blocks for package and delivery tracking.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, package, delivery, state, tracking, pagination, events, errors）
//! - **ports**: 抽象化レイヤー（PackageStore, DeliveryStore, EventSink, IdGenerator, Clock）
//! - **impls**: 実装（InMemoryPackageStore, InMemoryDeliveryStore など開発用）
//! - **app**: アプリケーションロジック（lifecycle, tracking, hub, builder, config, status）

pub mod app;
pub mod domain;
pub mod impls;
pub mod ports;
