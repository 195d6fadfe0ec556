//! Impls - 実装（開発用・テスト用）
//!
//! このモジュールには ports の実装を含めます。
//!
//! # 含まれる実装
//! - **InMemoryPackageStore**: 開発用の package ストア
//! - **InMemoryDeliveryStore**: 開発用の delivery ストア
//!
//! 本番用のドキュメントストア実装は別クレートに配置する想定です。

pub mod inmem_delivery;
pub mod inmem_package;

// 主要な型を再エクスポート
pub use self::inmem_delivery::InMemoryDeliveryStore;
pub use self::inmem_package::InMemoryPackageStore;
