//! Domain identifiers (strongly-typed IDs).
//!
//! # 外部公開 ID
//! package / delivery は `PKG1A2B3C` / `DEL9F00AB` のような人が読める文字列 ID で
//! 管理します。ストア内部のキーではなく、この文字列がそのまま正本のキーになります。
//!
//! ## Phantom Type パターン
//! `Id<T>` というジェネリック型で共通実装を提供しつつ、
//! `T` は実行時には使わない（PhantomData）マーカー型として、
//! コンパイル時に PackageId と DeliveryId を混同できないようにします。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;

use super::errors::TrackerError;

/// IdMarker は各 ID 型のマーカー trait
pub trait IdMarker: Send + Sync + 'static {
    /// 生成時に付与するプレフィックス（"PKG" / "DEL"）
    const KIND: IdKind;
}

/// IdKind は ID がどのレコード種別に属するか
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdKind {
    Package,
    Delivery,
}

impl IdKind {
    pub fn prefix(self) -> &'static str {
        match self {
            IdKind::Package => "PKG",
            IdKind::Delivery => "DEL",
        }
    }
}

impl FromStr for IdKind {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "package" => Ok(IdKind::Package),
            "delivery" => Ok(IdKind::Delivery),
            other => Err(TrackerError::InvalidKind(other.to_string())),
        }
    }
}

/// ジェネリック ID 型
///
/// Serialize 時は中身の文字列そのものになります（`"PKG1A2B3C"`）。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id<T: IdMarker> {
    value: String,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    /// 外部から渡された ID をプレフィックス検査なしで包む
    ///
    /// 参照は任意の文字列を受け付ける。プレフィックスが付くのは新規採番分だけ。
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            _marker: PhantomData,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn kind(&self) -> IdKind {
        T::KIND
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl<T: IdMarker> From<&str> for Id<T> {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl<T: IdMarker> From<String> for Id<T> {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

// ========================================
// マーカー型の定義
// ========================================

/// Package のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Package {}

impl IdMarker for Package {
    const KIND: IdKind = IdKind::Package;
}

/// Delivery のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Delivery {}

impl IdMarker for Delivery {
    const KIND: IdKind = IdKind::Delivery;
}

/// Package（発送物）の ID
pub type PackageId = Id<Package>;

/// Delivery（Package の 1 回分の配送）の ID
pub type DeliveryId = Id<Delivery>;
