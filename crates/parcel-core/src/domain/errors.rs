//! Errors - エラー型と分類
//!
//! ストア・ライフサイクル・ハブが返す失敗はすべて [`TrackerError`] に集約します。
//! トランスポート層（HTTP / WebSocket）は [`ErrorKind`] と `code()` だけを見て
//! ステータスコードやメッセージに変換します。

use thiserror::Error;

use super::state::DeliveryStatus;

/// Entity は参照先のレコード種別
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Package,
    Delivery,
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Entity::Package => f.write_str("Package"),
            Entity::Delivery => f.write_str("Delivery"),
        }
    }
}

/// ErrorKind はエラーの運用分類
///
/// - NotFound: 参照先のレコードが存在しない
/// - Conflict: 現在の状態と矛盾する要求（active delivery の重複、不正な遷移など）
/// - Validation: 入力の形が不正
/// - Infrastructure: ストア側の障害や競合の再試行切れ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Validation,
    Infrastructure,
}

impl ErrorKind {
    /// REST 風の呼び出し元向けステータスコード
    pub fn http_status(self) -> u16 {
        match self {
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict | ErrorKind::Validation => 400,
            ErrorKind::Infrastructure => 500,
        }
    }
}

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: Entity, id: String },

    #[error("package {package_id} already has an active delivery ({active_delivery_id})")]
    ConflictingActiveDelivery {
        package_id: String,
        active_delivery_id: String,
    },

    #[error("invalid id kind '{0}', expected 'package' or 'delivery'")]
    InvalidKind(String),

    #[error("delivery {delivery_id} cannot move from {from} to {to}")]
    InvalidTransition {
        delivery_id: String,
        from: DeliveryStatus,
        to: DeliveryStatus,
    },

    #[error("validation failed: {0}")]
    ValidationFailed(String),

    #[error("{entity} id {id} is already taken")]
    DuplicateId { entity: Entity, id: String },

    #[error("{entity} {id} kept changing underneath the write, gave up after {attempts} attempts")]
    ConcurrentModification {
        entity: Entity,
        id: String,
        attempts: u32,
    },

    #[error("store error: {0}")]
    Store(String),
}

impl TrackerError {
    pub fn not_found(entity: Entity, id: impl std::fmt::Display) -> Self {
        TrackerError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            TrackerError::NotFound { .. } => ErrorKind::NotFound,
            TrackerError::ConflictingActiveDelivery { .. }
            | TrackerError::InvalidTransition { .. }
            | TrackerError::DuplicateId { .. } => ErrorKind::Conflict,
            TrackerError::InvalidKind(_) | TrackerError::ValidationFailed(_) => {
                ErrorKind::Validation
            }
            TrackerError::ConcurrentModification { .. } | TrackerError::Store(_) => {
                ErrorKind::Infrastructure
            }
        }
    }

    /// 機械可読な安定コード
    pub fn code(&self) -> &'static str {
        match self {
            TrackerError::NotFound { .. } => "not_found",
            TrackerError::ConflictingActiveDelivery { .. } => "conflicting_active_delivery",
            TrackerError::InvalidKind(_) => "invalid_kind",
            TrackerError::InvalidTransition { .. } => "invalid_transition",
            TrackerError::ValidationFailed(_) => "validation_failed",
            TrackerError::DuplicateId { .. } => "duplicate_id",
            TrackerError::ConcurrentModification { .. } => "concurrent_modification",
            TrackerError::Store(_) => "store_error",
        }
    }

    pub fn http_status(&self) -> u16 {
        self.kind().http_status()
    }
}
