//! IdGenerator port - ID 生成の抽象化
//!
//! 外部に見せる ID は「3文字プレフィックス + 大文字16進サフィックス」です。
//! 例: `PKG1A2B3C`, `DEL9F00AB`
//!
//! # 実装
//! - **RandomHexGenerator**: OS の CSPRNG から作る（本番用）
//!
//! 既存 ID との衝突チェックはしません。ストア側の一意制約が
//! `DuplicateId` で弾きます。

use rand::RngCore;
use rand::rngs::OsRng;

use crate::domain::errors::TrackerError;
use crate::domain::ids::{DeliveryId, IdKind, PackageId};

/// サフィックスの既定長（16 進文字数）
pub const DEFAULT_SUFFIX_LEN: usize = 6;

/// IdGenerator は人が読める ID を生成
///
/// # Thread Safety
/// - `Send + Sync` を要求（複数タスクから使える）
pub trait IdGenerator: Send + Sync {
    /// 指定された種類の ID を生成
    fn generate(&self, kind: IdKind) -> String;

    /// 文字列で種類を受け取る版。"package" / "delivery" 以外は `InvalidKind`。
    fn generate_named(&self, kind: &str) -> Result<String, TrackerError> {
        let kind: IdKind = kind.parse()?;
        Ok(self.generate(kind))
    }

    fn package_id(&self) -> PackageId {
        PackageId::new(self.generate(IdKind::Package))
    }

    fn delivery_id(&self) -> DeliveryId {
        DeliveryId::new(self.generate(IdKind::Delivery))
    }
}

/// RandomHexGenerator は CSPRNG ベースの ID 生成器
#[derive(Debug, Clone)]
pub struct RandomHexGenerator {
    suffix_len: usize,
}

impl RandomHexGenerator {
    pub fn new(suffix_len: usize) -> Self {
        Self {
            suffix_len: suffix_len.max(1),
        }
    }

    pub fn suffix_len(&self) -> usize {
        self.suffix_len
    }

    fn suffix(&self) -> String {
        let mut bytes = vec![0u8; self.suffix_len.div_ceil(2)];
        OsRng.fill_bytes(&mut bytes);
        let mut hex: String = bytes.iter().map(|b| format!("{b:02X}")).collect();
        hex.truncate(self.suffix_len);
        hex
    }
}

impl Default for RandomHexGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_SUFFIX_LEN)
    }
}

impl IdGenerator for RandomHexGenerator {
    fn generate(&self, kind: IdKind) -> String {
        format!("{}{}", kind.prefix(), self.suffix())
    }
}
