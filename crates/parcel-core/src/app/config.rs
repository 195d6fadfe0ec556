//! Config - 実行時設定
//!
//! 環境変数から読み込み、未設定の項目はデフォルト値を使います。
//! 値の形が不正な場合は起動時に [`ConfigError`] で失敗させます（Fail-fast）。

use std::env;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::TransitionPolicy;
use crate::ports::id_generator::DEFAULT_SUFFIX_LEN;

pub const ENV_ID_SUFFIX_LEN: &str = "PARCEL_ID_SUFFIX_LEN";
pub const ENV_TRANSITION_POLICY: &str = "PARCEL_TRANSITION_POLICY";
pub const ENV_BROADCAST_SHAPE: &str = "PARCEL_BROADCAST_SHAPE";
pub const ENV_PAGE_LIMIT: &str = "PARCEL_PAGE_LIMIT";
pub const ENV_WRITE_RETRIES: &str = "PARCEL_WRITE_RETRIES";
pub const ENV_LOG: &str = "PARCEL_LOG";

/// BroadcastShape は `delivery_updated` に載せる形
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BroadcastShape {
    /// delivery レコード単体
    #[default]
    Delivery,
    /// delivery と package の結合ビュー
    Tracking,
}

impl FromStr for BroadcastShape {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "delivery" => Ok(BroadcastShape::Delivery),
            "tracking" => Ok(BroadcastShape::Tracking),
            other => Err(format!("expected 'delivery' or 'tracking', got '{other}'")),
        }
    }
}

fn parse_policy(s: &str) -> Result<TransitionPolicy, String> {
    match s.trim().to_ascii_lowercase().as_str() {
        "strict" => Ok(TransitionPolicy::Strict),
        "lenient" => Ok(TransitionPolicy::Lenient),
        other => Err(format!("expected 'strict' or 'lenient', got '{other}'")),
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// TrackerConfig はアプリケーション設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// `PKG` / `DEL` の後ろに付く 16 進文字数
    pub id_suffix_len: usize,
    pub transition_policy: TransitionPolicy,
    pub broadcast_shape: BroadcastShape,
    /// クエリで指定が無いときのページサイズ
    pub default_page_limit: u32,
    /// バージョン付き書き込みの最大試行回数
    pub max_write_retries: u32,
    /// `RUST_LOG` が無いときの tracing-subscriber フィルタ
    pub log_filter: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            id_suffix_len: DEFAULT_SUFFIX_LEN,
            transition_policy: TransitionPolicy::Strict,
            broadcast_shape: BroadcastShape::Delivery,
            default_page_limit: 10,
            max_write_retries: 5,
            log_filter: "info".to_string(),
        }
    }
}

impl TrackerConfig {
    /// `PARCEL_*` 環境変数から読み込む
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// [`TrackerConfig::from_env`] の lookup 差し替え版
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let id_suffix_len = read(&lookup, ENV_ID_SUFFIX_LEN, |s| {
            let n: usize = s.trim().parse().map_err(|e| format!("{e}"))?;
            if n == 0 {
                return Err("must be at least 1".to_string());
            }
            Ok(n)
        })?
        .unwrap_or(defaults.id_suffix_len);

        let transition_policy = read(&lookup, ENV_TRANSITION_POLICY, parse_policy)?
            .unwrap_or(defaults.transition_policy);

        let broadcast_shape = read(&lookup, ENV_BROADCAST_SHAPE, |s| s.parse())?
            .unwrap_or(defaults.broadcast_shape);

        let default_page_limit = read(&lookup, ENV_PAGE_LIMIT, positive_u32)?
            .unwrap_or(defaults.default_page_limit);

        let max_write_retries = read(&lookup, ENV_WRITE_RETRIES, positive_u32)?
            .unwrap_or(defaults.max_write_retries);

        let log_filter = lookup(ENV_LOG)
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(defaults.log_filter);

        Ok(Self {
            id_suffix_len,
            transition_policy,
            broadcast_shape,
            default_page_limit,
            max_write_retries,
            log_filter,
        })
    }
}

fn read<F, T, P>(lookup: &F, var: &'static str, parse: P) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    P: FnOnce(&str) -> Result<T, String>,
{
    match lookup(var) {
        None => Ok(None),
        Some(raw) => parse(&raw)
            .map(Some)
            .map_err(|reason| ConfigError::Invalid { var, reason }),
    }
}

fn positive_u32(s: &str) -> Result<u32, String> {
    let n: u32 = s.trim().parse().map_err(|e| format!("{e}"))?;
    if n == 0 {
        return Err("must be at least 1".to_string());
    }
    Ok(n)
}
