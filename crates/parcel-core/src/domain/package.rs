//! Package record and its allow-listed update.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::TrackerError;
use super::ids::{DeliveryId, PackageId};
use super::location::Location;

/// NewPackage は package の作成要求（形の検証は呼び出し側で済んでいる）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPackage {
    #[serde(default)]
    pub description: Option<String>,
    pub from_name: String,
    pub from_address: String,
    pub from_location: Location,
    pub to_name: String,
    pub to_address: String,
    pub to_location: Location,
    #[serde(default)]
    pub height: f64,
    #[serde(default)]
    pub depth: f64,
    #[serde(default)]
    pub width: f64,
}

impl NewPackage {
    pub fn validate(&self) -> Result<(), TrackerError> {
        require_text("from_name", &self.from_name)?;
        require_text("from_address", &self.from_address)?;
        require_text("to_name", &self.to_name)?;
        require_text("to_address", &self.to_address)?;
        self.from_location.validate("from_location")?;
        self.to_location.validate("to_location")?;
        require_dimension("height", self.height)?;
        require_dimension("depth", self.depth)?;
        require_dimension("width", self.width)?;
        Ok(())
    }
}

/// PackageRecord は package ドキュメント
///
/// `active_delivery_id` は所有ではなく参照キー。指すのは高々 1 件の delivery で、
/// 存在しない delivery を指したまま残ることもある（次の create が回収する）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageRecord {
    pub package_id: PackageId,
    pub active_delivery_id: Option<DeliveryId>,
    pub description: Option<String>,
    pub from_name: String,
    pub from_address: String,
    pub from_location: Location,
    pub to_name: String,
    pub to_address: String,
    pub to_location: Location,
    pub height: f64,
    pub depth: f64,
    pub width: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PackageRecord {
    pub fn new(package_id: PackageId, input: NewPackage, now: DateTime<Utc>) -> Self {
        Self {
            package_id,
            active_delivery_id: None,
            description: input.description,
            from_name: input.from_name,
            from_address: input.from_address,
            from_location: input.from_location,
            to_name: input.to_name,
            to_address: input.to_address,
            to_location: input.to_location,
            height: input.height,
            depth: input.depth,
            width: input.width,
            created_at: now,
            updated_at: now,
        }
    }

    /// `update` のうち許可されたフィールドだけをマージ
    pub fn apply(&mut self, update: &PackageUpdate, now: DateTime<Utc>) {
        if let Some(description) = &update.description {
            self.description = Some(description.clone());
        }
        if let Some(v) = &update.from_name {
            self.from_name = v.clone();
        }
        if let Some(v) = &update.from_address {
            self.from_address = v.clone();
        }
        if let Some(v) = update.from_location {
            self.from_location = v;
        }
        if let Some(v) = &update.to_name {
            self.to_name = v.clone();
        }
        if let Some(v) = &update.to_address {
            self.to_address = v.clone();
        }
        if let Some(v) = update.to_location {
            self.to_location = v;
        }
        if let Some(v) = update.height {
            self.height = v;
        }
        if let Some(v) = update.depth {
            self.depth = v;
        }
        if let Some(v) = update.width {
            self.width = v;
        }
        self.updated_at = now;
    }

    pub fn set_active_delivery(&mut self, delivery_id: Option<DeliveryId>, now: DateTime<Utc>) {
        self.active_delivery_id = delivery_id;
        self.updated_at = now;
    }
}

/// PackageUpdate は package の部分更新
///
/// 汎用の更新経路で変えられるのはこれらのフィールドだけで、ID とリンクは表現できない。
/// 未知のキーを含む JSON は拒否する。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackageUpdate {
    pub description: Option<String>,
    pub from_name: Option<String>,
    pub from_address: Option<String>,
    pub from_location: Option<Location>,
    pub to_name: Option<String>,
    pub to_address: Option<String>,
    pub to_location: Option<Location>,
    pub height: Option<f64>,
    pub depth: Option<f64>,
    pub width: Option<f64>,
}

impl PackageUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn validate(&self) -> Result<(), TrackerError> {
        if self.is_empty() {
            return Err(TrackerError::ValidationFailed(
                "update must change at least one field".to_string(),
            ));
        }
        for (field, value) in [
            ("from_name", &self.from_name),
            ("from_address", &self.from_address),
            ("to_name", &self.to_name),
            ("to_address", &self.to_address),
        ] {
            if let Some(v) = value {
                require_text(field, v)?;
            }
        }
        if let Some(l) = &self.from_location {
            l.validate("from_location")?;
        }
        if let Some(l) = &self.to_location {
            l.validate("to_location")?;
        }
        for (field, value) in [
            ("height", self.height),
            ("depth", self.depth),
            ("width", self.width),
        ] {
            if let Some(v) = value {
                require_dimension(field, v)?;
            }
        }
        Ok(())
    }
}

/// PackageFilter は package クエリの条件（指定したフィールドは完全一致）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageFilter {
    pub active_delivery_id: Option<DeliveryId>,
    pub from_name: Option<String>,
    pub to_name: Option<String>,
}

impl PackageFilter {
    pub fn matches(&self, record: &PackageRecord) -> bool {
        if let Some(id) = &self.active_delivery_id
            && record.active_delivery_id.as_ref() != Some(id)
        {
            return false;
        }
        if let Some(name) = &self.from_name
            && &record.from_name != name
        {
            return false;
        }
        if let Some(name) = &self.to_name
            && &record.to_name != name
        {
            return false;
        }
        true
    }
}

fn require_text(field: &str, value: &str) -> Result<(), TrackerError> {
    if value.trim().is_empty() {
        return Err(TrackerError::ValidationFailed(format!("{field} must not be empty")));
    }
    Ok(())
}

fn require_dimension(field: &str, value: f64) -> Result<(), TrackerError> {
    if !value.is_finite() || value < 0.0 {
        return Err(TrackerError::ValidationFailed(format!(
            "{field} must be a non-negative number, got {value}"
        )));
    }
    Ok(())
}
