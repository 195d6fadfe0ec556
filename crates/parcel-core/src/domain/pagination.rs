//! Paged query results.
//!
//! `sort_by` は `field:desc,other:asc` 形式。未知のフィールドは無視します。

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::delivery::DeliveryRecord;
use super::package::PackageRecord;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageOptions {
    #[serde(rename = "sortBy")]
    pub sort_by: Option<String>,
    pub limit: Option<u32>,
    pub page: Option<u32>,
}

impl PageOptions {
    pub fn new(limit: u32, page: u32) -> Self {
        Self {
            sort_by: None,
            limit: Some(limit),
            page: Some(page),
        }
    }

    pub fn sorted_by(mut self, sort_by: impl Into<String>) -> Self {
        self.sort_by = Some(sort_by.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub results: Vec<T>,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
    pub total_results: usize,
}

/// Sortable は名前付きフィールドで並べられるレコード
pub trait Sortable {
    /// 知らないフィールドなら `None`
    fn compare_field(&self, other: &Self, field: &str) -> Option<Ordering>;

    /// ソートキーで決まらないときのタイブレーク
    fn default_order(&self, other: &Self) -> Ordering;
}

/// 絞り込み済みの集合を並べて 1 ページ分切り出す
pub fn paginate<T: Sortable>(
    mut records: Vec<T>,
    options: &PageOptions,
    default_limit: u32,
) -> Page<T> {
    let keys = parse_sort(options.sort_by.as_deref());
    records.sort_by(|a, b| {
        for (field, descending) in &keys {
            if let Some(ord) = a.compare_field(b, field)
                && ord != Ordering::Equal
            {
                return if *descending { ord.reverse() } else { ord };
            }
        }
        a.default_order(b)
    });

    let limit = options.limit.filter(|l| *l > 0).unwrap_or(default_limit).max(1);
    let page = options.page.filter(|p| *p > 0).unwrap_or(1);
    let total_results = records.len();
    let total_pages = total_results.div_ceil(limit as usize) as u32;

    let skip = (page as usize - 1).saturating_mul(limit as usize);
    let results = records.into_iter().skip(skip).take(limit as usize).collect();

    Page {
        results,
        page,
        limit,
        total_pages,
        total_results,
    }
}

fn parse_sort(sort_by: Option<&str>) -> Vec<(String, bool)> {
    let Some(sort_by) = sort_by else {
        return Vec::new();
    };
    sort_by
        .split(',')
        .filter_map(|part| {
            let part = part.trim();
            if part.is_empty() {
                return None;
            }
            let (field, dir) = part.split_once(':').unwrap_or((part, "asc"));
            Some((field.trim().to_string(), dir.trim().eq_ignore_ascii_case("desc")))
        })
        .collect()
}

fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

impl Sortable for PackageRecord {
    fn compare_field(&self, other: &Self, field: &str) -> Option<Ordering> {
        let ord = match field {
            "package_id" => self.package_id.cmp(&other.package_id),
            "from_name" => self.from_name.cmp(&other.from_name),
            "to_name" => self.to_name.cmp(&other.to_name),
            "height" => cmp_f64(self.height, other.height),
            "depth" => cmp_f64(self.depth, other.depth),
            "width" => cmp_f64(self.width, other.width),
            "createdAt" | "created_at" => self.created_at.cmp(&other.created_at),
            "updatedAt" | "updated_at" => self.updated_at.cmp(&other.updated_at),
            _ => return None,
        };
        Some(ord)
    }

    fn default_order(&self, other: &Self) -> Ordering {
        self.created_at
            .cmp(&other.created_at)
            .then_with(|| self.package_id.cmp(&other.package_id))
    }
}

impl Sortable for DeliveryRecord {
    fn compare_field(&self, other: &Self, field: &str) -> Option<Ordering> {
        let ord = match field {
            "delivery_id" => self.delivery_id.cmp(&other.delivery_id),
            "package_id" => self.package_id.cmp(&other.package_id),
            "status" => self.status.to_string().cmp(&other.status.to_string()),
            "pickup_time" => self.pickup_time.cmp(&other.pickup_time),
            "start_time" => self.start_time.cmp(&other.start_time),
            "end_time" => self.end_time.cmp(&other.end_time),
            "createdAt" | "created_at" => self.created_at.cmp(&other.created_at),
            _ => return None,
        };
        Some(ord)
    }

    fn default_order(&self, other: &Self) -> Ordering {
        self.created_at
            .cmp(&other.created_at)
            .then_with(|| self.delivery_id.cmp(&other.delivery_id))
    }
}
