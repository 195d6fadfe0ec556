//! TrackingComposer - 「荷物はどこ？」に答える合成ビュー
//!
//! package と delivery の 2 つのストアを突き合わせて [`TrackingView`] を作ります。
//! リンクが一時的に壊れていても（dangling）エラーにせず「delivery なし」として扱います。

use std::sync::Arc;

use tracing::debug;

use crate::domain::{DeliveryId, Entity, PackageId, TrackerError, TrackingView};
use crate::ports::{DeliveryStore, PackageStore};

#[derive(Clone)]
pub struct TrackingComposer {
    packages: Arc<dyn PackageStore>,
    deliveries: Arc<dyn DeliveryStore>,
}

impl TrackingComposer {
    pub fn new(packages: Arc<dyn PackageStore>, deliveries: Arc<dyn DeliveryStore>) -> Self {
        Self {
            packages,
            deliveries,
        }
    }

    /// package とリンク中の delivery
    ///
    /// まだ delivery が無い場合も、リンク先が存在しない（または別 package の
    /// delivery を指している）場合も `delivery` は `None`。
    pub async fn track_package(&self, package_id: &PackageId) -> Result<TrackingView, TrackerError> {
        let package = self
            .packages
            .get(package_id)
            .await?
            .ok_or_else(|| TrackerError::not_found(Entity::Package, package_id))?;

        let delivery = match &package.active_delivery_id {
            None => None,
            Some(delivery_id) => {
                let found = self.deliveries.get(delivery_id).await?;
                match found {
                    Some(d) if &d.package_id == package_id => Some(d),
                    _ => {
                        debug!(%package_id, %delivery_id, "dangling delivery link");
                        None
                    }
                }
            }
        };

        Ok(TrackingView { package, delivery })
    }

    /// delivery を所属 package と結合
    pub async fn track_delivery(
        &self,
        delivery_id: &DeliveryId,
    ) -> Result<TrackingView, TrackerError> {
        let delivery = self
            .deliveries
            .get(delivery_id)
            .await?
            .ok_or_else(|| TrackerError::not_found(Entity::Delivery, delivery_id))?;

        let package = self
            .packages
            .get(&delivery.package_id)
            .await?
            .ok_or_else(|| TrackerError::not_found(Entity::Package, &delivery.package_id))?;

        Ok(TrackingView {
            package,
            delivery: Some(delivery),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::package::fixtures::new_package;
    use crate::domain::{DeliveryRecord, PackageRecord};
    use crate::impls::{InMemoryDeliveryStore, InMemoryPackageStore};
    use chrono::{TimeZone, Utc};

    struct Fixture {
        packages: InMemoryPackageStore,
        deliveries: InMemoryDeliveryStore,
        composer: TrackingComposer,
    }

    fn fixture() -> Fixture {
        let packages = InMemoryPackageStore::new();
        let deliveries = InMemoryDeliveryStore::new();
        let composer =
            TrackingComposer::new(Arc::new(packages.clone()), Arc::new(deliveries.clone()));
        Fixture {
            packages,
            deliveries,
            composer,
        }
    }

    async fn seed_package(f: &Fixture, id: &str, link: Option<&str>) {
        let now = Utc.with_ymd_and_hms(2024, 8, 25, 10, 0, 0).unwrap();
        let mut record = PackageRecord::new(PackageId::new(id), new_package(), now);
        record.active_delivery_id = link.map(DeliveryId::new);
        f.packages.insert(record).await.unwrap();
    }

    async fn seed_delivery(f: &Fixture, id: &str, package: &str) {
        let now = Utc.with_ymd_and_hms(2024, 8, 25, 10, 0, 0).unwrap();
        let record = DeliveryRecord::new(DeliveryId::new(id), PackageId::new(package), now);
        f.deliveries.insert(record).await.unwrap();
    }

    #[tokio::test]
    async fn package_without_delivery_is_not_an_error() {
        let f = fixture();
        seed_package(&f, "PKG1", None).await;

        let view = f.composer.track_package(&PackageId::new("PKG1")).await.unwrap();
        assert!(!view.has_delivery());
    }

    #[tokio::test]
    async fn dangling_link_reads_as_no_delivery() {
        let f = fixture();
        seed_package(&f, "PKG1", Some("DEL404")).await;

        let view = f.composer.track_package(&PackageId::new("PKG1")).await.unwrap();
        assert_eq!(view.package.active_delivery_id, Some(DeliveryId::new("DEL404")));
        assert!(view.delivery.is_none());
    }

    #[tokio::test]
    async fn linked_delivery_is_joined() {
        let f = fixture();
        seed_package(&f, "PKG1", Some("DEL1")).await;
        seed_delivery(&f, "DEL1", "PKG1").await;

        let view = f.composer.track_package(&PackageId::new("PKG1")).await.unwrap();
        assert_eq!(
            view.delivery.map(|d| d.delivery_id),
            Some(DeliveryId::new("DEL1"))
        );
    }

    #[tokio::test]
    async fn track_delivery_joins_through_package_id() {
        let f = fixture();
        seed_package(&f, "PKG1", None).await;
        seed_delivery(&f, "DEL1", "PKG1").await;

        let view = f.composer.track_delivery(&DeliveryId::new("DEL1")).await.unwrap();
        assert_eq!(view.package.package_id, PackageId::new("PKG1"));
    }

    #[tokio::test]
    async fn track_delivery_reports_what_is_missing() {
        let f = fixture();
        seed_delivery(&f, "DEL1", "PKG404").await;

        let err = f.composer.track_delivery(&DeliveryId::new("DEL2")).await.unwrap_err();
        assert!(matches!(err, TrackerError::NotFound { entity: Entity::Delivery, .. }));

        let err = f.composer.track_delivery(&DeliveryId::new("DEL1")).await.unwrap_err();
        assert!(matches!(err, TrackerError::NotFound { entity: Entity::Package, .. }));
    }
}
