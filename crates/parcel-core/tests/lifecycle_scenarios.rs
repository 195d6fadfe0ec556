use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use rstest::rstest;

use parcel_core::app::{App, AppBuilder, TrackerConfig};
use parcel_core::domain::{
    DeliveryFilter, DeliveryStatus, Location, NewPackage, PackageId, PageOptions, TrackerError,
    TransitionPolicy,
};
use parcel_core::ports::FixedClock;

fn new_package(to_name: &str) -> NewPackage {
    NewPackage {
        description: None,
        from_name: "John Doe".to_string(),
        from_address: "123 Elm Street".to_string(),
        from_location: Location::new(40.7128, -74.0060),
        to_name: to_name.to_string(),
        to_address: "456 Oak Avenue".to_string(),
        to_location: Location::new(34.0522, -118.2437),
        height: 10.0,
        depth: 5.0,
        width: 8.0,
    }
}

fn app_with(policy: TransitionPolicy) -> (App, Arc<FixedClock>) {
    let clock = Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2024, 8, 25, 10, 0, 0).unwrap(),
    ));
    let config = TrackerConfig {
        transition_policy: policy,
        ..Default::default()
    };
    let app = AppBuilder::new()
        .config(config)
        .clock(clock.clone())
        .build()
        .unwrap();
    (app, clock)
}

#[tokio::test]
async fn create_then_track_round_trip() {
    let (app, _) = app_with(TransitionPolicy::Strict);
    let package = app.packages.create(new_package("Jane Smith")).await.unwrap();

    let delivery = app.lifecycle.create(&package.package_id).await.unwrap();
    let view = app
        .lifecycle
        .track_by_delivery_id(&delivery.delivery_id)
        .await
        .unwrap();

    assert_eq!(view.package.package_id, package.package_id);
    assert_eq!(
        view.package.active_delivery_id,
        Some(delivery.delivery_id.clone())
    );
    assert_eq!(view.delivery.map(|d| d.status), Some(DeliveryStatus::Open));
}

#[tokio::test]
async fn happy_path_stamps_timestamps_in_order() {
    let (app, clock) = app_with(TransitionPolicy::Strict);
    let package = app.packages.create(new_package("Jane Smith")).await.unwrap();
    let id = app.lifecycle.create(&package.package_id).await.unwrap().delivery_id;

    clock.advance(Duration::minutes(1));
    let d = app.lifecycle.apply_status(&id, DeliveryStatus::PickUp).await.unwrap();
    assert_eq!(d.status, DeliveryStatus::PickUp);
    assert!(d.pickup_time.is_some());
    assert!(d.start_time.is_none() && d.end_time.is_none());

    clock.advance(Duration::minutes(1));
    let d = app.lifecycle.apply_status(&id, DeliveryStatus::InTransit).await.unwrap();
    assert!(d.start_time.is_some());
    assert!(d.end_time.is_none());

    clock.advance(Duration::minutes(1));
    let d = app.lifecycle.apply_status(&id, DeliveryStatus::Delivered).await.unwrap();
    assert_eq!(d.status, DeliveryStatus::Delivered);
    assert!(d.pickup_time < d.start_time && d.start_time < d.end_time);
}

#[rstest]
#[case::strict(TransitionPolicy::Strict)]
#[case::lenient(TransitionPolicy::Lenient)]
#[tokio::test]
async fn terminal_delivery_keeps_end_time(#[case] policy: TransitionPolicy) {
    let (app, clock) = app_with(policy);
    let package = app.packages.create(new_package("Jane Smith")).await.unwrap();
    let id = app.lifecycle.create(&package.package_id).await.unwrap().delivery_id;
    for status in [
        DeliveryStatus::PickUp,
        DeliveryStatus::InTransit,
        DeliveryStatus::Delivered,
    ] {
        app.lifecycle.apply_status(&id, status).await.unwrap();
    }
    let end_time = app.lifecycle.get(&id).await.unwrap().end_time;

    clock.advance(Duration::hours(2));
    for status in [DeliveryStatus::Open, DeliveryStatus::Failed, DeliveryStatus::Delivered] {
        let result = app.lifecycle.apply_status(&id, status).await;
        match policy {
            TransitionPolicy::Strict => {
                assert!(matches!(result, Err(TrackerError::InvalidTransition { .. })));
            }
            TransitionPolicy::Lenient => {
                assert_eq!(result.unwrap().status, DeliveryStatus::Delivered);
            }
        }
    }

    let after = app.lifecycle.get(&id).await.unwrap();
    assert_eq!(after.status, DeliveryStatus::Delivered);
    assert_eq!(after.end_time, end_time);
}

#[tokio::test]
async fn conflicting_create_leaves_linkage_untouched() {
    let (app, _) = app_with(TransitionPolicy::Strict);
    let package = app.packages.create(new_package("Jane Smith")).await.unwrap();
    let first = app.lifecycle.create(&package.package_id).await.unwrap();

    let err = app.lifecycle.create(&package.package_id).await.unwrap_err();

    assert!(matches!(err, TrackerError::ConflictingActiveDelivery { .. }));
    assert_eq!(err.http_status(), 400);
    let reloaded = app.packages.get(&package.package_id).await.unwrap();
    assert_eq!(reloaded.active_delivery_id, Some(first.delivery_id));
}

#[tokio::test]
async fn finished_delivery_frees_package_for_a_new_one() {
    let (app, _) = app_with(TransitionPolicy::Strict);
    let package = app.packages.create(new_package("Jane Smith")).await.unwrap();
    let first = app.lifecycle.create(&package.package_id).await.unwrap();
    for status in [
        DeliveryStatus::PickUp,
        DeliveryStatus::InTransit,
        DeliveryStatus::Failed,
    ] {
        app.lifecycle.apply_status(&first.delivery_id, status).await.unwrap();
    }

    let view = app.tracking.track_package(&package.package_id).await.unwrap();
    assert!(!view.has_delivery());

    let second = app.lifecycle.create(&package.package_id).await.unwrap();
    let view = app.tracking.track_package(&package.package_id).await.unwrap();
    assert_eq!(view.delivery.map(|d| d.delivery_id), Some(second.delivery_id));

    let history = app
        .lifecycle
        .query(
            &DeliveryFilter {
                package_id: Some(package.package_id.clone()),
                status: None,
            },
            &PageOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(history.total_results, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creates_yield_exactly_one_delivery() {
    let (app, _) = app_with(TransitionPolicy::Strict);
    let package = app.packages.create(new_package("Jane Smith")).await.unwrap();

    let mut tasks = Vec::new();
    for _ in 0..32 {
        let lifecycle = app.lifecycle.clone();
        let id = package.package_id.clone();
        tasks.push(tokio::spawn(async move { lifecycle.create(&id).await }));
    }

    let mut created = Vec::new();
    let mut conflicts = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(delivery) => created.push(delivery),
            Err(TrackerError::ConflictingActiveDelivery { .. }) => conflicts += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(created.len(), 1);
    assert_eq!(conflicts, 31);

    let reloaded = app.packages.get(&package.package_id).await.unwrap();
    assert_eq!(reloaded.active_delivery_id, Some(created[0].delivery_id.clone()));
    let counts = app.lifecycle.counts().await.unwrap();
    assert_eq!(counts.total(), 1);
}

#[tokio::test]
async fn missing_records_are_not_found() {
    let (app, _) = app_with(TransitionPolicy::Strict);

    let err = app.lifecycle.create(&PackageId::new("PKG000000")).await.unwrap_err();
    assert_eq!(err.code(), "not_found");

    let err = app.tracking.track_package(&PackageId::new("PKG000000")).await.unwrap_err();
    assert_eq!(err.http_status(), 404);
}
