use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use parcel_core::app::{AppBuilder, TrackerConfig};
use parcel_core::domain::{HubMessage, Location, NewPackage};

fn demo_package() -> NewPackage {
    NewPackage {
        description: Some("A package containing fragile items.".to_string()),
        from_name: "John Doe".to_string(),
        from_address: "123 Elm Street".to_string(),
        from_location: Location::new(40.7128, -74.0060),
        to_name: "Jane Smith".to_string(),
        to_address: "456 Oak Avenue".to_string(),
        to_location: Location::new(34.0522, -118.2437),
        height: 10.0,
        depth: 5.0,
        width: 8.0,
    }
}

/// observer：全 broadcast を標準出力に流す
async fn observer_loop(mut rx: mpsc::UnboundedReceiver<HubMessage>) {
    while let Some(message) = rx.recv().await {
        match message.to_json() {
            Ok(line) => println!("{line}"),
            Err(e) => tracing::error!(error = %e, "failed to serialize hub message"),
        }
    }
}

/// driver：自分宛ての error だけを標準エラーに出す（broadcast は observer 側で表示）
async fn driver_error_loop(mut rx: mpsc::UnboundedReceiver<HubMessage>) {
    while let Some(message) = rx.recv().await {
        if let HubMessage::Error { message } = message {
            eprintln!("error: {message}");
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = TrackerConfig::from_env().context("loading PARCEL_* configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter.as_str().into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    // (A) App を組み立てる（インメモリストア）
    let app = AppBuilder::new().config(config).build()?;

    // (B) package と delivery を 1 件ずつ用意
    let package = app.packages.create(demo_package()).await?;
    let delivery = app.lifecycle.create(&package.package_id).await?;
    info!(
        package_id = %package.package_id,
        delivery_id = %delivery.delivery_id,
        "seeded demo records"
    );
    eprintln!(
        "send JSON lines on stdin, e.g. \
         {{\"event\":\"status_changed\",\"data\":{{\"delivery_id\":\"{}\",\"status\":\"PickUp\"}}}}",
        delivery.delivery_id
    );

    // (C) observer 接続：broadcast を表示
    let (observer, observer_rx) = app.hub.connect().await;
    let printer = tokio::spawn(observer_loop(observer_rx));

    // (D) driver 接続：stdin の各行を到着順にハブへ
    let (driver, driver_rx) = app.hub.connect().await;
    let driver_echo = tokio::spawn(driver_error_loop(driver_rx));
    let (line_tx, line_rx) = mpsc::unbounded_channel::<String>();
    let hub = app.hub.clone();
    let server = tokio::spawn(async move { hub.serve(driver, line_rx).await });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        if line_tx.send(line).is_err() {
            break;
        }
    }
    drop(line_tx);
    server.await?;

    driver_echo.await?;
    app.hub.disconnect(observer).await;
    printer.await?;

    let status = app.status().await?;
    info!(?status, "shutting down");
    println!("{}", serde_json::to_string(&status)?);
    Ok(())
}
