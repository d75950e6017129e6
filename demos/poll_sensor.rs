//! Periodic temperature/humidity polling example
//!
//! Run with: cargo run --example poll_sensor -- 58:2D:34:35:F3:D4 [interval-secs]

use mitemp_cgg1_ble::{Error, Poller, PollerConfig, Result};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let address = args.next().ok_or_else(|| Error::InvalidParameter {
        name: "address".to_string(),
        value: "<missing>".to_string(),
    })?;
    let interval = args
        .next()
        .and_then(|s| s.parse().ok())
        .map(Duration::from_secs)
        .unwrap_or(Duration::from_secs(10));

    println!("Looking for {}...", address);
    let poller = Poller::connect(&address, PollerConfig::default()).await?;

    println!("Polling every {:?}. Press Ctrl+C to exit.\n", interval);

    loop {
        match (poller.temperature().await, poller.humidity().await) {
            (Ok(t), Ok(h)) => {
                let read_at = poller
                    .last_read()
                    .map(|ts| ts.format("%H:%M:%S").to_string())
                    .unwrap_or_default();
                println!("[{}] {:5.1}°C  {:5.1}%", read_at, t, h);
            }
            (Err(e), _) | (_, Err(e)) => eprintln!("Read failed: {}", e),
        }

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!("\nExiting...");
                break;
            }
            _ = tokio::time::sleep(interval) => {}
        }
    }

    Ok(())
}
