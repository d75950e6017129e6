//! Device information example
//!
//! Run with: cargo run --example device_info -- 58:2D:34:35:F3:D4

use mitemp_cgg1_ble::{Error, Parameter, Poller, PollerConfig, Result};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let address = std::env::args().nth(1).ok_or_else(|| Error::InvalidParameter {
        name: "address".to_string(),
        value: "<missing>".to_string(),
    })?;

    let poller = Poller::connect(&address, PollerConfig::default()).await?;
    let info = poller.device_info().await?;

    println!("Device Information");
    println!("==================");
    println!("Name:         {}", info.name);
    println!("Manufacturer: {}", info.manufacturer);
    println!("Model:        {}", info.model);
    println!("Firmware:     {}", info.firmware_version);
    println!(
        "Battery:      {}%",
        poller.parameter_value(Parameter::Battery, true).await?
    );

    Ok(())
}
