//! Desktop check binary for geofix-location.
//!
//! Run with: `RUST_LOG=info cargo run -p geofix-location-demo`

use geofix_location::{LocationErrorKind, LocationRequester, RequestConfig};

#[tokio::main]
async fn main() {
    env_logger::init();

    println!("=== Geofix Location Check ===\n");

    let requester = LocationRequester::system();
    if !requester.is_available() {
        println!("No location capability on this platform.");
        return;
    }

    let config = RequestConfig::FRESH_HIGH_ACCURACY;
    println!(
        "Requesting a fix (high accuracy: {}, timeout: {} ms, maximum age: {} ms)...",
        config.enable_high_accuracy(),
        config.timeout_millis(),
        config.maximum_age_millis()
    );

    match requester.request_location().await {
        Ok(position) => {
            println!("✓ Location retrieved successfully!");
            println!("  Latitude:  {:.6}°", position.latitude);
            println!("  Longitude: {:.6}°", position.longitude);
            println!("  Accuracy:  {:.1}m", position.accuracy);
            if let Some(altitude) = position.altitude {
                println!("  Altitude:  {altitude:.1}m");
            }
            if let Some(heading) = position.heading {
                println!("  Heading:   {heading:.1}°");
            }
            if let Some(speed) = position.speed {
                println!("  Speed:     {speed:.1}m/s");
            }
            println!("  Timestamp: {}", position.timestamp);
        }
        Err(e) if e.kind() == LocationErrorKind::PermissionDenied => {
            println!("✗ Location access was denied: {}", e.message());
        }
        Err(e) => {
            println!("✗ Failed to get location: {e}");
        }
    }
}
