//! Windows location provider using the `WinRT` `Geolocator`.

use std::thread;

use log::error;
use windows::Devices::Geolocation::{
    AltitudeReferenceSystem, Geocoordinate, Geolocator, PositionAccuracy,
};
use windows::Foundation::{DateTime, TimeSpan};
use windows::core::HRESULT;

use crate::{LocationError, LocationProvider, Position, PositionCallbacks, RequestConfig};

// HRESULT_FROM_WIN32(ERROR_ACCESS_DENIED)
#[allow(clippy::cast_possible_wrap)]
const E_ACCESSDENIED: HRESULT = HRESULT(0x8007_0005_u32 as i32);
// HRESULT_FROM_WIN32(ERROR_TIMEOUT)
#[allow(clippy::cast_possible_wrap)]
const E_TIMEOUT: HRESULT = HRESULT(0x8007_05B4_u32 as i32);

/// 100ns ticks between 1601-01-01 and 1970-01-01.
const UNIX_EPOCH_TICKS: i64 = 116_444_736_000_000_000;
const TICKS_PER_MILLI: i64 = 10_000;

/// Location provider backed by `Windows.Devices.Geolocation`.
#[derive(Debug, Default, Clone, Copy)]
pub struct WindowsProvider;

impl WindowsProvider {
    /// Create the provider.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl LocationProvider for WindowsProvider {
    fn get_current_position(&self, config: &RequestConfig, callbacks: PositionCallbacks) {
        let config = *config;

        // `IAsyncOperation::get` blocks, keep it off the caller's thread.
        let spawned = thread::Builder::new()
            .name("geofix-geolocator".into())
            .spawn(move || callbacks.settle(locate(config)));

        if let Err(e) = spawned {
            error!("failed to spawn Geolocator worker: {e}");
        }
    }
}

fn locate(config: RequestConfig) -> Result<Position, LocationError> {
    let geolocator = Geolocator::new().map_err(|e| winrt_error("Geolocator unavailable", &e))?;

    let accuracy = if config.enable_high_accuracy() {
        PositionAccuracy::High
    } else {
        PositionAccuracy::Default
    };
    geolocator
        .SetDesiredAccuracy(accuracy)
        .map_err(|e| winrt_error("Failed to set desired accuracy", &e))?;

    let position = geolocator
        .GetGeopositionAsyncWithAgeAndTimeout(
            TimeSpan::from(config.maximum_age()),
            TimeSpan::from(config.timeout()),
        )
        .map_err(|e| winrt_error("Failed to request position", &e))?
        .get()
        .map_err(|e| winrt_error("Failed to get position", &e))?;

    let coordinate = position
        .Coordinate()
        .map_err(|e| winrt_error("Position has no coordinate", &e))?;

    to_position(&coordinate)
}

fn to_position(coordinate: &Geocoordinate) -> Result<Position, LocationError> {
    let geopoint = coordinate
        .Point()
        .map_err(|e| winrt_error("Failed to read coordinates", &e))?;
    let point = geopoint
        .Position()
        .map_err(|e| winrt_error("Failed to read coordinates", &e))?;
    let altitude = geopoint
        .AltitudeReferenceSystem()
        .ok()
        .and_then(|reference| reported_altitude(reference, point.Altitude));
    let accuracy = coordinate
        .Accuracy()
        .map_err(|e| winrt_error("Failed to read accuracy", &e))?;

    let timestamp = coordinate
        .Timestamp()
        .ok()
        .and_then(unix_millis)
        .unwrap_or_else(crate::now_millis);

    Ok(Position {
        latitude: point.Latitude,
        longitude: point.Longitude,
        accuracy,
        altitude,
        altitude_accuracy: coordinate.AltitudeAccuracy().and_then(|r| r.Value()).ok(),
        heading: coordinate
            .Heading()
            .and_then(|r| r.Value())
            .ok()
            .filter(|h| !h.is_nan()),
        speed: coordinate
            .Speed()
            .and_then(|r| r.Value())
            .ok()
            .filter(|s| !s.is_nan()),
        timestamp,
    })
}

/// A sensor without altitude leaves the reference system `Unspecified` and
/// the altitude at zero.
fn reported_altitude(reference: AltitudeReferenceSystem, altitude: f64) -> Option<f64> {
    (reference != AltitudeReferenceSystem::Unspecified).then_some(altitude)
}

fn unix_millis(time: DateTime) -> Option<u64> {
    let millis = (time.UniversalTime - UNIX_EPOCH_TICKS) / TICKS_PER_MILLI;
    u64::try_from(millis).ok()
}

fn winrt_error(context: &str, error: &windows::core::Error) -> LocationError {
    let message = format!("{context}: {}", error.message());
    match error.code() {
        E_ACCESSDENIED => LocationError::permission_denied(message),
        E_TIMEOUT => LocationError::timeout(message),
        _ => LocationError::position_unavailable(message),
    }
}
