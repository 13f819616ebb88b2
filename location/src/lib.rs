//! One-shot geolocation requests.
//!
//! This crate asks the host's location capability for a single fresh fix and
//! hands the answer back as a future. The capability is whatever the build
//! target offers: the browser's `navigator.geolocation` on the web, `GeoClue2`
//! on Linux and the `WinRT` `Geolocator` on Windows.
//!
//! Every request uses the same configuration: high accuracy, a ten second
//! deadline and no cached fixes (see [`RequestConfig`]).
//!
//! ```no_run
//! # async fn demo() {
//! match geofix_location::request_location().await {
//!     Ok(position) => println!("{}, {}", position.latitude, position.longitude),
//!     Err(error) => eprintln!("no fix: {error}"),
//! }
//! # }
//! ```

#![warn(missing_docs)]

mod error;
mod provider;
mod requester;

pub mod sys;

pub use error::{LocationError, LocationErrorKind, UNSUPPORTED_MESSAGE};
pub use provider::{LocationProvider, PositionCallbacks, RequestConfig};
pub use requester::{LocationRequest, LocationRequester, RequestState};

/// A single geographic fix reported by a location provider.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "camelCase")
)]
pub struct Position {
    /// Latitude in degrees (-90 to 90).
    pub latitude: f64,
    /// Longitude in degrees (-180 to 180).
    pub longitude: f64,
    /// Horizontal accuracy in meters.
    pub accuracy: f64,
    /// Altitude in meters above sea level, if available.
    pub altitude: Option<f64>,
    /// Vertical accuracy in meters, if available.
    pub altitude_accuracy: Option<f64>,
    /// Direction of travel in degrees clockwise from true north, if available.
    pub heading: Option<f64>,
    /// Ground speed in meters per second, if available.
    pub speed: Option<f64>,
    /// Time the fix was taken, as Unix epoch milliseconds.
    pub timestamp: u64,
}

/// Request the current position from the host's location capability.
///
/// The capability check happens before this function returns: on a target
/// without a location capability the returned request has already been
/// rejected with [`LocationErrorKind::CapabilityUnavailable`] and no provider
/// is contacted.
///
/// This is shorthand for `LocationRequester::system().request_location()`.
pub fn request_location() -> LocationRequest {
    LocationRequester::system().request_location()
}

#[cfg(any(target_os = "linux", target_os = "windows"))]
pub(crate) fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}
