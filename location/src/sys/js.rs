//! Plain-data shape of the values `requestBrowserLocation` hands to JavaScript.

use crate::{LocationError, Position};

/// Keys and values of the resolved `coords` object. `None` becomes `null`.
pub(crate) const fn coords_entries(position: &Position) -> [(&'static str, Option<f64>); 7] {
    [
        ("latitude", Some(position.latitude)),
        ("longitude", Some(position.longitude)),
        ("accuracy", Some(position.accuracy)),
        ("altitude", position.altitude),
        ("altitudeAccuracy", position.altitude_accuracy),
        ("heading", position.heading),
        ("speed", position.speed),
    ]
}

/// The resolved object's `timestamp`, a JavaScript number.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn js_timestamp(position: &Position) -> f64 {
    position.timestamp as f64
}

/// Epoch milliseconds from a browser `DOMTimeStamp`.
///
/// Non-finite and non-positive stamps read as `0`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn epoch_millis(timestamp: f64) -> u64 {
    if timestamp.is_finite() && timestamp > 0.0 {
        timestamp as u64
    } else {
        0
    }
}

/// The `code` property of the rejection `Error`.
pub(crate) const fn rejection_code(error: &LocationError) -> u16 {
    error.kind().code()
}
