//! Linux location provider using the `GeoClue2` D-Bus service.

use std::thread;

use futures::future::{self, Either};
use futures::{Stream, StreamExt};
use futures_timer::Delay;
use log::{debug, error};
use zbus::zvariant::{OwnedObjectPath, OwnedValue, Value};
use zbus::{Connection, Message, Proxy};

use crate::{
    LocationError, LocationErrorKind, LocationProvider, Position, PositionCallbacks, RequestConfig,
};

const GEOCLUE: &str = "org.freedesktop.GeoClue2";
const MANAGER_PATH: &str = "/org/freedesktop/GeoClue2/Manager";
const MANAGER_IFACE: &str = "org.freedesktop.GeoClue2.Manager";
const CLIENT_IFACE: &str = "org.freedesktop.GeoClue2.Client";
const LOCATION_IFACE: &str = "org.freedesktop.GeoClue2.Location";
const PROPERTIES_IFACE: &str = "org.freedesktop.DBus.Properties";
const ACCESS_DENIED: &str = "org.freedesktop.DBus.Error.AccessDenied";

// GClueAccuracyLevel
const ACCURACY_EXACT: u32 = 8;
const ACCURACY_STREET: u32 = 6;

/// `GeoClue2` reports unknown altitudes as `-G_MAXDOUBLE` and unknown
/// speed or heading as a negative value.
const UNKNOWN_ALTITUDE: f64 = -f64::MAX;

/// Location provider backed by `GeoClue2`.
#[derive(Debug, Clone)]
pub struct GeoClueProvider {
    desktop_id: String,
}

impl GeoClueProvider {
    /// A provider that identifies itself to `GeoClue2` as `geofix`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_desktop_id("geofix")
    }

    /// A provider that identifies itself with the given desktop ID.
    ///
    /// `GeoClue2` agents use the ID to look up the application's permissions.
    pub fn with_desktop_id(desktop_id: impl Into<String>) -> Self {
        Self {
            desktop_id: desktop_id.into(),
        }
    }
}

impl Default for GeoClueProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl LocationProvider for GeoClueProvider {
    fn get_current_position(&self, config: &RequestConfig, callbacks: PositionCallbacks) {
        let config = *config;
        let desktop_id = self.desktop_id.clone();

        let spawned = thread::Builder::new()
            .name("geofix-geoclue".into())
            .spawn(move || {
                let outcome = futures::executor::block_on(locate(&desktop_id, config));
                callbacks.settle(outcome);
            });

        // The callbacks went down with the closure, which fails the request.
        if let Err(e) = spawned {
            error!("failed to spawn GeoClue worker: {e}");
        }
    }
}

async fn locate(desktop_id: &str, config: RequestConfig) -> Result<Position, LocationError> {
    let connection = Connection::system()
        .await
        .map_err(|e| LocationError::position_unavailable(format!("D-Bus connection failed: {e}")))?;

    let client = create_client(&connection, desktop_id, config).await?;

    // Subscribe before Start so the first fix cannot slip past.
    let updates = Proxy::new(&connection, GEOCLUE, client.as_str(), CLIENT_IFACE)
        .await
        .map_err(|e| dbus_error("Failed to open GeoClue client", &e))?
        .receive_signal("LocationUpdated")
        .await
        .map_err(|e| dbus_error("Failed to subscribe to location updates", &e))?;

    call_client(&connection, &client, "Start")
        .await
        .map_err(|e| dbus_error("Failed to start GeoClue client", &e))?;

    let fix = future::select(
        Box::pin(wait_for_fix(&connection, updates)),
        Delay::new(config.timeout()),
    )
    .await;

    if let Err(e) = call_client(&connection, &client, "Stop").await {
        debug!("failed to stop GeoClue client: {e}");
    }

    match fix {
        Either::Left((outcome, _)) => outcome,
        Either::Right(((), _)) => Err(LocationError::timeout(format!(
            "GeoClue produced no position within {} ms",
            config.timeout().as_millis()
        ))),
    }
}

async fn create_client(
    connection: &Connection,
    desktop_id: &str,
    config: RequestConfig,
) -> Result<OwnedObjectPath, LocationError> {
    let reply: (OwnedObjectPath,) = connection
        .call_method(Some(GEOCLUE), MANAGER_PATH, Some(MANAGER_IFACE), "GetClient", &())
        .await
        .map_err(|e| dbus_error("GeoClue2 not available", &e))?
        .body()
        .deserialize()
        .map_err(|e| {
            LocationError::position_unavailable(format!("Failed to parse client path: {e}"))
        })?;

    let client = reply.0;

    // DesktopId is mandatory before Start.
    set_client_property(connection, &client, "DesktopId", Value::from(desktop_id))
        .await
        .map_err(|e| dbus_error("Failed to set desktop ID", &e))?;

    let accuracy = if config.enable_high_accuracy() {
        ACCURACY_EXACT
    } else {
        ACCURACY_STREET
    };
    set_client_property(connection, &client, "RequestedAccuracyLevel", Value::from(accuracy))
        .await
        .map_err(|e| dbus_error("Failed to set accuracy level", &e))?;

    Ok(client)
}

/// Waits for the client's first `LocationUpdated(old, new)` after `Start`.
///
/// A freshly started client has no cached fix, so whatever appears here is
/// current.
async fn wait_for_fix(
    connection: &Connection,
    mut updates: impl Stream<Item = Message> + Unpin,
) -> Result<Position, LocationError> {
    let location = updated_location(updates.next().await)?;
    read_location(connection, &location).await
}

/// The new location path carried by a `LocationUpdated` signal.
fn updated_location(update: Option<Message>) -> Result<OwnedObjectPath, LocationError> {
    let Some(update) = update else {
        return Err(LocationError::position_unavailable(
            "GeoClue client stopped before publishing a location",
        ));
    };

    let (_, location): (OwnedObjectPath, OwnedObjectPath) =
        update.body().deserialize().map_err(|e| {
            LocationError::position_unavailable(format!("Failed to parse location path: {e}"))
        })?;
    Ok(location)
}

async fn read_location(
    connection: &Connection,
    location: &OwnedObjectPath,
) -> Result<Position, LocationError> {
    let read = |property: &'static str| async move {
        let value = get_property(connection, location.as_str(), LOCATION_IFACE, property).await?;
        Ok::<f64, zbus::Error>(f64::try_from(value)?)
    };

    let latitude = read("Latitude")
        .await
        .map_err(|e| dbus_error("Failed to get latitude", &e))?;
    let longitude = read("Longitude")
        .await
        .map_err(|e| dbus_error("Failed to get longitude", &e))?;
    let accuracy = read("Accuracy")
        .await
        .map_err(|e| dbus_error("Failed to get accuracy", &e))?;

    let altitude = read("Altitude")
        .await
        .ok()
        .filter(|altitude| *altitude > UNKNOWN_ALTITUDE);
    let heading = read("Heading").await.ok().filter(|h| *h >= 0.0);
    let speed = read("Speed").await.ok().filter(|s| *s >= 0.0);

    let timestamp = get_property(connection, location.as_str(), LOCATION_IFACE, "Timestamp")
        .await
        .map(|value| timestamp_millis(&value));
    let timestamp = match timestamp {
        Ok(Some(millis)) => millis,
        Ok(None) => {
            debug!("GeoClue timestamp out of range, using the read time");
            crate::now_millis()
        }
        Err(e) => {
            debug!("failed to get GeoClue timestamp, using the read time: {e}");
            crate::now_millis()
        }
    };

    Ok(Position {
        latitude,
        longitude,
        accuracy,
        altitude,
        altitude_accuracy: None,
        heading,
        speed,
        timestamp,
    })
}

/// Epoch milliseconds from GeoClue's `Timestamp`, a `(tt)` of seconds and
/// microseconds.
fn timestamp_millis(value: &Value<'_>) -> Option<u64> {
    match value {
        Value::Value(inner) => timestamp_millis(inner),
        Value::Structure(timestamp) => match timestamp.fields() {
            [Value::U64(secs), Value::U64(usecs)] => epoch_millis(*secs, *usecs),
            _ => None,
        },
        _ => None,
    }
}

const fn epoch_millis(secs: u64, usecs: u64) -> Option<u64> {
    match secs.checked_mul(1000) {
        Some(millis) => millis.checked_add(usecs / 1000),
        None => None,
    }
}

async fn get_property(
    connection: &Connection,
    path: &str,
    interface: &str,
    property: &str,
) -> zbus::Result<OwnedValue> {
    connection
        .call_method(
            Some(GEOCLUE),
            path,
            Some(PROPERTIES_IFACE),
            "Get",
            &(interface, property),
        )
        .await?
        .body()
        .deserialize()
}

async fn set_client_property(
    connection: &Connection,
    client: &OwnedObjectPath,
    property: &str,
    value: Value<'_>,
) -> zbus::Result<()> {
    connection
        .call_method(
            Some(GEOCLUE),
            client.as_str(),
            Some(PROPERTIES_IFACE),
            "Set",
            &(CLIENT_IFACE, property, value),
        )
        .await?;
    Ok(())
}

async fn call_client(
    connection: &Connection,
    client: &OwnedObjectPath,
    method: &str,
) -> zbus::Result<()> {
    connection
        .call_method(Some(GEOCLUE), client.as_str(), Some(CLIENT_IFACE), method, &())
        .await?;
    Ok(())
}

fn dbus_error(context: &str, error: &zbus::Error) -> LocationError {
    let name = match error {
        zbus::Error::MethodError(name, _, _) => Some(name.as_str()),
        _ => None,
    };
    LocationError::new(error_kind(name), format!("{context}: {error}"))
}

/// Kind for a D-Bus error reply, by error name.
fn error_kind(name: Option<&str>) -> LocationErrorKind {
    match name {
        Some(ACCESS_DENIED) => LocationErrorKind::PermissionDenied,
        _ => LocationErrorKind::PositionUnavailable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use zbus::zvariant::ObjectPath;

    const CLIENT_PATH: &str = "/org/freedesktop/GeoClue2/Client/1";

    #[test]
    fn default_desktop_id_names_the_crate() {
        assert_eq!(GeoClueProvider::default().desktop_id, "geofix");
        assert_eq!(
            GeoClueProvider::with_desktop_id("org.example.Maps").desktop_id,
            "org.example.Maps"
        );
    }

    #[rstest]
    #[case(Some("org.freedesktop.DBus.Error.AccessDenied"), LocationErrorKind::PermissionDenied)]
    #[case(
        Some("org.freedesktop.DBus.Error.ServiceUnknown"),
        LocationErrorKind::PositionUnavailable
    )]
    #[case(None, LocationErrorKind::PositionUnavailable)]
    fn classifies_dbus_error_names(
        #[case] name: Option<&str>,
        #[case] expected: LocationErrorKind,
    ) {
        assert_eq!(error_kind(name), expected);
    }

    #[test]
    fn transport_failures_are_position_unavailable() {
        let error = dbus_error("GeoClue2 not available", &zbus::Error::Failure("gone".into()));

        assert_eq!(error.kind(), LocationErrorKind::PositionUnavailable);
        assert!(error.message().starts_with("GeoClue2 not available: "));
    }

    fn location_updated(old: &str, new: &str) -> Message {
        let paths = (
            ObjectPath::try_from(old).expect("valid path"),
            ObjectPath::try_from(new).expect("valid path"),
        );
        Message::signal(CLIENT_PATH, CLIENT_IFACE, "LocationUpdated")
            .expect("valid signal header")
            .build(&paths)
            .expect("serializable body")
    }

    #[test]
    fn takes_the_new_path_from_location_updated() {
        let update = location_updated("/", "/org/freedesktop/GeoClue2/Location/1");

        let location = updated_location(Some(update)).expect("signal carries a path");
        assert_eq!(location.as_str(), "/org/freedesktop/GeoClue2/Location/1");
    }

    #[test]
    fn ended_update_stream_is_position_unavailable() {
        let error = updated_location(None).expect_err("no signal, no location");
        assert_eq!(error.kind(), LocationErrorKind::PositionUnavailable);
    }

    #[test]
    fn malformed_location_updated_is_position_unavailable() {
        let update = Message::signal(CLIENT_PATH, CLIENT_IFACE, "LocationUpdated")
            .expect("valid signal header")
            .build(&("not", "paths"))
            .expect("serializable body");

        let error = updated_location(Some(update)).expect_err("strings are not object paths");
        assert_eq!(error.kind(), LocationErrorKind::PositionUnavailable);
        assert!(error.message().starts_with("Failed to parse location path: "));
    }

    #[test]
    fn converts_geoclue_timestamps_to_unix_millis() {
        let stamp = Value::from((1_718_000_000_u64, 123_456_u64));
        assert_eq!(timestamp_millis(&stamp), Some(1_718_000_000_123));

        let wrapped = Value::Value(Box::new(stamp));
        assert_eq!(timestamp_millis(&wrapped), Some(1_718_000_000_123));
    }

    #[test]
    fn rejects_malformed_or_overflowing_timestamps() {
        assert_eq!(timestamp_millis(&Value::from(1_718_000_000_u64)), None);
        assert_eq!(timestamp_millis(&Value::from((1_i32, 2_i32))), None);
        assert_eq!(epoch_millis(u64::MAX, 0), None);
        assert_eq!(epoch_millis(u64::MAX / 1000, 999_999), None);
    }
}
