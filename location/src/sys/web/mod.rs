//! Browser location provider using `navigator.geolocation`.

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::{Object, Promise, Reflect};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::wasm_bindgen;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Geolocation, GeolocationPosition, GeolocationPositionError, PositionOptions};

use super::js;
use crate::{
    LocationError, LocationErrorKind, LocationProvider, Position, PositionCallbacks, RequestConfig,
    UNSUPPORTED_MESSAGE,
};

/// Location provider backed by the browser's Geolocation API.
#[derive(Debug, Default, Clone, Copy)]
pub struct BrowserProvider;

impl BrowserProvider {
    /// The provider, if the page exposes `navigator.geolocation`.
    #[must_use]
    pub fn detect() -> Option<Self> {
        geolocation().map(|_| Self)
    }
}

impl LocationProvider for BrowserProvider {
    fn get_current_position(&self, config: &RequestConfig, callbacks: PositionCallbacks) {
        let Some(geolocation) = geolocation() else {
            callbacks.fail(LocationError::position_unavailable(UNSUPPORTED_MESSAGE));
            return;
        };

        // Only one of the two closures ever runs; whichever does takes the callbacks.
        let slot = Rc::new(RefCell::new(Some(callbacks)));

        let on_success = {
            let slot = Rc::clone(&slot);
            Closure::once_into_js(move |position: GeolocationPosition| {
                let callbacks = slot.borrow_mut().take();
                if let Some(callbacks) = callbacks {
                    callbacks.succeed(to_position(&position));
                }
            })
        };

        let on_error = {
            let slot = Rc::clone(&slot);
            Closure::once_into_js(move |error: GeolocationPositionError| {
                let callbacks = slot.borrow_mut().take();
                if let Some(callbacks) = callbacks {
                    callbacks.fail(to_error(&error));
                }
            })
        };

        let options = PositionOptions::new();
        options.set_enable_high_accuracy(config.enable_high_accuracy());
        options.set_timeout(config.timeout_millis());
        options.set_maximum_age(config.maximum_age_millis());

        if let Err(thrown) = geolocation.get_current_position_with_error_callback_and_options(
            on_success.unchecked_ref(),
            Some(on_error.unchecked_ref()),
            &options,
        ) {
            let callbacks = slot.borrow_mut().take();
            if let Some(callbacks) = callbacks {
                callbacks.fail(LocationError::position_unavailable(format!(
                    "getCurrentPosition threw: {thrown:?}"
                )));
            }
        }
    }
}

fn geolocation() -> Option<Geolocation> {
    let navigator = web_sys::window()?.navigator();
    let value = Reflect::get(&navigator, &JsValue::from_str("geolocation")).ok()?;
    if value.is_undefined() || value.is_null() {
        return None;
    }
    Some(value.unchecked_into())
}

fn to_position(position: &GeolocationPosition) -> Position {
    let coords = position.coords();
    Position {
        latitude: coords.latitude(),
        longitude: coords.longitude(),
        accuracy: coords.accuracy(),
        altitude: coords.altitude(),
        altitude_accuracy: coords.altitude_accuracy(),
        heading: coords.heading().filter(|h| !h.is_nan()),
        speed: coords.speed(),
        timestamp: js::epoch_millis(position.timestamp()),
    }
}

fn to_error(error: &GeolocationPositionError) -> LocationError {
    LocationError::new(LocationErrorKind::from_code(error.code()), error.message())
}

/// Request the current position from JavaScript.
///
/// Exported as `requestBrowserLocation`. The promise resolves to
/// `{ coords: { latitude, longitude, accuracy, altitude, altitudeAccuracy,
/// heading, speed }, timestamp }` and rejects with an `Error` whose `code`
/// property holds the W3C error code (`0` when geolocation is missing).
#[wasm_bindgen(js_name = requestBrowserLocation)]
#[must_use]
pub fn request_browser_location() -> Promise {
    let request = crate::request_location();
    wasm_bindgen_futures::future_to_promise(async move {
        match request.await {
            Ok(position) => position_to_js(&position),
            Err(error) => Err(error_to_js(&error)),
        }
    })
}

fn position_to_js(position: &Position) -> Result<JsValue, JsValue> {
    let coords = Object::new();
    for (key, value) in js::coords_entries(position) {
        set(&coords, key, value.map_or(JsValue::NULL, JsValue::from))?;
    }

    let result = Object::new();
    set(&result, "coords", coords.into())?;
    set(&result, "timestamp", js::js_timestamp(position).into())?;
    Ok(result.into())
}

fn error_to_js(error: &LocationError) -> JsValue {
    let js_error = js_sys::Error::new(error.message());
    // Setting a property on a fresh Error object cannot fail.
    let _ = set(&js_error, "code", js::rejection_code(error).into());
    js_error.into()
}

fn set(target: &Object, key: &str, value: JsValue) -> Result<(), JsValue> {
    Reflect::set(target, &JsValue::from_str(key), &value)?;
    Ok(())
}
