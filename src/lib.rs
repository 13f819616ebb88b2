//! # Geofix
//!
//! One-shot geolocation for native and web targets.
//!
//! Geofix asks the host's location service for a single fresh fix and hands
//! it back as a future: the browser's Geolocation API on `wasm32`, `GeoClue2`
//! on Linux and the `WinRT` `Geolocator` on Windows.
//!
//! ## Features
//!
//! - `location`: the location request API.
//! - `serde`: `Serialize`/`Deserialize` for positions and errors.
//!
//! Use the `full` feature to enable everything.
//!
//! ## Example
//!
//! ```toml
//! [dependencies]
//! geofix = { version = "0.1", features = ["location"] }
//! ```
//!
//! ```rust
//! # #[cfg(feature = "location")]
//! use geofix::location;
//!
//! # #[cfg(feature = "location")]
//! async fn get_coords() {
//!     if let Ok(pos) = location::request_location().await {
//!         println!("Latitude: {}, Longitude: {}", pos.latitude, pos.longitude);
//!     }
//! }
//! ```

#[cfg(feature = "location")]
pub use geofix_location as location;
