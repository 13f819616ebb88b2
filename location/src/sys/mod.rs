//! Platform-specific location providers.
//!
//! [`default_provider`] picks the provider for the build target. Targets
//! without one get `None`, which requests report as
//! [`CapabilityUnavailable`](crate::LocationErrorKind::CapabilityUnavailable).

use std::sync::Arc;

use crate::LocationProvider;

#[cfg_attr(
    not(all(target_arch = "wasm32", target_os = "unknown")),
    allow(dead_code)
)]
mod js;

#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
mod web;

#[cfg(target_os = "windows")]
mod windows;

#[cfg(target_os = "linux")]
mod linux;

#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
pub use web::{BrowserProvider, request_browser_location};

#[cfg(target_os = "windows")]
pub use windows::WindowsProvider;

#[cfg(target_os = "linux")]
pub use linux::GeoClueProvider;

/// The location provider for the current target, if the host has one.
#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
#[must_use]
pub fn default_provider() -> Option<Arc<dyn LocationProvider>> {
    BrowserProvider::detect().map(|provider| Arc::new(provider) as Arc<dyn LocationProvider>)
}

/// The location provider for the current target, if the host has one.
#[cfg(target_os = "windows")]
#[must_use]
pub fn default_provider() -> Option<Arc<dyn LocationProvider>> {
    Some(Arc::new(WindowsProvider::new()))
}

/// The location provider for the current target, if the host has one.
#[cfg(target_os = "linux")]
#[must_use]
pub fn default_provider() -> Option<Arc<dyn LocationProvider>> {
    Some(Arc::new(GeoClueProvider::new()))
}

// Fallback for targets without a location capability
/// The location provider for the current target, if the host has one.
#[cfg(not(any(
    all(target_arch = "wasm32", target_os = "unknown"),
    target_os = "windows",
    target_os = "linux"
)))]
#[must_use]
pub const fn default_provider() -> Option<Arc<dyn LocationProvider>> {
    None
}
