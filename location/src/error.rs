use std::fmt;

use thiserror::Error;

/// Message carried by [`LocationErrorKind::CapabilityUnavailable`] errors.
pub const UNSUPPORTED_MESSAGE: &str = "Geolocation not supported";

/// The reason a location request failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "SCREAMING_SNAKE_CASE")
)]
pub enum LocationErrorKind {
    /// The host exposes no location capability.
    CapabilityUnavailable,
    /// The user or a system policy refused the request.
    PermissionDenied,
    /// The provider could not determine a position.
    PositionUnavailable,
    /// No fix arrived before the deadline.
    Timeout,
}

impl LocationErrorKind {
    /// The numeric code used by the W3C Geolocation API.
    ///
    /// `CapabilityUnavailable` has no W3C counterpart and reports `0`.
    #[must_use]
    pub const fn code(self) -> u16 {
        match self {
            Self::CapabilityUnavailable => 0,
            Self::PermissionDenied => 1,
            Self::PositionUnavailable => 2,
            Self::Timeout => 3,
        }
    }

    /// Map a numeric provider code onto a kind.
    ///
    /// Codes outside the W3C set are treated as `PositionUnavailable`. That
    /// includes `0`: a provider that was reached had the capability, so
    /// `CapabilityUnavailable` only comes from the requester's own check.
    #[must_use]
    pub const fn from_code(code: u16) -> Self {
        match code {
            1 => Self::PermissionDenied,
            3 => Self::Timeout,
            _ => Self::PositionUnavailable,
        }
    }

    /// Map a provider error code, symbolic (`"PERMISSION_DENIED"`) or
    /// numeric (`"1"`), onto a kind.
    ///
    /// Unrecognised codes, and `CAPABILITY_UNAVAILABLE`, are treated as
    /// `PositionUnavailable`.
    #[must_use]
    pub fn from_provider_code(code: &str) -> Self {
        let code = code.trim();
        if let Ok(numeric) = code.parse::<u16>() {
            return Self::from_code(numeric);
        }

        match code.to_ascii_uppercase().as_str() {
            "PERMISSION_DENIED" => Self::PermissionDenied,
            "TIMEOUT" => Self::Timeout,
            _ => Self::PositionUnavailable,
        }
    }

    /// The symbolic name of this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CapabilityUnavailable => "CAPABILITY_UNAVAILABLE",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::PositionUnavailable => "POSITION_UNAVAILABLE",
            Self::Timeout => "TIMEOUT",
        }
    }
}

impl fmt::Display for LocationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed location request: what went wrong and the provider's description.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[error("{kind}: {message}")]
pub struct LocationError {
    kind: LocationErrorKind,
    message: String,
}

impl LocationError {
    /// Create an error of the given kind.
    pub fn new(kind: LocationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Build an error from a provider's code and message.
    ///
    /// See [`LocationErrorKind::from_provider_code`] for how codes are read.
    pub fn from_provider(code: &str, message: impl Into<String>) -> Self {
        Self::new(LocationErrorKind::from_provider_code(code), message)
    }

    /// The error reported when the host has no location capability.
    #[must_use]
    pub fn unsupported() -> Self {
        Self::new(LocationErrorKind::CapabilityUnavailable, UNSUPPORTED_MESSAGE)
    }

    /// A `PermissionDenied` error.
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(LocationErrorKind::PermissionDenied, message)
    }

    /// A `PositionUnavailable` error.
    pub fn position_unavailable(message: impl Into<String>) -> Self {
        Self::new(LocationErrorKind::PositionUnavailable, message)
    }

    /// A `Timeout` error.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(LocationErrorKind::Timeout, message)
    }

    /// What went wrong.
    #[must_use]
    pub const fn kind(&self) -> LocationErrorKind {
        self.kind
    }

    /// The human-readable description.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("PERMISSION_DENIED", LocationErrorKind::PermissionDenied)]
    #[case("POSITION_UNAVAILABLE", LocationErrorKind::PositionUnavailable)]
    #[case("TIMEOUT", LocationErrorKind::Timeout)]
    #[case("timeout", LocationErrorKind::Timeout)]
    #[case("1", LocationErrorKind::PermissionDenied)]
    #[case("2", LocationErrorKind::PositionUnavailable)]
    #[case(" 3 ", LocationErrorKind::Timeout)]
    #[case("SOMETHING_ELSE", LocationErrorKind::PositionUnavailable)]
    #[case("42", LocationErrorKind::PositionUnavailable)]
    #[case("0", LocationErrorKind::PositionUnavailable)]
    #[case("CAPABILITY_UNAVAILABLE", LocationErrorKind::PositionUnavailable)]
    fn reads_provider_codes(#[case] code: &str, #[case] expected: LocationErrorKind) {
        assert_eq!(LocationErrorKind::from_provider_code(code), expected);
    }

    #[test]
    fn codes_follow_the_w3c_numbering() {
        for kind in [
            LocationErrorKind::PermissionDenied,
            LocationErrorKind::PositionUnavailable,
            LocationErrorKind::Timeout,
        ] {
            assert_eq!(LocationErrorKind::from_code(kind.code()), kind);
            assert_eq!(LocationErrorKind::from_provider_code(kind.as_str()), kind);
        }
    }

    #[test]
    fn providers_cannot_report_a_missing_capability() {
        assert_eq!(LocationErrorKind::CapabilityUnavailable.code(), 0);
        assert_eq!(LocationErrorKind::from_code(0), LocationErrorKind::PositionUnavailable);
        assert_eq!(
            LocationError::from_provider("CAPABILITY_UNAVAILABLE", "gone").kind(),
            LocationErrorKind::PositionUnavailable
        );
    }

    #[test]
    fn unsupported_error_carries_the_fixed_message() {
        let error = LocationError::unsupported();

        assert_eq!(error.kind(), LocationErrorKind::CapabilityUnavailable);
        assert_eq!(error.message(), "Geolocation not supported");
        assert_eq!(
            error.to_string(),
            "CAPABILITY_UNAVAILABLE: Geolocation not supported"
        );
    }

    #[test]
    fn provider_message_is_kept_verbatim() {
        let error = LocationError::from_provider("PERMISSION_DENIED", "User denied Geolocation");

        assert_eq!(error.kind(), LocationErrorKind::PermissionDenied);
        assert_eq!(error.message(), "User denied Geolocation");
    }
}
