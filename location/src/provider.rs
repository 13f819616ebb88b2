use std::fmt;
use std::time::Duration;

use futures::channel::oneshot;
use log::{debug, error, info};

use crate::{LocationError, Position};

pub(crate) type Outcome = Result<Position, LocationError>;

/// Options handed to a provider for a single fix.
///
/// Requests always use [`RequestConfig::FRESH_HIGH_ACCURACY`]; the type
/// exists so providers can read the values instead of hard-coding them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestConfig {
    enable_high_accuracy: bool,
    timeout: Duration,
    maximum_age: Duration,
}

impl RequestConfig {
    /// High accuracy, a ten second deadline and no cached fixes.
    pub const FRESH_HIGH_ACCURACY: Self = Self {
        enable_high_accuracy: true,
        timeout: Duration::from_millis(10_000),
        maximum_age: Duration::ZERO,
    };

    /// Whether the provider should use its most accurate source.
    #[must_use]
    pub const fn enable_high_accuracy(&self) -> bool {
        self.enable_high_accuracy
    }

    /// How long the provider may take to produce a fix.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The oldest cached fix the provider may return. Zero means a fresh fix.
    #[must_use]
    pub const fn maximum_age(&self) -> Duration {
        self.maximum_age
    }

    /// [`timeout`](Self::timeout) in whole milliseconds, saturating at `u32::MAX`.
    #[must_use]
    pub fn timeout_millis(&self) -> u32 {
        saturating_millis(self.timeout)
    }

    /// [`maximum_age`](Self::maximum_age) in whole milliseconds, saturating at `u32::MAX`.
    #[must_use]
    pub fn maximum_age_millis(&self) -> u32 {
        saturating_millis(self.maximum_age)
    }

    #[cfg(test)]
    pub(crate) const fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::FRESH_HIGH_ACCURACY
        }
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self::FRESH_HIGH_ACCURACY
    }
}

fn saturating_millis(duration: Duration) -> u32 {
    u32::try_from(duration.as_millis()).unwrap_or(u32::MAX)
}

/// A host capability able to produce a single location fix.
///
/// Implementations start the lookup and report back through `callbacks`,
/// either from inside the call or later from any thread. Both callback
/// methods consume the handle, so a provider can answer at most once. A
/// provider that drops the handle without answering fails the request.
pub trait LocationProvider: Send + Sync + fmt::Debug {
    /// Start looking up the current position.
    fn get_current_position(&self, config: &RequestConfig, callbacks: PositionCallbacks);
}

/// The success and failure paths of one pending request.
#[must_use = "dropping the callbacks fails the request"]
pub struct PositionCallbacks {
    sender: oneshot::Sender<Outcome>,
}

impl PositionCallbacks {
    pub(crate) fn channel() -> (Self, oneshot::Receiver<Outcome>) {
        let (sender, receiver) = oneshot::channel();
        (Self { sender }, receiver)
    }

    /// Report a fix.
    pub fn succeed(self, position: Position) {
        info!(
            "location obtained: lat={}, lon={}, accuracy={}m",
            position.latitude, position.longitude, position.accuracy
        );
        self.deliver(Ok(position));
    }

    /// Report a failure.
    pub fn fail(self, error: LocationError) {
        error!("geolocation error: {error}");
        self.deliver(Err(error));
    }

    /// Report whichever outcome the provider ended up with.
    pub fn settle(self, outcome: Result<Position, LocationError>) {
        match outcome {
            Ok(position) => self.succeed(position),
            Err(error) => self.fail(error),
        }
    }

    /// Whether the request has already been settled or abandoned by its caller.
    ///
    /// Providers can check this to skip work nobody will receive.
    #[must_use]
    pub fn is_abandoned(&self) -> bool {
        self.sender.is_canceled()
    }

    fn deliver(self, outcome: Outcome) {
        if self.sender.send(outcome).is_err() {
            debug!("location request settled before the provider answered");
        }
    }
}

impl fmt::Debug for PositionCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PositionCallbacks")
            .field("abandoned", &self.is_abandoned())
            .finish()
    }
}
