use std::future::Future;
use std::mem;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::channel::oneshot;
use futures::future::FusedFuture;
use futures_timer::Delay;
use log::{error, warn};

use crate::provider::Outcome;
use crate::{LocationError, LocationProvider, Position, PositionCallbacks, RequestConfig, sys};

/// Extra time a provider gets past its own deadline before the request gives up on it.
const DEADLINE_GRACE: Duration = Duration::from_secs(1);

/// Where a [`LocationRequest`] is in its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestState {
    /// The provider has been asked and has not been heard from yet.
    AwaitingFix,
    /// The request produced a fix.
    Resolved,
    /// The request failed.
    Rejected,
}

/// Entry point for one-shot location requests.
///
/// A requester owns nothing but an optional provider. Requests made through
/// it are independent of each other and may run concurrently.
#[derive(Debug, Clone)]
pub struct LocationRequester {
    provider: Option<Arc<dyn LocationProvider>>,
}

impl LocationRequester {
    /// A requester backed by `provider`.
    pub fn new(provider: impl LocationProvider + 'static) -> Self {
        Self::from_shared(Arc::new(provider))
    }

    /// A requester backed by an already shared provider.
    #[must_use]
    pub fn from_shared(provider: Arc<dyn LocationProvider>) -> Self {
        Self {
            provider: Some(provider),
        }
    }

    /// A requester for a host without any location capability.
    #[must_use]
    pub const fn unavailable() -> Self {
        Self { provider: None }
    }

    /// A requester backed by the build target's location capability, if any.
    #[must_use]
    pub fn system() -> Self {
        Self {
            provider: sys::default_provider(),
        }
    }

    /// Whether a location capability is present.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.provider.is_some()
    }

    /// Ask for the current position.
    ///
    /// The provider is contacted before this returns, with
    /// [`RequestConfig::FRESH_HIGH_ACCURACY`]. Without a provider the request
    /// is rejected on the spot with [`CapabilityUnavailable`].
    ///
    /// [`CapabilityUnavailable`]: crate::LocationErrorKind::CapabilityUnavailable
    ///
    /// Dropping the returned future does not stop the provider.
    pub fn request_location(&self) -> LocationRequest {
        self.request_with(RequestConfig::FRESH_HIGH_ACCURACY)
    }

    pub(crate) fn request_with(&self, config: RequestConfig) -> LocationRequest {
        let Some(provider) = &self.provider else {
            let error = LocationError::unsupported();
            error!("geolocation error: {error}");
            return LocationRequest::rejected(error);
        };

        let (callbacks, receiver) = PositionCallbacks::channel();
        provider.get_current_position(&config, callbacks);

        LocationRequest {
            state: RequestState::AwaitingFix,
            pending: Pending::AwaitingFix {
                receiver,
                deadline: Delay::new(config.timeout() + DEADLINE_GRACE),
                timeout: config.timeout(),
            },
        }
    }
}

impl Default for LocationRequester {
    fn default() -> Self {
        Self::system()
    }
}

/// A pending location request.
///
/// Resolves to the provider's fix or rejects with a [`LocationError`],
/// exactly once.
#[must_use = "futures do nothing unless you `.await` or poll them"]
#[derive(Debug)]
pub struct LocationRequest {
    state: RequestState,
    pending: Pending,
}

#[derive(Debug)]
enum Pending {
    Ready(Outcome),
    AwaitingFix {
        receiver: oneshot::Receiver<Outcome>,
        deadline: Delay,
        timeout: Duration,
    },
    Settled,
}

impl LocationRequest {
    fn rejected(error: LocationError) -> Self {
        Self {
            state: RequestState::Rejected,
            pending: Pending::Ready(Err(error)),
        }
    }

    /// The current state of the request.
    ///
    /// A fix the provider delivered is only accounted for once the request
    /// has been polled.
    #[must_use]
    pub const fn state(&self) -> RequestState {
        self.state
    }
}

impl Future for LocationRequest {
    type Output = Result<Position, LocationError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;
        let outcome = match mem::replace(&mut this.pending, Pending::Settled) {
            Pending::Ready(outcome) => outcome,
            Pending::AwaitingFix {
                mut receiver,
                mut deadline,
                timeout,
            } => match Pin::new(&mut receiver).poll(cx) {
                Poll::Ready(Ok(outcome)) => outcome,
                Poll::Ready(Err(oneshot::Canceled)) => {
                    warn!("location provider dropped the request without answering");
                    Err(LocationError::position_unavailable(
                        "location provider dropped the request without answering",
                    ))
                }
                Poll::Pending => {
                    if Pin::new(&mut deadline).poll(cx).is_pending() {
                        this.pending = Pending::AwaitingFix {
                            receiver,
                            deadline,
                            timeout,
                        };
                        return Poll::Pending;
                    }
                    warn!("location provider did not answer within {timeout:?}");
                    Err(LocationError::timeout(format!(
                        "no position within {} ms",
                        timeout.as_millis()
                    )))
                }
            },
            Pending::Settled => panic!("`LocationRequest` polled after completion"),
        };

        this.state = if outcome.is_ok() {
            RequestState::Resolved
        } else {
            RequestState::Rejected
        };
        Poll::Ready(outcome)
    }
}

impl FusedFuture for LocationRequest {
    fn is_terminated(&self) -> bool {
        matches!(self.pending, Pending::Settled)
    }
}
