#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use geofix_location::{LocationError, LocationProvider, Position, PositionCallbacks, RequestConfig};

/// What a [`MockProvider`] does with each request.
#[derive(Debug, Clone)]
pub enum Script {
    /// Answer with the fix before returning.
    Succeed(Position),
    /// Answer with the error before returning.
    Fail(LocationError),
    /// Answer with a timeout once the configured deadline has passed.
    TimeOut,
    /// Answer with the outcome after a delay, from a tokio task.
    Later(Duration, Result<Position, LocationError>),
    /// Throw the callbacks away.
    Drop,
}

/// A scripted provider that records the configuration of every call.
#[derive(Debug)]
pub struct MockProvider {
    script: Script,
    configs: Mutex<Vec<RequestConfig>>,
}

impl MockProvider {
    pub fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            configs: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.configs.lock().expect("config mutex poisoned").len()
    }

    pub fn configs(&self) -> Vec<RequestConfig> {
        self.configs.lock().expect("config mutex poisoned").clone()
    }
}

impl LocationProvider for MockProvider {
    fn get_current_position(&self, config: &RequestConfig, callbacks: PositionCallbacks) {
        self.configs
            .lock()
            .expect("config mutex poisoned")
            .push(*config);

        match self.script.clone() {
            Script::Succeed(position) => callbacks.succeed(position),
            Script::Fail(error) => callbacks.fail(error),
            Script::TimeOut => {
                let timeout = config.timeout();
                tokio::spawn(async move {
                    tokio::time::sleep(timeout).await;
                    callbacks.fail(LocationError::from_provider("TIMEOUT", "Timeout expired"));
                });
            }
            Script::Later(delay, outcome) => {
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    callbacks.settle(outcome);
                });
            }
            Script::Drop => drop(callbacks),
        }
    }
}

pub fn san_francisco(timestamp: u64) -> Position {
    Position {
        latitude: 37.7749,
        longitude: -122.4194,
        accuracy: 5.0,
        altitude: None,
        altitude_accuracy: None,
        heading: None,
        speed: None,
        timestamp,
    }
}
