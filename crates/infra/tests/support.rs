//! Shared fixtures for client integration tests.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use netrelay_core::{RawFailure, Transport, TransportOutcome};
use netrelay_domain::{
    ApiError, ClientConfig, DeliveryMode, Headers, Operation, Params, RetrySettings,
};
use netrelay_infra::{ApiClient, ManualConnectivity};
use parking_lot::Mutex;
use serde_json::{json, Value};

/// One scripted transport response.
#[derive(Debug, Clone)]
pub enum Step {
    Respond(Value),
    Fail(RawFailure),
    /// Never completes; the attempt ends by deadline or cancellation.
    Hang,
}

/// A call observed by [`ScriptedTransport`].
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub operation: Operation,
    pub params: Params,
    pub headers: Headers,
    pub thread: Option<String>,
}

/// Transport that replays scripted outcomes per path and records every call.
///
/// Paths without a script (or whose script ran out) repeat `fallback`, which
/// defaults to echoing `{"path": <path>}`.
#[derive(Default)]
pub struct ScriptedTransport {
    scripts: Mutex<HashMap<String, VecDeque<Step>>>,
    fallback: Mutex<Option<Step>>,
    calls: Mutex<Vec<RecordedCall>>,
    latency: Mutex<Duration>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script(&self, path: &str, steps: impl IntoIterator<Item = Step>) {
        self.scripts.lock().entry(path.to_string()).or_default().extend(steps);
    }

    /// Outcome for calls that have no scripted step left.
    pub fn fallback(&self, step: Step) {
        *self.fallback.lock() = Some(step);
    }

    /// Delay added to every call after it is recorded.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = latency;
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn paths(&self) -> Vec<String> {
        self.calls.lock().iter().map(|c| c.operation.path.clone()).collect()
    }

    fn next_step(&self, path: &str) -> Step {
        if let Some(step) = self.scripts.lock().get_mut(path).and_then(VecDeque::pop_front) {
            return step;
        }
        self.fallback.lock().clone().unwrap_or_else(|| Step::Respond(json!({ "path": path })))
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn perform_request(
        &self,
        operation: &Operation,
        params: &Params,
        headers: &Headers,
        _deadline: Duration,
    ) -> TransportOutcome {
        self.calls.lock().push(RecordedCall {
            operation: operation.clone(),
            params: params.clone(),
            headers: headers.clone(),
            thread: std::thread::current().name().map(str::to_owned),
        });
        let step = self.next_step(&operation.path);
        let latency = *self.latency.lock();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        match step {
            Step::Respond(value) => Ok(value),
            Step::Fail(failure) => Err(failure),
            Step::Hang => std::future::pending().await,
        }
    }
}

/// Terminal outcome seen by a [`Recorder`].
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Success(Value),
    Error(ApiError),
}

/// Collects handler invocations, along with the thread each one ran on.
#[derive(Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<(Event, Option<String>)>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_success(&self) -> impl FnOnce(Value) + Send + 'static {
        let events = Arc::clone(&self.events);
        move |value| events.lock().push((Event::Success(value), thread_name()))
    }

    pub fn on_error(&self) -> impl FnOnce(ApiError) + Send + 'static {
        let events = Arc::clone(&self.events);
        move |error| events.lock().push((Event::Error(error), thread_name()))
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().iter().map(|(event, _)| event.clone()).collect()
    }

    pub fn threads(&self) -> Vec<Option<String>> {
        self.events.lock().iter().map(|(_, thread)| thread.clone()).collect()
    }

    pub fn count(&self) -> usize {
        self.events.lock().len()
    }

    pub fn errors(&self) -> Vec<ApiError> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Error(error) => Some(error),
                Event::Success(_) => None,
            })
            .collect()
    }

    pub fn successes(&self) -> Vec<Value> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Success(value) => Some(value),
                Event::Error(_) => None,
            })
            .collect()
    }
}

fn thread_name() -> Option<String> {
    std::thread::current().name().map(str::to_owned)
}

/// Fast configuration: inline delivery, no debounce, millisecond backoff.
pub fn test_config() -> ClientConfig {
    ClientConfig {
        base_url: "http://netrelay.test".into(),
        client_id: "netrelay-tests/1.0".into(),
        request_timeout: Duration::from_secs(2),
        retry: RetrySettings {
            max_retries: 3,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(5),
            multiplier: 2.0,
            jitter: false,
        },
        delivery: DeliveryMode::SameThread,
        worker_pool_size: 4,
        network_debounce: Duration::ZERO,
        stale_after: None,
    }
}

/// Client plus the connectivity switch driving it.
pub fn start_client(
    config: ClientConfig,
    transport: Arc<ScriptedTransport>,
    online: bool,
) -> (Arc<ApiClient>, Arc<ManualConnectivity>) {
    let connectivity = Arc::new(ManualConnectivity::new(online));
    let client = ApiClient::new(config, transport, connectivity.clone()).expect("client should start");
    (client, connectivity)
}

pub fn submit(client: &ApiClient, recorder: &Recorder, path: &str) -> netrelay_domain::RequestId {
    client.submit(Operation::get(path), Params::new(), recorder.on_success(), recorder.on_error())
}
