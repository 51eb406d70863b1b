//! Request client orchestrator.
//!
//! `ApiClient` accepts submissions and decides, per request, between
//! immediate dispatch and parking the request in the offline queue. It also
//! drains that queue when connectivity returns and owns the shutdown sequence.
//!
//! # Delivery guarantee
//!
//! Every accepted submission produces exactly one handler invocation (success
//! or error) unless the client is destroyed while the request is queued or in
//! flight; in that case no handler runs.

use std::future::Future;
use std::pin::pin;
use std::sync::Arc;

use netrelay_common::{BackoffPolicy, Jitter};
use netrelay_core::{classify, ConnectivitySource, RawFailure, Transport};
use netrelay_domain::{
    ApiError, ClientConfig, ClientLifecycleState, ErrorKind, Headers, NetRelayError, Operation,
    Params, RequestId, Result, RetrySettings,
};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::{oneshot, Notify, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::dispatcher::{CallbackDispatcher, DeliveryOutcome};
use super::headers::build_common_headers;
use super::instance;
use super::lifecycle::Lifecycle;
use super::queue::PendingRequestQueue;
use super::request::PendingRequest;
use crate::network::{NetworkStateMonitor, SubscriptionHandle};
use crate::observability::metrics::{ClientMetrics, MetricsSnapshot};

/// Process-wide request client. See the module docs for the delivery
/// guarantee.
pub struct ApiClient {
    ctx: Arc<DispatchContext>,
    subscription: Mutex<Option<SubscriptionHandle>>,
    replay_task: JoinHandle<()>,
}

/// State shared between the client handle and its background tasks.
struct DispatchContext {
    config: ClientConfig,
    headers: Headers,
    transport: Arc<dyn Transport>,
    monitor: NetworkStateMonitor,
    queue: PendingRequestQueue,
    lifecycle: Arc<Lifecycle>,
    dispatcher: CallbackDispatcher,
    permits: Arc<Semaphore>,
    backoff: BackoffPolicy,
    cancel: CancellationToken,
    metrics: ClientMetrics,
    runtime: Handle,
}

impl ApiClient {
    /// Return the process-wide instance, constructing it on first use or
    /// after the previous instance was destroyed. Arguments are ignored while
    /// an active instance exists.
    ///
    /// The instance is bound to the tokio runtime it was created on. If that
    /// runtime has shut down, the stale instance is destroyed and a new one is
    /// built on the caller's runtime.
    ///
    /// # Errors
    /// Construction errors from [`ApiClient::new`].
    pub fn get_instance(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        connectivity: Arc<dyn ConnectivitySource>,
    ) -> Result<Arc<Self>> {
        instance::global().get_or_init(config, transport, connectivity)
    }

    /// Construct a standalone client.
    ///
    /// Must be called from within a tokio runtime; dispatch and replay tasks
    /// are spawned onto it.
    ///
    /// # Errors
    /// - `NetRelayError::Config` if the configuration does not validate
    /// - `NetRelayError::Runtime` outside a tokio runtime or if the callback
    ///   thread cannot be spawned
    pub fn new(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        connectivity: Arc<dyn ConnectivitySource>,
    ) -> Result<Arc<Self>> {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|err| {
            NetRelayError::Runtime(format!("ApiClient requires a tokio runtime: {err}"))
        })?;

        let lifecycle = Arc::new(Lifecycle::new());
        let dispatcher = CallbackDispatcher::new(config.delivery, Arc::clone(&lifecycle))?;
        let monitor = NetworkStateMonitor::start(connectivity, config.network_debounce)?;

        let ctx = Arc::new(DispatchContext {
            headers: build_common_headers(&config),
            backoff: backoff_policy(&config.retry),
            permits: Arc::new(Semaphore::new(config.worker_pool_size)),
            transport,
            monitor,
            queue: PendingRequestQueue::new(),
            lifecycle,
            dispatcher,
            cancel: CancellationToken::new(),
            metrics: ClientMetrics::new(),
            runtime,
            config,
        });

        // The listener only wakes the replay task; it never touches the
        // transport from the monitor's task.
        let wake = Arc::new(Notify::new());
        let waker = Arc::clone(&wake);
        let subscription = ctx.monitor.subscribe(move |state| {
            if state.available {
                waker.notify_one();
            }
        });
        let replay_task = ctx.runtime.spawn(replay_loop(Arc::clone(&ctx), wake));

        info!(
            client_id = %ctx.config.client_id,
            delivery = ?ctx.config.delivery,
            workers = ctx.config.worker_pool_size,
            online = ctx.monitor.is_available(),
            "api client created"
        );

        Ok(Arc::new(Self { ctx, subscription: Mutex::new(Some(subscription)), replay_task }))
    }

    /// Submit a request.
    ///
    /// Never blocks on I/O. When the client is no longer active, `on_error`
    /// runs synchronously with [`ErrorKind::ClientDestroyed`] and
    /// [`RequestId::SENTINEL`] is returned.
    #[instrument(skip(self, operation, params, on_success, on_error), fields(operation = %operation))]
    pub fn submit<S, E>(
        &self,
        operation: Operation,
        params: Params,
        on_success: S,
        on_error: E,
    ) -> RequestId
    where
        S: FnOnce(Value) + Send + 'static,
        E: FnOnce(ApiError) + Send + 'static,
    {
        let ctx = &self.ctx;
        let state = ctx.lifecycle.read();
        let current = *state;
        if !current.is_active() {
            drop(state);
            ctx.metrics.record_rejected();
            warn!(state = %current, "submit rejected: client destroyed");
            on_error(ApiError::client_destroyed());
            return RequestId::SENTINEL;
        }

        let request = PendingRequest::new(operation, params, on_success, on_error);
        let request_id = request.id;
        ctx.metrics.record_submitted();

        match ctx.queue.enqueue_if(request, || !ctx.monitor.is_available()) {
            Ok(queued) => {
                ctx.metrics.record_queued();
                debug!(%request_id, queued, "network unavailable; request queued");
            }
            Err(request) => {
                debug!(%request_id, "dispatching request");
                Arc::clone(ctx).spawn_dispatch(request, None);
            }
        }

        drop(state);
        request_id
    }

    /// Shut the client down. Idempotent.
    ///
    /// Queued requests are dropped without callbacks, in-flight attempts and
    /// backoff sleeps are cancelled, and results produced from here on are
    /// discarded.
    #[instrument(skip(self))]
    pub fn destroy(&self) {
        let ctx = &self.ctx;
        if !ctx.lifecycle.transition(ClientLifecycleState::Active, ClientLifecycleState::Destroying)
        {
            debug!(state = %ctx.lifecycle.current(), "destroy ignored: client not active");
            return;
        }
        info!("destroying api client");

        if let Some(handle) = self.subscription.lock().take() {
            ctx.monitor.unsubscribe(handle);
        }
        ctx.monitor.stop();
        ctx.cancel.cancel();

        let queued = ctx.queue.clear();
        let discarded = queued.iter().filter(|request| ctx.dispatcher.discard(request)).count();
        ctx.metrics.record_discarded(discarded as u64);
        ctx.dispatcher.close();

        ctx.lifecycle.transition(ClientLifecycleState::Destroying, ClientLifecycleState::Destroyed);
        info!(discarded, "api client destroyed");
    }

    /// Standard headers for this client's configuration.
    pub fn build_common_headers(&self) -> Headers {
        build_common_headers(&self.ctx.config)
    }

    /// Current lifecycle state.
    pub fn lifecycle_state(&self) -> ClientLifecycleState {
        self.ctx.lifecycle.current()
    }

    /// `true` until `destroy` starts.
    pub fn is_active(&self) -> bool {
        self.lifecycle_state().is_active()
    }

    /// Active and still driven by a live runtime. A client whose runtime
    /// shut down accepts submissions it can never dispatch.
    pub fn is_serviceable(&self) -> bool {
        self.is_active() && !self.replay_task.is_finished()
    }

    /// Number of requests waiting for connectivity.
    pub fn queued_requests(&self) -> usize {
        self.ctx.queue.size()
    }

    /// Last settled connectivity reading.
    pub fn is_network_available(&self) -> bool {
        self.ctx.monitor.is_available()
    }

    /// Point-in-time copy of the client counters.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.ctx.metrics.snapshot()
    }

    /// Configuration the client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.ctx.config
    }
}

impl Drop for ApiClient {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("state", &self.lifecycle_state())
            .field("queued", &self.queued_requests())
            .field("online", &self.is_network_available())
            .finish()
    }
}

fn backoff_policy(retry: &RetrySettings) -> BackoffPolicy {
    let policy = BackoffPolicy::exponential(retry.initial_backoff, retry.multiplier, retry.max_backoff);
    if retry.jitter {
        policy.with_jitter(Jitter::Equal)
    } else {
        policy
    }
}

async fn replay_loop(ctx: Arc<DispatchContext>, wake: Arc<Notify>) {
    loop {
        tokio::select! {
            _ = ctx.cancel.cancelled() => break,
            _ = wake.notified() => Arc::clone(&ctx).replay_pending().await,
        }
    }
    debug!("replay task stopped");
}

impl DispatchContext {
    fn spawn_dispatch(self: Arc<Self>, request: PendingRequest, started: Option<oneshot::Sender<()>>) {
        let runtime = self.runtime.clone();
        runtime.spawn(self.run(request, started));
    }

    /// Dispatch everything queued so far, oldest first. Each request's first
    /// transport call is issued before the next request is started.
    #[instrument(skip(self), fields(generation = tracing::field::Empty))]
    async fn replay_pending(self: Arc<Self>) {
        // A wake stored while a previous drain ran may be consumed after the
        // network dropped again; those entries wait for the next restore.
        if !self.monitor.is_available() {
            debug!(queued = self.queue.size(), "replay skipped: network unavailable");
            return;
        }
        let batch = self.queue.drain_in_order();
        if batch.is_empty() {
            return;
        }
        tracing::Span::current().record("generation", self.queue.generation());
        info!(count = batch.len(), "network restored; replaying queued requests");

        for request in batch {
            if self.cancel.is_cancelled() {
                // Remaining entries drop here without callbacks.
                break;
            }
            if self.is_stale(&request) {
                self.expire(request);
                continue;
            }

            self.metrics.record_replayed();
            let (started_tx, started_rx) = oneshot::channel();
            Arc::clone(&self).spawn_dispatch(request, Some(started_tx));
            // Resolves on first transport poll, or when the dispatch ends
            // without reaching the transport.
            let _ = started_rx.await;
        }
    }

    fn is_stale(&self, request: &PendingRequest) -> bool {
        let Some(limit) = self.config.stale_after else {
            return false;
        };
        request.age().to_std().map(|age| age > limit).unwrap_or(false)
    }

    fn expire(&self, request: PendingRequest) {
        let age_ms = request.age().num_milliseconds();
        warn!(request_id = %request.id, operation = %request.operation, age_ms, "queued request expired");
        self.metrics.record_expired();
        let error = ApiError::new(
            ErrorKind::Timeout,
            format!("expired after {age_ms}ms in offline queue"),
        );
        self.finish_error(&request, error);
    }

    /// Run attempts until a terminal outcome or cancellation. Dropping the
    /// request on cancellation discards its handlers silently.
    async fn run(self: Arc<Self>, mut request: PendingRequest, mut started: Option<oneshot::Sender<()>>) {
        let max_retries = self.config.retry.max_retries;
        let deadline = self.config.request_timeout;

        loop {
            let permit = tokio::select! {
                _ = self.cancel.cancelled() => return,
                permit = Arc::clone(&self.permits).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => return,
                },
            };

            request.attempt += 1;
            self.metrics.record_dispatched();
            debug!(
                request_id = %request.id,
                operation = %request.operation,
                attempt = request.attempt,
                "dispatch attempt"
            );

            let call = tokio::time::timeout(
                deadline,
                self.transport.perform_request(&request.operation, &request.params, &self.headers, deadline),
            );
            let outcome = tokio::select! {
                _ = self.cancel.cancelled() => return,
                outcome = signal_on_first_poll(call, started.take()) => outcome,
            };
            drop(permit);

            let failure = match outcome {
                Ok(Ok(value)) => {
                    self.finish_success(&request, value);
                    return;
                }
                Ok(Err(failure)) => failure,
                Err(_elapsed) => RawFailure::DeadlineExceeded(deadline),
            };

            let classification = classify(&failure);
            let retries_used = request.attempt - 1;
            if classification.retryable && retries_used < max_retries {
                let delay = self.backoff.delay_for(retries_used);
                self.metrics.record_retried();
                debug!(
                    request_id = %request.id,
                    kind = classification.kind.label(),
                    attempt = request.attempt,
                    delay_ms = delay.as_millis() as u64,
                    "retryable failure; backing off"
                );
                tokio::select! {
                    _ = self.cancel.cancelled() => return,
                    _ = tokio::time::sleep(delay) => {}
                }
                continue;
            }

            if classification.retryable {
                warn!(
                    request_id = %request.id,
                    kind = classification.kind.label(),
                    attempts = request.attempt,
                    "retry budget exhausted"
                );
            } else {
                debug!(request_id = %request.id, kind = classification.kind.label(), "terminal failure");
            }
            self.finish_error(&request, classification.into_api_error());
            return;
        }
    }

    fn finish_success(&self, request: &PendingRequest, value: Value) {
        self.metrics.record_succeeded();
        let outcome = self.dispatcher.deliver_success(request, value);
        self.note_delivery(request, outcome);
    }

    fn finish_error(&self, request: &PendingRequest, error: ApiError) {
        self.metrics.record_failed();
        let outcome = self.dispatcher.deliver_error(request, error);
        self.note_delivery(request, outcome);
    }

    fn note_delivery(&self, request: &PendingRequest, outcome: DeliveryOutcome) {
        if outcome == DeliveryOutcome::Discarded {
            self.metrics.record_discarded(1);
        }
        debug!(request_id = %request.id, ?outcome, "result routed");
    }
}

/// Poll `fut` to completion, firing `started` right after the first poll.
async fn signal_on_first_poll<F: Future>(fut: F, started: Option<oneshot::Sender<()>>) -> F::Output {
    let mut fut = pin!(fut);
    let mut started = started;
    std::future::poll_fn(move |cx| {
        let poll = fut.as_mut().poll(cx);
        if let Some(tx) = started.take() {
            let _ = tx.send(());
        }
        poll
    })
    .await
}
