//! Integration tests for client identity, retries and shutdown.

mod support;

use std::sync::Arc;
use std::time::Duration;

use netrelay_common::{assert_eventually_async, assert_never_async};
use netrelay_core::RawFailure;
use netrelay_domain::{
    ClientLifecycleState, DeliveryMode, ErrorKind, Operation, Params, RequestId, RetrySettings,
};
use netrelay_infra::{build_common_headers, ApiClient, ClientSlot, ManualConnectivity};
use serde_json::json;
use support::{start_client, submit, test_config, Event, Recorder, ScriptedTransport, Step};

const WAIT: Duration = Duration::from_secs(2);

fn status(code: u16) -> Step {
    Step::Fail(RawFailure::Status { code, body: String::new() })
}

#[tokio::test]
async fn slot_returns_same_instance_until_destroyed() {
    let slot = ClientSlot::new();
    let transport = ScriptedTransport::new();
    let connectivity = Arc::new(ManualConnectivity::new(false));

    let first = slot.get_or_init(test_config(), transport.clone(), connectivity.clone()).unwrap();
    let other_config = netrelay_domain::ClientConfig { worker_pool_size: 1, ..test_config() };
    let second = slot.get_or_init(other_config, transport.clone(), connectivity.clone()).unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(second.config().worker_pool_size, 4);

    let recorder = Recorder::new();
    submit(&first, &recorder, "/queued");
    assert_eq!(first.queued_requests(), 1);

    assert!(slot.destroy());
    assert!(slot.current().is_none());
    assert_eq!(first.lifecycle_state(), ClientLifecycleState::Destroyed);

    let fresh = slot.get_or_init(test_config(), transport, connectivity).unwrap();
    assert!(!Arc::ptr_eq(&first, &fresh));
    assert!(fresh.is_active());
    assert_eq!(fresh.queued_requests(), 0);
    assert_eq!(recorder.count(), 0);
}

#[tokio::test]
async fn slot_replaces_client_destroyed_directly() {
    let slot = ClientSlot::new();
    let transport = ScriptedTransport::new();
    let connectivity = Arc::new(ManualConnectivity::new(true));

    let first = slot.get_or_init(test_config(), transport.clone(), connectivity.clone()).unwrap();
    first.destroy();

    let second = slot.get_or_init(test_config(), transport, connectivity).unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    assert!(second.is_active());
}

#[tokio::test]
async fn global_instance_is_shared() {
    let transport = ScriptedTransport::new();
    let connectivity = Arc::new(ManualConnectivity::new(true));

    let a = ApiClient::get_instance(test_config(), transport.clone(), connectivity.clone()).unwrap();
    let b = ApiClient::get_instance(test_config(), transport, connectivity).unwrap();
    assert!(Arc::ptr_eq(&a, &b));
}

#[tokio::test]
async fn submit_after_destroy_fails_synchronously() {
    let transport = ScriptedTransport::new();
    let (client, _net) = start_client(test_config(), transport.clone(), true);
    client.destroy();

    let recorder = Recorder::new();
    let id = submit(&client, &recorder, "/late");

    assert_eq!(id, RequestId::SENTINEL);
    let errors = recorder.errors();
    assert_eq!(errors.len(), 1, "error callback must run before submit returns");
    assert_eq!(errors[0].kind, ErrorKind::ClientDestroyed);
    assert_eq!(client.queued_requests(), 0);
    assert_eq!(client.metrics().rejected, 1);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test]
async fn retryable_failures_deliver_exactly_one_success() {
    let transport = ScriptedTransport::new();
    transport.script(
        "/flaky",
        [
            status(503),
            Step::Fail(RawFailure::ConnectionRefused("127.0.0.1:443".into())),
            Step::Fail(RawFailure::DeadlineExceeded(Duration::from_millis(10))),
            Step::Respond(json!({ "ok": true })),
        ],
    );
    let (client, _net) = start_client(test_config(), transport.clone(), true);

    let recorder = Recorder::new();
    submit(&client, &recorder, "/flaky");

    assert_eventually_async!(WAIT, async { recorder.count() == 1 });
    assert_never_async!(Duration::from_millis(100), async { recorder.count() > 1 });

    assert_eq!(recorder.events(), vec![Event::Success(json!({ "ok": true }))]);
    assert_eq!(transport.call_count(), 4);
    let metrics = client.metrics();
    assert_eq!(metrics.dispatched, 4);
    assert_eq!(metrics.retried, 3);
    assert_eq!(metrics.succeeded, 1);
}

#[tokio::test]
async fn validation_error_is_not_retried() {
    let transport = ScriptedTransport::new();
    transport.script(
        "/login",
        [Step::Fail(RawFailure::Status { code: 422, body: "{\"error\":\"bad password\"}".into() })],
    );
    let (client, _net) = start_client(test_config(), transport.clone(), true);

    let recorder = Recorder::new();
    submit(&client, &recorder, "/login");

    assert_eventually_async!(WAIT, async { recorder.count() == 1 });
    tokio::time::sleep(Duration::from_millis(50)).await;

    let errors = recorder.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, ErrorKind::ValidationError);
    assert!(errors[0].message.contains("bad password"));
    assert_eq!(transport.call_count(), 1);
}

#[tokio::test]
async fn retry_budget_bounds_attempts() {
    let transport = ScriptedTransport::new();
    transport.fallback(status(500));
    let config = netrelay_domain::ClientConfig {
        retry: RetrySettings { max_retries: 2, ..test_config().retry },
        ..test_config()
    };
    let (client, _net) = start_client(config, transport.clone(), true);

    let recorder = Recorder::new();
    submit(&client, &recorder, "/down");

    assert_eventually_async!(WAIT, async { recorder.count() == 1 });
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(transport.call_count(), 3);
    assert_eq!(recorder.errors()[0].kind, ErrorKind::ServerError(500));
    assert_eq!(client.metrics().failed, 1);
}

#[tokio::test]
async fn attempt_deadline_yields_timeout() {
    let transport = ScriptedTransport::new();
    transport.fallback(Step::Hang);
    let config = netrelay_domain::ClientConfig {
        request_timeout: Duration::from_millis(30),
        retry: RetrySettings { max_retries: 1, ..test_config().retry },
        ..test_config()
    };
    let (client, _net) = start_client(config, transport.clone(), true);

    let recorder = Recorder::new();
    submit(&client, &recorder, "/slow");

    assert_eventually_async!(WAIT, async { recorder.count() == 1 });
    assert_eq!(recorder.errors()[0].kind, ErrorKind::Timeout);
    assert_eq!(transport.call_count(), 2);
}

#[tokio::test]
async fn transport_receives_common_headers_and_params() {
    let transport = ScriptedTransport::new();
    let config = test_config();
    let expected = build_common_headers(&config);
    let (client, _net) = start_client(config, transport.clone(), true);

    assert_eq!(client.build_common_headers(), expected);
    assert_eq!(client.build_common_headers(), client.build_common_headers());

    let mut params = Params::new();
    params.insert("email".into(), json!("user@example.test"));
    let recorder = Recorder::new();
    client.submit(
        Operation::post("/users/login"),
        params.clone(),
        recorder.on_success(),
        recorder.on_error(),
    );

    assert_eventually_async!(WAIT, async { recorder.count() == 1 });
    let calls = transport.calls();
    assert_eq!(calls[0].headers, expected);
    assert_eq!(calls[0].params, params);
    assert_eq!(calls[0].headers["User-Agent"], "netrelay-tests/1.0");
}

#[tokio::test]
async fn dedicated_delivery_runs_on_callback_thread() {
    let transport = ScriptedTransport::new();
    let config =
        netrelay_domain::ClientConfig { delivery: DeliveryMode::DedicatedCallbackContext, ..test_config() };
    let (client, _net) = start_client(config, transport, true);

    let recorder = Recorder::new();
    submit(&client, &recorder, "/a");
    submit(&client, &recorder, "/b");

    assert_eventually_async!(WAIT, async { recorder.count() == 2 });
    for thread in recorder.threads() {
        assert_eq!(thread.as_deref(), Some(netrelay_infra::api::CALLBACK_THREAD_NAME));
    }
}

#[tokio::test]
async fn destroy_while_in_flight_drops_result() {
    let transport = ScriptedTransport::new();
    transport.fallback(Step::Hang);
    let (client, _net) = start_client(test_config(), transport.clone(), true);

    let recorder = Recorder::new();
    submit(&client, &recorder, "/pending");
    assert_eventually_async!(WAIT, async { transport.call_count() == 1 });

    client.destroy();
    assert_never_async!(Duration::from_millis(100), async { recorder.count() > 0 });
    assert_eq!(client.lifecycle_state(), ClientLifecycleState::Destroyed);
}

#[tokio::test]
async fn destroy_aborts_pending_backoff() {
    let transport = ScriptedTransport::new();
    transport.fallback(status(503));
    let config = netrelay_domain::ClientConfig {
        retry: RetrySettings {
            initial_backoff: Duration::from_secs(10),
            max_backoff: Duration::from_secs(10),
            ..test_config().retry
        },
        ..test_config()
    };
    let (client, _net) = start_client(config, transport.clone(), true);

    let recorder = Recorder::new();
    submit(&client, &recorder, "/backoff");
    assert_eventually_async!(WAIT, async { transport.call_count() == 1 });

    client.destroy();
    assert_never_async!(Duration::from_millis(100), async { recorder.count() > 0 });
    assert_eq!(transport.call_count(), 1);
}

#[tokio::test]
async fn handler_may_submit_follow_up_request() {
    let transport = ScriptedTransport::new();
    let (client, _net) = start_client(test_config(), transport.clone(), true);

    let recorder = Recorder::new();
    let follow_up = recorder.clone();
    let inner = Arc::clone(&client);
    client.submit(
        Operation::get("/first"),
        Params::new(),
        move |_| {
            inner.submit(
                Operation::get("/second"),
                Params::new(),
                follow_up.on_success(),
                follow_up.on_error(),
            );
        },
        |err| panic!("unexpected error: {err}"),
    );

    assert_eventually_async!(WAIT, async { recorder.count() == 1 });
    assert_eq!(transport.paths(), vec!["/first".to_string(), "/second".to_string()]);
}

#[test]
fn slot_replaces_client_whose_runtime_stopped() {
    let slot = ClientSlot::new();
    let transport = ScriptedTransport::new();
    let connectivity = Arc::new(ManualConnectivity::new(true));
    let runtime = || tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();

    let first_runtime = runtime();
    let first = first_runtime.block_on(async {
        slot.get_or_init(test_config(), transport.clone(), connectivity.clone()).unwrap()
    });
    assert!(first.is_serviceable());
    drop(first_runtime);
    assert!(!first.is_serviceable());

    runtime().block_on(async {
        let second = slot.get_or_init(test_config(), transport.clone(), connectivity).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(second.is_serviceable());
        assert_eq!(first.lifecycle_state(), ClientLifecycleState::Destroyed);

        let recorder = Recorder::new();
        submit(&second, &recorder, "/after-restart");
        assert_eventually_async!(WAIT, async { recorder.count() == 1 });
    });
}
