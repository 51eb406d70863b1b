//! Integration tests for offline queueing and reconnect replay.

mod support;

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use netrelay_common::testing::timeout_ok;
use netrelay_common::{assert_eventually_async, assert_never_async};
use netrelay_domain::{ClientConfig, ErrorKind, Operation, Params};
use netrelay_infra::{ApiClient, ProbeConnectivity};
use serde_json::json;
use support::{start_client, submit, test_config, Event, Recorder, ScriptedTransport};
use tokio::net::TcpListener;

const WAIT: Duration = Duration::from_secs(2);

#[tokio::test]
async fn offline_submission_is_queued_without_callback() {
    let transport = ScriptedTransport::new();
    let (client, _net) = start_client(test_config(), transport.clone(), false);
    assert!(!client.is_network_available());

    let recorder = Recorder::new();
    let before = client.queued_requests();
    let id = submit(&client, &recorder, "/places");

    assert!(!id.is_sentinel());
    assert_eq!(client.queued_requests(), before + 1);
    assert_never_async!(Duration::from_millis(200), async { recorder.count() > 0 });
    assert_eq!(transport.call_count(), 0);
    assert_eq!(client.metrics().queued, 1);
}

#[tokio::test]
async fn reconnect_replays_in_submission_order() {
    let transport = ScriptedTransport::new();
    // Slow calls so later requests would overtake earlier ones if replay
    // did not wait for each dispatch to start.
    transport.set_latency(Duration::from_millis(20));
    let (client, net) = start_client(test_config(), transport.clone(), false);

    let recorder = Recorder::new();
    for path in ["/a", "/b", "/c"] {
        submit(&client, &recorder, path);
    }
    assert_eq!(client.queued_requests(), 3);

    net.set_connected(true);

    assert_eventually_async!(WAIT, async { recorder.count() == 3 });
    assert_eq!(transport.paths(), vec!["/a", "/b", "/c"]);
    assert_eq!(client.queued_requests(), 0);
    assert_eq!(client.metrics().replayed, 3);
}

#[tokio::test]
async fn replay_order_holds_with_single_worker() {
    let transport = ScriptedTransport::new();
    let config = ClientConfig { worker_pool_size: 1, ..test_config() };
    let (client, net) = start_client(config, transport.clone(), false);

    let recorder = Recorder::new();
    let paths: Vec<String> = (0..10).map(|i| format!("/item/{i}")).collect();
    for path in &paths {
        submit(&client, &recorder, path);
    }

    net.set_connected(true);

    assert_eventually_async!(WAIT, async { recorder.count() == paths.len() });
    assert_eq!(transport.paths(), paths);
}

#[tokio::test]
async fn submissions_after_reconnect_dispatch_immediately() {
    let transport = ScriptedTransport::new();
    let (client, net) = start_client(test_config(), transport.clone(), false);

    net.set_connected(true);
    assert_eventually_async!(WAIT, async { client.is_network_available() });

    let recorder = Recorder::new();
    submit(&client, &recorder, "/now");

    assert_eventually_async!(WAIT, async { recorder.count() == 1 });
    assert_eq!(client.metrics().queued, 0);
    assert_eq!(recorder.events(), vec![Event::Success(json!({ "path": "/now" }))]);
}

#[tokio::test]
async fn going_offline_again_queues_new_requests() {
    let transport = ScriptedTransport::new();
    let (client, net) = start_client(test_config(), transport.clone(), true);

    net.set_connected(false);
    assert_eventually_async!(WAIT, async { !client.is_network_available() });

    let recorder = Recorder::new();
    submit(&client, &recorder, "/later");
    assert_eq!(client.queued_requests(), 1);

    net.set_connected(true);
    assert_eventually_async!(WAIT, async { recorder.count() == 1 });
    assert_eq!(transport.paths(), vec!["/later"]);
}

#[tokio::test]
async fn destroy_discards_queue_silently() {
    let transport = ScriptedTransport::new();
    let (client, net) = start_client(test_config(), transport.clone(), false);

    let recorder = Recorder::new();
    for path in ["/a", "/b", "/c"] {
        submit(&client, &recorder, path);
    }

    client.destroy();
    assert_eq!(client.queued_requests(), 0);
    assert_eq!(client.metrics().discarded, 3);

    net.set_connected(true);
    assert_never_async!(Duration::from_millis(150), async { recorder.count() > 0 });
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test]
async fn stale_queued_requests_expire_on_replay() {
    let transport = ScriptedTransport::new();
    let config = ClientConfig { stale_after: Some(Duration::from_millis(50)), ..test_config() };
    let (client, net) = start_client(config, transport.clone(), false);

    let recorder = Recorder::new();
    submit(&client, &recorder, "/old");
    tokio::time::sleep(Duration::from_millis(120)).await;
    submit(&client, &recorder, "/fresh");

    net.set_connected(true);

    assert_eventually_async!(WAIT, async { recorder.count() == 2 });
    let errors = recorder.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, ErrorKind::Timeout);
    assert!(errors[0].message.contains("offline queue"));
    assert_eq!(transport.paths(), vec!["/fresh"]);
    assert_eq!(client.metrics().expired, 1);
}

#[tokio::test]
async fn short_flap_does_not_trigger_replay() {
    let transport = ScriptedTransport::new();
    let config = ClientConfig { network_debounce: Duration::from_millis(100), ..test_config() };
    let (client, net) = start_client(config, transport.clone(), false);

    let recorder = Recorder::new();
    submit(&client, &recorder, "/held");

    net.set_connected(true);
    net.set_connected(false);
    assert_never_async!(Duration::from_millis(300), async { recorder.count() > 0 });
    assert_eq!(client.queued_requests(), 1);
    assert_eq!(transport.call_count(), 0);

    net.set_connected(true);
    assert_eventually_async!(WAIT, async { recorder.count() == 1 });
    assert_eq!(transport.paths(), vec!["/held"]);
}

#[tokio::test]
async fn repeated_offline_signals_change_nothing() {
    let transport = ScriptedTransport::new();
    let (client, net) = start_client(test_config(), transport.clone(), false);

    let recorder = Recorder::new();
    submit(&client, &recorder, "/x");
    for _ in 0..5 {
        net.set_connected(false);
    }

    assert_never_async!(Duration::from_millis(100), async { recorder.count() > 0 });
    assert_eq!(client.queued_requests(), 1);
    assert!(!client.is_network_available());
}

#[tokio::test]
async fn requests_queued_after_a_flap_wait_for_next_restore() {
    let transport = ScriptedTransport::new();
    let (client, net) = start_client(test_config(), transport.clone(), false);

    let recorder = Recorder::new();
    submit(&client, &recorder, "/first");
    net.set_connected(true);
    assert_eventually_async!(WAIT, async { recorder.count() == 1 });

    net.set_connected(false);
    assert_eventually_async!(WAIT, async { !client.is_network_available() });
    submit(&client, &recorder, "/second");
    submit(&client, &recorder, "/third");

    assert_never_async!(Duration::from_millis(150), async { transport.call_count() > 1 });
    assert_eq!(client.queued_requests(), 2);

    net.set_connected(true);
    assert_eventually_async!(WAIT, async { recorder.count() == 3 });
    assert_eq!(transport.paths(), vec!["/first", "/second", "/third"]);
    assert_eq!(client.metrics().replayed, 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn submissions_racing_connectivity_changes_are_never_lost() {
    const SUBMITTERS: usize = 4;
    const PER_SUBMITTER: usize = 50;
    const TOTAL: usize = SUBMITTERS * PER_SUBMITTER;

    let transport = ScriptedTransport::new();
    let (client, net) = start_client(test_config(), transport.clone(), false);
    let deliveries: Arc<Vec<AtomicUsize>> = Arc::new((0..TOTAL).map(|_| AtomicUsize::new(0)).collect());

    let toggler = {
        let net = Arc::clone(&net);
        tokio::spawn(async move {
            for flip in 0..200 {
                net.set_connected(flip % 2 == 0);
                tokio::task::yield_now().await;
            }
        })
    };

    let submitters: Vec<_> = (0..SUBMITTERS)
        .map(|worker| {
            let client = Arc::clone(&client);
            let deliveries = Arc::clone(&deliveries);
            tokio::spawn(async move {
                let mut ids = Vec::with_capacity(PER_SUBMITTER);
                for n in 0..PER_SUBMITTER {
                    let slot = worker * PER_SUBMITTER + n;
                    let on_success = Arc::clone(&deliveries);
                    let on_error = Arc::clone(&deliveries);
                    ids.push(client.submit(
                        Operation::get(format!("/race/{slot}")),
                        Params::new(),
                        move |_| {
                            on_success[slot].fetch_add(1, Ordering::SeqCst);
                        },
                        move |_| {
                            on_error[slot].fetch_add(1, Ordering::SeqCst);
                        },
                    ));
                    tokio::task::yield_now().await;
                }
                ids
            })
        })
        .collect();

    let mut ids = HashSet::new();
    for submitter in submitters {
        for id in submitter.await.unwrap() {
            assert!(!id.is_sentinel());
            assert!(ids.insert(id), "duplicate request id {id}");
        }
    }
    toggler.await.unwrap();
    assert_eq!(ids.len(), TOTAL);

    net.set_connected(true);

    assert_eventually_async!(Duration::from_secs(5), async {
        deliveries.iter().all(|count| count.load(Ordering::SeqCst) == 1)
    });
    assert_never_async!(Duration::from_millis(100), async {
        deliveries.iter().any(|count| count.load(Ordering::SeqCst) > 1)
    });
    assert_eq!(client.queued_requests(), 0);
    assert_eq!(transport.call_count(), TOTAL);
}

async fn unused_local_addr() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    drop(listener);
    addr
}

async fn start_probe(target: &str) -> Arc<ProbeConnectivity> {
    ProbeConnectivity::start(target, Duration::from_millis(20), Duration::from_millis(200)).await
}

#[tokio::test]
async fn client_owned_probe_detects_loss_of_connectivity() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let target = listener.local_addr().unwrap().to_string();

    // The client holds the only reference to the probe.
    let client = ApiClient::new(test_config(), ScriptedTransport::new(), start_probe(&target).await)
        .unwrap();
    assert!(client.is_network_available());

    drop(listener);
    assert_eventually_async!(WAIT, async { !client.is_network_available() });
}

#[tokio::test]
async fn client_owned_probe_replays_queue_when_endpoint_appears() {
    let target = unused_local_addr().await;
    let transport = ScriptedTransport::new();
    let client = ApiClient::new(test_config(), transport.clone(), start_probe(&target).await).unwrap();
    assert!(!client.is_network_available());

    let recorder = Recorder::new();
    submit(&client, &recorder, "/waiting");
    assert_eq!(client.queued_requests(), 1);

    let _listener = TcpListener::bind(&target).await.unwrap();
    let replayed = timeout_ok(WAIT, async {
        while recorder.count() == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;

    assert!(replayed.is_ok(), "queued request was not replayed");
    assert_eq!(transport.paths(), vec!["/waiting"]);
    assert_eq!(client.queued_requests(), 0);
}
