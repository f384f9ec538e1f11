//! Ingress scenarios: host routing, publishing, reconnect signaling.

mod support;

use channel_supervisor::{ChannelEntry, ChannelReference, HttpDispatcher, SupervisorError};
use reqwest::header::HOST;
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use support::{make_supervisor, wait_for, wait_until_connected, FakeBackend};
use tokio_util::sync::CancellationToken;

struct Harness {
    backend: Arc<FakeBackend>,
    supervisor: Arc<channel_supervisor::SubscriptionSupervisor>,
    ingress: SocketAddr,
    shutdown: CancellationToken,
}

async fn started_harness() -> Harness {
    let backend = FakeBackend::new();
    let supervisor = make_supervisor(backend.clone(), Arc::new(HttpDispatcher::new()));
    let shutdown = CancellationToken::new();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ingress listener");
    let ingress = listener.local_addr().expect("ingress address");
    {
        let supervisor = supervisor.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            supervisor
                .start(listener, shutdown)
                .await
                .expect("supervisor start");
        });
    }
    wait_until_connected(&supervisor).await;

    Harness {
        backend,
        supervisor,
        ingress,
        shutdown,
    }
}

async fn post_event(ingress: SocketAddr, host: &str) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("http://{ingress}/"))
        .header(HOST, host)
        .header("ce-id", "evt-1")
        .header("ce-source", "/sender")
        .header("content-type", "application/json")
        .body(r#"{"n":1}"#)
        .send()
        .await
        .expect("ingress request")
}

#[tokio::test]
async fn event_posted_to_a_known_host_is_published_to_the_channel_subject() {
    let harness = started_harness().await;
    harness
        .supervisor
        .process_channels(&[ChannelEntry::new(ChannelReference::new("n1", "c1"), "h1")])
        .expect("process channels");

    let response = post_event(harness.ingress, "h1").await;

    assert_eq!(response.status().as_u16(), 202);
    let published = harness.backend.connection.published_on("c1.n1");
    assert_eq!(published.len(), 1);

    // The backend payload is the event envelope with its attributes intact.
    let event =
        channel_supervisor::EventMessage::from_wire(&published[0]).expect("decode envelope");
    assert_eq!(event.event_id(), Some("evt-1"));
    assert_eq!(event.payload, br#"{"n":1}"#.to_vec());

    harness.shutdown.cancel();
}

#[tokio::test]
async fn unknown_host_is_rejected_with_a_not_found_diagnostic() {
    let harness = started_harness().await;
    harness
        .supervisor
        .process_channels(&[ChannelEntry::new(ChannelReference::new("n1", "c1"), "h1")])
        .expect("process channels");

    let response = post_event(harness.ingress, "nowhere").await;

    assert_eq!(response.status().as_u16(), 404);
    let body = response.text().await.expect("response body");
    assert!(body.contains("HostName not found"));
    assert!(harness.backend.connection.published_on("c1.n1").is_empty());

    harness.shutdown.cancel();
}

#[tokio::test]
async fn connection_lost_on_publish_is_retryable_and_triggers_a_redial() {
    let harness = started_harness().await;
    harness
        .supervisor
        .process_channels(&[ChannelEntry::new(ChannelReference::new("n1", "c1"), "h1")])
        .expect("process channels");

    harness
        .backend
        .connection
        .fail_publish_closed
        .store(true, Ordering::SeqCst);
    let dials_before = harness.backend.dials.load(Ordering::SeqCst);

    let response = post_event(harness.ingress, "h1").await;
    assert_eq!(response.status().as_u16(), 503);

    // The failed publish enqueued a reconnect signal; the worker dials again
    // and the next request goes through once the backend recovers.
    let backend = harness.backend.clone();
    wait_for("a redial after connection loss", move || {
        backend.dials.load(Ordering::SeqCst) > dials_before
    })
    .await;

    harness
        .backend
        .connection
        .fail_publish_closed
        .store(false, Ordering::SeqCst);
    let response = post_event(harness.ingress, "h1").await;
    assert_eq!(response.status().as_u16(), 202);

    harness.shutdown.cancel();
}

#[tokio::test]
async fn duplicate_hostnames_reject_the_rebuild_and_keep_the_previous_routing() {
    let harness = started_harness().await;
    harness
        .supervisor
        .process_channels(&[ChannelEntry::new(ChannelReference::new("n1", "c1"), "h1")])
        .expect("initial process channels");

    let err = harness
        .supervisor
        .process_channels(&[
            ChannelEntry::new(ChannelReference::new("n1", "c1"), "h1"),
            ChannelEntry::new(ChannelReference::new("n2", "c2"), "h1"),
        ])
        .expect_err("duplicate hostname must fail");
    assert!(matches!(err, SupervisorError::DuplicateHostname { .. }));

    // h1 still routes to the pre-rebuild channel.
    let response = post_event(harness.ingress, "h1").await;
    assert_eq!(response.status().as_u16(), 202);
    assert_eq!(harness.backend.connection.published_on("c1.n1").len(), 1);
    assert!(harness.backend.connection.published_on("c2.n2").is_empty());

    harness.shutdown.cancel();
}
