//! Shared fake-backend harness for supervisor integration tests.
//!
//! Each scenario binary uses a different slice of the harness.
#![allow(dead_code)]

use async_trait::async_trait;
use channel_supervisor::backend::{
    BackendConnection, BackendError, BackendListener, BackendMessage, BackendSubscription,
    StreamingBackend, SubscribeOptions,
};
use channel_supervisor::{
    EventMessage, MessageDispatcher, SubscriptionSupervisor, SupervisorArgs,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// In-memory streaming backend: one shared connection, recorded calls,
/// test-driven delivery.
pub struct FakeBackend {
    pub dials: AtomicUsize,
    pub connection: Arc<FakeConnection>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            dials: AtomicUsize::new(0),
            connection: Arc::new(FakeConnection::new()),
        })
    }
}

#[async_trait]
impl StreamingBackend for FakeBackend {
    async fn connect(
        &self,
        _cluster_id: &str,
        _client_id: &str,
        _natss_url: &str,
    ) -> Result<Arc<dyn BackendConnection>, BackendError> {
        self.dials.fetch_add(1, Ordering::SeqCst);
        Ok(self.connection.clone())
    }
}

pub struct FakeConnection {
    pub published: Mutex<Vec<(String, Vec<u8>)>>,
    pub subscribe_calls: Mutex<Vec<(String, SubscribeOptions)>>,
    pub fail_publish_closed: AtomicBool,
    listeners: Arc<Mutex<HashMap<String, Arc<dyn BackendListener>>>>,
    unsubscribed: Arc<Mutex<Vec<String>>>,
    sequence: AtomicU64,
}

impl FakeConnection {
    fn new() -> Self {
        Self {
            published: Mutex::new(Vec::new()),
            subscribe_calls: Mutex::new(Vec::new()),
            fail_publish_closed: AtomicBool::new(false),
            listeners: Arc::new(Mutex::new(HashMap::new())),
            unsubscribed: Arc::new(Mutex::new(Vec::new())),
            sequence: AtomicU64::new(0),
        }
    }

    pub fn published_on(&self, subject: &str) -> Vec<Vec<u8>> {
        self.published
            .lock()
            .expect("lock published")
            .iter()
            .filter(|(published_subject, _)| published_subject == subject)
            .map(|(_, payload)| payload.clone())
            .collect()
    }

    pub fn subscribed_durables(&self) -> Vec<String> {
        self.subscribe_calls
            .lock()
            .expect("lock subscribe_calls")
            .iter()
            .map(|(_, options)| options.durable_name.clone())
            .collect()
    }

    pub fn unsubscribed_durables(&self) -> Vec<String> {
        self.unsubscribed.lock().expect("lock unsubscribed").clone()
    }

    /// Pushes one event through the durable's delivery listener the way the
    /// backend would, returning the message state for ack assertions.
    pub async fn deliver(&self, durable_name: &str, event: &EventMessage) -> Arc<FakeMessageState> {
        let listener = self
            .listeners
            .lock()
            .expect("lock listeners")
            .get(durable_name)
            .cloned()
            .expect("durable has a registered listener");

        let state = Arc::new(FakeMessageState {
            payload: event.to_wire().expect("encode event"),
            acks: AtomicUsize::new(0),
        });
        let message = FakeMessage {
            subject: "c1.n1".to_string(),
            sequence: self.sequence.fetch_add(1, Ordering::SeqCst) + 1,
            state: state.clone(),
        };
        listener.on_message(Box::new(message)).await;
        state
    }
}

#[async_trait]
impl BackendConnection for FakeConnection {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<(), BackendError> {
        if self.fail_publish_closed.load(Ordering::SeqCst) {
            return Err(BackendError::ConnectionClosed);
        }
        self.published
            .lock()
            .expect("lock published")
            .push((subject.to_string(), payload));
        Ok(())
    }

    async fn subscribe(
        &self,
        subject: &str,
        options: SubscribeOptions,
        listener: Arc<dyn BackendListener>,
    ) -> Result<Arc<dyn BackendSubscription>, BackendError> {
        let durable_name = options.durable_name.clone();
        self.subscribe_calls
            .lock()
            .expect("lock subscribe_calls")
            .push((subject.to_string(), options));
        self.listeners
            .lock()
            .expect("lock listeners")
            .insert(durable_name.clone(), listener);
        Ok(Arc::new(FakeSubscription {
            durable_name,
            listeners: self.listeners.clone(),
            unsubscribed: self.unsubscribed.clone(),
        }))
    }
}

struct FakeSubscription {
    durable_name: String,
    listeners: Arc<Mutex<HashMap<String, Arc<dyn BackendListener>>>>,
    unsubscribed: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl BackendSubscription for FakeSubscription {
    async fn unsubscribe(&self) -> Result<(), BackendError> {
        self.listeners
            .lock()
            .expect("lock listeners")
            .remove(&self.durable_name);
        self.unsubscribed
            .lock()
            .expect("lock unsubscribed")
            .push(self.durable_name.clone());
        Ok(())
    }
}

pub struct FakeMessageState {
    pub payload: Vec<u8>,
    pub acks: AtomicUsize,
}

struct FakeMessage {
    subject: String,
    sequence: u64,
    state: Arc<FakeMessageState>,
}

#[async_trait]
impl BackendMessage for FakeMessage {
    fn subject(&self) -> &str {
        &self.subject
    }

    fn sequence(&self) -> u64 {
        self.sequence
    }

    fn payload(&self) -> &[u8] {
        &self.state.payload
    }

    async fn ack(&self) -> Result<(), BackendError> {
        self.state.acks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub fn make_supervisor(
    backend: Arc<FakeBackend>,
    dispatcher: Arc<dyn MessageDispatcher>,
) -> Arc<SubscriptionSupervisor> {
    Arc::new(SubscriptionSupervisor::new(SupervisorArgs {
        natss_url: "nats://localhost:4222".to_string(),
        cluster_id: "test-cluster".to_string(),
        client_id: "test-client".to_string(),
        ack_wait_minutes: 1,
        max_inflight: 16,
        backend,
        dispatcher,
        reporter: None,
    }))
}

/// Polls `pred` until it holds or the deadline passes.
pub async fn wait_for(what: &str, mut pred: impl FnMut() -> bool) {
    for _ in 0..500 {
        if pred() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {what}");
}

/// Durable name used by [`wait_until_connected`]; filter it out of call
/// recordings with [`without_probe`].
pub const PROBE_DURABLE: &str = "connection-probe";

pub fn without_probe(durables: Vec<String>) -> Vec<String> {
    durables
        .into_iter()
        .filter(|durable| durable != PROBE_DURABLE)
        .collect()
}

/// Reconciles a probe subscriber until the backend connection is usable,
/// then tears the probe down again.
pub async fn wait_until_connected(supervisor: &SubscriptionSupervisor) {
    use channel_supervisor::SubscriberSpec;
    use url::Url;

    let probe = [SubscriberSpec::new(
        PROBE_DURABLE,
        Some(Url::parse("http://probe.invalid/").expect("valid probe URL")),
    )];
    for _ in 0..500 {
        let failures = supervisor
            .update_subscriptions("probe", "probe", &probe, false)
            .await
            .expect("probe reconcile");
        if failures.is_empty() {
            supervisor
                .update_subscriptions("probe", "probe", &[], true)
                .await
                .expect("probe teardown");
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for the backend connection");
}
