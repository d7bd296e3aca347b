//! Pattern-based pub/sub
//!
//! Peripheral helper: pattern subscriptions with optional background
//! listener threads. Delivery is best-effort, at most one attempt per
//! matching publish, with no ordering or persistence guarantees beyond
//! what the broker's channels provide.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam::channel::{unbounded, Receiver, Sender, TryRecvError};
use parking_lot::Mutex;

use crate::store::pattern;

/// One published message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Channel the message was published to
    pub channel: String,

    /// Pattern the receiving subscription was registered with
    pub pattern: String,

    pub payload: Vec<u8>,
}

struct Registration {
    id: u64,
    pattern: String,
    sender: Sender<Message>,
}

struct BrokerInner {
    registrations: Mutex<Vec<Registration>>,
    next_id: AtomicU64,
}

/// Fan-out hub for pattern subscriptions
#[derive(Clone)]
pub struct PubSubBroker {
    inner: Arc<BrokerInner>,
}

impl Default for PubSubBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl PubSubBroker {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BrokerInner {
                registrations: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// Register a pattern subscription and receive messages by hand
    pub fn subscribe(&self, pattern: impl Into<String>) -> Subscription {
        let pattern = pattern.into();
        let (sender, receiver) = unbounded();
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);

        self.inner.registrations.lock().push(Registration {
            id,
            pattern: pattern.clone(),
            sender,
        });

        tracing::debug!(pattern = %pattern, "registered pub/sub subscription");

        Subscription {
            broker: self.inner.clone(),
            id,
            pattern,
            receiver,
        }
    }

    /// Register a pattern subscription serviced by a background thread
    ///
    /// The handler runs on a dedicated listener thread until the returned
    /// listener is stopped or dropped.
    pub fn spawn_listener<F>(&self, pattern: impl Into<String>, mut handler: F) -> Listener
    where
        F: FnMut(Message) + Send + 'static,
    {
        let subscription = self.subscribe(pattern);
        let pattern = subscription.pattern.clone();
        let receiver = subscription.receiver.clone();

        let handle = std::thread::Builder::new()
            .name(format!("kvstow-pubsub-{pattern}"))
            .spawn(move || {
                // Channel disconnects once the subscription is dropped
                for message in receiver.iter() {
                    handler(message);
                }
            })
            .expect("failed to spawn pub/sub listener thread");

        Listener {
            subscription: Some(subscription),
            handle: Some(handle),
        }
    }

    /// Publish a payload to a channel
    ///
    /// Returns the number of subscriptions the message was handed to.
    pub fn publish(&self, channel: &str, payload: Vec<u8>) -> usize {
        let mut registrations = self.inner.registrations.lock();
        let mut delivered = 0;

        // Drop registrations whose receiver side has gone away
        registrations.retain(|registration| {
            if !pattern::matches(&registration.pattern, channel) {
                return true;
            }

            let message = Message {
                channel: channel.to_string(),
                pattern: registration.pattern.clone(),
                payload: payload.clone(),
            };

            match registration.sender.send(message) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(_) => false,
            }
        });

        delivered
    }

    /// Patterns with at least one live subscription
    pub fn patterns(&self) -> Vec<String> {
        let registrations = self.inner.registrations.lock();
        let mut patterns: Vec<String> = registrations
            .iter()
            .map(|registration| registration.pattern.clone())
            .collect();
        patterns.sort();
        patterns.dedup();
        patterns
    }

    fn unsubscribe(&self, id: u64) {
        self.inner
            .registrations
            .lock()
            .retain(|registration| registration.id != id);
    }
}

/// A live pattern subscription; unregisters on drop
pub struct Subscription {
    broker: Arc<BrokerInner>,
    id: u64,
    pattern: String,
    receiver: Receiver<Message>,
}

impl Subscription {
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Block until the next matching message arrives
    pub fn recv(&self) -> Option<Message> {
        self.receiver.recv().ok()
    }

    /// Fetch a pending message without blocking
    pub fn try_recv(&self) -> Option<Message> {
        match self.receiver.try_recv() {
            Ok(message) => Some(message),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        PubSubBroker {
            inner: self.broker.clone(),
        }
        .unsubscribe(self.id);
    }
}

/// Handle to a background listener thread
pub struct Listener {
    subscription: Option<Subscription>,
    handle: Option<JoinHandle<()>>,
}

impl Listener {
    pub fn pattern(&self) -> &str {
        self.subscription
            .as_ref()
            .map(|subscription| subscription.pattern())
            .unwrap_or_default()
    }

    /// Stop the listener and wait for its thread to finish
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        // Dropping the subscription disconnects the channel, which ends
        // the listener loop.
        self.subscription.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("pub/sub listener thread panicked");
            }
        }
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        self.shutdown();
    }
}
