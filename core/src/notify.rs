//! Mutation notifications.
//!
//! Executors publish an [`Event`] on the topic `"<entity>:<operation>"` after
//! each read or write. Subscribers register with a [`Hub`] and subscribe to
//! the topics they care about. The transport that carries events to remote
//! clients (websocket, SSE, ...) lives outside this crate and only has to
//! implement [`Subscriber`].

use core::fmt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// What happened to an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Query,
    Create,
    Update,
    Delete,
}

impl Operation {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `"<entity>:<operation>"`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Topic {
    pub entity: String,
    pub operation: Operation,
}

impl Topic {
    pub fn new(entity: impl Into<String>, operation: Operation) -> Self {
        Self {
            entity: entity.into(),
            operation,
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.entity, self.operation)
    }
}

/// Kind of an outgoing message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Connected,
    Disconnected,
    Notify,
    Warning,
    Error,
}

/// Message delivered to a subscriber.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub kind: Kind,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub event: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
}

impl Event {
    pub fn notify(topic: &Topic, data: Value) -> Self {
        Self {
            kind: Kind::Notify,
            event: topic.to_string(),
            data,
        }
    }

    fn connected() -> Self {
        Self {
            kind: Kind::Connected,
            event: String::new(),
            data: Value::Null,
        }
    }
}

/// Subscription request sent by a client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    Subscribe,
    Unsubscribe,
    UnsubscribeAll,
    Disconnect,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub action: Action,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<String>,
}

/// Receives events from a [`Hub`]. Called outside the hub's lock.
pub trait Subscriber: Send + Sync {
    fn notify(&self, event: &Event);
}

pub type SubscriberId = u64;

#[derive(Default)]
struct Registrations {
    next_id: SubscriberId,
    subscribers: HashMap<SubscriberId, Arc<dyn Subscriber>>,
    topics: BTreeMap<String, BTreeSet<SubscriberId>>,
}

impl Registrations {
    fn remove_all(&mut self, id: SubscriberId) {
        self.topics.retain(|_, ids| {
            ids.remove(&id);
            !ids.is_empty()
        });
    }

    fn remove_from(&mut self, id: SubscriberId, topic: &str) {
        if let Some(ids) = self.topics.get_mut(topic) {
            ids.remove(&id);
            if ids.is_empty() {
                self.topics.remove(topic);
            }
        }
    }
}

/// Topic fan-out shared by every executor.
#[derive(Default)]
pub struct Hub {
    inner: Mutex<Registrations>,
}

impl fmt::Debug for Hub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        f.debug_struct("Hub")
            .field("subscribers", &inner.subscribers.len())
            .field("topics", &inner.topics.len())
            .finish()
    }
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    // A panicking subscriber cannot leave the maps half-updated, so a
    // poisoned lock is still consistent.
    fn lock(&self) -> MutexGuard<'_, Registrations> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a subscriber and sends it a `connected` event
    pub fn register(&self, subscriber: Arc<dyn Subscriber>) -> SubscriberId {
        let id = {
            let mut inner = self.lock();
            inner.next_id += 1;
            let id = inner.next_id;
            inner.subscribers.insert(id, Arc::clone(&subscriber));
            id
        };
        subscriber.notify(&Event::connected());
        id
    }

    pub fn subscribe<I, S>(&self, id: SubscriberId, topics: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut inner = self.lock();
        if !inner.subscribers.contains_key(&id) {
            return;
        }
        for topic in topics {
            inner.topics.entry(topic.into()).or_default().insert(id);
        }
    }

    pub fn unsubscribe<I, S>(&self, id: SubscriberId, topics: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut inner = self.lock();
        for topic in topics {
            inner.remove_from(id, topic.as_ref());
        }
    }

    /// Drops every topic of `id` but keeps it registered
    pub fn unsubscribe_all(&self, id: SubscriberId) {
        self.lock().remove_all(id);
    }

    /// Removes `id` entirely. Topics and registration go under one lock, so a
    /// concurrent `subscribe` either lands before and is dropped or is refused.
    pub fn disconnect(&self, id: SubscriberId) {
        let mut inner = self.lock();
        inner.remove_all(id);
        inner.subscribers.remove(&id);
    }

    /// Applies a client request. Returns `false` once the client disconnected.
    pub fn handle(&self, id: SubscriberId, request: &Request) -> bool {
        match request.action {
            Action::Subscribe => self.subscribe(id, request.events.iter().cloned()),
            Action::Unsubscribe => self.unsubscribe(id, &request.events),
            Action::UnsubscribeAll => self.unsubscribe_all(id),
            Action::Disconnect => {
                self.disconnect(id);
                return false;
            }
        }
        true
    }

    /// Topics `id` is subscribed to, sorted
    pub fn topics_of(&self, id: SubscriberId) -> Vec<String> {
        self.lock()
            .topics
            .iter()
            .filter(|(_, ids)| ids.contains(&id))
            .map(|(topic, _)| topic.clone())
            .collect()
    }

    /// Delivers `data` to every subscriber of `topic` and returns how many
    /// were notified.
    pub fn publish(&self, topic: &Topic, data: Value) -> usize {
        let key = topic.to_string();
        let targets: Vec<Arc<dyn Subscriber>> = {
            let inner = self.lock();
            match inner.topics.get(&key) {
                Some(ids) => ids
                    .iter()
                    .filter_map(|id| inner.subscribers.get(id).cloned())
                    .collect(),
                None => Vec::new(),
            }
        };

        if !targets.is_empty() {
            let event = Event::notify(topic, data);
            for subscriber in &targets {
                subscriber.notify(&event);
            }
        }

        crate::relq_trace_publish!(key, targets.len());
        targets.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Default)]
    struct Inbox(Mutex<Vec<Event>>);

    impl Inbox {
        fn events(&self) -> Vec<Event> {
            self.0.lock().unwrap().clone()
        }
    }

    impl Subscriber for Inbox {
        fn notify(&self, event: &Event) {
            self.0.lock().unwrap().push(event.clone());
        }
    }

    #[test]
    fn test_topic_format() {
        assert_eq!(Topic::new("users", Operation::Delete).to_string(), "users:delete");
    }

    #[test]
    fn test_publish_reaches_subscribers_only() {
        let hub = Hub::new();
        let a = Arc::new(Inbox::default());
        let b = Arc::new(Inbox::default());
        let id_a = hub.register(a.clone());
        let id_b = hub.register(b.clone());

        hub.subscribe(id_a, ["users:query", "users:delete"]);
        hub.subscribe(id_b, ["posts:query"]);

        let delivered = hub.publish(&Topic::new("users", Operation::Query), json!({"count": 2}));
        assert_eq!(delivered, 1);

        let events = a.events();
        assert_eq!(events[0].kind, Kind::Connected);
        assert_eq!(events[1].event, "users:query");
        assert_eq!(events[1].data, json!({"count": 2}));
        assert_eq!(b.events().len(), 1);
    }

    #[test]
    fn test_unsubscribe_and_disconnect() {
        let hub = Hub::new();
        let inbox = Arc::new(Inbox::default());
        let id = hub.register(inbox.clone());
        hub.subscribe(id, ["users:query", "users:delete"]);

        hub.unsubscribe(id, ["users:query"]);
        assert_eq!(hub.topics_of(id), ["users:delete"]);
        assert_eq!(hub.publish(&Topic::new("users", Operation::Query), Value::Null), 0);

        hub.unsubscribe_all(id);
        assert!(hub.topics_of(id).is_empty());

        hub.subscribe(id, ["users:delete"]);
        hub.disconnect(id);
        assert_eq!(hub.publish(&Topic::new("users", Operation::Delete), Value::Null), 0);

        // Unknown subscribers cannot subscribe
        hub.subscribe(id, ["users:delete"]);
        assert!(hub.topics_of(id).is_empty());
    }

    #[test]
    fn test_disconnect_races_subscribe() {
        for _ in 0..50 {
            let hub = Hub::new();
            let id = hub.register(Arc::new(Inbox::default()));

            std::thread::scope(|s| {
                s.spawn(|| {
                    for i in 0..20 {
                        hub.subscribe(id, [format!("t{i}:query")]);
                    }
                });
                s.spawn(|| hub.disconnect(id));
            });

            assert!(hub.topics_of(id).is_empty());
            assert!(hub.lock().topics.is_empty());
        }
    }

    #[test]
    fn test_handle_requests() {
        let hub = Hub::new();
        let id = hub.register(Arc::new(Inbox::default()));

        let request: Request =
            serde_json::from_value(json!({"action": "subscribe", "events": ["a:query", "b:query"]}))
                .unwrap();
        assert!(hub.handle(id, &request));
        assert_eq!(hub.topics_of(id), ["a:query", "b:query"]);

        let request: Request = serde_json::from_value(json!({"action": "unsubscribeAll"})).unwrap();
        assert!(hub.handle(id, &request));
        assert!(hub.topics_of(id).is_empty());

        let request: Request = serde_json::from_value(json!({"action": "disconnect"})).unwrap();
        assert!(!hub.handle(id, &request));
    }

    #[test]
    fn test_event_wire_shape() {
        let event = Event::notify(&Topic::new("users", Operation::Create), json!({"id": 1}));
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"kind": "notify", "event": "users:create", "data": {"id": 1}})
        );
    }
}
