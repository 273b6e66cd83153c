use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::broadcast;

pub const ROUTE_ADDED: &str = "router.route.added";
pub const DISPATCH_BEGIN: &str = "router.dispatch.begin";
pub const DISPATCH_SERVED: &str = "router.dispatch.served";
pub const MANTLE_INITIALIZED: &str = "mantle.initialized";
pub const PLUGINS_INITIALIZED: &str = "plugins.initialized";
pub const PLUGINS_BOOTED: &str = "plugins.booted";
pub const MANTLE_BOOTED: &str = "mantle.booted";

type Listener = Arc<dyn Fn(&[Value]) + Send + Sync>;

/// A dispatched event, as seen by broadcast subscribers.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub name: String,
    pub payload: Vec<Value>,
}

/// Named events with ordered, synchronous listeners.
///
/// Listeners receive the payload followed by the event name. Broadcast
/// subscribers get a copy of every dispatched event as well.
#[derive(Clone)]
pub struct EventDispatcher {
    listeners: Arc<DashMap<String, Vec<Listener>>>,
    broadcast: broadcast::Sender<Event>,
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl EventDispatcher {
    pub fn new() -> Self {
        let (broadcast, _) = broadcast::channel(100);
        Self {
            listeners: Arc::new(DashMap::new()),
            broadcast,
        }
    }

    /// Append a listener for `event`.
    pub fn listen<F>(&self, event: &str, listener: F)
    where
        F: Fn(&[Value]) + Send + Sync + 'static,
    {
        self.listeners
            .entry(event.to_string())
            .or_default()
            .push(Arc::new(listener));
    }

    /// Call every listener of `event` in registration order.
    pub fn dispatch(&self, event: &str, mut payload: Vec<Value>) {
        // Listeners run outside the map guard so they may dispatch or listen themselves.
        let listeners: Vec<Listener> = self
            .listeners
            .get(event)
            .map(|entry| entry.value().clone())
            .unwrap_or_default();

        payload.push(Value::String(event.to_string()));
        for listener in &listeners {
            listener(&payload);
        }

        if self.broadcast.receiver_count() > 0 {
            let _ = self.broadcast.send(Event {
                name: event.to_string(),
                payload,
            });
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.broadcast.subscribe()
    }

    pub fn has_listeners(&self, event: &str) -> bool {
        self.listener_count(event) > 0
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners.get(event).map_or(0, |entry| entry.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    #[test]
    fn test_listeners_receive_payload_then_event_name() {
        let events = EventDispatcher::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        events.listen(ROUTE_ADDED, move |payload| {
            sink.lock().unwrap().push(payload.to_vec());
        });

        events.dispatch(ROUTE_ADDED, vec![json!("GET"), json!("/")]);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], vec![json!("GET"), json!("/"), json!(ROUTE_ADDED)]);
    }

    #[test]
    fn test_listeners_run_in_registration_order() {
        let events = EventDispatcher::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for label in ["first", "second"] {
            let order = order.clone();
            events.listen(MANTLE_BOOTED, move |_| order.lock().unwrap().push(label));
        }

        events.dispatch(MANTLE_BOOTED, Vec::new());
        events.dispatch(PLUGINS_BOOTED, Vec::new());

        assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);
        assert_eq!(events.listener_count(MANTLE_BOOTED), 2);
        assert!(!events.has_listeners(PLUGINS_BOOTED));
    }

    #[tokio::test]
    async fn test_subscribers_see_dispatched_events() {
        let events = EventDispatcher::new();
        let mut receiver = events.subscribe();

        events.dispatch(DISPATCH_BEGIN, vec![json!("GET"), json!("/item")]);

        let event = receiver.recv().await.unwrap();
        assert_eq!(event.name, DISPATCH_BEGIN);
        assert_eq!(event.payload.len(), 3);
    }
}
