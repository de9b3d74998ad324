//! Lifecycle events describing each request's journey through dispatch.
//!
//! For every request exactly one of `RequestMatch`/`RequestUnhandled` fires,
//! always followed by exactly one `RequestEnd`; the mocked/bypass response
//! event fires once the final response is known. No ordering is guaranteed
//! between distinct concurrent requests.

use crate::handler::HandlerInfo;
use crate::request::CapturedRequest;
use crate::response::MockResponse;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Event taxonomy, used to subscribe to a specific stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    RequestStart,
    RequestMatch,
    RequestUnhandled,
    RequestEnd,
    ResponseMocked,
    ResponseBypass,
    /// A resolver failed; published so test tooling can assert on it in
    /// addition to the error the dispatch caller receives.
    HandlerException,
}

#[derive(Debug, Clone)]
pub enum LifecycleEvent {
    RequestStart {
        request: Arc<CapturedRequest>,
    },
    RequestMatch {
        request: Arc<CapturedRequest>,
        handler: HandlerInfo,
    },
    RequestUnhandled {
        request: Arc<CapturedRequest>,
    },
    RequestEnd {
        request: Arc<CapturedRequest>,
    },
    ResponseMocked {
        request_id: Uuid,
        response: MockResponse,
    },
    ResponseBypass {
        request_id: Uuid,
    },
    HandlerException {
        request_id: Uuid,
        error: String,
    },
}

impl LifecycleEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            LifecycleEvent::RequestStart { .. } => EventKind::RequestStart,
            LifecycleEvent::RequestMatch { .. } => EventKind::RequestMatch,
            LifecycleEvent::RequestUnhandled { .. } => EventKind::RequestUnhandled,
            LifecycleEvent::RequestEnd { .. } => EventKind::RequestEnd,
            LifecycleEvent::ResponseMocked { .. } => EventKind::ResponseMocked,
            LifecycleEvent::ResponseBypass { .. } => EventKind::ResponseBypass,
            LifecycleEvent::HandlerException { .. } => EventKind::HandlerException,
        }
    }
}

pub type Listener = Arc<dyn Fn(&LifecycleEvent) + Send + Sync>;

/// Handle returned by [`LifecycleEmitter::on`], used to detach the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerId(u64);

struct ListenerEntry {
    id: ListenerId,
    kind: EventKind,
    listener: Listener,
    once: bool,
}

/// Shared event publisher for one mocking session.
#[derive(Default)]
pub struct LifecycleEmitter {
    next_id: AtomicU64,
    listeners: RwLock<Vec<ListenerEntry>>,
}

impl LifecycleEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a persistent listener for one event kind.
    pub fn on(&self, kind: EventKind, listener: Listener) -> ListenerId {
        self.attach(kind, listener, false)
    }

    /// Attach a listener that detaches itself after the first delivery.
    pub fn once(&self, kind: EventKind, listener: Listener) -> ListenerId {
        self.attach(kind, listener, true)
    }

    fn attach(&self, kind: EventKind, listener: Listener, once: bool) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.write().push(ListenerEntry {
            id,
            kind,
            listener,
            once,
        });
        id
    }

    /// Detach one listener; returns whether it was attached.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|entry| entry.id != id);
        listeners.len() != before
    }

    /// Detach every listener. Called on session teardown.
    pub fn remove_all_listeners(&self) {
        self.listeners.write().clear();
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// Deliver `event` to listeners of its kind, in attach order. Listeners
    /// run outside the registry lock so they may attach or detach freely.
    pub fn emit(&self, event: &LifecycleEvent) {
        let kind = event.kind();
        let matching: Vec<(ListenerId, Listener, bool)> = self
            .listeners
            .read()
            .iter()
            .filter(|entry| entry.kind == kind)
            .map(|entry| (entry.id, Arc::clone(&entry.listener), entry.once))
            .collect();

        let mut fired_once = Vec::new();
        for (id, listener, once) in matching {
            listener(event);
            if once {
                fired_once.push(id);
            }
        }
        if !fired_once.is_empty() {
            self.listeners
                .write()
                .retain(|entry| !fired_once.contains(&entry.id));
        }
    }
}
