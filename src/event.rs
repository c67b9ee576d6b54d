//! Window events
//!
//! Every buffer mutation a window performs is bracketed by before/after
//! events. Subscribers run synchronously on the caller's thread, in
//! registration order, before the triggering call returns.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

/// Identity of the window that published an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(u64);

impl WindowId {
    /// Allocate a process-unique id
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "window#{}", self.0)
    }
}

/// Event types
///
/// `flags` meaning per kind:
/// - flush / auto-flush: pending characters about to be (or just) emitted
/// - command sent: characters pending in the buffer when the command arrived
/// - character output: visual width of the printed text
/// - command output: 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    BeforeFlush,
    AfterFlush,
    BeforeAutoFlush,
    AfterAutoFlush,
    BeforeCommandSent,
    AfterCommandSent,
    BeforeCharacterOutput,
    AfterCharacterOutput,
    BeforeCommandOutput,
    AfterCommandOutput,
}

impl EventKind {
    pub const ALL: [EventKind; 10] = [
        EventKind::BeforeFlush,
        EventKind::AfterFlush,
        EventKind::BeforeAutoFlush,
        EventKind::AfterAutoFlush,
        EventKind::BeforeCommandSent,
        EventKind::AfterCommandSent,
        EventKind::BeforeCharacterOutput,
        EventKind::AfterCharacterOutput,
        EventKind::BeforeCommandOutput,
        EventKind::AfterCommandOutput,
    ];

    pub fn is_before(self) -> bool {
        matches!(
            self,
            EventKind::BeforeFlush
                | EventKind::BeforeAutoFlush
                | EventKind::BeforeCommandSent
                | EventKind::BeforeCharacterOutput
                | EventKind::BeforeCommandOutput
        )
    }

    fn bit(self) -> u16 {
        1 << (self as u16)
    }
}

/// Set of event kinds a subscriber listens to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EventMask(u16);

impl EventMask {
    pub const ALL: EventMask = EventMask((1 << 10) - 1);

    pub fn empty() -> Self {
        Self(0)
    }

    pub fn with(mut self, kind: EventKind) -> Self {
        self.0 |= kind.bit();
        self
    }

    pub fn contains(self, kind: EventKind) -> bool {
        self.0 & kind.bit() != 0
    }
}

impl From<EventKind> for EventMask {
    fn from(kind: EventKind) -> Self {
        EventMask::empty().with(kind)
    }
}

impl<const N: usize> From<[EventKind; N]> for EventMask {
    fn from(kinds: [EventKind; N]) -> Self {
        kinds.into_iter().fold(EventMask::empty(), EventMask::with)
    }
}

/// Immutable notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub source: WindowId,
    pub kind: EventKind,
    pub flags: u32,
    pub payload: String,
    pub timestamp: SystemTime,
}

impl Event {
    pub fn new(source: WindowId, kind: EventKind, flags: u32, payload: impl Into<String>) -> Self {
        Self {
            source,
            kind,
            flags,
            payload: payload.into(),
            timestamp: SystemTime::now(),
        }
    }
}

/// Handle returned by [`EventBus::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Subscriber callback
pub type Handler = Box<dyn FnMut(&Event) + Send>;

struct Subscription {
    id: SubscriptionId,
    mask: EventMask,
    handler: Handler,
}

/// Ordered publish/subscribe dispatch
#[derive(Default)]
pub struct EventBus {
    subscriptions: Vec<Subscription>,
    next_id: u64,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriptions.len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, kinds: impl Into<EventMask>, handler: Handler) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscriptions.push(Subscription {
            id,
            mask: kinds.into(),
            handler,
        });
        id
    }

    /// Returns false if the id was not subscribed
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.id != id);
        self.subscriptions.len() != before
    }

    /// Deliver to every matching subscriber in registration order.
    /// Returns the number of deliveries.
    pub fn publish(&mut self, event: &Event) -> usize {
        let mut delivered = 0;
        for sub in &mut self.subscriptions {
            if sub.mask.contains(event.kind) {
                (sub.handler)(event);
                delivered += 1;
            }
        }
        delivered
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }
}
