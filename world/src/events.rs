//! Observer registration and synchronous event delivery.

use std::fmt;

use tankfield_core::{Event, EventKind, NegativeHonourReason, Player};

use crate::World;

/// Receives every event the world publishes.
///
/// Delivery is synchronous: the world waits for `publish` to return before it
/// continues, so a slow or panicking sink stalls or aborts the current
/// operation.
pub trait EventSink {
    /// Handles `event`, published by `sender`.
    fn publish(&mut self, sender: &World, event: &Event);
}

/// Recording sink used by tests and replay tooling.
impl EventSink for Vec<Event> {
    fn publish(&mut self, _sender: &World, event: &Event) {
        self.push(event.clone());
    }
}

/// Handle identifying a registered observer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Subscription {
    kind: EventKind,
    id: u64,
}

impl Subscription {
    /// Channel the observer listens on.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        self.kind
    }
}

type WorldObserver = dyn FnMut(&World);
type DeathObserver = dyn FnMut(&World, &Player);
type HonourObserver = dyn FnMut(&World, NegativeHonourReason);

/// Multicast bus with one observer list per [`EventKind`].
///
/// Observers run in registration order on the publishing thread. An event
/// published while its channel has no observers is dropped.
#[derive(Default)]
pub struct EventBus {
    next_id: u64,
    frame_advanced: Channel<WorldObserver>,
    game_started: Channel<WorldObserver>,
    game_finished: Channel<WorldObserver>,
    player_died: Channel<DeathObserver>,
    negative_honour: Channel<HonourObserver>,
}

impl EventBus {
    /// Creates a bus without observers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an observer for [`Event::FrameAdvanced`].
    pub fn on_frame_advanced<F>(&mut self, observer: F) -> Subscription
    where
        F: FnMut(&World) + 'static,
    {
        let subscription = self.allocate(EventKind::FrameAdvanced);
        self.frame_advanced.insert(subscription.id, Box::new(observer));
        subscription
    }

    /// Registers an observer for [`Event::GameStarted`].
    pub fn on_game_started<F>(&mut self, observer: F) -> Subscription
    where
        F: FnMut(&World) + 'static,
    {
        let subscription = self.allocate(EventKind::GameStarted);
        self.game_started.insert(subscription.id, Box::new(observer));
        subscription
    }

    /// Registers an observer for [`Event::GameFinished`].
    pub fn on_game_finished<F>(&mut self, observer: F) -> Subscription
    where
        F: FnMut(&World) + 'static,
    {
        let subscription = self.allocate(EventKind::GameFinished);
        self.game_finished.insert(subscription.id, Box::new(observer));
        subscription
    }

    /// Registers an observer for [`Event::PlayerDied`].
    pub fn on_player_died<F>(&mut self, observer: F) -> Subscription
    where
        F: FnMut(&World, &Player) + 'static,
    {
        let subscription = self.allocate(EventKind::PlayerDied);
        self.player_died.insert(subscription.id, Box::new(observer));
        subscription
    }

    /// Registers an observer for [`Event::NegativeHonour`].
    pub fn on_negative_honour<F>(&mut self, observer: F) -> Subscription
    where
        F: FnMut(&World, NegativeHonourReason) + 'static,
    {
        let subscription = self.allocate(EventKind::NegativeHonour);
        self.negative_honour.insert(subscription.id, Box::new(observer));
        subscription
    }

    /// Removes a previously registered observer.
    ///
    /// Returns `false` when the observer was already removed.
    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        let id = subscription.id;
        match subscription.kind {
            EventKind::FrameAdvanced => self.frame_advanced.remove(id),
            EventKind::GameStarted => self.game_started.remove(id),
            EventKind::GameFinished => self.game_finished.remove(id),
            EventKind::PlayerDied => self.player_died.remove(id),
            EventKind::NegativeHonour => self.negative_honour.remove(id),
        }
    }

    /// Number of observers registered on the channel.
    #[must_use]
    pub fn observer_count(&self, kind: EventKind) -> usize {
        match kind {
            EventKind::FrameAdvanced => self.frame_advanced.len(),
            EventKind::GameStarted => self.game_started.len(),
            EventKind::GameFinished => self.game_finished.len(),
            EventKind::PlayerDied => self.player_died.len(),
            EventKind::NegativeHonour => self.negative_honour.len(),
        }
    }

    fn allocate(&mut self, kind: EventKind) -> Subscription {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        Subscription { kind, id }
    }
}

impl EventSink for EventBus {
    fn publish(&mut self, sender: &World, event: &Event) {
        match event {
            Event::FrameAdvanced => {
                for entry in self.frame_advanced.entries.iter_mut() {
                    (entry.callback)(sender);
                }
            }
            Event::GameStarted => {
                for entry in self.game_started.entries.iter_mut() {
                    (entry.callback)(sender);
                }
            }
            Event::GameFinished => {
                for entry in self.game_finished.entries.iter_mut() {
                    (entry.callback)(sender);
                }
            }
            Event::PlayerDied { player } => {
                for entry in self.player_died.entries.iter_mut() {
                    (entry.callback)(sender, player);
                }
            }
            Event::NegativeHonour { reason } => {
                for entry in self.negative_honour.entries.iter_mut() {
                    (entry.callback)(sender, *reason);
                }
            }
        }
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for kind in EventKind::ALL {
            let _ = map.entry(&kind, &self.observer_count(kind));
        }
        map.finish()
    }
}

struct Channel<F: ?Sized> {
    entries: Vec<Entry<F>>,
}

struct Entry<F: ?Sized> {
    id: u64,
    callback: Box<F>,
}

impl<F: ?Sized> Default for Channel<F> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<F: ?Sized> Channel<F> {
    fn insert(&mut self, id: u64, callback: Box<F>) {
        self.entries.push(Entry { id, callback });
    }

    fn remove(&mut self, id: u64) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != id);
        self.entries.len() != before
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
