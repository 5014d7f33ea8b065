//! Lifecycle events and their dispatcher.
//!
//! One handler per [`EventKind`]. Dispatch copies the handler out of the table and
//! releases the table lock before calling it, so a handler may replace handlers or
//! call back into the player that emitted the event.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::runtime::LoopEvent;
use crate::RiveError;

/// Kinds of lifecycle events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// File parsed and artboard instantiated
    Load,
    /// Loading failed; the player holds no file
    LoadError,
    /// Playback started or resumed
    Play,
    /// Playback paused
    Pause,
    /// Playback stopped
    Stop,
    /// An animation crossed a loop boundary
    Loop,
}

impl EventKind {
    pub const ALL: [EventKind; 6] = [
        Self::Load,
        Self::LoadError,
        Self::Play,
        Self::Pause,
        Self::Stop,
        Self::Loop,
    ];

    /// Get the name of this event kind
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::LoadError => "loaderror",
            Self::Play => "play",
            Self::Pause => "pause",
            Self::Stop => "stop",
            Self::Loop => "loop",
        }
    }
}

/// Data carried by an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventPayload {
    /// Animations affected by a play/pause/stop
    Animations(Vec<String>),
    /// Loop boundary details
    Loop(LoopEvent),
    /// Why a load failed
    Error(RiveError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,
    #[serde(default)]
    pub payload: Option<EventPayload>,
}

impl Event {
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            payload: None,
        }
    }

    pub fn with_payload(kind: EventKind, payload: EventPayload) -> Self {
        Self {
            kind,
            payload: Some(payload),
        }
    }

    pub fn load() -> Self {
        Self::new(EventKind::Load)
    }

    pub fn load_error(err: RiveError) -> Self {
        Self::with_payload(EventKind::LoadError, EventPayload::Error(err))
    }

    pub fn play(animations: Vec<String>) -> Self {
        Self::with_payload(EventKind::Play, EventPayload::Animations(animations))
    }

    pub fn pause(animations: Vec<String>) -> Self {
        Self::with_payload(EventKind::Pause, EventPayload::Animations(animations))
    }

    pub fn stop(animations: Vec<String>) -> Self {
        Self::with_payload(EventKind::Stop, EventPayload::Animations(animations))
    }

    pub fn looped(event: LoopEvent) -> Self {
        Self::with_payload(EventKind::Loop, EventPayload::Loop(event))
    }

    /// Loop details, when this is a Loop event.
    pub fn loop_event(&self) -> Option<&LoopEvent> {
        match &self.payload {
            Some(EventPayload::Loop(event)) => Some(event),
            _ => None,
        }
    }

    /// Failure reason, when this is a LoadError event.
    pub fn error(&self) -> Option<&RiveError> {
        match &self.payload {
            Some(EventPayload::Error(err)) => Some(err),
            _ => None,
        }
    }
}

/// Handler invoked with the emitting context (usually the player) and the event.
pub type Handler<C> = Arc<dyn Fn(&C, &Event) + Send + Sync>;

/// Ordered, synchronous delivery of events to at most one handler per kind.
pub struct EventDispatcher<C> {
    handlers: Mutex<HashMap<EventKind, Handler<C>>>,
}

impl<C> Default for EventDispatcher<C> {
    fn default() -> Self {
        Self {
            handlers: Mutex::new(HashMap::new()),
        }
    }
}

impl<C> fmt::Debug for EventDispatcher<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handlers = self.handlers.lock();
        let kinds: Vec<&str> = EventKind::ALL
            .iter()
            .filter(|k| handlers.contains_key(*k))
            .map(EventKind::name)
            .collect();
        f.debug_struct("EventDispatcher")
            .field("handlers", &kinds)
            .finish()
    }
}

impl<C> EventDispatcher<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `kind`, returning the handler it replaced.
    pub fn on<F>(&self, kind: EventKind, handler: F) -> Option<Handler<C>>
    where
        F: Fn(&C, &Event) + Send + Sync + 'static,
    {
        self.set(kind, Arc::new(handler))
    }

    pub fn set(&self, kind: EventKind, handler: Handler<C>) -> Option<Handler<C>> {
        self.handlers.lock().insert(kind, handler)
    }

    /// Remove the handler for `kind`. Returns whether one was registered.
    pub fn off(&self, kind: EventKind) -> bool {
        self.handlers.lock().remove(&kind).is_some()
    }

    pub fn has_handler(&self, kind: EventKind) -> bool {
        self.handlers.lock().contains_key(&kind)
    }

    /// Deliver `event` to its handler. Returns whether a handler ran to completion.
    /// A panicking handler is logged and contained.
    pub fn dispatch(&self, ctx: &C, event: &Event) -> bool {
        let handler = self.handlers.lock().get(&event.kind).cloned();
        let Some(handler) = handler else {
            return false;
        };
        match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| handler(ctx, event))) {
            Ok(()) => true,
            Err(payload) => {
                error!(
                    event = event.kind.name(),
                    panic = %panic_message(payload),
                    "event handler panicked"
                );
                false
            }
        }
    }
}

/// Extract a human-readable message from a panic payload.
pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        return (*msg).to_string();
    }
    if let Some(msg) = payload.downcast_ref::<String>() {
        return msg.clone();
    }
    "non-string panic payload".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::LoopType;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Ctx {
        seen: Mutex<Vec<EventKind>>,
    }

    #[test]
    fn dispatch_reaches_only_the_matching_kind() {
        let dispatcher = EventDispatcher::<Ctx>::new();
        dispatcher.on(EventKind::Play, |ctx, e| ctx.seen.lock().push(e.kind));
        let ctx = Ctx::default();

        assert!(dispatcher.dispatch(&ctx, &Event::play(vec!["idle".into()])));
        assert!(!dispatcher.dispatch(&ctx, &Event::load()));
        assert_eq!(*ctx.seen.lock(), vec![EventKind::Play]);
    }

    #[test]
    fn handlers_can_rewire_the_table_while_running() {
        let dispatcher = Arc::new(EventDispatcher::<Ctx>::new());
        let inner = Arc::clone(&dispatcher);
        dispatcher.on(EventKind::Loop, move |ctx, e| {
            ctx.seen.lock().push(e.kind);
            inner.off(EventKind::Loop);
            inner.on(EventKind::Stop, |ctx, e| ctx.seen.lock().push(e.kind));
        });
        let ctx = Ctx::default();
        let looped = Event::looped(LoopEvent {
            animation: "spin".into(),
            loop_type: LoopType::Loop,
        });

        assert!(dispatcher.dispatch(&ctx, &looped));
        assert!(!dispatcher.dispatch(&ctx, &looped));
        assert!(dispatcher.dispatch(&ctx, &Event::stop(vec![])));
        assert_eq!(*ctx.seen.lock(), vec![EventKind::Loop, EventKind::Stop]);
    }

    #[test]
    fn panicking_handler_does_not_block_other_kinds() {
        let dispatcher = EventDispatcher::<()>::new();
        let delivered = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&delivered);
        dispatcher.on(EventKind::Pause, |_, _| panic!("handler failure"));
        dispatcher.on(EventKind::Stop, move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(!dispatcher.dispatch(&(), &Event::pause(vec![])));
        assert!(dispatcher.dispatch(&(), &Event::stop(vec![])));
        assert!(dispatcher.has_handler(EventKind::Pause));
        assert_eq!(delivered.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn payload_accessors() {
        let err = Event::load_error(RiveError::NoDefaultArtboard);
        assert_eq!(err.error(), Some(&RiveError::NoDefaultArtboard));
        assert!(err.loop_event().is_none());
        assert_eq!(Event::load().payload, None);
    }
}
