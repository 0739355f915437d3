//! Keyboard and paste input as an owned, injectable source.
//!
//! Components register handlers on an [`InputSource`] and receive a
//! [`Subscription`] that unregisters on drop. [`InputHub`] is the one
//! implementation; it is constructed once and fed by whichever frontend owns the
//! real input (see [`terminal`]), or directly by tests.
//!
//! Key handlers run in two phases, like DOM listeners: every `Capture` handler
//! sees an event before any `Bubble` handler does.

pub mod terminal;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Instant;

/// Keys the station distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Enter,
    ArrowLeft,
    ArrowRight,
    Escape,
    /// Ctrl-C
    Interrupt,
    Other,
}

/// Kind of element an event is aimed at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetKind {
    #[default]
    Document,
    TextInput,
    TextArea,
    ContentEditable,
}

/// Where an input event lands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InputTarget {
    pub kind: TargetKind,

    /// Editable element that explicitly wants scanner input
    pub accepts_scanner: bool,
}

impl InputTarget {
    pub fn document() -> Self {
        Self::default()
    }

    pub fn editable(kind: TargetKind) -> Self {
        Self {
            kind,
            accepts_scanner: false,
        }
    }

    /// Editable element that opted in to scanner input
    pub fn scanner_field(kind: TargetKind) -> Self {
        Self {
            kind,
            accepts_scanner: true,
        }
    }

    pub fn is_editable(&self) -> bool {
        !matches!(self.kind, TargetKind::Document)
    }

    /// Scanner logic must leave this event alone
    pub fn shields_from_scanner(&self) -> bool {
        self.is_editable() && !self.accepts_scanner
    }
}

/// A key press with the time it happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyInput {
    pub key: Key,
    pub at: Instant,
    pub target: InputTarget,
}

impl KeyInput {
    pub fn new(key: Key, at: Instant) -> Self {
        Self {
            key,
            at,
            target: InputTarget::document(),
        }
    }

    pub fn on(mut self, target: InputTarget) -> Self {
        self.target = target;
        self
    }
}

/// A paste with the time it happened
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasteInput {
    pub text: String,
    pub at: Instant,
    pub target: InputTarget,
}

impl PasteInput {
    pub fn new(text: impl Into<String>, at: Instant) -> Self {
        Self {
            text: text.into(),
            at,
            target: InputTarget::document(),
        }
    }

    pub fn on(mut self, target: InputTarget) -> Self {
        self.target = target;
        self
    }
}

/// Listener phase for key events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Capture,
    Bubble,
}

pub type KeyHandler = Arc<dyn Fn(&KeyInput) + Send + Sync>;
pub type PasteHandler = Arc<dyn Fn(&PasteInput) + Send + Sync>;

/// Registration surface for keyboard and paste listeners
pub trait InputSource: Send + Sync {
    fn on_key(&self, phase: Phase, handler: KeyHandler) -> Subscription;

    fn on_paste(&self, handler: PasteHandler) -> Subscription;
}

enum Listener {
    Key { phase: Phase, handler: KeyHandler },
    Paste(PasteHandler),
}

struct HubInner {
    next_id: AtomicU64,
    listeners: Mutex<Vec<(u64, Listener)>>,
}

impl HubInner {
    fn listeners(&self) -> MutexGuard<'_, Vec<(u64, Listener)>> {
        self.listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn remove(&self, id: u64) {
        self.listeners().retain(|(listener_id, _)| *listener_id != id);
    }
}

/// Dispatches input events to registered listeners
#[derive(Clone)]
pub struct InputHub {
    inner: Arc<HubInner>,
}

impl InputHub {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(HubInner {
                next_id: AtomicU64::new(1),
                listeners: Mutex::new(Vec::new()),
            }),
        }
    }

    fn register(&self, listener: Listener) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.listeners().push((id, listener));
        Subscription {
            id,
            hub: Arc::downgrade(&self.inner),
        }
    }

    /// Deliver a key event: capture listeners first, then bubble listeners
    pub fn dispatch_key(&self, input: KeyInput) {
        // Handlers run without the lock held so they may (un)register
        let (capture, bubble): (Vec<KeyHandler>, Vec<KeyHandler>) = {
            let listeners = self.inner.listeners();
            let mut capture = Vec::new();
            let mut bubble = Vec::new();
            for (_, listener) in listeners.iter() {
                if let Listener::Key { phase, handler } = listener {
                    match phase {
                        Phase::Capture => capture.push(Arc::clone(handler)),
                        Phase::Bubble => bubble.push(Arc::clone(handler)),
                    }
                }
            }
            (capture, bubble)
        };

        for handler in capture.iter().chain(bubble.iter()) {
            handler(&input);
        }
    }

    pub fn dispatch_paste(&self, input: PasteInput) {
        let handlers: Vec<PasteHandler> = self
            .inner
            .listeners()
            .iter()
            .filter_map(|(_, listener)| match listener {
                Listener::Paste(handler) => Some(Arc::clone(handler)),
                Listener::Key { .. } => None,
            })
            .collect();

        for handler in &handlers {
            handler(&input);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners().len()
    }
}

impl Default for InputHub {
    fn default() -> Self {
        Self::new()
    }
}

impl InputSource for InputHub {
    fn on_key(&self, phase: Phase, handler: KeyHandler) -> Subscription {
        self.register(Listener::Key { phase, handler })
    }

    fn on_paste(&self, handler: PasteHandler) -> Subscription {
        self.register(Listener::Paste(handler))
    }
}

/// Keeps a listener registered; dropping it removes the listener
#[must_use = "the listener is removed when the subscription is dropped"]
pub struct Subscription {
    id: u64,
    hub: Weak<HubInner>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.remove(self.id);
        }
    }
}
