//! Single-threaded host event loop: a listener registry plus an
//! animation-frame queue.
//!
//! This is the seam between the renderer and whatever actually owns the
//! window (a browser page, a terminal, a test). Hosts translate their native
//! input into [`HostEvent`]s and call [`EventLoop::dispatch`]; once per frame
//! they call [`EventLoop::run_animation_frames`].

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use flamecanvas_protocol::Point;

/// Where a listener is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventTarget {
    /// The canvas region the graph is painted on.
    Canvas,
    /// The whole document (global key bindings, scrolling).
    Document,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    PointerMove,
    PointerLeave,
    Click,
    ContextMenu,
    KeyDown,
    Scroll,
    Resize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Escape,
    Enter,
    Backspace,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPress {
    pub key: Key,
    pub ctrl: bool,
    /// Cmd on macOS.
    pub meta: bool,
}

impl KeyPress {
    pub fn plain(key: Key) -> Self {
        Self {
            key,
            ctrl: false,
            meta: false,
        }
    }

    pub fn ctrl(key: Key) -> Self {
        Self {
            key,
            ctrl: true,
            meta: false,
        }
    }

    /// Ctrl on most platforms, Cmd on macOS.
    pub fn has_command_modifier(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// Input delivered to listeners. Pointer positions are canvas pixels,
/// relative to the canvas' top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HostEvent {
    PointerMove(Point),
    PointerLeave,
    Click(Point),
    ContextMenu(Point),
    KeyDown(KeyPress),
    /// The viewport scrolled; re-read it from the host element.
    Scroll,
    /// The viewport changed size.
    Resize,
}

impl HostEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::PointerMove(_) => EventKind::PointerMove,
            Self::PointerLeave => EventKind::PointerLeave,
            Self::Click(_) => EventKind::Click,
            Self::ContextMenu(_) => EventKind::ContextMenu,
            Self::KeyDown(_) => EventKind::KeyDown,
            Self::Scroll => EventKind::Scroll,
            Self::Resize => EventKind::Resize,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameHandle(u64);

pub type Listener = Rc<dyn Fn(&HostEvent)>;

struct Registration {
    target: EventTarget,
    kind: EventKind,
    callback: Listener,
}

#[derive(Default)]
pub struct EventLoop {
    listeners: RefCell<BTreeMap<ListenerId, Registration>>,
    frames: RefCell<BTreeMap<FrameHandle, Box<dyn FnOnce()>>>,
    next_id: Cell<u64>,
}

impl std::fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLoop")
            .field("listeners", &self.listener_count())
            .field("pending_frames", &self.pending_frames())
            .finish()
    }
}

impl EventLoop {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    fn next(&self) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    pub fn add_listener(&self, target: EventTarget, kind: EventKind, callback: Listener) -> ListenerId {
        let id = ListenerId(self.next());
        self.listeners.borrow_mut().insert(
            id,
            Registration {
                target,
                kind,
                callback,
            },
        );
        id
    }

    /// Returns whether the listener was still registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.borrow_mut().remove(&id).is_some()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    pub fn listener_count_for(&self, target: EventTarget) -> usize {
        self.listeners
            .borrow()
            .values()
            .filter(|r| r.target == target)
            .count()
    }

    /// Deliver `event` to every listener on `target` for its kind, in
    /// registration order. Returns how many listeners ran.
    ///
    /// Listeners may add or remove listeners while running; the set of
    /// callbacks is fixed when dispatch starts.
    pub fn dispatch(&self, target: EventTarget, event: HostEvent) -> usize {
        let kind = event.kind();
        let callbacks: Vec<Listener> = self
            .listeners
            .borrow()
            .values()
            .filter(|r| r.target == target && r.kind == kind)
            .map(|r| Rc::clone(&r.callback))
            .collect();
        for callback in &callbacks {
            callback(&event);
        }
        callbacks.len()
    }

    pub fn request_animation_frame(&self, callback: Box<dyn FnOnce()>) -> FrameHandle {
        let handle = FrameHandle(self.next());
        self.frames.borrow_mut().insert(handle, callback);
        handle
    }

    /// Returns whether the frame was still pending.
    pub fn cancel_animation_frame(&self, handle: FrameHandle) -> bool {
        self.frames.borrow_mut().remove(&handle).is_some()
    }

    pub fn pending_frames(&self) -> usize {
        self.frames.borrow().len()
    }

    /// Run every frame callback queued so far. Callbacks queued while
    /// running wait for the next call. Returns how many ran.
    pub fn run_animation_frames(&self) -> usize {
        let due = std::mem::take(&mut *self.frames.borrow_mut());
        let ran = due.len();
        for (_, callback) in due {
            callback();
        }
        ran
    }
}

/// Releases whatever a mount acquired. Runs at most once: explicitly via
/// [`dispose`](Self::dispose) or when dropped.
#[must_use = "dropping a Disposer immediately releases what it guards"]
pub struct Disposer(Option<Box<dyn FnOnce()>>);

impl Disposer {
    pub fn new(cleanup: impl FnOnce() + 'static) -> Self {
        Self(Some(Box::new(cleanup)))
    }

    /// A disposer with nothing to release.
    pub fn noop() -> Self {
        Self(None)
    }

    pub fn dispose(&mut self) {
        if let Some(cleanup) = self.0.take() {
            cleanup();
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.0.is_none()
    }
}

impl Drop for Disposer {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for Disposer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Disposer").field(&!self.is_disposed()).finish()
    }
}
