//! The view state that outlives a single render (and a page reload).
//!
//! The state is owned by the host, usually as URL query parameters. The
//! engine only reads it through [`StateStore::get`] and writes it through
//! [`StateStore::set`]; it never keeps its own copy between renders.

use std::cell::RefCell;
use std::collections::BTreeMap;

use flamecanvas_protocol::FrameCoords;
use serde::{Deserialize, Serialize};

pub const QUERY_KEY: &str = "flamegraphQuery";
pub const REVERSE_KEY: &str = "flamegraphReverse";
pub const ZOOM_KEY: &str = "flamegraphZoom";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewState {
    /// Orientation override; `None` falls back to the user's default.
    pub reverse: Option<bool>,
    /// Search pattern source text.
    pub search: Option<String>,
    /// Frame the graph is zoomed into.
    pub zoom: Option<FrameCoords>,
}

/// Change to one field of the persisted state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Patch<T> {
    #[default]
    Keep,
    Set(T),
    /// Remove the field, restoring its default.
    Clear,
}

impl<T> Patch<T> {
    fn apply(self, field: &mut Option<T>) {
        match self {
            Self::Keep => {}
            Self::Set(value) => *field = Some(value),
            Self::Clear => *field = None,
        }
    }
}

/// A partial update of [`ViewState`]; untouched fields are `Keep`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatePatch {
    pub reverse: Patch<bool>,
    pub search: Patch<String>,
    pub zoom: Patch<FrameCoords>,
}

impl StatePatch {
    pub fn zoom(zoom: Option<FrameCoords>) -> Self {
        Self {
            zoom: zoom.map_or(Patch::Clear, Patch::Set),
            ..Self::default()
        }
    }

    pub fn search(text: Option<String>) -> Self {
        Self {
            search: text.map_or(Patch::Clear, Patch::Set),
            ..Self::default()
        }
    }

    pub fn reverse(reverse: bool) -> Self {
        Self {
            reverse: Patch::Set(reverse),
            ..Self::default()
        }
    }

    pub fn apply_to(self, state: &mut ViewState) {
        self.reverse.apply(&mut state.reverse);
        self.search.apply(&mut state.search);
        self.zoom.apply(&mut state.zoom);
    }
}

/// Read/modify/write access to the host's persisted view state.
pub trait StateStore {
    fn get(&self) -> ViewState;
    fn set(&self, patch: StatePatch);
}

/// Plain in-memory store, for hosts without URL state.
#[derive(Debug, Default)]
pub struct MemoryStore(RefCell<ViewState>);

impl MemoryStore {
    pub fn new(state: ViewState) -> Self {
        Self(RefCell::new(state))
    }
}

impl StateStore for MemoryStore {
    fn get(&self) -> ViewState {
        self.0.borrow().clone()
    }

    fn set(&self, patch: StatePatch) {
        patch.apply_to(&mut self.0.borrow_mut());
    }
}

/// A store backed by query parameters.
///
/// Only the three flame graph keys are interpreted; any other parameter the
/// host keeps there is left untouched.
#[derive(Debug, Default)]
pub struct QueryParams(RefCell<BTreeMap<String, String>>);

impl QueryParams {
    pub fn new(params: BTreeMap<String, String>) -> Self {
        Self(RefCell::new(params))
    }

    pub fn params(&self) -> BTreeMap<String, String> {
        self.0.borrow().clone()
    }
}

impl StateStore for QueryParams {
    fn get(&self) -> ViewState {
        state_from_query(&self.0.borrow())
    }

    fn set(&self, patch: StatePatch) {
        modify_query(&mut self.0.borrow_mut(), patch);
    }
}

/// Decode the view state. Malformed values read as absent.
pub fn state_from_query(params: &BTreeMap<String, String>) -> ViewState {
    ViewState {
        reverse: params.get(REVERSE_KEY).and_then(|v| match v.as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        }),
        search: params.get(QUERY_KEY).filter(|v| !v.is_empty()).cloned(),
        zoom: params.get(ZOOM_KEY).and_then(|v| v.parse().ok()),
    }
}

/// Apply `patch` to the parameters; `Clear` deletes the key.
pub fn modify_query(params: &mut BTreeMap<String, String>, patch: StatePatch) {
    write_field(params, REVERSE_KEY, patch.reverse.map(|r| r.to_string()));
    write_field(params, QUERY_KEY, patch.search);
    write_field(params, ZOOM_KEY, patch.zoom.map(|z| z.to_string()));
}

impl<T> Patch<T> {
    fn map<U>(self, f: impl FnOnce(T) -> U) -> Patch<U> {
        match self {
            Self::Keep => Patch::Keep,
            Self::Set(value) => Patch::Set(f(value)),
            Self::Clear => Patch::Clear,
        }
    }
}

fn write_field(params: &mut BTreeMap<String, String>, key: &str, patch: Patch<String>) {
    match patch {
        Patch::Keep => {}
        Patch::Set(value) => {
            params.insert(key.to_string(), value);
        }
        Patch::Clear => {
            params.remove(key);
        }
    }
}
