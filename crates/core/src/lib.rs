pub mod colors;
pub mod controller;
pub mod events;
pub mod offseter;
pub mod parsers;
pub mod renderer;
pub mod search;
pub mod settings;
pub mod state;
pub mod strings;
pub mod svg;
pub mod theme;

pub use colors::{ColorCache, ColorOptions, ColoredProfile, prerender_colors};
pub use controller::FlamegraphView;
pub use events::{Disposer, EventLoop, EventTarget, HostEvent, Key, KeyPress};
pub use offseter::{FlamegraphOffseter, FrameRect, OffseterOptions};
pub use renderer::{
    ContextMenuPayload, HostElement, HostHandle, HoverLabel, RenderOptions, render_flamegraph,
};
pub use search::{SearchState, compile_pattern};
pub use settings::{FlamegraphConfig, Monospace, Settings, UserSettings};
pub use state::{MemoryStore, Patch, QueryParams, StatePatch, StateStore, ViewState};
pub use strings::{Label, NodeStrings, read_node_strings};
pub use svg::SvgCanvas;
