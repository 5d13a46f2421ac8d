//! The paint pass and pointer interactions of a mounted flame graph.
//!
//! [`render_flamegraph`] mounts onto a host: it paints once, installs its
//! listeners on the host's [`EventLoop`], and hands back a [`Disposer`] that
//! takes them down again. Everything after the first paint is event driven.
//! Repaints go through a single pending animation frame, so a burst of
//! pointer moves costs one paint.

use std::cell::{Cell, RefCell};
use std::fmt::Write as _;
use std::rc::{Rc, Weak};
use std::sync::Arc;

use flamecanvas_protocol::{
    FontFamily, FrameCoords, Point, ProfileData, Rect, RenderCommand, SharedStr, Theme, ThemeToken,
    Viewport,
};
use regex::Regex;
use serde::Serialize;

use crate::colors::ColoredProfile;
use crate::events::{
    Disposer, EventKind, EventLoop, EventTarget, FrameHandle, HostEvent, Key, KeyPress, ListenerId,
};
use crate::offseter::FlamegraphOffseter;
use crate::search::SearchState;
use crate::settings::UserSettings;
use crate::state::{StatePatch, StateStore};
use crate::strings::{self, Label, NodeStrings};
use crate::theme;

/// Frames narrower than this (in canvas pixels) get no text label.
pub const LABEL_MIN_WIDTH: f64 = 24.0;
/// Advance of one label glyph; labels are monospace.
pub const GLYPH_WIDTH: f64 = 7.0;
pub const LABEL_PADDING: f64 = 3.0;
pub const FONT_SIZE: f64 = 12.0;
/// Opacity of frames that do not match the active search.
pub const DIM_ALPHA: f64 = 0.35;
/// Distance between the pointer and the hover label.
pub const LABEL_OFFSET: f64 = 12.0;
/// Every frame gets at least this much width on screen.
pub const MIN_FRAME_WIDTH: f64 = 1.0;

/// What the renderer needs from the element it is mounted on.
///
/// All methods take `&self`; hosts keep their own interior mutability.
/// None of them may dispatch events back into the loop synchronously.
pub trait HostElement {
    /// `false` once the element has been removed from its document.
    fn is_attached(&self) -> bool;
    /// Canvas size in pixels; `y` is the vertical scroll offset.
    fn viewport(&self) -> Viewport;
    fn paint(&self, commands: &[RenderCommand]);
    fn update_label(&self, label: &HoverLabel);
    /// `Some(n)` shows "Matched: n frames"; `None` hides the summary.
    fn set_match_summary(&self, matched: Option<usize>);
    fn show_context_menu(&self, payload: ContextMenuPayload);
    fn open_search(&self);
}

/// A host element together with the event loop that feeds it.
#[derive(Clone)]
pub struct HostHandle {
    element: Rc<dyn HostElement>,
    events: Rc<EventLoop>,
}

impl HostHandle {
    pub fn new(element: Rc<dyn HostElement>, events: Rc<EventLoop>) -> Self {
        Self { element, events }
    }

    pub fn element(&self) -> &Rc<dyn HostElement> {
        &self.element
    }

    pub fn events(&self) -> &Rc<EventLoop> {
        &self.events
    }
}

impl std::fmt::Debug for HostHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostHandle")
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}

/// The tooltip that follows the pointer. One instance lives as long as the
/// renderer; hovering rewrites it in place and leaving hides it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HoverLabel {
    pub visible: bool,
    pub position: Point,
    pub text: String,
    pub coords: Option<FrameCoords>,
}

/// Sent to the host on a right click over a frame.
///
/// `offset` is `[x, -y]` of the click in canvas pixels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextMenuPayload {
    pub offset: [f64; 2],
    pub node: NodeStrings,
}

/// Everything a mount depends on besides the data and its geometry.
pub struct RenderOptions {
    /// Bridge to the host-owned view state (zoom and search).
    pub state: Rc<dyn StateStore>,
    pub theme: Theme,
    pub user_settings: UserSettings,
    pub search_pattern: Option<Regex>,
    /// Must match the orientation the geometry was built with.
    pub reverse: bool,
}

/// The horizontal slice of the graph mapped onto the canvas, in weight
/// units.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Window {
    start: f64,
    width: f64,
    focus: Option<FrameCoords>,
}

impl Window {
    fn full(offseter: &FlamegraphOffseter) -> Self {
        Self {
            start: 0.0,
            width: offseter.total_width(),
            focus: None,
        }
    }

    fn end(&self) -> f64 {
        self.start + self.width
    }
}

/// Mount a flame graph on `host`.
///
/// `offseter` must have been built from `colored`'s profile with
/// `options.reverse`; a mismatch, or a detached element, mounts nothing and
/// returns a no-op disposer. Mounting twice on one element without disposing
/// the first mount leaves both listening.
pub fn render_flamegraph(
    host: &HostHandle,
    colored: Arc<ColoredProfile>,
    offseter: Arc<FlamegraphOffseter>,
    options: RenderOptions,
) -> Disposer {
    if !host.element.is_attached() {
        tracing::warn!("flame graph host is detached, nothing mounted");
        return Disposer::noop();
    }
    if !geometry_matches(&colored, &offseter, options.reverse) {
        tracing::warn!(
            rows = colored.profile().rows.len(),
            geometry_rows = offseter.row_count(),
            reverse = options.reverse,
            geometry_reverse = offseter.reverse(),
            "geometry was built from different data, nothing mounted"
        );
        return Disposer::noop();
    }

    let search = SearchState::new(colored.profile(), options.search_pattern.as_ref());
    let mut window = Window::full(&offseter);
    if let Some(zoom) = options.state.get().zoom {
        match offseter.rect_of(zoom) {
            Some(rect) if rect.width > 0.0 => {
                window = Window {
                    start: rect.x,
                    width: rect.width,
                    focus: Some(zoom),
                };
            }
            _ => tracing::debug!(%zoom, "ignoring zoom to a frame that does not exist"),
        }
    }

    let events = Rc::clone(&host.events);
    let session = Rc::new_cyclic(|this| Session {
        this: this.clone(),
        element: Rc::clone(&host.element),
        events: Rc::downgrade(&events),
        colored,
        offseter,
        search,
        state: options.state,
        theme: options.theme,
        font: options.user_settings.monospace.font_family(),
        window: Cell::new(window),
        hover: RefCell::new(HoverLabel::default()),
        pending_frame: Cell::new(None),
    });

    session.element.set_match_summary(
        session
            .search
            .is_active()
            .then(|| session.search.matched_count()),
    );
    session.paint();

    let ids: Vec<ListenerId> = [
        (EventTarget::Canvas, EventKind::PointerMove),
        (EventTarget::Canvas, EventKind::PointerLeave),
        (EventTarget::Canvas, EventKind::Click),
        (EventTarget::Canvas, EventKind::ContextMenu),
        (EventTarget::Document, EventKind::KeyDown),
        (EventTarget::Document, EventKind::Scroll),
        (EventTarget::Document, EventKind::Resize),
    ]
    .into_iter()
    .map(|(target, kind)| {
        let session = Rc::clone(&session);
        events.add_listener(target, kind, Rc::new(move |event: &HostEvent| session.handle(event)))
    })
    .collect();

    let weak_events = Rc::downgrade(&events);
    Disposer::new(move || {
        if let Some(events) = weak_events.upgrade() {
            for id in &ids {
                events.remove_listener(*id);
            }
            if let Some(frame) = session.pending_frame.take() {
                events.cancel_animation_frame(frame);
            }
        }
        tracing::debug!(listeners = ids.len(), "disposed flame graph renderer");
    })
}

fn geometry_matches(colored: &ColoredProfile, offseter: &FlamegraphOffseter, reverse: bool) -> bool {
    let rows = &colored.profile().rows;
    offseter.reverse() == reverse
        && offseter.row_count() == rows.len()
        && rows
            .iter()
            .enumerate()
            .all(|(row, frames)| offseter.row(row).len() == frames.len())
}

struct Session {
    this: Weak<Session>,
    element: Rc<dyn HostElement>,
    events: Weak<EventLoop>,
    colored: Arc<ColoredProfile>,
    offseter: Arc<FlamegraphOffseter>,
    search: SearchState,
    state: Rc<dyn StateStore>,
    theme: Theme,
    font: FontFamily,
    window: Cell<Window>,
    hover: RefCell<HoverLabel>,
    pending_frame: Cell<Option<FrameHandle>>,
}

impl Session {
    fn handle(&self, event: &HostEvent) {
        match *event {
            HostEvent::PointerMove(point) => self.on_pointer_move(point),
            HostEvent::PointerLeave => self.on_pointer_leave(),
            HostEvent::Click(point) => self.on_click(point),
            HostEvent::ContextMenu(point) => self.on_context_menu(point),
            HostEvent::KeyDown(key) => self.on_key(key),
            HostEvent::Scroll | HostEvent::Resize => self.schedule_paint(),
        }
    }

    /// Canvas pixel to the frame under it.
    fn frame_at(&self, point: Point) -> Option<FrameCoords> {
        let vp = self.element.viewport();
        if vp.width <= 0.0 || point.x < 0.0 || point.x >= vp.width {
            return None;
        }
        let window = self.window.get();
        let x = window.start + point.x / vp.width * window.width;
        self.offseter.get_coords_by_position(x, point.y + vp.y)
    }

    fn on_pointer_move(&self, point: Point) {
        let coords = self.frame_at(point);
        let changed = {
            let mut hover = self.hover.borrow_mut();
            let changed = hover.coords != coords;
            match coords {
                Some(coords) => {
                    if changed {
                        hover.text.clear();
                        write_tooltip(
                            &mut hover.text,
                            self.colored.profile(),
                            coords,
                            self.colored.is_diff(),
                        );
                    }
                    hover.visible = true;
                    hover.position = Point::new(point.x + LABEL_OFFSET, point.y + LABEL_OFFSET);
                    hover.coords = Some(coords);
                }
                None => {
                    hover.visible = false;
                    hover.coords = None;
                }
            }
            self.element.update_label(&hover);
            changed
        };
        if changed {
            self.schedule_paint();
        }
    }

    fn on_pointer_leave(&self) {
        let had_frame = {
            let mut hover = self.hover.borrow_mut();
            let had_frame = hover.coords.take().is_some();
            hover.visible = false;
            self.element.update_label(&hover);
            had_frame
        };
        if had_frame {
            self.schedule_paint();
        }
    }

    /// Zoom into the clicked frame. Clicking the root or the frame already
    /// zoomed into goes back to the whole graph.
    fn on_click(&self, point: Point) {
        let Some(coords) = self.frame_at(point) else {
            return;
        };
        let current = self.window.get();
        let next = if coords.row == 0 || current.focus == Some(coords) {
            Window::full(&self.offseter)
        } else {
            match self.offseter.rect_of(coords) {
                Some(rect) if rect.width > 0.0 => Window {
                    start: rect.x,
                    width: rect.width,
                    focus: Some(coords),
                },
                _ => return,
            }
        };
        if next == current {
            return;
        }
        tracing::debug!(zoom = ?next.focus, "zoom changed");
        self.window.set(next);
        self.state.set(StatePatch::zoom(next.focus));
        self.schedule_paint();
    }

    fn on_context_menu(&self, point: Point) {
        let Some(coords) = self.frame_at(point) else {
            return;
        };
        if let Some(node) = strings::read_node_strings(self.colored.profile(), coords) {
            self.element.show_context_menu(ContextMenuPayload {
                offset: [point.x, -point.y],
                node,
            });
        }
    }

    fn on_key(&self, key: KeyPress) {
        match key.key {
            Key::Char('f' | 'F') if key.has_command_modifier() => self.element.open_search(),
            Key::Escape => self.state.set(StatePatch::search(None)),
            _ => {}
        }
    }

    fn schedule_paint(&self) {
        let Some(events) = self.events.upgrade() else {
            return;
        };
        if self.pending_frame.get().is_some() {
            return;
        }
        let this = self.this.clone();
        let handle = events.request_animation_frame(Box::new(move || {
            if let Some(session) = this.upgrade() {
                session.pending_frame.set(None);
                session.paint();
            }
        }));
        self.pending_frame.set(Some(handle));
    }

    fn paint(&self) {
        let vp = self.element.viewport();
        let commands = self.paint_commands(&vp);
        tracing::trace!(commands = commands.len(), "painted flame graph");
        self.element.paint(&commands);
    }

    fn paint_commands(&self, vp: &Viewport) -> Vec<RenderCommand> {
        let mut commands = vec![RenderCommand::Clear {
            color: theme::resolve(ThemeToken::Background, self.theme),
        }];
        let window = self.window.get();
        if window.width <= 0.0 || vp.width <= 0.0 {
            return commands;
        }

        let scale = vp.width / window.width;
        let border = theme::resolve(ThemeToken::FrameBorder, self.theme);
        let outline = theme::resolve(ThemeToken::HoverOutline, self.theme);
        let text_color = theme::resolve(ThemeToken::FrameText, self.theme);
        let fallback = theme::resolve(ThemeToken::DiffNeutral, self.theme);
        let hovered = self.hover.borrow().coords;
        let profile = self.colored.profile();

        for row in self.offseter.rows_in_band(vp.y, vp.y + vp.height) {
            for rect in self
                .offseter
                .frames_in_span(row, window.start, window.end())
            {
                let coords = rect.coords();
                let left = ((rect.x - window.start) * scale).max(0.0);
                let right = ((rect.right() - window.start) * scale).min(vp.width);
                let width = (right - left).max(MIN_FRAME_WIDTH);
                let top = rect.y - vp.y;

                let matched = self.search.is_matched(coords);
                let fill = self.colored.color_of(coords).unwrap_or(fallback);
                let (fill, text) = if matched {
                    (fill, text_color)
                } else {
                    (fill.with_alpha(DIM_ALPHA), text_color.with_alpha(DIM_ALPHA))
                };
                commands.push(RenderCommand::DrawRect {
                    rect: Rect::new(left, top, width, rect.height),
                    fill,
                    border: Some(if hovered == Some(coords) { outline } else { border }),
                    frame: Some(coords),
                });

                if width < LABEL_MIN_WIDTH {
                    continue;
                }
                let room = width - 2.0 * LABEL_PADDING;
                let Some(name) = strings::frame_name(profile, coords) else {
                    continue;
                };
                if let Some(label) = fit_label(&name, room) {
                    commands.push(RenderCommand::DrawText {
                        position: Point::new(left + LABEL_PADDING, top + rect.height * 0.7),
                        text: label,
                        color: text,
                        font_size: FONT_SIZE,
                        font: self.font,
                        max_width: room,
                    });
                }
            }
        }
        commands
    }
}

/// The label that fits into `room` pixels: the whole name, or a prefix
/// ending in an ellipsis. `None` when not even that fits.
pub fn fit_label(name: &Label, room: f64) -> Option<SharedStr> {
    let max_chars = (room / GLYPH_WIDTH).floor().max(0.0) as usize;
    if let Label::Resolved(s) = name
        && s.chars().count() <= max_chars
    {
        return Some(s.clone());
    }
    let full = name.to_string();
    if full.chars().count() <= max_chars {
        return Some(full.into());
    }
    if max_chars < 2 {
        return None;
    }
    let mut truncated: String = full.chars().take(max_chars - 1).collect();
    truncated.push('…');
    Some(truncated.into())
}

/// Name, weight and share of the total; in diff mode also the baseline share
/// and the change between the two.
pub fn tooltip_text(profile: &ProfileData, coords: FrameCoords, is_diff: bool) -> Option<String> {
    profile.frame(coords)?;
    let mut text = String::new();
    write_tooltip(&mut text, profile, coords, is_diff);
    Some(text)
}

fn write_tooltip(out: &mut String, profile: &ProfileData, coords: FrameCoords, is_diff: bool) {
    let Some(node) = strings::read_node_strings(profile, coords) else {
        return;
    };
    let share = percent(node.event_count, profile.total_weight());
    let _ = write!(
        out,
        "{} | {} samples ({share:.2}%)",
        node.name,
        format_weight(node.event_count)
    );
    if is_diff {
        let base = node.base_event_count.unwrap_or(0.0);
        let base_share = percent(base, profile.base_total_weight());
        let _ = write!(
            out,
            " | baseline {} ({base_share:.2}%) | {:+.2}%",
            format_weight(base),
            share - base_share
        );
    }
}

fn percent(part: f64, total: f64) -> f64 {
    if total > 0.0 { part / total * 100.0 } else { 0.0 }
}

fn format_weight(weight: f64) -> String {
    if weight.fract() == 0.0 {
        format!("{weight:.0}")
    } else {
        format!("{weight:.2}")
    }
}

impl std::fmt::Debug for RenderOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderOptions")
            .field("theme", &self.theme)
            .field("user_settings", &self.user_settings)
            .field("search_pattern", &self.search_pattern.as_ref().map(Regex::as_str))
            .field("reverse", &self.reverse)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colors::{ColorOptions, prerender_colors};
    use crate::offseter::OffseterOptions;
    use crate::state::{MemoryStore, ViewState};
    use flamecanvas_protocol::{FrameRecord, Rgba};

    #[derive(Default)]
    struct TestHost {
        detached: bool,
        viewport: Cell<Option<Viewport>>,
        paints: RefCell<Vec<Vec<RenderCommand>>>,
        label: RefCell<HoverLabel>,
        summary: Cell<Option<usize>>,
        menus: RefCell<Vec<ContextMenuPayload>>,
        searches: Cell<usize>,
    }

    impl HostElement for TestHost {
        fn is_attached(&self) -> bool {
            !self.detached
        }
        fn viewport(&self) -> Viewport {
            self.viewport.get().unwrap_or(Viewport::sized(100.0, 60.0))
        }
        fn paint(&self, commands: &[RenderCommand]) {
            self.paints.borrow_mut().push(commands.to_vec());
        }
        fn update_label(&self, label: &HoverLabel) {
            *self.label.borrow_mut() = label.clone();
        }
        fn set_match_summary(&self, matched: Option<usize>) {
            self.summary.set(matched);
        }
        fn show_context_menu(&self, payload: ContextMenuPayload) {
            self.menus.borrow_mut().push(payload);
        }
        fn open_search(&self) {
            self.searches.set(self.searches.get() + 1);
        }
    }

    fn profile() -> Arc<ProfileData> {
        Arc::new(ProfileData::new(
            vec![
                vec![FrameRecord::new(0, 0.0, 100.0)],
                vec![FrameRecord::new(1, 0.0, 60.0), FrameRecord::new(2, 60.0, 40.0)],
                vec![FrameRecord::new(3, 0.0, 60.0)],
            ],
            ["A", "B", "C", "D"].into_iter().map(SharedStr::from).collect(),
        ))
    }

    struct Mounted {
        host: Rc<TestHost>,
        events: Rc<EventLoop>,
        store: Rc<MemoryStore>,
        disposer: Disposer,
    }

    fn mount(state: ViewState, search: Option<&str>) -> Mounted {
        let host = Rc::new(TestHost::default());
        let events = EventLoop::new();
        let store = Rc::new(MemoryStore::new(state));
        let profile = profile();
        let colored = Arc::new(prerender_colors(Arc::clone(&profile), ColorOptions::default()));
        let offseter = Arc::new(FlamegraphOffseter::new(
            &profile,
            OffseterOptions {
                reverse: false,
                level_height: 20.0,
            },
        ));
        let handle = HostHandle::new(host.clone(), Rc::clone(&events));
        let disposer = render_flamegraph(
            &handle,
            colored,
            offseter,
            RenderOptions {
                state: store.clone(),
                theme: Theme::Light,
                user_settings: UserSettings::default(),
                search_pattern: search.and_then(|s| Regex::new(s).ok()),
                reverse: false,
            },
        );
        Mounted {
            host,
            events,
            store,
            disposer,
        }
    }

    fn rects(commands: &[RenderCommand]) -> Vec<(FrameCoords, Rect, Rgba, Option<Rgba>)> {
        commands
            .iter()
            .filter_map(|c| match c {
                RenderCommand::DrawRect {
                    rect,
                    fill,
                    border,
                    frame: Some(frame),
                } => Some((*frame, *rect, *fill, *border)),
                _ => None,
            })
            .collect()
    }

    fn last_paint(host: &TestHost) -> Vec<RenderCommand> {
        host.paints.borrow().last().cloned().unwrap_or_default()
    }

    #[test]
    fn paints_every_frame_on_mount() {
        let m = mount(ViewState::default(), None);
        let paint = last_paint(&m.host);
        assert!(matches!(paint.first(), Some(RenderCommand::Clear { .. })));
        let drawn = rects(&paint);
        assert_eq!(drawn.len(), 4);
        assert_eq!(drawn[2].1, Rect::new(60.0, 20.0, 40.0, 20.0));
        assert_eq!(m.host.summary.get(), None);
    }

    #[test]
    fn labels_skip_narrow_frames() {
        let m = mount(ViewState::default(), None);
        m.host.viewport.set(Some(Viewport::sized(50.0, 60.0)));
        m.events.dispatch(EventTarget::Document, HostEvent::Resize);
        m.events.run_animation_frames();
        let paint = last_paint(&m.host);
        let texts: Vec<_> = paint
            .iter()
            .filter_map(|c| match c {
                RenderCommand::DrawText { text, .. } => Some(text.to_string()),
                _ => None,
            })
            .collect();
        // C is 20px wide on a 50px canvas.
        assert_eq!(texts, vec!["A", "B", "D"]);
    }

    #[test]
    fn unmatched_frames_are_dimmed_not_removed() {
        let m = mount(ViewState::default(), Some("^C$"));
        let drawn = rects(&last_paint(&m.host));
        assert_eq!(drawn.len(), 4);
        for (coords, _, fill, _) in drawn {
            let expected = if coords == FrameCoords::new(1, 1) { 255 } else { 89 };
            assert_eq!(fill.a, expected, "{coords}");
        }
        assert_eq!(m.host.summary.get(), Some(1));
    }

    #[test]
    fn hover_shows_and_hides_the_label() {
        let m = mount(ViewState::default(), None);
        m.events.dispatch(EventTarget::Canvas, HostEvent::PointerMove(Point::new(70.0, 25.0)));
        {
            let label = m.host.label.borrow();
            assert!(label.visible);
            assert_eq!(label.coords, Some(FrameCoords::new(1, 1)));
            assert!(label.text.starts_with("C | 40 samples (40.00%)"), "{}", label.text);
            assert_eq!(label.position, Point::new(82.0, 37.0));
        }
        assert_eq!(m.events.run_animation_frames(), 1);
        let outlined = rects(&last_paint(&m.host))
            .into_iter()
            .find(|(coords, ..)| *coords == FrameCoords::new(1, 1))
            .and_then(|(_, _, _, border)| border);
        assert_eq!(outlined, Some(theme::resolve(ThemeToken::HoverOutline, Theme::Light)));

        m.events.dispatch(EventTarget::Canvas, HostEvent::PointerMove(Point::new(70.0, 45.0)));
        assert!(!m.host.label.borrow().visible);
        m.events.dispatch(EventTarget::Canvas, HostEvent::PointerLeave);
        assert!(!m.host.label.borrow().visible);
    }

    #[test]
    fn pointer_moves_coalesce_into_one_paint() {
        let m = mount(ViewState::default(), None);
        let before = m.host.paints.borrow().len();
        for x in [5.0, 65.0, 10.0, 70.0] {
            m.events.dispatch(EventTarget::Canvas, HostEvent::PointerMove(Point::new(x, 25.0)));
        }
        assert_eq!(m.events.pending_frames(), 1);
        m.events.run_animation_frames();
        assert_eq!(m.host.paints.borrow().len(), before + 1);
    }

    #[test]
    fn click_zooms_and_persists() {
        let m = mount(ViewState::default(), None);
        m.events.dispatch(EventTarget::Canvas, HostEvent::Click(Point::new(70.0, 25.0)));
        assert_eq!(m.store.get().zoom, Some(FrameCoords::new(1, 1)));
        m.events.run_animation_frames();
        let drawn = rects(&last_paint(&m.host));
        let c = drawn.iter().find(|(coords, ..)| *coords == FrameCoords::new(1, 1));
        assert_eq!(c.map(|d| d.1), Some(Rect::new(0.0, 20.0, 100.0, 20.0)));
        // B and D fall outside the zoomed window.
        assert!(drawn.iter().all(|(coords, ..)| coords.index == 0 || *coords == FrameCoords::new(1, 1)));
        assert_eq!(drawn.len(), 2);

        m.events.dispatch(EventTarget::Canvas, HostEvent::Click(Point::new(50.0, 5.0)));
        assert_eq!(m.store.get().zoom, None);
    }

    #[test]
    fn zoom_is_restored_from_state() {
        let m = mount(
            ViewState {
                zoom: Some(FrameCoords::new(1, 0)),
                ..ViewState::default()
            },
            None,
        );
        let drawn = rects(&last_paint(&m.host));
        let b = drawn.iter().find(|(coords, ..)| *coords == FrameCoords::new(1, 0));
        assert_eq!(b.map(|d| d.1), Some(Rect::new(0.0, 20.0, 100.0, 20.0)));
    }

    #[test]
    fn context_menu_flips_y() {
        let m = mount(ViewState::default(), None);
        m.events.dispatch(EventTarget::Canvas, HostEvent::ContextMenu(Point::new(10.0, 45.0)));
        m.events.dispatch(EventTarget::Canvas, HostEvent::ContextMenu(Point::new(80.0, 45.0)));
        let menus = m.host.menus.borrow();
        assert_eq!(menus.len(), 1);
        assert_eq!(menus[0].offset, [10.0, -45.0]);
        assert_eq!(menus[0].node.name.as_str(), Some("D"));
    }

    #[test]
    fn keys_open_and_clear_search() {
        let m = mount(
            ViewState {
                search: Some("B".into()),
                ..ViewState::default()
            },
            Some("B"),
        );
        m.events.dispatch(
            EventTarget::Document,
            HostEvent::KeyDown(KeyPress::ctrl(Key::Char('f'))),
        );
        m.events.dispatch(
            EventTarget::Document,
            HostEvent::KeyDown(KeyPress::plain(Key::Char('f'))),
        );
        assert_eq!(m.host.searches.get(), 1);
        m.events.dispatch(
            EventTarget::Document,
            HostEvent::KeyDown(KeyPress::plain(Key::Escape)),
        );
        assert_eq!(m.store.get().search, None);
    }

    #[test]
    fn dispose_removes_listeners_and_pending_frame() {
        let mut m = mount(ViewState::default(), None);
        assert_eq!(m.events.listener_count(), 7);
        m.events.dispatch(EventTarget::Document, HostEvent::Scroll);
        assert_eq!(m.events.pending_frames(), 1);
        m.disposer.dispose();
        assert_eq!(m.events.listener_count(), 0);
        assert_eq!(m.events.pending_frames(), 0);
    }

    #[test]
    fn detached_host_mounts_nothing() {
        let host = Rc::new(TestHost {
            detached: true,
            ..TestHost::default()
        });
        let events = EventLoop::new();
        let profile = profile();
        let colored = Arc::new(prerender_colors(Arc::clone(&profile), ColorOptions::default()));
        let offseter = Arc::new(FlamegraphOffseter::new(
            &profile,
            OffseterOptions {
                reverse: false,
                level_height: 20.0,
            },
        ));
        let disposer = render_flamegraph(
            &HostHandle::new(host.clone(), Rc::clone(&events)),
            colored,
            offseter,
            RenderOptions {
                state: Rc::new(MemoryStore::default()),
                theme: Theme::Light,
                user_settings: UserSettings::default(),
                search_pattern: None,
                reverse: false,
            },
        );
        assert!(disposer.is_disposed());
        assert_eq!(events.listener_count(), 0);
        assert!(host.paints.borrow().is_empty());
    }

    #[test]
    fn fit_label_truncates_or_omits() {
        let name = Label::Resolved("std::collections::HashMap".into());
        assert_eq!(fit_label(&name, 500.0).as_deref(), Some("std::collections::HashMap"));
        assert_eq!(fit_label(&name, 35.0).as_deref(), Some("std:…"));
        assert_eq!(fit_label(&name, 10.0), None);
        assert_eq!(
            fit_label(&Label::Unresolved(7), 500.0).as_deref(),
            Some("<unresolved #7>")
        );
    }

    #[test]
    fn tooltip_in_diff_mode_shows_baseline() {
        let profile = ProfileData::new(
            vec![
                vec![FrameRecord::new(0, 0.0, 100.0).with_base(50.0)],
                vec![FrameRecord::new(1, 0.0, 50.0).with_base(10.0)],
            ],
            ["all", "grow"].into_iter().map(SharedStr::from).collect(),
        );
        let text = tooltip_text(&profile, FrameCoords::new(1, 0), true).unwrap_or_default();
        assert_eq!(text, "grow | 50 samples (50.00%) | baseline 10 (20.00%) | +30.00%");
        assert!(tooltip_text(&profile, FrameCoords::new(4, 0), true).is_none());
    }
}
