//! Mount/dispose discipline of the renderer, and the controller driving it
//! through query-parameter state.

use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::Arc;

use flamecanvas_core::state::{QUERY_KEY, ZOOM_KEY};
use flamecanvas_core::{
    ColorOptions, EventLoop, EventTarget, FlamegraphOffseter, FlamegraphView, HostEvent,
    HostHandle, Key, KeyPress, MemoryStore, OffseterOptions, QueryParams, RenderOptions, Settings,
    StateStore, SvgCanvas, UserSettings, prerender_colors, render_flamegraph,
};
use flamecanvas_protocol::{FrameCoords, Point, ProfileData, Theme};

fn profile() -> Arc<ProfileData> {
    Arc::new(flamecanvas_core::parsers::json::parse_json(include_bytes!("fixtures/scenario.json")).unwrap())
}

fn mount(host: &HostHandle, profile: &Arc<ProfileData>) -> flamecanvas_core::Disposer {
    render_flamegraph(
        host,
        Arc::new(prerender_colors(Arc::clone(profile), ColorOptions::default())),
        Arc::new(FlamegraphOffseter::new(
            profile,
            OffseterOptions {
                reverse: false,
                level_height: 20.0,
            },
        )),
        RenderOptions {
            state: Rc::new(MemoryStore::default()),
            theme: Theme::Light,
            user_settings: UserSettings::default(),
            search_pattern: None,
            reverse: false,
        },
    )
}

#[test]
fn undisposed_mounts_leak_until_every_one_is_disposed() {
    let canvas = Rc::new(SvgCanvas::new(100.0, 60.0));
    let events = EventLoop::new();
    let host = HostHandle::new(canvas.clone(), Rc::clone(&events));
    let profile = profile();

    let mut first = mount(&host, &profile);
    let per_mount = events.listener_count();
    assert!(per_mount > 0);
    assert_eq!(events.listener_count_for(EventTarget::Document), 3);

    let mut second = mount(&host, &profile);
    assert_eq!(events.listener_count(), 2 * per_mount);

    // Both mounts react to the same pointer move.
    events.dispatch(EventTarget::Canvas, HostEvent::PointerMove(Point::new(70.0, 25.0)));
    assert_eq!(events.pending_frames(), 2);

    second.dispose();
    assert_eq!(events.listener_count(), per_mount);
    assert_eq!(events.pending_frames(), 1);

    first.dispose();
    assert_eq!(events.listener_count(), 0);
    assert_eq!(events.pending_frames(), 0);
}

#[test]
fn dropping_the_disposer_also_releases() {
    let canvas = Rc::new(SvgCanvas::new(100.0, 60.0));
    let events = EventLoop::new();
    let host = HostHandle::new(canvas.clone(), Rc::clone(&events));
    drop(mount(&host, &profile()));
    assert_eq!(events.listener_count(), 0);
}

#[test]
fn detached_canvas_gets_a_noop_disposer() {
    let canvas = Rc::new(SvgCanvas::new(100.0, 60.0));
    canvas.detach();
    let events = EventLoop::new();
    let disposer = mount(&HostHandle::new(canvas.clone(), Rc::clone(&events)), &profile());
    assert!(disposer.is_disposed());
    assert_eq!(canvas.paints(), 0);
    assert_eq!(events.listener_count(), 0);
}

#[test]
fn controller_keeps_geometry_across_search_changes() {
    let canvas = Rc::new(SvgCanvas::new(100.0, 60.0));
    let events = EventLoop::new();
    let store = Rc::new(QueryParams::default());
    let mut view = FlamegraphView::new(
        HostHandle::new(canvas.clone(), Rc::clone(&events)),
        store.clone(),
        Settings::default(),
    );
    view.set_profile(profile(), false);
    let mounted = events.listener_count();

    for text in ["A", "^B$", "C|D", ""] {
        view.update_search(text);
        assert_eq!(events.listener_count(), mounted, "one live renderer after {text:?}");
    }
    assert_eq!(view.geometry_builds(), 1);
    assert_eq!(view.frames_count(), 4);

    view.toggle_reverse();
    assert_eq!(view.geometry_builds(), 2);
    view.toggle_reverse();
    assert_eq!(view.geometry_builds(), 3);
    assert_eq!(events.listener_count(), mounted);
}

#[test]
fn zoom_and_search_round_trip_through_query_params() {
    let canvas = Rc::new(SvgCanvas::new(100.0, 60.0));
    let events = EventLoop::new();
    let store = Rc::new(QueryParams::new(BTreeMap::from([(
        QUERY_KEY.to_string(),
        "D".to_string(),
    )])));
    let mut view = FlamegraphView::new(
        HostHandle::new(canvas.clone(), Rc::clone(&events)),
        store.clone(),
        Settings::default(),
    );
    view.set_profile(profile(), false);
    assert_eq!(canvas.match_summary(), Some(1));

    events.dispatch(EventTarget::Canvas, HostEvent::Click(Point::new(70.0, 25.0)));
    assert_eq!(store.params().get(ZOOM_KEY).map(String::as_str), Some("1:1"));
    view.sync();
    assert_eq!(store.get().zoom, Some(FrameCoords::new(1, 1)));
    // Remounted from state: C now spans the canvas.
    let c_hit = events.dispatch(EventTarget::Canvas, HostEvent::PointerMove(Point::new(5.0, 25.0)));
    assert_eq!(c_hit, 1);
    assert_eq!(canvas.label().coords, Some(FrameCoords::new(1, 1)));

    events.dispatch(
        EventTarget::Document,
        HostEvent::KeyDown(KeyPress::plain(Key::Escape)),
    );
    assert!(!store.params().contains_key(QUERY_KEY));
    view.sync();
    assert_eq!(canvas.match_summary(), None);
}
