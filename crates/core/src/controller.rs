//! Keeps one renderer mounted in step with data, theme and view state.

use std::rc::Rc;
use std::sync::Arc;

use flamecanvas_protocol::{FrameCoords, ProfileData, Theme};

use crate::colors::{ColorCache, ColorOptions, ColoredProfile};
use crate::events::Disposer;
use crate::offseter::{FlamegraphOffseter, OffseterOptions};
use crate::renderer::{HostHandle, RenderOptions, render_flamegraph};
use crate::search::compile_pattern;
use crate::settings::{FlamegraphConfig, Settings, UserSettings};
use crate::state::{StatePatch, StateStore};

/// Owns the derived data of one flame graph widget.
///
/// Geometry is rebuilt only when the profile, orientation or level height
/// changes. Any change to the render inputs (search, zoom, theme, settings)
/// disposes the mounted renderer and mounts a new one, so at most one
/// renderer listens on the host at a time.
pub struct FlamegraphView {
    host: HostHandle,
    state: Rc<dyn StateStore>,
    user_settings: UserSettings,
    config: FlamegraphConfig,
    theme: Theme,
    is_diff: bool,
    colors: ColorCache,
    profile: Option<Arc<ProfileData>>,
    geometry: Option<Geometry>,
    geometry_builds: usize,
    mounted: Option<MountInputs>,
    disposer: Disposer,
}

struct Geometry {
    profile: Arc<ProfileData>,
    offseter: Arc<FlamegraphOffseter>,
}

/// What the mounted renderer was built from.
struct MountInputs {
    colored: Arc<ColoredProfile>,
    offseter: Arc<FlamegraphOffseter>,
    search: Option<String>,
    zoom: Option<FrameCoords>,
    user_settings: UserSettings,
}

impl MountInputs {
    fn same_as(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.colored, &other.colored)
            && Arc::ptr_eq(&self.offseter, &other.offseter)
            && self.search == other.search
            && self.zoom == other.zoom
            && self.user_settings == other.user_settings
    }
}

impl FlamegraphView {
    pub fn new(host: HostHandle, state: Rc<dyn StateStore>, settings: Settings) -> Self {
        Self {
            host,
            state,
            user_settings: settings.user,
            config: settings.flamegraph,
            theme: Theme::default(),
            is_diff: false,
            colors: ColorCache::default(),
            profile: None,
            geometry: None,
            geometry_builds: 0,
            mounted: None,
            disposer: Disposer::noop(),
        }
    }

    pub fn set_profile(&mut self, profile: Arc<ProfileData>, is_diff: bool) {
        self.profile = Some(profile);
        self.is_diff = is_diff;
        self.sync();
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
        self.sync();
    }

    pub fn set_user_settings(&mut self, settings: UserSettings) {
        self.user_settings = settings;
        self.sync();
    }

    pub fn set_config(&mut self, config: FlamegraphConfig) {
        self.config = config;
        self.sync();
    }

    /// The effective orientation: the view state's, else the user's default.
    pub fn reverse(&self) -> bool {
        self.state
            .get()
            .reverse
            .unwrap_or(self.user_settings.reverse_flame_by_default)
    }

    pub fn toggle_reverse(&mut self) {
        let reverse = !self.reverse();
        self.state.set(StatePatch::reverse(reverse));
        self.sync();
    }

    /// Search for `text`; empty text clears the search.
    pub fn update_search(&mut self, text: &str) {
        let text = (!text.is_empty()).then(|| text.to_string());
        self.state.set(StatePatch::search(text));
        self.sync();
    }

    pub fn reset_search(&mut self) {
        self.state.set(StatePatch::search(None));
        self.sync();
    }

    /// Re-read the view state and bring geometry and the mounted renderer
    /// up to date. Hosts call this after anything may have changed the
    /// state store.
    pub fn sync(&mut self) {
        let Some(profile) = self.profile.clone() else {
            self.unmount();
            return;
        };
        let view = self.state.get();
        let reverse = view.reverse.unwrap_or(self.user_settings.reverse_flame_by_default);
        let offseter = self.geometry_for(&profile, reverse);
        let colored = self.colors.get_or_compute(
            &profile,
            ColorOptions {
                theme: self.theme,
                is_diff: self.is_diff,
            },
        );

        let inputs = MountInputs {
            colored,
            offseter,
            search: view.search,
            zoom: view.zoom,
            user_settings: self.user_settings.clone(),
        };
        if self
            .mounted
            .as_ref()
            .is_some_and(|mounted| mounted.same_as(&inputs))
        {
            return;
        }

        self.disposer.dispose();
        tracing::debug!(
            reverse,
            search = inputs.search.as_deref(),
            zoom = ?inputs.zoom,
            theme = ?self.theme,
            "mounting flame graph renderer"
        );
        self.disposer = render_flamegraph(
            &self.host,
            Arc::clone(&inputs.colored),
            Arc::clone(&inputs.offseter),
            RenderOptions {
                state: Rc::clone(&self.state),
                theme: self.theme,
                user_settings: inputs.user_settings.clone(),
                search_pattern: inputs.search.as_deref().and_then(compile_pattern),
                reverse,
            },
        );
        self.mounted = Some(inputs);
    }

    fn geometry_for(&mut self, profile: &Arc<ProfileData>, reverse: bool) -> Arc<FlamegraphOffseter> {
        let options = OffseterOptions {
            reverse,
            level_height: self.config.level_height.max(1.0),
        };
        if let Some(geometry) = &self.geometry
            && Arc::ptr_eq(&geometry.profile, profile)
            && geometry.offseter.options() == options
        {
            return Arc::clone(&geometry.offseter);
        }

        let offseter = Arc::new(FlamegraphOffseter::new(profile, options));
        self.geometry_builds += 1;
        tracing::debug!(builds = self.geometry_builds, reverse, "rebuilt flame graph geometry");
        self.geometry = Some(Geometry {
            profile: Arc::clone(profile),
            offseter: Arc::clone(&offseter),
        });
        offseter
    }

    /// Dispose the mounted renderer, if any. The next [`sync`](Self::sync)
    /// mounts again.
    pub fn unmount(&mut self) {
        self.disposer.dispose();
        self.mounted = None;
    }

    pub fn is_mounted(&self) -> bool {
        !self.disposer.is_disposed()
    }

    /// "Showing N frames".
    pub fn frames_count(&self) -> usize {
        self.profile.as_deref().map_or(0, ProfileData::frames_count)
    }

    /// How many times geometry has been built.
    pub fn geometry_builds(&self) -> usize {
        self.geometry_builds
    }

    /// How many times colors have been computed.
    pub fn color_computations(&self) -> usize {
        self.colors.computations()
    }

    pub fn geometry(&self) -> Option<&Arc<FlamegraphOffseter>> {
        self.geometry.as_ref().map(|g| &g.offseter)
    }
}
