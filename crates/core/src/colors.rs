//! Per-frame color assignment.
//!
//! Colors are a pure function of the frame's identity and the theme, so one
//! function keeps one color everywhere in the graph. In diff mode the
//! identity also includes a bucketed weight change, and the color encodes
//! that change instead of the name.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use flamecanvas_protocol::{FrameCoords, FrameRecord, ProfileData, Rgba, Theme, ThemeToken};

use crate::theme;

/// Number of color steps on each side of "no change" in diff mode.
pub const DIFF_STEPS: i8 = 10;

/// Stable identity a color is keyed by: the name hash, plus the diff bucket
/// in diff mode.
pub type ColorKey = u64;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColorOptions {
    pub theme: Theme,
    /// Color by weight change against the baseline instead of by name.
    pub is_diff: bool,
}

/// A profile decorated with one resolved color per frame.
///
/// `frame_colors` mirrors `profile.rows` so the paint loop reads a color
/// in O(1) without hashing.
#[derive(Debug)]
pub struct ColoredProfile {
    profile: Arc<ProfileData>,
    options: ColorOptions,
    palette: HashMap<ColorKey, Rgba>,
    frame_colors: Vec<Vec<Rgba>>,
}

impl ColoredProfile {
    pub fn profile(&self) -> &Arc<ProfileData> {
        &self.profile
    }

    pub fn options(&self) -> ColorOptions {
        self.options
    }

    pub fn is_diff(&self) -> bool {
        self.options.is_diff
    }

    pub fn color_of(&self, coords: FrameCoords) -> Option<Rgba> {
        self.frame_colors.get(coords.row)?.get(coords.index).copied()
    }

    pub fn palette(&self) -> &HashMap<ColorKey, Rgba> {
        &self.palette
    }
}

/// Assign a color to every frame of `profile`.
///
/// Runs once per profile load over every frame; its cost is logged.
pub fn prerender_colors(profile: Arc<ProfileData>, options: ColorOptions) -> ColoredProfile {
    let frames = profile.frames_count();
    let _span = tracing::info_span!("prerender_colors", frames).entered();
    let started = Instant::now();

    let diff = options.is_diff.then(|| DiffTotals {
        total: profile.total_weight(),
        base_total: profile.base_total_weight(),
    });
    let name_hashes: Vec<u64> = profile
        .string_table
        .iter()
        .map(|s| hash64(s.as_bytes()))
        .collect();

    let mut palette = HashMap::new();
    let frame_colors = profile
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|frame| {
                    let name_hash = name_hashes
                        .get(frame.text_id as usize)
                        .copied()
                        .unwrap_or_else(|| unresolved_hash(frame.text_id));
                    let bucket = diff.as_ref().map(|totals| diff_bucket(frame, totals));
                    *palette
                        .entry(color_key(name_hash, bucket))
                        .or_insert_with(|| match bucket {
                            Some(bucket) => diff_color(bucket, options.theme),
                            None => name_color(name_hash, options.theme),
                        })
                })
                .collect()
        })
        .collect();

    tracing::info!(
        frames,
        palette = palette.len(),
        diff = diff.is_some(),
        elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
        "prerendered frame colors"
    );

    ColoredProfile {
        profile,
        options,
        palette,
        frame_colors,
    }
}

/// Memoizes [`prerender_colors`] for the last (dataset, options) pair.
/// Dataset identity is the `Arc` allocation, not structural equality.
#[derive(Debug, Default)]
pub struct ColorCache {
    last: Option<Arc<ColoredProfile>>,
    computations: usize,
}

impl ColorCache {
    pub fn get_or_compute(
        &mut self,
        profile: &Arc<ProfileData>,
        options: ColorOptions,
    ) -> Arc<ColoredProfile> {
        if let Some(last) = &self.last
            && Arc::ptr_eq(last.profile(), profile)
            && last.options() == options
        {
            return Arc::clone(last);
        }
        let colored = Arc::new(prerender_colors(Arc::clone(profile), options));
        self.computations += 1;
        self.last = Some(Arc::clone(&colored));
        colored
    }

    /// How many times colors were actually computed.
    pub fn computations(&self) -> usize {
        self.computations
    }
}

struct DiffTotals {
    total: f64,
    base_total: f64,
}

/// Relative change of the frame's share of the graph, from baseline to
/// comparison, clamped to ±100% and quantized to `-DIFF_STEPS..=DIFF_STEPS`.
///
/// A frame absent from the baseline counts as fully grown; one absent from
/// the comparison as fully shrunk.
fn diff_bucket(frame: &FrameRecord, totals: &DiffTotals) -> i8 {
    let share = if totals.total > 0.0 {
        frame.event_count / totals.total
    } else {
        0.0
    };
    let base = frame.base_event_count.unwrap_or(0.0);
    let base_share = if totals.base_total > 0.0 {
        base / totals.base_total
    } else {
        0.0
    };
    let change = if base_share > 0.0 {
        (share - base_share) / base_share
    } else if share > 0.0 {
        1.0
    } else {
        0.0
    };
    (change.clamp(-1.0, 1.0) * f64::from(DIFF_STEPS)).round() as i8
}

fn diff_color(bucket: i8, theme: Theme) -> Rgba {
    let neutral = theme::resolve(ThemeToken::DiffNeutral, theme);
    let extreme = if bucket >= 0 {
        theme::resolve(ThemeToken::DiffGrew, theme)
    } else {
        theme::resolve(ThemeToken::DiffShrank, theme)
    };
    neutral.lerp(extreme, f64::from(bucket.unsigned_abs()) / f64::from(DIFF_STEPS))
}

/// Classic warm flame palette, picked by name hash.
fn name_color(name_hash: u64, theme: Theme) -> Rgba {
    let unit = |shift: u32| ((name_hash >> shift) & 0xff) as f64 / 255.0;
    let (r, g, b) = (205.0 + 50.0 * unit(16), 230.0 * unit(0), 55.0 * unit(8));
    let scale = match theme {
        Theme::Light => 1.0,
        Theme::Dark => 0.78,
    };
    Rgba::rgb(
        (r * scale).round() as u8,
        (g * scale).round() as u8,
        (b * scale).round() as u8,
    )
}

fn color_key(name_hash: u64, bucket: Option<i8>) -> ColorKey {
    let mut h = Fnv1a64::new();
    h.update_u64(name_hash);
    if let Some(bucket) = bucket {
        h.update(&bucket.to_le_bytes());
    }
    h.finish()
}

fn unresolved_hash(text_id: u32) -> u64 {
    let mut h = Fnv1a64::new();
    h.update(b"<unresolved>");
    h.update(&text_id.to_le_bytes());
    h.finish()
}

/// Small deterministic hash for color bucketing. Not cryptographic.
#[derive(Clone, Copy, Debug)]
struct Fnv1a64(u64);

impl Fnv1a64 {
    const OFFSET_BASIS: u64 = 1469598103934665603;
    const PRIME: u64 = 1099511628211;

    fn new() -> Self {
        Self(Self::OFFSET_BASIS)
    }

    fn update(&mut self, bytes: &[u8]) {
        for b in bytes {
            self.0 ^= u64::from(*b);
            self.0 = self.0.wrapping_mul(Self::PRIME);
        }
    }

    fn update_u64(&mut self, value: u64) {
        self.update(&value.to_le_bytes());
    }

    fn finish(self) -> u64 {
        self.0
    }
}

fn hash64(bytes: &[u8]) -> u64 {
    let mut h = Fnv1a64::new();
    h.update(bytes);
    h.finish()
}
