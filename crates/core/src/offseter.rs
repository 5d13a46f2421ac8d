//! Geometry engine: frame rows to rectangles, and points back to frames.
//!
//! Horizontal coordinates are weight units (one unit per sample), vertical
//! coordinates are pixels. Mapping weight units onto a canvas of a given
//! width, and zooming, is the renderer's job; the geometry never changes
//! for either.

use std::ops::Range;
use std::time::Instant;

use flamecanvas_protocol::{FrameCoords, ProfileData};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OffseterOptions {
    /// Root at the bottom (icicle layout) instead of the top.
    pub reverse: bool,
    /// Height of one row, in pixels.
    pub level_height: f64,
}

/// A frame's rectangle: `x`/`width` in weight units, `y`/`height` in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub row: usize,
    pub index: usize,
}

impl FrameRect {
    pub fn coords(&self) -> FrameCoords {
        FrameCoords::new(self.row, self.index)
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }
}

/// Immutable spatial index over one profile in one orientation.
///
/// Built in O(frames); [`rect_for`](Self::rect_for) is O(1) and
/// [`get_coords_by_position`](Self::get_coords_by_position) is
/// O(log row width). A new orientation or a new profile needs a new
/// instance.
#[derive(Debug, Clone)]
pub struct FlamegraphOffseter {
    rows: Vec<Vec<FrameRect>>,
    options: OffseterOptions,
    total_width: f64,
}

impl FlamegraphOffseter {
    pub fn new(profile: &ProfileData, options: OffseterOptions) -> Self {
        let started = Instant::now();
        let level_height = options.level_height.max(1.0);
        let options = OffseterOptions {
            level_height,
            ..options
        };
        let depth = profile.rows.len();

        let rows: Vec<Vec<FrameRect>> = profile
            .rows
            .iter()
            .enumerate()
            .map(|(row, frames)| {
                let y = row_top(row, depth, options);
                frames
                    .iter()
                    .enumerate()
                    .map(|(index, frame)| FrameRect {
                        x: frame.offset,
                        y,
                        width: frame.event_count.max(0.0),
                        height: level_height,
                        row,
                        index,
                    })
                    .collect()
            })
            .collect();
        let total_width = rows
            .first()
            .map_or(0.0, |top| top.iter().map(|r| r.width).sum());

        tracing::debug!(
            rows = depth,
            frames = profile.frames_count(),
            reverse = options.reverse,
            elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
            "built flame graph geometry"
        );

        Self {
            rows,
            options,
            total_width,
        }
    }

    pub fn options(&self) -> OffseterOptions {
        self.options
    }

    pub fn reverse(&self) -> bool {
        self.options.reverse
    }

    pub fn level_height(&self) -> f64 {
        self.options.level_height
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Width of the whole graph in weight units: the sum of the top row.
    pub fn total_width(&self) -> f64 {
        self.total_width
    }

    /// Height of the whole graph in pixels.
    pub fn total_height(&self) -> f64 {
        self.rows.len() as f64 * self.options.level_height
    }

    pub fn rect_for(&self, row: usize, index: usize) -> Option<FrameRect> {
        self.rows.get(row)?.get(index).copied()
    }

    pub fn rect_of(&self, coords: FrameCoords) -> Option<FrameRect> {
        self.rect_for(coords.row, coords.index)
    }

    /// All rectangles of one row, left to right.
    pub fn row(&self, row: usize) -> &[FrameRect] {
        self.rows.get(row).map_or(&[], Vec::as_slice)
    }

    /// Pixel y of the top edge of `row`.
    pub fn row_y(&self, row: usize) -> f64 {
        row_top(row, self.rows.len(), self.options)
    }

    /// The row painted at pixel height `y`, if any.
    pub fn row_at(&self, y: f64) -> Option<usize> {
        if y.is_nan() || y < 0.0 {
            return None;
        }
        let level = (y / self.options.level_height).floor() as usize;
        self.row_at_level(level)
    }

    /// Rows whose band intersects the pixel range `top..bottom`, in
    /// top-to-bottom screen order.
    pub fn rows_in_band(&self, top: f64, bottom: f64) -> impl Iterator<Item = usize> + '_ {
        let height = self.options.level_height;
        let first = (top.max(0.0) / height).floor() as usize;
        let last = ((bottom / height).ceil().max(0.0) as usize).min(self.rows.len());
        (first..last).filter_map(|level| self.row_at_level(level))
    }

    /// The frames of `row` overlapping the weight range `start..end`.
    pub fn frames_in_span(&self, row: usize, start: f64, end: f64) -> &[FrameRect] {
        let frames = self.row(row);
        &frames[visible_range(frames, start, end)]
    }

    /// Inverse lookup: the frame under a point, or `None` between frames,
    /// outside the graph, or on an empty row.
    ///
    /// `x` is in weight units, `y` in pixels. Containment is half-open, so a
    /// point on the boundary of two neighbours belongs to the right one.
    pub fn get_coords_by_position(&self, x: f64, y: f64) -> Option<FrameCoords> {
        let row = self.row_at(y)?;
        let frames = self.row(row);
        let candidate = frames.partition_point(|r| r.x <= x).checked_sub(1)?;
        let rect = &frames[candidate];
        (x < rect.right()).then(|| rect.coords())
    }

    fn row_at_level(&self, level: usize) -> Option<usize> {
        let depth = self.rows.len();
        if level >= depth {
            return None;
        }
        Some(if self.options.reverse {
            depth - 1 - level
        } else {
            level
        })
    }
}

fn row_top(row: usize, depth: usize, options: OffseterOptions) -> f64 {
    let level = if options.reverse {
        depth.saturating_sub(row + 1)
    } else {
        row
    };
    level as f64 * options.level_height
}

/// Rows are sorted and non-overlapping, so both the left and the right
/// edges are monotonic and each end of the range is one binary search.
fn visible_range(frames: &[FrameRect], start: f64, end: f64) -> Range<usize> {
    let first = frames.partition_point(|r| r.right() <= start);
    let last = frames.partition_point(|r| r.x < end);
    first..last.max(first)
}
