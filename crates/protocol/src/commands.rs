use serde::{Deserialize, Serialize};

use crate::profile::FrameCoords;
use crate::shared_str::SharedStr;
use crate::types::{Point, Rect, Rgba};

/// A single, stateless paint instruction.
///
/// The renderer emits a `Vec<RenderCommand>` per paint pass. Hosts consume
/// this list sequentially; each command carries all the data it needs, so a
/// host never has to look back into the profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RenderCommand {
    /// Fill the whole canvas.
    Clear { color: Rgba },

    /// Draw a filled rectangle. `frame` ties the rectangle back to the frame
    /// it represents (for hosts that keep their own hit regions).
    DrawRect {
        rect: Rect,
        fill: Rgba,
        border: Option<Rgba>,
        frame: Option<FrameCoords>,
    },

    /// Draw a text string. `max_width` is the horizontal room the text was
    /// fitted into.
    DrawText {
        position: Point,
        text: SharedStr,
        color: Rgba,
        font_size: f64,
        font: FontFamily,
        max_width: f64,
    },
}

/// Font used for frame labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FontFamily {
    /// Whatever monospace face the host platform provides.
    SystemMonospace,
    /// The application's bundled monospace face.
    BundledMonospace,
}
