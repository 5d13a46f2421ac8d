pub mod commands;
pub mod profile;
pub mod shared_str;
pub mod theme;
pub mod types;

pub use commands::{FontFamily, RenderCommand};
pub use profile::{FrameCoords, FrameRecord, IntegrityIssue, ProfileData};
pub use shared_str::SharedStr;
pub use theme::{Theme, ThemeToken};
pub use types::{Point, Rect, Rgba, Viewport};
