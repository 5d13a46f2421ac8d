//! SVG backend: turns a paint list into a standalone SVG document, and a
//! headless [`HostElement`] that records paints for export.

use std::cell::{Cell, RefCell};
use std::fmt::Write as _;

use flamecanvas_protocol::{FontFamily, FrameCoords, RenderCommand, Rgba, Viewport};

use crate::renderer::{ContextMenuPayload, HostElement, HoverLabel};

/// Render a list of commands as an SVG document string.
///
/// `width` and `height` define the SVG viewBox dimensions.
pub fn render_svg(commands: &[RenderCommand], width: f64, height: f64) -> String {
    render_svg_with_titles(commands, width, height, |_| None)
}

/// Like [`render_svg`], attaching `title(frame)` to each frame rectangle as
/// a `<title>` tooltip.
pub fn render_svg_with_titles(
    commands: &[RenderCommand],
    width: f64,
    height: f64,
    title: impl Fn(FrameCoords) -> Option<String>,
) -> String {
    let mut svg = String::with_capacity(commands.len() * 160);
    let _ = write!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {width} {height}" width="{width}" height="{height}">"#,
    );

    for cmd in commands {
        match cmd {
            RenderCommand::Clear { color } => {
                let _ = write!(
                    svg,
                    r#"<rect width="{width}" height="{height}" fill="{}"{}/>"#,
                    color.to_hex(),
                    opacity_attr("fill-opacity", *color),
                );
            }
            RenderCommand::DrawRect {
                rect,
                fill,
                border,
                frame,
            } => {
                let _ = write!(
                    svg,
                    r#"<rect x="{}" y="{}" width="{}" height="{}" fill="{}"{}"#,
                    rect.x,
                    rect.y,
                    rect.w,
                    rect.h,
                    fill.to_hex(),
                    opacity_attr("fill-opacity", *fill),
                );
                if let Some(border) = border {
                    let _ = write!(
                        svg,
                        r#" stroke="{}" stroke-width="0.5"{}"#,
                        border.to_hex(),
                        opacity_attr("stroke-opacity", *border),
                    );
                }
                match frame.and_then(&title) {
                    Some(text) => {
                        let _ = write!(svg, "><title>{}</title></rect>", escape_xml(&text));
                    }
                    None => svg.push_str("/>"),
                }
            }
            RenderCommand::DrawText {
                position,
                text,
                color,
                font_size,
                font,
                ..
            } => {
                let _ = write!(
                    svg,
                    r#"<text x="{}" y="{}" fill="{}"{} font-size="{font_size}" font-family="{}" style="pointer-events:none">{}</text>"#,
                    position.x,
                    position.y,
                    color.to_hex(),
                    opacity_attr("fill-opacity", *color),
                    font_stack(*font),
                    escape_xml(text),
                );
            }
        }
    }

    svg.push_str("</svg>");
    svg
}

fn opacity_attr(name: &str, color: Rgba) -> String {
    if color.a == u8::MAX {
        String::new()
    } else {
        format!(r#" {name}="{:.3}""#, color.opacity())
    }
}

fn font_stack(font: FontFamily) -> &'static str {
    match font {
        FontFamily::SystemMonospace => "monospace",
        FontFamily::BundledMonospace => "ui-monospace,SFMono-Regular,Menlo,Consolas,monospace",
    }
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// A host element with no window behind it. Keeps the last paint so it can
/// be written out as SVG.
#[derive(Debug)]
pub struct SvgCanvas {
    viewport: Cell<Viewport>,
    attached: Cell<bool>,
    commands: RefCell<Vec<RenderCommand>>,
    paints: Cell<usize>,
    label: RefCell<HoverLabel>,
    match_summary: Cell<Option<usize>>,
}

impl SvgCanvas {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            viewport: Cell::new(Viewport::sized(width, height)),
            attached: Cell::new(true),
            commands: RefCell::new(Vec::new()),
            paints: Cell::new(0),
            label: RefCell::new(HoverLabel::default()),
            match_summary: Cell::new(None),
        }
    }

    pub fn detach(&self) {
        self.attached.set(false);
    }

    /// The commands of the most recent paint.
    pub fn commands(&self) -> Vec<RenderCommand> {
        self.commands.borrow().clone()
    }

    pub fn paints(&self) -> usize {
        self.paints.get()
    }

    pub fn label(&self) -> HoverLabel {
        self.label.borrow().clone()
    }

    pub fn match_summary(&self) -> Option<usize> {
        self.match_summary.get()
    }

    pub fn to_svg(&self) -> String {
        self.to_svg_with_titles(|_| None)
    }

    pub fn to_svg_with_titles(&self, title: impl Fn(FrameCoords) -> Option<String>) -> String {
        let vp = self.viewport.get();
        render_svg_with_titles(&self.commands.borrow(), vp.width, vp.height, title)
    }
}

impl HostElement for SvgCanvas {
    fn is_attached(&self) -> bool {
        self.attached.get()
    }

    fn viewport(&self) -> Viewport {
        self.viewport.get()
    }

    fn paint(&self, commands: &[RenderCommand]) {
        *self.commands.borrow_mut() = commands.to_vec();
        self.paints.set(self.paints.get() + 1);
    }

    fn update_label(&self, label: &HoverLabel) {
        self.label.borrow_mut().clone_from(label);
    }

    fn set_match_summary(&self, matched: Option<usize>) {
        self.match_summary.set(matched);
    }

    fn show_context_menu(&self, payload: ContextMenuPayload) {
        tracing::debug!(node = %payload.node.coords, "context menu on a headless canvas");
    }

    fn open_search(&self) {
        tracing::debug!("search requested on a headless canvas");
    }
}
