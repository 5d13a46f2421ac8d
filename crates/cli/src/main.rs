mod renderer;

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use flamecanvas_core::renderer::tooltip_text;
use flamecanvas_core::{
    EventLoop, FlamegraphView, HostHandle, MemoryStore, Settings, SvgCanvas, ViewState,
};
use flamecanvas_protocol::{FrameCoords, ProfileData, Theme};
use tracing_subscriber::EnvFilter;

/// Interactive flame graphs from collapsed stacks or profile JSON.
#[derive(Debug, Parser)]
#[command(name = "flamecanvas", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Render a profile to a standalone SVG document.
    Svg(SvgArgs),
    /// Browse a profile in the terminal.
    View(ViewArgs),
}

#[derive(Debug, Args)]
struct SvgArgs {
    /// Collapsed stacks (`a;b;c 10`) or a profile JSON document.
    profile: PathBuf,
    /// Where to write the SVG; stdout when omitted.
    #[arg(short, long)]
    output: Option<PathBuf>,
    #[arg(long, default_value_t = 1200.0)]
    width: f64,
    /// Defaults to the height of the whole graph.
    #[arg(long)]
    height: Option<f64>,
    /// Icicle layout: roots at the bottom.
    #[arg(long)]
    reverse: bool,
    /// Regular expression; frames that do not match are dimmed.
    #[arg(long)]
    search: Option<String>,
    #[arg(long, default_value = "light")]
    theme: Theme,
    /// Zoom into the frame at `row:index`.
    #[arg(long)]
    zoom: Option<FrameCoords>,
    /// Settings JSON (`user` and `flamegraph` sections).
    #[arg(long)]
    settings: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct ViewArgs {
    profile: PathBuf,
    #[arg(long, default_value = "dark")]
    theme: Theme,
    #[arg(long)]
    settings: Option<PathBuf>,
    /// Write logs here; the terminal view logs nothing otherwise.
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Svg(args) => {
            init_logging(None)?;
            run_svg(&args)
        }
        Command::View(args) => {
            if let Some(path) = &args.log_file {
                init_logging(Some(path))?;
            }
            run_view(&args)
        }
    }
}

/// `RUST_LOG` filters; warnings and errors by default. Without a file,
/// logs go to stderr so stdout stays clean for SVG output.
fn init_logging(file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    match file {
        None => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .compact()
            .init(),
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("creating log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .init();
        }
    }
    Ok(())
}

fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let Some(path) = path else {
        return Ok(Settings::default());
    };
    let data = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    Settings::from_json(&data).with_context(|| format!("parsing settings {}", path.display()))
}

fn load_profile(path: &Path) -> Result<Arc<ProfileData>> {
    let data = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let profile = flamecanvas_core::parsers::parse_auto(&data)
        .with_context(|| format!("parsing profile {}", path.display()))?;
    tracing::info!(
        path = %path.display(),
        rows = profile.rows.len(),
        frames = profile.frames_count(),
        diff = profile.is_diff(),
        "loaded profile"
    );
    Ok(Arc::new(profile))
}

fn run_svg(args: &SvgArgs) -> Result<()> {
    let settings = load_settings(args.settings.as_deref())?;
    let profile = load_profile(&args.profile)?;
    let svg = svg_document(args, settings, &profile);
    match &args.output {
        Some(path) => std::fs::write(path, svg)
            .with_context(|| format!("writing {}", path.display()))?,
        None => io::stdout().lock().write_all(svg.as_bytes())?,
    }
    Ok(())
}

/// Mount the graph on a headless canvas and serialize the first paint.
fn svg_document(args: &SvgArgs, settings: Settings, profile: &Arc<ProfileData>) -> String {
    let is_diff = profile.is_diff();
    let height = args
        .height
        .unwrap_or(profile.rows.len() as f64 * settings.flamegraph.level_height);

    let canvas = Rc::new(SvgCanvas::new(args.width, height.max(1.0)));
    let events = EventLoop::new();
    // Without `--reverse` the orientation falls back to the user default.
    let state = Rc::new(MemoryStore::new(ViewState {
        reverse: args.reverse.then_some(true),
        search: args.search.clone(),
        zoom: args.zoom,
    }));
    let mut view = FlamegraphView::new(
        HostHandle::new(canvas.clone(), Rc::clone(&events)),
        state,
        settings,
    );
    view.set_theme(args.theme);
    view.set_profile(Arc::clone(profile), is_diff);
    events.run_animation_frames();

    let svg = canvas.to_svg_with_titles(|coords| tooltip_text(profile, coords, is_diff));
    view.unmount();
    svg
}

fn run_view(args: &ViewArgs) -> Result<()> {
    let settings = load_settings(args.settings.as_deref())?;
    let profile = load_profile(&args.profile)?;
    renderer::run(profile, settings, args.theme)
}
