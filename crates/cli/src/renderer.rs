use std::cell::{Cell, RefCell};
use std::io::stdout;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use flamecanvas_core::theme;
use flamecanvas_core::{
    ContextMenuPayload, EventLoop, EventTarget, FlamegraphView, HostElement, HostEvent,
    HostHandle, HoverLabel, Key, KeyPress, MemoryStore, Settings, StateStore,
};
use flamecanvas_protocol::{Point, ProfileData, RenderCommand, Rgba, Theme, ThemeToken, Viewport};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    buffer::{Buffer, Cell as BufferCell},
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::{Block, Paragraph, Widget},
};

/// Pixels per terminal column. Rows are one level tall.
const COLUMN_WIDTH: f64 = 8.0;

/// A [`HostElement`] backed by the terminal: paints are kept and drawn on
/// the next frame.
struct TerminalHost {
    viewport: Cell<Viewport>,
    commands: RefCell<Vec<RenderCommand>>,
    label: RefCell<HoverLabel>,
    match_summary: Cell<Option<usize>>,
    context_menu: RefCell<Option<ContextMenuPayload>>,
    search_requested: Cell<bool>,
}

impl TerminalHost {
    fn new() -> Self {
        Self {
            viewport: Cell::new(Viewport::sized(0.0, 0.0)),
            commands: RefCell::new(Vec::new()),
            label: RefCell::new(HoverLabel::default()),
            match_summary: Cell::new(None),
            context_menu: RefCell::new(None),
            search_requested: Cell::new(false),
        }
    }
}

impl HostElement for TerminalHost {
    fn is_attached(&self) -> bool {
        true
    }

    fn viewport(&self) -> Viewport {
        self.viewport.get()
    }

    fn paint(&self, commands: &[RenderCommand]) {
        *self.commands.borrow_mut() = commands.to_vec();
    }

    fn update_label(&self, label: &HoverLabel) {
        self.label.borrow_mut().clone_from(label);
    }

    fn set_match_summary(&self, matched: Option<usize>) {
        self.match_summary.set(matched);
    }

    fn show_context_menu(&self, payload: ContextMenuPayload) {
        *self.context_menu.borrow_mut() = Some(payload);
    }

    fn open_search(&self) {
        self.search_requested.set(true);
    }
}

/// Maps between terminal cells and canvas pixels.
#[derive(Debug, Clone, Copy)]
struct CellGrid {
    area: Rect,
    level_height: f64,
}

impl CellGrid {
    fn viewport(&self, scroll_rows: usize) -> Viewport {
        Viewport {
            y: scroll_rows as f64 * self.level_height,
            width: f64::from(self.area.width) * COLUMN_WIDTH,
            height: f64::from(self.area.height) * self.level_height,
        }
    }

    /// Center of the cell under the mouse, relative to the canvas.
    fn point(&self, column: u16, row: u16) -> Option<Point> {
        let inside = column >= self.area.x
            && column < self.area.right()
            && row >= self.area.y
            && row < self.area.bottom();
        inside.then(|| {
            Point::new(
                (f64::from(column - self.area.x) + 0.5) * COLUMN_WIDTH,
                (f64::from(row - self.area.y) + 0.5) * self.level_height,
            )
        })
    }

    fn column(&self, x: f64) -> i64 {
        (x / COLUMN_WIDTH).round() as i64
    }

    fn row(&self, y: f64) -> i64 {
        (y / self.level_height).floor() as i64
    }
}

struct App {
    view: FlamegraphView,
    host: Rc<TerminalHost>,
    events: Rc<EventLoop>,
    state: Rc<MemoryStore>,
    theme: Theme,
    scroll_rows: usize,
    prompt: Option<String>,
    quit: bool,
}

pub fn run(profile: Arc<ProfileData>, settings: Settings, theme: Theme) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, profile, settings, theme);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    result
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    profile: Arc<ProfileData>,
    settings: Settings,
    theme: Theme,
) -> Result<()> {
    let level_height = settings.flamegraph.level_height.max(1.0);
    let mut app = App::new(profile, settings, theme);

    while !app.quit {
        let size = terminal.size()?;
        let grid = CellGrid {
            area: Rect::new(0, 1, size.width, size.height.saturating_sub(2)),
            level_height,
        };
        app.clamp_scroll();
        app.update_viewport(grid.viewport(app.scroll_rows));
        app.events.run_animation_frames();
        app.take_search_request();

        terminal.draw(|frame| app.draw(frame, grid))?;

        if event::poll(Duration::from_millis(100))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => app.on_key(key),
                Event::Mouse(mouse) => app.on_mouse(mouse, grid),
                _ => {}
            }
            app.view.sync();
        }
    }
    app.view.unmount();
    Ok(())
}

impl App {
    fn new(profile: Arc<ProfileData>, settings: Settings, theme: Theme) -> Self {
        let is_diff = profile.is_diff();
        let host = Rc::new(TerminalHost::new());
        let events = EventLoop::new();
        let state = Rc::new(MemoryStore::default());
        let mut view = FlamegraphView::new(
            HostHandle::new(host.clone(), Rc::clone(&events)),
            state.clone(),
            settings,
        );
        view.set_theme(theme);
        view.set_profile(profile, is_diff);
        Self {
            view,
            host,
            events,
            state,
            theme,
            scroll_rows: 0,
            prompt: None,
            quit: false,
        }
    }

    /// Open the prompt if the renderer asked for it (Ctrl+F).
    fn take_search_request(&mut self) {
        if self.host.search_requested.replace(false) && self.prompt.is_none() {
            self.open_prompt();
        }
    }

    /// Start editing the search, prefilled with the current one.
    fn open_prompt(&mut self) {
        self.prompt = Some(self.state.get().search.unwrap_or_default());
    }

    fn clamp_scroll(&mut self) {
        let rows = self.view.geometry().map_or(0, |g| g.row_count());
        self.scroll_rows = self.scroll_rows.min(rows.saturating_sub(1));
    }

    /// Push a new viewport to the host and tell the renderer why it changed.
    fn update_viewport(&self, viewport: Viewport) {
        let previous = self.host.viewport.replace(viewport);
        if previous == viewport {
            return;
        }
        let event = if previous.width == viewport.width && previous.height == viewport.height {
            HostEvent::Scroll
        } else {
            HostEvent::Resize
        };
        self.events.dispatch(EventTarget::Document, event);
    }

    fn on_key(&mut self, key: KeyEvent) {
        if let Some(prompt) = &mut self.prompt {
            match key.code {
                KeyCode::Char(c) => prompt.push(c),
                KeyCode::Backspace => {
                    prompt.pop();
                }
                KeyCode::Enter => {
                    let text = std::mem::take(prompt);
                    self.prompt = None;
                    self.view.update_search(&text);
                }
                KeyCode::Esc => self.prompt = None,
                _ => {}
            }
            return;
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('q') if !ctrl => self.quit = true,
            KeyCode::Char('c') if ctrl => self.quit = true,
            KeyCode::Char('r') if !ctrl => self.view.toggle_reverse(),
            KeyCode::Char('/') => self.open_prompt(),
            KeyCode::Up => self.scroll_rows = self.scroll_rows.saturating_sub(1),
            KeyCode::Down => self.scroll_rows += 1,
            _ => {
                self.host.context_menu.borrow_mut().take();
                self.events.dispatch(
                    EventTarget::Document,
                    HostEvent::KeyDown(key_press(key)),
                );
            }
        }
    }

    fn on_mouse(&mut self, mouse: MouseEvent, grid: CellGrid) {
        let point = grid.point(mouse.column, mouse.row);
        let event = match (mouse.kind, point) {
            (MouseEventKind::ScrollDown, _) => {
                self.scroll_rows += 1;
                return;
            }
            (MouseEventKind::ScrollUp, _) => {
                self.scroll_rows = self.scroll_rows.saturating_sub(1);
                return;
            }
            (MouseEventKind::Moved, Some(point)) => HostEvent::PointerMove(point),
            (MouseEventKind::Moved, None) => HostEvent::PointerLeave,
            (MouseEventKind::Down(MouseButton::Left), Some(point)) => {
                // A click outside an open menu only closes it.
                if self.host.context_menu.borrow_mut().take().is_some() {
                    return;
                }
                HostEvent::Click(point)
            }
            (MouseEventKind::Down(MouseButton::Right), Some(point)) => {
                HostEvent::ContextMenu(point)
            }
            _ => return,
        };
        self.events.dispatch(EventTarget::Canvas, event);
    }

    fn draw(&self, frame: &mut Frame, grid: CellGrid) {
        let area = frame.area();
        let chrome = Style::default().fg(Color::White).bg(Color::DarkGray);

        let mut header = format!(" flamecanvas | {} frames", self.view.frames_count());
        if let Some(matched) = self.host.match_summary.get() {
            header.push_str(&format!(" | Matched: {matched} frames"));
        }
        header.push_str(" | / search  r reverse  q quit ");
        frame.render_widget(
            Paragraph::new(header).style(chrome),
            Rect::new(0, 0, area.width, 1),
        );

        let commands = self.host.commands.borrow();
        draw_commands(frame.buffer_mut(), grid, &commands, self.theme);

        let footer = if let Some(prompt) = &self.prompt {
            format!(" /{prompt}▏")
        } else if let Some(menu) = self.host.context_menu.borrow().as_ref() {
            context_menu_line(menu)
        } else {
            let label = self.host.label.borrow();
            if label.visible {
                format!(" {}", label.text)
            } else {
                String::new()
            }
        };
        frame.render_widget(
            Paragraph::new(footer).style(chrome),
            Rect::new(0, area.height.saturating_sub(1), area.width, 1),
        );
    }
}

fn key_press(key: KeyEvent) -> KeyPress {
    let code = match key.code {
        KeyCode::Char(c) => Key::Char(c),
        KeyCode::Esc => Key::Escape,
        KeyCode::Enter => Key::Enter,
        KeyCode::Backspace => Key::Backspace,
        _ => Key::Other,
    };
    KeyPress {
        key: code,
        ctrl: key.modifiers.contains(KeyModifiers::CONTROL),
        meta: key.modifiers.contains(KeyModifiers::SUPER),
    }
}

fn context_menu_line(menu: &ContextMenuPayload) -> String {
    let node = &menu.node;
    let mut line = format!(" {} ({})", node.name, node.coords);
    if let Some(file) = &node.file {
        line.push_str(&format!(" {file}"));
    }
    if let Some(kind) = &node.kind {
        line.push_str(&format!(" [{kind}]"));
    }
    if node.inlined {
        line.push_str(" inlined");
    }
    line.push_str(&format!(
        " | total {} self {}",
        node.event_count, node.self_event_count
    ));
    line
}

fn to_color(color: Rgba) -> Color {
    Color::Rgb(color.r, color.g, color.b)
}

/// Flatten a translucent color onto the background the way a canvas would.
fn blend(color: Rgba, background: Rgba) -> Rgba {
    background.lerp(Rgba { a: u8::MAX, ..color }, color.opacity())
}

fn draw_commands(buf: &mut Buffer, grid: CellGrid, commands: &[RenderCommand], theme: Theme) {
    let area = grid.area;
    let mut background = theme::resolve(ThemeToken::Background, theme);
    let outline = theme::resolve(ThemeToken::HoverOutline, theme);

    for command in commands {
        match command {
            RenderCommand::Clear { color } => {
                background = *color;
                Block::default()
                    .style(Style::default().bg(to_color(*color)))
                    .render(area, buf);
            }
            RenderCommand::DrawRect {
                rect, fill, border, ..
            } => {
                let row = grid.row(rect.y);
                let left = grid.column(rect.x);
                let right = grid.column(rect.x + rect.w).max(left + 1);
                let fill = to_color(blend(*fill, background));
                let hovered = *border == Some(outline);
                for column in left..right {
                    let Some(target) = cell_at(buf, area, column, row) else {
                        continue;
                    };
                    target.set_char(' ').set_bg(fill);
                    if hovered {
                        target.set_style(Style::default().add_modifier(Modifier::REVERSED));
                    }
                }
                if right - left > 1
                    && let Some(border) = border
                    && let Some(target) = cell_at(buf, area, left, row)
                {
                    target
                        .set_char('▏')
                        .set_fg(to_color(blend(*border, background)));
                }
            }
            RenderCommand::DrawText {
                position,
                text,
                color,
                max_width,
                ..
            } => {
                let row = grid.row(position.y);
                let start = grid.column(position.x).max(0);
                let room = (max_width / COLUMN_WIDTH).floor() as usize;
                let fg = to_color(blend(*color, background));
                for (i, ch) in text.chars().take(room).enumerate() {
                    if let Some(target) = cell_at(buf, area, start + i as i64, row) {
                        target.set_char(ch).set_fg(fg);
                    }
                }
            }
        }
    }
}

/// The buffer cell at `column`/`row` of `area`, if inside it.
fn cell_at(buf: &mut Buffer, area: Rect, column: i64, row: i64) -> Option<&mut BufferCell> {
    let inside =
        column >= 0 && row >= 0 && column < i64::from(area.width) && row < i64::from(area.height);
    if !inside {
        return None;
    }
    Some(&mut buf[(area.x + column as u16, area.y + row as u16)])
}
