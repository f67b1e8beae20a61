//! Asmview entrypoint.
use anyhow::Result;
use clap::Parser;
use core_actions::{NavKind, ViewCommand};
use core_config::{Config, ConfigContext, load_from};
use core_events::{
    EVENT_CHANNEL_CAP, Event, EventSourceRegistry, InputEvent, KeyCode, KeyEvent, KeyModifiers,
    MouseButton, MouseEvent, MouseEventKind, TickEventSource,
};
use core_listing::{
    Address, ItemKind, ListingDocument, ListingItem, Position, SegmentKind, SymbolKind,
};
use core_model::{ViewEvent, ViewportController, ViewportSettings};
use core_render::DirtyRegion;
use core_terminal::{CrosstermBackend, TerminalBackend, TerminalCapabilities};
use core_view::{PixelPoint, TextMetrics};
use crossterm::cursor::MoveTo;
use crossterm::queue;
use crossterm::style::{Attribute, Print, SetAttribute};
use crossterm::terminal::{self, Clear, ClearType};
use std::fmt;
use std::io::{self, Stdout, Write as _, stdout};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Once};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{error, info, trace, warn};
use tracing_appender::non_blocking::WorkerGuard;

const STATUS_ROWS: u16 = 1;
/// Tick resolution bounds added flush latency; keep it well under the
/// flush interval.
const TICK_INTERVAL: Duration = Duration::from_millis(10);
/// Two presses on the same cell within this window pair into a double click.
const DOUBLE_CLICK_WINDOW: Duration = Duration::from_millis(400);
/// Analysis worker sleep between mutation bursts.
const WORKER_IDLE: Duration = Duration::from_millis(150);
/// Rows retouched per body-refresh pass.
const BURST_ROWS: usize = 24;

const DEMO_BASE: u64 = 0x0040_1000;
/// Rows per synthetic function, header included.
const FUNCTION_ROWS: usize = 24;

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "asmview", version, about = "Disassembly listing viewer")]
struct Args {
    /// Instruction rows to synthesize for the demo listing.
    #[arg(long = "lines", default_value_t = 4096)]
    pub lines: usize,
    /// Optional configuration file path (overrides discovery of `asmview.toml`).
    #[arg(long = "config")]
    pub config: Option<PathBuf>,
    /// Run without the background analysis worker (static listing).
    #[arg(long = "no-worker")]
    pub no_worker: bool,
}

struct AppStartup {
    backend: CrosstermBackend,
    log_guard: Option<WorkerGuard>,
}

struct RuntimeContext<'a> {
    doc: Arc<ListingDocument>,
    config: Config,
    worker: Option<AnalysisWorker>,
    capabilities: TerminalCapabilities,
    terminal_guard: core_terminal::TerminalGuard<'a>,
}

impl AppStartup {
    fn new() -> Self {
        Self {
            backend: CrosstermBackend::new(),
            log_guard: None,
        }
    }

    fn run<'a>(&'a mut self) -> Result<RuntimeContext<'a>> {
        self.configure_logging()?;
        Self::install_panic_hook();

        info!(target: "runtime", "startup");
        self.backend.set_title("asmview")?;
        let guard = self.backend.enter_guard()?;

        let args = Args::parse();
        let capabilities = TerminalCapabilities::detect();
        let bootstrap = Self::load_listing(&args)?;

        info!(
            target: "runtime.startup",
            rows = bootstrap.doc.size(),
            worker = bootstrap.worker.is_some(),
            config_override = args.config.is_some(),
            wheel_lines = bootstrap.config.effective.wheel_lines,
            refresh_hz = bootstrap.config.effective.refresh_hz,
            focus_reporting = capabilities.supports_focus_change,
            "bootstrap_complete"
        );

        Ok(RuntimeContext {
            doc: bootstrap.doc,
            config: bootstrap.config,
            worker: bootstrap.worker,
            capabilities,
            terminal_guard: guard,
        })
    }

    fn configure_logging(&mut self) -> Result<()> {
        let log_dir = Path::new(".");
        let log_path = log_dir.join("asmview.log");
        if log_path.exists() {
            let _ = std::fs::remove_file(&log_path);
        }

        let file_appender = tracing_appender::rolling::never(log_dir, "asmview.log");
        let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
        match tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_writer(nb_writer)
            .try_init()
        {
            Ok(_) => {
                self.log_guard = Some(guard);
            }
            Err(_err) => {
                // Global tracing subscriber already installed; drop guard so writer shuts down.
            }
        }

        Ok(())
    }

    fn install_panic_hook() {
        static HOOK: Once = Once::new();
        HOOK.call_once(|| {
            let default_panic = std::panic::take_hook();
            std::panic::set_hook(Box::new(move |info| {
                tracing::error!(target: "runtime.panic", ?info, "panic");
                default_panic(info);
            }));
        });
    }

    fn load_listing(args: &Args) -> Result<ListingBootstrap> {
        let rows = args.lines.max(1);
        let doc = Arc::new(ListingDocument::with_items(demo_listing(rows)));

        let mut config = load_from(args.config.clone())?;
        let (_cols, height) = terminal::size().unwrap_or((80, 24));
        config.apply_context(ConfigContext::new(height, STATUS_ROWS));

        let worker = if args.no_worker {
            None
        } else {
            Some(AnalysisWorker::spawn(Arc::clone(&doc))?)
        };

        Ok(ListingBootstrap {
            doc,
            config,
            worker,
        })
    }
}

struct ListingBootstrap {
    doc: Arc<ListingDocument>,
    config: Config,
    worker: Option<AnalysisWorker>,
}

/// Synthetic listing standing in for analysis output: one code segment,
/// functions of `FUNCTION_ROWS` rows, bodies shaped like x86-64 text.
fn demo_listing(rows: usize) -> Vec<ListingItem> {
    let mut items = Vec::with_capacity(rows + 1);
    items.push(
        ListingItem::new(Address::new(DEMO_BASE), ItemKind::Segment, "; section .text")
            .with_segment(SegmentKind::Code),
    );
    for index in 0..rows {
        let address = Address::new(DEMO_BASE + 4 + index as u64 * 4);
        let item = if index == 0 {
            ListingItem::new(address, ItemKind::Function, "main:").with_symbol(SymbolKind::Function)
        } else if index % FUNCTION_ROWS == 0 {
            ListingItem::new(address, ItemKind::Function, format!("sub_{address:x}:"))
                .with_symbol(SymbolKind::Function)
        } else {
            ListingItem::new(address, ItemKind::Instruction, demo_instruction(index))
        };
        items.push(item);
    }
    items
}

fn demo_instruction(index: usize) -> String {
    const REGS: [&str; 6] = ["rax", "rbx", "rcx", "rdx", "rsi", "rdi"];
    let reg = REGS[index % REGS.len()];
    match index % FUNCTION_ROWS {
        1 => "    push rbp".to_string(),
        2 => "    mov rbp, rsp".to_string(),
        n if n == FUNCTION_ROWS - 1 => "    ret".to_string(),
        n if n == FUNCTION_ROWS - 2 => "    pop rbp".to_string(),
        n if n % 7 == 0 => {
            let callee = (index / FUNCTION_ROWS).saturating_sub(1) * FUNCTION_ROWS;
            let target = DEMO_BASE + 4 + callee as u64 * 4;
            format!("    call sub_{target:x}")
        }
        n if n % 5 == 0 => format!("    cmp {reg}, {:#x}", index * 8),
        n if n % 3 == 0 => format!("    lea {reg}, [rip + {:#x}]", index * 16),
        _ => format!("    mov {reg}, qword ptr [rbp - {:#x}]", 8 + (index % 6) * 8),
    }
}

/// Background thread standing in for the analysis pipeline. Brackets every
/// mutation burst with the busy flag so the view can tell refinement churn
/// from idle state.
struct AnalysisWorker {
    stop: Arc<AtomicBool>,
    handle: Option<std::thread::JoinHandle<()>>,
}

impl AnalysisWorker {
    fn spawn(doc: Arc<ListingDocument>) -> io::Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let handle = std::thread::Builder::new()
            .name("analysis".into())
            .spawn(move || Self::run(&doc, &flag))?;
        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    fn run(doc: &Arc<ListingDocument>, stop: &AtomicBool) {
        info!(target: "runtime.worker", "analysis_started");
        let mut pass: u64 = 0;
        while !stop.load(Ordering::Acquire) {
            std::thread::sleep(WORKER_IDLE);
            if stop.load(Ordering::Acquire) {
                break;
            }
            doc.set_busy(true);
            let touched = Self::mutate_pass(doc, pass);
            doc.set_busy(false);
            trace!(target: "runtime.worker", pass, touched, "mutation_pass");
            pass = pass.wrapping_add(1);
        }
        info!(target: "runtime.worker", passes = pass, "analysis_stopped");
    }

    /// One burst of synthetic refinements. Most passes retouch instruction
    /// bodies; the others land comments or shift indices with an insert or
    /// remove so subscribers see every change kind.
    fn mutate_pass(doc: &Arc<ListingDocument>, pass: u64) -> usize {
        const NOTES: [&str; 4] = [
            "stack canary check",
            "inlined memcpy",
            "bounds check hoisted",
            "loop counter",
        ];
        let size = doc.size();
        if size == 0 {
            return 0;
        }
        match pass % 8 {
            1 | 5 => {
                let line = (pass as usize).wrapping_mul(31) % size;
                let address = doc.lock().address_at(line);
                match address {
                    Some(address) => {
                        let note = NOTES[(pass / 8) as usize % NOTES.len()];
                        usize::from(doc.set_comment(address, note).is_ok())
                    }
                    None => 0,
                }
            }
            3 => {
                let line = (pass as usize).wrapping_mul(13) % size;
                let address = doc
                    .lock()
                    .address_at(line)
                    .unwrap_or(Address::new(DEMO_BASE));
                doc.insert(line, ListingItem::new(address, ItemKind::Instruction, "    nop"));
                1
            }
            7 if size > 1 => {
                let line = (pass as usize).wrapping_mul(13) % size;
                usize::from(doc.remove(line).is_some())
            }
            _ => {
                let start = (pass as usize).wrapping_mul(17) % size;
                let lines: Vec<usize> =
                    (0..BURST_ROWS).map(|offset| (start + offset * 3) % size).collect();
                let kinds: Vec<Option<ItemKind>> = {
                    let guard = doc.lock();
                    lines
                        .iter()
                        .map(|&line| guard.item_at(line).map(|item| item.kind))
                        .collect()
                };
                let mut touched = 0;
                for (&line, kind) in lines.iter().zip(kinds) {
                    if kind == Some(ItemKind::Instruction)
                        && doc.update_body(line, demo_instruction(line.wrapping_add(pass as usize)))
                    {
                        touched += 1;
                    }
                }
                touched
            }
        }
    }
}

impl Drop for AnalysisWorker {
    fn drop(&mut self) {
        self.request_stop();
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            error!(target: "runtime.worker", "analysis_thread_panicked");
        }
    }
}

/// Host-level action resolved from one key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyAction {
    Command(ViewCommand),
    JumpMid,
    Quit,
}

/// Fixed keymap. SHIFT turns a motion into a selection extension; Ctrl-Home
/// and Ctrl-End jump to the document bounds; Ctrl-Left and Ctrl-Right walk
/// the navigation history. Ctrl-C never reaches here: the input task
/// surfaces it as a distinct interrupt event.
fn translate_key(key: KeyEvent) -> Option<KeyAction> {
    let shift = key.mods.contains(KeyModifiers::SHIFT);
    let ctrl = key.mods.contains(KeyModifiers::CTRL);
    let motion = |kind| {
        Some(KeyAction::Command(if shift {
            ViewCommand::Select(kind)
        } else {
            ViewCommand::Move(kind)
        }))
    };
    match key.code {
        KeyCode::Up => motion(NavKind::PrevLine),
        KeyCode::Down => motion(NavKind::NextLine),
        KeyCode::Left if ctrl => Some(KeyAction::Command(ViewCommand::Back)),
        KeyCode::Right if ctrl => Some(KeyAction::Command(ViewCommand::Forward)),
        KeyCode::Left => motion(NavKind::PrevChar),
        KeyCode::Right => motion(NavKind::NextChar),
        KeyCode::PageUp => motion(NavKind::PrevPage),
        KeyCode::PageDown => motion(NavKind::NextPage),
        KeyCode::Home if ctrl => motion(NavKind::DocumentStart),
        KeyCode::End if ctrl => motion(NavKind::DocumentEnd),
        KeyCode::Home => motion(NavKind::LineStart),
        KeyCode::End => motion(NavKind::LineEnd),
        KeyCode::Char('c') => Some(KeyAction::Command(ViewCommand::Copy)),
        KeyCode::Char('g') => Some(KeyAction::JumpMid),
        KeyCode::Char('q') | KeyCode::Esc => Some(KeyAction::Quit),
        _ => None,
    }
}

/// Double-click detection over raw presses: the terminal reports every press
/// individually, so pairing is the host's job.
struct ClickTracker {
    last: Option<(Instant, u16, u16)>,
}

impl ClickTracker {
    fn new() -> Self {
        Self { last: None }
    }

    /// True when this press pairs with the previous one: same cell, inside
    /// the double-click window. A pairing press is consumed, so a triple
    /// click starts a fresh pair.
    fn is_double(&mut self, now: Instant, column: u16, row: u16) -> bool {
        let paired = matches!(
            self.last,
            Some((at, c, r))
                if c == column && r == row && now.duration_since(at) <= DOUBLE_CLICK_WINDOW
        );
        self.last = if paired {
            None
        } else {
            Some((now, column, row))
        };
        paired
    }
}

/// Columns of `line` covered by the normalized selection, as a half-open
/// absolute range. Interior rows select through `len`.
fn selected_cols(
    selection: Option<(Position, Position)>,
    line: usize,
    len: usize,
) -> Option<(usize, usize)> {
    let (start, end) = selection?;
    if line < start.line || line > end.line {
        return None;
    }
    let from = if line == start.line { start.column } else { 0 };
    let to = if line == end.line { end.column } else { len };
    (from < to).then_some((from, to))
}

/// Paints dirty rows and the status bar. Metrics are cell-sized, so viewport
/// pixel math is row math: one terminal cell per logical pixel.
struct ListingPainter {
    out: Stdout,
}

impl ListingPainter {
    fn new() -> Self {
        Self { out: stdout() }
    }

    /// Repaint the rows named by `region`, then the status bar, then flush.
    fn paint(
        &mut self,
        controller: &ViewportController,
        doc: &ListingDocument,
        region: &DirtyRegion,
    ) -> io::Result<()> {
        let started = Instant::now();
        let (cols, rows) = terminal::size()?;
        let text_rows = usize::from(rows.saturating_sub(STATUS_ROWS));
        if text_rows == 0 {
            return Ok(());
        }
        let view = controller.viewport();
        let first = view.first_visible_line();
        let h_offset = view.horizontal_offset() as usize;
        // Controller queries and the row lock below are separate critical
        // sections. A worker slipping between them only stales this frame;
        // its change notification repaints shortly after.
        let cursor = if controller.cursor_visible() {
            controller.cursor_position()
        } else {
            None
        };
        let selection = controller.selection();

        let mut painted = 0usize;
        {
            let guard = doc.lock();
            let size = guard.size();
            for span in region.spans_in(first..first + text_rows) {
                for line in span {
                    let screen_row = (line - first) as u16;
                    if line >= size {
                        queue!(self.out, MoveTo(0, screen_row), Clear(ClearType::CurrentLine))?;
                        continue;
                    }
                    let Some(text) = guard.line_text(line) else {
                        continue;
                    };
                    let sel = selected_cols(selection, line, text.chars().count());
                    let cursor_col = cursor.filter(|pos| pos.line == line).map(|pos| pos.column);
                    self.paint_row(
                        screen_row,
                        &text,
                        sel,
                        cursor_col,
                        h_offset,
                        usize::from(cols),
                    )?;
                    painted += 1;
                }
            }
        }

        self.queue_status(controller, doc, cols, rows)?;
        self.out.flush()?;
        trace!(
            target: "paint",
            rows_painted = painted,
            elapsed_us = started.elapsed().as_micros() as u64,
            "flush"
        );
        Ok(())
    }

    /// Repaint only the status bar. Used when an announcement changes the
    /// bar without dirtying any text row.
    fn paint_status(
        &mut self,
        controller: &ViewportController,
        doc: &ListingDocument,
    ) -> io::Result<()> {
        let (cols, rows) = terminal::size()?;
        self.queue_status(controller, doc, cols, rows)?;
        self.out.flush()
    }

    fn paint_row(
        &mut self,
        screen_row: u16,
        text: &str,
        sel: Option<(usize, usize)>,
        cursor_col: Option<usize>,
        h_offset: usize,
        cols: usize,
    ) -> io::Result<()> {
        queue!(self.out, MoveTo(0, screen_row), Clear(ClearType::CurrentLine))?;
        let chars: Vec<char> = text.chars().collect();
        let mut cells: Vec<(char, bool)> = Vec::with_capacity(cols);
        for abs in h_offset..h_offset + cols {
            let ch = chars.get(abs).copied().unwrap_or(' ');
            let mut inverted = sel.is_some_and(|(from, to)| abs >= from && abs < to);
            // The cursor cell flips again inside a selection, keeping it
            // visible against the highlight.
            if cursor_col == Some(abs) {
                inverted = !inverted;
            }
            cells.push((ch, inverted));
        }
        while matches!(cells.last(), Some((' ', false))) {
            cells.pop();
        }
        let mut run = String::new();
        let mut run_inverted = false;
        for (ch, inverted) in cells {
            if inverted != run_inverted && !run.is_empty() {
                self.flush_run(&run, run_inverted)?;
                run.clear();
            }
            run_inverted = inverted;
            run.push(ch);
        }
        if !run.is_empty() {
            self.flush_run(&run, run_inverted)?;
        }
        Ok(())
    }

    fn flush_run(&mut self, text: &str, inverted: bool) -> io::Result<()> {
        if inverted {
            queue!(
                self.out,
                SetAttribute(Attribute::Reverse),
                Print(text),
                SetAttribute(Attribute::Reset)
            )
        } else {
            queue!(self.out, Print(text))
        }
    }

    fn queue_status(
        &mut self,
        controller: &ViewportController,
        doc: &ListingDocument,
        cols: u16,
        rows: u16,
    ) -> io::Result<()> {
        if rows == 0 {
            return Ok(());
        }
        let position = controller.cursor_position();
        let (address, size) = {
            let guard = doc.lock();
            let address = position.and_then(|pos| guard.address_at(pos.line));
            (address, guard.size())
        };
        let left = match (position, address) {
            (Some(pos), Some(address)) => {
                format!(" {address}  row {}/{}", pos.line + 1, size)
            }
            _ => " (empty)".to_string(),
        };
        let mut right = String::new();
        if doc.busy() {
            right.push_str("analyzing ");
        }
        right.push(if controller.can_go_back() { '<' } else { ' ' });
        right.push(if controller.can_go_forward() { '>' } else { ' ' });
        right.push(' ');

        let width = usize::from(cols);
        let mut bar: Vec<char> = vec![' '; width];
        for (i, ch) in left.chars().take(width).enumerate() {
            bar[i] = ch;
        }
        let tail: Vec<char> = right.chars().collect();
        if tail.len() <= width {
            let offset = width - tail.len();
            for (i, ch) in tail.into_iter().enumerate() {
                bar[offset + i] = ch;
            }
        }
        let bar: String = bar.into_iter().collect();
        queue!(
            self.out,
            MoveTo(0, rows - 1),
            SetAttribute(Attribute::Reverse),
            Print(bar),
            SetAttribute(Attribute::Reset)
        )?;
        Ok(())
    }
}

struct ViewerRuntime<'a> {
    controller: ViewportController,
    doc: Arc<ListingDocument>,
    config: Config,
    painter: ListingPainter,
    worker: Option<AnalysisWorker>,
    click: ClickTracker,
    focus_reporting: bool,
    rx: mpsc::Receiver<Event>,
    tx: Option<mpsc::Sender<Event>>,
    source_handles: Vec<tokio::task::JoinHandle<()>>,
    input_task: Option<tokio::task::JoinHandle<()>>,
    input_shutdown: Option<core_input::AsyncInputShutdown>,
    _terminal_guard: core_terminal::TerminalGuard<'a>,
}

impl<'a> ViewerRuntime<'a> {
    fn new(
        context: RuntimeContext<'a>,
        tx: mpsc::Sender<Event>,
        rx: mpsc::Receiver<Event>,
        input_task: tokio::task::JoinHandle<()>,
        input_shutdown: core_input::AsyncInputShutdown,
        source_handles: Vec<tokio::task::JoinHandle<()>>,
    ) -> Self {
        let RuntimeContext {
            doc,
            config,
            worker,
            capabilities,
            terminal_guard,
        } = context;
        let effective = config.effective;
        let controller = ViewportController::with_settings(
            TextMetrics::cell(),
            ViewportSettings {
                refresh_hz: f64::from(effective.refresh_hz.max(1)),
                blink_interval: Duration::from_millis(effective.blink_interval_ms.max(1)),
                wheel_lines: usize::from(effective.wheel_lines.max(1)),
            },
        );
        Self {
            controller,
            doc,
            config,
            painter: ListingPainter::new(),
            worker,
            click: ClickTracker::new(),
            focus_reporting: capabilities.supports_focus_change,
            rx,
            tx: Some(tx),
            source_handles,
            input_task: Some(input_task),
            input_shutdown: Some(input_shutdown),
            _terminal_guard: terminal_guard,
        }
    }

    async fn run(&mut self) -> Result<()> {
        self.bootstrap_view();

        let loop_span = tracing::debug_span!(target: "runtime", "event_loop");
        let _enter_loop = loop_span.enter();

        let mut shutdown_reason = ShutdownReason::ChannelClosed;
        while let Some(event) = self.rx.recv().await {
            let control = match &event {
                Event::Input(input) => self.handle_input_event(input),
                Event::Tick => self.handle_tick(),
                Event::Shutdown => self.handle_shutdown(),
            };

            match control {
                LoopControl::Break { reason } => {
                    shutdown_reason = reason;
                    break;
                }
                LoopControl::Continue => {}
            }
        }

        self.rx.close();
        self.finalize_shutdown(shutdown_reason).await;
        Ok(())
    }

    fn bootstrap_view(&mut self) {
        let now = Instant::now();
        if let Ok((cols, rows)) = terminal::size() {
            self.controller.resize(
                now,
                u32::from(cols),
                u32::from(rows.saturating_sub(STATUS_ROWS)),
            );
        }
        self.controller.attach(now, Arc::clone(&self.doc));
        if let Err(err) = self
            .painter
            .paint(&self.controller, &self.doc, &DirtyRegion::Full)
        {
            error!(target: "paint", ?err, "initial_paint_error");
        }
    }

    fn handle_input_event(&mut self, input: &InputEvent) -> LoopControl {
        match input {
            InputEvent::Key(key) => self.handle_key(*key),
            InputEvent::Mouse(mouse) => self.handle_mouse(*mouse),
            InputEvent::Resize(w, h) => self.handle_resize(*w, *h),
            InputEvent::FocusGained => {
                self.controller.set_focus(true);
                LoopControl::Continue
            }
            InputEvent::FocusLost => {
                // Without focus reporting a lost-focus event is noise from a
                // multiplexer; honoring it would park the cursor hidden.
                if self.focus_reporting {
                    self.controller.set_focus(false);
                }
                LoopControl::Continue
            }
            InputEvent::CtrlC => self.handle_ctrl_c(),
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> LoopControl {
        let now = Instant::now();
        match translate_key(key) {
            Some(KeyAction::Command(ViewCommand::Copy)) => {
                self.controller.dispatch(now, ViewCommand::Copy);
                // Clipboard transport is host-owned; answer the command here.
                if let Some(text) = self.controller.copy_selection() {
                    info!(target: "runtime", bytes = text.len(), "copy_selection");
                }
                LoopControl::Continue
            }
            Some(KeyAction::Command(command)) => {
                self.controller.dispatch(now, command);
                LoopControl::Continue
            }
            Some(KeyAction::JumpMid) => {
                let size = self.doc.size();
                let target = self.doc.lock().address_at(size / 2);
                if let Some(address) = target {
                    self.controller.goto_address(now, address);
                }
                LoopControl::Continue
            }
            Some(KeyAction::Quit) => {
                info!(target: "runtime", "shutdown");
                LoopControl::Break {
                    reason: ShutdownReason::KeyQuit,
                }
            }
            None => LoopControl::Continue,
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) -> LoopControl {
        let now = Instant::now();
        let point = PixelPoint::new(u32::from(mouse.column), u32::from(mouse.row));
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                // Presses on the status bar are not listing clicks.
                if point.y >= self.controller.viewport().height_px() {
                    return LoopControl::Continue;
                }
                if self.click.is_double(now, mouse.column, mouse.row) {
                    self.controller.pointer_double_clicked(now, point);
                } else {
                    self.controller.pointer_pressed(now, point);
                }
            }
            MouseEventKind::Drag(MouseButton::Left) => self.controller.pointer_dragged(now, point),
            MouseEventKind::Up(MouseButton::Left) => self.controller.pointer_released(now),
            MouseEventKind::ScrollUp => self.controller.wheel(now, -1),
            MouseEventKind::ScrollDown => self.controller.wheel(now, 1),
            _ => {}
        }
        LoopControl::Continue
    }

    fn handle_resize(&mut self, cols: u16, rows: u16) -> LoopControl {
        let now = Instant::now();
        self.controller.resize(
            now,
            u32::from(cols),
            u32::from(rows.saturating_sub(STATUS_ROWS)),
        );
        let ctx = ConfigContext::new(rows, STATUS_ROWS);
        if let Some(effective) = self.config.recompute_with_context(ctx) {
            self.controller
                .set_wheel_lines(usize::from(effective.wheel_lines));
            self.controller
                .set_refresh_rate(f64::from(effective.refresh_hz));
        }
        LoopControl::Continue
    }

    fn handle_tick(&mut self) -> LoopControl {
        self.controller.on_tick(Instant::now());
        let events = self.controller.drain_events();
        if events.is_empty() {
            return LoopControl::Continue;
        }

        let mut region = DirtyRegion::empty();
        let mut status_dirty = false;
        for event in events {
            match event {
                ViewEvent::RepaintRequested(dirty) => region.merge(dirty),
                ViewEvent::AddressChanged(address) => {
                    trace!(target: "runtime", %address, "address_changed");
                    status_dirty = true;
                }
                ViewEvent::CanGoBackChanged(_) | ViewEvent::CanGoForwardChanged(_) => {
                    status_dirty = true;
                }
            }
        }

        if !region.is_empty() {
            if let Err(err) = self.painter.paint(&self.controller, &self.doc, &region) {
                error!(target: "paint", ?err, "paint_error");
            }
        } else if status_dirty
            && let Err(err) = self.painter.paint_status(&self.controller, &self.doc)
        {
            error!(target: "paint", ?err, "status_paint_error");
        }
        LoopControl::Continue
    }

    fn handle_ctrl_c(&mut self) -> LoopControl {
        info!(target: "runtime", "shutdown");
        LoopControl::Break {
            reason: ShutdownReason::CtrlC,
        }
    }

    fn handle_shutdown(&mut self) -> LoopControl {
        LoopControl::Break {
            reason: ShutdownReason::ShutdownEvent,
        }
    }

    async fn finalize_shutdown(&mut self, reason: ShutdownReason) {
        log_shutdown_stage(reason, "begin");
        if let Some(worker) = self.worker.as_ref() {
            worker.request_stop();
        }
        if let Some(tx) = self.tx.take() {
            trace!(
                target: "runtime.shutdown",
                reason = reason.as_str(),
                "dropping_runtime_sender"
            );
            drop(tx);
        }

        while let Some(handle) = self.source_handles.pop() {
            match tokio::time::timeout(Duration::from_millis(200), handle).await {
                Ok(Ok(_)) => trace!(
                    target: "runtime.shutdown",
                    reason = reason.as_str(),
                    "event_source_task_stopped"
                ),
                Ok(Err(err)) if err.is_cancelled() => trace!(
                    target: "runtime.shutdown",
                    reason = reason.as_str(),
                    "event_source_task_cancelled"
                ),
                Ok(Err(err)) => error!(
                    target: "runtime.shutdown",
                    reason = reason.as_str(),
                    ?err,
                    "event_source_task_error"
                ),
                Err(_) => warn!(
                    target: "runtime.shutdown",
                    reason = reason.as_str(),
                    "event_source_task_timeout"
                ),
            }
        }

        if let Some(shutdown) = self.input_shutdown.take() {
            trace!(
                target: "runtime.shutdown",
                reason = reason.as_str(),
                "input_task_shutdown_signal"
            );
            shutdown.signal();
        }

        if let Some(handle) = self.input_task.take() {
            match handle.await {
                Ok(_) => trace!(
                    target: "runtime.shutdown",
                    reason = reason.as_str(),
                    "input_task_joined"
                ),
                Err(err) if err.is_cancelled() => trace!(
                    target: "runtime.shutdown",
                    reason = reason.as_str(),
                    "input_task_cancelled"
                ),
                Err(err) => error!(
                    target: "runtime.shutdown",
                    reason = reason.as_str(),
                    ?err,
                    "input_task_join_failed"
                ),
            }
        }

        if let Some(worker) = self.worker.take() {
            // Drop joins the thread; bounded by one idle sleep since the
            // stop flag went up before the async teardown above.
            drop(worker);
            trace!(
                target: "runtime.shutdown",
                reason = reason.as_str(),
                "analysis_worker_joined"
            );
        }

        self.controller.detach();
        log_shutdown_stage(reason, "complete");
    }
}

enum LoopControl {
    Continue,
    Break { reason: ShutdownReason },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShutdownReason {
    CtrlC,
    KeyQuit,
    ShutdownEvent,
    ChannelClosed,
}

impl ShutdownReason {
    fn as_str(&self) -> &'static str {
        match self {
            ShutdownReason::CtrlC => "ctrl_c",
            ShutdownReason::KeyQuit => "key_quit",
            ShutdownReason::ShutdownEvent => "shutdown_event",
            ShutdownReason::ChannelClosed => "channel_closed",
        }
    }
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn log_shutdown_stage(reason: ShutdownReason, stage: &'static str) {
    info!(
        target: "runtime.shutdown",
        reason = reason.as_str(),
        stage = stage,
        "shutdown_stage"
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut startup = AppStartup::new();
    let context = startup.run()?;
    let (tx, rx) = mpsc::channel::<Event>(EVENT_CHANNEL_CAP);
    let (input_task, input_shutdown) = core_input::spawn_async_input(tx.clone());
    let mut registry = EventSourceRegistry::new();
    registry.register(TickEventSource::new(TICK_INTERVAL));
    let source_handles = registry.spawn_all(&tx);

    let mut runtime =
        ViewerRuntime::new(context, tx, rx, input_task, input_shutdown, source_handles);
    runtime.run().await
}
