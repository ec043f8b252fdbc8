use std::collections::VecDeque;
use std::io::{self, Stdout};
use std::sync::mpsc::{Receiver, TryRecvError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crossterm::ExecutableCommand;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use miette::IntoDiagnostic;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

use crate::app::{ProgressEvent, ProgressSink};
use crate::error::SpawriousError;

const EVENT_CAPACITY: usize = 8;
const BAR_WIDTH: usize = 20;
const REDRAW_EVERY: Duration = Duration::from_millis(120);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Resolve,
    Fetch,
    Extract,
    Store,
}

impl Phase {
    const ORDER: [Phase; 4] = [Phase::Resolve, Phase::Fetch, Phase::Extract, Phase::Store];

    fn from_name(name: &str) -> Option<Self> {
        Self::ORDER.into_iter().find(|phase| phase.label() == name)
    }

    fn label(self) -> &'static str {
        match self {
            Phase::Resolve => "Resolve",
            Phase::Fetch => "Fetch",
            Phase::Extract => "Extract",
            Phase::Store => "Store",
        }
    }

    /// Share of the run reached once this phase has started.
    fn percent(self) -> u8 {
        let step = Self::ORDER.iter().position(|phase| *phase == self).unwrap_or(0) + 1;
        (step * 100 / Self::ORDER.len()) as u8
    }
}

/// Newest-last log of event lines, bounded to `EVENT_CAPACITY`.
#[derive(Debug, Default)]
struct EventLog {
    lines: VecDeque<String>,
}

impl EventLog {
    fn record(&mut self, line: String) {
        if self.lines.len() == EVENT_CAPACITY {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    fn newest_first(&self) -> impl Iterator<Item = &String> {
        self.lines.iter().rev()
    }

    fn len(&self) -> usize {
        self.lines.len()
    }
}

#[derive(Debug)]
struct RunState {
    status: String,
    phase: Phase,
    transferred: u64,
    total: u64,
    latency_ms: Option<u128>,
    events: EventLog,
    started: Instant,
    running: bool,
}

impl RunState {
    fn idle() -> Self {
        Self {
            status: "ready".to_string(),
            phase: Phase::Resolve,
            transferred: 0,
            total: 0,
            latency_ms: None,
            events: EventLog::default(),
            started: Instant::now(),
            running: false,
        }
    }

    fn apply(&mut self, message: &str) {
        if let Some(rest) = message.strip_prefix("fetch.progress ") {
            self.phase = Phase::Fetch;
            self.transferred = field(rest, "bytes").unwrap_or(self.transferred);
            self.total = field(rest, "total").unwrap_or(0);
            return;
        }
        match parse_phase(message) {
            Some((phase, detail)) => {
                self.phase = phase;
                self.status = detail.to_string();
            }
            None => match field::<u128>(message, "latency_ms") {
                Some(latency) => self.latency_ms = Some(latency),
                None => self.status = message.to_string(),
            },
        }
        let stamp = chrono::Local::now().format("%H:%M:%S");
        self.events.record(format!("[{stamp}] {message}"));
    }

    fn percent(&self) -> u8 {
        if self.total == 0 {
            return self.phase.percent();
        }
        (self.transferred.min(self.total) * 100 / self.total) as u8
    }
}

pub struct Tui {
    target: String,
    state: Arc<Mutex<RunState>>,
}

struct TuiProgress {
    state: Arc<Mutex<RunState>>,
}

impl ProgressSink for TuiProgress {
    fn event(&self, event: ProgressEvent) {
        if let Ok(mut state) = self.state.lock() {
            state.apply(event.message.trim());
        }
    }
}

/// Raw mode plus alternate screen for as long as it lives.
struct Screen {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl Screen {
    fn enter() -> miette::Result<Self> {
        enable_raw_mode().into_diagnostic()?;
        let mut stdout = io::stdout();
        stdout.execute(EnterAlternateScreen).into_diagnostic()?;
        let mut terminal = Terminal::new(CrosstermBackend::new(stdout)).into_diagnostic()?;
        terminal.clear().into_diagnostic()?;
        Ok(Self { terminal })
    }
}

impl Drop for Screen {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = self.terminal.backend_mut().execute(LeaveAlternateScreen);
    }
}

impl Tui {
    /// `target` is shown under the title, typically the dataset and root.
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            state: Arc::new(Mutex::new(RunState::idle())),
        }
    }

    /// Runs `work` on a worker thread while drawing its progress events.
    /// Esc or `q` abandons the view; the worker is not cancelled.
    pub fn run<F, R>(&mut self, work: F) -> miette::Result<R>
    where
        F: FnOnce(&dyn ProgressSink) -> Result<R, SpawriousError> + Send + 'static,
        R: Send + 'static,
    {
        self.reset();
        let mut screen = Screen::enter()?;

        let (tx, rx) = std::sync::mpsc::channel();
        let sink = TuiProgress {
            state: self.state.clone(),
        };
        let worker = thread::spawn(move || {
            let _ = tx.send(work(&sink));
        });

        let mut tick = 0usize;
        let outcome = loop {
            if let Ok(state) = self.state.lock() {
                screen
                    .terminal
                    .draw(|frame| draw(frame, &self.target, &state, tick))
                    .into_diagnostic()?;
            }
            if let Some(outcome) = poll_worker(&rx) {
                break outcome;
            }
            if event::poll(REDRAW_EVERY).into_diagnostic()?
                && let Event::Key(key) = event::read().into_diagnostic()?
                && is_abort(key)
            {
                break Err(miette::Report::msg("aborted"));
            }
            tick = tick.wrapping_add(1);
        };

        if let Ok(mut state) = self.state.lock() {
            state.running = false;
        }
        drop(screen);
        if worker.is_finished() {
            let _ = worker.join();
        }
        outcome
    }

    fn reset(&self) {
        if let Ok(mut state) = self.state.lock() {
            *state = RunState::idle();
            state.running = true;
        }
    }
}

/// `None` while the worker is still busy. A worker that went away without
/// sending, e.g. after a panic, yields an error instead of waiting forever.
fn poll_worker<R>(rx: &Receiver<Result<R, SpawriousError>>) -> Option<miette::Result<R>> {
    match rx.try_recv() {
        Ok(result) => Some(result.map_err(miette::Report::new)),
        Err(TryRecvError::Empty) => None,
        Err(TryRecvError::Disconnected) => Some(Err(miette::Report::msg(
            "download worker stopped without reporting a result",
        ))),
    }
}

fn is_abort(key: KeyEvent) -> bool {
    key.kind == KeyEventKind::Press && matches!(key.code, KeyCode::Esc | KeyCode::Char('q'))
}

fn draw(frame: &mut ratatui::Frame, target: &str, state: &RunState, tick: usize) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(6),
            Constraint::Min(4),
            Constraint::Length(2),
        ])
        .split(frame.area());

    let title = Paragraph::new(vec![
        Line::from(vec![
            Span::styled(
                "SPAWRIOUS",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!(" {}  download ", env!("CARGO_PKG_VERSION")),
                Style::default().fg(Color::Gray),
            ),
            Span::styled(
                if tick % 2 == 0 { "*" } else { " " },
                Style::default().fg(Color::Green),
            ),
        ]),
        Line::from(Span::styled(
            target.to_string(),
            Style::default().fg(Color::Gray),
        )),
    ])
    .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(title, rows[0]);
    frame.render_widget(status_panel(state), rows[1]);
    frame.render_widget(event_panel(state), rows[2]);
    frame.render_widget(
        Paragraph::new(Span::styled(
            "Esc / q to leave",
            Style::default().fg(Color::DarkGray),
        ))
        .block(Block::default().borders(Borders::TOP)),
        rows[3],
    );
}

fn status_panel(state: &RunState) -> Paragraph<'static> {
    let label = Style::default().fg(Color::Gray);
    let phase_style = Style::default().fg(if state.running {
        Color::Cyan
    } else {
        Color::Green
    });
    let percent = state.percent();
    let transferred = match state.total {
        0 => human_bytes(state.transferred),
        total => format!("{} of {}", human_bytes(state.transferred), human_bytes(total)),
    };
    let last_step = state
        .latency_ms
        .map_or_else(|| "--".to_string(), |ms| format!("{ms} ms"));

    Paragraph::new(vec![
        Line::from(vec![
            Span::styled("Phase ", label),
            Span::styled(format!("{:<8}", state.phase.label()), phase_style),
            Span::raw(format!("{} {percent:>3}%", bar(percent))),
        ]),
        Line::from(vec![Span::styled("Bytes ", label), Span::raw(transferred)]),
        Line::from(vec![
            Span::styled("Last step ", label),
            Span::raw(last_step),
            Span::styled("  elapsed ", label),
            Span::raw(format!("{}s", state.started.elapsed().as_secs())),
        ]),
        Line::from(vec![
            Span::styled("Now ", label),
            Span::raw(state.status.clone()),
        ]),
    ])
    .wrap(Wrap { trim: true })
}

fn event_panel(state: &RunState) -> Paragraph<'static> {
    let lines: Vec<Line> = state
        .events
        .newest_first()
        .map(|line| Line::from(line.clone()))
        .collect();
    Paragraph::new(lines)
        .block(Block::default().title("Events").borders(Borders::TOP))
        .wrap(Wrap { trim: true })
}

fn bar(percent: u8) -> String {
    let filled = usize::from(percent.min(100)) * BAR_WIDTH / 100;
    format!("[{}{}]", "#".repeat(filled), ".".repeat(BAR_WIDTH - filled))
}

/// Splits `phase=<Name>; <detail>` event strings.
fn parse_phase(message: &str) -> Option<(Phase, &str)> {
    let (name, detail) = message.strip_prefix("phase=")?.split_once(';')?;
    Some((Phase::from_name(name)?, detail.trim()))
}

/// Value of a whitespace-separated `key=value` field.
fn field<T: std::str::FromStr>(message: &str, key: &str) -> Option<T> {
    message
        .split_whitespace()
        .filter_map(|pair| pair.split_once('='))
        .find(|(name, _)| *name == key)
        .and_then(|(_, value)| value.parse().ok())
}

fn human_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}
