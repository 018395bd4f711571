use std::collections::VecDeque;
use std::io;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crossterm::ExecutableCommand;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use miette::IntoDiagnostic;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Gauge, Paragraph, Wrap};

use crate::app::{ProgressEvent, ProgressSink, ProgressSinkKind};
use crate::error::ScryError;
use crate::progress::{ProgressSnapshot, ProgressTracker};

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const LOGS_MAX: usize = 200;
const LOGS_VISIBLE: usize = 12;
const SPINNER: &[char] = &['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Resolve,
    Prepare,
    Fetch,
    Store,
}

impl Phase {
    fn label(self) -> &'static str {
        match self {
            Phase::Resolve => "Resolve",
            Phase::Prepare => "Prepare",
            Phase::Fetch => "Fetch",
            Phase::Store => "Store",
        }
    }
}

#[derive(Debug)]
struct ScreenState {
    status: String,
    phase: Phase,
    logs: VecDeque<String>,
    started: Instant,
}

pub struct Tui {
    kind: ProgressSinkKind,
    state: Arc<Mutex<ScreenState>>,
}

struct TuiProgress {
    state: Arc<Mutex<ScreenState>>,
}

impl ProgressSink for TuiProgress {
    fn event(&self, event: ProgressEvent) {
        if let Ok(mut state) = self.state.lock() {
            let message = event.message.trim().to_string();
            if let Some((phase, payload)) = parse_phase(&message) {
                state.phase = phase;
                state.status = payload.to_string();
            } else {
                state.status = message.clone();
            }
            let line = match event.elapsed {
                Some(elapsed) => format!("[{}] {message} ({:.1}s)", timestamp(), elapsed.as_secs_f64()),
                None => format!("[{}] {message}", timestamp()),
            };
            push_log(&mut state.logs, line);
        }
    }
}

impl Tui {
    pub fn new(kind: ProgressSinkKind) -> Self {
        Self {
            kind,
            state: Arc::new(Mutex::new(ScreenState {
                status: "starting".to_string(),
                phase: Phase::Resolve,
                logs: VecDeque::new(),
                started: Instant::now(),
            })),
        }
    }

    /// Runs `f` on a worker thread and redraws every 100ms from the tracker
    /// until it returns. The batch itself cannot be cancelled; Ctrl+C only
    /// leaves the screen.
    pub fn run<F, R>(&mut self, tracker: Arc<ProgressTracker>, f: F) -> miette::Result<R>
    where
        F: FnOnce(&dyn ProgressSink) -> Result<R, ScryError> + Send + 'static,
        R: Send + 'static,
    {
        let mut stdout = io::stdout();
        enable_raw_mode().into_diagnostic()?;
        stdout.execute(EnterAlternateScreen).into_diagnostic()?;

        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).into_diagnostic()?;
        terminal.clear().into_diagnostic()?;

        let (tx, rx) = mpsc::channel();
        let sink = TuiProgress {
            state: self.state.clone(),
        };
        let handle = thread::spawn(move || tx.send(f(&sink)));

        let mut tick = 0usize;
        loop {
            let snapshot = tracker.snapshot();
            if let Ok(state) = self.state.lock() {
                terminal
                    .draw(|frame| draw_ui(frame, self.kind, &state, snapshot, tick))
                    .into_diagnostic()?;
            }

            if let Some(result) = poll_worker(&rx) {
                restore_terminal()?;
                handle.join().ok();
                return result;
            }

            if event::poll(POLL_INTERVAL).into_diagnostic()? {
                if let Event::Key(key) = event::read().into_diagnostic()? {
                    let interrupted = key.kind == KeyEventKind::Press
                        && key.modifiers.contains(KeyModifiers::CONTROL)
                        && matches!(key.code, KeyCode::Char('c'));
                    if interrupted {
                        break;
                    }
                }
            }

            tick = tick.wrapping_add(1);
        }

        restore_terminal()?;
        Err(miette::Report::msg("interrupted; in-flight downloads were abandoned"))
    }
}

/// `None` while the worker is still running. A worker that died without
/// sending (it panicked) surfaces as an error instead of hanging the screen.
fn poll_worker<R>(rx: &Receiver<Result<R, ScryError>>) -> Option<miette::Result<R>> {
    match rx.try_recv() {
        Ok(result) => Some(result.map_err(miette::Report::new)),
        Err(TryRecvError::Empty) => None,
        Err(TryRecvError::Disconnected) => Some(Err(miette::Report::msg(
            "download worker stopped unexpectedly",
        ))),
    }
}

fn restore_terminal() -> miette::Result<()> {
    disable_raw_mode().into_diagnostic()?;
    let mut stdout = io::stdout();
    stdout.execute(LeaveAlternateScreen).into_diagnostic()?;
    Ok(())
}

fn draw_ui(
    frame: &mut ratatui::Frame,
    kind: ProgressSinkKind,
    state: &ScreenState,
    snapshot: ProgressSnapshot,
    tick: usize,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(6),
            Constraint::Length(1),
        ])
        .split(frame.area());

    frame.render_widget(draw_header(kind, state, tick), chunks[0]);
    frame.render_widget(draw_gauge(snapshot), chunks[1]);
    frame.render_widget(draw_logs(state), chunks[2]);
    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(
            "ctrl+c: leave (downloads are not cancelled cleanly)",
            Style::default().fg(Color::DarkGray),
        ))),
        chunks[3],
    );
}

fn draw_header(kind: ProgressSinkKind, state: &ScreenState, tick: usize) -> Paragraph<'static> {
    let title = match kind {
        ProgressSinkKind::Sets => "Set download",
        ProgressSinkKind::Card => "Card download",
    };
    let spinner = SPINNER[tick % SPINNER.len()];
    let elapsed = state.started.elapsed().as_secs();
    Paragraph::new(Line::from(vec![
        Span::styled(
            format!(" scry-dl · {title} "),
            Style::default()
                .fg(Color::White)
                .bg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!(" {spinner} {} ", state.phase.label())),
        Span::styled(state.status.clone(), Style::default().fg(Color::Cyan)),
        Span::styled(
            format!("  {:02}:{:02}", elapsed / 60, elapsed % 60),
            Style::default().fg(Color::DarkGray),
        ),
    ]))
    .block(Block::default().borders(Borders::ALL))
}

fn draw_gauge(snapshot: ProgressSnapshot) -> Gauge<'static> {
    let label = if snapshot.planned == 0 {
        "preparing...".to_string()
    } else {
        format!(
            "{}/{} ({:.1}%)",
            snapshot.completed,
            snapshot.planned,
            snapshot.ratio() * 100.0
        )
    };
    Gauge::default()
        .block(Block::default().borders(Borders::ALL).title("Progress"))
        .gauge_style(Style::default().fg(Color::Green))
        .ratio(snapshot.ratio())
        .label(label)
}

fn draw_logs(state: &ScreenState) -> Paragraph<'static> {
    let start = state.logs.len().saturating_sub(LOGS_VISIBLE);
    let lines = state
        .logs
        .iter()
        .skip(start)
        .map(|line| {
            let color = if line.contains("failed") || line.contains("not found") {
                Color::Red
            } else if line.contains("finished") || line.contains("downloaded") {
                Color::Green
            } else {
                Color::Reset
            };
            Line::from(Span::styled(line.clone(), Style::default().fg(color)))
        })
        .collect::<Vec<_>>();
    Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Activity"))
        .wrap(Wrap { trim: true })
}

fn parse_phase(message: &str) -> Option<(Phase, &str)> {
    let (tag, rest) = message.split_once(';')?;
    let phase = match tag.strip_prefix("phase=")? {
        "Resolve" => Phase::Resolve,
        "Prepare" => Phase::Prepare,
        "Fetch" => Phase::Fetch,
        "Store" => Phase::Store,
        _ => return None,
    };
    Some((phase, rest.trim()))
}

fn push_log(buffer: &mut VecDeque<String>, item: String) {
    buffer.push_back(item);
    while buffer.len() > LOGS_MAX {
        buffer.pop_front();
    }
}

fn timestamp() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}
