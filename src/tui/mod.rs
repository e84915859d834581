mod help;
mod state;

use crate::cli::Cli;
use crate::model::{WorkflowEvent, WorkflowPhase};
use crate::orchestrator::{self, UiCommand, WorkflowController};
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs, Wrap},
    Terminal,
};
use state::UiState;
use std::path::{Path, PathBuf};
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

const SPINNER: &[&str] = &["|", "/", "-", "\\"];

pub async fn run(args: Cli) -> Result<()> {
    // Unbounded channels avoid backpressure between the UI thread and the workflow.
    let (event_tx, event_rx) = mpsc::unbounded_channel::<WorkflowEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    let cfg = crate::cli::build_config(&args);
    let classifier = crate::engine::build_classifier(&cfg).context("set up classifier")?;
    let classifier_name = classifier.name().to_string();
    let controller = WorkflowController::new(classifier, &cfg, event_tx);

    // The local offset can only be read reliably before other threads exist.
    let utc_offset = time::UtcOffset::current_local_offset().unwrap_or(time::UtcOffset::UTC);
    let first = args.files.first().cloned();

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let ui_handle = std::thread::spawn(move || {
        let state = UiState {
            classifier: classifier_name,
            max_upload_bytes: cfg.max_upload_bytes,
            utc_offset,
            ..Default::default()
        };
        run_threaded(state, first, event_rx, cmd_tx)
    });

    let res = orchestrator::run_workflow(controller, cmd_rx).await;

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }

    res
}

/// Load `path` on the UI thread and hand it to the workflow.
fn submit_path(state: &mut UiState, path: &Path, cmd_tx: &UnboundedSender<UiCommand>) {
    match crate::input::read_selected_file(path, state.max_upload_bytes) {
        Ok(file) => {
            let _ = cmd_tx.send(UiCommand::Submit(file));
        }
        Err(e) => {
            state.info = format!("Open failed: {e:#}");
        }
    }
}

/// Run the TUI loop on a dedicated thread.
fn run_threaded(
    mut state: UiState,
    first: Option<PathBuf>,
    mut event_rx: UnboundedReceiver<WorkflowEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    match first {
        Some(path) => submit_path(&mut state, &path, &cmd_tx),
        None => state.input = Some(String::new()),
    }

    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    let res = loop {
        while let Ok(ev) = event_rx.try_recv() {
            state.apply_event(ev);
        }

        if last_tick.elapsed() >= tick_rate {
            terminal.draw(|f| draw(f.area(), f, &state)).ok();
            last_tick = Instant::now();
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                if k.modifiers == KeyModifiers::CONTROL && k.code == KeyCode::Char('c') {
                    let _ = cmd_tx.send(UiCommand::Quit);
                    break Ok(());
                }

                if let Some(input) = state.input.as_mut() {
                    match k.code {
                        KeyCode::Enter => {
                            let typed = input.trim().to_string();
                            state.input = None;
                            if !typed.is_empty() {
                                submit_path(&mut state, Path::new(&typed), &cmd_tx);
                            }
                        }
                        KeyCode::Esc => state.input = None,
                        KeyCode::Backspace => {
                            input.pop();
                        }
                        KeyCode::Char(c) => input.push(c),
                        _ => {}
                    }
                    continue;
                }

                match k.code {
                    KeyCode::Char('q') => {
                        let _ = cmd_tx.send(UiCommand::Quit);
                        break Ok(());
                    }
                    KeyCode::Char('o') => {
                        state.open_input();
                    }
                    KeyCode::Char('r') => {
                        let _ = cmd_tx.send(UiCommand::Reset);
                    }
                    KeyCode::Char('x') => {
                        let _ = cmd_tx.send(UiCommand::Abandon);
                    }
                    KeyCode::Char('y') => match state.result_json() {
                        Some(json) => {
                            state.info = match copy_to_clipboard(&json) {
                                Ok(()) => "Copied result JSON to clipboard".into(),
                                Err(e) => format!("Clipboard error: {e:#}"),
                            };
                        }
                        None => state.info = "No result to copy yet".into(),
                    },
                    KeyCode::Tab => state.tab = (state.tab + 1) % 3,
                    KeyCode::BackTab => state.tab = (state.tab + 2) % 3,
                    KeyCode::Char('?') => state.tab = 2,
                    _ => {}
                }
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Length(3)].as_ref())
        .split(area);

    let tabs = Tabs::new(vec![
        Line::from("Workflow"),
        Line::from("Notifications"),
        Line::from("Help"),
    ])
    .select(state.tab)
    .block(Block::default().borders(Borders::ALL).title("fauna-lens"))
    .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(tabs, chunks[0]);

    match state.tab {
        0 => draw_workflow(chunks[1], f, state),
        1 => draw_log(chunks[1], f, state),
        _ => help::draw_help(chunks[1], f),
    }

    draw_footer(chunks[2], f, state);
}

fn draw_workflow(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)].as_ref())
        .split(area);

    let snap = &state.snapshot;
    let phase = match snap.phase {
        WorkflowPhase::Idle => Span::styled("Idle", Style::default().fg(Color::Gray)),
        WorkflowPhase::Analyzing => Span::styled("Analyzing", Style::default().fg(Color::Yellow)),
        WorkflowPhase::Result => Span::styled("Result", Style::default().fg(Color::Green)),
    };
    let mut status = vec![
        Line::from(vec![Span::raw("Phase: "), phase]),
        Line::from(format!("Classifier: {}", state.classifier)),
    ];
    if let Some(name) = &snap.file_name {
        status.push(Line::from(format!("File: {name}")));
    }
    if let Some(preview) = &snap.preview {
        status.push(Line::from(vec![
            Span::raw("Preview: "),
            Span::styled(preview.uri.to_string(), Style::default().fg(Color::Cyan)),
        ]));
        status.push(Line::from(format!("Type: {}", preview.mime_type)));
        status.push(Line::from(format!("Size: {:.1} KiB", preview.size_bytes as f64 / 1024.0)));
    }
    let status = Paragraph::new(status)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title("Photo"));
    f.render_widget(status, cols[0]);

    let body: Vec<Line> = match snap.phase {
        WorkflowPhase::Idle => vec![
            Line::from("Upload a photo to begin."),
            Line::from(""),
            Line::from(vec![
                Span::raw("Press "),
                Span::styled("o", Style::default().fg(Color::Magenta)),
                Span::raw(" and type the path to an image, then Enter."),
            ]),
        ],
        WorkflowPhase::Analyzing => {
            let elapsed = state
                .analyzing_since
                .map(|t| t.elapsed())
                .unwrap_or_default();
            let frame = SPINNER[(elapsed.as_millis() / 150) as usize % SPINNER.len()];
            vec![
                Line::from(format!("{frame} Analyzing image... {:.1}s", elapsed.as_secs_f64())),
                Line::from(""),
                Line::from(vec![
                    Span::raw("Press "),
                    Span::styled("x", Style::default().fg(Color::Magenta)),
                    Span::raw(" to abandon."),
                ]),
            ]
        }
        WorkflowPhase::Result => match &snap.result {
            Some(result) => {
                let name = snap.file_name.as_deref().unwrap_or("");
                let summary = crate::summary::build_text_summary(name, None, result);
                summary
                    .lines
                    .into_iter()
                    .skip(1)
                    .map(|l| {
                        if l.starts_with("Subject:") {
                            Line::styled(l, Style::default().add_modifier(Modifier::BOLD))
                        } else {
                            Line::from(l)
                        }
                    })
                    .collect()
            }
            None => vec![Line::from("No result")],
        },
    };
    let body = Paragraph::new(body)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("Analysis"));
    f.render_widget(body, cols[1]);
}

fn draw_log(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let visible = area.height.saturating_sub(2) as usize;
    let start = state.log.len().saturating_sub(visible);
    let lines: Vec<Line> = state.log[start..].iter().map(state::log_line).collect();
    let p = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Notifications"));
    f.render_widget(p, area);
}

fn draw_footer(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let line = match &state.input {
        Some(input) => Line::from(vec![
            Span::styled("Path: ", Style::default().fg(Color::Magenta)),
            Span::raw(input.clone()),
            Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK)),
        ]),
        None if !state.info.is_empty() => Line::from(state.info.clone()),
        None => Line::styled(
            "o open  r reset  x abandon  y copy  ? help  q quit",
            Style::default().fg(Color::DarkGray),
        ),
    };
    let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
    f.render_widget(p, area);
}

// Global clipboard manager channel - initialized once on first use
use std::sync::mpsc as std_mpsc;
use std::sync::OnceLock;

static CLIPBOARD_SENDER: OnceLock<std_mpsc::Sender<String>> = OnceLock::new();

/// Start the clipboard thread on first use. Each copy keeps its clipboard instance alive
/// for a while so Linux clipboard managers can read the contents.
fn init_clipboard_manager() -> &'static std_mpsc::Sender<String> {
    CLIPBOARD_SENDER.get_or_init(|| {
        let (tx, rx) = std_mpsc::channel::<String>();

        std::thread::spawn(move || {
            use arboard::Clipboard;

            for text in rx {
                match Clipboard::new() {
                    Ok(mut clipboard) => {
                        if clipboard.set_text(&text).is_ok() {
                            std::thread::sleep(Duration::from_secs(2));
                        }
                    }
                    Err(e) => log::warn!("clipboard unavailable: {e}"),
                }
            }
        });

        tx
    })
}

fn copy_to_clipboard(text: &str) -> Result<()> {
    init_clipboard_manager()
        .send(text.to_string())
        .map_err(|_| anyhow::anyhow!("Clipboard manager channel closed"))?;
    Ok(())
}
