mod export;
mod help;
mod state;

use crate::cli::{build_config, Cli};
use crate::model::{ClientEvent, Mode};
use crate::orchestrator::{self, UiCommand};
use crate::text_summary;
use crate::transport::{HttpTransport, Transport};
use crate::workflow::Workflow;
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
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
use state::{push_wrapped_status_kv, UiState};
use std::sync::Arc;
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

const MODES: [Mode; 3] = [Mode::New, Mode::Resume, Mode::List];

/// What a key press asks the UI loop to do.
#[derive(Debug, PartialEq)]
enum KeyAction {
    Send(UiCommand),
    Export,
    CopyThread,
    Quit,
    Nothing,
}

pub async fn run(args: Cli) -> Result<()> {
    let (event_tx, event_rx) = mpsc::unbounded_channel::<ClientEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    let cfg = build_config(&args);
    let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(&cfg)?);
    tracing::info!(base_url = %cfg.base_url, "starting interactive session");

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let initial = UiState::new(
        Workflow::new(args.initial_query.clone()).snapshot(),
        cfg.base_url.clone(),
    );
    let ui_handle = std::thread::spawn(move || run_threaded(initial, event_rx, cmd_tx));

    let res =
        orchestrator::run_controller(transport, args.initial_query.clone(), event_tx, cmd_rx).await;

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

/// Run the TUI loop on a dedicated thread.
fn run_threaded(
    mut state: UiState,
    mut event_rx: UnboundedReceiver<ClientEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    let res = loop {
        // Drain events without blocking to keep the UI responsive.
        while let Ok(ev) = event_rx.try_recv() {
            state.apply_event(ev);
        }

        if last_tick.elapsed() >= tick_rate {
            terminal.draw(|f| draw(f.area(), f, &state)).ok();
            last_tick = Instant::now();
        }

        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                match handle_key(&mut state, k) {
                    KeyAction::Send(cmd) => {
                        let _ = cmd_tx.send(cmd);
                    }
                    KeyAction::Export => export::export_and_show_path(&mut state),
                    KeyAction::CopyThread => export::copy_thread_id(&mut state),
                    KeyAction::Quit => {
                        let _ = cmd_tx.send(UiCommand::Quit);
                        break Ok(());
                    }
                    KeyAction::Nothing => {}
                }
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

/// Map a key press to an action, updating local view state (input text, scroll, help).
fn handle_key(state: &mut UiState, k: KeyEvent) -> KeyAction {
    let ctrl = k.modifiers.contains(KeyModifiers::CONTROL);
    match k.code {
        KeyCode::Char('c') if ctrl => return KeyAction::Quit,
        KeyCode::Esc if state.show_help => {
            state.show_help = false;
            return KeyAction::Nothing;
        }
        KeyCode::Esc => return KeyAction::Quit,
        KeyCode::F(1) => {
            state.show_help = !state.show_help;
            return KeyAction::Nothing;
        }
        _ => {}
    }
    if state.show_help {
        return KeyAction::Nothing;
    }

    match k.code {
        KeyCode::Tab => {
            let next = state.snapshot.mode.next();
            switch_mode(state, next)
        }
        KeyCode::F(n @ 2..=4) => switch_mode(state, MODES[(n - 2) as usize]),
        KeyCode::Char('s') if ctrl => KeyAction::Export,
        KeyCode::Char('y') if ctrl => KeyAction::CopyThread,
        KeyCode::Char('u') if ctrl => match state.input_mut() {
            Some(input) => {
                input.clear();
                input_command(state)
            }
            None => KeyAction::Nothing,
        },
        KeyCode::Enter => KeyAction::Send(match state.snapshot.mode {
            Mode::New => UiCommand::StartRun,
            Mode::Resume => UiCommand::ResumeRun,
            Mode::List => UiCommand::RefreshSessions,
        }),
        KeyCode::Up => {
            state.documents_scroll = state.documents_scroll.saturating_sub(1);
            KeyAction::Nothing
        }
        KeyCode::Down => {
            state.documents_scroll = state.documents_scroll.saturating_add(1);
            KeyAction::Nothing
        }
        KeyCode::PageUp => {
            state.workflow_scroll = state.workflow_scroll.saturating_sub(10);
            KeyAction::Nothing
        }
        KeyCode::PageDown => {
            state.workflow_scroll = state.workflow_scroll.saturating_add(10);
            KeyAction::Nothing
        }
        KeyCode::Backspace => match state.input_mut() {
            Some(input) => {
                input.pop();
                input_command(state)
            }
            None => KeyAction::Nothing,
        },
        KeyCode::Char(c) if !ctrl => match state.input_mut() {
            Some(input) => {
                input.push(c);
                input_command(state)
            }
            None => match c {
                'q' => KeyAction::Quit,
                'r' => KeyAction::Send(UiCommand::RefreshSessions),
                _ => KeyAction::Nothing,
            },
        },
        _ => KeyAction::Nothing,
    }
}

// Switching (even to the current mode) clears the thread id on both sides.
fn switch_mode(state: &mut UiState, mode: Mode) -> KeyAction {
    state.thread_input.clear();
    KeyAction::Send(UiCommand::SwitchMode(mode))
}

fn input_command(state: &UiState) -> KeyAction {
    match state.snapshot.mode {
        Mode::New => KeyAction::Send(UiCommand::SetQuery(state.query_input.clone())),
        Mode::Resume => KeyAction::Send(UiCommand::SetThreadId(state.thread_input.clone())),
        Mode::List => KeyAction::Nothing,
    }
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let input_height = if state.input().is_some() { 3 } else { 0 };
    let main = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(input_height),
            Constraint::Min(5),
            Constraint::Length(4),
        ])
        .split(area);

    let selected = MODES
        .iter()
        .position(|m| *m == state.snapshot.mode)
        .unwrap_or(0);
    let titles: Vec<Line> = MODES.iter().map(|m| Line::from(m.label())).collect();
    let tabs = Tabs::new(titles)
        .select(selected)
        .highlight_style(Style::default().fg(Color::Green).add_modifier(Modifier::BOLD))
        .block(Block::default().borders(Borders::ALL).title("Agentic Diagnosis"));
    f.render_widget(tabs, main[0]);

    if let Some(input) = state.input() {
        let title = match state.snapshot.mode {
            Mode::New => "Query Reported (enter: Run Agent)",
            _ => "Thread ID (enter: Resume Agent)",
        };
        let style = if state.snapshot.busy {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default()
        };
        let p = Paragraph::new(Line::from(vec![
            Span::styled(input.to_string(), style),
            Span::styled("▏", Style::default().fg(Color::Magenta)),
        ]))
        .block(Block::default().borders(Borders::ALL).title(title));
        f.render_widget(p, main[1]);
    }

    draw_columns(main[2], f, state);
    draw_status(main[3], f, state);

    if state.show_help {
        draw_help_overlay(area, f);
    }
}

fn draw_columns(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let snap = &state.snapshot;
    if snap.mode == Mode::List {
        let hint = Paragraph::new(vec![
            Line::from("Recent sessions recorded by the backend."),
            Line::from(vec![
                Span::styled("r", Style::default().fg(Color::Magenta)),
                Span::raw(" / "),
                Span::styled("enter", Style::default().fg(Color::Magenta)),
                Span::raw("  Refresh"),
            ]),
        ])
        .block(Block::default().borders(Borders::ALL).title("List Sessions"));
        f.render_widget(hint, cols[0]);
    } else {
        let workflow: Vec<Line> = text_summary::workflow_lines(snap)
            .into_iter()
            .map(style_workflow_line)
            .collect();
        let workflow = if workflow.is_empty() {
            vec![Line::from(Span::styled(
                "Enter a query and press enter to run the agent.",
                Style::default().fg(Color::Gray),
            ))]
        } else {
            workflow
        };
        let p = Paragraph::new(workflow)
            .wrap(Wrap { trim: false })
            .scroll((state.workflow_scroll, 0))
            .block(Block::default().borders(Borders::ALL).title(snap.mode.label()));
        f.render_widget(p, cols[0]);
    }

    let right: Vec<Line> = match text_summary::documents_lines(snap) {
        Ok(lines) => lines.into_iter().skip(1).map(Line::from).collect(),
        Err(e) => vec![Line::from(Span::styled(
            format!("Cannot render documents: {e:#}"),
            Style::default().fg(Color::Red),
        ))],
    };
    let title = if snap.mode == Mode::List {
        "Session Documents"
    } else {
        "Agent Run Documents"
    };
    let p = Paragraph::new(right)
        .wrap(Wrap { trim: false })
        .scroll((state.documents_scroll, 0))
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(p, cols[1]);
}

fn style_workflow_line(line: String) -> Line<'static> {
    match line.as_str() {
        "Agent Workflow" | "Chain-of-Thought" | "Final Recommendation" => Line::from(Span::styled(
            line,
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        "Processing... The agent is thinking..." => Line::from(Span::styled(
            line,
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::ITALIC),
        )),
        _ if line.starts_with("Thread ID: ") => {
            Line::from(Span::styled(line, Style::default().fg(Color::Magenta)))
        }
        _ => Line::from(line),
    }
}

fn draw_status(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let mut lines = Vec::new();
    push_wrapped_status_kv(&mut lines, "Backend", &state.base_url, area.width, 1, Style::default());
    if let Some(err) = state.snapshot.error.as_ref() {
        push_wrapped_status_kv(
            &mut lines,
            &format!("{:?}", err.kind),
            &err.message,
            area.width,
            1,
            Style::default().fg(Color::Red),
        );
    } else {
        push_wrapped_status_kv(&mut lines, "Info", &state.info, area.width, 1, Style::default());
    }
    let status = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Status (F1 help)"),
    );
    f.render_widget(status, area);
}

fn draw_help_overlay(area: Rect, f: &mut ratatui::Frame) {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(10),
            Constraint::Percentage(80),
            Constraint::Percentage(10),
        ])
        .split(area);
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(10),
            Constraint::Percentage(80),
            Constraint::Percentage(10),
        ])
        .split(vertical[1]);
    help::draw_help(horizontal[1], f);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn state() -> UiState {
        UiState::new(Workflow::new("").snapshot(), "http://localhost:8000/api".into())
    }

    #[test]
    fn typing_updates_query_in_new_mode() {
        let mut st = state();
        assert_eq!(handle_key(&mut st, key(KeyCode::Char('h'))), KeyAction::Send(UiCommand::SetQuery("h".into())));
        assert_eq!(handle_key(&mut st, key(KeyCode::Char('i'))), KeyAction::Send(UiCommand::SetQuery("hi".into())));
        assert_eq!(handle_key(&mut st, key(KeyCode::Backspace)), KeyAction::Send(UiCommand::SetQuery("h".into())));
        assert_eq!(handle_key(&mut st, key(KeyCode::Enter)), KeyAction::Send(UiCommand::StartRun));
    }

    #[test]
    fn fast_typing_survives_lagging_echoes() {
        let mut st = state();
        let stale = st.snapshot.clone();
        for c in "abc".chars() {
            handle_key(&mut st, key(KeyCode::Char(c)));
            st.apply_event(ClientEvent::Snapshot(Box::new(stale.clone())));
        }
        assert_eq!(handle_key(&mut st, key(KeyCode::Char('d'))), KeyAction::Send(UiCommand::SetQuery("abcd".into())));
    }

    #[test]
    fn switching_mode_clears_typed_thread() {
        let mut st = state();
        st.snapshot.mode = Mode::Resume;
        handle_key(&mut st, key(KeyCode::Char('t')));
        assert_eq!(handle_key(&mut st, key(KeyCode::F(3))), KeyAction::Send(UiCommand::SwitchMode(Mode::Resume)));
        assert_eq!(st.input(), Some(""));
    }

    #[test]
    fn typing_updates_thread_in_resume_mode() {
        let mut st = state();
        st.snapshot.mode = Mode::Resume;
        // 'q' is text here, not quit.
        assert_eq!(handle_key(&mut st, key(KeyCode::Char('q'))), KeyAction::Send(UiCommand::SetThreadId("q".into())));
        assert_eq!(handle_key(&mut st, ctrl('u')), KeyAction::Send(UiCommand::SetThreadId(String::new())));
        assert_eq!(handle_key(&mut st, key(KeyCode::Enter)), KeyAction::Send(UiCommand::ResumeRun));
    }

    #[test]
    fn list_mode_shortcuts() {
        let mut st = state();
        st.snapshot.mode = Mode::List;
        assert_eq!(handle_key(&mut st, key(KeyCode::Char('r'))), KeyAction::Send(UiCommand::RefreshSessions));
        assert_eq!(handle_key(&mut st, key(KeyCode::Tab)), KeyAction::Send(UiCommand::SwitchMode(Mode::New)));
        assert_eq!(handle_key(&mut st, key(KeyCode::Char('q'))), KeyAction::Quit);
    }

    #[test]
    fn function_keys_select_modes() {
        let mut st = state();
        assert_eq!(handle_key(&mut st, key(KeyCode::F(3))), KeyAction::Send(UiCommand::SwitchMode(Mode::Resume)));
        assert_eq!(handle_key(&mut st, key(KeyCode::F(4))), KeyAction::Send(UiCommand::SwitchMode(Mode::List)));
        assert_eq!(handle_key(&mut st, ctrl('s')), KeyAction::Export);
        assert_eq!(handle_key(&mut st, ctrl('y')), KeyAction::CopyThread);
    }

    #[test]
    fn help_swallows_keys_until_closed() {
        let mut st = state();
        handle_key(&mut st, key(KeyCode::F(1)));
        assert!(st.show_help);
        assert_eq!(handle_key(&mut st, key(KeyCode::Enter)), KeyAction::Nothing);
        assert_eq!(handle_key(&mut st, key(KeyCode::Esc)), KeyAction::Nothing);
        assert!(!st.show_help);
        assert_eq!(handle_key(&mut st, key(KeyCode::Esc)), KeyAction::Quit);
        assert_eq!(handle_key(&mut st, ctrl('c')), KeyAction::Quit);
    }
}
