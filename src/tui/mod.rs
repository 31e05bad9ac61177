mod bridge;
mod markdown;
mod state;

use crate::cli::Cli;
use crate::gateway::{Backend, Gateway};
use crate::model::{Cell, DisplayDocument, EnrichmentField, Mode, Role, TurnContent};
use crate::orchestrator::{PredictionOutcome, PENDING_TEXT};
use crate::view::View;
use anyhow::{Context, Result};
use bridge::{run_bridge, UiCommand, UiEvent};
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
    widgets::{Block, Borders, Paragraph, Tabs},
    Terminal,
};
use state::UiState;
use std::sync::Arc;
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

pub async fn run(args: Cli) -> Result<()> {
    let cfg = crate::cli::build_config(&args);
    let gateway: Arc<dyn Backend> = Arc::new(Gateway::new(&cfg)?);

    // Unbounded channels keep the input loop free of backpressure stalls.
    let (event_tx, event_rx) = mpsc::unbounded_channel::<UiEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    // The TUI runs on a dedicated thread so its blocking I/O stays out of the
    // Tokio runtime; the bridge task owns the orchestrators.
    let ui_handle = std::thread::spawn(move || run_threaded(event_rx, cmd_tx));

    let res = run_bridge(gateway, event_tx, cmd_rx).await;

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

/// Run the UI loop on a dedicated thread.
fn run_threaded(
    mut event_rx: UnboundedReceiver<UiEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    let mut ui = UiState::default();

    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    let res = loop {
        // Drain bridge events without blocking to keep input responsive.
        while let Ok(ev) = event_rx.try_recv() {
            apply_event(&mut ui, ev);
        }

        if last_tick.elapsed() >= tick_rate {
            terminal.draw(|f| draw(f.area(), f, &ui)).ok();
            last_tick = Instant::now();
        }

        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                if handle_key(&mut ui, k, &cmd_tx) {
                    let _ = cmd_tx.send(UiCommand::Quit);
                    break Ok(());
                }
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();

    res
}

fn apply_event(ui: &mut UiState, ev: UiEvent) {
    match ev {
        UiEvent::TurnStarted { user_text } => {
            ui.chat_busy = true;
            // Mirror the orchestrator's user and pending turns until the
            // final snapshot replaces the scrollback.
            ui.chat_turns
                .push(crate::model::ConversationTurn::user(user_text));
            ui.chat_turns
                .push(crate::model::ConversationTurn::status(PENDING_TEXT));
            ui.chat_scroll = 0;
        }
        UiEvent::ChatUpdated { history, mode } => {
            ui.chat_busy = false;
            ui.chat_turns = history;
            ui.chat_mode = mode;
            ui.chat_scroll = 0;
        }
        UiEvent::ConsoleFinished { result } => {
            ui.console_busy = false;
            ui.console = Some(result);
            ui.console_scroll = 0;
        }
        UiEvent::PredictionFinished { result } => {
            ui.predict_busy = false;
            ui.prediction = Some(result);
        }
    }
}

/// Handle one key press. Returns true when the app should quit.
fn handle_key(ui: &mut UiState, k: KeyEvent, cmd_tx: &UnboundedSender<UiCommand>) -> bool {
    match (k.modifiers, k.code) {
        (KeyModifiers::CONTROL, KeyCode::Char('c') | KeyCode::Char('q')) => return true,
        (_, KeyCode::F(1)) => ui.views.switch_to(View::Chat),
        (_, KeyCode::F(2)) => ui.views.switch_to(View::Explorer),
        (_, KeyCode::F(3)) => ui.views.switch_to(View::Predict),
        _ => match ui.views.current() {
            View::Chat => handle_chat_key(ui, k, cmd_tx),
            View::Explorer => handle_explorer_key(ui, k, cmd_tx),
            View::Predict => handle_predict_key(ui, k, cmd_tx),
        },
    }
    false
}

fn handle_chat_key(ui: &mut UiState, k: KeyEvent, cmd_tx: &UnboundedSender<UiCommand>) {
    match (k.modifiers, k.code) {
        (KeyModifiers::CONTROL, KeyCode::Char('t')) => {
            ui.chat_mode = match ui.chat_mode {
                Mode::Assistant => Mode::StructuredQuery,
                Mode::StructuredQuery => Mode::Assistant,
            };
            let _ = cmd_tx.send(UiCommand::SetMode(ui.chat_mode));
        }
        (_, KeyCode::Enter) => {
            // Re-entrancy is also guarded in the orchestrator; this check
            // just keeps the input from being cleared for nothing.
            if !ui.chat_busy && !ui.chat_input.is_empty() {
                let text = std::mem::take(&mut ui.chat_input);
                let _ = cmd_tx.send(UiCommand::Submit(text));
            }
        }
        (_, KeyCode::Backspace) => {
            ui.chat_input.pop();
        }
        (_, KeyCode::Up) => ui.chat_scroll = ui.chat_scroll.saturating_add(1),
        (_, KeyCode::Down) => ui.chat_scroll = ui.chat_scroll.saturating_sub(1),
        (_, KeyCode::Char(c)) => ui.chat_input.push(c),
        _ => {}
    }
}

fn handle_explorer_key(ui: &mut UiState, k: KeyEvent, cmd_tx: &UnboundedSender<UiCommand>) {
    match (k.modifiers, k.code) {
        (_, KeyCode::F(5)) => send_console_run(ui, cmd_tx, false),
        (_, KeyCode::F(6)) => send_console_run(ui, cmd_tx, true),
        (KeyModifiers::ALT, KeyCode::Char('i')) => ui.toggle_field(EnrichmentField::Image),
        (KeyModifiers::ALT, KeyCode::Char('d')) => {
            ui.toggle_field(EnrichmentField::Description)
        }
        (KeyModifiers::ALT, KeyCode::Char('w')) => ui.toggle_field(EnrichmentField::Website),
        (_, KeyCode::Enter) => ui.editor.push('\n'),
        (_, KeyCode::Tab) => ui.editor.push_str("  "),
        (_, KeyCode::Backspace) => {
            ui.editor.pop();
        }
        (_, KeyCode::Up) => ui.console_scroll = ui.console_scroll.saturating_add(1),
        (_, KeyCode::Down) => ui.console_scroll = ui.console_scroll.saturating_sub(1),
        (_, KeyCode::Char(c)) => ui.editor.push(c),
        _ => {}
    }
}

fn handle_predict_key(ui: &mut UiState, k: KeyEvent, cmd_tx: &UnboundedSender<UiCommand>) {
    match k.code {
        KeyCode::Enter => {
            if !ui.predict_busy {
                ui.predict_busy = true;
                let _ = cmd_tx.send(UiCommand::Predict(ui.predict_input.clone()));
            }
        }
        KeyCode::Backspace => {
            ui.predict_input.pop();
        }
        KeyCode::Char(c) => ui.predict_input.push(c),
        _ => {}
    }
}

fn send_console_run(ui: &mut UiState, cmd_tx: &UnboundedSender<UiCommand>, enrich: bool) {
    ui.console_busy = true;
    let _ = cmd_tx.send(UiCommand::RunQuery {
        query: ui.editor.clone(),
        enrich,
        selection: ui.selection(),
    });
}

fn draw(area: Rect, f: &mut ratatui::Frame, ui: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(4),
            Constraint::Length(1),
        ])
        .split(area);

    draw_header(chunks[0], f, ui);
    match ui.views.current() {
        View::Chat => draw_chat(chunks[1], f, ui),
        View::Explorer => draw_explorer(chunks[1], f, ui),
        View::Predict => draw_predict(chunks[1], f, ui),
    }
    draw_footer(chunks[2], f, ui);
}

fn draw_header(area: Rect, f: &mut ratatui::Frame, ui: &UiState) {
    let selected = View::ALL
        .iter()
        .position(|v| *v == ui.views.current())
        .unwrap_or(0);
    let tabs = Tabs::new(View::ALL.iter().map(|v| Line::from(v.label())))
        .select(selected)
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(ui.views.title()),
        );
    f.render_widget(tabs, area);
}

fn draw_footer(area: Rect, f: &mut ratatui::Frame, ui: &UiState) {
    let hint = match ui.views.current() {
        View::Chat => "Enter send | Ctrl+T mode | Up/Down scroll | F1-F3 views | Ctrl+Q quit",
        View::Explorer => {
            "F5 run raw | F6 run enriched | Alt+i/d/w fields | Tab indent | Ctrl+Q quit"
        }
        View::Predict => "Enter predict | F1-F3 views | Ctrl+Q quit",
    };
    f.render_widget(
        Paragraph::new(Span::styled(hint, Style::default().fg(Color::DarkGray))),
        area,
    );
}

fn draw_chat(area: Rect, f: &mut ratatui::Frame, ui: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(3)])
        .split(area);

    let mut lines: Vec<Line> = vec![
        Line::from(Span::styled(
            format!("AI> {}", state::GREETING),
            Style::default().fg(Color::Gray),
        )),
        Line::from(""),
    ];
    for turn in &ui.chat_turns {
        lines.extend(turn_lines(turn));
        lines.push(Line::from(""));
    }

    let height = chunks[0].height.saturating_sub(2) as usize;
    let max_scroll = lines.len().saturating_sub(height);
    let offset = max_scroll.saturating_sub(ui.chat_scroll.min(max_scroll));

    let scrollback = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Conversation"))
        .scroll((offset as u16, 0));
    f.render_widget(scrollback, chunks[0]);

    let input_title = if ui.chat_busy {
        PENDING_TEXT.to_string()
    } else {
        ui.chat_mode.hint().to_string()
    };
    let shown = if ui.chat_input.is_empty() {
        Span::styled(
            ui.chat_mode.placeholder(),
            Style::default().fg(Color::DarkGray),
        )
    } else {
        Span::raw(ui.chat_input.as_str())
    };
    let input = Paragraph::new(Line::from(vec![Span::raw("> "), shown]))
        .block(Block::default().borders(Borders::ALL).title(input_title));
    f.render_widget(input, chunks[1]);
}

fn draw_explorer(area: Rect, f: &mut ratatui::Frame, ui: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(area);

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(4), Constraint::Length(3)])
        .split(chunks[0]);

    let editor = Paragraph::new(ui.editor.as_str()).block(
        Block::default()
            .borders(Borders::ALL)
            .title("SPARQL Query Editor"),
    );
    f.render_widget(editor, left[0]);

    let mut opts: Vec<Span> = vec![Span::raw("Enrichment: ")];
    for (field, on) in EnrichmentField::ALL.iter().zip(ui.enrich_toggles) {
        let mark = if on { "[x] " } else { "[ ] " };
        let style = if on {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        opts.push(Span::styled(format!("{mark}{} ", field.as_str()), style));
    }
    f.render_widget(
        Paragraph::new(Line::from(opts)).block(Block::default().borders(Borders::ALL)),
        left[1],
    );

    let title = match &ui.console {
        Some(Ok(out)) => match out.row_count {
            Some(n) => format!("Results ({n} rows)"),
            None => "Results".to_string(),
        },
        _ => "Results".to_string(),
    };

    let lines = if ui.console_busy {
        vec![Line::from(Span::styled(
            "Querying Knowledge Graph...",
            Style::default().fg(Color::Cyan),
        ))]
    } else {
        match &ui.console {
            None => vec![Line::from(Span::styled(
                "Execute a query to see results...",
                Style::default().fg(Color::DarkGray),
            ))],
            Some(Err(message)) => vec![Line::from(Span::styled(
                format!("Error: {message}"),
                Style::default().fg(Color::Red),
            ))],
            Some(Ok(out)) => document_lines(&out.document),
        }
    };

    let height = chunks[1].height.saturating_sub(2) as usize;
    let max_scroll = lines.len().saturating_sub(height);
    let offset = ui.console_scroll.min(max_scroll);

    let results = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(title))
        .scroll((offset as u16, 0));
    f.render_widget(results, chunks[1]);
}

fn draw_predict(area: Rect, f: &mut ratatui::Frame, ui: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(3)])
        .split(area);

    let shown = if ui.predict_input.is_empty() {
        Span::styled(
            "http://data.cyclingtour.fr/data#Client_...",
            Style::default().fg(Color::DarkGray),
        )
    } else {
        Span::raw(ui.predict_input.as_str())
    };
    let input = Paragraph::new(Line::from(vec![Span::raw("> "), shown]))
        .block(Block::default().borders(Borders::ALL).title("Client URI"));
    f.render_widget(input, chunks[0]);

    let lines = prediction_lines(ui);
    let result = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Recommendations"),
    );
    f.render_widget(result, chunks[1]);
}

fn prediction_lines(ui: &UiState) -> Vec<Line<'static>> {
    if ui.predict_busy {
        return vec![Line::from(Span::styled(
            "Scoring client profile...",
            Style::default().fg(Color::Cyan),
        ))];
    }
    match &ui.prediction {
        None => vec![Line::from(Span::styled(
            "Enter a client URI and press Enter to predict the next best tour.",
            Style::default().fg(Color::DarkGray),
        ))],
        Some(Err(message)) => vec![Line::from(Span::styled(
            format!("Error: {message}"),
            Style::default().fg(Color::Red),
        ))],
        Some(Ok(PredictionOutcome::Invalid { message })) => vec![Line::from(Span::styled(
            message.clone(),
            Style::default().fg(Color::Yellow),
        ))],
        Some(Ok(PredictionOutcome::Failed { message })) => vec![Line::from(Span::styled(
            format!("Error: {message}"),
            Style::default().fg(Color::Red),
        ))],
        Some(Ok(PredictionOutcome::NoRecommendations)) => vec![Line::from(Span::styled(
            "No recommendations for this client.",
            Style::default()
                .fg(Color::Gray)
                .add_modifier(Modifier::ITALIC),
        ))],
        Some(Ok(PredictionOutcome::Ranked(items))) => {
            let mut lines = Vec::with_capacity(items.len() + 1);
            for (i, item) in items.iter().enumerate() {
                let text = format!(
                    "{:>2}. {} [{}] {}",
                    i + 1,
                    item.short_name(),
                    item.score_percent(),
                    item.label
                );
                let style = if i == 0 {
                    Style::default()
                        .fg(Color::Green)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                lines.push(Line::from(Span::styled(text, style)));
                if i == 0 {
                    lines.push(Line::from(Span::styled(
                        format!("    {}", item.tour_uri),
                        Style::default().fg(Color::DarkGray),
                    )));
                }
            }
            lines
        }
    }
}

fn turn_lines(turn: &crate::model::ConversationTurn) -> Vec<Line<'static>> {
    let (prefix, prefix_style) = match turn.role {
        Role::User => ("ME> ", Style::default().fg(Color::Cyan)),
        Role::Assistant => ("AI> ", Style::default().fg(Color::Green)),
        Role::Status => ("SYS> ", Style::default().fg(Color::Yellow)),
    };

    match &turn.content {
        TurnContent::Plain(text) => vec![Line::from(vec![
            Span::styled(prefix, prefix_style),
            Span::raw(text.clone()),
        ])],
        TurnContent::Answer(answer) => {
            let mut lines = vec![Line::from(Span::styled(prefix, prefix_style))];
            lines.extend(markdown::to_lines(answer));
            lines
        }
        TurnContent::QueryOutcome { query, results } => {
            let mut lines = vec![
                Line::from(Span::styled(prefix, prefix_style)),
                Line::from(Span::styled(
                    "SPARQL GENERATED",
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                )),
            ];
            for l in query.lines() {
                lines.push(Line::from(Span::styled(
                    format!("  {l}"),
                    Style::default().fg(Color::Yellow),
                )));
            }
            lines.push(Line::from(""));
            lines.extend(document_lines(results));
            lines
        }
    }
}

/// Styled, column-aligned lines for a display document.
fn document_lines(doc: &DisplayDocument) -> Vec<Line<'static>> {
    match doc {
        DisplayDocument::NoResults => vec![Line::from(Span::styled(
            "No results found.",
            Style::default()
                .fg(Color::Gray)
                .add_modifier(Modifier::ITALIC),
        ))],
        DisplayDocument::Error { message } => vec![Line::from(Span::styled(
            format!("Error: {message}"),
            Style::default().fg(Color::Red),
        ))],
        DisplayDocument::Table { columns, rows } => {
            let body: Vec<Vec<(String, Style)>> = rows
                .iter()
                .map(|row| row.iter().map(cell_text).collect())
                .collect();

            let widths: Vec<usize> = columns
                .iter()
                .enumerate()
                .map(|(i, col)| {
                    body.iter()
                        .map(|row| row.get(i).map(|(t, _)| t.chars().count()).unwrap_or(0))
                        .chain(std::iter::once(col.chars().count()))
                        .max()
                        .unwrap_or(0)
                })
                .collect();

            let mut lines = Vec::with_capacity(rows.len() + 2);
            lines.push(Line::from(
                columns
                    .iter()
                    .zip(widths.iter().copied())
                    .map(|(col, w)| {
                        Span::styled(
                            format!("{col:<w$}  "),
                            Style::default()
                                .fg(Color::Cyan)
                                .add_modifier(Modifier::BOLD),
                        )
                    })
                    .collect::<Vec<_>>(),
            ));
            lines.push(Line::from(Span::styled(
                widths
                    .iter()
                    .map(|w| "-".repeat(*w))
                    .collect::<Vec<_>>()
                    .join("  "),
                Style::default().fg(Color::DarkGray),
            )));
            for row in body {
                lines.push(Line::from(
                    row.into_iter()
                        .zip(widths.iter().copied())
                        .map(|((text, style), w)| Span::styled(format!("{text:<w$}  "), style))
                        .collect::<Vec<_>>(),
                ));
            }
            lines
        }
    }
}

/// Terminal treatment for one cell: text plus style. Images and links keep a
/// recognizable marker since the terminal cannot embed them.
fn cell_text(cell: &Cell) -> (String, Style) {
    match cell {
        Cell::Empty => (
            "\u{2014}".into(),
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        ),
        Cell::Image { url } => (
            format!("[img] {}", crate::render::link_label(url)),
            Style::default().fg(Color::Magenta),
        ),
        Cell::Link { label, .. } => (
            label.clone(),
            Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::UNDERLINED),
        ),
        Cell::LongText { text } => (clamp(text, 60), Style::default().fg(Color::Gray)),
        Cell::Text { text } => (clamp(text, 60), Style::default()),
    }
}

fn clamp(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max - 3).collect();
    out.push_str("...");
    out
}
