//! The interactive terminal loop: draw, handle input, apply stream events.
//!
//! Presentation glue around the orchestrator. The loop reads
//! [`StreamState`](crate::core::state::StreamState) through [`App`] and
//! feeds published stream events back into it between frames; it never
//! mutates the state directly.

use std::error::Error;
use std::io;
use std::time::Duration;

use ratatui::crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame, Terminal,
};
use tokio::sync::mpsc;

use crate::core::app::App;
use crate::core::chat_stream::StreamMessage;
use crate::core::config::Config;
use crate::ui::markdown::render_markdown;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

struct UiState {
    input: String,
    scroll_offset: u16,
    auto_scroll: bool,
}

pub async fn run_chat(config: Config) -> Result<(), Box<dyn Error>> {
    let (mut app, mut rx) = App::new(config);
    let mut ui_state = UiState {
        input: String::new(),
        scroll_offset: 0,
        auto_scroll: true,
    };

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_loop(&mut terminal, &mut app, &mut rx, &mut ui_state);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_loop<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    rx: &mut mpsc::UnboundedReceiver<(StreamMessage, u64)>,
    ui_state: &mut UiState,
) -> Result<(), Box<dyn Error>> {
    loop {
        terminal.draw(|frame| draw(frame, app, ui_state))?;

        if event::poll(POLL_INTERVAL)? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match key.code {
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        app.cancel_current_stream();
                        return Ok(());
                    }
                    KeyCode::Enter => {
                        let prompt = ui_state.input.trim().to_string();
                        if !prompt.is_empty() && !app.state().is_loading() {
                            ui_state.input.clear();
                            ui_state.auto_scroll = true;
                            app.send_message(prompt);
                        }
                    }
                    KeyCode::Char(c) => ui_state.input.push(c),
                    KeyCode::Backspace => {
                        ui_state.input.pop();
                    }
                    KeyCode::Up => {
                        ui_state.auto_scroll = false;
                        ui_state.scroll_offset = ui_state.scroll_offset.saturating_sub(1);
                    }
                    KeyCode::Down => {
                        ui_state.scroll_offset = ui_state.scroll_offset.saturating_add(1);
                    }
                    _ => {}
                }
            }
        }

        // Drain everything the stream task published since the last frame.
        while let Ok((message, stream_id)) = rx.try_recv() {
            app.apply_event(message, stream_id);
        }
    }
}

fn build_display_lines(app: &App) -> Vec<Line<'static>> {
    let state = app.state();
    if let Some(error) = state.error() {
        return vec![Line::from(Span::styled(
            format!("Error: {error}"),
            Style::default().fg(Color::Red),
        ))];
    }
    if state.response().is_empty() && !state.is_loading() {
        return vec![Line::from(Span::styled(
            "Enter a prompt to start the conversation.",
            Style::default().fg(Color::DarkGray),
        ))];
    }

    let mut lines = render_markdown(state.response());
    if state.is_loading() {
        lines.push(Line::from(Span::styled(
            "…",
            Style::default().fg(Color::DarkGray),
        )));
    }
    lines
}

fn draw(frame: &mut Frame, app: &App, ui_state: &mut UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(3)])
        .split(frame.area());

    let lines = build_display_lines(app);
    let available_height = chunks[0].height.saturating_sub(1);
    let total_lines = lines.len() as u16;
    let max_offset = total_lines.saturating_sub(available_height);

    if ui_state.auto_scroll {
        ui_state.scroll_offset = max_offset;
    } else {
        ui_state.scroll_offset = ui_state.scroll_offset.min(max_offset);
        if ui_state.scroll_offset >= max_offset {
            ui_state.auto_scroll = true;
        }
    }

    let response = Paragraph::new(lines)
        .block(Block::default().title("causette"))
        .wrap(Wrap { trim: false })
        .scroll((ui_state.scroll_offset, 0));
    frame.render_widget(response, chunks[0]);

    let input_title = if app.state().is_loading() {
        "Streaming… (Ctrl+C to quit)"
    } else {
        "Type your prompt (Enter to send, Ctrl+C to quit)"
    };
    let input_style = if app.state().is_loading() {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default().fg(Color::Cyan)
    };
    let input = Paragraph::new(ui_state.input.as_str())
        .style(input_style)
        .block(Block::default().borders(Borders::ALL).title(input_title))
        .wrap(Wrap { trim: false });
    frame.render_widget(input, chunks[1]);

    if !app.state().is_loading() {
        frame.set_cursor_position((
            chunks[1].x + ui_state.input.chars().count() as u16 + 1,
            chunks[1].y + 1,
        ));
    }
}
