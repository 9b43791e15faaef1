use chrono::Utc;
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Position, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
};
use windchat_core::format::{format_chat_time, format_message_time};
use windchat_core::{Origin, SessionSnapshot};
use crate::app::{App, FocusPane};

const WELCOME: &str = "I'm here to help you diagnose wind turbine faults, analyze performance data, \
and recommend maintenance actions. Start by describing your turbine issue.";

/// Colors for the current theme
struct Palette {
    bg: Color,
    fg: Color,
    dim: Color,
    accent: Color,
    user: Color,
    assistant: Color,
    highlight_bg: Color,
}

impl Palette {
    fn for_mode(dark_mode: bool) -> Self {
        if dark_mode {
            Self {
                bg: Color::Black,
                fg: Color::White,
                dim: Color::DarkGray,
                accent: Color::Cyan,
                user: Color::LightBlue,
                assistant: Color::LightGreen,
                highlight_bg: Color::Rgb(30, 58, 95),
            }
        } else {
            Self {
                bg: Color::White,
                fg: Color::Black,
                dim: Color::Gray,
                accent: Color::Blue,
                user: Color::Blue,
                assistant: Color::Green,
                highlight_bg: Color::Rgb(219, 234, 254),
            }
        }
    }

    fn base(&self) -> Style {
        Style::default().fg(self.fg).bg(self.bg)
    }

    fn border(&self, focused: bool) -> Style {
        if focused {
            Style::default().fg(self.accent)
        } else {
            Style::default().fg(self.dim)
        }
    }
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let palette = Palette::for_mode(app.dark_mode);
    // Render from an owned copy so the watch guard is not held while app state changes
    let snapshot = app.snapshot().clone();

    frame.render_widget(Block::default().style(palette.base()), frame.area());

    let [header, body, footer] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    let [sidebar, main] = Layout::horizontal([Constraint::Percentage(30), Constraint::Percentage(70)]).areas(body);
    let [chat, input] = Layout::vertical([Constraint::Min(0), Constraint::Length(3)]).areas(main);

    render_header(app, &palette, frame, header);
    render_sidebar(app, &snapshot, &palette, frame, sidebar);
    render_chat(app, &snapshot, &palette, frame, chat);
    render_input(app, &snapshot, &palette, frame, input);
    render_footer(app, &palette, frame, footer);
}

fn render_header(app: &App, palette: &Palette, frame: &mut Frame, area: Rect) {
    let theme = if app.dark_mode { "dark" } else { "light" };
    let line = Line::from(vec![
        Span::styled(
            " Wind Turbine Fault Diagnostics ",
            Style::default().fg(palette.accent).add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!(" [{}]", theme), Style::default().fg(palette.dim)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn render_footer(app: &App, palette: &Palette, frame: &mut Frame, area: Rect) {
    let text = match &app.status {
        Some(status) => Span::styled(format!(" {}", status), Style::default().fg(Color::Yellow)),
        None => {
            let keys = match app.focus {
                FocusPane::Sidebar => " j/k: move  Enter: open  n: new chat  t: theme  i: type  q: quit",
                FocusPane::Input => " Enter: send  Esc: chats  ^N: new chat  ^T: theme  PgUp/PgDn: scroll  ^C: quit",
            };
            Span::styled(keys, Style::default().fg(palette.dim))
        }
    };
    frame.render_widget(Paragraph::new(Line::from(text)), area);
}

fn render_sidebar(app: &mut App, snapshot: &SessionSnapshot, palette: &Palette, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .title(" Recent Chats ")
        .borders(Borders::ALL)
        .border_style(palette.border(app.focus == FocusPane::Sidebar));

    if snapshot.conversations.is_empty() {
        let empty = Paragraph::new("No chat history yet")
            .style(Style::default().fg(palette.dim))
            .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let now = Utc::now();
    let items: Vec<ListItem> = snapshot
        .conversations
        .iter()
        .map(|conversation| {
            let marker = if Some(conversation.id) == snapshot.active_conversation_id { "● " } else { "  " };
            ListItem::new(Text::from(vec![
                Line::from(vec![
                    Span::styled(marker, Style::default().fg(palette.accent)),
                    Span::styled(conversation.title.clone(), Style::default().fg(palette.fg)),
                ]),
                Line::from(Span::styled(
                    format!("  {}", format_chat_time(conversation.updated_at, now)),
                    Style::default().fg(palette.dim),
                )),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(palette.highlight_bg).add_modifier(Modifier::BOLD));

    frame.render_stateful_widget(list, area, &mut app.sidebar_state);
}

fn render_chat(app: &mut App, snapshot: &SessionSnapshot, palette: &Palette, frame: &mut Frame, area: Rect) {
    let title = app
        .active_title()
        .map(|t| format!(" {} ", t))
        .unwrap_or_else(|| " New Chat ".to_string());
    let block = Block::default().title(title).borders(Borders::ALL).border_style(palette.border(false));

    // Record inner size for scroll calculations
    let inner = block.inner(area);
    app.chat_height = inner.height;
    app.chat_width = inner.width;

    if snapshot.active_messages.is_empty() && !snapshot.pending {
        let welcome = Paragraph::new(vec![
            Line::from(Span::styled("Welcome", Style::default().fg(palette.accent).add_modifier(Modifier::BOLD))),
            Line::from(""),
            Line::from(WELCOME),
        ])
        .wrap(Wrap { trim: true })
        .style(Style::default().fg(palette.dim))
        .block(block);
        frame.render_widget(welcome, area);
        return;
    }

    let mut lines: Vec<Line> = Vec::new();
    for message in &snapshot.active_messages {
        let (label, color) = match message.origin() {
            Origin::User => ("You", palette.user),
            Origin::Assistant => ("Assistant", palette.assistant),
        };
        lines.push(Line::from(vec![
            Span::styled(format!("{}:", label), Style::default().fg(color).add_modifier(Modifier::BOLD)),
            Span::styled(
                format!("  {}", format_message_time(message.timestamp())),
                Style::default().fg(palette.dim),
            ),
        ]));
        for text_line in message.content().lines() {
            lines.push(Line::from(text_line.to_string()));
        }
        lines.push(Line::from(""));
    }

    if snapshot.pending {
        let dots = ".".repeat(app.animation_frame as usize + 1);
        lines.push(Line::from(Span::styled(
            "Assistant:",
            Style::default().fg(palette.assistant).add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(Span::styled(
            format!("Thinking{}", dots),
            Style::default().fg(palette.dim).add_modifier(Modifier::ITALIC),
        )));
    }

    let chat = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));
    frame.render_widget(chat, area);
}

fn render_input(app: &App, snapshot: &SessionSnapshot, palette: &Palette, frame: &mut Frame, area: Rect) {
    let focused = app.focus == FocusPane::Input;
    let block = Block::default()
        .title(" Message ")
        .borders(Borders::ALL)
        .border_style(palette.border(focused));

    let content = if snapshot.pending {
        Span::styled("Waiting for the assistant...", Style::default().fg(palette.dim))
    } else if app.input.is_empty() && !focused {
        Span::styled("Type your turbine risk question...", Style::default().fg(palette.dim))
    } else {
        Span::raw(app.input.clone())
    };

    frame.render_widget(Paragraph::new(Line::from(content)).block(block), area);

    if focused && !snapshot.pending {
        let inner = Rect::new(area.x + 1, area.y + 1, area.width.saturating_sub(2), 1);
        let cursor_x = inner.x + (app.cursor as u16).min(inner.width.saturating_sub(1));
        frame.set_cursor_position(Position::new(cursor_x, inner.y));
    }
}
