use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};

use crate::app::{App, FocusPane, InputMode};
use crate::chat::{BotStatus, Role};

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    // Body: product sidebar on the left, chat on the right
    let [sidebar_area, chat_column] = Layout::horizontal([
        Constraint::Length(38),
        Constraint::Min(0),
    ])
    .areas(body_area);

    render_sidebar(app, frame, sidebar_area);
    render_chat_column(app, frame, chat_column);

    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(
            format!(" {} ", app.catalog.store_name),
            Style::default().fg(Color::Cyan).bold(),
        ),
        Span::styled(
            app.catalog.tagline.clone(),
            Style::default().fg(Color::Gray),
        ),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let status_style = match app.status() {
        BotStatus::Idle => Style::default().bg(Color::Blue).fg(Color::White),
        BotStatus::Thinking => Style::default().bg(Color::Yellow).fg(Color::Black),
        BotStatus::Error => Style::default().bg(Color::Red).fg(Color::White),
    };
    let status_text = match app.status() {
        BotStatus::Idle => " IDLE ",
        BotStatus::Thinking => " THINKING ",
        BotStatus::Error => " ERROR ",
    };

    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let mut spans = vec![Span::styled(status_text, status_style)];
    match app.input_mode {
        InputMode::Editing => {
            spans.extend(vec![
                Span::styled(" Enter ", key_style),
                Span::styled(" send ", label_style),
                Span::styled(" Esc ", key_style),
                Span::styled(" done ", label_style),
            ]);
        }
        InputMode::Normal => {
            spans.extend(vec![
                Span::styled(" i ", key_style),
                Span::styled(" type ", label_style),
                Span::styled(" Tab ", key_style),
                Span::styled(" focus ", label_style),
                Span::styled(" j/k ", key_style),
                Span::styled(" scroll ", label_style),
                Span::styled(" q ", key_style),
                Span::styled(" quit ", label_style),
            ]);
        }
    }

    let footer = Paragraph::new(Line::from(spans));
    frame.render_widget(footer, area);
}

fn render_sidebar(app: &mut App, frame: &mut Frame, area: Rect) {
    app.sidebar_area = Some(area);
    app.sidebar_height = area.height.saturating_sub(2);

    let focused = app.focus == FocusPane::Products;
    let border_color = if focused { Color::Cyan } else { Color::DarkGray };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Featured products ");

    let mut lines: Vec<Line> = Vec::new();

    for product in &app.catalog.products {
        lines.push(Line::from(Span::styled(
            product.name.clone(),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(Span::styled(
            product.price.clone(),
            Style::default().fg(Color::Yellow),
        )));
        for feature in &product.features {
            lines.push(Line::from(format!("  • {}", feature)));
        }
        lines.push(Line::from(Span::styled(
            format!("  {}", product.support),
            Style::default().fg(Color::Gray),
        )));
        lines.push(Line::from(Span::styled(
            format!("  {}", product.delivery),
            Style::default().fg(Color::Gray),
        )));
        lines.push(Line::from(Span::styled(
            format!("  [{}]", product.image),
            Style::default().fg(Color::DarkGray),
        )));
        lines.push(Line::default());
    }

    for link in &app.catalog.links {
        lines.push(Line::from(vec![
            Span::styled(
                format!("{}: ", link.label),
                Style::default().fg(Color::Gray),
            ),
            Span::styled(
                link.url.clone(),
                Style::default().fg(Color::Blue).add_modifier(Modifier::UNDERLINED),
            ),
        ]));
    }

    app.sidebar_lines = lines.len() as u16;

    let sidebar = Paragraph::new(Text::from(lines))
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.sidebar_scroll, 0));

    frame.render_widget(sidebar, area);
}

fn render_chat_column(app: &mut App, frame: &mut Frame, area: Rect) {
    let [chat_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(area);

    render_transcript(app, frame, chat_area);
    render_input(app, frame, input_area);
}

fn render_transcript(app: &mut App, frame: &mut Frame, area: Rect) {
    app.chat_area = Some(area);
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);

    let focused = app.focus == FocusPane::Chat;
    let border_color = if focused { Color::Cyan } else { Color::DarkGray };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Assistant ");

    let mut lines: Vec<Line> = Vec::new();

    for message in app.transcript.messages() {
        let (label, label_color) = match message.role {
            Role::User => ("You:", Color::Cyan),
            Role::Assistant => ("Assistant:", Color::Yellow),
        };
        lines.push(Line::from(vec![
            Span::styled(
                label,
                Style::default().fg(label_color).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!(" {}", message.timestamp.format("%H:%M")),
                Style::default().fg(Color::DarkGray),
            ),
        ]));

        let streaming_placeholder = message.content.is_empty()
            && app.transcript.open_assistant() == Some(message.id);
        if streaming_placeholder {
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            lines.push(Line::from(Span::styled(
                format!("Thinking{}", dots),
                Style::default().fg(Color::Gray).add_modifier(Modifier::ITALIC),
            )));
        } else {
            for line in message.content.lines() {
                lines.push(Line::from(line.to_string()));
            }
        }
        lines.push(Line::default());
    }

    let transcript = Paragraph::new(Text::from(lines))
        .block(block)
        .wrap(Wrap { trim: true })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(transcript, area);
}

fn render_input(app: &mut App, frame: &mut Frame, area: Rect) {
    app.input_area = Some(area);

    let busy = app.transcript.is_busy();
    let focused = app.focus == FocusPane::Input;
    let border_color = if busy {
        Color::DarkGray
    } else if focused || app.input_mode == InputMode::Editing {
        Color::Yellow
    } else {
        Color::DarkGray
    };

    let title = if busy {
        " Waiting for the assistant... "
    } else {
        " Ask about our products "
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Horizontal scroll keeps the cursor visible in a narrow box
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.input_cursor;
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let visible_text: String = app
        .input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let text_style = if busy {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default().fg(Color::Cyan)
    };

    let input = Paragraph::new(visible_text).style(text_style).block(block);
    frame.render_widget(input, area);

    if app.input_mode == InputMode::Editing && !busy {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}
