use std::time::SystemTime;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use crate::{app::App, metrics::Summary, session::CharStatus};

const HORIZONTAL_MARGIN: u16 = 5;

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let session = self.session();

        let bold_style = Style::default().add_modifier(Modifier::BOLD);
        let green_bold_style = Style::default().patch(bold_style).fg(Color::Green);
        let red_bold_style = Style::default().patch(bold_style).fg(Color::Red);
        let dim_bold_style = Style::default()
            .patch(bold_style)
            .add_modifier(Modifier::DIM);
        let underlined_dim_bold_style = Style::default()
            .patch(dim_bold_style)
            .add_modifier(Modifier::UNDERLINED);
        let italic_style = Style::default().add_modifier(Modifier::ITALIC);

        let max_chars_per_line = area.width.saturating_sub(HORIZONTAL_MARGIN * 2).max(1);
        let prompt_width = session.target().width();
        let prompt_occupied_lines = if prompt_width <= max_chars_per_line as usize {
            1
        } else {
            ((prompt_width as f64 / max_chars_per_line as f64).ceil() + 1.0) as u16
        };
        let padding = area.height.saturating_sub(prompt_occupied_lines.saturating_add(4)) / 2;

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .constraints([
                Constraint::Length(padding),
                Constraint::Length(1), // timer or results
                Constraint::Length(1),
                Constraint::Length(prompt_occupied_lines),
                Constraint::Length(1), // notice
                Constraint::Min(0),
                Constraint::Length(1), // legend
            ])
            .split(area);

        // cursor sits on the character after the last one typed
        let cursor = if session.is_completed() {
            None
        } else {
            Some(session.current_index().map_or(0, |idx| idx + 1))
        };

        let spans = session
            .classify_characters()
            .enumerate()
            .map(|(idx, classified)| {
                let style = match classified.status {
                    CharStatus::Correct => green_bold_style,
                    CharStatus::Incorrect => red_bold_style,
                    CharStatus::Untyped if cursor == Some(idx) => underlined_dim_bold_style,
                    CharStatus::Untyped => dim_bold_style,
                };
                let symbol = match (classified.status, classified.char) {
                    (CharStatus::Incorrect, ' ') => "·".to_owned(),
                    (_, c) => c.to_string(),
                };
                Span::styled(symbol, style)
            })
            .collect::<Vec<Span>>();

        Paragraph::new(Line::from(spans))
            .alignment(if prompt_occupied_lines == 1 {
                Alignment::Center
            } else {
                Alignment::Left
            })
            .wrap(Wrap { trim: true })
            .render(chunks[3], buf);

        let status = match Summary::from_session(session) {
            Some(summary) => Span::styled(summary.to_string(), bold_style),
            None => match session.started_at() {
                Some(started_at) => {
                    let elapsed = SystemTime::now()
                        .duration_since(started_at)
                        .unwrap_or_default()
                        .as_secs_f64();
                    Span::styled(format!("{elapsed:.1}s"), dim_bold_style)
                }
                None => Span::styled("start typing", italic_style),
            },
        };
        Paragraph::new(status)
            .alignment(Alignment::Center)
            .render(chunks[1], buf);

        if let Some(notice) = self.notice() {
            Paragraph::new(Span::styled(
                notice.to_string(),
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::ITALIC),
            ))
            .alignment(Alignment::Center)
            .render(chunks[4], buf);
        }

        let legend = match (session.is_completed(), self.is_loading()) {
            (true, false) => "(r)etry / (n)ew quote / (esc)ape",
            (true, true) => "(r)etry / (esc)ape",
            (false, false) => "(ctrl+r) retry / (ctrl+n) new quote / (esc)ape",
            (false, true) => "(ctrl+r) retry / (esc)ape",
        };
        Paragraph::new(Span::styled(legend, italic_style)).render(chunks[6], buf);
    }
}
