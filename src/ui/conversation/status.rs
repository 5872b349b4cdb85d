use std::time::Instant;

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::Widget,
};

/// One-line indicator shown while a reply is pending, or a transient notice
pub struct StatusLine<'a> {
    busy_since: Option<Instant>,
    notice: Option<&'a str>,
}

impl<'a> StatusLine<'a> {
    pub fn new(busy_since: Option<Instant>, notice: Option<&'a str>) -> Self {
        Self { busy_since, notice }
    }

    /// Dots cycling every 300ms
    fn dots(elapsed_ms: u128) -> &'static str {
        match (elapsed_ms / 300) % 4 {
            0 => ".",
            1 => "..",
            2 => "...",
            _ => "   ",
        }
    }
}

impl Widget for StatusLine<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 {
            return;
        }

        let line = if let Some(since) = self.busy_since {
            let elapsed = since.elapsed();
            Line::from(vec![
                Span::styled("Waiting for the agent", Style::default().fg(Color::Green)),
                Span::styled(Self::dots(elapsed.as_millis()), Style::default().fg(Color::Yellow)),
                Span::styled(
                    format!(" {}s", elapsed.as_secs()),
                    Style::default().fg(Color::DarkGray),
                ),
            ])
        } else if let Some(notice) = self.notice {
            Line::from(Span::styled(notice, Style::default().fg(Color::Yellow)))
        } else {
            return;
        };

        buf.set_line(area.x, area.y, &line, area.width);
    }
}
