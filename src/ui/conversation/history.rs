//! Transcript display component

use crate::events::{TranscriptEntry, TranscriptRole};
use crate::transcript::Transcript;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

/// Renders the transcript, newest entries at the bottom
pub struct ConversationHistory<'a> {
    transcript: &'a Transcript,
    title: &'a str,
    show_timestamps: bool,
    /// Lines scrolled up from the bottom
    scroll_offset: usize,
}

impl<'a> ConversationHistory<'a> {
    pub fn new(transcript: &'a Transcript, title: &'a str) -> Self {
        Self {
            transcript,
            title,
            show_timestamps: true,
            scroll_offset: 0,
        }
    }

    pub fn show_timestamps(mut self, show: bool) -> Self {
        self.show_timestamps = show;
        self
    }

    pub fn scroll_offset(mut self, offset: usize) -> Self {
        self.scroll_offset = offset;
        self
    }

    /// All lines for the transcript at the given width
    pub fn lines(&self, width: u16) -> Vec<Line<'a>> {
        let mut all_lines = Vec::new();
        for entry in self.transcript {
            all_lines.extend(self.render_entry(entry, width));
            all_lines.push(Line::from(""));
        }
        all_lines
    }

    fn render_entry(&self, entry: &'a TranscriptEntry, width: u16) -> Vec<Line<'a>> {
        let mut lines = Vec::new();

        let mut header = vec![Span::styled(
            entry.role.display_name(),
            role_style(entry.role).add_modifier(Modifier::BOLD),
        )];
        if self.show_timestamps {
            header.push(Span::styled(
                format!(" {}", entry.timestamp.format("%H:%M:%S")),
                Style::default().fg(Color::DarkGray),
            ));
        }
        lines.push(Line::from(header));

        for content_line in wrap_text(&entry.text, width.saturating_sub(2) as usize) {
            lines.push(Line::from(vec![
                Span::raw("  "),
                Span::styled(content_line, role_style(entry.role)),
            ]));
        }

        lines
    }
}

impl Widget for ConversationHistory<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(self.title);

        let inner_area = block.inner(area);
        block.render(area, buf);

        if self.transcript.is_empty() {
            let welcome_lines = [
                Line::from(Span::styled("Connected to the agent.", Style::default().fg(Color::Green))),
                Line::from(""),
                Line::from(Span::styled(
                    "Type a message below. /help lists commands.",
                    Style::default().fg(Color::Gray),
                )),
            ];

            for (i, line) in welcome_lines.iter().enumerate() {
                if i < inner_area.height as usize {
                    buf.set_line(inner_area.x, inner_area.y + i as u16, line, inner_area.width);
                }
            }
            return;
        }

        let all_lines = self.lines(inner_area.width);
        let height = inner_area.height as usize;
        let max_offset = all_lines.len().saturating_sub(height);
        let end = all_lines.len() - self.scroll_offset.min(max_offset);
        let start = end.saturating_sub(height);

        for (i, line) in all_lines[start..end].iter().enumerate() {
            buf.set_line(inner_area.x, inner_area.y + i as u16, line, inner_area.width);
        }
    }
}

fn role_style(role: TranscriptRole) -> Style {
    match role {
        TranscriptRole::User => Style::default().fg(Color::Blue),
        TranscriptRole::Agent => Style::default().fg(Color::Green),
    }
}

/// Word-wrap `text` to `width` columns, keeping its own line breaks.
///
/// Trailing newlines do not produce trailing blank lines.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();

    for source_line in text.trim_end_matches('\n').split('\n') {
        if width == 0 {
            lines.push(source_line.to_string());
            continue;
        }

        let mut current_line = String::new();
        let mut current_width = 0;
        for word in source_line.split_whitespace() {
            let word_width = word.chars().count();
            if current_width > 0 && current_width + 1 + word_width > width {
                lines.push(std::mem::take(&mut current_line));
                current_width = 0;
            }
            if current_width > 0 {
                current_line.push(' ');
                current_width += 1;
            }
            current_line.push_str(word);
            current_width += word_width;
        }
        lines.push(current_line);
    }

    lines
}
