use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    widgets::{Block, Borders, Clear, Paragraph, Widget, Wrap},
};
use tokio::sync::mpsc;
use tracing::debug;

use crate::agent::AgentOrchestrator;
use crate::config::UiConfig;
use crate::events::AppEvent;
use crate::session::SessionStatus;
use crate::ui::conversation::commands::{get_help_text, ParsedCommand, SlashCommand};
use crate::ui::conversation::composer::{ComposerResult, ConversationComposer};
use crate::ui::conversation::history::ConversationHistory;
use crate::ui::conversation::status::StatusLine;

const SCROLL_STEP: usize = 5;

/// Actions that can be requested by the conversation manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationAction {
    None,
    Exit,
}

/// Manages the conversation flow and UI components
pub struct ConversationManager {
    orchestrator: AgentOrchestrator,
    composer: ConversationComposer,
    events: mpsc::UnboundedSender<AppEvent>,
    ui: UiConfig,
    scroll_offset: usize,
    busy_since: Option<Instant>,
    notice: Option<String>,
}

impl ConversationManager {
    pub fn new(
        orchestrator: AgentOrchestrator,
        ui: UiConfig,
        events: mpsc::UnboundedSender<AppEvent>,
    ) -> Self {
        Self {
            orchestrator,
            composer: ConversationComposer::new("Ask the agent something..."),
            events,
            ui,
            scroll_offset: 0,
            busy_since: None,
            notice: None,
        }
    }

    /// Kick off session creation in the background
    pub fn start(&mut self) {
        let task = self.orchestrator.session_task();
        let events = self.events.clone();
        tokio::spawn(async move {
            let outcome = task.await;
            let _ = events.send(AppEvent::SessionResolved(outcome));
        });
    }

    pub fn orchestrator(&self) -> &AgentOrchestrator {
        &self.orchestrator
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// Apply the result of a background task
    pub fn handle_event(&mut self, event: AppEvent) -> ConversationAction {
        match event {
            AppEvent::SessionResolved(outcome) => {
                self.orchestrator.apply_session_outcome(&outcome);
                ConversationAction::None
            }
            AppEvent::ReplyReceived(outcome) => {
                let state = self.orchestrator.complete(outcome);
                debug!(?state, "reply recorded");
                self.busy_since = None;
                self.scroll_offset = 0;
                ConversationAction::None
            }
            AppEvent::ExitRequest => ConversationAction::Exit,
        }
    }

    /// Handle key input
    pub fn handle_key(&mut self, key: KeyEvent) -> ConversationAction {
        if key.kind != KeyEventKind::Press {
            return ConversationAction::None;
        }

        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return ConversationAction::Exit;
            }
            KeyCode::Esc if self.notice.is_some() => {
                self.notice = None;
                return ConversationAction::None;
            }
            KeyCode::Esc if !self.composer.palette_open() => {
                return ConversationAction::Exit;
            }
            KeyCode::PageUp => {
                self.scroll_offset = self.scroll_offset.saturating_add(SCROLL_STEP);
                return ConversationAction::None;
            }
            KeyCode::PageDown => {
                self.scroll_offset = self.scroll_offset.saturating_sub(SCROLL_STEP);
                return ConversationAction::None;
            }
            _ => {}
        }

        match self.composer.handle_key(key) {
            ComposerResult::Submitted(input) => {
                self.notice = None;
                if !self.submit(&input) {
                    self.composer.restore(input);
                }
                ConversationAction::None
            }
            ComposerResult::Command(command) => self.handle_slash_command(command),
            ComposerResult::None => ConversationAction::None,
        }
    }

    /// Send `input` unless a reply is still pending. Returns whether it went out.
    fn submit(&mut self, input: &str) -> bool {
        let Some(request) = self.orchestrator.submit(input) else {
            return false;
        };

        self.busy_since = Some(Instant::now());
        self.scroll_offset = 0;

        let events = self.events.clone();
        tokio::spawn(async move {
            let outcome = request.await;
            let _ = events.send(AppEvent::ReplyReceived(outcome));
        });
        true
    }

    /// Handle slash commands
    fn handle_slash_command(&mut self, command: ParsedCommand) -> ConversationAction {
        match command.command {
            SlashCommand::Bye => ConversationAction::Exit,
            SlashCommand::Help => {
                self.notice = Some(get_help_text());
                ConversationAction::None
            }
            SlashCommand::Session => {
                self.notice = Some(self.session_summary());
                ConversationAction::None
            }
        }
    }

    fn session_summary(&self) -> String {
        let session = self.orchestrator.session();
        let status = match session.outcome() {
            Some(Ok(SessionStatus::Created)) => "created".to_string(),
            Some(Ok(SessionStatus::AlreadyExists)) => "resumed (already existed)".to_string(),
            Some(Err(e)) => format!("unavailable: {e}"),
            None if session.attempted() => "being created".to_string(),
            None => "not requested yet".to_string(),
        };

        let identity = self.orchestrator.identity();
        format!(
            "App: {}\nUser: {}\nSession: {}\nStatus: {}",
            identity.app_name(),
            identity.user_id(),
            identity.session_id(),
            status
        )
    }

    /// Render the conversation UI components
    pub fn render(&self, area: Rect, buf: &mut Buffer) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(5),    // History
                Constraint::Length(1), // Status
                Constraint::Length(5), // Composer
            ])
            .split(area);

        ConversationHistory::new(self.orchestrator.transcript(), &self.ui.title)
            .show_timestamps(self.ui.show_timestamps)
            .scroll_offset(self.scroll_offset)
            .render(chunks[0], buf);

        let busy_since = self.busy_since.filter(|_| self.orchestrator.is_busy());
        let hint = (self.scroll_offset > 0).then_some("Scrolled back, PageDown to return");
        StatusLine::new(busy_since, hint).render(chunks[1], buf);

        (&self.composer).render(chunks[2], buf);

        if let Some(notice) = &self.notice {
            render_notice(notice, chunks[0], buf);
        }
    }
}

/// Overlay a bordered panel at the bottom of `area`
fn render_notice(notice: &str, area: Rect, buf: &mut Buffer) {
    let height = (notice.lines().count() as u16 + 2).min(area.height);
    let panel = Rect {
        x: area.x + 1,
        y: area.y + area.height - height,
        width: area.width.saturating_sub(2),
        height,
    };

    Clear.render(panel, buf);
    Paragraph::new(notice)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Esc to close")
                .style(Style::default().fg(Color::Yellow)),
        )
        .render(panel, buf);
}
