use std::io::{self, Stdout};
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{Event, EventStream};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use futures::StreamExt;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::agent::AgentOrchestrator;
use crate::config::UiConfig;
use crate::events::AppEvent;
use crate::ui::conversation::{ConversationAction, ConversationManager};

/// Redraw interval while nothing else happens, keeps the busy indicator moving
const TICK: Duration = Duration::from_millis(250);

type Tui = Terminal<CrosstermBackend<Stdout>>;

/// Puts the terminal back the way it was, even on early return
struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> Result<(Self, Tui)> {
        enable_raw_mode().context("Failed to enable raw mode")?;
        let guard = TerminalGuard;
        execute!(io::stdout(), EnterAlternateScreen).context("Failed to enter alternate screen")?;
        let terminal = Terminal::new(CrosstermBackend::new(io::stdout()))
            .context("Failed to initialize terminal")?;
        Ok((guard, terminal))
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if let Err(e) = disable_raw_mode() {
            warn!(error = %e, "failed to disable raw mode");
        }
        if let Err(e) = execute!(io::stdout(), LeaveAlternateScreen) {
            warn!(error = %e, "failed to leave alternate screen");
        }
    }
}

/// Run the interactive chat until the user quits.
pub async fn run(orchestrator: AgentOrchestrator, ui: UiConfig) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    exit_on_interrupt(tx.clone());
    let mut manager = ConversationManager::new(orchestrator, ui, tx);

    let (_guard, mut terminal) = TerminalGuard::enter()?;
    let mut input = EventStream::new();
    let mut tick = tokio::time::interval(TICK);

    info!(session = %manager.orchestrator().identity(), "chat started");
    manager.start();

    loop {
        terminal
            .draw(|frame| {
                let area = frame.size();
                manager.render(area, frame.buffer_mut());
            })
            .context("Failed to draw frame")?;

        let action = tokio::select! {
            maybe_event = input.next() => match maybe_event {
                Some(Ok(Event::Key(key))) => manager.handle_key(key),
                Some(Ok(_)) => ConversationAction::None,
                Some(Err(e)) => return Err(e).context("Failed to read terminal input"),
                None => ConversationAction::Exit,
            },
            Some(event) = rx.recv() => manager.handle_event(event),
            _ = tick.tick() => ConversationAction::None,
        };

        if action == ConversationAction::Exit {
            break;
        }
    }

    info!(
        entries = manager.orchestrator().transcript().len(),
        "chat closed"
    );
    Ok(())
}

/// Turn SIGINT delivered from outside the terminal into an exit request.
fn exit_on_interrupt(events: mpsc::UnboundedSender<AppEvent>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = events.send(AppEvent::ExitRequest);
        }
    });
}
