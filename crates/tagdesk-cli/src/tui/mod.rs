//! Terminal user interface for tagdesk.
//!
//! ## Entry points
//!
//! - [`run_panel`]: full-screen tag editing panel over a session.

pub mod panel;

use anyhow::{Context, Result};
use crossterm::event::{self, Event};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::io::{self, Stdout};
use std::time::Duration;
use tagdesk_core::{HostEnvironment, TagEditSession, WorkItemStore};

use panel::TagPanel;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Take over the terminal and run the panel until the user quits.
///
/// # Errors
///
/// Returns an error if the terminal cannot be set up or drawn to.
pub fn run_panel<H: HostEnvironment, S: WorkItemStore>(session: TagEditSession<H, S>) -> Result<()> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
    terminal.hide_cursor()?;

    let result = event_loop(&mut terminal, TagPanel::new(session));

    disable_raw_mode().ok();
    execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
    terminal.show_cursor().ok();

    result
}

fn event_loop<H: HostEnvironment, S: WorkItemStore>(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    mut panel: TagPanel<H, S>,
) -> Result<()> {
    terminal.draw(|frame| panel.render(frame))?;
    panel.start();

    while !panel.should_quit() {
        terminal.draw(|frame| panel.render(frame))?;
        if event::poll(POLL_INTERVAL)? {
            if let Event::Key(key) = event::read()? {
                panel.handle_key(key);
            }
        }
    }
    Ok(())
}
