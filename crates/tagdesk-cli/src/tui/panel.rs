//! The tag editing panel.
//!
//! A thin rendering layer over [`TagEditSession`]: keys become session
//! operations, and session events update the status line.

use std::sync::mpsc::{Receiver, channel};

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols::border;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState};
use tagdesk_core::model::WorkItem;
use tagdesk_core::session::{SessionEvent, SessionPhase, TagEditSession};
use tagdesk_core::{HostEnvironment, WorkItemStore};

/// Which part of the panel receives keystrokes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Table,
    Input,
    Chips,
}

pub struct TagPanel<H, S> {
    session: TagEditSession<H, S>,
    events: Receiver<SessionEvent>,
    table_state: TableState,
    focus: Focus,
    chip_index: usize,
    status: String,
    should_quit: bool,
}

impl<H: HostEnvironment, S: WorkItemStore> TagPanel<H, S> {
    pub fn new(mut session: TagEditSession<H, S>) -> Self {
        let (tx, rx) = channel();
        session.subscribe(move |event| {
            let _ = tx.send(event.clone());
        });
        Self {
            session,
            events: rx,
            table_state: TableState::default(),
            focus: Focus::Table,
            chip_index: 0,
            status: "Loading work items...".to_string(),
            should_quit: false,
        }
    }

    /// Load the catalog. Failures are shown in the status line.
    pub fn start(&mut self) {
        let _ = self.session.initialize();
        self.drain_events();
    }

    pub const fn should_quit(&self) -> bool {
        self.should_quit
    }

    #[allow(dead_code)]
    pub const fn focus(&self) -> Focus {
        self.focus
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    #[allow(dead_code)]
    pub const fn session(&self) -> &TagEditSession<H, S> {
        &self.session
    }

    #[allow(dead_code)]
    pub fn cursor(&self) -> Option<usize> {
        self.table_state.selected()
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        match self.focus {
            Focus::Input => self.handle_input_key(key),
            Focus::Chips => self.handle_chip_key(key),
            Focus::Table => self.handle_table_key(key),
        }
        self.drain_events();
    }

    fn handle_table_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('j') | KeyCode::Down => self.move_cursor(1),
            KeyCode::Char('k') | KeyCode::Up => self.move_cursor(-1),
            KeyCode::Enter => self.select_highlighted(),
            KeyCode::Char('a' | 'i') => {
                if self.session.selection().is_some() {
                    self.focus = Focus::Input;
                } else {
                    self.status = "Select a work item first".to_string();
                }
            }
            KeyCode::Tab => {
                if self.session.pending_tags().is_empty() {
                    self.status = "No tags to edit".to_string();
                } else {
                    self.focus = Focus::Chips;
                }
            }
            KeyCode::Char('s') => match self.session.save() {
                Ok(outcome) => {
                    self.drain_events();
                    if outcome.reloaded {
                        self.status = format!("Saved tags on #{}", outcome.id);
                    }
                }
                Err(err) => self.status = err.to_string(),
            },
            KeyCode::Char('c') => {
                self.session.cancel();
            }
            KeyCode::Char('r') => {
                let _ = self.session.initialize();
            }
            _ => {}
        }
    }

    fn handle_input_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.focus = Focus::Table,
            KeyCode::Enter => {
                let draft = self.session.draft_input().to_string();
                if !self.session.add_draft_tag() && !draft.is_empty() {
                    self.status = format!("'{draft}' is already a tag");
                }
            }
            KeyCode::Backspace => {
                let mut draft = self.session.draft_input().to_string();
                draft.pop();
                self.session.set_draft_input(draft);
            }
            KeyCode::Char(c) => {
                let mut draft = self.session.draft_input().to_string();
                draft.push(c);
                self.session.set_draft_input(draft);
            }
            _ => {}
        }
    }

    fn handle_chip_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc | KeyCode::Tab => self.focus = Focus::Table,
            KeyCode::Char('h') | KeyCode::Left => {
                self.chip_index = self.chip_index.saturating_sub(1);
            }
            KeyCode::Char('l') | KeyCode::Right => {
                let last = self.session.pending_tags().len().saturating_sub(1);
                self.chip_index = (self.chip_index + 1).min(last);
            }
            KeyCode::Char('d') | KeyCode::Delete => {
                if let Some(tag) = self.session.pending_tags().get(self.chip_index) {
                    let tag = tag.to_string();
                    self.session.remove_tag(&tag);
                }
            }
            _ => {}
        }
    }

    fn move_cursor(&mut self, delta: isize) {
        let len = self.session.catalog().len();
        if len == 0 {
            self.table_state.select(None);
            return;
        }
        let current = self.table_state.selected().unwrap_or(0);
        let next = current.saturating_add_signed(delta).min(len - 1);
        self.table_state.select(Some(next));
    }

    fn select_highlighted(&mut self) {
        let Some(id) = self
            .table_state
            .selected()
            .and_then(|row| self.session.catalog().as_slice().get(row))
            .map(|item| item.id)
        else {
            return;
        };
        if let Err(err) = self.session.select_row(id) {
            self.status = err.to_string();
        }
    }

    fn drain_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            self.apply_event(event);
        }
    }

    fn apply_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::PhaseChanged(phase) => {
                self.status = match phase {
                    SessionPhase::Uninitialized | SessionPhase::Ready => self.status.clone(),
                    SessionPhase::Loading => "Loading work items...".to_string(),
                    SessionPhase::Saving => "Saving tags...".to_string(),
                    SessionPhase::LoadFailed(err) => format!("Load failed: {err}"),
                    SessionPhase::SaveFailed(err) => format!("Save failed: {err}"),
                };
            }
            SessionEvent::CatalogReplaced { len } => {
                self.status = format!("{len} work items");
                let cursor = match self.table_state.selected() {
                    _ if len == 0 => None,
                    Some(row) => Some(row.min(len - 1)),
                    None => Some(0),
                };
                self.table_state.select(cursor);
            }
            SessionEvent::SelectionChanged(Some(id)) => {
                self.status = format!("Editing #{id}");
                self.chip_index = 0;
            }
            SessionEvent::SelectionChanged(None) => {
                self.focus = Focus::Table;
                self.chip_index = 0;
            }
            SessionEvent::PendingTagsChanged(tags) => {
                if tags.is_empty() {
                    self.chip_index = 0;
                    if self.focus == Focus::Chips {
                        self.focus = Focus::Table;
                    }
                } else {
                    self.chip_index = self.chip_index.min(tags.len() - 1);
                }
            }
            SessionEvent::DraftChanged(_) => {}
            SessionEvent::Notice(text) => self.status = text,
        }
    }

    // -----------------------------------------------------------------------
    // Rendering
    // -----------------------------------------------------------------------

    pub fn render(&mut self, frame: &mut ratatui::Frame<'_>) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(5),
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(1),
            ])
            .split(frame.area());

        self.render_table(frame, chunks[0]);
        self.render_chips(frame, chunks[1]);
        self.render_input(frame, chunks[2]);
        self.render_status(frame, chunks[3]);
    }

    fn render_table(&mut self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let selected = self.session.selection();
        let rows: Vec<Row<'static>> = self
            .session
            .catalog()
            .iter()
            .map(|item| {
                let style = if Some(item.id) == selected {
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                item_row(item).style(style)
            })
            .collect();

        let header = Row::new(["Type", "ID", "Title", "State", "Tags", "Area", "Iteration"])
            .style(Style::default().add_modifier(Modifier::BOLD));
        let widths = [
            Constraint::Length(6),
            Constraint::Length(6),
            Constraint::Fill(3),
            Constraint::Length(8),
            Constraint::Fill(2),
            Constraint::Fill(1),
            Constraint::Fill(1),
        ];
        let title = match self.session.project() {
            Some(project) => format!(" tagdesk: {project} "),
            None => " tagdesk ".to_string(),
        };
        let border_style = if self.focus == Focus::Table {
            Style::default().fg(Color::Green)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        let table = Table::new(rows, widths)
            .header(header)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_set(border::ROUNDED)
                    .border_style(border_style)
                    .title(title),
            )
            .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED));
        frame.render_stateful_widget(table, area, &mut self.table_state);
    }

    fn render_chips(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let mut spans = Vec::new();
        for (index, tag) in self.session.pending_tags().iter().enumerate() {
            let style = if self.focus == Focus::Chips && index == self.chip_index {
                Style::default().fg(Color::Black).bg(Color::Cyan)
            } else {
                Style::default().fg(Color::Cyan)
            };
            spans.push(Span::styled(format!("[{tag}]"), style));
            spans.push(Span::raw(" "));
        }
        let border_style = if self.focus == Focus::Chips {
            Style::default().fg(Color::Green)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let chips = Paragraph::new(Line::from(spans)).block(
            Block::default()
                .borders(Borders::ALL)
                .border_set(border::ROUNDED)
                .border_style(border_style)
                .title(" Tags "),
        );
        frame.render_widget(chips, area);
    }

    fn render_input(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let enabled = self.session.selection().is_some();
        let text = if enabled {
            self.session.draft_input().to_string()
        } else {
            "select a work item to add tags".to_string()
        };
        let text_style = if enabled {
            Style::default()
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let border_style = if self.focus == Focus::Input {
            Style::default().fg(Color::Green)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let input = Paragraph::new(Span::styled(text, text_style)).block(
            Block::default()
                .borders(Borders::ALL)
                .border_set(border::ROUNDED)
                .border_style(border_style)
                .title(" New tag "),
        );
        frame.render_widget(input, area);

        if self.focus == Focus::Input {
            let width = u16::try_from(self.session.draft_input().chars().count()).unwrap_or(u16::MAX);
            let x = area.x.saturating_add(1).saturating_add(width);
            frame.set_cursor_position((x.min(area.right().saturating_sub(2)), area.y + 1));
        }
    }

    fn render_status(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let hints = match self.focus {
            Focus::Table => "j/k move  enter select  a add  tab tags  s save  c cancel  r reload  q quit",
            Focus::Input => "type a tag  enter add  esc done",
            Focus::Chips => "h/l move  d remove  esc done",
        };
        let style = if self.session.phase().error().is_some() {
            Style::default().fg(Color::Red)
        } else {
            Style::default().fg(Color::White)
        };
        let line = Line::from(vec![
            Span::styled(self.status.clone(), style),
            Span::raw("  |  "),
            Span::styled(hints, Style::default().fg(Color::DarkGray)),
        ]);
        frame.render_widget(Paragraph::new(line), area);
    }
}

fn item_row(item: &WorkItem) -> Row<'static> {
    Row::new(vec![
        Cell::from(item.work_item_type.to_string()),
        Cell::from(item.id.to_string()),
        Cell::from(item.title.clone()),
        Cell::from(item.state.clone()),
        Cell::from(item.tags.clone()),
        Cell::from(item.area_path.clone()),
        Cell::from(item.iteration_path.clone()),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use std::io;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::fmt::MakeWriter;
    use tagdesk_core::host::ProjectContext;
    use tagdesk_core::memory::MemoryBackend;
    use tagdesk_core::model::{WorkItemId, WorkItemType};
    use tagdesk_core::session::CANCEL_NOTICE;

    fn item(id: u32, tags: &str) -> WorkItem {
        WorkItem {
            id: WorkItemId(id),
            work_item_type: WorkItemType::Issue,
            title: format!("Issue number {id}"),
            state: "To Do".into(),
            tags: tags.into(),
            area_path: "P".into(),
            iteration_path: "P".into(),
            changed_date: None,
        }
    }

    fn panel(items: Vec<WorkItem>) -> (TagPanel<MemoryBackend, MemoryBackend>, MemoryBackend) {
        let backend = MemoryBackend::new(Some(ProjectContext::named("P")));
        backend.seed("P", items);
        let mut panel = TagPanel::new(TagEditSession::new(backend.clone(), backend.clone()));
        panel.start();
        (panel, backend)
    }

    fn press(panel: &mut TagPanel<MemoryBackend, MemoryBackend>, code: KeyCode) {
        panel.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn type_text(panel: &mut TagPanel<MemoryBackend, MemoryBackend>, text: &str) {
        for c in text.chars() {
            press(panel, KeyCode::Char(c));
        }
    }

    #[test]
    fn start_loads_and_highlights_first_row() {
        let (panel, _) = panel(vec![item(1, ""), item(2, "")]);
        assert_eq!(panel.cursor(), Some(0));
        assert_eq!(panel.status(), "2 work items");
    }

    #[test]
    fn enter_selects_highlighted_row() {
        let (mut panel, _) = panel(vec![item(1, "a"), item(2, "b")]);
        press(&mut panel, KeyCode::Char('j'));
        press(&mut panel, KeyCode::Enter);
        // Seeded last means listed first.
        assert_eq!(panel.session().selection(), Some(WorkItemId(1)));
        assert_eq!(panel.status(), "Editing #1");
    }

    #[test]
    fn input_is_disabled_without_selection() {
        let (mut panel, _) = panel(vec![item(1, "")]);
        press(&mut panel, KeyCode::Char('a'));
        assert_eq!(panel.focus(), Focus::Table);
        assert_eq!(panel.status(), "Select a work item first");
    }

    #[test]
    fn typing_and_enter_adds_tag_then_save_writes_it() {
        let (mut panel, backend) = panel(vec![item(42, "")]);
        press(&mut panel, KeyCode::Enter);
        press(&mut panel, KeyCode::Char('i'));
        type_text(&mut panel, "bugx");
        press(&mut panel, KeyCode::Backspace);
        press(&mut panel, KeyCode::Enter);
        type_text(&mut panel, "p1");
        press(&mut panel, KeyCode::Enter);
        assert_eq!(panel.session().pending_tags().as_slice(), &["bug", "p1"]);

        press(&mut panel, KeyCode::Esc);
        press(&mut panel, KeyCode::Char('s'));
        assert_eq!(
            backend.item(WorkItemId(42)).map(|i| i.tags),
            Some("bug; p1".to_string())
        );
        assert_eq!(panel.session().selection(), None);
        assert_eq!(panel.focus(), Focus::Table);
        assert_eq!(panel.status(), "Saved tags on #42");
    }

    #[test]
    fn chips_remove_focused_tag() {
        let (mut panel, _) = panel(vec![item(1, "a; b; c")]);
        press(&mut panel, KeyCode::Enter);
        press(&mut panel, KeyCode::Tab);
        assert_eq!(panel.focus(), Focus::Chips);
        press(&mut panel, KeyCode::Char('l'));
        press(&mut panel, KeyCode::Char('d'));
        assert_eq!(panel.session().pending_tags().as_slice(), &["a", "c"]);
        press(&mut panel, KeyCode::Char('l'));
        press(&mut panel, KeyCode::Delete);
        assert_eq!(panel.session().pending_tags().as_slice(), &["a"]);
    }

    #[test]
    fn removing_last_chip_returns_focus_to_table() {
        let (mut panel, _) = panel(vec![item(1, "only")]);
        press(&mut panel, KeyCode::Enter);
        press(&mut panel, KeyCode::Tab);
        press(&mut panel, KeyCode::Char('d'));
        assert!(panel.session().pending_tags().is_empty());
        assert_eq!(panel.focus(), Focus::Table);
    }

    #[test]
    fn cancel_shows_notice() {
        let (mut panel, _) = panel(vec![item(1, "")]);
        press(&mut panel, KeyCode::Char('c'));
        assert_eq!(panel.status(), CANCEL_NOTICE);
    }

    #[test]
    fn failed_save_is_reported() {
        let (mut panel, backend) = panel(vec![item(1, "")]);
        press(&mut panel, KeyCode::Enter);
        backend.fail_update(true);
        press(&mut panel, KeyCode::Char('s'));
        assert!(panel.status().starts_with("Save failed"));
        assert_eq!(panel.session().selection(), Some(WorkItemId(1)));
    }

    #[test]
    fn load_failure_shows_in_status_and_r_retries() {
        let backend = MemoryBackend::new(Some(ProjectContext::named("P")));
        backend.seed("P", vec![item(1, ""), item(2, "")]);
        backend.fail_query(true);
        let mut panel = TagPanel::new(TagEditSession::new(backend.clone(), backend.clone()));
        panel.start();
        assert!(panel.status().starts_with("Load failed"), "{}", panel.status());
        assert!(panel.session().catalog().is_empty());
        assert_eq!(panel.cursor(), None);

        backend.fail_query(false);
        press(&mut panel, KeyCode::Char('r'));
        assert_eq!(panel.status(), "2 work items");
        assert_eq!(panel.session().catalog().len(), 2);
        assert_eq!(panel.cursor(), Some(0));
    }

    #[test]
    fn selecting_after_failed_save_clears_error() {
        let (mut panel, backend) = panel(vec![item(1, ""), item(2, "")]);
        press(&mut panel, KeyCode::Enter);
        backend.fail_update(true);
        press(&mut panel, KeyCode::Char('s'));
        assert!(panel.session().phase().error().is_some());

        press(&mut panel, KeyCode::Char('j'));
        press(&mut panel, KeyCode::Enter);
        assert!(panel.session().phase().error().is_none());
        assert_eq!(panel.status(), "Editing #1");
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().expect("log buffer").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLogs {
        type Writer = Self;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    /// Run a failed load and a failed save under `filter`, returning the log text.
    fn logs_from_failures(filter: &str) -> String {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new(filter))
            .with_writer(logs.clone())
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            let (mut panel, backend) = panel(vec![item(1, "")]);
            press(&mut panel, KeyCode::Enter);
            backend.fail_update(true);
            press(&mut panel, KeyCode::Char('s'));
            backend.fail_query(true);
            press(&mut panel, KeyCode::Char('r'));
            assert!(panel.status().starts_with("Load failed"));
        });
        let bytes = logs.0.lock().expect("log buffer").clone();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    #[test]
    fn panel_default_filter_keeps_failures_off_the_terminal() {
        assert_eq!(logs_from_failures(crate::default_log_filter(false, false, true)), "");
        assert!(logs_from_failures(crate::default_log_filter(true, true, true)).is_empty());
    }

    #[test]
    fn failures_are_logged_as_warnings() {
        let text = logs_from_failures("warn");
        assert!(text.contains("WARN"), "{text}");
        assert!(text.contains("failed to update tags on work item 1"), "{text}");
        assert!(!text.contains("ERROR"), "{text}");
    }

    #[test]
    fn q_quits_from_table_but_types_in_input() {
        let (mut panel, _) = panel(vec![item(1, "")]);
        press(&mut panel, KeyCode::Enter);
        press(&mut panel, KeyCode::Char('a'));
        press(&mut panel, KeyCode::Char('q'));
        assert!(!panel.should_quit());
        assert_eq!(panel.session().draft_input(), "q");
        press(&mut panel, KeyCode::Esc);
        press(&mut panel, KeyCode::Char('q'));
        assert!(panel.should_quit());
    }

    #[test]
    fn render_shows_rows_and_chips() {
        let (mut panel, _) = panel(vec![item(7, "alpha")]);
        press(&mut panel, KeyCode::Enter);

        let mut terminal = Terminal::new(TestBackend::new(120, 20)).expect("terminal");
        terminal.draw(|frame| panel.render(frame)).expect("draw");
        let screen: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect();
        assert!(screen.contains("Issue number 7"));
        assert!(screen.contains("[alpha]"));
        assert!(screen.contains("tagdesk: P"));
    }
}
