//! Main application logic for the terminal user interface.
//!
//! `App` owns the `TaskManager` for the session, turns key presses into
//! manager transitions, and draws the list from a fresh `TodoView` every
//! frame. Host-shell accelerators are emitted through the bridge's signal
//! registry and come back as queued `ShellCommand`s.

use std::io;
use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};
use tracing::{debug, warn};

use crate::bridge::{Bridge, Channel, HostShell};
use crate::db::truncate;
use crate::fields::Filter;
use crate::manager::TaskManager;
use crate::tui::{
    colors::{ACCENT, MUTED, ON_ACCENT, REMOVING},
    enums::{AppState, ShellCommand},
    input::InputField,
    utils::centered_rect,
};
use crate::view::{display_text, TodoView};

/// How long a deleted row stays on screen before it is removed.
pub const REMOVAL_DELAY: Duration = Duration::from_millis(300);

/// Inline editor for one task. Lives only while the row is being edited.
struct EditState {
    id: u64,
    field: InputField,
}

pub struct App<B: Bridge> {
    state: AppState,
    manager: TaskManager<B>,
    shell: HostShell,
    commands: Receiver<ShellCommand>,
    list_state: ListState,
    new_task: InputField,
    editing: Option<EditState>,
    /// Rows playing their removal transition, with the time they go away.
    removing: Vec<(u64, Instant)>,
    status_message: String,
}

impl<B: Bridge> App<B> {
    /// Wrap `manager` and subscribe to the host-shell menu commands.
    pub fn new(manager: TaskManager<B>, shell: HostShell) -> Self {
        let (tx, commands) = mpsc::channel();
        let new_todo = tx.clone();
        manager.bridge().on_menu_new_todo(Box::new(move || {
            let _ = new_todo.send(ShellCommand::FocusNewTask);
        }));
        manager.bridge().on_menu_clear_completed(Box::new(move || {
            let _ = tx.send(ShellCommand::ClearCompleted);
        }));

        let mut app = App {
            state: AppState::TaskList,
            manager,
            shell,
            commands,
            list_state: ListState::default(),
            new_task: InputField::new(),
            editing: None,
            removing: Vec::new(),
            status_message: String::new(),
        };
        app.sync_selection();
        app
    }

    fn set_status_message(&mut self, msg: impl Into<String>) {
        self.status_message = msg.into();
    }

    fn view(&self) -> TodoView {
        TodoView::build(self.manager.todos(), self.manager.filter())
    }

    fn selected_id(&self) -> Option<u64> {
        let idx = self.list_state.selected()?;
        self.manager.filtered_todos().get(idx).map(|t| t.id)
    }

    /// Keep the selection on a visible row after the list changed.
    fn sync_selection(&mut self) {
        let visible = self.manager.filtered_todos().len();
        match self.list_state.selected() {
            _ if visible == 0 => self.list_state.select(None),
            Some(idx) if idx >= visible => self.list_state.select(Some(visible - 1)),
            None => self.list_state.select(Some(0)),
            Some(_) => {}
        }
    }

    fn is_removing(&self, id: u64) -> bool {
        self.removing.iter().any(|&(rid, _)| rid == id)
    }

    fn set_filter(&mut self, filter: Filter) {
        self.manager.set_filter(filter);
        self.list_state.select(None);
        self.sync_selection();
    }

    fn add_task(&mut self) {
        if let Some(id) = self.manager.add(&self.new_task.value) {
            debug!(id, "added from input");
            self.new_task.clear();
            self.set_status_message("Task added");
            self.sync_selection();
        }
    }

    fn start_edit(&mut self) {
        let Some(id) = self.selected_id() else { return };
        if self.is_removing(id) {
            return;
        }
        if let Some(task) = self.manager.get(id) {
            self.editing = Some(EditState {
                id,
                field: InputField::with_value(&task.text),
            });
            self.state = AppState::EditTask;
        }
    }

    fn commit_edit(&mut self) {
        if let Some(edit) = self.editing.take() {
            if self.manager.edit(edit.id, &edit.field.value) {
                self.set_status_message("Task updated");
            }
        }
        self.state = AppState::TaskList;
    }

    fn cancel_edit(&mut self) {
        self.editing = None;
        self.state = AppState::TaskList;
    }

    /// Start the removal transition for `id`; the task goes at `now + REMOVAL_DELAY`.
    fn schedule_removal(&mut self, id: u64, now: Instant) {
        if !self.is_removing(id) {
            self.removing.push((id, now + REMOVAL_DELAY));
        }
    }

    fn toggle_all(&mut self) {
        if self.manager.toggle_all() {
            self.sync_selection();
        }
    }

    fn clear_completed(&mut self) {
        let removed = self.manager.clear_completed();
        if removed > 0 {
            self.set_status_message(format!("Cleared {removed} completed"));
            self.sync_selection();
            if self.editing.as_ref().is_some_and(|e| self.manager.get(e.id).is_none()) {
                self.cancel_edit();
            }
        }
    }

    /// Apply everything that came due since the last frame: host commands,
    /// finished removal transitions, and save outcomes.
    pub fn tick(&mut self, now: Instant) {
        while let Ok(command) = self.commands.try_recv() {
            match command {
                ShellCommand::FocusNewTask => {
                    self.editing = None;
                    self.state = AppState::NewTask;
                }
                ShellCommand::ClearCompleted => self.clear_completed(),
            }
        }

        let (due, waiting): (Vec<_>, Vec<_>) =
            self.removing.drain(..).partition(|&(_, at)| at <= now);
        self.removing = waiting;
        if !due.is_empty() {
            for (id, _) in due {
                self.manager.delete(id);
                if self.editing.as_ref().is_some_and(|e| e.id == id) {
                    self.cancel_edit();
                }
            }
            self.sync_selection();
        }

        if let Some(e) = self.manager.poll_saves().pop() {
            warn!(error = %e, "save failed, keeping in-memory list");
            self.set_status_message(format!("Failed to save todos: {e}"));
        }
    }

    /// Host-shell accelerators. Returns true when the key was one.
    fn handle_accelerator(&mut self, key: KeyEvent) -> bool {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let shift = key.modifiers.contains(KeyModifiers::SHIFT);
        match key.code {
            KeyCode::Char('n') | KeyCode::Char('N') if ctrl => {
                self.shell.emit(Channel::MenuNewTodo);
                true
            }
            KeyCode::Char('c') | KeyCode::Char('C') if ctrl && shift => {
                self.shell.emit(Channel::MenuClearCompleted);
                true
            }
            KeyCode::F(5) => {
                self.shell.emit(Channel::MenuClearCompleted);
                true
            }
            _ => false,
        }
    }

    /// Handle one key press. Returns true if the application should quit.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        self.status_message.clear();
        if self.handle_accelerator(key) {
            return false;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('q'))
        {
            return true;
        }
        match self.state {
            AppState::TaskList => return self.handle_task_list_input(key.code),
            AppState::NewTask => self.handle_new_task_input(key.code),
            AppState::EditTask => self.handle_edit_input(key.code),
            AppState::Help => {
                if matches!(
                    key.code,
                    KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('h') | KeyCode::Char('?')
                ) {
                    self.state = AppState::TaskList;
                }
            }
        }
        false
    }

    fn handle_task_list_input(&mut self, key: KeyCode) -> bool {
        match key {
            KeyCode::Esc | KeyCode::Char('q') => return true,
            KeyCode::Up | KeyCode::Char('k') => {
                if let Some(selected) = self.list_state.selected() {
                    self.list_state.select(Some(selected.saturating_sub(1)));
                }
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if let Some(selected) = self.list_state.selected() {
                    if selected + 1 < self.manager.filtered_todos().len() {
                        self.list_state.select(Some(selected + 1));
                    }
                }
            }
            KeyCode::Char(' ') | KeyCode::Char('x') => {
                if let Some(id) = self.selected_id() {
                    self.manager.toggle(id);
                    self.sync_selection();
                }
            }
            KeyCode::Enter | KeyCode::Char('e') => self.start_edit(),
            KeyCode::Delete | KeyCode::Char('d') => {
                if let Some(id) = self.selected_id() {
                    self.schedule_removal(id, Instant::now());
                }
            }
            KeyCode::Char('a') | KeyCode::Char('i') => self.state = AppState::NewTask,
            KeyCode::Char('1') => self.set_filter(Filter::All),
            KeyCode::Char('2') => self.set_filter(Filter::Active),
            KeyCode::Char('3') => self.set_filter(Filter::Completed),
            KeyCode::Tab => self.set_filter(self.manager.filter().next()),
            KeyCode::Char('t') => self.toggle_all(),
            KeyCode::Char('c') => self.clear_completed(),
            KeyCode::Char('h') | KeyCode::Char('?') => self.state = AppState::Help,
            _ => {}
        }
        false
    }

    fn handle_new_task_input(&mut self, key: KeyCode) {
        match key {
            KeyCode::Esc => self.state = AppState::TaskList,
            KeyCode::Enter => self.add_task(),
            other => edit_field(&mut self.new_task, other),
        }
    }

    fn handle_edit_input(&mut self, key: KeyCode) {
        match key {
            KeyCode::Enter => self.commit_edit(),
            KeyCode::Esc => self.cancel_edit(),
            other => {
                if let Some(edit) = self.editing.as_mut() {
                    edit.field_key(other);
                }
            }
        }
    }

    fn render_header(&self, f: &mut Frame, area: Rect, view: &TodoView) {
        let line = Line::from(vec![
            Span::styled("TODO", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw("  "),
            Span::styled(
                format!("{}  ·  {}", view.total_label(), view.completed_label()),
                Style::default().add_modifier(Modifier::ITALIC),
            ),
        ]);
        let header = Paragraph::new(line)
            .style(Style::default().bg(ACCENT).fg(ON_ACCENT))
            .block(Block::default().borders(Borders::ALL))
            .alignment(Alignment::Center);
        f.render_widget(header, area);
    }

    fn render_new_task(&self, f: &mut Frame, area: Rect) {
        let focused = self.state == AppState::NewTask;
        let border = if focused { Color::Cyan } else { MUTED };
        let (text, style) = if self.new_task.value.is_empty() && !focused {
            ("What needs to be done? (a)".to_string(), Style::default().fg(MUTED))
        } else {
            (display_text(&self.new_task.value), Style::default())
        };
        let input = Paragraph::new(text).style(style).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border))
                .title("New task"),
        );
        f.render_widget(input, area);
        if focused {
            let x = cursor_x(area, 1, self.new_task.cursor_column());
            f.set_cursor_position((x, area.y + 1));
        }
    }

    fn render_controls(&self, f: &mut Frame, area: Rect, view: &TodoView) {
        let mut spans = Vec::new();
        for (i, filter) in Filter::ALL.iter().enumerate() {
            let label = format!(" {} {} ", i + 1, filter.label());
            let style = if *filter == view.filter {
                Style::default().bg(Color::Cyan).fg(Color::Black).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            spans.push(Span::styled(label, style));
            spans.push(Span::raw(" "));
        }
        spans.push(Span::raw("   "));
        spans.push(Span::styled(format!("[t] {}", view.toggle_all_label), Style::default()));
        if view.show_clear_completed {
            spans.push(Span::raw("  "));
            spans.push(Span::styled("[c] Clear Completed", Style::default().fg(Color::Yellow)));
        }
        f.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn render_list(&mut self, f: &mut Frame, area: Rect, view: &TodoView) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!("{} ({}/{})", view.filter.label(), view.rows.len(), view.total));

        if let Some(message) = view.empty_message {
            let empty = Paragraph::new(vec![Line::from(""), Line::from(message)])
                .style(Style::default().fg(MUTED))
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true })
                .block(block);
            f.render_widget(empty, area);
            return;
        }

        let text_width = area.width.saturating_sub(12) as usize;
        let items: Vec<ListItem> = view
            .rows
            .iter()
            .map(|row| {
                let check = if row.completed { "[x] " } else { "[ ] " };
                if let Some(edit) = self.editing.as_ref().filter(|e| e.id == row.id) {
                    return ListItem::new(Line::from(vec![
                        Span::raw(check),
                        Span::styled(
                            display_text(&edit.field.value),
                            Style::default().fg(Color::Black).bg(Color::Cyan),
                        ),
                        Span::styled("  [Enter] Save  [Esc] Cancel", Style::default().fg(MUTED)),
                    ]));
                }
                let style = if self.is_removing(row.id) {
                    Style::default().fg(REMOVING).add_modifier(Modifier::CROSSED_OUT)
                } else if row.completed {
                    Style::default().fg(MUTED).add_modifier(Modifier::CROSSED_OUT)
                } else {
                    Style::default()
                };
                ListItem::new(Line::from(vec![
                    Span::raw(check),
                    Span::styled(truncate(&row.text, text_width.max(1)), style),
                ]))
            })
            .collect();

        let list = List::new(items)
            .block(block)
            .highlight_style(Style::default().bg(Color::Gray).fg(Color::Black))
            .highlight_symbol(">> ");
        f.render_stateful_widget(list, area, &mut self.list_state);

        if let (Some(edit), Some(selected)) = (&self.editing, self.list_state.selected()) {
            let offset = self.list_state.offset();
            if selected >= offset {
                // Border, highlight symbol, checkbox.
                let x = cursor_x(area, 1 + 3 + 4, edit.field.cursor_column());
                let y = area.y + 1 + (selected - offset) as u16;
                f.set_cursor_position((x, y));
            }
        }
    }

    fn render_help(&self, f: &mut Frame, area: Rect) {
        let area = centered_rect(60, 70, area);
        f.render_widget(Clear, area);
        let lines = vec![
            Line::from(Span::styled("Keys", Style::default().add_modifier(Modifier::BOLD))),
            Line::from(""),
            Line::from("a / i        focus the new task input"),
            Line::from("Enter / e    edit the selected task"),
            Line::from("Space / x    toggle the selected task"),
            Line::from("d / Delete   delete the selected task"),
            Line::from("1 2 3 / Tab  show all / active / completed"),
            Line::from("t            check or uncheck all"),
            Line::from("c            clear completed"),
            Line::from("Ctrl+N       new todo"),
            Line::from("Ctrl+Shift+C / F5  clear completed"),
            Line::from("q / Esc      quit"),
        ];
        let help = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Help"))
            .wrap(Wrap { trim: false });
        f.render_widget(help, area);
    }

    fn render_status_bar(&self, f: &mut Frame, area: Rect) {
        let text = if !self.status_message.is_empty() {
            self.status_message.clone()
        } else {
            match self.state {
                AppState::TaskList => "Press 'h' for help".to_string(),
                AppState::NewTask => "Enter to add, Esc to return to the list".to_string(),
                AppState::EditTask => "Enter to save, Esc to cancel".to_string(),
                AppState::Help => "Help".to_string(),
            }
        };
        let status = Paragraph::new(text).style(Style::default().bg(ACCENT).fg(ON_ACCENT));
        f.render_widget(status, area);
    }

    /// Draw the whole screen from the current state.
    pub fn render(&mut self, f: &mut Frame) {
        let view = self.view();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .split(f.area());

        self.render_header(f, chunks[0], &view);
        self.render_new_task(f, chunks[1]);
        self.render_controls(f, chunks[2], &view);
        self.render_list(f, chunks[3], &view);
        self.render_status_bar(f, chunks[4]);
        if self.state == AppState::Help {
            let area = f.area();
            self.render_help(f, area);
        }
    }

    /// Main event loop: draw, wait briefly for a key, repeat until quit.
    pub fn run<T: Backend>(&mut self, terminal: &mut Terminal<T>) -> io::Result<()> {
        loop {
            self.tick(Instant::now());
            terminal.draw(|f| self.render(f))?;

            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press && self.handle_key(key) {
                        break;
                    }
                }
            }
        }
        Ok(())
    }
}

impl<B: Bridge> Drop for App<B> {
    fn drop(&mut self) {
        let bridge = self.manager.bridge();
        bridge.remove_all_listeners(Channel::MenuNewTodo);
        bridge.remove_all_listeners(Channel::MenuClearCompleted);
    }
}

impl EditState {
    fn field_key(&mut self, key: KeyCode) {
        edit_field(&mut self.field, key);
    }
}

/// Cursor column inside the bordered `area`, `lead` columns past its left
/// edge, kept within the inner width.
fn cursor_x(area: Rect, lead: u16, column: usize) -> u16 {
    let column = u16::try_from(column).unwrap_or(u16::MAX);
    let last = area.right().saturating_sub(2).max(area.x);
    area.x.saturating_add(lead).saturating_add(column).min(last)
}

fn edit_field(field: &mut InputField, key: KeyCode) {
    match key {
        KeyCode::Char(c) => field.handle_char(c),
        KeyCode::Backspace => field.handle_backspace(),
        KeyCode::Delete => field.handle_delete(),
        KeyCode::Left => field.move_cursor_left(),
        KeyCode::Right => field.move_cursor_right(),
        KeyCode::Home => field.move_home(),
        KeyCode::End => field.move_end(),
        _ => {}
    }
}
