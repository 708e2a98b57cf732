//! Main application logic for the terminal user interface.
//!
//! `BoardApp` owns the store, the gateway and all screen state, handles user
//! input and renders the five screens (board, calendar, tasks, history,
//! analytics). Mutations go through the handlers in `crate::handlers`, which
//! apply locally first and then push to the gateway.

use std::io;
use std::time::Duration;

use chrono::{Datelike, Local, NaiveDate, Utc};
use crossterm::event::{self, Event, KeyCode, KeyModifiers};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::gateway::{GatewayError, ProjectGateway};
use crate::handlers::{self, AppState, View};
use crate::model::Status;
use crate::store::ProjectStore;
use crate::tui::colors::{
    COLUMN_AMBER, COLUMN_BLUE, COLUMN_CYAN, COLUMN_GREEN, SAFE_GREEN, URGENT_RED, WARNING_ORANGE,
};
use crate::tui::form::{ConclusionFormState, ProjectFormState};
use crate::tui::input::InputField;
use crate::views::analytics::project_analytics;
use crate::views::calendar::{project_calendar, CalendarItem, SpanPos};
use crate::views::deadline::DeadlineLevel;
use crate::views::history::{format_stars, project_history};
use crate::views::kanban::project_kanban;
use crate::views::task_board::project_task_board;

/// Modal the app is currently in. Browse is the default; the others capture
/// all keystrokes until closed.
enum Mode {
    Browse,
    ProjectForm(ProjectFormState),
    ConclusionForm(ConclusionFormState),
    TaskEntry { project_id: String, field: InputField },
    ConfirmDelete { project_id: String, nombre: String },
}

/// Main board application state.
pub struct BoardApp {
    store: ProjectStore,
    gateway: Box<dyn ProjectGateway>,
    state: AppState,
    mode: Mode,
    selected_column: usize,
    selected_card: usize,
    selected_task: usize,
    show_detail: bool,
    status_message: String,
    user_label: String,
    offline: bool,
}

fn status_color(status: Status) -> Color {
    match status {
        Status::Nuevo => COLUMN_CYAN,
        Status::EnCurso => COLUMN_BLUE,
        Status::Completo => COLUMN_AMBER,
        Status::Terminado => COLUMN_GREEN,
    }
}

fn deadline_color(level: DeadlineLevel) -> Color {
    match level {
        DeadlineLevel::Urgent => URGENT_RED,
        DeadlineLevel::Warning => WARNING_ORANGE,
        DeadlineLevel::Safe => SAFE_GREEN,
    }
}

impl BoardApp {
    pub fn new(
        store: ProjectStore,
        gateway: Box<dyn ProjectGateway>,
        user_label: String,
        offline: bool,
    ) -> Self {
        BoardApp {
            store,
            gateway,
            state: AppState::new(Local::now().date_naive()),
            mode: Mode::Browse,
            selected_column: 0,
            selected_card: 0,
            selected_task: 0,
            show_detail: false,
            status_message: String::new(),
            user_label,
            offline,
        }
    }

    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }

    /// Turn a gateway failure into a status line entry; the local mutation
    /// already happened and stays.
    fn report<T>(&mut self, result: Result<T, GatewayError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                log::error!("persistencia: {e}");
                self.status_message = format!("Cambio local sin guardar: {e}");
                None
            }
        }
    }

    fn column_len(&self, column: usize) -> usize {
        let columns = project_kanban(&self.store, self.today());
        columns.get(column).map_or(0, |c| c.cards.len())
    }

    fn clamp_selection(&mut self) {
        if self.selected_column >= Status::ALL.len() {
            self.selected_column = 0;
        }
        let len = self.column_len(self.selected_column);
        if len == 0 {
            self.selected_card = 0;
        } else if self.selected_card >= len {
            self.selected_card = len - 1;
        }
    }

    fn selected_project_id(&self) -> Option<String> {
        let columns = project_kanban(&self.store, self.today());
        let card = columns
            .get(self.selected_column)?
            .cards
            .get(self.selected_card)?;
        Some(card.project.id.clone())
    }

    /// Flattened (project id, task index) pairs shown on the tasks screen.
    fn task_refs(&self) -> Vec<(String, usize)> {
        project_task_board(&self.store, &self.state.task_filter)
            .groups
            .iter()
            .flat_map(|group| {
                group
                    .tasks
                    .iter()
                    .map(|t| (group.project.id.clone(), t.order))
            })
            .collect()
    }

    fn selected_task_ref(&self) -> Option<(String, usize)> {
        self.task_refs().get(self.selected_task).cloned()
    }

    fn clamp_task_selection(&mut self) {
        let len = self.task_refs().len();
        if len == 0 {
            self.selected_task = 0;
        } else if self.selected_task >= len {
            self.selected_task = len - 1;
        }
    }

    async fn move_selected(&mut self, forward: bool) {
        let Some(id) = self.selected_project_id() else {
            return;
        };
        let current = self.selected_column;
        let target_index = if forward {
            if current + 1 >= Status::ALL.len() {
                return;
            }
            current + 1
        } else {
            if current == 0 {
                return;
            }
            current - 1
        };
        let target = Status::ALL[target_index];

        let result =
            handlers::request_status(&mut self.store, &*self.gateway, &id, target).await;
        match self.report(result).flatten() {
            Some(handlers::StatusChange::Applied) => {
                self.selected_column = target_index;
                self.status_message = format!("Movido a {}", target.title());
                self.clamp_selection();
            }
            Some(handlers::StatusChange::NeedsConclusion) => {
                self.state.pending_completion = Some(id.clone());
                self.mode = Mode::ConclusionForm(ConclusionFormState::new(&id));
            }
            None => {}
        }
    }

    async fn reorder_selected(&mut self, up: bool) {
        let Some(id) = self.selected_project_id() else {
            return;
        };
        let status = Status::ALL[self.selected_column];
        if status == Status::Terminado {
            // The terminado column ranks by completion date, not order.
            return;
        }
        let target = if up {
            self.selected_card.saturating_sub(1)
        } else {
            self.selected_card + 1
        };
        let result =
            handlers::move_project(&mut self.store, &*self.gateway, &id, status, target).await;
        if self.report(result).is_some() {
            self.selected_card = target.min(self.column_len(self.selected_column).saturating_sub(1));
        }
    }

    async fn submit_project_form(&mut self, form: ProjectFormState) {
        let Some(payload) = form.to_form() else {
            self.status_message = "El proyecto necesita un nombre".to_string();
            self.mode = Mode::ProjectForm(form);
            return;
        };
        match &form.editing {
            Some(id) => {
                let id = id.clone();
                let result =
                    handlers::update_project(&mut self.store, &*self.gateway, &id, &payload).await;
                if self.report(result).is_some() {
                    self.status_message = format!("Actualizado: {}", payload.nombre);
                }
            }
            None => {
                let result =
                    handlers::create_project(&mut self.store, &*self.gateway, &payload, Utc::now())
                        .await;
                if self.report(result).is_some() {
                    self.status_message = format!("Creado: {}", payload.nombre);
                }
            }
        }
        self.mode = Mode::Browse;
        self.clamp_selection();
    }

    async fn submit_conclusion_form(&mut self, form: ConclusionFormState) {
        let id = form.project_id.clone();
        let payload = form.to_form();
        let result =
            handlers::complete_project(&mut self.store, &*self.gateway, &id, &payload, Utc::now())
                .await;
        if self.report(result).is_some() {
            self.status_message = "Proyecto terminado".to_string();
        }
        self.state.pending_completion = None;
        self.mode = Mode::Browse;
        self.clamp_selection();
    }

    async fn handle_board_key(&mut self, code: KeyCode, modifiers: KeyModifiers) {
        match code {
            KeyCode::Left if modifiers.contains(KeyModifiers::CONTROL) => {
                self.move_selected(false).await;
            }
            KeyCode::Right if modifiers.contains(KeyModifiers::CONTROL) => {
                self.move_selected(true).await;
            }
            KeyCode::Up if modifiers.contains(KeyModifiers::SHIFT) => {
                self.reorder_selected(true).await;
            }
            KeyCode::Down if modifiers.contains(KeyModifiers::SHIFT) => {
                self.reorder_selected(false).await;
            }
            KeyCode::Left => {
                self.selected_column = self.selected_column.saturating_sub(1);
                self.clamp_selection();
            }
            KeyCode::Right => {
                if self.selected_column + 1 < Status::ALL.len() {
                    self.selected_column += 1;
                    self.clamp_selection();
                }
            }
            KeyCode::Up => {
                self.selected_card = self.selected_card.saturating_sub(1);
            }
            KeyCode::Down => {
                let len = self.column_len(self.selected_column);
                if len > 0 && self.selected_card + 1 < len {
                    self.selected_card += 1;
                }
            }
            KeyCode::Enter => {
                self.show_detail = !self.show_detail;
            }
            KeyCode::Char('n') => {
                self.mode = Mode::ProjectForm(ProjectFormState::new());
            }
            KeyCode::Char('e') => {
                if let Some(id) = self.selected_project_id() {
                    if let Some(project) = self.store.find(&id) {
                        self.mode = Mode::ProjectForm(ProjectFormState::from_project(project));
                    }
                }
            }
            KeyCode::Char('t') => {
                if let Some(project_id) = self.selected_project_id() {
                    self.mode = Mode::TaskEntry {
                        project_id,
                        field: InputField::new(),
                    };
                }
            }
            KeyCode::Char('x') => {
                if let Some(project_id) = self.selected_project_id() {
                    let nombre = self
                        .store
                        .find(&project_id)
                        .map(|p| p.nombre.clone())
                        .unwrap_or_default();
                    self.mode = Mode::ConfirmDelete { project_id, nombre };
                }
            }
            _ => {}
        }
    }

    async fn handle_tasks_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Up => {
                self.selected_task = self.selected_task.saturating_sub(1);
            }
            KeyCode::Down => {
                let len = self.task_refs().len();
                if len > 0 && self.selected_task + 1 < len {
                    self.selected_task += 1;
                }
            }
            KeyCode::Char(' ') => {
                if let Some((id, index)) = self.selected_task_ref() {
                    let result =
                        handlers::toggle_task(&mut self.store, &*self.gateway, &id, index).await;
                    self.report(result);
                    self.clamp_task_selection();
                }
            }
            KeyCode::Char('p') => {
                if let Some((id, index)) = self.selected_task_ref() {
                    let result =
                        handlers::cycle_task_priority(&mut self.store, &*self.gateway, &id, index)
                            .await;
                    self.report(result);
                }
            }
            KeyCode::Char('d') => {
                if let Some((id, index)) = self.selected_task_ref() {
                    let result =
                        handlers::delete_task(&mut self.store, &*self.gateway, &id, index).await;
                    self.report(result);
                    self.clamp_task_selection();
                }
            }
            KeyCode::Char('a') => {
                if let Some((project_id, _)) = self.selected_task_ref() {
                    self.mode = Mode::TaskEntry {
                        project_id,
                        field: InputField::new(),
                    };
                }
            }
            KeyCode::Char('f') => {
                self.state.task_filter.pending_only = !self.state.task_filter.pending_only;
                self.clamp_task_selection();
            }
            KeyCode::Char('P') => {
                use crate::model::Priority;
                self.state.task_filter.priority = match self.state.task_filter.priority {
                    None => Some(Priority::Alta),
                    Some(p) if p != Priority::Normal => Some(p.cycled()),
                    Some(_) => None,
                };
                self.clamp_task_selection();
            }
            _ => {}
        }
    }

    async fn handle_browse_key(&mut self, code: KeyCode, modifiers: KeyModifiers) -> bool {
        self.status_message.clear();
        match code {
            KeyCode::Char('q') if modifiers.contains(KeyModifiers::CONTROL) => return true,
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => return true,
            KeyCode::Esc => {
                if self.show_detail {
                    self.show_detail = false;
                } else {
                    return true;
                }
            }
            KeyCode::Char('1') => self.state.view = View::Board,
            KeyCode::Char('2') => self.state.view = View::Calendar,
            KeyCode::Char('3') => {
                self.state.view = View::Tasks;
                self.clamp_task_selection();
            }
            KeyCode::Char('4') => self.state.view = View::History,
            KeyCode::Char('5') => self.state.view = View::Analytics,
            KeyCode::Char('r') => {
                let result = handlers::refresh(&mut self.store, &*self.gateway).await;
                if self.report(result).is_some() {
                    self.status_message = "Proyectos recargados".to_string();
                }
                self.clamp_selection();
                self.clamp_task_selection();
            }
            _ => match self.state.view {
                View::Board => self.handle_board_key(code, modifiers).await,
                View::Tasks => self.handle_tasks_key(code).await,
                View::Calendar => match code {
                    KeyCode::Left => self.state.calendar_prev_month(),
                    KeyCode::Right => self.state.calendar_next_month(),
                    KeyCode::Char('t') => {
                        let today = self.today();
                        self.state.calendar_year = today.year();
                        self.state.calendar_month = today.month();
                    }
                    _ => {}
                },
                View::History => {
                    if code == KeyCode::Char('s') {
                        self.state.history_sort = self.state.history_sort.cycled();
                    }
                }
                View::Analytics => {}
            },
        }
        false
    }

    /// Poll for one input event. Returns `true` when the app should exit.
    async fn handle_input(&mut self) -> io::Result<bool> {
        if !event::poll(Duration::from_millis(50))? {
            return Ok(false);
        }
        let Event::Key(key) = event::read()? else {
            return Ok(false);
        };

        match std::mem::replace(&mut self.mode, Mode::Browse) {
            Mode::Browse => return Ok(self.handle_browse_key(key.code, key.modifiers).await),
            Mode::ProjectForm(mut form) => match key.code {
                KeyCode::Esc => {
                    self.status_message = "Formulario descartado".to_string();
                }
                KeyCode::Enter => self.submit_project_form(form).await,
                KeyCode::Tab | KeyCode::Down => {
                    form.next_field();
                    self.mode = Mode::ProjectForm(form);
                }
                KeyCode::BackTab | KeyCode::Up => {
                    form.prev_field();
                    self.mode = Mode::ProjectForm(form);
                }
                code => {
                    Self::edit_field(form.active_field_mut(), code);
                    self.mode = Mode::ProjectForm(form);
                }
            },
            Mode::ConclusionForm(mut form) => match key.code {
                KeyCode::Esc => {
                    self.state.pending_completion = None;
                    self.status_message = "Cierre cancelado, el proyecto no cambió".to_string();
                }
                KeyCode::Enter => self.submit_conclusion_form(form).await,
                KeyCode::Tab | KeyCode::Down => {
                    form.next_field();
                    self.mode = Mode::ConclusionForm(form);
                }
                KeyCode::BackTab | KeyCode::Up => {
                    form.prev_field();
                    self.mode = Mode::ConclusionForm(form);
                }
                code => {
                    Self::edit_field(form.active_field_mut(), code);
                    self.mode = Mode::ConclusionForm(form);
                }
            },
            Mode::TaskEntry {
                project_id,
                mut field,
            } => match key.code {
                KeyCode::Esc => {}
                KeyCode::Enter => {
                    let text = field.take();
                    if !text.is_empty() {
                        let result =
                            handlers::add_task(&mut self.store, &*self.gateway, &project_id, &text)
                                .await;
                        if self.report(result).is_some() {
                            self.status_message = "Tarea agregada".to_string();
                        }
                    }
                }
                code => {
                    Self::edit_field(&mut field, code);
                    self.mode = Mode::TaskEntry { project_id, field };
                }
            },
            Mode::ConfirmDelete { project_id, nombre } => match key.code {
                KeyCode::Char('s') | KeyCode::Char('S') | KeyCode::Enter => {
                    let result =
                        handlers::delete_project(&mut self.store, &*self.gateway, &project_id)
                            .await;
                    if self.report(result).is_some() {
                        self.status_message = format!("Eliminado: {nombre}");
                    }
                    self.clamp_selection();
                    self.clamp_task_selection();
                }
                _ => {
                    self.status_message = "Eliminación cancelada".to_string();
                }
            },
        }
        Ok(false)
    }

    fn edit_field(field: &mut InputField, code: KeyCode) {
        match code {
            KeyCode::Char(c) => field.handle_char(c),
            KeyCode::Backspace => field.handle_backspace(),
            KeyCode::Delete => field.handle_delete(),
            KeyCode::Left => field.move_cursor_left(),
            KeyCode::Right => field.move_cursor_right(),
            _ => {}
        }
    }

    // ---- rendering ----

    fn render(&self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .split(f.area());

        self.render_header(f, chunks[0]);
        match self.state.view {
            View::Board => self.render_board(f, chunks[1]),
            View::Calendar => self.render_calendar(f, chunks[1]),
            View::Tasks => self.render_tasks(f, chunks[1]),
            View::History => self.render_history(f, chunks[1]),
            View::Analytics => self.render_analytics(f, chunks[1]),
        }
        self.render_status_bar(f, chunks[2]);

        if self.show_detail && self.state.view == View::Board {
            self.render_detail_popup(f);
        }
        match &self.mode {
            Mode::ProjectForm(form) => self.render_project_form(f, form),
            Mode::ConclusionForm(form) => self.render_conclusion_form(f, form),
            Mode::TaskEntry { field, .. } => self.render_task_entry(f, field),
            Mode::ConfirmDelete { nombre, .. } => self.render_confirm_delete(f, nombre),
            Mode::Browse => {}
        }
    }

    fn render_header(&self, f: &mut Frame, area: Rect) {
        let tab = |view: View, label: &str| {
            if self.state.view == view {
                Span::styled(
                    format!(" {label} "),
                    Style::default().add_modifier(Modifier::BOLD | Modifier::REVERSED),
                )
            } else {
                Span::raw(format!(" {label} "))
            }
        };

        let mut spans = vec![
            Span::styled("TABLERO", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw("  "),
            tab(View::Board, "1 Tablero"),
            tab(View::Calendar, "2 Calendario"),
            tab(View::Tasks, "3 Tareas"),
            tab(View::History, "4 Historial"),
            tab(View::Analytics, "5 Análisis"),
            Span::raw("  "),
        ];
        if self.offline {
            spans.push(Span::styled(
                "[sin conexión]",
                Style::default().fg(WARNING_ORANGE),
            ));
        } else {
            spans.push(Span::styled(
                self.user_label.clone(),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::ITALIC),
            ));
        }

        let header = Paragraph::new(Line::from(spans))
            .block(Block::default().borders(Borders::ALL))
            .alignment(Alignment::Center);
        f.render_widget(header, area);
    }

    fn render_board(&self, f: &mut Frame, area: Rect) {
        let columns = project_kanban(&self.store, self.today());
        let layout = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(25); 4])
            .split(area);

        for (i, column) in columns.iter().enumerate() {
            let accent = status_color(column.status);
            let is_selected = i == self.selected_column;
            let border_style = if is_selected {
                Style::default().fg(accent).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            let title = if column.status == Status::Terminado && column.total > column.cards.len() {
                format!("{} ({}, ver 4)", column.status.title(), column.total)
            } else {
                format!("{} ({})", column.status.title(), column.total)
            };

            let block = Block::default()
                .borders(Borders::ALL)
                .title(title)
                .border_style(border_style);
            let inner = block.inner(layout[i]);
            f.render_widget(block, layout[i]);

            let card_height = 4u16;
            let mut y = 0u16;
            for (card_index, card) in column.cards.iter().enumerate() {
                if y + card_height > inner.height {
                    let hidden = column.cards.len() - card_index;
                    let more = Paragraph::new(format!("▼ +{hidden} más"))
                        .style(Style::default().fg(Color::Cyan));
                    if inner.height > 0 {
                        f.render_widget(
                            more,
                            Rect {
                                x: inner.x,
                                y: inner.y + inner.height - 1,
                                width: inner.width,
                                height: 1,
                            },
                        );
                    }
                    break;
                }

                let card_selected = is_selected && card_index == self.selected_card;
                let style = if card_selected {
                    Style::default()
                        .bg(accent)
                        .fg(Color::Black)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().bg(Color::DarkGray)
                };

                let mut lines = vec![Line::from(card.project.nombre.clone())];
                let mut badges: Vec<Span> = Vec::new();
                if let Some(deadline) = &card.deadline {
                    badges.push(Span::styled(
                        deadline.message.clone(),
                        Style::default().fg(deadline_color(deadline.level)),
                    ));
                }
                if let Some(progress) = &card.progress {
                    if !badges.is_empty() {
                        badges.push(Span::raw("  "));
                    }
                    badges.push(Span::raw(format!(
                        "✓{}/{}",
                        progress.completed, progress.total
                    )));
                }
                if badges.is_empty() {
                    lines.push(Line::from(card.project.tipo.clone()));
                } else {
                    lines.push(Line::from(badges));
                }

                let widget = Paragraph::new(lines)
                    .block(Block::default().borders(Borders::ALL))
                    .style(style)
                    .wrap(Wrap { trim: true });
                f.render_widget(
                    widget,
                    Rect {
                        x: inner.x,
                        y: inner.y + y,
                        width: inner.width,
                        height: card_height,
                    },
                );
                y += card_height;
            }
        }
    }

    fn render_calendar(&self, f: &mut Frame, area: Rect) {
        let grid = project_calendar(
            &self.store,
            self.state.calendar_year,
            self.state.calendar_month,
            self.today(),
        );

        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!("{}  (←/→ mes, t hoy)", grid.title));
        let inner = block.inner(area);
        f.render_widget(block, area);
        if inner.height < 7 {
            return;
        }

        let cell_width = inner.width / 7;
        let cell_height = ((inner.height - 1) / 6).max(1);

        for (i, name) in ["dom", "lun", "mar", "mié", "jue", "vie", "sáb"]
            .iter()
            .enumerate()
        {
            let label = Paragraph::new(*name).alignment(Alignment::Center);
            f.render_widget(
                label,
                Rect {
                    x: inner.x + cell_width * i as u16,
                    y: inner.y,
                    width: cell_width,
                    height: 1,
                },
            );
        }

        for (index, cell) in grid.cells.iter().enumerate() {
            let row = (index / 7) as u16;
            let col = (index % 7) as u16;
            let rect = Rect {
                x: inner.x + cell_width * col,
                y: inner.y + 1 + cell_height * row,
                width: cell_width,
                height: cell_height,
            };

            let day_style = if cell.today {
                Style::default()
                    .fg(Color::Black)
                    .bg(SAFE_GREEN)
                    .add_modifier(Modifier::BOLD)
            } else if cell.other_month {
                Style::default().fg(Color::DarkGray)
            } else {
                Style::default()
            };

            let mut lines = vec![Line::from(Span::styled(cell.day.to_string(), day_style))];
            for item in &cell.items {
                let line = match item {
                    CalendarItem::Project { project, span } => {
                        let marker = match span {
                            SpanPos::Start => "▸",
                            SpanPos::Middle => "─",
                            SpanPos::End => "◂",
                            SpanPos::Single => "■",
                        };
                        Line::from(Span::styled(
                            format!("{marker} {}", project.nombre),
                            Style::default().fg(status_color(project.status)),
                        ))
                    }
                    CalendarItem::Task { task, .. } => Line::from(Span::styled(
                        format!("• {}", task.text),
                        Style::default().fg(Color::Gray),
                    )),
                };
                lines.push(line);
            }
            if cell.overflow > 0 {
                lines.push(Line::from(Span::styled(
                    format!("+{} más", cell.overflow),
                    Style::default().fg(Color::Cyan),
                )));
            }

            let widget = Paragraph::new(lines).wrap(Wrap { trim: true });
            f.render_widget(widget, rect);
        }
    }

    fn render_tasks(&self, f: &mut Frame, area: Rect) {
        let board = project_task_board(&self.store, &self.state.task_filter);
        let mut filters = Vec::new();
        if self.state.task_filter.pending_only {
            filters.push("pendientes".to_string());
        }
        if let Some(priority) = self.state.task_filter.priority {
            filters.push(format!("prioridad {}", priority.as_str()));
        }
        let title = if filters.is_empty() {
            format!("Tareas ({})", board.total_tasks)
        } else {
            format!("Tareas ({}) [{}]", board.total_tasks, filters.join(", "))
        };

        let block = Block::default().borders(Borders::ALL).title(title);
        let inner = block.inner(area);
        f.render_widget(block, area);

        let mut lines: Vec<Line> = Vec::new();
        let mut flat_index = 0usize;
        for group in &board.groups {
            lines.push(Line::from(vec![
                Span::styled(
                    group.project.nombre.clone(),
                    Style::default()
                        .fg(status_color(group.project.status))
                        .add_modifier(Modifier::BOLD),
                ),
                Span::raw(format!("  ✓{}/{}", group.completed, group.total)),
            ]));
            for task in &group.tasks {
                let marker = if task.completed { "[x]" } else { "[ ]" };
                let mut text = format!("  {marker} {}", task.text);
                if task.priority != crate::model::Priority::Normal {
                    text.push_str(&format!("  ({})", task.priority.as_str()));
                }
                if let Some(due) = task.due_date {
                    text.push_str(&format!("  {}", crate::views::calendar::format_fecha_corta(due)));
                }
                let style = if flat_index == self.selected_task {
                    Style::default().add_modifier(Modifier::REVERSED)
                } else if task.completed {
                    Style::default().fg(Color::DarkGray)
                } else {
                    Style::default()
                };
                lines.push(Line::from(Span::styled(text, style)));
                flat_index += 1;
            }
            lines.push(Line::from(""));
        }
        if lines.is_empty() {
            lines.push(Line::from("Sin tareas con estos filtros"));
        }

        let widget = Paragraph::new(lines).wrap(Wrap { trim: false });
        f.render_widget(widget, inner);
    }

    fn render_history(&self, f: &mut Frame, area: Rect) {
        let entries = project_history(&self.store, self.state.history_sort);
        let block = Block::default().borders(Borders::ALL).title(format!(
            "Historial ({} terminados, orden: {}, s para cambiar)",
            entries.len(),
            self.state.history_sort.label()
        ));
        let inner = block.inner(area);
        f.render_widget(block, area);

        let mut lines: Vec<Line> = Vec::new();
        for entry in &entries {
            lines.push(Line::from(vec![
                Span::styled(
                    entry.nombre.clone(),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::raw(format!("  {}", entry.fecha)),
            ]));
            let profit_style = if entry.utilidad < 0.0 {
                Style::default().fg(URGENT_RED)
            } else {
                Style::default().fg(SAFE_GREEN)
            };
            lines.push(Line::from(vec![
                Span::raw(format!("  {}  ", entry.resumen)),
                Span::raw(format!("{}  ", format_stars(entry.calificacion))),
                Span::styled(format!("${:.0}", entry.utilidad), profit_style),
            ]));
            lines.push(Line::from(""));
        }
        if lines.is_empty() {
            lines.push(Line::from("Todavía no hay proyectos terminados"));
        }

        let widget = Paragraph::new(lines).wrap(Wrap { trim: false });
        f.render_widget(widget, inner);
    }

    fn render_analytics(&self, f: &mut Frame, area: Rect) {
        let analytics = project_analytics(&self.store, self.today());
        let block = Block::default().borders(Borders::ALL).title("Análisis");
        let inner = block.inner(area);
        f.render_widget(block, area);

        let peak = analytics
            .months
            .iter()
            .map(|m| m.utilidad.abs())
            .fold(0.0f64, f64::max);

        let mut lines = vec![
            Line::from(format!(
                "Proyectos terminados: {}   Utilidad promedio: ${:.0}",
                analytics.total_completed, analytics.avg_profit
            )),
            Line::from(format!(
                "Este mes: ${:.0}   Mes anterior: ${:.0}",
                analytics.current_month, analytics.previous_month
            )),
            Line::from(""),
            Line::from("Utilidad por mes:"),
        ];
        for month in &analytics.months {
            let width = if peak > 0.0 {
                ((month.utilidad.abs() / peak) * 30.0).round() as usize
            } else {
                0
            };
            let bar = "█".repeat(width);
            let style = if month.utilidad < 0.0 {
                Style::default().fg(URGENT_RED)
            } else {
                Style::default().fg(SAFE_GREEN)
            };
            lines.push(Line::from(vec![
                Span::raw(format!("  {:>6}  ", month.label)),
                Span::styled(bar, style),
                Span::raw(format!(" ${:.0}", month.utilidad)),
            ]));
        }

        let widget = Paragraph::new(lines);
        f.render_widget(widget, inner);
    }

    fn render_status_bar(&self, f: &mut Frame, area: Rect) {
        let text = if !self.status_message.is_empty() {
            self.status_message.clone()
        } else {
            match self.state.view {
                View::Board => {
                    "n: Nuevo | e: Editar | t: Tarea | x: Eliminar | Ctrl+←/→: Mover | Shift+↑/↓: Orden | Enter: Detalle | r: Recargar | Esc: Salir"
                        .to_string()
                }
                View::Tasks => {
                    "espacio: Completar | p: Prioridad | d: Eliminar | a: Agregar | f: Pendientes | P: Filtro prioridad"
                        .to_string()
                }
                View::Calendar => "←/→: Mes | t: Hoy".to_string(),
                View::History => "s: Cambiar orden".to_string(),
                View::Analytics => "Utilidad de los últimos 6 meses".to_string(),
            }
        };

        let accent = status_color(Status::ALL[self.selected_column.min(3)]);
        let bar = Paragraph::new(text)
            .style(Style::default().bg(accent).fg(Color::White))
            .alignment(Alignment::Left);
        f.render_widget(bar, area);
    }

    fn popup_area(f: &Frame, percent_x: u16, percent_y: u16) -> Rect {
        let area = f.area();
        let width = area.width * percent_x / 100;
        let height = area.height * percent_y / 100;
        Rect::new(
            (area.width - width) / 2,
            (area.height - height) / 2,
            width,
            height,
        )
    }

    fn render_detail_popup(&self, f: &mut Frame) {
        let Some(id) = self.selected_project_id() else {
            return;
        };
        let Some(project) = self.store.find(&id) else {
            return;
        };

        let area = Self::popup_area(f, 70, 80);
        f.render_widget(Clear, area);

        let fmt_date = |d: Option<NaiveDate>| {
            d.map(crate::views::calendar::format_fecha_corta)
                .unwrap_or_else(|| "-".to_string())
        };
        let fmt_text = |s: &str| if s.is_empty() { "-".to_string() } else { s.to_string() };

        let mut lines = vec![
            Line::from(Span::styled(
                project.nombre.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(format!("Estado:      {}", project.status.title())),
            Line::from(format!("Tipo:        {}", fmt_text(&project.tipo))),
            Line::from(format!("Artista:     {}", fmt_text(&project.artista))),
            Line::from(format!("Cliente:     {}", fmt_text(&project.cliente))),
            Line::from(format!("Contacto:    {}", fmt_text(&project.contacto))),
            Line::from(format!("Ubicación:   {}", fmt_text(&project.ubicacion))),
            Line::from(format!("Formato:     {}", fmt_text(&project.formato))),
            Line::from(format!("Medidas:     {}", fmt_text(&project.medidas))),
            Line::from(format!(
                "Presupuesto: {}",
                project
                    .presupuesto
                    .map(|p| format!("${p:.0}"))
                    .unwrap_or_else(|| "-".to_string())
            )),
            Line::from(format!("Inicio:      {}", fmt_date(project.fecha_inicio))),
            Line::from(format!("Fin:         {}", fmt_date(project.fecha_fin))),
            Line::from(format!("Drive:       {}", fmt_text(&project.drive_link))),
        ];
        if !project.contexto.is_empty() {
            lines.push(Line::from(""));
            lines.push(Line::from(project.contexto.clone()));
        }
        if !project.tasks.is_empty() {
            lines.push(Line::from(""));
            lines.push(Line::from("Tareas:"));
            for task in &project.tasks {
                let marker = if task.completed { "x" } else { " " };
                lines.push(Line::from(format!("  [{marker}] {}", task.text)));
            }
        }
        if let Some(conclusion) = &project.conclusion {
            lines.push(Line::from(""));
            lines.push(Line::from(format!(
                "Cierre: {}  utilidad ${:.0}",
                format_stars(conclusion.calificacion.unwrap_or(0)),
                project.utilidad.unwrap_or(0.0)
            )));
        }

        let popup = Paragraph::new(lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Detalle (Enter para cerrar)")
                    .title_alignment(Alignment::Center)
                    .border_style(Style::default().fg(status_color(project.status))),
            )
            .wrap(Wrap { trim: true })
            .style(Style::default().bg(Color::Black));
        f.render_widget(popup, area);
    }

    fn render_field_lines<'a>(
        labels: &[&'static str],
        fields: &'a [&InputField],
    ) -> Vec<Line<'a>> {
        labels
            .iter()
            .zip(fields)
            .map(|(label, field)| {
                let style = if field.active {
                    Style::default().add_modifier(Modifier::REVERSED)
                } else {
                    Style::default()
                };
                Line::from(vec![
                    Span::raw(format!("{label:<26}")),
                    Span::styled(field.value.clone(), style),
                    if field.active {
                        Span::styled("▏", Style::default().fg(Color::Cyan))
                    } else {
                        Span::raw("")
                    },
                ])
            })
            .collect()
    }

    fn render_project_form(&self, f: &mut Frame, form: &ProjectFormState) {
        let area = Self::popup_area(f, 70, 80);
        f.render_widget(Clear, area);

        let fields: Vec<&InputField> = vec![
            &form.nombre,
            &form.tipo,
            &form.artista,
            &form.cliente,
            &form.contacto,
            &form.ubicacion,
            &form.formato,
            &form.medidas,
            &form.contexto,
            &form.drive_link,
            &form.presupuesto,
            &form.fecha_inicio,
            &form.fecha_fin,
        ];
        let mut lines = Self::render_field_lines(&ProjectFormState::labels(), &fields);
        lines.push(Line::from(""));
        lines.push(Line::from("Tab: Siguiente | Enter: Guardar | Esc: Cancelar"));

        let title = if form.editing.is_some() {
            "Editar proyecto"
        } else {
            "Nuevo proyecto"
        };
        let popup = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title(title))
            .style(Style::default().bg(Color::Black));
        f.render_widget(popup, area);
    }

    fn render_conclusion_form(&self, f: &mut Frame, form: &ConclusionFormState) {
        let area = Self::popup_area(f, 60, 50);
        f.render_widget(Clear, area);

        let fields: Vec<&InputField> = vec![
            &form.gastos,
            &form.calificacion,
            &form.notas,
            &form.link_resultado,
        ];
        let mut lines = vec![
            Line::from("Para terminar el proyecto registra su cierre."),
            Line::from(""),
        ];
        lines.extend(Self::render_field_lines(
            &ConclusionFormState::labels(),
            &fields,
        ));
        lines.push(Line::from(""));
        lines.push(Line::from("Enter: Terminar proyecto | Esc: Cancelar"));

        let popup = Paragraph::new(lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Cierre del proyecto")
                    .border_style(Style::default().fg(COLUMN_GREEN)),
            )
            .style(Style::default().bg(Color::Black));
        f.render_widget(popup, area);
    }

    fn render_task_entry(&self, f: &mut Frame, field: &InputField) {
        let area = Self::popup_area(f, 60, 20);
        f.render_widget(Clear, area);

        let lines = vec![
            Line::from(vec![
                Span::raw("Tarea: "),
                Span::styled(
                    field.value.clone(),
                    Style::default().add_modifier(Modifier::REVERSED),
                ),
            ]),
            Line::from(""),
            Line::from("Enter: Agregar | Esc: Cancelar"),
        ];
        let popup = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Nueva tarea"))
            .style(Style::default().bg(Color::Black));
        f.render_widget(popup, area);
    }

    fn render_confirm_delete(&self, f: &mut Frame, nombre: &str) {
        let area = Self::popup_area(f, 50, 20);
        f.render_widget(Clear, area);

        let lines = vec![
            Line::from(format!("¿Eliminar \"{nombre}\" y todas sus tareas?")),
            Line::from(""),
            Line::from("s/Enter: Eliminar | cualquier otra tecla: Cancelar"),
        ];
        let popup = Paragraph::new(lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Confirmar")
                    .border_style(Style::default().fg(URGENT_RED)),
            )
            .style(Style::default().bg(Color::Black));
        f.render_widget(popup, area);
    }

    /// Main event loop.
    pub async fn run<B: ratatui::backend::Backend>(
        &mut self,
        terminal: &mut ratatui::Terminal<B>,
    ) -> io::Result<()> {
        loop {
            terminal.draw(|f| self.render(f))?;
            if self.handle_input().await? {
                break;
            }
        }
        Ok(())
    }
}
