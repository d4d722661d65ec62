use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::{event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind}, execute, terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen}};
use ratatui::{backend::CrosstermBackend, Frame, Terminal, widgets::{Block, Borders, Clear, List, ListItem, Paragraph, ListState, Wrap}, layout::{Layout, Constraint, Direction, Rect}, style::{Style, Modifier, Color}};
use tokio::sync::{mpsc, watch};

use tasklist::{
    application::{forms::{ActiveField, Modals, TaskDraft}, task_service::{TaskService, TaskServiceImpl, TaskSnapshot}},
    config::Config,
    domain::task::{NewTask, Task, TaskId},
    infrastructure::store::TaskStore,
    telemetry,
};

const NOTICE_TTL: Duration = Duration::from_secs(4);

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    // Logging to stdout would draw over the UI, so only a file sink is used here.
    if let Some(path) = config.log_file.as_deref() {
        telemetry::init(&config.log_filter, Some(path))?;
    }
    let store = TaskStore::new(&config.database_url);
    let repo = store.repository().await?.clone();
    let service = TaskServiceImpl::load(repo).await?;

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, service, store.database_url()).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    res
}

enum Intent {
    Add(NewTask),
    Update(Task),
    Toggle(TaskId),
    Delete(TaskId),
    Refresh,
}

struct App<S: TaskService + Clone> {
    service: S,
    tasks: TaskSnapshot,
    updates: watch::Receiver<TaskSnapshot>,
    failures_tx: mpsc::UnboundedSender<String>,
    failures: mpsc::UnboundedReceiver<String>,
    notice: Option<(String, Instant)>,
    selected: usize,
    list_state: ListState,
    modals: Modals,
    last_tick: Instant,
}

impl<S: TaskService + Clone> App<S> {
    fn new(service: S) -> Self {
        let updates = service.subscribe();
        let (failures_tx, failures) = mpsc::unbounded_channel();
        let tasks = service.tasks();
        let mut app = Self { service, tasks, updates, failures_tx, failures, notice: None, selected: 0, list_state: ListState::default(), modals: Modals::default(), last_tick: Instant::now() };
        app.clamp_selection();
        app
    }

    fn selected_task(&self) -> Option<&Task> { self.tasks.get(self.selected) }

    /// Hands the intent to the runtime; the outcome comes back through `updates` or `failures`.
    fn dispatch(&self, intent: Intent) {
        let service = self.service.clone();
        let failures = self.failures_tx.clone();
        tokio::spawn(async move {
            let outcome = match intent {
                Intent::Add(task) => service.add_task(task).await,
                Intent::Update(task) => service.update_task(task).await,
                Intent::Toggle(id) => service.toggle_complete(id).await,
                Intent::Delete(id) => service.delete_task(id).await,
                Intent::Refresh => service.refresh().await,
            };
            if let Err(e) = outcome {
                let _ = failures.send(e.to_string());
            }
        });
    }

    fn notify(&mut self, message: impl Into<String>) { self.notice = Some((message.into(), Instant::now())); }

    /// Pulls in snapshots and failures produced by dispatched intents.
    fn sync(&mut self) {
        if self.updates.has_changed().unwrap_or(false) {
            self.tasks = self.updates.borrow_and_update().clone();
            self.clamp_selection();
        }
        while let Ok(message) = self.failures.try_recv() { self.notify(message); }
        if self.notice.as_ref().is_some_and(|(_, at)| at.elapsed() >= NOTICE_TTL) { self.notice = None; }
    }

    fn clamp_selection(&mut self) {
        let len = self.tasks.len();
        if len == 0 { self.selected = 0; self.list_state.select(None); }
        else { if self.selected >= len { self.selected = len - 1; } self.list_state.select(Some(self.selected)); }
    }

    /// Returns false when the user asked to quit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        if self.modals.edit().is_some() {
            match code {
                KeyCode::Esc => self.modals.dismiss_edit(),
                KeyCode::Enter => match self.modals.submit_edit() {
                    Some(Ok(task)) => self.dispatch(Intent::Update(task)),
                    Some(Err(e)) => self.notify(e.to_string()),
                    None => {}
                },
                _ => { if let Some(modal) = self.modals.edit_mut() { edit_draft(&mut modal.draft, code); } }
            }
            return true;
        }
        if self.modals.create().is_some() {
            match code {
                KeyCode::Esc => self.modals.dismiss_create(),
                KeyCode::Enter => match self.modals.submit_create() {
                    Some(Ok(task)) => self.dispatch(Intent::Add(task)),
                    Some(Err(e)) => self.notify(e.to_string()),
                    None => {}
                },
                _ => { if let Some(draft) = self.modals.create_mut() { edit_draft(draft, code); } }
            }
            return true;
        }
        match code {
            KeyCode::Char('q') => return false,
            KeyCode::Up | KeyCode::Char('k') => { if self.selected > 0 { self.selected -= 1; } self.clamp_selection(); }
            KeyCode::Down | KeyCode::Char('j') => { if self.selected + 1 < self.tasks.len() { self.selected += 1; } self.clamp_selection(); }
            KeyCode::Enter | KeyCode::Char(' ') => { if let Some(id) = self.selected_task().map(|t| t.id) { self.dispatch(Intent::Toggle(id)); } }
            KeyCode::Char('n') => self.modals.open_create(),
            KeyCode::Char('e') => { if let Some(task) = self.selected_task().cloned() { self.modals.open_edit(&task); } }
            KeyCode::Char('d') => { if let Some(id) = self.selected_task().map(|t| t.id) { self.dispatch(Intent::Delete(id)); } }
            KeyCode::Char('r') => self.dispatch(Intent::Refresh),
            _ => {}
        }
        true
    }
}

fn edit_draft(draft: &mut TaskDraft, code: KeyCode) {
    match code {
        KeyCode::Backspace => draft.pop(),
        KeyCode::Tab => draft.switch_field(),
        KeyCode::Char(c) => draft.push(c),
        _ => {}
    }
}

async fn run_app<S: TaskService + Clone>(terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>, service: S, database_url: &str) -> Result<()> {
    let tick_rate = Duration::from_millis(200);
    let mut app = App::new(service);

    loop {
        app.sync();
        terminal.draw(|f| draw(f, &mut app, database_url))?;

        let timeout = tick_rate.saturating_sub(app.last_tick.elapsed());
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                // Only act on key presses; ignore repeats and releases to prevent duplicate input
                if key.kind == KeyEventKind::Press && !app.handle_key(key.code) { break; }
            }
        }
        if app.last_tick.elapsed() >= tick_rate {
            app.last_tick = Instant::now();
        }
    }
    Ok(())
}

fn draw<S: TaskService + Clone>(f: &mut Frame, app: &mut App<S>, database_url: &str) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(1), Constraint::Length(3)])
        .split(f.size());

    let header = Paragraph::new("Enter/space: toggle, n: new, e: edit, d: delete, r: reload, q: quit")
        .block(Block::default().borders(Borders::ALL).title("tasks"));
    f.render_widget(header, chunks[0]);

    let middle = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(chunks[1]);

    let list_items: Vec<ListItem> = app.tasks.iter().map(|t| {
        let mark = if t.completed { "[x]" } else { "[ ]" };
        ListItem::new(format!("{} {}", mark, t.title))
    }).collect();
    let list = List::new(list_items)
        .block(Block::default().borders(Borders::ALL).title(format!("items ({})", app.tasks.len())))
        .highlight_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD | Modifier::REVERSED))
        .highlight_symbol(">> ");
    f.render_stateful_widget(list, middle[0], &mut app.list_state);

    let detail = match app.selected_task() {
        Some(t) => format!("Title:\n{}\n\nStatus: {}\n\nDescription:\n{}", t.title, if t.completed { "Done" } else { "Pending" }, t.description),
        None => "No tasks yet. Press n to add one.".to_string(),
    };
    let details = Paragraph::new(detail)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("details"));
    f.render_widget(details, middle[1]);

    let (footer_title, footer_text, footer_style) = match &app.notice {
        Some((message, _)) => ("notice", message.clone(), Style::default().fg(Color::Yellow)),
        None => ("info", format!("DATABASE_URL={database_url}"), Style::default()),
    };
    let footer = Paragraph::new(footer_text)
        .style(footer_style)
        .block(Block::default().borders(Borders::ALL).title(footer_title));
    f.render_widget(footer, chunks[2]);

    if let Some(draft) = app.modals.create() { draw_form(f, "new task", draft); }
    if let Some(modal) = app.modals.edit() { draw_form(f, &format!("edit task #{}", modal.target_id()), &modal.draft); }
}

fn draw_form(f: &mut Frame, title: &str, draft: &TaskDraft) {
    let area = centered(f.size(), 60, 7);
    let line = |field: ActiveField, label: &str, value: &str| {
        let active = draft.field == field;
        format!("{} {label}: {value}{}", if active { ">" } else { " " }, if active { "_" } else { "" })
    };
    let text = format!(
        "{}\n{}\n\nTab: switch field  Enter: save  Esc: cancel",
        line(ActiveField::Title, "Title", &draft.title),
        line(ActiveField::Description, "Description", &draft.description),
    );
    f.render_widget(Clear, area);
    f.render_widget(Paragraph::new(text).block(Block::default().borders(Borders::ALL).title(title.to_string())), area);
}

fn centered(area: Rect, width_percent: u16, height: u16) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(height), Constraint::Min(0)])
        .split(area);
    let side = (100 - width_percent) / 2;
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(side), Constraint::Percentage(width_percent), Constraint::Percentage(side)])
        .split(vertical[1])[1]
}
