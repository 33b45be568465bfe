mod markdown;
mod ui;

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::{Args, Parser};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend, style::Color};
use tokio::sync::oneshot::{self, error::TryRecvError};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use formchat_core::{
    Api, ApiClient, Config, Error, Route,
    models::{DraftField, FormStatus, FormUpdate, Message},
    views::{ChatDetail, ChatList, FormHistory, SendOutcome},
};

fn main() {
    if let Err(err) = try_main() {
        let _ = writeln!(io::stderr(), "{err:?}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli
        .common
        .config
        .unwrap_or_else(Config::default_config_path);
    let mut config = Config::ensure_at(&config_path)?;
    if let Some(api_url) = cli.common.api_url {
        config.api_url = api_url;
    }

    init_logging(&config.tui_log_path())?;

    let start: Route = cli.route.as_deref().unwrap_or("/").parse()?;
    let api = ApiClient::from_config(&config)?;
    info!(api_url = %config.api_url, route = %start, "formchat-tui starting");

    let rt = tokio::runtime::Runtime::new()?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(api, config.tui.refresh_interval());
    app.open(start, &rt);
    let result = run_app(&mut terminal, &mut app, &rt);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

/// The terminal belongs to the UI, so logs go to a file.
fn init_logging(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .init();
    Ok(())
}

#[derive(Debug, Parser)]
#[command(author, version, about = "Terminal UI for the formchat assistant")]
struct Cli {
    #[command(flatten)]
    common: CommonOpts,

    /// Route to open: `/`, `/{chat-id}` or `/forms/{form-id}/history`
    #[arg(value_name = "ROUTE")]
    route: Option<String>,
}

#[derive(Debug, Clone, Args)]
struct CommonOpts {
    /// Override the config file path
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Override the backend URL
    #[arg(long, value_name = "URL", env = "FORMCHAT_API_URL")]
    api_url: Option<String>,
}

// =============================================================================
// App Mode (Modal System)
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum AppMode {
    Normal,
    Input,
    EditForm,
    ConfirmDelete,
    Notice,
    Help { scroll: usize },
}

impl AppMode {
    fn name(&self) -> &'static str {
        match self {
            AppMode::Normal => "NORMAL",
            AppMode::Input => "INPUT",
            AppMode::EditForm => "EDIT",
            AppMode::ConfirmDelete => "DELETE",
            AppMode::Notice => "NOTICE",
            AppMode::Help { .. } => "HELP",
        }
    }

    fn color(&self) -> Color {
        match self {
            AppMode::Normal => Color::Green,
            AppMode::Input => Color::Blue,
            AppMode::EditForm => Color::Magenta,
            AppMode::ConfirmDelete => Color::Red,
            AppMode::Notice | AppMode::Help { .. } => Color::Yellow,
        }
    }
}

/// Field focused in the edit form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum EditField {
    #[default]
    Name,
    Email,
    PhoneNumber,
    Status,
}

impl EditField {
    fn all() -> &'static [EditField] {
        &[
            EditField::Name,
            EditField::Email,
            EditField::PhoneNumber,
            EditField::Status,
        ]
    }

    fn label(self) -> &'static str {
        match self {
            EditField::Name => "Name",
            EditField::Email => "Email",
            EditField::PhoneNumber => "Phone",
            EditField::Status => "Status",
        }
    }

    fn next(self) -> Self {
        let all = Self::all();
        let idx = all.iter().position(|&f| f == self).unwrap_or(0);
        all[(idx + 1) % all.len()]
    }

    fn previous(self) -> Self {
        let all = Self::all();
        let idx = all.iter().position(|&f| f == self).unwrap_or(0);
        all[idx.checked_sub(1).unwrap_or(all.len() - 1)]
    }

    /// Current text of a text field in the draft.
    fn text(self, draft: &FormUpdate) -> String {
        let value = match self {
            EditField::Name => &draft.name,
            EditField::Email => &draft.email,
            EditField::PhoneNumber => &draft.phone_number,
            EditField::Status => return String::new(),
        };
        value.clone().unwrap_or_default()
    }

    fn with_text(self, text: String) -> Option<DraftField> {
        match self {
            EditField::Name => Some(DraftField::Name(text)),
            EditField::Email => Some(DraftField::Email(text)),
            EditField::PhoneNumber => Some(DraftField::PhoneNumber(text)),
            EditField::Status => None,
        }
    }
}

// =============================================================================
// App State
// =============================================================================

enum View {
    ChatList(ChatList),
    ChatDetail(ChatDetail),
    History(FormHistory),
}

/// A message exchange running on the runtime while the UI keeps drawing.
struct PendingSend {
    chat_id: String,
    reply: oneshot::Receiver<formchat_core::Result<Vec<Message>>>,
}

struct App {
    api: ApiClient,
    pending_send: Option<PendingSend>,
    route: Route,
    back: Vec<Route>,
    view: View,
    mode: AppMode,
    status_message: String,
    form_selection: usize,
    edit_field: EditField,
    /// Lines scrolled up from the bottom of the transcript.
    transcript_scroll: usize,
    history_scroll: usize,
    refresh_interval: Option<Duration>,
    last_refresh: Instant,
}

impl App {
    fn new(api: ApiClient, refresh_interval: Option<Duration>) -> Self {
        Self {
            api,
            pending_send: None,
            route: Route::ChatList,
            back: Vec::new(),
            view: View::ChatList(ChatList::new()),
            mode: AppMode::Normal,
            status_message: String::new(),
            form_selection: 0,
            edit_field: EditField::default(),
            transcript_scroll: 0,
            history_scroll: 0,
            refresh_interval,
            last_refresh: Instant::now(),
        }
    }

    /// Replace the current view with a freshly loaded one for `route`.
    fn open(&mut self, route: Route, rt: &tokio::runtime::Runtime) {
        self.view = match &route {
            Route::ChatList => {
                let mut list = ChatList::new();
                rt.block_on(list.load(&self.api));
                View::ChatList(list)
            }
            Route::Chat(chat_id) => {
                let mut detail = ChatDetail::new(chat_id.clone());
                rt.block_on(detail.load(&self.api));
                View::ChatDetail(detail)
            }
            Route::FormHistory(form_id) => {
                let mut history = FormHistory::new(form_id.clone());
                rt.block_on(history.load(&self.api));
                View::History(history)
            }
        };
        self.status_message = format!("Opened {route}");
        self.route = route;
        self.mode = AppMode::Normal;
        self.form_selection = 0;
        self.transcript_scroll = 0;
        self.history_scroll = 0;
        self.last_refresh = Instant::now();
    }

    fn navigate(&mut self, route: Route, rt: &tokio::runtime::Runtime) {
        let previous = std::mem::replace(&mut self.route, Route::ChatList);
        self.back.push(previous);
        self.open(route, rt);
    }

    fn go_back(&mut self, rt: &tokio::runtime::Runtime) {
        if let Some(route) = self.back.pop() {
            self.open(route, rt);
        } else if self.route != Route::ChatList {
            self.open(Route::ChatList, rt);
        }
    }

    fn refresh(&mut self, rt: &tokio::runtime::Runtime) {
        match &mut self.view {
            View::ChatList(list) => rt.block_on(list.load(&self.api)),
            View::ChatDetail(detail) => rt.block_on(detail.load(&self.api)),
            View::History(history) => rt.block_on(history.load(&self.api)),
        }
        self.clamp_form_selection();
        self.last_refresh = Instant::now();
    }

    /// Reload the forms list if a mutation asked for it.
    fn revalidate(&mut self, rt: &tokio::runtime::Runtime) {
        if let View::ChatDetail(detail) = &mut self.view
            && rt.block_on(detail.revalidate(&self.api))
        {
            self.clamp_form_selection();
        }
    }

    /// Periodic refresh, skipped while the user is typing or confirming and
    /// while a message is awaiting its reply.
    fn tick(&mut self, rt: &tokio::runtime::Runtime) {
        let Some(interval) = self.refresh_interval else {
            return;
        };
        if self.mode == AppMode::Normal
            && self.pending_send.is_none()
            && self.last_refresh.elapsed() >= interval
        {
            self.refresh(rt);
        }
    }

    /// Stage the input as an optimistic user message and send the transcript
    /// in the background. The reply is applied by `poll_send`.
    fn start_send(&mut self, rt: &tokio::runtime::Runtime) {
        if self.pending_send.is_some() {
            self.status_message = "Still waiting for the assistant's reply".to_string();
            return;
        }
        let View::ChatDetail(detail) = &mut self.view else {
            return;
        };
        let messages = match detail.stage_message() {
            Ok(Some(messages)) => messages,
            Ok(None) => return,
            Err(err) => {
                self.status_message = err.to_string();
                return;
            }
        };

        let chat_id = detail.chat_id().to_string();
        let (tx, rx) = oneshot::channel();
        let api = self.api.clone();
        let target = chat_id.clone();
        rt.spawn(async move {
            let reply = api.send_messages(&target, &messages).await;
            // the receiver is gone if the app quit first
            let _ = tx.send(reply);
        });

        self.pending_send = Some(PendingSend { chat_id, reply: rx });
        self.transcript_scroll = 0;
        self.status_message = "Sending...".to_string();
    }

    /// Apply a finished message exchange. Returns true when a reply was
    /// consumed. Replies for a chat that is no longer open are dropped.
    fn poll_send(&mut self) -> bool {
        let Some(pending) = self.pending_send.as_mut() else {
            return false;
        };
        let reply = match pending.reply.try_recv() {
            Ok(reply) => reply,
            Err(TryRecvError::Empty) => return false,
            Err(TryRecvError::Closed) => Err(Error::Other(
                "message request ended without a reply".to_string(),
            )),
        };
        let Some(PendingSend { chat_id, .. }) = self.pending_send.take() else {
            return false;
        };

        match &mut self.view {
            View::ChatDetail(detail) if detail.chat_id() == chat_id => {
                match detail.apply_reply(reply) {
                    SendOutcome::Skipped => {}
                    SendOutcome::Sent => {
                        self.transcript_scroll = 0;
                        self.status_message = "Message sent".to_string();
                    }
                    SendOutcome::Failed(_) => {
                        self.status_message = detail.status().unwrap_or_default().to_string();
                    }
                }
            }
            _ => debug!(%chat_id, "dropping reply for a chat that is no longer open"),
        }
        true
    }

    fn clamp_form_selection(&mut self) {
        if let View::ChatDetail(detail) = &self.view {
            self.form_selection = self
                .form_selection
                .min(detail.forms().len().saturating_sub(1));
        }
    }

    fn detail_mut(&mut self) -> Option<&mut ChatDetail> {
        match &mut self.view {
            View::ChatDetail(detail) => Some(detail),
            _ => None,
        }
    }

    fn selected_form_id(&self) -> Option<String> {
        match &self.view {
            View::ChatDetail(detail) => detail
                .forms()
                .get(self.form_selection)
                .map(|form| form.id.clone()),
            _ => None,
        }
    }

    /// Mode to return to once a notice is dismissed.
    fn resume_mode(&self) -> AppMode {
        match &self.view {
            View::ChatDetail(detail) if detail.editing().is_some() => AppMode::EditForm,
            _ => AppMode::Normal,
        }
    }

    fn after_mutation(&mut self) {
        let has_notice = match &self.view {
            View::ChatDetail(detail) => detail.notice().is_some(),
            _ => false,
        };
        self.mode = if has_notice {
            AppMode::Notice
        } else {
            self.resume_mode()
        };
    }
}

// =============================================================================
// Key Action
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyAction {
    Quit,
    Up,
    Down,
    Left,
    Right,
    PageDown,
    PageUp,
    Select,
    Escape,
    Backspace,
    Tab,
    BackTab,
    Char(char),
    Noop,
}

fn parse_key(key: &event::KeyEvent) -> KeyAction {
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => KeyAction::Quit,
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => KeyAction::PageDown,
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => KeyAction::PageUp,
        KeyCode::Up => KeyAction::Up,
        KeyCode::Down => KeyAction::Down,
        KeyCode::Left => KeyAction::Left,
        KeyCode::Right => KeyAction::Right,
        KeyCode::PageDown => KeyAction::PageDown,
        KeyCode::PageUp => KeyAction::PageUp,
        KeyCode::Enter => KeyAction::Select,
        KeyCode::Esc => KeyAction::Escape,
        KeyCode::Backspace => KeyAction::Backspace,
        KeyCode::Tab => KeyAction::Tab,
        KeyCode::BackTab => KeyAction::BackTab,
        KeyCode::Char(c) => KeyAction::Char(c),
        _ => KeyAction::Noop,
    }
}

// =============================================================================
// Event Loop
// =============================================================================

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    rt: &tokio::runtime::Runtime,
) -> Result<()> {
    loop {
        if app.poll_send() {
            app.revalidate(rt);
        }
        terminal.draw(|f| ui::ui(f, app))?;

        if event::poll(Duration::from_millis(100))?
            && let Event::Key(key) = event::read()?
        {
            if key.kind != KeyEventKind::Press {
                continue;
            }

            let action = parse_key(&key);
            if action == KeyAction::Quit {
                return Ok(());
            }

            let quit = match app.mode {
                AppMode::Normal => handle_normal_mode(app, action, rt),
                AppMode::Input => {
                    handle_input_mode(app, action, rt);
                    false
                }
                AppMode::EditForm => {
                    handle_edit_mode(app, action, rt);
                    false
                }
                AppMode::ConfirmDelete => {
                    handle_delete_mode(app, action, rt);
                    false
                }
                AppMode::Notice => {
                    handle_notice_mode(app, action);
                    false
                }
                AppMode::Help { .. } => {
                    handle_help_mode(app, action);
                    false
                }
            };
            if quit {
                return Ok(());
            }

            app.revalidate(rt);
        } else {
            app.tick(rt);
        }
    }
}

fn handle_normal_mode(app: &mut App, action: KeyAction, rt: &tokio::runtime::Runtime) -> bool {
    match action {
        KeyAction::Char('q') => return true,
        KeyAction::Char('?') => app.mode = AppMode::Help { scroll: 0 },
        KeyAction::Char('r') => {
            app.refresh(rt);
            app.status_message = "Refreshed".to_string();
        }
        KeyAction::Escape | KeyAction::Backspace | KeyAction::Char('b') => app.go_back(rt),
        _ => match app.view {
            View::ChatList(_) => handle_chat_list_keys(app, action, rt),
            View::ChatDetail(_) => handle_chat_detail_keys(app, action, rt),
            View::History(_) => handle_history_keys(app, action),
        },
    }
    false
}

fn handle_chat_list_keys(app: &mut App, action: KeyAction, rt: &tokio::runtime::Runtime) {
    let View::ChatList(list) = &mut app.view else {
        return;
    };
    match action {
        KeyAction::Char('j') | KeyAction::Down => list.select_next(),
        KeyAction::Char('k') | KeyAction::Up => list.select_previous(),
        KeyAction::Select | KeyAction::Char('l') => {
            if let Some(route) = list.selected_route() {
                app.navigate(route, rt);
            }
        }
        KeyAction::Char('n') => match rt.block_on(list.create_chat(&app.api)) {
            Some(route) => app.navigate(route, rt),
            None => {
                app.status_message = list.status().unwrap_or_default().to_string();
            }
        },
        _ => {}
    }
}

fn handle_chat_detail_keys(app: &mut App, action: KeyAction, rt: &tokio::runtime::Runtime) {
    match action {
        KeyAction::Char('i') | KeyAction::Select => app.mode = AppMode::Input,
        KeyAction::Char('j') | KeyAction::Down => {
            app.form_selection += 1;
            app.clamp_form_selection();
        }
        KeyAction::Char('k') | KeyAction::Up => {
            app.form_selection = app.form_selection.saturating_sub(1);
        }
        KeyAction::PageUp | KeyAction::Char('K') => app.transcript_scroll += 10,
        KeyAction::PageDown | KeyAction::Char('J') => {
            app.transcript_scroll = app.transcript_scroll.saturating_sub(10);
        }
        KeyAction::Char('e') => {
            let Some(form_id) = app.selected_form_id() else {
                return;
            };
            if let Some(detail) = app.detail_mut()
                && detail.begin_edit(&form_id)
            {
                app.edit_field = EditField::default();
                app.mode = AppMode::EditForm;
            }
        }
        KeyAction::Char('d') => {
            let Some(form_id) = app.selected_form_id() else {
                return;
            };
            if let Some(detail) = app.detail_mut() {
                detail.request_delete(&form_id);
                app.mode = AppMode::ConfirmDelete;
            }
        }
        KeyAction::Char('h') => {
            if let Some(form_id) = app.selected_form_id() {
                app.navigate(Route::form_history(form_id), rt);
            }
        }
        KeyAction::Char('f') => {
            if let Some(detail) = app.detail_mut() {
                let filter = FormStatus::cycle(detail.status_filter());
                detail.set_status_filter(filter);
                app.form_selection = 0;
                app.status_message = format!("Filter: {}", filter_label(filter));
            }
        }
        _ => {}
    }
}

fn handle_history_keys(app: &mut App, action: KeyAction) {
    match action {
        KeyAction::Char('j') | KeyAction::Down => app.history_scroll += 1,
        KeyAction::Char('k') | KeyAction::Up => {
            app.history_scroll = app.history_scroll.saturating_sub(1);
        }
        KeyAction::PageDown => app.history_scroll += 10,
        KeyAction::PageUp => app.history_scroll = app.history_scroll.saturating_sub(10),
        _ => {}
    }
}

fn handle_input_mode(app: &mut App, action: KeyAction, rt: &tokio::runtime::Runtime) {
    let View::ChatDetail(detail) = &mut app.view else {
        app.mode = AppMode::Normal;
        return;
    };
    match action {
        KeyAction::Escape => app.mode = AppMode::Normal,
        KeyAction::Char(c) => detail.input_mut().push(c),
        KeyAction::Backspace => {
            detail.input_mut().pop();
        }
        KeyAction::Select => app.start_send(rt),
        _ => {}
    }
}

fn handle_edit_mode(app: &mut App, action: KeyAction, rt: &tokio::runtime::Runtime) {
    let field = app.edit_field;
    let View::ChatDetail(detail) = &mut app.view else {
        app.mode = AppMode::Normal;
        return;
    };
    let Some(editing) = detail.editing() else {
        app.mode = AppMode::Normal;
        return;
    };
    let current = field.text(&editing.draft);
    let status = editing
        .draft
        .status
        .and_then(|code| FormStatus::try_from(code).ok());

    match action {
        KeyAction::Escape => {
            detail.cancel_edit();
            app.mode = AppMode::Normal;
            app.status_message = "Edit cancelled".to_string();
        }
        KeyAction::Select => {
            rt.block_on(detail.save_edit(&app.api));
            app.after_mutation();
        }
        KeyAction::Tab | KeyAction::Down => app.edit_field = field.next(),
        KeyAction::BackTab | KeyAction::Up => app.edit_field = field.previous(),
        KeyAction::Left | KeyAction::Right | KeyAction::Char(' ')
            if field == EditField::Status =>
        {
            detail.update_draft(DraftField::Status(FormStatus::cycle(status)));
        }
        KeyAction::Char(c) if field == EditField::Status => {
            let choice = match c {
                '0' => Some(None),
                '1' => Some(Some(FormStatus::Todo)),
                '2' => Some(Some(FormStatus::InProgress)),
                '3' => Some(Some(FormStatus::Completed)),
                _ => None,
            };
            if let Some(choice) = choice {
                detail.update_draft(DraftField::Status(choice));
            }
        }
        KeyAction::Char(c) => {
            let mut text = current;
            text.push(c);
            if let Some(change) = field.with_text(text) {
                detail.update_draft(change);
            }
        }
        KeyAction::Backspace => {
            let mut text = current;
            text.pop();
            if let Some(change) = field.with_text(text) {
                detail.update_draft(change);
            }
        }
        _ => {}
    }
}

fn handle_delete_mode(app: &mut App, action: KeyAction, rt: &tokio::runtime::Runtime) {
    let View::ChatDetail(detail) = &mut app.view else {
        app.mode = AppMode::Normal;
        return;
    };
    match action {
        KeyAction::Escape | KeyAction::Char('n') => {
            detail.decline_delete();
            app.mode = AppMode::Normal;
        }
        KeyAction::Char('y') => {
            rt.block_on(detail.confirm_delete(&app.api));
            app.after_mutation();
        }
        _ => {}
    }
}

fn handle_notice_mode(app: &mut App, action: KeyAction) {
    if matches!(
        action,
        KeyAction::Select | KeyAction::Escape | KeyAction::Char(' ' | 'q')
    ) {
        if let Some(detail) = app.detail_mut() {
            detail.dismiss_notice();
        }
        app.mode = app.resume_mode();
    }
}

fn handle_help_mode(app: &mut App, action: KeyAction) {
    if let AppMode::Help { ref mut scroll } = app.mode {
        match action {
            KeyAction::Escape | KeyAction::Char('q' | '?') => app.mode = AppMode::Normal,
            KeyAction::Down | KeyAction::Char('j') => *scroll += 1,
            KeyAction::Up | KeyAction::Char('k') => *scroll = scroll.saturating_sub(1),
            KeyAction::PageDown => *scroll += 10,
            KeyAction::PageUp => *scroll = scroll.saturating_sub(10),
            _ => {}
        }
    }
}

fn filter_label(filter: Option<FormStatus>) -> &'static str {
    filter.map_or("All", FormStatus::label)
}
