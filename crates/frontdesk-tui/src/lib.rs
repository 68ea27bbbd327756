// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use frontdesk_app::{
    ActiveToggle, AppCommand, AppEvent, AppMode, AppState, BookingEntry, BookingReceipt,
    DashboardSummary, Employee, EmployeeActivation, EmployeeCredentials, EmployeeId,
    FieldChoices, FormField, FormKind, FormPayload, IdType, LoginInput, PageCompletion,
    PageOutcome, PageRequest, PageState, Room, RoomStateFilter, ScreenKind, ToggleResult,
    active_label, apply_active_toggle, blank_values, form_fields, is_session_expired,
    resync_after_create,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Tabs};
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

const BOOKING_HEADERS: &[&str] = &[
    "booking", "guest", "check-in", "check-out", "room", "status", "id",
];
const EMPLOYEE_HEADERS: &[&str] = &["id", "name", "email", "phone", "active"];
const ROOM_HEADERS: &[&str] = &["room", "type", "state"];

/// One list read, tagged with the request it answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLoad {
    Bookings(PageRequest),
    Employees(PageRequest),
    Rooms {
        request: PageRequest,
        filter: RoomStateFilter,
    },
}

impl PageLoad {
    pub const fn request(&self) -> PageRequest {
        match self {
            Self::Bookings(request) | Self::Employees(request) => *request,
            Self::Rooms { request, .. } => *request,
        }
    }

    pub const fn label(&self) -> &'static str {
        match self {
            Self::Bookings(_) => "bookings",
            Self::Employees(_) => "employees",
            Self::Rooms { .. } => "rooms",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageResult {
    Bookings(PageOutcome<BookingEntry>),
    Employees(PageOutcome<Employee>),
    Rooms(PageOutcome<Room>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    EmployeeCreated(EmployeeCredentials),
    RoomCreated(Room),
    BookingCreated(BookingReceipt),
}

/// Everything the UI needs from the outside world. Errors that wrap
/// [`frontdesk_app::SessionExpired`] send the UI back to the sign-in form.
pub trait AppRuntime {
    /// Username of a still-valid stored session, if any.
    fn restore_session(&mut self) -> Result<Option<String>>;
    fn login(&mut self, username: &str, password: &str) -> Result<String>;
    fn logout(&mut self) -> Result<()>;
    fn load_page(&mut self, load: PageLoad) -> Result<PageResult>;
    fn spawn_page_load(&mut self, load: PageLoad, tx: Sender<InternalEvent>) -> Result<()> {
        let event = match self.load_page(load) {
            Ok(result) => InternalEvent::PageLoaded { load, result },
            Err(error) => InternalEvent::PageFailed {
                load,
                session_expired: is_session_expired(&error),
                error: error.to_string(),
            },
        };
        tx.send(event)
            .map_err(|_| anyhow::anyhow!("page event channel closed"))?;
        Ok(())
    }
    fn submit_form(&mut self, payload: &FormPayload) -> Result<SubmitOutcome>;
    fn set_employee_active(
        &mut self,
        emp_id: EmployeeId,
        is_active: bool,
    ) -> Result<EmployeeActivation>;
    fn load_id_types(&mut self) -> Result<Vec<IdType>>;
    fn load_available_rooms(&mut self) -> Result<Vec<Room>>;
    fn save_room_filter(&mut self, filter: RoomStateFilter) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalEvent {
    ClearStatus {
        token: u64,
    },
    PageLoaded {
        load: PageLoad,
        result: PageResult,
    },
    PageFailed {
        load: PageLoad,
        error: String,
        session_expired: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct FormUiState {
    kind: FormKind,
    values: Vec<String>,
    field_index: usize,
    error: Option<String>,
}

impl FormUiState {
    fn new(kind: FormKind) -> Self {
        Self {
            kind,
            values: blank_values(kind),
            field_index: 0,
            error: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct Cursors {
    bookings: usize,
    employees: usize,
    rooms: usize,
    available: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ViewData {
    bookings: PageState<BookingEntry>,
    employees: PageState<Employee>,
    rooms: PageState<Room>,
    cursors: Cursors,
    available_rooms: Vec<Room>,
    id_types: Vec<IdType>,
    form: Option<FormUiState>,
    notice: Option<String>,
    status_token: u64,
}

impl ViewData {
    fn new(page_size: usize) -> Result<Self> {
        Ok(Self {
            bookings: PageState::new(page_size)?,
            employees: PageState::new(page_size)?,
            rooms: PageState::new(page_size)?,
            cursors: Cursors::default(),
            available_rooms: Vec::new(),
            id_types: Vec::new(),
            form: None,
            notice: None,
            status_token: 0,
        })
    }

    fn clear_session_data(&mut self) {
        self.bookings.clear();
        self.employees.clear();
        self.rooms.clear();
        self.cursors = Cursors::default();
        self.available_rooms.clear();
        self.id_types.clear();
        self.notice = None;
    }

    fn summary(&self) -> DashboardSummary {
        DashboardSummary {
            bookings_on_page: self.bookings.items().len(),
            rooms_available: self.available_rooms.len(),
        }
    }
}

pub fn run_app<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    page_size: usize,
) -> Result<()> {
    let mut view_data = ViewData::new(page_size)?;
    let (internal_tx, internal_rx) = mpsc::channel();

    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    start_session(state, runtime, &mut view_data, &internal_tx);

    let mut result = Ok(());
    loop {
        process_internal_events(state, runtime, &mut view_data, &internal_tx, &internal_rx);

        if let Err(error) = terminal.draw(|frame| render(frame, state, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = match event::poll(Duration::from_millis(120)).context("poll event") {
            Ok(has_event) => has_event,
            Err(error) => {
                result = Err(error);
                break;
            }
        };
        if has_event {
            match event::read().context("read event") {
                Ok(Event::Key(key)) => {
                    if handle_key_event(state, runtime, &mut view_data, &internal_tx, key) {
                        break;
                    }
                }
                Ok(_) => {}
                Err(error) => {
                    result = Err(error);
                    break;
                }
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn start_session<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
) {
    match runtime.restore_session() {
        Ok(Some(username)) => {
            state.dispatch(AppCommand::SignedIn(username));
            enter_screen(state, runtime, view_data, tx);
        }
        Ok(None) => {
            view_data.form = Some(FormUiState::new(FormKind::Login));
        }
        Err(error) => {
            view_data.form = Some(FormUiState::new(FormKind::Login));
            emit_status(state, view_data, tx, format!("stored session unusable: {error}"));
        }
    }
}

fn process_internal_events<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                state.dispatch(AppCommand::ClearStatus);
            }
            InternalEvent::ClearStatus { .. } => {}
            InternalEvent::PageLoaded { load, result } => {
                let completion = apply_page_result(state, view_data, load, result);
                report_completion(state, view_data, tx, load, completion);
            }
            InternalEvent::PageFailed {
                load,
                session_expired: true,
                ..
            } => {
                if load.request().generation == current_generation(view_data, load) {
                    handle_session_expired(state, runtime, view_data);
                }
            }
            InternalEvent::PageFailed { load, error, .. } => {
                let completion = complete_failed(view_data, load, error);
                report_completion(state, view_data, tx, load, completion);
            }
        }
    }
}

fn current_generation(view_data: &ViewData, load: PageLoad) -> u64 {
    match load {
        PageLoad::Bookings(_) => view_data.bookings.generation(),
        PageLoad::Employees(_) => view_data.employees.generation(),
        PageLoad::Rooms { .. } => view_data.rooms.generation(),
    }
}

fn apply_page_result(
    state: &AppState,
    view_data: &mut ViewData,
    load: PageLoad,
    result: PageResult,
) -> PageCompletion {
    let completion = match (load, result) {
        (PageLoad::Bookings(request), PageResult::Bookings(outcome)) => {
            view_data.bookings.complete(request, outcome)
        }
        (PageLoad::Employees(request), PageResult::Employees(outcome)) => {
            view_data.employees.complete(request, outcome)
        }
        (PageLoad::Rooms { request, filter }, PageResult::Rooms(outcome)) => {
            if filter != state.room_filter {
                PageCompletion::Stale
            } else {
                view_data.rooms.complete(request, outcome)
            }
        }
        (load, _) => {
            tracing::warn!(screen = load.label(), "page result does not match its request");
            complete_failed(view_data, load, "unexpected response shape".to_owned())
        }
    };
    if completion == PageCompletion::Applied {
        match load {
            PageLoad::Bookings(_) => view_data.cursors.bookings = 0,
            PageLoad::Employees(_) => view_data.cursors.employees = 0,
            PageLoad::Rooms { .. } => view_data.cursors.rooms = 0,
        }
    }
    completion
}

fn complete_failed(view_data: &mut ViewData, load: PageLoad, error: String) -> PageCompletion {
    match load {
        PageLoad::Bookings(request) => view_data
            .bookings
            .complete(request, PageOutcome::Failed(error)),
        PageLoad::Employees(request) => view_data
            .employees
            .complete(request, PageOutcome::Failed(error)),
        PageLoad::Rooms { request, .. } => {
            view_data.rooms.complete(request, PageOutcome::Failed(error))
        }
    }
}

fn report_completion(
    state: &mut AppState,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    load: PageLoad,
    completion: PageCompletion,
) {
    let request = load.request();
    match completion {
        PageCompletion::Applied => {
            tracing::debug!(
                screen = load.label(),
                offset = request.offset,
                generation = request.generation,
                "page applied"
            );
        }
        PageCompletion::EndReached => {
            emit_status(state, view_data, tx, format!("no more {}", load.label()));
        }
        PageCompletion::Failed => {
            let error = match load {
                PageLoad::Bookings(_) => view_data.bookings.error(),
                PageLoad::Employees(_) => view_data.employees.error(),
                PageLoad::Rooms { .. } => view_data.rooms.error(),
            }
            .unwrap_or("unknown error")
            .to_owned();
            emit_status(
                state,
                view_data,
                tx,
                format!("{} load failed: {error}", load.label()),
            );
        }
        PageCompletion::Stale => {
            tracing::debug!(
                screen = load.label(),
                generation = request.generation,
                "stale page completion dropped"
            );
        }
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_secs(4));
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn emit_status(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    state.dispatch(AppCommand::SetStatus(message.into()));
    view_data.status_token = view_data.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, view_data.status_token);
}

fn report_failure<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    action: &str,
    error: anyhow::Error,
) {
    if is_session_expired(&error) {
        handle_session_expired(state, runtime, view_data);
        return;
    }
    emit_status(state, view_data, tx, format!("{action} failed: {error}"));
}

fn handle_session_expired<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
) {
    tracing::info!("backend rejected the session; returning to sign-in");
    if let Err(error) = runtime.logout() {
        tracing::warn!(error = %error, "clear stored session");
    }
    view_data.clear_session_data();
    view_data.form = Some(FormUiState::new(FormKind::Login));
    state.dispatch(AppCommand::SessionRejected);
}

fn spawn_load<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    load: PageLoad,
) {
    let request = load.request();
    tracing::debug!(
        screen = load.label(),
        offset = request.offset,
        limit = request.limit,
        generation = request.generation,
        "page load started"
    );
    if let Err(error) = runtime.spawn_page_load(load, tx.clone()) {
        complete_failed(view_data, load, error.to_string());
        emit_status(
            state,
            view_data,
            tx,
            format!("{} load failed: {error}", load.label()),
        );
    }
}

/// Refreshes whatever the active screen shows.
fn enter_screen<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
) {
    let load = match state.active_screen {
        ScreenKind::Dashboard => {
            refresh_available_rooms(state, runtime, view_data, tx);
            if !state.is_signed_in() {
                return;
            }
            Some(PageLoad::Bookings(view_data.bookings.reload()))
        }
        ScreenKind::Booking => {
            refresh_id_types(state, runtime, view_data, tx);
            if state.is_signed_in() {
                refresh_available_rooms(state, runtime, view_data, tx);
            }
            None
        }
        ScreenKind::Employees => Some(PageLoad::Employees(view_data.employees.reload())),
        ScreenKind::Rooms => Some(PageLoad::Rooms {
            request: view_data.rooms.reload(),
            filter: state.room_filter,
        }),
    };
    if let Some(load) = load {
        spawn_load(state, runtime, view_data, tx, load);
    }
}

fn refresh_available_rooms<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
) {
    match runtime.load_available_rooms() {
        Ok(rooms) => {
            view_data.cursors.available = view_data
                .cursors
                .available
                .min(rooms.len().saturating_sub(1));
            view_data.available_rooms = rooms;
        }
        Err(error) => report_failure(state, runtime, view_data, tx, "available rooms", error),
    }
}

fn refresh_id_types<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
) {
    match runtime.load_id_types() {
        Ok(id_types) => view_data.id_types = id_types,
        Err(error) => report_failure(state, runtime, view_data, tx, "id types", error),
    }
}

fn handle_key_event<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.modifiers.contains(KeyModifiers::CONTROL)
        && matches!(key.code, KeyCode::Char('q') | KeyCode::Char('c'))
    {
        return true;
    }

    if view_data.notice.is_some() {
        view_data.notice = None;
        return false;
    }

    match state.mode {
        AppMode::Login | AppMode::Form(_) => {
            handle_form_key(state, runtime, view_data, internal_tx, key);
            false
        }
        AppMode::Nav => handle_nav_key(state, runtime, view_data, internal_tx, key),
    }
}

fn handle_nav_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Tab => change_screen(state, runtime, view_data, tx, AppCommand::NextScreen),
        KeyCode::BackTab => change_screen(state, runtime, view_data, tx, AppCommand::PrevScreen),
        KeyCode::Char(digit @ '1'..='4') => {
            let screen = ScreenKind::ALL[digit as usize - '1' as usize];
            change_screen(state, runtime, view_data, tx, AppCommand::GoTo(screen));
        }
        KeyCode::Char('n') | KeyCode::Right => step_page(state, runtime, view_data, tx, true),
        KeyCode::Char('p') | KeyCode::Left => step_page(state, runtime, view_data, tx, false),
        KeyCode::Char('r') => enter_screen(state, runtime, view_data, tx),
        KeyCode::Char('j') | KeyCode::Down => move_cursor(state, view_data, 1),
        KeyCode::Char('k') | KeyCode::Up => move_cursor(state, view_data, -1),
        KeyCode::Char(' ') if state.active_screen == ScreenKind::Employees => {
            toggle_selected_employee(state, runtime, view_data, tx);
        }
        KeyCode::Char('f') if state.active_screen == ScreenKind::Rooms => {
            cycle_room_filter(state, runtime, view_data, tx);
        }
        KeyCode::Char('a') => {
            let kind = match state.active_screen {
                ScreenKind::Dashboard | ScreenKind::Booking => FormKind::Booking,
                ScreenKind::Employees => FormKind::Employee,
                ScreenKind::Rooms => FormKind::Room,
            };
            open_form(state, runtime, view_data, tx, kind);
        }
        KeyCode::Char('L') => sign_out(state, runtime, view_data, tx),
        _ => {}
    }
    false
}

fn change_screen<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    command: AppCommand,
) {
    let events = state.dispatch(command);
    if events
        .iter()
        .any(|event| matches!(event, AppEvent::ScreenChanged(_)))
    {
        enter_screen(state, runtime, view_data, tx);
    }
}

fn step_page<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    forward: bool,
) {
    let load = match (state.active_screen, forward) {
        (ScreenKind::Dashboard, true) => view_data.bookings.next().map(PageLoad::Bookings),
        (ScreenKind::Dashboard, false) => view_data.bookings.previous().map(PageLoad::Bookings),
        (ScreenKind::Employees, true) => view_data.employees.next().map(PageLoad::Employees),
        (ScreenKind::Employees, false) => {
            view_data.employees.previous().map(PageLoad::Employees)
        }
        (ScreenKind::Rooms, true) => view_data.rooms.next().map(|request| PageLoad::Rooms {
            request,
            filter: state.room_filter,
        }),
        (ScreenKind::Rooms, false) => view_data.rooms.previous().map(|request| PageLoad::Rooms {
            request,
            filter: state.room_filter,
        }),
        (ScreenKind::Booking, _) => return,
    };
    match load {
        Some(load) => spawn_load(state, runtime, view_data, tx, load),
        None if forward => emit_status(state, view_data, tx, "no next page"),
        None => emit_status(state, view_data, tx, "already on the first page"),
    }
}

fn move_cursor(state: &AppState, view_data: &mut ViewData, delta: isize) {
    let (cursor, len) = match state.active_screen {
        ScreenKind::Dashboard => (
            &mut view_data.cursors.bookings,
            view_data.bookings.items().len(),
        ),
        ScreenKind::Booking => (
            &mut view_data.cursors.available,
            view_data.available_rooms.len(),
        ),
        ScreenKind::Employees => (
            &mut view_data.cursors.employees,
            view_data.employees.items().len(),
        ),
        ScreenKind::Rooms => (&mut view_data.cursors.rooms, view_data.rooms.items().len()),
    };
    if len == 0 {
        *cursor = 0;
        return;
    }
    let next = (*cursor as isize + delta).clamp(0, len as isize - 1);
    *cursor = next as usize;
}

fn toggle_selected_employee<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
) {
    let Some(employee) = view_data.employees.items().get(view_data.cursors.employees) else {
        emit_status(state, view_data, tx, "no employee selected");
        return;
    };
    let toggle = ActiveToggle::flip(employee);

    match runtime.set_employee_active(toggle.emp_id, toggle.requested) {
        Ok(echo) => {
            let message = match apply_active_toggle(&mut view_data.employees, toggle, &echo) {
                Ok(ToggleResult::Patched) => format!(
                    "employee {} is now {}",
                    toggle.emp_id,
                    active_label(toggle.requested)
                ),
                Ok(ToggleResult::NotDisplayed) => format!(
                    "employee {} set {}; it is no longer on this page",
                    toggle.emp_id,
                    active_label(toggle.requested)
                ),
                Err(error) => error.to_string(),
            };
            emit_status(state, view_data, tx, message);
        }
        Err(error) => report_failure(state, runtime, view_data, tx, "toggle", error),
    }
}

fn cycle_room_filter<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
) {
    state.dispatch(AppCommand::CycleRoomFilter);
    if let Err(error) = runtime.save_room_filter(state.room_filter) {
        tracing::warn!(error = %error, "save room filter");
    }
    view_data.cursors.rooms = 0;
    let request = view_data.rooms.reset();
    let filter = state.room_filter;
    spawn_load(
        state,
        runtime,
        view_data,
        tx,
        PageLoad::Rooms { request, filter },
    );
}

fn sign_out<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
) {
    if let Err(error) = runtime.logout() {
        emit_status(state, view_data, tx, format!("sign out failed: {error}"));
        return;
    }
    view_data.clear_session_data();
    view_data.form = Some(FormUiState::new(FormKind::Login));
    state.dispatch(AppCommand::SignedOut);
}

fn open_form<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    kind: FormKind,
) {
    if kind == FormKind::Booking {
        refresh_id_types(state, runtime, view_data, tx);
        if !state.is_signed_in() {
            return;
        }
        refresh_available_rooms(state, runtime, view_data, tx);
        if !state.is_signed_in() {
            return;
        }
    }

    let mut form = FormUiState::new(kind);
    for (index, field) in form_fields(kind).iter().enumerate() {
        if field.choices == FieldChoices::IdTypes
            && let Some(first) = view_data.id_types.first()
        {
            form.values[index] = first.name.clone();
        }
    }
    view_data.form = Some(form);
    state.dispatch(AppCommand::OpenForm(kind));
}

fn handle_form_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    if view_data.form.is_none() {
        match state.mode {
            AppMode::Form(kind) => view_data.form = Some(FormUiState::new(kind)),
            _ => view_data.form = Some(FormUiState::new(FormKind::Login)),
        }
    }

    match key.code {
        KeyCode::Esc => {
            if state.mode != AppMode::Login {
                view_data.form = None;
                state.dispatch(AppCommand::CloseForm);
            }
        }
        KeyCode::Enter => submit_active_form(state, runtime, view_data, tx),
        KeyCode::Up | KeyCode::BackTab => move_field(view_data, -1),
        KeyCode::Down | KeyCode::Tab => move_field(view_data, 1),
        KeyCode::Left => cycle_field_choice(view_data, -1),
        KeyCode::Right => cycle_field_choice(view_data, 1),
        KeyCode::Backspace => edit_field(view_data, |value| {
            value.pop();
        }),
        KeyCode::Char(ch) => edit_field(view_data, |value| value.push(ch)),
        _ => {}
    }
}

fn move_field(view_data: &mut ViewData, delta: isize) {
    let Some(form) = view_data.form.as_mut() else {
        return;
    };
    let len = form_fields(form.kind).len() as isize;
    form.field_index = (form.field_index as isize + delta).rem_euclid(len) as usize;
}

fn field_options(field: &FormField, view_data: &ViewData) -> Vec<String> {
    match field.choices {
        FieldChoices::FreeText => Vec::new(),
        FieldChoices::Fixed(options) => options.iter().map(|option| (*option).to_owned()).collect(),
        FieldChoices::IdTypes => view_data
            .id_types
            .iter()
            .map(|id_type| id_type.name.clone())
            .collect(),
        FieldChoices::AvailableRooms => std::iter::once(String::new())
            .chain(
                view_data
                    .available_rooms
                    .iter()
                    .map(|room| room.room_number.to_string()),
            )
            .collect(),
    }
}

fn cycle_choice(current: &str, options: &[String], delta: isize) -> Option<String> {
    if options.is_empty() {
        return None;
    }
    let len = options.len() as isize;
    let next = match options.iter().position(|option| option == current) {
        Some(index) => (index as isize + delta).rem_euclid(len),
        None if delta >= 0 => 0,
        None => len - 1,
    };
    Some(options[next as usize].clone())
}

fn cycle_field_choice(view_data: &mut ViewData, delta: isize) {
    let Some(form) = view_data.form.as_ref() else {
        return;
    };
    let field = form_fields(form.kind)[form.field_index];
    let options = field_options(&field, view_data);
    let Some(form) = view_data.form.as_mut() else {
        return;
    };
    if let Some(next) = cycle_choice(&form.values[form.field_index], &options, delta) {
        form.values[form.field_index] = next;
        form.error = None;
    }
}

fn edit_field(view_data: &mut ViewData, edit: impl FnOnce(&mut String)) {
    let Some(form) = view_data.form.as_mut() else {
        return;
    };
    let field = form_fields(form.kind)[form.field_index];
    if matches!(field.choices, FieldChoices::Fixed(_)) {
        return;
    }
    edit(&mut form.values[form.field_index]);
    form.error = None;
}

fn set_form_error(view_data: &mut ViewData, message: String) {
    if let Some(form) = view_data.form.as_mut() {
        form.error = Some(message);
    }
}

fn submit_active_form<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
) {
    let Some(form) = view_data.form.as_ref() else {
        return;
    };
    let payload = match FormPayload::from_values(form.kind, &form.values) {
        Ok(payload) => payload,
        Err(error) => {
            let message = error.to_string();
            set_form_error(view_data, message.clone());
            emit_status(state, view_data, tx, message);
            return;
        }
    };

    match payload {
        FormPayload::Login(login) => sign_in(state, runtime, view_data, tx, &login),
        payload => match runtime.submit_form(&payload) {
            Ok(outcome) => finish_submit(state, runtime, view_data, tx, outcome),
            Err(error) if is_session_expired(&error) => {
                handle_session_expired(state, runtime, view_data);
            }
            Err(error) => {
                let message = error.to_string();
                set_form_error(view_data, message.clone());
                emit_status(state, view_data, tx, message);
            }
        },
    }
}

fn sign_in<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    login: &LoginInput,
) {
    match runtime.login(&login.username, &login.password) {
        Ok(username) => {
            view_data.form = None;
            state.dispatch(AppCommand::SignedIn(username));
            enter_screen(state, runtime, view_data, tx);
        }
        Err(error) => {
            let detail = error.to_string();
            if let Some(form) = view_data.form.as_mut() {
                form.values[1].clear();
                form.field_index = 1;
                form.error = Some(detail.clone());
            }
            emit_status(state, view_data, tx, detail);
        }
    }
}

fn finish_submit<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    outcome: SubmitOutcome,
) {
    view_data.form = None;
    state.dispatch(AppCommand::CloseForm);

    match outcome {
        SubmitOutcome::EmployeeCreated(credentials) => {
            view_data.notice = Some(format!(
                "employee {} created\n\none-time password: {}\n\nshare it now; it is not shown again",
                credentials.emp_id, credentials.password
            ));
            view_data.cursors.employees = 0;
            let request = resync_after_create(&mut view_data.employees);
            spawn_load(state, runtime, view_data, tx, PageLoad::Employees(request));
            emit_status(
                state,
                view_data,
                tx,
                format!("employee {} created", credentials.emp_id),
            );
        }
        SubmitOutcome::RoomCreated(room) => {
            view_data.cursors.rooms = 0;
            let request = resync_after_create(&mut view_data.rooms);
            let filter = state.room_filter;
            spawn_load(
                state,
                runtime,
                view_data,
                tx,
                PageLoad::Rooms { request, filter },
            );
            emit_status(
                state,
                view_data,
                tx,
                format!("room {} created", room.room_number),
            );
        }
        SubmitOutcome::BookingCreated(receipt) => {
            view_data.cursors.bookings = 0;
            let request = resync_after_create(&mut view_data.bookings);
            state.dispatch(AppCommand::GoTo(ScreenKind::Dashboard));
            spawn_load(state, runtime, view_data, tx, PageLoad::Bookings(request));
            refresh_available_rooms(state, runtime, view_data, tx);
            let message = if receipt.msg.trim().is_empty() {
                format!("booking {} created", receipt.booking_id)
            } else {
                format!("{} ({})", receipt.msg.trim(), receipt.booking_id)
            };
            emit_status(state, view_data, tx, message);
        }
    }
}

fn render(frame: &mut ratatui::Frame<'_>, state: &AppState, view_data: &ViewData) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(2),
        ])
        .split(frame.area());

    let selected = ScreenKind::ALL
        .iter()
        .position(|screen| *screen == state.active_screen)
        .unwrap_or(0);
    let titles = ScreenKind::ALL
        .iter()
        .map(|screen| screen.label().to_owned())
        .collect::<Vec<String>>();
    let header = match &state.username {
        Some(username) => format!("frontdesk | {username}"),
        None => "frontdesk".to_owned(),
    };
    let tabs = Tabs::new(titles)
        .block(Block::default().title(header).borders(Borders::ALL))
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .select(selected);
    frame.render_widget(tabs, layout[0]);

    if state.is_signed_in() {
        match state.active_screen {
            ScreenKind::Dashboard => render_dashboard(frame, layout[1], view_data),
            ScreenKind::Booking => render_booking_screen(frame, layout[1], view_data),
            ScreenKind::Employees => render_table(
                frame,
                layout[1],
                page_title("employees", &view_data.employees, None),
                EMPLOYEE_HEADERS,
                view_data.employees.items().iter().map(employee_cells).collect(),
                view_data.cursors.employees,
            ),
            ScreenKind::Rooms => render_table(
                frame,
                layout[1],
                page_title(
                    "rooms",
                    &view_data.rooms,
                    Some(format!("filter {}", state.room_filter.as_str())),
                ),
                ROOM_HEADERS,
                view_data.rooms.items().iter().map(room_cells).collect(),
                view_data.cursors.rooms,
            ),
        }
    } else {
        let body = Paragraph::new("sign in with your employee email and password")
            .block(Block::default().borders(Borders::ALL).title("sign in"));
        frame.render_widget(body, layout[1]);
    }

    let status_widget = Paragraph::new(status_text(state))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status_widget, layout[2]);

    if let Some(form) = &view_data.form {
        let area = centered_rect(70, 80, frame.area());
        frame.render_widget(Clear, area);
        let widget = Paragraph::new(render_form_text(form, view_data)).block(
            Block::default()
                .title(form.kind.title())
                .borders(Borders::ALL)
                .style(Style::default().fg(Color::Cyan)),
        );
        frame.render_widget(widget, area);
    }

    if let Some(notice) = &view_data.notice {
        let area = centered_rect(50, 30, frame.area());
        frame.render_widget(Clear, area);
        let widget = Paragraph::new(format!("{notice}\n\npress any key"))
            .block(Block::default().title("notice").borders(Borders::ALL));
        frame.render_widget(widget, area);
    }
}

fn render_dashboard(frame: &mut ratatui::Frame<'_>, area: Rect, view_data: &ViewData) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(1)])
        .split(area);

    let summary = Paragraph::new(summary_text(view_data.summary()))
        .block(Block::default().borders(Borders::ALL).title("summary"));
    frame.render_widget(summary, layout[0]);

    render_table(
        frame,
        layout[1],
        page_title("bookings", &view_data.bookings, None),
        BOOKING_HEADERS,
        view_data.bookings.items().iter().map(booking_cells).collect(),
        view_data.cursors.bookings,
    );
}

fn render_booking_screen(frame: &mut ratatui::Frame<'_>, area: Rect, view_data: &ViewData) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(1)])
        .split(area);

    let id_types = if view_data.id_types.is_empty() {
        "none loaded".to_owned()
    } else {
        view_data
            .id_types
            .iter()
            .map(|id_type| id_type.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };
    let intro = Paragraph::new(format!("press a to start a booking | id types: {id_types}"))
        .block(Block::default().borders(Borders::ALL).title("new booking"));
    frame.render_widget(intro, layout[0]);

    render_table(
        frame,
        layout[1],
        format!("available rooms | {}", view_data.available_rooms.len()),
        ROOM_HEADERS,
        view_data.available_rooms.iter().map(room_cells).collect(),
        view_data.cursors.available,
    );
}

fn render_table(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    title: String,
    headers: &[&str],
    rows: Vec<Vec<String>>,
    selected: usize,
) {
    if rows.is_empty() {
        let empty = Paragraph::new("nothing to show")
            .block(Block::default().borders(Borders::ALL).title(title));
        frame.render_widget(empty, area);
        return;
    }

    let widths = vec![Constraint::Min(6); headers.len().max(1)];
    let header = Row::new(headers.iter().map(|label| {
        Cell::from(*label).style(
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
    }));
    let body = rows.into_iter().enumerate().map(|(index, cells)| {
        let style = if index == selected {
            Style::default().fg(Color::Black).bg(Color::Cyan)
        } else {
            Style::default()
        };
        Row::new(cells).style(style)
    });

    let table = Table::new(body, widths)
        .header(header)
        .column_spacing(1)
        .block(Block::default().title(title).borders(Borders::ALL));
    frame.render_widget(table, area);
}

fn page_title<T>(label: &str, page: &PageState<T>, extra: Option<String>) -> String {
    let mut title = format!(
        "{label} | page {} | rows {}",
        page.page_number(),
        page.range_label()
    );
    if let Some(extra) = extra {
        title.push_str(" | ");
        title.push_str(&extra);
    }
    if page.can_previous() {
        title.push_str(" | ◂ prev");
    }
    if page.has_more() {
        title.push_str(" | next ▸");
    }
    if page.is_loading() {
        title.push_str(" | loading");
    }
    if let Some(error) = page.error() {
        title.push_str(" | error: ");
        title.push_str(error);
    }
    title
}

fn summary_text(summary: DashboardSummary) -> String {
    format!(
        "bookings on this page: {} | rooms available: {}",
        summary.bookings_on_page, summary.rooms_available
    )
}

fn booking_cells(entry: &BookingEntry) -> Vec<String> {
    let stay = &entry.booking.stay;
    vec![
        entry.booking.booking_id.to_string(),
        entry.customer.customer_details.full_name(),
        stay.checkin.to_string(),
        stay.checkout.to_string(),
        stay.room_num
            .map(|room| room.to_string())
            .unwrap_or_else(|| "-".to_owned()),
        stay.status.clone().unwrap_or_else(|| "-".to_owned()),
        format!("{} {}", stay.government_id_type, stay.government_id_number),
    ]
}

fn employee_cells(employee: &Employee) -> Vec<String> {
    let details = &employee.emp_details;
    vec![
        employee.emp_id.to_string(),
        details.full_name(),
        details.email.clone(),
        details.phone.clone(),
        if details.is_active { "[x]" } else { "[ ]" }.to_owned(),
    ]
}

fn room_cells(room: &Room) -> Vec<String> {
    vec![
        room.room_number.to_string(),
        room.room_type.clone(),
        room.room_state.clone().unwrap_or_else(|| "-".to_owned()),
    ]
}

fn render_form_text(form: &FormUiState, view_data: &ViewData) -> String {
    let mut lines = Vec::new();
    for (index, field) in form_fields(form.kind).iter().enumerate() {
        let marker = if index == form.field_index { ">" } else { " " };
        let required = if field.required { "*" } else { " " };
        let raw = form.values.get(index).map(String::as_str).unwrap_or_default();
        let value = if field.secret {
            "•".repeat(raw.chars().count())
        } else {
            raw.to_owned()
        };
        let hint = match field.choices {
            FieldChoices::FreeText => "",
            _ if field_options(field, view_data).is_empty() => "",
            _ => "  ◂ ▸",
        };
        lines.push(format!("{marker} {required}{:<24} {value}{hint}", field.label));
    }
    if let Some(error) = &form.error {
        lines.push(String::new());
        lines.push(format!("! {error}"));
    }
    lines.join("\n")
}

fn status_text(state: &AppState) -> String {
    let (mode, hints) = match state.mode {
        AppMode::Login => ("LOGIN", "↑/↓ field | enter sign in | ctrl+q quit"),
        AppMode::Form(_) => ("FORM", "↑/↓ field | ←/→ choose | enter submit | esc cancel"),
        AppMode::Nav => ("NAV", nav_hints(state.active_screen)),
    };
    match &state.status_line {
        Some(status) => format!("{mode} | {status} | {hints}"),
        None => format!("{mode} | {hints}"),
    }
}

fn nav_hints(screen: ScreenKind) -> &'static str {
    match screen {
        ScreenKind::Dashboard => "tab screen | j/k row | n/p page | a book | r reload | L sign out | q quit",
        ScreenKind::Booking => "tab screen | a new booking | r refresh | L sign out | q quit",
        ScreenKind::Employees => {
            "tab screen | j/k row | space active | n/p page | a add | r reload | L sign out | q quit"
        }
        ScreenKind::Rooms => {
            "tab screen | j/k row | f filter | n/p page | a add | r reload | L sign out | q quit"
        }
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
