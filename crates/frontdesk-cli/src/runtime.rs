// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use frontdesk_api::{ApiError, Client, into_page_outcome};
use frontdesk_app::{
    Clock, EmployeeActivation, EmployeeId, FormPayload, IdType, Room, RoomStateFilter, Session,
    SessionExpired, SystemClock, is_session_expired,
};
use frontdesk_store::{Store, token_fingerprint};
use frontdesk_tui::{InternalEvent, PageLoad, PageResult, SubmitOutcome};
use std::sync::mpsc::Sender;
use std::thread;

/// Backs the UI with the HTTP client and persists the session locally.
pub struct ApiRuntime<'a> {
    client: Client,
    store: &'a Store,
    session: Option<Session>,
    clock: Box<dyn Clock>,
}

impl<'a> ApiRuntime<'a> {
    pub fn new(client: Client, store: &'a Store) -> Self {
        Self::with_clock(client, store, Box::new(SystemClock))
    }

    pub fn with_clock(client: Client, store: &'a Store, clock: Box<dyn Clock>) -> Self {
        Self {
            client,
            store,
            session: None,
            clock,
        }
    }

    /// Signs in and stores the session. Returns the username.
    pub fn sign_in(&mut self, username: &str, password: &str) -> Result<String> {
        let token = self.client.login(username.trim(), password)?;
        let session = Session::issue(token, username.trim(), self.clock.as_ref())?;
        self.store.save_session(&session)?;
        tracing::info!(
            username = session.username(),
            token = %token_fingerprint(session.token()),
            "signed in"
        );
        let name = session.username().to_owned();
        self.session = Some(session);
        Ok(name)
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    fn forget_session(&mut self) -> Result<()> {
        self.session = None;
        self.store.clear_session()?;
        Ok(())
    }

    /// Current session, or `SessionExpired` when there is none or the clock
    /// says it lapsed.
    fn live_session(&mut self) -> Result<Session> {
        let Some(session) = self.session.clone() else {
            return Err(SessionExpired {
                detail: "not signed in".to_owned(),
            }
            .into());
        };
        if session.is_expired(self.clock.as_ref()) {
            tracing::info!(
                username = session.username(),
                token = %token_fingerprint(session.token()),
                "session expired locally"
            );
            self.forget_session()?;
            return Err(SessionExpired {
                detail: "session expired".to_owned(),
            }
            .into());
        }
        Ok(session)
    }

    /// Converts an API failure, dropping the stored session on 401/403.
    fn api_error(&mut self, error: ApiError) -> anyhow::Error {
        match error {
            ApiError::Unauthorized { status, detail } => {
                tracing::info!(status, detail = %detail, "backend rejected session");
                if let Err(clear_error) = self.forget_session() {
                    tracing::warn!(error = %clear_error, "clear rejected session");
                }
                SessionExpired { detail }.into()
            }
            other => other.into(),
        }
    }

    fn call<T>(
        &mut self,
        request: impl FnOnce(&Client, &Session) -> Result<T, ApiError>,
    ) -> Result<T> {
        let session = self.live_session()?;
        match request(&self.client, &session) {
            Ok(value) => Ok(value),
            Err(error) => Err(self.api_error(error)),
        }
    }
}

/// Runs one list read. Shared by the blocking and threaded paths.
pub fn fetch_page(client: &Client, session: &Session, load: PageLoad) -> Result<PageResult, ApiError> {
    let request = load.request();
    let result = match load {
        PageLoad::Bookings(_) => {
            PageResult::Bookings(into_page_outcome(client.list_bookings(session, request))?)
        }
        PageLoad::Employees(_) => {
            PageResult::Employees(into_page_outcome(client.list_employees(session, request))?)
        }
        PageLoad::Rooms { filter, .. } => PageResult::Rooms(into_page_outcome(
            client.list_rooms(session, request, filter.as_query()),
        )?),
    };
    Ok(result)
}

fn page_event(load: PageLoad, result: Result<PageResult, ApiError>) -> InternalEvent {
    match result {
        Ok(result) => InternalEvent::PageLoaded { load, result },
        Err(error) => InternalEvent::PageFailed {
            load,
            session_expired: error.is_unauthorized(),
            error: error.to_string(),
        },
    }
}

impl frontdesk_tui::AppRuntime for ApiRuntime<'_> {
    fn restore_session(&mut self) -> Result<Option<String>> {
        self.session = self.store.load_live_session(self.clock.as_ref())?;
        Ok(self
            .session
            .as_ref()
            .map(|session| session.username().to_owned()))
    }

    fn login(&mut self, username: &str, password: &str) -> Result<String> {
        self.sign_in(username, password)
    }

    fn logout(&mut self) -> Result<()> {
        if let Some(session) = &self.session {
            tracing::info!(username = session.username(), "signed out");
        }
        self.forget_session()
    }

    fn load_page(&mut self, load: PageLoad) -> Result<PageResult> {
        self.call(|client, session| fetch_page(client, session, load))
    }

    fn spawn_page_load(&mut self, load: PageLoad, tx: Sender<InternalEvent>) -> Result<()> {
        let session = match self.live_session() {
            Ok(session) => session,
            Err(error) if is_session_expired(&error) => {
                tx.send(InternalEvent::PageFailed {
                    load,
                    error: error.to_string(),
                    session_expired: true,
                })
                .map_err(|_| anyhow!("page event channel closed"))?;
                return Ok(());
            }
            Err(error) => return Err(error),
        };
        let client = self.client.clone();
        thread::Builder::new()
            .name(format!("load-{}", load.label()))
            .spawn(move || {
                let event = page_event(load, fetch_page(&client, &session, load));
                if tx.send(event).is_err() {
                    tracing::debug!(screen = load.label(), "page result dropped after exit");
                }
            })
            .map_err(|error| anyhow!("spawn page loader: {error}"))?;
        Ok(())
    }

    fn submit_form(&mut self, payload: &FormPayload) -> Result<SubmitOutcome> {
        payload.validate()?;
        match payload {
            FormPayload::Login(login) => Err(anyhow!(
                "sign-in for {} must go through login",
                login.username
            )),
            FormPayload::Employee(employee) => {
                let credentials =
                    self.call(|client, session| client.create_employee(session, employee))?;
                tracing::info!(emp_id = %credentials.emp_id, "employee created");
                Ok(SubmitOutcome::EmployeeCreated(credentials))
            }
            FormPayload::Room(room) => {
                let created = self.call(|client, session| client.create_room(session, room))?;
                tracing::info!(room = %created.room_number, "room created");
                Ok(SubmitOutcome::RoomCreated(created))
            }
            FormPayload::Booking(booking) => {
                let receipt =
                    self.call(|client, session| client.create_booking(session, booking))?;
                tracing::info!(booking_id = %receipt.booking_id, "booking created");
                Ok(SubmitOutcome::BookingCreated(receipt))
            }
        }
    }

    fn set_employee_active(
        &mut self,
        emp_id: EmployeeId,
        is_active: bool,
    ) -> Result<EmployeeActivation> {
        let echo =
            self.call(|client, session| client.set_employee_active(session, emp_id, is_active))?;
        tracing::info!(%emp_id, requested = is_active, echoed = echo.is_active, "employee toggled");
        Ok(echo)
    }

    fn load_id_types(&mut self) -> Result<Vec<IdType>> {
        self.call(|client, session| client.list_id_types(session))
    }

    fn load_available_rooms(&mut self) -> Result<Vec<Room>> {
        self.call(|client, session| client.available_rooms(session))
    }

    fn save_room_filter(&mut self, filter: RoomStateFilter) -> Result<()> {
        self.store.put_room_filter(filter)
    }
}

#[cfg(test)]
mod tests {
    use super::{ApiRuntime, fetch_page};
    use anyhow::Result;
    use frontdesk_api::Client;
    use frontdesk_app::{
        EmployeeId, FixedClock, FormKind, FormPayload, PageOutcome, PageRequest, RoomStateFilter,
        Session, blank_values, is_session_expired,
    };
    use frontdesk_store::Store;
    use frontdesk_app::{BookingId, NewBooking, NewCustomer};
    use frontdesk_testkit::{BackendData, DEMO_PASSWORD, DEMO_USERNAME, HotelFaker, MockBackend};
    use frontdesk_tui::{AppRuntime, InternalEvent, PageLoad, PageResult, SubmitOutcome};
    use std::sync::mpsc;
    use std::time::Duration;
    use time::OffsetDateTime;

    fn client(backend: &MockBackend) -> Result<Client> {
        Client::new(backend.base_url(), Duration::from_secs(5), false)
    }

    fn store() -> Result<Store> {
        let store = Store::open_memory()?;
        store.bootstrap()?;
        Ok(store)
    }

    fn request(offset: usize, limit: usize) -> PageRequest {
        PageRequest {
            offset,
            limit,
            generation: 1,
        }
    }

    fn room_payload(number: &str, room_type: &str) -> Result<FormPayload> {
        let mut values = blank_values(FormKind::Room);
        values[0] = number.to_owned();
        values[1] = room_type.to_owned();
        FormPayload::from_values(FormKind::Room, &values)
    }

    #[test]
    fn sign_in_persists_session_and_restore_reads_it() -> Result<()> {
        let backend = MockBackend::start(BackendData::demo(7))?;
        let store = store()?;

        let mut runtime = ApiRuntime::new(client(&backend)?, &store);
        assert_eq!(runtime.login(DEMO_USERNAME, DEMO_PASSWORD)?, DEMO_USERNAME);
        assert!(store.load_session()?.is_some());

        let mut restored = ApiRuntime::new(client(&backend)?, &store);
        assert_eq!(restored.restore_session()?, Some(DEMO_USERNAME.to_owned()));
        Ok(())
    }

    #[test]
    fn invalid_login_surfaces_backend_detail_and_stores_nothing() -> Result<()> {
        let backend = MockBackend::start(BackendData::default())?;
        let store = store()?;
        let mut runtime = ApiRuntime::new(client(&backend)?, &store);

        let error = runtime
            .login(DEMO_USERNAME, "wrong")
            .expect_err("bad password should fail");
        assert!(error.to_string().contains("Incorrect username or password"));
        assert!(!is_session_expired(&error));
        assert!(store.load_session()?.is_none());
        Ok(())
    }

    #[test]
    fn rooms_page_then_short_last_page() -> Result<()> {
        let backend = MockBackend::start(BackendData::with_rooms(25))?;
        let store = store()?;
        let mut runtime = ApiRuntime::new(client(&backend)?, &store);
        runtime.sign_in(DEMO_USERNAME, DEMO_PASSWORD)?;

        let first = runtime.load_page(PageLoad::Rooms {
            request: request(0, 20),
            filter: RoomStateFilter::All,
        })?;
        let PageResult::Rooms(PageOutcome::Loaded(rooms)) = first else {
            panic!("expected loaded rooms, got {first:?}");
        };
        assert_eq!(rooms.len(), 20);

        let second = runtime.load_page(PageLoad::Rooms {
            request: request(20, 20),
            filter: RoomStateFilter::All,
        })?;
        let PageResult::Rooms(PageOutcome::Loaded(rooms)) = second else {
            panic!("expected loaded rooms, got {second:?}");
        };
        assert_eq!(rooms.len(), 5);

        let empty = runtime.load_page(PageLoad::Rooms {
            request: request(40, 20),
            filter: RoomStateFilter::All,
        })?;
        assert_eq!(empty, PageResult::Rooms(PageOutcome::NotFound));
        Ok(())
    }

    #[test]
    fn room_filter_is_sent_as_query() -> Result<()> {
        let backend = MockBackend::start(BackendData::demo(3))?;
        let store = store()?;
        let mut runtime = ApiRuntime::new(client(&backend)?, &store);
        runtime.sign_in(DEMO_USERNAME, DEMO_PASSWORD)?;

        runtime.load_page(PageLoad::Rooms {
            request: request(0, 20),
            filter: RoomStateFilter::Occupied,
        })?;
        let last = backend.requests().pop().expect("request recorded");
        assert_eq!(last.path, "/room/list/");
        let query = last.query.clone().unwrap_or_default();
        assert!(query.contains("room_state=Occupied"), "{}", last.url());
        assert!(query.contains("skip=0"));
        assert!(query.contains("limit=20"));
        Ok(())
    }

    #[test]
    fn created_room_is_returned() -> Result<()> {
        let backend = MockBackend::start(BackendData::with_rooms(3))?;
        let store = store()?;
        let mut runtime = ApiRuntime::new(client(&backend)?, &store);
        runtime.sign_in(DEMO_USERNAME, DEMO_PASSWORD)?;

        let outcome = runtime.submit_form(&room_payload("101", "Suite")?)?;
        let SubmitOutcome::RoomCreated(room) = outcome else {
            panic!("expected created room, got {outcome:?}");
        };
        assert_eq!(room.room_number.get(), 101);
        assert_eq!(room.room_type, "Suite");

        let duplicate = runtime
            .submit_form(&room_payload("101", "Suite")?)
            .expect_err("duplicate room should fail");
        assert!(duplicate.to_string().contains("Room already exists."));
        Ok(())
    }

    #[test]
    fn booking_without_id_expiry_still_lists() -> Result<()> {
        let backend = MockBackend::start(BackendData::demo(7))?;
        let store = store()?;
        let mut runtime = ApiRuntime::new(client(&backend)?, &store);
        runtime.sign_in(DEMO_USERNAME, DEMO_PASSWORD)?;

        let mut faker = HotelFaker::new(41);
        let mut stay = faker.stay(EmployeeId::new(1), None);
        stay.exp_date = None;
        let booking = NewBooking {
            customer: NewCustomer {
                customer_details: faker.customer_details(),
                customer_address: faker.address(),
            },
            booking: stay,
        };
        let outcome = runtime.submit_form(&FormPayload::Booking(Box::new(booking)))?;
        let SubmitOutcome::BookingCreated(receipt) = outcome else {
            panic!("expected booking receipt, got {outcome:?}");
        };
        assert_eq!(receipt.booking_id, BookingId::new("BK00015"));

        let page = runtime.load_page(PageLoad::Bookings(request(0, 20)))?;
        let PageResult::Bookings(PageOutcome::Loaded(entries)) = page else {
            panic!("expected loaded bookings, got {page:?}");
        };
        assert_eq!(entries[0].booking.booking_id, receipt.booking_id);
        assert_eq!(entries[0].booking.stay.exp_date, None);
        Ok(())
    }

    #[test]
    fn toggle_returns_backend_echo() -> Result<()> {
        let backend = MockBackend::start(BackendData::demo(11))?;
        let store = store()?;
        let mut runtime = ApiRuntime::new(client(&backend)?, &store);
        runtime.sign_in(DEMO_USERNAME, DEMO_PASSWORD)?;

        let echo = runtime.set_employee_active(EmployeeId::new(1), false)?;
        assert_eq!(echo.emp_id, EmployeeId::new(1));
        assert!(!echo.is_active);
        Ok(())
    }

    #[test]
    fn rejected_token_clears_store_and_reports_expiry() -> Result<()> {
        let backend = MockBackend::start(BackendData::demo(5))?;
        let store = store()?;
        let mut runtime = ApiRuntime::new(client(&backend)?, &store);
        runtime.sign_in(DEMO_USERNAME, DEMO_PASSWORD)?;

        backend.revoke_tokens();
        let error = runtime
            .load_page(PageLoad::Employees(request(0, 20)))
            .expect_err("revoked token should fail");
        assert!(is_session_expired(&error));
        assert!(store.load_session()?.is_none());
        assert!(runtime.session().is_none());
        Ok(())
    }

    #[test]
    fn server_errors_become_failed_pages_not_expiry() -> Result<()> {
        let backend = MockBackend::start(BackendData::demo(5))?;
        let store = store()?;
        let mut runtime = ApiRuntime::new(client(&backend)?, &store);
        runtime.sign_in(DEMO_USERNAME, DEMO_PASSWORD)?;

        backend.fail_next(500, "database offline");
        let result = runtime.load_page(PageLoad::Bookings(request(0, 20)))?;
        let PageResult::Bookings(PageOutcome::Failed(message)) = result else {
            panic!("expected failed page, got {result:?}");
        };
        assert!(message.contains("database offline"));
        assert!(store.load_session()?.is_some());
        Ok(())
    }

    #[test]
    fn locally_expired_session_is_dropped_before_the_request() -> Result<()> {
        let backend = MockBackend::start(BackendData::demo(5))?;
        let store = store()?;
        let issued = OffsetDateTime::now_utc();
        let session = Session::new(
            backend.issue_token(),
            DEMO_USERNAME,
            issued,
            Some(issued + time::Duration::minutes(5)),
        )?;
        store.save_session(&session)?;

        let later = FixedClock(issued + time::Duration::hours(1));
        let mut runtime = ApiRuntime::with_clock(client(&backend)?, &store, Box::new(later));
        assert_eq!(runtime.restore_session()?, None);
        assert!(store.load_session()?.is_none());

        let before = backend.requests().len();
        let error = runtime
            .load_page(PageLoad::Rooms {
                request: request(0, 20),
                filter: RoomStateFilter::All,
            })
            .expect_err("no session");
        assert!(is_session_expired(&error));
        assert_eq!(backend.requests().len(), before);
        Ok(())
    }

    #[test]
    fn threaded_load_delivers_page_event() -> Result<()> {
        let backend = MockBackend::start(BackendData::demo(9))?;
        let store = store()?;
        let mut runtime = ApiRuntime::new(client(&backend)?, &store);
        runtime.sign_in(DEMO_USERNAME, DEMO_PASSWORD)?;

        let (tx, rx) = mpsc::channel();
        let load = PageLoad::Employees(request(0, 10));
        runtime.spawn_page_load(load, tx)?;
        let event = rx.recv_timeout(Duration::from_secs(5))?;
        let InternalEvent::PageLoaded {
            load: answered,
            result: PageResult::Employees(PageOutcome::Loaded(employees)),
        } = event
        else {
            panic!("expected employees page, got {event:?}");
        };
        assert_eq!(answered, load);
        assert_eq!(employees.len(), 10);
        Ok(())
    }

    #[test]
    fn threaded_load_flags_rejected_session() -> Result<()> {
        let backend = MockBackend::start(BackendData::demo(9))?;
        let store = store()?;
        let mut runtime = ApiRuntime::new(client(&backend)?, &store);
        runtime.sign_in(DEMO_USERNAME, DEMO_PASSWORD)?;
        backend.revoke_tokens();

        let (tx, rx) = mpsc::channel();
        runtime.spawn_page_load(PageLoad::Bookings(request(0, 10)), tx)?;
        let event = rx.recv_timeout(Duration::from_secs(5))?;
        assert!(matches!(
            event,
            InternalEvent::PageFailed {
                session_expired: true,
                ..
            }
        ));
        Ok(())
    }

    #[test]
    fn fetch_page_maps_empty_employee_list_to_not_found() -> Result<()> {
        let mut data = BackendData::default();
        data.employees.clear();
        let backend = MockBackend::start(data)?;
        let client = client(&backend)?;
        let token = client.login(DEMO_USERNAME, DEMO_PASSWORD)?;
        let session = Session::new(token, DEMO_USERNAME, OffsetDateTime::now_utc(), None)?;

        let result = fetch_page(&client, &session, PageLoad::Employees(request(0, 20)))?;
        assert_eq!(result, PageResult::Employees(PageOutcome::NotFound));
        Ok(())
    }
}
