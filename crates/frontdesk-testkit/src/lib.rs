// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use frontdesk_app::{
    Address, AddressType, BookingEntry, BookingId, BookingStay, Customer, CustomerDetails,
    CustomerId, Employee, EmployeeDetails, EmployeeId, IdType, NewBooking, NewEmployee, NewRoom,
    Room, RoomNumber, StayDetails,
};
use serde::Serialize;
use serde_json::json;
use std::io::Read;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use time::macros::date;
use time::{Date, Duration};
use tiny_http::{Header, Request, Response, Server};

pub const DEMO_USERNAME: &str = "admin@frontdesk.test";
pub const DEMO_PASSWORD: &str = "frontdesk";

const FIRST_NAMES: [&str; 16] = [
    "Asha", "Vikram", "Meera", "Arjun", "Kavya", "Rohan", "Priya", "Nikhil", "Divya", "Sanjay",
    "Anika", "Farhan", "Leela", "Tarun", "Ishita", "Karan",
];
const MIDDLE_NAMES: [&str; 6] = ["Kumar", "Devi", "Raj", "Lakshmi", "Prasad", "Mohan"];
const LAST_NAMES: [&str; 14] = [
    "Rao", "Iyer", "Nair", "Das", "Menon", "Shetty", "Kulkarni", "Reddy", "Joshi", "Pillai",
    "Bose", "Gupta", "Mehta", "Varma",
];
const STREET_NAMES: [&str; 10] = [
    "Lake", "Temple", "Station", "Market", "Church", "Garden", "Hill", "Canal", "Fort", "Palace",
];
const STREET_KINDS: [&str; 4] = ["Rd", "St", "Lane", "Cross"];
const LANDMARKS: [&str; 6] = [
    "near bus stand",
    "opposite post office",
    "behind city mall",
    "next to railway gate",
    "near water tank",
    "beside school ground",
];
const DISTRICTS: [(&str, &str, &str); 8] = [
    ("Ernakulam", "Kerala", "682"),
    ("Mysuru", "Karnataka", "570"),
    ("Pune", "Maharashtra", "411"),
    ("Madurai", "Tamil Nadu", "625"),
    ("Udaipur", "Rajasthan", "313"),
    ("Nashik", "Maharashtra", "422"),
    ("Kozhikode", "Kerala", "673"),
    ("Hubballi", "Karnataka", "580"),
];
const ROOM_TYPES: [&str; 4] = ["Standard", "Deluxe", "Club", "Suite"];
const ROOM_STATES: [&str; 3] = ["Available", "Occupied", "Maintenance"];
const ID_TYPES: [&str; 5] = [
    "Aadhaar",
    "Passport",
    "Driving Licence",
    "Voter ID",
    "PAN Card",
];
const BOOKING_COMMENTS: [&str; 5] = [
    "late arrival",
    "extra bed requested",
    "airport pickup",
    "ground floor preferred",
    "anniversary stay",
];

const REFERENCE_DATE: Date = date!(2026 - 03 - 01);

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }

    fn bool(&mut self) -> bool {
        (self.next_u64() & 1) == 1
    }
}

/// Seeded generator of plausible hotel records.
#[derive(Debug, Clone)]
pub struct HotelFaker {
    rng: DeterministicRng,
}

impl HotelFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
        }
    }

    pub fn int_n(&mut self, n: usize) -> usize {
        self.rng.int_n(n)
    }

    pub fn employee(&mut self, emp_id: i64) -> Employee {
        let new = self.new_employee();
        Employee {
            emp_id: EmployeeId::new(emp_id),
            emp_details: EmployeeDetails {
                is_active: self.rng.int_n(4) != 0,
                ..new.emp_details
            },
            emp_address: Some(new.emp_address),
        }
    }

    pub fn new_employee(&mut self) -> NewEmployee {
        let (first, middle, last) = self.name();
        NewEmployee {
            emp_details: EmployeeDetails {
                email: self.email(&first, &last, "frontdesk.test"),
                phone: self.phone(),
                first_name: first,
                middle_name: middle,
                last_name: last,
                is_active: false,
            },
            emp_address: self.address(),
        }
    }

    pub fn room(&mut self, number: i64) -> Room {
        Room {
            room_number: RoomNumber::new(number),
            room_type: self.pick(&ROOM_TYPES).to_owned(),
            room_state: Some(self.pick(&ROOM_STATES).to_owned()),
        }
    }

    pub fn customer_details(&mut self) -> CustomerDetails {
        let (first, middle, last) = self.name();
        CustomerDetails {
            email: self.email(&first, &last, "guest.example"),
            phone: self.phone(),
            first_name: first,
            middle_name: middle,
            last_name: last,
        }
    }

    pub fn address(&mut self) -> Address {
        let (district, state, pin_prefix) = DISTRICTS[self.rng.int_n(DISTRICTS.len())];
        Address {
            first_line: format!(
                "{} {} {}",
                self.int_range(1, 240),
                self.pick(&STREET_NAMES),
                self.pick(&STREET_KINDS)
            ),
            second_line: self
                .rng
                .bool()
                .then(|| format!("Flat {}", self.int_range(1, 40))),
            landmark: self
                .rng
                .bool()
                .then(|| self.pick(&LANDMARKS).to_owned()),
            district: district.to_owned(),
            state: state.to_owned(),
            pin: format!("{pin_prefix}{:03}", self.int_range(1, 999)),
            address_type: if self.rng.int_n(5) == 0 {
                AddressType::Correspondence
            } else {
                AddressType::Permanent
            },
        }
    }

    /// A stay of one to six nights starting within two months of the
    /// reference date.
    pub fn stay(
        &mut self,
        emp_id: EmployeeId,
        room_num: Option<RoomNumber>,
    ) -> StayDetails {
        let checkin = REFERENCE_DATE + Duration::days(self.int_range(0, 60));
        let checkout = checkin + Duration::days(self.int_range(1, 6));
        let id_type = self.pick(&ID_TYPES).to_owned();
        StayDetails {
            checkin,
            checkout,
            status: Some("Booked".to_owned()),
            government_id_number: format!(
                "{}{:08}",
                id_type.chars().next().unwrap_or('X'),
                self.int_range(0, 99_999_999)
            ),
            government_id_type: id_type,
            exp_date: Some(checkin + Duration::days(365 * self.int_range(1, 9))),
            room_num,
            comments: (self.rng.int_n(3) == 0).then(|| self.pick(&BOOKING_COMMENTS).to_owned()),
            emp_id,
        }
    }

    pub fn booking(
        &mut self,
        booking_id: &str,
        customer_id: i64,
        emp_id: EmployeeId,
        room_num: Option<RoomNumber>,
    ) -> BookingEntry {
        BookingEntry {
            booking: BookingStay {
                booking_id: BookingId::new(booking_id),
                stay: self.stay(emp_id, room_num),
            },
            customer: Customer {
                customer_id: Some(CustomerId::new(customer_id)),
                customer_details: self.customer_details(),
                customer_address: Some(self.address()),
            },
        }
    }

    fn name(&mut self) -> (String, Option<String>, String) {
        let first = self.pick(&FIRST_NAMES).to_owned();
        let middle = (self.rng.int_n(3) == 0).then(|| self.pick(&MIDDLE_NAMES).to_owned());
        let last = self.pick(&LAST_NAMES).to_owned();
        (first, middle, last)
    }

    fn email(&mut self, first: &str, last: &str, domain: &str) -> String {
        format!(
            "{}.{}{}@{domain}",
            first.to_ascii_lowercase(),
            last.to_ascii_lowercase(),
            self.int_range(1, 999)
        )
    }

    fn phone(&mut self) -> String {
        format!(
            "9{:09}",
            self.int_range(0, 999_999_999)
        )
    }

    fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[self.rng.int_n(items.len())]
    }

    fn int_range(&mut self, min: i64, max: i64) -> i64 {
        if max <= min {
            return min;
        }
        let span = max - min + 1;
        min + (self.rng.next_u64() % (span as u64)) as i64
    }
}

pub fn id_types() -> Vec<IdType> {
    ID_TYPES
        .iter()
        .map(|name| IdType {
            name: (*name).to_owned(),
        })
        .collect()
}

pub fn temp_db_path() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let db_path = dir.path().join("frontdesk.db");
    Ok((dir, db_path))
}

/// Everything the mock backend serves. Collections are kept newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendData {
    pub users: Vec<(String, String)>,
    pub employees: Vec<Employee>,
    pub rooms: Vec<Room>,
    pub bookings: Vec<BookingEntry>,
    pub id_types: Vec<IdType>,
}

impl Default for BackendData {
    fn default() -> Self {
        Self {
            users: vec![(DEMO_USERNAME.to_owned(), DEMO_PASSWORD.to_owned())],
            employees: Vec::new(),
            rooms: Vec::new(),
            bookings: Vec::new(),
            id_types: id_types(),
        }
    }
}

impl BackendData {
    pub fn demo(seed: u64) -> Self {
        let mut faker = HotelFaker::new(seed);
        let employees: Vec<Employee> = (1..=27).map(|id| faker.employee(id)).collect();
        let mut rooms: Vec<Room> = (1..=4)
            .flat_map(|floor| (1..=8).map(move |slot| floor * 100 + slot))
            .map(|number| faker.room(number))
            .collect();

        let mut bookings = Vec::new();
        for index in 0..14_i64 {
            let room_index = faker.int_n(rooms.len());
            let room = &mut rooms[room_index];
            let room_num = room.is_available().then_some(room.room_number);
            if room_num.is_some() {
                room.room_state = Some("Occupied".to_owned());
            }
            let emp_id = employees[faker.int_n(employees.len())].emp_id;
            bookings.push(faker.booking(
                &format!("BK{:05}", 14 - index),
                14 - index,
                emp_id,
                room_num,
            ));
        }

        Self {
            employees,
            rooms,
            bookings,
            ..Self::default()
        }
    }

    pub fn with_rooms(count: i64) -> Self {
        Self {
            rooms: (1..=count)
                .map(|number| Room {
                    room_number: RoomNumber::new(number),
                    room_type: "Standard".to_owned(),
                    room_state: Some("Available".to_owned()),
                })
                .collect(),
            ..Self::default()
        }
    }
}

/// One request as the mock backend saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub body: String,
}

impl RecordedRequest {
    pub fn url(&self) -> String {
        match &self.query {
            Some(query) => format!("{}?{query}", self.path),
            None => self.path.clone(),
        }
    }
}

#[derive(Debug, Default)]
struct Shared {
    data: BackendData,
    tokens: Vec<String>,
    requests: Vec<RecordedRequest>,
    issued: u64,
    next_customer_id: i64,
    fail_next: Option<(u16, String)>,
    toggle_echo: Option<bool>,
}

/// In-process HTTP backend with the same routes, status codes, and `detail`
/// messages as the hotel API. Stops when dropped.
pub struct MockBackend {
    base_url: String,
    server: Arc<Server>,
    shared: Arc<Mutex<Shared>>,
    handle: Option<JoinHandle<()>>,
}

impl MockBackend {
    pub fn start(data: BackendData) -> Result<Self> {
        let server = Server::http("127.0.0.1:0")
            .map_err(|error| anyhow!("start mock backend: {error}"))?;
        let base_url = format!("http://{}", server.server_addr());
        let server = Arc::new(server);
        let next_customer_id = data.bookings.len() as i64 + 1;
        let shared = Arc::new(Mutex::new(Shared {
            data,
            next_customer_id,
            ..Shared::default()
        }));

        let handle = {
            let server = Arc::clone(&server);
            let shared = Arc::clone(&shared);
            thread::spawn(move || {
                while let Ok(request) = server.recv() {
                    serve_one(&shared, request);
                }
            })
        };
        tracing::debug!(base_url = %base_url, "mock backend started");

        Ok(Self {
            base_url,
            server,
            shared,
            handle: Some(handle),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.shared).requests.clone()
    }

    pub fn data(&self) -> BackendData {
        lock(&self.shared).data.clone()
    }

    /// Mints a token the backend accepts, as if a login had happened.
    pub fn issue_token(&self) -> String {
        issue_token(&mut lock(&self.shared))
    }

    /// Every outstanding token starts answering 401.
    pub fn revoke_tokens(&self) {
        lock(&self.shared).tokens.clear();
    }

    /// The next authenticated request fails with `status` and `detail`.
    pub fn fail_next(&self, status: u16, detail: &str) {
        lock(&self.shared).fail_next = Some((status, detail.to_owned()));
    }

    /// Forces the active flag echoed by employee toggles.
    pub fn set_toggle_echo(&self, echo: Option<bool>) {
        lock(&self.shared).toggle_echo = echo;
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    match shared.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn issue_token(shared: &mut Shared) -> String {
    shared.issued += 1;
    let token = format!("mock-token-{}", shared.issued);
    shared.tokens.push(token.clone());
    token
}

fn header(request: &Request, name: &'static str) -> Option<String> {
    request
        .headers()
        .iter()
        .find(|header| header.field.equiv(name))
        .map(|header| header.value.as_str().to_owned())
}

fn serve_one(shared: &Mutex<Shared>, mut request: Request) {
    let mut body = String::new();
    let (status, payload) = match request.as_reader().read_to_string(&mut body) {
        Ok(_) => {
            let (path, query) = match request.url().split_once('?') {
                Some((path, query)) => (path.to_owned(), Some(query.to_owned())),
                None => (request.url().to_owned(), None),
            };
            let recorded = RecordedRequest {
                method: request.method().to_string(),
                path,
                query,
                authorization: header(&request, "Authorization"),
                body,
            };
            let mut shared = lock(shared);
            shared.requests.push(recorded.clone());
            route(&mut shared, &recorded)
        }
        Err(error) => detail(400, &format!("unreadable body: {error}")),
    };

    let mut response = Response::from_string(payload).with_status_code(status);
    if let Ok(content_type) = Header::from_bytes("Content-Type", "application/json") {
        response = response.with_header(content_type);
    }
    if let Err(error) = request.respond(response) {
        tracing::warn!(error = %error, "mock backend could not respond");
    }
}

fn detail(status: u16, message: &str) -> (u16, String) {
    (status, json!({ "detail": message }).to_string())
}

fn ok<T: Serialize>(status: u16, value: &T) -> (u16, String) {
    match serde_json::to_string(value) {
        Ok(body) => (status, body),
        Err(error) => detail(500, &format!("encode response: {error}")),
    }
}

fn query_pairs(request: &RecordedRequest) -> Vec<(String, String)> {
    request
        .query
        .as_deref()
        .map(|query| {
            url::form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect()
        })
        .unwrap_or_default()
}

fn query_value(request: &RecordedRequest, key: &str) -> Option<String> {
    query_pairs(request)
        .into_iter()
        .find(|(name, _)| name == key)
        .map(|(_, value)| value)
}

fn route(shared: &mut Shared, request: &RecordedRequest) -> (u16, String) {
    match (request.method.as_str(), request.path.as_str()) {
        ("GET", "/") => ok(200, &json!({ "msg": "frontdesk mock backend" })),
        ("POST", "/auth/token") => login(shared, request),
        _ => {
            let authorized = request
                .authorization
                .as_deref()
                .and_then(|value| value.strip_prefix("Bearer "))
                .is_some_and(|token| shared.tokens.iter().any(|issued| issued == token));
            if !authorized {
                return detail(401, "Not authenticated");
            }
            if let Some((status, message)) = shared.fail_next.take() {
                return detail(status, &message);
            }
            authenticated_route(shared, request)
        }
    }
}

fn authenticated_route(shared: &mut Shared, request: &RecordedRequest) -> (u16, String) {
    let method = request.method.as_str();
    let path = request.path.as_str();
    match (method, path) {
        ("GET", "/booking/list/") => page(request, &shared.data.bookings),
        ("POST", "/booking/add/") => add_booking(shared, request),
        ("GET", "/emp/list/") => page(request, &shared.data.employees),
        ("POST", "/emp/add") => add_employee(shared, request),
        ("GET", "/room/list/") => {
            let state = query_value(request, "room_state");
            let rooms: Vec<Room> = shared
                .data
                .rooms
                .iter()
                .filter(|room| match &state {
                    Some(state) => room.room_state.as_deref() == Some(state.as_str()),
                    None => true,
                })
                .cloned()
                .collect();
            page(request, &rooms)
        }
        ("POST", "/room/add/") => add_room(shared, request),
        ("GET", "/gov_id/list/") => {
            if shared.data.id_types.is_empty() {
                detail(404, "The database is empty.")
            } else {
                ok(200, &shared.data.id_types)
            }
        }
        ("PUT", _) if path.starts_with("/emp/manage/") => toggle_employee(shared, request),
        _ => detail(404, "Not Found"),
    }
}

fn login(shared: &mut Shared, request: &RecordedRequest) -> (u16, String) {
    let form: Vec<(String, String)> = url::form_urlencoded::parse(request.body.as_bytes())
        .into_owned()
        .collect();
    let field = |name: &str| {
        form.iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
            .unwrap_or_default()
    };
    let (username, password) = (field("username"), field("password"));
    let known = shared
        .data
        .users
        .iter()
        .any(|(user, secret)| user == username && secret == password);
    if !known {
        return detail(401, "Incorrect username or password");
    }
    let token = issue_token(shared);
    ok(200, &json!({ "access_token": token, "token_type": "bearer" }))
}

/// Offset/limit slice. An empty slice is a 404, the way the hotel API
/// reports an exhausted collection. Without `limit` the whole collection is
/// returned.
fn page<T: Serialize + Clone>(request: &RecordedRequest, items: &[T]) -> (u16, String) {
    let skip = query_value(request, "skip")
        .and_then(|raw| raw.parse::<usize>().ok())
        .unwrap_or(0);
    let limit = query_value(request, "limit").and_then(|raw| raw.parse::<usize>().ok());
    let slice: Vec<T> = items
        .iter()
        .skip(skip)
        .take(limit.unwrap_or(usize::MAX))
        .cloned()
        .collect();
    if slice.is_empty() {
        return detail(404, "The database is empty.");
    }
    ok(200, &slice)
}

fn add_employee(shared: &mut Shared, request: &RecordedRequest) -> (u16, String) {
    let new: NewEmployee = match serde_json::from_str(&request.body) {
        Ok(new) => new,
        Err(error) => return detail(422, &error.to_string()),
    };
    let employees = &shared.data.employees;
    if employees
        .iter()
        .any(|employee| employee.emp_details.email == new.emp_details.email)
    {
        return detail(400, "Email already registered.");
    }
    if employees
        .iter()
        .any(|employee| employee.emp_details.phone == new.emp_details.phone)
    {
        return detail(400, "Phone number already registered.");
    }

    let emp_id = employees
        .iter()
        .map(|employee| employee.emp_id.get())
        .max()
        .unwrap_or(0)
        + 1;
    shared.data.employees.insert(
        0,
        Employee {
            emp_id: EmployeeId::new(emp_id),
            emp_details: new.emp_details,
            emp_address: Some(new.emp_address),
        },
    );
    let password = format!("fd-{emp_id:04}-{}", shared.issued + 7);
    ok(201, &json!({ "emp_id": emp_id, "password": password }))
}

fn add_room(shared: &mut Shared, request: &RecordedRequest) -> (u16, String) {
    let new: NewRoom = match serde_json::from_str(&request.body) {
        Ok(new) => new,
        Err(error) => return detail(422, &error.to_string()),
    };
    if shared
        .data
        .rooms
        .iter()
        .any(|room| room.room_number == new.room_number)
    {
        return detail(400, "Room already exists.");
    }
    let room = Room {
        room_number: new.room_number,
        room_type: new.room_type,
        room_state: Some(new.room_state),
    };
    shared.data.rooms.insert(0, room.clone());
    ok(201, &room)
}

fn add_booking(shared: &mut Shared, request: &RecordedRequest) -> (u16, String) {
    let new: NewBooking = match serde_json::from_str(&request.body) {
        Ok(new) => new,
        Err(error) => return detail(422, &error.to_string()),
    };
    if let Some(number) = new.booking.room_num {
        match shared
            .data
            .rooms
            .iter_mut()
            .find(|room| room.room_number == number)
        {
            Some(room) if room.is_available() => {
                room.room_state = Some("Occupied".to_owned());
            }
            Some(_) => return detail(400, &format!("Room {number} is not available.")),
            None => return detail(404, &format!("Room {number} does not exist.")),
        }
    }

    let customer_id = shared.next_customer_id;
    shared.next_customer_id += 1;
    let booking_id = BookingId::new(format!("BK{customer_id:05}"));
    shared.data.bookings.insert(
        0,
        BookingEntry {
            booking: BookingStay {
                booking_id: booking_id.clone(),
                stay: StayDetails {
                    status: Some("Booked".to_owned()),
                    ..new.booking
                },
            },
            customer: Customer {
                customer_id: Some(CustomerId::new(customer_id)),
                customer_details: new.customer.customer_details,
                customer_address: Some(new.customer.customer_address),
            },
        },
    );
    ok(
        201,
        &json!({ "msg": "Booking created.", "booking_id": booking_id }),
    )
}

fn toggle_employee(shared: &mut Shared, request: &RecordedRequest) -> (u16, String) {
    let Some(emp_id) = request
        .path
        .trim_start_matches("/emp/manage/")
        .trim_end_matches('/')
        .parse::<i64>()
        .ok()
    else {
        return detail(422, "emp_id must be an integer");
    };
    let requested = match query_value(request, "is_active").as_deref() {
        Some("true") => true,
        Some("false") => false,
        _ => return detail(422, "is_active must be true or false"),
    };
    let echo = shared.toggle_echo;
    let Some(employee) = shared
        .data
        .employees
        .iter_mut()
        .find(|employee| employee.emp_id.get() == emp_id)
    else {
        return detail(404, "Email isn't registered.");
    };
    let applied = echo.unwrap_or(requested);
    employee.emp_details.is_active = applied;
    ok(200, &json!({ "emp_id": emp_id, "is_active": applied }))
}
