// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::Date;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

use crate::ids::*;

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

const ISO_DATE: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Optional ISO date that also accepts `null` and `""` when the containing
/// struct is flattened.
mod optional_date {
    use super::{Date, Deserialize, Deserializer, ISO_DATE, Serializer};
    use serde::de::Error as _;

    pub fn serialize<S: Serializer>(value: &Option<Date>, serializer: S) -> Result<S::Ok, S::Error> {
        super::iso_date::option::serialize(value, serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Date>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(text) => Date::parse(text, ISO_DATE)
                .map(Some)
                .map_err(|error| D::Error::custom(format!("invalid date {text:?}: {error}"))),
        }
    }
}

/// A row the list screens can key by a stable identity.
pub trait Record {
    type Key: Clone + PartialEq + std::fmt::Debug;

    fn key(&self) -> Self::Key;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScreenKind {
    Dashboard,
    Booking,
    Employees,
    Rooms,
}

impl ScreenKind {
    pub const ALL: [Self; 4] = [Self::Dashboard, Self::Booking, Self::Employees, Self::Rooms];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Dashboard => "dashboard",
            Self::Booking => "new booking",
            Self::Employees => "employees",
            Self::Rooms => "rooms",
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dashboard => "dashboard",
            Self::Booking => "booking",
            Self::Employees => "employees",
            Self::Rooms => "rooms",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "dashboard" => Some(Self::Dashboard),
            "booking" => Some(Self::Booking),
            "employees" => Some(Self::Employees),
            "rooms" => Some(Self::Rooms),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormKind {
    Login,
    Employee,
    Room,
    Booking,
}

impl FormKind {
    pub const fn title(self) -> &'static str {
        match self {
            Self::Login => "sign in",
            Self::Employee => "new employee",
            Self::Room => "new room",
            Self::Booking => "new booking",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppMode {
    Login,
    Nav,
    Form(FormKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomType {
    Standard,
    Deluxe,
    Club,
    Suite,
}

impl RoomType {
    pub const ALL: [Self; 4] = [Self::Standard, Self::Deluxe, Self::Club, Self::Suite];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "Standard",
            Self::Deluxe => "Deluxe",
            Self::Club => "Club",
            Self::Suite => "Suite",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(value.trim()))
    }
}

/// Room-state filter applied to the room list query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomStateFilter {
    All,
    Available,
    Occupied,
    Maintenance,
}

impl RoomStateFilter {
    pub const ALL: [Self; 4] = [
        Self::All,
        Self::Available,
        Self::Occupied,
        Self::Maintenance,
    ];

    pub const fn as_query(self) -> Option<&'static str> {
        match self {
            Self::All => None,
            Self::Available => Some("Available"),
            Self::Occupied => Some("Occupied"),
            Self::Maintenance => Some("Maintenance"),
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Available => "available",
            Self::Occupied => "occupied",
            Self::Maintenance => "maintenance",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|filter| filter.as_str().eq_ignore_ascii_case(value.trim()))
    }

    pub fn cycle(self) -> Self {
        let index = Self::ALL
            .iter()
            .position(|filter| *filter == self)
            .unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AddressType {
    Permanent,
    Correspondence,
}

impl AddressType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Permanent => "Permanent",
            Self::Correspondence => "Correspondence",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "Permanent" | "permanent" => Some(Self::Permanent),
            "Correspondence" | "correspondence" => Some(Self::Correspondence),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub first_line: String,
    #[serde(default)]
    pub second_line: Option<String>,
    #[serde(default)]
    pub landmark: Option<String>,
    pub district: String,
    pub state: String,
    pub pin: String,
    pub address_type: AddressType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeDetails {
    pub first_name: String,
    #[serde(default)]
    pub middle_name: Option<String>,
    pub last_name: String,
    pub email: String,
    #[serde(deserialize_with = "string_or_number")]
    pub phone: String,
    #[serde(default)]
    pub is_active: bool,
}

impl EmployeeDetails {
    pub fn full_name(&self) -> String {
        join_name(&self.first_name, self.middle_name.as_deref(), &self.last_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub emp_id: EmployeeId,
    pub emp_details: EmployeeDetails,
    #[serde(default)]
    pub emp_address: Option<Address>,
}

impl Record for Employee {
    type Key = EmployeeId;

    fn key(&self) -> EmployeeId {
        self.emp_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEmployee {
    pub emp_details: EmployeeDetails,
    pub emp_address: Address,
}

/// Returned once by the backend when an employee is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeCredentials {
    pub emp_id: EmployeeId,
    pub password: String,
}

/// Backend echo of an active-flag change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeActivation {
    pub emp_id: EmployeeId,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub room_number: RoomNumber,
    pub room_type: String,
    #[serde(default)]
    pub room_state: Option<String>,
}

impl Room {
    pub fn is_available(&self) -> bool {
        self.room_state
            .as_deref()
            .is_some_and(|state| state.eq_ignore_ascii_case("available"))
    }
}

impl Record for Room {
    type Key = RoomNumber;

    fn key(&self) -> RoomNumber {
        self.room_number
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRoom {
    pub room_number: RoomNumber,
    pub room_type: String,
    pub room_state: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerDetails {
    pub first_name: String,
    #[serde(default)]
    pub middle_name: Option<String>,
    pub last_name: String,
    pub email: String,
    #[serde(deserialize_with = "string_or_number")]
    pub phone: String,
}

impl CustomerDetails {
    pub fn full_name(&self) -> String {
        join_name(&self.first_name, self.middle_name.as_deref(), &self.last_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    #[serde(default)]
    pub customer_id: Option<CustomerId>,
    pub customer_details: CustomerDetails,
    #[serde(default)]
    pub customer_address: Option<Address>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCustomer {
    pub customer_details: CustomerDetails,
    pub customer_address: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StayDetails {
    #[serde(with = "iso_date")]
    pub checkin: Date,
    #[serde(with = "iso_date")]
    pub checkout: Date,
    #[serde(default)]
    pub status: Option<String>,
    pub government_id_type: String,
    pub government_id_number: String,
    #[serde(default, with = "optional_date")]
    pub exp_date: Option<Date>,
    #[serde(default)]
    pub room_num: Option<RoomNumber>,
    #[serde(default)]
    pub comments: Option<String>,
    pub emp_id: EmployeeId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingStay {
    pub booking_id: BookingId,
    #[serde(flatten)]
    pub stay: StayDetails,
}

/// One row of the bookings overview. The booking id may sit at the top
/// level or inside `booking`; the top level wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookingEntry {
    pub booking: BookingStay,
    pub customer: Customer,
}

#[derive(Deserialize)]
struct WireBookingStay {
    #[serde(default)]
    booking_id: Option<BookingId>,
    #[serde(flatten)]
    stay: StayDetails,
}

#[derive(Deserialize)]
struct WireBookingEntry {
    #[serde(default)]
    booking_id: Option<BookingId>,
    booking: WireBookingStay,
    customer: Customer,
}

impl<'de> Deserialize<'de> for BookingEntry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = WireBookingEntry::deserialize(deserializer)?;
        let booking_id = wire
            .booking_id
            .or(wire.booking.booking_id)
            .ok_or_else(|| D::Error::missing_field("booking_id"))?;
        Ok(Self {
            booking: BookingStay {
                booking_id,
                stay: wire.booking.stay,
            },
            customer: wire.customer,
        })
    }
}

impl Record for BookingEntry {
    type Key = BookingId;

    fn key(&self) -> BookingId {
        self.booking.booking_id.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBooking {
    pub customer: NewCustomer,
    pub booking: StayDetails,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingReceipt {
    #[serde(default)]
    pub msg: String,
    pub booking_id: BookingId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdType {
    pub name: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DashboardSummary {
    pub bookings_on_page: usize,
    pub rooms_available: usize,
}

fn join_name(first: &str, middle: Option<&str>, last: &str) -> String {
    [Some(first), middle, Some(last)]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(value) => value,
        Raw::Int(value) => value.to_string(),
    })
}
