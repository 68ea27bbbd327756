// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use time::Date;
use time::macros::format_description;

use crate::{
    Address, AddressType, CustomerDetails, EmployeeDetails, EmployeeId, FormKind, NewBooking,
    NewCustomer, NewEmployee, NewRoom, RoomNumber, RoomType, StayDetails,
};

/// Where a form field draws its selectable values from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldChoices {
    FreeText,
    Fixed(&'static [&'static str]),
    IdTypes,
    AvailableRooms,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormField {
    pub label: &'static str,
    pub required: bool,
    pub secret: bool,
    pub choices: FieldChoices,
    pub default: &'static str,
}

const fn text(label: &'static str, required: bool) -> FormField {
    FormField {
        label,
        required,
        secret: false,
        choices: FieldChoices::FreeText,
        default: "",
    }
}

const fn fixed(
    label: &'static str,
    options: &'static [&'static str],
    default: &'static str,
) -> FormField {
    FormField {
        label,
        required: true,
        secret: false,
        choices: FieldChoices::Fixed(options),
        default,
    }
}

const YES_NO: &[&str] = &["no", "yes"];
const ADDRESS_TYPES: &[&str] = &["Permanent", "Correspondence"];
const ROOM_TYPES: &[&str] = &["Standard", "Deluxe", "Club", "Suite"];
const ROOM_STATES: &[&str] = &["Available", "Occupied", "Maintenance"];

const LOGIN_FIELDS: &[FormField] = &[
    text("username", true),
    FormField {
        label: "password",
        required: true,
        secret: true,
        choices: FieldChoices::FreeText,
        default: "",
    },
];

const EMPLOYEE_FIELDS: &[FormField] = &[
    text("first name", true),
    text("middle name", false),
    text("last name", true),
    text("email", true),
    text("phone", true),
    fixed("active", YES_NO, "no"),
    text("address line 1", true),
    text("address line 2", false),
    text("landmark", false),
    text("district", true),
    text("state", true),
    text("pin", true),
    fixed("address type", ADDRESS_TYPES, "Permanent"),
];

const ROOM_FIELDS: &[FormField] = &[
    text("room number", true),
    fixed("room type", ROOM_TYPES, "Standard"),
    fixed("room state", ROOM_STATES, "Available"),
];

const BOOKING_FIELDS: &[FormField] = &[
    text("first name", true),
    text("middle name", false),
    text("last name", true),
    text("email", true),
    text("phone", true),
    text("address line 1", true),
    text("address line 2", false),
    text("landmark", false),
    text("district", true),
    text("state", true),
    text("pin", true),
    fixed("address type", ADDRESS_TYPES, "Permanent"),
    text("check-in (YYYY-MM-DD)", true),
    text("check-out (YYYY-MM-DD)", true),
    FormField {
        label: "government id type",
        required: true,
        secret: false,
        choices: FieldChoices::IdTypes,
        default: "",
    },
    text("government id number", true),
    text("id expiry (YYYY-MM-DD)", false),
    FormField {
        label: "room",
        required: false,
        secret: false,
        choices: FieldChoices::AvailableRooms,
        default: "",
    },
    text("comments", false),
    text("employee id", true),
];

pub fn form_fields(kind: FormKind) -> &'static [FormField] {
    match kind {
        FormKind::Login => LOGIN_FIELDS,
        FormKind::Employee => EMPLOYEE_FIELDS,
        FormKind::Room => ROOM_FIELDS,
        FormKind::Booking => BOOKING_FIELDS,
    }
}

/// Field values for a fresh form, in [`form_fields`] order.
pub fn blank_values(kind: FormKind) -> Vec<String> {
    form_fields(kind)
        .iter()
        .map(|field| field.default.to_owned())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginInput {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormPayload {
    Login(LoginInput),
    Employee(NewEmployee),
    Room(NewRoom),
    Booking(Box<NewBooking>),
}

impl FormPayload {
    pub fn kind(&self) -> FormKind {
        match self {
            Self::Login(_) => FormKind::Login,
            Self::Employee(_) => FormKind::Employee,
            Self::Room(_) => FormKind::Room,
            Self::Booking(_) => FormKind::Booking,
        }
    }

    /// Parses raw field text into a typed payload, then runs presence checks.
    pub fn from_values(kind: FormKind, values: &[String]) -> Result<Self> {
        let fields = form_fields(kind);
        if values.len() != fields.len() {
            bail!(
                "{} form expects {} fields, got {}",
                kind.title(),
                fields.len(),
                values.len()
            );
        }
        for (field, value) in fields.iter().zip(values) {
            if field.required && value.trim().is_empty() {
                bail!("{} is required -- fill it in and retry", field.label);
            }
        }

        let payload = match kind {
            FormKind::Login => Self::Login(LoginInput {
                username: values[0].trim().to_owned(),
                password: values[1].clone(),
            }),
            FormKind::Employee => Self::Employee(NewEmployee {
                emp_details: EmployeeDetails {
                    first_name: trimmed(&values[0]),
                    middle_name: optional(&values[1]),
                    last_name: trimmed(&values[2]),
                    email: trimmed(&values[3]),
                    phone: trimmed(&values[4]),
                    is_active: values[5].trim() == "yes",
                },
                emp_address: address_from(&values[6..13])?,
            }),
            FormKind::Room => Self::Room(NewRoom {
                room_number: RoomNumber::new(parse_positive(&values[0], "room number")?),
                room_type: RoomType::parse(&values[1])
                    .map(|room_type| room_type.as_str().to_owned())
                    .ok_or_else(|| {
                        anyhow!(
                            "room type {:?} is not one of {}",
                            values[1],
                            ROOM_TYPES.join(", ")
                        )
                    })?,
                room_state: trimmed(&values[2]),
            }),
            FormKind::Booking => Self::Booking(Box::new(NewBooking {
                customer: NewCustomer {
                    customer_details: CustomerDetails {
                        first_name: trimmed(&values[0]),
                        middle_name: optional(&values[1]),
                        last_name: trimmed(&values[2]),
                        email: trimmed(&values[3]),
                        phone: trimmed(&values[4]),
                    },
                    customer_address: address_from(&values[5..12])?,
                },
                booking: StayDetails {
                    checkin: parse_date(&values[12], "check-in")?,
                    checkout: parse_date(&values[13], "check-out")?,
                    status: None,
                    government_id_type: trimmed(&values[14]),
                    government_id_number: trimmed(&values[15]),
                    exp_date: optional(&values[16])
                        .map(|raw| parse_date(&raw, "id expiry"))
                        .transpose()?,
                    room_num: optional(&values[17])
                        .map(|raw| parse_positive(&raw, "room").map(RoomNumber::new))
                        .transpose()?,
                    comments: optional(&values[18]),
                    emp_id: EmployeeId::new(parse_positive(&values[19], "employee id")?),
                },
            })),
        };
        payload.validate()?;
        Ok(payload)
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Login(login) => login.validate(),
            Self::Employee(employee) => validate_employee(employee),
            Self::Room(room) => validate_room(room),
            Self::Booking(booking) => validate_booking(booking),
        }
    }
}

impl LoginInput {
    pub fn validate(&self) -> Result<()> {
        if self.username.trim().is_empty() {
            bail!("username is required -- enter your email and retry");
        }
        if self.password.is_empty() {
            bail!("password is required");
        }
        Ok(())
    }
}

fn validate_employee(employee: &NewEmployee) -> Result<()> {
    let details = &employee.emp_details;
    if details.first_name.trim().is_empty() || details.last_name.trim().is_empty() {
        bail!("employee first and last name are required");
    }
    if !details.email.contains('@') {
        bail!("employee email {:?} is missing '@'", details.email);
    }
    if details.phone.trim().is_empty() {
        bail!("employee phone is required");
    }
    validate_address(&employee.emp_address)
}

fn validate_room(room: &NewRoom) -> Result<()> {
    if room.room_number.get() <= 0 {
        bail!("room number must be positive");
    }
    if room.room_type.trim().is_empty() {
        bail!("room type is required");
    }
    if room.room_state.trim().is_empty() {
        bail!("room state is required");
    }
    Ok(())
}

fn validate_booking(booking: &NewBooking) -> Result<()> {
    let details = &booking.customer.customer_details;
    if details.first_name.trim().is_empty() || details.last_name.trim().is_empty() {
        bail!("guest first and last name are required");
    }
    if !details.email.contains('@') {
        bail!("guest email {:?} is missing '@'", details.email);
    }
    validate_address(&booking.customer.customer_address)?;
    let stay = &booking.booking;
    if stay.checkout <= stay.checkin {
        bail!("check-out must be after check-in");
    }
    if stay.government_id_type.trim().is_empty() || stay.government_id_number.trim().is_empty() {
        bail!("government id type and number are required");
    }
    Ok(())
}

fn validate_address(address: &Address) -> Result<()> {
    for (label, value) in [
        ("address line 1", &address.first_line),
        ("district", &address.district),
        ("state", &address.state),
        ("pin", &address.pin),
    ] {
        if value.trim().is_empty() {
            bail!("{label} is required");
        }
    }
    Ok(())
}

fn address_from(values: &[String]) -> Result<Address> {
    Ok(Address {
        first_line: trimmed(&values[0]),
        second_line: optional(&values[1]),
        landmark: optional(&values[2]),
        district: trimmed(&values[3]),
        state: trimmed(&values[4]),
        pin: trimmed(&values[5]),
        address_type: AddressType::parse(&values[6])
            .ok_or_else(|| anyhow!("address type {:?} is not recognized", values[6]))?,
    })
}

fn trimmed(value: &str) -> String {
    value.trim().to_owned()
}

fn optional(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_owned())
}

fn parse_positive(raw: &str, label: &str) -> Result<i64> {
    let value: i64 = raw
        .trim()
        .parse()
        .with_context(|| format!("{label} {raw:?} is not a whole number"))?;
    if value <= 0 {
        bail!("{label} must be positive, got {value}");
    }
    Ok(value)
}

fn parse_date(raw: &str, label: &str) -> Result<Date> {
    Date::parse(raw.trim(), format_description!("[year]-[month]-[day]"))
        .with_context(|| format!("{label} {raw:?} is not a YYYY-MM-DD date"))
}
