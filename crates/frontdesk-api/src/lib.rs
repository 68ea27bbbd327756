// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use frontdesk_app::{
    BookingEntry, BookingReceipt, Employee, EmployeeActivation, EmployeeCredentials, EmployeeId,
    IdType, NewBooking, NewEmployee, NewRoom, PageOutcome, PageRequest, Room, Session,
};
use reqwest::blocking::{Client as HttpClient, RequestBuilder};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::{Duration, Instant};
use thiserror::Error;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Failures callers branch on. Everything else is `anyhow`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("cannot reach {base_url} -- check [server].base_url and that the backend is up ({message})")]
    Transport { base_url: String, message: String },
    #[error("session rejected ({status}): {detail} -- sign in again")]
    Unauthorized { status: u16, detail: String },
    #[error("{detail}")]
    Rejected { status: u16, detail: String },
    #[error("{detail}")]
    NotFound { path: String, detail: String },
    #[error("decode {what}: {message}")]
    Decode { what: String, message: String },
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }
}

/// Maps a list call onto the pagination outcome. A rejected session is passed
/// through so the caller can route to login.
pub fn into_page_outcome<T>(result: Result<Vec<T>, ApiError>) -> Result<PageOutcome<T>, ApiError> {
    match result {
        Ok(items) => Ok(PageOutcome::Loaded(items)),
        Err(ApiError::NotFound { .. }) => Ok(PageOutcome::NotFound),
        Err(error @ ApiError::Unauthorized { .. }) => Err(error),
        Err(error) => Ok(PageOutcome::Failed(error.to_string())),
    }
}

#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    timeout: Duration,
    retry_transport: bool,
    http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str, timeout: Duration, retry_transport: bool) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_owned();
        if base_url.is_empty() {
            bail!("server.base_url must not be empty");
        }
        let parsed = Url::parse(&base_url)
            .with_context(|| format!("server.base_url {base_url:?} is not a valid URL"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            bail!(
                "server.base_url must use http or https, got {:?}",
                parsed.scheme()
            );
        }
        if timeout.is_zero() {
            bail!("server.timeout must be positive");
        }

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            timeout,
            retry_transport,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Any HTTP answer counts as reachable.
    pub fn ping(&self) -> Result<(), ApiError> {
        match self.execute(Method::GET, "/", None, |request| request) {
            Ok(_) | Err(ApiError::NotFound { .. }) | Err(ApiError::Rejected { .. }) => Ok(()),
            Err(ApiError::Unauthorized { .. }) => Ok(()),
            Err(error) => Err(error),
        }
    }

    /// Exchanges credentials for a bearer token. Bad credentials come back as
    /// `Rejected` carrying the backend's detail.
    pub fn login(&self, username: &str, password: &str) -> Result<String, ApiError> {
        let form = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("grant_type", "")
            .append_pair("username", username)
            .append_pair("password", password)
            .append_pair("scope", "")
            .append_pair("client_id", "")
            .append_pair("client_secret", "")
            .finish();

        let body = self
            .execute(Method::POST, "/auth/token", None, |request| {
                request
                    .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(form.clone())
            })
            .map_err(|error| match error {
                ApiError::Unauthorized { status, detail } => ApiError::Rejected { status, detail },
                other => other,
            })?;

        let token: TokenResponse = decode("login response", &body)?;
        if token.access_token.trim().is_empty() {
            return Err(ApiError::Decode {
                what: "login response".to_owned(),
                message: "access_token is empty".to_owned(),
            });
        }
        if let Some(kind) = token.token_type.as_deref()
            && !kind.eq_ignore_ascii_case("bearer")
        {
            tracing::warn!(token_type = kind, "unexpected token type, using it as bearer");
        }
        Ok(token.access_token)
    }

    pub fn list_bookings(
        &self,
        session: &Session,
        page: PageRequest,
    ) -> Result<Vec<BookingEntry>, ApiError> {
        self.get_list(session, "/booking/list/", Some(page), None)
    }

    pub fn create_booking(
        &self,
        session: &Session,
        booking: &NewBooking,
    ) -> Result<BookingReceipt, ApiError> {
        let body = self.execute(Method::POST, "/booking/add/", Some(session), |request| {
            request.json(booking)
        })?;
        decode("booking receipt", &body)
    }

    pub fn list_employees(
        &self,
        session: &Session,
        page: PageRequest,
    ) -> Result<Vec<Employee>, ApiError> {
        self.get_list(session, "/emp/list/", Some(page), None)
    }

    pub fn create_employee(
        &self,
        session: &Session,
        employee: &NewEmployee,
    ) -> Result<EmployeeCredentials, ApiError> {
        let body = self.execute(Method::POST, "/emp/add", Some(session), |request| {
            request.json(employee)
        })?;
        decode("employee credentials", &body)
    }

    pub fn set_employee_active(
        &self,
        session: &Session,
        emp_id: EmployeeId,
        is_active: bool,
    ) -> Result<EmployeeActivation, ApiError> {
        let path = format!("/emp/manage/{emp_id}");
        let flag = if is_active { "true" } else { "false" };
        let body = self.execute(Method::PUT, &path, Some(session), |request| {
            request.query(&[("is_active", flag)])
        })?;
        let echo: ToggleEcho = decode("employee toggle echo", &body)?;
        Ok(echo.into_activation())
    }

    pub fn list_rooms(
        &self,
        session: &Session,
        page: PageRequest,
        room_state: Option<&str>,
    ) -> Result<Vec<Room>, ApiError> {
        self.get_list(session, "/room/list/", Some(page), room_state)
    }

    /// Unpaged room lookup used to fill the booking form.
    pub fn available_rooms(&self, session: &Session) -> Result<Vec<Room>, ApiError> {
        match self.get_list(session, "/room/list/", None, Some("Available")) {
            Err(ApiError::NotFound { .. }) => Ok(Vec::new()),
            other => other,
        }
    }

    pub fn create_room(&self, session: &Session, room: &NewRoom) -> Result<Room, ApiError> {
        let body = self.execute(Method::POST, "/room/add/", Some(session), |request| {
            request.json(room)
        })?;
        decode("created room", &body)
    }

    pub fn list_id_types(&self, session: &Session) -> Result<Vec<IdType>, ApiError> {
        match self.get_list(session, "/gov_id/list/", None, None) {
            Err(ApiError::NotFound { .. }) => Ok(Vec::new()),
            other => other,
        }
    }

    fn get_list<T: DeserializeOwned>(
        &self,
        session: &Session,
        path: &str,
        page: Option<PageRequest>,
        room_state: Option<&str>,
    ) -> Result<Vec<T>, ApiError> {
        let mut query = Vec::new();
        if let Some(page) = page {
            query.push(("skip", page.offset.to_string()));
            query.push(("limit", page.limit.to_string()));
        }
        if let Some(state) = room_state {
            query.push(("room_state", state.to_owned()));
        }

        let body = self.execute(Method::GET, path, Some(session), |request| {
            request.query(&query)
        })?;
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }
        let items: Option<Vec<T>> = decode(path, &body)?;
        Ok(items.unwrap_or_default())
    }

    /// Sends one request, retrying a single time on transport failure when
    /// enabled. Writes only retry when the connection was never made, and a
    /// timeout is never retried so `timeout` bounds every call.
    fn execute<F>(
        &self,
        method: Method,
        path: &str,
        session: Option<&Session>,
        build: F,
    ) -> Result<String, ApiError>
    where
        F: Fn(RequestBuilder) -> RequestBuilder,
    {
        let url = format!("{}{}", self.base_url, path);
        let attempts = if self.retry_transport { 2 } else { 1 };
        let mut attempt = 0;
        loop {
            attempt += 1;
            let started = Instant::now();
            let mut request = self.http.request(method.clone(), &url);
            if let Some(session) = session {
                request = request.header(AUTHORIZATION, session.authorization());
            }

            match build(request).send() {
                Ok(response) => {
                    let status = response.status();
                    tracing::info!(
                        method = %method,
                        path,
                        status = status.as_u16(),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "request"
                    );
                    let body = response
                        .text()
                        .map_err(|error| self.transport_error(&error))?;
                    return classify(status, path, body);
                }
                Err(error) => {
                    let retry = attempt < attempts
                        && !error.is_timeout()
                        && (method == Method::GET || error.is_connect());
                    tracing::warn!(
                        method = %method,
                        path,
                        attempt,
                        retry,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        error = %error,
                        "request failed"
                    );
                    if !retry {
                        return Err(self.transport_error(&error));
                    }
                }
            }
        }
    }

    fn transport_error(&self, error: &reqwest::Error) -> ApiError {
        let message = if error.is_timeout() {
            format!("timed out after {}s", self.timeout.as_secs_f32())
        } else {
            error.to_string()
        };
        ApiError::Transport {
            base_url: self.base_url.clone(),
            message,
        }
    }
}

fn classify(status: StatusCode, path: &str, body: String) -> Result<String, ApiError> {
    if status.is_success() {
        return Ok(body);
    }
    let status = status.as_u16();
    let detail = error_detail(&body).unwrap_or_else(|| format!("server returned {status}"));
    Err(match status {
        401 | 403 => ApiError::Unauthorized { status, detail },
        404 => ApiError::NotFound {
            path: path.to_owned(),
            detail,
        },
        _ => ApiError::Rejected { status, detail },
    })
}

/// Pulls a human message out of an error body: FastAPI `detail` strings,
/// validation arrays of `{msg}`, or a short plain-text body.
fn error_detail(body: &str) -> Option<String> {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        return match value.get("detail")? {
            Value::String(detail) if !detail.trim().is_empty() => Some(detail.clone()),
            Value::Array(items) => {
                let messages: Vec<&str> = items
                    .iter()
                    .filter_map(|item| item.get("msg").and_then(Value::as_str))
                    .collect();
                (!messages.is_empty()).then(|| messages.join("; "))
            }
            _ => None,
        };
    }

    let trimmed = body.trim();
    if !trimmed.is_empty() && trimmed.len() < 100 && !trimmed.contains('<') {
        return Some(trimmed.to_owned());
    }
    None
}

fn decode<T: DeserializeOwned>(what: &str, body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|error| ApiError::Decode {
        what: what.to_owned(),
        message: error.to_string(),
    })
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NestedActive {
    is_active: bool,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ToggleEcho {
    Flat {
        emp_id: EmployeeId,
        is_active: bool,
    },
    Nested {
        emp_id: EmployeeId,
        emp_details: NestedActive,
    },
}

impl ToggleEcho {
    fn into_activation(self) -> EmployeeActivation {
        match self {
            Self::Flat { emp_id, is_active } => EmployeeActivation { emp_id, is_active },
            Self::Nested {
                emp_id,
                emp_details,
            } => EmployeeActivation {
                emp_id,
                is_active: emp_details.is_active,
            },
        }
    }
}
