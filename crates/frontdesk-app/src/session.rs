// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;
use std::fmt;
use time::OffsetDateTime;

pub trait Clock {
    fn now(&self) -> OffsetDateTime;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub OffsetDateTime);

impl Clock for FixedClock {
    fn now(&self) -> OffsetDateTime {
        self.0
    }
}

/// The bearer credential of the signed-in employee.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    token: String,
    username: String,
    issued_at: OffsetDateTime,
    expires_at: Option<OffsetDateTime>,
}

impl Session {
    pub fn new(
        token: impl Into<String>,
        username: impl Into<String>,
        issued_at: OffsetDateTime,
        expires_at: Option<OffsetDateTime>,
    ) -> Result<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            bail!("session token must not be empty");
        }
        Ok(Self {
            token,
            username: username.into(),
            issued_at,
            expires_at,
        })
    }

    /// Builds a session for a freshly issued token, reading `exp` when the
    /// token is a JWT.
    pub fn issue(
        token: impl Into<String>,
        username: impl Into<String>,
        clock: &dyn Clock,
    ) -> Result<Self> {
        let token = token.into();
        let expires_at = jwt_expiry(&token);
        Self::new(token, username, clock.now(), expires_at)
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn issued_at(&self) -> OffsetDateTime {
        self.issued_at
    }

    pub fn expires_at(&self) -> Option<OffsetDateTime> {
        self.expires_at
    }

    pub fn authorization(&self) -> String {
        format!("Bearer {}", self.token)
    }

    pub fn is_expired(&self, clock: &dyn Clock) -> bool {
        self.expires_at.is_some_and(|expires_at| clock.now() >= expires_at)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("username", &self.username)
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// The backend refused the current session. Runtimes return it inside
/// `anyhow::Error` so the UI can route back to login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionExpired {
    pub detail: String,
}

impl fmt::Display for SessionExpired {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -- sign in again", self.detail)
    }
}

impl std::error::Error for SessionExpired {}

pub fn is_session_expired(error: &anyhow::Error) -> bool {
    error.downcast_ref::<SessionExpired>().is_some()
}

#[derive(Deserialize)]
struct JwtClaims {
    exp: Option<i64>,
}

/// Reads the `exp` claim of a JWT without verifying it. Opaque tokens yield
/// `None`.
pub fn jwt_expiry(token: &str) -> Option<OffsetDateTime> {
    let mut parts = token.split('.');
    let (_header, payload, _signature) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }
    let decoded = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: JwtClaims = serde_json::from_slice(&decoded).ok()?;
    OffsetDateTime::from_unix_timestamp(claims.exp?).ok()
}
