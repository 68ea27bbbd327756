// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use frontdesk_app::{Clock, RoomStateFilter, ScreenKind, Session};
use rusqlite::{Connection, OptionalExtension, params};
use sha2::{Digest, Sha256};
use std::env;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

const APP_NAME: &str = "frontdesk";

const REQUIRED_SCHEMA: &[(&str, &[&str])] = &[
    (
        "sessions",
        &["id", "token", "username", "issued_at", "expires_at", "saved_at"],
    ),
    ("settings", &["key", "value", "updated_at"]),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKey {
    RoomFilter,
    StartScreen,
}

impl SettingKey {
    pub const ALL: [Self; 2] = [Self::RoomFilter, Self::StartScreen];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RoomFilter => "ui.room_filter",
            Self::StartScreen => "ui.start_screen",
        }
    }
}

pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let printable = path.to_string_lossy().to_string();
        validate_db_path(&printable)?;
        let conn = Connection::open(path)
            .with_context(|| format!("open database at {}", path.display()))?;
        configure_connection(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory database")?;
        configure_connection(&conn)?;
        Ok(Self { conn })
    }

    pub fn bootstrap(&self) -> Result<()> {
        if has_user_tables(&self.conn)? {
            validate_schema(&self.conn)
        } else {
            self.conn
                .execute_batch(include_str!("sql/schema.sql"))
                .context("create schema")
        }
    }

    pub fn save_session(&self, session: &Session) -> Result<()> {
        let issued_at = format_timestamp(session.issued_at())?;
        let expires_at = session.expires_at().map(format_timestamp).transpose()?;
        let now = format_timestamp(OffsetDateTime::now_utc())?;
        self.conn
            .execute(
                "
                INSERT INTO sessions (id, token, username, issued_at, expires_at, saved_at)
                VALUES (1, ?, ?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                  token = excluded.token,
                  username = excluded.username,
                  issued_at = excluded.issued_at,
                  expires_at = excluded.expires_at,
                  saved_at = excluded.saved_at
                ",
                params![session.token(), session.username(), issued_at, expires_at, now],
            )
            .context("save session")?;
        tracing::info!(
            username = session.username(),
            token = %token_fingerprint(session.token()),
            "session saved"
        );
        Ok(())
    }

    pub fn load_session(&self) -> Result<Option<Session>> {
        let row = self
            .conn
            .query_row(
                "SELECT token, username, issued_at, expires_at FROM sessions WHERE id = 1",
                [],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Option<String>>(3)?,
                    ))
                },
            )
            .optional()
            .context("read stored session")?;

        let Some((token, username, issued_at, expires_at)) = row else {
            return Ok(None);
        };
        let issued_at = parse_timestamp(&issued_at)?;
        let expires_at = expires_at.as_deref().map(parse_timestamp).transpose()?;
        Session::new(token, username, issued_at, expires_at)
            .map(Some)
            .context("stored session is corrupt -- run `frontdesk --logout` and sign in again")
    }

    /// Loads the stored session and discards it when `clock` says it has
    /// expired.
    pub fn load_live_session(&self, clock: &dyn Clock) -> Result<Option<Session>> {
        let Some(session) = self.load_session()? else {
            return Ok(None);
        };
        if session.is_expired(clock) {
            tracing::info!(
                username = session.username(),
                token = %token_fingerprint(session.token()),
                "stored session expired"
            );
            self.clear_session()?;
            return Ok(None);
        }
        Ok(Some(session))
    }

    /// Returns whether a session was removed.
    pub fn clear_session(&self) -> Result<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM sessions", [])
            .context("clear session")?;
        if removed > 0 {
            tracing::info!("session cleared");
        }
        Ok(removed > 0)
    }

    fn get_setting_raw(&self, key: SettingKey) -> Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?",
                params![key.as_str()],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .with_context(|| format!("read setting {}", key.as_str()))
    }

    fn put_setting_raw(&self, key: SettingKey, value: &str) -> Result<()> {
        let now = format_timestamp(OffsetDateTime::now_utc())?;
        self.conn
            .execute(
                "
                INSERT INTO settings (key, value, updated_at)
                VALUES (?, ?, ?)
                ON CONFLICT(key) DO UPDATE SET
                  value = excluded.value,
                  updated_at = excluded.updated_at
                ",
                params![key.as_str(), value, now],
            )
            .with_context(|| format!("upsert setting {}", key.as_str()))?;
        Ok(())
    }

    pub fn get_room_filter(&self) -> Result<RoomStateFilter> {
        match self.get_setting_raw(SettingKey::RoomFilter)? {
            Some(raw) => RoomStateFilter::parse(&raw).ok_or_else(|| {
                anyhow!(
                    "setting `{}` has invalid value `{raw}`; press f on the rooms screen to reset it",
                    SettingKey::RoomFilter.as_str()
                )
            }),
            None => Ok(RoomStateFilter::All),
        }
    }

    pub fn put_room_filter(&self, filter: RoomStateFilter) -> Result<()> {
        self.put_setting_raw(SettingKey::RoomFilter, filter.as_str())
    }

    pub fn get_start_screen(&self) -> Result<Option<ScreenKind>> {
        self.get_setting_raw(SettingKey::StartScreen)?
            .map(|raw| {
                ScreenKind::parse(&raw).ok_or_else(|| {
                    anyhow!(
                        "setting `{}` has invalid value `{raw}`; expected dashboard, booking, employees, or rooms",
                        SettingKey::StartScreen.as_str()
                    )
                })
            })
            .transpose()
    }

    pub fn put_start_screen(&self, screen: ScreenKind) -> Result<()> {
        self.put_setting_raw(SettingKey::StartScreen, screen.as_str())
    }
}

/// Short, stable identifier for a token that is safe to log.
pub fn token_fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    let mut output = String::with_capacity(12);
    for byte in digest.iter().take(6) {
        let _ = write!(&mut output, "{byte:02x}");
    }
    output
}

pub fn default_db_path() -> Result<PathBuf> {
    if let Some(override_path) = env::var_os("FRONTDESK_DB_PATH") {
        return Ok(PathBuf::from(override_path));
    }

    let data_root = dirs::data_local_dir().ok_or_else(|| {
        anyhow!(
            "cannot resolve data directory; set FRONTDESK_DB_PATH to a writable database path"
        )
    })?;

    let app_dir = data_root.join(APP_NAME);
    fs::create_dir_all(&app_dir)
        .with_context(|| format!("create data directory {}", app_dir.display()))?;
    Ok(app_dir.join("frontdesk.db"))
}

pub fn validate_db_path(path: &str) -> Result<()> {
    if path.is_empty() {
        bail!("database path must not be empty");
    }
    if path == ":memory:" {
        return Ok(());
    }

    if let Some(index) = path.find("://")
        && index > 0
    {
        let scheme = &path[..index];
        if scheme.chars().all(char::is_alphabetic) {
            bail!(
                "database path {path:?} looks like a URI ({scheme}://); pass a filesystem path instead"
            );
        }
    }

    if path.starts_with("file:") {
        bail!("database path {path:?} uses file: URI syntax; pass a plain filesystem path");
    }

    if path.contains('?') {
        bail!(
            "database path {path:?} contains '?'; remove query parameters and use a plain file path"
        );
    }

    Ok(())
}

fn configure_connection(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA foreign_keys = ON;
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA busy_timeout = 5000;
        ",
    )
    .context("configure sqlite pragmas")
}

fn has_user_tables(conn: &Connection) -> Result<bool> {
    let count: i64 = conn
        .query_row(
            "
            SELECT COUNT(*)
            FROM sqlite_master
            WHERE type = 'table'
              AND name NOT LIKE 'sqlite_%'
            ",
            [],
            |row| row.get(0),
        )
        .context("count user tables")?;
    Ok(count > 0)
}

fn validate_schema(conn: &Connection) -> Result<()> {
    for (table, required_columns) in REQUIRED_SCHEMA {
        let mut statement = conn
            .prepare(&format!("PRAGMA table_info({table})"))
            .with_context(|| format!("inspect table {table}"))?;
        let columns = statement
            .query_map([], |row| row.get::<_, String>(1))
            .with_context(|| format!("read columns of {table}"))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .with_context(|| format!("collect columns of {table}"))?;
        if columns.is_empty() {
            bail!(
                "database is missing required table `{table}`; point [storage].db_path at a frontdesk database"
            );
        }
        for column in *required_columns {
            if !columns.iter().any(|name| name == column) {
                bail!(
                    "table `{table}` is missing column `{column}`; delete the database file and sign in again"
                );
            }
        }
    }
    Ok(())
}

fn format_timestamp(value: OffsetDateTime) -> Result<String> {
    value.format(&Rfc3339).context("format timestamp")
}

fn parse_timestamp(raw: &str) -> Result<OffsetDateTime> {
    OffsetDateTime::parse(raw, &Rfc3339).with_context(|| format!("parse stored timestamp {raw:?}"))
}
