// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use frontdesk_app::{FixedClock, RoomStateFilter, ScreenKind, Session};
use frontdesk_store::{Store, validate_db_path};
use time::{Duration, OffsetDateTime};

fn issued_at() -> Result<OffsetDateTime> {
    Ok(OffsetDateTime::from_unix_timestamp(1_700_000_000)?)
}

#[test]
fn validate_db_path_rejects_uri_forms() {
    assert!(validate_db_path("").is_err());
    assert!(validate_db_path("file:test.db").is_err());
    assert!(validate_db_path("https://example.com/db.sqlite").is_err());
    assert!(validate_db_path("db.sqlite?mode=ro").is_err());
    assert!(validate_db_path(":memory:").is_ok());
    assert!(validate_db_path("/tmp/frontdesk.db").is_ok());
}

#[test]
fn empty_store_has_no_session() -> Result<()> {
    let store = Store::open_memory()?;
    store.bootstrap()?;
    assert!(store.load_session()?.is_none());
    assert!(!store.clear_session()?);
    Ok(())
}

#[test]
fn session_survives_reopen() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("frontdesk.db");
    let expires = issued_at()? + Duration::hours(8);
    let session = Session::new("token-1", "desk@example.com", issued_at()?, Some(expires))?;

    {
        let store = Store::open(&path)?;
        store.bootstrap()?;
        store.save_session(&session)?;
    }

    let store = Store::open(&path)?;
    store.bootstrap()?;
    let loaded = store.load_session()?.expect("session should persist");
    assert_eq!(loaded, session);
    assert_eq!(loaded.authorization(), "Bearer token-1");
    Ok(())
}

#[test]
fn saving_again_replaces_the_session() -> Result<()> {
    let store = Store::open_memory()?;
    store.bootstrap()?;
    store.save_session(&Session::new("old", "a@example.com", issued_at()?, None)?)?;
    store.save_session(&Session::new("new", "b@example.com", issued_at()?, None)?)?;

    let loaded = store.load_session()?.expect("session stored");
    assert_eq!(loaded.token(), "new");
    assert_eq!(loaded.username(), "b@example.com");
    Ok(())
}

#[test]
fn clear_session_forgets_token() -> Result<()> {
    let store = Store::open_memory()?;
    store.bootstrap()?;
    store.save_session(&Session::new("token", "desk", issued_at()?, None)?)?;

    assert!(store.clear_session()?);
    assert!(store.load_session()?.is_none());
    Ok(())
}

#[test]
fn expired_session_is_discarded_on_load() -> Result<()> {
    let store = Store::open_memory()?;
    store.bootstrap()?;
    let expires = issued_at()? + Duration::hours(1);
    store.save_session(&Session::new("token", "desk", issued_at()?, Some(expires))?)?;

    let before = FixedClock(issued_at()? + Duration::minutes(30));
    assert!(store.load_live_session(&before)?.is_some());

    let after = FixedClock(expires + Duration::seconds(1));
    assert!(store.load_live_session(&after)?.is_none());
    assert!(store.load_session()?.is_none(), "expired session is removed");
    Ok(())
}

#[test]
fn session_without_expiry_never_expires_locally() -> Result<()> {
    let store = Store::open_memory()?;
    store.bootstrap()?;
    store.save_session(&Session::new("opaque", "desk", issued_at()?, None)?)?;

    let far_future = FixedClock(issued_at()? + Duration::days(3650));
    assert!(store.load_live_session(&far_future)?.is_some());
    Ok(())
}

#[test]
fn room_filter_setting_round_trips() -> Result<()> {
    let store = Store::open_memory()?;
    store.bootstrap()?;
    assert_eq!(store.get_room_filter()?, RoomStateFilter::All);

    store.put_room_filter(RoomStateFilter::Maintenance)?;
    assert_eq!(store.get_room_filter()?, RoomStateFilter::Maintenance);

    store.put_room_filter(RoomStateFilter::Available)?;
    assert_eq!(store.get_room_filter()?, RoomStateFilter::Available);
    Ok(())
}

#[test]
fn start_screen_setting_is_optional() -> Result<()> {
    let store = Store::open_memory()?;
    store.bootstrap()?;
    assert_eq!(store.get_start_screen()?, None);

    store.put_start_screen(ScreenKind::Rooms)?;
    assert_eq!(store.get_start_screen()?, Some(ScreenKind::Rooms));
    Ok(())
}

#[test]
fn bootstrap_rejects_foreign_database() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("other.db");
    {
        let conn = rusqlite::Connection::open(&path)?;
        conn.execute_batch("CREATE TABLE notes (id INTEGER PRIMARY KEY, body TEXT);")?;
    }

    let store = Store::open(&path)?;
    let error = store.bootstrap().expect_err("foreign schema should be rejected");
    assert!(error.to_string().contains("missing required table `sessions`"));
    Ok(())
}

#[test]
fn bootstrap_is_idempotent() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("frontdesk.db");
    let store = Store::open(&path)?;
    store.bootstrap()?;
    store.bootstrap()?;
    store.put_room_filter(RoomStateFilter::Occupied)?;
    drop(store);

    let reopened = Store::open(&path)?;
    reopened.bootstrap()?;
    assert_eq!(reopened.get_room_filter()?, RoomStateFilter::Occupied);
    Ok(())
}
