// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use frontdesk_api::{ApiError, Client, into_page_outcome};
use frontdesk_app::{EmployeeId, NewRoom, PageOutcome, PageRequest, RoomNumber, Session};
use std::io::Read;
use std::net::TcpListener;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tiny_http::{Header, Method, Request, Response, Server};
use time::OffsetDateTime;

#[derive(Debug)]
struct Seen {
    method: Method,
    url: String,
    authorization: Option<String>,
    content_type: Option<String>,
    body: String,
}

fn header(request: &Request, name: &'static str) -> Option<String> {
    request
        .headers()
        .iter()
        .find(|header| header.field.equiv(name))
        .map(|header| header.value.as_str().to_owned())
}

/// Serves one canned response per entry and hands back what it saw.
fn serve(responses: Vec<(u16, &'static str)>) -> Result<(String, JoinHandle<Vec<Seen>>)> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}", server.server_addr());

    let handle = thread::spawn(move || {
        let mut seen = Vec::new();
        for (status, body) in responses {
            let mut request = server.recv().expect("request expected");
            let mut payload = String::new();
            request
                .as_reader()
                .read_to_string(&mut payload)
                .expect("read request body");
            seen.push(Seen {
                method: request.method().clone(),
                url: request.url().to_owned(),
                authorization: header(&request, "Authorization"),
                content_type: header(&request, "Content-Type"),
                body: payload,
            });
            let response = Response::from_string(body)
                .with_status_code(status)
                .with_header(
                    Header::from_bytes("Content-Type", "application/json")
                        .expect("valid content type header"),
                );
            request.respond(response).expect("response should succeed");
        }
        seen
    });
    Ok((addr, handle))
}

fn session() -> Result<Session> {
    Session::new(
        "test-token",
        "desk@example.com",
        OffsetDateTime::UNIX_EPOCH,
        None,
    )
}

fn page(offset: usize, limit: usize) -> PageRequest {
    PageRequest {
        generation: 1,
        offset,
        limit,
    }
}

#[test]
fn unreachable_backend_is_a_transport_error() -> Result<()> {
    let client = Client::new("http://127.0.0.1:1", Duration::from_millis(50), true)?;
    let error = client
        .list_rooms(&session()?, page(0, 20), None)
        .expect_err("request should fail for unreachable endpoint");
    assert!(matches!(error, ApiError::Transport { .. }));
    assert!(error.to_string().contains("[server].base_url"));
    Ok(())
}

#[test]
fn invalid_base_url_is_rejected() {
    assert!(Client::new("", Duration::from_secs(1), true).is_err());
    assert!(Client::new("ftp://example.com", Duration::from_secs(1), true).is_err());
    assert!(Client::new("not a url", Duration::from_secs(1), true).is_err());
    assert!(Client::new("http://127.0.0.1:8000", Duration::ZERO, true).is_err());
}

#[test]
fn login_posts_oauth_form() -> Result<()> {
    let (addr, handle) = serve(vec![(
        200,
        r#"{"access_token":"abc.def.ghi","token_type":"bearer"}"#,
    )])?;
    let client = Client::new(&addr, Duration::from_secs(2), false)?;

    let token = client.login("desk@example.com", "p@ss word")?;
    assert_eq!(token, "abc.def.ghi");

    let seen = handle.join().expect("server thread should join");
    assert_eq!(seen[0].method, Method::Post);
    assert_eq!(seen[0].url, "/auth/token");
    assert_eq!(
        seen[0].content_type.as_deref(),
        Some("application/x-www-form-urlencoded")
    );
    assert!(seen[0].authorization.is_none());
    assert!(seen[0].body.contains("username=desk%40example.com"));
    assert!(seen[0].body.contains("password=p%40ss+word"));
    assert!(seen[0].body.contains("grant_type="));
    Ok(())
}

#[test]
fn invalid_login_surfaces_detail_verbatim() -> Result<()> {
    let (addr, handle) = serve(vec![(401, r#"{"detail":"Could not validate user."}"#)])?;
    let client = Client::new(&addr, Duration::from_secs(2), false)?;

    let error = client
        .login("desk@example.com", "wrong")
        .expect_err("bad credentials should fail");
    assert_eq!(
        error,
        ApiError::Rejected {
            status: 401,
            detail: "Could not validate user.".to_owned(),
        }
    );
    assert_eq!(error.to_string(), "Could not validate user.");

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn room_list_sends_paging_filter_and_bearer() -> Result<()> {
    let (addr, handle) = serve(vec![(
        200,
        r#"[{"room_number":101,"room_type":"Suite","room_state":"Available"}]"#,
    )])?;
    let client = Client::new(&addr, Duration::from_secs(2), true)?;

    let rooms = client.list_rooms(&session()?, page(20, 20), Some("Available"))?;
    assert_eq!(rooms.len(), 1);
    assert_eq!(rooms[0].room_number, RoomNumber::new(101));
    assert!(rooms[0].is_available());

    let seen = handle.join().expect("server thread should join");
    assert_eq!(seen[0].method, Method::Get);
    assert_eq!(seen[0].url, "/room/list/?skip=20&limit=20&room_state=Available");
    assert_eq!(seen[0].authorization.as_deref(), Some("Bearer test-token"));
    Ok(())
}

#[test]
fn null_list_body_is_an_empty_page() -> Result<()> {
    let (addr, handle) = serve(vec![(200, "null")])?;
    let client = Client::new(&addr, Duration::from_secs(2), true)?;

    let bookings = client.list_bookings(&session()?, page(0, 20))?;
    assert!(bookings.is_empty());

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn list_rejection_is_unauthorized() -> Result<()> {
    let (addr, handle) = serve(vec![(401, r#"{"detail":"Not authenticated"}"#)])?;
    let client = Client::new(&addr, Duration::from_secs(2), true)?;

    let result = into_page_outcome(client.list_employees(&session()?, page(0, 20)));
    let error = result.expect_err("401 should pass through");
    assert!(error.is_unauthorized());
    assert!(error.to_string().contains("sign in again"));

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn list_not_found_is_an_empty_outcome() -> Result<()> {
    let (addr, handle) = serve(vec![(404, r#"{"detail":"The database is empty."}"#)])?;
    let client = Client::new(&addr, Duration::from_secs(2), true)?;

    let outcome = into_page_outcome(client.list_rooms(&session()?, page(40, 20), None))?;
    assert_eq!(outcome, PageOutcome::NotFound);

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn create_room_posts_json_and_decodes_echo() -> Result<()> {
    let (addr, handle) = serve(vec![(
        201,
        r#"{"room_number":101,"room_type":"Suite","room_state":"Available"}"#,
    )])?;
    let client = Client::new(&addr, Duration::from_secs(2), true)?;

    let created = client.create_room(
        &session()?,
        &NewRoom {
            room_number: RoomNumber::new(101),
            room_type: "Suite".to_owned(),
            room_state: "Available".to_owned(),
        },
    )?;
    assert_eq!(created.room_type, "Suite");

    let seen = handle.join().expect("server thread should join");
    assert_eq!(seen[0].url, "/room/add/");
    let body: serde_json::Value = serde_json::from_str(&seen[0].body)?;
    assert_eq!(
        body,
        serde_json::json!({"room_number":101,"room_type":"Suite","room_state":"Available"})
    );
    Ok(())
}

#[test]
fn create_rejection_joins_validation_messages() -> Result<()> {
    let (addr, handle) = serve(vec![(
        422,
        r#"{"detail":[{"loc":["body","room_type"],"msg":"field required"},{"msg":"invalid state"}]}"#,
    )])?;
    let client = Client::new(&addr, Duration::from_secs(2), true)?;

    let error = client
        .create_room(
            &session()?,
            &NewRoom {
                room_number: RoomNumber::new(7),
                room_type: String::new(),
                room_state: "Available".to_owned(),
            },
        )
        .expect_err("422 should fail");
    assert_eq!(
        error,
        ApiError::Rejected {
            status: 422,
            detail: "field required; invalid state".to_owned(),
        }
    );

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn toggle_puts_query_flag_and_reads_echo() -> Result<()> {
    let (addr, handle) = serve(vec![
        (200, r#"{"emp_id":3,"is_active":true}"#),
        (
            200,
            r#"{"emp_id":3,"emp_details":{"first_name":"A","last_name":"B","is_active":false}}"#,
        ),
    ])?;
    let client = Client::new(&addr, Duration::from_secs(2), true)?;
    let session = session()?;

    let flat = client.set_employee_active(&session, EmployeeId::new(3), true)?;
    assert_eq!(flat.emp_id, EmployeeId::new(3));
    assert!(flat.is_active);

    let nested = client.set_employee_active(&session, EmployeeId::new(3), false)?;
    assert!(!nested.is_active);

    let seen = handle.join().expect("server thread should join");
    assert_eq!(seen[0].method, Method::Put);
    assert_eq!(seen[0].url, "/emp/manage/3?is_active=true");
    assert_eq!(seen[1].url, "/emp/manage/3?is_active=false");
    Ok(())
}

#[test]
fn lookups_tolerate_missing_collections() -> Result<()> {
    let (addr, handle) = serve(vec![
        (404, r#"{"detail":"No id types."}"#),
        (200, r#"[{"room_number":5,"room_type":"Club","room_state":"Available"}]"#),
    ])?;
    let client = Client::new(&addr, Duration::from_secs(2), true)?;
    let session = session()?;

    assert!(client.list_id_types(&session)?.is_empty());
    assert_eq!(client.available_rooms(&session)?.len(), 1);

    let seen = handle.join().expect("server thread should join");
    assert_eq!(seen[0].url, "/gov_id/list/");
    assert_eq!(seen[1].url, "/room/list/?room_state=Available");
    Ok(())
}

#[test]
fn malformed_body_is_a_decode_error() -> Result<()> {
    let (addr, handle) = serve(vec![(200, r#"{"unexpected":true}"#)])?;
    let client = Client::new(&addr, Duration::from_secs(2), true)?;

    let error = client
        .list_employees(&session()?, page(0, 20))
        .expect_err("object body should not decode as a list");
    assert!(matches!(error, ApiError::Decode { .. }));

    handle.join().expect("server thread should join");
    Ok(())
}

/// Accepts connections and either holds them open without answering or
/// closes them at once. Returns the base URL and the accepted count.
fn raw_listener(hang: bool) -> Result<(String, Arc<AtomicUsize>)> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let addr = format!("http://{}", listener.local_addr()?);
    let accepted = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&accepted);
    thread::spawn(move || {
        let mut held = Vec::new();
        for stream in listener.incoming().flatten() {
            counter.fetch_add(1, Ordering::SeqCst);
            if hang {
                held.push(stream);
            }
        }
    });
    Ok((addr, accepted))
}

#[test]
fn silent_backend_times_out_once_without_retry() -> Result<()> {
    let (base_url, accepted) = raw_listener(true)?;
    let timeout = Duration::from_millis(400);
    let client = Client::new(&base_url, timeout, true)?;

    let started = Instant::now();
    let error = client
        .list_rooms(&session()?, page(0, 20), None)
        .expect_err("silent backend should time out");
    let elapsed = started.elapsed();

    assert!(matches!(error, ApiError::Transport { .. }), "{error:?}");
    assert!(error.to_string().contains("timed out"), "{error}");
    assert!(elapsed < timeout * 2, "took {elapsed:?} for a {timeout:?} bound");
    assert_eq!(accepted.load(Ordering::SeqCst), 1);
    Ok(())
}

#[test]
fn dropped_connection_is_retried_exactly_once() -> Result<()> {
    let (base_url, accepted) = raw_listener(false)?;
    let client = Client::new(&base_url, Duration::from_secs(2), true)?;

    let error = client
        .list_employees(&session()?, page(0, 20))
        .expect_err("closed connections should fail");
    assert!(matches!(error, ApiError::Transport { .. }), "{error:?}");
    assert_eq!(accepted.load(Ordering::SeqCst), 2);
    Ok(())
}

#[test]
fn retry_can_be_disabled() -> Result<()> {
    let (base_url, accepted) = raw_listener(false)?;
    let client = Client::new(&base_url, Duration::from_secs(2), false)?;

    let error = client
        .list_employees(&session()?, page(0, 20))
        .expect_err("closed connections should fail");
    assert!(matches!(error, ApiError::Transport { .. }), "{error:?}");
    assert_eq!(accepted.load(Ordering::SeqCst), 1);
    Ok(())
}
