mod common;

use std::time::{Duration, Instant};

use axum::http::StatusCode;
use common::{app, app_with_timeout, get, get_json, FakeDocument, FakeOffice};
use cuecard::bridge::SlideNotesCache;
use serde_json::json;

fn notes(entries: &[&str]) -> SlideNotesCache {
    SlideNotesCache::new(entries.iter().map(|s| s.to_string()).collect())
}

#[tokio::test]
async fn test_health() {
    let office = FakeOffice::unreachable();
    let app = app(&office, notes(&[]));

    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"OK");
}

#[tokio::test]
async fn test_three_slide_walkthrough() {
    let office = FakeOffice::with_document(FakeDocument::with_notes(&["A", "B", "C"]).running());
    let app = app(&office, notes(&["A", "B", "C"]));

    let (status, body) = get_json(&app, "/all_notes").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!(["A", "B", "C"]));

    let (status, body) = get_json(&app, "/state").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "slide_index": 0 }));

    let (status, body) = get_json(&app, "/control/next").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "advanced to next" }));

    let (_, body) = get_json(&app, "/state").await;
    assert_eq!(body, json!({ "slide_index": 1 }));
}

#[tokio::test]
async fn test_next_then_previous_returns_to_same_index() {
    let mut document = FakeDocument::with_notes(&["A", "B", "C"]).running();
    document.slide_index = 1;
    let office = FakeOffice::with_document(document);
    let app = app(&office, notes(&["A", "B", "C"]));

    let (status, _) = get(&app, "/control/next").await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = get_json(&app, "/control/previous").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "returned to previous" }));

    let (_, body) = get_json(&app, "/state").await;
    assert_eq!(body, json!({ "slide_index": 1 }));
    assert_eq!(
        office.state().commands,
        vec!["next", "previous", "index"],
        "each request issues exactly one controller call"
    );
}

#[tokio::test]
async fn test_no_running_show_is_404_everywhere() {
    let office = FakeOffice::with_document(FakeDocument::with_notes(&["A"]));
    let app = app(&office, notes(&["A"]));

    for uri in ["/control/next", "/control/previous", "/state"] {
        let (status, body) = get_json(&app, uri).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        assert_eq!(body, json!({ "detail": "Slideshow not running or not found." }));
    }
    assert!(office.state().commands.is_empty());
}

#[tokio::test]
async fn test_unreachable_office_gives_identical_404_bodies() {
    let office = FakeOffice::unreachable();
    let app = app(&office, notes(&["A"]));

    let mut bodies = Vec::new();
    for uri in ["/control/next", "/control/previous", "/state"] {
        let (status, body) = get(&app, uri).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        bodies.push(body);
    }
    assert_eq!(bodies[0], bodies[1]);
    assert_eq!(bodies[1], bodies[2]);

    // notes do not need the office
    let (status, body) = get_json(&app, "/all_notes").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!(["A"]));
}

#[tokio::test]
async fn test_wrong_document_kind_is_404() {
    let office = FakeOffice::with_document(FakeDocument::spreadsheet());
    let app = app(&office, notes(&[]));

    let (status, body) = get_json(&app, "/control/next").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "detail": "Slideshow not running or not found." }));
}

#[tokio::test]
async fn test_closed_document_is_404() {
    let office = FakeOffice::with_document(FakeDocument::with_notes(&["A"]).running());
    office.state().document = None;
    let app = app(&office, notes(&["A"]));

    let (status, _) = get(&app, "/state").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_hung_office_is_cut_off_with_standard_404() {
    let office = FakeOffice::with_document(FakeDocument::with_notes(&["A"]).running());
    office.state().hang = true;
    let app = app_with_timeout(&office, notes(&["A"]), Duration::from_millis(50));

    let started = Instant::now();
    let (status, body) = get_json(&app, "/control/next").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "detail": "Slideshow not running or not found." }));
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(office.state().commands.is_empty());
}

#[tokio::test]
async fn test_every_request_negotiates_afresh() {
    let office = FakeOffice::with_document(FakeDocument::with_notes(&["A", "B"]).running());
    let app = app(&office, notes(&["A", "B"]));

    get(&app, "/state").await;
    get(&app, "/control/next").await;
    get(&app, "/all_notes").await;

    assert_eq!(office.state().connects, 2);
}

#[tokio::test]
async fn test_notes_are_not_refreshed() {
    let office = FakeOffice::with_document(FakeDocument::with_notes(&["old"]).running());
    let app = app(&office, notes(&["old"]));

    let (_, first) = get(&app, "/all_notes").await;
    office.state().document = Some(FakeDocument::with_notes(&["edited", "added"]).running());
    let (_, second) = get(&app, "/all_notes").await;

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_cors_allows_other_origins() {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    let office = FakeOffice::unreachable();
    let app = app(&office, notes(&[]));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/all_notes")
                .header("origin", "http://phone.local")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "*"
    );
}
