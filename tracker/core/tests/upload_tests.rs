// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Image uploads (`POST /uploads`) and chore attachments
//! (`POST /chores/{id}/attachments`).

mod common;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use base64::Engine;
use chore_tracker_core::domain::attachment::{MAX_ATTACHMENT_BYTES, PNG_MAGIC};
use common::{assert_problem, TestApp, API_KEY};
use serde_json::json;

const BOUNDARY: &str = "chore-tracker-test-boundary";

fn png(len: usize) -> Vec<u8> {
    let mut data = PNG_MAGIC.to_vec();
    data.resize(len.max(PNG_MAGIC.len()), 0);
    data
}

fn multipart_request(field: &str, filename: &str, content_type: &str, data: &[u8]) -> Request<Body> {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::post("/uploads")
        .header("x-api-key", API_KEY)
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(body))
        .unwrap()
}

fn encode(data: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(data)
}

#[tokio::test]
async fn test_png_upload_is_stored_under_generated_name() {
    let app = TestApp::new();
    let response = app
        .send(multipart_request("file", "holiday.png", "image/png", &png(64)))
        .await;

    assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
    let id = response.body["id"].as_str().unwrap();
    assert!(uuid::Uuid::parse_str(id).is_ok());
    assert_eq!(response.body["mime"], "image/png");
    assert_eq!(response.body["size"], 64);

    let filename = response.body["filename"].as_str().unwrap();
    assert!(filename.starts_with(id));
    assert_ne!(filename, "holiday.png");
    let stored = std::fs::read(app.upload_dir().join(filename)).unwrap();
    assert_eq!(stored, png(64));
}

#[tokio::test]
async fn test_oversized_upload_is_rejected() {
    let app = TestApp::new();
    let response = app
        .send(multipart_request("file", "big.png", "image/png", &png(MAX_ATTACHMENT_BYTES + 1)))
        .await;

    assert_problem(&response, StatusCode::PAYLOAD_TOO_LARGE, "upload_too_large");
}

#[tokio::test]
async fn test_non_image_upload_reports_received_type() {
    let app = TestApp::new();
    let response = app
        .send(multipart_request("file", "notes.png", "text/plain", b"just some text"))
        .await;

    assert_problem(&response, StatusCode::UNSUPPORTED_MEDIA_TYPE, "upload_bad_type");
    assert_eq!(response.body["received_type"], "text/plain");
}

#[tokio::test]
async fn test_traversal_filename_is_rejected() {
    let app = TestApp::new();
    let response = app
        .send(multipart_request("file", "../../escape.png", "image/png", &png(32)))
        .await;

    assert_problem(&response, StatusCode::BAD_REQUEST, "upload_bad_name");
    assert!(!app.dir.path().join("escape.png").exists());
}

#[tokio::test]
async fn test_missing_file_field_is_unprocessable() {
    let app = TestApp::new();
    let response = app
        .send(multipart_request("other", "a.png", "image/png", &png(32)))
        .await;

    assert_problem(&response, StatusCode::UNPROCESSABLE_ENTITY, "validation_error");
}

#[tokio::test]
async fn test_non_multipart_body_is_malformed() {
    let app = TestApp::new();
    let response = app
        .send(
            Request::post("/uploads")
                .header("x-api-key", API_KEY)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await;

    assert_problem(&response, StatusCode::BAD_REQUEST, "upload_malformed");
}

async fn seeded_chore(app: &TestApp) -> serde_json::Value {
    app.seed_assignment().await["chore_id"].clone()
}

async fn attach(app: &TestApp, chore_id: &serde_json::Value, content: String) -> common::TestResponse {
    app.call(
        Method::POST,
        &format!("/chores/{chore_id}/attachments"),
        Some(json!({ "content": content })),
    )
    .await
}

#[tokio::test]
async fn test_attachment_is_stored() {
    let app = TestApp::new();
    let chore_id = seeded_chore(&app).await;

    let response = attach(&app, &chore_id, encode(&png(128))).await;

    assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
    assert_eq!(response.body["content_type"], "image/png");
    assert_eq!(response.body["size"], 128);
    let filename = response.body["filename"].as_str().unwrap();
    assert!(filename.ends_with(".png"));
    assert!(app.attachments_dir().join(filename).is_file());
}

#[tokio::test]
async fn test_attachment_rejections() {
    let app = TestApp::new();
    let chore_id = seeded_chore(&app).await;

    let empty = attach(&app, &chore_id, String::new()).await;
    assert_problem(&empty, StatusCode::BAD_REQUEST, "attachment_empty");

    let garbage = attach(&app, &chore_id, "***not base64***".to_string()).await;
    assert_problem(&garbage, StatusCode::BAD_REQUEST, "attachment_invalid_encoding");

    let text = attach(&app, &chore_id, encode(b"plain text, not an image")).await;
    assert_problem(&text, StatusCode::UNSUPPORTED_MEDIA_TYPE, "attachment_type_unsupported");

    let too_big = attach(&app, &chore_id, encode(&png(MAX_ATTACHMENT_BYTES + 1))).await;
    assert_problem(&too_big, StatusCode::PAYLOAD_TOO_LARGE, "attachment_too_large");
}

#[tokio::test]
async fn test_attachment_for_unknown_chore_is_not_found() {
    let app = TestApp::new();
    let response = attach(&app, &json!(404), encode(&png(16))).await;

    assert_problem(&response, StatusCode::NOT_FOUND, "chore_not_found");
}
