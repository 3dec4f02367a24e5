mod common;

use anyhow::Result;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use serde_json::json;

use common::{assert_error, token, TestApp};

#[tokio::test]
async fn registration_needs_only_a_verified_subject() -> Result<()> {
    let app = TestApp::new();
    let token = token("user_ada");
    let payload = json!({ "display_name": "Ada", "email": "ada@example.com" });

    let (status, created) = app.post("/accounts", &token, payload.clone()).await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["data"]["external_subject"], "user_ada");

    let (status, again) = app.post("/accounts", &token, payload).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again["data"]["id"], created["data"]["id"]);
    Ok(())
}

#[tokio::test]
async fn registration_ignores_client_subject() -> Result<()> {
    let app = TestApp::new();
    let (status, body) = app
        .post(
            "/accounts",
            &token("user_real"),
            json!({ "display_name": "Eve", "email": "eve@example.com", "external_subject": "user_other" }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["external_subject"], "user_real");
    Ok(())
}

#[tokio::test]
async fn registration_validates_fields_in_order() -> Result<()> {
    let app = TestApp::new();
    let token = token("user_ada");

    let (status, body) = app.post("/accounts", &token, json!({})).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "display_name is required");

    let (_, body) = app.post("/accounts", &token, json!({ "display_name": "Ada" })).await?;
    assert_eq!(body["message"], "email is required");
    Ok(())
}

#[tokio::test]
async fn malformed_json_is_rejected() -> Result<()> {
    let app = TestApp::new();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/accounts")
        .header(header::AUTHORIZATION, format!("Bearer {}", token("user_ada")))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"display_name\": "))?;

    let (status, body) = app.send(request).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_error(&body, "INVALID_JSON");
    Ok(())
}

#[tokio::test]
async fn accounts_are_visible_only_to_their_subject() -> Result<()> {
    let app = TestApp::new();
    let (a_token, a_id) = app.signup("user_a").await?;
    let (b_token, _) = app.signup("user_b").await?;

    let (status, list) = app.get("/accounts", &a_token).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["data"].as_array().map(Vec::len), Some(1));
    assert_eq!(list["data"][0]["id"], a_id.as_str());

    let (status, mine) = app.get(&format!("/accounts/{}", a_id), &a_token).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine["data"]["display_name"], "user_a");

    let (status, body) = app.get(&format!("/accounts/{}", a_id), &b_token).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_error(&body, "NOT_FOUND");

    let (status, _) = app
        .put(
            &format!("/accounts/{}", a_id),
            &b_token,
            json!({ "display_name": "Mallory", "email": "m@example.com" }),
        )
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn update_and_delete_account() -> Result<()> {
    let app = TestApp::new();
    let (token, id) = app.signup("user_a").await?;
    let uri = format!("/accounts/{}", id);

    let (status, updated) = app
        .put(&uri, &token, json!({ "name": "Alice", "email": "alice@example.com" }))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["data"]["display_name"], "Alice");
    assert_eq!(updated["data"]["external_subject"], "user_a");

    let (status, body) = app.delete(&uri, &token).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_null());

    let (status, _) = app.delete(&uri, &token).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The subject no longer maps to an account
    let (status, _) = app.get("/decks", &token).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn malformed_account_id_is_bad_request() -> Result<()> {
    let app = TestApp::new();
    let (token, _) = app.signup("user_a").await?;

    let (status, body) = app.get("/accounts/not-a-uuid", &token).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid account id format");
    Ok(())
}
