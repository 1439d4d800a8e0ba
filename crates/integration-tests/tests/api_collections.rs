use axum::http::{Method, StatusCode};
use integration_tests::{authored_book, external_book, ids, TestApp};
use serde_json::json;

#[tokio::test]
async fn created_favourite_is_readable_and_listed() {
    let app = TestApp::new();
    let ann = app.signup("Ann", "ann@example.com").await;

    let response = app.post("/api/favourites", &ann.token, external_book(&ann, "b1")).await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["message"], "Added book to Favourites successfully");
    assert_eq!(response.body["book"]["user"], ann.user_id.as_str());
    let id = response.body["book"]["id"].as_str().unwrap().to_string();

    let fetched = app.get(&format!("/api/favourites/{id}"), &ann.token).await;
    assert_eq!(fetched.status, StatusCode::OK);
    assert_eq!(fetched.body["book"]["book_id"], "b1");

    let listed = app.get(&format!("/api/favourites/user/{}", ann.user_id), &ann.token).await;
    assert_eq!(listed.status, StatusCode::OK);
    assert_eq!(ids(&listed.body, "favourites"), vec![id]);
}

#[tokio::test]
async fn books_list_in_insertion_order() {
    let app = TestApp::new();
    let ann = app.signup("Ann", "ann@example.com").await;

    let first = app.create("books", &ann, authored_book(&ann, "First")).await;
    let second = app.create("books", &ann, authored_book(&ann, "Second")).await;
    let third = app.create("books", &ann, authored_book(&ann, "Third")).await;

    let listed = app.get(&format!("/api/books/user/{}", ann.user_id), &ann.token).await;
    assert_eq!(ids(&listed.body, "books"), vec![first, second, third]);
}

#[tokio::test]
async fn recents_list_newest_first() {
    let app = TestApp::new();
    let ann = app.signup("Ann", "ann@example.com").await;

    let older = app.create("recents", &ann, external_book(&ann, "r1")).await;
    let newer = app.create("recents", &ann, external_book(&ann, "r2")).await;

    let listed = app.get(&format!("/api/recents/user/{}", ann.user_id), &ann.token).await;
    assert_eq!(ids(&listed.body, "recents"), vec![newer, older]);
}

#[tokio::test]
async fn list_all_spans_every_owner() {
    let app = TestApp::new();
    let ann = app.signup("Ann", "ann@example.com").await;
    let bob = app.signup("Bob", "bob@example.com").await;

    app.create("favourites", &ann, external_book(&ann, "b1")).await;
    app.create("favourites", &bob, external_book(&bob, "b2")).await;

    let listed = app.get("/api/favourites", &ann.token).await;
    assert_eq!(listed.status, StatusCode::OK);
    assert_eq!(ids(&listed.body, "favourites").len(), 2);
}

#[tokio::test]
async fn deleted_item_is_gone_from_item_and_list() {
    let app = TestApp::new();
    let ann = app.signup("Ann", "ann@example.com").await;
    let keep = app.create("books", &ann, authored_book(&ann, "Keep")).await;
    let gone = app.create("books", &ann, authored_book(&ann, "Gone")).await;

    let response = app.delete(&format!("/api/books/{gone}"), &ann.token).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["message"], "Deleted book successfully");
    assert_eq!(response.body["book"]["id"], gone.as_str());

    let fetched = app.get(&format!("/api/books/{gone}"), &ann.token).await;
    assert_eq!(fetched.status, StatusCode::NOT_FOUND);

    let listed = app.get(&format!("/api/books/user/{}", ann.user_id), &ann.token).await;
    assert_eq!(ids(&listed.body, "books"), vec![keep]);
}

#[tokio::test]
async fn missing_book_is_not_found() {
    let app = TestApp::new();
    let ann = app.signup("Ann", "ann@example.com").await;

    let response = app.get("/api/books/0190a3c4-6f1e-7cc0-a000-000000000000", &ann.token).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["code"], "not_found");
    assert_eq!(response.body["message"], "Could not find book for the provided id.");

    let response = app.get("/api/books/not-an-id", &ann.token).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn owner_updates_allowed_fields() {
    let app = TestApp::new();
    let ann = app.signup("Ann", "ann@example.com").await;
    let id = app.create("recents", &ann, external_book(&ann, "r1")).await;

    let response = app
        .patch(&format!("/api/recents/{id}"), &ann.token, json!({ "title": "Renamed", "subtitle": "Second edition" }))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["message"], "Updated book successfully");
    assert_eq!(response.body["book"]["title"], "Renamed");
    assert_eq!(response.body["book"]["subtitle"], "Second edition");
    assert_eq!(response.body["book"]["authors"], "Au");
}

#[tokio::test]
async fn patch_cannot_reassign_owner_or_add_fields() {
    let app = TestApp::new();
    let ann = app.signup("Ann", "ann@example.com").await;
    let bob = app.signup("Bob", "bob@example.com").await;
    let id = app.create("books", &ann, authored_book(&ann, "Mine")).await;

    let response = app
        .patch(&format!("/api/books/{id}"), &ann.token, json!({ "user": bob.user_id, "colour": "red" }))
        .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    let message = response.body["message"].as_str().unwrap();
    assert!(message.contains("`user` cannot be modified"), "{message}");
    assert!(message.contains("`colour` is not an updatable field"), "{message}");

    let fetched = app.get(&format!("/api/books/{id}"), &ann.token).await;
    assert_eq!(fetched.body["book"]["user"], ann.user_id.as_str());
}

#[tokio::test]
async fn create_reports_every_missing_field() {
    let app = TestApp::new();
    let ann = app.signup("Ann", "ann@example.com").await;

    let response = app.post("/api/favourites", &ann.token, json!({ "user": ann.user_id, "title": "T" })).await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.body["code"], "validation_failed");
    let message = response.body["message"].as_str().unwrap();
    for field in ["book_id", "authors", "image", "url"] {
        assert!(message.contains(&format!("{field} is required")), "{message}");
    }
}

#[tokio::test]
async fn non_object_body_is_a_validation_failure() {
    let app = TestApp::new();
    let ann = app.signup("Ann", "ann@example.com").await;

    let response = app.post("/api/books", &ann.token, json!(["not", "an", "object"])).await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn listing_an_unknown_user_is_rejected() {
    let app = TestApp::new();
    let ann = app.signup("Ann", "ann@example.com").await;

    // The gate compares identities before any lookup happens.
    let response = app.get("/api/books/user/0190a3c4-6f1e-7cc0-a000-000000000000", &ann.token).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unsupported_method_answers_405_with_a_body() {
    let app = TestApp::new();
    let ann = app.signup("Ann", "ann@example.com").await;
    let id = app.create("favourites", &ann, external_book(&ann, "b1")).await;

    let body = external_book(&ann, "b2");
    let response = app.send(Method::PUT, &format!("/api/favourites/{id}"), Some(&ann.token), Some(body)).await;
    assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.body["code"], "method_not_allowed");
    assert!(response.body["message"].is_string());

    // Nothing was written.
    let fetched = app.get(&format!("/api/favourites/{id}"), &ann.token).await;
    assert_eq!(fetched.body["book"]["book_id"], "b1");
}
