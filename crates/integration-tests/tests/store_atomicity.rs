//! A failed ownership-list write must leave neither half of a dual-write
//! behind.

use std::sync::Arc;

use axum::http::StatusCode;
use integration_tests::{authored_book, external_book, ids, TestApp};
use tokio::task::JoinSet;

#[tokio::test]
async fn aborted_create_leaves_no_item() {
    let app = TestApp::new();
    let ann = app.signup("Ann", "ann@example.com").await;

    app.store.fail_next_owner_write();
    let response = app.post("/api/favourites", &ann.token, external_book(&ann, "b1")).await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.body["code"], "store_failure");
    assert!(!response.body["message"].as_str().unwrap().contains("list write"));

    let all = app.get("/api/favourites", &ann.token).await;
    assert!(ids(&all.body, "favourites").is_empty());
    let owned = app.get(&format!("/api/favourites/user/{}", ann.user_id), &ann.token).await;
    assert!(ids(&owned.body, "favourites").is_empty());

    // The same catalog id is still free afterwards.
    app.create("favourites", &ann, external_book(&ann, "b1")).await;
}

#[tokio::test]
async fn aborted_delete_keeps_the_item() {
    let app = TestApp::new();
    let ann = app.signup("Ann", "ann@example.com").await;
    let id = app.create("books", &ann, authored_book(&ann, "Sticky")).await;

    app.store.fail_next_owner_write();
    let response = app.delete(&format!("/api/books/{id}"), &ann.token).await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);

    assert_eq!(app.get(&format!("/api/books/{id}"), &ann.token).await.status, StatusCode::OK);
    let owned = app.get(&format!("/api/books/user/{}", ann.user_id), &ann.token).await;
    assert_eq!(ids(&owned.body, "books"), vec![id]);
}

#[tokio::test]
async fn user_view_mirrors_the_ownership_lists() {
    let app = TestApp::new();
    let ann = app.signup("Ann", "ann@example.com").await;
    let book = app.create("books", &ann, authored_book(&ann, "One")).await;
    let recent = app.create("recents", &ann, external_book(&ann, "r1")).await;

    let users = app.send(axum::http::Method::GET, "/api/users", None, None).await;
    let view = &users.body["users"][0];
    assert_eq!(view["books"], serde_json::json!([book]));
    assert_eq!(view["recents"], serde_json::json!([recent]));
    assert_eq!(view["favourites"], serde_json::json!([]));
    assert!(view.get("password_hash").is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creates_all_land_in_the_owner_list() {
    const WRITERS: usize = 50;

    let app = Arc::new(TestApp::new());
    let ann = app.signup("Ann", "ann@example.com").await;

    let mut writers = JoinSet::new();
    for n in 0..WRITERS {
        let app = Arc::clone(&app);
        let ann = ann.clone();
        writers.spawn(async move {
            let response = app.post("/api/recents", &ann.token, external_book(&ann, &format!("r{n}"))).await;
            assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
            response.body["book"]["id"].as_str().unwrap().to_string()
        });
    }
    let mut created = Vec::with_capacity(WRITERS);
    while let Some(id) = writers.join_next().await {
        created.push(id.unwrap());
    }

    let owned = app.get(&format!("/api/recents/user/{}", ann.user_id), &ann.token).await;
    let mut listed = ids(&owned.body, "recents");
    assert_eq!(listed.len(), WRITERS);
    listed.sort();
    created.sort();
    assert_eq!(listed, created);

    let all = app.get("/api/recents", &ann.token).await;
    assert_eq!(ids(&all.body, "recents").len(), WRITERS);
}
