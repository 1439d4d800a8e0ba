//! # Collection handlers
//!
//! One set of generic handlers serves books, favourites and recents. Each
//! collection plugs in through [`HttpItem`], which picks its service out of
//! [`AppState`].

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use domains::payload::{self, JsonMap};
use domains::{AppError, Book, Collection, Favourite, ItemId, OwnedItem, Recent, UserId};
use serde_json::{json, Value};
use services::ItemService;

use crate::auth::Caller;
use crate::error::ApiError;
use crate::state::AppState;

const UPDATED: &str = "Updated book successfully";
const DELETED: &str = "Deleted book successfully";

/// An [`OwnedItem`] exposed over HTTP.
pub trait HttpItem: OwnedItem {
    fn service(state: &AppState) -> &ItemService<Self>;
}

impl HttpItem for Book {
    fn service(state: &AppState) -> &ItemService<Self> {
        &state.books
    }
}

impl HttpItem for Favourite {
    fn service(state: &AppState) -> &ItemService<Self> {
        &state.favourites
    }
}

impl HttpItem for Recent {
    fn service(state: &AppState) -> &ItemService<Self> {
        &state.recents
    }
}

fn added_message(collection: Collection) -> &'static str {
    match collection {
        Collection::Books => "Added book to Books successfully",
        Collection::Favourites => "Added book to Favourites successfully",
        Collection::Recents => "Added book to Recents successfully",
    }
}

// Unparseable ids cannot name anything, so they read as missing.
fn item_id<T: OwnedItem>(raw: &str) -> Result<ItemId, ApiError> {
    raw.parse().map_err(|_| AppError::not_found(T::COLLECTION.entity(), raw).into())
}

fn user_id(raw: &str) -> Result<UserId, ApiError> {
    raw.parse().map_err(|_| AppError::not_found("User", raw).into())
}

fn envelope<T: OwnedItem>(items: Vec<T>) -> Json<Value> {
    let mut body = serde_json::Map::new();
    body.insert(T::COLLECTION.as_str().to_string(), json!(items));
    Json(Value::Object(body))
}

pub async fn get_one<T: HttpItem>(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>, ApiError> {
    let item = T::service(&state).get(item_id::<T>(&id)?).await?;
    Ok(Json(json!({ "book": item })))
}

pub async fn list_all<T: HttpItem>(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let items = T::service(&state).list_all().await?;
    Ok(envelope(items))
}

pub async fn list_by_user<T: HttpItem>(
    State(state): State<AppState>,
    caller: Caller,
    Path(uid): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let uid = user_id(&uid)?;
    caller.ensure_is(uid)?;
    let items = T::service(&state).list_by_user(uid).await?;
    Ok(envelope(items))
}

pub async fn create<T: HttpItem>(
    State(state): State<AppState>,
    caller: Caller,
    body: Result<Json<JsonMap>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let Json(fields) = body?;
    let (owner, draft) = payload::parse_create::<T>(&fields)?;
    caller.ensure_is(owner)?;

    let item = T::service(&state).create(owner, draft).await?;
    Ok((StatusCode::CREATED, Json(json!({ "book": item, "message": added_message(T::COLLECTION) }))))
}

pub async fn update<T: HttpItem>(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
    body: Result<Json<JsonMap>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let id = item_id::<T>(&id)?;
    let Json(fields) = body?;
    let patch = payload::parse_patch::<T>(&fields)?;

    let item = T::service(&state).update(id, patch, caller.user_id).await?;
    Ok(Json(json!({ "book": item, "message": UPDATED })))
}

pub async fn delete<T: HttpItem>(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let item = T::service(&state).delete(item_id::<T>(&id)?, caller.user_id).await?;
    Ok(Json(json!({ "book": item, "message": DELETED })))
}
