//! Field-by-field validation of JSON request bodies into drafts and patches.
//!
//! Every check runs; failures are collected so the caller sees all of them
//! at once.

use serde_json::{Map, Value};

use crate::error::AppError;
use crate::models::{BookPatch, ExternalBook, ExternalBookPatch, OwnedItem, UserId};

pub type JsonMap = Map<String, Value>;

/// Fields a patch may never touch.
const IMMUTABLE_FIELDS: &[&str] = &["id", "user"];

const EXTERNAL_BOOK_FIELDS: &[&str] = &["book_id", "title", "subtitle", "authors", "image", "url"];

/// Splits a create body into its owner and a validated draft.
pub fn parse_create<T: OwnedItem>(fields: &JsonMap) -> Result<(UserId, T::Draft), AppError> {
    let mut errors = Vec::new();
    let owner = match owner_field(fields) {
        Ok(owner) => Some(owner),
        Err(msg) => {
            errors.push(msg);
            None
        }
    };
    let draft = T::parse_draft(fields).map_err(|msgs| errors.extend(msgs)).ok();

    match (owner, draft) {
        (Some(owner), Some(draft)) if errors.is_empty() => Ok((owner, draft)),
        _ => Err(AppError::ValidationFailed(errors)),
    }
}

pub fn parse_patch<T: OwnedItem>(fields: &JsonMap) -> Result<T::Patch, AppError> {
    T::parse_patch(fields).map_err(AppError::ValidationFailed)
}

fn owner_field(fields: &JsonMap) -> Result<UserId, String> {
    match fields.get("user") {
        Some(Value::String(raw)) if !raw.trim().is_empty() => {
            raw.parse().map_err(|_| "user must be a valid user id".to_string())
        }
        _ => Err("user is required".to_string()),
    }
}

fn required_string(fields: &JsonMap, name: &str, errors: &mut Vec<String>) -> Option<String> {
    match fields.get(name) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
        Some(Value::String(_)) | Some(Value::Null) | None => {
            errors.push(format!("{name} is required"));
            None
        }
        Some(_) => {
            errors.push(format!("{name} must be a string"));
            None
        }
    }
}

fn optional_string(fields: &JsonMap, name: &str, errors: &mut Vec<String>) -> Option<String> {
    match fields.get(name) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            errors.push(format!("{name} must be a string"));
            None
        }
    }
}

fn reject_unlisted(fields: &JsonMap, allowed: &[&str], errors: &mut Vec<String>) {
    for key in fields.keys() {
        if IMMUTABLE_FIELDS.contains(&key.as_str()) {
            errors.push(format!("`{key}` cannot be modified"));
        } else if !allowed.contains(&key.as_str()) {
            errors.push(format!("`{key}` is not an updatable field"));
        }
    }
}

pub(crate) fn book_draft(fields: &JsonMap) -> Result<Value, Vec<String>> {
    match fields.get("data") {
        Some(data @ Value::Object(_)) => Ok(data.clone()),
        None | Some(Value::Null) => Err(vec!["data is required".to_string()]),
        Some(_) => Err(vec!["data must be an object".to_string()]),
    }
}

pub(crate) fn book_patch(fields: &JsonMap) -> Result<BookPatch, Vec<String>> {
    let mut errors = Vec::new();
    reject_unlisted(fields, &["data"], &mut errors);
    let data = match fields.get("data") {
        None => None,
        Some(data @ Value::Object(_)) => Some(data.clone()),
        Some(_) => {
            errors.push("data must be an object".to_string());
            None
        }
    };
    if errors.is_empty() {
        Ok(BookPatch { data })
    } else {
        Err(errors)
    }
}

pub(crate) fn external_book_draft(fields: &JsonMap) -> Result<ExternalBook, Vec<String>> {
    let mut errors = Vec::new();
    let book_id = required_string(fields, "book_id", &mut errors);
    let title = required_string(fields, "title", &mut errors);
    let subtitle = optional_string(fields, "subtitle", &mut errors);
    let authors = required_string(fields, "authors", &mut errors);
    let image = required_string(fields, "image", &mut errors);
    let url = required_string(fields, "url", &mut errors);

    match (book_id, title, authors, image, url) {
        (Some(book_id), Some(title), Some(authors), Some(image), Some(url)) if errors.is_empty() => {
            Ok(ExternalBook { book_id, title, subtitle, authors, image, url })
        }
        _ => Err(errors),
    }
}

pub(crate) fn external_book_patch(fields: &JsonMap) -> Result<ExternalBookPatch, Vec<String>> {
    let mut errors = Vec::new();
    reject_unlisted(fields, EXTERNAL_BOOK_FIELDS, &mut errors);

    let mut patch = ExternalBookPatch::default();
    for name in ["book_id", "title", "authors", "image", "url"] {
        if !fields.contains_key(name) {
            continue;
        }
        let value = required_string(fields, name, &mut errors);
        match name {
            "book_id" => patch.book_id = value,
            "title" => patch.title = value,
            "authors" => patch.authors = value,
            "image" => patch.image = value,
            _ => patch.url = value,
        }
    }
    if fields.contains_key("subtitle") {
        patch.subtitle = Some(optional_string(fields, "subtitle", &mut errors));
    }

    if errors.is_empty() {
        Ok(patch)
    } else {
        Err(errors)
    }
}
