//! # Domain Models
//!
//! These structs represent the core entities of Bookshelf.
//! We use UUID v7 for time-ordered, globally unique identification.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::payload::{self, JsonMap};

/// Identifies a [`User`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

/// Identifies an owned item of any collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub Uuid);

impl UserId {
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }
}

impl ItemId {
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for UserId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

impl FromStr for ItemId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// The three per-user collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Books,
    Favourites,
    Recents,
}

impl Collection {
    /// Plural name, used for routes, table names and list envelopes.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Books => "books",
            Self::Favourites => "favourites",
            Self::Recents => "recents",
        }
    }

    /// Singular entity name used in error messages.
    pub fn entity(self) -> &'static str {
        match self {
            Self::Books => "Book",
            Self::Favourites => "Favourite",
            Self::Recents => "Recent",
        }
    }

    /// Recents are presented most-recently-added first.
    pub fn newest_first(self) -> bool {
        matches!(self, Self::Recents)
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered account and its three ownership lists.
///
/// `password_hash` is a PHC string and is never serialized; use
/// [`UserView`] for anything that leaves the process.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: UserId,
    pub name: String,
    /// Trimmed and lowercased at signup; unique across users.
    pub email: String,
    pub password_hash: String,
    pub image: Option<String>,
    pub favourites: Vec<ItemId>,
    pub recents: Vec<ItemId>,
    pub books: Vec<ItemId>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(name: String, email: String, password_hash: String, image: Option<String>) -> Self {
        Self {
            id: UserId::generate(),
            name,
            email,
            password_hash,
            image,
            favourites: Vec::new(),
            recents: Vec::new(),
            books: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// The ownership list for one collection, in insertion order.
    pub fn owned(&self, collection: Collection) -> &[ItemId] {
        match collection {
            Collection::Books => &self.books,
            Collection::Favourites => &self.favourites,
            Collection::Recents => &self.recents,
        }
    }

    /// Only storage adapters call this, inside a dual-write transaction.
    pub fn owned_mut(&mut self, collection: Collection) -> &mut Vec<ItemId> {
        match collection {
            Collection::Books => &mut self.books,
            Collection::Favourites => &mut self.favourites,
            Collection::Recents => &mut self.recents,
        }
    }
}

/// Public projection of a [`User`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserView {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub favourites: Vec<ItemId>,
    pub recents: Vec<ItemId>,
    pub books: Vec<ItemId>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            image: user.image.clone(),
            favourites: user.favourites.clone(),
            recents: user.recents.clone(),
            books: user.books.clone(),
        }
    }
}

/// Behaviour shared by every item a [`User`] owns.
///
/// One generic CRUD engine and one generic dual-write per adapter are
/// written against this trait and instantiated for [`Book`],
/// [`Favourite`] and [`Recent`].
pub trait OwnedItem: Clone + fmt::Debug + Serialize + Send + Sync + 'static {
    /// Validated creation payload, without the owner.
    type Draft: Send + 'static;
    /// Validated partial update; only allow-listed fields.
    type Patch: Send + 'static;

    const COLLECTION: Collection;

    fn from_draft(id: ItemId, owner: UserId, draft: Self::Draft) -> Self;
    fn id(&self) -> ItemId;
    /// Immutable after creation.
    fn owner(&self) -> UserId;
    /// Key that must be unique per owner, for collections that deduplicate.
    fn dedup_key(&self) -> Option<&str>;
    fn apply(&mut self, patch: Self::Patch);

    fn parse_draft(fields: &JsonMap) -> Result<Self::Draft, Vec<String>>;
    fn parse_patch(fields: &JsonMap) -> Result<Self::Patch, Vec<String>>;
}

/// A user-authored entry with free-form content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Book {
    pub id: ItemId,
    /// Opaque structured content; always a JSON object.
    pub data: Value,
    pub user: UserId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BookPatch {
    pub data: Option<Value>,
}

impl OwnedItem for Book {
    type Draft = Value;
    type Patch = BookPatch;

    const COLLECTION: Collection = Collection::Books;

    fn from_draft(id: ItemId, owner: UserId, draft: Value) -> Self {
        Self { id, data: draft, user: owner }
    }

    fn id(&self) -> ItemId {
        self.id
    }

    fn owner(&self) -> UserId {
        self.user
    }

    fn dedup_key(&self) -> Option<&str> {
        None
    }

    fn apply(&mut self, patch: BookPatch) {
        if let Some(data) = patch.data {
            self.data = data;
        }
    }

    fn parse_draft(fields: &JsonMap) -> Result<Value, Vec<String>> {
        payload::book_draft(fields)
    }

    fn parse_patch(fields: &JsonMap) -> Result<BookPatch, Vec<String>> {
        payload::book_patch(fields)
    }
}

/// Metadata of a book held in an external catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExternalBook {
    /// External catalog id; unique per owner within a collection.
    pub book_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    pub authors: String,
    pub image: String,
    pub url: String,
}

/// Partial update of [`ExternalBook`]. `subtitle: Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExternalBookPatch {
    pub book_id: Option<String>,
    pub title: Option<String>,
    pub subtitle: Option<Option<String>>,
    pub authors: Option<String>,
    pub image: Option<String>,
    pub url: Option<String>,
}

impl ExternalBook {
    pub fn apply(&mut self, patch: ExternalBookPatch) {
        if let Some(book_id) = patch.book_id {
            self.book_id = book_id;
        }
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(subtitle) = patch.subtitle {
            self.subtitle = subtitle;
        }
        if let Some(authors) = patch.authors {
            self.authors = authors;
        }
        if let Some(image) = patch.image {
            self.image = image;
        }
        if let Some(url) = patch.url {
            self.url = url;
        }
    }
}

/// A bookmarked external book.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Favourite {
    pub id: ItemId,
    #[serde(flatten)]
    pub book: ExternalBook,
    pub user: UserId,
}

/// A recently viewed external book.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recent {
    pub id: ItemId,
    #[serde(flatten)]
    pub book: ExternalBook,
    pub user: UserId,
}

// Favourite and Recent differ only in the collection they belong to.
macro_rules! external_book_item {
    ($item:ident, $collection:expr) => {
        impl OwnedItem for $item {
            type Draft = ExternalBook;
            type Patch = ExternalBookPatch;

            const COLLECTION: Collection = $collection;

            fn from_draft(id: ItemId, owner: UserId, draft: ExternalBook) -> Self {
                Self { id, book: draft, user: owner }
            }

            fn id(&self) -> ItemId {
                self.id
            }

            fn owner(&self) -> UserId {
                self.user
            }

            fn dedup_key(&self) -> Option<&str> {
                Some(&self.book.book_id)
            }

            fn apply(&mut self, patch: ExternalBookPatch) {
                self.book.apply(patch);
            }

            fn parse_draft(fields: &JsonMap) -> Result<ExternalBook, Vec<String>> {
                payload::external_book_draft(fields)
            }

            fn parse_patch(fields: &JsonMap) -> Result<ExternalBookPatch, Vec<String>> {
                payload::external_book_patch(fields)
            }
        }
    };
}

external_book_item!(Favourite, Collection::Favourites);
external_book_item!(Recent, Collection::Recents);
