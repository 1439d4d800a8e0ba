//! # storage-adapters
//!
//! Implementations of the persistence ports. The memory store is always
//! compiled; Postgres sits behind the `db-postgres` feature.

use std::sync::Arc;

use domains::{Book, Favourite, ItemRepository, Recent, UserRepository};

pub mod memory;
#[cfg(feature = "db-postgres")]
pub mod postgres;

pub use memory::MemoryStore;
#[cfg(feature = "db-postgres")]
pub use postgres::PgStore;

/// The four repositories the services need, backed by one store.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub books: Arc<dyn ItemRepository<Book>>,
    pub favourites: Arc<dyn ItemRepository<Favourite>>,
    pub recents: Arc<dyn ItemRepository<Recent>>,
}

impl Repositories {
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: UserRepository
            + ItemRepository<Book>
            + ItemRepository<Favourite>
            + ItemRepository<Recent>
            + 'static,
    {
        Self {
            users: store.clone(),
            books: store.clone(),
            favourites: store.clone(),
            recents: store,
        }
    }
}
