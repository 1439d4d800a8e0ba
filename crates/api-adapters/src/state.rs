//! Shared handler state: one service per collection plus the account and
//! token services.

use std::sync::Arc;

use domains::{Book, CredentialHasher, Favourite, Recent, TokenService};
use services::{ItemService, UserService};
use storage_adapters::Repositories;

/// State shared by every handler. Cloning is cheap; all members are `Arc`s.
#[derive(Clone)]
pub struct AppState {
    pub books: ItemService<Book>,
    pub favourites: ItemService<Favourite>,
    pub recents: ItemService<Recent>,
    pub users: UserService,
    pub tokens: Arc<dyn TokenService>,
}

impl AppState {
    pub fn new(repos: Repositories, hasher: Arc<dyn CredentialHasher>, tokens: Arc<dyn TokenService>) -> Self {
        Self {
            books: ItemService::new(repos.books, repos.users.clone()),
            favourites: ItemService::new(repos.favourites, repos.users.clone()),
            recents: ItemService::new(repos.recents, repos.users.clone()),
            users: UserService::new(repos.users, hasher, tokens.clone()),
            tokens,
        }
    }
}
