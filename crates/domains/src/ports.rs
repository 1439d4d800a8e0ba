//! # Core Traits (Ports)
//!
//! Any adapter must implement these traits to be used by the binary.

use async_trait::async_trait;

use crate::error::{AuthError, PersistenceError};
use crate::models::{ItemId, OwnedItem, User, UserId};

/// Persistence contract for user records.
///
/// Ownership lists are never written through this trait; they change only
/// inside [`ItemRepository::insert_owned`] and [`ItemRepository::remove_owned`].
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with `UniqueViolation` when the email is taken.
    async fn insert_user(&self, user: &User) -> Result<(), PersistenceError>;
    async fn find_user(&self, id: UserId) -> Result<Option<User>, PersistenceError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, PersistenceError>;
    async fn list_users(&self) -> Result<Vec<User>, PersistenceError>;
}

/// Persistence contract for one collection of owned items.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ItemRepository<T: OwnedItem>: Send + Sync {
    async fn find_item(&self, id: ItemId) -> Result<Option<T>, PersistenceError>;

    /// Every item of the collection, unscoped.
    async fn list_items(&self) -> Result<Vec<T>, PersistenceError>;

    /// Items referenced by the owner's list, in list order.
    /// `None` when the owner does not exist.
    async fn list_owned(&self, owner: UserId) -> Result<Option<Vec<T>>, PersistenceError>;

    /// Atomically persists `item` and appends its id to the owner's list.
    /// Neither write is visible unless both succeed.
    async fn insert_owned(&self, item: &T) -> Result<(), PersistenceError>;

    /// Overwrites the mutable fields of an existing item.
    async fn update_item(&self, item: &T) -> Result<(), PersistenceError>;

    /// Atomically deletes `item` and removes its id from the owner's list.
    async fn remove_owned(&self, item: &T) -> Result<(), PersistenceError>;
}

/// Issues and verifies bearer credentials.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait TokenService: Send + Sync {
    fn issue(&self, user: &User) -> Result<String, AuthError>;

    /// Checks signature and expiry, returning the embedded caller identity.
    fn verify(&self, token: &str) -> Result<UserId, AuthError>;
}

/// One-way password hashing.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait CredentialHasher: Send + Sync {
    fn hash(&self, password: &str) -> Result<String, AuthError>;
    fn verify(&self, password: &str, hash: &str) -> bool;
}
