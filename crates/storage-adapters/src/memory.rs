//! # In-memory store
//!
//! Every aggregate lives behind one `RwLock`. Writes that span two
//! aggregates are applied in place while the write lock is held; when the
//! ownership-list write fails, the item write is undone before the lock is
//! released, so readers never see half of it. Used for development and tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use domains::{
    Book, Collection, Favourite, ItemId, ItemRepository, OwnedItem, PersistenceError, Recent, User, UserId,
    UserRepository,
};
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    users: BTreeMap<UserId, User>,
    books: BTreeMap<ItemId, Book>,
    favourites: BTreeMap<ItemId, Favourite>,
    recents: BTreeMap<ItemId, Recent>,
}

/// Selects the table an item type lives in.
pub trait MemoryTable: OwnedItem {
    fn table(state: &MemoryState) -> &BTreeMap<ItemId, Self>;
    fn table_mut(state: &mut MemoryState) -> &mut BTreeMap<ItemId, Self>;
}

impl MemoryTable for Book {
    fn table(state: &MemoryState) -> &BTreeMap<ItemId, Self> {
        &state.books
    }

    fn table_mut(state: &mut MemoryState) -> &mut BTreeMap<ItemId, Self> {
        &mut state.books
    }
}

impl MemoryTable for Favourite {
    fn table(state: &MemoryState) -> &BTreeMap<ItemId, Self> {
        &state.favourites
    }

    fn table_mut(state: &mut MemoryState) -> &mut BTreeMap<ItemId, Self> {
        &mut state.favourites
    }
}

impl MemoryTable for Recent {
    fn table(state: &MemoryState) -> &BTreeMap<ItemId, Self> {
        &state.recents
    }

    fn table_mut(state: &mut MemoryState) -> &mut BTreeMap<ItemId, Self> {
        &mut state.recents
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
    fail_owner_write: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next ownership-list write fail, undoing its item write.
    pub fn fail_next_owner_write(&self) {
        self.fail_owner_write.store(true, Ordering::SeqCst);
    }

    /// Leaves the list untouched on error.
    fn write_owner_list(
        &self,
        state: &mut MemoryState,
        owner: UserId,
        collection: Collection,
        edit: impl FnOnce(&mut Vec<ItemId>),
    ) -> Result<(), PersistenceError> {
        if self.fail_owner_write.swap(false, Ordering::SeqCst) {
            return Err(PersistenceError::Aborted(format!("{collection} list write for user {owner} failed")));
        }
        let user = state
            .users
            .get_mut(&owner)
            .ok_or_else(|| PersistenceError::Missing { entity: "User", id: owner.to_string() })?;
        edit(user.owned_mut(collection));
        Ok(())
    }
}

fn ensure_unique<T: MemoryTable>(state: &MemoryState, item: &T) -> Result<(), PersistenceError> {
    let Some(key) = item.dedup_key() else {
        return Ok(());
    };
    let taken = T::table(state)
        .values()
        .any(|other| other.id() != item.id() && other.owner() == item.owner() && other.dedup_key() == Some(key));
    if taken {
        Err(PersistenceError::UniqueViolation(format!("{}_book_id_user_id_key", T::COLLECTION)))
    } else {
        Ok(())
    }
}

fn missing<T: OwnedItem>(id: ItemId) -> PersistenceError {
    PersistenceError::Missing { entity: T::COLLECTION.entity(), id: id.to_string() }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn insert_user(&self, user: &User) -> Result<(), PersistenceError> {
        let mut state = self.state.write().await;
        if state.users.values().any(|existing| existing.email == user.email) {
            return Err(PersistenceError::UniqueViolation("users_email_key".to_string()));
        }
        state.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_user(&self, id: UserId) -> Result<Option<User>, PersistenceError> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, PersistenceError> {
        let state = self.state.read().await;
        Ok(state.users.values().find(|user| user.email == email).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, PersistenceError> {
        Ok(self.state.read().await.users.values().cloned().collect())
    }
}

#[async_trait]
impl<T: MemoryTable> ItemRepository<T> for MemoryStore {
    async fn find_item(&self, id: ItemId) -> Result<Option<T>, PersistenceError> {
        Ok(T::table(&*self.state.read().await).get(&id).cloned())
    }

    async fn list_items(&self) -> Result<Vec<T>, PersistenceError> {
        Ok(T::table(&*self.state.read().await).values().cloned().collect())
    }

    async fn list_owned(&self, owner: UserId) -> Result<Option<Vec<T>>, PersistenceError> {
        let state = self.state.read().await;
        let Some(user) = state.users.get(&owner) else {
            return Ok(None);
        };
        let table = T::table(&state);
        let items = user.owned(T::COLLECTION).iter().filter_map(|id| table.get(id).cloned()).collect();
        Ok(Some(items))
    }

    async fn insert_owned(&self, item: &T) -> Result<(), PersistenceError> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;
        if !state.users.contains_key(&item.owner()) {
            return Err(PersistenceError::Missing { entity: "User", id: item.owner().to_string() });
        }
        ensure_unique(state, item)?;

        T::table_mut(state).insert(item.id(), item.clone());
        if let Err(err) = self.write_owner_list(state, item.owner(), T::COLLECTION, |list| list.push(item.id())) {
            T::table_mut(state).remove(&item.id());
            return Err(err);
        }
        debug!(collection = %T::COLLECTION, item_id = %item.id(), "memory insert committed");
        Ok(())
    }

    async fn update_item(&self, item: &T) -> Result<(), PersistenceError> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;
        if !T::table(state).contains_key(&item.id()) {
            return Err(missing::<T>(item.id()));
        }
        ensure_unique(state, item)?;
        T::table_mut(state).insert(item.id(), item.clone());
        Ok(())
    }

    async fn remove_owned(&self, item: &T) -> Result<(), PersistenceError> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;
        let removed = T::table_mut(state).remove(&item.id()).ok_or_else(|| missing::<T>(item.id()))?;
        if let Err(err) =
            self.write_owner_list(state, item.owner(), T::COLLECTION, |list| list.retain(|id| *id != item.id()))
        {
            T::table_mut(state).insert(removed.id(), removed);
            return Err(err);
        }
        debug!(collection = %T::COLLECTION, item_id = %item.id(), "memory delete committed");
        Ok(())
    }
}
