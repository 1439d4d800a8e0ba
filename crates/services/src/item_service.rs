//! # Ownership-scoped CRUD
//!
//! One engine, instantiated per collection. Reads are open to any
//! authenticated caller; update and delete require the caller to own the
//! item. Create and delete go through the repository's dual-write so the
//! item record and the owner's list never disagree.

use std::sync::Arc;

use domains::{AppError, ItemId, ItemRepository, OwnedItem, PersistenceError, Result, UserId, UserRepository};
use tracing::{error, info};

pub struct ItemService<T: OwnedItem> {
    items: Arc<dyn ItemRepository<T>>,
    users: Arc<dyn UserRepository>,
}

impl<T: OwnedItem> Clone for ItemService<T> {
    fn clone(&self) -> Self {
        Self { items: Arc::clone(&self.items), users: Arc::clone(&self.users) }
    }
}

impl<T: OwnedItem> ItemService<T> {
    pub fn new(items: Arc<dyn ItemRepository<T>>, users: Arc<dyn UserRepository>) -> Self {
        Self { items, users }
    }

    pub async fn get(&self, id: ItemId) -> Result<T> {
        self.items
            .find_item(id)
            .await
            .map_err(|err| store_error::<T>(err, "find"))?
            .ok_or_else(|| AppError::not_found(T::COLLECTION.entity(), id))
    }

    pub async fn list_all(&self) -> Result<Vec<T>> {
        self.items.list_items().await.map_err(|err| store_error::<T>(err, "list"))
    }

    /// Follows the user's ownership list. Recents come back newest first.
    pub async fn list_by_user(&self, user: UserId) -> Result<Vec<T>> {
        let mut items = self
            .items
            .list_owned(user)
            .await
            .map_err(|err| store_error::<T>(err, "list owned"))?
            .ok_or_else(|| AppError::not_found("User", user))?;

        if T::COLLECTION.newest_first() {
            items.reverse();
        }
        Ok(items)
    }

    pub async fn create(&self, owner: UserId, draft: T::Draft) -> Result<T> {
        let user = self
            .users
            .find_user(owner)
            .await
            .map_err(|err| store_error::<T>(err, "resolve owner"))?
            .ok_or_else(|| AppError::not_found("User", owner))?;

        let item = T::from_draft(ItemId::generate(), user.id, draft);
        self.items.insert_owned(&item).await.map_err(|err| match err {
            PersistenceError::UniqueViolation(_) => duplicate(&item),
            other => store_error::<T>(other, "create"),
        })?;

        info!(collection = %T::COLLECTION, item_id = %item.id(), user_id = %owner, "item created");
        Ok(item)
    }

    pub async fn update(&self, id: ItemId, patch: T::Patch, caller: UserId) -> Result<T> {
        let mut item = self.get(id).await?;
        ensure_owner(&item, caller, "update")?;

        item.apply(patch);
        self.items.update_item(&item).await.map_err(|err| match err {
            PersistenceError::UniqueViolation(_) => duplicate(&item),
            other => store_error::<T>(other, "update"),
        })?;

        info!(collection = %T::COLLECTION, item_id = %id, user_id = %caller, "item updated");
        Ok(item)
    }

    /// Returns the removed item.
    pub async fn delete(&self, id: ItemId, caller: UserId) -> Result<T> {
        let item = self.get(id).await?;
        ensure_owner(&item, caller, "delete")?;

        self.items
            .remove_owned(&item)
            .await
            .map_err(|err| store_error::<T>(err, "delete"))?;

        info!(collection = %T::COLLECTION, item_id = %id, user_id = %caller, "item deleted");
        Ok(item)
    }
}

fn ensure_owner<T: OwnedItem>(item: &T, caller: UserId, action: &str) -> Result<()> {
    if item.owner() == caller {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "You are not allowed to {action} this {}.",
            T::COLLECTION.entity().to_lowercase()
        )))
    }
}

fn duplicate<T: OwnedItem>(item: &T) -> AppError {
    let key = item.dedup_key().unwrap_or_default();
    AppError::Conflict(format!("Book {key} is already in {}.", T::COLLECTION))
}

// Raw store errors go to the log; the caller gets the classification.
fn store_error<T: OwnedItem>(err: PersistenceError, action: &str) -> AppError {
    if matches!(
        err,
        PersistenceError::Connection(_) | PersistenceError::Query(_) | PersistenceError::Aborted(_)
    ) {
        error!(collection = %T::COLLECTION, action, error = %err, "store operation failed");
    }
    AppError::from(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::{ExternalBook, ExternalBookPatch, Favourite, MockItemRepository, MockUserRepository, Recent, User};

    fn external(book_id: &str) -> ExternalBook {
        ExternalBook {
            book_id: book_id.to_string(),
            title: "T".to_string(),
            subtitle: None,
            authors: "Au".to_string(),
            image: "i".to_string(),
            url: "x".to_string(),
        }
    }

    fn owned_favourite(owner: UserId) -> Favourite {
        Favourite { id: ItemId::generate(), book: external("b1"), user: owner }
    }

    fn user() -> User {
        User::new("Ann".into(), "ann@example.com".into(), "hash".into(), None)
    }

    fn service<T: OwnedItem>(items: MockItemRepository<T>, users: MockUserRepository) -> ItemService<T> {
        ItemService::new(Arc::new(items), Arc::new(users))
    }

    #[tokio::test]
    async fn get_missing_item_is_not_found() {
        let mut items = MockItemRepository::<Favourite>::new();
        items.expect_find_item().returning(|_| Ok(None));

        let err = service(items, MockUserRepository::new()).get(ItemId::generate()).await.unwrap_err();
        assert_eq!(err.code(), "not_found");
    }

    #[tokio::test]
    async fn create_for_unknown_owner_never_writes() {
        let mut users = MockUserRepository::new();
        users.expect_find_user().returning(|_| Ok(None));
        let mut items = MockItemRepository::<Favourite>::new();
        items.expect_insert_owned().never();

        let err = service(items, users).create(UserId::generate(), external("b1")).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(entity, _) if entity == "User"));
    }

    #[tokio::test]
    async fn create_stamps_owner_reference() {
        let owner = user();
        let owner_id = owner.id;
        let mut users = MockUserRepository::new();
        users.expect_find_user().returning(move |_| Ok(Some(owner.clone())));
        let mut items = MockItemRepository::<Favourite>::new();
        items
            .expect_insert_owned()
            .withf(move |item: &Favourite| item.user == owner_id)
            .times(1)
            .returning(|_| Ok(()));

        let created = service(items, users).create(owner_id, external("b1")).await.unwrap();
        assert_eq!(created.user, owner_id);
        assert_eq!(created.book.book_id, "b1");
    }

    #[tokio::test]
    async fn duplicate_catalog_id_is_conflict() {
        let owner = user();
        let owner_id = owner.id;
        let mut users = MockUserRepository::new();
        users.expect_find_user().returning(move |_| Ok(Some(owner.clone())));
        let mut items = MockItemRepository::<Favourite>::new();
        items
            .expect_insert_owned()
            .returning(|_| Err(PersistenceError::UniqueViolation("favourites_book_id_user_id_key".into())));

        let err = service(items, users).create(owner_id, external("b1")).await.unwrap_err();
        assert_eq!(err, AppError::Conflict("Book b1 is already in favourites.".into()));
    }

    #[tokio::test]
    async fn update_by_non_owner_is_forbidden_and_writes_nothing() {
        let fav = owned_favourite(UserId::generate());
        let mut items = MockItemRepository::<Favourite>::new();
        items.expect_find_item().returning(move |_| Ok(Some(fav.clone())));
        items.expect_update_item().never();

        let patch = ExternalBookPatch { title: Some("Hijacked".into()), ..Default::default() };
        let err = service(items, MockUserRepository::new())
            .update(ItemId::generate(), patch, UserId::generate())
            .await
            .unwrap_err();
        assert_eq!(err, AppError::Forbidden("You are not allowed to update this favourite.".into()));
    }

    #[tokio::test]
    async fn delete_by_non_owner_is_forbidden_and_writes_nothing() {
        let fav = owned_favourite(UserId::generate());
        let mut items = MockItemRepository::<Favourite>::new();
        items.expect_find_item().returning(move |_| Ok(Some(fav.clone())));
        items.expect_remove_owned().never();

        let err = service(items, MockUserRepository::new())
            .delete(ItemId::generate(), UserId::generate())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "forbidden");
    }

    #[tokio::test]
    async fn owner_update_merges_patch() {
        let owner = UserId::generate();
        let fav = owned_favourite(owner);
        let id = fav.id;
        let mut items = MockItemRepository::<Favourite>::new();
        items.expect_find_item().returning(move |_| Ok(Some(fav.clone())));
        items
            .expect_update_item()
            .withf(|item: &Favourite| item.book.title == "Renamed" && item.book.url == "x")
            .times(1)
            .returning(|_| Ok(()));

        let patch = ExternalBookPatch { title: Some("Renamed".into()), ..Default::default() };
        let updated = service(items, MockUserRepository::new()).update(id, patch, owner).await.unwrap();
        assert_eq!(updated.user, owner);
    }

    #[tokio::test]
    async fn recents_are_listed_newest_first() {
        let owner = UserId::generate();
        let older = Recent { id: ItemId::generate(), book: external("b1"), user: owner };
        let newer = Recent { id: ItemId::generate(), book: external("b2"), user: owner };
        let listed = vec![older.clone(), newer.clone()];
        let mut items = MockItemRepository::<Recent>::new();
        items.expect_list_owned().returning(move |_| Ok(Some(listed.clone())));

        let recents = service(items, MockUserRepository::new()).list_by_user(owner).await.unwrap();
        assert_eq!(recents, vec![newer, older]);
    }

    #[tokio::test]
    async fn store_failure_is_classified_not_forwarded() {
        let mut items = MockItemRepository::<Favourite>::new();
        items.expect_list_items().returning(|| Err(PersistenceError::Connection("connection refused".into())));

        let err = service(items, MockUserRepository::new()).list_all().await.unwrap_err();
        assert_eq!(err.code(), "store_failure");
    }
}
