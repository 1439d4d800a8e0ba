//! # Postgres store
//!
//! This module implements the data mapping between the Postgres relational
//! model and the `domains` models. Ownership lists are `UUID[]` columns on
//! `users`, named after the collection, and are only ever changed with
//! `array_append` / `array_remove` inside the same transaction as the item
//! write.

use std::collections::HashMap;

use async_trait::async_trait;
use domains::{
    Book, ExternalBook, Favourite, ItemId, ItemRepository, OwnedItem, PersistenceError, Recent, User, UserId,
    UserRepository,
};
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgPool, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::types::Json;
use sqlx::{Postgres, Row};
use tracing::{debug, info};
use uuid::Uuid;

const USER_COLUMNS: &str = "id, name, email, password_hash, image, favourites, recents, books, created_at";

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, PersistenceError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(|err| PersistenceError::Connection(err.to_string()))?;
        info!(max_connections, "postgres pool ready");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), PersistenceError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|err| PersistenceError::Query(err.to_string()))?;
        info!("migrations applied");
        Ok(())
    }
}

fn map_sqlx(err: sqlx::Error) -> PersistenceError {
    if let Some(db) = err.as_database_error() {
        if db.is_unique_violation() {
            return PersistenceError::UniqueViolation(db.constraint().unwrap_or("unique constraint").to_string());
        }
    }
    match &err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) | sqlx::Error::Tls(_) => {
            PersistenceError::Connection(err.to_string())
        }
        _ => PersistenceError::Query(err.to_string()),
    }
}

/// SQL and row mapping for one item table.
///
/// The table name is also the name of the owner-list column on `users`.
pub trait PgTable: OwnedItem {
    const COLUMNS: &'static str;

    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error>;
    fn insert_query(&self) -> Query<'static, Postgres, PgArguments>;
    fn update_query(&self) -> Query<'static, Postgres, PgArguments>;

    fn table() -> &'static str {
        Self::COLLECTION.as_str()
    }
}

impl PgTable for Book {
    const COLUMNS: &'static str = "id, data, user_id";

    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: ItemId(row.try_get("id")?),
            data: row.try_get::<Json<Value>, _>("data")?.0,
            user: UserId(row.try_get("user_id")?),
        })
    }

    fn insert_query(&self) -> Query<'static, Postgres, PgArguments> {
        sqlx::query("INSERT INTO books (id, data, user_id) VALUES ($1, $2, $3)")
            .bind(self.id.0)
            .bind(Json(self.data.clone()))
            .bind(self.user.0)
    }

    fn update_query(&self) -> Query<'static, Postgres, PgArguments> {
        sqlx::query("UPDATE books SET data = $2 WHERE id = $1")
            .bind(self.id.0)
            .bind(Json(self.data.clone()))
    }
}

const EXTERNAL_COLUMNS: &str = "id, book_id, title, subtitle, authors, image, url, user_id";

fn external_from_row(row: &PgRow) -> Result<(ItemId, ExternalBook, UserId), sqlx::Error> {
    let book = ExternalBook {
        book_id: row.try_get("book_id")?,
        title: row.try_get("title")?,
        subtitle: row.try_get("subtitle")?,
        authors: row.try_get("authors")?,
        image: row.try_get("image")?,
        url: row.try_get("url")?,
    };
    Ok((ItemId(row.try_get("id")?), book, UserId(row.try_get("user_id")?)))
}

fn bind_external(
    query: Query<'static, Postgres, PgArguments>,
    book: &ExternalBook,
) -> Query<'static, Postgres, PgArguments> {
    query
        .bind(book.book_id.clone())
        .bind(book.title.clone())
        .bind(book.subtitle.clone())
        .bind(book.authors.clone())
        .bind(book.image.clone())
        .bind(book.url.clone())
}

impl PgTable for Favourite {
    const COLUMNS: &'static str = EXTERNAL_COLUMNS;

    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        let (id, book, user) = external_from_row(row)?;
        Ok(Self { id, book, user })
    }

    fn insert_query(&self) -> Query<'static, Postgres, PgArguments> {
        let query = sqlx::query(
            "INSERT INTO favourites (id, user_id, book_id, title, subtitle, authors, image, url) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(self.id.0)
        .bind(self.user.0);
        bind_external(query, &self.book)
    }

    fn update_query(&self) -> Query<'static, Postgres, PgArguments> {
        let query = sqlx::query(
            "UPDATE favourites SET book_id = $2, title = $3, subtitle = $4, authors = $5, image = $6, url = $7 \
             WHERE id = $1",
        )
        .bind(self.id.0);
        bind_external(query, &self.book)
    }
}

impl PgTable for Recent {
    const COLUMNS: &'static str = EXTERNAL_COLUMNS;

    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        let (id, book, user) = external_from_row(row)?;
        Ok(Self { id, book, user })
    }

    fn insert_query(&self) -> Query<'static, Postgres, PgArguments> {
        let query = sqlx::query(
            "INSERT INTO recents (id, user_id, book_id, title, subtitle, authors, image, url) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(self.id.0)
        .bind(self.user.0);
        bind_external(query, &self.book)
    }

    fn update_query(&self) -> Query<'static, Postgres, PgArguments> {
        let query = sqlx::query(
            "UPDATE recents SET book_id = $2, title = $3, subtitle = $4, authors = $5, image = $6, url = $7 \
             WHERE id = $1",
        )
        .bind(self.id.0);
        bind_external(query, &self.book)
    }
}

fn user_from_row(row: &PgRow) -> Result<User, sqlx::Error> {
    let ids = |column: &str| -> Result<Vec<ItemId>, sqlx::Error> {
        Ok(row.try_get::<Vec<Uuid>, _>(column)?.into_iter().map(ItemId).collect())
    };
    Ok(User {
        id: UserId(row.try_get("id")?),
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        image: row.try_get("image")?,
        favourites: ids("favourites")?,
        recents: ids("recents")?,
        books: ids("books")?,
        created_at: row.try_get("created_at")?,
    })
}

fn missing_user(id: UserId) -> PersistenceError {
    PersistenceError::Missing { entity: "User", id: id.to_string() }
}

#[async_trait]
impl UserRepository for PgStore {
    async fn insert_user(&self, user: &User) -> Result<(), PersistenceError> {
        sqlx::query(
            "INSERT INTO users (id, name, email, password_hash, image, created_at) VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(user.id.0)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.image)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }

    async fn find_user(&self, id: UserId) -> Result<Option<User>, PersistenceError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query(&sql).bind(id.0).fetch_optional(&self.pool).await.map_err(map_sqlx)?;
        row.as_ref().map(user_from_row).transpose().map_err(map_sqlx)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, PersistenceError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let row = sqlx::query(&sql).bind(email).fetch_optional(&self.pool).await.map_err(map_sqlx)?;
        row.as_ref().map(user_from_row).transpose().map_err(map_sqlx)
    }

    async fn list_users(&self) -> Result<Vec<User>, PersistenceError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at, id");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await.map_err(map_sqlx)?;
        rows.iter().map(user_from_row).collect::<Result<_, _>>().map_err(map_sqlx)
    }
}

#[async_trait]
impl<T: PgTable> ItemRepository<T> for PgStore {
    async fn find_item(&self, id: ItemId) -> Result<Option<T>, PersistenceError> {
        let sql = format!("SELECT {} FROM {} WHERE id = $1", T::COLUMNS, T::table());
        let row = sqlx::query(&sql).bind(id.0).fetch_optional(&self.pool).await.map_err(map_sqlx)?;
        row.as_ref().map(T::from_row).transpose().map_err(map_sqlx)
    }

    async fn list_items(&self) -> Result<Vec<T>, PersistenceError> {
        let sql = format!("SELECT {} FROM {} ORDER BY id", T::COLUMNS, T::table());
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await.map_err(map_sqlx)?;
        rows.iter().map(T::from_row).collect::<Result<_, _>>().map_err(map_sqlx)
    }

    async fn list_owned(&self, owner: UserId) -> Result<Option<Vec<T>>, PersistenceError> {
        let list_sql = format!("SELECT {} FROM users WHERE id = $1", T::table());
        let Some(ids) = sqlx::query_scalar::<_, Vec<Uuid>>(&list_sql)
            .bind(owner.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?
        else {
            return Ok(None);
        };

        let items_sql = format!("SELECT {} FROM {} WHERE id = ANY($1)", T::COLUMNS, T::table());
        let rows = sqlx::query(&items_sql).bind(&ids).fetch_all(&self.pool).await.map_err(map_sqlx)?;
        let mut by_id = rows
            .iter()
            .map(|row| T::from_row(row).map(|item| (item.id(), item)))
            .collect::<Result<HashMap<_, _>, _>>()
            .map_err(map_sqlx)?;

        Ok(Some(ids.into_iter().filter_map(|id| by_id.remove(&ItemId(id))).collect()))
    }

    async fn insert_owned(&self, item: &T) -> Result<(), PersistenceError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;

        // Locking the owner row serializes dual-writes against the same list.
        let owner = sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(item.owner().0)
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_sqlx)?;
        if owner.is_none() {
            return Err(missing_user(item.owner()));
        }

        item.insert_query().execute(&mut *tx).await.map_err(map_sqlx)?;

        let append_sql = format!("UPDATE users SET {col} = array_append({col}, $1) WHERE id = $2", col = T::table());
        sqlx::query(&append_sql)
            .bind(item.id().0)
            .bind(item.owner().0)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx)?;

        tx.commit().await.map_err(|err| PersistenceError::Aborted(err.to_string()))?;
        debug!(collection = %T::COLLECTION, item_id = %item.id(), "insert committed");
        Ok(())
    }

    async fn update_item(&self, item: &T) -> Result<(), PersistenceError> {
        let result = item.update_query().execute(&self.pool).await.map_err(map_sqlx)?;
        if result.rows_affected() == 0 {
            return Err(PersistenceError::Missing { entity: T::COLLECTION.entity(), id: item.id().to_string() });
        }
        Ok(())
    }

    async fn remove_owned(&self, item: &T) -> Result<(), PersistenceError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;

        sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(item.owner().0)
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_sqlx)?;

        let delete_sql = format!("DELETE FROM {} WHERE id = $1", T::table());
        let deleted = sqlx::query(&delete_sql).bind(item.id().0).execute(&mut *tx).await.map_err(map_sqlx)?;
        if deleted.rows_affected() == 0 {
            return Err(PersistenceError::Missing { entity: T::COLLECTION.entity(), id: item.id().to_string() });
        }

        let remove_sql = format!("UPDATE users SET {col} = array_remove({col}, $1) WHERE id = $2", col = T::table());
        sqlx::query(&remove_sql)
            .bind(item.id().0)
            .bind(item.owner().0)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx)?;

        tx.commit().await.map_err(|err| PersistenceError::Aborted(err.to_string()))?;
        debug!(collection = %T::COLLECTION, item_id = %item.id(), "delete committed");
        Ok(())
    }
}
