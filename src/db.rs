use crate::collate::natural_cmp;
use crate::config::App;
use crate::error::StoreError;
use crate::model::*;
use anyhow::Result;
use libsql::{Builder, Connection, Database as LibsqlDatabase, Value};
use std::path::Path;
use std::time::Duration;
use tokio::sync::Mutex;

type StoreResult<T> = std::result::Result<T, StoreError>;

const SYSTEM_MIGRATIONS: &[(&str, &str)] =
    &[("system/000_migrations_table.sql", include_str!("migrations/system/000_migrations_table.sql"))];

const MIGRATIONS: &[(&str, &str)] = &[("001_schema.sql", include_str!("migrations/001_schema.sql"))];

/// Categories every user starts with.
pub const DEFAULT_CATEGORY_NAMES: [&str; 15] = [
    "Productivity",
    "Media & Entertainment",
    "AI Tools",
    "Utilities",
    "Development & Code",
    "Communication & Social",
    "Design & Creativity",
    "Cloud Services",
    "System & Admin",
    "Education & Learning",
    "Finance & Shopping",
    "Health & Wellness",
    "Kids & Family",
    "Favorites/Starred",
    "Recently Used",
];

const BOOKMARK_COLUMNS: &str = r#"
    b.id, b.user_id, b.description, b.url, b.pinned, b.created_at, b.updated_at,
    c.id, c.name
"#;

const CATEGORY_COLUMNS: &str = "id, user_id, name, normalized_name, is_default, created_at, updated_at";

const NOW: &str = "strftime('%Y-%m-%dT%H:%M:%fZ', 'now')";

/// Which bookmarks a listing includes, by category membership.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CategoryScope {
    #[default]
    All,
    /// Bookmarks sharing at least one of `ids`, plus bookmarks with no
    /// categories when `uncategorized` is set.
    Matching { ids: Vec<i32>, uncategorized: bool },
}

pub struct Database {
    db: LibsqlDatabase,
    conn: Connection,
    /// Held by every write on `conn`, so no write lands inside another
    /// caller's open transaction.
    tx_lock: Mutex<()>,
    replica: bool,
}

impl Database {
    pub fn is_replica(&self) -> bool {
        self.replica
    }

    pub async fn sync(&self) -> Result<()> {
        if self.replica {
            self.db
                .sync()
                .await
                .map_err(|e| anyhow::anyhow!("sync failed: {}", e))?;
        }
        Ok(())
    }

    async fn is_migration_applied(conn: &Connection, name: &str) -> Result<bool> {
        let query = "SELECT 1 FROM _migrations WHERE name = ?";
        match conn.query(query, libsql::params![name]).await {
            Ok(mut rows) => Ok(rows.next().await?.is_some()),
            Err(e) if e.to_string().contains("no such table") => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn record_migration(conn: &Connection, name: &str) -> Result<()> {
        let query = format!("INSERT INTO _migrations (name, applied_at) VALUES (?, {NOW})");
        conn.execute(&query, libsql::params![name]).await?;
        Ok(())
    }

    async fn run_migration(conn: &Connection, name: &str, sql: &str) -> Result<()> {
        if Self::is_migration_applied(conn, name).await? {
            tracing::debug!("migration {} already applied, skipping", name);
            return Ok(());
        }

        tracing::info!("applying migration: {}", name);
        conn.execute_batch(sql)
            .await
            .map_err(|e| anyhow::anyhow!("failed to execute migration {name}: {e}"))?;

        Self::record_migration(conn, name).await
    }

    pub async fn new(app: &App, data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(app.get_db());

        match app.replica() {
            Some((url, token)) => {
                tracing::info!("[db] running in synced database mode (offline writes)");
                let db = Builder::new_synced_database(&path, url.to_string(), token.to_string())
                    .sync_interval(Duration::from_secs(app.sync_interval_seconds))
                    .build()
                    .await?;
                Self::init(db, true).await
            }
            None => Self::open_local(&path).await,
        }
    }

    pub async fn open_local(path: &Path) -> Result<Self> {
        tracing::info!(path = ?path, "[db] opening local database");
        let db = Builder::new_local(path).build().await?;
        Self::init(db, false).await
    }

    async fn init(db: LibsqlDatabase, replica: bool) -> Result<Self> {
        let conn = db.connect()?;
        conn.query("SELECT 1", ()).await?;

        for (filename, sql) in SYSTEM_MIGRATIONS.iter().chain(MIGRATIONS) {
            Self::run_migration(&conn, filename, sql).await?;
        }

        Ok(Database {
            db,
            conn,
            tx_lock: Mutex::new(()),
            replica,
        })
    }

    /// Commits the open transaction. A failed commit is rolled back so the
    /// shared connection is never left inside a transaction.
    async fn commit(&self) -> StoreResult<()> {
        if let Err(e) = self.conn.execute("COMMIT", ()).await {
            let _ = self.conn.execute("ROLLBACK", ()).await;
            return Err(e.into());
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Bookmarks
    // ------------------------------------------------------------------

    /// Bookmarks owned by `user_id`, pinned first then newest first, with
    /// categories resolved in their stored order.
    pub async fn find_bookmarks(&self, user_id: &str, scope: &CategoryScope) -> StoreResult<Vec<Bookmark>> {
        let mut conditions = String::new();
        let mut params: Vec<Value> = vec![user_id.to_string().into()];

        if let CategoryScope::Matching { ids, uncategorized } = scope {
            let mut clauses: Vec<String> = Vec::new();
            if !ids.is_empty() {
                let placeholders = vec!["?"; ids.len()].join(", ");
                clauses.push(format!(
                    "EXISTS (SELECT 1 FROM bookmark_categories m WHERE m.bookmark_id = b.id AND m.category_id IN ({placeholders}))"
                ));
                params.extend(ids.iter().map(|id| Value::from(*id)));
            }
            if *uncategorized {
                clauses.push("NOT EXISTS (SELECT 1 FROM bookmark_categories m WHERE m.bookmark_id = b.id)".to_string());
            }
            if clauses.is_empty() {
                clauses.push("0".to_string());
            }
            conditions = format!("AND ({})", clauses.join(" OR "));
        }

        self.load_bookmarks(&conditions, params).await
    }

    pub async fn list_bookmarks(&self, user_id: &str) -> StoreResult<Vec<Bookmark>> {
        self.find_bookmarks(user_id, &CategoryScope::All).await
    }

    pub async fn get_bookmark(&self, user_id: &str, id: i32) -> StoreResult<Option<Bookmark>> {
        let params = vec![user_id.to_string().into(), id.into()];
        Ok(self.load_bookmarks("AND b.id = ?", params).await?.into_iter().next())
    }

    // One row per (bookmark, category); rows of the same bookmark are adjacent.
    async fn load_bookmarks(&self, conditions: &str, params: Vec<Value>) -> StoreResult<Vec<Bookmark>> {
        let query = format!(
            r#"
SELECT {BOOKMARK_COLUMNS}
FROM bookmarks b
LEFT JOIN bookmark_categories bc ON bc.bookmark_id = b.id
LEFT JOIN categories c ON c.id = bc.category_id
WHERE b.user_id = ? {conditions}
ORDER BY b.pinned DESC, b.created_at DESC, b.id DESC, bc.position ASC
"#
        );

        let mut rows = self.conn.query(&query, params).await?;
        let mut bookmarks: Vec<Bookmark> = vec![];

        while let Some(row) = rows.next().await? {
            let id: i32 = row.get(0)?;
            let category = match (row.get::<Option<i32>>(7)?, row.get::<Option<String>>(8)?) {
                (Some(id), Some(name)) => Some(CategoryRef { id, name }),
                _ => None,
            };

            match bookmarks.last_mut() {
                Some(last) if last.id == id => last.categories.extend(category),
                _ => bookmarks.push(Bookmark {
                    id,
                    user_id: row.get(1)?,
                    description: row.get(2)?,
                    url: row.get(3)?,
                    pinned: row.get::<i64>(4)? != 0,
                    categories: category.into_iter().collect(),
                    created_at: row.get(5)?,
                    updated_at: row.get(6)?,
                }),
            }
        }

        Ok(bookmarks)
    }

    /// Fails with the offending ids when any category is not owned by `user_id`.
    async fn validate_category_ids(&self, user_id: &str, ids: &[i32]) -> StoreResult<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let query = format!("SELECT id FROM categories WHERE user_id = ? AND id IN ({placeholders})");
        let mut params: Vec<Value> = vec![user_id.to_string().into()];
        params.extend(ids.iter().map(|id| Value::from(*id)));

        let mut owned: Vec<i32> = Vec::with_capacity(ids.len());
        let mut rows = self.conn.query(&query, params).await?;
        while let Some(row) = rows.next().await? {
            owned.push(row.get(0)?);
        }

        let invalid: Vec<i32> = ids.iter().copied().filter(|id| !owned.contains(id)).collect();
        if invalid.is_empty() {
            Ok(())
        } else {
            Err(StoreError::InvalidCategories(invalid))
        }
    }

    async fn link_categories(&self, bookmark_id: i32, category_ids: &[i32]) -> StoreResult<()> {
        for (position, category_id) in category_ids.iter().enumerate() {
            self.conn
                .execute(
                    "INSERT OR IGNORE INTO bookmark_categories (bookmark_id, category_id, position) VALUES (?, ?, ?)",
                    libsql::params![bookmark_id, *category_id, position as i64],
                )
                .await?;
        }
        Ok(())
    }

    pub async fn create_bookmark(&self, user_id: &str, input: &ValidBookmark) -> StoreResult<Bookmark> {
        let _guard = self.tx_lock.lock().await;
        self.validate_category_ids(user_id, &input.category_ids).await?;

        self.conn.execute("BEGIN TRANSACTION", ()).await?;

        let result = async {
            let mut rows = self
                .conn
                .query(
                    "INSERT INTO bookmarks (user_id, description, url) VALUES (?, ?, ?) RETURNING id",
                    libsql::params![user_id, input.description.as_str(), input.url.as_str()],
                )
                .await?;
            let bookmark_id: i32 = match rows.next().await? {
                Some(row) => row.get(0)?,
                None => return Err(StoreError::MalformedRow("insert returned no id".to_string())),
            };
            self.link_categories(bookmark_id, &input.category_ids).await?;
            Ok::<i32, StoreError>(bookmark_id)
        }
        .await;

        let bookmark_id = match result {
            Ok(id) => {
                self.commit().await?;
                id
            }
            Err(e) => {
                let _ = self.conn.execute("ROLLBACK", ()).await;
                return Err(e);
            }
        };

        self.get_bookmark(user_id, bookmark_id)
            .await?
            .ok_or_else(|| StoreError::MalformedRow(format!("bookmark {bookmark_id} missing after insert")))
    }

    /// Replaces description, url and category set. `None` when the bookmark
    /// does not exist for this user.
    pub async fn update_bookmark(&self, user_id: &str, id: i32, input: &ValidBookmark) -> StoreResult<Option<Bookmark>> {
        let _guard = self.tx_lock.lock().await;
        self.validate_category_ids(user_id, &input.category_ids).await?;

        self.conn.execute("BEGIN TRANSACTION", ()).await?;

        let result = async {
            let updated = self
                .conn
                .execute(
                    &format!("UPDATE bookmarks SET description = ?, url = ?, updated_at = {NOW} WHERE id = ? AND user_id = ?"),
                    libsql::params![input.description.as_str(), input.url.as_str(), id, user_id],
                )
                .await?;
            if updated == 0 {
                return Ok(false);
            }

            self.conn
                .execute("DELETE FROM bookmark_categories WHERE bookmark_id = ?", libsql::params![id])
                .await?;
            self.link_categories(id, &input.category_ids).await?;
            Ok::<bool, StoreError>(true)
        }
        .await;

        match result {
            Ok(true) => {
                self.commit().await?;
                self.get_bookmark(user_id, id).await
            }
            Ok(false) => {
                self.conn.execute("ROLLBACK", ()).await?;
                Ok(None)
            }
            Err(e) => {
                let _ = self.conn.execute("ROLLBACK", ()).await;
                Err(e)
            }
        }
    }

    pub async fn toggle_pin(&self, user_id: &str, id: i32) -> StoreResult<Option<Bookmark>> {
        let _guard = self.tx_lock.lock().await;
        let updated = self
            .conn
            .execute(
                &format!("UPDATE bookmarks SET pinned = 1 - pinned, updated_at = {NOW} WHERE id = ? AND user_id = ?"),
                libsql::params![id, user_id],
            )
            .await?;

        if updated == 0 {
            return Ok(None);
        }
        self.get_bookmark(user_id, id).await
    }

    pub async fn delete_bookmark(&self, user_id: &str, id: i32) -> StoreResult<bool> {
        let _guard = self.tx_lock.lock().await;

        self.conn.execute("BEGIN TRANSACTION", ()).await?;

        let result = async {
            self.conn
                .execute(
                    "DELETE FROM bookmark_categories WHERE bookmark_id IN (SELECT id FROM bookmarks WHERE id = ? AND user_id = ?)",
                    libsql::params![id, user_id],
                )
                .await?;
            let deleted = self
                .conn
                .execute("DELETE FROM bookmarks WHERE id = ? AND user_id = ?", libsql::params![id, user_id])
                .await?;
            Ok::<bool, StoreError>(deleted > 0)
        }
        .await;

        match result {
            Ok(deleted) => {
                self.commit().await?;
                Ok(deleted)
            }
            Err(e) => {
                let _ = self.conn.execute("ROLLBACK", ()).await;
                Err(e)
            }
        }
    }

    // ------------------------------------------------------------------
    // Categories
    // ------------------------------------------------------------------

    /// The user's categories in collation order, seeding the defaults for a
    /// user who has none.
    pub async fn list_categories(&self, user_id: &str) -> StoreResult<Vec<Category>> {
        self.ensure_seed_categories(user_id).await?;

        let query = format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE user_id = ?");
        let mut rows = self.conn.query(&query, libsql::params![user_id]).await?;
        let mut categories = Vec::new();
        while let Some(row) = rows.next().await? {
            categories.push(Self::row_to_category(&row)?);
        }

        categories.sort_by(|a, b| natural_cmp(&a.name, &b.name));
        Ok(categories)
    }

    async fn ensure_seed_categories(&self, user_id: &str) -> StoreResult<()> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM categories WHERE user_id = ?", libsql::params![user_id])
            .await?;
        let existing: i64 = match rows.next().await? {
            Some(row) => row.get(0)?,
            None => 0,
        };
        if existing > 0 {
            return Ok(());
        }

        let _guard = self.tx_lock.lock().await;
        tracing::info!(user_id, "seeding default categories");
        for name in DEFAULT_CATEGORY_NAMES {
            // A concurrent seed may have inserted the same row already.
            self.conn
                .execute(
                    "INSERT OR IGNORE INTO categories (user_id, name, normalized_name, is_default) VALUES (?, ?, ?, 1)",
                    libsql::params![user_id, name, normalize_category_name(name)],
                )
                .await?;
        }
        Ok(())
    }

    pub async fn create_category(&self, user_id: &str, name: &str) -> StoreResult<Category> {
        let _guard = self.tx_lock.lock().await;
        let query = format!(
            "INSERT INTO categories (user_id, name, normalized_name, is_default) VALUES (?, ?, ?, 0) RETURNING {CATEGORY_COLUMNS}"
        );
        let normalized = normalize_category_name(name);

        let mut rows = match self
            .conn
            .query(&query, libsql::params![user_id, name, normalized.as_str()])
            .await
        {
            Ok(rows) => rows,
            Err(e) if StoreError::is_unique_violation(&e) => return Err(StoreError::DuplicateCategory(normalized)),
            Err(e) => return Err(e.into()),
        };

        match rows.next().await {
            Ok(Some(row)) => Self::row_to_category(&row),
            Ok(None) => Err(StoreError::MalformedRow("insert returned no category".to_string())),
            Err(e) if StoreError::is_unique_violation(&e) => Err(StoreError::DuplicateCategory(normalized)),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn rename_category(&self, user_id: &str, id: i32, name: &str) -> StoreResult<Option<Category>> {
        let _guard = self.tx_lock.lock().await;
        let query = format!(
            "UPDATE categories SET name = ?, normalized_name = ?, updated_at = {NOW} WHERE id = ? AND user_id = ? RETURNING {CATEGORY_COLUMNS}"
        );
        let normalized = normalize_category_name(name);

        let mut rows = match self
            .conn
            .query(&query, libsql::params![name, normalized.as_str(), id, user_id])
            .await
        {
            Ok(rows) => rows,
            Err(e) if StoreError::is_unique_violation(&e) => return Err(StoreError::DuplicateCategory(normalized)),
            Err(e) => return Err(e.into()),
        };

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(Self::row_to_category(&row)?)),
            Ok(None) => Ok(None),
            Err(e) if StoreError::is_unique_violation(&e) => Err(StoreError::DuplicateCategory(normalized)),
            Err(e) => Err(e.into()),
        }
    }

    /// Deletes the category and removes it from every bookmark that
    /// references it; the bookmarks themselves are kept.
    pub async fn delete_category(&self, user_id: &str, id: i32) -> StoreResult<bool> {
        let _guard = self.tx_lock.lock().await;

        self.conn.execute("BEGIN TRANSACTION", ()).await?;

        let result = async {
            let mut rows = self
                .conn
                .query("SELECT 1 FROM categories WHERE id = ? AND user_id = ?", libsql::params![id, user_id])
                .await?;
            if rows.next().await?.is_none() {
                return Ok(false);
            }

            self.conn
                .execute("DELETE FROM bookmark_categories WHERE category_id = ?", libsql::params![id])
                .await?;
            self.conn
                .execute("DELETE FROM categories WHERE id = ? AND user_id = ?", libsql::params![id, user_id])
                .await?;
            Ok::<bool, StoreError>(true)
        }
        .await;

        match result {
            Ok(deleted) => {
                self.commit().await?;
                Ok(deleted)
            }
            Err(e) => {
                let _ = self.conn.execute("ROLLBACK", ()).await;
                Err(e)
            }
        }
    }

    fn row_to_category(row: &libsql::Row) -> StoreResult<Category> {
        Ok(Category {
            id: row.get(0)?,
            user_id: row.get(1)?,
            name: row.get(2)?,
            normalized_name: row.get(3)?,
            is_default: row.get::<i64>(4)? != 0,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }
}
