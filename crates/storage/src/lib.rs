use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Duration, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteConnection, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::debug;

use shared::domain::{Todo, TodoId};

/// Smallest step `updated_at` moves forward when the wall clock has not.
const UPDATED_AT_STEP_MS: i64 = 1;
/// How long a writer waits for the database lock before giving up.
const BUSY_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredTodo {
    pub id: TodoId,
    pub title: String,
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
}

impl From<StoredTodo> for Todo {
    fn from(value: StoredTodo) -> Self {
        Self {
            id: value.id,
            title: value.title,
            is_completed: value.is_completed,
            created_at: value.created_at,
            updated_at: value.updated_at,
            version: value.version,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetCompletedOutcome {
    Applied(StoredTodo),
    /// The supplied version was not newer than the stored one; nothing changed.
    Stale { current: StoredTodo },
    NotFound,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .busy_timeout(BUSY_TIMEOUT);
        // Every connection to `:memory:` is its own database.
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    pub async fn create_todo(&self, title: &str) -> Result<StoredTodo> {
        let id = TodoId::new();
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO todos (id, title, is_completed, created_at, updated_at, version)
             VALUES (?, ?, 0, ?, ?, 0)",
        )
        .bind(id.to_string())
        .bind(title)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .context("failed to insert todo")?;

        Ok(StoredTodo {
            id,
            title: title.to_string(),
            is_completed: false,
            created_at: now,
            updated_at: now,
            version: 0,
        })
    }

    pub async fn load_todo(&self, id: TodoId) -> Result<Option<StoredTodo>> {
        let row = sqlx::query(
            "SELECT id, title, is_completed, created_at, updated_at, version
             FROM todos WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(todo_from_row).transpose()
    }

    pub async fn list_todos(&self) -> Result<Vec<StoredTodo>> {
        let rows = sqlx::query(
            "SELECT id, title, is_completed, created_at, updated_at, version
             FROM todos
             ORDER BY rowid ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(todo_from_row).collect()
    }

    /// Sets the completion flag inside one write-locked transaction.
    ///
    /// With `version` the write only lands when the token is strictly newer
    /// than the stored one; without it the stored version is bumped by one.
    /// Accepted writes always move `updated_at` forward.
    pub async fn set_completed(
        &self,
        id: TodoId,
        completed: bool,
        version: Option<u64>,
    ) -> Result<SetCompletedOutcome> {
        let mut conn = self.pool.acquire().await?;
        // Take the write lock up front; a deferred transaction that upgrades
        // from read to write fails with SQLITE_BUSY under contention.
        sqlx::query("BEGIN IMMEDIATE")
            .execute(&mut *conn)
            .await
            .context("failed to start completion update")?;

        let outcome = set_completed_locked(&mut conn, id, completed, version).await;
        let finish = match outcome {
            Ok(SetCompletedOutcome::Applied(_)) => "COMMIT",
            _ => "ROLLBACK",
        };
        if let Err(error) = sqlx::query(finish).execute(&mut *conn).await {
            // Never hand a connection with an open transaction back to the pool.
            drop(conn.detach());
            return Err(anyhow!(error).context(format!("failed to {finish} completion update")));
        }
        outcome
    }
}

async fn set_completed_locked(
    conn: &mut SqliteConnection,
    id: TodoId,
    completed: bool,
    version: Option<u64>,
) -> Result<SetCompletedOutcome> {
    let row = sqlx::query(
        "SELECT id, title, is_completed, created_at, updated_at, version
         FROM todos WHERE id = ?",
    )
    .bind(id.to_string())
    .fetch_optional(&mut *conn)
    .await?;
    let Some(current) = row.as_ref().map(todo_from_row).transpose()? else {
        return Ok(SetCompletedOutcome::NotFound);
    };

    let next_version = match version {
        Some(requested) if requested <= current.version => {
            debug!(
                todo_id = %id,
                requested,
                stored = current.version,
                "rejecting stale completion update"
            );
            return Ok(SetCompletedOutcome::Stale { current });
        }
        Some(requested) => requested,
        None => current.version + 1,
    };
    let updated_at = next_updated_at(current.updated_at, Utc::now());

    sqlx::query("UPDATE todos SET is_completed = ?, updated_at = ?, version = ? WHERE id = ?")
        .bind(completed)
        .bind(updated_at)
        .bind(i64::try_from(next_version).context("version token out of range")?)
        .bind(id.to_string())
        .execute(&mut *conn)
        .await
        .context("failed to update todo completion")?;

    Ok(SetCompletedOutcome::Applied(StoredTodo {
        is_completed: completed,
        updated_at,
        version: next_version,
        ..current
    }))
}

fn next_updated_at(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    if now > previous {
        now
    } else {
        previous + Duration::milliseconds(UPDATED_AT_STEP_MS)
    }
}

fn todo_from_row(row: &SqliteRow) -> Result<StoredTodo> {
    let raw_id: String = row.try_get("id")?;
    let id = raw_id
        .parse::<TodoId>()
        .map_err(|e| anyhow!("malformed todo id '{raw_id}': {e}"))?;
    let version: i64 = row.try_get("version")?;
    Ok(StoredTodo {
        id,
        title: row.try_get("title")?,
        is_completed: row.try_get("is_completed")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        version: u64::try_from(version)
            .map_err(|_| anyhow!("malformed version {version} for todo '{raw_id}'"))?,
    })
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.contains(":memory:") || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
