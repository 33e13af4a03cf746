//! Database operations

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use async_trait::async_trait;
use helpdesk_core::{Comment, Error as CoreError, Ticket, TicketPatch, TicketStore};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::SqliteConnection;
use time::OffsetDateTime;
use tracing::{debug, info};

use crate::models::{CommentRow, TicketRow, to_millis};
use crate::Result;

const TICKET_COLUMNS: &str = "id, title, description, status, priority, created_by, assigned_to, \
     sla_deadline, created_at, updated_at";

const COMMENT_COLUMNS: &str = "ticket_id, position, id, author_id, author_name, text, created_at";

/// SQLite-backed ticket store
#[derive(Clone)]
pub struct Storage {
    pool: SqlitePool,
}

impl Storage {
    /// Open the database at `db_path`, or at the default data location
    pub async fn new(db_path: Option<PathBuf>) -> Result<Self> {
        let path = match db_path {
            Some(path) => path,
            None => Self::default_path(),
        };
        Self::connect(&path, 5).await
    }

    pub async fn connect(path: &Path, max_connections: u32) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;

        info!(path = %path.display(), "Opened ticket database");
        Self::with_pool(pool).await
    }

    /// Private in-memory database; a single connection keeps it alive
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None::<std::time::Duration>)
            .max_lifetime(None::<std::time::Duration>)
            .connect_with(options)
            .await?;
        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    /// Default database file in the platform data directory
    pub fn default_path() -> PathBuf {
        if let Some(dirs) = directories::ProjectDirs::from("com", "helpdesk", "helpdesk") {
            dirs.data_dir().join("helpdesk.db")
        } else {
            PathBuf::from("helpdesk.db")
        }
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn insert(&self, ticket: &Ticket) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO tickets (id, title, description, status, priority, created_by, assigned_to, \
             sla_deadline, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&ticket.id)
        .bind(&ticket.title)
        .bind(&ticket.description)
        .bind(ticket.status.as_str())
        .bind(ticket.priority.as_str())
        .bind(&ticket.created_by)
        .bind(&ticket.assigned_to)
        .bind(to_millis(ticket.sla_deadline))
        .bind(to_millis(ticket.created_at))
        .bind(to_millis(ticket.updated_at))
        .execute(&mut *tx)
        .await?;

        for (position, comment) in ticket.comments.iter().enumerate() {
            insert_comment(&mut *tx, &ticket.id, Some(position as i64), comment).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Refresh `updated_at` as the first statement of a transaction so the
    /// write lock is taken before anything is read. Returns false when the
    /// ticket does not exist.
    async fn claim(conn: &mut SqliteConnection, id: &str, now: OffsetDateTime) -> Result<bool> {
        let result = sqlx::query("UPDATE tickets SET updated_at = MAX(created_at, ?) WHERE id = ?")
            .bind(to_millis(now))
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn patch(&self, id: &str, patch: &TicketPatch, now: OffsetDateTime) -> Result<Option<Ticket>> {
        let mut tx = self.pool.begin().await?;

        if !Self::claim(&mut *tx, id, now).await? {
            return Ok(None);
        }
        let Some(mut ticket) = fetch_ticket(&mut *tx, id).await? else {
            return Ok(None);
        };
        patch.apply(&mut ticket, now);

        sqlx::query(
            "UPDATE tickets SET title = ?, description = ?, status = ?, priority = ?, \
             assigned_to = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&ticket.title)
        .bind(&ticket.description)
        .bind(ticket.status.as_str())
        .bind(ticket.priority.as_str())
        .bind(&ticket.assigned_to)
        .bind(to_millis(ticket.updated_at))
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(ticket))
    }

    async fn push_comment(&self, id: &str, comment: &Comment, now: OffsetDateTime) -> Result<Option<Ticket>> {
        let mut tx = self.pool.begin().await?;

        if !Self::claim(&mut *tx, id, now).await? {
            return Ok(None);
        }
        insert_comment(&mut *tx, id, None, comment).await?;
        let ticket = fetch_ticket(&mut *tx, id).await?;

        tx.commit().await?;
        Ok(ticket)
    }

    async fn remove(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM tickets WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn load(&self, id: &str) -> Result<Option<Ticket>> {
        let mut conn = self.pool.acquire().await?;
        fetch_ticket(&mut *conn, id).await
    }

    async fn load_all(&self) -> Result<Vec<Ticket>> {
        // One read transaction so tickets and comments come from the same snapshot
        let mut tx = self.pool.begin().await?;

        let rows: Vec<TicketRow> = sqlx::query_as(&format!(
            "SELECT {} FROM tickets ORDER BY created_at DESC, id ASC",
            TICKET_COLUMNS
        ))
        .fetch_all(&mut *tx)
        .await?;

        let comment_rows: Vec<CommentRow> = sqlx::query_as(&format!(
            "SELECT {} FROM comments ORDER BY ticket_id, position",
            COMMENT_COLUMNS
        ))
        .fetch_all(&mut *tx)
        .await?;

        let mut threads: HashMap<String, Vec<Comment>> = HashMap::new();
        for row in comment_rows {
            let ticket_id = row.ticket_id.clone();
            threads.entry(ticket_id).or_default().push(row.into_comment()?);
        }
        tx.commit().await?;

        rows.into_iter()
            .map(|row| {
                let comments = threads.remove(&row.id).unwrap_or_default();
                row.into_ticket(comments)
            })
            .collect()
    }
}

/// Insert a comment at `position`, or after the current last comment
async fn insert_comment(
    conn: &mut SqliteConnection,
    ticket_id: &str,
    position: Option<i64>,
    comment: &Comment,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO comments (ticket_id, position, id, author_id, author_name, text, created_at) \
         VALUES (?1, COALESCE(?2, (SELECT COALESCE(MAX(position), -1) + 1 FROM comments WHERE ticket_id = ?1)), \
         ?3, ?4, ?5, ?6, ?7)",
    )
    .bind(ticket_id)
    .bind(position)
    .bind(&comment.id)
    .bind(&comment.author_id)
    .bind(&comment.author_name)
    .bind(&comment.text)
    .bind(to_millis(comment.created_at))
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn fetch_ticket(conn: &mut SqliteConnection, id: &str) -> Result<Option<Ticket>> {
    let row: Option<TicketRow> = sqlx::query_as(&format!("SELECT {} FROM tickets WHERE id = ?", TICKET_COLUMNS))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let comment_rows: Vec<CommentRow> = sqlx::query_as(&format!(
        "SELECT {} FROM comments WHERE ticket_id = ? ORDER BY position",
        COMMENT_COLUMNS
    ))
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    let comments = comment_rows
        .into_iter()
        .map(CommentRow::into_comment)
        .collect::<Result<Vec<_>>>()?;

    row.into_ticket(comments).map(Some)
}

#[async_trait]
impl TicketStore for Storage {
    async fn create(&self, ticket: &Ticket) -> helpdesk_core::Result<String> {
        ticket.validate()?;
        self.insert(ticket).await?;
        debug!(ticket_id = %ticket.id, "Inserted ticket");
        Ok(ticket.id.clone())
    }

    async fn get(&self, id: &str) -> helpdesk_core::Result<Ticket> {
        self.load(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(id.to_string()))
    }

    async fn list(&self) -> helpdesk_core::Result<Vec<Ticket>> {
        Ok(self.load_all().await?)
    }

    async fn update(&self, id: &str, patch: &TicketPatch, now: OffsetDateTime) -> helpdesk_core::Result<Ticket> {
        self.patch(id, patch, now)
            .await?
            .ok_or_else(|| CoreError::NotFound(id.to_string()))
    }

    async fn append_comment(
        &self,
        id: &str,
        comment: &Comment,
        now: OffsetDateTime,
    ) -> helpdesk_core::Result<Ticket> {
        self.push_comment(id, comment, now)
            .await?
            .ok_or_else(|| CoreError::NotFound(id.to_string()))
    }

    async fn delete(&self, id: &str) -> helpdesk_core::Result<()> {
        if self.remove(id).await? {
            Ok(())
        } else {
            Err(CoreError::NotFound(id.to_string()))
        }
    }
}
