//! Row types and conversions between SQLite columns and domain models

use helpdesk_core::{Comment, Priority, Ticket, TicketStatus};
use sqlx::FromRow;
use time::OffsetDateTime;

use crate::{Result, StorageError};

#[derive(Debug, Clone, FromRow)]
pub struct TicketRow {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: String,
    pub priority: String,
    pub created_by: String,
    pub assigned_to: Option<String>,
    pub sla_deadline: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct CommentRow {
    pub ticket_id: String,
    pub position: i64,
    pub id: String,
    pub author_id: String,
    pub author_name: String,
    pub text: String,
    pub created_at: i64,
}

impl TicketRow {
    pub fn into_ticket(self, comments: Vec<Comment>) -> Result<Ticket> {
        Ok(Ticket {
            status: self
                .status
                .parse::<TicketStatus>()
                .map_err(|e| StorageError::Corrupt(e.to_string()))?,
            priority: self
                .priority
                .parse::<Priority>()
                .map_err(|e| StorageError::Corrupt(e.to_string()))?,
            sla_deadline: from_millis(self.sla_deadline)?,
            created_at: from_millis(self.created_at)?,
            updated_at: from_millis(self.updated_at)?,
            id: self.id,
            title: self.title,
            description: self.description,
            created_by: self.created_by,
            assigned_to: self.assigned_to,
            comments,
        })
    }
}

impl CommentRow {
    pub fn into_comment(self) -> Result<Comment> {
        Ok(Comment {
            created_at: from_millis(self.created_at)?,
            id: self.id,
            author_id: self.author_id,
            author_name: self.author_name,
            text: self.text,
        })
    }
}

/// Timestamps are stored as milliseconds since the Unix epoch
pub fn to_millis(at: OffsetDateTime) -> i64 {
    (at.unix_timestamp_nanos() / 1_000_000) as i64
}

pub fn from_millis(millis: i64) -> Result<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000)
        .map_err(|e| StorageError::Corrupt(format!("timestamp {}: {}", millis, e)))
}
