//! Ticket store contract

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::{Comment, Result, Ticket, TicketPatch};

/// Durable home of tickets and their comment threads.
///
/// Every mutation is atomic with respect to a single ticket: concurrent
/// updates or appends against one id never interleave partially.
#[async_trait]
pub trait TicketStore: Send + Sync {
    /// Persist a new ticket and return its id
    async fn create(&self, ticket: &Ticket) -> Result<String>;

    async fn get(&self, id: &str) -> Result<Ticket>;

    /// All tickets, newest first
    async fn list(&self) -> Result<Vec<Ticket>>;

    /// Apply the fields present in `patch` and refresh `updated_at`
    async fn update(&self, id: &str, patch: &TicketPatch, now: OffsetDateTime) -> Result<Ticket>;

    /// Append to the end of the comment thread and refresh `updated_at`
    async fn append_comment(&self, id: &str, comment: &Comment, now: OffsetDateTime) -> Result<Ticket>;

    async fn delete(&self, id: &str) -> Result<()>;
}

/// Newest first, ties broken by id so listings are stable
pub fn sort_newest_first(tickets: &mut [Ticket]) {
    tickets.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
}
