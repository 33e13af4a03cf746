//! Ticket service: orchestrates the store, the SLA policy, the clock and
//! the identities handed over by the authenticator.

mod view;

use std::sync::Arc;

use helpdesk_core::ticket::require_text;
use helpdesk_core::{
    Authenticator, Clock, Comment, Identity, NewTicket, Result, SlaPolicy, Ticket, TicketPatch,
    TicketStore,
};
use time::OffsetDateTime;
use tracing::{debug, info, warn};

pub use view::TicketView;

pub struct TicketService {
    store: Arc<dyn TicketStore>,
    directory: Arc<dyn Authenticator>,
    clock: Arc<dyn Clock>,
    policy: SlaPolicy,
}

impl TicketService {
    pub fn new(
        store: Arc<dyn TicketStore>,
        directory: Arc<dyn Authenticator>,
        clock: Arc<dyn Clock>,
        policy: SlaPolicy,
    ) -> Self {
        Self {
            store,
            directory,
            clock,
            policy,
        }
    }

    pub fn policy(&self) -> &SlaPolicy {
        &self.policy
    }

    pub fn authenticator(&self) -> &dyn Authenticator {
        self.directory.as_ref()
    }

    pub fn now(&self) -> OffsetDateTime {
        self.clock.now()
    }

    /// Open a ticket on behalf of `identity`.
    ///
    /// Input is validated before the store is touched, and the SLA deadline
    /// is fixed here, once, from the resolved priority.
    pub async fn create_ticket(&self, identity: &Identity, new: NewTicket) -> Result<Ticket> {
        if let Err(e) = new.validate() {
            warn!(user = %identity.id, error = %e, "Rejected ticket");
            return Err(e);
        }

        let priority = new.priority.unwrap_or_default();
        let now = self.clock.now();
        let deadline = self.policy.compute_deadline(priority, now)?;
        let ticket = Ticket::new(
            new.title,
            new.description,
            priority,
            identity.id.clone(),
            now,
            deadline,
        );

        self.store.create(&ticket).await?;
        info!(
            ticket_id = %ticket.id,
            user = %identity.id,
            priority = %priority,
            "Created ticket"
        );
        Ok(ticket)
    }

    /// Patch the whitelisted fields of a ticket. The deadline stays put.
    pub async fn update_ticket(&self, id: &str, patch: TicketPatch) -> Result<Ticket> {
        if let Err(e) = patch.validate() {
            warn!(ticket_id = %id, error = %e, "Rejected update");
            return Err(e);
        }

        let ticket = self.store.update(id, &patch, self.clock.now()).await?;
        info!(ticket_id = %id, status = %ticket.status, "Updated ticket");
        Ok(ticket)
    }

    /// Append a comment authored by `identity`, capturing its display name
    pub async fn add_comment(&self, id: &str, identity: &Identity, text: String) -> Result<Ticket> {
        if let Err(e) = require_text("text", &text) {
            warn!(ticket_id = %id, user = %identity.id, "Rejected empty comment");
            return Err(e);
        }

        let now = self.clock.now();
        let comment = Comment::new(identity, text, now);
        let ticket = self.store.append_comment(id, &comment, now).await?;
        info!(ticket_id = %id, comment_id = %comment.id, user = %identity.id, "Added comment");
        Ok(ticket)
    }

    pub async fn delete_ticket(&self, id: &str) -> Result<()> {
        self.store.delete(id).await?;
        info!(ticket_id = %id, "Deleted ticket");
        Ok(())
    }

    pub async fn list_tickets(&self) -> Result<Vec<Ticket>> {
        let tickets = self.store.list().await?;
        debug!(count = tickets.len(), "Listed tickets");
        Ok(tickets)
    }

    pub async fn get_ticket(&self, id: &str) -> Result<Ticket> {
        debug!(ticket_id = %id, "Fetching ticket");
        self.store.get(id).await
    }

    /// Tickets newest first, each joined with SLA health and user profiles
    pub async fn list_views(&self) -> Result<Vec<TicketView>> {
        let now = self.clock.now();
        let mut views = Vec::new();
        for ticket in self.list_tickets().await? {
            views.push(self.view(ticket, now).await);
        }
        Ok(views)
    }

    pub async fn get_view(&self, id: &str) -> Result<TicketView> {
        let ticket = self.get_ticket(id).await?;
        Ok(self.view(ticket, self.clock.now()).await)
    }

    /// Join a ticket with read-time data. Nothing here is persisted.
    pub async fn view(&self, ticket: Ticket, now: OffsetDateTime) -> TicketView {
        let created_by_user = self.directory.lookup(&ticket.created_by).await;
        let assigned_to_user = match &ticket.assigned_to {
            Some(id) => self.directory.lookup(id).await,
            None => None,
        };
        TicketView::new(ticket, now, created_by_user, assigned_to_user)
    }
}
