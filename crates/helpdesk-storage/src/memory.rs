//! In-memory ticket store

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use helpdesk_core::store::sort_newest_first;
use helpdesk_core::{Comment, Error, Result, Ticket, TicketPatch, TicketStore};
use time::OffsetDateTime;

/// Ticket store held in a concurrent map.
///
/// Mutations run while holding the entry's shard lock, so calls against the
/// same id are serialized and calls against different ids mostly are not.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tickets: DashMap<String, Ticket>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }

    fn mutate(&self, id: &str, f: impl FnOnce(&mut Ticket)) -> Result<Ticket> {
        let mut entry = self
            .tickets
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        f(entry.value_mut());
        Ok(entry.value().clone())
    }
}

#[async_trait]
impl TicketStore for MemoryStore {
    async fn create(&self, ticket: &Ticket) -> Result<String> {
        ticket.validate()?;
        match self.tickets.entry(ticket.id.clone()) {
            Entry::Occupied(_) => Err(Error::Storage(format!(
                "ticket {} already exists",
                ticket.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(ticket.clone());
                Ok(ticket.id.clone())
            }
        }
    }

    async fn get(&self, id: &str) -> Result<Ticket> {
        self.tickets
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    async fn list(&self) -> Result<Vec<Ticket>> {
        let mut tickets: Vec<Ticket> = self
            .tickets
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        sort_newest_first(&mut tickets);
        Ok(tickets)
    }

    async fn update(&self, id: &str, patch: &TicketPatch, now: OffsetDateTime) -> Result<Ticket> {
        self.mutate(id, |ticket| patch.apply(ticket, now))
    }

    async fn append_comment(&self, id: &str, comment: &Comment, now: OffsetDateTime) -> Result<Ticket> {
        self.mutate(id, |ticket| ticket.push_comment(comment.clone(), now))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.tickets
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }
}
