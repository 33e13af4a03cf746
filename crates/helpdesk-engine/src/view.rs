use helpdesk_core::{SlaStatus, Ticket, UserSummary, classify, time_left_label};
use serde::Serialize;
use time::OffsetDateTime;

/// A ticket as presented to readers: the stored record plus derived SLA
/// health and the profiles of the people it references.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketView {
    #[serde(flatten)]
    pub ticket: Ticket,
    pub sla_status: SlaStatus,
    pub time_left: String,
    pub created_by_user: Option<UserSummary>,
    pub assigned_to_user: Option<UserSummary>,
}

impl TicketView {
    pub fn new(
        ticket: Ticket,
        now: OffsetDateTime,
        created_by_user: Option<UserSummary>,
        assigned_to_user: Option<UserSummary>,
    ) -> Self {
        Self {
            sla_status: classify(&ticket, now),
            time_left: time_left_label(ticket.sla_deadline, now),
            ticket,
            created_by_user,
            assigned_to_user,
        }
    }
}
