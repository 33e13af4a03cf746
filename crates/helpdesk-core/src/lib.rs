//! Core domain models and logic for helpdesk
//!
//! This crate contains:
//! - Domain models (Ticket, Comment, TicketPatch)
//! - SLA policy (deadline computation and read-time classification)
//! - Collaborator contracts (TicketStore, Authenticator, Clock)

pub mod clock;
pub mod error;
pub mod identity;
pub mod sla;
pub mod store;
pub mod ticket;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{Error, Result};
pub use identity::{Authenticator, Identity, StaticAuthenticator, UserSummary};
pub use sla::{SlaPolicy, SlaStatus, classify, compute_deadline, time_left_label};
pub use store::TicketStore;
pub use ticket::{Comment, NewTicket, Priority, Ticket, TicketPatch, TicketStatus};
