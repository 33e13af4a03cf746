//! SLA policy: deadline computation and read-time classification
//!
//! Deadlines are derived once, when a ticket is opened. Classification is
//! never stored; it is recomputed against the caller's `now` on every read.

use std::fmt;

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::{Error, Priority, Result, Ticket, TicketStatus};

/// Resolution window per priority
pub const DEFAULT_SLA_TABLE: [(Priority, Duration); 4] = [
    (Priority::Critical, Duration::hours(1)),
    (Priority::High, Duration::hours(4)),
    (Priority::Medium, Duration::hours(8)),
    (Priority::Low, Duration::hours(24)),
];

/// Offset used when a priority has no entry in the table
pub const FALLBACK_OFFSET: Duration = Duration::hours(8);

/// Remaining time below which an open ticket is flagged as critical
pub const CRITICAL_WINDOW: Duration = Duration::hours(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlaPolicy {
    table: Vec<(Priority, Duration)>,
}

impl SlaPolicy {
    pub fn new(table: impl IntoIterator<Item = (Priority, Duration)>) -> Self {
        Self {
            table: table.into_iter().collect(),
        }
    }

    /// Build a table from whole hours. Out-of-range values saturate
    /// instead of overflowing.
    pub fn from_hours(critical: i64, high: i64, medium: i64, low: i64) -> Self {
        let hours = |h: i64| Duration::seconds(h.saturating_mul(3600));
        Self::new([
            (Priority::Critical, hours(critical)),
            (Priority::High, hours(high)),
            (Priority::Medium, hours(medium)),
            (Priority::Low, hours(low)),
        ])
    }

    pub fn offset(&self, priority: Priority) -> Duration {
        self.lookup(priority).unwrap_or_else(|| self.fallback())
    }

    /// Offset for a priority given by name. Unknown names get the Medium
    /// offset rather than an error.
    pub fn offset_for_name(&self, name: &str) -> Duration {
        match name.parse::<Priority>() {
            Ok(priority) => self.offset(priority),
            Err(_) => self.fallback(),
        }
    }

    /// `created_at` plus the priority's offset. Fails when the sum falls
    /// outside the representable date range.
    pub fn compute_deadline(&self, priority: Priority, created_at: OffsetDateTime) -> Result<OffsetDateTime> {
        created_at.checked_add(self.offset(priority)).ok_or_else(|| {
            Error::validation(
                "priority",
                format!("SLA deadline for {} is out of range", priority),
            )
        })
    }

    fn lookup(&self, priority: Priority) -> Option<Duration> {
        self.table
            .iter()
            .find(|(p, _)| *p == priority)
            .map(|(_, offset)| *offset)
    }

    fn fallback(&self) -> Duration {
        self.lookup(Priority::Medium).unwrap_or(FALLBACK_OFFSET)
    }
}

impl Default for SlaPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_SLA_TABLE)
    }
}

/// Deadline under the default table
pub fn compute_deadline(priority: Priority, created_at: OffsetDateTime) -> Result<OffsetDateTime> {
    SlaPolicy::default().compute_deadline(priority, created_at)
}

/// Derived SLA health of a ticket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlaStatus {
    Met,
    Breached,
    Critical,
    #[serde(rename = "On Track")]
    OnTrack,
}

impl SlaStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlaStatus::Met => "Met",
            SlaStatus::Breached => "Breached",
            SlaStatus::Critical => "Critical",
            SlaStatus::OnTrack => "On Track",
        }
    }
}

impl fmt::Display for SlaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn classify(ticket: &Ticket, now: OffsetDateTime) -> SlaStatus {
    classify_parts(ticket.status, ticket.sla_deadline, now)
}

pub fn classify_parts(status: TicketStatus, deadline: OffsetDateTime, now: OffsetDateTime) -> SlaStatus {
    if status.is_finished() {
        SlaStatus::Met
    } else if now > deadline {
        SlaStatus::Breached
    } else if deadline - now < CRITICAL_WINDOW {
        SlaStatus::Critical
    } else {
        SlaStatus::OnTrack
    }
}

/// Countdown label such as "3h 12m left" or "Overdue by 0h 45m"
pub fn time_left_label(deadline: OffsetDateTime, now: OffsetDateTime) -> String {
    let diff = deadline - now;
    let abs = diff.abs();
    let hours = abs.whole_hours();
    let minutes = abs.whole_minutes() % 60;

    if diff.is_negative() {
        format!("Overdue by {}h {}m", hours, minutes)
    } else {
        format!("{}h {}m left", hours, minutes)
    }
}
