//! Ticket domain model

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;

use crate::{Error, Identity, Result};

/// Lifecycle state of a ticket. Any state may be set by an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum TicketStatus {
    #[default]
    Open,
    #[serde(rename = "In Progress")]
    InProgress,
    Resolved,
    Closed,
}

impl TicketStatus {
    pub const ALL: [TicketStatus; 4] = [
        TicketStatus::Open,
        TicketStatus::InProgress,
        TicketStatus::Resolved,
        TicketStatus::Closed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Open => "Open",
            TicketStatus::InProgress => "In Progress",
            TicketStatus::Resolved => "Resolved",
            TicketStatus::Closed => "Closed",
        }
    }

    /// Resolved and Closed tickets no longer run against their SLA
    pub fn is_finished(&self) -> bool {
        matches!(self, TicketStatus::Resolved | TicketStatus::Closed)
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match normalize(s).as_str() {
            "open" => Ok(TicketStatus::Open),
            "inprogress" => Ok(TicketStatus::InProgress),
            "resolved" => Ok(TicketStatus::Resolved),
            "closed" => Ok(TicketStatus::Closed),
            _ => Err(Error::validation("status", format!("unknown status '{}'", s))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Priority {
    pub const ALL: [Priority; 4] = [
        Priority::Low,
        Priority::Medium,
        Priority::High,
        Priority::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
            Priority::Critical => "Critical",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match normalize(s).as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            "critical" => Ok(Priority::Critical),
            _ => Err(Error::validation(
                "priority",
                format!("unknown priority '{}'", s),
            )),
        }
    }
}

/// Wire values go through `FromStr`, so the API accepts the same
/// spellings as the CLI.
macro_rules! deserialize_via_from_str {
    ($ty:ty) => {
        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

deserialize_via_from_str!(TicketStatus);
deserialize_via_from_str!(Priority);

/// Lowercase and drop separators so "In Progress", "in_progress" and
/// "InProgress" all compare equal.
fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-'))
        .flat_map(char::to_lowercase)
        .collect()
}

/// A support ticket together with its comment thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: TicketStatus,
    pub priority: Priority,
    pub created_by: String,
    pub assigned_to: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub sla_deadline: OffsetDateTime,
    pub comments: Vec<Comment>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Ticket {
    /// Build a freshly opened ticket. The deadline is supplied by the caller
    /// so that it is computed exactly once, before the record is persisted.
    pub fn new(
        title: String,
        description: String,
        priority: Priority,
        created_by: String,
        created_at: OffsetDateTime,
        sla_deadline: OffsetDateTime,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title,
            description,
            status: TicketStatus::Open,
            priority,
            created_by,
            assigned_to: None,
            sla_deadline,
            comments: Vec::new(),
            created_at,
            updated_at: created_at,
        }
    }

    /// Check the fields every persisted ticket must carry
    pub fn validate(&self) -> Result<()> {
        require_text("title", &self.title)?;
        require_text("description", &self.description)?;
        Ok(())
    }

    /// Refresh `updated_at`, never letting it fall behind `created_at`
    pub fn touch(&mut self, now: OffsetDateTime) {
        self.updated_at = now.max(self.created_at);
    }

    /// Append a comment to the end of the thread
    pub fn push_comment(&mut self, comment: Comment, now: OffsetDateTime) {
        self.comments.push(comment);
        self.touch(now);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub author_id: String,
    /// Display name captured when the comment was written
    pub author_name: String,
    pub text: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Comment {
    pub fn new(author: &Identity, text: String, created_at: OffsetDateTime) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            author_id: author.id.clone(),
            author_name: author.name.clone(),
            text,
            created_at,
        }
    }
}

/// Input for opening a ticket
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NewTicket {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Missing, `null` or blank all mean the default priority
    #[serde(default, deserialize_with = "blank_as_default")]
    pub priority: Option<Priority>,
}

impl NewTicket {
    pub fn validate(&self) -> Result<()> {
        require_text("title", &self.title)?;
        require_text("description", &self.description)?;
        Ok(())
    }
}

/// Partial update of a ticket.
///
/// Only these fields can be patched. `assigned_to` is tri-state: absent
/// leaves the assignment alone, `null` clears it, a string replaces it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<TicketStatus>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default, deserialize_with = "present")]
    pub assigned_to: Option<Option<String>>,
}

impl TicketPatch {
    pub fn status(status: TicketStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.assigned_to.is_none()
    }

    /// Reject present-but-blank values instead of reading them as "omitted"
    pub fn validate(&self) -> Result<()> {
        if let Some(title) = &self.title {
            require_text("title", title)?;
        }
        if let Some(description) = &self.description {
            require_text("description", description)?;
        }
        if let Some(Some(assignee)) = &self.assigned_to
            && assignee.trim().is_empty()
        {
            return Err(Error::validation(
                "assignedTo",
                "must not be empty (send null to unassign)",
            ));
        }
        Ok(())
    }

    /// Apply the present fields and refresh `updated_at`.
    ///
    /// `sla_deadline` is left alone even when the priority changes.
    pub fn apply(&self, ticket: &mut Ticket, now: OffsetDateTime) {
        if let Some(title) = &self.title {
            ticket.title = title.clone();
        }
        if let Some(description) = &self.description {
            ticket.description = description.clone();
        }
        if let Some(status) = self.status {
            ticket.status = status;
        }
        if let Some(priority) = self.priority {
            ticket.priority = priority;
        }
        if let Some(assigned_to) = &self.assigned_to {
            ticket.assigned_to = assigned_to.clone();
        }
        ticket.touch(now);
    }
}

fn blank_as_default<'de, D>(deserializer: D) -> std::result::Result<Option<Priority>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) if !raw.trim().is_empty() => raw.parse().map(Some).map_err(serde::de::Error::custom),
        _ => Ok(None),
    }
}

/// Marks a field as present even when its value is `null`
fn present<'de, D>(deserializer: D) -> std::result::Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// Reject empty or whitespace-only text
pub fn require_text(field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::validation(field, "must not be empty"));
    }
    Ok(())
}
