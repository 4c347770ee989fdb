use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Server-assigned identifier. The API hands these out either as strings or
/// as numbers; both are kept as their textual form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct EntityId(String);

pub type TicketId = EntityId;

impl EntityId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(serde_json::Number),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(text) => Self(text),
            RawId::Number(number) => Self(number.to_string()),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "low" => Some(Priority::Low),
            "medium" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Open,
    Closed,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Open => "open",
            Status::Closed => "closed",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "open" => Some(Status::Open),
            "closed" => Some(Status::Closed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: TicketId,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_id: Option<EntityId>,
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
    /// Fields the server returns beyond the ones modelled here.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

const NAIVE_TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Server timestamps are display-only. RFC 3339 values keep their offset,
/// naive ones are read as UTC, and anything else decodes to `None` rather
/// than failing the whole ticket.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<Value>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let Some(text) = raw.as_str().map(str::trim) else {
        return Ok(None);
    };
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Ok(Some(parsed.with_timezone(&Utc)));
    }
    Ok(NAIVE_TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(|naive| naive.and_utc()))
}

impl Ticket {
    /// Assignment is only offered while the ticket is open.
    pub fn can_assign(&self) -> bool {
        self.status == Status::Open
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: EntityId,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: EntityId,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

impl Contact {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string()
    }
}

/// Body of `POST /tickets`: the whole draft.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateTicketPayload {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub status: Status,
    pub contact_id: Option<EntityId>,
}

/// Body of `PATCH /tickets/{id}`. The contact link is not editable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateTicketPayload {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub status: Status,
}

/// Body of `PATCH /tickets/{id}/assign`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssignTicketPayload {
    pub assigned_to: EntityId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TicketOperation {
    Create,
    Update,
    Assign,
    Delete,
}

impl TicketOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketOperation::Create => "create",
            TicketOperation::Update => "update",
            TicketOperation::Assign => "assign",
            TicketOperation::Delete => "delete",
        }
    }

    pub fn success_message(&self) -> &'static str {
        match self {
            TicketOperation::Create => "Ticket created successfully!",
            TicketOperation::Update => "Ticket updated successfully!",
            TicketOperation::Assign => "Ticket assigned successfully!",
            TicketOperation::Delete => "Ticket deleted successfully!",
        }
    }

    pub fn failure_message(&self) -> &'static str {
        match self {
            TicketOperation::Create => "Failed to create ticket",
            TicketOperation::Update => "Failed to update ticket",
            TicketOperation::Assign => "Failed to assign ticket.",
            TicketOperation::Delete => "Failed to delete ticket",
        }
    }
}
