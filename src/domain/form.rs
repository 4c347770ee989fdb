//! Validation and payload shaping for the ticket dialogs.
//!
//! Errors are field-scoped: each one belongs to the input it is shown next
//! to and is cleared on its own when that input changes.

use std::collections::BTreeMap;
use std::fmt;

use crate::domain::ticket::{
    AssignTicketPayload, CreateTicketPayload, EntityId, Priority, Status, Ticket, TicketId,
    UpdateTicketPayload,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Title,
    Description,
    ContactId,
    AssignedTo,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Description => "description",
            Field::ContactId => "contact_id",
            Field::AssignedTo => "assigned_to",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<Field, String>);

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn insert(&mut self, field: Field, message: impl Into<String>) {
        self.0.insert(field, message.into());
    }

    pub fn clear(&mut self, field: Field) {
        self.0.remove(&field);
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.0.iter().map(|(field, message)| (*field, message.as_str()))
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in self.iter() {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{}: {message}", field.as_str())?;
            first = false;
        }
        Ok(())
    }
}

/// Form-local copy of a ticket, alive only while its dialog is open.
#[derive(Debug, Clone, PartialEq)]
pub struct TicketDraft {
    pub id: Option<TicketId>,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub status: Status,
    pub contact_id: Option<EntityId>,
}

impl TicketDraft {
    pub fn blank() -> Self {
        Self {
            id: None,
            title: String::new(),
            description: String::new(),
            priority: Priority::Low,
            status: Status::Open,
            contact_id: None,
        }
    }

    pub fn from_ticket(ticket: &Ticket) -> Self {
        Self {
            id: Some(ticket.id.clone()),
            title: ticket.title.clone(),
            description: ticket.description.clone(),
            priority: ticket.priority,
            status: ticket.status,
            contact_id: ticket.contact_id.clone(),
        }
    }
}

pub struct TicketFormPolicy;

impl TicketFormPolicy {
    pub const TITLE_REQUIRED: &'static str = "Title is required.";
    pub const DESCRIPTION_REQUIRED: &'static str = "Description is required.";
    pub const CONTACT_REQUIRED: &'static str = "Contact is required.";
    pub const ASSIGNEE_REQUIRED: &'static str = "Please select a user to assign.";

    pub fn validate(draft: &TicketDraft, mode: FormMode) -> FieldErrors {
        let mut errors = FieldErrors::default();
        if draft.title.trim().is_empty() {
            errors.insert(Field::Title, Self::TITLE_REQUIRED);
        }
        if draft.description.trim().is_empty() {
            errors.insert(Field::Description, Self::DESCRIPTION_REQUIRED);
        }
        if mode == FormMode::Create && !has_value(draft.contact_id.as_ref()) {
            errors.insert(Field::ContactId, Self::CONTACT_REQUIRED);
        }
        errors
    }

    pub fn validate_assignment(user: Option<&EntityId>) -> FieldErrors {
        let mut errors = FieldErrors::default();
        if !has_value(user) {
            errors.insert(Field::AssignedTo, Self::ASSIGNEE_REQUIRED);
        }
        errors
    }

    pub fn create_payload(draft: &TicketDraft) -> CreateTicketPayload {
        CreateTicketPayload {
            title: draft.title.clone(),
            description: draft.description.clone(),
            priority: draft.priority,
            status: draft.status,
            contact_id: draft.contact_id.clone(),
        }
    }

    pub fn update_payload(draft: &TicketDraft) -> UpdateTicketPayload {
        UpdateTicketPayload {
            title: draft.title.clone(),
            description: draft.description.clone(),
            priority: draft.priority,
            status: draft.status,
        }
    }

    pub fn assign_payload(user: &EntityId) -> AssignTicketPayload {
        AssignTicketPayload {
            assigned_to: user.clone(),
        }
    }
}

fn has_value(id: Option<&EntityId>) -> bool {
    id.is_some_and(|id| !id.as_str().trim().is_empty())
}

/// Create/edit dialog state: the draft plus the errors shown next to it.
#[derive(Debug, Clone)]
pub struct TicketForm {
    mode: FormMode,
    draft: TicketDraft,
    errors: FieldErrors,
}

impl TicketForm {
    pub fn create() -> Self {
        Self {
            mode: FormMode::Create,
            draft: TicketDraft::blank(),
            errors: FieldErrors::default(),
        }
    }

    pub fn edit(ticket: &Ticket) -> Self {
        Self {
            mode: FormMode::Edit,
            draft: TicketDraft::from_ticket(ticket),
            errors: FieldErrors::default(),
        }
    }

    pub fn mode(&self) -> FormMode {
        self.mode
    }

    pub fn draft(&self) -> &TicketDraft {
        &self.draft
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn set_title(&mut self, value: impl Into<String>) {
        self.draft.title = value.into();
        self.errors.clear(Field::Title);
    }

    pub fn set_description(&mut self, value: impl Into<String>) {
        self.draft.description = value.into();
        self.errors.clear(Field::Description);
    }

    pub fn set_contact(&mut self, value: Option<EntityId>) {
        self.draft.contact_id = value;
        self.errors.clear(Field::ContactId);
    }

    pub fn set_priority(&mut self, value: Priority) {
        self.draft.priority = value;
    }

    pub fn set_status(&mut self, value: Status) {
        self.draft.status = value;
    }

    /// Re-runs validation, replacing the displayed errors. Returns true when
    /// the draft may be submitted.
    pub fn validate(&mut self) -> bool {
        self.errors = TicketFormPolicy::validate(&self.draft, self.mode);
        self.errors.is_empty()
    }
}

/// Assign dialog state.
#[derive(Debug, Clone)]
pub struct AssignForm {
    ticket_id: TicketId,
    user: Option<EntityId>,
    errors: FieldErrors,
}

impl AssignForm {
    pub fn new(ticket_id: TicketId) -> Self {
        Self {
            ticket_id,
            user: None,
            errors: FieldErrors::default(),
        }
    }

    pub fn ticket_id(&self) -> &TicketId {
        &self.ticket_id
    }

    pub fn user(&self) -> Option<&EntityId> {
        self.user.as_ref()
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn select_user(&mut self, user: Option<EntityId>) {
        self.user = user;
        self.errors.clear(Field::AssignedTo);
    }

    pub fn validate(&mut self) -> bool {
        self.errors = TicketFormPolicy::validate_assignment(self.user.as_ref());
        self.errors.is_empty()
    }
}
