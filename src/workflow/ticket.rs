use crate::domain::form::{AssignForm, FormMode, TicketForm, TicketFormPolicy};
use crate::domain::ticket::{TicketId, TicketOperation};
use crate::error::{AppError, AppResult};
use crate::services::ConfirmPrompt;
use crate::store::{ReferenceDataReport, TicketStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Warning,
    Error,
}

/// A transient, user-facing message about the outcome of an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn success(operation: TicketOperation) -> Self {
        Self {
            kind: NoticeKind::Success,
            message: operation.success_message().to_string(),
        }
    }

    fn error(message: String) -> Self {
        Self {
            kind: NoticeKind::Error,
            message,
        }
    }

    /// The message for a failed `operation`, or `None` when the failure must
    /// not be shown: expired sessions are already being redirected, field
    /// errors sit next to their inputs, and cancelled work has no audience.
    pub fn failure(operation: TicketOperation, err: &AppError) -> Option<Self> {
        match err {
            AppError::Unauthorized(_)
            | AppError::Validation(_)
            | AppError::Cancelled
            | AppError::SubmitInProgress => None,
            AppError::Request(failure) => Some(Self::error(with_detail(
                operation.failure_message(),
                &failure.message,
            ))),
            AppError::ActionDisabled(message) => Some(Self::error(message.clone())),
            other => Some(Self::error(with_detail(
                operation.failure_message(),
                &other.to_string(),
            ))),
        }
    }

    /// Message for a failed load, following the same silencing rules.
    pub fn load_failure(err: &AppError) -> Option<Self> {
        match err {
            AppError::Unauthorized(_) | AppError::Cancelled => None,
            AppError::Request(failure) => Some(Self::error(failure.message.clone())),
            other => Some(Self::error(other.to_string())),
        }
    }
}

/// Joins a base message and its detail; a base that already ends a
/// sentence takes no colon.
fn with_detail(base: &str, detail: &str) -> String {
    if base.ends_with(['.', '!', '?']) {
        format!("{base} {detail}")
    } else {
        format!("{base}: {detail}")
    }
}

pub struct PageLoad {
    pub tickets: AppResult<()>,
    pub reference: ReferenceDataReport,
}

impl PageLoad {
    pub fn notices(&self) -> Vec<Notice> {
        [
            self.tickets.as_ref().err(),
            self.reference.users_error.as_ref(),
            self.reference.contacts_error.as_ref(),
        ]
        .into_iter()
        .flatten()
        .filter_map(Notice::load_failure)
        .collect()
    }
}

/// Loads the ticket list and both reference lists side by side.
pub async fn load_page(store: &TicketStore) -> PageLoad {
    if store.is_loading() {
        tracing::debug!("page load overlaps one already in flight");
    }
    let (tickets, reference) = tokio::join!(store.load_tickets(), store.load_reference_data());
    tracing::debug!(
        tickets_loaded = tickets.is_ok(),
        reference_complete = reference.is_complete(),
        "page loaded"
    );
    PageLoad { tickets, reference }
}

pub fn open_edit_form(store: &TicketStore, id: &TicketId) -> AppResult<TicketForm> {
    store
        .ticket(id)
        .map(|ticket| TicketForm::edit(&ticket))
        .ok_or_else(|| AppError::NotFound(id.to_string()))
}

/// Validates the dialog and, when valid, creates or updates the ticket.
/// Invalid drafts fail with [`AppError::Validation`] and never reach the
/// network.
pub async fn submit_ticket_form(store: &TicketStore, form: &mut TicketForm) -> AppResult<Notice> {
    if store.is_submitting() {
        return Err(AppError::SubmitInProgress);
    }
    if !form.validate() {
        return Err(AppError::Validation(form.errors().clone()));
    }

    let draft = form.draft();
    match (form.mode(), draft.id.as_ref()) {
        (FormMode::Create, _) => {
            store
                .create_ticket(&TicketFormPolicy::create_payload(draft))
                .await?;
            Ok(Notice::success(TicketOperation::Create))
        }
        (FormMode::Edit, Some(id)) => {
            store
                .update_ticket(id, &TicketFormPolicy::update_payload(draft))
                .await?;
            Ok(Notice::success(TicketOperation::Update))
        }
        (FormMode::Edit, None) => Err(AppError::NotFound("<unsaved draft>".to_string())),
    }
}

pub async fn submit_assignment(store: &TicketStore, form: &mut AssignForm) -> AppResult<Notice> {
    if store.is_submitting() {
        return Err(AppError::SubmitInProgress);
    }
    if !form.validate() {
        return Err(AppError::Validation(form.errors().clone()));
    }
    let id = form.ticket_id();
    if store.ticket(id).is_some_and(|ticket| !ticket.can_assign()) {
        return Err(AppError::ActionDisabled(format!(
            "Ticket {id} is closed; assignment is disabled."
        )));
    }

    let user = form
        .user()
        .ok_or_else(|| AppError::Validation(form.errors().clone()))?;
    let outcome = store.assign_ticket(id, user).await?;

    Ok(match outcome.refresh_error {
        None => Notice::success(TicketOperation::Assign),
        Some(err) => Notice {
            kind: NoticeKind::Warning,
            message: format!(
                "{} Refreshing the ticket list failed: {err}",
                TicketOperation::Assign.success_message()
            ),
        },
    })
}

/// Deletes after the user confirms. A declined prompt sends nothing and
/// returns `None`.
pub async fn delete_ticket(
    store: &TicketStore,
    id: &TicketId,
    prompt: &dyn ConfirmPrompt,
) -> AppResult<Option<Notice>> {
    if !prompt.confirm(&format!("Delete ticket {id}?"))? {
        return Ok(None);
    }
    store.delete_ticket(id).await?;
    Ok(Some(Notice::success(TicketOperation::Delete)))
}
