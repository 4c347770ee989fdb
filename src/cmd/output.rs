use clap::ValueEnum;
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::domain::form::{Field, FieldErrors};
use crate::domain::format::{capitalize, date_time, truncate};
use crate::domain::ticket::{Contact, Ticket, User};
use crate::error::{AppError, AppResult};
use crate::store::TicketStore;
use crate::workflow::ticket::{Notice, NoticeKind};

const TITLE_WIDTH: usize = 50;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

pub fn print_json<T: Serialize>(data: &T) -> AppResult<()> {
    let text = serde_json::to_string_pretty(data)
        .map_err(|err| AppError::Configuration(format!("failed to render JSON: {err}")))?;
    println!("{text}");
    Ok(())
}

pub fn print_notice(notice: &Notice) {
    match notice.kind {
        NoticeKind::Success => println!("{}", notice.message),
        NoticeKind::Warning => eprintln!("Warning: {}", notice.message),
        NoticeKind::Error => eprintln!("Error: {}", notice.message),
    }
}

/// Field errors, each next to the flag that feeds the field.
pub fn print_field_errors(errors: &FieldErrors) {
    for (field, message) in errors.iter() {
        eprintln!("  --{}: {message}", flag_for(field));
    }
}

fn flag_for(field: Field) -> &'static str {
    match field {
        Field::Title => "title",
        Field::Description => "description",
        Field::ContactId => "contact",
        Field::AssignedTo => "user",
    }
}

#[derive(Tabled)]
pub struct TicketRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Priority")]
    priority: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Assigned To")]
    assignee: String,
    #[tabled(rename = "Contact")]
    contact: String,
    #[tabled(rename = "Created At")]
    created: String,
}

/// One row for users and contacts alike.
#[derive(Tabled)]
pub struct NamedRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
}

impl From<&User> for NamedRow {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            name: user.name.clone(),
        }
    }
}

impl From<&Contact> for NamedRow {
    fn from(contact: &Contact) -> Self {
        Self {
            id: contact.id.to_string(),
            name: contact.display_name(),
        }
    }
}

/// Assignee and contact ids resolve to names through the store's lookups;
/// unknown ids are shown as-is.
pub fn ticket_rows(store: &TicketStore, tickets: &[Ticket]) -> Vec<TicketRow> {
    tickets
        .iter()
        .map(|ticket| {
            let assignee = ticket
                .assigned_to
                .as_ref()
                .map(|id| store.user_name(id).unwrap_or_else(|| id.to_string()))
                .unwrap_or_else(|| "-".to_string());
            let contact = ticket
                .contact_id
                .as_ref()
                .map(|id| store.contact_name(id).unwrap_or_else(|| id.to_string()))
                .unwrap_or_else(|| "-".to_string());
            let created = ticket
                .created_at
                .as_ref()
                .map(date_time)
                .unwrap_or_else(|| "-".to_string());
            TicketRow {
                id: ticket.id.to_string(),
                title: truncate(&ticket.title, TITLE_WIDTH),
                priority: capitalize(ticket.priority.as_str()),
                status: capitalize(ticket.status.as_str()),
                assignee,
                contact,
                created,
            }
        })
        .collect()
}

pub fn render_table<R: Tabled>(rows: impl IntoIterator<Item = R>) -> String {
    Table::new(rows).with(Style::psql()).to_string()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::domain::ticket::{EntityId, Status};
    use crate::testing::{FakeTracker, ticket, user};

    #[test]
    fn named_rows_share_one_layout() {
        let users = [user("u1", "Sam")];
        let table = render_table(users.iter().map(NamedRow::from));
        let lines = table.lines().collect::<Vec<_>>();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("ID") && lines[0].contains("Name"));
        assert!(lines[2].contains("u1") && lines[2].contains("Sam"));
    }

    #[tokio::test]
    async fn ticket_rows_resolve_names_and_keep_unknown_ids() {
        let mut assigned = ticket("t1", "Printer jam", Status::Open);
        assigned.assigned_to = Some(EntityId::from("u1"));
        assigned.contact_id = Some(EntityId::from("c9"));
        let tracker = Arc::new(FakeTracker::with_tickets(vec![assigned.clone()]));
        *tracker.users.lock() = Some(Ok(vec![user("u1", "Sam")]));
        let store = TicketStore::new(tracker, None);
        store.load_reference_data().await;

        let rows = ticket_rows(&store, &[assigned]);
        let table = render_table(rows);

        assert!(table.contains("Assigned To"));
        assert!(table.contains("Printer jam"));
        assert!(table.contains("Open"));
        assert!(table.contains("Sam"));
        assert!(table.contains("c9"));
    }
}
