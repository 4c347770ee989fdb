//! Test doubles shared by the unit tests.

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use url::Url;

use crate::domain::ticket::{
    AssignTicketPayload, Contact, CreateTicketPayload, EntityId, Status, Ticket,
    TicketId, UpdateTicketPayload, User,
};
use crate::error::{AppError, AppResult, RequestFailure};
use crate::services::{ContactDirectoryService, IssueTrackerService, Navigator};

pub struct RecordingNavigator {
    location: String,
    redirects: Mutex<Vec<Url>>,
}

impl RecordingNavigator {
    pub fn at(location: &str) -> Self {
        Self {
            location: location.to_string(),
            redirects: Mutex::new(Vec::new()),
        }
    }

    pub fn redirects(&self) -> Vec<Url> {
        self.redirects.lock().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn current_location(&self) -> String {
        self.location.clone()
    }

    fn redirect(&self, target: &Url) {
        self.redirects.lock().push(target.clone());
    }
}

pub fn ticket(id: &str, title: &str, status: Status) -> Ticket {
    serde_json::from_value(json!({
        "id": id,
        "title": title,
        "description": format!("{title} details"),
        "priority": "medium",
        "status": status.as_str(),
        "created_at": "2024-01-01T00:00:00Z",
    }))
    .expect("valid ticket fixture")
}

pub fn server_error(status: u16) -> AppError {
    AppError::Request(RequestFailure::from_response(status, r#"{"message":"boom"}"#))
}

/// Scripted tracker. Each list call pops the next scripted response; once
/// the script is exhausted the last one is repeated.
#[derive(Default)]
pub struct FakeTracker {
    pub list_script: Mutex<VecDeque<AppResult<Vec<Ticket>>>>,
    pub last_list: Mutex<Option<Vec<Ticket>>>,
    pub create_response: Mutex<Option<AppResult<Ticket>>>,
    pub update_response: Mutex<Option<AppResult<Ticket>>>,
    pub assign_response: Mutex<Option<AppResult<Value>>>,
    pub delete_response: Mutex<Option<AppResult<()>>>,
    pub users: Mutex<Option<AppResult<Vec<User>>>>,
    pub calls: Mutex<Vec<String>>,
    pub sent_updates: Mutex<Vec<UpdateTicketPayload>>,
    pub sent_assignments: Mutex<Vec<AssignTicketPayload>>,
}

impl FakeTracker {
    pub fn with_tickets(tickets: Vec<Ticket>) -> Self {
        let tracker = Self::default();
        tracker.script_list(Ok(tickets));
        tracker
    }

    pub fn script_list(&self, response: AppResult<Vec<Ticket>>) {
        self.list_script.lock().push_back(response);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.as_str() == call).count()
    }

    fn record(&self, call: &str) {
        self.calls.lock().push(call.to_string());
    }
}

fn take<T>(slot: &Mutex<Option<AppResult<T>>>, call: &str) -> AppResult<T> {
    slot.lock()
        .take()
        .unwrap_or_else(|| panic!("no scripted response for {call}"))
}

#[async_trait]
impl IssueTrackerService for FakeTracker {
    async fn list_tickets(&self) -> AppResult<Vec<Ticket>> {
        self.record("list");
        let next = self.list_script.lock().pop_front();
        match next {
            Some(Ok(tickets)) => {
                *self.last_list.lock() = Some(tickets.clone());
                Ok(tickets)
            }
            Some(Err(err)) => Err(err),
            None => Ok(self.last_list.lock().clone().unwrap_or_default()),
        }
    }

    async fn create_ticket(&self, _payload: &CreateTicketPayload) -> AppResult<Ticket> {
        self.record("create");
        take(&self.create_response, "create")
    }

    async fn update_ticket(
        &self,
        _id: &TicketId,
        payload: &UpdateTicketPayload,
    ) -> AppResult<Ticket> {
        self.record("update");
        self.sent_updates.lock().push(payload.clone());
        take(&self.update_response, "update")
    }

    async fn assign_ticket(
        &self,
        _id: &TicketId,
        payload: &AssignTicketPayload,
    ) -> AppResult<Value> {
        self.record("assign");
        self.sent_assignments.lock().push(payload.clone());
        take(&self.assign_response, "assign")
    }

    async fn delete_ticket(&self, _id: &TicketId) -> AppResult<()> {
        self.record("delete");
        take(&self.delete_response, "delete")
    }

    async fn list_assignable_users(&self) -> AppResult<Vec<User>> {
        self.record("users");
        take(&self.users, "users")
    }
}

pub struct FakeContacts {
    pub response: Mutex<Option<AppResult<Vec<Contact>>>>,
}

impl FakeContacts {
    pub fn returning(response: AppResult<Vec<Contact>>) -> Self {
        Self {
            response: Mutex::new(Some(response)),
        }
    }
}

#[async_trait]
impl ContactDirectoryService for FakeContacts {
    async fn list_contacts(&self) -> AppResult<Vec<Contact>> {
        take(&self.response, "contacts")
    }
}

pub fn user(id: &str, name: &str) -> User {
    User {
        id: EntityId::from(id),
        name: name.to_string(),
    }
}

pub fn contact(id: &str, first: &str, last: &str) -> Contact {
    Contact {
        id: EntityId::from(id),
        first_name: first.to_string(),
        last_name: last.to_string(),
    }
}
