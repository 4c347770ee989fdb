use async_trait::async_trait;
use serde_json::Value;

use crate::domain::ticket::{
    AssignTicketPayload, CreateTicketPayload, Ticket, TicketId, UpdateTicketPayload, User,
};
use crate::error::AppResult;

/// Ticket and assignable-user endpoints of the tickets realm.
#[async_trait]
pub trait IssueTrackerService: Send + Sync {
    async fn list_tickets(&self) -> AppResult<Vec<Ticket>>;
    async fn create_ticket(&self, payload: &CreateTicketPayload) -> AppResult<Ticket>;
    async fn update_ticket(
        &self,
        id: &TicketId,
        payload: &UpdateTicketPayload,
    ) -> AppResult<Ticket>;
    /// Returns the raw response; callers decide whether it is worth decoding.
    async fn assign_ticket(
        &self,
        id: &TicketId,
        payload: &AssignTicketPayload,
    ) -> AppResult<Value>;
    async fn delete_ticket(&self, id: &TicketId) -> AppResult<()>;
    async fn list_assignable_users(&self) -> AppResult<Vec<User>>;
}
