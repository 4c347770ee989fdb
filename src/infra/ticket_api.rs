use async_trait::async_trait;
use serde_json::Value;

use crate::domain::ticket::{
    AssignTicketPayload, CreateTicketPayload, Ticket, TicketId, UpdateTicketPayload, User,
};
use crate::error::AppResult;
use crate::infra::gateway::RequestGateway;
use crate::services::IssueTrackerService;

const TICKETS_PATH: &str = "/tickets";
const ASSIGNABLE_USERS_PATH: &str = "/tickets/users/assignment";

/// Ticket endpoints served by the tickets realm.
pub struct HttpIssueTracker {
    gateway: RequestGateway,
}

impl HttpIssueTracker {
    pub fn new(gateway: RequestGateway) -> Self {
        Self { gateway }
    }

    fn ticket_path(id: &TicketId) -> String {
        format!("{TICKETS_PATH}/{id}")
    }
}

#[async_trait]
impl IssueTrackerService for HttpIssueTracker {
    async fn list_tickets(&self) -> AppResult<Vec<Ticket>> {
        self.gateway.get(TICKETS_PATH).await
    }

    async fn create_ticket(&self, payload: &CreateTicketPayload) -> AppResult<Ticket> {
        self.gateway.post(TICKETS_PATH, payload).await
    }

    async fn update_ticket(
        &self,
        id: &TicketId,
        payload: &UpdateTicketPayload,
    ) -> AppResult<Ticket> {
        self.gateway.patch(&Self::ticket_path(id), payload).await
    }

    async fn assign_ticket(
        &self,
        id: &TicketId,
        payload: &AssignTicketPayload,
    ) -> AppResult<Value> {
        let path = format!("{}/assign", Self::ticket_path(id));
        self.gateway.patch(&path, payload).await
    }

    async fn delete_ticket(&self, id: &TicketId) -> AppResult<()> {
        self.gateway.delete(&Self::ticket_path(id)).await
    }

    async fn list_assignable_users(&self) -> AppResult<Vec<User>> {
        self.gateway.get(ASSIGNABLE_USERS_PATH).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use reqwest::Client;
    use serde_json::json;
    use url::Url;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::domain::ticket::{EntityId, Priority, Status};
    use crate::infra::gateway::Realm;
    use crate::infra::session_store::MemorySessionStore;
    use crate::session::SessionGuard;
    use crate::testing::RecordingNavigator;

    async fn tracker() -> (MockServer, HttpIssueTracker) {
        let server = MockServer::start().await;
        let guard = Arc::new(SessionGuard::new(
            Arc::new(MemorySessionStore::with_entries([("token", "abc")])),
            Arc::new(RecordingNavigator::at("http://localhost/tickets/")),
            Url::parse("https://signin.example.com").unwrap(),
        ));
        let realm = Realm::new("tickets", server.uri(), "token");
        let tracker = HttpIssueTracker::new(RequestGateway::new(Client::new(), realm, guard));
        (server, tracker)
    }

    fn ticket_json(id: &str, status: &str) -> serde_json::Value {
        json!({
            "id": id,
            "title": "Login broken",
            "description": "Can't sign in",
            "priority": "high",
            "status": status,
            "contact_id": "c1",
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    #[tokio::test]
    async fn update_patches_only_editable_fields() {
        let (server, tracker) = tracker().await;
        Mock::given(method("PATCH"))
            .and(path("/tickets/t1"))
            .and(body_json(json!({
                "title": "New",
                "description": "D",
                "priority": "low",
                "status": "closed"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(ticket_json("t1", "closed")))
            .expect(1)
            .mount(&server)
            .await;

        let payload = UpdateTicketPayload {
            title: "New".to_string(),
            description: "D".to_string(),
            priority: Priority::Low,
            status: Status::Closed,
        };
        let ticket = tracker
            .update_ticket(&EntityId::from("t1"), &payload)
            .await
            .unwrap();
        assert_eq!(ticket.status, Status::Closed);
    }

    #[tokio::test]
    async fn assign_hits_the_assign_endpoint() {
        let (server, tracker) = tracker().await;
        Mock::given(method("PATCH"))
            .and(path("/tickets/7/assign"))
            .and(body_json(json!({"assigned_to": "u2"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "ok"})))
            .expect(1)
            .mount(&server)
            .await;

        let payload = AssignTicketPayload {
            assigned_to: EntityId::from("u2"),
        };
        let response = tracker
            .assign_ticket(&EntityId::from("7"), &payload)
            .await
            .unwrap();
        assert_eq!(response["message"], "ok");
    }

    #[tokio::test]
    async fn lists_tickets_and_users() {
        let (server, tracker) = tracker().await;
        Mock::given(method("GET"))
            .and(path("/tickets"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([ticket_json("t1", "open")])),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/tickets/users/assignment"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([{"id": 3, "name": "Grace"}])),
            )
            .mount(&server)
            .await;

        let tickets = tracker.list_tickets().await.unwrap();
        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets[0].contact_id, Some(EntityId::from("c1")));

        let users = tracker.list_assignable_users().await.unwrap();
        assert_eq!(users[0].id.as_str(), "3");
        assert_eq!(users[0].name, "Grace");
    }

    #[tokio::test]
    async fn rejects_unknown_status_from_server() {
        let (server, tracker) = tracker().await;
        Mock::given(method("GET"))
            .and(path("/tickets"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([ticket_json("t1", "pending")])),
            )
            .mount(&server)
            .await;

        assert!(matches!(
            tracker.list_tickets().await,
            Err(crate::error::AppError::Decode { .. })
        ));
    }

    #[tokio::test]
    async fn create_and_delete_round_through_the_server() {
        let (server, tracker) = tracker().await;
        Mock::given(method("POST"))
            .and(path("/tickets"))
            .and(body_json(json!({
                "title": "Login broken",
                "description": "Can't sign in",
                "priority": "high",
                "status": "open",
                "contact_id": "c1"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(ticket_json("t9", "open")))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/tickets/t9"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let payload = CreateTicketPayload {
            title: "Login broken".to_string(),
            description: "Can't sign in".to_string(),
            priority: Priority::High,
            status: Status::Open,
            contact_id: Some(EntityId::from("c1")),
        };
        let created = tracker.create_ticket(&payload).await.unwrap();
        assert_eq!(created.id.as_str(), "t9");
        assert!(created.created_at.is_some());

        tracker.delete_ticket(&created.id).await.unwrap();
    }
}
