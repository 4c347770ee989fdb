//! Session-local view of tickets and the reference lists they point at.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::RwLock;

use crate::cancel::CancelToken;
use crate::domain::form::TicketFormPolicy;
use crate::domain::ticket::{
    Contact, CreateTicketPayload, EntityId, Ticket, TicketId, TicketOperation, UpdateTicketPayload,
    User,
};
use crate::error::{AppError, AppResult};
use crate::services::{ContactDirectoryService, IssueTrackerService};

/// How the cache catches up with a successful mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconcile {
    /// Apply the mutation's response to the cached list directly.
    OptimisticPatch,
    /// Fetch the whole list again.
    Refetch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcilePolicy {
    pub create: Reconcile,
    pub update: Reconcile,
    pub assign: Reconcile,
    pub delete: Reconcile,
}

impl ReconcilePolicy {
    pub fn for_operation(&self, operation: TicketOperation) -> Reconcile {
        match operation {
            TicketOperation::Create => self.create,
            TicketOperation::Update => self.update,
            TicketOperation::Assign => self.assign,
            TicketOperation::Delete => self.delete,
        }
    }
}

impl Default for ReconcilePolicy {
    /// Assignment refetches because its response may leave out fields that
    /// are derived from the assignee.
    fn default() -> Self {
        Self {
            create: Reconcile::OptimisticPatch,
            update: Reconcile::OptimisticPatch,
            assign: Reconcile::Refetch,
            delete: Reconcile::OptimisticPatch,
        }
    }
}

/// Result of loading users and contacts. Each side fails on its own.
#[derive(Debug, Default)]
pub struct ReferenceDataReport {
    pub users_error: Option<AppError>,
    pub contacts_error: Option<AppError>,
}

impl ReferenceDataReport {
    pub fn is_complete(&self) -> bool {
        self.users_error.is_none() && self.contacts_error.is_none()
    }
}

/// A successful assignment. The follow-up refresh may still have failed.
#[derive(Debug)]
pub struct AssignOutcome {
    pub refresh_error: Option<AppError>,
}

#[derive(Default)]
struct StoreState {
    tickets: Vec<Ticket>,
    users: Vec<User>,
    contacts: Vec<Contact>,
}

pub struct TicketStore {
    tracker: Arc<dyn IssueTrackerService>,
    contacts: Option<Arc<dyn ContactDirectoryService>>,
    policy: ReconcilePolicy,
    state: RwLock<StoreState>,
    /// Loads in flight; overlapping loads each count once.
    loading: AtomicUsize,
    submitting: AtomicBool,
    lifetime: CancelToken,
}

impl TicketStore {
    pub fn new(
        tracker: Arc<dyn IssueTrackerService>,
        contacts: Option<Arc<dyn ContactDirectoryService>>,
    ) -> Self {
        Self::with_policy(tracker, contacts, ReconcilePolicy::default())
    }

    pub fn with_policy(
        tracker: Arc<dyn IssueTrackerService>,
        contacts: Option<Arc<dyn ContactDirectoryService>>,
        policy: ReconcilePolicy,
    ) -> Self {
        Self {
            tracker,
            contacts,
            policy,
            state: RwLock::new(StoreState::default()),
            loading: AtomicUsize::new(0),
            submitting: AtomicBool::new(false),
            lifetime: CancelToken::new(),
        }
    }

    /// Ends the store's lifetime. Requests still in flight resolve to
    /// [`AppError::Cancelled`] and leave the cache alone.
    pub fn detach(&self) {
        self.lifetime.cancel();
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst) > 0
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::SeqCst)
    }

    pub fn tickets(&self) -> Vec<Ticket> {
        self.state.read().tickets.clone()
    }

    pub fn ticket(&self, id: &TicketId) -> Option<Ticket> {
        self.state
            .read()
            .tickets
            .iter()
            .find(|ticket| &ticket.id == id)
            .cloned()
    }

    pub fn users(&self) -> Vec<User> {
        self.state.read().users.clone()
    }

    pub fn contacts(&self) -> Vec<Contact> {
        self.state.read().contacts.clone()
    }

    pub fn user_name(&self, id: &EntityId) -> Option<String> {
        self.state
            .read()
            .users
            .iter()
            .find(|user| &user.id == id)
            .map(|user| user.name.clone())
    }

    pub fn contact_name(&self, id: &EntityId) -> Option<String> {
        self.state
            .read()
            .contacts
            .iter()
            .find(|contact| &contact.id == id)
            .map(Contact::display_name)
    }

    /// Replaces the cached list with the server's. On failure the cache keeps
    /// whatever it held before.
    pub async fn load_tickets(&self) -> AppResult<()> {
        let _loading = LoadGuard::enter(&self.loading);
        match self.lifetime.run(self.tracker.list_tickets()).await {
            Ok(tickets) => {
                tracing::debug!(count = tickets.len(), "ticket list loaded");
                self.state.write().tickets = tickets;
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to load tickets");
                Err(err)
            }
        }
    }

    pub async fn load_reference_data(&self) -> ReferenceDataReport {
        let (users_error, contacts_error) = tokio::join!(self.load_users(), self.load_contacts());
        ReferenceDataReport {
            users_error: users_error.err(),
            contacts_error: contacts_error.err(),
        }
    }

    async fn load_users(&self) -> AppResult<()> {
        let result = self.lifetime.run(self.tracker.list_assignable_users()).await;
        match result {
            Ok(users) => {
                self.state.write().users = users;
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to load assignable users");
                Err(err)
            }
        }
    }

    async fn load_contacts(&self) -> AppResult<()> {
        let Some(directory) = &self.contacts else {
            return Ok(());
        };
        match self.lifetime.run(directory.list_contacts()).await {
            Ok(contacts) => {
                self.state.write().contacts = contacts;
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to load contacts");
                Err(err)
            }
        }
    }

    pub async fn create_ticket(&self, payload: &CreateTicketPayload) -> AppResult<Ticket> {
        let _submitting = self.begin_submit()?;
        let ticket = self
            .lifetime
            .run(self.tracker.create_ticket(payload))
            .await?;
        tracing::info!(id = %ticket.id, "ticket created");

        match self.policy.for_operation(TicketOperation::Create) {
            Reconcile::OptimisticPatch => self.state.write().tickets.insert(0, ticket.clone()),
            Reconcile::Refetch => self.load_tickets().await?,
        }
        Ok(ticket)
    }

    pub async fn update_ticket(
        &self,
        id: &TicketId,
        payload: &UpdateTicketPayload,
    ) -> AppResult<Ticket> {
        let _submitting = self.begin_submit()?;
        let ticket = self
            .lifetime
            .run(self.tracker.update_ticket(id, payload))
            .await?;
        tracing::info!(%id, "ticket updated");

        match self.policy.for_operation(TicketOperation::Update) {
            Reconcile::OptimisticPatch => self.replace(id, &ticket),
            Reconcile::Refetch => self.load_tickets().await?,
        }
        Ok(ticket)
    }

    pub async fn assign_ticket(&self, id: &TicketId, user: &EntityId) -> AppResult<AssignOutcome> {
        let _submitting = self.begin_submit()?;
        let payload = TicketFormPolicy::assign_payload(user);
        let response = self
            .lifetime
            .run(self.tracker.assign_ticket(id, &payload))
            .await?;
        tracing::info!(%id, assigned_to = %user, "ticket assigned");

        let refresh_error = match self.policy.for_operation(TicketOperation::Assign) {
            Reconcile::Refetch => self.load_tickets().await.err(),
            Reconcile::OptimisticPatch => match serde_json::from_value::<Ticket>(response) {
                Ok(ticket) => {
                    self.replace(id, &ticket);
                    None
                }
                Err(err) => {
                    tracing::debug!(error = %err, "assign response is not a ticket; refetching");
                    self.load_tickets().await.err()
                }
            },
        };
        Ok(AssignOutcome { refresh_error })
    }

    pub async fn delete_ticket(&self, id: &TicketId) -> AppResult<()> {
        let _submitting = self.begin_submit()?;
        self.lifetime.run(self.tracker.delete_ticket(id)).await?;
        tracing::info!(%id, "ticket deleted");

        match self.policy.for_operation(TicketOperation::Delete) {
            Reconcile::OptimisticPatch => {
                self.state.write().tickets.retain(|ticket| &ticket.id != id);
            }
            Reconcile::Refetch => self.load_tickets().await?,
        }
        Ok(())
    }

    fn replace(&self, id: &TicketId, ticket: &Ticket) {
        let mut state = self.state.write();
        for cached in state.tickets.iter_mut().filter(|cached| &cached.id == id) {
            *cached = ticket.clone();
        }
    }

    pub(crate) fn begin_submit(&self) -> AppResult<FlagGuard<'_>> {
        FlagGuard::acquire(&self.submitting).ok_or(AppError::SubmitInProgress)
    }
}

/// Counts one load in flight for as long as it lives.
struct LoadGuard<'a>(&'a AtomicUsize);

impl<'a> LoadGuard<'a> {
    fn enter(count: &'a AtomicUsize) -> Self {
        count.fetch_add(1, Ordering::SeqCst);
        Self(count)
    }
}

impl Drop for LoadGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Holds the submit flag for as long as it lives.
pub(crate) struct FlagGuard<'a>(&'a AtomicBool);

impl<'a> FlagGuard<'a> {
    /// `None` when somebody already holds the flag.
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for FlagGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::domain::form::{TicketDraft, TicketFormPolicy};
    use crate::domain::ticket::{Priority, Status};
    use crate::testing::{FakeContacts, FakeTracker, contact, server_error, ticket, user};

    fn store_with(tracker: Arc<FakeTracker>) -> TicketStore {
        TicketStore::new(tracker, None)
    }

    fn ids(store: &TicketStore) -> Vec<String> {
        store
            .tickets()
            .iter()
            .map(|ticket| ticket.id.to_string())
            .collect()
    }

    async fn loaded(tickets: Vec<Ticket>) -> (TicketStore, Arc<FakeTracker>) {
        let tracker = Arc::new(FakeTracker::with_tickets(tickets));
        let store = store_with(tracker.clone());
        store.load_tickets().await.unwrap();
        (store, tracker)
    }

    #[tokio::test]
    async fn loading_twice_gives_the_same_cache() {
        let (store, _tracker) = loaded(vec![
            ticket("t1", "First", Status::Open),
            ticket("t2", "Second", Status::Closed),
        ])
        .await;
        let first = store.tickets();
        store.load_tickets().await.unwrap();
        assert_eq!(store.tickets(), first);
        assert!(!store.is_loading());
    }

    #[test]
    fn overlapping_loads_stay_loading_until_the_last_one_ends() {
        let store = store_with(Arc::new(FakeTracker::default()));
        let first = LoadGuard::enter(&store.loading);
        let second = LoadGuard::enter(&store.loading);

        drop(first);
        assert!(store.is_loading());
        drop(second);
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn failed_refresh_keeps_last_known_good() {
        let (store, tracker) = loaded(vec![ticket("t1", "First", Status::Open)]).await;
        tracker.script_list(Err(server_error(500)));

        assert!(store.load_tickets().await.is_err());
        assert_eq!(ids(&store), vec!["t1"]);
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn failed_initial_load_leaves_cache_empty() {
        let tracker = Arc::new(FakeTracker::default());
        tracker.script_list(Err(server_error(502)));
        let store = store_with(tracker);

        assert!(store.load_tickets().await.is_err());
        assert!(store.tickets().is_empty());
    }

    #[tokio::test]
    async fn create_prepends_the_server_ticket_once() {
        let (store, tracker) = loaded(vec![
            ticket("t1", "First", Status::Open),
            ticket("t2", "Second", Status::Open),
        ])
        .await;

        let created: Ticket = serde_json::from_value(json!({
            "id": "t9",
            "title": "Login broken",
            "description": "Can't sign in",
            "contact_id": "c1",
            "priority": "high",
            "status": "open",
            "created_at": "2024-01-01T00:00:00Z"
        }))
        .unwrap();
        *tracker.create_response.lock() = Some(Ok(created.clone()));

        let draft = TicketDraft {
            title: "Login broken".to_string(),
            description: "Can't sign in".to_string(),
            priority: Priority::High,
            contact_id: Some(EntityId::from("c1")),
            ..TicketDraft::blank()
        };
        let returned = store
            .create_ticket(&TicketFormPolicy::create_payload(&draft))
            .await
            .unwrap();

        assert_eq!(returned, created);
        assert_eq!(ids(&store), vec!["t9", "t1", "t2"]);
        assert_eq!(store.tickets()[0].created_at, created.created_at);
        assert_eq!(tracker.count("list"), 1);
    }

    #[tokio::test]
    async fn update_replaces_without_merging() {
        let mut original = ticket("t1", "Old", Status::Open);
        original
            .extra
            .insert("legacy_note".to_string(), json!("dropped by server"));
        let (store, tracker) =
            loaded(vec![original, ticket("t2", "Untouched", Status::Open)]).await;
        let untouched = store.ticket(&EntityId::from("t2")).unwrap();

        let mut echoed = ticket("t1", "New", Status::Closed);
        echoed.description = "D".to_string();
        echoed.priority = Priority::Low;
        *tracker.update_response.lock() = Some(Ok(echoed.clone()));

        let payload = UpdateTicketPayload {
            title: "New".to_string(),
            description: "D".to_string(),
            priority: Priority::Low,
            status: Status::Closed,
        };
        store
            .update_ticket(&EntityId::from("t1"), &payload)
            .await
            .unwrap();

        let cached = store.ticket(&EntityId::from("t1")).unwrap();
        assert_eq!(cached, echoed);
        assert!(!cached.extra.contains_key("legacy_note"));
        assert_eq!(cached.status, Status::Closed);
        assert!(!cached.can_assign());
        assert_eq!(store.ticket(&EntityId::from("t2")).unwrap(), untouched);
        assert_eq!(tracker.sent_updates.lock().as_slice(), &[payload]);
    }

    #[tokio::test]
    async fn assign_refetches_the_list() {
        let (store, tracker) = loaded(vec![ticket("t1", "First", Status::Open)]).await;
        let mut assigned = ticket("t1", "First", Status::Open);
        assigned.assigned_to = Some(EntityId::from("u2"));
        tracker.script_list(Ok(vec![assigned.clone()]));
        *tracker.assign_response.lock() = Some(Ok(json!({"ok": true})));

        let outcome = store
            .assign_ticket(&EntityId::from("t1"), &EntityId::from("u2"))
            .await
            .unwrap();

        assert!(outcome.refresh_error.is_none());
        assert_eq!(tracker.calls(), vec!["list", "assign", "list"]);
        assert_eq!(store.tickets(), vec![assigned]);
        assert_eq!(
            serde_json::to_value(&tracker.sent_assignments.lock()[0]).unwrap(),
            json!({"assigned_to": "u2"})
        );
    }

    #[tokio::test]
    async fn assign_refetches_even_when_reference_data_failed() {
        let tracker = Arc::new(FakeTracker::with_tickets(vec![ticket(
            "t1",
            "First",
            Status::Open,
        )]));
        *tracker.users.lock() = Some(Err(server_error(500)));
        let contacts = Arc::new(FakeContacts::returning(Err(server_error(503))));
        let store = TicketStore::new(tracker.clone(), Some(contacts));

        store.load_tickets().await.unwrap();
        let report = store.load_reference_data().await;
        assert!(report.users_error.is_some());
        assert!(report.contacts_error.is_some());

        *tracker.assign_response.lock() = Some(Ok(json!({})));
        store
            .assign_ticket(&EntityId::from("t1"), &EntityId::from("u1"))
            .await
            .unwrap();
        assert_eq!(tracker.count("list"), 2);
    }

    #[tokio::test]
    async fn assign_success_survives_failed_refresh() {
        let (store, tracker) = loaded(vec![ticket("t1", "First", Status::Open)]).await;
        tracker.script_list(Err(server_error(500)));
        *tracker.assign_response.lock() = Some(Ok(json!({})));

        let outcome = store
            .assign_ticket(&EntityId::from("t1"), &EntityId::from("u1"))
            .await
            .unwrap();
        assert!(outcome.refresh_error.is_some());
        assert_eq!(ids(&store), vec!["t1"]);
    }

    #[tokio::test]
    async fn optimistic_assign_patches_from_response() {
        let tracker = Arc::new(FakeTracker::with_tickets(vec![ticket(
            "t1",
            "First",
            Status::Open,
        )]));
        let policy = ReconcilePolicy {
            assign: Reconcile::OptimisticPatch,
            ..ReconcilePolicy::default()
        };
        let store = TicketStore::with_policy(tracker.clone(), None, policy);
        store.load_tickets().await.unwrap();

        let mut assigned = ticket("t1", "First", Status::Open);
        assigned.assigned_to = Some(EntityId::from("u5"));
        *tracker.assign_response.lock() = Some(Ok(serde_json::to_value(&assigned).unwrap()));

        store
            .assign_ticket(&EntityId::from("t1"), &EntityId::from("u5"))
            .await
            .unwrap();
        assert_eq!(tracker.count("list"), 1);
        assert_eq!(
            store.ticket(&EntityId::from("t1")).unwrap().assigned_to,
            Some(EntityId::from("u5"))
        );
    }

    #[test]
    fn default_policy_refetches_only_on_assign() {
        let policy = ReconcilePolicy::default();
        assert_eq!(
            policy.for_operation(TicketOperation::Assign),
            Reconcile::Refetch
        );
        for operation in [
            TicketOperation::Create,
            TicketOperation::Update,
            TicketOperation::Delete,
        ] {
            assert_eq!(policy.for_operation(operation), Reconcile::OptimisticPatch);
        }
    }

    #[tokio::test]
    async fn delete_removes_by_id() {
        let (store, tracker) = loaded(vec![
            ticket("t1", "First", Status::Open),
            ticket("t2", "Second", Status::Open),
        ])
        .await;
        *tracker.delete_response.lock() = Some(Ok(()));

        store.delete_ticket(&EntityId::from("t1")).await.unwrap();
        assert_eq!(ids(&store), vec!["t2"]);
    }

    #[tokio::test]
    async fn failed_mutation_leaves_cache_untouched() {
        let (store, tracker) = loaded(vec![ticket("t1", "First", Status::Open)]).await;
        let before = store.tickets();
        *tracker.update_response.lock() = Some(Err(server_error(422)));
        *tracker.delete_response.lock() = Some(Err(server_error(500)));

        let payload = TicketFormPolicy::update_payload(&TicketDraft::from_ticket(&before[0]));
        assert!(
            store
                .update_ticket(&EntityId::from("t1"), &payload)
                .await
                .is_err()
        );
        assert!(store.delete_ticket(&EntityId::from("t1")).await.is_err());
        assert_eq!(store.tickets(), before);
        assert!(!store.is_submitting());
    }

    #[tokio::test]
    async fn second_submission_is_refused_while_one_is_outstanding() {
        let (store, tracker) = loaded(vec![]).await;
        let _held = store.begin_submit().unwrap();
        assert!(store.is_submitting());

        let result = store.delete_ticket(&EntityId::from("t1")).await;
        assert!(matches!(result, Err(AppError::SubmitInProgress)));
        assert_eq!(tracker.count("delete"), 0);
    }

    #[tokio::test]
    async fn reference_lists_load_independently() {
        let tracker = Arc::new(FakeTracker::default());
        *tracker.users.lock() = Some(Ok(vec![user("u1", "Grace")]));
        let contacts = Arc::new(FakeContacts::returning(Err(server_error(500))));
        let store = TicketStore::new(tracker, Some(contacts));

        let report = store.load_reference_data().await;
        assert!(report.users_error.is_none());
        assert!(report.contacts_error.is_some());
        assert!(!report.is_complete());
        assert_eq!(store.user_name(&EntityId::from("u1")).as_deref(), Some("Grace"));
        assert!(store.contacts().is_empty());
    }

    #[tokio::test]
    async fn contact_lookup_uses_display_name() {
        let tracker = Arc::new(FakeTracker::default());
        *tracker.users.lock() = Some(Ok(vec![]));
        let contacts = Arc::new(FakeContacts::returning(Ok(vec![contact(
            "c1", "Ada", "Lovelace",
        )])));
        let store = TicketStore::new(tracker, Some(contacts));

        assert!(store.load_reference_data().await.is_complete());
        assert_eq!(
            store.contact_name(&EntityId::from("c1")).as_deref(),
            Some("Ada Lovelace")
        );
        assert_eq!(store.contact_name(&EntityId::from("c2")), None);
    }

    #[tokio::test]
    async fn detached_store_ignores_late_results() {
        let (store, tracker) = loaded(vec![ticket("t1", "First", Status::Open)]).await;
        tracker.script_list(Ok(vec![]));
        store.detach();

        assert!(matches!(store.load_tickets().await, Err(AppError::Cancelled)));
        assert_eq!(ids(&store), vec!["t1"]);
        assert_eq!(tracker.count("list"), 1);
    }
}
