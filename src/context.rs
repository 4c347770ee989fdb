use std::sync::Arc;

use reqwest::Client;

use crate::config::AppConfig;
use crate::domain::credential::TOKEN_KEY;
use crate::error::{AppError, AppResult};
use crate::infra::contact_api::HttpContactDirectory;
use crate::infra::gateway::{Realm, RequestGateway};
use crate::infra::ticket_api::HttpIssueTracker;
use crate::services::{ContactDirectoryService, IssueTrackerService, Navigator, SessionStore};
use crate::session::SessionGuard;
use crate::store::TicketStore;

#[derive(Clone)]
pub struct AppContext {
    pub config: AppConfig,
    pub session: Arc<SessionGuard>,
    pub store: Arc<TicketStore>,
}

impl AppContext {
    pub fn new(config: AppConfig, session: Arc<SessionGuard>, store: Arc<TicketStore>) -> Self {
        Self {
            config,
            session,
            store,
        }
    }

    /// Wires both realms to one HTTP client and one session guard.
    pub fn connect(
        config: AppConfig,
        session_store: Arc<dyn SessionStore>,
        navigator: Arc<dyn Navigator>,
    ) -> AppResult<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|err| AppError::Configuration(format!("failed to build HTTP client: {err}")))?;

        let session = Arc::new(SessionGuard::new(
            session_store,
            navigator,
            config.signin_url.clone(),
        ));

        let tickets_realm = Realm::new("tickets", config.api_base_url.as_str(), TOKEN_KEY);
        let contacts_realm = Realm::new(
            "contacts",
            config.contacts_base_url.as_str(),
            config.contacts_token_key.clone(),
        );

        let tracker: Arc<dyn IssueTrackerService> = Arc::new(HttpIssueTracker::new(
            RequestGateway::new(http.clone(), tickets_realm, session.clone()),
        ));
        let contacts: Arc<dyn ContactDirectoryService> = Arc::new(HttpContactDirectory::new(
            RequestGateway::new(http, contacts_realm, session.clone()),
        ));

        let store = Arc::new(TicketStore::new(tracker, Some(contacts)));

        Ok(Self::new(config, session, store))
    }
}
