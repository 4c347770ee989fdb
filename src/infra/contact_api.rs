use async_trait::async_trait;

use crate::domain::ticket::Contact;
use crate::error::AppResult;
use crate::infra::gateway::RequestGateway;
use crate::services::ContactDirectoryService;

const CONTACTS_PATH: &str = "/contacts";

/// Contact listing from the contacts realm.
pub struct HttpContactDirectory {
    gateway: RequestGateway,
}

impl HttpContactDirectory {
    pub fn new(gateway: RequestGateway) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl ContactDirectoryService for HttpContactDirectory {
    async fn list_contacts(&self) -> AppResult<Vec<Contact>> {
        self.gateway.get(CONTACTS_PATH).await
    }
}
