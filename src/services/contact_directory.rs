use async_trait::async_trait;

use crate::domain::ticket::Contact;
use crate::error::AppResult;

#[async_trait]
pub trait ContactDirectoryService: Send + Sync {
    async fn list_contacts(&self) -> AppResult<Vec<Contact>>;
}
