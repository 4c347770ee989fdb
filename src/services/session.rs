use url::Url;

use crate::error::AppResult;

/// String-keyed store holding the credential and identity fields.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> AppResult<()>;
    fn remove(&self, key: &str) -> AppResult<()>;
    /// Drops every stored key.
    fn clear_all(&self) -> AppResult<()>;
}

/// The host surface that knows where the user is and can send them elsewhere.
pub trait Navigator: Send + Sync {
    fn current_location(&self) -> String;
    fn redirect(&self, target: &Url);
}

pub trait ConfirmPrompt: Send + Sync {
    fn confirm(&self, question: &str) -> AppResult<bool>;
}
