pub mod contact_directory;
pub mod issue_tracker;
pub mod session;

pub use contact_directory::ContactDirectoryService;
pub use issue_tracker::IssueTrackerService;
pub use session::{ConfirmPrompt, Navigator, SessionStore};
