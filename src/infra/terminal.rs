use std::io::{self, Write};

use url::Url;

use crate::error::AppResult;
use crate::services::{ConfirmPrompt, Navigator};

/// Stands in for the browser: the "current location" is the configured app
/// URL, and a redirect tells the user where to sign in.
pub struct TerminalNavigator {
    location: String,
}

impl TerminalNavigator {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
        }
    }
}

impl Navigator for TerminalNavigator {
    fn current_location(&self) -> String {
        self.location.clone()
    }

    fn redirect(&self, target: &Url) {
        eprintln!("Your session has expired. Sign in again at: {target}");
    }
}

pub struct StdinConfirm;

impl ConfirmPrompt for StdinConfirm {
    fn confirm(&self, question: &str) -> AppResult<bool> {
        let mut stdout = io::stdout();
        write!(stdout, "{question} [y/N]: ")?;
        stdout.flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        Ok(matches!(input.trim().to_lowercase().as_str(), "y" | "yes"))
    }
}

/// Answers yes without asking; backs `--yes`.
pub struct AssumeYes;

impl ConfirmPrompt for AssumeYes {
    fn confirm(&self, _question: &str) -> AppResult<bool> {
        Ok(true)
    }
}
