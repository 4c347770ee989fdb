use chrono::Utc;
use clap::{Args, Subcommand};

use crate::domain::credential::{
    Identity, NAME_KEY, ROLE_KEY, TENANT_ID_KEY, TOKEN_KEY, USER_ID_KEY, fingerprint,
    sanitize_token, token_expiry, token_is_usable,
};
use crate::domain::format::{date_time, mask_secret};
use crate::error::{AppError, AppResult};
use crate::session::SessionGuard;

#[derive(Args, Debug, Clone)]
pub struct SessionArgs {
    #[command(subcommand)]
    pub command: SessionCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SessionCommand {
    /// Store the identity issued by the sign-in page.
    Login {
        #[arg(long, env = "TICKETDESK_TOKEN", hide_env_values = true)]
        token: String,
        #[arg(long)]
        tenant_id: Option<String>,
        #[arg(long)]
        user_id: Option<String>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        role: Option<String>,
        /// Credential for the contacts API, when it does not share the
        /// tickets token.
        #[arg(long, env = "TICKETDESK_CONTACTS_TOKEN", hide_env_values = true)]
        contacts_token: Option<String>,
    },
    /// Show the stored identity (token masked).
    Status,
    /// Forget the stored identity.
    Logout,
}

/// `contacts_token_key` is the session key the contacts realm reads its
/// credential from.
pub fn run(
    session: &SessionGuard,
    contacts_token_key: &str,
    command: SessionCommand,
) -> AppResult<()> {
    match command {
        SessionCommand::Login {
            token,
            tenant_id,
            user_id,
            name,
            role,
            contacts_token,
        } => {
            let contacts_token = contacts_credential(contacts_token_key, contacts_token)?;
            let token = sanitize_token(&token)
                .ok_or_else(|| AppError::Session("token is empty".to_string()))?;
            let identity = Identity {
                token,
                tenant_id,
                user_id,
                name,
                role,
            };
            session.establish(&identity)?;
            if let Some(contacts_token) = contacts_token {
                session.store().set(contacts_token_key, &contacts_token)?;
            } else if contacts_token_key != TOKEN_KEY {
                eprintln!(
                    "Warning: no --contacts-token given; contacts requests will not be authenticated."
                );
            }
            tracing::info!(credential = %fingerprint(&identity.token), "session established");
            println!("Signed in.");
            Ok(())
        }
        SessionCommand::Status => {
            show_status(session, contacts_token_key);
            Ok(())
        }
        SessionCommand::Logout => {
            session.sign_out()?;
            println!("Signed out.");
            Ok(())
        }
    }
}

/// The contacts credential to store, if any. When the contacts realm shares
/// the tickets key a separate token has nowhere to go.
fn contacts_credential(key: &str, raw: Option<String>) -> AppResult<Option<String>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    if key == TOKEN_KEY {
        return Err(AppError::Session(
            "the contacts API shares the tickets token; set a contacts token key first".to_string(),
        ));
    }
    sanitize_token(&raw)
        .map(Some)
        .ok_or_else(|| AppError::Session("contacts token is empty".to_string()))
}

fn show_status(session: &SessionGuard, contacts_token_key: &str) {
    let store = session.store();
    let token = store.get(TOKEN_KEY);

    let state = match token.as_deref() {
        None => "signed out",
        Some(raw) if token_is_usable(raw, Utc::now()) => "active",
        Some(_) => "expired",
    };
    println!("Session: {state}");
    println!("Token: {}", mask_secret(token.as_deref()));
    if contacts_token_key != TOKEN_KEY {
        let contacts = store.get(contacts_token_key);
        println!("Contacts token: {}", mask_secret(contacts.as_deref()));
    }
    if let Some(raw) = token.as_deref() {
        if let Some(expiry) = token_expiry(raw) {
            println!("Expires: {}", date_time(&expiry));
        }
    }
    for (label, key) in [
        ("Tenant", TENANT_ID_KEY),
        ("User ID", USER_ID_KEY),
        ("Name", NAME_KEY),
        ("Role", ROLE_KEY),
    ] {
        let value = store.get(key).unwrap_or_else(|| "<not set>".to_string());
        println!("{label}: {value}");
    }
}
