use std::io::{self, Write};

use clap::{Args, Subcommand};

use crate::config::{AppConfig, StoredConfig, config_file_path};
use crate::error::{AppError, AppResult};

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommand {
    /// Run the interactive configuration wizard.
    Init,
    /// Show the stored and effective configuration.
    Show,
}

pub fn run(command: ConfigCommand) -> AppResult<()> {
    match command {
        ConfigCommand::Init => run_init(),
        ConfigCommand::Show => run_show(),
    }
}

fn run_init() -> AppResult<()> {
    let mut cfg = StoredConfig::load()?;

    println!("Configuring ticketdesk.");
    println!("Press Enter to keep the current value, '-' to clear it.");
    println!();

    apply_prompt(
        "Tickets API base URL (e.g., https://desk.example.com/api)",
        &mut cfg.api_base_url,
    )?;
    apply_prompt(
        "Contacts API base URL (Enter to reuse the tickets API)",
        &mut cfg.contacts_base_url,
    )?;
    apply_prompt(
        "Session key holding the contacts credential",
        &mut cfg.contacts_token_key,
    )?;
    apply_prompt("Sign-in page URL", &mut cfg.signin_url)?;
    apply_prompt("Tickets page URL (redirect target after sign-in)", &mut cfg.app_url)?;

    let mut timeout = cfg.timeout_secs.map(|secs| secs.to_string());
    apply_prompt("Request timeout in seconds", &mut timeout)?;
    cfg.timeout_secs = timeout
        .map(|raw| {
            raw.parse::<u64>().map_err(|_| {
                AppError::Configuration(format!("request timeout is not a number: {raw}"))
            })
        })
        .transpose()?;

    // Reject unparsable URLs before they reach disk.
    AppConfig::resolve(cfg.clone(), |_| None)?;
    cfg.save()?;

    let path = config_file_path()?;
    println!("\nConfiguration saved to {}", path.display());
    Ok(())
}

fn run_show() -> AppResult<()> {
    let cfg = StoredConfig::load()?;
    let path = config_file_path()?;
    let effective = AppConfig::load()?;

    println!("Configuration file: {}", path.display());
    println!("Tickets API base URL: {}", display_value(&cfg.api_base_url));
    println!("Contacts API base URL: {}", display_value(&cfg.contacts_base_url));
    println!("Contacts credential key: {}", display_value(&cfg.contacts_token_key));
    println!("Sign-in page URL: {}", display_value(&cfg.signin_url));
    println!("Tickets page URL: {}", display_value(&cfg.app_url));
    println!(
        "Request timeout: {}",
        display_value(&cfg.timeout_secs.map(|secs| format!("{secs}s")))
    );

    println!();
    println!("Effective settings (defaults and environment applied):");
    println!("  Tickets API: {}", effective.api_base_url);
    println!("  Contacts API: {}", effective.contacts_base_url);
    println!("  Contacts credential key: {}", effective.contacts_token_key);
    println!("  Sign-in page: {}", effective.signin_url);
    println!("  Tickets page: {}", effective.app_url);

    Ok(())
}

fn apply_prompt(field: &str, target: &mut Option<String>) -> AppResult<()> {
    match prompt(field, target.as_deref())? {
        PromptAction::Keep => {}
        PromptAction::Clear => *target = None,
        PromptAction::Set(value) => *target = Some(value),
    }
    Ok(())
}

fn prompt(field: &str, current: Option<&str>) -> AppResult<PromptAction> {
    let mut stdout = io::stdout();

    match current {
        Some(value) => write!(stdout, "{field} [{value}] (Enter to keep, '-' to clear): ")?,
        None => write!(stdout, "{field} (Enter to skip): ")?,
    }
    stdout.flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(parse_answer(&input))
}

fn parse_answer(input: &str) -> PromptAction {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        PromptAction::Keep
    } else if trimmed == "-" {
        PromptAction::Clear
    } else {
        PromptAction::Set(trimmed.to_string())
    }
}

fn display_value(value: &Option<String>) -> String {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
        .unwrap_or_else(|| "<not set>".to_string())
}

#[derive(Debug, PartialEq, Eq)]
enum PromptAction {
    Keep,
    Clear,
    Set(String),
}
