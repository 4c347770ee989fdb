use std::process::ExitCode;

use clap::{Args, Subcommand};

use crate::cmd::output::{
    NamedRow, OutputFormat, print_field_errors, print_json, print_notice, render_table,
    ticket_rows,
};
use crate::context::AppContext;
use crate::domain::form::{AssignForm, TicketForm};
use crate::domain::ticket::{EntityId, Priority, Status, TicketId, TicketOperation};
use crate::error::{AppError, AppResult};
use crate::infra::terminal::{AssumeYes, StdinConfirm};
use crate::services::ConfirmPrompt;
use crate::workflow::ticket::{
    Notice, delete_ticket, load_page, open_edit_form, submit_assignment, submit_ticket_form,
};

#[derive(Args, Debug, Clone)]
pub struct TicketArgs {
    #[command(subcommand)]
    pub command: TicketCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum TicketCommand {
    /// List tickets with assignee and contact names.
    List {
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
    /// Open a new ticket.
    Create {
        #[arg(long, default_value = "")]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Contact the ticket is raised for.
        #[arg(long)]
        contact: Option<String>,
        #[arg(long, value_parser = parse_priority)]
        priority: Option<Priority>,
        #[arg(long, value_parser = parse_status)]
        status: Option<Status>,
    },
    /// Edit an existing ticket; omitted fields keep their current value.
    Update {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, value_parser = parse_priority)]
        priority: Option<Priority>,
        #[arg(long, value_parser = parse_status)]
        status: Option<Status>,
    },
    /// Assign an open ticket to a user.
    Assign {
        id: String,
        #[arg(long)]
        user: Option<String>,
    },
    /// Delete a ticket after confirmation.
    Delete {
        id: String,
        /// Skip the confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },
    /// List users tickets can be assigned to.
    Users {
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
    /// List contacts tickets can be raised for.
    Contacts {
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
}

fn parse_priority(value: &str) -> Result<Priority, String> {
    Priority::from_str(value).ok_or_else(|| format!("unknown priority '{value}' (low, medium, high)"))
}

fn parse_status(value: &str) -> Result<Status, String> {
    Status::from_str(value).ok_or_else(|| format!("unknown status '{value}' (open, closed)"))
}

fn entity_id(value: Option<String>) -> Option<EntityId> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
        .map(EntityId::new)
}

pub async fn run(ctx: &AppContext, command: TicketCommand) -> AppResult<ExitCode> {
    if !ctx.session.check_auth_and_redirect() {
        return Ok(ExitCode::FAILURE);
    }

    match command {
        TicketCommand::List { format } => list(ctx, format).await,
        TicketCommand::Create {
            title,
            description,
            contact,
            priority,
            status,
        } => {
            let mut form = TicketForm::create();
            form.set_title(title);
            form.set_description(description);
            form.set_contact(entity_id(contact));
            if let Some(priority) = priority {
                form.set_priority(priority);
            }
            if let Some(status) = status {
                form.set_status(status);
            }
            let result = submit_ticket_form(&ctx.store, &mut form).await;
            finish(TicketOperation::Create, result)
        }
        TicketCommand::Update {
            id,
            title,
            description,
            priority,
            status,
        } => {
            if let Err(err) = ctx.store.load_tickets().await {
                return Ok(report_load(&err));
            }
            let mut form = match open_edit_form(&ctx.store, &TicketId::new(id)) {
                Ok(form) => form,
                Err(err) => return finish(TicketOperation::Update, Err(err)),
            };
            if let Some(title) = title {
                form.set_title(title);
            }
            if let Some(description) = description {
                form.set_description(description);
            }
            if let Some(priority) = priority {
                form.set_priority(priority);
            }
            if let Some(status) = status {
                form.set_status(status);
            }
            let result = submit_ticket_form(&ctx.store, &mut form).await;
            finish(TicketOperation::Update, result)
        }
        TicketCommand::Assign { id, user } => {
            if let Err(err) = ctx.store.load_tickets().await {
                return Ok(report_load(&err));
            }
            let mut form = AssignForm::new(TicketId::new(id));
            form.select_user(entity_id(user));
            let result = submit_assignment(&ctx.store, &mut form).await;
            finish(TicketOperation::Assign, result)
        }
        TicketCommand::Delete { id, yes } => {
            let prompt: &dyn ConfirmPrompt = if yes { &AssumeYes } else { &StdinConfirm };
            match delete_ticket(&ctx.store, &TicketId::new(id), prompt).await {
                Ok(Some(notice)) => finish(TicketOperation::Delete, Ok(notice)),
                Ok(None) => {
                    println!("Deletion cancelled.");
                    Ok(ExitCode::SUCCESS)
                }
                Err(err) => finish(TicketOperation::Delete, Err(err)),
            }
        }
        TicketCommand::Users { format } => {
            let report = ctx.store.load_reference_data().await;
            if let Some(err) = &report.users_error {
                return Ok(report_load(err));
            }
            let users = ctx.store.users();
            match format {
                OutputFormat::Json => print_json(&users)?,
                OutputFormat::Table => {
                    println!("{}", render_table(users.iter().map(NamedRow::from)));
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        TicketCommand::Contacts { format } => {
            let report = ctx.store.load_reference_data().await;
            if let Some(err) = &report.contacts_error {
                return Ok(report_load(err));
            }
            let contacts = ctx.store.contacts();
            match format {
                OutputFormat::Json => print_json(&contacts)?,
                OutputFormat::Table => {
                    println!("{}", render_table(contacts.iter().map(NamedRow::from)));
                }
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn list(ctx: &AppContext, format: OutputFormat) -> AppResult<ExitCode> {
    let page = load_page(&ctx.store).await;
    for notice in page.notices() {
        print_notice(&notice);
    }
    if let Err(err) = &page.tickets {
        return Ok(exit_code_for(err));
    }

    let tickets = ctx.store.tickets();
    match format {
        OutputFormat::Json => print_json(&tickets)?,
        OutputFormat::Table if tickets.is_empty() => println!("No tickets found."),
        OutputFormat::Table => {
            println!("{}", render_table(ticket_rows(&ctx.store, &tickets)));
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn finish(operation: TicketOperation, result: AppResult<Notice>) -> AppResult<ExitCode> {
    match result {
        Ok(notice) => {
            print_notice(&notice);
            Ok(ExitCode::SUCCESS)
        }
        Err(AppError::Validation(errors)) => {
            let heading = operation.failure_message();
            if heading.ends_with('.') {
                eprintln!("{heading}");
            } else {
                eprintln!("{heading}:");
            }
            print_field_errors(&errors);
            Ok(ExitCode::FAILURE)
        }
        Err(err) => {
            tracing::debug!(operation = operation.as_str(), error = %err, "ticket action failed");
            if let Some(notice) = Notice::failure(operation, &err) {
                print_notice(&notice);
            }
            Ok(exit_code_for(&err))
        }
    }
}

fn report_load(err: &AppError) -> ExitCode {
    if let Some(notice) = Notice::load_failure(err) {
        print_notice(&notice);
    }
    exit_code_for(err)
}

fn exit_code_for(err: &AppError) -> ExitCode {
    match err {
        AppError::Cancelled => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    }
}
