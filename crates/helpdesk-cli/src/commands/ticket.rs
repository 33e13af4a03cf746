use anyhow::Result;
use helpdesk_core::{Error, Identity, NewTicket, TicketPatch};
use helpdesk_engine::{TicketService, TicketView};

use crate::cli::TicketCommands;

pub async fn handle(cmd: TicketCommands, service: &TicketService) -> Result<()> {
    match cmd {
        TicketCommands::Create {
            title,
            description,
            priority,
            as_user,
        } => {
            let identity = resolve_user(service, &as_user).await?;
            create(service, &identity, NewTicket {
                title,
                description,
                priority,
            })
            .await
        }
        TicketCommands::List { json } => list(service, json).await,
        TicketCommands::Show { id, json } => show(service, &id, json).await,
        TicketCommands::Update {
            id,
            title,
            description,
            status,
            priority,
            assign,
            unassign,
        } => {
            let assigned_to = if unassign { Some(None) } else { assign.map(Some) };
            let patch = TicketPatch {
                title,
                description,
                status,
                priority,
                assigned_to,
            };
            update(service, &id, patch).await
        }
        TicketCommands::Delete { id } => delete(service, &id).await,
        TicketCommands::Comment { id, text, as_user } => {
            let identity = resolve_user(service, &as_user).await?;
            comment(service, &id, &identity, text).await
        }
    }
}

/// Act as a configured user; the CLI is trusted, so no token is needed
async fn resolve_user(service: &TicketService, user_id: &str) -> Result<Identity> {
    let user = service
        .authenticator()
        .lookup(user_id)
        .await
        .ok_or_else(|| Error::Unauthorized(format!("unknown user '{}'", user_id)))?;
    Ok(Identity::from(&user))
}

async fn create(service: &TicketService, identity: &Identity, new: NewTicket) -> Result<()> {
    let ticket = service.create_ticket(identity, new).await?;

    println!("✓ Created ticket: {}", ticket.title);
    println!("  ID: {}", ticket.id);
    println!("  Priority: {}", ticket.priority);
    println!("  SLA deadline: {}", ticket.sla_deadline);

    Ok(())
}

async fn list(service: &TicketService, json: bool) -> Result<()> {
    let views = service.list_views().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&views)?);
        return Ok(());
    }

    if views.is_empty() {
        println!("No tickets found.");
        return Ok(());
    }

    println!("Tickets:");
    for view in views {
        let ticket = &view.ticket;
        println!("  {} ({})", ticket.title, ticket.id);
        println!(
            "    {} | {} | {} ({})",
            ticket.status, ticket.priority, view.sla_status, view.time_left
        );
    }

    Ok(())
}

async fn show(service: &TicketService, id: &str, json: bool) -> Result<()> {
    let view = service.get_view(id).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        print_view(&view);
    }
    Ok(())
}

async fn update(service: &TicketService, id: &str, patch: TicketPatch) -> Result<()> {
    if patch.is_empty() {
        println!("Nothing to update.");
        return Ok(());
    }

    let ticket = service.update_ticket(id, patch).await?;
    println!("✓ Updated ticket: {}", ticket.id);
    println!("  Status: {}", ticket.status);
    println!("  Priority: {}", ticket.priority);
    println!("  Assigned to: {}", ticket.assigned_to.as_deref().unwrap_or("-"));
    Ok(())
}

async fn delete(service: &TicketService, id: &str) -> Result<()> {
    service.delete_ticket(id).await?;
    println!("✓ Ticket removed: {}", id);
    Ok(())
}

async fn comment(service: &TicketService, id: &str, identity: &Identity, text: String) -> Result<()> {
    let ticket = service.add_comment(id, identity, text).await?;
    println!("✓ Comment added to {} ({} total)", ticket.id, ticket.comments.len());
    Ok(())
}

fn print_view(view: &TicketView) {
    let ticket = &view.ticket;
    let name_of = |user: &Option<helpdesk_core::UserSummary>, fallback: &str| match user {
        Some(user) => format!("{} <{}>", user.name, user.email),
        None => fallback.to_string(),
    };

    println!("Ticket: {}", ticket.title);
    println!("  ID: {}", ticket.id);
    println!("  Status: {}", ticket.status);
    println!("  Priority: {}", ticket.priority);
    println!("  Created by: {}", name_of(&view.created_by_user, &ticket.created_by));
    println!(
        "  Assigned to: {}",
        name_of(&view.assigned_to_user, ticket.assigned_to.as_deref().unwrap_or("-"))
    );
    println!("  SLA: {} ({})", view.sla_status, view.time_left);
    println!("  Deadline: {}", ticket.sla_deadline);
    println!("  Created: {}", ticket.created_at);
    println!("  Updated: {}", ticket.updated_at);
    println!("\n{}", ticket.description);

    if ticket.comments.is_empty() {
        println!("\nNo comments.");
    } else {
        println!("\nComments ({}):", ticket.comments.len());
        for comment in &ticket.comments {
            println!("  [{}] {}: {}", comment.created_at, comment.author_name, comment.text);
        }
    }
}
