use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use helpdesk_core::{Priority, TicketStatus};

#[derive(Parser)]
#[command(name = "helpdesk")]
#[command(about = "Ticket help desk with SLA deadlines", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Config file (default: platform config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// SQLite database file (overrides config)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the REST API
    Serve {
        #[arg(long)]
        host: Option<String>,

        #[arg(long)]
        port: Option<u16>,
    },

    /// Manage tickets
    #[command(subcommand)]
    Ticket(TicketCommands),

    /// Inspect configuration
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Print shell completions
    Completions {
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum TicketCommands {
    /// Open a ticket
    Create {
        title: String,

        description: String,

        /// Low, Medium, High or Critical (default: Medium)
        #[arg(long)]
        priority: Option<Priority>,

        /// Configured user id acting as requester
        #[arg(long = "as", value_name = "USER")]
        as_user: String,
    },

    /// List tickets, newest first
    List {
        /// Print the API's JSON representation
        #[arg(long)]
        json: bool,
    },

    /// Show ticket details and comments
    Show {
        id: String,

        #[arg(long)]
        json: bool,
    },

    /// Update ticket fields
    Update {
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        description: Option<String>,

        /// Open, "In Progress", Resolved or Closed
        #[arg(long)]
        status: Option<TicketStatus>,

        #[arg(long)]
        priority: Option<Priority>,

        /// Assign to a user id
        #[arg(long, conflicts_with = "unassign")]
        assign: Option<String>,

        /// Clear the assignee
        #[arg(long)]
        unassign: bool,
    },

    /// Delete a ticket
    Delete {
        id: String,
    },

    /// Add a comment
    Comment {
        id: String,

        text: String,

        /// Configured user id acting as author
        #[arg(long = "as", value_name = "USER")]
        as_user: String,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the config file location
    Path,

    /// Print the effective configuration
    Show,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_create() {
        let cli = Cli::try_parse_from([
            "helpdesk", "ticket", "create", "VPN down", "Cannot connect", "--priority", "High", "--as", "u1",
        ])
        .unwrap();
        match cli.command {
            Commands::Ticket(TicketCommands::Create {
                title,
                priority,
                as_user,
                ..
            }) => {
                assert_eq!(title, "VPN down");
                assert_eq!(priority, Some(Priority::High));
                assert_eq!(as_user, "u1");
            }
            _ => panic!("expected ticket create"),
        }
    }

    #[test]
    fn test_parse_update_status() {
        let cli = Cli::try_parse_from([
            "helpdesk", "--db", "/tmp/h.db", "ticket", "update", "t1", "--status", "In Progress",
        ])
        .unwrap();
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/h.db")));
        match cli.command {
            Commands::Ticket(TicketCommands::Update { status, unassign, .. }) => {
                assert_eq!(status, Some(TicketStatus::InProgress));
                assert!(!unassign);
            }
            _ => panic!("expected ticket update"),
        }
    }

    #[test]
    fn test_parse_json_flag() {
        let cli = Cli::try_parse_from(["helpdesk", "ticket", "show", "t1", "--json"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Ticket(TicketCommands::Show { json: true, .. })
        ));

        let cli = Cli::try_parse_from(["helpdesk", "ticket", "list"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Ticket(TicketCommands::List { json: false })
        ));
    }

    #[test]
    fn test_assign_conflicts_with_unassign() {
        let parsed = Cli::try_parse_from([
            "helpdesk", "ticket", "update", "t1", "--assign", "u2", "--unassign",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_rejects_unknown_priority() {
        let parsed = Cli::try_parse_from([
            "helpdesk", "ticket", "create", "a", "b", "--priority", "Urgent", "--as", "u1",
        ]);
        assert!(parsed.is_err());
    }
}
