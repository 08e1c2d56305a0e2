//! Bankdesk CLI - Tenant migrations and hierarchy management.
//!
//! # Usage
//!
//! ```bash
//! # Run migrations against one tenant database
//! bankdesk migrate cayman
//!
//! # Run migrations against every tenant database
//! bankdesk migrate all
//!
//! # Put user 7 under manager 3
//! bankdesk hierarchy assign -t cayman --superior 3 --subordinate 7 -k manager-to-user
//!
//! # Show the inbox as staff member 3 of Cayman National would see it
//! bankdesk inbox -t cayman -s 3
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run tenant database migrations
//! - `hierarchy` - Create, remove, and list supervision edges
//! - `inbox` - Run one aggregation pass for a staff member

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

use bankdesk_core::{RelationKind, TenantKey};

mod commands;

#[derive(Parser)]
#[command(name = "bankdesk")]
#[command(author, version, about = "Bankdesk CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run tenant database migrations
    Migrate {
        /// Tenant key (`cayman`, `bahamas`, `bermuda`) or `all`
        target: String,
    },
    /// Manage supervision edges
    Hierarchy {
        #[command(subcommand)]
        action: HierarchyAction,
    },
    /// Show the aggregated inbox for a staff member
    Inbox {
        /// Tenant that issued the staff identity
        #[arg(short, long, value_parser = parse_tenant)]
        tenant: TenantKey,

        /// Staff user ID
        #[arg(short, long)]
        staff: i32,
    },
}

#[derive(Subcommand)]
enum HierarchyAction {
    /// Create an edge
    Assign {
        #[arg(short, long, value_parser = parse_tenant)]
        tenant: TenantKey,

        #[arg(long)]
        superior: i32,

        #[arg(long)]
        subordinate: i32,

        /// `manager-to-user` or `superior-manager-to-manager`
        #[arg(short, long, value_parser = parse_kind, default_value = "manager-to-user")]
        kind: RelationKind,
    },
    /// Delete an edge by ID
    Remove {
        #[arg(short, long, value_parser = parse_tenant)]
        tenant: TenantKey,

        #[arg(short, long)]
        edge: i32,
    },
    /// List the edges owned by a superior
    List {
        #[arg(short, long, value_parser = parse_tenant)]
        tenant: TenantKey,

        #[arg(long)]
        superior: i32,
    },
}

fn parse_tenant(raw: &str) -> Result<TenantKey, String> {
    raw.parse::<TenantKey>().map_err(|e| e.to_string())
}

fn parse_kind(raw: &str) -> Result<RelationKind, String> {
    raw.parse::<RelationKind>()
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate { target } => {
            if target.eq_ignore_ascii_case("all") {
                commands::migrate::all().await?;
            } else {
                commands::migrate::tenant(parse_tenant(&target)?).await?;
            }
        }
        Commands::Hierarchy { action } => match action {
            HierarchyAction::Assign {
                tenant,
                superior,
                subordinate,
                kind,
            } => {
                commands::hierarchy::assign(tenant, superior, subordinate, kind).await?;
            }
            HierarchyAction::Remove { tenant, edge } => {
                commands::hierarchy::remove(tenant, edge).await?;
            }
            HierarchyAction::List { tenant, superior } => {
                commands::hierarchy::list(tenant, superior).await?;
            }
        },
        Commands::Inbox { tenant, staff } => commands::inbox::show(tenant, staff).await?,
    }
    Ok(())
}
