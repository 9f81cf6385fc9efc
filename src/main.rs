//! Hawkling
//!
//! Lists AWS IAM roles with their last activity and prunes the ones that
//! have not been used for a while.
//!
//! # Usage
//! ```bash
//! # Roles unused for 90 days, as JSON
//! hawkling list --days 90 --unused --output json
//!
//! # Delete a single role (asks first)
//! hawkling delete MyOldRole
//!
//! # Show what would be pruned without deleting anything
//! hawkling prune --days 180 --dry-run
//! ```

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use hawkling::config::{load_sdk_config, Settings};
use hawkling::enrich::DEFAULT_CONCURRENCY;
use hawkling::output::{render_roles, OutputFormat};
use hawkling::progress::TerminalProgress;
use hawkling::service::{DeleteOutcome, PruneSelection};
use hawkling::{
    AutoConfirm, AwsIamClient, ConfirmationGate, FilterOptions, IamApi, RoleManager, StdinPrompt,
};

// ============================================================
// CLI Definition
// ============================================================

#[derive(Parser)]
#[command(name = "hawkling")]
#[command(about = "Find and prune unused AWS IAM roles", long_about = None)]
#[command(version)]
struct Cli {
    /// AWS profile to use
    #[arg(long, global = true, env = "AWS_PROFILE")]
    profile: Option<String>,

    /// AWS region to use
    #[arg(long, global = true, env = "AWS_REGION")]
    region: Option<String>,

    /// Number of concurrent role usage lookups
    #[arg(
        long,
        global = true,
        env = "HAWKLING_CONCURRENCY",
        default_value_t = DEFAULT_CONCURRENCY
    )]
    concurrency: usize,

    /// Stop fetching role usage this many seconds after the lookups start
    #[arg(long, global = true, env = "HAWKLING_TIMEOUT")]
    timeout: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List IAM roles with their last activity
    List {
        /// Only roles not used within this many days (0 = no age filter)
        #[arg(long, default_value_t = 0)]
        days: u32,

        /// Only roles that have been used at least once
        #[arg(long, conflicts_with = "unused")]
        used: bool,

        /// Only roles that are unused (never used, or idle for --days)
        #[arg(long)]
        unused: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,

        /// Include ARN and creation date
        #[arg(long)]
        all: bool,
    },

    /// Delete a single IAM role and its policies
    Delete {
        /// Name of the role to delete
        role_name: String,

        /// Only show what would be deleted
        #[arg(long)]
        dry_run: bool,

        /// Skip the confirmation prompt
        #[arg(long)]
        force: bool,
    },

    /// Delete every role not used within the given number of days
    Prune {
        /// Idle threshold in days
        #[arg(long, default_value_t = 90)]
        days: u32,

        /// Only list the roles that would be deleted
        #[arg(long)]
        dry_run: bool,

        /// Skip the confirmation prompt
        #[arg(long)]
        force: bool,
    },
}

impl Cli {
    fn settings(&self) -> Settings {
        Settings {
            profile: self.profile.clone(),
            region: self.region.clone(),
            concurrency: self.concurrency,
            timeout_secs: self.timeout,
        }
    }
}

// ============================================================
// Main Entry Point
// ============================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_json)?;

    let settings = cli.settings();
    settings.validate()?;

    let cancel = CancellationToken::new();
    watch_for_interrupt(cancel.clone());

    let sdk_config = load_sdk_config(&settings).await;
    let api: Arc<dyn IamApi> = Arc::new(AwsIamClient::new(&sdk_config));

    let manager = RoleManager::new(api)
        .with_concurrency(settings.concurrency)
        .with_progress(Arc::new(TerminalProgress::new("Fetching role usage data")))
        .with_cancellation(cancel)
        .with_timeout(settings.timeout());

    match cli.command {
        Commands::List { days, used, unused, output, all } => {
            let mut options = FilterOptions::new(days);
            options.only_used = used;
            options.only_unused = unused;
            run_list(&manager, &options, output, all).await
        }

        Commands::Delete { role_name, dry_run, force } => {
            run_delete(&manager, &role_name, dry_run, force).await
        }

        Commands::Prune { days, dry_run, force } => run_prune(&manager, days, dry_run, force).await,
    }
}

fn init_logging(verbose: bool, json: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

/// First Ctrl-C stops the usage lookups; a second one exits
fn watch_for_interrupt(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        warn!("Interrupted; stopping role usage lookups");
        cancel.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(130);
        }
    });
}

fn confirmation_gate(force: bool) -> Box<dyn ConfirmationGate> {
    if force {
        Box::new(AutoConfirm)
    } else {
        Box::new(StdinPrompt)
    }
}

// ============================================================
// Command Handlers
// ============================================================

async fn run_list(
    manager: &RoleManager,
    options: &FilterOptions,
    output: OutputFormat,
    all: bool,
) -> Result<()> {
    let roles = manager.list_and_filter(options).await?;

    let stdout = std::io::stdout();
    render_roles(&mut stdout.lock(), &roles, output, all).context("Failed to print roles")?;

    info!(count = roles.len(), "✅ Listed roles");
    Ok(())
}

async fn run_delete(
    manager: &RoleManager,
    role_name: &str,
    dry_run: bool,
    force: bool,
) -> Result<()> {
    if dry_run {
        let role = manager.find_role(role_name).await?;
        println!("DRY RUN: Would delete IAM role: {}", role.name);
        return Ok(());
    }

    let mut gate = confirmation_gate(force);
    match manager.delete_one(role_name, gate.as_mut()).await? {
        DeleteOutcome::Deleted => println!("Successfully deleted IAM role: {}", role_name),
        DeleteOutcome::Declined => println!("Deletion cancelled"),
    }
    Ok(())
}

async fn run_prune(manager: &RoleManager, days: u32, dry_run: bool, force: bool) -> Result<()> {
    let PruneSelection {
        candidates,
        skipped,
    } = manager.prune_candidates(days).await?;

    if !skipped.is_empty() {
        println!(
            "Skipping {} roles whose usage could not be determined: {}",
            skipped.len(),
            skipped.join(", ")
        );
    }

    if candidates.is_empty() {
        println!("No unused IAM roles found");
        return Ok(());
    }

    println!(
        "Found {} unused IAM roles (not used in the last {} days):",
        candidates.len(),
        days
    );
    for (i, role) in candidates.iter().enumerate() {
        println!("{}. {}", i + 1, role.name);
    }

    if dry_run {
        println!("\nDRY RUN: No roles were deleted");
        return Ok(());
    }

    println!();
    let mut gate = confirmation_gate(force);
    let report = manager.prune_roles(&candidates, days, gate.as_mut()).await?;

    if report.declined {
        println!("Deletion cancelled");
        return Ok(());
    }

    for name in &report.deletion.deleted {
        println!("Deleted role: {}", name);
    }
    for failure in &report.deletion.failed {
        println!("Failed to delete role {}: {}", failure.role, failure.reason);
    }

    if !report.is_success() {
        println!(
            "\nDeleted {} roles; failed to delete {}: {}",
            report.deletion.deleted.len(),
            report.deletion.failed.len(),
            report.deletion.failed_names().join(", ")
        );
    }

    let report = report.into_result()?;
    println!(
        "\nSuccessfully deleted {} unused IAM roles",
        report.deletion.deleted.len()
    );
    Ok(())
}
