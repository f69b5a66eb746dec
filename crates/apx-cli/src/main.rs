use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "apx")]
#[command(about = "Exchange API call-site reconciliation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Batch audit commands
    Audit {
        #[command(subcommand)]
        cmd: AuditCmd,
    },

    /// Reference contract utilities
    Contract {
        #[command(subcommand)]
        cmd: ContractCmd,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> environment -> local)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Human review of a published report
    Review {
        #[command(subcommand)]
        cmd: ReviewCmd,
    },
}

#[derive(Subcommand)]
enum AuditCmd {
    /// Audit every call site under the configured inventory and publish exports/<run_id>/.
    Run {
        /// Layered config paths in merge order
        #[arg(long = "config", required = true)]
        config_paths: Vec<String>,
    },
}

#[derive(Subcommand)]
enum ContractCmd {
    /// Load and validate a contract document.
    Check {
        #[arg(long)]
        contract: String,

        /// Expected contract version
        #[arg(long)]
        version: Option<String>,
    },
}

#[derive(Subcommand)]
enum ReviewCmd {
    /// Apply one lifecycle transition to a persisted report.
    Transition {
        /// Path to report.json inside a run directory
        #[arg(long)]
        report: String,

        /// discrepancy | decision
        #[arg(long)]
        kind: String,

        #[arg(long)]
        id: String,

        /// Target state
        #[arg(long)]
        to: String,

        #[arg(long)]
        actor: String,

        #[arg(long)]
        note: Option<String>,
    },

    /// Verify the hash chain of a review ledger.
    Verify {
        #[arg(long)]
        ledger: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Silent if absent.
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Audit { cmd } => match cmd {
            AuditCmd::Run { config_paths } => commands::audit::audit_run(config_paths).await?,
        },

        Commands::Contract { cmd } => match cmd {
            ContractCmd::Check { contract, version } => {
                commands::contract_check(&contract, version.as_deref())?
            }
        },

        Commands::ConfigHash { paths } => {
            let loaded = commands::load_config(&paths)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::Review { cmd } => match cmd {
            ReviewCmd::Transition {
                report,
                kind,
                id,
                to,
                actor,
                note,
            } => commands::review::review_transition(commands::review::TransitionArgs {
                report: &report,
                kind: &kind,
                id: &id,
                to: &to,
                actor: &actor,
                note: note.as_deref(),
            })?,
            ReviewCmd::Verify { ledger } => commands::review::review_verify(&ledger)?,
        },
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}
