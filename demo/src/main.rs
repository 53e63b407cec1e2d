//! Switchboard Voice Reference Deployment: Demo CLI
//!
//! Runs one or all of the four voice deployment scenarios. Each scenario
//! builds real sessions (agent registry, policy engine, approval gate,
//! validator, memory sink) and drives them with scripted model turns.
//!
//! Usage:
//!   cargo run -p demo -- run-all
//!   cargo run -p demo -- handoff-tour
//!   cargo run -p demo -- tool-approval
//!   cargo run -p demo -- daily-checkin
//!   cargo run -p demo -- --config deploy.toml contact-intake
//!   OPENAI_API_KEY=… MEM_API_KEY=… cargo run -p demo -- live-checkin

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use switchboard_contracts::error::{SwitchboardError, SwitchboardResult};
use switchboard_core::config::{Credentials, DeploymentConfig};
use switchboard_ref_voice::scenarios::{contact_intake, daily_checkin, handoff_tour, tool_approval};

// ── CLI definition ────────────────────────────────────────────────────────────

/// Switchboard: multi-agent voice conversation demo.
///
/// Each subcommand runs one or all of the reference scenarios, showing
/// handoffs, approval-gated tools, interviews and memory filing.
#[derive(Parser)]
#[command(
    name = "demo",
    about = "Switchboard voice reference deployment demo",
    long_about = "Runs switchboard voice demo scenarios showing agent handoffs,\n\
                  tool approval, structured interviews, and memory filing."
)]
struct Cli {
    /// Deployment configuration (TOML). Defaults apply when omitted.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run all four scenarios in sequence.
    RunAll,
    /// Scenario 1: Handoff Tour (hub, specialists, one refused handoff).
    HandoffTour,
    /// Scenario 2: Tool Approval (approved / timed out / refused).
    ToolApproval,
    /// Scenario 3: Daily Check-in (completion-flag interview).
    DailyCheckin,
    /// Scenario 4: Contact Intake (strict index-driven interview via the session actor).
    ContactIntake,
    /// Scenario 3 against the remote services. Needs OPENAI_API_KEY and MEM_API_KEY.
    LiveCheckin,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    // Set RUST_LOG=debug for the full dispatch pipeline.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    // Live runs fail fast on missing secrets, before any output.
    let credentials = match cli.command {
        Command::LiveCheckin => match Credentials::from_env() {
            Ok(credentials) => Some(credentials),
            Err(e) => {
                eprintln!("Demo error: {}", e);
                std::process::exit(1);
            }
        },
        _ => None,
    };

    print_banner();

    let result = match load_config(cli.config.as_ref()) {
        Ok(config) => run(&cli.command, &config, credentials.as_ref()).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => {
            println!("All selected scenarios completed successfully.");
        }
        Err(e) => {
            eprintln!("Demo error: {}", e);
            std::process::exit(1);
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> SwitchboardResult<DeploymentConfig> {
    match path {
        Some(path) => {
            debug!(path = %path.display(), "loading deployment config");
            DeploymentConfig::from_file(path)
        }
        None => Ok(DeploymentConfig::default()),
    }
}

// ── Scenario dispatch ─────────────────────────────────────────────────────────

async fn run(command: &Command, config: &DeploymentConfig, credentials: Option<&Credentials>) -> SwitchboardResult<()> {
    match command {
        Command::RunAll => {
            handoff_tour::run_scenario(config).await?;
            tool_approval::run_scenario(config).await?;
            daily_checkin::run_scenario(config).await?;
            contact_intake::run_scenario(config).await?;
        }
        Command::HandoffTour => {
            handoff_tour::run_scenario(config).await?;
        }
        Command::ToolApproval => {
            tool_approval::run_scenario(config).await?;
        }
        Command::DailyCheckin => {
            daily_checkin::run_scenario(config).await?;
        }
        Command::ContactIntake => {
            contact_intake::run_scenario(config).await?;
        }
        Command::LiveCheckin => {
            let credentials = credentials.ok_or_else(|| SwitchboardError::Config {
                reason: "live run started without credentials".to_string(),
            })?;
            daily_checkin::run_live(config, credentials).await?;
        }
    }
    Ok(())
}

// ── Banner ────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("Switchboard: Multi-agent Voice Orchestration");
    println!("Voice Assistant Reference Demo");
    println!("============================================");
    println!();
    println!("Per tool call, the session runs:");
    println!("  [1] Lookup: the tool must belong to the active agent");
    println!("  [2] Policy: Allow / Deny / RequireApproval (approval-required tools always ask)");
    println!("  [3] Approval: wait for the gate, bounded by the session timeout");
    println!("  [4] Validation: arguments checked against the tool's JSON Schema");
    println!("  [5] Invocation: the handler runs; its text is the only thing the model sees");
    println!();
    println!("Handoffs move the active agent only along the registry's handoff graph.");
    println!();
}
