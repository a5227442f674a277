use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    config::{load_settings_from, DEFAULT_SETTINGS_FILE},
    ReservationDraft, ResetOutcome, StepOutcome, WizardController,
};
use shared::domain::{ReservationType, SiteVariant, Step};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod terminal;

use terminal::TerminalView;

#[derive(Parser, Debug)]
#[command(about = "Submit reservation wizard steps to a validation server")]
struct Cli {
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    server_url: Option<String>,
    #[arg(long)]
    site: Option<SiteVariant>,
    #[arg(long)]
    csrf_token: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit one or more steps in order, stopping at the first that does not advance.
    Submit {
        #[arg(long = "type")]
        reservation_type: ReservationType,
        #[arg(long = "step", required = true)]
        steps: Vec<Step>,
        /// Form field as `name=value`; repeatable.
        #[arg(long = "field", value_parser = parse_field)]
        fields: Vec<(String, String)>,
        /// JSON object of form fields, applied before `--field` values.
        #[arg(long)]
        draft: Option<PathBuf>,
    },
    ResetPassword {
        #[arg(long)]
        email: String,
    },
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("field name missing in '{raw}'"));
    }
    Ok((name.to_string(), value.to_string()))
}

fn load_draft(path: Option<&Path>, fields: Vec<(String, String)>) -> Result<ReservationDraft> {
    let mut draft = ReservationDraft::new();
    if let Some(path) = path {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read draft '{}'", path.display()))?;
        draft = draft_from_json(&raw)
            .with_context(|| format!("failed to parse draft '{}'", path.display()))?;
    }
    for (name, value) in fields {
        draft.set(name, value);
    }
    Ok(draft)
}

fn draft_from_json(raw: &str) -> Result<ReservationDraft> {
    let value: serde_json::Value = serde_json::from_str(raw)?;
    let serde_json::Value::Object(map) = value else {
        bail!("draft must be a JSON object");
    };
    Ok(map
        .into_iter()
        .map(|(name, value)| {
            let value = match value {
                serde_json::Value::String(text) => text,
                serde_json::Value::Null => String::new(),
                other => other.to_string(),
            };
            (name, value)
        })
        .collect())
}

/// `RUST_LOG` directives when set and valid, `info` otherwise.
fn log_filter(directives: Option<String>) -> EnvFilter {
    directives
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok()))
        .init();
    let cli = Cli::parse();

    let config_path = cli
        .config
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_FILE));
    let mut settings = load_settings_from(&config_path)?;
    if let Some(server_url) = cli.server_url {
        settings.server_url = server_url;
    }
    if let Some(site) = cli.site {
        settings.site = site;
    }
    if let Some(token) = cli.csrf_token {
        settings.csrf_token = Some(token);
    }
    info!(server_url = %settings.server_url, site = ?settings.site, "reserve: settings loaded");

    match cli.command {
        Command::Submit {
            reservation_type,
            steps,
            fields,
            draft,
        } => {
            let draft = load_draft(draft.as_deref(), fields)?;
            let view = TerminalView::new(draft.fields().iter().map(|(name, _)| name.as_str()));
            let controller = WizardController::from_settings(&settings, view, reservation_type)?;
            for step in steps {
                match controller.submit_step(reservation_type, step, &draft).await {
                    StepOutcome::Advanced { phase, .. } => {
                        println!("{step}: accepted, now at {phase:?}");
                    }
                    StepOutcome::Redirected { url, .. } => {
                        println!("{step}: finished, continue at {url}");
                        break;
                    }
                    StepOutcome::Failed { failure, .. } => {
                        bail!("{step} rejected: {}", failure.message);
                    }
                    StepOutcome::Ignored { reason, .. } => {
                        bail!("{step} not submitted: {reason:?}");
                    }
                    StepOutcome::Abandoned { .. } => bail!("{step} abandoned"),
                }
            }
        }
        Command::ResetPassword { email } => {
            let controller = WizardController::from_settings(
                &settings,
                TerminalView::new(["email"]),
                ReservationType::Rental,
            )?;
            if let ResetOutcome::Failed(failure) = controller.request_password_reset(&email).await {
                bail!("password reset failed: {}", failure.message);
            }
        }
    }

    Ok(())
}
