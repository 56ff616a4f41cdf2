//! RFC Autopilot CLI
//!
//! Usage:
//!   rfc-autopilot decompose <file> <rfc-id>   Preview the micro-issues for an RFC
//!   rfc-autopilot create <file> <rfc-id>      Create micro-issues and assign the first
//!   rfc-autopilot progress <pr>               Assign the next micro-issue after a merge
//!   rfc-autopilot validate-pr <pr>            Check a PR for auto-merge eligibility
//!   rfc-autopilot next-rfc                    Open an issue for the next ready RFC
//!   rfc-autopilot recreate <issue>            Replace a failed micro-issue

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rfc_autopilot::{
    AutomationConfig, GhClient, IssueTracker, MemoryTracker, MicroIssueCreator, MicroIssueTemplate,
    NextRfcPlanner, PrValidator, Progression, Recreator, RfcParser, Validate,
};
use serde::Serialize;
use tracing::Level;

#[derive(Parser)]
#[command(name = "rfc-autopilot")]
#[command(author, version, about = "Decomposes RFCs into micro-issues and drives their GitHub workflow")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (TOML)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Repository in owner/name form (overrides the config file)
    #[arg(long, global = true)]
    repo: Option<String>,

    /// Use an in-memory tracker instead of GitHub
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Preview the micro-issues an RFC decomposes into
    Decompose {
        /// RFC document
        file: PathBuf,

        /// Parent RFC identifier (e.g. Game-RFC-004)
        rfc_id: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "markdown")]
        format: OutputFormat,
    },

    /// Create micro-issues for an RFC and assign the first one
    Create {
        /// RFC document
        file: PathBuf,

        /// Parent RFC identifier (e.g. Game-RFC-004)
        rfc_id: String,
    },

    /// Assign the next micro-issue after a PR merge
    Progress {
        /// Merged pull request number
        pr: u64,
    },

    /// Check whether a PR is eligible for auto-merge (exit code 1 if not)
    ValidatePr {
        /// Pull request number
        pr: u64,
    },

    /// Open an issue for the next RFC whose dependencies are complete
    NextRfc {
        /// Only print the chosen RFC, create nothing
        #[arg(long)]
        plan_only: bool,
    },

    /// Close a failed micro-issue and open a fresh copy
    Recreate {
        /// Issue number to replace
        issue: u64,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Markdown,
    Json,
    Yaml,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(&cli)?;

    match cli.command {
        Commands::Decompose {
            file,
            rfc_id,
            format,
        } => {
            let parser = RfcParser::new(&config.parser).context("invalid parser configuration")?;
            let templates = parser
                .decompose_file(&file, &rfc_id)
                .with_context(|| format!("failed to decompose {}", file.display()))?;

            match format {
                OutputFormat::Markdown => print!("{}", render_markdown(&templates)),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&templates)?),
                OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&templates)?),
            }
        }

        Commands::Create { file, rfc_id } => {
            let tracker = tracker(&config, cli.dry_run);
            let creator = MicroIssueCreator::new(tracker.as_ref(), &config)?;
            let created = creator
                .create_from_file(&file, &rfc_id)
                .await
                .with_context(|| format!("failed to create micro-issues for {}", rfc_id))?;
            print_json(&created)?;
        }

        Commands::Progress { pr } => {
            let tracker = tracker(&config, cli.dry_run);
            let outcome = Progression::new(tracker.as_ref(), &config)?
                .advance(pr)
                .await
                .with_context(|| format!("failed to advance after PR #{}", pr))?;
            print_json(&outcome)?;
        }

        Commands::ValidatePr { pr } => {
            let tracker = tracker(&config, cli.dry_run);
            let verdict = PrValidator::new(tracker.as_ref(), &config)?
                .validate(pr)
                .await
                .with_context(|| format!("failed to validate PR #{}", pr))?;
            println!("{}", verdict);

            if !verdict.is_approved() {
                std::process::exit(1);
            }
        }

        Commands::NextRfc { plan_only } => {
            let tracker = tracker(&config, cli.dry_run);
            let planner = NextRfcPlanner::new(tracker.as_ref(), &config)?;

            if plan_only {
                let candidate = planner.plan().await.context("failed to plan next RFC")?;
                print_json(&candidate)?;
            } else {
                let issue = planner
                    .create_next()
                    .await
                    .context("failed to create next RFC issue")?;
                print_json(&issue)?;
            }
        }

        Commands::Recreate { issue } => {
            let tracker = tracker(&config, cli.dry_run);
            let outcome = Recreator::new(tracker.as_ref(), &config)
                .recreate(issue)
                .await
                .with_context(|| format!("failed to recreate issue #{}", issue))?;
            print_json(&outcome)?;
        }
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<AutomationConfig> {
    let mut config = match &cli.config {
        Some(path) => AutomationConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => AutomationConfig::default(),
    };

    if let Some(repo) = &cli.repo {
        config.github.repo = Some(repo.clone());
    }

    let warnings = config
        .validate()
        .into_result()
        .context("invalid configuration")?;
    for warning in warnings {
        tracing::warn!("{}", warning);
    }

    Ok(config)
}

fn tracker(config: &AutomationConfig, dry_run: bool) -> Box<dyn IssueTracker> {
    if dry_run {
        tracing::info!("dry run: using in-memory tracker");
        Box::new(MemoryTracker::new().with_actor(&config.github.bot_login, "dry-run-actor"))
    } else {
        Box::new(
            GhClient::new(config.github.repo.clone()).with_cli_path(&config.github.cli_path),
        )
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn render_markdown(templates: &[MicroIssueTemplate]) -> String {
    let mut out = String::new();

    if templates.is_empty() {
        out.push_str("No implementable sections found.\n");
        return out;
    }

    for template in templates {
        out.push_str(&format!("# {}\n\n", template.title));
        out.push_str(&format!("- **ID**: {}\n", template.id));
        out.push_str(&format!(
            "- **Complexity**: {}\n",
            template.estimated_complexity.label()
        ));
        if !template.dependencies.is_empty() {
            out.push_str(&format!(
                "- **Depends on**: {}\n",
                template.dependencies.join(", ")
            ));
        }
        out.push('\n');
        out.push_str(&template.body);
        out.push_str("\n\n---\n\n");
    }

    out
}
