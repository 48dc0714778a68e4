//! NavGate CLI
//!
//! Validates policy documents, compiles them into platform artifacts and
//! answers single authorization queries, for policy authors and host
//! integration tests.
//!
//! Usage:
//!   navgate validate
//!   navgate --policy policy.json compile --platform ios --destination photos
//!   navgate check --platform desktop --destination video https://video.example.com/shorts/1

mod commands;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use navgate::{Platform, ResourceType};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use commands::CheckRequest;

/// NavGate - navigation policy compiler
#[derive(Parser, Debug)]
#[command(name = "navgate")]
#[command(about = "Validate, compile and probe navigation policies")]
struct Args {
    /// Policy document; the bundled default when omitted
    #[arg(long, global = true, env = "NAVGATE_POLICY")]
    policy: Option<PathBuf>,

    /// Compiler options (JSON)
    #[arg(long, global = true, env = "NAVGATE_OPTIONS")]
    options: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check a policy against the schema and list every violation
    Validate,
    /// Compile a policy and print the artifacts as JSON
    Compile {
        /// Target platform: ios, android or desktop
        #[arg(long)]
        platform: Platform,
        /// Compile only this destination
        #[arg(long)]
        destination: Option<String>,
        /// Filter mode to apply instead of the policy default
        #[arg(long)]
        filter_mode: Option<String>,
    },
    /// Decide whether a URL may load
    Check {
        /// Target platform: ios, android or desktop
        #[arg(long)]
        platform: Platform,
        /// Destination the URL is visited from
        #[arg(long)]
        destination: String,
        /// Filter mode to apply instead of the policy default
        #[arg(long)]
        filter_mode: Option<String>,
        /// Decide as a sub-resource of this type (e.g. script, image, xmlhttprequest)
        #[arg(long)]
        resource: Option<ResourceType>,
        /// URL to decide
        url: String,
    },
}

fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into()))
        .init();

    let args = Args::parse();
    let mut out = io::stdout().lock();
    let policy_path = args.policy.as_deref();

    let success = match args.command {
        Command::Validate => commands::validate(policy_path, &mut out)?,
        Command::Compile {
            platform,
            destination,
            filter_mode,
        } => {
            let policy = commands::load_policy(policy_path)?;
            let options = commands::load_options(args.options.as_deref())?;
            commands::compile(
                &policy,
                &options,
                platform,
                destination.as_deref(),
                filter_mode.as_deref(),
                &mut out,
            )?;
            true
        }
        Command::Check {
            platform,
            destination,
            filter_mode,
            resource,
            url,
        } => {
            let policy = commands::load_policy(policy_path)?;
            let options = commands::load_options(args.options.as_deref())?;
            let request = CheckRequest {
                platform,
                destination: &destination,
                filter_mode: filter_mode.as_deref(),
                url: &url,
                resource,
            };
            commands::check(&policy, &options, &request, &mut out)?
        }
    };

    Ok(if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
