//! # gitlab-aws-oidc
//!
//! Synthesizes the CloudFormation template that federates a GitLab instance with
//! an AWS account and provisions the role GitLab pipelines assume.
//!
//! ## Commands
//!
//! - `gitlab-aws-oidc synth` - Write the template JSON to stdout or a file
//! - `gitlab-aws-oidc validate` - Check the configuration and show the trusted subjects
//! - `gitlab-aws-oidc init` - Write a sample configuration file

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use gitlab_aws_oidc_stack::{GitlabOidcStack, StackConfiguration, Template};
use log::{debug, info};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Synthesize the GitLab OIDC federation stack
#[derive(Parser, Debug)]
#[command(name = "gitlab-aws-oidc")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to the stack configuration file
    #[arg(
        short,
        long,
        global = true,
        env = "GITLAB_AWS_OIDC_CONFIG",
        value_name = "FILE",
        default_value = "gitlab-aws-oidc.toml"
    )]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "GITLAB_AWS_OIDC_LOG", default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Synthesize the CloudFormation template
    Synth {
        /// Write the template to this file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Emit compact JSON instead of pretty-printed
        #[arg(long)]
        compact: bool,
    },

    /// Validate the configuration without writing a template
    Validate,

    /// Write a sample configuration file
    Init {
        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// `--log-level` sets the default filter; `RUST_LOG` refines it
fn init_logging(level: &str) {
    let mut builder = env_logger::Builder::new();
    builder.parse_filters(level).parse_default_env();
    builder.format_target(false);
    builder.init();
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Synth { output, compact } => synth(&cli.config, output.as_deref(), compact),
        Commands::Validate => validate(&cli.config),
        Commands::Init { force } => init(&cli.config, force),
    }
}

fn load_stack(config_path: &Path) -> Result<(GitlabOidcStack, Template)> {
    debug!("Loading configuration from {}", config_path.display());
    let config = StackConfiguration::from_file(config_path)
        .context("Failed to load stack configuration")?;
    let stack = GitlabOidcStack::new(&config);
    let template = stack
        .synthesize()
        .with_context(|| format!("Failed to synthesize stack {}", stack.stack_name()))?;
    Ok((stack, template))
}

fn synth(config_path: &Path, output: Option<&Path>, compact: bool) -> Result<()> {
    let (stack, template) = load_stack(config_path)?;

    let rendered = if compact {
        template.to_json()
    } else {
        template.to_json_pretty()
    };
    let json = rendered.context("Failed to render template")?;

    match output {
        Some(path) => {
            std::fs::write(path, format!("{json}\n"))
                .with_context(|| format!("Failed to write template to {}", path.display()))?;
            info!(
                "Wrote template for stack {} to {}",
                stack.stack_name(),
                path.display()
            );
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn validate(config_path: &Path) -> Result<()> {
    let (stack, template) = load_stack(config_path)?;
    let role = stack.role();

    eprintln!(
        "Stack {} is valid ({} resources)",
        stack.stack_name(),
        template.resources.len()
    );
    eprintln!("Issuer: {}", stack.provider().issuer_url);
    eprintln!("Role: {}", role.name);
    eprintln!("Trusted subjects ({}):", role.subject_claim_key);
    if role.allowed_subjects.is_empty() {
        eprintln!("  (none: the role cannot be assumed)");
    }
    for subject in &role.allowed_subjects {
        eprintln!("  {subject}");
    }
    Ok(())
}

fn init(config_path: &Path, force: bool) -> Result<()> {
    if config_path.exists() && !force {
        bail!(
            "{} already exists, pass --force to overwrite it",
            config_path.display()
        );
    }

    let sample = StackConfiguration::sample()
        .to_toml()
        .context("Failed to render sample configuration")?;
    std::fs::write(config_path, sample)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;

    eprintln!("Wrote sample configuration to {}", config_path.display());
    Ok(())
}
