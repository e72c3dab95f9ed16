use anyhow::{anyhow, Context, Result};
use clap::Parser;
use gh_issues_pdf::cli::{Cli, Commands};
use gh_issues_pdf::config::OutputFormat;
use gh_issues_pdf::error::user_friendly_error;
use gh_issues_pdf::github::{self, GitHubClient};
use gh_issues_pdf::images::ImageInliner;
use gh_issues_pdf::pdf::Renderer;
use gh_issues_pdf::{Config, Exporter};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    setup_logging(cli.verbose);

    let result = match &cli.command {
        Some(Commands::Init { output }) => init_command(output.clone()),
        None => export_command(&cli),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            user_friendly_error(&e).display();
            ExitCode::FAILURE
        }
    }
}

fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn export_command(cli: &Cli) -> Result<()> {
    info!("Loading configuration");
    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    config.apply_cli(cli)?;

    let repo = config.repo_ref()?;
    let token = match &cli.token {
        Some(token) if !token.trim().is_empty() => token.clone(),
        _ => github::get_token()?,
    };

    // Check the renderer before spending any API calls
    let renderer = match config.output.format {
        OutputFormat::Pdf => Some(Renderer::new(
            config.renderer.path.as_deref(),
            config.renderer.dpi,
            config.renderer.extra_args.clone(),
        )?),
        OutputFormat::Html => None,
    };

    let github_client = GitHubClient::new(&token, &config.github.api_url, config.github.per_page)
        .context("Failed to create GitHub client")?;

    let inliner = if config.output.inline_images {
        Some(ImageInliner::new(Some(token.clone()))?)
    } else {
        None
    };

    println!(
        "Exporting '{}' issues (state={}) to {}...",
        repo,
        config.github.state.as_str(),
        config.output.format.extension().to_uppercase()
    );

    let mut exporter = Exporter::new(github_client, renderer, inliner, &config)?;
    let summary = exporter.run(&repo, &cli.issues)?;

    if summary.written.is_empty() && summary.is_success() {
        println!("No issues found for {}.", repo);
        return Ok(());
    }

    println!(
        "\nDone! Wrote {} file(s) to '{}'.",
        summary.written.len(),
        summary.output_dir.display()
    );

    if !summary.is_success() {
        for failure in &summary.failures {
            match failure.issue_number {
                Some(number) => warn!("Issue #{} failed: {}", number, failure.error),
                None => warn!("Combined document failed: {}", failure.error),
            }
        }
        return Err(anyhow!(
            "Failed to export {} document(s); see {}",
            summary.failures.len(),
            summary.output_dir.join(gh_issues_pdf::export::ERROR_LOG).display()
        ));
    }

    Ok(())
}

fn init_command(output: Option<PathBuf>) -> Result<()> {
    let config_path = match output {
        Some(path) => path,
        None => Config::default_config_path()?,
    };

    if !Config::write_default(&config_path)? {
        warn!("Configuration already exists at {:?}", config_path);
        println!("Configuration file already exists at: {:?}", config_path);
        println!("Please remove it first if you want to regenerate.");
        return Ok(());
    }

    println!("✓ Configuration created at: {:?}", config_path);
    println!("\nNext steps:");
    println!("1. Set your GitHub token:");
    println!("   export GITHUB_TOKEN='your-token-here'");
    println!("2. Set github.owner and github.repo in the configuration file");
    println!("3. Run 'gh-issues-pdf' to export the issues");

    Ok(())
}
