//! DogTale verify CLI - Main Entry Point

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::process::ExitCode;

use dogtale_verify::config::DEFAULT_CONFIG_FILE;
use dogtale_verify::output;
use dogtale_verify::runner;
use dogtale_verify::{Browser, ConfigOverrides, Scenario, ScenarioRunner, VerifyConfig, VerifyError};

/// Browser checks for the DogTale AI chat modal and calendar
#[derive(Parser)]
#[command(name = "dogtale-verify")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Config file
    #[arg(long, env = "DOGTALE_VERIFY_CONFIG", default_value = DEFAULT_CONFIG_FILE, global = true)]
    config: PathBuf,

    /// Base URL for scenarios that don't set their own
    #[arg(long, env = "DOGTALE_VERIFY_BASE_URL", global = true)]
    base_url: Option<String>,

    /// Where screenshots, videos and results go
    #[arg(long, env = "DOGTALE_VERIFY_OUTPUT_DIR", global = true)]
    output_dir: Option<PathBuf>,

    /// Directory of extra scenario files
    #[arg(long, env = "DOGTALE_VERIFY_SCENARIOS_DIR", global = true)]
    scenarios_dir: Option<PathBuf>,

    /// Browser engine
    #[arg(long, value_enum, env = "DOGTALE_VERIFY_BROWSER", global = true)]
    browser: Option<Browser>,

    /// Show the browser window
    #[arg(long, global = true)]
    headed: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run scenarios (all of them when none are named)
    Run(RunArgs),

    /// List available scenarios
    List {
        /// Only scenarios with this tag
        #[arg(long)]
        tag: Option<String>,
    },

    /// Print the Playwright program generated for a scenario
    Show {
        /// Scenario name
        name: String,
    },

    /// Check Playwright is installed and the app is reachable
    Check,
}

#[derive(Args)]
struct RunArgs {
    /// Scenario names
    names: Vec<String>,

    /// Only scenarios with this tag
    #[arg(long)]
    tag: Option<String>,

    /// Exit non-zero when a scenario fails
    #[arg(long)]
    strict: bool,

    /// Write a JSON summary to the output directory
    #[arg(long)]
    json: bool,

    /// Don't check the app is reachable first
    #[arg(long, env = "DOGTALE_VERIFY_SKIP_PREFLIGHT")]
    skip_preflight: bool,

    /// Hard limit for each scenario, in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .init();

    match execute(cli).await {
        Ok(code) => code,
        Err(e) => {
            output::print_error(&format!("{:#}", e));
            ExitCode::from(2)
        }
    }
}

async fn execute(cli: Cli) -> anyhow::Result<ExitCode> {
    let mut config = VerifyConfig::load(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;

    let mut overrides = ConfigOverrides {
        base_url: cli.base_url,
        output_dir: cli.output_dir,
        browser: cli.browser,
        headed: cli.headed,
        ..Default::default()
    };
    if let Commands::Run(args) = &cli.command {
        overrides.skip_preflight = args.skip_preflight;
        overrides.script_timeout_secs = args.timeout_secs;
    }
    config.apply(overrides);
    config.validate()?;

    let scenarios = Scenario::catalogue(cli.scenarios_dir.as_deref())?;

    match cli.command {
        Commands::Run(args) => {
            let selected = runner::select(&scenarios, &args.names, args.tag.as_deref())?;
            if selected.is_empty() {
                output::print_warning("No scenarios matched");
                return Ok(ExitCode::SUCCESS);
            }

            let runner = ScenarioRunner::new(config)?;
            runner.prepare().await?;

            let summary = runner.run_scenarios(&selected).await;
            if args.json {
                runner.write_results(&summary)?;
            }

            if args.strict && summary.failed > 0 {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::List { tag } => {
            let listed: Vec<Scenario> = match tag.as_deref() {
                Some(tag) => Scenario::filter_by_tag(&scenarios, tag).into_iter().cloned().collect(),
                None => scenarios,
            };
            output::print_scenario_table(&listed, &config);
        }
        Commands::Show { name } => {
            let scenario = scenarios
                .iter()
                .find(|s| s.name == name)
                .ok_or(VerifyError::ScenarioNotFound(name))?;
            let runner = ScenarioRunner::new(config)?;
            println!("{}", runner.builder().build(scenario));
        }
        Commands::Check => {
            let runner = ScenarioRunner::new(config)?;
            let mut healthy = true;

            match runner.prepare().await {
                Ok(()) => output::print_success("Playwright is installed"),
                Err(e) => {
                    output::print_failure(&e.to_string());
                    healthy = false;
                }
            }

            let base_urls: BTreeSet<&str> = scenarios
                .iter()
                .map(|s| s.effective_base_url(&runner.config().base_url))
                .collect();
            for url in base_urls {
                match runner.check_app(url).await {
                    Ok(status) => output::print_success(&format!("{} is reachable (HTTP {})", url, status)),
                    Err(e) => {
                        output::print_failure(&e.to_string());
                        healthy = false;
                    }
                }
            }

            if !healthy {
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
