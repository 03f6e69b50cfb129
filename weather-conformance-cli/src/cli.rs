use std::io::{self, Write};
use std::{path::PathBuf, process::ExitCode};

use anyhow::Context;
use clap::{Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode, Text};
use weather_conformance_core::config::{DEFAULT_BASE_URL, DEFAULT_CATALOG_PATH};
use weather_conformance_core::report::Status;
use weather_conformance_core::{Config, ReportFormat, RunReport, Scenario, Suite};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(
    name = "weather-conformance",
    version,
    about = "Weather API conformance suite"
)]
pub struct Cli {
    /// Log at debug level (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the API key and defaults in the config file.
    Configure,

    /// Run the suite against the configured deployment.
    Run {
        /// API key; overrides config and OWM_API_KEY.
        #[arg(long)]
        api_key: Option<String>,

        /// Base URL of the API, e.g. https://api.openweathermap.org/data/2.5/
        #[arg(long)]
        base_url: Option<String>,

        /// City catalog JSON file.
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Where to write the report.
        #[arg(long)]
        report: Option<PathBuf>,

        /// Report format: markdown or json.
        #[arg(long, value_parser = parse_format)]
        format: Option<ReportFormat>,

        /// Scenarios in flight at once.
        #[arg(long)]
        concurrency: Option<usize>,

        /// Per-request timeout in seconds.
        #[arg(long)]
        timeout: Option<u64>,

        /// Only run scenarios whose name contains this text.
        #[arg(long)]
        filter: Option<String>,
    },

    /// List scenario names.
    List,
}

fn parse_format(value: &str) -> anyhow::Result<ReportFormat> {
    ReportFormat::try_from(value)
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<ExitCode> {
        match self.command {
            Command::Configure => {
                configure()?;
                Ok(ExitCode::SUCCESS)
            }
            Command::List => {
                for scenario in Scenario::all() {
                    println!("{scenario}");
                }
                Ok(ExitCode::SUCCESS)
            }
            Command::Run {
                api_key,
                base_url,
                catalog,
                report,
                format,
                concurrency,
                timeout,
                filter,
            } => {
                let overrides = Config {
                    api_key,
                    base_url,
                    catalog_path: catalog,
                    report_path: report,
                    report_format: format,
                    concurrency,
                    timeout_secs: timeout,
                };
                let settings = Config::load()?.with_env().merge(overrides).resolve()?;
                tracing::debug!(?settings, "Resolved run settings");

                let scenarios = Scenario::matching(filter.as_deref());
                if scenarios.is_empty() {
                    anyhow::bail!(
                        "No scenario matches filter {:?}. Run `weather-conformance list`.",
                        filter
                    );
                }

                let report_path = settings.report_path.clone();
                let suite = Suite::setup(settings)
                    .context("Run setup failed, no scenario was executed")?;
                suite.run_all(&scenarios).await;

                let report = finish(suite, &mut io::stdout().lock())?;
                tracing::info!(path = %report_path.display(), "Report written");
                println!("Report written to {}", report_path.display());

                Ok(if report.success() {
                    ExitCode::SUCCESS
                } else {
                    ExitCode::FAILURE
                })
            }
        }
    }
}

fn configure() -> anyhow::Result<()> {
    let mut cfg = Config::load()?;

    let api_key = Password::new("API key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()?;

    let base_url = Text::new("Base URL:")
        .with_default(cfg.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL))
        .prompt()?;

    let current_catalog = cfg
        .catalog_path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| DEFAULT_CATALOG_PATH.to_string());
    let catalog = Text::new("City catalog path:")
        .with_default(&current_catalog)
        .prompt()?;

    if !api_key.trim().is_empty() {
        cfg.api_key = Some(api_key.trim().to_string());
    }
    cfg.base_url = Some(base_url);
    cfg.catalog_path = Some(PathBuf::from(catalog));

    // fail now rather than at the next run
    cfg.clone().resolve()?;

    let path = cfg.save()?;
    tracing::debug!(path = %path.display(), "Configuration saved");
    println!("Configuration saved to {}", path.display());
    Ok(())
}

/// Print the per-scenario results, then tear the suite down. The results are
/// printed even when the report cannot be written.
fn finish(suite: Suite, out: &mut impl Write) -> anyhow::Result<RunReport> {
    let report = suite.report().snapshot();
    print_summary(&report, out)?;
    suite
        .teardown()
        .context("Scenarios finished but the report could not be written")?;
    Ok(report)
}

fn print_summary(report: &RunReport, out: &mut impl Write) -> io::Result<()> {
    let subject = &report.subject;
    writeln!(
        out,
        "Subject: {} ({}, id {})",
        subject.name, subject.country, subject.id
    )?;
    for entry in &report.entries {
        match (&entry.status, &entry.message) {
            (Status::Passed, _) => writeln!(out, "  PASS  {}", entry.name)?,
            (_, Some(message)) => writeln!(
                out,
                "  {}  {}\n        {}",
                entry.status, entry.name, message
            )?,
            (_, None) => writeln!(out, "  {}  {}", entry.status, entry.name)?,
        }
    }
    writeln!(out, "{} passed, {} failed", report.passed, report.failed)
}
