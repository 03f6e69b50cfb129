//! Run-scoped fixtures: one shared client and one randomly chosen city, set up
//! before any scenario runs and torn down after all of them finish.

use futures::stream::{self, StreamExt};

use crate::catalog::CityCatalog;
use crate::client::{ClientFactory, WeatherClient};
use crate::config::RunSettings;
use crate::error::Result;
use crate::model::CityRecord;
use crate::report::{Report, ReportSink, RunReport};
use crate::scenario::Scenario;

/// Read-only state shared by every scenario of a run.
#[derive(Debug)]
pub struct RunContext {
    client: WeatherClient,
    factory: ClientFactory,
    subject: CityRecord,
    settings: RunSettings,
}

impl RunContext {
    pub fn client(&self) -> &WeatherClient {
        &self.client
    }

    pub fn subject(&self) -> &CityRecord {
        &self.subject
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    /// A fresh client against the same base URL with a different key.
    pub fn client_with_key(&self, api_key: &str) -> Result<WeatherClient> {
        self.factory.create(api_key, &self.settings.base_url)
    }
}

/// A suite that has completed run-level setup.
///
/// Scenarios only ever see `&RunContext`; [`Suite::teardown`] consumes the
/// suite, so it cannot run while a scenario still holds the context.
#[derive(Debug)]
pub struct Suite {
    context: RunContext,
    report: Report,
    sink: Box<dyn ReportSink>,
}

impl Suite {
    /// Build the shared client, load the catalog and pick the subject.
    /// Any error here is fatal for the run.
    pub fn setup(settings: RunSettings) -> Result<Self> {
        let sink = settings.report_format.sink(&settings.report_path);
        Self::setup_with_sink(settings, sink)
    }

    pub fn setup_with_sink(settings: RunSettings, sink: Box<dyn ReportSink>) -> Result<Self> {
        let factory = ClientFactory::new().with_timeout(settings.timeout);
        let client = factory.create(&settings.api_key, &settings.base_url)?;

        let catalog = CityCatalog::load(&settings.catalog_path)?;
        let subject = catalog.pick_random()?.clone();

        tracing::info!(
            base_url = %settings.base_url,
            cities = catalog.len(),
            subject.id = subject.id,
            subject.name = %subject.name,
            subject.country = %subject.country,
            "Run ready"
        );

        let report = Report::new(settings.base_url.as_str(), subject.clone());
        Ok(Self {
            context: RunContext {
                client,
                factory,
                subject,
                settings,
            },
            report,
            sink,
        })
    }

    pub fn context(&self) -> &RunContext {
        &self.context
    }

    pub fn report(&self) -> &Report {
        &self.report
    }

    /// Arm an entry, run the body, record the outcome.
    pub async fn run_scenario(&self, scenario: &Scenario) -> Result<()> {
        let name = scenario.name();
        let entry = self.report.arm(&name);

        let outcome = scenario.run(&self.context).await;
        match &outcome {
            Ok(()) => tracing::info!(scenario = %name, "Passed"),
            Err(e) => tracing::warn!(scenario = %name, error = %e, "Failed"),
        }

        self.report.record(entry, &outcome);
        outcome
    }

    /// Run `scenarios` with at most `settings.concurrency` in flight.
    /// Failures are recorded and never stop the remaining scenarios.
    pub async fn run_all(&self, scenarios: &[Scenario]) {
        let limit = self.context.settings.concurrency.max(1);
        stream::iter(scenarios)
            .map(|scenario| self.run_scenario(scenario))
            .buffer_unordered(limit)
            .for_each(|_| async {})
            .await;
    }

    /// Release the shared client and flush the report to the sink.
    pub fn teardown(self) -> Result<RunReport> {
        drop(self.context);

        let snapshot = self.report.snapshot();
        self.sink.flush(&snapshot)?;
        tracing::info!(
            passed = snapshot.passed,
            failed = snapshot.failed,
            "Report flushed"
        );
        Ok(snapshot)
    }
}

/// Setup, run every scenario, teardown.
pub async fn run(settings: RunSettings, scenarios: &[Scenario]) -> Result<RunReport> {
    let suite = Suite::setup(settings)?;
    suite.run_all(scenarios).await;
    suite.teardown()
}
