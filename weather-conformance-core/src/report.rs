//! Per-scenario report entries and the sinks that persist them.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::{fmt, fs};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{HarnessError, Result};
use crate::model::CityRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Markdown,
    Json,
}

impl ReportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportFormat::Markdown => "markdown",
            ReportFormat::Json => "json",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Markdown => "md",
            ReportFormat::Json => "json",
        }
    }

    pub fn sink(&self, path: impl Into<PathBuf>) -> Box<dyn ReportSink> {
        let path = path.into();
        match self {
            ReportFormat::Markdown => Box::new(MarkdownSink::new(path)),
            ReportFormat::Json => Box::new(JsonSink::new(path)),
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ReportFormat {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "markdown" | "md" => Ok(ReportFormat::Markdown),
            "json" => Ok(ReportFormat::Json),
            _ => Err(anyhow::anyhow!(
                "Unknown report format '{value}'. Supported: markdown, json."
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Opened, body not finished yet.
    Armed,
    Passed,
    Failed,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Status::Armed => "ARMED",
            Status::Passed => "PASS",
            Status::Failed => "FAIL",
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportEntry {
    pub name: String,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub duration_ms: i64,
}

/// Handle to an armed entry, returned by [`Report::arm`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryId(usize);

/// Append-only run report. Each scenario owns exactly one entry.
#[derive(Debug)]
pub struct Report {
    base_url: String,
    subject: CityRecord,
    started_at: DateTime<Utc>,
    entries: Mutex<Vec<ReportEntry>>,
}

/// Snapshot handed to a [`ReportSink`].
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub base_url: String,
    pub subject: CityRecord,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub passed: usize,
    pub failed: usize,
    pub entries: Vec<ReportEntry>,
}

impl RunReport {
    pub fn success(&self) -> bool {
        self.failed == 0 && self.entries.iter().all(|e| e.status == Status::Passed)
    }
}

impl Report {
    pub fn new(base_url: &str, subject: CityRecord) -> Self {
        Self {
            base_url: base_url.to_string(),
            subject,
            started_at: Utc::now(),
            entries: Mutex::new(Vec::new()),
        }
    }

    // a panic while holding the lock leaves only complete entries behind
    fn lock(&self) -> MutexGuard<'_, Vec<ReportEntry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Open a new entry before a scenario body runs.
    pub fn arm(&self, name: &str) -> EntryId {
        let mut entries = self.lock();
        entries.push(ReportEntry {
            name: name.to_string(),
            status: Status::Armed,
            message: None,
            started_at: Utc::now(),
            duration_ms: 0,
        });
        EntryId(entries.len() - 1)
    }

    /// Close an armed entry with the scenario's outcome.
    pub fn record(&self, id: EntryId, outcome: &Result<()>) {
        let mut entries = self.lock();
        let Some(entry) = entries.get_mut(id.0) else {
            tracing::warn!(entry = id.0, "Outcome recorded for unknown report entry");
            return;
        };
        entry.duration_ms = (Utc::now() - entry.started_at).num_milliseconds();
        match outcome {
            Ok(()) => {
                entry.status = Status::Passed;
                entry.message = None;
            }
            Err(e) => {
                entry.status = Status::Failed;
                entry.message = Some(format!("Failed: {e}"));
            }
        }
    }

    pub fn entries(&self) -> Vec<ReportEntry> {
        self.lock().clone()
    }

    pub fn snapshot(&self) -> RunReport {
        let entries = self.entries();
        let passed = entries
            .iter()
            .filter(|e| e.status == Status::Passed)
            .count();
        let failed = entries
            .iter()
            .filter(|e| e.status == Status::Failed)
            .count();
        RunReport {
            base_url: self.base_url.clone(),
            subject: self.subject.clone(),
            started_at: self.started_at,
            finished_at: Utc::now(),
            passed,
            failed,
            entries,
        }
    }
}

/// Destination for the finished report.
pub trait ReportSink: Send + Sync + fmt::Debug {
    fn flush(&self, report: &RunReport) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct MarkdownSink {
    path: PathBuf,
}

impl MarkdownSink {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl ReportSink for MarkdownSink {
    fn flush(&self, report: &RunReport) -> Result<()> {
        write_file(&self.path, render_markdown(report).as_bytes())
    }
}

#[derive(Debug, Clone)]
pub struct JsonSink {
    path: PathBuf,
}

impl JsonSink {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl ReportSink for JsonSink {
    fn flush(&self, report: &RunReport) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(report)
            .map_err(|e| HarnessError::Report(e.to_string()))?;
        write_file(&self.path, &bytes)
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| HarnessError::Report(format!("{}: {e}", parent.display())))?;
    }
    fs::write(path, bytes)
        .map_err(|e| HarnessError::Report(format!("{}: {e}", path.display())))
}

/// Markdown rendering of a [`RunReport`].
pub struct Markdown<'a>(pub &'a RunReport);

impl fmt::Display for Markdown<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        let subject = &report.subject;
        writeln!(f, "# Weather API Conformance Report\n")?;
        writeln!(f, "- Base URL: `{}`", report.base_url)?;
        writeln!(
            f,
            "- Subject: {} ({}, id {}, lat {}, lon {})",
            subject.name, subject.country, subject.id, subject.coord.lat, subject.coord.lon
        )?;
        writeln!(f, "- Started: {}", report.started_at.to_rfc3339())?;
        writeln!(f, "- Finished: {}", report.finished_at.to_rfc3339())?;
        writeln!(
            f,
            "- Result: {} passed, {} failed\n",
            report.passed, report.failed
        )?;
        writeln!(f, "| Scenario | Status | Duration (ms) | Message |")?;
        writeln!(f, "|---|---|---|---|")?;
        for entry in &report.entries {
            let message = entry
                .message
                .as_deref()
                .unwrap_or("Passed")
                .replace('|', "\\|")
                .replace('\n', " ");
            writeln!(
                f,
                "| {} | {} | {} | {} |",
                entry.name, entry.status, entry.duration_ms, message
            )?;
        }
        Ok(())
    }
}

pub fn render_markdown(report: &RunReport) -> String {
    Markdown(report).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Coordinates;

    fn subject() -> CityRecord {
        CityRecord {
            id: 593116,
            name: "Vilnius".into(),
            state: None,
            country: "LT".into(),
            coord: Coordinates {
                lat: 54.68916,
                lon: 25.2798,
            },
        }
    }

    #[test]
    fn entries_move_from_armed_to_reported() {
        let report = Report::new("http://localhost/", subject());
        let ok = report.arm("first");
        let bad = report.arm("second");
        assert!(report.entries().iter().all(|e| e.status == Status::Armed));

        report.record(ok, &Ok(()));
        report.record(
            bad,
            &Err(HarnessError::Assertion("Country mismatch".into())),
        );

        let entries = report.entries();
        assert_eq!(entries[0].status, Status::Passed);
        assert_eq!(entries[1].status, Status::Failed);
        assert_eq!(
            entries[1].message.as_deref(),
            Some("Failed: Country mismatch")
        );
    }

    #[test]
    fn armed_entries_are_not_success() {
        let report = Report::new("http://localhost/", subject());
        report.arm("never finished");
        let snapshot = report.snapshot();
        assert_eq!(snapshot.failed, 0);
        assert!(!snapshot.success());
    }

    #[test]
    fn markdown_lists_every_entry() {
        let report = Report::new("http://localhost/", subject());
        let id = report.arm("weather_by_unknown_city_id_returns_not_found");
        let outcome = Err(HarnessError::UnexpectedStatus {
            expected: 404,
            actual: 200,
            body: "a|b".into(),
        });
        report.record(id, &outcome);
        let text = render_markdown(&report.snapshot());
        assert!(text.contains("Vilnius (LT, id 593116"));
        assert!(text.contains("| weather_by_unknown_city_id_returns_not_found | FAIL |"));
        assert!(text.contains("a\\|b"));
        assert!(text.contains("0 passed, 1 failed"));
    }

    #[test]
    fn sinks_write_files() {
        let dir = tempfile::tempdir().unwrap();
        let report = Report::new("http://localhost/", subject());
        let id = report.arm("scenario");
        report.record(id, &Ok(()));
        let snapshot = report.snapshot();

        let md = dir.path().join("out").join("report.md");
        ReportFormat::Markdown.sink(&md).flush(&snapshot).unwrap();
        let text = fs::read_to_string(&md).unwrap();
        assert!(text.contains("| scenario | PASS |"));

        let json = dir.path().join("report.json");
        ReportFormat::Json.sink(&json).flush(&snapshot).unwrap();
        let value: serde_json::Value =
            serde_json::from_slice(&fs::read(&json).unwrap()).unwrap();
        assert_eq!(value["passed"], 1);
        assert_eq!(value["entries"][0]["status"], "passed");
        assert_eq!(value["subject"]["country"], "LT");
    }

    #[test]
    fn format_parsing() {
        assert_eq!(
            ReportFormat::try_from("MD").unwrap(),
            ReportFormat::Markdown
        );
        assert_eq!(ReportFormat::try_from("json").unwrap(), ReportFormat::Json);
        assert!(ReportFormat::try_from("html").is_err());
    }
}
