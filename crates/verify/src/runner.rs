//! Scenario runner: preflight, Playwright execution, evidence checks

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::VerifyConfig;
use crate::error::{VerifyError, VerifyResult};
use crate::event::{ScriptEvent, StepStatus};
use crate::evidence::{self, Evidence};
use crate::output;
use crate::playwright::{PlaywrightHandle, ScriptExit};
use crate::preflight::Preflight;
use crate::scenario::Scenario;
use crate::script::ScriptBuilder;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub index: usize,
    pub name: String,
    pub status: StepStatus,
    pub duration_ms: u64,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeRecord {
    pub index: usize,
    pub name: String,
    pub found: bool,
    pub count: usize,
    pub attributes: Vec<(String, Option<String>)>,
    pub text: Option<String>,
    pub error: Option<String>,
}

/// Result of running a single scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub name: String,
    pub success: bool,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub steps: Vec<StepRecord>,
    pub probes: Vec<ProbeRecord>,
    pub screenshots: Vec<Evidence>,
    pub video: Option<PathBuf>,
    pub error: Option<String>,
    /// Index of the step that raised, if any
    pub failed_step: Option<usize>,
    /// The program reached its `done` event
    pub completed: bool,

    #[serde(skip)]
    pending_screenshots: Vec<(String, PathBuf, bool)>,
}

impl ScenarioReport {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            success: false,
            started_at: Utc::now(),
            duration_ms: 0,
            steps: Vec::new(),
            probes: Vec::new(),
            screenshots: Vec::new(),
            video: None,
            error: None,
            failed_step: None,
            completed: false,
            pending_screenshots: Vec::new(),
        }
    }

    /// Report for a scenario that never reached the browser
    pub fn aborted(name: &str, error: &VerifyError) -> Self {
        let mut report = Self::new(name);
        report.error = Some(error.to_string());
        report
    }

    fn fail(&mut self, message: String) {
        if self.error.is_none() {
            self.error = Some(message);
        }
    }

    /// Fold one event into the report
    pub fn record(&mut self, event: ScriptEvent) {
        match event {
            ScriptEvent::Step { index, name, status, duration_ms, detail } => {
                self.steps.push(StepRecord { index, name, status, duration_ms, detail });
            }
            ScriptEvent::Probe { index, name, found, count, attributes, text, error, .. } => {
                self.probes.push(ProbeRecord { index, name, found, count, attributes, text, error });
            }
            ScriptEvent::Screenshot { name, path, diagnostic } => {
                self.pending_screenshots.push((name, path, diagnostic));
            }
            ScriptEvent::Video { path } => self.video = Some(path),
            ScriptEvent::Error { index, message } => {
                if self.failed_step.is_none() {
                    self.failed_step = index;
                }
                self.fail(message);
            }
            ScriptEvent::Done { success } => {
                self.completed = true;
                if !success {
                    self.fail("scenario raised".to_string());
                }
            }
            ScriptEvent::Log { .. } => {}
        }
    }

    /// Settle the process outcome and check screenshot evidence
    pub fn finish(&mut self, exit: VerifyResult<ScriptExit>, elapsed: Duration) {
        match exit {
            Ok(exit) if !self.completed => {
                let tail: Vec<&str> = exit.stderr.lines().rev().take(5).collect();
                let tail: Vec<&str> = tail.into_iter().rev().collect();
                self.fail(format!(
                    "Playwright exited (code {}) before finishing: {}",
                    exit.code.map(|c| c.to_string()).unwrap_or_else(|| "none".to_string()),
                    if tail.is_empty() { "no output".to_string() } else { tail.join(" | ") }
                ));
            }
            Ok(exit) if !exit.status_ok => {
                debug!("Playwright exited with {:?} after done", exit.code);
            }
            Ok(_) => {}
            Err(e) => self.fail(e.to_string()),
        }

        for (name, path, diagnostic) in std::mem::take(&mut self.pending_screenshots) {
            match evidence::inspect(&name, &path, diagnostic) {
                Ok(evidence) => self.screenshots.push(evidence),
                Err(e) if diagnostic => warn!("{}", e),
                Err(e) => self.fail(e.to_string()),
            }
        }

        self.duration_ms = elapsed.as_millis() as u64;
        self.success = self.completed && self.error.is_none();
    }

    pub fn probes_missing(&self) -> usize {
        self.probes.iter().filter(|p| !p.found).count()
    }
}

/// Result of running several scenarios
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub results: Vec<ScenarioReport>,
}

impl RunSummary {
    pub fn from_reports(results: Vec<ScenarioReport>, duration_ms: u64) -> Self {
        let passed = results.iter().filter(|r| r.success).count();
        Self {
            total: results.len(),
            passed,
            failed: results.len() - passed,
            duration_ms,
            results,
        }
    }
}

/// Pick scenarios by name (in the order given) or by tag; everything when neither is set
pub fn select<'a>(
    scenarios: &'a [Scenario],
    names: &[String],
    tag: Option<&str>,
) -> VerifyResult<Vec<&'a Scenario>> {
    let mut selected = Vec::new();

    for name in names {
        let scenario = scenarios
            .iter()
            .find(|s| &s.name == name)
            .ok_or_else(|| VerifyError::ScenarioNotFound(name.clone()))?;
        selected.push(scenario);
    }

    if names.is_empty() {
        selected = scenarios.iter().collect();
    }

    if let Some(tag) = tag {
        selected.retain(|s| s.tags.iter().any(|t| t == tag));
    }

    Ok(selected)
}

/// Runs scenarios one after another
pub struct ScenarioRunner {
    config: VerifyConfig,
    playwright: PlaywrightHandle,
    builder: ScriptBuilder,
    preflight: Option<Preflight>,
}

impl ScenarioRunner {
    pub fn new(config: VerifyConfig) -> VerifyResult<Self> {
        let playwright = PlaywrightHandle::new(&config)?;
        let builder = ScriptBuilder::new(&config)?;
        let preflight = if config.preflight {
            Some(Preflight::new(Duration::from_secs(2))?)
        } else {
            None
        };

        Ok(Self {
            config,
            playwright,
            builder,
            preflight,
        })
    }

    /// Replace the Playwright handle (custom Node binary or timeout)
    pub fn with_playwright(mut self, playwright: PlaywrightHandle) -> Self {
        self.playwright = playwright;
        self
    }

    pub fn config(&self) -> &VerifyConfig {
        &self.config
    }

    pub fn builder(&self) -> &ScriptBuilder {
        &self.builder
    }

    /// Check Playwright is available and create output directories
    pub async fn prepare(&self) -> VerifyResult<()> {
        self.playwright.ensure_installed().await?;
        self.create_output_dirs()
    }

    fn create_output_dirs(&self) -> VerifyResult<()> {
        std::fs::create_dir_all(self.builder.output_dir())?;
        std::fs::create_dir_all(self.builder.video_dir())?;
        Ok(())
    }

    /// Check the app behind a base URL responds
    pub async fn check_app(&self, url: &str) -> VerifyResult<u16> {
        match &self.preflight {
            Some(preflight) => preflight.check(url).await,
            None => Preflight::new(Duration::from_secs(2))?.check(url).await,
        }
    }

    /// Run a list of scenarios
    pub async fn run_scenarios(&self, scenarios: &[&Scenario]) -> RunSummary {
        let start = Instant::now();
        let mut results = Vec::new();

        info!("Running {} scenario(s)...", scenarios.len());

        for scenario in scenarios {
            let report = self.run_scenario(scenario).await;
            output::print_report_footer(&report);
            results.push(report);
        }

        let summary = RunSummary::from_reports(results, start.elapsed().as_millis() as u64);
        output::print_summary(&summary);
        summary
    }

    /// Run a single scenario; failures are recorded, never returned
    pub async fn run_scenario(&self, scenario: &Scenario) -> ScenarioReport {
        let start = Instant::now();
        output::print_scenario_header(scenario);

        if let Err(e) = self.create_output_dirs() {
            return ScenarioReport::aborted(&scenario.name, &e);
        }

        if let Some(preflight) = &self.preflight {
            let url = scenario.effective_base_url(&self.config.base_url);
            if let Err(e) = preflight.check(url).await {
                output::print_error(&e.to_string());
                let mut report = ScenarioReport::aborted(&scenario.name, &e);
                report.duration_ms = start.elapsed().as_millis() as u64;
                return report;
            }
        }

        let script = self.builder.build(scenario);
        let mut report = ScenarioReport::new(&scenario.name);

        let exit = self
            .playwright
            .run_script(&script, |event| {
                output::print_event(&event);
                report.record(event);
            })
            .await;

        report.finish(exit, start.elapsed());
        report
    }

    /// Write the run summary as JSON
    pub fn write_results(&self, summary: &RunSummary) -> VerifyResult<PathBuf> {
        std::fs::create_dir_all(&self.config.output_dir)?;

        let path = self.config.results_path();
        let json = serde_json::to_string_pretty(summary)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn exit_ok() -> VerifyResult<ScriptExit> {
        Ok(ScriptExit { status_ok: true, code: Some(0), stderr: String::new() })
    }

    fn png(dir: &std::path::Path, name: &str) -> PathBuf {
        let path = dir.join(format!("{}.png", name));
        RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255])).save(&path).unwrap();
        path
    }

    #[test]
    fn test_missing_probe_does_not_fail_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let shot = png(dir.path(), "ai_modal_a11y");

        let mut report = ScenarioReport::new("ai-modal-a11y");
        report.record(ScriptEvent::Probe {
            index: 8,
            name: "Chat history container".to_string(),
            found: false,
            count: 0,
            attributes: Vec::new(),
            text: None,
            text_label: None,
            error: None,
        });
        report.record(ScriptEvent::Screenshot { name: "ai_modal_a11y".to_string(), path: shot, diagnostic: false });
        report.record(ScriptEvent::Done { success: true });
        report.finish(exit_ok(), Duration::from_millis(5));

        assert!(report.success);
        assert_eq!(report.probes_missing(), 1);
        assert_eq!(report.screenshots.len(), 1);
    }

    #[test]
    fn test_error_keeps_first_message_and_step() {
        let dir = tempfile::tempdir().unwrap();
        let shot = png(dir.path(), "error");

        let mut report = ScenarioReport::new("calendar");
        report.record(ScriptEvent::Error { index: Some(2), message: "Timeout 30000ms exceeded".to_string() });
        report.record(ScriptEvent::Screenshot { name: "error".to_string(), path: shot, diagnostic: true });
        report.record(ScriptEvent::Done { success: false });
        report.finish(exit_ok(), Duration::from_millis(5));

        assert!(!report.success);
        assert_eq!(report.failed_step, Some(2));
        assert_eq!(report.error.as_deref(), Some("Timeout 30000ms exceeded"));
        assert!(report.screenshots[0].diagnostic);
    }

    #[test]
    fn test_missing_screenshot_fails_scenario() {
        let dir = tempfile::tempdir().unwrap();

        let mut report = ScenarioReport::new("calendar");
        report.record(ScriptEvent::Screenshot {
            name: "calendar".to_string(),
            path: dir.path().join("calendar.png"),
            diagnostic: false,
        });
        report.record(ScriptEvent::Done { success: true });
        report.finish(exit_ok(), Duration::from_millis(5));

        assert!(!report.success);
        assert!(report.error.unwrap().contains("was not written"));
    }

    #[test]
    fn test_missing_diagnostic_screenshot_only_warns() {
        let dir = tempfile::tempdir().unwrap();

        let mut report = ScenarioReport::new("calendar");
        report.record(ScriptEvent::Error { index: Some(1), message: "boom".to_string() });
        report.record(ScriptEvent::Screenshot {
            name: "error".to_string(),
            path: dir.path().join("error.png"),
            diagnostic: true,
        });
        report.record(ScriptEvent::Done { success: false });
        report.finish(exit_ok(), Duration::from_millis(5));

        assert_eq!(report.error.as_deref(), Some("boom"));
        assert!(report.screenshots.is_empty());
    }

    #[test]
    fn test_exit_without_done_reports_stderr_tail() {
        let mut report = ScenarioReport::new("calendar");
        report.finish(
            Ok(ScriptExit {
                status_ok: false,
                code: Some(1),
                stderr: "Error: Cannot find module 'playwright'\nRequire stack:\n- /tmp/scenario.js".to_string(),
            }),
            Duration::from_millis(5),
        );

        assert!(!report.success);
        let error = report.error.unwrap();
        assert!(error.contains("code 1"));
        assert!(error.contains("Cannot find module 'playwright'"));
    }

    #[test]
    fn test_process_error_is_recorded() {
        let mut report = ScenarioReport::new("calendar");
        report.finish(Err(VerifyError::Timeout("scenario".to_string())), Duration::from_secs(1));
        assert!(!report.success);
        assert!(report.error.unwrap().contains("Timeout"));
    }

    #[test]
    fn test_select_by_name_keeps_order() {
        let scenarios = Scenario::builtin().unwrap();
        let names = vec!["calendar".to_string(), "ai-modal-a11y".to_string()];
        let selected = select(&scenarios, &names, None).unwrap();
        let picked: Vec<&str> = selected.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(picked, vec!["calendar", "ai-modal-a11y"]);
    }

    #[test]
    fn test_select_unknown_name() {
        let scenarios = Scenario::builtin().unwrap();
        let err = select(&scenarios, &["nope".to_string()], None).unwrap_err();
        assert!(matches!(err, VerifyError::ScenarioNotFound(_)));
    }

    #[test]
    fn test_select_by_tag() {
        let scenarios = Scenario::builtin().unwrap();
        let selected = select(&scenarios, &[], Some("calendar")).unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].name, "calendar");
    }

    #[test]
    fn test_summary_counts() {
        let mut ok = ScenarioReport::new("a");
        ok.success = true;
        let failed = ScenarioReport::new("b");
        let summary = RunSummary::from_reports(vec![ok, failed], 10);
        assert_eq!((summary.total, summary.passed, summary.failed), (2, 1, 1));
    }
}
