//! Console output for scenario runs

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use tracing::debug;

use crate::config::VerifyConfig;
use crate::event::{ScriptEvent, StepStatus};
use crate::runner::{RunSummary, ScenarioReport};
use crate::scenario::Scenario;

pub fn print_scenario_header(scenario: &Scenario) {
    println!();
    println!("{} {}", "▶".cyan(), scenario.name.bold());
    if !scenario.description.is_empty() {
        println!("  {}", scenario.description.trim().dimmed());
    }
}

/// Print an event the way a person watching the run wants to see it
pub fn print_event(event: &ScriptEvent) {
    match event {
        ScriptEvent::Log { message, .. } => println!("{}", message),
        ScriptEvent::Probe { name, found, attributes, text, text_label, error, .. } => {
            if *found {
                print_success(&format!("{} found", name));
                if !attributes.is_empty() {
                    println!("   {}", format_attributes(attributes));
                }
                if let Some(text) = text {
                    println!("   {}: '{}'", text_label.as_deref().unwrap_or("Text"), text.trim());
                }
            } else {
                print_failure(&format!("{} NOT found", name));
            }
            if let Some(error) = error {
                println!("   {}", format!("probe error: {}", error).yellow());
            }
        }
        ScriptEvent::Step { name, status, duration_ms, detail, .. } => match status {
            StepStatus::Ok => debug!("✓ {} ({} ms)", name, duration_ms),
            StepStatus::Skipped => {
                print_warning(detail.as_deref().unwrap_or("step skipped"));
            }
            StepStatus::Failed => debug!("✗ {} ({} ms)", name, duration_ms),
        },
        ScriptEvent::Screenshot { path, diagnostic, .. } => {
            if *diagnostic {
                println!("📸 Diagnostic screenshot saved to {}", path.display());
            } else {
                println!("📸 Screenshot saved to {}", path.display());
            }
        }
        ScriptEvent::Video { path } => println!("🎬 Video saved to {}", path.display()),
        ScriptEvent::Error { message, .. } => print_error(message),
        ScriptEvent::Done { .. } => {}
    }
}

/// `role: log, aria-live: polite`, with `None` for absent attributes
pub fn format_attributes(attributes: &[(String, Option<String>)]) -> String {
    attributes
        .iter()
        .map(|(name, value)| format!("{}: {}", name, value.as_deref().unwrap_or("None")))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn print_report_footer(report: &ScenarioReport) {
    if report.success {
        print_success(&format!(
            "Scenario '{}' completed successfully ({} ms)",
            report.name, report.duration_ms
        ));
    } else {
        print_failure(&format!(
            "Scenario '{}' failed: {}",
            report.name,
            report.error.as_deref().unwrap_or("unknown error")
        ));
    }
}

pub fn print_summary(summary: &RunSummary) {
    println!();
    let line = format!(
        "Results: {} passed, {} failed ({} ms)",
        summary.passed, summary.failed, summary.duration_ms
    );
    if summary.failed == 0 {
        println!("{}", line.green());
    } else {
        println!("{}", line.red());
    }
}

pub fn print_scenario_table(scenarios: &[Scenario], config: &VerifyConfig) {
    if scenarios.is_empty() {
        println!("No scenarios found.");
        return;
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec!["Name", "Tags", "Base URL", "Steps", "Description"]);
    for scenario in scenarios {
        table.add_row(vec![
            scenario.name.clone(),
            scenario.tags.join(", "),
            scenario.effective_base_url(&config.base_url).to_string(),
            scenario.steps.len().to_string(),
            scenario.description.trim().to_string(),
        ]);
    }

    println!("{table}");
}

pub fn print_success(message: &str) {
    println!("✅ {}", message);
}

pub fn print_failure(message: &str) {
    println!("❌ {}", message);
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", "Error:".red().bold(), message);
}

pub fn print_warning(message: &str) {
    println!("{}", format!("⚠️  {}", message).yellow());
}
