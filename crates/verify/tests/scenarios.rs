//! Scenario catalogue tests
//!
//! Built-in scenarios, directory overrides and the programs generated for them.

use std::fs;

use tempfile::TempDir;
use test_case::test_case;

use dogtale_verify::runner::select;
use dogtale_verify::script::ScriptBuilder;
use dogtale_verify::{Scenario, VerifyConfig, VerifyError};

fn config_in(dir: &TempDir) -> VerifyConfig {
    VerifyConfig {
        output_dir: dir.path().join("verification"),
        ..Default::default()
    }
}

#[test_case("ai-modal-a11y", "http://localhost:5173"; "a11y runs against vite")]
#[test_case("ai-modal-typing", "http://localhost:5173"; "typing runs against vite")]
#[test_case("ai-modal-profanity", "http://localhost:5173"; "profanity runs against vite")]
#[test_case("calendar", "http://localhost:3000"; "calendar runs against the app server")]
fn test_builtin_base_urls(name: &str, base_url: &str) {
    let scenarios = Scenario::builtin().unwrap();
    let scenario = scenarios.iter().find(|s| s.name == name).unwrap();
    assert_eq!(scenario.effective_base_url("http://example.invalid"), base_url);
}

#[test]
fn test_every_builtin_compiles_to_a_program() {
    let dir = TempDir::new().unwrap();
    let builder = ScriptBuilder::new(&config_in(&dir)).unwrap();

    for scenario in Scenario::builtin().unwrap() {
        let script = builder.build(&scenario);
        assert!(script.contains("require('playwright')"), "{}", scenario.name);

        for name in scenario.screenshot_names() {
            let path = builder.screenshot_path(name);
            let literal = serde_json::to_string(&path.display().to_string()).unwrap();
            assert!(script.contains(&literal), "{} missing {}", scenario.name, literal);
        }
    }
}

#[test]
fn test_calendar_program_tolerates_missing_month_toggle() {
    let dir = TempDir::new().unwrap();
    let builder = ScriptBuilder::new(&config_in(&dir)).unwrap();
    let scenarios = Scenario::builtin().unwrap();
    let calendar = scenarios.iter().find(|s| s.name == "calendar").unwrap();

    let script = builder.build(calendar);
    assert!(script.contains(r#"button[aria-label=\"Show month view\"]"#));
    assert!(script.contains("skipped: true, message"));
}

#[test]
fn test_directory_scenario_replaces_builtin() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("calendar.yaml"),
        r#"
name: calendar
base_url: http://localhost:4000
steps:
  - action: navigate
  - action: screenshot
    name: calendar
"#,
    )
    .unwrap();
    fs::write(
        dir.path().join("settings.yml"),
        r#"
name: settings
tags: [settings]
steps:
  - action: navigate
    url: /settings
  - action: screenshot
    name: settings
"#,
    )
    .unwrap();
    fs::write(dir.path().join("notes.txt"), "not a scenario").unwrap();

    let scenarios = Scenario::catalogue(Some(dir.path())).unwrap();
    let names: Vec<&str> = scenarios.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "ai-modal-a11y",
            "ai-modal-typing",
            "ai-modal-profanity",
            "ai-modal-smoke",
            "calendar",
            "settings",
        ]
    );

    let calendar = scenarios.iter().find(|s| s.name == "calendar").unwrap();
    assert_eq!(calendar.steps.len(), 2);
    assert_eq!(calendar.effective_base_url("http://localhost:3000"), "http://localhost:4000");

    let tagged = select(&scenarios, &[], Some("settings")).unwrap();
    assert_eq!(tagged.len(), 1);
}

#[test]
fn test_invalid_directory_scenario_is_reported() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("broken.yaml"),
        r#"
name: Broken Name
steps:
  - action: navigate
"#,
    )
    .unwrap();

    let err = Scenario::catalogue(Some(dir.path())).unwrap_err();
    assert!(matches!(err, VerifyError::InvalidScenario { .. }));
}

#[test]
fn test_missing_scenario_directory() {
    let dir = TempDir::new().unwrap();
    let err = Scenario::catalogue(Some(&dir.path().join("nope"))).unwrap_err();
    assert!(matches!(err, VerifyError::ScenarioParse(_)));
}

#[test]
fn test_duplicate_names_in_directory_are_rejected() {
    let dir = TempDir::new().unwrap();
    let yaml = r#"
name: settings
steps:
  - action: navigate
    url: /settings
"#;
    fs::write(dir.path().join("a_settings.yaml"), yaml).unwrap();
    fs::write(dir.path().join("b_settings.yml"), yaml).unwrap();

    let err = Scenario::catalogue(Some(dir.path())).unwrap_err();
    match err {
        VerifyError::InvalidScenario { name, reason } => {
            assert_eq!(name, "settings");
            assert!(reason.contains("a_settings.yaml"), "{}", reason);
            assert!(reason.contains("b_settings.yml"), "{}", reason);
        }
        other => panic!("unexpected error {:?}", other),
    }
}
