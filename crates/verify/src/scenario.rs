//! Declarative YAML scenario descriptions

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{VerifyError, VerifyResult};

/// Scenario and screenshot names end up as file names
static NAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9][a-z0-9_-]*$").expect("name pattern is a valid regex")
});

/// Scenarios shipped with the binary
const BUILTIN_SCENARIOS: &[(&str, &str)] = &[
    ("ai_modal_a11y.yaml", include_str!("../scenarios/ai_modal_a11y.yaml")),
    ("ai_modal_typing.yaml", include_str!("../scenarios/ai_modal_typing.yaml")),
    ("ai_modal_profanity.yaml", include_str!("../scenarios/ai_modal_profanity.yaml")),
    ("ai_modal_smoke.yaml", include_str!("../scenarios/ai_modal_smoke.yaml")),
    ("calendar.yaml", include_str!("../scenarios/calendar.yaml")),
];

/// A complete UI scenario parsed from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Unique name for this scenario
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Tags for filtering scenarios
    #[serde(default)]
    pub tags: Vec<String>,

    /// App URL; falls back to the configured base URL
    #[serde(default)]
    pub base_url: Option<String>,

    /// Viewport size; falls back to the configured viewport
    #[serde(default)]
    pub viewport: Option<Viewport>,

    /// Emulate `prefers-reduced-motion: reduce`
    #[serde(default)]
    pub reduced_motion: bool,

    /// Record a video of the session
    #[serde(default)]
    pub record_video: bool,

    /// Overrides the configured headless flag
    #[serde(default)]
    pub headless: Option<bool>,

    /// Screenshot taken when the scenario raises
    #[serde(default)]
    pub error_screenshot: Option<String>,

    /// Steps to execute in order
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// How an element is located on the page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Target {
    /// Raw Playwright selector (`css`, `text=...`)
    Selector(String),
    /// ARIA role with an optional accessible name
    Role {
        role: String,
        #[serde(default)]
        name: Option<String>,
    },
    /// Accessible label
    Label { label: String },
    /// Visible text
    Text { text: String },
    /// Input placeholder
    Placeholder { placeholder: String },
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Selector(selector) => write!(f, "{}", selector),
            Target::Role { role, name: Some(name) } => write!(f, "role={}[name=\"{}\"]", role, name),
            Target::Role { role, name: None } => write!(f, "role={}", role),
            Target::Label { label } => write!(f, "label=\"{}\"", label),
            Target::Text { text } => write!(f, "text=\"{}\"", text),
            Target::Placeholder { placeholder } => write!(f, "placeholder=\"{}\"", placeholder),
        }
    }
}

/// A single step in a scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Navigate to a URL (relative to the scenario base)
    Navigate {
        #[serde(default)]
        url: String,
        #[serde(default)]
        timeout_ms: Option<u64>,
        #[serde(default)]
        wait_until: Option<LoadState>,
    },

    /// Reload the current page
    Reload,

    /// Set the landing gate flag in local storage
    BypassLanding {
        #[serde(default)]
        strategy: BypassStrategy,
    },

    /// Evaluate JavaScript in the page
    Evaluate { script: String },

    /// Register a script that runs before every page script
    InitScript { script: String },

    /// Wait for an element to reach a state
    WaitFor {
        target: Target,
        #[serde(default)]
        state: WaitState,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },

    /// Wait for a page load state
    WaitForLoadState { state: LoadState },

    /// Click an element
    Click {
        target: Target,
        /// Click the first match instead of requiring a unique one
        #[serde(default)]
        first: bool,
        /// Tolerate the element being absent
        #[serde(default)]
        optional: bool,
        #[serde(default)]
        timeout_ms: Option<u64>,
        /// Printed when an optional click finds nothing
        #[serde(default)]
        missing_message: Option<String>,
    },

    /// Click the first candidate that exists; the last one is clicked unconditionally
    ClickFirstOf { candidates: Vec<Target> },

    /// Fill an input field
    Fill { target: Target, value: String },

    /// Wait for a fixed amount of time
    Sleep { ms: u64 },

    /// Report whether an element exists without failing the scenario
    Probe {
        name: String,
        target: Target,
        /// Attributes printed when the element is found
        #[serde(default)]
        attributes: Vec<String>,
        /// Capture the element's own text
        #[serde(default)]
        capture_text: bool,
        /// Capture the text of a child element instead
        #[serde(default)]
        text_selector: Option<String>,
        /// Label used when printing the captured text
        #[serde(default)]
        text_label: Option<String>,
    },

    /// Assert something about an element; failure raises
    Expect {
        target: Target,
        #[serde(default)]
        visible: Option<bool>,
        #[serde(default)]
        attribute: Option<AttributeExpectation>,
        #[serde(default)]
        text_contains: Option<String>,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },

    /// Save a screenshot under the output directory
    Screenshot {
        name: String,
        #[serde(default)]
        full_page: bool,
    },

    /// Print a message
    Log { message: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitState {
    #[default]
    Visible,
    Hidden,
    Attached,
    Detached,
}

impl WaitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WaitState::Visible => "visible",
            WaitState::Hidden => "hidden",
            WaitState::Attached => "attached",
            WaitState::Detached => "detached",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadState {
    Load,
    #[serde(rename = "domcontentloaded")]
    DomContentLoaded,
    #[serde(rename = "networkidle")]
    NetworkIdle,
}

impl LoadState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadState::Load => "load",
            LoadState::DomContentLoaded => "domcontentloaded",
            LoadState::NetworkIdle => "networkidle",
        }
    }
}

/// How the landing gate flag gets into local storage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BypassStrategy {
    /// Set the flag on the loaded page, then reload
    #[default]
    Reload,
    /// Set the flag from an init script before any page script runs
    InitScript,
}

impl BypassStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            BypassStrategy::Reload => "reload",
            BypassStrategy::InitScript => "init_script",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeExpectation {
    pub name: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub contains: Option<String>,
}

impl Step {
    /// Short name used in logs and reports
    pub fn describe(&self) -> String {
        match self {
            Step::Navigate { url, .. } if url.is_empty() => "navigate:/".to_string(),
            Step::Navigate { url, .. } => format!("navigate:{}", url),
            Step::Reload => "reload".to_string(),
            Step::BypassLanding { strategy } => format!("bypass_landing:{}", strategy.as_str()),
            Step::Evaluate { .. } => "evaluate".to_string(),
            Step::InitScript { .. } => "init_script".to_string(),
            Step::WaitFor { target, state, .. } => format!("wait_for:{}:{}", target, state.as_str()),
            Step::WaitForLoadState { state } => format!("wait_for_load_state:{}", state.as_str()),
            Step::Click { target, .. } => format!("click:{}", target),
            Step::ClickFirstOf { candidates } => format!("click_first_of:{}", candidates.len()),
            Step::Fill { target, .. } => format!("fill:{}", target),
            Step::Sleep { ms } => format!("sleep:{}ms", ms),
            Step::Probe { name, .. } => format!("probe:{}", name),
            Step::Expect { target, .. } => format!("expect:{}", target),
            Step::Screenshot { name, .. } => format!("screenshot:{}", name),
            Step::Log { message } => {
                let cut: String = message.chars().take(30).collect();
                format!("log:{}", cut)
            }
        }
    }
}

impl Scenario {
    /// Parse a scenario from YAML string
    pub fn from_yaml(yaml: &str) -> VerifyResult<Self> {
        let scenario: Self = serde_yaml::from_str(yaml)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Parse a scenario from a YAML file
    pub fn from_file(path: &Path) -> VerifyResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content).map_err(|e| match e {
            VerifyError::Yaml(inner) => {
                VerifyError::ScenarioParse(format!("{}: {}", path.display(), inner))
            }
            other => other,
        })
    }

    /// Load all scenarios from a directory
    pub fn load_dir(dir: &Path) -> VerifyResult<Vec<Self>> {
        if !dir.is_dir() {
            return Err(VerifyError::ScenarioParse(format!(
                "Scenario directory not found: {}",
                dir.display()
            )));
        }

        let mut scenarios: Vec<Self> = Vec::new();
        let mut sources: Vec<PathBuf> = Vec::new();

        for entry in walkdir::WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
        {
            let scenario = Self::from_file(entry.path())?;
            if let Some(i) = scenarios.iter().position(|s| s.name == scenario.name) {
                return Err(VerifyError::InvalidScenario {
                    name: scenario.name,
                    reason: format!(
                        "defined in both {} and {}",
                        sources[i].display(),
                        entry.path().display()
                    ),
                });
            }
            sources.push(entry.path().to_path_buf());
            scenarios.push(scenario);
        }

        Ok(scenarios)
    }

    /// Scenarios embedded in the binary
    pub fn builtin() -> VerifyResult<Vec<Self>> {
        BUILTIN_SCENARIOS
            .iter()
            .map(|(file, yaml)| {
                Self::from_yaml(yaml).map_err(|e| {
                    VerifyError::ScenarioParse(format!("built-in {}: {}", file, e))
                })
            })
            .collect()
    }

    /// Built-in scenarios, with same-named scenarios from `dir` replacing them
    pub fn catalogue(dir: Option<&Path>) -> VerifyResult<Vec<Self>> {
        let mut scenarios = Self::builtin()?;

        if let Some(dir) = dir {
            for extra in Self::load_dir(dir)? {
                match scenarios.iter_mut().find(|s| s.name == extra.name) {
                    Some(existing) => *existing = extra,
                    None => scenarios.push(extra),
                }
            }
        }

        Ok(scenarios)
    }

    /// Filter scenarios by tag
    pub fn filter_by_tag<'a>(scenarios: &'a [Self], tag: &str) -> Vec<&'a Self> {
        scenarios.iter().filter(|s| s.tags.iter().any(|t| t == tag)).collect()
    }

    /// Check names and step shapes before anything touches a browser
    pub fn validate(&self) -> VerifyResult<()> {
        let invalid = |reason: String| VerifyError::InvalidScenario {
            name: self.name.clone(),
            reason,
        };

        if !NAME_PATTERN.is_match(&self.name) {
            return Err(invalid(format!("name must match {}", NAME_PATTERN.as_str())));
        }

        if self.steps.is_empty() {
            return Err(invalid("no steps".to_string()));
        }

        if let Some(name) = &self.error_screenshot {
            if !NAME_PATTERN.is_match(name) {
                return Err(invalid(format!("error screenshot name '{}' is not a valid file stem", name)));
            }
        }

        for (i, step) in self.steps.iter().enumerate() {
            let at = |reason: &str| invalid(format!("step {} ({}): {}", i + 1, step.describe(), reason));

            match step {
                Step::Screenshot { name, .. } if !NAME_PATTERN.is_match(name) => {
                    return Err(at("screenshot name is not a valid file stem"));
                }
                Step::ClickFirstOf { candidates } if candidates.is_empty() => {
                    return Err(at("needs at least one candidate"));
                }
                Step::Probe { name, .. } if name.trim().is_empty() => {
                    return Err(at("probe needs a name"));
                }
                Step::Expect { visible: None, attribute: None, text_contains: None, .. } => {
                    return Err(at("expect needs visible, attribute or text_contains"));
                }
                Step::Expect { attribute: Some(attr), .. }
                    if attr.value.is_none() && attr.contains.is_none() =>
                {
                    return Err(at("attribute expectation needs value or contains"));
                }
                _ => {}
            }
        }

        Ok(())
    }

    /// The base URL this scenario runs against
    pub fn effective_base_url<'a>(&'a self, default_base: &'a str) -> &'a str {
        self.base_url.as_deref().unwrap_or(default_base)
    }

    /// Resolve a step URL against the scenario base
    pub fn resolve_url(&self, url: &str, default_base: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            return url.to_string();
        }

        let base = self.effective_base_url(default_base).trim_end_matches('/');
        let path = url.trim_start_matches('/');
        if path.is_empty() {
            base.to_string()
        } else {
            format!("{}/{}", base, path)
        }
    }

    /// Names of all screenshots this scenario may write
    pub fn screenshot_names(&self) -> Vec<&str> {
        self.steps
            .iter()
            .filter_map(|step| match step {
                Step::Screenshot { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .chain(self.error_screenshot.as_deref())
            .collect()
    }
}
