//! DogTale UI verification
//!
//! Declarative browser checks for the DogTale web app's AI chat modal and
//! calendar. Each scenario is a YAML list of steps that is compiled into a
//! single Playwright program, so the whole scenario shares one browser
//! session. The program reports progress as structured events on stdout,
//! which the runner folds into a report and backs with screenshot evidence.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Scenario Runner (Rust)                      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ScenarioRunner                                             │
//! │    ├── Preflight::check(base_url)                           │
//! │    ├── ScriptBuilder::build(scenario) -> JS program         │
//! │    ├── PlaywrightHandle::run_script(js) -> ScriptEvent*     │
//! │    └── evidence::inspect(screenshot) -> Evidence            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Scenario (YAML)                                            │
//! │    ├── name, description, tags, base_url, viewport          │
//! │    ├── steps: [Step]                                        │
//! │    │     ├── navigate / reload / bypass_landing             │
//! │    │     ├── click / click_first_of / fill / wait_for       │
//! │    │     ├── probe { target, attributes, capture_text }     │
//! │    │     ├── expect { target, visible?, attribute?, text? } │
//! │    │     └── screenshot { name, full_page }                 │
//! │    └── error_screenshot: Option<String>                     │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod evidence;
pub mod output;
pub mod playwright;
pub mod preflight;
pub mod runner;
pub mod scenario;
pub mod script;

pub use config::{ConfigOverrides, VerifyConfig};
pub use error::{VerifyError, VerifyResult};
pub use playwright::{Browser, PlaywrightHandle};
pub use runner::{RunSummary, ScenarioReport, ScenarioRunner};
pub use scenario::{Scenario, Step, Target};
