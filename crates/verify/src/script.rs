//! Compiles a [`Scenario`] into a single Playwright program
//!
//! The whole scenario runs in one browser session. Steps are wrapped so every
//! one reports a `step` event, probes never throw, and the outer handler
//! takes the diagnostic screenshot before the context and browser close.

use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};

use crate::config::{absolutize, LandingGateConfig, VerifyConfig};
use crate::error::VerifyResult;
use crate::event::EVENT_PREFIX;
use crate::playwright::Browser;
use crate::scenario::{AttributeExpectation, BypassStrategy, Scenario, Step, Target};

const PRELUDE: &str = r#"
function emit(event) {
  console.log(EVENT_PREFIX + JSON.stringify(event));
}

async function step(index, name, body) {
  const started = Date.now();
  try {
    const outcome = (await body()) || {};
    emit({
      event: 'step',
      index,
      name,
      status: outcome.skipped ? 'skipped' : 'ok',
      duration_ms: Date.now() - started,
      detail: outcome.message || null,
    });
  } catch (error) {
    emit({ event: 'step', index, name, status: 'failed', duration_ms: Date.now() - started, detail: error.message });
    error.stepIndex = index;
    throw error;
  }
}

async function probe(index, name, locator, options) {
  const event = { event: 'probe', index, name, found: false, count: 0, attributes: [], text: null, text_label: options.textLabel, error: null };
  try {
    event.count = await locator.count();
    event.found = event.count > 0;
    if (event.found) {
      const element = locator.first();
      for (const attribute of options.attributes) {
        event.attributes.push([attribute, await element.getAttribute(attribute)]);
      }
      if (options.textSelector) {
        const child = element.locator(options.textSelector);
        event.text = (await child.count()) > 0 ? await child.first().textContent() : null;
      } else if (options.captureText) {
        event.text = await element.textContent();
      }
    }
  } catch (error) {
    event.error = error.message;
  }
  emit(event);
}

async function poll(timeout, check, describe) {
  const deadline = Date.now() + timeout;
  let last = null;
  for (;;) {
    last = await check();
    if (last.ok) return;
    if (Date.now() >= deadline) throw new Error(describe(last.actual));
    await new Promise((resolve) => setTimeout(resolve, 100));
  }
}

async function expectAttribute(locator, name, expected, contains, timeout) {
  const element = locator.first();
  await element.waitFor({ state: 'attached', timeout });
  await poll(
    timeout,
    async () => {
      const actual = await element.getAttribute(name);
      const ok = actual !== null
        && (expected === null || actual === expected)
        && (contains === null || actual.includes(contains));
      return { ok, actual };
    },
    (actual) => `expected attribute ${name}` + (expected !== null ? `="${expected}"` : '')
      + (contains !== null ? ` containing "${contains}"` : '') + `, got ${actual === null ? 'none' : `"${actual}"`}`,
  );
}

async function expectText(locator, contains, timeout) {
  const element = locator.first();
  await element.waitFor({ state: 'attached', timeout });
  await poll(
    timeout,
    async () => {
      const actual = await element.textContent();
      return { ok: actual !== null && actual.includes(contains), actual };
    },
    (actual) => `expected text containing "${contains}", got "${actual}"`,
  );
}
"#;

/// Builds Playwright programs from scenarios
#[derive(Debug, Clone)]
pub struct ScriptBuilder {
    default_base_url: String,
    output_dir: PathBuf,
    video_dir: PathBuf,
    browser: Browser,
    headless: bool,
    viewport_width: u32,
    viewport_height: u32,
    default_timeout_ms: u64,
    landing_gate: LandingGateConfig,
}

impl ScriptBuilder {
    /// Create a builder; output paths are made absolute
    pub fn new(config: &VerifyConfig) -> VerifyResult<Self> {
        Ok(Self {
            default_base_url: config.base_url.clone(),
            output_dir: config.absolute_output_dir()?,
            video_dir: absolutize(&config.video_dir())?,
            browser: config.browser.kind,
            headless: config.browser.headless,
            viewport_width: config.browser.viewport_width,
            viewport_height: config.browser.viewport_height,
            default_timeout_ms: config.default_timeout_ms,
            landing_gate: config.landing_gate.clone(),
        })
    }

    /// Where a named screenshot is written
    pub fn screenshot_path(&self, name: &str) -> PathBuf {
        self.output_dir.join(format!("{}.png", name))
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn video_dir(&self) -> &Path {
        &self.video_dir
    }

    /// Build the full program for a scenario
    pub fn build(&self, scenario: &Scenario) -> String {
        let mut lines: Vec<String> = Vec::new();

        lines.push(format!("// Scenario: {}", scenario.name));
        lines.push("const playwright = require('playwright');".to_string());
        lines.push(format!("const EVENT_PREFIX = {};", js(EVENT_PREFIX)));
        lines.push(PRELUDE.to_string());

        lines.push("(async () => {".to_string());
        lines.push("  let browser = null;".to_string());
        lines.push("  let context = null;".to_string());
        lines.push("  let page = null;".to_string());
        lines.push("  let success = true;".to_string());
        lines.push("  try {".to_string());
        lines.push(format!(
            "    browser = await playwright[{}].launch({});",
            js(self.browser.as_str()),
            json!({ "headless": scenario.headless.unwrap_or(self.headless) })
        ));
        lines.push(format!(
            "    context = await browser.newContext({});",
            self.context_options(scenario)
        ));
        lines.push("    page = await context.newPage();".to_string());
        lines.push(format!("    page.setDefaultTimeout({});", self.default_timeout_ms));

        for (index, step) in scenario.steps.iter().enumerate() {
            lines.push(format!("    // Step {}: {}", index + 1, step.describe()));
            lines.push(format!(
                "    await step({}, {}, async () => {{",
                index,
                js(&step.describe())
            ));
            for body_line in self.step_to_js(scenario, step, index) {
                lines.push(format!("      {}", body_line));
            }
            lines.push("    });".to_string());
        }

        lines.push("  } catch (error) {".to_string());
        lines.push("    success = false;".to_string());
        lines.push(
            "    emit({ event: 'error', index: error.stepIndex ?? null, message: error.message });"
                .to_string(),
        );
        if let Some(name) = &scenario.error_screenshot {
            let path = path_js(&self.screenshot_path(name));
            lines.push("    if (page) {".to_string());
            lines.push("      try {".to_string());
            lines.push(format!("        await page.screenshot({{ path: {} }});", path));
            lines.push(format!(
                "        emit({{ event: 'screenshot', name: {}, path: {}, diagnostic: true }});",
                js(name),
                path
            ));
            lines.push("      } catch (shotError) {".to_string());
            lines.push(
                "        emit({ event: 'log', index: null, message: 'Diagnostic screenshot failed: ' + shotError.message });"
                    .to_string(),
            );
            lines.push("      }".to_string());
            lines.push("    }".to_string());
        }
        lines.push("  } finally {".to_string());
        lines.push("    const video = page ? page.video() : null;".to_string());
        lines.push("    if (context) {".to_string());
        lines.push(
            "      await context.close().catch((closeError) => emit({ event: 'log', index: null, message: 'Closing context failed: ' + closeError.message }));"
                .to_string(),
        );
        lines.push("    }".to_string());
        lines.push("    if (video) {".to_string());
        lines.push("      try {".to_string());
        lines.push("        emit({ event: 'video', path: await video.path() });".to_string());
        lines.push("      } catch (videoError) {".to_string());
        lines.push(
            "        emit({ event: 'log', index: null, message: 'Video unavailable: ' + videoError.message });"
                .to_string(),
        );
        lines.push("      }".to_string());
        lines.push("    }".to_string());
        lines.push("    if (browser) {".to_string());
        lines.push(
            "      await browser.close().catch((closeError) => emit({ event: 'log', index: null, message: 'Closing browser failed: ' + closeError.message }));"
                .to_string(),
        );
        lines.push("    }".to_string());
        lines.push("    emit({ event: 'done', success });".to_string());
        lines.push("  }".to_string());
        lines.push("})().catch((error) => {".to_string());
        lines.push("  emit({ event: 'error', index: null, message: error.message });".to_string());
        lines.push("  emit({ event: 'done', success: false });".to_string());
        lines.push("  process.exitCode = 1;".to_string());
        lines.push("});".to_string());

        let mut script = lines.join("\n");
        script.push('\n');
        script
    }

    fn context_options(&self, scenario: &Scenario) -> Value {
        let (width, height) = scenario
            .viewport
            .map(|v| (v.width, v.height))
            .unwrap_or((self.viewport_width, self.viewport_height));

        let mut options = Map::new();
        options.insert("viewport".to_string(), json!({ "width": width, "height": height }));
        if scenario.reduced_motion {
            options.insert("reducedMotion".to_string(), json!("reduce"));
        }
        if scenario.record_video {
            options.insert(
                "recordVideo".to_string(),
                json!({
                    "dir": self.video_dir.to_string_lossy(),
                    "size": { "width": width, "height": height },
                }),
            );
        }
        Value::Object(options)
    }

    /// Convert a step to the body of its `step()` callback
    fn step_to_js(&self, scenario: &Scenario, step: &Step, index: usize) -> Vec<String> {
        match step {
            Step::Navigate { url, timeout_ms, wait_until } => {
                let target = scenario.resolve_url(url, &self.default_base_url);
                let mut options = Map::new();
                if let Some(timeout) = timeout_ms {
                    options.insert("timeout".to_string(), json!(timeout));
                }
                if let Some(state) = wait_until {
                    options.insert("waitUntil".to_string(), json!(state.as_str()));
                }
                vec![format!("await page.goto({}, {});", js(&target), Value::Object(options))]
            }
            Step::Reload => vec!["await page.reload();".to_string()],
            Step::BypassLanding { strategy } => {
                let args = json!([self.landing_gate.storage_key, self.landing_gate.value]);
                match strategy {
                    BypassStrategy::Reload => vec![
                        format!(
                            "await page.evaluate(([key, value]) => localStorage.setItem(key, value), {});",
                            args
                        ),
                        "await page.reload();".to_string(),
                    ],
                    BypassStrategy::InitScript => vec![format!(
                        "await context.addInitScript(([key, value]) => localStorage.setItem(key, value), {});",
                        args
                    )],
                }
            }
            Step::Evaluate { script } => vec![format!("await page.evaluate({});", js(script))],
            Step::InitScript { script } => {
                vec![format!("await context.addInitScript({});", json!({ "content": script }))]
            }
            Step::WaitFor { target, state, timeout_ms } => {
                let mut options = Map::new();
                options.insert("state".to_string(), json!(state.as_str()));
                if let Some(timeout) = timeout_ms {
                    options.insert("timeout".to_string(), json!(timeout));
                }
                vec![format!(
                    "await {}.first().waitFor({});",
                    locator_js(target),
                    Value::Object(options)
                )]
            }
            Step::WaitForLoadState { state } => {
                vec![format!("await page.waitForLoadState({});", js(state.as_str()))]
            }
            Step::Click { target, first, optional, timeout_ms, missing_message } => {
                let locator = if *first {
                    format!("{}.first()", locator_js(target))
                } else {
                    locator_js(target)
                };
                let options = match timeout_ms {
                    Some(timeout) => json!({ "timeout": timeout }),
                    None => json!({}),
                };
                if *optional {
                    let message = match missing_message {
                        Some(message) => js(message),
                        None => "error.message".to_string(),
                    };
                    vec![
                        "try {".to_string(),
                        format!("  await {}.click({});", locator, options),
                        "} catch (error) {".to_string(),
                        format!("  return {{ skipped: true, message: {} }};", message),
                        "}".to_string(),
                    ]
                } else {
                    vec![format!("await {}.click({});", locator, options)]
                }
            }
            Step::ClickFirstOf { candidates } => {
                let locators: Vec<String> = candidates.iter().map(locator_js).collect();
                let names: Vec<String> = candidates.iter().map(|c| c.to_string()).collect();
                vec![
                    format!("const candidates = [{}];", locators.join(", ")),
                    format!("const names = {};", json!(names)),
                    "for (let i = 0; i < candidates.length - 1; i++) {".to_string(),
                    "  if ((await candidates[i].count()) > 0) {".to_string(),
                    "    await candidates[i].first().click();".to_string(),
                    "    return { message: 'Found ' + names[i] };".to_string(),
                    "  }".to_string(),
                    format!(
                        "  emit({{ event: 'log', index: {}, message: 'Could not find ' + names[i] + ', trying ' + names[i + 1] + '...' }});",
                        index
                    ),
                    "}".to_string(),
                    "await candidates[candidates.length - 1].click();".to_string(),
                    "return { message: 'Found ' + names[names.length - 1] };".to_string(),
                ]
            }
            Step::Fill { target, value } => {
                vec![format!("await {}.fill({});", locator_js(target), js(value))]
            }
            Step::Sleep { ms } => vec![format!("await page.waitForTimeout({});", ms)],
            Step::Probe { name, target, attributes, capture_text, text_selector, text_label } => {
                let options = json!({
                    "attributes": attributes,
                    "captureText": capture_text,
                    "textSelector": text_selector,
                    "textLabel": text_label,
                });
                vec![format!(
                    "await probe({}, {}, {}, {});",
                    index,
                    js(name),
                    locator_js(target),
                    options
                )]
            }
            Step::Expect { target, visible, attribute, text_contains, timeout_ms } => {
                self.expect_to_js(target, *visible, attribute.as_ref(), text_contains.as_deref(), *timeout_ms)
            }
            Step::Screenshot { name, full_page } => {
                let path = path_js(&self.screenshot_path(name));
                vec![
                    format!(
                        "await page.screenshot({{ path: {}, fullPage: {} }});",
                        path, full_page
                    ),
                    format!(
                        "emit({{ event: 'screenshot', name: {}, path: {}, diagnostic: false }});",
                        js(name),
                        path
                    ),
                ]
            }
            Step::Log { message } => vec![format!(
                "emit({{ event: 'log', index: {}, message: {} }});",
                index,
                js(message)
            )],
        }
    }

    fn expect_to_js(
        &self,
        target: &Target,
        visible: Option<bool>,
        attribute: Option<&AttributeExpectation>,
        text_contains: Option<&str>,
        timeout_ms: Option<u64>,
    ) -> Vec<String> {
        let timeout = timeout_ms.unwrap_or(self.default_timeout_ms);
        let locator = locator_js(target);
        let mut lines = Vec::new();

        if let Some(visible) = visible {
            let state = if visible { "visible" } else { "hidden" };
            lines.push(format!(
                "await {}.first().waitFor({});",
                locator,
                json!({ "state": state, "timeout": timeout })
            ));
        }

        if let Some(attr) = attribute {
            lines.push(format!(
                "await expectAttribute({}, {}, {}, {}, {});",
                locator,
                js(&attr.name),
                json!(attr.value),
                json!(attr.contains),
                timeout
            ));
        }

        if let Some(contains) = text_contains {
            lines.push(format!(
                "await expectText({}, {}, {});",
                locator,
                js(contains),
                timeout
            ));
        }

        lines
    }
}

/// Playwright locator expression for a target
pub fn locator_js(target: &Target) -> String {
    match target {
        Target::Selector(selector) => format!("page.locator({})", js(selector)),
        Target::Role { role, name: Some(name) } => {
            format!("page.getByRole({}, {})", js(role), json!({ "name": name }))
        }
        Target::Role { role, name: None } => format!("page.getByRole({})", js(role)),
        Target::Label { label } => format!("page.getByLabel({})", js(label)),
        Target::Text { text } => format!("page.getByText({})", js(text)),
        Target::Placeholder { placeholder } => format!("page.getByPlaceholder({})", js(placeholder)),
    }
}

/// A JavaScript string literal
fn js(value: &str) -> String {
    Value::String(value.to_string()).to_string()
}

fn path_js(path: &Path) -> String {
    js(&path.to_string_lossy())
}
