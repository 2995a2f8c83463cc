//! Structured events emitted by generated Playwright programs
//!
//! Each event is a single stdout line: [`EVENT_PREFIX`] followed by a JSON
//! object tagged by `event`. Anything else on stdout is ordinary program
//! output.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::VerifyResult;

pub const EVENT_PREFIX: &str = "@@verify ";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScriptEvent {
    /// A step finished
    Step {
        index: usize,
        name: String,
        status: StepStatus,
        duration_ms: u64,
        #[serde(default)]
        detail: Option<String>,
    },

    /// Result of a non-fatal existence check
    Probe {
        index: usize,
        name: String,
        found: bool,
        count: usize,
        /// `(name, value)` pairs in the order they were requested
        #[serde(default)]
        attributes: Vec<(String, Option<String>)>,
        #[serde(default)]
        text: Option<String>,
        #[serde(default)]
        text_label: Option<String>,
        #[serde(default)]
        error: Option<String>,
    },

    /// Free-form progress message
    Log {
        #[serde(default)]
        index: Option<usize>,
        message: String,
    },

    /// A screenshot was written
    Screenshot {
        name: String,
        path: PathBuf,
        #[serde(default)]
        diagnostic: bool,
    },

    /// The session recording was flushed
    Video { path: PathBuf },

    /// The scenario raised
    Error {
        #[serde(default)]
        index: Option<usize>,
        message: String,
    },

    /// The program is about to exit
    Done { success: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Ok,
    Skipped,
    Failed,
}

/// Parse one stdout line; `None` when the line isn't an event
pub fn parse_line(line: &str) -> Option<VerifyResult<ScriptEvent>> {
    let payload = line.trim_end().strip_prefix(EVENT_PREFIX)?;
    Some(serde_json::from_str(payload).map_err(Into::into))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_output_is_not_an_event() {
        assert!(parse_line("Navigating to app...").is_none());
        assert!(parse_line("").is_none());
    }

    #[test]
    fn test_parse_probe_event() {
        let line = r#"@@verify {"event":"probe","index":8,"name":"Chat history container","found":true,"count":1,"attributes":[["role","log"],["aria-live",null]],"text":null,"text_label":null}"#;
        let event = parse_line(line).unwrap().unwrap();
        match event {
            ScriptEvent::Probe { index, found, attributes, error, .. } => {
                assert_eq!(index, 8);
                assert!(found);
                assert_eq!(
                    attributes,
                    vec![
                        ("role".to_string(), Some("log".to_string())),
                        ("aria-live".to_string(), None),
                    ]
                );
                assert!(error.is_none());
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_parse_step_event_with_trailing_newline() {
        let line = "@@verify {\"event\":\"step\",\"index\":3,\"name\":\"click:x\",\"status\":\"skipped\",\"duration_ms\":12,\"detail\":\"not there\"}\r\n";
        let event = parse_line(line).unwrap().unwrap();
        assert_eq!(
            event,
            ScriptEvent::Step {
                index: 3,
                name: "click:x".to_string(),
                status: StepStatus::Skipped,
                duration_ms: 12,
                detail: Some("not there".to_string()),
            }
        );
    }

    #[test]
    fn test_parse_error_without_index() {
        let line = r#"@@verify {"event":"error","index":null,"message":"browserType.launch: Executable doesn't exist"}"#;
        let event = parse_line(line).unwrap().unwrap();
        assert!(matches!(event, ScriptEvent::Error { index: None, .. }));
    }

    #[test]
    fn test_malformed_event_is_an_error() {
        let result = parse_line("@@verify {\"event\":\"probe\"").unwrap();
        assert!(result.is_err());
    }
}
