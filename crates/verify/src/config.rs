//! Runner configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{VerifyError, VerifyResult};
use crate::playwright::Browser;

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "verify.toml";

/// Runner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifyConfig {
    /// Base URL used by scenarios that don't set their own
    pub base_url: String,

    /// Directory screenshots, videos and results are written to
    pub output_dir: PathBuf,

    /// Playwright default timeout for actions and waits
    pub default_timeout_ms: u64,

    /// Hard limit for a whole scenario run
    pub script_timeout_secs: u64,

    /// Check the app is reachable before launching a browser
    pub preflight: bool,

    /// Browser configuration
    pub browser: BrowserConfig,

    /// Landing gate bypass
    pub landing_gate: LandingGateConfig,

    /// Node.js toolchain
    pub node: NodeConfig,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            output_dir: PathBuf::from("verification"),
            default_timeout_ms: 30_000,
            script_timeout_secs: 300,
            preflight: true,
            browser: BrowserConfig::default(),
            landing_gate: LandingGateConfig::default(),
            node: NodeConfig::default(),
        }
    }
}

/// Browser configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Browser engine Playwright launches
    pub kind: Browser,

    /// Run without a visible window
    pub headless: bool,

    /// Default viewport width
    pub viewport_width: u32,

    /// Default viewport height
    pub viewport_height: u32,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            kind: Browser::Chromium,
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
        }
    }
}

/// Local storage flag that suppresses the intro screen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LandingGateConfig {
    pub storage_key: String,
    pub value: String,
}

impl Default for LandingGateConfig {
    fn default() -> Self {
        Self {
            storage_key: "dogtale-landing-seen".to_string(),
            value: "true".to_string(),
        }
    }
}

/// Node.js configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Node binary used to run generated scripts
    pub binary: PathBuf,

    /// `node_modules` directory that provides `playwright`
    pub modules_dir: PathBuf,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("node"),
            modules_dir: PathBuf::from("node_modules"),
        }
    }
}

impl VerifyConfig {
    /// Load configuration from file, falling back to defaults when it is absent
    pub fn load(path: &Path) -> VerifyResult<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Reject settings no scenario could run with
    pub fn validate(&self) -> VerifyResult<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(VerifyError::Config(format!(
                "base_url must be an http(s) URL, got '{}'",
                self.base_url
            )));
        }
        if self.script_timeout_secs == 0 {
            return Err(VerifyError::Config("script_timeout_secs must be positive".to_string()));
        }
        if self.browser.viewport_width == 0 || self.browser.viewport_height == 0 {
            return Err(VerifyError::Config("viewport must be non-empty".to_string()));
        }
        if self.landing_gate.storage_key.is_empty() {
            return Err(VerifyError::Config("landing_gate.storage_key is empty".to_string()));
        }
        Ok(())
    }

    /// Directory for session recordings
    pub fn video_dir(&self) -> PathBuf {
        self.output_dir.join("videos")
    }

    /// Path of the JSON run summary
    pub fn results_path(&self) -> PathBuf {
        self.output_dir.join("results.json")
    }

    /// Output directory as an absolute path, so generated scripts are
    /// independent of the Node process's working directory
    pub fn absolute_output_dir(&self) -> VerifyResult<PathBuf> {
        absolutize(&self.output_dir)
    }
}

/// Command-line and environment overrides, applied on top of the file
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub base_url: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub browser: Option<Browser>,
    pub headed: bool,
    pub skip_preflight: bool,
    pub script_timeout_secs: Option<u64>,
}

impl VerifyConfig {
    pub fn apply(&mut self, overrides: ConfigOverrides) {
        if let Some(base_url) = overrides.base_url {
            self.base_url = base_url;
        }
        if let Some(output_dir) = overrides.output_dir {
            self.output_dir = output_dir;
        }
        if let Some(browser) = overrides.browser {
            self.browser.kind = browser;
        }
        if overrides.headed {
            self.browser.headless = false;
        }
        if overrides.skip_preflight {
            self.preflight = false;
        }
        if let Some(secs) = overrides.script_timeout_secs {
            self.script_timeout_secs = secs;
        }
    }
}

pub(crate) fn absolutize(path: &Path) -> VerifyResult<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = VerifyConfig::load(&dir.path().join("verify.toml")).unwrap();
        assert_eq!(config.base_url, "http://localhost:3000");
        assert_eq!(config.landing_gate.storage_key, "dogtale-landing-seen");
        assert!(config.browser.headless);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("verify.toml");
        std::fs::write(
            &path,
            r#"
base_url = "http://localhost:5173"

[browser]
kind = "firefox"
headless = false
"#,
        )
        .unwrap();

        let config = VerifyConfig::load(&path).unwrap();
        assert_eq!(config.base_url, "http://localhost:5173");
        assert_eq!(config.browser.kind, Browser::Firefox);
        assert!(!config.browser.headless);
        assert_eq!(config.browser.viewport_width, 1280);
        assert_eq!(config.output_dir, PathBuf::from("verification"));
        assert_eq!(config.default_timeout_ms, 30_000);
    }

    #[test]
    fn test_bad_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("verify.toml");
        std::fs::write(&path, "base_url = [").unwrap();
        assert!(VerifyConfig::load(&path).is_err());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("verify.toml");
        std::fs::write(&path, "base_url = \"localhost:3000\"").unwrap();
        let err = VerifyConfig::load(&path).unwrap_err();
        assert!(matches!(err, VerifyError::Config(_)));

        let mut config = VerifyConfig::default();
        config.script_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides_win_over_file() {
        let mut config = VerifyConfig::default();
        config.apply(ConfigOverrides {
            base_url: Some("http://localhost:5173".to_string()),
            browser: Some(Browser::Webkit),
            headed: true,
            skip_preflight: true,
            ..Default::default()
        });
        assert_eq!(config.base_url, "http://localhost:5173");
        assert_eq!(config.browser.kind, Browser::Webkit);
        assert!(!config.browser.headless);
        assert!(!config.preflight);
        assert_eq!(config.output_dir, PathBuf::from("verification"));
    }

    #[test]
    fn test_derived_paths() {
        let config = VerifyConfig::default();
        assert_eq!(config.video_dir(), PathBuf::from("verification/videos"));
        assert_eq!(config.results_path(), PathBuf::from("verification/results.json"));
    }
}
