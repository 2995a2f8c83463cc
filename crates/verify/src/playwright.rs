//! Playwright process management

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use crate::config::{absolutize, VerifyConfig};
use crate::error::{VerifyError, VerifyResult};
use crate::event::{parse_line, ScriptEvent};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

/// How the Playwright process ended
#[derive(Debug, Clone)]
pub struct ScriptExit {
    /// Process exit status was zero
    pub status_ok: bool,
    /// Exit code, when the process wasn't killed by a signal
    pub code: Option<i32>,
    /// Everything the process wrote to stderr
    pub stderr: String,
}

/// Runs generated programs under Node.js
#[derive(Debug, Clone)]
pub struct PlaywrightHandle {
    node_binary: PathBuf,
    modules_dir: PathBuf,
    timeout: Duration,
}

impl PlaywrightHandle {
    /// Create a new Playwright handle
    pub fn new(config: &VerifyConfig) -> VerifyResult<Self> {
        Ok(Self {
            node_binary: config.node.binary.clone(),
            modules_dir: absolutize(&config.node.modules_dir)?,
            timeout: Duration::from_secs(config.script_timeout_secs),
        })
    }

    /// Override the whole-scenario timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.node_binary);
        cmd.env("NODE_PATH", &self.modules_dir)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        cmd
    }

    /// Check that Node can resolve the `playwright` package
    pub async fn ensure_installed(&self) -> VerifyResult<()> {
        let status = self
            .command()
            .args(["-e", "require.resolve('playwright')"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match status {
            Ok(status) if status.success() => Ok(()),
            _ => Err(VerifyError::PlaywrightNotFound),
        }
    }

    /// Execute a program, handing every event to `on_event` as it arrives
    pub async fn run_script<F>(&self, script: &str, mut on_event: F) -> VerifyResult<ScriptExit>
    where
        F: FnMut(ScriptEvent),
    {
        let temp_dir = tempfile::tempdir()?;
        let script_path = temp_dir.path().join("scenario.js");
        tokio::fs::write(&script_path, script).await?;

        debug!("Running Playwright script: {}", script_path.display());

        let mut child = self
            .command()
            .arg(&script_path)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    VerifyError::PlaywrightNotFound
                } else {
                    VerifyError::Io(e)
                }
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| VerifyError::Playwright("stdout not captured".to_string()))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| VerifyError::Playwright("stderr not captured".to_string()))?;

        let stderr_task = tokio::spawn(async move {
            let mut buf = String::new();
            let _ = stderr.read_to_string(&mut buf).await;
            buf
        });

        let deadline = tokio::time::Instant::now() + self.timeout;
        let mut lines = BufReader::new(stdout).lines();

        loop {
            match tokio::time::timeout_at(deadline, lines.next_line()).await {
                Ok(Ok(Some(line))) => match parse_line(&line) {
                    Some(Ok(event)) => on_event(event),
                    Some(Err(e)) => warn!("Unparseable event line: {} ({})", line, e),
                    None => debug!("[node] {}", line),
                },
                Ok(Ok(None)) => break,
                Ok(Err(e)) => return Err(e.into()),
                Err(_) => {
                    terminate(&mut child).await;
                    return Err(VerifyError::Timeout(format!(
                        "scenario did not finish within {} s",
                        self.timeout.as_secs()
                    )));
                }
            }
        }

        let status = match tokio::time::timeout_at(deadline, child.wait()).await {
            Ok(status) => status?,
            Err(_) => {
                terminate(&mut child).await;
                return Err(VerifyError::Timeout("Playwright process did not exit".to_string()));
            }
        };
        let stderr = stderr_task.await.unwrap_or_default();

        Ok(ScriptExit {
            status_ok: status.success(),
            code: status.code(),
            stderr,
        })
    }
}

/// Stop the Node process, giving Playwright a chance to close the browser
async fn terminate(child: &mut Child) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        if let Some(id) = child.id() {
            if kill(Pid::from_raw(id as i32), Signal::SIGTERM).is_ok()
                && tokio::time::timeout(Duration::from_millis(500), child.wait())
                    .await
                    .is_ok()
            {
                return;
            }
        }
    }

    warn!("Killing Playwright process");
    let _ = child.kill().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_browser_names() {
        assert_eq!(Browser::Chromium.as_str(), "chromium");
        assert_eq!(Browser::Firefox.as_str(), "firefox");
        assert_eq!(Browser::Webkit.as_str(), "webkit");
        assert_eq!(Browser::default(), Browser::Chromium);
    }

    #[tokio::test]
    async fn test_missing_node_binary() {
        let config = VerifyConfig {
            node: crate::config::NodeConfig {
                binary: PathBuf::from("/nonexistent/node-binary"),
                ..Default::default()
            },
            ..Default::default()
        };
        let handle = PlaywrightHandle::new(&config).unwrap();

        assert!(matches!(
            handle.ensure_installed().await,
            Err(VerifyError::PlaywrightNotFound)
        ));
        assert!(matches!(
            handle.run_script("", |_| {}).await,
            Err(VerifyError::PlaywrightNotFound)
        ));
    }
}
