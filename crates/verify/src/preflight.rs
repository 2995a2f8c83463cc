//! Reachability check for the app under test
//!
//! The app is expected to be running already; nothing here starts it.

use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{VerifyError, VerifyResult};

/// Single-shot HTTP check against the app's base URL
#[derive(Debug, Clone)]
pub struct Preflight {
    client: reqwest::Client,
}

impl Preflight {
    pub fn new(timeout: Duration) -> VerifyResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// GET the URL once; any HTTP response counts as reachable
    pub async fn check(&self, url: &str) -> VerifyResult<u16> {
        debug!("Preflight GET {}", url);

        match self.client.get(url).send().await {
            Ok(resp) => {
                let status = resp.status();
                if !status.is_success() {
                    warn!("{} answered with {}", url, status);
                }
                Ok(status.as_u16())
            }
            Err(e) => Err(VerifyError::AppUnreachable {
                url: url.to_string(),
                reason: if e.is_connect() {
                    "connection refused; is the dev server running?".to_string()
                } else if e.is_timeout() {
                    "timed out".to_string()
                } else {
                    e.to_string()
                },
            }),
        }
    }
}
