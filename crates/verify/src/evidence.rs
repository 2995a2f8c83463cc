//! Screenshot evidence checks

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{VerifyError, VerifyResult};

/// A screenshot that was verified on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub name: String,
    pub path: PathBuf,
    /// Taken by the exception handler rather than a screenshot step
    pub diagnostic: bool,
    pub width: u32,
    pub height: u32,
    pub bytes: u64,
    pub sha256: String,
}

/// Confirm a screenshot exists and decodes as an image
pub fn inspect(name: &str, path: &Path, diagnostic: bool) -> VerifyResult<Evidence> {
    if !path.exists() {
        return Err(VerifyError::Evidence(format!(
            "screenshot '{}' was not written to {}",
            name,
            path.display()
        )));
    }

    let data = std::fs::read(path)?;
    let img = image::load_from_memory(&data).map_err(|e| {
        VerifyError::Evidence(format!("screenshot '{}' is not a valid image: {}", name, e))
    })?;

    let mut hasher = Sha256::new();
    hasher.update(&data);
    let sha256 = hex::encode(hasher.finalize());

    debug!("Verified screenshot {} ({}x{})", path.display(), img.width(), img.height());

    Ok(Evidence {
        name: name.to_string(),
        path: path.to_path_buf(),
        diagnostic,
        width: img.width(),
        height: img.height(),
        bytes: data.len() as u64,
        sha256,
    })
}
