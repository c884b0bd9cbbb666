use std::path::Path;

use tracing::{debug, info};

use crate::error::JobError;

/// Downloads the scene file to `dest`, truncating any prior content.
///
/// Any network fault or non-success status aborts the job; there is no retry
/// and no content validation. A malformed payload only surfaces later, as a
/// render failure.
pub async fn fetch_scene(url: &str, dest: &Path) -> Result<(), JobError> {
    info!("downloading scene file from {url}");

    let response = reqwest::get(url)
        .await
        .and_then(|response| response.error_for_status())
        .map_err(|e| JobError::Download {
            reason: e.to_string(),
        })?;
    let body = response.bytes().await.map_err(|e| JobError::Download {
        reason: e.to_string(),
    })?;

    tokio::fs::write(dest, &body).await.map_err(|e| JobError::Download {
        reason: format!("failed to write {}: {e}", dest.display()),
    })?;
    debug!("wrote {} bytes to {}", body.len(), dest.display());

    Ok(())
}
