use std::{
    path::Path,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use aws_sdk_s3::{
    config::{BehaviorVersion, Credentials, Region},
    error::DisplayErrorContext,
    presigning::PresigningConfig,
    primitives::ByteStream,
    Client,
};
use tracing::info;

use crate::{error::JobError, settings::StorageSettings};

/// All archives land under this key prefix.
pub const KEY_PREFIX: &str = "blender_renders";

/// Lifetime of the presigned retrieval link.
pub const PRESIGN_EXPIRY: Duration = Duration::from_secs(7200);

/// `<prefix>/<unix-seconds>_renders.zip`. Second resolution is enough to
/// keep sequential jobs apart; per-job workspaces already isolate anything
/// racing within the same second on the local side.
#[inline]
pub fn object_key(prefix: &str, timestamp: u64) -> String {
    format!("{prefix}/{timestamp}_renders.zip")
}

/// Uploads the archive as a single blob and returns a presigned GET URL.
///
/// The presigned variant works regardless of the bucket's ACL; a private
/// bucket still yields a usable link for the expiry window.
pub async fn upload_archive(
    settings: &StorageSettings,
    archive: &Path,
) -> Result<String, JobError> {
    let client = client(settings);
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let key = object_key(KEY_PREFIX, timestamp);

    info!(
        "uploading {} to s3://{}/{}",
        archive.display(),
        settings.bucket,
        key
    );
    let body = ByteStream::from_path(archive).await.map_err(|e| JobError::Upload {
        reason: e.to_string(),
    })?;
    client
        .put_object()
        .bucket(&settings.bucket)
        .key(&key)
        .body(body)
        .send()
        .await
        .map_err(|e| JobError::Upload {
            reason: DisplayErrorContext(e).to_string(),
        })?;

    let presigning = PresigningConfig::expires_in(PRESIGN_EXPIRY).map_err(|e| JobError::Upload {
        reason: e.to_string(),
    })?;
    let presigned = client
        .get_object()
        .bucket(&settings.bucket)
        .key(&key)
        .presigned(presigning)
        .await
        .map_err(|e| JobError::Upload {
            reason: DisplayErrorContext(e).to_string(),
        })?;

    let url = presigned.uri().to_string();
    info!("uploaded, retrieval link expires in {}s", PRESIGN_EXPIRY.as_secs());
    Ok(url)
}

fn client(settings: &StorageSettings) -> Client {
    let credentials = Credentials::new(
        settings.access_key_id.clone(),
        settings.secret_access_key.clone(),
        None,
        None,
        "renderpod-env",
    );
    let config = aws_sdk_s3::Config::builder()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new(settings.region.clone()))
        .credentials_provider(credentials)
        .build();
    Client::from_conf(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_keys_are_prefixed_and_timestamped() {
        let key = object_key(KEY_PREFIX, 1_700_000_000);
        assert_eq!(key, "blender_renders/1700000000_renders.zip");

        let (prefix, rest) = key.split_once('/').unwrap();
        assert_eq!(prefix, "blender_renders");
        let digits = rest.strip_suffix("_renders.zip").unwrap();
        assert!(!digits.is_empty());
        assert!(digits.bytes().all(|b| b.is_ascii_digit()));
    }

    #[test]
    fn sequential_timestamps_never_collide() {
        assert_ne!(object_key(KEY_PREFIX, 10), object_key(KEY_PREFIX, 11));
    }
}
