use std::{env, path::PathBuf};

use path_abs::PathAbs;
use tracing::warn;

use crate::error::JobError;

pub const DEFAULT_WORKROOT: &str = "/workspace";
pub const DEFAULT_BLENDER_BIN: &str = "blender";
pub const DEFAULT_ZIP_BIN: &str = "zip";
pub const DEFAULT_REGION: &str = "ap-south-1";

pub const BLENDER_BIN_ENV: &str = "RENDERPOD_BLENDER";
pub const ZIP_BIN_ENV: &str = "RENDERPOD_ZIP";
pub const WORKROOT_ENV: &str = "RENDERPOD_WORKROOT";
pub const BLENDER_ARGS_ENV: &str = "RENDERPOD_BLENDER_ARGS";

pub const BUCKET_ENV: &str = "AWS_BUCKET_NAME";
pub const ACCESS_KEY_ENV: &str = "AWS_ACCESS_KEY_ID";
pub const SECRET_KEY_ENV: &str = "AWS_SECRET_ACCESS_KEY";
pub const REGION_ENV: &str = "AWS_REGION";

/// Host-side knobs for one worker process.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    /// Blender binary; a bare name is resolved through `PATH`.
    pub blender:        String,
    /// Archiving binary invoked as `zip -r`.
    pub zip:            String,
    /// Root under which each job gets its own directory.
    pub workroot:       PathBuf,
    /// Extra arguments inserted before the `--` separator, operator-supplied.
    pub blender_args:   Vec<String>,
    /// Leave the job directory on disk after a successful job.
    pub keep_workspace: bool,
}

impl Default for WorkerSettings {
    #[inline]
    fn default() -> Self {
        Self {
            blender:        DEFAULT_BLENDER_BIN.to_owned(),
            zip:            DEFAULT_ZIP_BIN.to_owned(),
            workroot:       PathBuf::from(DEFAULT_WORKROOT),
            blender_args:   Vec::new(),
            keep_workspace: false,
        }
    }
}

impl WorkerSettings {
    /// Settings with `RENDERPOD_*` environment overrides applied.
    #[inline]
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        if let Some(blender) = non_empty_env(BLENDER_BIN_ENV) {
            settings.blender = blender;
        }
        if let Some(zip) = non_empty_env(ZIP_BIN_ENV) {
            settings.zip = zip;
        }
        if let Some(workroot) = non_empty_env(WORKROOT_ENV) {
            settings.workroot = absolutize(PathBuf::from(workroot));
        }
        if let Some(args) = non_empty_env(BLENDER_ARGS_ENV) {
            match shlex::split(&args) {
                Some(args) => settings.blender_args = args,
                None => warn!("ignoring unparsable {BLENDER_ARGS_ENV}: {args}"),
            }
        }
        settings
    }
}

/// Object-storage destination and credentials.
///
/// Resolved from the environment at the start of every job, before any
/// download or render work, so a misconfigured deployment fails in
/// milliseconds instead of after a GPU render.
#[derive(Debug, Clone)]
pub struct StorageSettings {
    pub bucket:            String,
    pub access_key_id:     String,
    pub secret_access_key: String,
    pub region:            String,
}

impl StorageSettings {
    #[inline]
    pub fn from_env() -> Result<Self, JobError> {
        let bucket = non_empty_env(BUCKET_ENV).ok_or(JobError::Configuration)?;
        let access_key_id = non_empty_env(ACCESS_KEY_ENV).ok_or(JobError::Configuration)?;
        let secret_access_key = non_empty_env(SECRET_KEY_ENV).ok_or(JobError::Configuration)?;
        let region = non_empty_env(REGION_ENV).unwrap_or_else(|| DEFAULT_REGION.to_owned());

        Ok(Self {
            bucket,
            access_key_id,
            secret_access_key,
            region,
        })
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn absolutize(path: PathBuf) -> PathBuf {
    PathAbs::new(&path).map_or(path, |abs| abs.as_path().to_path_buf())
}
