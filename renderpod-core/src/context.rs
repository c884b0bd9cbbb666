use std::time::Instant;

use tracing::{error, info, warn};

use crate::{
    archive,
    error::JobError,
    fetch,
    render,
    request::{JobRequest, ResolvedJob},
    response::JobResponse,
    settings::{StorageSettings, WorkerSettings},
    upload,
    workspace::JobWorkspace,
};

/// Drives one job through the pipeline: resolve input, validate storage
/// settings, fetch the scene, render, validate artifacts, archive, upload.
///
/// Strictly linear; the first failing stage terminates the job and becomes
/// the response. Side effects already produced by earlier stages are left
/// in place.
#[derive(Debug)]
pub struct JobContext {
    pub settings: WorkerSettings,
}

impl JobContext {
    #[inline]
    pub fn new(settings: WorkerSettings) -> Self {
        Self {
            settings,
        }
    }

    /// Runs one job to completion. Never fails at this level: any terminal
    /// error is folded into the flat error payload the caller expects.
    #[inline]
    pub async fn run(&self, request: &JobRequest) -> JobResponse {
        match self.execute(request).await {
            Ok(response) => response,
            Err(e) => {
                error!("job failed: {e}");
                JobResponse::from(e)
            },
        }
    }

    async fn execute(&self, request: &JobRequest) -> Result<JobResponse, JobError> {
        let started = Instant::now();

        let job = request.resolve()?;
        // Storage settings are checked up front so a misconfigured
        // deployment fails before any GPU time is spent.
        let storage = StorageSettings::from_env()?;

        let workspace = JobWorkspace::create(&self.settings.workroot)?;
        info!(job_id = workspace.id(), "job started for {}", job.blend_url);
        match job.frames {
            Some(range) => info!("frame override: {}..{}", range.start, range.end),
            None => info!("no frame override, using the scene's own range"),
        }

        let s3_url = self.pipeline(&job, &storage, &workspace).await?;

        if self.settings.keep_workspace {
            info!("keeping workspace {}", workspace.root().display());
        } else if let Err(e) = workspace.remove() {
            warn!("failed to remove workspace {}: {e}", workspace.root().display());
        }

        info!("job finished in {:.1}s", started.elapsed().as_secs_f64());
        Ok(JobResponse::success(job.frames, s3_url))
    }

    async fn pipeline(
        &self,
        job: &ResolvedJob,
        storage: &StorageSettings,
        workspace: &JobWorkspace,
    ) -> Result<String, JobError> {
        fetch::fetch_scene(&job.blend_url, &workspace.scene_path()).await?;
        render::render(&self.settings, workspace, job.frames).await?;
        let artifacts = render::validate_artifacts(&workspace.output_dir(), job.frames)?;
        info!(
            "rendered {} frames ({} bytes)",
            artifacts.files.len(),
            artifacts.total_bytes
        );
        archive::archive_output(&self.settings, workspace).await?;
        upload::upload_archive(storage, &workspace.archive_path()).await
    }
}

#[cfg(test)]
mod tests {
    use std::env;

    use serial_test::serial;
    use tempfile::TempDir;

    use super::*;
    use crate::settings::{ACCESS_KEY_ENV, BUCKET_ENV, SECRET_KEY_ENV};

    fn request(json: &str) -> JobRequest {
        serde_json::from_str(json).unwrap()
    }

    fn set_storage_env() {
        env::set_var(BUCKET_ENV, "render-artifacts");
        env::set_var(ACCESS_KEY_ENV, "AKIATEST");
        env::set_var(SECRET_KEY_ENV, "secret");
    }

    fn clear_storage_env() {
        for key in [BUCKET_ENV, ACCESS_KEY_ENV, SECRET_KEY_ENV] {
            env::remove_var(key);
        }
    }

    fn test_context(workroot: &TempDir) -> JobContext {
        JobContext::new(WorkerSettings {
            workroot: workroot.path().to_path_buf(),
            ..WorkerSettings::default()
        })
    }

    /// Serves exactly one HTTP response on a local port, then closes.
    async fn one_shot_http(status_line: &'static str, body: &'static [u8]) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await;
            let head = format!(
                "HTTP/1.1 {status_line}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(body).await.unwrap();
        });
        format!("http://{addr}/scene.blend")
    }

    #[tokio::test]
    #[serial]
    async fn missing_blend_url_short_circuits() {
        clear_storage_env();
        let workroot = TempDir::new().unwrap();
        let response = test_context(&workroot).run(&request("{}")).await;

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["error"], "Missing blend_url in input");
        // resolution failed before the workspace stage, so nothing was created
        assert_eq!(std::fs::read_dir(workroot.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    #[serial]
    async fn missing_credentials_fail_before_any_download() {
        clear_storage_env();
        let workroot = TempDir::new().unwrap();
        // the URL is unreachable; reaching it would produce a download error
        let response = test_context(&workroot)
            .run(&request(
                r#"{"input": {"blend_url": "http://127.0.0.1:1/scene.blend"}}"#,
            ))
            .await;

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["error"], "Missing AWS env vars in serverless endpoint");
    }

    #[tokio::test]
    #[serial]
    async fn http_failure_is_a_download_error() {
        set_storage_env();
        let workroot = TempDir::new().unwrap();
        let url = one_shot_http("404 Not Found", b"missing").await;
        let response = test_context(&workroot)
            .run(&request(&format!(r#"{{"input": {{"blend_url": "{url}"}}}}"#)))
            .await;

        let json = serde_json::to_value(&response).unwrap();
        let error = json["error"].as_str().unwrap();
        assert!(error.starts_with("Failed to download blend file"), "{error}");
        clear_storage_env();
    }

    #[cfg(unix)]
    mod staged {
        use std::{fs, os::unix::fs::PermissionsExt, path::Path};

        use super::*;

        fn stub_binary(dir: &Path, name: &str, script: &str) -> String {
            let path = dir.join(name);
            fs::write(&path, script).unwrap();
            let mut permissions = fs::metadata(&path).unwrap().permissions();
            permissions.set_mode(0o755);
            fs::set_permissions(&path, permissions).unwrap();
            path.to_string_lossy().into_owned()
        }

        /// Render crash: the response carries the captured stderr and the
        /// archiver never runs.
        #[tokio::test]
        #[serial]
        async fn failed_render_skips_archive_and_upload() {
            set_storage_env();
            let workroot = TempDir::new().unwrap();
            let bin_dir = TempDir::new().unwrap();
            let url = one_shot_http("200 OK", b"BLENDER-v404").await;

            let context = JobContext::new(WorkerSettings {
                workroot: workroot.path().to_path_buf(),
                blender:  stub_binary(
                    bin_dir.path(),
                    "blender",
                    "#!/bin/sh\necho 'CUDA device not found' >&2\nexit 1\n",
                ),
                zip:      stub_binary(
                    bin_dir.path(),
                    "zip",
                    "#!/bin/sh\n: > \"$RENDERPOD_ZIP_MARKER\"\n",
                ),
                ..WorkerSettings::default()
            });
            let marker = bin_dir.path().join("zip-ran");
            env::set_var("RENDERPOD_ZIP_MARKER", &marker);

            let response = context
                .run(&request(&format!(r#"{{"input": {{"blend_url": "{url}"}}}}"#)))
                .await;

            let json = serde_json::to_value(&response).unwrap();
            assert_eq!(json["error"], "Blender render failed");
            assert_eq!(json["stderr"].as_str().unwrap().trim(), "CUDA device not found");
            assert!(!marker.exists(), "archiver ran after a failed render");

            env::remove_var("RENDERPOD_ZIP_MARKER");
            clear_storage_env();
        }

        /// Zero frames with a clean exit is an incomplete render, not a
        /// success; the archiver never runs.
        #[tokio::test]
        #[serial]
        async fn empty_render_is_incomplete() {
            set_storage_env();
            let workroot = TempDir::new().unwrap();
            let bin_dir = TempDir::new().unwrap();
            let url = one_shot_http("200 OK", b"BLENDER-v404").await;

            let context = JobContext::new(WorkerSettings {
                workroot: workroot.path().to_path_buf(),
                blender:  stub_binary(bin_dir.path(), "blender", "#!/bin/sh\nexit 0\n"),
                ..WorkerSettings::default()
            });

            let response = context
                .run(&request(&format!(
                    r#"{{"input": {{"blend_url": "{url}", "frame_start": 1, "frame_end": 3}}}}"#
                )))
                .await;

            let json = serde_json::to_value(&response).unwrap();
            assert_eq!(json["error"], "Render produced 0 frames, expected 3");
            clear_storage_env();
        }
    }
}
