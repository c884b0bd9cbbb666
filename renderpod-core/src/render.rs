use std::{
    io,
    path::{Path, PathBuf},
};

use itertools::Itertools;
use tokio::process::Command;
use tracing::{debug, info};

use crate::{
    error::JobError,
    request::FrameRange,
    settings::WorkerSettings,
    workspace::JobWorkspace,
};

/// Parameterization script executed by Blender's embedded interpreter. It is
/// materialized into the job workspace before every invocation; it cannot run
/// outside Blender's Python host, so it ships as an asset rather than Rust.
pub const RENDER_SCRIPT: &str = include_str!("../scripts/render_animation.py");

/// Environment variable through which the invoker hands the per-job
/// workspace root to the parameterization script.
pub const WORKSPACE_ENV: &str = "RENDERPOD_WORKSPACE";

const FRAME_EXTENSION: &str = "png";

/// Frame files produced by a finished render, plus their total size.
#[derive(Debug, Clone)]
pub struct FrameArtifacts {
    pub files:       Vec<PathBuf>,
    pub total_bytes: u64,
}

/// Composes the Blender command line.
///
/// Operator-supplied extra arguments go before the `--` separator; the
/// separator and the frame bounds are attached only when a full override is
/// present, so a scene rendered without one keeps its embedded range.
#[inline]
pub fn compose_render_command(
    settings: &WorkerSettings,
    workspace: &JobWorkspace,
    frames: Option<FrameRange>,
) -> Vec<String> {
    let mut cmd = vec![
        settings.blender.clone(),
        "-b".to_owned(),
        workspace.scene_path().to_string_lossy().into_owned(),
        "--python".to_owned(),
        workspace.script_path().to_string_lossy().into_owned(),
    ];
    cmd.extend(settings.blender_args.iter().cloned());
    if let Some(range) = frames {
        cmd.extend([
            "--".to_owned(),
            "--frame_start".to_owned(),
            range.start.to_string(),
            "--frame_end".to_owned(),
            range.end.to_string(),
        ]);
    }
    cmd
}

/// Runs Blender in background mode and waits for it to exit.
///
/// Both console streams are captured in full; there is no streaming, no
/// timeout and no cancellation hook, matching the platform-owned deadline
/// model. A non-zero exit is terminal and surfaces the raw stderr.
pub async fn render(
    settings: &WorkerSettings,
    workspace: &JobWorkspace,
    frames: Option<FrameRange>,
) -> Result<(), JobError> {
    which::which(&settings.blender).map_err(|e| JobError::Render {
        stderr: format!("blender binary `{}` not found: {e}", settings.blender),
    })?;

    tokio::fs::write(workspace.script_path(), RENDER_SCRIPT).await?;

    let cmd = compose_render_command(settings, workspace, frames);
    info!("running: {}", cmd.join(" "));

    let output = if let [binary, args @ ..] = &*cmd {
        Command::new(binary)
            .args(args)
            .env(WORKSPACE_ENV, workspace.root())
            .current_dir(workspace.root())
            .output()
            .await?
    } else {
        unreachable!()
    };

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    debug!("blender stdout:\n{stdout}");
    debug!("blender stderr:\n{stderr}");

    if !output.status.success() {
        return Err(JobError::Render {
            stderr: stderr.into_owned(),
        });
    }

    info!("blender exited cleanly");
    Ok(())
}

/// Checks the produced frame files against the requested range.
///
/// A clean Blender exit does not by itself mean frames exist; an override
/// must account for every frame of its range and a native-range render must
/// have produced at least one.
pub fn validate_artifacts(
    output_dir: &Path,
    frames: Option<FrameRange>,
) -> Result<FrameArtifacts, JobError> {
    let artifacts = collect_artifacts(output_dir)?;
    let produced = artifacts.files.len();

    let expected = frames.map_or(1, |range| range.frames());
    let complete = match frames {
        Some(_) => produced == expected,
        None => produced >= expected,
    };
    if !complete {
        return Err(JobError::IncompleteRender {
            expected,
            produced,
        });
    }

    debug!(
        "frame artifacts: {}",
        artifacts
            .files
            .iter()
            .map(|path| path.file_name().unwrap_or(path.as_os_str()).to_string_lossy())
            .format(", ")
    );
    Ok(artifacts)
}

/// Walks the output tree for frame images, sorted by path so the first/last
/// frame are at the ends.
fn collect_artifacts(output_dir: &Path) -> io::Result<FrameArtifacts> {
    let mut files = Vec::new();
    let mut total_bytes = 0u64;
    let mut pending = vec![output_dir.to_path_buf()];

    while let Some(dir) = pending.pop() {
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                pending.push(path);
            } else if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case(FRAME_EXTENSION))
            {
                total_bytes += entry.metadata()?.len();
                files.push(path);
            }
        }
    }

    files.sort_unstable();
    Ok(FrameArtifacts {
        files,
        total_bytes,
    })
}

/// Mirrors the parameterization script's base-name sanitization: the output
/// subdirectory and frame prefix use the scene base name with spaces and
/// dots replaced.
#[inline]
pub fn sanitize_scene_base(file_name: &str) -> String {
    let base = file_name.strip_suffix(".blend").unwrap_or(file_name);
    base.replace([' ', '.'], "_")
}
