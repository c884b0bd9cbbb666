use tokio::process::Command;
use tracing::{debug, info};

use crate::{
    error::JobError,
    settings::WorkerSettings,
    workspace::{JobWorkspace, ARCHIVE_FILE, OUTPUT_DIR},
};

/// Composes the archiving command line. Paths are workspace-relative; the
/// subprocess runs with the workspace as its working directory so archive
/// members do not leak absolute host paths.
#[inline]
pub fn compose_zip_command(settings: &WorkerSettings) -> Vec<String> {
    vec![
        settings.zip.clone(),
        "-r".to_owned(),
        ARCHIVE_FILE.to_owned(),
        OUTPUT_DIR.to_owned(),
    ]
}

/// Compresses the whole output tree into the workspace archive in one shot.
pub async fn archive_output(
    settings: &WorkerSettings,
    workspace: &JobWorkspace,
) -> Result<(), JobError> {
    which::which(&settings.zip).map_err(|e| JobError::Archive {
        stderr: format!("zip binary `{}` not found: {e}", settings.zip),
    })?;

    let cmd = compose_zip_command(settings);
    info!("running: {}", cmd.join(" "));

    let output = if let [binary, args @ ..] = &*cmd {
        Command::new(binary)
            .args(args)
            .current_dir(workspace.root())
            .output()
            .await?
    } else {
        unreachable!()
    };

    if !output.status.success() {
        return Err(JobError::Archive {
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    debug!("archived output tree to {}", workspace.archive_path().display());
    Ok(())
}
