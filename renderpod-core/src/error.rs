use thiserror::Error;

/// Terminal failure of a render job.
///
/// Every variant aborts the whole job; there is no retry and no compensating
/// cleanup of side effects already produced by earlier stages. The `Display`
/// text of a variant is exactly the `error` field callers see in the response
/// payload.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("Missing blend_url in input")]
    MissingInput,

    #[error("Invalid frame range: frame_start {start} is after frame_end {end}")]
    InvalidFrameRange { start: i64, end: i64 },

    #[error("Failed to download blend file: {reason}")]
    Download { reason: String },

    #[error("Blender render failed")]
    Render { stderr: String },

    #[error("Render produced {produced} frames, expected {expected}")]
    IncompleteRender { expected: usize, produced: usize },

    #[error("Failed to zip outputs")]
    Archive { stderr: String },

    #[error("Missing AWS env vars in serverless endpoint")]
    Configuration,

    #[error("Failed to upload archive to S3: {reason}")]
    Upload { reason: String },

    #[error("Worker I/O failure: {0}")]
    Io(#[from] std::io::Error),
}

impl JobError {
    /// The raw stderr of the failing subprocess, when the failing stage was
    /// one.
    #[inline]
    pub fn captured_stderr(&self) -> Option<&str> {
        match self {
            JobError::Render {
                stderr,
            }
            | JobError::Archive {
                stderr,
            } => Some(stderr),
            _ => None,
        }
    }
}
