use serde::{Serialize, Serializer};

use crate::{error::JobError, request::FrameRange};

/// One bound of the frame range echoed back to the caller: the resolved
/// integer, or the literal `"auto"` sentinel when the scene's own range was
/// used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameBound {
    Auto,
    At(i64),
}

impl Serialize for FrameBound {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FrameBound::Auto => serializer.serialize_str("auto"),
            FrameBound::At(frame) => serializer.serialize_i64(*frame),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportedFrames {
    pub start: FrameBound,
    pub end:   FrameBound,
}

impl From<Option<FrameRange>> for ReportedFrames {
    #[inline]
    fn from(range: Option<FrameRange>) -> Self {
        match range {
            Some(range) => Self {
                start: FrameBound::At(range.start),
                end:   FrameBound::At(range.end),
            },
            None => Self {
                start: FrameBound::Auto,
                end:   FrameBound::Auto,
            },
        }
    }
}

/// Outbound payload; always produced, success or not. A failure is reported
/// as a flat error object, never a partial success.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum JobResponse {
    Success {
        status: &'static str,
        frames: ReportedFrames,
        s3_url: String,
    },
    Failure {
        error:  String,
        #[serde(skip_serializing_if = "Option::is_none")]
        stderr: Option<String>,
    },
}

impl JobResponse {
    #[inline]
    pub fn success(frames: Option<FrameRange>, s3_url: String) -> Self {
        JobResponse::Success {
            status: "ok",
            frames: frames.into(),
            s3_url,
        }
    }

    #[inline]
    pub fn is_error(&self) -> bool {
        matches!(self, JobResponse::Failure { .. })
    }
}

impl From<JobError> for JobResponse {
    #[inline]
    fn from(error: JobError) -> Self {
        JobResponse::Failure {
            stderr: error.captured_stderr().map(str::to_owned),
            error:  error.to_string(),
        }
    }
}
