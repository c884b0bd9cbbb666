use serde::Deserialize;

use crate::error::JobError;

/// Inbound job schema: `{"input": {"blend_url": ..., "frame_start": ...,
/// "frame_end": ...}}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobRequest {
    #[serde(default)]
    pub input: JobInput,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobInput {
    #[serde(default)]
    pub blend_url:   Option<String>,
    #[serde(default)]
    pub frame_start: Option<i64>,
    #[serde(default)]
    pub frame_end:   Option<i64>,
}

/// Inclusive frame interval overriding the scene's native range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRange {
    pub start: i64,
    pub end:   i64,
}

impl FrameRange {
    /// Number of frames the render is expected to produce.
    #[inline]
    pub fn frames(&self) -> usize {
        (self.end - self.start + 1) as usize
    }
}

/// A validated request, ready to drive the pipeline.
#[derive(Debug, Clone)]
pub struct ResolvedJob {
    pub blend_url: String,
    /// `None` defers to the frame range embedded in the scene file.
    pub frames:    Option<FrameRange>,
}

impl JobRequest {
    /// Validates the request and resolves the frame-range override.
    ///
    /// The override is all-or-nothing: it exists only when both bounds are
    /// present. A request carrying a single bound renders with the scene's
    /// own range, exactly as if neither were given.
    #[inline]
    pub fn resolve(&self) -> Result<ResolvedJob, JobError> {
        let blend_url = self
            .input
            .blend_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or(JobError::MissingInput)?;

        let frames = match (self.input.frame_start, self.input.frame_end) {
            (Some(start), Some(end)) => {
                if start > end {
                    return Err(JobError::InvalidFrameRange {
                        start,
                        end,
                    });
                }
                Some(FrameRange {
                    start,
                    end,
                })
            },
            _ => None,
        };

        Ok(ResolvedJob {
            blend_url: blend_url.to_owned(),
            frames,
        })
    }
}
