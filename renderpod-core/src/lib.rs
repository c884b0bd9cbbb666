//! Job lifecycle orchestration for headless Blender animation renders.
//!
//! The rendering itself is opaque third-party work done by the Blender
//! binary; this crate owns everything around it: resolving the inbound job
//! request, downloading the scene file, composing and running the render
//! invocation, validating and archiving the produced frames, uploading the
//! archive to object storage and shaping the response.
//!
//! The pipeline is strictly linear and fail-fast. One job, one workspace,
//! one pass:
//!
//! ```no_run
//! use renderpod_core::{JobContext, JobRequest, WorkerSettings};
//!
//! # async fn example() -> Result<(), serde_json::Error> {
//! let request: JobRequest =
//!     serde_json::from_str(r#"{"input": {"blend_url": "https://x/scene.blend"}}"#)?;
//! let response = JobContext::new(WorkerSettings::from_env()).run(&request).await;
//! println!("{}", serde_json::to_string(&response)?);
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod context;
pub mod error;
pub mod fetch;
pub mod render;
pub mod request;
pub mod response;
pub mod settings;
pub mod upload;
pub mod workspace;

pub use crate::{
    context::JobContext,
    error::JobError,
    request::{FrameRange, JobInput, JobRequest},
    response::JobResponse,
    settings::{StorageSettings, WorkerSettings},
    workspace::JobWorkspace,
};
