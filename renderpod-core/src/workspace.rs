use std::{
    fs,
    io,
    path::{Path, PathBuf},
};

use uuid::Uuid;

pub const SCENE_FILE: &str = "scene.blend";
pub const SCRIPT_FILE: &str = "render_animation.py";
pub const OUTPUT_DIR: &str = "output";
pub const ARCHIVE_FILE: &str = "renders.zip";

/// Scratch directory owned by exactly one job.
///
/// Every job gets `<workroot>/<job-id>/` with a fixed internal layout, so
/// two jobs sharing a filesystem never collide on the scene file, the output
/// tree or the archive.
#[derive(Debug, Clone)]
pub struct JobWorkspace {
    id:   String,
    root: PathBuf,
}

impl JobWorkspace {
    /// Creates the job directory and its `output/` subdirectory.
    #[inline]
    pub fn create(workroot: &Path) -> io::Result<Self> {
        let id = Uuid::new_v4().simple().to_string();
        let root = workroot.join(&id);
        fs::create_dir_all(root.join(OUTPUT_DIR))?;
        Ok(Self {
            id,
            root,
        })
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[inline]
    pub fn scene_path(&self) -> PathBuf {
        self.root.join(SCENE_FILE)
    }

    #[inline]
    pub fn script_path(&self) -> PathBuf {
        self.root.join(SCRIPT_FILE)
    }

    #[inline]
    pub fn output_dir(&self) -> PathBuf {
        self.root.join(OUTPUT_DIR)
    }

    #[inline]
    pub fn archive_path(&self) -> PathBuf {
        self.root.join(ARCHIVE_FILE)
    }

    /// Deletes the whole job directory.
    #[inline]
    pub fn remove(&self) -> io::Result<()> {
        fs::remove_dir_all(&self.root)
    }
}
