//! Scratch directory and artifact management for pipeline runs.

use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// What a stage output contains, conveyed by file extension on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Image,
    Video,
    Audio,
}

impl ArtifactKind {
    /// Default file extension for this kind.
    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactKind::Image => "png",
            ArtifactKind::Video => "mp4",
            ArtifactKind::Audio => "mp3",
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ArtifactKind::Image => "image",
            ArtifactKind::Video => "video",
            ArtifactKind::Audio => "audio",
        };
        f.write_str(s)
    }
}

/// An immutable reference to a file produced by one stage and consumed by
/// later ones. Created by exactly one stage, never mutated afterwards, and
/// deleted only through [`ScratchDir::cleanup`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    path: PathBuf,
    kind: ArtifactKind,
    produced_by: String,
}

impl Artifact {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }

    /// Identifier of the stage that produced this artifact.
    pub fn produced_by(&self) -> &str {
        &self.produced_by
    }
}

/// Scratch directory owned by one pipeline run.
///
/// All intermediate stage outputs live under one root for the lifetime of a
/// run, and this store is the only component allowed to hand out paths for
/// them. Concurrent runs must use distinct roots; nothing here locks.
///
/// # Example
///
/// ```no_run
/// use clipforge_av::{ArtifactKind, ScratchDir};
///
/// let scratch = ScratchDir::create("./tmp")?;
/// let frame = scratch.allocate(ArtifactKind::Image, "frame.png", "text_to_image")?;
/// std::fs::write(frame.path(), b"...")?;
/// # Ok::<(), clipforge_av::Error>(())
/// ```
pub struct ScratchDir {
    root: PathBuf,
}

impl ScratchDir {
    /// Create a scratch directory at `root`, making the directory if needed.
    pub fn create<P: Into<PathBuf>>(root: P) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)
            .map_err(|e| Error::Scratch(format!("failed to create {:?}: {}", root, e)))?;
        Ok(Self { root })
    }

    /// Get the scratch root path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Reserve a collision-free output path under the scratch root.
    ///
    /// If `suggested_name` is already taken, a numeric suffix is inserted
    /// before the extension (`bgm.mp3` becomes `bgm_1.mp3` and so on). The
    /// file itself is not created; the producing stage writes it.
    pub fn allocate(
        &self,
        kind: ArtifactKind,
        suggested_name: &str,
        produced_by: &str,
    ) -> Result<Artifact> {
        if suggested_name.is_empty()
            || suggested_name == "."
            || suggested_name == ".."
            || suggested_name.contains(std::path::MAIN_SEPARATOR)
        {
            return Err(Error::InvalidInput(format!(
                "artifact name must be a bare file name, got {:?}",
                suggested_name
            )));
        }

        let candidate = self.root.join(suggested_name);
        let path = if candidate.exists() {
            let stem = candidate
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let ext = candidate
                .extension()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| kind.extension().to_string());

            let mut n = 1u32;
            loop {
                let alternate = self.root.join(format!("{}_{}.{}", stem, n, ext));
                if !alternate.exists() {
                    break alternate;
                }
                n += 1;
            }
        } else {
            candidate
        };

        Ok(Artifact {
            path,
            kind,
            produced_by: produced_by.to_string(),
        })
    }

    /// Wrap a pre-existing file the run does not own (user-supplied source
    /// media, mock catalog entries) as an artifact.
    pub fn adopt<P: Into<PathBuf>>(path: P, kind: ArtifactKind, produced_by: &str) -> Artifact {
        Artifact {
            path: path.into(),
            kind,
            produced_by: produced_by.to_string(),
        }
    }

    /// Best-effort delete of an artifact's file. A missing file is not an
    /// error; anything else is logged and swallowed.
    pub fn cleanup(&self, artifact: &Artifact) {
        match std::fs::remove_file(artifact.path()) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!("failed to remove {:?}: {}", artifact.path(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_allocate_under_root() {
        let temp = tempdir().unwrap();
        let scratch = ScratchDir::create(temp.path().join("run")).unwrap();

        let artifact = scratch
            .allocate(ArtifactKind::Video, "anim.mp4", "image_to_video")
            .unwrap();
        assert!(artifact.path().starts_with(scratch.root()));
        assert_eq!(artifact.path().file_name().unwrap(), "anim.mp4");
        assert_eq!(artifact.kind(), ArtifactKind::Video);
        assert_eq!(artifact.produced_by(), "image_to_video");
    }

    #[test]
    fn test_allocate_avoids_collisions() {
        let temp = tempdir().unwrap();
        let scratch = ScratchDir::create(temp.path()).unwrap();

        let first = scratch
            .allocate(ArtifactKind::Audio, "bgm.mp3", "video_to_music")
            .unwrap();
        std::fs::write(first.path(), b"x").unwrap();

        let second = scratch
            .allocate(ArtifactKind::Audio, "bgm.mp3", "video_to_music")
            .unwrap();
        assert_eq!(second.path().file_name().unwrap(), "bgm_1.mp3");
        std::fs::write(second.path(), b"y").unwrap();

        let third = scratch
            .allocate(ArtifactKind::Audio, "bgm.mp3", "video_to_music")
            .unwrap();
        assert_eq!(third.path().file_name().unwrap(), "bgm_2.mp3");
    }

    #[test]
    fn test_allocate_rejects_paths() {
        let temp = tempdir().unwrap();
        let scratch = ScratchDir::create(temp.path()).unwrap();

        assert!(scratch
            .allocate(ArtifactKind::Image, "sub/frame.png", "text_to_image")
            .is_err());
        assert!(scratch
            .allocate(ArtifactKind::Image, "", "text_to_image")
            .is_err());
        // Dot names would resolve outside the scratch root.
        assert!(scratch
            .allocate(ArtifactKind::Image, ".", "text_to_image")
            .is_err());
        assert!(scratch
            .allocate(ArtifactKind::Image, "..", "text_to_image")
            .is_err());
    }

    #[test]
    fn test_cleanup_swallows_missing() {
        let temp = tempdir().unwrap();
        let scratch = ScratchDir::create(temp.path()).unwrap();

        let artifact = scratch
            .allocate(ArtifactKind::Image, "frame.png", "text_to_image")
            .unwrap();
        // Never written; cleanup must not panic or error.
        scratch.cleanup(&artifact);

        std::fs::write(artifact.path(), b"data").unwrap();
        scratch.cleanup(&artifact);
        assert!(!artifact.path().exists());
    }
}
