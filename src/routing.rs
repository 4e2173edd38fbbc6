//! Deterministic routing mock for the video generation stage.
//!
//! Instead of calling a live service, [`RouteMock`] picks a pre-rendered
//! clip out of a fixed catalog directory by the conversation turn. Unlike
//! the fail-fast stages, [`RouteMock::route`] always hands back a
//! [`RouteResponse`]: errors are part of the payload, never panics or
//! early returns past its boundary.

use crate::stage::{Stage, StageError, StageKind, StageParams};
use async_trait::async_trait;
use clipforge_av::{Artifact, ArtifactKind, ScratchDir};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Placeholder last-frame path returned with every successful route.
const LAST_FRAME_PLACEHOLDER: &str = "outputs/last_frame.png";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteErrorKind {
    /// Turn is negative or past the end of the catalog.
    Range,
    /// Catalog directory missing or holding no clips.
    NotFound,
    /// The selected clip exists but cannot be read.
    Permission,
}

/// Result object for a routing call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RouteResponse {
    Success {
        video_path: PathBuf,
        last_frame_path: PathBuf,
    },
    Error {
        kind: RouteErrorKind,
        message: String,
    },
}

pub struct RouteMock {
    catalog_dir: PathBuf,
}

impl RouteMock {
    pub fn new<P: Into<PathBuf>>(catalog_dir: P) -> Self {
        Self {
            catalog_dir: catalog_dir.into(),
        }
    }

    /// Pick the catalog clip for `turn`.
    pub fn route(&self, turn: i64) -> RouteResponse {
        if turn < 0 {
            return RouteResponse::Error {
                kind: RouteErrorKind::Range,
                message: format!("turn must be non-negative, got {}", turn),
            };
        }

        let videos = match self.catalog() {
            Ok(v) => v,
            Err(response) => return response,
        };

        let index = turn as usize;
        if index >= videos.len() {
            return RouteResponse::Error {
                kind: RouteErrorKind::Range,
                message: format!(
                    "turn {} is out of range, catalog holds {} clip(s)",
                    turn,
                    videos.len()
                ),
            };
        }

        let video = &videos[index];
        if let Err(e) = std::fs::File::open(video) {
            let kind = if e.kind() == std::io::ErrorKind::PermissionDenied {
                RouteErrorKind::Permission
            } else {
                RouteErrorKind::NotFound
            };
            return RouteResponse::Error {
                kind,
                message: format!("cannot read {:?}: {}", video, e),
            };
        }

        RouteResponse::Success {
            video_path: video.clone(),
            last_frame_path: PathBuf::from(LAST_FRAME_PLACEHOLDER),
        }
    }

    /// Catalog of `.mp4` clips ordered by the number embedded in each file
    /// name, so `2.mp4` comes before `10.mp4`.
    fn catalog(&self) -> Result<Vec<PathBuf>, RouteResponse> {
        let entries = std::fs::read_dir(&self.catalog_dir).map_err(|e| RouteResponse::Error {
            kind: RouteErrorKind::NotFound,
            message: format!("catalog directory {:?}: {}", self.catalog_dir, e),
        })?;

        let mut videos: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && p.extension().map(|e| e == "mp4").unwrap_or(false))
            .collect();

        if videos.is_empty() {
            return Err(RouteResponse::Error {
                kind: RouteErrorKind::NotFound,
                message: format!("no .mp4 clips in {:?}", self.catalog_dir),
            });
        }

        videos.sort_by_key(|p| (numeric_suffix(p), p.clone()));
        Ok(videos)
    }
}

/// Digits of the file stem read as one number; stems without digits sort
/// last.
fn numeric_suffix(path: &Path) -> u64 {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let digits: String = stem.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(u64::MAX)
}

#[async_trait]
impl Stage for RouteMock {
    fn kind(&self) -> StageKind {
        StageKind::RouteMock
    }

    /// Adapter for running the mock inside a pipeline: a routing error
    /// payload becomes a stage error for the orchestrator.
    async fn invoke(
        &self,
        _store: &ScratchDir,
        _inputs: &[Artifact],
        params: &StageParams,
    ) -> Result<Artifact, StageError> {
        let turn = params.turn.ok_or(StageError::MissingParam("turn"))?;

        match self.route(turn) {
            RouteResponse::Success { video_path, .. } => Ok(ScratchDir::adopt(
                video_path,
                ArtifactKind::Video,
                self.kind().name(),
            )),
            RouteResponse::Error { kind, message } => Err(StageError::ExternalCall(format!(
                "routing failed ({:?}): {}",
                kind, message
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn catalog_with(names: &[&str]) -> tempfile::TempDir {
        let temp = tempdir().unwrap();
        for name in names {
            std::fs::write(temp.path().join(name), b"mp4").unwrap();
        }
        temp
    }

    #[test]
    fn test_numeric_order_not_lexical() {
        let temp = catalog_with(&[
            "1.mp4", "2.mp4", "3.mp4", "4.mp4", "5.mp4", "6.mp4", "7.mp4", "8.mp4", "9.mp4",
            "10.mp4",
        ]);
        let mock = RouteMock::new(temp.path());

        // Lexical order would put 10.mp4 second; numeric order must not.
        match mock.route(1) {
            RouteResponse::Success { video_path, .. } => {
                assert_eq!(video_path.file_name().unwrap(), "2.mp4");
            }
            other => panic!("unexpected response: {:?}", other),
        }
        match mock.route(9) {
            RouteResponse::Success { video_path, .. } => {
                assert_eq!(video_path.file_name().unwrap(), "10.mp4");
            }
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[test]
    fn test_negative_turn_is_range_error() {
        let temp = catalog_with(&["1.mp4"]);
        let mock = RouteMock::new(temp.path());

        match mock.route(-1) {
            RouteResponse::Error { kind, .. } => assert_eq!(kind, RouteErrorKind::Range),
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[test]
    fn test_turn_equal_to_catalog_size_is_range_error() {
        let temp = catalog_with(&["1.mp4", "2.mp4", "3.mp4"]);
        let mock = RouteMock::new(temp.path());

        match mock.route(3) {
            RouteResponse::Error { kind, .. } => assert_eq!(kind, RouteErrorKind::Range),
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[test]
    fn test_missing_catalog_is_not_found() {
        let mock = RouteMock::new("/no/such/catalog");
        match mock.route(0) {
            RouteResponse::Error { kind, .. } => assert_eq!(kind, RouteErrorKind::NotFound),
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[test]
    fn test_empty_catalog_is_not_found() {
        let temp = tempdir().unwrap();
        std::fs::write(temp.path().join("readme.txt"), b"not a clip").unwrap();
        let mock = RouteMock::new(temp.path());

        match mock.route(0) {
            RouteResponse::Error { kind, .. } => assert_eq!(kind, RouteErrorKind::NotFound),
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[test]
    fn test_success_carries_placeholder_frame() {
        let temp = catalog_with(&["1.mp4"]);
        let mock = RouteMock::new(temp.path());

        match mock.route(0) {
            RouteResponse::Success {
                last_frame_path, ..
            } => assert_eq!(last_frame_path, PathBuf::from("outputs/last_frame.png")),
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_stage_adapter_maps_error_payload() {
        let temp = tempdir().unwrap();
        let scratch = ScratchDir::create(temp.path().join("scratch")).unwrap();
        let mock = RouteMock::new(temp.path().join("missing_catalog"));

        let err = mock
            .invoke(&scratch, &[], &StageParams::default().with_turn(0))
            .await
            .unwrap_err();
        assert!(matches!(err, StageError::ExternalCall(_)));
    }
}
