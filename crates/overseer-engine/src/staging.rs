//! Working directory setup and target staging.

use ring::digest::{Context, SHA256};
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;
use tracing::{debug, info};

use overseer_core::{BinaryMetadata, PlannedTarget, RunPlan, WorkPaths};

use crate::error::{EngineError, EngineResult};

/// Buffer size for streaming file reads (64 KiB).
const BUF_SIZE: usize = 64 * 1024;

/// Create every directory a run writes to. Idempotent.
pub async fn prepare_directories(paths: &WorkPaths, plan: &RunPlan) -> EngineResult<()> {
    let mut dirs: Vec<PathBuf> = paths.all().iter().map(|p| p.to_path_buf()).collect();
    dirs.push(paths.reports());
    dirs.extend(plan.active().map(|i| i.working_dir.clone()));

    for dir in dirs {
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| EngineError::DirectorySetup { path: dir.clone(), source })?;
        debug!(path = %dir.display(), "directory ready");
    }
    Ok(())
}

/// Copy the target into the binary directory and describe it.
///
/// The caller's file is never moved or modified. Staging a file onto itself
/// only hashes it.
pub async fn stage_target(target: &PlannedTarget) -> EngineResult<BinaryMetadata> {
    let staging_error = |source| EngineError::Staging {
        path: target.source.clone(),
        source,
    };

    if same_file(&target.source, &target.staged).await {
        debug!(path = %target.staged.display(), "target already staged");
    } else {
        tokio::fs::copy(&target.source, &target.staged)
            .await
            .map_err(staging_error)?;
        info!(from = %target.source.display(), to = %target.staged.display(), "staged target");
    }

    let size_bytes = tokio::fs::metadata(&target.staged)
        .await
        .map_err(staging_error)?
        .len();
    let sha256 = sha256_file(&target.staged).await.map_err(staging_error)?;

    Ok(BinaryMetadata {
        name: target.name(),
        original_path: target.source.clone(),
        staged_path: target.staged.clone(),
        size_bytes,
        sha256,
        run: target.run,
        as_admin: target.as_admin,
        has_archive_password: target.has_archive_password,
    })
}

async fn same_file(a: &Path, b: &Path) -> bool {
    match (tokio::fs::canonicalize(a).await, tokio::fs::canonicalize(b).await) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Compute SHA-256 of a file, streaming to avoid loading it all into memory.
///
/// Returns lowercase hex-encoded digest.
pub async fn sha256_file(path: &Path) -> std::io::Result<String> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut context = Context::new(&SHA256);
    let mut buf = vec![0u8; BUF_SIZE];

    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        context.update(&buf[..n]);
    }

    Ok(hex::encode(context.finish().as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const HELLO_SHA256: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    fn target(source: PathBuf, staged: PathBuf) -> PlannedTarget {
        PlannedTarget {
            source,
            staged,
            run: true,
            as_admin: false,
            has_archive_password: true,
        }
    }

    fn empty_plan(target: PlannedTarget) -> RunPlan {
        RunPlan {
            target,
            static_invocations: Vec::new(),
            dynamic_invocations: Vec::new(),
            suppressions: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_stage_copies_and_hashes() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("sample.exe");
        std::fs::write(&source, "hello world").unwrap();
        std::fs::create_dir(dir.path().join("binary")).unwrap();
        let staged = dir.path().join("binary").join("sample.exe");

        let meta = stage_target(&target(source.clone(), staged.clone())).await.unwrap();
        assert!(source.exists(), "original must be preserved");
        assert_eq!(std::fs::read(&staged).unwrap(), b"hello world");
        assert_eq!(meta.sha256, HELLO_SHA256);
        assert_eq!(meta.size_bytes, 11);
        assert_eq!(meta.name, "sample.exe");
        assert!(meta.has_archive_password);
    }

    #[tokio::test]
    async fn test_stage_onto_itself() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("sample.exe");
        std::fs::write(&source, "hello world").unwrap();

        let meta = stage_target(&target(source.clone(), source.clone())).await.unwrap();
        assert_eq!(meta.sha256, HELLO_SHA256);
        assert_eq!(std::fs::read(&source).unwrap(), b"hello world");
    }

    #[tokio::test]
    async fn test_stage_missing_source() {
        let dir = TempDir::new().unwrap();
        let err = stage_target(&target(dir.path().join("gone.exe"), dir.path().join("out.exe")))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Staging { .. }));
    }

    #[tokio::test]
    async fn test_prepare_directories_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let paths = WorkPaths {
            analysis: root.join("analysis"),
            tools: root.join("tools"),
            binary: root.join("binary"),
            utils: root.join("utils"),
            desktop: root.join("desktop"),
        };
        let plan = empty_plan(target(root.join("x"), root.join("binary/x")));

        prepare_directories(&paths, &plan).await.unwrap();
        prepare_directories(&paths, &plan).await.unwrap();
        assert!(paths.reports().is_dir());
        assert!(paths.utils.is_dir());
    }

    #[tokio::test]
    async fn test_prepare_directories_failure() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"").unwrap();
        let paths = WorkPaths {
            analysis: blocker.join("analysis"),
            ..WorkPaths::default()
        };
        let plan = empty_plan(target(blocker.clone(), blocker.clone()));

        let err = prepare_directories(&paths, &plan).await.unwrap_err();
        assert!(matches!(err, EngineError::DirectorySetup { .. }));
    }
}
