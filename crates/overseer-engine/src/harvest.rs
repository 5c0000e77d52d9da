//! Tool output harvesting.
//!
//! Converts captured stdout or a tool's side file into a [`ToolPayload`].
//! Inline text is bounded by the output cap; artifacts are referenced by path.

use std::path::Path;
use tokio::io::AsyncReadExt;
use tracing::debug;

use overseer_core::{HarvestStrategy, ToolPayload};

use crate::launcher::Captured;

/// Turn a finished tool's output into a result payload.
///
/// Never fails; anything unreadable degrades to text or [`ToolPayload::Empty`].
pub async fn harvest(
    strategy: HarvestStrategy,
    output_path: Option<&Path>,
    stdout: &Captured,
    cap: usize,
) -> ToolPayload {
    match strategy {
        HarvestStrategy::StdoutJson => {
            if !stdout.truncated {
                if let Ok(data) = serde_json::from_slice::<serde_json::Value>(&stdout.bytes) {
                    return ToolPayload::Json { data };
                }
            }
            stdout_text(stdout)
        }
        HarvestStrategy::StdoutText => stdout_text(stdout),
        HarvestStrategy::SideFileText { .. } => match output_path {
            Some(path) => match read_capped(path, cap).await {
                Ok((bytes, truncated)) => ToolPayload::Text {
                    text: String::from_utf8_lossy(&bytes).into_owned(),
                    truncated,
                },
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "side file unreadable");
                    stdout_text(stdout)
                }
            },
            None => stdout_text(stdout),
        },
        HarvestStrategy::SideFileArtifact { .. } => match output_path {
            Some(path) => match tokio::fs::metadata(path).await {
                Ok(meta) if meta.is_file() => ToolPayload::Artifact {
                    path: path.to_path_buf(),
                    size_bytes: meta.len(),
                },
                _ => {
                    debug!(path = %path.display(), "artifact missing");
                    ToolPayload::Empty
                }
            },
            None => ToolPayload::Empty,
        },
        HarvestStrategy::Nothing => ToolPayload::Empty,
    }
}

/// Read at most `cap` bytes of a file; the flag is set when more remained.
async fn read_capped(path: &Path, cap: usize) -> std::io::Result<(Vec<u8>, bool)> {
    let file = tokio::fs::File::open(path).await?;
    let limit = u64::try_from(cap).unwrap_or(u64::MAX).saturating_add(1);
    let mut bytes = Vec::new();
    file.take(limit).read_to_end(&mut bytes).await?;

    let truncated = bytes.len() > cap;
    bytes.truncate(cap);
    Ok((bytes, truncated))
}

fn stdout_text(stdout: &Captured) -> ToolPayload {
    if stdout.is_blank() {
        ToolPayload::Empty
    } else {
        ToolPayload::Text {
            text: stdout.text(),
            truncated: stdout.truncated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn captured(text: &str) -> Captured {
        Captured {
            bytes: text.as_bytes().to_vec(),
            truncated: false,
        }
    }

    #[tokio::test]
    async fn test_json_parsed() {
        let payload = harvest(HarvestStrategy::StdoutJson, None, &captured(r#"{"rules": 3}"#), 1024).await;
        match payload {
            ToolPayload::Json { data } => assert_eq!(data["rules"], 3),
            other => panic!("expected json, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_bad_json_falls_back_to_text() {
        let payload = harvest(HarvestStrategy::StdoutJson, None, &captured("not json"), 1024).await;
        assert_eq!(
            payload,
            ToolPayload::Text {
                text: "not json".into(),
                truncated: false
            }
        );
    }

    #[tokio::test]
    async fn test_blank_stdout_is_empty() {
        let payload = harvest(HarvestStrategy::StdoutText, None, &captured(" \n"), 1024).await;
        assert!(payload.is_empty());
    }

    #[tokio::test]
    async fn test_side_file_text() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("resourcehacker.rc");
        std::fs::write(&path, "ICON 1").unwrap();

        let payload = harvest(
            HarvestStrategy::SideFileText { extension: "rc" },
            Some(&path),
            &Captured::default(),
            3,
        )
        .await;
        assert_eq!(
            payload,
            ToolPayload::Text {
                text: "ICO".into(),
                truncated: true
            }
        );
    }

    #[tokio::test]
    async fn test_side_file_read_stops_at_cap() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("resourcehacker.rc");
        std::fs::write(&path, vec![b'A'; 1024 * 1024]).unwrap();

        let (bytes, truncated) = read_capped(&path, 16).await.unwrap();
        assert_eq!(bytes, vec![b'A'; 16]);
        assert!(truncated);

        let (bytes, truncated) = read_capped(&path, 1024 * 1024).await.unwrap();
        assert_eq!(bytes.len(), 1024 * 1024);
        assert!(!truncated);

        let strategy = HarvestStrategy::SideFileText { extension: "rc" };
        let payload = harvest(strategy, Some(&path), &Captured::default(), 16).await;
        assert_eq!(
            payload,
            ToolPayload::Text {
                text: "A".repeat(16),
                truncated: true
            }
        );
    }

    #[tokio::test]
    async fn test_missing_side_file_falls_back_to_stdout() {
        let dir = TempDir::new().unwrap();
        let strategy = HarvestStrategy::SideFileText { extension: "rc" };
        let payload = harvest(strategy, Some(&dir.path().join("none.rc")), &captured("extracted"), 1024).await;
        assert_eq!(
            payload,
            ToolPayload::Text {
                text: "extracted".into(),
                truncated: false
            }
        );
    }

    #[tokio::test]
    async fn test_artifact_referenced_not_inlined() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("procmon.pml");
        std::fs::write(&path, vec![0u8; 64]).unwrap();

        let strategy = HarvestStrategy::SideFileArtifact { extension: "pml" };
        let payload = harvest(strategy, Some(&path), &Captured::default(), 1024).await;
        assert_eq!(payload, ToolPayload::Artifact { path, size_bytes: 64 });

        let missing = dir.path().join("ttd.run");
        let payload = harvest(strategy, Some(&missing), &Captured::default(), 1024).await;
        assert!(payload.is_empty());
    }
}
