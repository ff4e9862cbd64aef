//! Ephemeral artifacts: media files the agent writes to disk for a
//! single turn.
//!
//! The agent hands back a file path; the file is read into memory,
//! deleted, and the bytes are kept as base64 inside the session.  The
//! file is never expected to exist after [`absorb`] returns.
//!
//! Only files inside the scratch directory are ever treated as
//! artifacts.  A path anywhere else is just text.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use base64::Engine as _;
use tokio::fs;
use tracing::{debug, warn};

use crate::trace::TraceStep;

/// Result of absorbing an ephemeral file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Absorbed {
    /// Standard base64 of the file contents.
    pub encoded: String,
    /// Whether the file was removed from disk.
    pub released: bool,
}

/// Whether `path` ends with one of `extensions` (case-insensitive,
/// leading dot optional).
pub fn has_accepted_extension(path: &Path, extensions: &[String]) -> bool {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    extensions
        .iter()
        .any(|accepted| accepted.trim_start_matches('.').eq_ignore_ascii_case(ext))
}

/// Interpret an agent reply as an ephemeral image: the trimmed reply
/// must carry an accepted extension and name an existing file inside
/// `scratch_dir`.  Returns the canonical path.
pub async fn recognize(
    reply: &str,
    extensions: &[String],
    scratch_dir: &Path,
) -> Option<PathBuf> {
    let candidate = reply.trim();
    if candidate.is_empty() || candidate.contains('\n') {
        return None;
    }
    let path = PathBuf::from(candidate);
    if !has_accepted_extension(&path, extensions) {
        return None;
    }
    let Ok(resolved) = fs::canonicalize(&path).await else {
        debug!(path = %path.display(), "reply looks like an image path but no file exists");
        return None;
    };
    let Ok(scratch) = fs::canonicalize(scratch_dir).await else {
        debug!(dir = %scratch_dir.display(), "scratch dir missing, nothing to absorb");
        return None;
    };
    if !resolved.starts_with(&scratch) {
        debug!(path = %resolved.display(), "image path outside scratch dir left alone");
        return None;
    }
    match fs::metadata(&resolved).await {
        Ok(meta) if meta.is_file() => Some(resolved),
        _ => None,
    }
}

/// Delete scratch images named by tool observations in `trace` that
/// were never absorbed.  Returns how many files were removed.
pub async fn release_unclaimed(
    trace: &[TraceStep],
    extensions: &[String],
    scratch_dir: &Path,
) -> usize {
    let mut released = 0;
    for observation in trace.iter().filter_map(|s| s.observation.as_deref()) {
        let Some(path) = recognize(observation, extensions, scratch_dir).await else {
            continue;
        };
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(path = %path.display(), "released unclaimed artifact");
                released += 1;
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to delete unclaimed artifact")
            }
        }
    }
    released
}

/// Read `path` fully, delete it, and return the base64-encoded bytes.
///
/// A failed read is an error and leaves the file alone.  A failed
/// delete is logged and reported through [`Absorbed::released`].
pub async fn absorb(path: &Path) -> anyhow::Result<Absorbed> {
    let bytes = fs::read(path)
        .await
        .with_context(|| format!("read artifact {}", path.display()))?;

    let released = match fs::remove_file(path).await {
        Ok(()) => true,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to delete ephemeral artifact");
            false
        }
    };

    let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
    debug!(path = %path.display(), bytes = bytes.len(), released, "artifact absorbed");
    Ok(Absorbed { encoded, released })
}

/// Decode an inline image back into raw bytes.
pub fn decode(encoded: &str) -> anyhow::Result<Vec<u8>> {
    base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .context("base64 decode failed")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn exts() -> Vec<String> {
        ["png", ".jpg", "jpeg", "WEBP"].iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn extension_matching() {
        assert!(has_accepted_extension(Path::new("/tmp/a.png"), &exts()));
        assert!(has_accepted_extension(Path::new("/tmp/a.JPG"), &exts()));
        assert!(has_accepted_extension(Path::new("a.webp"), &exts()));
        assert!(!has_accepted_extension(Path::new("a.gif"), &exts()));
        assert!(!has_accepted_extension(Path::new("png"), &exts()));
    }

    #[tokio::test]
    async fn recognize_requires_existing_file() {
        let dir = TempDir::new().unwrap();
        let img = dir.path().join("cat.png");
        std::fs::write(&img, b"x").unwrap();
        let scratch = dir.path();

        let reply = format!("  {}\n", img.display());
        assert_eq!(
            recognize(&reply, &exts(), scratch).await,
            Some(std::fs::canonicalize(&img).unwrap())
        );

        let missing = dir.path().join("dog.png");
        assert_eq!(
            recognize(&missing.display().to_string(), &exts(), scratch).await,
            None
        );
        assert_eq!(recognize("The weather is sunny.", &exts(), scratch).await, None);
        assert_eq!(
            recognize(&dir.path().display().to_string(), &exts(), scratch).await,
            None
        );
    }

    #[tokio::test]
    async fn files_outside_scratch_are_not_artifacts() {
        let home = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();
        let photo = home.path().join("wedding_photo.png");
        std::fs::write(&photo, b"keep me").unwrap();

        let reply = photo.display().to_string();
        assert_eq!(recognize(&reply, &exts(), scratch.path()).await, None);

        // Escaping through `..` does not count either.
        let sneaky = scratch
            .path()
            .join("..")
            .join(home.path().file_name().unwrap())
            .join("wedding_photo.png");
        assert_eq!(
            recognize(&sneaky.display().to_string(), &exts(), scratch.path()).await,
            None
        );

        let trace = [TraceStep::action("web_search", reply)];
        assert_eq!(release_unclaimed(&trace, &exts(), scratch.path()).await, 0);
        assert!(photo.exists());
    }

    #[tokio::test]
    async fn unclaimed_scratch_images_are_released() {
        let scratch = TempDir::new().unwrap();
        let img = scratch.path().join("concierge-image-1.png");
        std::fs::write(&img, b"x").unwrap();
        let notes = scratch.path().join("notes.txt");
        std::fs::write(&notes, b"x").unwrap();

        let trace = [
            TraceStep::action("generate_image", img.display().to_string()),
            TraceStep::action("generate_image", notes.display().to_string()),
            TraceStep::final_answer("Here is a description instead."),
        ];
        assert_eq!(release_unclaimed(&trace, &exts(), scratch.path()).await, 1);
        assert!(!img.exists());
        assert!(notes.exists());
    }

    #[tokio::test]
    async fn absorb_encodes_then_deletes() {
        let dir = TempDir::new().unwrap();
        let img = dir.path().join("gen.png");
        let bytes = [0x89u8, b'P', b'N', b'G', 0, 1, 2, 255];
        std::fs::write(&img, bytes).unwrap();

        let out = absorb(&img).await.unwrap();
        assert_eq!(out.encoded, base64::engine::general_purpose::STANDARD.encode(bytes));
        assert!(out.released);
        assert!(!img.exists());
        assert_eq!(decode(&out.encoded).unwrap(), bytes);
    }

    #[tokio::test]
    async fn absorb_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        assert!(absorb(&dir.path().join("nope.png")).await.is_err());
    }
}
