use std::path::PathBuf;

use anyhow::Context as _;
use sha2::Digest as _;

use crate::error::{PhotostripError, PhotostripResult};

/// Encodings accepted by the photo store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoredFormat {
    Png,
    Jpeg,
}

impl StoredFormat {
    pub fn extension(self) -> &'static str {
        match self {
            StoredFormat::Png => "png",
            StoredFormat::Jpeg => "jpg",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            StoredFormat::Png => "image/png",
            StoredFormat::Jpeg => "image/jpeg",
        }
    }
}

/// Receipt for a stored print.
#[derive(Clone, Debug)]
pub struct StoredPhoto {
    /// 16-hex-char content-addressed identifier.
    pub id: String,
    pub path: PathBuf,
    pub format: StoredFormat,
}

/// Write-once-read-many blob store for finished prints.
///
/// Identifiers are content-addressed (truncated SHA-256 of the encoded
/// bytes), so storing the same print twice is idempotent and returns the
/// same id without rewriting the file. Ids are validated on read; nothing
/// resembling a path ever reaches the filesystem layer.
#[derive(Clone, Debug)]
pub struct PhotoStore {
    root: PathBuf,
}

impl PhotoStore {
    /// Open (and create if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> PhotostripResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)
            .with_context(|| format!("create photo store dir '{}'", root.display()))?;
        Ok(Self { root })
    }

    /// Store encoded image bytes, returning the content id.
    pub fn put(&self, bytes: &[u8], format: StoredFormat) -> PhotostripResult<StoredPhoto> {
        if bytes.is_empty() {
            return Err(PhotostripError::validation(
                "refusing to store an empty photo",
            ));
        }
        let id = photo_id(bytes);
        let path = self.root.join(format!("{id}.{}", format.extension()));

        // Write-once: a file with this content id is already the same bytes.
        if !path.exists() {
            std::fs::write(&path, bytes)
                .with_context(|| format!("write photo '{}'", path.display()))?;
        }

        Ok(StoredPhoto { id, path, format })
    }

    /// Read a stored print back by id, trying each known extension.
    pub fn get(&self, id: &str) -> PhotostripResult<Vec<u8>> {
        validate_id(id)?;
        for format in [StoredFormat::Png, StoredFormat::Jpeg] {
            let path = self.root.join(format!("{id}.{}", format.extension()));
            if path.exists() {
                let bytes = std::fs::read(&path)
                    .with_context(|| format!("read photo '{}'", path.display()))?;
                return Ok(bytes);
            }
        }
        Err(PhotostripError::validation(format!(
            "no stored photo with id '{id}'"
        )))
    }
}

/// Content id for a print: first 8 bytes of its SHA-256, hex-encoded.
pub fn photo_id(bytes: &[u8]) -> String {
    let digest = sha2::Sha256::digest(bytes);
    hex::encode(&digest[..8])
}

fn validate_id(id: &str) -> PhotostripResult<()> {
    let ok = id.len() == 16 && id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase());
    if !ok {
        return Err(PhotostripError::validation(format!(
            "malformed photo id '{id}'"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn photo_id_is_stable_and_16_hex() {
        let a = photo_id(b"print bytes");
        let b = photo_id(b"print bytes");
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(photo_id(b"other bytes"), a);
    }

    #[test]
    fn malformed_ids_are_rejected() {
        for bad in ["", "short", "../../etc/passwd", "ABCDEF0123456789", "zzzzzzzzzzzzzzzz"] {
            assert!(validate_id(bad).is_err(), "{bad}");
        }
        assert!(validate_id("0123456789abcdef").is_ok());
    }
}
