//! Opaque evidence image persistence. The rest of the system only ever sees
//! the returned asset reference.

use std::path::PathBuf;

use uuid::Uuid;

use crate::shared::utils::sanitize_filename;

pub trait EvidenceStore: Send + Sync {
    /// Persist the image bytes, returning an opaque asset reference.
    fn save(&self, filename: &str, bytes: &[u8]) -> anyhow::Result<String>;
}

pub struct DiskEvidenceStore {
    root: PathBuf,
}

impl DiskEvidenceStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl EvidenceStore for DiskEvidenceStore {
    fn save(&self, filename: &str, bytes: &[u8]) -> anyhow::Result<String> {
        std::fs::create_dir_all(&self.root)?;
        let asset_name = format!("{}_{}", Uuid::new_v4(), sanitize_filename(filename));
        let path = self.root.join(&asset_name);
        std::fs::write(&path, bytes)?;
        Ok(asset_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saved_evidence_is_readable_under_the_returned_ref() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskEvidenceStore::new(dir.path());
        let asset = store.save("broken screen.jpg", b"jpegbytes").unwrap();
        assert!(asset.ends_with("broken_screen.jpg"));
        let stored = std::fs::read(dir.path().join(&asset)).unwrap();
        assert_eq!(stored, b"jpegbytes");
    }
}
