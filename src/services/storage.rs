use std::path::{Path, PathBuf};

use uuid::Uuid;

/// Local-disk store for uploaded images, keyed by job id.
///
/// Files are written as `<job_id><original extension>` under a
/// configurable upload directory.
pub struct ImageStore {
    root: PathBuf,
}

impl ImageStore {
    pub async fn new(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// Persist uploaded bytes for a job, returning the stored path.
    pub async fn save(
        &self,
        job_id: Uuid,
        original_filename: Option<&str>,
        data: &[u8],
    ) -> Result<PathBuf, StorageError> {
        let extension = original_filename
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .unwrap_or("jpg");

        let path = self.root.join(format!("{job_id}.{extension}"));
        tokio::fs::write(&path, data).await?;
        Ok(path)
    }

    pub async fn delete(&self, path: &Path) -> Result<(), StorageError> {
        tokio::fs::remove_file(path).await?;
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("image storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn saves_under_job_id_with_original_extension() {
        let dir = std::env::temp_dir().join(format!("gymregister-store-{}", Uuid::new_v4()));
        let store = ImageStore::new(&dir).await.unwrap();

        let id = Uuid::new_v4();
        let path = store.save(id, Some("rack.png"), b"bytes").await.unwrap();

        assert_eq!(path, dir.join(format!("{id}.png")));
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"bytes");

        store.delete(&path).await.unwrap();
        assert!(!path.exists());
        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn missing_filename_defaults_to_jpg() {
        let dir = std::env::temp_dir().join(format!("gymregister-store-{}", Uuid::new_v4()));
        let store = ImageStore::new(&dir).await.unwrap();

        let id = Uuid::new_v4();
        let path = store.save(id, None, b"x").await.unwrap();
        assert!(path.to_string_lossy().ends_with(&format!("{id}.jpg")));
        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
