use super::{ImageSource, SourceError, default_extensions, has_supported_extension};
use async_trait::async_trait;
use bon::bon;
use common_types::ImageRecord;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Images in a local folder and its sub-folders, ordered by path.
#[derive(Debug, Clone)]
pub struct LocalFolderSource {
    root: PathBuf,
    extensions: Vec<String>,
}

#[bon]
impl LocalFolderSource {
    #[builder(start_fn = with_root)]
    #[must_use]
    pub fn new(#[builder(start_fn, into)] root: PathBuf, extensions: Option<Vec<String>>) -> Self {
        Self {
            root,
            extensions: extensions.unwrap_or_else(default_extensions),
        }
    }
}

impl LocalFolderSource {
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Supported image paths under the root, in walk order.
    pub fn image_paths(&self) -> Result<Vec<PathBuf>, SourceError> {
        if !self.root.is_dir() {
            return Err(SourceError::FolderNotFound(self.root.clone()));
        }

        let mut paths = Vec::new();
        for entry in WalkDir::new(&self.root).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!("Skipping inaccessible entry: {}", e);
                    continue;
                }
            };
            if entry.file_type().is_file()
                && has_supported_extension(&entry.file_name().to_string_lossy(), &self.extensions)
            {
                paths.push(entry.into_path());
            }
        }
        Ok(paths)
    }

    #[must_use]
    pub fn is_supported(&self, path: &Path) -> bool {
        path.file_name()
            .is_some_and(|name| has_supported_extension(&name.to_string_lossy(), &self.extensions))
    }
}

/// Reads `path` into an [`ImageRecord`] named after its file name.
pub async fn read_image_file(path: &Path) -> std::io::Result<ImageRecord> {
    let bytes = tokio::fs::read(path).await?;
    let name = path
        .file_name()
        .map_or_else(|| path.to_string_lossy(), |n| n.to_string_lossy())
        .into_owned();
    Ok(ImageRecord::new(name, path.to_string_lossy(), bytes))
}

#[async_trait]
impl ImageSource for LocalFolderSource {
    fn describe(&self) -> String {
        self.root.display().to_string()
    }

    async fn list_images(&self, max_count: Option<usize>) -> Result<Vec<ImageRecord>, SourceError> {
        let paths = self.image_paths()?;
        let limit = max_count.unwrap_or(paths.len());
        info!(
            "📂 Found {} images in {}",
            paths.len(),
            self.root.display()
        );

        let mut images = Vec::with_capacity(limit.min(paths.len()));
        for path in paths {
            if images.len() >= limit {
                break;
            }
            match read_image_file(&path).await {
                Ok(image) => images.push(image),
                Err(e) => warn!("Could not read {}: {}", path.display(), e),
            }
        }
        Ok(images)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn fixture() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("2024")).unwrap();
        fs::write(dir.path().join("b.jpg"), b"b").unwrap();
        fs::write(dir.path().join("a.PNG"), b"a").unwrap();
        fs::write(dir.path().join("notes.txt"), b"text").unwrap();
        fs::write(dir.path().join("2024").join("c.webp"), b"c").unwrap();
        dir
    }

    #[tokio::test]
    async fn lists_supported_images_recursively_in_order() {
        let dir = fixture();
        let source = LocalFolderSource::with_root(dir.path()).build();

        let images = source.list_images(None).await.unwrap();

        let names: Vec<&str> = images.iter().map(|i| i.name.as_str()).collect();
        // Depth first, siblings sorted by name: the "2024" folder comes before "a.PNG".
        assert_eq!(names, vec!["c.webp", "a.PNG", "b.jpg"]);
        let a = images.iter().find(|i| i.name == "a.PNG").unwrap();
        assert_eq!(a.bytes.as_ref(), b"a");
        assert!(a.source_path.ends_with("a.PNG"));
    }

    #[tokio::test]
    async fn max_count_truncates_in_listing_order() {
        let dir = fixture();
        let source = LocalFolderSource::with_root(dir.path()).build();

        let all = source.list_images(None).await.unwrap();
        let first_two = source.list_images(Some(2)).await.unwrap();

        assert_eq!(first_two.len(), 2);
        assert_eq!(first_two[..], all[..2]);
    }

    #[tokio::test]
    async fn missing_folder_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = LocalFolderSource::with_root(dir.path().join("nope")).build();
        let err = source.list_images(None).await.unwrap_err();
        assert!(matches!(err, SourceError::FolderNotFound(_)));
    }

    #[tokio::test]
    async fn configured_extensions_replace_defaults() {
        let dir = fixture();
        let source = LocalFolderSource::with_root(dir.path())
            .extensions(vec!["txt".to_string()])
            .build();
        let images = source.list_images(None).await.unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].name, "notes.txt");
    }
}
