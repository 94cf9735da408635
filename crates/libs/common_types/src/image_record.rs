use bytes::Bytes;
use std::path::Path;

/// One image as listed by a source: its name, where it came from and its raw bytes.
///
/// Immutable once read. `bytes` is reference counted, so cloning a record does not copy
/// the image data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRecord {
    /// File name including extension, e.g. `IMG_0042.jpg`.
    pub name: String,
    /// Local path or remote path the image was read from. Unique within one listing.
    pub source_path: String,
    pub bytes: Bytes,
}

impl ImageRecord {
    #[must_use]
    pub fn new(name: impl Into<String>, source_path: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            source_path: source_path.into(),
            bytes: bytes.into(),
        }
    }

    #[must_use]
    pub fn size_bytes(&self) -> usize {
        self.bytes.len()
    }

    /// File name without its extension.
    #[must_use]
    pub fn stem(&self) -> String {
        Path::new(&self.name)
            .file_stem()
            .map_or_else(|| self.name.clone(), |s| s.to_string_lossy().to_string())
    }

    /// Image format sniffed from the magic bytes, e.g. `jpg` or `png`.
    #[must_use]
    pub fn format(&self) -> Option<&'static str> {
        infer::get(&self.bytes)
            .filter(|kind| kind.matcher_type() == infer::MatcherType::Image)
            .map(|kind| kind.extension())
    }

    /// Width and height read from the image header, without decoding pixels.
    #[must_use]
    pub fn dimensions(&self) -> Option<(usize, usize)> {
        imagesize::blob_size(&self.bytes)
            .ok()
            .map(|size| (size.width, size.height))
    }
}

/// The payload actually sent to a backend: resized and re-encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedImage {
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
    pub width: u32,
    pub height: u32,
}
