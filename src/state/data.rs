/// Shared data structures for the application state
///
/// These structs represent the data model that flows between
/// the scanner, the thumbnail cache and the UI layer.
use std::fs;
use std::path::{Path, PathBuf};

/// File extensions recognized as images (compared lowercase)
pub const IMAGE_EXTENSIONS: [&str; 5] = ["jpeg", "jpg", "png", "webp", "gif"];

/// Names starting with this marker are hidden from the tree and the scanner
pub const HIDDEN_MARKER: char = '.';

/// Check if a path looks like an image by its extension
pub fn is_image(path: &Path) -> bool {
    match path.extension() {
        Some(ext) => {
            let ext = ext.to_string_lossy().to_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        }
        None => false,
    }
}

/// Check if a path is a gif (animated sources get first-frame treatment)
pub fn is_gif(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("gif"))
        .unwrap_or(false)
}

/// Check if a file name starts with the hidden-entry marker
pub fn is_hidden(name: &str) -> bool {
    name.starts_with(HIDDEN_MARKER)
}

/// Represents a single cell of the thumbnail grid
#[derive(Debug, Clone, PartialEq)]
pub struct GalleryItem {
    /// The original image found by the scanner
    pub source: PathBuf,
    /// Resized copy inside the thumbnail cache
    pub thumbnail: PathBuf,
    /// Name of the directory holding the source image
    pub title: String,
    /// Number of entries in that directory
    pub entry_count: usize,
}

impl GalleryItem {
    pub fn new(source: PathBuf, thumbnail: PathBuf) -> Self {
        let parent = source.parent();

        let title = parent
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let entry_count = parent
            .and_then(|p| fs::read_dir(p).ok())
            .map(|entries| entries.count())
            .unwrap_or(0);

        GalleryItem {
            source,
            thumbnail,
            title,
            entry_count,
        }
    }

    /// Directory the external viewer should be opened on
    pub fn directory(&self) -> Option<&Path> {
        self.source.parent()
    }

    /// Caption shown under the thumbnail
    pub fn caption(&self) -> String {
        format!("({})\n{}", self.entry_count, self.title)
    }
}
