use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::state::data::{is_hidden, is_image};

/// Finds the images shown in the gallery for a directory
#[derive(Debug, Clone, Default)]
pub struct Scanner;

impl Scanner {
    /// Collect the gallery images for `dir`.
    ///
    /// The first image of `dir` itself comes first. Then the directory is
    /// walked recursively; at every step that has subdirectories, the first
    /// image of each subdirectory is appended. Unreadable entries are skipped.
    pub fn scan(&self, dir: &Path) -> Vec<PathBuf> {
        let mut images = Vec::new();

        if let Some(image) = first_image(dir) {
            images.push(image);
        }

        let walker = WalkDir::new(dir)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(&e.file_name().to_string_lossy()));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    log::debug!("Skipping entry during scan: {}", e);
                    continue;
                }
            };

            if !entry.file_type().is_dir() {
                continue;
            }

            for subdir in list_subdirs(entry.path()) {
                if let Some(image) = first_image(&subdir) {
                    images.push(image);
                }
            }
        }

        log::debug!("Scanned {}: {} images", dir.display(), images.len());
        images
    }
}

/// Immediate entries of `dir` sorted by file name; empty if unreadable
pub fn sorted_entries(dir: &Path) -> Vec<PathBuf> {
    let read_dir = match fs::read_dir(dir) {
        Ok(read_dir) => read_dir,
        Err(e) => {
            log::debug!("Cannot list {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut entries: Vec<PathBuf> = read_dir
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .collect();

    entries.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    entries
}

/// First image file of `dir` in name order
pub fn first_image(dir: &Path) -> Option<PathBuf> {
    sorted_entries(dir)
        .into_iter()
        .find(|path| is_image(path) && path.is_file())
}

/// Non-hidden subdirectories of `dir` in name order, symlinks followed
pub fn list_subdirs(dir: &Path) -> Vec<PathBuf> {
    sorted_entries(dir)
        .into_iter()
        .filter(|path| !hidden_path(path) && path.is_dir())
        .collect()
}

/// Whether `dir` has at least one non-hidden subdirectory
pub fn has_subdirs(dir: &Path) -> bool {
    match fs::read_dir(dir) {
        Ok(read_dir) => read_dir
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .any(|path| !hidden_path(&path) && path.is_dir()),
        Err(_) => false,
    }
}

fn hidden_path(path: &Path) -> bool {
    path.file_name()
        .map(|name| is_hidden(&name.to_string_lossy()))
        .unwrap_or(false)
}
