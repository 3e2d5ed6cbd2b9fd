use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{GalleryError, Result};

/// Viewer used when the config file doesn't name one
pub const DEFAULT_IMAGE_VIEWER: &str = "nsxiv -bqr -z 90";

/// ImageMagick's converter, used to extract the first frame of gifs
pub const DEFAULT_GIF_CONVERTER: &str = "convert";

/// Value of `gif_converter` selecting the in-process gif decoder
pub const BUILTIN_GIF_CONVERTER: &str = "builtin";

const APP_DIR: &str = "sgv";

/// User settings persisted as JSON.
///
/// The file is stored in the user's config directory:
/// - Linux: ~/.config/sgv/config.json
/// - macOS: ~/Library/Application Support/sgv/config.json
/// - Windows: %APPDATA%\sgv\config.json
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Command line of the external viewer, split on whitespace
    pub image_viewer: String,
    /// Root directory to browse
    pub dir: String,
    /// Program extracting gif first frames, or "builtin"
    pub gif_converter: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            image_viewer: DEFAULT_IMAGE_VIEWER.to_string(),
            dir: String::new(),
            gif_converter: DEFAULT_GIF_CONVERTER.to_string(),
        }
    }
}

impl Config {
    /// Load the config file; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::info!("No config at {}, using defaults", path.display());
                return Ok(Config::default());
            }
            Err(e) => return Err(GalleryError::io(path, e)),
        };

        let config = serde_json::from_str(&text)?;
        Ok(config)
    }

    /// Write the config file, creating its directory if needed
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| GalleryError::io(parent, e))?;
        }

        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|e| GalleryError::io(path, e))?;

        log::info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Default location of the config file
    pub fn default_path() -> PathBuf {
        let mut path = dirs::config_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));

        path.push(APP_DIR);
        path.push("config.json");
        path
    }

    /// Default root of the thumbnail cache (~/.cache/sgv on Linux)
    pub fn default_cache_dir() -> PathBuf {
        let mut path = dirs::cache_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));

        path.push(APP_DIR);
        path
    }

    /// Root directory as a path, if it exists
    pub fn root_dir(&self) -> Option<PathBuf> {
        if self.dir.is_empty() {
            return None;
        }
        let path = PathBuf::from(&self.dir);
        path.is_dir().then_some(path)
    }

    /// Viewer command split into program + arguments
    pub fn viewer_tokens(&self) -> Vec<String> {
        self.image_viewer
            .split_whitespace()
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("config.json")).unwrap();

        assert_eq!(config, Config::default());
        assert_eq!(config.image_viewer, DEFAULT_IMAGE_VIEWER);
        assert!(config.root_dir().is_none());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "dir": "/srv/pictures", "unknown": 1 }"#).unwrap();

        let config = Config::load(&path).unwrap();

        assert_eq!(config.dir, "/srv/pictures");
        assert_eq!(config.image_viewer, DEFAULT_IMAGE_VIEWER);
        assert_eq!(config.gif_converter, DEFAULT_GIF_CONVERTER);
    }

    #[test]
    fn invalid_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(Config::load(&path), Err(GalleryError::Config(_))));
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            image_viewer: "feh -F".to_string(),
            dir: dir.path().to_string_lossy().to_string(),
            gif_converter: BUILTIN_GIF_CONVERTER.to_string(),
        };

        config.save(&path).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\n  \"image_viewer\": \"feh -F\""));

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.root_dir().as_deref(), Some(dir.path()));
    }

    #[test]
    fn viewer_tokens_split_on_whitespace() {
        let config = Config::default();
        assert_eq!(config.viewer_tokens(), vec!["nsxiv", "-bqr", "-z", "90"]);
    }
}
