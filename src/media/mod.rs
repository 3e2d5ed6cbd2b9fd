/// Image discovery and thumbnail handling
///
/// This module handles:
/// - Finding the representative images of a directory (scanner.rs)
/// - Caching resized thumbnails on disk (thumbnail.rs)
/// - Launching the external image viewer (viewer.rs)

pub mod scanner;
pub mod thumbnail;
pub mod viewer;
