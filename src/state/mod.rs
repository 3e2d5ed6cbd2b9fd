/// State management module
///
/// This module handles all application state, including:
/// - Persistent user settings (config.rs)
/// - Shared data structures (data.rs)
/// - The lazily expanded directory tree (tree.rs)

pub mod config;
pub mod data;
pub mod tree;
