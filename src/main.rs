use clap::Parser;
use flexi_logger::{Cleanup, Criterion, Duplicate, FileSpec, Logger, LoggerHandle, Naming};
use iced::widget::{column, container, horizontal_rule, row, scrollable, text, vertical_rule};
use iced::{Element, Length, Task, Theme};
use rfd::FileDialog;
use std::path::{Path, PathBuf};

mod error;
mod media;
mod state;
mod ui;

use error::{GalleryError, Result};
use media::scanner::Scanner;
use media::thumbnail::{FrameExtractor, ThumbnailCache};
use media::viewer::ImageViewer;
use state::config::Config;
use state::tree::{DirTree, NodeId};
use ui::gallery_grid::{self, Tile};
use ui::tree_pane;

/// Initial window size (width, height)
const WINDOW_SIZE: (f32, f32) = (1024.0, 600.0);

/// Browse a folder of image folders as a thumbnail gallery
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Directory to browse for this run (the configured one is kept)
    #[arg(value_name = "PATH")]
    path: Option<PathBuf>,

    /// Config file to read instead of the default one
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Thumbnail cache directory
    #[arg(long, value_name = "DIR")]
    cache_dir: Option<PathBuf>,
}

/// Everything the window needs, resolved before it opens
struct Startup {
    tree: DirTree,
    scanner: Scanner,
    cache: ThumbnailCache,
    viewer: Option<ImageViewer>,
}

/// Main application state
struct Gallery {
    tree: DirTree,
    scanner: Scanner,
    cache: ThumbnailCache,
    viewer: Option<ImageViewer>,
    /// Thumbnails of the directory being shown
    tiles: Vec<Tile>,
    /// Tree node whose directory is shown, if any
    selected: Option<NodeId>,
    /// Status message to display to the user
    status: String,
}

/// Application messages (events)
#[derive(Debug, Clone)]
pub enum Message {
    /// User clicked a directory name in the tree
    Activate(NodeId),
    /// User clicked the expand/collapse marker of a directory
    Toggle(NodeId),
    /// User clicked a thumbnail
    OpenViewer(usize),
}

impl Gallery {
    /// Create the application and show the first directory
    fn new(startup: Startup) -> (Self, Task<Message>) {
        let mut gallery = Gallery {
            tree: startup.tree,
            scanner: startup.scanner,
            cache: startup.cache,
            viewer: startup.viewer,
            tiles: Vec::new(),
            selected: None,
            status: String::new(),
        };

        match gallery.tree.first() {
            Some(first) => gallery.select(first),
            None => {
                let root = gallery.tree.root().to_path_buf();
                gallery.show_directory(&root);
            }
        }

        (gallery, Task::none())
    }

    /// Handle application messages and update state
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::Activate(id) => self.select(id),
            Message::Toggle(id) => {
                let hides_selection = self
                    .selected
                    .is_some_and(|sel| self.tree.is_ancestor(id, sel));

                if let Some(dir) = self.tree.toggle(id) {
                    self.selected = Some(id);
                    self.show_directory(&dir);
                } else if hides_selection {
                    // the grid showed a directory inside the collapsed subtree
                    self.select(id);
                }
                log::debug!("Tree holds {} nodes", self.tree.len());
            }
            Message::OpenViewer(index) => self.open_viewer(index),
        }

        Task::none()
    }

    fn select(&mut self, id: NodeId) {
        if let Some(dir) = self.tree.node(id).map(|node| node.path.clone()) {
            self.selected = Some(id);
            self.show_directory(&dir);
        }
    }

    /// Replace the grid with the thumbnails of `dir`
    fn show_directory(&mut self, dir: &Path) {
        log::info!("Showing {}", dir.display());
        self.tiles = gallery_grid::load_tiles(&self.scanner, &self.cache, dir);
        self.status = format!("{} ({} thumbnails)", dir.display(), self.tiles.len());
    }

    fn open_viewer(&mut self, index: usize) {
        let Some(dir) = self.tiles.get(index).and_then(|tile| tile.item.directory()) else {
            log::warn!("No directory behind thumbnail {}", index);
            return;
        };

        let result = match &self.viewer {
            Some(viewer) => viewer.launch(dir),
            None => Err(GalleryError::EmptyViewerCommand),
        };

        if let Err(e) = result {
            log::error!("Cannot open {}: {}", dir.display(), e);
            self.status = format!("Error: {}", e);
        }
    }

    /// Build the user interface
    fn view(&self) -> Element<Message> {
        let gallery = scrollable(gallery_grid::view(&self.tiles))
            .width(Length::Fill)
            .height(Length::Fill);

        let body: Element<Message> = if self.tree.is_empty() {
            gallery.into()
        } else {
            row![
                tree_pane::view(&self.tree, self.selected),
                vertical_rule(1),
                gallery,
            ]
            .height(Length::Fill)
            .into()
        };

        let status = container(text(&self.status).size(13)).padding([2, 8]);

        column![body, horizontal_rule(1), status].into()
    }

    /// Set the application theme
    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

fn main() -> iced::Result {
    let args = Args::parse();
    let _logger = start_logger();

    log::info!("Starting sgv {}", env!("CARGO_PKG_VERSION"));

    let startup = match prepare(&args) {
        Ok(startup) => startup,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("sgv: {}", e);
            std::process::exit(1);
        }
    };

    iced::application("Gallery", Gallery::update, Gallery::view)
        .theme(Gallery::theme)
        .window_size(WINDOW_SIZE)
        .centered()
        .run_with(move || Gallery::new(startup))
}

/// Load the config, settle on a root directory and build the components
fn prepare(args: &Args) -> Result<Startup> {
    let config_path = args.config.clone().unwrap_or_else(Config::default_path);
    let (mut config, writable) = match Config::load(&config_path) {
        Ok(config) => (config, true),
        Err(e) => {
            log::warn!("Ignoring {}: {}", config_path.display(), e);
            (Config::default(), false)
        }
    };

    let (root, picked) = resolve_root(&mut config, args.path.as_deref(), pick_folder)?;
    if picked {
        if let Err(e) = remember_root(&config, &config_path, writable) {
            log::warn!("Cannot save config: {}", e);
        }
    }

    let viewer = match ImageViewer::from_tokens(config.viewer_tokens()) {
        Ok(viewer) => Some(viewer),
        Err(e) => {
            log::warn!("{}", e);
            None
        }
    };

    let cache_root = args.cache_dir.clone().unwrap_or_else(Config::default_cache_dir);
    log::info!("Browsing {}, cache at {}", root.display(), cache_root.display());

    Ok(Startup {
        tree: DirTree::load(&root)?,
        scanner: Scanner::default(),
        cache: ThumbnailCache::new(cache_root, FrameExtractor::from_setting(&config.gif_converter)),
        viewer,
    })
}

/// Decide which directory to browse.
///
/// A command-line path overrides the config for this run. If the result
/// doesn't exist, `pick` asks the user; a picked folder is stored in `config`
/// and reported with `true` so the caller can persist it.
fn resolve_root(
    config: &mut Config,
    cli_path: Option<&Path>,
    pick: impl FnOnce() -> Option<PathBuf>,
) -> Result<(PathBuf, bool)> {
    if let Some(path) = cli_path {
        let path = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        config.dir = path.to_string_lossy().to_string();
    }

    if let Some(root) = config.root_dir() {
        return Ok((root, false));
    }

    log::warn!("Root directory {:?} doesn't exist, asking the user", config.dir);
    match pick() {
        Some(dir) if dir.is_dir() => {
            config.dir = dir.to_string_lossy().to_string();
            Ok((dir, true))
        }
        _ => Err(GalleryError::NoRootDirectory),
    }
}

/// Persist a picked root directory.
///
/// A config file that failed to parse is left alone so the user can fix it.
/// Returns whether anything was written.
fn remember_root(config: &Config, path: &Path, writable: bool) -> Result<bool> {
    if !writable {
        log::warn!("Not saving the chosen folder over unreadable {}", path.display());
        return Ok(false);
    }

    config.save(path)?;
    Ok(true)
}

fn pick_folder() -> Option<PathBuf> {
    FileDialog::new()
        .set_title("Please choose a folder")
        .pick_folder()
}

fn log_dir() -> Option<PathBuf> {
    let dir = dirs::cache_dir()?.join("sgv-logs");
    std::fs::create_dir_all(&dir).ok()?;
    Some(dir)
}

fn start_logger() -> Option<LoggerHandle> {
    let logger =
        match Logger::try_with_env_or_str("info, iced=error, wgpu_hal=error, wgpu_core=error, naga=error") {
            Ok(logger) => logger,
            Err(e) => {
                eprintln!("Invalid log specification: {}", e);
                return None;
            }
        };

    let logger = match log_dir() {
        Some(dir) => logger
            .log_to_file(
                FileSpec::default()
                    .directory(dir)
                    .basename("sgv")
                    .suffix("log")
                    .suppress_timestamp(),
            )
            .rotate(Criterion::Size(64 * 1024), Naming::Numbers, Cleanup::KeepLogFiles(3))
            .duplicate_to_stderr(Duplicate::Warn),
        None => logger.log_to_stderr(),
    };

    match logger.start() {
        Ok(handle) => Some(handle),
        Err(e) => {
            eprintln!("Failed to start logger: {}", e);
            None
        }
    }
}
