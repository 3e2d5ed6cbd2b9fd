/// View helpers for the two panes of the main window

pub mod gallery_grid;
pub mod tree_pane;
