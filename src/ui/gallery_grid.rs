use iced::alignment::Horizontal;
use iced::widget::{button, column, container, image, text};
use iced::{Alignment, Element, Length};
use iced_aw::Wrap;
use std::fs;
use std::path::Path;

use crate::media::scanner::Scanner;
use crate::media::thumbnail::{ThumbnailCache, THUMBNAIL_WIDTH};
use crate::state::data::GalleryItem;
use crate::Message;

/// Widest caption line, in characters
const CAPTION_CHARS: usize = 30;

/// A grid cell: the item plus its decoded-once image handle
#[derive(Debug, Clone)]
pub struct Tile {
    pub item: GalleryItem,
    handle: image::Handle,
}

impl Tile {
    pub fn new(item: GalleryItem, bytes: Vec<u8>) -> Self {
        Tile {
            item,
            handle: image::Handle::from_bytes(bytes),
        }
    }
}

/// Scan `dir` and resolve a thumbnail for every image found.
///
/// Images whose thumbnail can't be produced are left out.
pub fn load_tiles(scanner: &Scanner, cache: &ThumbnailCache, dir: &Path) -> Vec<Tile> {
    let mut tiles = Vec::new();
    let mut generated = 0;

    for source in scanner.scan(dir) {
        if !cache.contains(&source) {
            generated += 1;
        }

        let thumbnail = match cache.resolve(&source) {
            Ok(path) => path,
            Err(e) => {
                log::warn!("Skipping thumbnail: {}", e);
                continue;
            }
        };

        // Cached files hold JPEG data regardless of their extension,
        // so hand iced the bytes and let it sniff the format
        match fs::read(&thumbnail) {
            Ok(bytes) => tiles.push(Tile::new(GalleryItem::new(source, thumbnail), bytes)),
            Err(e) => log::warn!("Cannot read thumbnail {}: {}", thumbnail.display(), e),
        }
    }

    log::debug!("{} tiles for {}, {} thumbnails generated", tiles.len(), dir.display(), generated);
    tiles
}

/// Thumbnail grid; clicking a tile opens the viewer on its directory
pub fn view(tiles: &[Tile]) -> Element<'_, Message> {
    let elements: Vec<Element<Message>> = tiles
        .iter()
        .enumerate()
        .map(|(index, tile)| view_tile(index, tile))
        .collect();

    Wrap::with_elements(elements).into()
}

fn view_tile(index: usize, tile: &Tile) -> Element<'_, Message> {
    let content = column![
        container(image(tile.handle.clone()))
            .padding(2)
            .style(container::bordered_box),
        text(wrap_caption(&tile.item.caption(), CAPTION_CHARS))
            .size(13)
            .align_x(Horizontal::Center),
    ]
    .spacing(4)
    .align_x(Alignment::Center)
    .width(Length::Fixed(THUMBNAIL_WIDTH as f32 + 10.0));

    container(
        button(content)
            .on_press(Message::OpenViewer(index))
            .style(button::text),
    )
    .padding(4)
    .into()
}

/// Break caption lines longer than `max_chars` at word boundaries
fn wrap_caption(caption: &str, max_chars: usize) -> String {
    let mut lines: Vec<String> = Vec::new();

    for line in caption.lines() {
        let mut current = String::new();
        for word in line.split(' ') {
            let needed = current.chars().count() + word.chars().count() + 1;
            if !current.is_empty() && needed > max_chars {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        }
        lines.push(current);
    }

    lines.join("\n")
}
