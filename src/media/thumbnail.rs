use image::codecs::gif::GifDecoder;
use image::{imageops::FilterType, AnimationDecoder, DynamicImage, ImageFormat};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Component, Path, PathBuf};
use std::process::Command;

use crate::error::{GalleryError, Result};
use crate::state::config::BUILTIN_GIF_CONVERTER;
use crate::state::data::is_gif;

/// Bounding box of generated thumbnails (width x height)
pub const THUMBNAIL_WIDTH: u32 = 250;
pub const THUMBNAIL_HEIGHT: u32 = 350;

/// Converters pick the output format from the extension
const PARTIAL_SUFFIX: &str = ".jpg";

/// How the first frame of an animated gif is extracted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameExtractor {
    /// Run an ImageMagick-compatible tool: `<program> <src>[0] -resize WxH <dest>`
    External { program: String },
    /// Decode the first frame with the image crate
    Builtin,
}

impl FrameExtractor {
    /// Build from the `gif_converter` config value
    pub fn from_setting(setting: &str) -> Self {
        let setting = setting.trim();
        if setting.is_empty() || setting == BUILTIN_GIF_CONVERTER {
            FrameExtractor::Builtin
        } else {
            FrameExtractor::External {
                program: setting.to_string(),
            }
        }
    }
}

/// Maps original images to resized copies under a cache root.
///
/// The cache mirrors the source hierarchy: `/photos/a/b.png` is stored as
/// `<root>/photos/a/b.png`. Gifs get a `.jpg` suffix since only their first
/// frame is kept. An existing entry is always reused as is.
#[derive(Debug, Clone)]
pub struct ThumbnailCache {
    root: PathBuf,
    extractor: FrameExtractor,
}

impl ThumbnailCache {
    pub fn new(root: PathBuf, extractor: FrameExtractor) -> Self {
        ThumbnailCache { root, extractor }
    }

    /// Location of the cached copy of `source` (doesn't generate anything)
    pub fn cache_path(&self, source: &Path) -> PathBuf {
        let mut path = self.root.clone();

        for component in source.components() {
            match component {
                Component::Prefix(prefix) => {
                    // C: -> C
                    let drive = prefix.as_os_str().to_string_lossy().replace(':', "");
                    path.push(drive);
                }
                Component::Normal(name) => path.push(name),
                Component::RootDir | Component::CurDir | Component::ParentDir => {}
            }
        }

        if is_gif(source) {
            let mut name = path.file_name().unwrap_or_default().to_os_string();
            name.push(".jpg");
            path.set_file_name(name);
        }

        path
    }

    /// Check if a cached copy exists for `source`
    pub fn contains(&self, source: &Path) -> bool {
        self.cache_path(source).exists()
    }

    /// Return the cached copy of `source`, generating it on first access
    pub fn resolve(&self, source: &Path) -> Result<PathBuf> {
        let cached = self.cache_path(source);
        if cached.exists() {
            return Ok(cached);
        }

        let parent = cached.parent().unwrap_or(self.root.as_path());
        fs::create_dir_all(parent).map_err(|e| GalleryError::io(parent, e))?;

        // Written beside the entry and renamed on success, so a failed
        // conversion never leaves a file that looks like a cache hit.
        // Dropping `partial` on an error path deletes it.
        let partial = tempfile::Builder::new()
            .prefix(".sgv-")
            .suffix(PARTIAL_SUFFIX)
            .tempfile_in(parent)
            .map_err(|e| GalleryError::io(parent, e))?;

        if is_gif(source) {
            self.save_first_frame(source, partial.path())?;
        } else {
            let img = image::open(source).map_err(|e| GalleryError::image(source, e))?;
            save_thumbnail(img, source, partial.path())?;
        }

        partial
            .persist(&cached)
            .map_err(|e| GalleryError::io(&cached, e.error))?;

        log::debug!("Generated thumbnail: {}", cached.display());
        Ok(cached)
    }

    fn save_first_frame(&self, source: &Path, destination: &Path) -> Result<()> {
        match &self.extractor {
            FrameExtractor::External { program } => {
                convert_first_frame(program, source, destination)
            }
            FrameExtractor::Builtin => {
                let frame = decode_first_frame(source)?;
                save_thumbnail(frame, source, destination)
            }
        }
    }
}

/// Fit `img` into the thumbnail bounding box, keeping its aspect ratio
pub fn fit_thumbnail(img: &DynamicImage) -> DynamicImage {
    img.resize(THUMBNAIL_WIDTH, THUMBNAIL_HEIGHT, FilterType::Lanczos3)
}

/// Resize and write as JPEG, whatever the destination's extension says
fn save_thumbnail(img: DynamicImage, source: &Path, destination: &Path) -> Result<()> {
    let thumbnail = fit_thumbnail(&img);

    // JPEG has no alpha channel
    let rgb = DynamicImage::ImageRgb8(thumbnail.to_rgb8());
    rgb.save_with_format(destination, ImageFormat::Jpeg)
        .map_err(|e| GalleryError::image(source, e))
}

fn decode_first_frame(source: &Path) -> Result<DynamicImage> {
    let file = File::open(source).map_err(|e| GalleryError::io(source, e))?;
    let decoder =
        GifDecoder::new(BufReader::new(file)).map_err(|e| GalleryError::image(source, e))?;

    let frame = decoder
        .into_frames()
        .next()
        .ok_or_else(|| GalleryError::Convert {
            program: BUILTIN_GIF_CONVERTER.to_string(),
            reason: format!("{} has no frames", source.display()),
        })?
        .map_err(|e| GalleryError::image(source, e))?;

    Ok(DynamicImage::ImageRgba8(frame.into_buffer()))
}

/// Run the external converter on the first frame of `source`
fn convert_first_frame(program: &str, source: &Path, destination: &Path) -> Result<()> {
    let mut frame_arg = source.as_os_str().to_os_string();
    frame_arg.push("[0]");

    let output = Command::new(program)
        .arg(frame_arg)
        .arg("-resize")
        .arg(format!("{}x{}", THUMBNAIL_WIDTH, THUMBNAIL_HEIGHT))
        .arg(destination)
        .output()
        .map_err(|e| GalleryError::Convert {
            program: program.to_string(),
            reason: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(GalleryError::Convert {
            program: program.to_string(),
            reason: format!(
                "{} ({})",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        });
    }

    // Some converters exit 0 without writing anything
    let written = fs::metadata(destination).map(|m| m.len()).unwrap_or(0);
    if written == 0 {
        return Err(GalleryError::Convert {
            program: program.to_string(),
            reason: format!("no output written to {}", destination.display()),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::codecs::gif::GifEncoder;
    use image::{Delay, Frame, GenericImageView, Rgba, RgbaImage};

    fn write_png(path: &Path, width: u32, height: u32) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let img = RgbaImage::from_pixel(width, height, Rgba([200, 30, 30, 128]));
        img.save_with_format(path, ImageFormat::Png).unwrap();
    }

    fn write_gif(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let file = File::create(path).unwrap();
        let mut encoder = GifEncoder::new(file);
        let first = Frame::from_parts(
            RgbaImage::from_pixel(100, 40, Rgba([255, 0, 0, 255])),
            0,
            0,
            Delay::from_numer_denom_ms(100, 1),
        );
        let second = Frame::from_parts(
            RgbaImage::from_pixel(100, 40, Rgba([0, 0, 255, 255])),
            0,
            0,
            Delay::from_numer_denom_ms(100, 1),
        );
        encoder.encode_frames(vec![first, second]).unwrap();
    }

    fn builtin_cache(root: &Path) -> ThumbnailCache {
        ThumbnailCache::new(root.to_path_buf(), FrameExtractor::Builtin)
    }

    #[test]
    fn cache_path_mirrors_source_hierarchy() {
        let cache = builtin_cache(Path::new("/home/me/.cache/sgv"));

        assert_eq!(
            cache.cache_path(Path::new("/srv/photos/trip/a.png")),
            PathBuf::from("/home/me/.cache/sgv/srv/photos/trip/a.png")
        );
    }

    #[test]
    fn gif_cache_path_gets_jpg_suffix() {
        let cache = builtin_cache(Path::new("/cache"));

        let path = cache.cache_path(Path::new("/srv/anim/foo.gif"));

        assert!(path.ends_with("srv/anim/foo.gif.jpg"));
    }

    #[test]
    fn resolve_creates_resized_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("photos/album/wide.png");
        write_png(&source, 1000, 500);
        let cache = builtin_cache(&dir.path().join("cache"));

        let cached = cache.resolve(&source).unwrap();

        assert_eq!(cached, cache.cache_path(&source));
        assert!(cached.starts_with(dir.path().join("cache")));
        let bytes = fs::read(&cached).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Jpeg);
        let thumb = image::load_from_memory(&bytes).unwrap();
        assert_eq!(thumb.dimensions(), (250, 125));
    }

    #[test]
    fn resolve_reuses_existing_entry() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("photos/a.png");
        write_png(&source, 64, 64);
        let cache = builtin_cache(&dir.path().join("cache"));

        let first = cache.resolve(&source).unwrap();
        fs::write(&first, b"sentinel").unwrap();
        let second = cache.resolve(&source).unwrap();

        assert_eq!(first, second);
        assert_eq!(fs::read(&second).unwrap(), b"sentinel");
        assert!(cache.contains(&source));
    }

    #[test]
    fn gif_keeps_first_frame_only() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("anim/foo.gif");
        write_gif(&source);
        let cache = builtin_cache(&dir.path().join("cache"));

        let cached = cache.resolve(&source).unwrap();

        assert!(cached.to_string_lossy().ends_with("foo.gif.jpg"));
        let thumb = image::open(&cached).unwrap().to_rgb8();
        assert_eq!(thumb.dimensions(), (250, 100));
        let pixel = thumb.get_pixel(125, 50);
        assert!(pixel[0] > 200 && pixel[2] < 60, "expected red, got {:?}", pixel);
    }

    #[test]
    fn corrupt_image_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("broken.png");
        fs::write(&source, b"definitely not a png").unwrap();
        let cache = builtin_cache(&dir.path().join("cache"));

        assert!(matches!(cache.resolve(&source), Err(GalleryError::Image { .. })));
        assert!(!cache.contains(&source));
        assert!(leftovers(&cache, &source).is_empty());
    }

    #[test]
    fn missing_converter_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("foo.gif");
        write_gif(&source);
        let cache = ThumbnailCache::new(
            dir.path().join("cache"),
            FrameExtractor::External {
                program: "sgv-no-such-converter".to_string(),
            },
        );

        assert!(matches!(cache.resolve(&source), Err(GalleryError::Convert { .. })));
    }

    /// Write an executable `sh` script standing in for the converter
    #[cfg(unix)]
    fn fake_converter(dir: &Path, body: &str) -> FrameExtractor {
        use std::os::unix::fs::PermissionsExt;

        let script = dir.join("fake-convert");
        fs::write(&script, format!("#!/bin/sh\n{}\n", body)).unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
        FrameExtractor::External {
            program: script.to_string_lossy().to_string(),
        }
    }

    /// Files left in the directory that would hold the cached copy
    fn leftovers(cache: &ThumbnailCache, source: &Path) -> Vec<PathBuf> {
        let cached = cache.cache_path(source);
        match fs::read_dir(cached.parent().unwrap()) {
            Ok(entries) => entries.map(|entry| entry.unwrap().path()).collect(),
            Err(_) => Vec::new(),
        }
    }

    #[cfg(unix)]
    #[test]
    fn external_converter_gets_first_frame_arguments() {
        let dir = tempfile::tempdir().unwrap();
        let tools = tempfile::tempdir().unwrap();
        let source = dir.path().join("anim/foo.gif");
        write_gif(&source);
        let args_log = tools.path().join("args.txt");
        let extractor = fake_converter(
            tools.path(),
            &format!("printf '%s\\n' \"$@\" > '{}'\nprintf converted > \"$4\"", args_log.display()),
        );
        let cache = ThumbnailCache::new(dir.path().join("cache"), extractor);

        let cached = cache.resolve(&source).unwrap();

        assert_eq!(cached, cache.cache_path(&source));
        assert!(cached.to_string_lossy().ends_with("anim/foo.gif.jpg"));
        assert_eq!(fs::read(&cached).unwrap(), b"converted");

        let recorded = fs::read_to_string(&args_log).unwrap();
        let args: Vec<&str> = recorded.lines().collect();
        assert_eq!(args.len(), 4, "{:?}", args);
        assert_eq!(args[0], format!("{}[0]", source.display()));
        assert_eq!(args[1], "-resize");
        assert_eq!(args[2], "250x350");
        // written next to the entry, then renamed into place
        let written = Path::new(args[3]);
        assert_eq!(written.parent(), cached.parent());
        assert!(args[3].ends_with(".jpg"));
        assert!(!written.exists());
        assert_eq!(leftovers(&cache, &source), vec![cached]);
    }

    #[cfg(unix)]
    #[test]
    fn failing_converter_leaves_no_cache_entry() {
        let dir = tempfile::tempdir().unwrap();
        let tools = tempfile::tempdir().unwrap();
        let source = dir.path().join("anim/foo.gif");
        write_gif(&source);
        let extractor = fake_converter(tools.path(), "printf partial > \"$4\"\nexit 1");
        let cache = ThumbnailCache::new(dir.path().join("cache"), extractor);

        assert!(matches!(cache.resolve(&source), Err(GalleryError::Convert { .. })));
        assert!(!cache.contains(&source));
        assert!(leftovers(&cache, &source).is_empty());

        // still a failure the second time, not a stale hit
        assert!(matches!(cache.resolve(&source), Err(GalleryError::Convert { .. })));
        assert!(!cache.contains(&source));
    }

    #[cfg(unix)]
    #[test]
    fn empty_converter_output_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let tools = tempfile::tempdir().unwrap();
        let source = dir.path().join("foo.gif");
        write_gif(&source);
        let extractor = fake_converter(tools.path(), ": > \"$4\"\nexit 0");
        let cache = ThumbnailCache::new(dir.path().join("cache"), extractor);

        assert!(matches!(cache.resolve(&source), Err(GalleryError::Convert { .. })));
        assert!(!cache.contains(&source));
        assert!(leftovers(&cache, &source).is_empty());
    }

    #[test]
    fn thumbnails_fit_the_bounding_box() {
        for (w, h) in [(1000, 500), (500, 1000), (2000, 2800), (10, 3000), (3000, 10)] {
            let img = DynamicImage::new_rgb8(w, h);
            let (tw, th) = fit_thumbnail(&img).dimensions();

            assert!(tw <= THUMBNAIL_WIDTH && th <= THUMBNAIL_HEIGHT, "{}x{} -> {}x{}", w, h, tw, th);
            assert!(tw == THUMBNAIL_WIDTH || th == THUMBNAIL_HEIGHT);

            let ratio = w as f64 / h as f64;
            let thumb_ratio = tw as f64 / th as f64;
            // rounding to whole pixels on the short side
            let tolerance = ratio * (1.0 / tw.min(th) as f64 + 0.01);
            assert!((ratio - thumb_ratio).abs() <= tolerance, "{}x{} -> {}x{}", w, h, tw, th);
        }
    }

    #[test]
    fn extractor_from_setting() {
        assert_eq!(FrameExtractor::from_setting("builtin"), FrameExtractor::Builtin);
        assert_eq!(FrameExtractor::from_setting(""), FrameExtractor::Builtin);
        assert_eq!(
            FrameExtractor::from_setting("magick"),
            FrameExtractor::External {
                program: "magick".to_string()
            }
        );
    }
}
