//! Numbered image files on disk as an [`ImageProvider`].

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use blocktrack_core::{BitDepth, Frame, IRect, PixelImage};
use blocktrack_tracking::ImageProvider;
use image::{ColorType, DynamicImage};
use parking_lot::Mutex;
use tracing::{debug, warn};

const EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tif", "tiff", "bmp", "webp", "exr"];

/// Decoded frames kept around; each step reads two neighbouring frames.
const CACHE_FRAMES: usize = 4;

/// Frames found in a directory, keyed by the trailing number of each file
/// stem (`plate.0042.png` is frame 42).
pub struct FrameSequence {
    frames: BTreeMap<Frame, PathBuf>,
    masks: BTreeMap<Frame, PathBuf>,
    cache: Mutex<HashMap<PathBuf, Arc<PixelImage>>>,
}

impl FrameSequence {
    pub fn open(dir: &Path) -> Result<Self> {
        let frames = scan(dir)?;
        if frames.is_empty() {
            bail!("no numbered image files in {}", dir.display());
        }
        debug!(dir = %dir.display(), frames = frames.len(), "Frame sequence opened");
        Ok(Self {
            frames,
            masks: BTreeMap::new(),
            cache: Mutex::new(HashMap::new()),
        })
    }

    /// Attach a directory of masks numbered like the frames.
    pub fn with_masks(mut self, dir: &Path) -> Result<Self> {
        self.masks = scan(dir)?;
        Ok(self)
    }

    /// First and last frame numbers present.
    pub fn range(&self) -> (Frame, Frame) {
        let first = self.frames.keys().next().copied().unwrap_or_default();
        let last = self.frames.keys().next_back().copied().unwrap_or_default();
        (first, last)
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    fn load(&self, path: &Path) -> Option<Arc<PixelImage>> {
        if let Some(image) = self.cache.lock().get(path) {
            return Some(Arc::clone(image));
        }
        let image = match image::open(path) {
            Ok(decoded) => Arc::new(to_pixel_image(decoded)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to decode frame");
                return None;
            }
        };
        let mut cache = self.cache.lock();
        if cache.len() >= CACHE_FRAMES {
            cache.clear();
        }
        cache.insert(path.to_path_buf(), Arc::clone(&image));
        Some(image)
    }
}

impl ImageProvider for FrameSequence {
    type Image = Arc<PixelImage>;

    fn fetch(&self, frame: Frame) -> Option<Self::Image> {
        self.load(self.frames.get(&frame)?)
    }

    fn fetch_mask(&self, frame: Frame) -> Option<Self::Image> {
        self.load(self.masks.get(&frame)?)
    }
}

fn scan(dir: &Path) -> Result<BTreeMap<Frame, PathBuf>> {
    let mut frames = BTreeMap::new();
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        let supported = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()));
        if !supported {
            continue;
        }
        let Some(frame) = path.file_stem().and_then(|s| s.to_str()).and_then(frame_number)
        else {
            continue;
        };
        if let Some(previous) = frames.insert(frame, path.clone()) {
            warn!(
                frame,
                kept = %path.display(),
                ignored = %previous.display(),
                "Duplicate frame number"
            );
        }
    }
    Ok(frames)
}

/// Trailing decimal digits of a file stem.
fn frame_number(stem: &str) -> Option<Frame> {
    let digits = stem.len() - stem.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return None;
    }
    stem[stem.len() - digits..].parse().ok()
}

/// Convert a decoded file, keeping its channel count and bit depth.
pub fn to_pixel_image(decoded: DynamicImage) -> PixelImage {
    let bounds = IRect::from_size(decoded.width(), decoded.height());
    let (data, components, depth): (Vec<f32>, usize, BitDepth) = match decoded.color() {
        ColorType::L8 => (widen(decoded.into_luma8().into_raw()), 1, BitDepth::U8),
        ColorType::La8 => (widen(decoded.into_luma_alpha8().into_raw()), 2, BitDepth::U8),
        ColorType::Rgb8 => (widen(decoded.into_rgb8().into_raw()), 3, BitDepth::U8),
        ColorType::Rgba8 => (widen(decoded.into_rgba8().into_raw()), 4, BitDepth::U8),
        ColorType::L16 => (widen(decoded.into_luma16().into_raw()), 1, BitDepth::U16),
        ColorType::La16 => (widen(decoded.into_luma_alpha16().into_raw()), 2, BitDepth::U16),
        ColorType::Rgb16 => (widen(decoded.into_rgb16().into_raw()), 3, BitDepth::U16),
        ColorType::Rgba16 => (widen(decoded.into_rgba16().into_raw()), 4, BitDepth::U16),
        ColorType::Rgb32F => (decoded.into_rgb32f().into_raw(), 3, BitDepth::F32),
        _ => (decoded.into_rgba32f().into_raw(), 4, BitDepth::F32),
    };
    PixelImage {
        data,
        bounds,
        components,
        depth,
        pixel_aspect_ratio: 1.0,
    }
}

fn widen<T: Into<f32>>(raw: Vec<T>) -> Vec<f32> {
    raw.into_iter().map(Into::into).collect()
}
