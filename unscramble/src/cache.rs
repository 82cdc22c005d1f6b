//! Reference renderings of the guest range.
//!
//! Rendering every guest character for each slow match would dominate the
//! cost of resolution, so the renderings and their black ratios are built
//! once from the reference font, persisted to disk and shared.
//!
//! A cache directory holds two files:
//!
//! * `bitmaps.bin`: the format version, canvas, font size and the packed
//!   bitmap of each character, encoded with bincode.
//! * `ratios.json`: the canvas, font size and black ratio of each character.
//!
//! Ratios are recomputed from the loaded bitmaps, so a reloaded cache prunes
//! exactly like the one that was saved. The index only decides which
//! characters are covered.

use std::{
    borrow::Cow,
    collections::BTreeMap,
    fs,
    io::{BufWriter, Write},
    path::Path,
    sync::{Arc, Mutex},
    time::Instant,
};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    bitmap::{Canvas, GlyphBitmap},
    error::CacheError,
    font::RasterFont,
    guest::GuestRange,
};

pub const BITMAPS_FILE: &str = "bitmaps.bin";
pub const RATIOS_FILE: &str = "ratios.json";

const FORMAT_VERSION: u32 = 2;

/// Renderings of the guest range in a reference font.
#[derive(Clone, Debug)]
pub struct BitmapCache {
    canvas: Canvas,
    font_size: f32,
    bitmaps: BTreeMap<char, GlyphBitmap>,
    ratios: BTreeMap<char, f64>,
}

#[derive(Serialize, Deserialize)]
struct BitmapFile<'a> {
    version: u32,
    canvas: Canvas,
    font_size: f32,
    bitmaps: Cow<'a, BTreeMap<char, GlyphBitmap>>,
}

#[derive(Serialize, Deserialize)]
struct RatioIndex {
    canvas: Canvas,
    font_size: f32,
    ratios: Vec<(char, f64)>,
}

impl BitmapCache {
    /// Creates a cache from existing renderings, computing their ratios.
    pub fn from_bitmaps(
        canvas: Canvas,
        font_size: f32,
        bitmaps: BTreeMap<char, GlyphBitmap>,
    ) -> Self {
        let ratios = bitmaps
            .iter()
            .map(|(ch, bitmap)| (*ch, bitmap.black_ratio()))
            .collect();
        Self {
            canvas,
            font_size,
            bitmaps,
            ratios,
        }
    }

    /// Renders every guest character with `font`.
    ///
    /// Characters the font does not map are cached as blank bitmaps so that
    /// the cache remains complete for the range.
    pub fn build<F: RasterFont + Sync>(
        font: &F,
        guest: &GuestRange,
        font_size: f32,
        canvas: Canvas,
    ) -> Result<Self, CacheError> {
        let start = Instant::now();
        let bitmaps: BTreeMap<char, GlyphBitmap> = guest
            .as_slice()
            .par_iter()
            .map(|ch| {
                let bitmap = font.rasterize(*ch, font_size, canvas)?.unwrap_or_else(|| {
                    log::warn!("reference font does not map {ch:?}, caching a blank bitmap");
                    GlyphBitmap::new(canvas)
                });
                Ok::<_, CacheError>((*ch, bitmap))
            })
            .collect::<Result<_, _>>()?;
        log::info!(
            "rendered {} reference glyphs at {font_size}px in {:?}",
            bitmaps.len(),
            start.elapsed()
        );
        Ok(Self::from_bitmaps(canvas, font_size, bitmaps))
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    pub fn font_size(&self) -> f32 {
        self.font_size
    }

    pub fn len(&self) -> usize {
        self.bitmaps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bitmaps.is_empty()
    }

    pub fn get(&self, ch: char) -> Option<&GlyphBitmap> {
        self.bitmaps.get(&ch)
    }

    pub fn ratio(&self, ch: char) -> Option<f64> {
        self.ratios.get(&ch).copied()
    }

    /// Verifies that every guest character has both a bitmap and a ratio.
    pub fn check(&self, guest: &GuestRange) -> Result<(), CacheError> {
        let missing: Vec<char> = guest
            .iter()
            .filter(|ch| !self.bitmaps.contains_key(ch) || !self.ratios.contains_key(ch))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(CacheError::Stale { missing })
        }
    }

    /// Writes the cache files into `dir`, replacing any existing ones.
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<(), CacheError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|e| CacheError::io(dir, e))?;
        let file = BitmapFile {
            version: FORMAT_VERSION,
            canvas: self.canvas,
            font_size: self.font_size,
            bitmaps: Cow::Borrowed(&self.bitmaps),
        };
        let blob = bincode::serialize(&file)
            .map_err(|e| CacheError::format(dir.join(BITMAPS_FILE), e.to_string()))?;
        let index = RatioIndex {
            canvas: self.canvas,
            font_size: self.font_size,
            ratios: self.ratios.iter().map(|(ch, r)| (*ch, *r)).collect(),
        };
        let json = serde_json::to_vec_pretty(&index)
            .map_err(|e| CacheError::format(dir.join(RATIOS_FILE), e.to_string()))?;
        write_atomic(&dir.join(BITMAPS_FILE), &blob)?;
        write_atomic(&dir.join(RATIOS_FILE), &json)?;
        Ok(())
    }

    /// Reads a cache previously written by [`save`](Self::save).
    ///
    /// Fails if the files are missing, malformed, or were rendered with a
    /// different canvas or font size.
    pub fn load(dir: impl AsRef<Path>, font_size: f32, canvas: Canvas) -> Result<Self, CacheError> {
        let dir = dir.as_ref();
        let path = dir.join(BITMAPS_FILE);
        let data = fs::read(&path).map_err(|e| CacheError::io(&path, e))?;
        let file: BitmapFile = bincode::deserialize(&data)
            .map_err(|e| CacheError::format(&path, e.to_string()))?;
        if file.version != FORMAT_VERSION {
            return Err(CacheError::format(
                &path,
                format!("unsupported version {}", file.version),
            ));
        }
        check_rendering(&path, (file.font_size, file.canvas), (font_size, canvas))?;
        let bitmaps = file.bitmaps.into_owned();
        if let Some((ch, _)) = bitmaps.iter().find(|(_, b)| b.canvas() != canvas) {
            return Err(CacheError::format(&path, format!("bitmap for {ch:?} has another canvas")));
        }

        let path = dir.join(RATIOS_FILE);
        let json = fs::read(&path).map_err(|e| CacheError::io(&path, e))?;
        let index: RatioIndex =
            serde_json::from_slice(&json).map_err(|e| CacheError::format(&path, e.to_string()))?;
        check_rendering(&path, (index.font_size, index.canvas), (font_size, canvas))?;
        let mut ratios = BTreeMap::new();
        for (ch, _) in index.ratios {
            let bitmap = bitmaps
                .get(&ch)
                .ok_or_else(|| CacheError::format(&path, format!("no bitmap for {ch:?}")))?;
            ratios.insert(ch, bitmap.black_ratio());
        }
        Ok(Self {
            canvas,
            font_size,
            bitmaps,
            ratios,
        })
    }

    /// Loads the cache in `dir`, rebuilding and saving it if it cannot be
    /// loaded or does not cover `guest`.
    pub fn load_or_build<F: RasterFont + Sync>(
        dir: impl AsRef<Path>,
        font: &F,
        guest: &GuestRange,
        font_size: f32,
        canvas: Canvas,
    ) -> Result<Self, CacheError> {
        let dir = dir.as_ref();
        match Self::load(dir, font_size, canvas) {
            Ok(cache) => match cache.check(guest) {
                Ok(()) => return Ok(cache),
                Err(e) => log::warn!("bitmap cache in '{}' is stale: {e}", dir.display()),
            },
            Err(CacheError::Io { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
                log::info!("no bitmap cache in '{}', building", dir.display())
            }
            Err(e) => log::warn!("discarding bitmap cache: {e}"),
        }
        let cache = Self::build(font, guest, font_size, canvas)?;
        cache.save(dir)?;
        Ok(cache)
    }
}

/// Fails unless a file rendered at `found` matches the `expected` font size
/// and canvas.
fn check_rendering(
    path: &Path,
    found: (f32, Canvas),
    expected: (f32, Canvas),
) -> Result<(), CacheError> {
    if found == expected {
        return Ok(());
    }
    let ((size, canvas), (expected_size, expected_canvas)) = (found, expected);
    Err(CacheError::format(
        path,
        format!(
            "rendered at {size}px on {}x{}, expected {expected_size}px on {}x{}",
            canvas.width, canvas.height, expected_canvas.width, expected_canvas.height
        ),
    ))
}

fn write_atomic(path: &Path, data: &[u8]) -> Result<(), CacheError> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut file = tempfile::NamedTempFile::new_in(dir).map_err(|e| CacheError::io(dir, e))?;
    {
        let mut writer = BufWriter::new(file.as_file_mut());
        writer.write_all(data).map_err(|e| CacheError::io(path, e))?;
        writer.flush().map_err(|e| CacheError::io(path, e))?;
    }
    file.persist(path).map_err(|e| CacheError::io(path, e.error))?;
    Ok(())
}

/// A lazily built cache shared between concurrent resolutions.
///
/// The first caller builds (or loads) the cache while holding the lock;
/// callers arriving meanwhile wait and then share the result.
#[derive(Default, Debug)]
pub struct SharedBitmapCache {
    inner: Mutex<Option<Arc<BitmapCache>>>,
}

impl SharedBitmapCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cache, creating it with `init` if there is none yet.
    pub fn get_or_build(
        &self,
        init: impl FnOnce() -> Result<BitmapCache, CacheError>,
    ) -> Result<Arc<BitmapCache>, CacheError> {
        let mut slot = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(cache) = slot.as_ref() {
            return Ok(cache.clone());
        }
        let cache = Arc::new(init()?);
        *slot = Some(cache.clone());
        Ok(cache)
    }

    /// Drops the shared cache; the next access rebuilds it.
    pub fn invalidate(&self) {
        *self.inner.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }
}
