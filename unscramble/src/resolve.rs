//! Resolution of a scrambled font.
//!
//! The [`Resolver`] runs the quick matcher over every glyph, falls back to
//! the slow matcher for whatever remains, and feeds each slow discovery back
//! into the coordinate table so later fonts sharing the outline resolve on
//! the quick path.

use std::{
    collections::BTreeMap,
    sync::{Arc, RwLock},
    time::Instant,
};

use coord_table::{read_table, CoordFact, CoordTable, FactStore, JsonFileStore, PLACEHOLDER};

use crate::{
    bitmap::GlyphBitmap,
    cache::{BitmapCache, SharedBitmapCache},
    config::EngineConfig,
    error::{CacheError, ConfigError, MatchError, ResolveError},
    font::{collect_outlines, FontFile, OutlineFont, RasterFont},
    guest::GuestRange,
    quick::{self, ResolvedTable},
    slow::{self, SlowMatch},
};

/// The outcome of resolving one font.
#[derive(Clone, Default, Debug, PartialEq)]
pub struct Resolution {
    /// Scrambled character to true character, for every resolved glyph.
    pub table: ResolvedTable,
    /// Glyphs that could not be resolved.
    pub failures: BTreeMap<char, MatchError>,
    /// Number of glyphs resolved by outline comparison.
    pub quick_count: usize,
    /// Number of glyphs resolved by rendering.
    pub slow_count: usize,
}

impl Resolution {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Resolves scrambled fonts against a coordinate table and a reference font.
///
/// A resolver is shared between concurrent resolutions. Each resolution
/// works from a snapshot of the table; facts learned along the way are
/// persisted through the store and replace the snapshot for subsequent
/// resolutions.
pub struct Resolver<S, R> {
    store: S,
    reference: R,
    table: RwLock<Arc<CoordTable>>,
    cache: SharedBitmapCache,
    config: EngineConfig,
}

impl Resolver<JsonFileStore, FontFile> {
    /// Creates a resolver from the files named in `config`.
    ///
    /// A corrupt coordinate table is replaced by the baseline.
    pub fn from_config(config: EngineConfig) -> Result<Self, ResolveError> {
        let table_path = config
            .coord_table_path
            .clone()
            .ok_or(ConfigError::Missing("coord_table_path"))?;
        let font_path = config
            .reference_font_path
            .clone()
            .ok_or(ConfigError::Missing("reference_font_path"))?;
        let baseline = match &config.baseline_table_path {
            Some(path) => read_table(path)?,
            None => CoordTable::default(),
        };
        let store = match JsonFileStore::open(&table_path, &baseline) {
            Ok(store) => store,
            Err(e) if e.is_corrupt() => {
                log::warn!("{e}");
                let store = JsonFileStore::new(&table_path);
                store.reset_to_baseline(&baseline)?;
                store
            }
            Err(e) => return Err(e.into()),
        };
        let reference = FontFile::open(&font_path)?;
        Self::new(store, reference, config)
    }
}

impl<S: FactStore, R: RasterFont + Sync> Resolver<S, R> {
    pub fn new(store: S, reference: R, config: EngineConfig) -> Result<Self, ResolveError> {
        let table = store.load()?;
        log::info!("loaded coordinate table with {} facts", table.len());
        Ok(Self {
            store,
            reference,
            table: RwLock::new(Arc::new(table)),
            cache: SharedBitmapCache::new(),
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// The current snapshot of the coordinate table.
    pub fn table(&self) -> Arc<CoordTable> {
        self.table
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// The characters of the current table plus the configured
    /// supplementary characters.
    pub fn guest_range(&self) -> GuestRange {
        GuestRange::from_table(&self.table(), self.config.supplementary())
    }

    /// Returns the reference renderings, building them if needed.
    pub fn bitmap_cache(&self, guest: &GuestRange) -> Result<Arc<BitmapCache>, ResolveError> {
        let cache = self.cache.get_or_build(|| self.build_cache(guest))?;
        if cache.check(guest).is_ok() {
            return Ok(cache);
        }
        log::info!("guest range outgrew the bitmap cache, rebuilding");
        self.cache.invalidate();
        Ok(self.cache.get_or_build(|| self.build_cache(guest))?)
    }

    fn build_cache(&self, guest: &GuestRange) -> Result<BitmapCache, CacheError> {
        let (font_size, canvas) = (self.config.font_size, self.config.canvas());
        match &self.config.cache_dir {
            Some(dir) => BitmapCache::load_or_build(dir, &self.reference, guest, font_size, canvas),
            None => BitmapCache::build(&self.reference, guest, font_size, canvas),
        }
    }

    /// Resolves every glyph of `font` except the placeholder.
    ///
    /// Glyphs are first matched by outline against the table. The rest are
    /// rendered and matched against the reference renderings of `guest`;
    /// each such match is recorded in the table. Glyphs that match nothing
    /// are reported in [`Resolution::failures`].
    pub fn resolve<F>(&self, font: &F, guest: &GuestRange) -> Result<Resolution, ResolveError>
    where
        F: OutlineFont + RasterFont,
    {
        let start = Instant::now();
        let outlines = collect_outlines(font)?;
        let table = self.table();
        let quick = quick::match_glyphs(&outlines, &table, self.config.fuzz);
        let mut resolution = Resolution {
            quick_count: quick.resolved.len(),
            table: quick.resolved,
            ..Default::default()
        };
        if !quick.unresolved.is_empty() {
            let cache = self.bitmap_cache(guest)?;
            let mut learned = Vec::new();
            for ch in quick.unresolved {
                match self.slow_match(font, ch, &cache, guest)? {
                    Ok(best) => {
                        log::debug!(
                            "slow match {ch:?} -> {:?} (score {:.3})",
                            best.character,
                            best.score
                        );
                        resolution.table.insert(ch, best.character);
                        resolution.slow_count += 1;
                        if let Some(outline) = outlines.get(&ch) {
                            learned.push(CoordFact::new(best.character, outline.clone()));
                        }
                    }
                    Err(e) => {
                        log::debug!("{e}");
                        resolution.failures.insert(ch, e);
                    }
                }
            }
            self.learn(&learned);
        }
        log::info!(
            "resolved {} glyphs ({} quick, {} slow, {} failed) in {:?}",
            resolution.table.len(),
            resolution.quick_count,
            resolution.slow_count,
            resolution.failures.len(),
            start.elapsed()
        );
        Ok(resolution)
    }

    /// Resolves every glyph of `font` by rendering alone.
    ///
    /// The table is neither consulted nor updated. This is useful for
    /// checking a reference font or diagnosing a font that the quick path
    /// resolves unexpectedly.
    pub fn slow_only<F: OutlineFont + RasterFont>(
        &self,
        font: &F,
        guest: &GuestRange,
    ) -> Result<Resolution, ResolveError> {
        let cache = self.bitmap_cache(guest)?;
        let mut resolution = Resolution::default();
        for ch in font.codepoints()? {
            if ch == PLACEHOLDER {
                continue;
            }
            match self.slow_match(font, ch, &cache, guest)? {
                Ok(best) => {
                    resolution.table.insert(ch, best.character);
                    resolution.slow_count += 1;
                }
                Err(e) => {
                    resolution.failures.insert(ch, e);
                }
            }
        }
        Ok(resolution)
    }

    /// Renders the glyph for `ch` and finds its best candidate.
    ///
    /// The outer error is fatal; the inner one only concerns this glyph.
    fn slow_match<F: RasterFont>(
        &self,
        font: &F,
        ch: char,
        cache: &BitmapCache,
        guest: &GuestRange,
    ) -> Result<Result<SlowMatch, MatchError>, ResolveError> {
        let canvas = cache.canvas();
        let test = font
            .rasterize(ch, cache.font_size(), canvas)?
            .unwrap_or_else(|| GlyphBitmap::new(canvas));
        match slow::match_bitmap(&test, cache, guest, self.config.ratio_tolerance) {
            Ok(Some(best)) => Ok(Ok(best)),
            Ok(None) => Ok(Err(MatchError::Exhausted(ch))),
            Err(MatchError::DimensionMismatch { expected, found }) => {
                Err(ResolveError::DimensionMismatch { expected, found })
            }
            Err(e) => Ok(Err(e)),
        }
    }

    /// Stores learned facts and refreshes the table snapshot.
    ///
    /// The snapshot stays write locked while the store is updated, so that
    /// concurrent learners install their tables in the order they were
    /// saved. A failure to persist is logged; the resolution that produced
    /// the facts is still valid.
    fn learn(&self, facts: &[CoordFact]) {
        if facts.is_empty() {
            return;
        }
        let mut snapshot = self.table.write().unwrap_or_else(|e| e.into_inner());
        match self.store.merge_and_save(facts) {
            Ok(table) => {
                log::info!(
                    "learned {} fact(s), table now has {}",
                    facts.len(),
                    table.len()
                );
                *snapshot = Arc::new(table);
            }
            Err(e) => log::warn!("failed to store {} learned fact(s): {e}", facts.len()),
        }
    }
}
