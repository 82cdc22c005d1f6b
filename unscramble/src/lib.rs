//! Recovery of the true characters behind fonts with scrambled character maps.
//!
//! Obfuscated web fonts map arbitrary codepoints to glyphs, so the text in a
//! page is meaningless without knowing which character each glyph depicts.
//! This crate recovers that mapping in two tiers:
//!
//! * the [quick] path compares raw glyph outlines against a
//!   [`CoordTable`](coord_table::CoordTable) of outlines identified before;
//! * the [slow] path renders the remaining glyphs and compares them with
//!   renderings of every candidate character (the [`GuestRange`]) in a
//!   reference font, held in a [`BitmapCache`].
//!
//! The [`Resolver`] ties both together and writes every slow path discovery
//! back to the table.
//!
//! ```no_run
//! use unscramble::coord_table::{CoordTable, JsonFileStore};
//! use unscramble::{EngineConfig, FontFile, Resolver};
//!
//! let config = EngineConfig::default();
//! let store = JsonFileStore::open("coords.json", &CoordTable::default()).unwrap();
//! let reference = FontFile::open("SourceHanSansSC-Normal.otf").unwrap();
//! let resolver = Resolver::new(store, reference, config).unwrap();
//!
//! let unknown = FontFile::new(std::fs::read("scrambled.ttf").unwrap()).unwrap();
//! let guest = resolver.guest_range();
//! let resolution = resolver.resolve(&unknown, &guest).unwrap();
//! for (code, ch) in &resolution.table {
//!     println!("{code} -> {ch}");
//! }
//! ```

mod bitmap;
mod cache;
mod config;
mod error;
mod font;
mod guest;
pub mod quick;
pub mod raster;
mod resolve;
pub mod slow;

pub use bitmap::{Canvas, GlyphBitmap, DEFAULT_FONT_SIZE, DEFAULT_LINE_HEIGHT};
pub use cache::{BitmapCache, SharedBitmapCache, BITMAPS_FILE, RATIOS_FILE};
pub use config::EngineConfig;
pub use error::{CacheError, ConfigError, FontError, MatchError, ResolveError};
pub use font::{collect_outlines, FontFile, OutlineFont, RasterFont, SharedFontData, SkrifaFont};
pub use guest::GuestRange;
pub use quick::{QuickMatch, ResolvedTable};
pub use resolve::{Resolution, Resolver};
pub use slow::SlowMatch;

pub use coord_table;
