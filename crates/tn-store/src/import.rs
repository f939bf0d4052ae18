//! CSV raw-trail-source adapter.
//!
//! # CSV format
//!
//! One row per trail:
//!
//! ```csv
//! trail_uuid,name,region,trail_type,surface,difficulty,source,geometry
//! t-001,Bear Creek,boulder,hiking,dirt,moderate,import,-105.28 40.02 1650;-105.27 40.03 1710
//! ```
//!
//! `geometry` uses the store's polyline codec (`"lng lat elev;…"`).  Rows
//! with invalid geometry are skipped with a warning, not fatal — a regional
//! import should survive a handful of broken source records.  Unknown extra
//! columns are ignored.

use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use tn_core::{BBox, Trail, TrailUuid};

use crate::error::StoreResult;
use crate::rows::decode_line3;
use crate::store::StagingStore;

// ── CSV record ────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct TrailRecord {
    trail_uuid: String,
    #[serde(default)]
    name:       String,
    #[serde(default)]
    region:     String,
    #[serde(default)]
    trail_type: String,
    #[serde(default)]
    surface:    String,
    #[serde(default)]
    difficulty: String,
    #[serde(default)]
    source:     String,
    geometry:   String,
}

// ── Filters ───────────────────────────────────────────────────────────────────

/// Import-time row filters.  `None` means "keep everything".
#[derive(Clone, Debug, Default)]
pub struct ImportFilter {
    /// Keep only rows whose `region` matches exactly.
    pub region: Option<String>,
    /// Keep only rows whose geometry bbox intersects this envelope.
    pub bbox:   Option<BBox>,
}

/// Counters returned by an import.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub read:             u64,
    pub imported:         u64,
    pub skipped_invalid:  u64,
    pub skipped_filtered: u64,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Import trails from a CSV file into the staging store.
pub fn import_trails_csv(
    path: &Path,
    store: &mut StagingStore,
    filter: &ImportFilter,
) -> StoreResult<ImportSummary> {
    let file = std::fs::File::open(path)?;
    import_trails_reader(file, store, filter)
}

/// Like [`import_trails_csv`] but accepts any `Read` source (pass a
/// `std::io::Cursor` in tests).
pub fn import_trails_reader<R: Read>(
    reader: R,
    store: &mut StagingStore,
    filter: &ImportFilter,
) -> StoreResult<ImportSummary> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut summary = ImportSummary::default();
    let mut batch: Vec<Trail> = Vec::new();

    for result in csv_reader.deserialize::<TrailRecord>() {
        let record = result?;
        summary.read += 1;

        let geometry = match decode_line3(&record.geometry) {
            Ok(line) => line,
            Err(e) => {
                log::warn!("skipping trail {}: {e}", record.trail_uuid);
                summary.skipped_invalid += 1;
                continue;
            }
        };
        if let Err(e) = tn_geom::validate(&geometry) {
            log::warn!("skipping trail {}: {e}", record.trail_uuid);
            summary.skipped_invalid += 1;
            continue;
        }

        let mut trail = Trail::new(TrailUuid::new(record.trail_uuid), geometry);
        trail.name = record.name;
        trail.region = record.region;
        trail.trail_type = record.trail_type;
        trail.surface = record.surface;
        trail.difficulty = record.difficulty;
        if !record.source.is_empty() {
            trail.source = record.source;
        }

        if let Some(region) = &filter.region {
            if trail.region != *region {
                summary.skipped_filtered += 1;
                continue;
            }
        }
        if let Some(bbox) = filter.bbox {
            if !bbox.intersects(trail.bbox) {
                summary.skipped_filtered += 1;
                continue;
            }
        }

        summary.imported += 1;
        batch.push(trail);
    }

    store.insert_trails(&batch)?;
    log::info!(
        "imported {} of {} trails into staging {:?} ({} invalid, {} filtered)",
        summary.imported,
        summary.read,
        store.name(),
        summary.skipped_invalid,
        summary.skipped_filtered
    );
    Ok(summary)
}
