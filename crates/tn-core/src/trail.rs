//! The `Trail` working record and its identity scheme.
//!
//! # Identity
//!
//! Every trail carries an opaque `TrailUuid`.  Splitting a trail produces
//! children with uuids `"{parent}:{n}"` (1-based piece index) whose
//! `original_uuid` points at the *root* ancestor — the uuid the record had
//! before any split.  Provenance therefore survives arbitrarily deep split
//! chains without growing.
//!
//! # Cached scalars
//!
//! `length_km`, the elevation columns, and the bbox are derived from
//! `geometry` and go stale the moment it changes.  All geometry writes go
//! through [`Trail::set_geometry`], which recomputes them; stages never
//! assign the field directly.

use std::fmt;
use std::sync::Arc;

use crate::geo::BBox;
use crate::line::Line3;

// ── TrailUuid ─────────────────────────────────────────────────────────────────

/// Opaque trail identity.  Cheap to clone (shared allocation), ordered
/// lexicographically — all deterministic pair iteration in the pipeline is
/// keyed on this ordering.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct TrailUuid(Arc<str>);

impl TrailUuid {
    pub fn new(s: impl Into<Arc<str>>) -> Self {
        TrailUuid(s.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Uuid for the `n`-th (1-based) piece of a split of `self`.
    pub fn child(&self, n: usize) -> TrailUuid {
        TrailUuid(format!("{}:{n}", self.0).into())
    }
}

impl fmt::Display for TrailUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrailUuid {
    fn from(s: &str) -> Self {
        TrailUuid::new(s)
    }
}

impl serde::Serialize for TrailUuid {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for TrailUuid {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        String::deserialize(d).map(TrailUuid::new)
    }
}

// ── Trail ─────────────────────────────────────────────────────────────────────

/// One trail record as held in the staging store and rewritten by the
/// geometry stages.  Attribute strings are opaque to the pipeline.
#[derive(Clone, Debug)]
pub struct Trail {
    pub uuid:          TrailUuid,
    /// Root ancestor when this record was produced by splitting.
    pub original_uuid: Option<TrailUuid>,

    pub name:       String,
    pub region:     String,
    pub trail_type: String,
    pub surface:    String,
    pub difficulty: String,
    /// Provenance of the record itself ("import", "gap_filler", …).
    pub source:     String,

    pub geometry: Line3,

    // Derived from `geometry`; see module docs.
    pub length_km:      f64,
    pub elevation_gain: f64,
    pub elevation_loss: f64,
    pub min_elevation:  f64,
    pub max_elevation:  f64,
    pub avg_elevation:  f64,
    pub bbox:           BBox,
}

impl Trail {
    /// Build a trail with derived scalars computed from `geometry`.
    pub fn new(uuid: TrailUuid, geometry: Line3) -> Self {
        let mut t = Trail {
            uuid,
            original_uuid: None,
            name:       String::new(),
            region:     String::new(),
            trail_type: String::new(),
            surface:    String::new(),
            difficulty: String::new(),
            source:     "import".to_owned(),
            geometry,
            length_km:      0.0,
            elevation_gain: 0.0,
            elevation_loss: 0.0,
            min_elevation:  0.0,
            max_elevation:  0.0,
            avg_elevation:  0.0,
            bbox:           BBox::EMPTY,
        };
        t.recompute_derived();
        t
    }

    /// The uuid provenance points back to: the root ancestor for split
    /// children, the trail's own uuid otherwise.
    pub fn root_uuid(&self) -> &TrailUuid {
        self.original_uuid.as_ref().unwrap_or(&self.uuid)
    }

    /// Replace the geometry and refresh every cached scalar.
    pub fn set_geometry(&mut self, geometry: Line3) {
        self.geometry = geometry;
        self.recompute_derived();
    }

    /// Recompute `length_km`, the elevation columns, and the bbox from the
    /// current geometry.
    pub fn recompute_derived(&mut self) {
        self.length_km = self.geometry.length_m() / 1_000.0;
        let (gain, loss, min, max, avg) = self.geometry.elevation_profile();
        self.elevation_gain = gain;
        self.elevation_loss = loss;
        self.min_elevation = min;
        self.max_elevation = max;
        self.avg_elevation = avg;
        self.bbox = self.geometry.bbox();
    }

    /// A split child: `n`-th piece (1-based) with the given geometry.
    /// Attributes are inherited; provenance points at the root ancestor.
    pub fn derive_child(&self, n: usize, geometry: Line3) -> Trail {
        let mut child = self.clone();
        child.uuid = self.uuid.child(n);
        child.original_uuid = Some(self.root_uuid().clone());
        child.set_geometry(geometry);
        child
    }
}
