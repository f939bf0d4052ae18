//! Plain data rows persisted by the staging store, and the compact text
//! codec for polyline geometry.
//!
//! Trails round-trip through the full `tn_core::Trail` type.  Edges and
//! vertices are plain rows: the graph crate owns the live representations
//! and the pipeline converts at the boundary, so the store stays free of
//! graph semantics.
//!
//! # Geometry codec
//!
//! `"lng lat elev;lng lat elev;…"` — 7 decimals for lng/lat (one decimal
//! below the 6-decimal vertex identity, so rounding survives the
//! round-trip), 2 for elevation.  Edges use the 2-D form `"lng lat;…"`.

use tn_core::{GeoPoint3, Line3};

use crate::error::{StoreError, StoreResult};

// ── Edge / vertex rows ────────────────────────────────────────────────────────

/// One routable edge as persisted in the `edges` table.
#[derive(Clone, Debug, PartialEq)]
pub struct EdgeRow {
    pub edge_id:        u32,
    pub source:         u32,
    pub target:         u32,
    /// 2-D geometry; starts at the source vertex, ends at the target.
    pub geom:           Vec<(f64, f64)>,
    pub length_km:      f64,
    pub elevation_gain: f64,
    pub elevation_loss: f64,
    pub cost:           f64,
    pub reverse_cost:   f64,
    pub trail_uuid:     String,
    pub name:           String,
    /// Provenance within the split history, when known.
    pub old_id:         Option<u32>,
    pub sub_id:         Option<u32>,
}

/// One graph vertex as persisted in the `vertices` table.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VertexRow {
    pub vertex_id: u32,
    pub lng:       f64,
    pub lat:       f64,
    pub degree:    u32,
}

// ── Geometry codec ────────────────────────────────────────────────────────────

/// Encode a 3-D polyline.
pub fn encode_line3(line: &Line3) -> String {
    let mut out = String::with_capacity(line.num_points() * 24);
    for (i, p) in line.points().iter().enumerate() {
        if i > 0 {
            out.push(';');
        }
        out.push_str(&format!("{:.7} {:.7} {:.2}", p.lng, p.lat, p.elev));
    }
    out
}

/// Decode a 3-D polyline.
pub fn decode_line3(s: &str) -> StoreResult<Line3> {
    let mut pts = Vec::new();
    for (i, part) in s.split(';').enumerate() {
        let mut fields = part.split_whitespace();
        let lng = parse_coord(fields.next(), s, i)?;
        let lat = parse_coord(fields.next(), s, i)?;
        let elev = match fields.next() {
            Some(f) => f
                .parse::<f64>()
                .map_err(|_| StoreError::Parse(format!("bad elevation in vertex {i}: {f:?}")))?,
            None => 0.0,
        };
        pts.push(GeoPoint3::new(lng, lat, elev));
    }
    if pts.len() < 2 {
        return Err(StoreError::Parse(format!("polyline has {} vertex(es)", pts.len())));
    }
    Ok(Line3::new(pts))
}

/// Encode a 2-D polyline.
pub fn encode_line2(coords: &[(f64, f64)]) -> String {
    let mut out = String::with_capacity(coords.len() * 18);
    for (i, (lng, lat)) in coords.iter().enumerate() {
        if i > 0 {
            out.push(';');
        }
        out.push_str(&format!("{lng:.7} {lat:.7}"));
    }
    out
}

/// Decode a 2-D polyline.
pub fn decode_line2(s: &str) -> StoreResult<Vec<(f64, f64)>> {
    let mut coords = Vec::new();
    for (i, part) in s.split(';').enumerate() {
        let mut fields = part.split_whitespace();
        let lng = parse_coord(fields.next(), s, i)?;
        let lat = parse_coord(fields.next(), s, i)?;
        coords.push((lng, lat));
    }
    if coords.len() < 2 {
        return Err(StoreError::Parse(format!("polyline has {} vertex(es)", coords.len())));
    }
    Ok(coords)
}

fn parse_coord(field: Option<&str>, line: &str, vertex: usize) -> StoreResult<f64> {
    field
        .ok_or_else(|| StoreError::Parse(format!("truncated vertex {vertex} in {line:?}")))?
        .parse::<f64>()
        .map_err(|_| StoreError::Parse(format!("bad coordinate in vertex {vertex}")))
}
