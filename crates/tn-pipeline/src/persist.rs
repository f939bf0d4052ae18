//! Graph → staging-row conversion.
//!
//! The graph crate owns the live arena representation; the store persists
//! plain rows.  This boundary keeps both crates free of each other.

use tn_graph::TrailGraph;
use tn_store::{EdgeRow, VertexRow};

/// Flatten the live graph into store rows, edge/vertex ids preserved.
pub fn graph_to_rows(graph: &TrailGraph) -> (Vec<EdgeRow>, Vec<VertexRow>) {
    let edges = graph
        .live_edges()
        .map(|e| EdgeRow {
            edge_id:        e.id.0,
            source:         e.source.0,
            target:         e.target.0,
            geom:           e.geom.clone(),
            length_km:      e.length_km,
            elevation_gain: e.elevation_gain,
            elevation_loss: e.elevation_loss,
            cost:           e.cost,
            reverse_cost:   e.reverse_cost,
            trail_uuid:     e.trail_uuid.clone(),
            name:           e.name.clone(),
            old_id:         e.old_id,
            sub_id:         e.sub_id,
        })
        .collect();

    let vertices = graph
        .live_vertices()
        .map(|v| VertexRow {
            vertex_id: v.id.0,
            lng:       v.lng,
            lat:       v.lat,
            degree:    v.degree,
        })
        .collect();

    (edges, vertices)
}
