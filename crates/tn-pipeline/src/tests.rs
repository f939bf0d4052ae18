//! End-to-end tests for the stage pipeline.
//!
//! Each scenario seeds an in-memory staging store with a hand-built trail
//! set, runs the full pipeline, and inspects the persisted tables.
//! Coordinates sit near the equator (0.001° ≈ 111 m) so metre tolerances
//! are easy to reason about.

#[cfg(test)]
mod helpers {
    use tn_core::{GeoPoint3, Line3, PipelineConfig, Trail, TrailUuid};
    use tn_store::{EdgeRow, StagingStore, VertexRow};

    use crate::observer::NoopObserver;
    use crate::runner::{Pipeline, PipelineBuilder, RunSummary};

    pub fn trail(uuid: &str, pts: &[(f64, f64, f64)]) -> Trail {
        let mut t = Trail::new(
            TrailUuid::new(uuid),
            Line3::new(
                pts.iter()
                    .map(|&(lng, lat, elev)| GeoPoint3::new(lng, lat, elev))
                    .collect(),
            ),
        );
        t.name = uuid.to_owned();
        t.region = "test".to_owned();
        t
    }

    /// Run the full pipeline over `trails` and hand back the summary plus
    /// the pipeline (for store inspection or re-runs).
    pub fn run(trails: Vec<Trail>, config: PipelineConfig) -> (RunSummary, Pipeline) {
        let mut store = StagingStore::open_in_memory("test").unwrap();
        store.insert_trails(&trails).unwrap();
        let mut pipeline = PipelineBuilder::new(config, store).build().unwrap();
        let summary = pipeline.run(&mut NoopObserver).unwrap();
        (summary, pipeline)
    }

    pub fn graph_rows(pipeline: &Pipeline) -> (Vec<EdgeRow>, Vec<VertexRow>) {
        (
            pipeline.store().load_edges().unwrap(),
            pipeline.store().load_vertices().unwrap(),
        )
    }

    /// The vertex at (approximately) the given location.
    pub fn vertex_at(vertices: &[VertexRow], lng: f64, lat: f64) -> Option<VertexRow> {
        vertices
            .iter()
            .find(|v| (v.lng - lng).abs() < 1e-5 && (v.lat - lat).abs() < 1e-5)
            .copied()
    }

    pub fn total_length_km(edges: &[EdgeRow]) -> f64 {
        edges.iter().map(|e| e.length_km).sum()
    }

    /// Config with chain merging off, to inspect the raw built network.
    pub fn no_merge_config() -> PipelineConfig {
        PipelineConfig { merge_degree2: false, ..PipelineConfig::default() }
    }
}

// ── Crossing and junction scenarios ───────────────────────────────────────────

#[cfg(test)]
mod scenarios {
    use super::helpers::*;
    use tn_core::PipelineConfig;

    #[test]
    fn x_crossing_splits_both_trails() {
        // Two diagonals of a square crossing in the middle.
        let trails = vec![
            trail("a", &[(0.0, 0.0, 100.0), (0.002, 0.002, 200.0)]),
            trail("b", &[(0.0, 0.002, 150.0), (0.002, 0.0, 150.0)]),
        ];
        let before_km = trails.iter().map(|t| t.length_km).sum::<f64>();
        let (summary, pipeline) = run(trails, no_merge_config());
        assert!(!summary.partial);

        let (edges, vertices) = graph_rows(&pipeline);
        assert_eq!(edges.len(), 4);
        assert_eq!(vertices.len(), 5);

        let center = vertex_at(&vertices, 0.001, 0.001).expect("crossing vertex exists");
        assert_eq!(center.degree, 4);

        // Total length preserved through rounding/snapping.
        assert!((total_length_km(&edges) - before_km).abs() * 1_000.0 < 4.0);

        // Every split child points back at its ancestor.
        let report = summary
            .diagnostics
            .report_for(tn_core::StageKind::SplitIntersections)
            .unwrap();
        assert_eq!(report.splits, 2);
        let stored = pipeline.store().load_trails().unwrap();
        assert_eq!(stored.len(), 4);
        for t in &stored {
            assert!(t.original_uuid.is_some());
        }
    }

    #[test]
    fn t_near_miss_splits_the_host_only() {
        // `a` starts 2.8 m above the midpoint of `b`.
        let trails = vec![
            trail("a", &[(0.001, 0.000_025_2, 10.0), (0.001, 0.001, 20.0)]),
            trail("b", &[(0.0, 0.0, 0.0), (0.002, 0.0, 0.0)]),
        ];
        let (summary, pipeline) = run(trails, no_merge_config());
        assert!(!summary.partial);

        let (edges, vertices) = graph_rows(&pipeline);
        assert_eq!(edges.len(), 3); // b split in two, a intact
        assert_eq!(vertices.len(), 4);

        let junction = vertex_at(&vertices, 0.001, 0.0).expect("junction vertex exists");
        assert_eq!(junction.degree, 3);

        // The toucher was not split — exactly one edge still carries its uuid.
        let a_edges: Vec<_> = edges.iter().filter(|e| e.trail_uuid == "a").collect();
        assert_eq!(a_edges.len(), 1);
    }

    #[test]
    fn beyond_tolerance_t_is_left_alone() {
        // Same shape, but 4.5 m away — outside the 3 m radius.
        let trails = vec![
            trail("a", &[(0.001, 0.000_040_5, 0.0), (0.001, 0.001, 0.0)]),
            trail("b", &[(0.0, 0.0, 0.0), (0.002, 0.0, 0.0)]),
        ];
        let (_, pipeline) = run(trails, no_merge_config());
        let (edges, vertices) = graph_rows(&pipeline);
        // No split, no junction; the 4.5 m gap is bridged by a connector
        // instead (it is endpoint-to-interior, not endpoint-to-endpoint,
        // so actually nothing bridges it either).
        assert_eq!(edges.len(), 2);
        assert_eq!(vertices.len(), 4);
    }

    #[test]
    fn coincident_endpoints_merge_without_connector() {
        // Endpoints ~0.05 m apart.
        let trails = vec![
            trail("a", &[(0.0, 0.0, 5.0), (0.001, 0.0, 6.0)]),
            trail("b", &[(0.001_000_45, 0.0, 7.0), (0.002, 0.0, 8.0)]),
        ];
        let (summary, pipeline) = run(trails, no_merge_config());

        let (edges, vertices) = graph_rows(&pipeline);
        assert_eq!(edges.len(), 2);
        assert_eq!(vertices.len(), 3); // single shared vertex
        assert!(edges.iter().all(|e| e.name != "Connector"));

        let shared = vertex_at(&vertices, 0.001, 0.0).unwrap();
        assert_eq!(shared.degree, 2);

        let report = summary
            .diagnostics
            .report_for(tn_core::StageKind::SnapAndBridge)
            .unwrap();
        assert_eq!(report.merges, 1);
        assert_eq!(report.bridges, 0);
    }

    #[test]
    fn seven_meter_gap_gets_a_connector() {
        let trails = vec![
            trail("a", &[(0.0, 0.0, 100.0), (0.001, 0.0, 110.0)]),
            trail("b", &[(0.001_063, 0.0, 112.0), (0.002, 0.0, 120.0)]),
        ];
        let (summary, pipeline) = run(trails, no_merge_config());

        let (edges, vertices) = graph_rows(&pipeline);
        assert_eq!(edges.len(), 3);
        assert_eq!(vertices.len(), 4);

        let connector = edges.iter().find(|e| e.name == "Connector").unwrap();
        assert!((connector.length_km * 1_000.0 - 7.0).abs() < 0.2, "{}", connector.length_km);
        assert!(connector.trail_uuid.starts_with("connector:"));

        let report = summary
            .diagnostics
            .report_for(tn_core::StageKind::SnapAndBridge)
            .unwrap();
        assert_eq!(report.bridges, 1);

        // The connector trail carries the gap-filler provenance.
        let stored = pipeline.store().load_trails().unwrap();
        let ct = stored.iter().find(|t| t.trail_type == "connector").unwrap();
        assert_eq!(ct.source, "gap_filler");
    }

    #[test]
    fn wide_gap_is_reported_not_bridged() {
        // 15 m gap with the default 10 m tolerance.
        let trails = vec![
            trail("a", &[(0.0, 0.0, 0.0), (0.001, 0.0, 0.0)]),
            trail("b", &[(0.001_135, 0.0, 0.0), (0.002, 0.0, 0.0)]),
        ];
        let (summary, pipeline) = run(trails, no_merge_config());
        let (edges, _) = graph_rows(&pipeline);
        assert_eq!(edges.len(), 2);

        let report = summary
            .diagnostics
            .report_for(tn_core::StageKind::SnapAndBridge)
            .unwrap();
        assert_eq!(report.bridges, 0);
        assert!(report.skips.iter().any(|s| s.reason == "gap_unbridged"));
    }

    #[test]
    fn degree2_chain_contracts_end_to_end() {
        let trails = vec![
            trail("a", &[(0.0, 0.0, 100.0), (0.001, 0.0, 150.0)]),
            trail("b", &[(0.001, 0.0, 150.0), (0.002, 0.0, 130.0)]),
            trail("c", &[(0.002, 0.0, 130.0), (0.003, 0.0, 180.0)]),
        ];
        let before_km = trails.iter().map(|t| t.length_km).sum::<f64>();
        let (summary, pipeline) = run(trails, PipelineConfig::default());

        let (edges, vertices) = graph_rows(&pipeline);
        assert_eq!(edges.len(), 1);
        assert_eq!(vertices.len(), 2);
        assert!(vertices.iter().all(|v| v.degree == 1));
        assert!((edges[0].length_km - before_km).abs() * 1_000.0 < 3.0);
        assert!(edges[0].trail_uuid.starts_with("merged:"));

        let report = summary
            .diagnostics
            .report_for(tn_core::StageKind::MergeChains)
            .unwrap();
        assert_eq!(report.merges, 2);
    }

    #[test]
    fn self_touching_lasso_decomposes_into_a_bubble() {
        // Stem to (0.001, 0), then a loop that returns through that point.
        let trails = vec![trail(
            "lasso",
            &[
                (0.0, 0.0, 0.0),
                (0.001, 0.0, 0.0),
                (0.002, 0.001, 0.0),
                (0.001, 0.002, 0.0),
                (0.001, 0.0, 0.0),
            ],
        )];
        let (summary, pipeline) = run(trails, PipelineConfig::default());

        let loops = summary
            .diagnostics
            .report_for(tn_core::StageKind::DecomposeLoops)
            .unwrap();
        assert!(loops.splits >= 2); // the touch split, then the ring child

        let stored = pipeline.store().load_trails().unwrap();
        assert!(stored.len() >= 3);
        for t in &stored {
            assert_eq!(t.original_uuid.as_ref().unwrap().as_str(), "lasso");
        }

        let (edges, vertices) = graph_rows(&pipeline);
        // Stem + two ring arcs (the bubble survives chain merging).
        assert_eq!(edges.len(), 3);
        assert_eq!(vertices.len(), 3);
        let touch = vertex_at(&vertices, 0.001, 0.0).unwrap();
        assert_eq!(touch.degree, 3);
    }

    #[test]
    fn closed_ring_becomes_two_arcs() {
        let trails = vec![trail(
            "ring",
            &[
                (0.0, 0.0, 10.0),
                (0.001, 0.0, 12.0),
                (0.001, 0.001, 14.0),
                (0.0, 0.001, 12.0),
                (0.0, 0.0, 10.0),
            ],
        )];
        let (_, pipeline) = run(trails, PipelineConfig::default());
        let (edges, vertices) = graph_rows(&pipeline);
        assert_eq!(edges.len(), 2); // bubble kept by the merger
        assert_eq!(vertices.len(), 2);
        assert!(vertices.iter().all(|v| v.degree == 2));
        assert!(edges.iter().all(|e| e.source != e.target));
    }
}

// ── Pipeline-wide properties ──────────────────────────────────────────────────

#[cfg(test)]
mod properties {
    use super::helpers::*;
    use tn_core::PipelineConfig;
    use tn_graph::geom_length_km;

    use crate::observer::NoopObserver;

    /// A small network exercising every stage: an X crossing, a T junction,
    /// a coincident pair, a bridgeable gap, and a degree-2 chain.
    fn mixed_network() -> Vec<tn_core::Trail> {
        vec![
            trail("cross1", &[(0.0, 0.0, 100.0), (0.002, 0.002, 120.0)]),
            trail("cross2", &[(0.0, 0.002, 110.0), (0.002, 0.0, 130.0)]),
            trail("tee", &[(0.004, 0.000_02, 100.0), (0.004, 0.001, 140.0)]),
            trail("base", &[(0.003, 0.0, 90.0), (0.005, 0.0, 95.0)]),
            trail("chain1", &[(0.006, 0.0, 80.0), (0.007, 0.0, 85.0)]),
            trail("chain2", &[(0.007, 0.0, 85.0), (0.008, 0.0, 88.0)]),
            trail("gapped", &[(0.008_063, 0.0, 88.5), (0.009, 0.0, 92.0)]),
        ]
    }

    #[test]
    fn stored_rows_satisfy_the_model_invariants() {
        let (_, pipeline) = run(mixed_network(), PipelineConfig::default());
        let (edges, vertices) = graph_rows(&pipeline);

        // Edge length matches its geometry.
        for e in &edges {
            assert!(
                (geom_length_km(&e.geom) - e.length_km).abs() < 1e-6,
                "edge {} length drifted",
                e.edge_id
            );
            assert!(e.cost >= 0.0 && e.reverse_cost >= 0.0);
            assert_ne!(e.source, e.target);
        }

        // Edge endpoints coincide with their vertices.
        let by_id: std::collections::HashMap<u32, _> =
            vertices.iter().map(|v| (v.vertex_id, v)).collect();
        for e in &edges {
            let sv = by_id[&e.source];
            let tv = by_id[&e.target];
            assert_eq!(e.geom.first().copied(), Some((sv.lng, sv.lat)));
            assert_eq!(e.geom.last().copied(), Some((tv.lng, tv.lat)));
        }

        // Degrees match incidence.
        for v in &vertices {
            let incident = edges
                .iter()
                .filter(|e| e.source == v.vertex_id || e.target == v.vertex_id)
                .count() as u32;
            assert_eq!(v.degree, incident, "vertex {}", v.vertex_id);
        }

        // No two vertices share rounded coordinates.
        let mut keys: Vec<(i64, i64)> = vertices
            .iter()
            .map(|v| ((v.lng * 1e6).round() as i64, (v.lat * 1e6).round() as i64))
            .collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), vertices.len());

        // No degree-2 vertex survives chain merging in this network
        // (it has no bubbles).
        assert!(vertices.iter().all(|v| v.degree != 2));
    }

    #[test]
    fn rerunning_the_pipeline_changes_nothing() {
        let (_, mut pipeline) = run(mixed_network(), PipelineConfig::default());
        let (edges1, vertices1) = graph_rows(&pipeline);
        let trails1 = pipeline.store().load_trails().unwrap().len();

        pipeline.run(&mut NoopObserver).unwrap();
        let (edges2, vertices2) = graph_rows(&pipeline);
        assert_eq!(pipeline.store().load_trails().unwrap().len(), trails1);
        assert_eq!(edges1, edges2);
        assert_eq!(vertices1, vertices2);
    }

    #[test]
    fn rebuilding_from_trails_reproduces_the_graph() {
        let (_, mut pipeline) = run(mixed_network(), PipelineConfig::default());
        let (edges1, vertices1) = graph_rows(&pipeline);

        pipeline.rebuild_graph(&mut NoopObserver).unwrap();
        let (edges2, vertices2) = graph_rows(&pipeline);
        assert_eq!(edges1, edges2);
        assert_eq!(vertices1, vertices2);
    }

    #[test]
    fn total_length_is_preserved_across_merging() {
        let no_merge = {
            let (_, pipeline) = run(mixed_network(), no_merge_config());
            total_length_km(&graph_rows(&pipeline).0)
        };
        let merged = {
            let (_, pipeline) = run(mixed_network(), PipelineConfig::default());
            total_length_km(&graph_rows(&pipeline).0)
        };
        assert!((no_merge - merged).abs() * 1_000.0 < 1.0, "{no_merge} vs {merged}");
    }

    #[test]
    fn crossing_trails_share_a_vertex_afterwards() {
        let (_, pipeline) = run(mixed_network(), no_merge_config());
        let (edges, vertices) = graph_rows(&pipeline);
        // The X crossing produced a degree-4 vertex whose location is on
        // all four child edges.
        let center = vertex_at(&vertices, 0.001, 0.001).unwrap();
        assert_eq!(center.degree, 4);
        let incident = edges
            .iter()
            .filter(|e| e.source == center.vertex_id || e.target == center.vertex_id)
            .count();
        assert_eq!(incident, 4);
    }
}

// ── Runner behavior ───────────────────────────────────────────────────────────

#[cfg(test)]
mod runner {
    use super::helpers::*;
    use tn_core::{CancelToken, PipelineConfig, StageKind};
    use tn_store::StagingStore;

    use crate::error::PipelineError;
    use crate::observer::{NoopObserver, PipelineObserver};
    use crate::runner::PipelineBuilder;

    #[test]
    fn empty_staging_fails_with_empty_graph() {
        let store = StagingStore::open_in_memory("empty").unwrap();
        let mut pipeline = PipelineBuilder::new(PipelineConfig::default(), store)
            .build()
            .unwrap();
        let err = pipeline.run(&mut NoopObserver).unwrap_err();
        assert!(matches!(err, PipelineError::EmptyGraph));
    }

    #[test]
    fn cancellation_stops_at_the_first_boundary() {
        let mut store = StagingStore::open_in_memory("c").unwrap();
        store
            .insert_trails(&[trail("a", &[(0.0, 0.0, 0.0), (0.001, 0.0, 0.0)])])
            .unwrap();
        let token = CancelToken::new();
        token.cancel();
        let mut pipeline = PipelineBuilder::new(PipelineConfig::default(), store)
            .cancel_token(token)
            .build()
            .unwrap();
        let err = pipeline.run(&mut NoopObserver).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Cancelled { stage: StageKind::DecomposeLoops }
        ));
        // The staging is untouched.
        assert_eq!(pipeline.store().count_trails().unwrap(), 1);
    }

    #[test]
    fn zero_deadline_marks_stages_partial_but_completes() {
        let mut store = StagingStore::open_in_memory("t").unwrap();
        store
            .insert_trails(&[
                trail("a", &[(0.0, 0.0, 0.0), (0.001, 0.0, 0.0)]),
                trail("b", &[(0.001, 0.0, 0.0), (0.002, 0.0, 0.0)]),
            ])
            .unwrap();
        let config = PipelineConfig {
            stage_timeout_s: 0,
            split_stage_timeout_s: 0,
            ..PipelineConfig::default()
        };
        let mut pipeline = PipelineBuilder::new(config, store).build().unwrap();
        let summary = pipeline.run(&mut NoopObserver).unwrap();
        assert!(summary.partial);
        // The graph still got built from the untouched trails.
        assert_eq!(graph_rows(&pipeline).0.len(), 1); // merged chain
    }

    #[test]
    fn invalid_override_is_a_config_error_before_anything_runs() {
        let mut config = PipelineConfig::default();
        assert!(config.apply_override("min_segment_m=-3").is_err());
    }

    #[test]
    fn diagnostics_are_persisted_with_every_stage() {
        let (summary, pipeline) = run(
            vec![
                trail("a", &[(0.0, 0.0, 0.0), (0.001, 0.0, 0.0)]),
                trail("b", &[(0.001, 0.0, 0.0), (0.001, 0.001, 0.0)]),
            ],
            PipelineConfig::default(),
        );
        assert_eq!(summary.diagnostics.stages.len(), 6);
        assert!(summary.diagnostics.connectivity.is_some());

        let payload = pipeline
            .store()
            .last_diagnostic("run")
            .unwrap()
            .expect("run diagnostics persisted");
        let parsed: tn_core::RunDiagnostics = serde_json::from_str(&payload).unwrap();
        assert_eq!(parsed.stages.len(), 6);
        let report = parsed.report_for(StageKind::AnalyzeConnectivity).unwrap();
        assert!(report.elapsed_ms < 60_000);
    }

    #[test]
    fn observer_sees_every_stage_in_order() {
        #[derive(Default)]
        struct Recorder {
            started: Vec<StageKind>,
            ended:   Vec<StageKind>,
            run_end: bool,
        }
        impl PipelineObserver for Recorder {
            fn on_stage_start(&mut self, stage: StageKind) {
                self.started.push(stage);
            }
            fn on_stage_end(&mut self, stage: StageKind, _report: &tn_core::StageReport) {
                self.ended.push(stage);
            }
            fn on_run_end(&mut self, _diag: &tn_core::RunDiagnostics) {
                self.run_end = true;
            }
        }

        let mut store = StagingStore::open_in_memory("obs").unwrap();
        store
            .insert_trails(&[trail("a", &[(0.0, 0.0, 0.0), (0.001, 0.0, 0.0)])])
            .unwrap();
        let mut pipeline = PipelineBuilder::new(PipelineConfig::default(), store)
            .build()
            .unwrap();
        let mut recorder = Recorder::default();
        pipeline.run(&mut recorder).unwrap();

        assert_eq!(recorder.started, StageKind::ALL.to_vec());
        assert_eq!(recorder.ended, StageKind::ALL.to_vec());
        assert!(recorder.run_end);
    }

    #[test]
    fn connectivity_report_scores_a_connected_network() {
        let (summary, _) = run(
            vec![
                trail("a", &[(0.0, 0.0, 0.0), (0.001, 0.0, 0.0)]),
                trail("b", &[(0.001, 0.0, 0.0), (0.001, 0.001, 0.0)]),
                trail("c", &[(0.001, 0.0, 0.0), (0.002, 0.0, 0.0)]),
            ],
            PipelineConfig::default(),
        );
        let report = summary.diagnostics.connectivity.unwrap();
        assert_eq!(report.component_sizes, vec![4]);
        assert_eq!(report.connectivity_score, 1.0);
        assert_eq!(report.isolated_vertices, 0);
    }
}
