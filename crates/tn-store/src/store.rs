//! The per-run staging store.
//!
//! One SQLite database per staging name holds the four tables a run touches:
//! `trails`, `edges`, `vertices`, and the append-only `diagnostics`.
//! Isolation between concurrent runs comes from the name — each name maps to
//! its own database file (or its own in-memory connection in tests), so runs
//! never share a connection.
//!
//! Every mutation method wraps its statements in one transaction: a failed
//! stage write rolls back and leaves the store exactly as it was.

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension};

use tn_core::{Trail, TrailUuid};

use crate::error::{StoreError, StoreResult};
use crate::rows::{decode_line2, decode_line3, encode_line2, encode_line3, EdgeRow, VertexRow};

/// Handle to one staging workspace.
pub struct StagingStore {
    conn: Connection,
    name: String,
    path: Option<PathBuf>,
}

impl StagingStore {
    // ── Construction ──────────────────────────────────────────────────────

    /// Open (or create) the staging database `dir/<name>.sqlite3` and
    /// initialise the schema.
    pub fn open(dir: &Path, name: &str) -> StoreResult<Self> {
        validate_name(name)?;
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("{name}.sqlite3"));
        let conn = Connection::open(&path)?;
        init_schema(&conn)?;
        Ok(Self { conn, name: name.to_owned(), path: Some(path) })
    }

    /// In-memory staging store, used by tests and `--in-memory` runs.
    pub fn open_in_memory(name: &str) -> StoreResult<Self> {
        validate_name(name)?;
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self { conn, name: name.to_owned(), path: None })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // ── Trails ────────────────────────────────────────────────────────────

    /// All trails, ordered by uuid — the canonical iteration order of every
    /// stage.
    pub fn load_trails(&self) -> StoreResult<Vec<Trail>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT uuid, original_uuid, name, region, trail_type, surface, difficulty,
                    source, geom
             FROM trails ORDER BY uuid",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
                row.get::<_, String>(7)?,
                row.get::<_, String>(8)?,
            ))
        })?;

        let mut trails = Vec::new();
        for row in rows {
            let (uuid, original, name, region, trail_type, surface, difficulty, source, geom) =
                row?;
            // Derived scalars are recomputed from the decoded geometry so
            // in-memory state and invariant checks agree after the codec's
            // 7-decimal round-trip.
            let mut t = Trail::new(TrailUuid::new(uuid), decode_line3(&geom)?);
            t.original_uuid = original.map(TrailUuid::new);
            t.name = name;
            t.region = region;
            t.trail_type = trail_type;
            t.surface = surface;
            t.difficulty = difficulty;
            t.source = source;
            trails.push(t);
        }
        Ok(trails)
    }

    pub fn count_trails(&self) -> StoreResult<u64> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM trails", [], |r| r.get(0))?;
        Ok(n as u64)
    }

    /// Replace the whole trails table in one transaction.
    pub fn replace_trails(&mut self, trails: &[Trail]) -> StoreResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM trails", [])?;
        {
            let mut stmt = tx.prepare_cached(INSERT_TRAIL)?;
            for t in trails {
                bind_trail(&mut stmt, t)?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Append trails (import path) in one transaction.
    pub fn insert_trails(&mut self, trails: &[Trail]) -> StoreResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare_cached(INSERT_TRAIL)?;
            for t in trails {
                bind_trail(&mut stmt, t)?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    // ── Graph tables ──────────────────────────────────────────────────────

    /// Replace `edges` and `vertices` together in one transaction.
    pub fn replace_graph(&mut self, edges: &[EdgeRow], vertices: &[VertexRow]) -> StoreResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM edges", [])?;
        tx.execute("DELETE FROM vertices", [])?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO edges (edge_id, source, target, geom, length_km,
                                    elevation_gain, elevation_loss, cost, reverse_cost,
                                    trail_uuid, name, old_id, sub_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            )?;
            for e in edges {
                stmt.execute(params![
                    e.edge_id,
                    e.source,
                    e.target,
                    encode_line2(&e.geom),
                    e.length_km,
                    e.elevation_gain,
                    e.elevation_loss,
                    e.cost,
                    e.reverse_cost,
                    e.trail_uuid,
                    e.name,
                    e.old_id,
                    e.sub_id,
                ])?;
            }
        }
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO vertices (vertex_id, lng, lat, degree) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for v in vertices {
                stmt.execute(params![v.vertex_id, v.lng, v.lat, v.degree])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn load_edges(&self) -> StoreResult<Vec<EdgeRow>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT edge_id, source, target, geom, length_km, elevation_gain, elevation_loss,
                    cost, reverse_cost, trail_uuid, name, old_id, sub_id
             FROM edges ORDER BY edge_id",
        )?;
        let rows = stmt.query_map([], |row| {
            let edge = EdgeRow {
                edge_id:        row.get(0)?,
                source:         row.get(1)?,
                target:         row.get(2)?,
                geom:           Vec::new(), // decoded below, outside rusqlite's error type
                length_km:      row.get(4)?,
                elevation_gain: row.get(5)?,
                elevation_loss: row.get(6)?,
                cost:           row.get(7)?,
                reverse_cost:   row.get(8)?,
                trail_uuid:     row.get(9)?,
                name:           row.get(10)?,
                old_id:         row.get(11)?,
                sub_id:         row.get(12)?,
            };
            Ok((edge, row.get::<_, String>(3)?))
        })?;

        let mut edges = Vec::new();
        for row in rows {
            let (mut e, geom) = row?;
            e.geom = decode_line2(&geom)?;
            edges.push(e);
        }
        Ok(edges)
    }

    pub fn load_vertices(&self) -> StoreResult<Vec<VertexRow>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT vertex_id, lng, lat, degree FROM vertices ORDER BY vertex_id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(VertexRow {
                vertex_id: row.get(0)?,
                lng:       row.get(1)?,
                lat:       row.get(2)?,
                degree:    row.get(3)?,
            })
        })?;
        rows.map(|r| r.map_err(StoreError::from)).collect()
    }

    // ── Diagnostics ───────────────────────────────────────────────────────

    /// Append one diagnostics payload.  The table is append-only; nothing
    /// ever rewrites it.
    pub fn append_diagnostics(&mut self, label: &str, payload_json: &str) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO diagnostics (label, payload) VALUES (?1, ?2)",
            params![label, payload_json],
        )?;
        Ok(())
    }

    pub fn load_diagnostics(&self) -> StoreResult<Vec<(String, String)>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT label, payload FROM diagnostics ORDER BY seq")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        rows.map(|r| r.map_err(StoreError::from)).collect()
    }

    /// Most recent payload for `label`, if any.
    pub fn last_diagnostic(&self, label: &str) -> StoreResult<Option<String>> {
        let row = self
            .conn
            .query_row(
                "SELECT payload FROM diagnostics WHERE label = ?1 ORDER BY seq DESC LIMIT 1",
                params![label],
                |r| r.get(0),
            )
            .optional()?;
        Ok(row)
    }

    // ── Teardown ──────────────────────────────────────────────────────────

    /// Remove all traces of the run: drop every table, and delete the
    /// database file for on-disk stores.  Idempotent — tearing down a
    /// staging that was already torn down is a no-op.
    pub fn teardown(self) -> StoreResult<()> {
        self.conn.execute_batch(
            "DROP TABLE IF EXISTS trails;
             DROP TABLE IF EXISTS edges;
             DROP TABLE IF EXISTS vertices;
             DROP TABLE IF EXISTS diagnostics;",
        )?;
        let path = self.path.clone();
        drop(self.conn);
        if let Some(path) = path {
            match std::fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

// ── Schema ────────────────────────────────────────────────────────────────────

fn init_schema(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous  = NORMAL;
         PRAGMA foreign_keys = ON;

         CREATE TABLE IF NOT EXISTS trails (
             uuid           TEXT PRIMARY KEY,
             original_uuid  TEXT,
             name           TEXT NOT NULL DEFAULT '',
             region         TEXT NOT NULL DEFAULT '',
             trail_type     TEXT NOT NULL DEFAULT '',
             surface        TEXT NOT NULL DEFAULT '',
             difficulty     TEXT NOT NULL DEFAULT '',
             source         TEXT NOT NULL DEFAULT 'import',
             geom           TEXT NOT NULL,
             length_km      REAL NOT NULL,
             elevation_gain REAL NOT NULL,
             elevation_loss REAL NOT NULL,
             min_elevation  REAL NOT NULL,
             max_elevation  REAL NOT NULL,
             avg_elevation  REAL NOT NULL,
             bbox_min_lng   REAL NOT NULL,
             bbox_min_lat   REAL NOT NULL,
             bbox_max_lng   REAL NOT NULL,
             bbox_max_lat   REAL NOT NULL
         );
         CREATE INDEX IF NOT EXISTS trails_bbox
             ON trails (bbox_min_lng, bbox_max_lng, bbox_min_lat, bbox_max_lat);

         CREATE TABLE IF NOT EXISTS edges (
             edge_id        INTEGER PRIMARY KEY,
             source         INTEGER NOT NULL,
             target         INTEGER NOT NULL,
             geom           TEXT NOT NULL,
             length_km      REAL NOT NULL,
             elevation_gain REAL NOT NULL,
             elevation_loss REAL NOT NULL,
             cost           REAL NOT NULL,
             reverse_cost   REAL NOT NULL,
             trail_uuid     TEXT NOT NULL,
             name           TEXT NOT NULL DEFAULT '',
             old_id         INTEGER,
             sub_id         INTEGER
         );
         CREATE INDEX IF NOT EXISTS edges_source ON edges (source);
         CREATE INDEX IF NOT EXISTS edges_target ON edges (target);

         CREATE TABLE IF NOT EXISTS vertices (
             vertex_id INTEGER PRIMARY KEY,
             lng       REAL NOT NULL,
             lat       REAL NOT NULL,
             degree    INTEGER NOT NULL
         );

         CREATE TABLE IF NOT EXISTS diagnostics (
             seq     INTEGER PRIMARY KEY AUTOINCREMENT,
             label   TEXT NOT NULL,
             payload TEXT NOT NULL
         );",
    )?;
    Ok(())
}

const INSERT_TRAIL: &str = "INSERT INTO trails
    (uuid, original_uuid, name, region, trail_type, surface, difficulty, source, geom,
     length_km, elevation_gain, elevation_loss, min_elevation, max_elevation, avg_elevation,
     bbox_min_lng, bbox_min_lat, bbox_max_lng, bbox_max_lat)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)";

fn bind_trail(stmt: &mut rusqlite::CachedStatement<'_>, t: &Trail) -> StoreResult<()> {
    stmt.execute(params![
        t.uuid.as_str(),
        t.original_uuid.as_ref().map(|u| u.as_str()),
        t.name,
        t.region,
        t.trail_type,
        t.surface,
        t.difficulty,
        t.source,
        encode_line3(&t.geometry),
        t.length_km,
        t.elevation_gain,
        t.elevation_loss,
        t.min_elevation,
        t.max_elevation,
        t.avg_elevation,
        t.bbox.min_lng,
        t.bbox.min_lat,
        t.bbox.max_lng,
        t.bbox.max_lat,
    ])?;
    Ok(())
}

/// Staging names become file names; keep them to a safe alphabet.
fn validate_name(name: &str) -> StoreResult<()> {
    let ok = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if ok {
        Ok(())
    } else {
        Err(StoreError::InvalidName(name.to_owned()))
    }
}
