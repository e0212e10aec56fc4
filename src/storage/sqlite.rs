//! SQLite-backed reference implementation of [`EdgeStore`].
//!
//! Edges live in a single table with a uniqueness constraint on the edge
//! key `(rel, src_kind, src_id, dst_kind, dst_id)`. Props are stored as a
//! JSON column. `apply_edge_batch` runs inside one transaction, re-reading
//! each updated row and comparing against the expected props before
//! mutating; the first mismatch rolls the whole batch back as a conflict.

use super::{EdgeBatch, EdgeFilter, EdgeStore};
use crate::models::{Edge, EdgeKey, EdgeRecord, EntityKind, Props};
use crate::vocab::RelationshipType;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use sha2::{Digest, Sha256};
use std::path::Path;

/// Storage manager over a single SQLite database.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open or create a store at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Open an in-memory store (tests, ephemeral planning).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self { conn })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS entities (
                kind TEXT NOT NULL,
                id TEXT NOT NULL,
                project_id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                deleted_at TEXT,
                PRIMARY KEY (kind, id)
            );

            CREATE TABLE IF NOT EXISTS edges (
                id TEXT PRIMARY KEY,
                src_kind TEXT NOT NULL,
                src_id TEXT NOT NULL,
                dst_kind TEXT NOT NULL,
                dst_id TEXT NOT NULL,
                rel TEXT NOT NULL,
                props TEXT NOT NULL DEFAULT '{}',
                created_at TEXT NOT NULL,
                UNIQUE (rel, src_kind, src_id, dst_kind, dst_id)
            );

            CREATE INDEX IF NOT EXISTS idx_edges_src ON edges(src_id);
            CREATE INDEX IF NOT EXISTS idx_edges_dst ON edges(dst_id);
            CREATE INDEX IF NOT EXISTS idx_edges_rel ON edges(rel);
            CREATE INDEX IF NOT EXISTS idx_entities_project ON entities(project_id);
            "#,
        )?;
        Ok(())
    }

    /// Insert an entity row (test setup / collaborator convenience; entity
    /// CRUD proper is out of scope).
    pub fn insert_entity(&mut self, kind: EntityKind, id: &str, project_id: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO entities (kind, id, project_id, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![kind.to_string(), id, project_id, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Soft-delete an entity. `entity_exists` stops reporting it.
    pub fn soft_delete_entity(&mut self, kind: EntityKind, id: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE entities SET deleted_at = ?1 WHERE kind = ?2 AND id = ?3",
            params![Utc::now().to_rfc3339(), kind.to_string(), id],
        )?;
        Ok(())
    }

    /// Count all stored edges (test assertions).
    pub fn edge_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM edges", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<(String, String, Edge, String)> {
        Ok((
            row.get::<_, String>(0)?,  // id
            row.get::<_, String>(7)?,  // created_at
            Edge {
                src_kind: parse_text(row, 1)?,
                src_id: row.get(2)?,
                dst_kind: parse_text(row, 3)?,
                dst_id: row.get(4)?,
                rel: parse_text(row, 5)?,
                props: Props::new(), // filled from column 6 by the caller
            },
            row.get::<_, String>(6)?, // props JSON
        ))
    }
}

/// Parse a text column through `FromStr` (entity kinds, relation tokens).
fn parse_text<T>(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = String>,
{
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e: String| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, e)),
        )
    })
}

/// Generate a unique edge id from the edge key plus a timestamp.
pub fn generate_edge_id(key: &EdgeKey) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.to_string().as_bytes());
    hasher.update(
        Utc::now()
            .timestamp_nanos_opt()
            .unwrap_or(0)
            .to_le_bytes(),
    );
    let hash = hasher.finalize();
    let hash_hex = format!("{:x}", hash);
    format!("oge-{}", &hash_hex[..8])
}

const EDGE_COLUMNS: &str = "id, src_kind, src_id, dst_kind, dst_id, rel, props, created_at";

impl EdgeStore for SqliteStore {
    fn scan_edges(&self, filter: &EdgeFilter) -> Result<Vec<EdgeRecord>> {
        let mut sql = format!("SELECT {} FROM edges WHERE 1=1", EDGE_COLUMNS);
        let mut args: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(kind) = filter.src_kind {
            sql.push_str(" AND src_kind = ?");
            args.push(Box::new(kind.to_string()));
        }
        if let Some(id) = &filter.src_id {
            sql.push_str(" AND src_id = ?");
            args.push(Box::new(id.clone()));
        }
        if let Some(kind) = filter.dst_kind {
            sql.push_str(" AND dst_kind = ?");
            args.push(Box::new(kind.to_string()));
        }
        if let Some(id) = &filter.dst_id {
            sql.push_str(" AND dst_id = ?");
            args.push(Box::new(id.clone()));
        }
        if let Some(rels) = &filter.rel_in {
            push_in_clause(&mut sql, "rel", rels.len());
            for rel in rels {
                args.push(Box::new(rel.to_string()));
            }
        }
        if let Some(ids) = &filter.src_id_in {
            push_in_clause(&mut sql, "src_id", ids.len());
            for id in ids {
                args.push(Box::new(id.clone()));
            }
        }
        if let Some(ids) = &filter.dst_id_in {
            push_in_clause(&mut sql, "dst_id", ids.len());
            for id in ids {
                args.push(Box::new(id.clone()));
            }
        }
        sql.push_str(" ORDER BY created_at, id");

        let args_refs: Vec<&dyn rusqlite::ToSql> = args.iter().map(|a| a.as_ref()).collect();
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(args_refs.as_slice(), Self::row_to_record)?;

        let mut records = Vec::new();
        for row in rows {
            let (id, created_at, mut edge, props_json) = row?;
            edge.props = serde_json::from_str(&props_json)?;
            let created_at = created_at
                .parse::<DateTime<Utc>>()
                .map_err(|e| Error::Store(format!("bad created_at on edge {}: {}", id, e)))?;
            records.push(EdgeRecord {
                id,
                created_at,
                edge,
            });
        }
        Ok(records)
    }

    fn entity_exists(&self, kind: EntityKind, id: &str, project_id: &str) -> Result<bool> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM entities
             WHERE kind = ?1 AND id = ?2 AND project_id = ?3 AND deleted_at IS NULL)",
            params![kind.to_string(), id, project_id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    fn apply_edge_batch(&mut self, batch: &EdgeBatch) -> Result<()> {
        let tx = self.conn.transaction()?;

        for key in &batch.deletes {
            tx.execute(
                "DELETE FROM edges
                 WHERE rel = ?1 AND src_kind = ?2 AND src_id = ?3 AND dst_kind = ?4 AND dst_id = ?5",
                params![
                    key.rel.to_string(),
                    key.src_kind.to_string(),
                    key.src_id,
                    key.dst_kind.to_string(),
                    key.dst_id
                ],
            )?;
        }

        for edge in &batch.inserts {
            let key = edge.key();
            tx.execute(
                "INSERT INTO edges (id, src_kind, src_id, dst_kind, dst_id, rel, props, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    generate_edge_id(&key),
                    edge.src_kind.to_string(),
                    edge.src_id,
                    edge.dst_kind.to_string(),
                    edge.dst_id,
                    edge.rel.to_string(),
                    serde_json::to_string(&edge.props)?,
                    Utc::now().to_rfc3339(),
                ],
            )?;
        }

        for update in &batch.updates {
            let key = &update.key;
            let current: Option<String> = tx
                .query_row(
                    "SELECT props FROM edges
                     WHERE rel = ?1 AND src_kind = ?2 AND src_id = ?3 AND dst_kind = ?4 AND dst_id = ?5",
                    params![
                        key.rel.to_string(),
                        key.src_kind.to_string(),
                        key.src_id,
                        key.dst_kind.to_string(),
                        key.dst_id
                    ],
                    |row| row.get(0),
                )
                .optional()?;

            let matches = match current {
                Some(json) => {
                    let current_props: Props = serde_json::from_str(&json)?;
                    current_props == update.expected_props
                }
                None => false,
            };
            if !matches {
                // Drop the transaction: everything rolls back.
                return Err(Error::Conflict);
            }

            tx.execute(
                "UPDATE edges SET props = ?1
                 WHERE rel = ?2 AND src_kind = ?3 AND src_id = ?4 AND dst_kind = ?5 AND dst_id = ?6",
                params![
                    serde_json::to_string(&update.new_props)?,
                    key.rel.to_string(),
                    key.src_kind.to_string(),
                    key.src_id,
                    key.dst_kind.to_string(),
                    key.dst_id
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }
}

fn push_in_clause(sql: &mut String, column: &str, len: usize) {
    // Zero-length IN matches nothing, which is the correct semantics.
    sql.push_str(" AND ");
    sql.push_str(column);
    sql.push_str(" IN (");
    for i in 0..len {
        if i > 0 {
            sql.push(',');
        }
        sql.push('?');
    }
    sql.push(')');
}
