use std::path::{Path, PathBuf};
use std::time::Duration;

use bytemuck::{cast_slice, pod_collect_to_vec};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use tracing::debug;

use crate::{
    check_dimension, nearest, IndexEntry, IndexError, IndexSchema, Neighbor, Result, VectorIndex,
};

const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

/// Index persisted in a SQLite database file.
///
/// Every call opens its own connection so the value can be shared across
/// worker threads; WAL mode plus a busy timeout lets concurrent writers
/// queue instead of failing.
#[derive(Clone)]
pub struct SqliteIndex {
    path: PathBuf,
}

impl SqliteIndex {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let index = Self {
            path: path.as_ref().to_path_buf(),
        };
        index.init()?;
        Ok(index)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connection(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(conn)
    }

    fn init(&self) -> Result<()> {
        let conn = self.connection()?;
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            CREATE TABLE IF NOT EXISTS vector_indexes (
                name TEXT PRIMARY KEY,
                schema TEXT NOT NULL,
                created_at TEXT DEFAULT CURRENT_TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS vector_entries (
                id TEXT PRIMARY KEY,
                index_name TEXT NOT NULL,
                customer_name TEXT NOT NULL,
                file TEXT NOT NULL,
                vector BLOB NOT NULL,
                created_at TEXT DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY(index_name) REFERENCES vector_indexes(name)
            );
            CREATE INDEX IF NOT EXISTS idx_entries_customer
                ON vector_entries(index_name, customer_name);
            "#,
        )?;
        Ok(())
    }

    fn load_schema(conn: &Connection, name: &str) -> Result<Option<IndexSchema>> {
        let raw: Option<String> = conn
            .query_row(
                "SELECT schema FROM vector_indexes WHERE name = ?1",
                [name],
                |row| row.get(0),
            )
            .optional()?;
        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn require_schema(conn: &Connection, name: &str) -> Result<IndexSchema> {
        Self::load_schema(conn, name)?.ok_or_else(|| IndexError::Missing(name.to_string()))
    }
}

impl VectorIndex for SqliteIndex {
    fn exists(&self, name: &str) -> Result<bool> {
        let conn = self.connection()?;
        Ok(Self::load_schema(&conn, name)?.is_some())
    }

    fn schema(&self, name: &str) -> Result<Option<IndexSchema>> {
        let conn = self.connection()?;
        Self::load_schema(&conn, name)
    }

    fn create(&self, schema: &IndexSchema) -> Result<()> {
        let conn = self.connection()?;
        let json = serde_json::to_string(schema)?;
        match conn.execute(
            "INSERT INTO vector_indexes (name, schema) VALUES (?1, ?2)",
            params![schema.name, json],
        ) {
            Ok(_) => {
                debug!(index = %schema.name, path = %self.path.display(), "created sqlite index");
                Ok(())
            }
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Err(IndexError::AlreadyExists(schema.name.clone()))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn query(
        &self,
        name: &str,
        customer_name: &str,
        vector: &[f32],
        k: usize,
    ) -> Result<Vec<Neighbor>> {
        let conn = self.connection()?;
        let schema = Self::require_schema(&conn, name)?;
        check_dimension(&schema, vector)?;
        let mut stmt = conn.prepare(
            "SELECT id, file, vector FROM vector_entries WHERE index_name = ?1 AND customer_name = ?2",
        )?;
        let mut rows = stmt.query(params![name, customer_name])?;
        let mut stored = Vec::new();
        while let Some(row) = rows.next()? {
            let id: String = row.get(0)?;
            let file: String = row.get(1)?;
            let blob: Vec<u8> = row.get(2)?;
            if blob.len() % std::mem::size_of::<f32>() != 0 {
                return Err(IndexError::CorruptVector(id));
            }
            let values: Vec<f32> = pod_collect_to_vec(&blob[..]);
            stored.push((id, file, values));
        }
        let candidates = stored
            .iter()
            .map(|(id, file, values)| (id.as_str(), file.as_str(), values.as_slice()));
        Ok(nearest(&schema, candidates, vector, k))
    }

    fn insert(&self, name: &str, entry: &IndexEntry) -> Result<()> {
        let conn = self.connection()?;
        let schema = Self::require_schema(&conn, name)?;
        check_dimension(&schema, &entry.vector)?;
        let blob = cast_slice::<f32, u8>(&entry.vector);
        match conn.execute(
            "INSERT INTO vector_entries (id, index_name, customer_name, file, vector) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![entry.id, name, entry.customer_name, entry.file, blob],
        ) {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Err(IndexError::DuplicateId(entry.id.clone()))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn len(&self, name: &str) -> Result<usize> {
        let conn = self.connection()?;
        Self::require_schema(&conn, name)?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM vector_entries WHERE index_name = ?1",
            [name],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}
