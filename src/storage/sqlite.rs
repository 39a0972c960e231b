//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::catalog::{College, CollegeField};
use crate::config::CollectionMode;
use crate::output::SweepSummary;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus};
use crate::SweepError;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const COLLEGE_COLUMNS: &str = "id, name, city, state, address, phone, site, image_url, \
     college_page_url, created_at, updated_at, is_deprecated";

const RUN_COLUMNS: &str = "id, started_at, finished_at, config_hash, status, start_page, mode, \
     pages_visited, added, updated, deleted, details_fetched, details_failed, error_message";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(SweepError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, SweepError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> Result<Self, SweepError> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn parse_timestamp(idx: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    value
        .parse::<DateTime<Utc>>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn college_from_row(row: &Row<'_>) -> rusqlite::Result<College> {
    let created_at: String = row.get(9)?;
    let updated_at: Option<String> = row.get(10)?;

    Ok(College {
        id: Some(row.get(0)?),
        name: row.get(1)?,
        city: row.get(2)?,
        state: row.get(3)?,
        address: row.get(4)?,
        phone: row.get(5)?,
        site: row.get(6)?,
        image_url: row.get(7)?,
        college_page_url: row.get(8)?,
        created_at: parse_timestamp(9, &created_at)?,
        updated_at: updated_at
            .as_deref()
            .map(|value| parse_timestamp(10, value))
            .transpose()?,
        is_deprecated: row.get(11)?,
    })
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?).unwrap_or(RunStatus::Failed),
        start_page: row.get(5)?,
        mode: CollectionMode::from_str_opt(&row.get::<_, String>(6)?).unwrap_or_default(),
        pages_visited: row.get::<_, i64>(7)? as u64,
        added: row.get::<_, i64>(8)? as u64,
        updated: row.get::<_, i64>(9)? as u64,
        deleted: row.get::<_, Option<i64>>(10)?.map(|d| d as u64),
        details_fetched: row.get::<_, i64>(11)? as u64,
        details_failed: row.get::<_, i64>(12)? as u64,
        error_message: row.get(13)?,
    })
}

/// Inserts or updates one college on the given connection
///
/// Shared by `upsert` and the transactional `save_all`.
fn upsert_on(conn: &Connection, college: &mut College) -> StorageResult<()> {
    match college.id {
        None => {
            conn.execute(
                "INSERT INTO colleges (name, city, state, address, phone, site, image_url,
                 college_page_url, created_at, updated_at, is_deprecated)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, NULL, ?10)",
                params![
                    college.name,
                    college.city,
                    college.state,
                    college.address,
                    college.phone,
                    college.site,
                    college.image_url,
                    college.college_page_url,
                    college.created_at.to_rfc3339(),
                    college.is_deprecated,
                ],
            )?;
            college.id = Some(conn.last_insert_rowid());
        }
        Some(id) => {
            let now = Utc::now();
            let changed = conn.execute(
                "UPDATE colleges SET name = ?1, city = ?2, state = ?3, address = ?4, phone = ?5,
                 site = ?6, image_url = ?7, college_page_url = ?8, updated_at = ?9,
                 is_deprecated = ?10 WHERE id = ?11",
                params![
                    college.name,
                    college.city,
                    college.state,
                    college.address,
                    college.phone,
                    college.site,
                    college.image_url,
                    college.college_page_url,
                    now.to_rfc3339(),
                    college.is_deprecated,
                    id,
                ],
            )?;
            if changed == 0 {
                return Err(StorageError::CollegeNotFound(id));
            }
            college.updated_at = Some(now);
        }
    }
    Ok(())
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(
        &mut self,
        config_hash: &str,
        start_page: u32,
        mode: CollectionMode,
    ) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status, start_page, mode)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                now,
                config_hash,
                RunStatus::Running.to_db_string(),
                start_page,
                mode.as_str()
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn complete_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        summary: &SweepSummary,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let changed = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, pages_visited = ?3, added = ?4,
             updated = ?5, deleted = ?6, details_fetched = ?7, details_failed = ?8
             WHERE id = ?9",
            params![
                status.to_db_string(),
                now,
                summary.pages_visited as i64,
                summary.added as i64,
                summary.updated as i64,
                summary.deleted.map(|d| d as i64),
                summary.details_fetched as i64,
                summary.details_failed as i64,
                run_id
            ],
        )?;
        if changed == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn fail_run(&mut self, run_id: i64, error: &str) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let changed = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, error_message = ?3 WHERE id = ?4",
            params![RunStatus::Failed.to_db_string(), now, error, run_id],
        )?;
        if changed == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS),
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                &format!("SELECT {} FROM runs ORDER BY id DESC LIMIT 1", RUN_COLUMNS),
                [],
                run_from_row,
            )
            .optional()?;
        Ok(run)
    }

    fn list_runs(&self, limit: usize) -> StorageResult<Vec<RunRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM runs ORDER BY id DESC LIMIT ?1",
            RUN_COLUMNS
        ))?;

        let runs = stmt
            .query_map(params![limit as i64], run_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(runs)
    }

    // ===== Catalog =====

    fn mark_all_deprecated(&mut self) -> StorageResult<u64> {
        let count = self
            .conn
            .execute("UPDATE colleges SET is_deprecated = 1", [])?;
        Ok(count as u64)
    }

    fn find_by_name(&self, name: &str) -> StorageResult<Option<College>> {
        let college = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM colleges WHERE name = ?1 ORDER BY id LIMIT 1",
                    COLLEGE_COLUMNS
                ),
                params![name],
                college_from_row,
            )
            .optional()?;
        Ok(college)
    }

    fn get_college(&self, id: i64) -> StorageResult<College> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM colleges WHERE id = ?1", COLLEGE_COLUMNS),
                params![id],
                college_from_row,
            )
            .optional()?
            .ok_or(StorageError::CollegeNotFound(id))
    }

    fn upsert(&mut self, college: &mut College) -> StorageResult<()> {
        upsert_on(&self.conn, college)
    }

    fn save_all(&mut self, colleges: &mut [College]) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        for college in colleges.iter_mut() {
            upsert_on(&tx, college)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn delete_where_deprecated(&mut self) -> StorageResult<u64> {
        let count = self
            .conn
            .execute("DELETE FROM colleges WHERE is_deprecated = 1", [])?;
        Ok(count as u64)
    }

    fn find_all(&self) -> StorageResult<Vec<College>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM colleges ORDER BY name, id",
            COLLEGE_COLUMNS
        ))?;

        let colleges = stmt
            .query_map([], college_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(colleges)
    }

    // ===== Statistics =====

    fn count_colleges(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM colleges", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_deprecated(&self) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM colleges WHERE is_deprecated = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_with_field(&self, field: CollegeField) -> StorageResult<u64> {
        let column = field.column();
        let count: i64 = self.conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM colleges WHERE {} IS NOT NULL AND {} != ''",
                column, column
            ),
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_by_state(&self) -> StorageResult<Vec<(String, u64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT state, COUNT(*) AS count FROM colleges
             WHERE state IS NOT NULL AND state != ''
             GROUP BY state ORDER BY count DESC, state",
        )?;

        let states = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get::<_, i64>(1)? as u64)))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(states)
    }
}
