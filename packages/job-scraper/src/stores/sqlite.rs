//! SQLite sink.
//!
//! A file-based store for job records. Each source's batch is written in a
//! single transaction; the link hash is the primary key, so re-inserting a
//! known posting is a no-op.

use async_trait::async_trait;
use chrono::SecondsFormat;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;

use crate::error::{SinkError, SinkResult};
use crate::hashing::LinkHash;
use crate::record::JobRecord;
use crate::traits::sink::{DedupIndex, JobSink};

/// SQLite-backed job sink.
pub struct SqliteSink {
    pool: SqlitePool,
}

impl SqliteSink {
    /// Connect and create the schema if needed.
    ///
    /// # Example URLs
    /// - `sqlite::memory:` - In-memory database (ephemeral)
    /// - `sqlite://jobs.db?mode=rwc` - File-based, created if missing
    pub async fn new(database_url: &str) -> SinkResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(|e| SinkError::Storage(Box::new(e)))?;

        let sink = Self { pool };
        sink.run_migrations().await?;
        Ok(sink)
    }

    /// Create an in-memory sink (for testing).
    ///
    /// Each SQLite memory connection is its own database, so the pool is
    /// held to a single connection.
    pub async fn in_memory() -> SinkResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| SinkError::Storage(Box::new(e)))?;

        let sink = Self { pool };
        sink.run_migrations().await?;
        Ok(sink)
    }

    /// Run database migrations.
    async fn run_migrations(&self) -> SinkResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS job_records (
                link_hash BLOB PRIMARY KEY,
                company TEXT NOT NULL,
                job_title TEXT NOT NULL,
                industry TEXT NOT NULL,
                location TEXT NOT NULL,
                responsibilities TEXT NOT NULL DEFAULT '[]',
                qualifications TEXT NOT NULL DEFAULT '[]',
                skills TEXT NOT NULL DEFAULT '[]',
                captured_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_job_records_company ON job_records(company);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| SinkError::Storage(Box::new(e)))?;

        Ok(())
    }

    /// Number of stored records.
    pub async fn count(&self) -> SinkResult<usize> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM job_records")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| SinkError::Storage(Box::new(e)))?;
        Ok(count.max(0) as usize)
    }

    /// Load one record by link hash.
    pub async fn get(&self, hash: &LinkHash) -> SinkResult<Option<JobRecord>> {
        let row: Option<JobRow> = sqlx::query_as(
            r#"
            SELECT link_hash, company, job_title, industry, location,
                   responsibilities, qualifications, skills, captured_at
            FROM job_records
            WHERE link_hash = ?
            "#,
        )
        .bind(hash.as_bytes().as_slice())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| SinkError::Storage(Box::new(e)))?;

        row.map(JobRow::into_record).transpose()
    }
}

// Row type for sqlx queries
#[derive(Debug, FromRow)]
struct JobRow {
    link_hash: Vec<u8>,
    company: String,
    job_title: String,
    industry: String,
    location: String,
    responsibilities: String,
    qualifications: String,
    skills: String,
    captured_at: String,
}

impl JobRow {
    fn into_record(self) -> SinkResult<JobRecord> {
        let source_link_hash = LinkHash::from_slice(&self.link_hash)
            .ok_or_else(|| SinkError::storage("stored link hash is not 32 bytes"))?;

        let captured_at = chrono::DateTime::parse_from_rfc3339(&self.captured_at)
            .map_err(|e| SinkError::storage(format!("Invalid date: {}", e)))?
            .with_timezone(&chrono::Utc);

        let list = |raw: &str| -> SinkResult<Vec<String>> {
            serde_json::from_str(raw)
                .map_err(|e| SinkError::storage(format!("Invalid list JSON: {}", e)))
        };

        Ok(JobRecord {
            company: self.company,
            job_title: self.job_title,
            industry: self.industry,
            location: self.location,
            responsibilities: list(&self.responsibilities)?,
            qualifications: list(&self.qualifications)?,
            skills: list(&self.skills)?,
            source_link_hash,
            captured_at,
        })
    }
}

fn list_json(items: &[String]) -> SinkResult<String> {
    serde_json::to_string(items).map_err(|e| SinkError::Storage(Box::new(e)))
}

#[async_trait]
impl DedupIndex for SqliteSink {
    async fn exists(&self, hash: &LinkHash) -> SinkResult<bool> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM job_records WHERE link_hash = ?")
            .bind(hash.as_bytes().as_slice())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| SinkError::Storage(Box::new(e)))?;
        Ok(row.is_some())
    }
}

#[async_trait]
impl JobSink for SqliteSink {
    async fn write_batch(&self, records: &[JobRecord]) -> SinkResult<usize> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| SinkError::Storage(Box::new(e)))?;

        let mut written = 0;
        for record in records {
            let result = sqlx::query(
                r#"
                INSERT OR IGNORE INTO job_records
                    (link_hash, company, job_title, industry, location,
                     responsibilities, qualifications, skills, captured_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(record.source_link_hash.as_bytes().as_slice())
            .bind(&record.company)
            .bind(&record.job_title)
            .bind(&record.industry)
            .bind(&record.location)
            .bind(list_json(&record.responsibilities)?)
            .bind(list_json(&record.qualifications)?)
            .bind(list_json(&record.skills)?)
            .bind(record.captured_at.to_rfc3339_opts(SecondsFormat::Micros, true))
            .execute(&mut *tx)
            .await;

            match result {
                Ok(done) => written += done.rows_affected() as usize,
                Err(e) => {
                    // Dropping `tx` rolls the batch back.
                    return Err(SinkError::PartialWrite {
                        written,
                        expected: records.len(),
                        source: Box::new(e),
                    });
                }
            }
        }

        tx.commit()
            .await
            .map_err(|e| SinkError::Storage(Box::new(e)))?;
        Ok(written)
    }

    fn name(&self) -> &str {
        "sqlite"
    }
}
