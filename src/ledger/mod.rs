//! Persistent download ledger backed by SQLite.
//!
//! Two relations: `web_pages` (one row per distinct URL) and
//! `page_versions` (one row per fetch attempt). The ledger decides nothing
//! itself; callers consult it to skip already-downloaded pages and record
//! the outcome of every fetch.

pub mod models;
pub mod pool;

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use diesel::prelude::*;
use diesel_async::{RunQueryDsl, SimpleAsyncConnection};

use crate::schema::{page_versions, web_pages};
pub use models::{LatestDownload, NewPage, NewPageVersion, PageRecord, PageVersionRecord};
pub use pool::{AsyncSqlitePool, DieselError};

/// Schema statements, executed idempotently every time a ledger is opened.
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS web_pages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS page_versions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    web_page_id INTEGER NOT NULL REFERENCES web_pages(id),
    source_name TEXT NOT NULL,
    source_file TEXT NOT NULL,
    status_code INTEGER,
    dataset_name TEXT,
    content_file_path TEXT,
    version_date TEXT NOT NULL
);
"#;

/// Parse a datetime string from the database, defaulting to Unix epoch on error.
pub fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::UNIX_EPOCH)
}

/// Fixed-width RFC 3339 timestamp so TEXT ordering matches chronology.
fn now_stamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// A latest-version row joined with its page URL, for listings.
#[derive(diesel::QueryableByName, Debug, Clone)]
pub struct LatestDownloadListing {
    #[diesel(sql_type = diesel::sql_types::Text)]
    pub url: String,
    #[diesel(sql_type = diesel::sql_types::Text)]
    pub source_name: String,
    #[diesel(sql_type = diesel::sql_types::Nullable<diesel::sql_types::Integer>)]
    pub status_code: Option<i32>,
    #[diesel(sql_type = diesel::sql_types::Nullable<diesel::sql_types::Text>)]
    pub content_file_path: Option<String>,
    #[diesel(sql_type = diesel::sql_types::Text)]
    pub version_date: String,
}

#[derive(diesel::QueryableByName)]
struct LastInsertRowId {
    #[diesel(sql_type = diesel::sql_types::BigInt, column_name = "last_insert_rowid()")]
    id: i64,
}

/// The download ledger.
///
/// Opening a ledger creates the schema if it is missing. Connections are
/// created per operation and closed on drop, so there is no explicit close
/// path to forget on errors. Not safe for concurrent writers; all access
/// goes through the single orchestration task.
#[derive(Clone)]
pub struct Ledger {
    pool: AsyncSqlitePool,
}

impl Ledger {
    /// Open a ledger at a filesystem path, creating the schema if absent.
    pub async fn open(path: &Path) -> Result<Self, DieselError> {
        Self::from_url(&path.display().to_string()).await
    }

    /// Open a ledger from a database URL (`sqlite:` prefix optional).
    pub async fn from_url(database_url: &str) -> Result<Self, DieselError> {
        let pool = AsyncSqlitePool::new(database_url);
        let mut conn = pool.get().await?;
        conn.batch_execute(SCHEMA_SQL).await?;
        Ok(Self { pool })
    }

    /// Look up a page id by URL, inserting the page if it is new.
    ///
    /// Idempotent: registering the same URL twice returns the same id.
    pub async fn register_web_page(&self, url: &str) -> Result<i32, DieselError> {
        if let Some(id) = self.get_url_id(url).await? {
            return Ok(id);
        }

        let mut conn = self.pool.get().await?;
        let created_at = now_stamp();
        diesel::insert_into(web_pages::table)
            .values(NewPage {
                url,
                created_at: &created_at,
            })
            .execute(&mut conn)
            .await?;

        // Re-select by the unique URL rather than trusting last_insert_rowid;
        // this stays correct even if the URL was registered moments before.
        web_pages::table
            .filter(web_pages::url.eq(url))
            .select(web_pages::id)
            .first::<i32>(&mut conn)
            .await
    }

    /// Pure lookup of a page id by URL.
    pub async fn get_url_id(&self, url: &str) -> Result<Option<i32>, DieselError> {
        let mut conn = self.pool.get().await?;
        web_pages::table
            .filter(web_pages::url.eq(url))
            .select(web_pages::id)
            .first::<i32>(&mut conn)
            .await
            .optional()
    }

    /// Record one fetch attempt as a new version row. Always inserts.
    ///
    /// `dataset_name` carries the derived relative storage path and
    /// `content_file_path` the final stored path, matching what callers
    /// actually pass for the two fields.
    pub async fn register_download(
        &self,
        url_id: i32,
        source_name: &str,
        source_file: &str,
        dataset_name: &str,
        content_file_path: &str,
        status_code: Option<i32>,
    ) -> Result<i32, DieselError> {
        let mut conn = self.pool.get().await?;
        let version_date = now_stamp();
        diesel::insert_into(page_versions::table)
            .values(NewPageVersion {
                web_page_id: url_id,
                source_name,
                source_file,
                status_code,
                dataset_name: Some(dataset_name),
                content_file_path: Some(content_file_path),
                version_date: &version_date,
            })
            .execute(&mut conn)
            .await?;

        let row: LastInsertRowId = diesel::sql_query("SELECT last_insert_rowid()")
            .get_result(&mut conn)
            .await?;
        Ok(row.id as i32)
    }

    /// Most recent version row for a page, if any fetch was ever recorded.
    pub async fn latest_download(&self, url_id: i32) -> Result<Option<LatestDownload>, DieselError> {
        let mut conn = self.pool.get().await?;
        page_versions::table
            .filter(page_versions::web_page_id.eq(url_id))
            .order((page_versions::version_date.desc(), page_versions::id.desc()))
            .first::<PageVersionRecord>(&mut conn)
            .await
            .optional()
            .map(|opt| opt.map(LatestDownload::from))
    }

    /// The newest version row for every page, via a max-date self-join.
    pub async fn latest_downloads(&self) -> Result<Vec<PageVersionRecord>, DieselError> {
        let mut conn = self.pool.get().await?;
        diesel::sql_query(
            r#"
            SELECT pv.id, pv.web_page_id, pv.source_name, pv.source_file,
                   pv.status_code, pv.dataset_name, pv.content_file_path, pv.version_date
            FROM page_versions AS pv
            JOIN (
                SELECT web_page_id, MAX(version_date) AS latest_date
                FROM page_versions
                GROUP BY web_page_id
            ) AS latest
            ON pv.web_page_id = latest.web_page_id AND pv.version_date = latest.latest_date
            ORDER BY pv.web_page_id
            "#,
        )
        .load::<PageVersionRecord>(&mut conn)
        .await
    }

    /// Newest version per page joined with the page URL, for `harvest ls`.
    pub async fn latest_download_listings(&self) -> Result<Vec<LatestDownloadListing>, DieselError> {
        let mut conn = self.pool.get().await?;
        diesel::sql_query(
            r#"
            SELECT wp.url, pv.source_name, pv.status_code, pv.content_file_path, pv.version_date
            FROM page_versions AS pv
            JOIN (
                SELECT web_page_id, MAX(version_date) AS latest_date
                FROM page_versions
                GROUP BY web_page_id
            ) AS latest
            ON pv.web_page_id = latest.web_page_id AND pv.version_date = latest.latest_date
            JOIN web_pages AS wp ON wp.id = pv.web_page_id
            ORDER BY wp.url
            "#,
        )
        .load::<LatestDownloadListing>(&mut conn)
        .await
    }

    /// Cascade-delete every page whose URL contains `fragment`.
    ///
    /// Versions go first, then the pages. Returns the number of pages removed.
    pub async fn delete_urls_like(&self, fragment: &str) -> Result<usize, DieselError> {
        let mut conn = self.pool.get().await?;
        let pattern = format!("%{}%", fragment);

        let matching_pages = web_pages::table
            .filter(web_pages::url.like(pattern.clone()))
            .select(web_pages::id);
        diesel::delete(
            page_versions::table.filter(page_versions::web_page_id.eq_any(matching_pages)),
        )
        .execute(&mut conn)
        .await?;

        diesel::delete(web_pages::table.filter(web_pages::url.like(pattern)))
            .execute(&mut conn)
            .await
    }

    /// Number of registered pages.
    pub async fn page_count(&self) -> Result<i64, DieselError> {
        let mut conn = self.pool.get().await?;
        web_pages::table
            .select(diesel::dsl::count_star())
            .first(&mut conn)
            .await
    }

    /// Number of recorded versions.
    pub async fn version_count(&self) -> Result<i64, DieselError> {
        let mut conn = self.pool.get().await?;
        page_versions::table
            .select(diesel::dsl::count_star())
            .first(&mut conn)
            .await
    }
}
