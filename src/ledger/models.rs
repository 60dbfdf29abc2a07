//! Diesel ORM models for the ledger tables.

use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::schema;

/// Web page record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::web_pages)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PageRecord {
    pub id: i32,
    pub url: String,
    pub created_at: String,
}

/// New web page for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::web_pages)]
pub struct NewPage<'a> {
    pub url: &'a str,
    pub created_at: &'a str,
}

/// Page version record from the database.
///
/// Derives QueryableByName as well so the max-date self-join in
/// `Ledger::latest_downloads` can load it from a raw query.
#[derive(Queryable, QueryableByName, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::page_versions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PageVersionRecord {
    pub id: i32,
    pub web_page_id: i32,
    pub source_name: String,
    pub source_file: String,
    pub status_code: Option<i32>,
    pub dataset_name: Option<String>,
    pub content_file_path: Option<String>,
    pub version_date: String,
}

/// New page version for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::page_versions)]
pub struct NewPageVersion<'a> {
    pub web_page_id: i32,
    pub source_name: &'a str,
    pub source_file: &'a str,
    pub status_code: Option<i32>,
    pub dataset_name: Option<&'a str>,
    pub content_file_path: Option<&'a str>,
    pub version_date: &'a str,
}

/// The most recent download recorded for a page.
#[derive(Debug, Clone)]
pub struct LatestDownload {
    pub content_file_path: Option<String>,
    pub dataset_name: Option<String>,
    pub version_date: DateTime<Utc>,
}

impl From<PageVersionRecord> for LatestDownload {
    fn from(record: PageVersionRecord) -> Self {
        LatestDownload {
            content_file_path: record.content_file_path,
            dataset_name: record.dataset_name,
            version_date: super::parse_datetime(&record.version_date),
        }
    }
}
