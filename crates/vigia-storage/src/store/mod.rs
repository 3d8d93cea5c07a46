use anyhow::Result;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection};
use std::path::Path;

use crate::error::StorageError;

pub mod action;
pub mod catalog;
pub mod dashboard;
pub mod folio;
pub mod follow_up;
pub mod report;
pub mod user;

pub use catalog::CatalogSync;

/// Access layer over the application database.
///
/// Every method is an `async fn` on top of SeaORM + SQLite. Writes that touch
/// more than one row run inside a single transaction.
pub struct Store {
    pub(crate) db: DatabaseConnection,
}

impl Store {
    /// Connects to `db_url` and brings the schema up to date.
    ///
    /// `data_dir` is created first so that a relative SQLite file URL such as
    /// `sqlite://data/vigia.db?mode=rwc` can be opened on a fresh checkout.
    pub async fn new(db_url: &str, data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let db = Database::connect(db_url).await?;

        if db_url.starts_with("sqlite:") {
            db.execute_unprepared("PRAGMA journal_mode=WAL;").await?;
        }

        Migrator::up(&db, None).await?;

        tracing::info!(db_url = %db_url, "Initialized store");
        Ok(Self { db })
    }

    pub(crate) fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

pub(crate) fn now() -> DateTime<FixedOffset> {
    Utc::now().fixed_offset()
}

/// Returns the trimmed value, or a validation error naming `field` when it is
/// absent or blank.
pub(crate) fn required<'a>(
    field: &'static str,
    value: Option<&'a str>,
) -> crate::error::Result<&'a str> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(StorageError::Validation(format!("{field} is required"))),
    }
}

/// Trimmed value, `None` when absent or blank.
pub(crate) fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

pub(crate) fn text_or_empty(value: Option<&str>) -> String {
    present(value).unwrap_or_default().to_string()
}

pub(crate) fn parse_date(field: &'static str, value: &str) -> crate::error::Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        StorageError::Validation(format!("{field} must be a date in YYYY-MM-DD format"))
    })
}

pub(crate) fn parse_optional_date(
    field: &'static str,
    value: Option<&str>,
) -> crate::error::Result<Option<NaiveDate>> {
    present(value).map(|v| parse_date(field, v)).transpose()
}

pub(crate) fn check_percentage(value: i32) -> crate::error::Result<i32> {
    if (0..=100).contains(&value) {
        Ok(value)
    } else {
        Err(StorageError::Validation(
            "progress_percentage must be between 0 and 100".to_string(),
        ))
    }
}

/// Parses a status or role column written by this crate.
pub(crate) fn parse_column<T>(column: &'static str, value: &str) -> crate::error::Result<T>
where
    T: std::str::FromStr,
{
    value.parse().map_err(|_| StorageError::UnexpectedValue {
        column,
        value: value.to_string(),
    })
}
