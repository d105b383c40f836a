//! SQLite-backed news source.

use std::path::Path;
use std::sync::Mutex;
use std::time::Instant;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rusqlite::types::ValueRef;
use rusqlite::{named_params, Connection, OpenFlags};
use tracing::{debug, info, warn};

use super::{Article, DateWindow, NewsSource, SourceError};

/// Default window query. Selects timestamp, body and classification, in that
/// order, for every row whose publication day falls inside the window.
/// Integer timestamps are unix seconds; SQLite would read them as Julian days.
pub const DEFAULT_QUERY: &str = r#"
SELECT news_date, content, related_product
FROM news
WHERE date(CASE typeof(news_date)
               WHEN 'integer' THEN datetime(news_date, 'unixepoch')
               ELSE news_date
           END) BETWEEN :date_bgn AND :date_end
ORDER BY news_date, rowid
"#;

/// News source reading from a SQLite warehouse extract.
pub struct SqliteNewsSource {
    conn: Mutex<Connection>,
    query: String,
}

impl SqliteNewsSource {
    /// Open an existing database read-only.
    pub fn open(path: &Path, query: Option<String>) -> Result<Self, SourceError> {
        if !path.exists() {
            return Err(SourceError::Database(format!(
                "database file not found: {}",
                path.display()
            )));
        }
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| SourceError::Database(e.to_string()))?;
        Self::with_connection(conn, query)
    }

    /// Wrap an already open connection (useful for testing).
    pub fn with_connection(conn: Connection, query: Option<String>) -> Result<Self, SourceError> {
        let query = query.unwrap_or_else(|| DEFAULT_QUERY.to_string());
        for param in [":date_bgn", ":date_end"] {
            if !query.contains(param) {
                return Err(SourceError::Query(format!(
                    "query must bind {} parameter",
                    param
                )));
            }
        }
        Ok(Self {
            conn: Mutex::new(conn),
            query,
        })
    }
}

impl NewsSource for SqliteNewsSource {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn fetch(&self, window: &DateWindow) -> Result<Vec<Article>, SourceError> {
        let started = Instant::now();
        let conn = self
            .conn
            .lock()
            .map_err(|_| SourceError::Database("connection lock poisoned".to_string()))?;

        let mut stmt = conn
            .prepare(&self.query)
            .map_err(|e| SourceError::Query(e.to_string()))?;
        if stmt.column_count() < 3 {
            return Err(SourceError::Query(format!(
                "query returns {} columns, expected timestamp, body and classification",
                stmt.column_count()
            )));
        }

        let begin = window.begin().format("%Y-%m-%d").to_string();
        let end = window.end().format("%Y-%m-%d").to_string();
        let mut rows = stmt
            .query(named_params! { ":date_bgn": begin, ":date_end": end })
            .map_err(|e| SourceError::Query(e.to_string()))?;

        let mut articles = Vec::new();
        let mut skipped = 0usize;
        while let Some(row) = rows.next().map_err(|e| SourceError::Query(e.to_string()))? {
            let date_tag = row
                .get_ref(0)
                .map_err(|e| SourceError::Query(e.to_string()))
                .map(date_tag_from_value)?;
            let text = row
                .get_ref(1)
                .map_err(|e| SourceError::Query(e.to_string()))
                .map(materialize_text)?;
            let related_tags = row
                .get_ref(2)
                .map_err(|e| SourceError::Query(e.to_string()))
                .map(materialize_text)?
                .unwrap_or_default();

            match (date_tag, text) {
                (Some(date_tag), Some(text)) => articles.push(Article {
                    date_tag,
                    text,
                    related_tags,
                }),
                (date_tag, text) => {
                    skipped += 1;
                    debug!(
                        has_date = date_tag.is_some(),
                        has_text = text.is_some(),
                        "Skipping incomplete source row"
                    );
                }
            }
        }

        if skipped > 0 {
            warn!(skipped, "Skipped rows without timestamp or body");
        }
        if articles.is_empty() {
            warn!(window = %window, "Query result is empty");
        }
        info!(
            rows = articles.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "News query completed"
        );

        Ok(articles)
    }
}

/// Read a text-ish cell into an owned string. Blobs are decoded as lossy UTF-8
/// so large bodies stored as BLOB never escape as raw handles.
fn materialize_text(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Null => None,
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Some(String::from_utf8_lossy(bytes).into_owned())
        }
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
    }
}

/// Convert a timestamp cell into a `YYYYMMDD` tag.
fn date_tag_from_value(value: ValueRef<'_>) -> Option<String> {
    let date = match value {
        ValueRef::Integer(secs) => DateTime::from_timestamp(secs, 0).map(|dt| dt.date_naive()),
        ValueRef::Text(bytes) => std::str::from_utf8(bytes).ok().and_then(parse_date),
        _ => None,
    }?;
    Some(date.format("%Y%m%d").to_string())
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y/%m/%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt.date());
        }
    }
    for format in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Some(date);
        }
    }
    None
}
