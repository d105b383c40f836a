//! CSV writer for enriched rows.

use std::borrow::Cow;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use super::{OutputError, RowSink};
use crate::pipeline::EnrichedRow;
use crate::source::DateWindow;

/// Column names of the output file, in order.
pub const CSV_HEADER: [&str; 5] = [
    "snap_yyyymm",
    "news",
    "related_product",
    "stock_desc",
    "news_summary",
];

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Writes `<dir>/<prefix>_<YYYYMMDD>.csv`, named after the window end date.
#[derive(Debug, Clone)]
pub struct CsvRowWriter {
    dir: PathBuf,
    file_prefix: String,
    utf8_bom: bool,
}

impl CsvRowWriter {
    pub fn new(dir: impl Into<PathBuf>, file_prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            file_prefix: file_prefix.into(),
            utf8_bom: true,
        }
    }

    /// Prepend a UTF-8 byte order mark so spreadsheet tools detect the encoding.
    pub fn with_utf8_bom(mut self, utf8_bom: bool) -> Self {
        self.utf8_bom = utf8_bom;
        self
    }

    pub fn path_for(&self, window: &DateWindow) -> PathBuf {
        self.dir
            .join(format!("{}_{}.csv", self.file_prefix, window.end_tag()))
    }

    fn write_file(&self, path: &Path, rows: &[EnrichedRow]) -> std::io::Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        if self.utf8_bom {
            out.write_all(UTF8_BOM)?;
        }
        write_record(&mut out, &CSV_HEADER)?;
        for row in rows {
            write_record(
                &mut out,
                &[
                    row.date_tag.as_str(),
                    row.text.as_str(),
                    row.related_tags.as_str(),
                    row.stock_tag.as_str(),
                    row.summary.as_str(),
                ],
            )?;
        }
        out.flush()?;
        out.get_ref().sync_all()
    }
}

impl RowSink for CsvRowWriter {
    fn write(&self, window: &DateWindow, rows: &[EnrichedRow]) -> Result<PathBuf, OutputError> {
        fs::create_dir_all(&self.dir).map_err(|source| OutputError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let path = self.path_for(window);
        let tmp = path.with_extension("csv.tmp");
        self.write_file(&tmp, rows).map_err(|source| OutputError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &path).map_err(|source| OutputError::Io {
            path: path.clone(),
            source,
        })?;

        info!(path = %path.display(), rows = rows.len(), "Wrote enriched news");
        Ok(path)
    }
}

fn write_record<W: Write>(out: &mut W, fields: &[&str]) -> std::io::Result<()> {
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.write_all(b",")?;
        }
        out.write_all(escape_field(field).as_bytes())?;
    }
    out.write_all(b"\n")
}

/// Quote a field when it holds a delimiter, quote or line break.
fn escape_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrich::FieldValue;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn window() -> DateWindow {
        DateWindow::new(
            NaiveDate::from_ymd_opt(2026, 10, 16).unwrap(),
            NaiveDate::from_ymd_opt(2026, 10, 17).unwrap(),
        )
        .unwrap()
    }

    fn row(text: &str) -> EnrichedRow {
        EnrichedRow {
            position: 0,
            date_tag: "20261016".to_string(),
            text: text.to_string(),
            related_tags: "半導體".to_string(),
            stock_tag: FieldValue::Present("台積電(2330)".to_string()),
            summary: FieldValue::Present("摘要".to_string()),
        }
    }

    #[test]
    fn test_escape_field() {
        assert_eq!(escape_field("plain"), "plain");
        assert_eq!(escape_field("a,b"), "\"a,b\"");
        assert_eq!(escape_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape_field("line\nbreak"), "\"line\nbreak\"");
    }

    #[test]
    fn test_write_names_file_after_window_end() {
        let dir = TempDir::new().unwrap();
        let writer = CsvRowWriter::new(dir.path(), "enriched_news");

        let path = writer.write(&window(), &[row("新聞, 內文")]).unwrap();

        assert_eq!(path, dir.path().join("enriched_news_20261017.csv"));
        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));
        let content = String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).unwrap();
        let mut lines = content.lines();
        assert_eq!(
            lines.next().unwrap(),
            "snap_yyyymm,news,related_product,stock_desc,news_summary"
        );
        assert_eq!(
            lines.next().unwrap(),
            "20261016,\"新聞, 內文\",半導體,台積電(2330),摘要"
        );
        assert!(!path.with_extension("csv.tmp").exists());
    }

    #[test]
    fn test_write_without_bom_creates_dir() {
        let dir = TempDir::new().unwrap();
        let out_dir = dir.path().join("nested").join("outputs");
        let writer = CsvRowWriter::new(&out_dir, "news").with_utf8_bom(false);

        let path = writer.write(&window(), &[row("x")]).unwrap();
        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.starts_with("snap_yyyymm,"));
    }
}
