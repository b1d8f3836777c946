//! Holiday calendars stored as files in a directory.
//!
//! Calendar `US` is read from `<dir>/US.csv` or, failing that, `<dir>/US.txt`.
//! Each CSV record holds one date in its first field; further fields (a
//! holiday name, say) are ignored. Blank lines and lines starting with `#`
//! are skipped, and an unparsable first record is taken to be a header.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use csv::{ReaderBuilder, Trim};
use tabflow_model::{CalendarError, HolidayProvider};
use tabflow_transform::DEFAULT_DATE_FORMATS;
use tabflow_transform::dates::parse_date_any;
use tracing::debug;

use crate::error::{IngestError, Result};

/// Extensions tried, in order, for a calendar key.
pub const CALENDAR_EXTENSIONS: &[&str] = &["csv", "txt"];

/// [`HolidayProvider`] backed by a directory of date lists.
#[derive(Debug, Clone)]
pub struct CalendarDirectory {
    root: PathBuf,
    date_formats: Vec<String>,
}

impl CalendarDirectory {
    /// Open a calendar directory. Files are only read on lookup.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(IngestError::DirectoryNotFound { path: root });
        }
        Ok(Self {
            root,
            date_formats: DEFAULT_DATE_FORMATS.iter().map(|f| (*f).to_string()).collect(),
        })
    }

    /// Override the date formats tried for each line.
    #[must_use]
    pub fn with_date_formats<I, S>(mut self, formats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.date_formats = formats.into_iter().map(Into::into).collect();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn locate(&self, key: &str) -> Option<PathBuf> {
        CALENDAR_EXTENSIONS
            .iter()
            .map(|ext| self.root.join(format!("{key}.{ext}")))
            .find(|path| path.is_file())
    }

    fn parse(&self, key: &str, text: &str) -> std::result::Result<BTreeSet<NaiveDate>, CalendarError> {
        let load_error = |message: String| CalendarError::Load {
            key: key.to_string(),
            message,
        };
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .comment(Some(b'#'))
            .trim(Trim::All)
            .from_reader(text.as_bytes());

        let mut dates = BTreeSet::new();
        let mut first = true;
        for result in reader.records() {
            let record = result.map_err(|e| load_error(e.to_string()))?;
            let field = record.get(0).unwrap_or_default().trim_start_matches('\u{feff}');
            if field.is_empty() {
                continue;
            }
            match parse_date_any(field, &self.date_formats) {
                Some(date) => {
                    dates.insert(date);
                }
                None if first => debug!(calendar = key, header = field, "skipping header"),
                None => {
                    let line = record.position().map_or(0, csv::Position::line);
                    return Err(load_error(format!("line {line}: invalid date `{field}`")));
                }
            }
            first = false;
        }
        Ok(dates)
    }
}

fn valid_key(key: &str) -> bool {
    !key.is_empty()
        && key != "."
        && key != ".."
        && !key.contains(['/', '\\'])
}

impl HolidayProvider for CalendarDirectory {
    fn holidays(&self, key: &str) -> std::result::Result<BTreeSet<NaiveDate>, CalendarError> {
        let key = key.trim();
        if !valid_key(key) {
            return Err(CalendarError::NotFound {
                key: key.to_string(),
            });
        }
        let path = self.locate(key).ok_or_else(|| CalendarError::NotFound {
            key: key.to_string(),
        })?;
        let text = fs::read_to_string(&path).map_err(|e| CalendarError::Load {
            key: key.to_string(),
            message: format!("{}: {e}", path.display()),
        })?;
        let dates = self.parse(key, &text)?;
        debug!(calendar = key, path = %path.display(), holidays = dates.len(), "calendar loaded");
        Ok(dates)
    }
}
