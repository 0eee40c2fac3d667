//! Timestamped match snapshots stored as `.xlsx` files in one directory.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use calamine::{Data, Reader, open_workbook_auto};
use chrono::{Local, NaiveDateTime, TimeDelta, Timelike};
use regex::Regex;
use rust_xlsxwriter::{Format, Workbook};
use tracing::{debug, info};

use rosterwatch_shared::{DiffRow, MatchResult, Result, RosterwatchError};

use crate::roster::cell_text;

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const HEADER: [&str; 5] = ["Pair", "Category", "Score", "Contact", "Status"];

static FILE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^matches_(\d{8}_\d{6})\.xlsx$").expect("valid regex"));

/// A snapshot file and the time encoded in its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotInfo {
    pub path: PathBuf,
    pub taken_at: NaiveDateTime,
}

/// Snapshot directory handle.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// All snapshots, oldest first. A missing directory holds no snapshots.
    pub fn list(&self) -> Result<Vec<SnapshotInfo>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let entries = std::fs::read_dir(&self.dir).map_err(|e| RosterwatchError::io(&self.dir, e))?;

        let mut snapshots: Vec<SnapshotInfo> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name().to_string_lossy().into_owned();
                let stamp = FILE_NAME.captures(&name)?.get(1)?.as_str().to_string();
                let taken_at = NaiveDateTime::parse_from_str(&stamp, TIMESTAMP_FORMAT).ok()?;
                Some(SnapshotInfo {
                    path: entry.path(),
                    taken_at,
                })
            })
            .collect();
        snapshots.sort_by_key(|s| s.taken_at);
        Ok(snapshots)
    }

    /// The most recent snapshot.
    pub fn latest(&self) -> Result<Option<SnapshotInfo>> {
        Ok(self.list()?.pop())
    }

    /// The second most recent snapshot.
    pub fn previous(&self) -> Result<Option<SnapshotInfo>> {
        let mut all = self.list()?;
        all.pop();
        Ok(all.pop())
    }

    /// Read the match rows of a snapshot.
    pub fn load(&self, info: &SnapshotInfo) -> Result<Vec<MatchResult>> {
        let path = info.path.as_path();
        let mut workbook =
            open_workbook_auto(path).map_err(|e| RosterwatchError::spreadsheet(path, e))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| RosterwatchError::spreadsheet(path, "snapshot has no worksheets"))?
            .map_err(|e| RosterwatchError::spreadsheet(path, e))?;

        let mut results = Vec::new();
        for (n, row) in range.rows().enumerate().skip(1) {
            let cell = |i: usize| row.get(i).map(cell_text).unwrap_or_default();
            let pair = cell(0);
            if pair.is_empty() {
                continue;
            }
            let score = match row.get(2) {
                Some(Data::Float(f)) => *f,
                Some(Data::Int(i)) => *i as f64,
                _ => cell(2).parse::<f64>().map_err(|_| {
                    RosterwatchError::spreadsheet(
                        path,
                        format!("row {}: unreadable score '{}'", n + 1, cell(2)),
                    )
                })?,
            };
            let contact = Some(cell(3)).filter(|c| !c.is_empty());
            results.push(MatchResult {
                pair,
                category: cell(1),
                score,
                contact,
            });
        }

        debug!(path = %path.display(), rows = results.len(), "snapshot loaded");
        Ok(results)
    }

    /// Save `rows` as a new snapshot stamped with the local time.
    ///
    /// The stamp moves forward a second at a time until it names a new file.
    pub fn save(&self, rows: &[DiffRow]) -> Result<SnapshotInfo> {
        let mut taken_at = Local::now().naive_local().with_nanosecond(0).unwrap_or_default();
        while self.path_for(taken_at).exists() {
            taken_at += TimeDelta::seconds(1);
        }
        self.save_at(rows, taken_at)
    }

    fn path_for(&self, taken_at: NaiveDateTime) -> PathBuf {
        self.dir
            .join(format!("matches_{}.xlsx", taken_at.format(TIMESTAMP_FORMAT)))
    }

    /// Save `rows` as a snapshot stamped `taken_at`.
    pub fn save_at(&self, rows: &[DiffRow], taken_at: NaiveDateTime) -> Result<SnapshotInfo> {
        std::fs::create_dir_all(&self.dir).map_err(|e| RosterwatchError::io(&self.dir, e))?;
        let path = self.path_for(taken_at);

        let xlsx_err = |e: rust_xlsxwriter::XlsxError| RosterwatchError::spreadsheet(&path, e);

        let mut workbook = Workbook::new();
        let bold = Format::new().set_bold();
        let sheet = workbook.add_worksheet();
        sheet.set_name("matches").map_err(xlsx_err)?;

        for (col, title) in HEADER.iter().enumerate() {
            sheet
                .write_string_with_format(0, col as u16, *title, &bold)
                .map_err(xlsx_err)?;
        }
        for (i, row) in rows.iter().enumerate() {
            let r = i as u32 + 1;
            let result = &row.result;
            sheet.write_string(r, 0, &result.pair).map_err(xlsx_err)?;
            sheet.write_string(r, 1, &result.category).map_err(xlsx_err)?;
            sheet.write_number(r, 2, result.score).map_err(xlsx_err)?;
            if let Some(contact) = &result.contact {
                sheet.write_string(r, 3, contact).map_err(xlsx_err)?;
            }
            let status = if row.recurring { "recurring" } else { "new" };
            sheet.write_string(r, 4, status).map_err(xlsx_err)?;
        }
        workbook.save(&path).map_err(xlsx_err)?;

        info!(path = %path.display(), rows = rows.len(), "snapshot saved");
        Ok(SnapshotInfo { path, taken_at })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 12)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn rows() -> Vec<DiffRow> {
        vec![
            DiffRow {
                result: MatchResult {
                    pair: "Иван Петров".into(),
                    category: "Waltz".into(),
                    score: 1.0,
                    contact: Some("+7 900 111".into()),
                },
                recurring: false,
            },
            DiffRow {
                result: MatchResult {
                    pair: "Анна Смирнова".into(),
                    category: "Waltz".into(),
                    score: 0.9285714285714286,
                    contact: None,
                },
                recurring: true,
            },
        ]
    }

    #[test]
    fn saved_snapshot_loads_back() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path());
        let info = store.save_at(&rows(), at(10, 30)).unwrap();

        assert_eq!(
            info.path.file_name().unwrap(),
            "matches_20250312_103000.xlsx"
        );
        let loaded = store.load(&info).unwrap();
        let expected: Vec<MatchResult> = rows().into_iter().map(|r| r.result).collect();
        assert_eq!(loaded, expected);
    }

    #[test]
    fn ordering_follows_file_name_timestamp() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path());
        store.save_at(&rows(), at(12, 0)).unwrap();
        store.save_at(&rows(), at(9, 0)).unwrap();
        store.save_at(&rows(), at(11, 0)).unwrap();
        std::fs::write(dir.path().join("matches_latest.xlsx"), b"x").unwrap();

        let all = store.list().unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(store.latest().unwrap().unwrap().taken_at, at(12, 0));
        assert_eq!(store.previous().unwrap().unwrap().taken_at, at(11, 0));
    }

    #[test]
    fn unreadable_score_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("matches_20250312_090000.xlsx");
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        for (col, title) in HEADER.iter().enumerate() {
            sheet.write_string(0, col as u16, *title).unwrap();
        }
        sheet.write_string(1, 0, "Иван Петров").unwrap();
        sheet.write_string(1, 1, "Waltz").unwrap();
        sheet.write_string(1, 2, "high").unwrap();
        workbook.save(&path).unwrap();

        let store = SnapshotStore::new(dir.path());
        let info = store.latest().unwrap().unwrap();
        let err = store.load(&info).unwrap_err();
        assert!(matches!(err, RosterwatchError::Spreadsheet { .. }));
        assert!(err.to_string().contains("row 2"));
    }

    #[test]
    fn missing_directory_has_no_snapshots() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path().join("never-created"));
        assert!(store.list().unwrap().is_empty());
        assert!(store.latest().unwrap().is_none());
        assert!(store.previous().unwrap().is_none());
    }

    #[test]
    fn back_to_back_saves_do_not_overwrite() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path());
        let first = store.save(&rows()).unwrap();
        let second = store.save(&rows()).unwrap();

        assert_ne!(first.path, second.path);
        assert_eq!(store.list().unwrap().len(), 2);
        assert_eq!(store.previous().unwrap().unwrap(), first);
    }
}
