//! External contact roster: discovery and reading of the `.xlsx` file.

use std::path::{Path, PathBuf};

use calamine::{Data, Reader, open_workbook_auto};
use tracing::{debug, info, warn};

use rosterwatch_shared::{ContactRow, Result, RosterwatchError};

/// Text of a spreadsheet cell, trimmed. Empty cells become `""`.
pub(crate) fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        other => other.to_string().trim().to_string(),
    }
}

/// First `*.xlsx` file in `dir` by name, ignoring office lock files.
pub fn discover_roster_file(dir: &Path) -> Result<Option<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| RosterwatchError::io(dir, e))?;

    let mut candidates: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("xlsx"))
                && !path
                    .file_name()
                    .is_some_and(|n| n.to_string_lossy().starts_with("~$"))
        })
        .collect();
    candidates.sort();

    debug!(dir = %dir.display(), found = candidates.len(), "roster file discovery");
    Ok(candidates.into_iter().next())
}

/// Use `explicit` when given, otherwise discover a roster file in `search_dir`.
pub fn resolve_roster_path(explicit: Option<&Path>, search_dir: &Path) -> Result<PathBuf> {
    match explicit {
        Some(path) if path.is_file() => Ok(path.to_path_buf()),
        Some(path) => Err(RosterwatchError::RosterFileMissing {
            path: path.to_path_buf(),
        }),
        None => discover_roster_file(search_dir)?.ok_or_else(|| {
            RosterwatchError::RosterFileMissing {
                path: search_dir.join("*.xlsx"),
            }
        }),
    }
}

/// Read pair strings (and contacts, when configured) from the first worksheet.
///
/// Rows with a blank pair cell are skipped.
pub fn read_contacts(
    path: &Path,
    pair_column: &str,
    contact_column: Option<&str>,
) -> Result<Vec<ContactRow>> {
    let mut workbook = open_workbook_auto(path).map_err(|e| RosterwatchError::spreadsheet(path, e))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| RosterwatchError::spreadsheet(path, "workbook has no worksheets"))?
        .map_err(|e| RosterwatchError::spreadsheet(path, e))?;

    let mut rows = range.rows();
    let header: Vec<String> = rows
        .next()
        .map(|r| r.iter().map(cell_text).collect())
        .unwrap_or_default();

    let pair_idx = header.iter().position(|h| h == pair_column).ok_or_else(|| {
        RosterwatchError::spreadsheet(path, format!("no '{pair_column}' column in header"))
    })?;
    let contact_idx = contact_column.and_then(|name| {
        let idx = header.iter().position(|h| h == name);
        if idx.is_none() {
            warn!(column = name, path = %path.display(), "contact column not found, contacts omitted");
        }
        idx
    });

    let contacts: Vec<ContactRow> = rows
        .filter_map(|row| {
            let pair = row.get(pair_idx).map(cell_text).unwrap_or_default();
            if pair.is_empty() {
                return None;
            }
            let contact = contact_idx
                .and_then(|i| row.get(i))
                .map(cell_text)
                .filter(|c| !c.is_empty());
            Some(ContactRow { pair, contact })
        })
        .collect();

    info!(path = %path.display(), rows = contacts.len(), "roster file read");
    Ok(contacts)
}
