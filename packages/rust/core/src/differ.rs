//! Snapshot differ: flags matches already present in the previous snapshot.

use tracing::info;

use rosterwatch_shared::{DiffRow, MatchResult};

use crate::matcher::{SIMILARITY_CUTOFF, best_match};

/// Current matches annotated against a previous snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotDiff {
    pub rows: Vec<DiffRow>,
    /// Number of rows that also appear in the previous snapshot.
    pub recurring: usize,
}

impl SnapshotDiff {
    pub fn new_count(&self) -> usize {
        self.rows.len() - self.recurring
    }

    /// Rows not seen in the previous snapshot.
    pub fn new_rows(&self) -> impl Iterator<Item = &DiffRow> {
        self.rows.iter().filter(|r| !r.recurring)
    }
}

/// Classify each current match as recurring or new.
///
/// A row recurs when some previous pair label is at least as similar as the
/// matcher cutoff. An empty `previous` makes every row new.
pub fn diff_against(current: &[MatchResult], previous: &[MatchResult]) -> SnapshotDiff {
    let labels: Vec<&str> = previous.iter().map(|r| r.pair.as_str()).collect();

    let rows: Vec<DiffRow> = current
        .iter()
        .map(|result| DiffRow {
            recurring: best_match(&result.pair, &labels, SIMILARITY_CUTOFF).is_some(),
            result: result.clone(),
        })
        .collect();
    let recurring = rows.iter().filter(|r| r.recurring).count();

    info!(
        current = rows.len(),
        previous = previous.len(),
        recurring,
        new = rows.len() - recurring,
        "snapshot diff computed"
    );

    SnapshotDiff { rows, recurring }
}
