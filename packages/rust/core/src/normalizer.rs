//! Roster normalizer: flattens sub-source batches into one roster and
//! back-fills each entry's category from the per-source marker counts.

use tracing::{debug, warn};

use rosterwatch_shared::{
    CategoryTable, MARKERS_PER_ROW, Result, Roster, RosterEntry, RosterwatchError, RowBatch,
    SchemaMismatch,
};

use crate::categories::positional_columns;

/// Number of logical roster rows a sub-source holds, from its data markers.
pub fn logical_rows(batch: &RowBatch) -> Result<usize> {
    if batch.data_markers % MARKERS_PER_ROW != 0 {
        return Err(RosterwatchError::InvalidMarkerCount {
            source_label: batch.source.clone(),
            markers: batch.data_markers,
            per_row: MARKERS_PER_ROW,
        });
    }
    Ok(batch.data_markers / MARKERS_PER_ROW)
}

/// Expand `counts[i]` copies of `names[i]` into one label per roster row.
///
/// `names` must hold at least as many labels as there are counts.
pub fn backfill_labels(counts: &[usize], names: &[&str]) -> Result<Vec<String>> {
    if names.len() < counts.len() {
        return Err(RosterwatchError::validation(format!(
            "{} sub-sources but only {} categories to back-fill from",
            counts.len(),
            names.len()
        )));
    }

    let mut labels = Vec::with_capacity(counts.iter().sum());
    for (count, name) in counts.iter().zip(names) {
        labels.extend(std::iter::repeat_n(name.to_string(), *count));
    }
    Ok(labels)
}

/// Flatten the sub-sources into one roster, attaching categories in source order.
pub fn normalize_roster(sub_sources: &[RowBatch], categories: &CategoryTable) -> Result<Roster> {
    let counts = sub_sources
        .iter()
        .map(logical_rows)
        .collect::<Result<Vec<_>>>()?;
    let names: Vec<&str> = categories.names().collect();
    let labels = backfill_labels(&counts, &names)?;

    let rows: Vec<&Vec<String>> = sub_sources.iter().flat_map(|b| b.data_rows()).collect();
    if labels.len() != rows.len() {
        return Err(RosterwatchError::BackfillMismatch {
            assigned: labels.len(),
            rows: rows.len(),
        });
    }

    let declared_header = sub_sources
        .first()
        .and_then(RowBatch::header)
        .cloned()
        .unwrap_or_default();

    let mut schema_mismatches = Vec::new();
    for batch in sub_sources {
        let declared = batch.header().map(Vec::len).unwrap_or(0);
        let parsed = batch.data_rows().iter().map(Vec::len).max().unwrap_or(0);
        if parsed > 0 && declared != parsed {
            let mismatch = SchemaMismatch {
                context: format!("sub-source {}", batch.source),
                declared,
                parsed,
            };
            warn!(%mismatch, "column titles do not match the number of columns");
            schema_mismatches.push(mismatch);
        }
    }

    let width = rows.iter().map(|r| r.len()).max().unwrap_or(0);
    let columns = if schema_mismatches.is_empty() && !declared_header.is_empty() {
        declared_header.clone()
    } else {
        positional_columns(width)
    };

    let entries: Vec<RosterEntry> = rows
        .into_iter()
        .zip(labels)
        .map(|(cells, category)| RosterEntry {
            cells: cells.clone(),
            category,
        })
        .collect();

    debug!(
        sub_sources = sub_sources.len(),
        entries = entries.len(),
        "roster normalized"
    );

    Ok(Roster {
        columns,
        declared_header,
        entries,
        schema_mismatches,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rosterwatch_shared::Category;

    const HEADER: [&str; 4] = ["№", "Участники", "Клуб", "Тренер"];

    fn batch(source: &str, participants: &[&str]) -> RowBatch {
        let mut rows = vec![HEADER.iter().map(|h| h.to_string()).collect::<Vec<_>>()];
        for (i, p) in participants.iter().enumerate() {
            rows.push(vec![
                (i + 1).to_string(),
                p.to_string(),
                "Вега".into(),
                "Орлов".into(),
            ]);
        }
        RowBatch {
            source: source.into(),
            data_markers: participants.len() * MARKERS_PER_ROW,
            rows,
        }
    }

    fn table(names: &[&str]) -> CategoryTable {
        CategoryTable {
            index_label: "#".into(),
            columns: vec!["Категория".into(), "Дата".into()],
            categories: names
                .iter()
                .map(|n| Category {
                    name: n.to_string(),
                    date: "01.01".into(),
                    metadata: vec![],
                })
                .collect(),
            schema_mismatch: None,
        }
    }

    #[test]
    fn backfill_honours_every_count() {
        let sources = vec![
            batch("waltz", &["A B\nC D", "E F\nG H"]),
            batch("tango", &["I J\nK L"]),
            batch("empty", &[]),
            batch("foxtrot", &["M N\nO P", "Q R\nS T", "U V\nW X"]),
        ];
        let roster =
            normalize_roster(&sources, &table(&["Waltz", "Tango", "Empty", "Foxtrot"])).unwrap();

        let raw_rows: usize = sources.iter().map(|b| b.rows.len()).sum();
        assert_eq!(roster.len(), raw_rows - sources.len());

        let count = |name: &str| roster.entries.iter().filter(|e| e.category == name).count();
        assert_eq!(count("Waltz"), 2);
        assert_eq!(count("Tango"), 1);
        assert_eq!(count("Empty"), 0);
        assert_eq!(count("Foxtrot"), 3);
        assert_eq!(roster.columns, HEADER.to_vec());
        assert!(roster.schema_mismatches.is_empty());
    }

    #[test]
    fn labels_follow_category_order() {
        let labels = backfill_labels(&[1, 0, 2], &["b", "a", "c", "unused"]).unwrap();
        assert_eq!(labels, vec!["b", "c", "c"]);
    }

    #[test]
    fn marker_count_must_be_whole_rows() {
        let mut bad = batch("waltz", &["A B\nC D"]);
        bad.data_markers = 6;
        let err = logical_rows(&bad).unwrap_err();
        assert!(matches!(
            err,
            RosterwatchError::InvalidMarkerCount { markers: 6, per_row: 4, .. }
        ));
    }

    #[test]
    fn too_few_categories_is_rejected() {
        let sources = vec![batch("a", &["A B\nC D"]), batch("b", &["E F\nG H"])];
        let err = normalize_roster(&sources, &table(&["Only"])).unwrap_err();
        assert!(matches!(err, RosterwatchError::Validation { .. }));
    }

    #[test]
    fn marker_count_disagreeing_with_rows_is_backfill_mismatch() {
        let mut short = batch("waltz", &["A B\nC D", "E F\nG H"]);
        short.data_markers = MARKERS_PER_ROW;
        let err = normalize_roster(&[short], &table(&["Waltz"])).unwrap_err();
        assert!(matches!(
            err,
            RosterwatchError::BackfillMismatch { assigned: 1, rows: 2 }
        ));
    }

    #[test]
    fn header_width_mismatch_uses_positional_columns() {
        let mut wide = batch("waltz", &["A B\nC D"]);
        wide.rows[0].truncate(3);
        let roster = normalize_roster(&[wide], &table(&["Waltz"])).unwrap();

        assert_eq!(roster.schema_mismatches.len(), 1);
        assert_eq!(roster.columns, vec!["0", "1", "2", "3"]);
        assert_eq!(roster.column_index("Участники"), Some(1));
    }
}
