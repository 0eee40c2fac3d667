//! Category table builder: general-information rows → {name → date, metadata}.

use std::collections::HashSet;

use tracing::{debug, warn};

use rosterwatch_shared::{
    Category, CategoryTable, Result, RosterwatchError, RowBatch, SchemaConfig, SchemaMismatch,
};

/// Position of the category name when columns are positional.
const NAME_POSITION: usize = 0;
/// Position of the date when columns are positional.
const DATE_POSITION: usize = 1;

/// Positional column names `"0"`, `"1"`, ...
pub(crate) fn positional_columns(count: usize) -> Vec<String> {
    (0..count).map(|i| i.to_string()).collect()
}

/// Build the category table from the general-information batch.
///
/// The first header cell labels the index column and is not a data column.
/// When the remaining headers disagree with the parsed column count the table
/// falls back to positional columns and records a [`SchemaMismatch`].
pub fn build_category_table(general: &RowBatch, schema: &SchemaConfig) -> Result<CategoryTable> {
    let header = general.header().cloned().unwrap_or_default();
    let index_label = header.first().cloned().unwrap_or_default();
    let declared: Vec<String> = header.iter().skip(1).cloned().collect();

    let rows = general.data_rows();
    let parsed = rows.iter().map(Vec::len).max().unwrap_or(0);

    let mut schema_mismatch = None;
    let columns = if declared.is_empty() {
        debug!(source = %general.source, "general table has no headers, using positional columns");
        positional_columns(parsed)
    } else if !rows.is_empty() && declared.len() != parsed {
        let mismatch = SchemaMismatch {
            context: format!("general table {}", general.source),
            declared: declared.len(),
            parsed,
        };
        warn!(%mismatch, "column titles do not match the number of columns");
        schema_mismatch = Some(mismatch);
        positional_columns(parsed)
    } else {
        declared
    };

    let (name_idx, date_idx) = if schema_mismatch.is_some() || header.len() <= 1 {
        (NAME_POSITION, DATE_POSITION)
    } else {
        let find = |name: &str| {
            columns.iter().position(|c| c == name).ok_or_else(|| {
                RosterwatchError::validation(format!(
                    "general table has no '{name}' column (columns: {})",
                    columns.join(", ")
                ))
            })
        };
        (find(schema.category_column.as_str())?, find(schema.date_column.as_str())?)
    };

    let mut seen = HashSet::new();
    let categories: Vec<Category> = rows
        .iter()
        .map(|row| {
            let cell = |idx: usize| row.get(idx).cloned().unwrap_or_default();
            let name = cell(name_idx);
            if !seen.insert(name.clone()) {
                warn!(category = %name, "duplicate category name in general table");
            }
            Category {
                name,
                date: cell(date_idx),
                metadata: row
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != name_idx && *i != date_idx)
                    .map(|(_, v)| v.clone())
                    .collect(),
            }
        })
        .collect();

    debug!(categories = categories.len(), %index_label, "category table built");

    Ok(CategoryTable {
        index_label,
        columns,
        categories,
        schema_mismatch,
    })
}
