//! Pair tokenizer: groups name tokens two at a time.

use rosterwatch_shared::{
    CandidatePair, ContactRow, Pair, Result, Roster, RosterPair, RosterwatchError,
};

/// Remove in-name separators (hyphens) before tokenizing.
pub fn strip_separators(text: &str) -> String {
    text.replace('-', "")
}

/// Split a whitespace-joined token stream into ordered pairs.
///
/// An odd token count is reported with the dangling token, never truncated.
pub fn pair_tokens(stream: &str, context: &str) -> Result<Vec<Pair>> {
    let tokens: Vec<&str> = stream.split_whitespace().collect();
    if tokens.len() % 2 != 0 {
        return Err(RosterwatchError::TokenParityViolation {
            context: context.to_string(),
            tokens: tokens.len(),
            dangling: tokens.last().map(|t| t.to_string()).unwrap_or_default(),
        });
    }

    Ok(tokens
        .chunks_exact(2)
        .map(|chunk| Pair::new(chunk[0], chunk[1]))
        .collect())
}

/// Pair the participants column of every roster entry, carrying its category.
pub fn pair_roster(roster: &Roster, participants_column: &str) -> Result<Vec<RosterPair>> {
    let idx = roster.column_index(participants_column).ok_or_else(|| {
        RosterwatchError::validation(format!(
            "roster has no '{participants_column}' column (columns: {})",
            roster.columns.join(", ")
        ))
    })?;

    let mut pairs = Vec::new();
    for (n, entry) in roster.entries.iter().enumerate() {
        let context = format!("roster entry {} ({})", n + 1, entry.category);
        let Some(cell) = entry.cells.get(idx) else {
            return Err(RosterwatchError::validation(format!(
                "{context} has {} cells, no '{participants_column}' cell at position {idx}",
                entry.cells.len()
            )));
        };
        for pair in pair_tokens(cell, &context)? {
            pairs.push(RosterPair {
                pair,
                category: entry.category.clone(),
            });
        }
    }
    Ok(pairs)
}

/// Pair every contact-file row, hyphens stripped, carrying the row's contact.
pub fn pair_candidates(rows: &[ContactRow]) -> Result<Vec<CandidatePair>> {
    let mut pairs = Vec::new();
    for (n, row) in rows.iter().enumerate() {
        let context = format!("roster file row {}", n + 1);
        for pair in pair_tokens(&strip_separators(&row.pair), &context)? {
            pairs.push(CandidatePair {
                pair,
                contact: row.contact.clone(),
            });
        }
    }
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rosterwatch_shared::RosterEntry;

    #[test]
    fn pairs_tokens_in_stream_order() {
        let pairs = pair_tokens("Иван Петров\nАнна Смирнова", "test").unwrap();
        assert_eq!(
            pairs,
            vec![Pair::new("Иван", "Петров"), Pair::new("Анна", "Смирнова")]
        );
        assert_eq!(pair_tokens("Иван Петров\nАнна Смирнова", "test").unwrap(), pairs);
    }

    #[test]
    fn odd_stream_reports_dangling_token() {
        let err = pair_tokens("Иван Петров Анна", "roster entry 1").unwrap_err();
        match err {
            RosterwatchError::TokenParityViolation {
                tokens, dangling, ..
            } => {
                assert_eq!(tokens, 3);
                assert_eq!(dangling, "Анна");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_stream_yields_no_pairs() {
        assert!(pair_tokens("  ", "blank").unwrap().is_empty());
    }

    #[test]
    fn roster_pairs_inherit_entry_category() {
        let roster = Roster {
            columns: vec!["№".into(), "Участники".into()],
            declared_header: vec!["№".into(), "Участники".into()],
            entries: vec![
                RosterEntry {
                    cells: vec!["1".into(), "Иван Петров\nАнна Смирнова".into()],
                    category: "Waltz".into(),
                },
                RosterEntry {
                    cells: vec!["1".into(), "Олег Ким\nМария Ли".into()],
                    category: "Tango".into(),
                },
            ],
            schema_mismatches: vec![],
        };
        let pairs = pair_roster(&roster, "Участники").unwrap();
        let categories: Vec<&str> = pairs.iter().map(|p| p.category.as_str()).collect();
        assert_eq!(categories, vec!["Waltz", "Waltz", "Tango", "Tango"]);
        assert_eq!(pairs[2].pair.label(), "Олег Ким");
    }

    #[test]
    fn short_entry_is_reported() {
        let roster = Roster {
            columns: vec!["№".into(), "Участники".into()],
            declared_header: vec!["№".into(), "Участники".into()],
            entries: vec![RosterEntry {
                cells: vec!["1".into()],
                category: "Waltz".into(),
            }],
            schema_mismatches: vec![],
        };
        let err = pair_roster(&roster, "Участники").unwrap_err();
        assert!(matches!(err, RosterwatchError::Validation { .. }));
        assert!(err.to_string().contains("roster entry 1 (Waltz)"));
    }

    #[test]
    fn candidates_strip_hyphens() {
        let rows = vec![ContactRow {
            pair: "Анна Смирнова-Ким Олег Ли".into(),
            contact: Some("+7 900".into()),
        }];
        let pairs = pair_candidates(&rows).unwrap();
        assert_eq!(pairs[0].pair.label(), "Анна СмирноваКим");
        assert_eq!(pairs[1].contact.as_deref(), Some("+7 900"));
    }
}
