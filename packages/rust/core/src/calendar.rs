//! Date window selector: nearest past and upcoming events around today.

use std::cmp::Ordering;
use std::fmt;

use chrono::{Datelike, NaiveDate};
use tracing::warn;

use rosterwatch_shared::{Category, DateOrdering, Result, RosterwatchError};

/// Maximum number of events in each window.
pub const WINDOW_SIZE: usize = 3;

/// A published event date. `DD.MM` dates carry no year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventDate {
    pub day: u32,
    pub month: u32,
    pub year: Option<i32>,
}

impl EventDate {
    /// Parse `DD.MM`, `DD.MM.YYYY`, `DD-MM` or `DD-MM-YYYY`.
    pub fn parse(raw: &str) -> Result<Self> {
        let invalid = || RosterwatchError::parse(format!("unrecognised event date '{raw}'"));

        let parts: Vec<&str> = raw.trim().split(['.', '-']).collect();
        let number = |s: &str| s.parse::<u32>().map_err(|_| invalid());
        let (day, month, year) = match parts.as_slice() {
            [d, m] => (number(d)?, number(m)?, None),
            [d, m, y] => {
                let year = y.parse::<i32>().map_err(|_| invalid())?;
                (number(d)?, number(m)?, Some(year))
            }
            _ => return Err(invalid()),
        };

        if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
            return Err(invalid());
        }
        Ok(Self { day, month, year })
    }

    /// Calendar date, borrowing `default_year` when the event has none.
    pub fn resolve(&self, default_year: i32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year.unwrap_or(default_year), self.month, self.day)
    }
}

impl fmt::Display for EventDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}.{:02}", self.day, self.month)?;
        if let Some(year) = self.year {
            write!(f, ".{year}")?;
        }
        Ok(())
    }
}

/// Events around a reference day.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateWindows {
    /// Reference day as `DD.MM`.
    pub today: String,
    /// Up to [`WINDOW_SIZE`] events on or before today, oldest first.
    pub past: Vec<Category>,
    /// Up to [`WINDOW_SIZE`] events on or after today, soonest first.
    pub future: Vec<Category>,
}

impl DateWindows {
    pub fn is_empty(&self) -> bool {
        self.past.is_empty() && self.future.is_empty()
    }
}

/// `today` formatted the way category dates are published.
pub fn today_label(today: NaiveDate) -> String {
    today.format("%d.%m").to_string()
}

/// Select the nearest past and upcoming events.
///
/// An event dated today appears in both windows.
pub fn select_windows(
    today: NaiveDate,
    categories: &[Category],
    ordering: DateOrdering,
) -> DateWindows {
    let label = today_label(today);

    let (past, future) = match ordering {
        DateOrdering::Calendar => {
            let dated: Vec<(NaiveDate, &Category)> = categories
                .iter()
                .filter_map(|c| match EventDate::parse(&c.date) {
                    Ok(date) => match date.resolve(today.year()) {
                        Some(day) => Some((day, c)),
                        None => {
                            warn!(category = %c.name, %date, "skipping event with a nonexistent date");
                            None
                        }
                    },
                    Err(e) => {
                        warn!(category = %c.name, error = %e, "skipping event with unparseable date");
                        None
                    }
                })
                .collect();
            split_windows(dated, &today)
        }
        DateOrdering::Lexicographic => {
            let keyed: Vec<(&str, &Category)> =
                categories.iter().map(|c| (c.date.as_str(), c)).collect();
            split_windows(keyed, &label.as_str())
        }
    };

    DateWindows {
        today: label,
        past,
        future,
    }
}

/// Sort by key (stable) and cut the windows either side of `today`.
fn split_windows<K: Ord>(
    mut keyed: Vec<(K, &Category)>,
    today: &K,
) -> (Vec<Category>, Vec<Category>) {
    keyed.sort_by(|a, b| a.0.cmp(&b.0));

    let past: Vec<Category> = keyed
        .iter()
        .filter(|(k, _)| k.cmp(today) != Ordering::Greater)
        .map(|(_, c)| (*c).clone())
        .collect();
    let past = past[past.len().saturating_sub(WINDOW_SIZE)..].to_vec();

    let future = keyed
        .iter()
        .filter(|(k, _)| k.cmp(today) != Ordering::Less)
        .take(WINDOW_SIZE)
        .map(|(_, c)| (*c).clone())
        .collect();

    (past, future)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(name: &str, date: &str) -> Category {
        Category {
            name: name.into(),
            date: date.into(),
            metadata: vec![],
        }
    }

    fn names(list: &[Category]) -> Vec<&str> {
        list.iter().map(|c| c.name.as_str()).collect()
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_both_published_formats() {
        let short = EventDate::parse("05.03").unwrap();
        assert_eq!(short, EventDate { day: 5, month: 3, year: None });
        let long = EventDate::parse("05-03-2025").unwrap();
        assert_eq!(long.year, Some(2025));
        assert_eq!(long.to_string(), "05.03.2025");
        assert!(EventDate::parse("31.13").is_err());
        assert!(EventDate::parse("soon").is_err());
    }

    #[test]
    fn windows_never_exceed_three() {
        let categories: Vec<Category> = (1..=10)
            .map(|d| category(&format!("past{d}"), &format!("{d:02}.01")))
            .collect();
        let windows = select_windows(day(2025, 6, 1), &categories, DateOrdering::Calendar);

        assert_eq!(names(&windows.past), vec!["past8", "past9", "past10"]);
        assert!(windows.future.is_empty());
    }

    #[test]
    fn upcoming_window_never_exceeds_three() {
        let categories: Vec<Category> = (1..=5)
            .map(|m| category(&format!("month{m}"), &format!("15.{:02}", m + 6)))
            .collect();
        let windows = select_windows(day(2025, 6, 1), &categories, DateOrdering::Calendar);

        assert!(windows.past.is_empty());
        assert_eq!(names(&windows.future), vec!["month1", "month2", "month3"]);
    }

    #[test]
    fn lexicographic_windows_never_exceed_three() {
        let dates = [
            "01.01", "02.01", "03.01", "04.01", "20.06", "21.06", "22.06", "23.06",
        ];
        let categories: Vec<Category> = dates.iter().map(|d| category(d, d)).collect();
        let windows = select_windows(day(2025, 6, 15), &categories, DateOrdering::Lexicographic);

        assert_eq!(names(&windows.past), vec!["02.01", "03.01", "04.01"]);
        assert_eq!(names(&windows.future), vec!["20.06", "21.06", "22.06"]);
    }

    #[test]
    fn nonexistent_date_is_skipped() {
        let categories = vec![category("Leap", "29.02"), category("Spring", "01.03")];
        let windows = select_windows(day(2025, 6, 1), &categories, DateOrdering::Calendar);
        assert_eq!(names(&windows.past), vec!["Spring"]);
    }

    #[test]
    fn calendar_order_splits_around_today() {
        let categories = vec![
            category("June", "10.06"),
            category("Jan", "15.01"),
            category("Today", "01.06"),
            category("Dec", "20.12"),
            category("Mar", "01-03-2025"),
            category("Broken", "TBA"),
        ];
        let windows = select_windows(day(2025, 6, 1), &categories, DateOrdering::Calendar);

        assert_eq!(windows.today, "01.06");
        assert_eq!(names(&windows.past), vec!["Jan", "Mar", "Today"]);
        assert_eq!(names(&windows.future), vec!["Today", "June", "Dec"]);
    }

    #[test]
    fn lexicographic_order_compares_raw_strings() {
        // "15.01" > "01.06" as strings, so January counts as upcoming.
        let categories = vec![category("Jan", "15.01"), category("Early", "01.02")];
        let windows = select_windows(day(2025, 6, 1), &categories, DateOrdering::Lexicographic);

        assert_eq!(names(&windows.past), vec!["Early"]);
        assert_eq!(names(&windows.future), vec!["Jan"]);
    }

    #[test]
    fn no_events_is_an_empty_window() {
        let windows = select_windows(day(2025, 6, 1), &[], DateOrdering::Calendar);
        assert!(windows.is_empty());
    }
}
