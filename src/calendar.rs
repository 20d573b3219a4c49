use crate::model::{day_key, NoteBook};
use chrono::{Datelike, Months, NaiveDate, NaiveDateTime};

pub const WEEKDAY_HEADERS: [&str; 7] = ["Dom", "Lun", "Mar", "Mie", "Jue", "Vie", "Sab"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayCell {
    Empty,
    Day { date: NaiveDate, in_range: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthGrid {
    pub year: i32,
    pub month: u32,
    pub label: String,
    pub cells: Vec<DayCell>,
}

/// One grid per calendar month from `start`'s month through `end`'s month,
/// in order. Days between the two dates (inclusive) are flagged in range.
pub fn render(start: NaiveDateTime, end: NaiveDateTime) -> Vec<MonthGrid> {
    let first_day = start.date();
    let last_day = end.date();
    let mut grids = Vec::new();
    let (mut year, mut month) = (first_day.year(), first_day.month());
    while (year, month) <= (last_day.year(), last_day.month()) {
        if let Some(grid) = month_grid(year, month, first_day, last_day) {
            grids.push(grid);
        }
        month += 1;
        if month > 12 {
            month = 1;
            year += 1;
        }
    }
    grids
}

fn month_grid(year: i32, month: u32, first: NaiveDate, last: NaiveDate) -> Option<MonthGrid> {
    let month_start = NaiveDate::from_ymd_opt(year, month, 1)?;
    let leading = month_start.weekday().num_days_from_sunday() as usize;
    let days = days_in_month(year, month)?;
    let mut cells = vec![DayCell::Empty; leading];
    cells.extend((1..=days).filter_map(|day| {
        NaiveDate::from_ymd_opt(year, month, day).map(|date| DayCell::Day {
            date,
            in_range: first <= date && date <= last,
        })
    }));
    Some(MonthGrid {
        year,
        month,
        label: format!("{} {}", month_start.format("%B"), year),
        cells,
    })
}

/// `None` for a month chrono cannot represent.
pub fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let month_start = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = month_start.checked_add_months(Months::new(1))?;
    u32::try_from(next.signed_duration_since(month_start).num_days()).ok()
}

impl DayCell {
    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            DayCell::Empty => None,
            DayCell::Day { date, .. } => Some(*date),
        }
    }

    pub fn is_in_range(&self) -> bool {
        matches!(self, DayCell::Day { in_range: true, .. })
    }
}

impl MonthGrid {
    pub fn leading_empty(&self) -> usize {
        self.cells
            .iter()
            .take_while(|c| matches!(c, DayCell::Empty))
            .count()
    }

    pub fn day_count(&self) -> usize {
        self.cells.len() - self.leading_empty()
    }

    /// Rows of seven cells; the last row may be short.
    pub fn weeks(&self) -> impl Iterator<Item = &[DayCell]> {
        self.cells.chunks(7)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}

/// Plain-text month for the terminal. In-range days are bracketed and days
/// carrying a note get a trailing `*`.
pub fn format_month(grid: &MonthGrid, notes: &NoteBook) -> String {
    let mut out = String::new();
    out.push_str(&grid.label);
    out.push('\n');
    let header: Vec<String> = WEEKDAY_HEADERS.iter().map(|h| format!("{:^5}", h)).collect();
    out.push_str(header.join("").trim_end());
    out.push('\n');
    for week in grid.weeks() {
        let row: String = week
            .iter()
            .map(|cell| match cell {
                DayCell::Empty => "     ".to_string(),
                DayCell::Day { date, in_range } => {
                    let mark = if notes.contains(&day_key(*date)) { '*' } else { ' ' };
                    if *in_range {
                        format!("[{:>2}]{}", date.day(), mark)
                    } else {
                        format!(" {:>2} {}", date.day(), mark)
                    }
                }
            })
            .collect();
        out.push_str(row.trim_end());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Note;

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_single_month() {
        // October 2024 starts on a Tuesday.
        let grids = render(at(2024, 10, 9, 12), at(2024, 10, 11, 5));
        assert_eq!(grids.len(), 1);
        let grid = &grids[0];
        assert_eq!(grid.label, "October 2024");
        assert_eq!(grid.leading_empty(), 2);
        assert_eq!(grid.day_count(), 31);
        assert_eq!(grid.cells.len(), 33);
    }

    #[test]
    fn test_multiple_months_roll_over_year() {
        let grids = render(at(2024, 11, 20, 0), at(2025, 2, 3, 0));
        let months: Vec<_> = grids.iter().map(|g| (g.year, g.month)).collect();
        assert_eq!(months, vec![(2024, 11), (2024, 12), (2025, 1), (2025, 2)]);
        assert_eq!(grids[3].day_count(), 28);
        assert_eq!(grids[3].label, "February 2025");
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(2024, 2), Some(29));
        assert_eq!(days_in_month(2023, 2), Some(28));
        assert_eq!(days_in_month(2024, 12), Some(31));
        assert_eq!(days_in_month(2024, 13), None);
        assert_eq!(days_in_month(2024, 0), None);
    }

    #[test]
    fn test_end_before_start_month_is_empty() {
        assert!(render(at(2024, 10, 9, 0), at(2024, 9, 30, 0)).is_empty());
    }

    #[test]
    fn test_in_range_is_inclusive() {
        let grids = render(at(2024, 10, 9, 17), at(2024, 10, 11, 5));
        let in_range: Vec<u32> = grids[0]
            .cells
            .iter()
            .filter(|c| c.is_in_range())
            .filter_map(|c| c.date())
            .map(|d| d.day())
            .collect();
        assert_eq!(in_range, vec![9, 10, 11]);
    }

    #[test]
    fn test_range_spans_month_boundary() {
        let grids = render(at(2024, 1, 30, 0), at(2024, 2, 2, 0));
        let count = |g: &MonthGrid| g.cells.iter().filter(|c| c.is_in_range()).count();
        assert_eq!(count(&grids[0]), 2);
        assert_eq!(count(&grids[1]), 2);
        assert_eq!(grids[1].day_count(), 29);
    }

    #[test]
    fn test_weeks_chunking() {
        let grids = render(at(2024, 9, 1, 0), at(2024, 9, 1, 0));
        // September 2024 starts on a Sunday: no padding, 30 days.
        let weeks: Vec<_> = grids[0].weeks().collect();
        assert_eq!(weeks.len(), 5);
        assert_eq!(weeks[4].len(), 2);
        assert!(grids[0].contains(NaiveDate::from_ymd_opt(2024, 9, 15).unwrap()));
    }

    #[test]
    fn test_format_month_marks_notes() {
        let grids = render(at(2024, 10, 9, 0), at(2024, 10, 11, 0));
        let notes = NoteBook::from_notes(vec![Note::new("Thu Oct 10 2024", "Comprar regalo")]);
        let text = format_month(&grids[0], &notes);
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "October 2024");
        assert!(lines[1].starts_with(" Dom "));
        assert!(text.contains("[10]*"));
        assert!(text.contains("[ 9] "));
        assert!(text.contains(" 12 "));
    }
}
