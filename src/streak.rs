//! Streak calendar - which days had a finished workout

use std::collections::BTreeSet;

use chrono::{Datelike, Days, Local, NaiveDate, TimeZone};

use crate::models::CompletionRecord;

/// Local calendar dates with at least one completion
pub fn marked_dates(records: &[CompletionRecord]) -> BTreeSet<NaiveDate> {
    marked_dates_in(records, &Local)
}

pub fn marked_dates_in<Tz: TimeZone>(records: &[CompletionRecord], tz: &Tz) -> BTreeSet<NaiveDate> {
    records
        .iter()
        .map(|r| r.date.with_timezone(tz).date_naive())
        .collect()
}

/// Consecutive marked days ending today, or ending yesterday when
/// today has nothing yet
pub fn current_streak(dates: &BTreeSet<NaiveDate>, today: NaiveDate) -> u32 {
    let mut day = if dates.contains(&today) {
        today
    } else {
        match today.checked_sub_days(Days::new(1)) {
            Some(yesterday) if dates.contains(&yesterday) => yesterday,
            _ => return 0,
        }
    };

    let mut streak = 0;
    while dates.contains(&day) {
        streak += 1;
        match day.pred_opt() {
            Some(prev) => day = prev,
            None => break,
        }
    }
    streak
}

pub fn longest_streak(dates: &BTreeSet<NaiveDate>) -> u32 {
    let mut longest = 0;
    let mut run = 0;
    let mut prev: Option<NaiveDate> = None;

    for &date in dates {
        run = match prev {
            Some(p) if p.succ_opt() == Some(date) => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        prev = Some(date);
    }
    longest
}

/// Text calendar for one month, weeks starting Monday; marked days get `*`
pub fn month_grid(year: i32, month: u32, dates: &BTreeSet<NaiveDate>) -> Option<String> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next_month = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    let days_in_month = next_month.signed_duration_since(first).num_days() as u32;

    let mut out = format!("{}\n", first.format("%B %Y"));
    out.push_str("Mo  Tu  We  Th  Fr  Sa  Su\n");

    let mut line = "    ".repeat(first.weekday().num_days_from_monday() as usize);
    for day in 1..=days_in_month {
        let date = first.with_day(day)?;
        let mark = if dates.contains(&date) { '*' } else { ' ' };
        line.push_str(&format!("{:>2}{} ", day, mark));

        if date.weekday().num_days_from_monday() == 6 {
            out.push_str(line.trim_end());
            out.push('\n');
            line.clear();
        }
    }
    if !line.is_empty() {
        out.push_str(line.trim_end());
        out.push('\n');
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn create_record(y: i32, m: u32, d: u32, hour: u32) -> CompletionRecord {
        CompletionRecord {
            workout_id: "w1".into(),
            title: "Leg Day".into(),
            date: Utc.with_ymd_and_hms(y, m, d, hour, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_same_day_completions_mark_one_date() {
        let records = vec![create_record(2025, 3, 1, 8), create_record(2025, 3, 1, 18)];
        let dates = marked_dates_in(&records, &Utc);
        assert_eq!(dates.len(), 1);
        assert!(dates.contains(&date(2025, 3, 1)));
    }

    #[test]
    fn test_current_streak() {
        let dates: BTreeSet<_> = [date(2025, 3, 1), date(2025, 3, 2), date(2025, 3, 3)].into();
        assert_eq!(current_streak(&dates, date(2025, 3, 3)), 3);
        assert_eq!(current_streak(&dates, date(2025, 3, 4)), 3);
        assert_eq!(current_streak(&dates, date(2025, 3, 5)), 0);
        assert_eq!(current_streak(&BTreeSet::new(), date(2025, 3, 5)), 0);
    }

    #[test]
    fn test_longest_streak() {
        let dates: BTreeSet<_> = [
            date(2025, 2, 27),
            date(2025, 2, 28),
            date(2025, 3, 1),
            date(2025, 3, 5),
            date(2025, 3, 6),
        ]
        .into();
        assert_eq!(longest_streak(&dates), 3);
        assert_eq!(longest_streak(&BTreeSet::new()), 0);
    }

    #[test]
    fn test_month_grid() {
        // March 2025 starts on a Saturday
        let dates: BTreeSet<_> = [date(2025, 3, 1), date(2025, 3, 10)].into();
        let grid = month_grid(2025, 3, &dates).unwrap();
        let lines: Vec<_> = grid.lines().collect();

        assert_eq!(lines[0], "March 2025");
        assert_eq!(lines[2], "                     1*  2");
        assert!(lines[4].starts_with("10*"));
        assert_eq!(lines.len(), 8);
        assert!(month_grid(2025, 13, &dates).is_none());
    }
}
