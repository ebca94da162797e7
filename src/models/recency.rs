use chrono::{DateTime, Duration, NaiveDate, TimeZone};

use super::Record;

/// The calendar day `days_ago` days before `today`. Negative values look
/// forward. `None` if the shift leaves chrono's date range.
pub fn recency_target(today: NaiveDate, days_ago: i64) -> Option<NaiveDate> {
    today.checked_sub_signed(Duration::try_days(days_ago)?)
}

/// Only the day of the month is compared: a record from any month or year
/// that shares the target's day-of-month matches.
pub fn matches_recency_day(created: NaiveDate, today: NaiveDate, days_ago: i64) -> bool {
    use chrono::Datelike;

    recency_target(today, days_ago).is_some_and(|target| created.day() == target.day())
}

/// Keeps the records whose creation day (in `now`'s time zone) matches the
/// recency target.
pub fn filter_by_recency<R, Tz>(records: Vec<R>, now: &DateTime<Tz>, days_ago: i64) -> Vec<R>
where
    R: Record,
    Tz: TimeZone,
{
    let today = now.date_naive();
    let tz = now.timezone();

    records
        .into_iter()
        .filter(|r| {
            let created = r.create_time().with_timezone(&tz).date_naive();
            matches_recency_day(created, today, days_ago)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::Joke;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn joke_at(id: i64, y: i32, m: u32, d: u32) -> Joke {
        let created = Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap();
        Joke::from_parts(id, format!("joke {id}"), created)
    }

    #[test]
    fn zero_days_targets_today() {
        let today = date(2026, 10, 16);
        assert_eq!(recency_target(today, 0), Some(today));
        assert!(matches_recency_day(today, today, 0));
        assert!(!matches_recency_day(date(2026, 10, 15), today, 0));
    }

    #[test]
    fn thirty_days_back_across_short_month_compares_day_only() {
        // March 31 minus 30 days is March 1, not "the 31st of last month".
        let today = date(2026, 3, 31);
        assert_eq!(recency_target(today, 30), Some(date(2026, 3, 1)));

        assert!(matches_recency_day(date(2026, 3, 1), today, 30));
        assert!(matches_recency_day(date(2026, 1, 1), today, 30));
        assert!(matches_recency_day(date(2019, 7, 1), today, 30));
        assert!(!matches_recency_day(date(2026, 3, 2), today, 30));
        assert!(!matches_recency_day(date(2026, 2, 28), today, 30));
    }

    #[test]
    fn negative_days_look_forward() {
        let today = date(2026, 12, 31);
        assert_eq!(recency_target(today, -1), Some(date(2027, 1, 1)));
    }

    #[test]
    fn out_of_range_shift_matches_nothing() {
        let today = date(2026, 10, 16);
        assert_eq!(recency_target(today, i64::MAX), None);
        assert!(!matches_recency_day(today, today, i64::MAX));
    }

    #[test]
    fn filter_keeps_same_day_of_month_records() {
        let now = Utc.with_ymd_and_hms(2026, 10, 16, 9, 30, 0).unwrap();
        let jokes = vec![
            joke_at(1, 2026, 10, 16),
            joke_at(2, 2026, 10, 15),
            joke_at(3, 2026, 9, 16),
            joke_at(4, 2026, 10, 14),
        ];

        let today: Vec<i64> = filter_by_recency(jokes.clone(), &now, 0)
            .iter()
            .map(|j| j.id)
            .collect();
        assert_eq!(today, vec![1, 3]);

        let two_days: Vec<i64> = filter_by_recency(jokes, &now, 2)
            .iter()
            .map(|j| j.id)
            .collect();
        assert_eq!(two_days, vec![4]);
    }
}
