use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Dashboard period presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodFilter {
    Today,
    /// Sunday 00:00 through the end of today.
    ThisWeek,
    ThisMonth,
    ThisYear,
    Custom,
}

impl PeriodFilter {
    pub fn granularity(self) -> Granularity {
        match self {
            PeriodFilter::ThisYear => Granularity::Month,
            _ => Granularity::Day,
        }
    }
}

/// Bucket size for sales-by-period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Day,
    Month,
}

/// Inclusive time range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at <= self.end
    }
}

const DEFAULT_WINDOW_DAYS: i64 = 30;

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

/// Last representable instant of `date` at microsecond precision (what
/// Postgres stores).
fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    midnight(date) + Duration::days(1) - Duration::microseconds(1)
}

fn last_second_of(date: NaiveDate) -> DateTime<Utc> {
    midnight(date) + Duration::days(1) - Duration::seconds(1)
}

/// Resolve the report window.
///
/// Missing dates default to the last 30 days. A preset period replaces the
/// dates entirely; `Custom` keeps them and swaps inverted bounds.
pub fn resolve_range(
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    period: Option<PeriodFilter>,
    now: DateTime<Utc>,
) -> DateRange {
    let window = Duration::days(DEFAULT_WINDOW_DAYS);
    let (mut start, mut end) = match (start, end) {
        (None, None) => (now - window, now),
        (Some(s), None) => (s, now),
        (None, Some(e)) => (e - window, e),
        (Some(s), Some(e)) => (s, e),
    };

    let today = now.date_naive();
    match period {
        Some(PeriodFilter::Today) => {
            start = midnight(today);
            end = end_of_day(today);
        }
        Some(PeriodFilter::ThisWeek) => {
            let since_sunday = i64::from(today.weekday().num_days_from_sunday());
            start = midnight(today - Duration::days(since_sunday));
            end = end_of_day(today);
        }
        Some(PeriodFilter::ThisMonth) => {
            let first = today - Duration::days(i64::from(today.day0()));
            let last = first
                .checked_add_months(Months::new(1))
                .and_then(|next| next.pred_opt())
                .unwrap_or(today);
            start = midnight(first);
            end = last_second_of(last);
        }
        Some(PeriodFilter::ThisYear) => {
            let first = today - Duration::days(i64::from(today.ordinal0()));
            let last = NaiveDate::from_ymd_opt(today.year(), 12, 31).unwrap_or(today);
            start = midnight(first);
            end = last_second_of(last);
        }
        Some(PeriodFilter::Custom) => {
            if start > end {
                std::mem::swap(&mut start, &mut end);
            }
        }
        None => {}
    }

    DateRange { start, end }
}
