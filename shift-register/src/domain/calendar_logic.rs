use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::domain::error::EngineError;
use crate::domain::models::{DateString, DayOfWeek, TemplateSlot};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// 祝日かどうかだけを問い合わせる口
pub trait HolidayLookup {
    fn is_holiday(&self, date: &str) -> bool;
}

/// 祝日を一切知らない場合
pub struct NoHolidays;

impl HolidayLookup for NoHolidays {
    fn is_holiday(&self, _date: &str) -> bool {
        false
    }
}

/// 「過去の日付」に今日を含めるかどうか
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PastDatePolicy {
    /// 今日を含めて過去扱い
    #[default]
    IncludeToday,
    BeforeToday,
}

pub fn parse_date(date: &str) -> Result<NaiveDate, EngineError> {
    NaiveDate::parse_from_str(date, DATE_FORMAT).map_err(|_| EngineError::InvalidDate(date.to_string()))
}

pub fn format_date(date: NaiveDate) -> DateString {
    date.format(DATE_FORMAT).to_string()
}

pub fn day_of_week(date: NaiveDate) -> DayOfWeek {
    date.weekday().num_days_from_sunday() as DayOfWeek
}

/// 月内の週番号 (1始まり、日曜始まり)
///
/// ```text
///        2026年 3月
/// Su Mo Tu We Th Fr Sa
///  1  2  3  4  5  6  7   <- 1
///  8  9 10 11 12 13 14   <- 2
///    ...
/// 29 30 31               <- 5
/// ```
pub fn week_number_in_month(date: NaiveDate) -> u32 {
    let first_day = date - Duration::days(date.day0() as i64);
    let first_sunday = first_day - Duration::days(first_day.weekday().num_days_from_sunday() as i64);

    ((date - first_sunday).num_days() / 7 + 1) as u32
}

/// 指定月の日付 (当月のみ)。month は 1-12
pub fn month_dates(year: i32, month: u32) -> Vec<NaiveDate> {
    match NaiveDate::from_ymd_opt(year, month, 1) {
        Some(first_day) => first_day
            .iter_days()
            .take_while(|d| d.month() == month)
            .collect(),
        None => Vec::new(),
    }
}

/// 指定月がカレンダー上で何週（何行）になるか。日曜始まり
pub fn weeks_in_month(year: i32, month: u32) -> Option<u32> {
    month_dates(year, month).last().copied().map(week_number_in_month)
}

pub fn is_past(date: NaiveDate, today: NaiveDate, policy: PastDatePolicy) -> bool {
    match policy {
        PastDatePolicy::IncludeToday => date <= today,
        PastDatePolicy::BeforeToday => date < today,
    }
}

/// 当月の未来の日付のみ（一括選択の対象）
pub fn future_dates_in_month(year: i32, month: u32, today: NaiveDate, policy: PastDatePolicy) -> Vec<DateString> {
    month_dates(year, month)
        .into_iter()
        .filter(|d| !is_past(*d, today, policy))
        .map(format_date)
        .collect()
}

/// 月〜金かつ祝日でない日
pub fn is_business_day(date: NaiveDate, holidays: &impl HolidayLookup) -> bool {
    let weekend = matches!(date.weekday(), Weekday::Sat | Weekday::Sun);
    !weekend && !holidays.is_holiday(&format_date(date))
}

pub fn weekday_count(year: i32, month: u32, holidays: &impl HolidayLookup) -> usize {
    month_dates(year, month)
        .into_iter()
        .filter(|d| is_business_day(*d, holidays))
        .count()
}

/// 土日または祝日の日数
pub fn holiday_count(year: i32, month: u32, holidays: &impl HolidayLookup) -> usize {
    month_dates(year, month)
        .into_iter()
        .filter(|d| !is_business_day(*d, holidays))
        .count()
}

/// 前月の日付を、同じ「日」で対象月に写す。存在しない日 (31日など) は落とす
pub fn copy_dates_into_month(previous: &[DateString], year: i32, month: u32) -> Vec<DateString> {
    let mut dates: Vec<DateString> = previous
        .iter()
        .filter_map(|d| parse_date(d).ok())
        .filter_map(|d| NaiveDate::from_ymd_opt(year, month, d.day()))
        .map(format_date)
        .collect();
    dates.sort();
    dates.dedup();
    dates
}

/// その曜日が月内で何回目か (1日〜7日が1回目)
pub fn weekday_ordinal(date: NaiveDate) -> u32 {
    date.day0() / 7 + 1
}

/// 選択された日付を「第N X曜日」のパターンにする。重複はまとめる
pub fn template_pattern(dates: &[DateString]) -> Vec<TemplateSlot> {
    let mut pattern: Vec<TemplateSlot> = dates
        .iter()
        .filter_map(|d| parse_date(d).ok())
        .map(|d| TemplateSlot {
            day_of_week: day_of_week(d),
            week_number: weekday_ordinal(d),
        })
        .collect();
    pattern.sort();
    pattern.dedup();
    pattern
}

/// パターンに当てはまる対象月の日付 (過去日を除く)
pub fn template_dates(
    pattern: &[TemplateSlot],
    year: i32,
    month: u32,
    today: NaiveDate,
    policy: PastDatePolicy,
) -> Vec<DateString> {
    month_dates(year, month)
        .into_iter()
        .filter(|d| !is_past(*d, today, policy))
        .filter(|d| {
            let slot = TemplateSlot {
                day_of_week: day_of_week(*d),
                week_number: weekday_ordinal(*d),
            };
            pattern.contains(&slot)
        })
        .map(format_date)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    #[test]
    fn week_number_sunday_start() {
        // 2026-03-01 は日曜
        assert_eq!(week_number_in_month(date("2026-03-01")), 1);
        assert_eq!(week_number_in_month(date("2026-03-07")), 1);
        assert_eq!(week_number_in_month(date("2026-03-08")), 2);
        assert_eq!(week_number_in_month(date("2026-03-31")), 5);
        // 2026-10-01 は木曜、10/4(日) から第2週
        assert_eq!(week_number_in_month(date("2026-10-03")), 1);
        assert_eq!(week_number_in_month(date("2026-10-04")), 2);
    }

    #[test]
    fn weeks_in_month_counts_rows() {
        assert_eq!(weeks_in_month(2026, 2), Some(4));
        assert_eq!(weeks_in_month(2026, 8), Some(6));
        assert_eq!(weeks_in_month(2026, 13), None);
    }

    #[test]
    fn day_of_week_is_sunday_based() {
        assert_eq!(day_of_week(date("2026-10-18")), 0);
        assert_eq!(day_of_week(date("2026-10-16")), 5);
    }

    #[test]
    fn invalid_dates_are_rejected() {
        assert!(parse_date("2026-02-30").is_err());
        assert!(parse_date("20261016").is_err());
    }

    #[test]
    fn past_policy() {
        let today = date("2026-10-16");
        assert!(is_past(today, today, PastDatePolicy::IncludeToday));
        assert!(!is_past(today, today, PastDatePolicy::BeforeToday));

        let future = future_dates_in_month(2026, 10, today, PastDatePolicy::IncludeToday);
        assert_eq!(future.first().map(String::as_str), Some("2026-10-17"));
        assert_eq!(future.len(), 15);
    }

    #[test]
    fn business_day_counts_respect_holidays() {
        struct Sports;
        impl HolidayLookup for Sports {
            fn is_holiday(&self, d: &str) -> bool {
                d == "2026-10-12"
            }
        }
        assert_eq!(weekday_count(2026, 10, &NoHolidays), 22);
        assert_eq!(weekday_count(2026, 10, &Sports), 21);
        assert_eq!(holiday_count(2026, 10, &Sports), 10);
    }

    #[test]
    fn copy_drops_missing_days() {
        let prev = vec![
            "2026-01-30".to_string(),
            "2026-01-31".to_string(),
            "2026-01-05".to_string(),
        ];
        assert_eq!(copy_dates_into_month(&prev, 2026, 2), vec!["2026-02-05".to_string()]);
    }

    #[test]
    fn template_maps_nth_weekday_onto_month() {
        // 2026-11-02 は第1月曜、11-10 は第2火曜
        let pattern = template_pattern(&[
            "2026-11-02".to_string(),
            "2026-11-10".to_string(),
            "2026-11-02".to_string(),
        ]);
        assert_eq!(
            pattern,
            vec![
                TemplateSlot { day_of_week: 1, week_number: 1 },
                TemplateSlot { day_of_week: 2, week_number: 2 },
            ]
        );

        // 12月は火曜始まりなので第1月曜は 12-07
        let today = date("2026-11-20");
        assert_eq!(
            template_dates(&pattern, 2026, 12, today, PastDatePolicy::IncludeToday),
            vec!["2026-12-07".to_string(), "2026-12-08".to_string()]
        );

        let today = date("2026-12-07");
        assert_eq!(
            template_dates(&pattern, 2026, 12, today, PastDatePolicy::IncludeToday),
            vec!["2026-12-08".to_string()]
        );
    }
}
