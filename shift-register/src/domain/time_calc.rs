//! "HH:MM" 文字列の時刻計算
//!
//! 終了時刻が開始時刻以下なら翌日にまたがる勤務とみなす。

use crate::domain::error::TimeError;
use crate::domain::models::TimeString;

pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// 休憩時間のルール (min 以上 max 未満 -> break)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakRule {
    pub min_work_minutes: u32,
    /// None は上限なし
    pub max_work_minutes: Option<u32>,
    pub break_minutes: u32,
}

pub const BREAK_RULES: [BreakRule; 3] = [
    BreakRule { min_work_minutes: 0, max_work_minutes: Some(6 * 60), break_minutes: 0 },
    BreakRule { min_work_minutes: 6 * 60, max_work_minutes: Some(8 * 60), break_minutes: 45 },
    BreakRule { min_work_minutes: 8 * 60, max_work_minutes: None, break_minutes: 60 },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakTimeResult {
    pub break_minutes: u32,
    pub actual_work_minutes: u32,
}

/// "HH:MM" を 0:00 からの経過分に変換する
pub fn parse_time(time: &str) -> Result<u32, TimeError> {
    let malformed = || TimeError::Malformed(time.to_string());

    let (hour, minute) = time.split_once(':').ok_or_else(malformed)?;
    if hour.is_empty() || hour.len() > 2 || minute.len() != 2 {
        return Err(malformed());
    }
    let hour: u32 = hour.parse().map_err(|_| malformed())?;
    let minute: u32 = minute.parse().map_err(|_| malformed())?;

    if hour > 23 || minute > 59 {
        return Err(malformed());
    }
    Ok(hour * 60 + minute)
}

/// 経過分を "HH:MM" に戻す (1440 以上は翌日分を落とす)
pub fn format_time(minutes: u32) -> TimeString {
    let minutes = minutes % MINUTES_PER_DAY;
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

/// 勤務時間（分）。常に 1..=1440 を返し、start == end は 1440 (丸一日)
pub fn work_minutes(start: &str, end: &str) -> Result<u32, TimeError> {
    let (start_minutes, end_minutes) = minute_interval(start, end)?;
    Ok(end_minutes - start_minutes)
}

/// 開始・終了を [start, end) の分区間にする。end は start を基準に繰り上げる
pub fn minute_interval(start: &str, end: &str) -> Result<(u32, u32), TimeError> {
    let start_minutes = parse_time(start)?;
    let mut end_minutes = parse_time(end)?;

    if end_minutes <= start_minutes {
        end_minutes += MINUTES_PER_DAY;
    }
    Ok((start_minutes, end_minutes))
}

/// start == end で 24 時間勤務になるケース。UI 側で確認を取る境界条件
pub fn is_full_day_wrap(start: &str, end: &str) -> Result<bool, TimeError> {
    Ok(parse_time(start)? == parse_time(end)?)
}

pub fn is_valid_time_range(start: &str, end: &str) -> bool {
    matches!(work_minutes(start, end), Ok(m) if m > 0 && m <= MINUTES_PER_DAY)
}

pub fn break_minutes(work_minutes: u32) -> u32 {
    BREAK_RULES
        .iter()
        .find(|rule| {
            work_minutes >= rule.min_work_minutes
                && rule.max_work_minutes.map_or(true, |max| work_minutes < max)
        })
        .map_or(0, |rule| rule.break_minutes)
}

pub fn actual_work_minutes(work_minutes: u32) -> u32 {
    work_minutes.saturating_sub(break_minutes(work_minutes))
}

pub fn break_time_result(work_minutes: u32) -> BreakTimeResult {
    BreakTimeResult {
        break_minutes: break_minutes(work_minutes),
        actual_work_minutes: actual_work_minutes(work_minutes),
    }
}

/// 540 -> "9時間", 570 -> "9時間30分"
pub fn format_minutes_as_hours(minutes: u32) -> String {
    let hours = minutes / 60;
    let mins = minutes % 60;

    if mins == 0 {
        format!("{hours}時間")
    } else {
        format!("{hours}時間{mins}分")
    }
}
