// =====================
// 保存データの形
// =====================
//
// settings テーブルの value 列に入る JSON。キーごとに1レコード

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::models::{DateJobMap, DateString, HolidayData, Job, JobId, TemplateSlot, TimeSlot, TimeString};
use crate::domain::time_calc;
use crate::domain::work_day::DefaultTimes;

pub const KEY_JOBS: &str = "jobs";
pub const KEY_DATE_JOB_MAP: &str = "dateJobMap";
pub const KEY_SELECTED_DATES: &str = "selectedDates";
pub const KEY_MAIN_STORE_NAME: &str = "mainStoreName";
pub const KEY_DEFAULT_TIMES: &str = "defaultTimes";
pub const KEY_JOB_DEFAULT_TIMES: &str = "jobDefaultTimes";
pub const KEY_HOLIDAYS_CACHE: &str = "holidays_cache";
pub const KEY_PREVIOUS_MONTH_DATA: &str = "previousMonthData";
pub const KEY_SHIFT_TEMPLATE: &str = "shiftTemplate";

pub const ALL_KEYS: [&str; 9] = [
    KEY_JOBS,
    KEY_DATE_JOB_MAP,
    KEY_SELECTED_DATES,
    KEY_MAIN_STORE_NAME,
    KEY_DEFAULT_TIMES,
    KEY_JOB_DEFAULT_TIMES,
    KEY_HOLIDAYS_CACHE,
    KEY_PREVIOUS_MONTH_DATA,
    KEY_SHIFT_TEMPLATE,
];

/// セッションをまたいで残す設定一式
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedState {
    pub jobs: Vec<Job>,
    pub date_job_map: DateJobMap,
    /// メインの勤務先で選択された日付
    pub selected_dates: Vec<DateString>,
    pub main_store_name: String,
    pub default_times: DefaultTimes,
    pub job_default_times: BTreeMap<JobId, TimeSlot>,
}

/// 取得済み祝日データと取得時刻
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HolidayCache {
    pub fetched_at: DateTime<Utc>,
    pub data: HolidayData,
}

/// 前月に提出した日付 (「前月コピー」用)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviousMonthData {
    pub year: i32,
    /// 1-12
    pub month: u32,
    pub dates: Vec<DateString>,
}

/// 保存したシフトのテンプレート
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarTemplate {
    pub pattern: Vec<TemplateSlot>,
    pub saved_at: DateTime<Utc>,
}

/// defaultTimes の読み込み用。新旧どちらの形も受ける
///
/// ```text
/// 旧: { "startTime": "09:00", "endTime": "18:00" }
/// 新: { "main": { "startTime": ..., "endTime": ... }, "jobs": { "1": { ... } } }
/// ```
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDefaultTimes {
    main: Option<TimeSlot>,
    #[serde(default)]
    jobs: BTreeMap<JobId, TimeSlot>,
    start_time: Option<TimeString>,
    end_time: Option<TimeString>,
}

/// defaultTimes をデコードする。旧形式だった場合は2つ目が true
///
/// 時刻が壊れているスロットは fallback (main) で置き換えるか、捨てる (jobs)
pub fn decode_default_times(raw: &str, fallback: &TimeSlot) -> Result<(DefaultTimes, bool), serde_json::Error> {
    let parsed: RawDefaultTimes = serde_json::from_str(raw)?;

    let (main, upgraded) = match parsed.main {
        Some(main) => (main, false),
        None => {
            let start_time = parsed.start_time.unwrap_or_else(|| fallback.start_time.clone());
            let end_time = parsed.end_time.unwrap_or_else(|| fallback.end_time.clone());
            (TimeSlot { start_time, end_time }, true)
        }
    };

    let main = if is_valid_slot(&main) {
        main
    } else {
        warn!(?main, "stored main default times are malformed, using compiled-in defaults");
        fallback.clone()
    };

    let jobs = parsed
        .jobs
        .into_iter()
        .filter(|(id, slot)| {
            let valid = is_valid_slot(slot);
            if !valid {
                warn!(job_id = %id, ?slot, "dropping malformed job default times");
            }
            valid
        })
        .collect();

    Ok((DefaultTimes { main, jobs }, upgraded))
}

/// dateJobMap の生データ。範囲外の JobId があっても全体は捨てない
pub type RawDateJobMap = BTreeMap<DateString, Vec<u8>>;

/// 範囲外の JobId だけを落とす。空になった日付は残さない
pub fn decode_date_job_map(raw: RawDateJobMap) -> DateJobMap {
    raw.into_iter()
        .filter_map(|(date, ids)| {
            let ids: Vec<JobId> = ids
                .into_iter()
                .filter_map(|raw_id| {
                    let id = JobId::new(raw_id);
                    if id.is_none() {
                        warn!(date = %date, job_id = raw_id, "dropping out-of-range job id from dateJobMap");
                    }
                    id
                })
                .collect();
            (!ids.is_empty()).then_some((date, ids))
        })
        .collect()
}

pub fn is_valid_slot(slot: &TimeSlot) -> bool {
    time_calc::parse_time(&slot.start_time).is_ok() && time_calc::parse_time(&slot.end_time).is_ok()
}
