use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::calendar_logic;
use crate::domain::models::{DateJobMap, DateString, JobId, SetBy, TimeSlot, WorkDay, WorkDayKey};
use crate::domain::time_calc;

pub const DEFAULT_START_TIME: &str = "09:00";
pub const DEFAULT_END_TIME: &str = "18:00";

/// ヘッダーで設定するデフォルト時刻 ({main, jobs} 形式)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultTimes {
    pub main: TimeSlot,
    #[serde(default)]
    pub jobs: BTreeMap<JobId, TimeSlot>,
}

impl Default for DefaultTimes {
    fn default() -> Self {
        Self {
            main: TimeSlot::new(DEFAULT_START_TIME, DEFAULT_END_TIME),
            jobs: BTreeMap::new(),
        }
    }
}

/// 新規勤務日に入れる時刻の解決表
///
/// 掛け持ち先ごとの上書き (job_overrides) > defaultTimes.jobs > defaultTimes.main
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeDefaults {
    pub default_times: DefaultTimes,
    pub job_overrides: BTreeMap<JobId, TimeSlot>,
}

impl TimeDefaults {
    pub fn resolve(&self, job: Option<JobId>) -> &TimeSlot {
        job.and_then(|id| self.job_overrides.get(&id).or_else(|| self.default_times.jobs.get(&id)))
            .unwrap_or(&self.default_times.main)
    }

    pub fn forget_job(&mut self, job: JobId) {
        self.job_overrides.remove(&job);
        self.default_times.jobs.remove(&job);
    }
}

impl WorkDay {
    /// デフォルト時刻で新しい勤務日を作る
    pub fn with_defaults(date: NaiveDate, job_id: Option<JobId>, slot: &TimeSlot) -> WorkDay {
        let mut work_day = WorkDay {
            date: calendar_logic::format_date(date),
            day_of_week: calendar_logic::day_of_week(date),
            week_number: calendar_logic::week_number_in_month(date),
            start_time: slot.start_time.clone(),
            end_time: slot.end_time.clone(),
            initial_start_time: slot.start_time.clone(),
            initial_end_time: slot.end_time.clone(),
            work_minutes: 0,
            is_modified: false,
            is_removed: false,
            custom_start_time: false,
            custom_end_time: false,
            is_bulk_applied: false,
            is_from_base: false,
            start_time_set_by: SetBy::Default,
            end_time_set_by: SetBy::Default,
            job_id,
        };
        work_day.recompute_work_minutes();
        work_day
    }

    pub fn recompute_work_minutes(&mut self) {
        self.work_minutes = match time_calc::work_minutes(&self.start_time, &self.end_time) {
            Ok(minutes) => minutes,
            Err(e) => {
                warn!(date = %self.date, error = %e, "work day carries a malformed time");
                0
            }
        };
    }
}

/// その日の勤務先を並べる。メイン (選択されていれば) が先、次に掛け持ち先をリスト順で
pub fn occupants(date: &str, date_job_map: &DateJobMap, primary_dates: &BTreeSet<DateString>) -> Vec<Option<JobId>> {
    let mut jobs = Vec::new();
    if primary_dates.contains(date) {
        jobs.push(None);
    }
    if let Some(ids) = date_job_map.get(date) {
        jobs.extend(ids.iter().copied().map(Some));
    }
    jobs
}

/// 選択された (日付 × 勤務先) を勤務日のリストに展開する
pub fn materialize(
    dates: &[DateString],
    date_job_map: &DateJobMap,
    primary_dates: &BTreeSet<DateString>,
    defaults: &TimeDefaults,
) -> Vec<WorkDay> {
    resync(Vec::new(), dates, date_job_map, primary_dates, defaults)
}

/// カレンダーの選択状態と同期する（個別設定を保持）
///
/// 既存の (日付, 勤務先) はそのまま引き継ぎ、新しい組だけ作る。
/// 入力から消えた組は捨てる (isRemoved にはしない)
pub fn resync(
    existing: Vec<WorkDay>,
    dates: &[DateString],
    date_job_map: &DateJobMap,
    primary_dates: &BTreeSet<DateString>,
    defaults: &TimeDefaults,
) -> Vec<WorkDay> {
    let previous_len = existing.len();
    let mut existing: HashMap<WorkDayKey, WorkDay> = existing.into_iter().map(|wd| (wd.key(), wd)).collect();
    let mut seen: HashSet<WorkDayKey> = HashSet::new();
    let mut work_days = Vec::new();
    let mut created = 0usize;

    for date in dates {
        let parsed = match calendar_logic::parse_date(date) {
            Ok(d) => d,
            Err(e) => {
                warn!(error = %e, "skipping unparsable date during materialization");
                continue;
            }
        };

        for job_id in occupants(date, date_job_map, primary_dates) {
            let key = (date.clone(), job_id);
            if !seen.insert(key.clone()) {
                continue;
            }

            match existing.remove(&key) {
                Some(work_day) => work_days.push(work_day),
                None => {
                    work_days.push(WorkDay::with_defaults(parsed, job_id, defaults.resolve(job_id)));
                    created += 1;
                }
            }
        }
    }

    debug!(
        previous = previous_len,
        kept = work_days.len() - created,
        created,
        dropped = existing.len(),
        "work days synced"
    );
    work_days
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: u8) -> JobId {
        JobId::new(raw).unwrap()
    }

    fn dates(list: &[&str]) -> Vec<DateString> {
        list.iter().map(|d| d.to_string()).collect()
    }

    fn primary(list: &[&str]) -> BTreeSet<DateString> {
        list.iter().map(|d| d.to_string()).collect()
    }

    #[test]
    fn primary_first_then_side_jobs_in_list_order() {
        let mut map = DateJobMap::new();
        map.insert("2026-11-02".into(), vec![id(3), id(1)]);

        let work_days = materialize(
            &dates(&["2026-11-02"]),
            &map,
            &primary(&["2026-11-02"]),
            &TimeDefaults::default(),
        );

        let jobs: Vec<_> = work_days.iter().map(|w| w.job_id).collect();
        assert_eq!(jobs, vec![None, Some(id(3)), Some(id(1))]);
    }

    #[test]
    fn new_records_use_resolved_defaults() {
        let mut defaults = TimeDefaults::default();
        defaults.default_times.jobs.insert(id(1), TimeSlot::new("10:00", "15:00"));
        defaults.default_times.jobs.insert(id(2), TimeSlot::new("11:00", "16:00"));
        defaults.job_overrides.insert(id(2), TimeSlot::new("18:00", "23:00"));

        let mut map = DateJobMap::new();
        map.insert("2026-11-04".into(), vec![id(1), id(2)]);
        let work_days = materialize(&dates(&["2026-11-04"]), &map, &primary(&["2026-11-04"]), &defaults);

        assert_eq!(work_days[0].time_slot(), TimeSlot::new("09:00", "18:00"));
        assert_eq!(work_days[1].time_slot(), TimeSlot::new("10:00", "15:00"));
        assert_eq!(work_days[2].time_slot(), TimeSlot::new("18:00", "23:00"));

        let first = &work_days[0];
        assert_eq!(first.work_minutes, 540);
        assert_eq!(first.initial_start_time, "09:00");
        assert_eq!(first.start_time_set_by, SetBy::Default);
        assert_eq!((first.day_of_week, first.week_number), (3, 1));
        assert!(!first.is_modified && !first.is_bulk_applied);
    }

    #[test]
    fn duplicate_dates_do_not_duplicate_records() {
        let work_days = materialize(
            &dates(&["2026-11-05", "2026-11-05"]),
            &DateJobMap::new(),
            &primary(&["2026-11-05"]),
            &TimeDefaults::default(),
        );
        assert_eq!(work_days.len(), 1);
    }

    #[test]
    fn resync_keeps_existing_and_drops_missing() {
        let defaults = TimeDefaults::default();
        let mut work_days = materialize(
            &dates(&["2026-11-05", "2026-11-06"]),
            &DateJobMap::new(),
            &primary(&["2026-11-05", "2026-11-06"]),
            &defaults,
        );
        work_days[0].start_time = "07:00".into();
        work_days[0].start_time_set_by = SetBy::Custom;
        work_days[0].refresh_custom_flags();
        let kept = work_days[0].clone();

        let synced = resync(
            work_days,
            &dates(&["2026-11-05", "2026-11-07"]),
            &DateJobMap::new(),
            &primary(&["2026-11-05", "2026-11-07"]),
            &defaults,
        );

        assert_eq!(synced.len(), 2);
        assert_eq!(synced[0], kept);
        assert_eq!(synced[1].date, "2026-11-07");
        assert_eq!(synced[1].start_time, "09:00");
    }
}
