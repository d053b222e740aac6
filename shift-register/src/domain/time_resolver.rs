//! 個別設定・一括設定による時刻の書き換え
//!
//! どの仕組みが最後に値を入れたか (`SetBy`) を記録し、後続の一括適用が
//! 個別入力を上書きするかどうかを判断できるようにする。

use tracing::debug;

use crate::domain::error::TimeError;
use crate::domain::models::{
    BulkApplyTarget, BulkApplyType, BulkSettings, DayOfWeek, JobFilter, SetBy, TimeString, WorkDay,
};
use crate::domain::time_calc;

/// 個別編集の内容。None のフィールドは触らない
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeUpdate {
    pub start_time: Option<TimeString>,
    pub end_time: Option<TimeString>,
    /// 過去のシフトからコピーした値なら true (provenance が base になる)
    pub from_base: bool,
}

impl TimeUpdate {
    pub fn both(start: impl Into<TimeString>, end: impl Into<TimeString>) -> Self {
        Self { start_time: Some(start.into()), end_time: Some(end.into()), from_base: false }
    }

    pub fn start(start: impl Into<TimeString>) -> Self {
        Self { start_time: Some(start.into()), ..Self::default() }
    }

    pub fn end(end: impl Into<TimeString>) -> Self {
        Self { end_time: Some(end.into()), ..Self::default() }
    }

    pub fn from_base(mut self) -> Self {
        self.from_base = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub start_changed: bool,
    pub end_changed: bool,
    /// start == end で 24 時間勤務になった (UI で確認する)
    pub full_day_wrap: bool,
}

/// 一括適用の絞り込み。空のリストは「指定なし」
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkFilter {
    pub weekdays: Vec<DayOfWeek>,
    pub week_numbers: Vec<u32>,
    pub job: JobFilter,
}

impl BulkFilter {
    pub fn matches(&self, work_day: &WorkDay) -> bool {
        (self.weekdays.is_empty() || self.weekdays.contains(&work_day.day_of_week))
            && (self.week_numbers.is_empty() || self.week_numbers.contains(&work_day.week_number))
            && self.job.matches(work_day.job_id)
    }
}

/// 勤務日を個別に更新する
///
/// 範囲外の index は何もしない (`Ok(None)`)。実際に値が変わったフィールドだけ
/// custom (または base) として記録する
pub fn update_work_day(
    work_days: &mut [WorkDay],
    index: usize,
    update: &TimeUpdate,
) -> Result<Option<UpdateOutcome>, TimeError> {
    for time in [&update.start_time, &update.end_time].into_iter().flatten() {
        time_calc::parse_time(time)?;
    }

    let Some(work_day) = work_days.get_mut(index) else {
        return Ok(None);
    };

    let set_by = if update.from_base { SetBy::Base } else { SetBy::Custom };

    let start_changed = match &update.start_time {
        Some(start) if *start != work_day.start_time => {
            work_day.start_time = start.clone();
            work_day.start_time_set_by = set_by;
            true
        }
        _ => false,
    };
    let end_changed = match &update.end_time {
        Some(end) if *end != work_day.end_time => {
            work_day.end_time = end.clone();
            work_day.end_time_set_by = set_by;
            true
        }
        _ => false,
    };

    if update.from_base && (start_changed || end_changed) {
        work_day.is_from_base = true;
    }
    work_day.recompute_work_minutes();
    work_day.refresh_custom_flags();

    debug!(index, date = %work_day.date, start_changed, end_changed, "work day updated");

    Ok(Some(UpdateOutcome {
        start_changed,
        end_changed,
        full_day_wrap: work_day.start_time == work_day.end_time,
    }))
}

/// 一括適用。書き換えた件数を返す
pub fn apply_bulk(
    work_days: &mut [WorkDay],
    settings: &BulkSettings,
    kind: BulkApplyType,
    target: BulkApplyTarget,
    filter: &BulkFilter,
) -> usize {
    let mut applied = 0;

    for work_day in work_days.iter_mut() {
        if work_day.is_removed {
            continue;
        }
        if target == BulkApplyTarget::UnmodifiedOnly && work_day.is_modified {
            continue;
        }
        if !filter.matches(work_day) {
            continue;
        }

        if kind.writes_start() {
            work_day.start_time = settings.start_time.clone();
            work_day.start_time_set_by = SetBy::Bulk;
        }
        if kind.writes_end() {
            work_day.end_time = settings.end_time.clone();
            work_day.end_time_set_by = SetBy::Bulk;
        }
        work_day.recompute_work_minutes();
        work_day.refresh_custom_flags();
        if work_day.start_time_set_by != SetBy::Base && work_day.end_time_set_by != SetBy::Base {
            work_day.is_from_base = false;
        }

        // 初期値に戻っただけなら一括適用扱いにしない
        if !work_day.is_modified {
            work_day.is_bulk_applied = work_day.differs_from_initial();
        }
        applied += 1;
    }

    debug!(?kind, ?target, applied, "bulk settings applied");
    applied
}

/// 個別設定された勤務日のみ
pub fn modified_work_days(work_days: &[WorkDay]) -> Vec<&WorkDay> {
    work_days.iter().filter(|d| d.is_modified && !d.is_removed).collect()
}

/// 個別設定されていない勤務日のみ
pub fn unmodified_work_days(work_days: &[WorkDay]) -> Vec<&WorkDay> {
    work_days.iter().filter(|d| !d.is_modified && !d.is_removed).collect()
}

/// 一括適用が個別設定を上書きしてしまうか (呼び出し側で all / unmodifiedOnly を選ばせる)
pub fn needs_target_choice(work_days: &[WorkDay], filter: &BulkFilter) -> bool {
    work_days
        .iter()
        .any(|d| !d.is_removed && d.is_modified && filter.matches(d))
}

/// シフトから外す
pub fn remove_work_day(work_days: &mut [WorkDay], index: usize) -> bool {
    match work_days.get_mut(index) {
        Some(work_day) => {
            work_day.is_removed = true;
            true
        }
        None => false,
    }
}

/// 削除/復活を切り替え、新しい状態を返す
pub fn toggle_remove_day(work_days: &mut [WorkDay], index: usize) -> Option<bool> {
    let work_day = work_days.get_mut(index)?;
    work_day.is_removed = !work_day.is_removed;
    Some(work_day.is_removed)
}
