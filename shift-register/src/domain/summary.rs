use std::collections::BTreeMap;

use serde::Serialize;

use crate::domain::models::{JobId, WorkDay};
use crate::domain::time_calc;

/// 合計表示用の情報 (削除された勤務日は含まない)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalSummary {
    pub work_days: usize,
    pub total_work_minutes: u32,
    /// 休憩を引いた時間
    pub total_actual_work_minutes: u32,
    pub total_break_minutes: u32,
}

impl TotalSummary {
    fn add(&mut self, work_day: &WorkDay, include_break: bool) {
        self.work_days += 1;
        self.total_work_minutes += work_day.work_minutes;

        if include_break {
            let result = time_calc::break_time_result(work_day.work_minutes);
            self.total_break_minutes += result.break_minutes;
            self.total_actual_work_minutes += result.actual_work_minutes;
        } else {
            self.total_actual_work_minutes += work_day.work_minutes;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub job_id: Option<JobId>,
    #[serde(flatten)]
    pub summary: TotalSummary,
}

pub fn total_summary(work_days: &[WorkDay], include_break: bool) -> TotalSummary {
    let mut summary = TotalSummary::default();
    for work_day in work_days.iter().filter(|d| !d.is_removed) {
        summary.add(work_day, include_break);
    }
    summary
}

/// 勤務先ごとの合計。メイン (None) が先頭、続いて JobId 昇順
pub fn job_summaries(work_days: &[WorkDay], include_break: bool) -> Vec<JobSummary> {
    let mut by_job: BTreeMap<Option<JobId>, TotalSummary> = BTreeMap::new();
    for work_day in work_days.iter().filter(|d| !d.is_removed) {
        by_job.entry(work_day.job_id).or_default().add(work_day, include_break);
    }

    by_job
        .into_iter()
        .map(|(job_id, summary)| JobSummary { job_id, summary })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::domain::models::{DateJobMap, DateString};
    use crate::domain::work_day::{materialize, TimeDefaults};

    #[test]
    fn totals_exclude_removed_and_split_by_job() {
        let job = JobId::new(2).unwrap();
        let dates: Vec<DateString> = vec!["2026-11-02".into(), "2026-11-03".into()];
        let primary: BTreeSet<DateString> = dates.iter().cloned().collect();
        let mut map = DateJobMap::new();
        map.insert("2026-11-03".into(), vec![job]);

        let mut days = materialize(&dates, &map, &primary, &TimeDefaults::default());
        assert_eq!(days.len(), 3);
        days[1].is_removed = true;

        let plain = total_summary(&days, false);
        assert_eq!(plain.work_days, 2);
        assert_eq!(plain.total_work_minutes, 1080);
        assert_eq!(plain.total_actual_work_minutes, 1080);
        assert_eq!(plain.total_break_minutes, 0);

        let with_break = total_summary(&days, true);
        assert_eq!(with_break.total_break_minutes, 120);
        assert_eq!(with_break.total_actual_work_minutes, 960);

        let per_job = job_summaries(&days, true);
        assert_eq!(per_job.len(), 2);
        assert_eq!(per_job[0].job_id, None);
        assert_eq!(per_job[0].summary.work_days, 1);
        assert_eq!(per_job[1].job_id, Some(job));
    }
}
