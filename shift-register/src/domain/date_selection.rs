use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::domain::calendar_logic::{self, HolidayLookup};
use crate::domain::models::{DateJobMap, DateString, DayOfWeek, JobId};

/// 勤務日の選択状態
///
/// メイン用の日付集合と、掛け持ち先用の DateJobMap が並存する。
/// どちらを操作するかは `current_job` (None = メイン) で決まる
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateSelection {
    primary_dates: BTreeSet<DateString>,
    date_job_map: DateJobMap,
    current_job: Option<JobId>,
}

impl DateSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// 保存データから復元する。重複IDと空リストはここで正規化する
    pub fn from_parts(primary_dates: impl IntoIterator<Item = DateString>, date_job_map: DateJobMap) -> Self {
        let mut normalized = DateJobMap::new();
        for (date, job_ids) in date_job_map {
            let mut unique: Vec<JobId> = Vec::with_capacity(job_ids.len());
            for id in job_ids {
                if !unique.contains(&id) {
                    unique.push(id);
                }
            }
            if !unique.is_empty() {
                normalized.insert(date, unique);
            }
        }

        Self {
            primary_dates: primary_dates.into_iter().collect(),
            date_job_map: normalized,
            current_job: None,
        }
    }

    pub fn current_job(&self) -> Option<JobId> {
        self.current_job
    }

    pub fn set_current_job(&mut self, job: Option<JobId>) {
        self.current_job = job;
    }

    pub fn primary_dates(&self) -> &BTreeSet<DateString> {
        &self.primary_dates
    }

    pub fn date_job_map(&self) -> &DateJobMap {
        &self.date_job_map
    }

    /// いずれかの勤務先で埋まっているか
    pub fn is_date_selected(&self, date: &str) -> bool {
        self.primary_dates.contains(date) || self.date_job_map.get(date).is_some_and(|ids| !ids.is_empty())
    }

    pub fn is_date_selected_for(&self, date: &str, job: Option<JobId>) -> bool {
        match job {
            None => self.primary_dates.contains(date),
            Some(id) => self.date_job_map.get(date).is_some_and(|ids| ids.contains(&id)),
        }
    }

    pub fn is_date_selected_for_current_job(&self, date: &str) -> bool {
        self.is_date_selected_for(date, self.current_job)
    }

    /// 対象がすべて現在のコンテキストで選択済みか (空なら false)
    pub fn is_all_selected(&self, dates: &[DateString]) -> bool {
        !dates.is_empty() && dates.iter().all(|d| self.is_date_selected_for_current_job(d))
    }

    /// 現在のコンテキストで選択されている日数
    pub fn selected_count(&self) -> usize {
        match self.current_job {
            None => self.primary_dates.len(),
            Some(id) => self.date_job_map.values().filter(|ids| ids.contains(&id)).count(),
        }
    }

    /// 現在のコンテキストで選択されている日付 (昇順)
    pub fn current_job_dates(&self) -> Vec<DateString> {
        match self.current_job {
            None => self.primary_dates.iter().cloned().collect(),
            Some(id) => self
                .date_job_map
                .iter()
                .filter(|(_, ids)| ids.contains(&id))
                .map(|(date, _)| date.clone())
                .collect(),
        }
    }

    /// どこかで選択されている全日付 (昇順)
    pub fn selected_dates(&self) -> Vec<DateString> {
        let union: BTreeSet<&DateString> = self.primary_dates.iter().chain(self.date_job_map.keys()).collect();
        union.into_iter().cloned().collect()
    }

    pub fn toggle_date(&mut self, date: &str) {
        if self.is_date_selected_for_current_job(date) {
            self.deselect(date);
        } else {
            self.select(date);
        }
    }

    /// 全選択（トグル）
    ///
    /// 変更前の状態で「全部選択済みか」を判定し、済みなら全解除、
    /// そうでなければ足りない日付をすべて追加する
    pub fn select_all(&mut self, dates: &[DateString]) {
        let all_selected = dates.iter().all(|d| self.is_date_selected_for_current_job(d));

        for date in dates {
            if all_selected {
                self.deselect(date);
            } else {
                self.select(date);
            }
        }
        debug!(count = dates.len(), deselected = all_selected, job = ?self.current_job, "select_all");
    }

    /// 曜日で選択（トグル）。解析できない日付は対象外
    pub fn select_by_weekday(&mut self, dates: &[DateString], day_of_week: DayOfWeek) {
        let targets: Vec<DateString> = dates
            .iter()
            .filter(|d| match calendar_logic::parse_date(d) {
                Ok(date) => calendar_logic::day_of_week(date) == day_of_week,
                Err(e) => {
                    warn!(error = %e, "skipping unparsable date in weekday selection");
                    false
                }
            })
            .cloned()
            .collect();

        self.select_all(&targets);
    }

    /// 平日のみ選択（土日祝日以外、トグル）
    pub fn select_weekdays_only(&mut self, dates: &[DateString], holidays: &impl HolidayLookup) {
        let targets: Vec<DateString> = dates
            .iter()
            .filter(|d| {
                calendar_logic::parse_date(d)
                    .map(|date| calendar_logic::is_business_day(date, holidays))
                    .unwrap_or(false)
            })
            .cloned()
            .collect();

        self.select_all(&targets);
    }

    /// 現在のコンテキストの選択をすべて解除
    pub fn clear_current(&mut self) {
        match self.current_job {
            None => self.primary_dates.clear(),
            Some(id) => {
                for ids in self.date_job_map.values_mut() {
                    ids.retain(|j| *j != id);
                }
                self.date_job_map.retain(|_, ids| !ids.is_empty());
            }
        }
    }

    pub fn clear_all(&mut self) {
        self.primary_dates.clear();
        self.date_job_map.clear();
    }

    /// 掛け持ち先削除のカスケード。空になった日付は DateJobMap から消え、
    /// メインでも選ばれていなければ選択状態から外れる
    ///
    /// 戻り値は選択状態から外れた日付
    pub fn purge_job(&mut self, job: JobId) -> Vec<DateString> {
        let mut emptied = Vec::new();
        for (date, ids) in self.date_job_map.iter_mut() {
            ids.retain(|j| *j != job);
            if ids.is_empty() {
                emptied.push(date.clone());
            }
        }
        for date in &emptied {
            self.date_job_map.remove(date);
        }

        if self.current_job == Some(job) {
            self.current_job = None;
        }

        emptied.retain(|d| !self.primary_dates.contains(d));
        emptied
    }

    fn select(&mut self, date: &str) {
        match self.current_job {
            None => {
                self.primary_dates.insert(date.to_string());
            }
            Some(id) => {
                let ids = self.date_job_map.entry(date.to_string()).or_default();
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }
    }

    fn deselect(&mut self, date: &str) {
        match self.current_job {
            None => {
                self.primary_dates.remove(date);
            }
            Some(id) => {
                if let Some(ids) = self.date_job_map.get_mut(date) {
                    ids.retain(|j| *j != id);
                    if ids.is_empty() {
                        self.date_job_map.remove(date);
                    }
                }
            }
        }
    }
}
