//! 1ユーザーセッション分の状態
//!
//! 日付選択・掛け持ち先・デフォルト時刻・勤務日リストをひとまとめに持ち、
//! 画面側の操作はすべてここを通す。セッション開始時に作り、
//! 「最初からやり直す」で `reset` する

use std::collections::{BTreeMap, BTreeSet};
use std::mem;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::application::dto::{SubmissionEntry, SubmissionPayload};
use crate::application::holidays::HolidayCalendar;
use crate::config::EngineConfig;
use crate::domain::calendar_logic::{self, PastDatePolicy};
use crate::domain::conflict;
use crate::domain::date_selection::DateSelection;
use crate::domain::error::{EngineError, RegistryError, TimeError};
use crate::domain::job_registry::JobRegistry;
use crate::domain::models::{
    BulkApplyTarget, BulkApplyType, BulkSettings, ConflictInfo, DateJobMap, DateString, DayOfWeek, Job, JobFilter,
    JobId, TimeSlot, WorkDay,
};
use crate::domain::summary::{self, JobSummary, TotalSummary};
use crate::domain::time_calc;
use crate::domain::time_resolver::{self, BulkFilter, TimeUpdate, UpdateOutcome};
use crate::domain::work_day::{self, DefaultTimes, TimeDefaults};
use crate::infrastructure::persisted::{CalendarTemplate, PersistedState, PreviousMonthData};

/// 画面の段階
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    /// 日付選択
    #[default]
    Calendar,
    /// 時間登録
    TimeRegister,
    /// 確認
    Confirm,
}

#[derive(Debug, Clone)]
pub struct ShiftSession {
    registry: JobRegistry,
    selection: DateSelection,
    defaults: TimeDefaults,
    main_store_name: String,
    work_days: Vec<WorkDay>,
    bulk_settings: BulkSettings,
    job_filter: JobFilter,
    include_break: bool,
    remarks: String,
    holidays: HolidayCalendar,
    past_date_policy: PastDatePolicy,
    stage: Stage,
    previous_month: Option<PreviousMonthData>,
    template: Option<CalendarTemplate>,
}

impl ShiftSession {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            registry: JobRegistry::new(),
            selection: DateSelection::new(),
            defaults: TimeDefaults {
                default_times: DefaultTimes {
                    main: config.default_times.clone(),
                    jobs: BTreeMap::new(),
                },
                job_overrides: BTreeMap::new(),
            },
            main_store_name: config.main_store_name.clone(),
            work_days: Vec::new(),
            bulk_settings: config.default_times.clone(),
            job_filter: JobFilter::All,
            include_break: false,
            remarks: String::new(),
            holidays: HolidayCalendar::default(),
            past_date_policy: config.past_date_policy,
            stage: Stage::Calendar,
            previous_month: None,
            template: None,
        }
    }

    /// 保存データから復元する
    ///
    /// 登録簿に無い JobId と解析できない日付はここで落とす
    pub fn restore(config: &EngineConfig, state: PersistedState) -> Self {
        let mut session = Self::new(config);
        session.registry = JobRegistry::from_jobs(state.jobs);

        let mut date_job_map = DateJobMap::new();
        for (date, ids) in state.date_job_map {
            if calendar_logic::parse_date(&date).is_err() {
                warn!(date = %date, "dropping unparsable date from dateJobMap");
                continue;
            }
            let known: Vec<JobId> = ids.into_iter().filter(|id| session.registry.contains(*id)).collect();
            date_job_map.insert(date, known);
        }
        let primary_dates = state.selected_dates.into_iter().filter(|date| {
            let valid = calendar_logic::parse_date(date).is_ok();
            if !valid {
                warn!(date = %date, "dropping unparsable selected date");
            }
            valid
        });
        session.selection = DateSelection::from_parts(primary_dates, date_job_map);
        session.registry.set_active(None);

        if !state.main_store_name.trim().is_empty() {
            session.main_store_name = state.main_store_name;
        }
        session.bulk_settings = state.default_times.main.clone();
        session.defaults = TimeDefaults {
            default_times: state.default_times,
            job_overrides: state.job_default_times,
        };
        for id in JobId::all().filter(|id| !session.registry.contains(*id)) {
            session.defaults.forget_job(id);
        }

        debug!(
            jobs = session.registry.len(),
            dates = session.selection.selected_dates().len(),
            "session restored"
        );
        session
    }

    /// 保存対象の状態
    pub fn to_persisted(&self) -> PersistedState {
        PersistedState {
            jobs: self.registry.jobs().to_vec(),
            date_job_map: self.selection.date_job_map().clone(),
            selected_dates: self.selection.primary_dates().iter().cloned().collect(),
            main_store_name: self.main_store_name.clone(),
            default_times: self.defaults.default_times.clone(),
            job_default_times: self.defaults.job_overrides.clone(),
        }
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    pub fn selection(&self) -> &DateSelection {
        &self.selection
    }

    pub fn defaults(&self) -> &TimeDefaults {
        &self.defaults
    }

    pub fn work_days(&self) -> &[WorkDay] {
        &self.work_days
    }

    pub fn bulk_settings(&self) -> &BulkSettings {
        &self.bulk_settings
    }

    pub fn job_filter(&self) -> JobFilter {
        self.job_filter
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn holidays(&self) -> &HolidayCalendar {
        &self.holidays
    }

    pub fn main_store_name(&self) -> &str {
        &self.main_store_name
    }

    pub fn remarks(&self) -> &str {
        &self.remarks
    }

    pub fn previous_month(&self) -> Option<&PreviousMonthData> {
        self.previous_month.as_ref()
    }

    /// 勤務先の表示名。メイン (None) は店舗名
    pub fn job_name(&self, job: Option<JobId>) -> Option<&str> {
        match job {
            None => Some(&self.main_store_name),
            Some(id) => self.registry.get(id).map(|j| j.name.as_str()),
        }
    }

    pub fn set_main_store_name(&mut self, name: &str) -> Result<(), RegistryError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        self.main_store_name = name.to_string();
        Ok(())
    }

    // =====================
    // 掛け持ち先
    // =====================

    pub fn add_job(&mut self, name: &str) -> Result<Job, RegistryError> {
        let job = self.registry.add_job(name)?;
        info!(job_id = %job.id, "job added");
        Ok(job)
    }

    pub fn rename_job(&mut self, id: JobId, name: &str) -> Result<(), EngineError> {
        match self.registry.rename_job(id, name)? {
            Some(_) => Ok(()),
            None => Err(EngineError::UnknownJob(id)),
        }
    }

    /// 掛け持ち先を削除し、関連する選択・デフォルト時刻・勤務日をすべて消す
    ///
    /// 戻り値は選択状態から外れた日付
    pub fn remove_job(&mut self, id: JobId) -> Result<Vec<DateString>, EngineError> {
        self.registry.remove_job(id).ok_or(EngineError::UnknownJob(id))?;

        let unselected = self.selection.purge_job(id);
        self.defaults.forget_job(id);
        if self.job_filter == JobFilter::Side(id) {
            self.job_filter = JobFilter::All;
        }
        self.work_days.retain(|d| d.job_id != Some(id));
        self.registry.set_active(self.selection.current_job());

        info!(job_id = %id, unselected = unselected.len(), "job removed");
        Ok(unselected)
    }

    // =====================
    // 日付選択
    // =====================

    /// 選択対象の勤務先を切り替える (None = メイン)
    pub fn set_current_job(&mut self, job: Option<JobId>) -> Result<(), EngineError> {
        if let Some(id) = job {
            if !self.registry.contains(id) {
                return Err(EngineError::UnknownJob(id));
            }
        }
        self.selection.set_current_job(job);
        self.registry.set_active(job);
        Ok(())
    }

    pub fn toggle_date(&mut self, date: &str) -> Result<(), EngineError> {
        calendar_logic::parse_date(date)?;
        self.selection.toggle_date(date);
        Ok(())
    }

    pub fn select_all(&mut self, dates: &[DateString]) {
        let dates = valid_dates(dates);
        self.selection.select_all(&dates);
    }

    pub fn select_by_weekday(&mut self, dates: &[DateString], day_of_week: DayOfWeek) {
        let dates = valid_dates(dates);
        self.selection.select_by_weekday(&dates, day_of_week);
    }

    pub fn select_weekdays_only(&mut self, dates: &[DateString]) {
        let dates = valid_dates(dates);
        self.selection.select_weekdays_only(&dates, &self.holidays);
    }

    pub fn clear_current_selection(&mut self) {
        self.selection.clear_current();
    }

    /// 一括選択の対象になる日付 (過去日を除いた当月分)
    pub fn selectable_dates(&self, year: i32, month: u32, today: NaiveDate) -> Vec<DateString> {
        calendar_logic::future_dates_in_month(year, month, today, self.past_date_policy)
    }

    pub fn set_holidays(&mut self, holidays: HolidayCalendar) {
        self.holidays = holidays;
    }

    pub fn weekday_count(&self, year: i32, month: u32) -> usize {
        calendar_logic::weekday_count(year, month, &self.holidays)
    }

    pub fn holiday_count(&self, year: i32, month: u32) -> usize {
        calendar_logic::holiday_count(year, month, &self.holidays)
    }

    pub fn set_previous_month(&mut self, data: Option<PreviousMonthData>) {
        self.previous_month = data;
    }

    /// 指定月に選択されている日付をまとめる (提出後に前月データとして保存する)
    pub fn month_snapshot(&self, year: i32, month: u32) -> PreviousMonthData {
        let prefix = format!("{year:04}-{month:02}-");
        PreviousMonthData {
            year,
            month,
            dates: self
                .selection
                .selected_dates()
                .into_iter()
                .filter(|d| d.starts_with(&prefix))
                .collect(),
        }
    }

    /// 前月の日付を対象月に写して、現在のコンテキストで選択する。追加した日数を返す
    pub fn copy_previous_month(&mut self, year: i32, month: u32, today: NaiveDate) -> usize {
        let Some(previous) = &self.previous_month else {
            return 0;
        };

        let targets = calendar_logic::copy_dates_into_month(&previous.dates, year, month);
        let mut added = 0;
        for date in targets {
            let past = calendar_logic::parse_date(&date)
                .map(|d| calendar_logic::is_past(d, today, self.past_date_policy))
                .unwrap_or(true);
            if past || self.selection.is_date_selected_for_current_job(&date) {
                continue;
            }
            self.selection.toggle_date(&date);
            added += 1;
        }

        debug!(year, month, added, "previous month copied");
        added
    }

    pub fn template(&self) -> Option<&CalendarTemplate> {
        self.template.as_ref()
    }

    pub fn set_template(&mut self, template: Option<CalendarTemplate>) {
        self.template = template;
    }

    /// 現在のコンテキストの選択を「第N X曜日」のテンプレートとして覚える
    pub fn save_template(&mut self, now: DateTime<Utc>) -> CalendarTemplate {
        let template = CalendarTemplate {
            pattern: calendar_logic::template_pattern(&self.selection.current_job_dates()),
            saved_at: now,
        };
        debug!(slots = template.pattern.len(), "template saved");
        self.template = Some(template.clone());
        template
    }

    /// テンプレートを対象月の未来の日付に当てはめて選択する。追加した日数を返す
    pub fn apply_template(&mut self, year: i32, month: u32, today: NaiveDate) -> usize {
        let Some(template) = &self.template else {
            return 0;
        };

        let targets = calendar_logic::template_dates(&template.pattern, year, month, today, self.past_date_policy);
        let mut added = 0;
        for date in targets {
            if self.selection.is_date_selected_for_current_job(&date) {
                continue;
            }
            self.selection.toggle_date(&date);
            added += 1;
        }

        debug!(year, month, added, "template applied");
        added
    }

    // =====================
    // 画面遷移
    // =====================

    /// 時間登録へ進む。初回は展開、2回目以降は個別設定を残して同期する
    pub fn enter_time_registration(&mut self) -> &[WorkDay] {
        let dates = self.selection.selected_dates();
        let existing = mem::take(&mut self.work_days);
        let first_time = existing.is_empty();

        self.work_days = work_day::resync(
            existing,
            &dates,
            self.selection.date_job_map(),
            self.selection.primary_dates(),
            &self.defaults,
        );
        self.stage = Stage::TimeRegister;

        info!(first_time, work_days = self.work_days.len(), "entered time registration");
        &self.work_days
    }

    /// 日付選択に戻る。勤務日は次の同期のために残す
    pub fn back_to_calendar(&mut self) {
        self.stage = Stage::Calendar;
    }

    pub fn enter_confirmation(&mut self) -> SubmissionPayload {
        self.stage = Stage::Confirm;
        self.submission_payload()
    }

    /// 最初からやり直す。掛け持ち先とデフォルト時刻 (設定) は残す
    pub fn reset(&mut self) {
        self.selection.clear_all();
        self.selection.set_current_job(None);
        self.registry.set_active(None);
        self.work_days.clear();
        self.bulk_settings = self.defaults.default_times.main.clone();
        self.job_filter = JobFilter::All;
        self.include_break = false;
        self.remarks.clear();
        self.stage = Stage::Calendar;
        info!("session reset");
    }

    // =====================
    // 時間登録
    // =====================

    pub fn update_work_day(&mut self, index: usize, update: &TimeUpdate) -> Result<Option<UpdateOutcome>, TimeError> {
        time_resolver::update_work_day(&mut self.work_days, index, update)
    }

    pub fn remove_work_day(&mut self, index: usize) -> bool {
        time_resolver::remove_work_day(&mut self.work_days, index)
    }

    pub fn toggle_remove_day(&mut self, index: usize) -> Option<bool> {
        time_resolver::toggle_remove_day(&mut self.work_days, index)
    }

    /// 一括設定の時刻を変更する。None のほうは変えない
    pub fn set_bulk_settings(&mut self, start_time: Option<&str>, end_time: Option<&str>) -> Result<(), TimeError> {
        for time in [start_time, end_time].into_iter().flatten() {
            time_calc::parse_time(time)?;
        }
        if let Some(start) = start_time {
            self.bulk_settings.start_time = start.to_string();
        }
        if let Some(end) = end_time {
            self.bulk_settings.end_time = end.to_string();
        }
        Ok(())
    }

    pub fn set_main_default_times(&mut self, slot: TimeSlot) -> Result<(), TimeError> {
        time_calc::parse_time(&slot.start_time)?;
        time_calc::parse_time(&slot.end_time)?;
        self.defaults.default_times.main = slot;
        Ok(())
    }

    /// 掛け持ち先のデフォルト時刻を部分更新する。未指定側は現在の解決値を引き継ぐ
    pub fn update_job_default_times(
        &mut self,
        job: JobId,
        start_time: Option<&str>,
        end_time: Option<&str>,
    ) -> Result<(), EngineError> {
        if !self.registry.contains(job) {
            return Err(EngineError::UnknownJob(job));
        }

        let mut slot = self.defaults.resolve(Some(job)).clone();
        if let Some(start) = start_time {
            time_calc::parse_time(start)?;
            slot.start_time = start.to_string();
        }
        if let Some(end) = end_time {
            time_calc::parse_time(end)?;
            slot.end_time = end.to_string();
        }
        self.defaults.job_overrides.insert(job, slot);
        Ok(())
    }

    pub fn set_job_filter(&mut self, filter: JobFilter) -> Result<(), EngineError> {
        if let JobFilter::Side(id) = filter {
            if !self.registry.contains(id) {
                return Err(EngineError::UnknownJob(id));
            }
        }
        self.job_filter = filter;
        Ok(())
    }

    /// 現在の掛け持ち先フィルターで表示する勤務日 (元の index 付き)
    pub fn filtered_work_days(&self) -> Vec<(usize, &WorkDay)> {
        self.work_days
            .iter()
            .enumerate()
            .filter(|(_, d)| self.job_filter.matches(d.job_id))
            .collect()
    }

    /// 曜日・週番号の絞り込みに、セッションの掛け持ち先フィルターを合わせる
    pub fn bulk_filter(&self, weekdays: Vec<DayOfWeek>, week_numbers: Vec<u32>) -> BulkFilter {
        BulkFilter {
            weekdays,
            week_numbers,
            job: self.job_filter,
        }
    }

    pub fn apply_bulk(&mut self, kind: BulkApplyType, target: BulkApplyTarget, filter: &BulkFilter) -> usize {
        time_resolver::apply_bulk(&mut self.work_days, &self.bulk_settings, kind, target, filter)
    }

    pub fn needs_target_choice(&self, filter: &BulkFilter) -> bool {
        time_resolver::needs_target_choice(&self.work_days, filter)
    }

    pub fn conflicts(&self) -> Vec<ConflictInfo> {
        conflict::detect_conflicts(&self.work_days)
    }

    pub fn set_include_break(&mut self, include_break: bool) {
        self.include_break = include_break;
    }

    pub fn total_summary(&self) -> TotalSummary {
        summary::total_summary(&self.work_days, self.include_break)
    }

    pub fn job_summaries(&self) -> Vec<JobSummary> {
        summary::job_summaries(&self.work_days, self.include_break)
    }

    pub fn set_remarks(&mut self, remarks: &str) {
        self.remarks = remarks.to_string();
    }

    pub fn submission_payload(&self) -> SubmissionPayload {
        let entries = self
            .work_days
            .iter()
            .filter(|d| !d.is_removed)
            .map(|d| SubmissionEntry {
                date: d.date.clone(),
                start_time: d.start_time.clone(),
                end_time: d.end_time.clone(),
                job_id: d.job_id,
            })
            .collect();
        let removed_dates: BTreeSet<DateString> = self
            .work_days
            .iter()
            .filter(|d| d.is_removed)
            .map(|d| d.date.clone())
            .collect();

        SubmissionPayload {
            main_store_name: self.main_store_name.clone(),
            entries,
            removed_dates: removed_dates.into_iter().collect(),
            remarks: self.remarks.clone(),
        }
    }
}

/// YYYY-MM-DD として読めない日付は警告して外す
fn valid_dates(dates: &[DateString]) -> Vec<DateString> {
    dates
        .iter()
        .filter(|date| match calendar_logic::parse_date(date) {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "skipping unparsable date in bulk selection");
                false
            }
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> ShiftSession {
        ShiftSession::new(&EngineConfig::default())
    }

    #[test]
    fn restore_drops_unknown_jobs_and_bad_dates() {
        let mut source = session();
        let job = source.add_job("カフェ").unwrap();
        let mut state = source.to_persisted();

        let ghost = JobId::new(4).unwrap();
        state.date_job_map.insert("2026-11-02".into(), vec![job.id, ghost]);
        state.date_job_map.insert("2026-11-03".into(), vec![ghost]);
        state.selected_dates = vec!["2026-11-05".into(), "11/06".into()];
        state.job_default_times.insert(ghost, TimeSlot::new("10:00", "11:00"));

        let restored = ShiftSession::restore(&EngineConfig::default(), state);
        assert_eq!(restored.selection().date_job_map().len(), 1);
        assert_eq!(restored.selection().date_job_map()["2026-11-02"], vec![job.id]);
        assert_eq!(restored.selection().selected_dates(), vec!["2026-11-02".to_string(), "2026-11-05".to_string()]);
        assert!(restored.defaults().job_overrides.is_empty());
    }

    #[test]
    fn bulk_selection_skips_unparsable_dates() {
        let mut session = session();
        let dates: Vec<DateString> = vec!["not-a-date".into(), "2026-11-02".into(), "2026/11/03".into()];

        session.select_all(&dates);
        assert_eq!(session.selection().selected_dates(), vec!["2026-11-02".to_string()]);
        assert_eq!(session.to_persisted().selected_dates, vec!["2026-11-02".to_string()]);

        // 有効な日付がすべて選択済みなので2回目は解除になる
        session.select_all(&dates);
        assert!(session.selection().selected_dates().is_empty());

        session.select_weekdays_only(&dates);
        session.select_by_weekday(&dates, 1);
        assert!(session.selection().primary_dates().iter().all(|d| calendar_logic::parse_date(d).is_ok()));
    }

    #[test]
    fn stage_transitions_keep_edits() {
        let mut session = session();
        session.toggle_date("2026-11-02").unwrap();
        session.enter_time_registration();
        session.update_work_day(0, &TimeUpdate::start("07:00")).unwrap();

        session.back_to_calendar();
        assert_eq!(session.stage(), Stage::Calendar);
        session.toggle_date("2026-11-03").unwrap();
        let days = session.enter_time_registration();
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].start_time, "07:00");

        let payload = session.enter_confirmation();
        assert_eq!(session.stage(), Stage::Confirm);
        assert_eq!(payload.entries.len(), 2);

        session.reset();
        assert_eq!(session.stage(), Stage::Calendar);
        assert!(session.work_days().is_empty());
        assert!(session.selection().selected_dates().is_empty());
    }

    #[test]
    fn copy_previous_month_skips_past_and_selected() {
        let mut session = session();
        session.set_previous_month(Some(PreviousMonthData {
            year: 2026,
            month: 10,
            dates: vec!["2026-10-05".into(), "2026-10-20".into(), "2026-10-31".into()],
        }));
        session.toggle_date("2026-11-20").unwrap();

        let today = NaiveDate::from_ymd_opt(2026, 11, 10).unwrap();
        let added = session.copy_previous_month(2026, 11, today);

        // 11/05 は過去、11/20 は選択済み、11/31 は存在しない
        assert_eq!(added, 0);

        let today = NaiveDate::from_ymd_opt(2026, 11, 1).unwrap();
        session.toggle_date("2026-11-20").unwrap();
        assert_eq!(session.copy_previous_month(2026, 11, today), 2);
        assert_eq!(session.month_snapshot(2026, 11).dates, vec!["2026-11-05".to_string(), "2026-11-20".to_string()]);
    }

    #[test]
    fn template_follows_current_context() {
        let mut session = session();
        let job = session.add_job("カフェ").unwrap();
        session.toggle_date("2026-11-02").unwrap();
        session.set_current_job(Some(job.id)).unwrap();
        session.toggle_date("2026-11-10").unwrap();

        // 掛け持ち先のコンテキストでは第2火曜だけ
        let template = session.save_template(Utc::now());
        assert_eq!(template.pattern.len(), 1);

        let today = NaiveDate::from_ymd_opt(2026, 11, 20).unwrap();
        assert_eq!(session.apply_template(2026, 12, today), 1);
        assert!(session.selection().is_date_selected_for("2026-12-08", Some(job.id)));
        assert!(!session.selection().is_date_selected_for("2026-12-08", None));

        // 2回目は全部選択済みなので何も足さない
        assert_eq!(session.apply_template(2026, 12, today), 0);

        session.set_template(None);
        assert_eq!(session.apply_template(2027, 1, today), 0);
    }

    #[test]
    fn submission_lists_removed_dates_once() {
        let mut session = session();
        let job = session.add_job("塾").unwrap();
        session.toggle_date("2026-11-02").unwrap();
        session.set_current_job(Some(job.id)).unwrap();
        session.toggle_date("2026-11-02").unwrap();
        session.enter_time_registration();

        session.remove_work_day(0);
        session.remove_work_day(1);
        session.set_remarks("よろしくお願いします");

        let payload = session.submission_payload();
        assert!(payload.entries.is_empty());
        assert_eq!(payload.removed_dates, vec!["2026-11-02".to_string()]);
        assert_eq!(payload.main_store_name, "メイン");
        assert_eq!(payload.remarks, "よろしくお願いします");
    }
}
