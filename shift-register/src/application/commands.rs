//! 画面から呼ばれる操作
//!
//! セッションをロックしてエンジンの操作を行い、保存が必要なものは
//! ロックを外してからリポジトリに書き込む

use std::fmt::Display;

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;
use tracing::{info, warn};

use crate::application::dto::SubmissionPayload;
use crate::application::holidays::HolidayCalendar;
use crate::application::session::ShiftSession;
use crate::domain::error::{EngineError, RegistryError, TimeError};
use crate::domain::models::{DateJobMap, DateString, DayOfWeek, HolidayData, Job, JobId, TimeSlot, WorkDay};
use crate::infrastructure::persisted::CalendarTemplate;
use crate::infrastructure::settings_repo::RepositoryError;
use crate::AppServices;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<TimeError> for CommandError {
    fn from(e: TimeError) -> Self {
        CommandError::Engine(e.into())
    }
}

impl From<RegistryError> for CommandError {
    fn from(e: RegistryError) -> Self {
        CommandError::Engine(e.into())
    }
}

fn selection_snapshot(session: &ShiftSession) -> (Vec<DateString>, DateJobMap) {
    let selection = session.selection();
    (
        selection.primary_dates().iter().cloned().collect(),
        selection.date_job_map().clone(),
    )
}

async fn save_selection(services: &AppServices, snapshot: (Vec<DateString>, DateJobMap)) -> Result<(), CommandError> {
    let (selected_dates, date_job_map) = snapshot;
    services.settings.save_selection(&selected_dates, &date_job_map).await?;
    Ok(())
}

// --- Session ---

/// 保存済みの設定・前月データ・テンプレート・祝日キャッシュからセッションを作り直す
pub async fn load_session(services: &AppServices, now: DateTime<Utc>) -> Result<(), CommandError> {
    let defaults = ShiftSession::new(&services.config).to_persisted();
    let state = services.settings.load_state(defaults).await?;
    let previous_month = services.settings.load_previous_month().await?;
    let template = services.settings.load_template().await?;
    let holidays = services
        .settings
        .load_holidays(now, services.config.holiday_cache_ttl())
        .await?;

    let mut session = ShiftSession::restore(&services.config, state);
    session.set_previous_month(previous_month);
    session.set_template(template);
    if let Some(data) = holidays {
        session.set_holidays(HolidayCalendar::new(data));
    }

    *services.lock_session() = session;
    info!("session loaded");
    Ok(())
}

/// 祝日プロバイダの結果を反映する
///
/// 成功ならキャッシュに保存、失敗なら今ある祝日 (無ければ祝日なし) のまま続ける
pub async fn refresh_holidays<E: Display>(
    services: &AppServices,
    fetched: Result<HolidayData, E>,
    now: DateTime<Utc>,
) -> Result<(), CommandError> {
    match fetched {
        Ok(data) => {
            services.settings.save_holidays(&data, now).await?;
            services.lock_session().set_holidays(HolidayCalendar::new(data));
        }
        Err(e) => {
            warn!(error = %e, "holiday provider failed, keeping current holidays");
        }
    }
    Ok(())
}

// --- Jobs ---

pub async fn add_job(services: &AppServices, name: &str) -> Result<Job, CommandError> {
    let (job, jobs) = {
        let mut session = services.lock_session();
        let job = session.add_job(name)?;
        (job, session.registry().jobs().to_vec())
    };
    services.settings.save_jobs(&jobs).await?;
    Ok(job)
}

pub async fn rename_job(services: &AppServices, id: JobId, name: &str) -> Result<(), CommandError> {
    let jobs = {
        let mut session = services.lock_session();
        session.rename_job(id, name)?;
        session.registry().jobs().to_vec()
    };
    services.settings.save_jobs(&jobs).await?;
    Ok(())
}

/// 削除はカスケードで選択とデフォルト時刻も変わるので全体を保存する
pub async fn remove_job(services: &AppServices, id: JobId) -> Result<Vec<DateString>, CommandError> {
    let (unselected, state) = {
        let mut session = services.lock_session();
        let unselected = session.remove_job(id)?;
        (unselected, session.to_persisted())
    };
    services.settings.save_state(&state).await?;
    Ok(unselected)
}

pub async fn set_current_job(services: &AppServices, job: Option<JobId>) -> Result<(), CommandError> {
    let jobs = {
        let mut session = services.lock_session();
        session.set_current_job(job)?;
        session.registry().jobs().to_vec()
    };
    services.settings.save_jobs(&jobs).await?;
    Ok(())
}

pub async fn set_main_store_name(services: &AppServices, name: &str) -> Result<(), CommandError> {
    let name = {
        let mut session = services.lock_session();
        session.set_main_store_name(name)?;
        session.main_store_name().to_string()
    };
    services.settings.save_main_store_name(&name).await?;
    Ok(())
}

// --- Selection ---

pub async fn toggle_date(services: &AppServices, date: &str) -> Result<(), CommandError> {
    let snapshot = {
        let mut session = services.lock_session();
        session.toggle_date(date)?;
        selection_snapshot(&session)
    };
    save_selection(services, snapshot).await
}

pub async fn select_all(services: &AppServices, dates: &[DateString]) -> Result<(), CommandError> {
    let snapshot = {
        let mut session = services.lock_session();
        session.select_all(dates);
        selection_snapshot(&session)
    };
    save_selection(services, snapshot).await
}

pub async fn select_by_weekday(services: &AppServices, dates: &[DateString], day_of_week: DayOfWeek) -> Result<(), CommandError> {
    let snapshot = {
        let mut session = services.lock_session();
        session.select_by_weekday(dates, day_of_week);
        selection_snapshot(&session)
    };
    save_selection(services, snapshot).await
}

pub async fn select_weekdays_only(services: &AppServices, dates: &[DateString]) -> Result<(), CommandError> {
    let snapshot = {
        let mut session = services.lock_session();
        session.select_weekdays_only(dates);
        selection_snapshot(&session)
    };
    save_selection(services, snapshot).await
}

pub async fn clear_current_selection(services: &AppServices) -> Result<(), CommandError> {
    let snapshot = {
        let mut session = services.lock_session();
        session.clear_current_selection();
        selection_snapshot(&session)
    };
    save_selection(services, snapshot).await
}

pub async fn copy_previous_month(services: &AppServices, year: i32, month: u32, today: NaiveDate) -> Result<usize, CommandError> {
    let (added, snapshot) = {
        let mut session = services.lock_session();
        let added = session.copy_previous_month(year, month, today);
        (added, selection_snapshot(&session))
    };
    if added > 0 {
        save_selection(services, snapshot).await?;
    }
    Ok(added)
}

/// 現在のコンテキストの選択をテンプレートとして保存する
pub async fn save_template(services: &AppServices, now: DateTime<Utc>) -> Result<CalendarTemplate, CommandError> {
    let template = services.lock_session().save_template(now);
    services.settings.save_template(&template).await?;
    info!(slots = template.pattern.len(), "template saved");
    Ok(template)
}

pub async fn apply_template(services: &AppServices, year: i32, month: u32, today: NaiveDate) -> Result<usize, CommandError> {
    let (added, snapshot) = {
        let mut session = services.lock_session();
        let added = session.apply_template(year, month, today);
        (added, selection_snapshot(&session))
    };
    if added > 0 {
        save_selection(services, snapshot).await?;
    }
    Ok(added)
}

// --- Default times ---

pub async fn set_main_default_times(services: &AppServices, slot: TimeSlot) -> Result<(), CommandError> {
    let defaults = {
        let mut session = services.lock_session();
        session.set_main_default_times(slot)?;
        session.defaults().clone()
    };
    services
        .settings
        .save_default_times(&defaults.default_times, &defaults.job_overrides)
        .await?;
    Ok(())
}

pub async fn update_job_default_times(
    services: &AppServices,
    job: JobId,
    start_time: Option<&str>,
    end_time: Option<&str>,
) -> Result<(), CommandError> {
    let defaults = {
        let mut session = services.lock_session();
        session.update_job_default_times(job, start_time, end_time)?;
        session.defaults().clone()
    };
    services
        .settings
        .save_default_times(&defaults.default_times, &defaults.job_overrides)
        .await?;
    Ok(())
}

// --- Stages ---

pub fn enter_time_registration(services: &AppServices) -> Vec<WorkDay> {
    services.lock_session().enter_time_registration().to_vec()
}

/// 確認画面へ進み、提出データを返す。提出した月の日付は前月データとして残す
pub async fn submit(services: &AppServices, year: i32, month: u32) -> Result<SubmissionPayload, CommandError> {
    let (payload, snapshot) = {
        let mut session = services.lock_session();
        let payload = session.enter_confirmation();
        let snapshot = session.month_snapshot(year, month);
        session.set_previous_month(Some(snapshot.clone()));
        (payload, snapshot)
    };
    services.settings.save_previous_month(&snapshot).await?;
    info!(year, month, entries = payload.entries.len(), "shift submitted");
    Ok(payload)
}
