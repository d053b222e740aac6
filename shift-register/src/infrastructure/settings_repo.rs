use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::models::{DateJobMap, DateString, HolidayData, Job, JobId, TimeSlot};
use crate::domain::work_day::DefaultTimes;
use crate::infrastructure::persisted::{
    self, CalendarTemplate, HolidayCache, PersistedState, PreviousMonthData, RawDateJobMap, KEY_DATE_JOB_MAP,
    KEY_DEFAULT_TIMES, KEY_HOLIDAYS_CACHE, KEY_JOBS, KEY_JOB_DEFAULT_TIMES, KEY_MAIN_STORE_NAME,
    KEY_PREVIOUS_MONTH_DATA, KEY_SELECTED_DATES, KEY_SHIFT_TEMPLATE,
};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("failed to encode settings: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to prepare database directory: {0}")]
    Io(#[from] std::io::Error),
}

/// キーごとに JSON を1件ずつ持つ設定ストア
pub struct SettingsRepository {
    pool: SqlitePool,
}

impl SettingsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get_raw(&self, key: &str) -> Result<Option<String>, RepositoryError> {
        let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }

    pub async fn put_raw(&self, key: &str, value: &str) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO settings (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = datetime('now')",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn delete(&self, key: &str) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM settings WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// 読めない JSON は None 扱いにして警告だけ出す
    async fn load_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, RepositoryError> {
        let Some(raw) = self.get_raw(key).await? else {
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!(key, error = %e, "stored value is corrupt, falling back to defaults");
                Ok(None)
            }
        }
    }

    async fn save_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), RepositoryError> {
        let raw = serde_json::to_string(value)?;
        self.put_raw(key, &raw).await
    }

    // =====================
    // セッション状態
    // =====================

    /// 保存済みの状態を読む。無い・壊れているキーは `defaults` の値を使う
    pub async fn load_state(&self, defaults: PersistedState) -> Result<PersistedState, RepositoryError> {
        let jobs = self.load_json::<Vec<Job>>(KEY_JOBS).await?.unwrap_or(defaults.jobs);
        let date_job_map = self
            .load_json::<RawDateJobMap>(KEY_DATE_JOB_MAP)
            .await?
            .map(persisted::decode_date_job_map)
            .unwrap_or(defaults.date_job_map);
        let selected_dates = self
            .load_json::<Vec<DateString>>(KEY_SELECTED_DATES)
            .await?
            .unwrap_or(defaults.selected_dates);
        let main_store_name = self
            .load_json::<String>(KEY_MAIN_STORE_NAME)
            .await?
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(defaults.main_store_name);
        let job_default_times = self
            .load_json::<BTreeMap<JobId, TimeSlot>>(KEY_JOB_DEFAULT_TIMES)
            .await?
            .unwrap_or(defaults.job_default_times);
        let default_times = self.load_default_times(defaults.default_times).await?;

        debug!(jobs = jobs.len(), selected = selected_dates.len(), "settings loaded");

        Ok(PersistedState {
            jobs,
            date_job_map,
            selected_dates,
            main_store_name,
            default_times,
            job_default_times,
        })
    }

    /// defaultTimes を読む。旧形式ならその場で新形式に書き換える
    pub async fn load_default_times(&self, fallback: DefaultTimes) -> Result<DefaultTimes, RepositoryError> {
        let Some(raw) = self.get_raw(KEY_DEFAULT_TIMES).await? else {
            return Ok(fallback);
        };

        match persisted::decode_default_times(&raw, &fallback.main) {
            Ok((times, upgraded)) => {
                if upgraded {
                    info!("upgrading legacy defaultTimes to nested form");
                    self.save_json(KEY_DEFAULT_TIMES, &times).await?;
                }
                Ok(times)
            }
            Err(e) => {
                warn!(error = %e, "stored defaultTimes is corrupt, falling back to defaults");
                Ok(fallback)
            }
        }
    }

    pub async fn save_jobs(&self, jobs: &[Job]) -> Result<(), RepositoryError> {
        self.save_json(KEY_JOBS, jobs).await
    }

    /// 日付選択 (メインの日付集合と DateJobMap) をまとめて保存
    pub async fn save_selection(&self, selected_dates: &[DateString], date_job_map: &DateJobMap) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        for (key, value) in [
            (KEY_SELECTED_DATES, serde_json::to_string(selected_dates)?),
            (KEY_DATE_JOB_MAP, serde_json::to_string(date_job_map)?),
        ] {
            upsert(&mut tx, key, &value).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn save_main_store_name(&self, name: &str) -> Result<(), RepositoryError> {
        self.save_json(KEY_MAIN_STORE_NAME, name).await
    }

    pub async fn save_default_times(
        &self,
        default_times: &DefaultTimes,
        job_default_times: &BTreeMap<JobId, TimeSlot>,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        for (key, value) in [
            (KEY_DEFAULT_TIMES, serde_json::to_string(default_times)?),
            (KEY_JOB_DEFAULT_TIMES, serde_json::to_string(job_default_times)?),
        ] {
            upsert(&mut tx, key, &value).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// 全キーを1トランザクションで保存する
    pub async fn save_state(&self, state: &PersistedState) -> Result<(), RepositoryError> {
        // 1. 先に全部エンコードしておく (途中で失敗しても DB は触らない)
        let entries = [
            (KEY_JOBS, serde_json::to_string(&state.jobs)?),
            (KEY_DATE_JOB_MAP, serde_json::to_string(&state.date_job_map)?),
            (KEY_SELECTED_DATES, serde_json::to_string(&state.selected_dates)?),
            (KEY_MAIN_STORE_NAME, serde_json::to_string(&state.main_store_name)?),
            (KEY_DEFAULT_TIMES, serde_json::to_string(&state.default_times)?),
            (KEY_JOB_DEFAULT_TIMES, serde_json::to_string(&state.job_default_times)?),
        ];

        // 2. トランザクション開始
        let mut tx = self.pool.begin().await?;

        // 3. 書き込み
        for (key, value) in &entries {
            upsert(&mut tx, key, value).await?;
        }

        // 4. コミット
        tx.commit().await?;
        debug!(keys = entries.len(), "settings saved");
        Ok(())
    }

    // =====================
    // 祝日キャッシュ
    // =====================

    /// `ttl` より新しいキャッシュがあれば返す
    pub async fn load_holidays(&self, now: DateTime<Utc>, ttl: Duration) -> Result<Option<HolidayData>, RepositoryError> {
        let Some(cache) = self.load_json::<HolidayCache>(KEY_HOLIDAYS_CACHE).await? else {
            return Ok(None);
        };

        if now.signed_duration_since(cache.fetched_at) < ttl {
            Ok(Some(cache.data))
        } else {
            debug!(fetched_at = %cache.fetched_at, "holiday cache expired");
            Ok(None)
        }
    }

    pub async fn save_holidays(&self, data: &HolidayData, fetched_at: DateTime<Utc>) -> Result<(), RepositoryError> {
        let cache = HolidayCache {
            fetched_at,
            data: data.clone(),
        };
        self.save_json(KEY_HOLIDAYS_CACHE, &cache).await
    }

    // =====================
    // 前月データ
    // =====================

    pub async fn load_previous_month(&self) -> Result<Option<PreviousMonthData>, RepositoryError> {
        self.load_json(KEY_PREVIOUS_MONTH_DATA).await
    }

    pub async fn save_previous_month(&self, data: &PreviousMonthData) -> Result<(), RepositoryError> {
        self.save_json(KEY_PREVIOUS_MONTH_DATA, data).await
    }

    // =====================
    // テンプレート
    // =====================

    pub async fn load_template(&self) -> Result<Option<CalendarTemplate>, RepositoryError> {
        self.load_json(KEY_SHIFT_TEMPLATE).await
    }

    pub async fn save_template(&self, template: &CalendarTemplate) -> Result<(), RepositoryError> {
        self.save_json(KEY_SHIFT_TEMPLATE, template).await
    }
}

async fn upsert(tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>, key: &str, value: &str) -> Result<(), RepositoryError> {
    sqlx::query(
        "INSERT INTO settings (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = datetime('now')",
    )
    .bind(key)
    .bind(value)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
