use std::fs;
use std::path::{Path, PathBuf};

use chrono::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::domain::calendar_logic::PastDatePolicy;
use crate::domain::models::TimeSlot;
use crate::domain::work_day::{DEFAULT_END_TIME, DEFAULT_START_TIME};

pub const DEFAULT_MAIN_STORE_NAME: &str = "メイン";
pub const DEFAULT_HOLIDAY_CACHE_TTL_DAYS: i64 = 7;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// エンジン全体の設定。ファイルに無い項目はデフォルト値
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    pub database_path: PathBuf,
    /// 保存データが無いときのデフォルト時刻
    pub default_times: TimeSlot,
    pub main_store_name: String,
    pub past_date_policy: PastDatePolicy,
    pub holiday_cache_ttl_days: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("app.db"),
            default_times: TimeSlot::new(DEFAULT_START_TIME, DEFAULT_END_TIME),
            main_store_name: DEFAULT_MAIN_STORE_NAME.to_string(),
            past_date_policy: PastDatePolicy::default(),
            holiday_cache_ttl_days: DEFAULT_HOLIDAY_CACHE_TTL_DAYS,
        }
    }
}

impl EngineConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// 範囲外の日数 (負数や巨大な値) はデフォルトの TTL にする
    pub fn holiday_cache_ttl(&self) -> Duration {
        match Duration::try_days(self.holiday_cache_ttl_days) {
            Some(ttl) if self.holiday_cache_ttl_days >= 0 => ttl,
            _ => {
                warn!(days = self.holiday_cache_ttl_days, "holidayCacheTtlDays is out of range, using default");
                Duration::days(DEFAULT_HOLIDAY_CACHE_TTL_DAYS)
            }
        }
    }
}
