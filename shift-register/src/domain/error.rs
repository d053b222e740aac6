use thiserror::Error;

use crate::domain::models::JobId;

/// 時刻文字列 ("HH:MM") の検証エラー
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TimeError {
    #[error("malformed time string: {0:?} (expected HH:MM)")]
    Malformed(String),
}

/// 掛け持ち先レジストリの拒否理由
///
/// 上限超過は例外ではなく `Err` として返すので、呼び出し側はメッセージを出すだけでよい
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("max jobs reached ({max})")]
    MaxJobsReached { max: usize },

    #[error("job name must not be empty")]
    EmptyName,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error(transparent)]
    Time(#[from] TimeError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("invalid date string: {0:?} (expected YYYY-MM-DD)")]
    InvalidDate(String),

    #[error("unknown job id: {0}")]
    UnknownJob(JobId),
}
