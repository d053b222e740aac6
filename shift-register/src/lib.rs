use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tracing::info;

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

use application::commands::{self, CommandError};
use application::session::ShiftSession;
use config::EngineConfig;
use infrastructure::settings_repo::{RepositoryError, SettingsRepository};

// セッションとリポジトリを保持するコンテナ
pub struct AppServices {
    pub config: EngineConfig,
    pub settings: SettingsRepository,
    session: Mutex<ShiftSession>,
}

impl AppServices {
    pub fn new(pool: SqlitePool, config: EngineConfig) -> Self {
        let session = ShiftSession::new(&config);
        Self {
            settings: SettingsRepository::new(pool),
            session: Mutex::new(session),
            config,
        }
    }

    /// セッションをロックする。await をまたいで保持しないこと
    pub fn lock_session(&self) -> MutexGuard<'_, ShiftSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// DB を開いてマイグレーションまで済ませる
pub async fn open_pool(db_path: &Path) -> Result<SqlitePool, RepositoryError> {
    // --- ディレクトリ作成（冪等） ---
    if let Some(dir) = db_path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }

    info!(path = %db_path.display(), "opening settings database");

    // --- DB 接続設定 ---
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true);

    // --- DB 接続 ---
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    // --- テーブル ---
    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

// =====================
// エントリポイント
// =====================
pub async fn run(config: EngineConfig) -> Result<AppServices, CommandError> {
    let pool = open_pool(&config.database_path).await?;
    let services = AppServices::new(pool, config);
    commands::load_session(&services, Utc::now()).await?;
    Ok(services)
}
