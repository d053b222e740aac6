use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use shift_register_lib::config::EngineConfig;
use shift_register_lib::domain::conflict::detect_conflicts;
use shift_register_lib::domain::models::WorkDay;
use shift_register_lib::domain::summary::{job_summaries, total_summary};
use shift_register_lib::infrastructure::persisted::{decode_default_times, ALL_KEYS};
use shift_register_lib::infrastructure::settings_repo::SettingsRepository;
use shift_register_lib::open_pool;

// 引数を構造体として定義します
#[derive(Parser)]
#[command(name = "shift_tools")]
#[command(version = "0.1.0")]
#[command(about = "shift-registerに関わるデータの操作をします", long_about = None)]
struct Cli {
    /// 設定ファイル (JSON)。省略時はデフォルト設定
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 旧形式の defaultTimes ({startTime, endTime}) を {main, jobs} に変換します
    UpgradeDefaults {
        /// defaultTimes の JSON ファイル
        file: PathBuf,

        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// 勤務日リストから時間の重複を表示します
    Conflicts {
        /// 勤務日リストの JSON ファイル
        file: PathBuf,
    },
    /// 勤務日リストの合計を表示します
    Summary {
        /// 勤務日リストの JSON ファイル
        file: PathBuf,

        /// 休憩時間を差し引く
        #[arg(long)]
        include_break: bool,
    },
    /// 設定DBの中身を表示します
    Inspect {
        /// 省略時は設定ファイルの databasePath
        db: Option<PathBuf>,
    },
}

fn read_text(file: &Path) -> Result<String, String> {
    fs::read_to_string(file).map_err(|e| format!("エラー: ファイル '{}' を読めませんでした: {}", file.display(), e))
}

fn write_or_print(text: &str, out: Option<PathBuf>) -> Result<(), String> {
    match out {
        Some(path) => fs::write(&path, text).map_err(|e| format!("ファイルの書き込みに失敗しました: {}", e)),
        None => {
            println!("{}", text);
            Ok(())
        }
    }
}

/// 旧形式 (setBy なし) の勤務日も読めるように provenance を整えてから返す
fn read_work_days(file: &Path) -> Result<Vec<WorkDay>, String> {
    let text = read_text(file)?;
    let mut work_days: Vec<WorkDay> =
        serde_json::from_str(&text).map_err(|e| format!("ファイルが形式に沿っていません: {}", e))?;
    for work_day in work_days.iter_mut() {
        work_day.reconcile_legacy_flags();
        work_day.recompute_work_minutes();
    }
    debug!(count = work_days.len(), "work days loaded");
    Ok(work_days)
}

fn upgrade_defaults(config: &EngineConfig, file: PathBuf, out: Option<PathBuf>) -> Result<(), String> {
    let text = read_text(&file)?;
    let (times, upgraded) = decode_default_times(&text, &config.default_times)
        .map_err(|e| format!("ファイルが形式に沿っていません: {}", e))?;

    if !upgraded {
        info!("already in nested form");
    }
    let json = serde_json::to_string_pretty(&times).map_err(|e| e.to_string())?;
    write_or_print(&json, out)
}

fn conflicts(file: PathBuf) -> Result<(), String> {
    let work_days = read_work_days(&file)?;
    let conflicts = detect_conflicts(&work_days);

    let json = serde_json::to_string_pretty(&conflicts).map_err(|e| e.to_string())?;
    println!("{}", json);
    Ok(())
}

fn summary(file: PathBuf, include_break: bool) -> Result<(), String> {
    let work_days = read_work_days(&file)?;

    let report = serde_json::json!({
        "total": total_summary(&work_days, include_break),
        "jobs": job_summaries(&work_days, include_break),
    });
    let json = serde_json::to_string_pretty(&report).map_err(|e| e.to_string())?;
    println!("{}", json);
    Ok(())
}

async fn inspect(config: &EngineConfig, db: Option<PathBuf>) -> Result<(), String> {
    let path = db.unwrap_or_else(|| config.database_path.clone());
    if !path.exists() {
        return Err(format!("エラー: DB '{}' がありません", path.display()));
    }

    let pool = open_pool(&path).await.map_err(|e| e.to_string())?;
    let repository = SettingsRepository::new(pool);

    for key in ALL_KEYS {
        match repository.get_raw(key).await.map_err(|e| e.to_string())? {
            Some(raw) => println!("{:<20} {}", key, raw),
            None => println!("{:<20} (なし)", key),
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Cli::parse();

    let config = match &args.config {
        Some(path) => match EngineConfig::from_json_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("エラー: 設定ファイル '{}' を読めませんでした: {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => EngineConfig::default(),
    };

    // パターンマッチで分岐処理
    let result = match args.command {
        Commands::UpgradeDefaults { file, out } => upgrade_defaults(&config, file, out),
        Commands::Conflicts { file } => conflicts(file),
        Commands::Summary { file, include_break } => summary(file, include_break),
        Commands::Inspect { db } => inspect(&config, db).await,
    };

    if let Err(message) = result {
        eprintln!("{}", message);
        std::process::exit(1);
    }
}
