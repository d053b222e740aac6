// =====================
// ドメインモデル定義
// =====================

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// 日付文字列 (YYYY-MM-DD)。マップのキーとして使うので比較は文字列で行う
pub type DateString = String;
/// 時刻文字列 (HH:MM)
pub type TimeString = String;
/// 曜日 (0: 日曜 ~ 6: 土曜)
pub type DayOfWeek = u8;

/// 日付 -> その日の掛け持ち先ID (メインは含まない)
///
/// 同じ JobId は1日に1度しか現れず、空のリストはエントリごと削除する
pub type DateJobMap = BTreeMap<DateString, Vec<JobId>>;

/// 日付 -> 祝日名
pub type HolidayData = BTreeMap<DateString, String>;

/// テンプレートの1要素。「第 `ordinal` `day_of_week` 曜日」
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSlot {
    pub day_of_week: DayOfWeek,
    /// その曜日が月内で何回目か (1-5)
    pub week_number: u32,
}

/// 掛け持ち先ID (1..=4)。メインの勤務先はIDを持たない (`None`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct JobId(u8);

impl JobId {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 4;

    pub fn new(raw: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&raw).then_some(Self(raw))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// 1..=4 を順に返す
    pub fn all() -> impl Iterator<Item = JobId> {
        (Self::MIN..=Self::MAX).map(JobId)
    }
}

impl TryFrom<u8> for JobId {
    type Error = String;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        JobId::new(raw).ok_or_else(|| format!("job id out of range: {raw}"))
    }
}

impl From<JobId> for u8 {
    fn from(id: JobId) -> u8 {
        id.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 掛け持ち先の表示色。作成スロット (JobId) ごとに固定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobColor {
    #[serde(rename = "#4A90E2")]
    Blue,
    #[serde(rename = "#50C878")]
    Green,
    #[serde(rename = "#F5A623")]
    Orange,
    #[serde(rename = "#BD10E0")]
    Purple,
}

impl JobColor {
    pub fn for_slot(id: JobId) -> Self {
        match id.get() {
            1 => JobColor::Blue,
            2 => JobColor::Green,
            3 => JobColor::Orange,
            _ => JobColor::Purple,
        }
    }

    pub fn hex(self) -> &'static str {
        match self {
            JobColor::Blue => "#4A90E2",
            JobColor::Green => "#50C878",
            JobColor::Orange => "#F5A623",
            JobColor::Purple => "#BD10E0",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    pub name: String,
    pub color: JobColor,
    /// 現在の選択コンテキストかどうか
    #[serde(default)]
    pub is_active: bool,
}

/// 時間帯（開始時刻と終了時刻）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlot {
    pub start_time: TimeString,
    pub end_time: TimeString,
}

impl TimeSlot {
    pub fn new(start_time: impl Into<TimeString>, end_time: impl Into<TimeString>) -> Self {
        Self {
            start_time: start_time.into(),
            end_time: end_time.into(),
        }
    }
}

/// 一括設定で使う時刻 (ステージング中の値)
pub type BulkSettings = TimeSlot;

/// 時刻フィールドを最後に設定した仕組み
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SetBy {
    #[default]
    Default,
    Bulk,
    Custom,
    /// 過去のシフトからコピーされた値
    Base,
}

impl SetBy {
    /// 個別入力扱いになるか (custom / base)
    pub fn is_custom(self) -> bool {
        matches!(self, SetBy::Custom | SetBy::Base)
    }
}

/// (日付, 掛け持ち先) で勤務日を一意に識別するキー
pub type WorkDayKey = (DateString, Option<JobId>);

/// 勤務日情報
///
/// `*_set_by` が正で、`custom_*` / `is_modified` はそこから導出するビュー。
/// 旧データとの互換のため両方をシリアライズする。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkDay {
    pub date: DateString,
    pub day_of_week: DayOfWeek,
    /// 月内の週番号 (1-6, 日曜始まり)
    pub week_number: u32,
    pub start_time: TimeString,
    pub end_time: TimeString,
    pub initial_start_time: TimeString,
    pub initial_end_time: TimeString,
    pub work_minutes: u32,
    pub is_modified: bool,
    #[serde(default)]
    pub is_removed: bool,
    #[serde(default)]
    pub custom_start_time: bool,
    #[serde(default)]
    pub custom_end_time: bool,
    #[serde(default)]
    pub is_bulk_applied: bool,
    #[serde(default)]
    pub is_from_base: bool,
    #[serde(default)]
    pub start_time_set_by: SetBy,
    #[serde(default)]
    pub end_time_set_by: SetBy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,
}

impl WorkDay {
    pub fn key(&self) -> WorkDayKey {
        (self.date.clone(), self.job_id)
    }

    pub fn time_slot(&self) -> TimeSlot {
        TimeSlot::new(self.start_time.clone(), self.end_time.clone())
    }

    /// 開始・終了のいずれかが初期値から変わっているか
    pub fn differs_from_initial(&self) -> bool {
        self.start_time != self.initial_start_time || self.end_time != self.initial_end_time
    }

    /// 設定方法 (enum) から custom フラグと is_modified を導出し直す
    pub fn refresh_custom_flags(&mut self) {
        self.custom_start_time = self.start_time_set_by.is_custom();
        self.custom_end_time = self.end_time_set_by.is_custom();
        self.is_modified = self.custom_start_time || self.custom_end_time;
        if self.is_modified {
            self.is_bulk_applied = false;
        }
    }

    /// 旧形式 (setBy を持たない) のレコードを読み込んだ後の整合処理
    pub fn reconcile_legacy_flags(&mut self) {
        if self.custom_start_time && !self.start_time_set_by.is_custom() {
            self.start_time_set_by = if self.is_from_base { SetBy::Base } else { SetBy::Custom };
        }
        if self.custom_end_time && !self.end_time_set_by.is_custom() {
            self.end_time_set_by = if self.is_from_base { SetBy::Base } else { SetBy::Custom };
        }
        self.refresh_custom_flags();
    }
}

/// 一括適用の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BulkApplyType {
    Both,
    Start,
    End,
}

impl BulkApplyType {
    pub fn writes_start(self) -> bool {
        matches!(self, BulkApplyType::Both | BulkApplyType::Start)
    }

    pub fn writes_end(self) -> bool {
        matches!(self, BulkApplyType::Both | BulkApplyType::End)
    }
}

/// 一括適用のターゲット
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BulkApplyTarget {
    All,
    UnmodifiedOnly,
}

/// 掛け持ち先フィルター
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobFilter {
    /// すべて表示
    #[default]
    All,
    /// メインのみ
    Primary,
    Side(JobId),
}

impl JobFilter {
    pub fn matches(self, job_id: Option<JobId>) -> bool {
        match self {
            JobFilter::All => true,
            JobFilter::Primary => job_id.is_none(),
            JobFilter::Side(id) => job_id == Some(id),
        }
    }
}

/// 重複している時間帯 (0:00 からの経過分、翌日にまたがると 1440 以上)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeOverlap {
    pub start_minutes: u32,
    pub end_minutes: u32,
    pub duration_minutes: u32,
}

/// 時間重複の詳細情報。都度計算し、保存はしない
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictInfo {
    pub date: DateString,
    pub job_id1: Option<JobId>,
    pub job_id2: Option<JobId>,
    pub job1_time_slot: TimeSlot,
    pub job2_time_slot: TimeSlot,
    pub overlap: TimeOverlap,
}
