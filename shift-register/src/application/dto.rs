use serde::Serialize;

use crate::domain::models::{DateString, JobId, TimeString};

/// 提出する1勤務分
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionEntry {
    pub date: DateString,
    pub start_time: TimeString,
    pub end_time: TimeString,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,
}

/// 提出処理に渡すデータ (送信自体は外部で行う)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionPayload {
    pub main_store_name: String,
    /// 削除されていない勤務日 (日付順)
    pub entries: Vec<SubmissionEntry>,
    /// 明示的に外した日付 (重複なし、昇順)
    pub removed_dates: Vec<DateString>,
    pub remarks: String,
}
