#![allow(dead_code)]

use shift_register_lib::application::dto::SubmissionPayload;
use shift_register_lib::domain::models::{ConflictInfo, SetBy, WorkDay};
use shift_register_lib::domain::time_calc::{format_minutes_as_hours, format_time};

fn set_by_label(set_by: SetBy) -> &'static str {
    match set_by {
        SetBy::Default => "既定",
        SetBy::Bulk => "一括",
        SetBy::Custom => "個別",
        SetBy::Base => "前回",
    }
}

pub fn show_work_days_debug_data(work_days: &[WorkDay]) {
    println!("\n=======================================================");
    println!("🗓️ [DEBUG] 勤務日一覧 (計 {} 件)", work_days.len());
    println!("=======================================================");

    // 曜日の表示用ラベル (0=Sun ~ 6=Sat に対応)
    let day_labels = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

    for (index, day) in work_days.iter().enumerate() {
        let label = day_labels.get(day.day_of_week as usize).unwrap_or(&"???");
        let job = match day.job_id {
            Some(id) => format!("掛け持ち{}", id),
            None => "メイン".to_string(),
        };
        let removed = if day.is_removed { " (削除)" } else { "" };

        println!(
            "   [{:>2}] {} {} 第{}週 | {:<8} | {}-{} [{}/{}] {}{}",
            index,
            day.date,
            label,
            day.week_number,
            job,
            day.start_time,
            day.end_time,
            set_by_label(day.start_time_set_by),
            set_by_label(day.end_time_set_by),
            format_minutes_as_hours(day.work_minutes),
            removed
        );
    }
    println!("=======================================================\n");
}

pub fn show_conflicts_debug_data(conflicts: &[ConflictInfo]) {
    println!("\n=======================================================");
    println!("⚠️ [DEBUG] 時間の重複 (計 {} 件)", conflicts.len());
    println!("=======================================================");
    for conflict in conflicts {
        println!(
            "   {} : {:?} {}-{} / {:?} {}-{} => {}-{} ({}分)",
            conflict.date,
            conflict.job_id1,
            conflict.job1_time_slot.start_time,
            conflict.job1_time_slot.end_time,
            conflict.job_id2,
            conflict.job2_time_slot.start_time,
            conflict.job2_time_slot.end_time,
            format_time(conflict.overlap.start_minutes),
            format_time(conflict.overlap.end_minutes),
            conflict.overlap.duration_minutes
        );
    }
    println!("=======================================================\n");
}

pub fn show_payload_debug_data(payload: &SubmissionPayload) {
    println!("\n=======================================================");
    println!("📤 [DEBUG] 提出データ ({})", payload.main_store_name);
    println!("=======================================================");
    for entry in &payload.entries {
        println!("   {} {}-{} job={:?}", entry.date, entry.start_time, entry.end_time, entry.job_id);
    }
    if !payload.removed_dates.is_empty() {
        println!("   削除: {}", payload.removed_dates.join(", "));
    }
    println!("=======================================================\n");
}
