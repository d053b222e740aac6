//! 同じ日付で異なる勤務先の時間帯が重なっているものを検出する
//!
//! 日付でグループ化してから同じ日の中だけを比較するので、全体では O(N)。
//! 1日あたりの件数は勤務先数 (最大5) までなので、日ごとの総当たりは無視できる。

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::domain::models::{ConflictInfo, TimeOverlap, WorkDay};
use crate::domain::time_calc;

pub fn detect_conflicts(work_days: &[WorkDay]) -> Vec<ConflictInfo> {
    // 日付でグループ化 - O(N)
    let mut by_date: BTreeMap<&str, Vec<&WorkDay>> = BTreeMap::new();
    for work_day in work_days.iter().filter(|d| !d.is_removed) {
        by_date.entry(work_day.date.as_str()).or_default().push(work_day);
    }

    let mut conflicts = Vec::new();
    for (date, group) in by_date {
        // 1日に1件しかない場合はスキップ
        if group.len() < 2 {
            continue;
        }

        for (i, first) in group.iter().enumerate() {
            for second in &group[i + 1..] {
                // 同じ勤務先同士は比較しない
                if first.job_id == second.job_id {
                    continue;
                }
                if let Some(overlap) = time_overlap(first, second) {
                    conflicts.push(ConflictInfo {
                        date: date.to_string(),
                        job_id1: first.job_id,
                        job_id2: second.job_id,
                        job1_time_slot: first.time_slot(),
                        job2_time_slot: second.time_slot(),
                        overlap,
                    });
                }
            }
        }
    }

    debug!(conflicts = conflicts.len(), "conflict detection finished");
    conflicts
}

/// 2件の時間帯の重なり
///
/// それぞれ自分の開始時刻を基準に日付またぎを繰り上げる。
/// 境界が一致するだけ (17:00 終了と 17:00 開始) は重複としない
pub fn time_overlap(first: &WorkDay, second: &WorkDay) -> Option<TimeOverlap> {
    let interval = |work_day: &WorkDay| match time_calc::minute_interval(&work_day.start_time, &work_day.end_time) {
        Ok(interval) => Some(interval),
        Err(e) => {
            warn!(date = %work_day.date, error = %e, "skipping work day with malformed time in conflict check");
            None
        }
    };
    let (start1, end1) = interval(first)?;
    let (start2, end2) = interval(second)?;

    if start1 < end2 && start2 < end1 {
        let start_minutes = start1.max(start2);
        let end_minutes = end1.min(end2);
        Some(TimeOverlap {
            start_minutes,
            end_minutes,
            duration_minutes: end_minutes - start_minutes,
        })
    } else {
        None
    }
}
