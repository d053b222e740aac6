mod tools;

#[cfg(test)]
mod session_tests {
    use shift_register_lib::{
        application::session::{ShiftSession, Stage},
        config::EngineConfig,
        domain::{
            error::{EngineError, RegistryError},
            models::{BulkApplyTarget, BulkApplyType, DateString, JobFilter, JobId, SetBy, TimeSlot},
            time_resolver::TimeUpdate,
        },
    };

    use crate::tools;

    // ========================================================================
    // 1. ヘルパー
    // ========================================================================

    fn new_session() -> ShiftSession {
        ShiftSession::new(&EngineConfig::default())
    }

    fn dates(list: &[&str]) -> Vec<DateString> {
        list.iter().map(|d| d.to_string()).collect()
    }

    // ========================================================================
    // 2. テストケース
    // ========================================================================

    #[test]
    fn test_resync_preserves_customization() {
        let mut session = new_session();
        session.select_all(&dates(&["2026-11-02", "2026-11-03"]));
        session.enter_time_registration();

        // A の開始時刻だけ個別入力
        session.update_work_day(0, &TimeUpdate::start("10:30")).unwrap();

        // カレンダーに戻って C を追加
        session.back_to_calendar();
        session.toggle_date("2026-11-04").unwrap();
        let work_days = session.enter_time_registration().to_vec();
        tools::show_output::show_work_days_debug_data(&work_days);

        assert_eq!(work_days.len(), 3);
        assert_eq!(work_days[0].start_time, "10:30");
        assert_eq!(work_days[0].start_time_set_by, SetBy::Custom);
        assert!(work_days[0].is_modified);
        assert_eq!(work_days[1].time_slot(), TimeSlot::new("09:00", "18:00"));
        assert_eq!(work_days[2].date, "2026-11-04");
        assert_eq!(work_days[2].start_time_set_by, SetBy::Default);
        assert_eq!(session.stage(), Stage::TimeRegister);
    }

    #[test]
    fn test_bulk_apply_precedence() {
        let mut session = new_session();
        session.select_all(&dates(&["2026-11-02", "2026-11-03"]));
        session.enter_time_registration();
        session.update_work_day(0, &TimeUpdate::start("07:00")).unwrap();
        session.set_bulk_settings(Some("12:00"), None).unwrap();

        let filter = session.bulk_filter(Vec::new(), Vec::new());
        assert!(session.needs_target_choice(&filter));

        // 個別設定された R は unmodifiedOnly では触らない
        let applied = session.apply_bulk(BulkApplyType::Start, BulkApplyTarget::UnmodifiedOnly, &filter);
        assert_eq!(applied, 1);
        assert_eq!(session.work_days()[0].start_time, "07:00");
        assert!(session.work_days()[0].custom_start_time);
        assert_eq!(session.work_days()[1].start_time, "12:00");
        assert!(session.work_days()[1].is_bulk_applied);

        // all なら上書きし、個別フラグも外れる
        let applied = session.apply_bulk(BulkApplyType::Start, BulkApplyTarget::All, &filter);
        assert_eq!(applied, 2);
        let record = &session.work_days()[0];
        assert_eq!(record.start_time, "12:00");
        assert!(!record.custom_start_time);
        assert!(!record.is_modified);
        assert!(record.is_bulk_applied);
        assert_eq!(record.start_time_set_by, SetBy::Bulk);
        assert_eq!(record.work_minutes, 360);
        assert!(!session.needs_target_choice(&filter));
    }

    #[test]
    fn test_bulk_apply_respects_job_filter() {
        let mut session = new_session();
        let job = session.add_job("居酒屋").unwrap();
        session.toggle_date("2026-11-02").unwrap();
        session.set_current_job(Some(job.id)).unwrap();
        session.toggle_date("2026-11-02").unwrap();
        session.enter_time_registration();

        session.set_job_filter(JobFilter::Side(job.id)).unwrap();
        session.set_bulk_settings(Some("18:00"), Some("23:00")).unwrap();
        let filter = session.bulk_filter(Vec::new(), Vec::new());
        assert_eq!(session.apply_bulk(BulkApplyType::Both, BulkApplyTarget::All, &filter), 1);

        assert_eq!(session.work_days()[0].time_slot(), TimeSlot::new("09:00", "18:00"));
        assert_eq!(session.work_days()[1].time_slot(), TimeSlot::new("18:00", "23:00"));
        assert_eq!(session.filtered_work_days().len(), 1);
    }

    #[test]
    fn test_conflict_between_jobs() {
        let mut session = new_session();
        let first = session.add_job("カフェ").unwrap();
        let second = session.add_job("塾").unwrap();

        for job in [first.id, second.id] {
            session.set_current_job(Some(job)).unwrap();
            session.toggle_date("2026-11-05").unwrap();
        }
        session.enter_time_registration();
        session.update_work_day(0, &TimeUpdate::both("09:00", "17:00")).unwrap();
        session.update_work_day(1, &TimeUpdate::both("16:00", "22:00")).unwrap();

        let conflicts = session.conflicts();
        tools::show_output::show_conflicts_debug_data(&conflicts);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].overlap.start_minutes, 16 * 60);
        assert_eq!(conflicts[0].overlap.end_minutes, 17 * 60);
        assert_eq!(conflicts[0].overlap.duration_minutes, 60);

        // 境界が接するだけなら重複しない
        session.update_work_day(1, &TimeUpdate::start("17:00")).unwrap();
        assert!(session.conflicts().is_empty());
    }

    #[test]
    fn test_job_deletion_cascades() {
        let mut session = new_session();
        let _first = session.add_job("カフェ").unwrap();
        let second = session.add_job("塾").unwrap();
        session.set_current_job(Some(second.id)).unwrap();
        session.toggle_date("2026-11-09").unwrap();
        session.update_job_default_times(second.id, Some("17:00"), None).unwrap();
        session.set_job_filter(JobFilter::Side(second.id)).unwrap();
        session.enter_time_registration();
        assert_eq!(session.work_days()[0].start_time, "17:00");

        let unselected = session.remove_job(second.id).unwrap();

        assert_eq!(unselected, dates(&["2026-11-09"]));
        assert!(!session.selection().date_job_map().contains_key("2026-11-09"));
        assert!(!session.selection().is_date_selected("2026-11-09"));
        assert_eq!(session.selection().current_job(), None);
        assert_eq!(session.job_filter(), JobFilter::All);
        assert!(session.work_days().is_empty());
        assert!(session.defaults().job_overrides.is_empty());
        assert_eq!(session.registry().len(), 1);

        assert_eq!(session.remove_job(second.id), Err(EngineError::UnknownJob(second.id)));
    }

    #[test]
    fn test_max_job_count() {
        let mut session = new_session();
        for name in ["A", "B", "C", "D"] {
            session.add_job(name).unwrap();
        }

        assert_eq!(session.add_job("E"), Err(RegistryError::MaxJobsReached { max: 4 }));
        assert_eq!(session.registry().len(), 4);

        // 空いたスロットは再利用され、色もスロットで決まる
        let slot2 = JobId::new(2).unwrap();
        session.remove_job(slot2).unwrap();
        let again = session.add_job("F").unwrap();
        assert_eq!(again.id, slot2);
        assert_eq!(again.color.hex(), "#50C878");
    }

    #[test]
    fn test_unknown_job_is_rejected() {
        let mut session = new_session();
        let ghost = JobId::new(3).unwrap();
        assert_eq!(session.set_current_job(Some(ghost)), Err(EngineError::UnknownJob(ghost)));
        assert_eq!(session.set_job_filter(JobFilter::Side(ghost)), Err(EngineError::UnknownJob(ghost)));
        assert!(session.toggle_date("2026/11/01").is_err());
        assert!(session.set_bulk_settings(Some("24:00"), None).is_err());
    }

    #[test]
    fn test_summary_and_payload() {
        let mut session = new_session();
        session.select_all(&dates(&["2026-11-02", "2026-11-03", "2026-11-04"]));
        session.enter_time_registration();
        session.update_work_day(1, &TimeUpdate::both("13:00", "17:00")).unwrap();
        session.toggle_remove_day(2);

        let plain = session.total_summary();
        assert_eq!(plain.work_days, 2);
        assert_eq!(plain.total_work_minutes, 540 + 240);

        session.set_include_break(true);
        let with_break = session.total_summary();
        assert_eq!(with_break.total_break_minutes, 60);
        assert_eq!(with_break.total_actual_work_minutes, 480 + 240);

        let payload = session.enter_confirmation();
        tools::show_output::show_payload_debug_data(&payload);
        assert_eq!(payload.entries.len(), 2);
        assert_eq!(payload.entries[1].start_time, "13:00");
        assert_eq!(payload.removed_dates, dates(&["2026-11-04"]));

        // 復活
        assert_eq!(session.toggle_remove_day(2), Some(false));
        assert_eq!(session.submission_payload().entries.len(), 3);
        assert_eq!(session.toggle_remove_day(9), None);
    }
}
