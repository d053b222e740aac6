use tracing::{debug, warn};

use crate::domain::error::RegistryError;
use crate::domain::models::{Job, JobColor, JobId};

/// 同時に登録できる掛け持ち先の上限
pub const MAX_JOBS: usize = JobId::MAX as usize;

/// 掛け持ち先の登録簿
///
/// JobId は空いている最小のスロットを割り当て、色はスロットで決まる。
/// 日付との関連の削除 (カスケード) はセッション側で行う
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobRegistry {
    jobs: Vec<Job>, // id 昇順
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 保存データから復元する。重複IDと上限超過分は捨てる
    pub fn from_jobs(jobs: Vec<Job>) -> Self {
        let mut registry = Self::new();
        for mut job in jobs {
            if registry.get(job.id).is_some() {
                warn!(job_id = %job.id, "duplicate job id in stored registry, dropping");
                continue;
            }
            if registry.is_full() {
                warn!(job_id = %job.id, "stored registry exceeds {MAX_JOBS} jobs, dropping");
                continue;
            }
            // 色はスロットから決まるので保存値は信用しない
            job.color = JobColor::for_slot(job.id);
            registry.jobs.push(job);
        }
        registry.jobs.sort_by_key(|j| j.id);
        registry
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.jobs.len() >= MAX_JOBS
    }

    pub fn get(&self, id: JobId) -> Option<&Job> {
        self.jobs.iter().find(|j| j.id == id)
    }

    pub fn contains(&self, id: JobId) -> bool {
        self.get(id).is_some()
    }

    pub fn add_job(&mut self, name: &str) -> Result<Job, RegistryError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }

        let id = JobId::all()
            .find(|id| !self.contains(*id))
            .ok_or(RegistryError::MaxJobsReached { max: MAX_JOBS })?;

        let job = Job {
            id,
            name: name.to_string(),
            color: JobColor::for_slot(id),
            is_active: false,
        };
        self.jobs.push(job.clone());
        self.jobs.sort_by_key(|j| j.id);

        debug!(job_id = %id, job_name = name, "job added");
        Ok(job)
    }

    /// 存在しない ID は何もしない (None)
    pub fn rename_job(&mut self, id: JobId, name: &str) -> Result<Option<&Job>, RegistryError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }

        let Some(job) = self.jobs.iter_mut().find(|j| j.id == id) else {
            return Ok(None);
        };
        job.name = name.to_string();
        debug!(job_id = %id, job_name = name, "job renamed");
        Ok(Some(&*job))
    }

    pub fn remove_job(&mut self, id: JobId) -> Option<Job> {
        let index = self.jobs.iter().position(|j| j.id == id)?;
        debug!(job_id = %id, "job removed");
        Some(self.jobs.remove(index))
    }

    /// 選択コンテキストの掛け持ち先だけ is_active を立てる
    pub fn set_active(&mut self, current: Option<JobId>) {
        for job in &mut self.jobs {
            job.is_active = Some(job.id) == current;
        }
    }
}
