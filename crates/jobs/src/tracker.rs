use crate::job::{ExtractionJob, JobError, JobInput, JobResult, JobStatus};
use chrono::Utc;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Injected job repository. The contract only requires read-after-write
/// consistency for the caller that owns the job; the default backing store
/// is an in-process concurrent map, an external keyed store works the same
/// way for multi-process deployments.
pub trait JobRepository: Send + Sync {
    fn insert(&self, job: ExtractionJob);
    fn get(&self, id: Uuid) -> Option<ExtractionJob>;
    fn list(&self) -> Vec<ExtractionJob>;
    fn update(&self, job: ExtractionJob);
}

#[derive(Default)]
pub struct InMemoryJobRepository {
    jobs: DashMap<Uuid, ExtractionJob>,
}

impl InMemoryJobRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl JobRepository for InMemoryJobRepository {
    fn insert(&self, job: ExtractionJob) {
        self.jobs.insert(job.id, job);
    }

    fn get(&self, id: Uuid) -> Option<ExtractionJob> {
        self.jobs.get(&id).map(|entry| entry.value().clone())
    }

    fn list(&self) -> Vec<ExtractionJob> {
        self.jobs.iter().map(|entry| entry.value().clone()).collect()
    }

    fn update(&self, job: ExtractionJob) {
        self.jobs.insert(job.id, job);
    }
}

/// Job lifecycle registry. All transitions are validated against the state
/// machine; an illegal transition is rejected and logged, the stored job is
/// left untouched.
#[derive(Clone)]
pub struct JobTracker {
    repository: Arc<dyn JobRepository>,
}

impl JobTracker {
    pub fn new(repository: Arc<dyn JobRepository>) -> Self {
        Self { repository }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryJobRepository::new()))
    }

    pub fn create(&self, input: JobInput) -> ExtractionJob {
        let job = ExtractionJob::new(input);
        tracing::info!(job_id = %job.id, project = %job.input.project_name, "job created");
        self.repository.insert(job.clone());
        job
    }

    pub fn mark_processing(&self, id: Uuid) -> Result<(), JobError> {
        self.transition(id, JobStatus::Processing, |_| {})
    }

    pub fn mark_completed(
        &self,
        id: Uuid,
        result: JobResult,
        metadata: HashMap<String, String>,
    ) -> Result<(), JobError> {
        self.transition(id, JobStatus::Completed, move |job| {
            let mut result = result;
            result.metadata.extend(metadata);
            job.result = Some(result);
        })
    }

    pub fn mark_failed(&self, id: Uuid, error_message: String) -> Result<(), JobError> {
        self.transition(id, JobStatus::Failed, move |job| {
            job.error = Some(error_message);
        })
    }

    pub fn get(&self, id: Uuid) -> Option<ExtractionJob> {
        self.repository.get(id)
    }

    pub fn list(&self) -> Vec<ExtractionJob> {
        self.repository.list()
    }

    fn transition(
        &self,
        id: Uuid,
        to: JobStatus,
        apply: impl FnOnce(&mut ExtractionJob),
    ) -> Result<(), JobError> {
        let Some(mut job) = self.repository.get(id) else {
            return Err(JobError::NotFound { id });
        };
        if !job.status.can_transition_to(to) {
            tracing::warn!(
                job_id = %id,
                from = ?job.status,
                to = ?to,
                "rejecting illegal job transition"
            );
            return Err(JobError::InvalidTransition {
                id,
                from: job.status,
                to,
            });
        }
        job.status = to;
        job.updated_at = Utc::now();
        apply(&mut job);
        tracing::info!(job_id = %id, status = ?to, "job transition");
        self.repository.update(job);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> JobInput {
        JobInput {
            document_paths: vec!["spec.pdf".to_string()],
            project_name: "Acme CRM".to_string(),
            model: "llama3".to_string(),
        }
    }

    fn result() -> JobResult {
        JobResult {
            application_id: "app-1".to_string(),
            requirement_count: 2,
            requirement_ids: vec!["FR-001".to_string(), "SEC-001".to_string()],
            metadata: HashMap::new(),
        }
    }

    #[test]
    fn create_then_read_back() {
        let tracker = JobTracker::in_memory();
        let job = tracker.create(input());
        let fetched = tracker.get(job.id).unwrap();
        assert_eq!(fetched.status, JobStatus::Pending);
        assert_eq!(fetched.input.project_name, "Acme CRM");
    }

    #[test]
    fn full_lifecycle_to_completed() {
        let tracker = JobTracker::in_memory();
        let job = tracker.create(input());

        tracker.mark_processing(job.id).unwrap();
        tracker
            .mark_completed(job.id, result(), HashMap::from([("chunks".into(), "3".into())]))
            .unwrap();

        let fetched = tracker.get(job.id).unwrap();
        assert_eq!(fetched.status, JobStatus::Completed);
        let stored = fetched.result.unwrap();
        assert_eq!(stored.requirement_count, 2);
        assert_eq!(stored.metadata.get("chunks").map(String::as_str), Some("3"));
    }

    #[test]
    fn failure_captures_message() {
        let tracker = JobTracker::in_memory();
        let job = tracker.create(input());
        tracker.mark_processing(job.id).unwrap();
        tracker
            .mark_failed(job.id, "graph unreachable".to_string())
            .unwrap();
        let fetched = tracker.get(job.id).unwrap();
        assert_eq!(fetched.status, JobStatus::Failed);
        assert_eq!(fetched.error.as_deref(), Some("graph unreachable"));
    }

    #[test]
    fn terminal_state_rejects_further_transitions() {
        let tracker = JobTracker::in_memory();
        let job = tracker.create(input());
        tracker.mark_processing(job.id).unwrap();
        tracker.mark_failed(job.id, "boom".to_string()).unwrap();

        let err = tracker.mark_processing(job.id).unwrap_err();
        assert!(matches!(err, JobError::InvalidTransition { .. }));
        // Stored job untouched.
        assert_eq!(tracker.get(job.id).unwrap().status, JobStatus::Failed);
    }

    #[test]
    fn unknown_job_is_not_found() {
        let tracker = JobTracker::in_memory();
        assert!(matches!(
            tracker.mark_processing(Uuid::new_v4()),
            Err(JobError::NotFound { .. })
        ));
    }

    #[test]
    fn list_returns_all_jobs() {
        let tracker = JobTracker::in_memory();
        tracker.create(input());
        tracker.create(input());
        assert_eq!(tracker.list().len(), 2);
    }
}
